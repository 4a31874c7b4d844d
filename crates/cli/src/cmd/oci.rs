//! Implementation of the `kiln oci` command.
//!
//! Thin shell around the library pipeline: builds the request from flags,
//! owns the async runtime, renders progress, and maps the outcome onto an
//! exit code. The Dockerfile patch branch exits non-zero even on success,
//! since nothing was built.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use kiln_lib::pipeline::{self, OciRequest, Outcome, PipelineError, Reporter, Stage};

use crate::output;

/// Flags collected from the command line.
pub struct OciArgs {
  pub artifact: String,
  pub platform: String,
  pub output: String,
  pub tag: String,
  pub path: Option<PathBuf>,
  pub dev: bool,
  pub df_swap: bool,
  pub load_docker: bool,
  pub load_podman: bool,
  pub push: bool,
}

/// Prints pipeline progress as it happens.
struct ConsoleReporter;

impl Reporter for ConsoleReporter {
  fn stage(&self, stage: Stage) {
    debug!(?stage, "entering stage");
    if stage == Stage::InvokeBuilder {
      output::print_progress("Building image...");
    }
  }

  fn progress(&self, message: &str) {
    output::print_progress(message);
  }

  fn success(&self, message: &str) {
    output::print_success(message);
  }
}

/// Execute the oci command.
pub fn cmd_oci(args: OciArgs) -> Result<()> {
  let request = OciRequest {
    artifact: args.artifact,
    platform: args.platform,
    output: args.output,
    tag: args.tag,
    dockerfile_dir: args.path,
    dev_deps: args.dev,
    patch_dockerfile: args.df_swap,
    load_docker: args.load_docker,
    load_podman: args.load_podman,
    push: args.push,
    project_dir: PathBuf::from("."),
  };

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt.block_on(pipeline::run(&request, &ConsoleReporter));

  match result {
    Ok(Outcome::Built(summary)) => {
      println!();
      output::print_success(&format!("Image: {}", summary.image));
      println!(
        "  {} Output:       {}",
        output::symbols::INFO,
        summary.output_dir.display()
      );
      println!(
        "  {} Platform:     {}/{}",
        output::symbols::INFO,
        summary.manifest.os,
        summary.manifest.arch
      );
      println!(
        "  {} Closure:      {} store path(s)",
        output::symbols::INFO,
        summary.manifest.closure_paths
      );
      Ok(())
    }
    Ok(Outcome::DockerfilePatched(summary)) => {
      output::print_success(&format!(
        "Dockerfile updated: {} base image(s) retagged in {}",
        summary.retagged,
        summary.path.display()
      ));
      // This branch never builds anything; exiting non-zero keeps scripts
      // from mistaking it for a completed build.
      std::process::exit(1);
    }
    Err(PipelineError::MissingTag) => {
      output::print_hint("use the --tag flag to define a tag");
      std::process::exit(1);
    }
    Err(err) => {
      output::print_error(&err.to_string());
      if let PipelineError::Docker {
        install_hint: true, ..
      } = err
      {
        output::print_error("Is Docker installed?");
      }
      std::process::exit(1);
    }
  }
}
