//! kiln - declarative OCI image builds.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

/// kiln - build OCI images from a declarative build document
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build an OCI image for an artifact declared in kiln.toml
  Oci {
    /// Artifact label to build
    artifact: String,

    /// Platform to build the image for (e.g. linux/amd64)
    #[arg(short, long, default_value = "")]
    platform: String,

    /// Directory the build artifacts are placed in
    #[arg(short, long, default_value = "")]
    output: String,

    /// Tag swapped into the image name (or into the Dockerfile with --df-swap)
    #[arg(short, long, default_value = "")]
    tag: String,

    /// Directory containing the Dockerfile (default: current directory)
    #[arg(long)]
    path: Option<PathBuf>,

    /// Build the development-dependency variant
    #[arg(long)]
    dev: bool,

    /// Rewrite base-image tags in the Dockerfile instead of building
    #[arg(long)]
    df_swap: bool,

    /// Load the built image into the docker daemon
    #[arg(long)]
    load_docker: bool,

    /// Load the built image into podman
    #[arg(long)]
    load_podman: bool,

    /// Push the built image to its registry
    #[arg(long)]
    push: bool,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_filter = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
    )
    .without_time()
    .init();

  match cli.command {
    Commands::Oci {
      artifact,
      platform,
      output,
      tag,
      path,
      dev,
      df_swap,
      load_docker,
      load_podman,
      push,
    } => cmd::cmd_oci(cmd::OciArgs {
      artifact,
      platform,
      output,
      tag,
      path,
      dev,
      df_swap,
      load_docker,
      load_podman,
      push,
    }),
  }
}
