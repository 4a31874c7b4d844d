//! Build orchestration.
//!
//! One `oci` invocation flows through a fixed sequence of states, each
//! completing before the next starts:
//!
//! 1. load the document
//! 2. resolve platform + artifact
//! 3. apply the tag override, or patch the Dockerfile and stop
//! 4. prepare the workspace (generate expressions, stage, ignore output)
//! 5. invoke the Builder
//! 6. read the lock and the runtime closure
//! 7. assemble the final artifacts
//! 8. distribute (docker / podman / registry), each branch only on request
//!
//! Every fatal condition is a typed error returned to the caller; nothing in
//! here terminates the process. There is no checkpoint or resume: re-running
//! starts over from the first state.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

use crate::artifact::{self, SelectError};
use crate::artifacts::{self, ArtifactsError, BuildManifest};
use crate::builder::{self, BuilderError};
use crate::config::{self, ConfigError};
use crate::detect::{self, ProjectKind};
use crate::dockerfile::{self, DockerfileError, PatchSummary};
use crate::generate::{self, EXPRESSION_DIR, GenerateError};
use crate::git::{self, GitError};
use crate::lockfile::{LOCK_FILENAME, LockError, LockFile};
use crate::oci::{self, OciError, context};
use crate::target;

/// Default directory the build artifacts land in.
pub const DEFAULT_OUTPUT_DIR: &str = "kiln-result";

/// Everything one `oci` invocation needs, threaded explicitly through the
/// pipeline instead of living in ambient state.
#[derive(Debug, Clone)]
pub struct OciRequest {
  /// Artifact label to build.
  pub artifact: String,
  /// Requested platform; empty auto-detects the host.
  pub platform: String,
  /// Output directory; empty selects [`DEFAULT_OUTPUT_DIR`].
  pub output: String,
  /// Tag override; empty means no retag.
  pub tag: String,
  /// Directory holding the Dockerfile for patch mode; `None` means the
  /// project directory.
  pub dockerfile_dir: Option<PathBuf>,
  /// Build the development-dependency variant.
  pub dev_deps: bool,
  /// Patch the Dockerfile instead of building.
  pub patch_dockerfile: bool,
  pub load_docker: bool,
  pub load_podman: bool,
  pub push: bool,
  /// Project root holding the document and receiving the output.
  pub project_dir: PathBuf,
}

impl OciRequest {
  /// A request for `artifact` with every knob at its default.
  pub fn new(artifact: impl Into<String>) -> Self {
    Self {
      artifact: artifact.into(),
      platform: String::new(),
      output: String::new(),
      tag: String::new(),
      dockerfile_dir: None,
      dev_deps: false,
      patch_dockerfile: false,
      load_docker: false,
      load_podman: false,
      push: false,
      project_dir: PathBuf::from("."),
    }
  }

  fn output_name(&self) -> &str {
    if self.output.is_empty() {
      DEFAULT_OUTPUT_DIR
    } else {
      &self.output
    }
  }
}

/// Pipeline states, reported in order to the [`Reporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  LoadConfig,
  ResolveArtifact,
  MutateOrPatch,
  PrepareWorkspace,
  InvokeBuilder,
  ReadLockAndClosure,
  GenerateArtifacts,
  Distribute,
}

/// Receives progress notifications as the pipeline advances.
///
/// The pipeline never prints; the CLI decides how (and whether) to render
/// these.
pub trait Reporter {
  fn stage(&self, _stage: Stage) {}
  fn progress(&self, _message: &str) {}
  fn success(&self, _message: &str) {}
}

/// Reporter that discards everything.
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Errors that can abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// Dockerfile patch mode was requested without a tag to swap in.
  #[error("no tag provided for the Dockerfile base-image swap")]
  MissingTag,

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Select(#[from] SelectError),

  #[error(transparent)]
  Dockerfile(#[from] DockerfileError),

  #[error(transparent)]
  Generate(#[from] GenerateError),

  #[error(transparent)]
  Git(#[from] GitError),

  #[error(transparent)]
  Builder(#[from] BuilderError),

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error(transparent)]
  Artifacts(#[from] ArtifactsError),

  /// Docker load failed. `install_hint` is set when daemon-context
  /// discovery had already failed, which usually means Docker is not
  /// installed at all rather than merely unreachable.
  #[error("{source}")]
  Docker {
    #[source]
    source: OciError,
    install_hint: bool,
  },

  #[error(transparent)]
  Oci(#[from] OciError),
}

/// How a pipeline run ended.
#[derive(Debug)]
pub enum Outcome {
  /// The Dockerfile patch branch ran; no build was attempted. The command
  /// still exits non-zero on this branch.
  DockerfilePatched(PatchSummary),
  /// The full build pipeline ran to completion.
  Built(BuildSummary),
}

/// What a completed build produced.
#[derive(Debug)]
pub struct BuildSummary {
  pub image: String,
  pub output_dir: PathBuf,
  pub manifest: BuildManifest,
  pub loaded_docker: bool,
  pub loaded_podman: bool,
  pub pushed: bool,
}

/// Run the pipeline for one request.
pub async fn run(request: &OciRequest, reporter: &dyn Reporter) -> Result<Outcome, PipelineError> {
  // State 1: load the document.
  reporter.stage(Stage::LoadConfig);
  let config_path = request.project_dir.join(config::CONFIG_FILENAME);
  let mut conf = config::load(&config_path)?;

  // State 2: resolve platform and artifact together; an invalid block
  // anywhere before the match aborts here.
  reporter.stage(Stage::ResolveArtifact);
  let (mut selected, platform) = artifact::select(&conf, &request.artifact, &request.platform)?;

  // State 3: tag mutation, or the terminal Dockerfile branch.
  reporter.stage(Stage::MutateOrPatch);
  if !request.tag.is_empty() && !request.patch_dockerfile {
    artifact::retag(&mut conf, &mut selected, &request.tag, &config_path)?;
  }
  if request.patch_dockerfile {
    if request.tag.is_empty() {
      return Err(PipelineError::MissingTag);
    }
    let dir = request
      .dockerfile_dir
      .clone()
      .unwrap_or_else(|| request.project_dir.clone());
    let summary = dockerfile::patch(&dir, &request.tag, request.dev_deps)?;
    return Ok(Outcome::DockerfilePatched(summary));
  }

  // State 4: prepare the workspace before any build resources are spent.
  reporter.stage(Stage::PrepareWorkspace);
  cross_check_project(&conf, request);
  generate::generate(&conf, &request.project_dir)?;
  git::add(&request.project_dir, &format!("{EXPRESSION_DIR}/")).await?;
  let output_name = request.output_name();
  git::ignore(&request.project_dir, &format!("{output_name}/")).await?;

  // State 5: hand off to the Builder.
  reporter.stage(Stage::InvokeBuilder);
  let attr = target::oci_attr(&selected.artifact, platform.pair(), request.dev_deps);
  let output_dir = request.project_dir.join(output_name);
  builder::build(&output_dir.join(builder::RESULT_LINK), &attr).await?;

  // State 6: read back what the Builder resolved.
  reporter.stage(Stage::ReadLockAndClosure);
  reporter.progress("Generating artifacts...");
  let lock = LockFile::load(&request.project_dir.join(LOCK_FILENAME))?;
  let (mut app, closure) = builder::runtime_closure(&lock.app.name, &output_dir).await?;
  app.name = selected.name.clone();

  // State 7: final artifact assembly for the target platform.
  reporter.stage(Stage::GenerateArtifacts);
  let manifest = artifacts::generate(
    &output_dir,
    &lock,
    &app,
    &closure,
    &platform.os,
    &platform.arch,
  )?;
  reporter.success(&format!(
    "Build completed successfully, please check the {} directory",
    output_dir.display()
  ));

  // State 8: distribution, strictly in order, only what was requested. A
  // failing branch stops the run; earlier successes are not rolled back.
  reporter.stage(Stage::Distribute);
  let image_dir = output_dir.join(builder::RESULT_LINK);
  let mut summary = BuildSummary {
    image: selected.name.clone(),
    output_dir,
    manifest,
    loaded_docker: false,
    loaded_podman: false,
    pushed: false,
  };

  if request.load_docker {
    reporter.progress("Loading image to docker daemon...");
    let (endpoint, discovered) = context::resolve_endpoint();
    if !discovered {
      debug!("docker context discovery failed; using {}", context::DEFAULT_HOST);
    }
    match oci::load_docker(&endpoint, &image_dir, &selected.name).await {
      Ok(()) => {
        summary.loaded_docker = true;
        reporter.success(&format!("Image {} loaded to docker daemon", selected.name));
      }
      Err(source) => {
        return Err(PipelineError::Docker {
          source,
          install_hint: !discovered,
        });
      }
    }
  }

  if request.load_podman {
    reporter.progress("Loading image to podman...");
    oci::load_podman(&image_dir, &selected.name).await?;
    summary.loaded_podman = true;
    reporter.success(&format!("Image {} loaded to podman", selected.name));
  }

  if request.push {
    reporter.progress("Pushing image to registry...");
    oci::push(&image_dir, &selected.name).await?;
    summary.pushed = true;
    reporter.success(&format!("Image {} pushed to registry", selected.name));
  }

  Ok(Outcome::Built(summary))
}

/// Warn when the checked-out project does not look like the configured
/// application ecosystem. Detection problems never block a build.
fn cross_check_project(conf: &config::Config, request: &OciRequest) {
  let Ok(Some(kind)) = conf.app_kind() else {
    return;
  };

  match detect::detect(&request.project_dir) {
    Ok((detected, _)) if detected == ProjectKind::Unknown => {}
    Ok((detected, _)) => {
      if !detected.matches(kind) {
        warn!(
          configured = kind.as_str(),
          detected = detected.as_str(),
          "configured application block does not match the project layout"
        );
      }
    }
    Err(e) => {
      warn!(error = %e, "project detection failed");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use std::fs;
  use tempfile::TempDir;

  const CONFIG: &str = r#"
[packages]
development = ["rust@1.75.0"]
runtime = ["cacert"]

[[oci]]
artifact = "svc"
name = "ghcr.io/acme/svc:latest"
"#;

  const DOCKERFILE: &str = "FROM ghcr.io/acme/base:v1\n";

  struct RecordingReporter {
    stages: RefCell<Vec<Stage>>,
  }

  impl RecordingReporter {
    fn new() -> Self {
      Self {
        stages: RefCell::new(Vec::new()),
      }
    }
  }

  impl Reporter for RecordingReporter {
    fn stage(&self, stage: Stage) {
      self.stages.borrow_mut().push(stage);
    }
  }

  fn project(config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(config::CONFIG_FILENAME), config).unwrap();
    temp
  }

  fn request_in(temp: &TempDir, artifact: &str) -> OciRequest {
    let mut request = OciRequest::new(artifact);
    request.platform = "linux/amd64".to_string();
    request.project_dir = temp.path().to_path_buf();
    request
  }

  #[tokio::test]
  async fn missing_document_fails_at_load() {
    let temp = TempDir::new().unwrap();
    let request = request_in(&temp, "svc");

    let err = run(&request, &NullReporter).await.unwrap_err();
    assert!(matches!(err, PipelineError::Config(ConfigError::Read { .. })));
  }

  #[tokio::test]
  async fn unknown_artifact_fails_at_selection() {
    let temp = project(CONFIG);
    let request = request_in(&temp, "ghost");

    let err = run(&request, &NullReporter).await.unwrap_err();
    assert!(matches!(
      err,
      PipelineError::Select(SelectError::UnknownLabel { .. })
    ));
  }

  #[tokio::test]
  async fn unsupported_platform_fails_at_selection() {
    let temp = project(CONFIG);
    let mut request = request_in(&temp, "svc");
    request.platform = "plan9/mips".to_string();

    let err = run(&request, &NullReporter).await.unwrap_err();
    assert!(matches!(
      err,
      PipelineError::Select(SelectError::Platform(_))
    ));
  }

  #[tokio::test]
  async fn patch_mode_without_tag_is_usage_error() {
    let temp = project(CONFIG);
    fs::write(temp.path().join("Dockerfile"), DOCKERFILE).unwrap();
    let mut request = request_in(&temp, "svc");
    request.patch_dockerfile = true;

    let err = run(&request, &NullReporter).await.unwrap_err();
    assert!(matches!(err, PipelineError::MissingTag));

    // Guided failure: nothing was modified.
    let dockerfile = fs::read_to_string(temp.path().join("Dockerfile")).unwrap();
    assert_eq!(dockerfile, DOCKERFILE);
  }

  #[tokio::test]
  async fn patch_mode_short_circuits_the_build() {
    let temp = project(CONFIG);
    fs::write(temp.path().join("Dockerfile"), DOCKERFILE).unwrap();
    let mut request = request_in(&temp, "svc");
    request.patch_dockerfile = true;
    request.tag = "v2".to_string();

    let reporter = RecordingReporter::new();
    let outcome = run(&request, &reporter).await.unwrap();

    match outcome {
      Outcome::DockerfilePatched(summary) => assert_eq!(summary.retagged, 1),
      other => panic!("expected DockerfilePatched, got {other:?}"),
    }

    let dockerfile = fs::read_to_string(temp.path().join("Dockerfile")).unwrap();
    assert!(dockerfile.contains("ghcr.io/acme/base:v2"));

    // The patch branch is terminal: no expressions were generated and the
    // document kept its original artifact name even though a tag was given.
    assert!(!temp.path().join(EXPRESSION_DIR).exists());
    let document = fs::read_to_string(temp.path().join(config::CONFIG_FILENAME)).unwrap();
    assert!(document.contains("ghcr.io/acme/svc:latest"));

    assert_eq!(
      *reporter.stages.borrow(),
      vec![Stage::LoadConfig, Stage::ResolveArtifact, Stage::MutateOrPatch]
    );
  }

  #[tokio::test]
  async fn tag_mutation_persists_before_workspace_preparation() {
    let temp = project(CONFIG);
    let mut request = request_in(&temp, "svc");
    request.tag = "v2".to_string();

    // The temp dir is not a git repository, so the run stops in workspace
    // preparation; the mutation must already be on disk by then.
    let err = run(&request, &NullReporter).await.unwrap_err();
    assert!(matches!(err, PipelineError::Git(_)));

    let document = fs::read_to_string(temp.path().join(config::CONFIG_FILENAME)).unwrap();
    assert!(document.contains("ghcr.io/acme/svc:v2"));
    assert!(!document.contains("ghcr.io/acme/svc:latest"));

    // Expressions were generated before the failure.
    assert!(temp.path().join(EXPRESSION_DIR).join("flake.nix").exists());
  }

  #[tokio::test]
  async fn invalid_block_blocks_selection_of_valid_artifact() {
    let config = r#"
[[oci]]
artifact = "broken"
name = "ghcr.io/acme/broken"
import_configs = ["missing"]

[[oci]]
artifact = "svc"
name = "ghcr.io/acme/svc:latest"
"#;
    let temp = project(config);
    let request = request_in(&temp, "svc");

    let err = run(&request, &NullReporter).await.unwrap_err();
    assert!(matches!(
      err,
      PipelineError::Select(SelectError::InvalidArtifact { .. })
    ));
  }
}
