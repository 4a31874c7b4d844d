//! Container-runtime distribution.
//!
//! Built images leave the pipeline as OCI layout directories. Distribution
//! moves them where the user asked: into a Docker daemon, into podman's
//! container storage, or to the registry named by the image reference. All
//! three go through `skopeo`, which speaks every transport involved; each
//! call returns plain success or failure and daemon-specific diagnostics
//! stay in the captured stderr.

pub mod context;

use std::io;
use std::path::Path;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Errors that can occur while distributing an image.
#[derive(Debug, Error)]
pub enum OciError {
  #[error("failed to spawn skopeo: {0}")]
  Spawn(#[source] io::Error),

  #[error("loading {image} into docker failed: {stderr}")]
  LoadDocker { image: String, stderr: String },

  #[error("loading {image} into podman failed: {stderr}")]
  LoadPodman { image: String, stderr: String },

  #[error("pushing {image} failed: {stderr}")]
  Push { image: String, stderr: String },
}

/// Load the image at `image_dir` into the Docker daemon at `endpoint`.
pub async fn load_docker(endpoint: &str, image_dir: &Path, image: &str) -> Result<(), OciError> {
  debug!(endpoint, image, "loading into docker daemon");

  let source = oci_transport(image_dir);
  let stderr = copy(
    &source,
    &format!("docker-daemon:{image}"),
    &[("DOCKER_HOST", endpoint)],
  )
  .await?;

  if let Some(stderr) = stderr {
    return Err(OciError::LoadDocker {
      image: image.to_string(),
      stderr,
    });
  }

  info!(image, "loaded into docker daemon");
  Ok(())
}

/// Load the image at `image_dir` into podman's container storage.
pub async fn load_podman(image_dir: &Path, image: &str) -> Result<(), OciError> {
  debug!(image, "loading into podman");

  let source = oci_transport(image_dir);
  let stderr = copy(&source, &format!("containers-storage:{image}"), &[]).await?;

  if let Some(stderr) = stderr {
    return Err(OciError::LoadPodman {
      image: image.to_string(),
      stderr,
    });
  }

  info!(image, "loaded into podman");
  Ok(())
}

/// Push the image at `image_dir` to the registry named by `image`.
pub async fn push(image_dir: &Path, image: &str) -> Result<(), OciError> {
  debug!(image, "pushing to registry");

  let source = oci_transport(image_dir);
  let stderr = copy(&source, &format!("docker://{image}"), &[]).await?;

  if let Some(stderr) = stderr {
    return Err(OciError::Push {
      image: image.to_string(),
      stderr,
    });
  }

  info!(image, "pushed to registry");
  Ok(())
}

fn oci_transport(image_dir: &Path) -> String {
  format!("oci:{}", image_dir.display())
}

/// Run `skopeo copy`; `Ok(None)` on success, `Ok(Some(stderr))` on a failed
/// copy, `Err` when skopeo could not be spawned at all.
async fn copy(
  source: &str,
  destination: &str,
  env: &[(&str, &str)],
) -> Result<Option<String>, OciError> {
  let mut command = Command::new("skopeo");
  command.args(["copy", source, destination]);
  for (key, value) in env {
    command.env(key, value);
  }

  let output = command.output().await.map_err(OciError::Spawn)?;

  if output.status.success() {
    return Ok(None);
  }

  Ok(Some(
    String::from_utf8_lossy(&output.stderr).trim().to_string(),
  ))
}
