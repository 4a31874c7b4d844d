//! Final artifact assembly.
//!
//! After the Builder realizes the image attribute, the output directory
//! holds an OCI layout behind the result link. This stage checks that the
//! layout is actually there for the requested target and emits the build
//! manifest (`artifact.json`) downstream tooling reads: image reference,
//! target platform, application, resolved package pins, and closure totals.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::builder::{AppDetails, RESULT_LINK, RuntimeClosure};
use crate::lockfile::{LockFile, LockedPackage};

/// Name of the emitted build manifest inside the output directory.
pub const MANIFEST_FILENAME: &str = "artifact.json";

/// Errors that can occur during artifact assembly.
#[derive(Debug, Error)]
pub enum ArtifactsError {
  #[error("build result at {} is missing {missing}", path.display())]
  MissingLayout { path: PathBuf, missing: String },

  #[error("failed to write {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },

  #[error("failed to serialize build manifest: {0}")]
  Serialize(#[from] serde_json::Error),
}

/// The manifest describing one finished build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
  pub image: String,
  pub os: String,
  pub arch: String,
  pub app: String,
  pub packages: Vec<LockedPackage>,
  pub closure_paths: usize,
  pub closure_nar_size: u64,
}

/// Verify the built OCI layout and emit the build manifest.
pub fn generate(
  output_dir: &Path,
  lock: &LockFile,
  app: &AppDetails,
  closure: &RuntimeClosure,
  os: &str,
  arch: &str,
) -> Result<BuildManifest, ArtifactsError> {
  let result = output_dir.join(RESULT_LINK);

  for required in ["oci-layout", "index.json"] {
    if !result.join(required).exists() {
      return Err(ArtifactsError::MissingLayout {
        path: result,
        missing: required.to_string(),
      });
    }
  }

  let manifest = BuildManifest {
    image: app.name.clone(),
    os: os.to_string(),
    arch: arch.to_string(),
    app: lock.app.name.clone(),
    packages: lock.packages.clone(),
    closure_paths: closure.len(),
    closure_nar_size: closure.total_nar_size(),
  };

  let path = output_dir.join(MANIFEST_FILENAME);
  let content = serde_json::to_string_pretty(&manifest)?;
  std::fs::write(&path, content).map_err(|source| ArtifactsError::Write {
    path: path.clone(),
    source,
  })?;

  info!(
    image = %manifest.image,
    paths = manifest.closure_paths,
    "artifacts generated"
  );
  Ok(manifest)
}
