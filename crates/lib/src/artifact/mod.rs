//! Artifact selection and renaming.
//!
//! Selection couples validation-of-all with match-of-one: artifact blocks are
//! validated in document order and the first invalid block aborts the lookup,
//! even when a later block would match the requested label. This surfaces
//! configuration errors eagerly instead of hiding them behind a successful
//! build of an unrelated artifact.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{self, Config, ConfigError, OciArtifact, ValidationError};
use crate::platform::{self, Platform, PlatformError};

/// Errors that can occur while selecting an artifact.
#[derive(Debug, Error)]
pub enum SelectError {
  #[error(transparent)]
  Platform(#[from] PlatformError),

  /// A block failed validation; selection stops at the first invalid block.
  #[error("config for oci block {name} is invalid: {reason}")]
  InvalidArtifact {
    name: String,
    reason: ValidationError,
  },

  #[error(
    "no oci artifact labeled {requested}. Valid artifacts that can be built are: {}",
    known.join(", ")
  )]
  UnknownLabel {
    requested: String,
    known: Vec<String>,
  },
}

/// Resolve the platform and select the artifact labeled `label`.
pub fn select(
  config: &Config,
  label: &str,
  requested_platform: &str,
) -> Result<(OciArtifact, Platform), SelectError> {
  let platform = platform::resolve(requested_platform)?;

  let mut known = Vec::with_capacity(config.oci_artifacts.len());
  for block in &config.oci_artifacts {
    if let Err(reason) = block.validate(config) {
      return Err(SelectError::InvalidArtifact {
        name: block.name.clone(),
        reason,
      });
    }

    if block.artifact == label {
      debug!(artifact = %label, platform = %platform, "artifact selected");
      return Ok((block.clone(), platform));
    }

    known.push(block.artifact.clone());
  }

  Err(SelectError::UnknownLabel {
    requested: label.to_string(),
    known,
  })
}

/// Compute the image name produced by applying `tag` to `name`.
///
/// An existing tag after the `:` separator is fully replaced; a name without
/// a separator gets one appended.
pub fn name_with_tag(name: &str, tag: &str) -> String {
  match name.split_once(':') {
    Some((repo, _)) => format!("{repo}:{tag}"),
    None => format!("{name}:{tag}"),
  }
}

/// Apply a tag override to `artifact` and persist the renamed block.
///
/// The block is located by its old name; when no block matches, the document
/// is left untouched and no error is raised.
pub fn retag(
  config: &mut Config,
  artifact: &mut OciArtifact,
  tag: &str,
  config_path: &Path,
) -> Result<(), ConfigError> {
  let old_name = artifact.name.clone();
  artifact.name = name_with_tag(&old_name, tag);

  let replaced = config::replace_artifact(config, &old_name, artifact.clone(), config_path)?;
  if replaced {
    info!(old = %old_name, new = %artifact.name, "artifact renamed");
  }

  Ok(())
}
