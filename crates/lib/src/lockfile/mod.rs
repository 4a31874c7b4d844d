//! Build lock snapshot.
//!
//! `kiln.lock` is a JSON snapshot of the Builder's resolved dependency set,
//! produced by the package-resolution side of the toolchain. The pipeline
//! only reads it: the application name keys the runtime-closure lookup, and
//! the package pins end up in the emitted build manifest.
//!
//! # Format
//!
//! ```json
//! {
//!   "app": { "name": "svc", "version": "0.3.1" },
//!   "packages": [
//!     { "name": "cacert", "version": "3.95", "revision": "a1b2c3" }
//!   ]
//! }
//! ```

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lock file name at the project root.
pub const LOCK_FILENAME: &str = "kiln.lock";

/// A parsed lock snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockFile {
  pub app: App,
  #[serde(default)]
  pub packages: Vec<LockedPackage>,
}

/// The application the snapshot was resolved for.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
  pub name: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub version: String,
}

/// One resolved package pin.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedPackage {
  pub name: String,
  pub version: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub revision: String,
  /// Whether the package is part of the runtime set (development otherwise).
  #[serde(default)]
  pub runtime: bool,
}

/// Errors that can occur when reading the lock file.
#[derive(Debug, Error)]
pub enum LockError {
  /// Failed to read the lock file.
  #[error("failed to read lock file: {0}")]
  Read(#[source] io::Error),

  /// Failed to parse the lock file JSON.
  #[error("failed to parse lock file: {0}")]
  Parse(#[source] serde_json::Error),
}

impl LockFile {
  /// Load the lock file from the given path.
  ///
  /// A missing lock file is an error here: the pipeline only reads the lock
  /// after a build step that must have produced it.
  pub fn load(path: &Path) -> Result<Self, LockError> {
    let content = fs::read_to_string(path).map_err(LockError::Read)?;
    serde_json::from_str(&content).map_err(LockError::Parse)
  }
}
