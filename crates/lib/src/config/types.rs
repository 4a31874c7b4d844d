//! Configuration document types.
//!
//! These structs mirror the blocks of `kiln.toml`: the package sets, at most
//! one per-ecosystem application block, the buildable OCI artifacts, config
//! file overlays, and external release definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by block-level validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
  #[error("artifact label must not be empty")]
  EmptyArtifactLabel,

  #[error("image name must not be empty")]
  EmptyImageName,

  #[error("imported config {reference} is not declared in any config block")]
  UnknownConfigReference { reference: String },

  #[error("multiple application blocks declared; at most one ecosystem can be active")]
  MultipleAppBlocks,
}

/// The root of the declarative build document.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub packages: Packages,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gomodule: Option<GoModule>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rustapp: Option<RustApp>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub poetryapp: Option<PoetryApp>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub npmapp: Option<NpmApp>,

  /// Buildable artifacts, in document order.
  #[serde(default, rename = "oci", skip_serializing_if = "Vec::is_empty")]
  pub oci_artifacts: Vec<OciArtifact>,

  /// Config file overlays artifacts can import.
  #[serde(default, rename = "config", skip_serializing_if = "Vec::is_empty")]
  pub config_files: Vec<ConfigFile>,

  #[serde(default, rename = "github_release", skip_serializing_if = "Vec::is_empty")]
  pub github_releases: Vec<GithubRelease>,
}

/// Which application ecosystem the document declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppKind {
  Go,
  Rust,
  Poetry,
  Npm,
}

impl AppKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Go => "gomodule",
      Self::Rust => "rustapp",
      Self::Poetry => "poetryapp",
      Self::Npm => "npmapp",
    }
  }
}

impl Config {
  /// The active application ecosystem, if any.
  ///
  /// At most one application block may be declared per document.
  pub fn app_kind(&self) -> Result<Option<AppKind>, ValidationError> {
    let mut found = None;
    let declared = [
      (self.gomodule.is_some(), AppKind::Go),
      (self.rustapp.is_some(), AppKind::Rust),
      (self.poetryapp.is_some(), AppKind::Poetry),
      (self.npmapp.is_some(), AppKind::Npm),
    ];

    for (present, kind) in declared {
      if !present {
        continue;
      }
      if found.is_some() {
        return Err(ValidationError::MultipleAppBlocks);
      }
      found = Some(kind);
    }

    Ok(found)
  }
}

/// Package sets resolved by the Builder.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packages {
  #[serde(default)]
  pub development: Vec<String>,
  #[serde(default)]
  pub runtime: Vec<String>,
}

/// A Go application built from the enclosing module.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoModule {
  pub name: String,
  pub src_path: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub ld_flags: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<String>,
  #[serde(default)]
  pub do_check: bool,
}

/// A Rust application built from the enclosing workspace.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RustApp {
  pub crate_name: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub rust_version: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub rust_channel: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub rust_profile: String,
  #[serde(default)]
  pub release: bool,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub extra_components: Vec<String>,
}

/// A Python application managed with poetry.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoetryApp {
  pub project_dir: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub python_version: String,
}

/// A Node application built from its package manifest.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpmApp {
  pub package_name: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub package_root: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub node_version: String,
}

/// One buildable OCI artifact.
///
/// `artifact` is the label used to select the block from the CLI; `name` is
/// the image reference the build produces, possibly `repo:tag`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct OciArtifact {
  pub artifact: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub cmd: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub entrypoint: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub env_vars: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub exposed_ports: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub import_configs: Vec<String>,
}

impl OciArtifact {
  /// Validate this block against the full document.
  ///
  /// Cross-references are checked here: every `import_configs` entry must
  /// name a declared config overlay.
  pub fn validate(&self, config: &Config) -> Result<(), ValidationError> {
    if self.artifact.is_empty() {
      return Err(ValidationError::EmptyArtifactLabel);
    }
    if self.name.is_empty() {
      return Err(ValidationError::EmptyImageName);
    }

    for reference in &self.import_configs {
      if !config.config_files.iter().any(|c| &c.name == reference) {
        return Err(ValidationError::UnknownConfigReference {
          reference: reference.clone(),
        });
      }
    }

    Ok(())
  }
}

/// A config file overlay copied into images that import it.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
  pub name: String,
  pub source: String,
  pub destination: String,
}

/// An external application pulled from a GitHub release.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubRelease {
  pub app: String,
  pub owner: String,
  pub repo: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub dir: String,
}
