//! Configuration document handling.
//!
//! The document lives at the project root as `kiln.toml` and is the durable
//! store for everything the pipeline works on. Mutations are write-through:
//! the whole document is re-serialized and overwritten, so hand-written
//! formatting and comments are not preserved across a mutation.

mod types;

pub use types::*;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Name of the configuration document at the project root.
pub const CONFIG_FILENAME: &str = "kiln.toml";

/// Errors that can occur when working with the configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to write {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },

  #[error("failed to parse configuration: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("failed to serialize configuration: {0}")]
  Serialize(#[from] toml::ser::Error),
}

/// Load the configuration document from the given path.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
  let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
    path: path.to_path_buf(),
    source,
  })?;

  let config = toml::from_str(&content)?;
  Ok(config)
}

/// Serialize the configuration into document text.
pub fn to_document(config: &Config) -> Result<String, ConfigError> {
  let content = toml::to_string_pretty(config)?;
  Ok(content)
}

/// Serialize the configuration and overwrite the document at `path`.
pub fn store(config: &Config, path: &Path) -> Result<(), ConfigError> {
  let content = to_document(config)?;
  fs::write(path, content).map_err(|source| ConfigError::Write {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(())
}

/// Replace the artifact whose `name` equals `old_name` and persist the whole
/// document.
///
/// Only the first match in document order is updated. When nothing matches,
/// the document is left untouched and `Ok(false)` is returned; absence of a
/// match is not an error here.
pub fn replace_artifact(
  config: &mut Config,
  old_name: &str,
  artifact: OciArtifact,
  path: &Path,
) -> Result<bool, ConfigError> {
  let Some(slot) = config.oci_artifacts.iter_mut().find(|a| a.name == old_name) else {
    debug!(name = %old_name, "no artifact matched; document unchanged");
    return Ok(false);
  };

  *slot = artifact;
  store(config, path)?;
  Ok(true)
}

/// Split a `name@version` pin into its package name and optional version.
pub fn parse_package(pin: &str) -> (&str, Option<&str>) {
  match pin.split_once('@') {
    Some((name, version)) => (name, Some(version)),
    None => (pin, None),
  }
}

/// Merge new packages into the document text, preferring newly supplied pins
/// over existing pins of the same package.
pub fn add_packages(src: &str, packages: &Packages) -> Result<String, ConfigError> {
  let mut config: Config = toml::from_str(src)?;

  config.packages.development =
    prefer_new_pins(&config.packages.development, &packages.development);
  config.packages.runtime = prefer_new_pins(&config.packages.runtime, &packages.runtime);

  to_document(&config)
}

/// Replace the document text's package sets wholesale.
pub fn set_packages(src: &str, packages: &Packages) -> Result<String, ConfigError> {
  let mut config: Config = toml::from_str(src)?;
  config.packages = packages.clone();
  to_document(&config)
}

/// Combine pin lists: new pins first, then existing pins whose package name
/// is not shadowed by a new pin.
fn prefer_new_pins(existing: &[String], new: &[String]) -> Vec<String> {
  let mut merged: Vec<String> = new.to_vec();

  for pin in existing {
    let (name, _) = parse_package(pin);
    let shadowed = new.iter().any(|n| parse_package(n).0 == name);
    if !shadowed {
      merged.push(pin.clone());
    }
  }

  merged
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  const SAMPLE: &str = r#"
[packages]
development = ["rust@1.75.0", "gnumake@4.4"]
runtime = ["cacert"]

[rustapp]
crate_name = "svc"
release = true

[[oci]]
artifact = "svc"
name = "ghcr.io/acme/svc:latest"
cmd = ["/bin/svc"]

[[oci]]
artifact = "pkgs"
name = "ghcr.io/acme/base"
"#;

  #[test]
  fn load_parses_all_blocks() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILENAME);
    fs::write(&path, SAMPLE).unwrap();

    let config = load(&path).unwrap();

    assert_eq!(config.packages.development.len(), 2);
    assert_eq!(config.packages.runtime, vec!["cacert"]);
    assert_eq!(config.rustapp.as_ref().unwrap().crate_name, "svc");
    assert_eq!(config.oci_artifacts.len(), 2);
    assert_eq!(config.oci_artifacts[0].artifact, "svc");
    assert_eq!(config.oci_artifacts[1].name, "ghcr.io/acme/base");
  }

  #[test]
  fn load_missing_file_is_read_error() {
    let temp = TempDir::new().unwrap();
    let result = load(&temp.path().join(CONFIG_FILENAME));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
  }

  #[test]
  fn load_invalid_document_is_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILENAME);
    fs::write(&path, "packages = nonsense").unwrap();

    let result = load(&path);
    assert!(matches!(result, Err(ConfigError::Parse(_))));
  }

  #[test]
  fn store_and_load_roundtrip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILENAME);
    fs::write(&path, SAMPLE).unwrap();

    let config = load(&path).unwrap();
    store(&config, &path).unwrap();
    let reloaded = load(&path).unwrap();

    assert_eq!(config, reloaded);
  }

  #[test]
  fn replace_artifact_updates_first_match_and_persists() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILENAME);
    fs::write(&path, SAMPLE).unwrap();
    let mut config = load(&path).unwrap();

    let mut updated = config.oci_artifacts[0].clone();
    updated.name = "ghcr.io/acme/svc:v2".to_string();

    let replaced =
      replace_artifact(&mut config, "ghcr.io/acme/svc:latest", updated, &path).unwrap();
    assert!(replaced);

    let reloaded = load(&path).unwrap();
    assert_eq!(reloaded.oci_artifacts[0].name, "ghcr.io/acme/svc:v2");
    assert_eq!(reloaded.oci_artifacts[1].name, "ghcr.io/acme/base");
  }

  #[test]
  fn replace_artifact_no_match_leaves_document_untouched() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILENAME);
    fs::write(&path, SAMPLE).unwrap();
    let mut config = load(&path).unwrap();

    let replaced = replace_artifact(
      &mut config,
      "no-such-name",
      OciArtifact::default(),
      &path,
    )
    .unwrap();

    assert!(!replaced);
    let on_disk = fs::read_to_string(&path).unwrap();
    assert_eq!(on_disk, SAMPLE, "no-match mutation must not rewrite the document");
  }

  #[test]
  fn parse_package_splits_pins() {
    assert_eq!(parse_package("rust@1.75.0"), ("rust", Some("1.75.0")));
    assert_eq!(parse_package("cacert"), ("cacert", None));
  }

  #[test]
  fn add_packages_prefers_new_pins() {
    let packages = Packages {
      development: vec!["rust@1.79.0".to_string()],
      runtime: vec!["openssl@3.2".to_string()],
    };

    let updated = add_packages(SAMPLE, &packages).unwrap();
    let config: Config = toml::from_str(&updated).unwrap();

    // New rust pin shadows the old one; unrelated pins survive.
    assert!(config.packages.development.contains(&"rust@1.79.0".to_string()));
    assert!(!config.packages.development.contains(&"rust@1.75.0".to_string()));
    assert!(config.packages.development.contains(&"gnumake@4.4".to_string()));
    assert!(config.packages.runtime.contains(&"openssl@3.2".to_string()));
    assert!(config.packages.runtime.contains(&"cacert".to_string()));
  }

  #[test]
  fn set_packages_replaces_wholesale() {
    let packages = Packages {
      development: vec!["go@1.22".to_string()],
      runtime: vec![],
    };

    let updated = set_packages(SAMPLE, &packages).unwrap();
    let config: Config = toml::from_str(&updated).unwrap();

    assert_eq!(config.packages.development, vec!["go@1.22"]);
    assert!(config.packages.runtime.is_empty());
  }
}
