//! Project-type detection.
//!
//! Inspects a directory for well-known manifest files to work out which
//! ecosystem the checked-out project belongs to. Workspace preparation uses
//! this to cross-check the configured application block against what is
//! actually on disk; a mismatch is worth a warning but never blocks a build.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::AppKind;

/// The ecosystem a project was detected as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
  GoModule,
  RustCrate,
  PoetryProject,
  NpmPackage,
  Unknown,
}

impl ProjectKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::GoModule => "go module",
      Self::RustCrate => "rust crate",
      Self::PoetryProject => "poetry project",
      Self::NpmPackage => "npm package",
      Self::Unknown => "unknown",
    }
  }

  /// Whether a configured application block matches this detection.
  pub fn matches(&self, kind: AppKind) -> bool {
    matches!(
      (self, kind),
      (Self::GoModule, AppKind::Go)
        | (Self::RustCrate, AppKind::Rust)
        | (Self::PoetryProject, AppKind::Poetry)
        | (Self::NpmPackage, AppKind::Npm)
    )
  }
}

/// Details of the detected project.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProjectDetails {
  /// Project name as declared in its manifest, when present.
  pub name: String,
}

/// Errors that can occur during detection.
#[derive(Debug, Error)]
pub enum DetectError {
  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },
}

/// Detect the ecosystem of the project in `dir`.
///
/// Manifest files are checked in a fixed order; the first match wins. A
/// manifest that exists but cannot be interpreted still detects the
/// ecosystem, just without a project name.
pub fn detect(dir: &Path) -> Result<(ProjectKind, ProjectDetails), DetectError> {
  let go_mod = dir.join("go.mod");
  if go_mod.exists() {
    let content = read(&go_mod)?;
    return Ok((ProjectKind::GoModule, ProjectDetails { name: go_module_name(&content) }));
  }

  let cargo_toml = dir.join("Cargo.toml");
  if cargo_toml.exists() {
    let content = read(&cargo_toml)?;
    return Ok((ProjectKind::RustCrate, ProjectDetails { name: cargo_package_name(&content) }));
  }

  let pyproject = dir.join("pyproject.toml");
  if pyproject.exists() {
    let content = read(&pyproject)?;
    return Ok((
      ProjectKind::PoetryProject,
      ProjectDetails { name: pyproject_name(&content) },
    ));
  }

  let package_json = dir.join("package.json");
  if package_json.exists() {
    let content = read(&package_json)?;
    return Ok((
      ProjectKind::NpmPackage,
      ProjectDetails { name: package_json_name(&content) },
    ));
  }

  Ok((ProjectKind::Unknown, ProjectDetails::default()))
}

fn read(path: &Path) -> Result<String, DetectError> {
  fs::read_to_string(path).map_err(|source| DetectError::Read {
    path: path.to_path_buf(),
    source,
  })
}

fn go_module_name(content: &str) -> String {
  content
    .lines()
    .find_map(|line| line.strip_prefix("module"))
    .map(|rest| rest.trim().to_string())
    .unwrap_or_default()
}

fn cargo_package_name(content: &str) -> String {
  let Ok(value) = content.parse::<toml::Value>() else {
    return String::new();
  };
  value
    .get("package")
    .and_then(|p| p.get("name"))
    .and_then(|n| n.as_str())
    .unwrap_or_default()
    .to_string()
}

fn pyproject_name(content: &str) -> String {
  let Ok(value) = content.parse::<toml::Value>() else {
    return String::new();
  };
  // PEP 621 [project] first, then the poetry tool table.
  value
    .get("project")
    .and_then(|p| p.get("name"))
    .or_else(|| {
      value
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("name"))
    })
    .and_then(|n| n.as_str())
    .unwrap_or_default()
    .to_string()
}

fn package_json_name(content: &str) -> String {
  let Ok(value) = serde_json::from_str::<serde_json::Value>(content) else {
    return String::new();
  };
  value
    .get("name")
    .and_then(|n| n.as_str())
    .unwrap_or_default()
    .to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn detects_go_module_with_name() {
    let temp = TempDir::new().unwrap();
    fs::write(
      temp.path().join("go.mod"),
      "module github.com/acme/svc\n\ngo 1.22\n",
    )
    .unwrap();

    let (kind, details) = detect(temp.path()).unwrap();
    assert_eq!(kind, ProjectKind::GoModule);
    assert_eq!(details.name, "github.com/acme/svc");
  }

  #[test]
  fn detects_rust_crate_with_name() {
    let temp = TempDir::new().unwrap();
    fs::write(
      temp.path().join("Cargo.toml"),
      "[package]\nname = \"svc\"\nversion = \"0.1.0\"\n",
    )
    .unwrap();

    let (kind, details) = detect(temp.path()).unwrap();
    assert_eq!(kind, ProjectKind::RustCrate);
    assert_eq!(details.name, "svc");
  }

  #[test]
  fn detects_poetry_project() {
    let temp = TempDir::new().unwrap();
    fs::write(
      temp.path().join("pyproject.toml"),
      "[tool.poetry]\nname = \"svc\"\n",
    )
    .unwrap();

    let (kind, details) = detect(temp.path()).unwrap();
    assert_eq!(kind, ProjectKind::PoetryProject);
    assert_eq!(details.name, "svc");
  }

  #[test]
  fn detects_npm_package() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("package.json"), r#"{ "name": "svc" }"#).unwrap();

    let (kind, details) = detect(temp.path()).unwrap();
    assert_eq!(kind, ProjectKind::NpmPackage);
    assert_eq!(details.name, "svc");
  }

  #[test]
  fn empty_directory_is_unknown() {
    let temp = TempDir::new().unwrap();
    let (kind, details) = detect(temp.path()).unwrap();
    assert_eq!(kind, ProjectKind::Unknown);
    assert!(details.name.is_empty());
  }

  #[test]
  fn unparseable_manifest_still_detects_kind() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("Cargo.toml"), "not [ valid toml").unwrap();

    let (kind, details) = detect(temp.path()).unwrap();
    assert_eq!(kind, ProjectKind::RustCrate);
    assert!(details.name.is_empty());
  }

  #[test]
  fn matches_links_detection_to_app_blocks() {
    assert!(ProjectKind::RustCrate.matches(AppKind::Rust));
    assert!(!ProjectKind::RustCrate.matches(AppKind::Go));
    assert!(!ProjectKind::Unknown.matches(AppKind::Npm));
  }
}
