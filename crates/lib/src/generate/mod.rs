//! Ecosystem initializer generation.
//!
//! Renders the Builder expression directory (`kiln/`) from the Config Model:
//! a flake carrying the dev/runtime package sets and the `ociImages`
//! attribute set the Build Target Namer points at, plus the per-ecosystem
//! application expression when the document declares one. The directory is
//! regenerated on every run and is meant to be committed alongside the
//! document.

mod templates;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config::{Config, GoModule, NpmApp, PoetryApp, RustApp, ValidationError, parse_package};
use crate::target::PKGS_LABEL;

pub use templates::{
  FLAKE_TEMPLATE, GO_APP_TEMPLATE, NPM_APP_TEMPLATE, POETRY_APP_TEMPLATE, RUST_APP_TEMPLATE,
};

/// Name of the generated expression directory.
pub const EXPRESSION_DIR: &str = "kiln";

/// Errors that can occur during generation.
#[derive(Debug, Error)]
pub enum GenerateError {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: io::Error },

  #[error("failed to write {}: {source}", path.display())]
  WriteFile { path: PathBuf, source: io::Error },
}

/// Paths produced by a successful generation.
#[derive(Debug)]
pub struct Generated {
  pub dir: PathBuf,
  pub flake: PathBuf,
  pub app: Option<PathBuf>,
}

/// Render the expression directory under `base` from the document.
pub fn generate(config: &Config, base: &Path) -> Result<Generated, GenerateError> {
  let app_kind = config.app_kind()?;

  let dir = base.join(EXPRESSION_DIR);
  fs::create_dir_all(&dir).map_err(|source| GenerateError::CreateDir {
    path: dir.clone(),
    source,
  })?;

  let app = match render_app(config) {
    Some(content) => {
      let path = dir.join("app.nix");
      fs::write(&path, content).map_err(|source| GenerateError::WriteFile {
        path: path.clone(),
        source,
      })?;
      Some(path)
    }
    None => None,
  };

  let flake = dir.join("flake.nix");
  let content = render_flake(config, app_kind.is_some());
  fs::write(&flake, content).map_err(|source| GenerateError::WriteFile {
    path: flake.clone(),
    source,
  })?;

  debug!(dir = %dir.display(), app = app_kind.map(|k| k.as_str()).unwrap_or("none"), "expressions generated");
  Ok(Generated { dir, flake, app })
}

fn render_flake(config: &Config, has_app: bool) -> String {
  let app_binding = if has_app {
    "app = import ./app.nix { inherit pkgs; };"
  } else {
    "app = null;"
  };

  FLAKE_TEMPLATE
    .replace("{dev_packages}", &attr_list(&config.packages.development))
    .replace("{runtime_packages}", &attr_list(&config.packages.runtime))
    .replace("{app_binding}", app_binding)
    .replace("{image_attrs}", &image_attrs(config, has_app))
}

/// Strip version pins and join package names for a nix list.
fn attr_list(pins: &[String]) -> String {
  pins
    .iter()
    .map(|pin| parse_package(pin).0)
    .collect::<Vec<_>>()
    .join(" ")
}

/// The attribute set every generated flake exposes per system: the two base
/// package set variants, plus the two application variants for each declared
/// artifact.
fn image_attrs(config: &Config, has_app: bool) -> String {
  let indent = "          ";
  let mut attrs = vec![
    format!("{indent}ociImage_{PKGS_LABEL}_runtime-as-dir = imageFor \"{PKGS_LABEL}\" runtimePackages;"),
    format!("{indent}ociImage_{PKGS_LABEL}_dev-as-dir = imageFor \"{PKGS_LABEL}\" devPackages;"),
  ];

  let app_part = if has_app { " ++ [ app ]" } else { "" };
  for artifact in &config.oci_artifacts {
    if artifact.artifact == PKGS_LABEL {
      continue;
    }
    attrs.push(format!(
      "{indent}ociImage_{label}_app-as-dir = imageFor \"{name}\" (runtimePackages{app_part});",
      label = artifact.artifact,
      name = artifact.name,
    ));
    attrs.push(format!(
      "{indent}ociImage_{label}_app_with_dev-as-dir = imageFor \"{name}\" (devPackages{app_part});",
      label = artifact.artifact,
      name = artifact.name,
    ));
  }

  attrs.join("\n")
}

fn render_app(config: &Config) -> Option<String> {
  if let Some(app) = &config.rustapp {
    return Some(render_rust_app(app));
  }
  if let Some(app) = &config.gomodule {
    return Some(render_go_app(app));
  }
  if let Some(app) = &config.poetryapp {
    return Some(render_poetry_app(app));
  }
  config.npmapp.as_ref().map(render_npm_app)
}

fn render_rust_app(app: &RustApp) -> String {
  let mut attrs = vec![format!("    release = {};", app.release)];
  if !app.rust_version.is_empty() {
    attrs.push(format!("    rustVersion = \"{}\";", app.rust_version));
  }
  if !app.rust_channel.is_empty() {
    attrs.push(format!("    rustChannel = \"{}\";", app.rust_channel));
  }
  if !app.rust_profile.is_empty() {
    attrs.push(format!("    rustProfile = \"{}\";", app.rust_profile));
  }
  if !app.extra_components.is_empty() {
    attrs.push(format!(
      "    extraRustComponents = [ {} ];",
      quoted_list(&app.extra_components)
    ));
  }

  RUST_APP_TEMPLATE
    .replace("{attrs}", &attrs.join("\n"))
    .replace("{crate_name}", &app.crate_name)
}

fn render_go_app(app: &GoModule) -> String {
  let mut attrs = vec![format!("  doCheck = {};", app.do_check)];
  if !app.ld_flags.is_empty() {
    attrs.push(format!("  ldflags = [ {} ];", quoted_list(&app.ld_flags)));
  }
  if !app.tags.is_empty() {
    attrs.push(format!("  tags = [ {} ];", quoted_list(&app.tags)));
  }

  GO_APP_TEMPLATE
    .replace("{name}", &app.name)
    .replace("{src_path}", &app.src_path)
    .replace("{attrs}", &attrs.join("\n"))
}

fn render_poetry_app(app: &PoetryApp) -> String {
  let attrs = if app.python_version.is_empty() {
    String::new()
  } else {
    format!("  python = pkgs.python{};", app.python_version.replace('.', ""))
  };

  POETRY_APP_TEMPLATE
    .replace("{project_dir}", &app.project_dir)
    .replace("{attrs}", &attrs)
}

fn render_npm_app(app: &NpmApp) -> String {
  let root = if app.package_root.is_empty() {
    "."
  } else {
    &app.package_root
  };

  NPM_APP_TEMPLATE
    .replace("{package_name}", &app.package_name)
    .replace("{package_root}", root)
}

fn quoted_list(items: &[String]) -> String {
  items
    .iter()
    .map(|item| format!("\"{item}\""))
    .collect::<Vec<_>>()
    .join(" ")
}
