//! External Builder invocation.
//!
//! Dependency resolution and package builds are delegated to the `nix` CLI.
//! This module owns the two calls the pipeline makes: realizing the build
//! attribute into an output link, and querying the runtime closure of the
//! built result. Both are blocking from the pipeline's point of view; nix
//! itself handles caching and retries.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Name of the result symlink inside the output directory.
pub const RESULT_LINK: &str = "result";

/// Errors that can occur while driving the Builder.
#[derive(Debug, Error)]
pub enum BuilderError {
  #[error("failed to spawn nix: {0}")]
  Spawn(#[source] io::Error),

  #[error("build of {attr} failed: {stderr}")]
  Build { attr: String, stderr: String },

  #[error("closure query for {path} failed: {stderr}")]
  Closure { path: String, stderr: String },

  #[error("failed to parse closure output: {0}")]
  ParseClosure(#[source] serde_json::Error),
}

/// Details of the application a closure was resolved for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppDetails {
  pub name: String,
}

/// One store path in the runtime closure.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureNode {
  pub path: String,
  #[serde(default)]
  pub nar_size: u64,
  #[serde(default)]
  pub references: Vec<String>,
}

/// The runtime dependency closure of a built artifact.
///
/// The graph is treated as opaque: the pipeline only sizes it and hands it
/// to artifact generation.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeClosure {
  pub nodes: Vec<ClosureNode>,
}

impl RuntimeClosure {
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Total NAR size of every store path in the closure, in bytes.
  pub fn total_nar_size(&self) -> u64 {
    self.nodes.iter().map(|node| node.nar_size).sum()
  }
}

/// Realize `attr` and link the build result at `out_link`.
pub async fn build(out_link: &Path, attr: &str) -> Result<(), BuilderError> {
  info!(attr, out_link = %out_link.display(), "invoking builder");

  let output = Command::new("nix")
    .args(["build", "--extra-experimental-features", "nix-command flakes"])
    .arg("--out-link")
    .arg(out_link)
    .arg(attr)
    .output()
    .await
    .map_err(BuilderError::Spawn)?;

  if !output.status.success() {
    return Err(BuilderError::Build {
      attr: attr.to_string(),
      stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    });
  }

  debug!(attr, "builder finished");
  Ok(())
}

/// Fetch the runtime dependency closure of the build result in `output`.
pub async fn runtime_closure(
  app_name: &str,
  output_dir: &Path,
) -> Result<(AppDetails, RuntimeClosure), BuilderError> {
  let result_path = output_dir.join(RESULT_LINK);
  debug!(app = app_name, path = %result_path.display(), "querying runtime closure");

  let output = Command::new("nix")
    .args([
      "path-info",
      "--extra-experimental-features",
      "nix-command flakes",
      "--recursive",
      "--json",
    ])
    .arg(&result_path)
    .output()
    .await
    .map_err(BuilderError::Spawn)?;

  if !output.status.success() {
    return Err(BuilderError::Closure {
      path: result_path.display().to_string(),
      stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    });
  }

  let stdout = String::from_utf8_lossy(&output.stdout);
  let closure = parse_closure(&stdout)?;

  info!(app = app_name, paths = closure.len(), "runtime closure resolved");
  Ok((
    AppDetails {
      name: app_name.to_string(),
    },
    closure,
  ))
}

/// Parse `nix path-info --json` output.
///
/// Older nix versions emit an array of objects with a `path` field; newer
/// ones emit an object keyed by store path. Both shapes normalize into the
/// same closure.
fn parse_closure(json: &str) -> Result<RuntimeClosure, BuilderError> {
  let value: serde_json::Value =
    serde_json::from_str(json).map_err(BuilderError::ParseClosure)?;

  let mut nodes = Vec::new();

  match value {
    serde_json::Value::Array(entries) => {
      for entry in entries {
        nodes.push(node_from_entry(None, &entry));
      }
    }
    serde_json::Value::Object(map) => {
      for (path, entry) in map {
        nodes.push(node_from_entry(Some(path), &entry));
      }
    }
    _ => {}
  }

  Ok(RuntimeClosure { nodes })
}

fn node_from_entry(path: Option<String>, entry: &serde_json::Value) -> ClosureNode {
  let path = path.unwrap_or_else(|| {
    entry
      .get("path")
      .and_then(|p| p.as_str())
      .unwrap_or_default()
      .to_string()
  });

  let nar_size = entry
    .get("narSize")
    .and_then(|s| s.as_u64())
    .unwrap_or_default();

  let references = entry
    .get("references")
    .and_then(|r| r.as_array())
    .map(|refs| {
      refs
        .iter()
        .filter_map(|r| r.as_str())
        .map(str::to_string)
        .collect()
    })
    .unwrap_or_default();

  ClosureNode {
    path,
    nar_size,
    references,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_closure_array_shape() {
    let json = r#"[
      { "path": "/nix/store/aaa-svc", "narSize": 100, "references": ["/nix/store/bbb-libc"] },
      { "path": "/nix/store/bbb-libc", "narSize": 200 }
    ]"#;

    let closure = parse_closure(json).unwrap();

    assert_eq!(closure.len(), 2);
    assert_eq!(closure.total_nar_size(), 300);
    assert_eq!(closure.nodes[0].references, vec!["/nix/store/bbb-libc"]);
  }

  #[test]
  fn parse_closure_map_shape() {
    let json = r#"{
      "/nix/store/aaa-svc": { "narSize": 100, "references": [] },
      "/nix/store/bbb-libc": { "narSize": 200 }
    }"#;

    let closure = parse_closure(json).unwrap();

    assert_eq!(closure.len(), 2);
    assert_eq!(closure.total_nar_size(), 300);
    assert!(closure.nodes.iter().any(|n| n.path == "/nix/store/aaa-svc"));
  }

  #[test]
  fn parse_closure_invalid_json_is_error() {
    let result = parse_closure("not json");
    assert!(matches!(result, Err(BuilderError::ParseClosure(_))));
  }

  #[test]
  fn empty_closure_sizes_to_zero() {
    let closure = parse_closure("[]").unwrap();
    assert!(closure.is_empty());
    assert_eq!(closure.total_nar_size(), 0);
  }
}
