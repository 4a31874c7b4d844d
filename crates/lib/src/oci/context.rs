//! Docker context discovery.
//!
//! `docker context` records the selected context name in
//! `$DOCKER_CONFIG/config.json` and per-context endpoints under
//! `$DOCKER_CONFIG/contexts/meta/<id>/meta.json`. Discovery failures are
//! soft: a machine without any Docker config at all may still have a daemon
//! listening on the default socket, so the caller falls back instead of
//! failing — but it remembers that discovery failed, which drives the
//! "is Docker installed?" hint on a later load error.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Context name used when none is selected.
pub const DEFAULT_CONTEXT: &str = "default";

/// Daemon endpoint used when discovery finds nothing better.
pub const DEFAULT_HOST: &str = "unix:///var/run/docker.sock";

/// Errors that can occur during context discovery.
#[derive(Debug, Error)]
pub enum ContextError {
  #[error("docker config directory not found")]
  NoConfigDir,

  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to parse {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    source: serde_json::Error,
  },
}

#[derive(Debug, Deserialize)]
struct DockerConfig {
  #[serde(default, rename = "currentContext")]
  current_context: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContextMeta {
  #[serde(default)]
  name: String,
  #[serde(default)]
  endpoints: HashMap<String, EndpointMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EndpointMeta {
  #[serde(default)]
  host: String,
}

fn config_dir() -> Result<PathBuf, ContextError> {
  if let Ok(dir) = std::env::var("DOCKER_CONFIG") {
    return Ok(PathBuf::from(dir));
  }
  dirs::home_dir()
    .map(|home| home.join(".docker"))
    .ok_or(ContextError::NoConfigDir)
}

/// Name of the currently selected docker context.
///
/// An existing config file without a `currentContext` key yields an empty
/// string; the caller substitutes [`DEFAULT_CONTEXT`].
pub fn current_context() -> Result<String, ContextError> {
  let path = config_dir()?.join("config.json");

  let content = fs::read_to_string(&path).map_err(|source| ContextError::Read {
    path: path.clone(),
    source,
  })?;

  let config: DockerConfig =
    serde_json::from_str(&content).map_err(|source| ContextError::Parse { path, source })?;

  Ok(config.current_context)
}

/// Daemon endpoints for every known context, keyed by context name.
pub fn context_endpoints() -> Result<HashMap<String, String>, ContextError> {
  let meta_dir = config_dir()?.join("contexts").join("meta");

  let entries = fs::read_dir(&meta_dir).map_err(|source| ContextError::Read {
    path: meta_dir.clone(),
    source,
  })?;

  let mut endpoints = HashMap::new();

  for entry in entries {
    let entry = entry.map_err(|source| ContextError::Read {
      path: meta_dir.clone(),
      source,
    })?;
    let meta_path = entry.path().join("meta.json");
    if !meta_path.exists() {
      continue;
    }

    let content = fs::read_to_string(&meta_path).map_err(|source| ContextError::Read {
      path: meta_path.clone(),
      source,
    })?;
    let meta: ContextMeta = serde_json::from_str(&content).map_err(|source| {
      ContextError::Parse {
        path: meta_path,
        source,
      }
    })?;

    if let Some(docker) = meta.endpoints.get("docker") {
      endpoints.insert(meta.name, docker.host.clone());
    }
  }

  Ok(endpoints)
}

/// Resolve the daemon endpoint for the active context.
///
/// Returns the endpoint and whether discovery succeeded. Any discovery
/// failure falls back to [`DEFAULT_HOST`]; a context without a recorded
/// endpoint does too.
pub fn resolve_endpoint() -> (String, bool) {
  let mut discovered = true;

  let mut current = match current_context() {
    Ok(name) => name,
    Err(e) => {
      debug!(error = %e, "current context discovery failed");
      discovered = false;
      String::new()
    }
  };
  if current.is_empty() {
    current = DEFAULT_CONTEXT.to_string();
  }

  let endpoints = match context_endpoints() {
    Ok(map) => map,
    Err(e) => {
      debug!(error = %e, "context endpoint discovery failed");
      discovered = false;
      HashMap::new()
    }
  };

  let endpoint = endpoints
    .get(&current)
    .cloned()
    .unwrap_or_else(|| DEFAULT_HOST.to_string());

  (endpoint, discovered)
}
