//! Dockerfile base-image retagging.
//!
//! This is the alternate terminal branch of the `oci` command: instead of
//! building anything, the Dockerfile in the requested directory gets its
//! `FROM` tags swapped for the supplied tag, and the pipeline stops there.
//!
//! Only references that already carry a tag are touched. Digest-pinned
//! references (`@sha256:...`) and untagged images are left alone, as is
//! everything else on the line (stage names, platform flags).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

/// File name looked up inside the requested directory.
pub const DOCKERFILE_NAME: &str = "Dockerfile";

/// Errors that can occur while patching a Dockerfile.
#[derive(Debug, Error)]
pub enum DockerfileError {
  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to write {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },
}

/// Summary of a patch run.
#[derive(Debug, Clone)]
pub struct PatchSummary {
  /// The Dockerfile that was rewritten.
  pub path: PathBuf,
  /// How many base-image references were retagged.
  pub retagged: usize,
}

/// Rewrite base-image tags in the Dockerfile under `dir`.
///
/// With `dev_only`, only images whose repository component ends in `-dev`
/// are retagged; otherwise every tagged `FROM` reference is.
pub fn patch(dir: &Path, tag: &str, dev_only: bool) -> Result<PatchSummary, DockerfileError> {
  let path = dir.join(DOCKERFILE_NAME);

  let content = fs::read_to_string(&path).map_err(|source| DockerfileError::Read {
    path: path.clone(),
    source,
  })?;

  let (lines, retagged) = retag_lines(&content, tag, dev_only);

  fs::write(&path, lines.join("\n")).map_err(|source| DockerfileError::Write {
    path: path.clone(),
    source,
  })?;

  info!(path = %path.display(), retagged, "dockerfile updated");
  Ok(PatchSummary { path, retagged })
}

/// Retag `FROM` lines, returning the rewritten lines and the number of
/// references changed.
fn retag_lines(content: &str, tag: &str, dev_only: bool) -> (Vec<String>, usize) {
  let mut retagged = 0;

  let lines = content
    .lines()
    .map(|line| match retag_from_line(line, tag, dev_only) {
      Some(rewritten) => {
        retagged += 1;
        rewritten
      }
      None => line.to_string(),
    })
    .collect();

  (lines, retagged)
}

/// Rewrite a single line if it is a `FROM` line with a retaggable image.
fn retag_from_line(line: &str, tag: &str, dev_only: bool) -> Option<String> {
  let trimmed = line.trim_start();
  let mut tokens = trimmed.split_whitespace();

  if !tokens.next()?.eq_ignore_ascii_case("FROM") {
    return None;
  }

  // Skip flags like --platform=... to find the image reference.
  let image = tokens.find(|token| !token.starts_with("--"))?;

  let new_image = retag_reference(image, tag, dev_only)?;
  Some(line.replacen(image, &new_image, 1))
}

/// Apply `tag` to an image reference, if it qualifies.
fn retag_reference(image: &str, tag: &str, dev_only: bool) -> Option<String> {
  // Digest-pinned references are immutable on purpose.
  if image.contains('@') {
    return None;
  }

  let (repo, old_tag) = image.rsplit_once(':')?;
  // A ':' inside the last path segment boundary could be a registry port;
  // tags never contain '/'.
  if old_tag.contains('/') {
    return None;
  }

  if dev_only {
    let repo_component = repo.rsplit('/').next().unwrap_or(repo);
    if !repo_component.ends_with("-dev") {
      return None;
    }
  }

  Some(format!("{repo}:{tag}"))
}
