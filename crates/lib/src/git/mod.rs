//! Version-control bookkeeping.
//!
//! The pipeline stages the generated expression directory and keeps the
//! build output directory out of version control. Both operations go through
//! the `git` binary so repository discovery, excludes, and user config
//! behave exactly as they do on the command line.

use std::io;
use std::path::Path;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors that can occur during version-control bookkeeping.
#[derive(Debug, Error)]
pub enum GitError {
  #[error("failed to run git: {0}")]
  Spawn(#[source] io::Error),

  #[error("git add {path} failed: {stderr}")]
  Add { path: String, stderr: String },

  #[error("failed to update .gitignore: {0}")]
  Ignore(#[source] io::Error),
}

/// Stage `path` in the repository at `repo`.
pub async fn add(repo: &Path, path: &str) -> Result<(), GitError> {
  let output = Command::new("git")
    .arg("-C")
    .arg(repo)
    .args(["add", path])
    .output()
    .await
    .map_err(GitError::Spawn)?;

  if !output.status.success() {
    return Err(GitError::Add {
      path: path.to_string(),
      stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    });
  }

  debug!(path, "staged");
  Ok(())
}

/// Register `path` in the `.gitignore` at `repo`, creating the file when
/// needed. A path that is already listed is left alone.
pub async fn ignore(repo: &Path, path: &str) -> Result<(), GitError> {
  let gitignore = repo.join(".gitignore");

  let current = match tokio::fs::read_to_string(&gitignore).await {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
    Err(e) => return Err(GitError::Ignore(e)),
  };

  if current.lines().any(|line| line.trim() == path) {
    return Ok(());
  }

  let mut updated = current;
  if !updated.is_empty() && !updated.ends_with('\n') {
    updated.push('\n');
  }
  updated.push_str(path);
  updated.push('\n');

  tokio::fs::write(&gitignore, updated)
    .await
    .map_err(GitError::Ignore)?;

  debug!(path, "added to .gitignore");
  Ok(())
}
