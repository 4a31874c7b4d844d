//! CLI integration tests for the oci command.
//!
//! These cover the paths that need no external tooling: argument handling,
//! document loading, selection errors, tag mutation, and both Dockerfile
//! patch outcomes. Anything past workspace preparation needs the Builder
//! and is out of reach here.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the kiln binary.
fn kiln_cmd() -> Command {
  cargo_bin_cmd!("kiln")
}

/// Create a temp project directory with a kiln.toml.
fn temp_project(config: &str) -> TempDir {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("kiln.toml"), config).unwrap();
  temp
}

const CONFIG: &str = r#"
[packages]
development = ["rust@1.75.0"]
runtime = ["cacert"]

[[oci]]
artifact = "svc"
name = "ghcr.io/acme/svc:latest"

[[oci]]
artifact = "worker"
name = "ghcr.io/acme/worker"
"#;

const DOCKERFILE: &str = "FROM ghcr.io/acme/base:v1\nRUN true\n";

#[test]
fn oci_requires_artifact_argument() {
  let temp = TempDir::new().unwrap();

  kiln_cmd()
    .current_dir(temp.path())
    .arg("oci")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Usage"));
}

#[test]
fn oci_fails_without_document() {
  let temp = TempDir::new().unwrap();

  kiln_cmd()
    .current_dir(temp.path())
    .args(["oci", "svc", "--platform", "linux/amd64"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn oci_unknown_artifact_lists_valid_labels() {
  let temp = temp_project(CONFIG);

  kiln_cmd()
    .current_dir(temp.path())
    .args(["oci", "ghost", "--platform", "linux/amd64"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("svc, worker"));
}

#[test]
fn oci_rejects_unsupported_platform() {
  let temp = temp_project(CONFIG);

  kiln_cmd()
    .current_dir(temp.path())
    .args(["oci", "svc", "--platform", "windows/amd64"])
    .assert()
    .failure()
    .stderr(
      predicate::str::contains("linux/amd64").and(predicate::str::contains("linux/arm64")),
    );
}

#[test]
fn oci_surfaces_first_invalid_block() {
  let config = r#"
[[oci]]
artifact = "broken"
name = "ghcr.io/acme/broken"
import_configs = ["missing"]

[[oci]]
artifact = "svc"
name = "ghcr.io/acme/svc:latest"
"#;
  let temp = temp_project(config);

  kiln_cmd()
    .current_dir(temp.path())
    .args(["oci", "svc", "--platform", "linux/amd64"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("is invalid"));
}

#[test]
fn df_swap_without_tag_prints_hint() {
  let temp = temp_project(CONFIG);
  std::fs::write(temp.path().join("Dockerfile"), DOCKERFILE).unwrap();

  kiln_cmd()
    .current_dir(temp.path())
    .args(["oci", "svc", "--platform", "linux/amd64", "--df-swap"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("use the --tag flag"));

  let dockerfile = std::fs::read_to_string(temp.path().join("Dockerfile")).unwrap();
  assert_eq!(dockerfile, DOCKERFILE, "no tag means no mutation");
}

#[test]
fn df_swap_with_tag_rewrites_and_exits_nonzero() {
  let temp = temp_project(CONFIG);
  std::fs::write(temp.path().join("Dockerfile"), DOCKERFILE).unwrap();

  kiln_cmd()
    .current_dir(temp.path())
    .args([
      "oci",
      "svc",
      "--platform",
      "linux/amd64",
      "--df-swap",
      "--tag",
      "v2",
    ])
    .assert()
    .failure()
    .stdout(predicate::str::contains("Dockerfile updated"));

  let dockerfile = std::fs::read_to_string(temp.path().join("Dockerfile")).unwrap();
  assert!(dockerfile.contains("ghcr.io/acme/base:v2"));
}

#[test]
fn tag_override_rewrites_document() {
  let temp = temp_project(CONFIG);

  // The temp dir is not a git repository, so the run fails during workspace
  // preparation; the tag mutation is write-through and must already be
  // visible on disk.
  kiln_cmd()
    .current_dir(temp.path())
    .args([
      "oci",
      "svc",
      "--platform",
      "linux/amd64",
      "--tag",
      "v2",
    ])
    .assert()
    .failure();

  let document = std::fs::read_to_string(temp.path().join("kiln.toml")).unwrap();
  assert!(document.contains("ghcr.io/acme/svc:v2"));
  assert!(!document.contains("ghcr.io/acme/svc:latest"));
}
