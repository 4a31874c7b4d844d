//! Build attribute naming.
//!
//! Maps the selected artifact label, the resolved platform, and the
//! development-dependency switch onto the fully-qualified attribute the
//! Builder realizes. The mapping is pure and total: a platform outside the
//! two known systems yields the literal `unknown` architecture segment
//! instead of defaulting to the host, and the Builder rejects the resulting
//! attribute downstream.

use crate::generate::EXPRESSION_DIR;

/// Artifact label reserved for the base package set image.
pub const PKGS_LABEL: &str = "pkgs";

/// Architecture segment for platforms with no known system mapping.
pub const UNKNOWN_ARCH: &str = "unknown";

/// Map an `"os/arch"` platform onto the Builder's system architecture.
pub fn arch_segment(platform: &str) -> &'static str {
  match platform {
    "linux/amd64" => "x86_64-linux",
    "linux/arm64" => "aarch64-linux",
    _ => UNKNOWN_ARCH,
  }
}

/// The fully-qualified build attribute for `label` on `platform`.
///
/// The `pkgs` label selects between the base package set variants; every
/// other label selects between the application variants. The shape is
/// `kiln/.#ociImages.<arch>.ociImage_<label>_<suffix>`, matching the
/// attribute set the generated flake exposes.
pub fn oci_attr(label: &str, platform: &str, dev_deps: bool) -> String {
  let arch = arch_segment(platform);
  let base = format!("{EXPRESSION_DIR}/.#ociImages.{arch}.ociImage_{label}_");

  let suffix = if label == PKGS_LABEL {
    if dev_deps { "dev-as-dir" } else { "runtime-as-dir" }
  } else if dev_deps {
    "app_with_dev-as-dir"
  } else {
    "app-as-dir"
  };

  base + suffix
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn arch_segment_maps_known_platforms() {
    assert_eq!(arch_segment("linux/amd64"), "x86_64-linux");
    assert_eq!(arch_segment("linux/arm64"), "aarch64-linux");
  }

  #[test]
  fn arch_segment_is_exact_match_only() {
    // Resolution accepts extra qualifiers by containment; naming does not.
    assert_eq!(arch_segment("linux/amd64/v2"), UNKNOWN_ARCH);
    assert_eq!(arch_segment("windows/amd64"), UNKNOWN_ARCH);
    assert_eq!(arch_segment(""), UNKNOWN_ARCH);
  }

  #[test]
  fn pkgs_runtime_attr() {
    assert_eq!(
      oci_attr("pkgs", "linux/amd64", false),
      "kiln/.#ociImages.x86_64-linux.ociImage_pkgs_runtime-as-dir"
    );
  }

  #[test]
  fn pkgs_dev_attr() {
    assert_eq!(
      oci_attr("pkgs", "linux/arm64", true),
      "kiln/.#ociImages.aarch64-linux.ociImage_pkgs_dev-as-dir"
    );
  }

  #[test]
  fn app_attr_variants() {
    assert_eq!(
      oci_attr("svc", "linux/amd64", false),
      "kiln/.#ociImages.x86_64-linux.ociImage_svc_app-as-dir"
    );
    assert_eq!(
      oci_attr("svc", "linux/amd64", true),
      "kiln/.#ociImages.x86_64-linux.ociImage_svc_app_with_dev-as-dir"
    );
  }

  #[test]
  fn unknown_platform_still_names_an_attr() {
    let attr = oci_attr("svc", "plan9/mips", false);
    assert!(attr.contains(".unknown."), "sentinel must be visible: {attr}");
  }
}
