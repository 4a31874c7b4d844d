//! Target platform identification and validation.
//!
//! A build platform is an `(os, arch)` pair written in the container
//! convention as `"os/arch"` (e.g. `linux/amd64`). Image builds support a
//! fixed set of platforms; anything else is rejected up front instead of
//! being handed to the Builder.

use std::fmt;

use thiserror::Error;

/// Platforms an image can be built for.
pub const SUPPORTED_PLATFORMS: [&str; 2] = ["linux/amd64", "linux/arm64"];

/// Errors that can occur while resolving a platform.
#[derive(Debug, Error)]
pub enum PlatformError {
  #[error(
    "platform {requested} is not supported. Supported platforms are {}",
    SUPPORTED_PLATFORMS.join(", ")
  )]
  Unsupported { requested: String },
}

/// A resolved build platform.
///
/// `pair` keeps the resolved string verbatim; `os` and `arch` are the split
/// components used for artifact generation. A requested platform is accepted
/// when it *contains* a supported pair as a substring, so `pair` may carry
/// extra qualifiers (e.g. `linux/amd64/v2`) that downstream attribute naming
/// treats as unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
  pub os: String,
  pub arch: String,
  pair: String,
}

impl Platform {
  /// Split an `"os/arch"` string into components, keeping it verbatim.
  pub fn parse(pair: &str) -> Self {
    let mut parts = pair.splitn(2, '/');
    let os = parts.next().unwrap_or_default().to_string();
    let arch = parts.next().unwrap_or_default().to_string();
    Self {
      os,
      arch,
      pair: pair.to_string(),
    }
  }

  /// The platform of the machine kiln is running on.
  pub fn host() -> Self {
    let os = match std::env::consts::OS {
      "macos" => "darwin",
      other => other,
    };
    let arch = match std::env::consts::ARCH {
      "x86_64" => "amd64",
      "aarch64" => "arm64",
      other => other,
    };
    Self::parse(&format!("{os}/{arch}"))
  }

  /// The resolved `"os/arch"` string, exactly as requested or detected.
  pub fn pair(&self) -> &str {
    &self.pair
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.pair)
  }
}

/// Resolve a requested platform string.
///
/// An empty request auto-detects the host platform. The result must contain
/// one of [`SUPPORTED_PLATFORMS`] as a substring; on mismatch the error
/// enumerates the supported set.
pub fn resolve(requested: &str) -> Result<Platform, PlatformError> {
  let pair = if requested.is_empty() {
    Platform::host().pair().to_string()
  } else {
    requested.to_string()
  };

  if !SUPPORTED_PLATFORMS.iter().any(|sp| pair.contains(sp)) {
    return Err(PlatformError::Unsupported { requested: pair });
  }

  Ok(Platform::parse(&pair))
}
