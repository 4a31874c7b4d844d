//! Template content for the generated expression directory.

/// Template for the generated flake.
///
/// Placeholders: `{dev_packages}`, `{runtime_packages}`, `{app_binding}`,
/// `{image_attrs}`.
pub const FLAKE_TEMPLATE: &str = r#"{
  description = "Build expressions generated by kiln";

  inputs = {
    nixpkgs.url = "github:NixOS/nixpkgs/nixos-24.05";
  };

  outputs = { self, nixpkgs }:
    let
      systems = [ "x86_64-linux" "aarch64-linux" ];
      forSystem = system:
        let
          pkgs = import nixpkgs { inherit system; };
          devPackages = with pkgs; [ {dev_packages} ];
          runtimePackages = with pkgs; [ {runtime_packages} ];
          {app_binding}
          imageFor = name: contents: pkgs.dockerTools.buildLayeredImage {
            inherit name contents;
          };
        in {
{image_attrs}
        };
    in {
      ociImages = nixpkgs.lib.genAttrs systems forSystem;
    };
}
"#;

/// Template for a Rust application expression.
///
/// Placeholders: `{attrs}`, `{crate_name}`.
pub const RUST_APP_TEMPLATE: &str = r#"{ pkgs }:
let
  rustPkgs = pkgs.rustBuilder.makePackageSet {
    packageFun = import ./Cargo.nix;
{attrs}
  };
in
(rustPkgs.workspace.{crate_name} { }).bin
"#;

/// Template for a Go application expression.
///
/// Placeholders: `{name}`, `{src_path}`, `{attrs}`.
pub const GO_APP_TEMPLATE: &str = r#"{ pkgs }:
pkgs.buildGoModule {
  pname = "{name}";
  version = "unstable";
  src = ../{src_path};
  vendorHash = null;
{attrs}
}
"#;

/// Template for a poetry application expression.
///
/// Placeholders: `{project_dir}`, `{attrs}`.
pub const POETRY_APP_TEMPLATE: &str = r#"{ pkgs }:
pkgs.poetry2nix.mkPoetryApplication {
  projectDir = ../{project_dir};
{attrs}
}
"#;

/// Template for an npm application expression.
///
/// Placeholders: `{package_name}`, `{package_root}`.
pub const NPM_APP_TEMPLATE: &str = r#"{ pkgs }:
pkgs.buildNpmPackage {
  pname = "{package_name}";
  version = "unstable";
  src = ../{package_root};
  npmDepsHash = "";
}
"#;
