//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output: colored status
//! messages and shared Unicode symbols. Errors and hints go to stderr,
//! everything else to stdout.

use owo_colors::{OwoColorize, Stream};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_progress(message: &str) {
  println!(
    "{} {}",
    "::".if_supports_color(Stream::Stdout, |s| s.cyan()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    format!("{} error:", symbols::ERROR).if_supports_color(Stream::Stderr, |s| s.red()),
    message
  );
}

pub fn print_hint(message: &str) {
  eprintln!(
    "{} {}",
    format!("{} hint:", symbols::ARROW).if_supports_color(Stream::Stderr, |s| s.yellow()),
    message
  );
}
