//! Terminal styling for CLI output
//!
//! Colors are always emitted; `anstream` strips them when stdout is not a
//! terminal or `NO_COLOR` is set.

use indicatif::ProgressStyle;
use owo_colors::OwoColorize;
use std::fmt::Display;

/// Check mark used for completed steps
pub const CHECK: &str = "✓";

/// Cross used for failed steps
pub const CROSS: &str = "✗";

/// Semantic styles for text
pub trait Stylize {
    /// De-emphasized text
    fn muted(&self) -> String;
    /// Headings and important names
    fn emphasis(&self) -> String;
    /// Values such as branch or package names
    fn accent(&self) -> String;
    /// Successful outcomes
    fn success(&self) -> String;
    /// Warnings and failures
    fn warn(&self) -> String;
}

impl<T: Display> Stylize for T {
    fn muted(&self) -> String {
        self.dimmed().to_string()
    }

    fn emphasis(&self) -> String {
        self.bold().to_string()
    }

    fn accent(&self) -> String {
        self.cyan().to_string()
    }

    fn success(&self) -> String {
        self.green().to_string()
    }

    fn warn(&self) -> String {
        self.yellow().to_string()
    }
}

/// Green check mark
pub fn check() -> String {
    CHECK.success()
}

/// Red cross
pub fn cross() -> String {
    CROSS.red().to_string()
}

/// Style for counted progress bars
pub fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}
