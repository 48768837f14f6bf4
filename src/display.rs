//! Console output for bootstrap runs
//!
//! Human-readable status lines only. Diagnostic detail goes through
//! `tracing`; this is what the workshop attendee reads.

use crate::cli::Verbosity;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Terminal status printer
#[derive(Debug, Clone)]
pub struct Console {
    verbosity: Verbosity,
    spinner: bool,
}

impl Console {
    /// Create a console for the given verbosity
    pub fn new(verbosity: Verbosity, spinner: bool, color: bool) -> Self {
        if !color {
            colored::control::set_override(false);
        }
        Self { verbosity, spinner }
    }

    /// Console that prints nothing but errors
    pub fn quiet() -> Self {
        Self {
            verbosity: Verbosity::Quiet,
            spinner: false,
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Announce a pipeline step
    pub fn step(&self, number: usize, total: usize, message: &str) {
        if self.verbosity.show_progress() {
            println!("{} {}", format!("[{}/{}]", number, total).cyan().bold(), message);
        }
    }

    /// Show an informational message
    pub fn info(&self, message: &str) {
        if self.verbosity.show_progress() {
            println!("      {}", message);
        }
    }

    /// Show detail only in verbose mode
    pub fn detail(&self, message: &str) {
        if self.verbosity.show_events() {
            println!("      {}", message.dimmed());
        }
    }

    /// Show a success message
    pub fn success(&self, message: &str) {
        if self.verbosity.show_progress() {
            println!("      {} {}", "✓".green(), message);
        }
    }

    /// Show a warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity.show_progress() {
            println!("      {} {}", "⚠".yellow(), message);
        }
    }

    /// Show an error message; never suppressed
    pub fn error(&self, message: &str) {
        eprintln!("{}: {}", "Error".red().bold(), message);
    }

    /// Final line of a run; printed even in quiet mode
    pub fn result(&self, message: &str) {
        println!("{}", message);
    }

    /// Start a spinner, hidden when progress is suppressed
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if !self.spinner || !self.verbosity.show_progress() {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("      {spinner:.cyan} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(Verbosity::Normal, true, true)
    }
}
