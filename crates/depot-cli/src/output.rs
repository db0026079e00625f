//! Output formatting for CLI.

use console::{style, Term};
use depot_pm::MessageHandler;
use indicatif::ProgressBar;
use std::io::Write;
use std::sync::Mutex;

/// Verbosity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    Debug,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, 0) => Verbosity::Normal,
            (false, 1) => Verbosity::Verbose,
            (false, _) => Verbosity::Debug,
        }
    }

    /// Default `log` filter for this verbosity; `RUST_LOG` still wins.
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::Debug => "debug",
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Normal
    }
}

/// Output handler for CLI
///
/// Everything goes to stderr so stdout stays usable for `depot classpath`.
/// While a spinner is active, lines are printed above it.
pub struct Output {
    term: Term,
    verbosity: Verbosity,
    spinner: Mutex<Option<ProgressBar>>,
}

impl Output {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            term: Term::stderr(),
            verbosity,
            spinner: Mutex::new(None),
        }
    }

    fn should_output(&self, min_verbosity: Verbosity) -> bool {
        self.verbosity >= min_verbosity
    }

    fn print(&self, line: String) {
        let spinner = self.spinner.lock().ok().and_then(|s| s.clone());
        match spinner {
            Some(pb) => pb.suspend(|| {
                let _ = writeln!(&self.term, "{}", line);
            }),
            None => {
                let _ = writeln!(&self.term, "{}", line);
            }
        }
    }

    /// Route output around `pb` until [`Output::clear_spinner`].
    pub fn set_spinner(&self, pb: ProgressBar) {
        if let Ok(mut spinner) = self.spinner.lock() {
            *spinner = Some(pb);
        }
    }

    pub fn clear_spinner(&self) {
        if let Ok(mut spinner) = self.spinner.lock() {
            if let Some(pb) = spinner.take() {
                pb.finish_and_clear();
            }
        }
    }

    pub fn writeln(&self, message: &str) {
        if self.should_output(Verbosity::Normal) {
            self.print(message.to_string());
        }
    }

    /// Write a success message
    pub fn success(&self, message: &str) {
        if self.should_output(Verbosity::Normal) {
            self.print(style(message).green().to_string());
        }
    }

    /// Write a list item
    pub fn list_item(&self, prefix: &str, message: &str) {
        if self.should_output(Verbosity::Normal) {
            self.print(format!("  {} {}", style(prefix).green(), message));
        }
    }

    /// Write a warning message
    pub fn warning(&self, message: &str) {
        if self.should_output(Verbosity::Quiet) {
            self.print(format!("{} {}", style("Warning:").yellow().bold(), message));
        }
    }

    /// Write an error message
    pub fn error(&self, message: &str) {
        self.print(format!("{} {}", style("Error:").red().bold(), message));
    }

    /// Write a verbose message
    pub fn verbose(&self, message: &str) {
        if self.should_output(Verbosity::Verbose) {
            self.print(style(message).dim().to_string());
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new(Verbosity::Normal)
    }
}

impl MessageHandler for Output {
    fn info(&self, message: &str) {
        self.list_item("-", message);
    }

    fn warn(&self, message: &str) {
        self.warning(message);
    }

    fn error(&self, message: &str) {
        Output::error(self, message);
    }
}
