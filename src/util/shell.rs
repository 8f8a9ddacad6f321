//! Console status output.
//!
//! All user-facing status lines go through [`Shell`], which handles
//! color detection and the aligned status prefixes. Raw command output
//! is the [`Runner`](crate::util::runner::Runner)'s business, not ours.

use std::fmt::Display;
use std::io::{self, IsTerminal};

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Finished,
    Info,
    Warning,
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Finished => "Finished",
            Status::Info => "Info",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            // Success: bold green
            Status::Finished => "\x1b[1;32m",
            // Info: bold blue
            Status::Info => "\x1b[1;34m",
            // Warning: bold yellow
            Status::Warning => "\x1b[1;33m",
            // Error: bold red
            Status::Error => "\x1b[1;31m",
        }
    }
}

/// Width for status prefix alignment.
const STATUS_WIDTH: usize = 12;

/// Central shell for status output, written to stderr.
#[derive(Debug)]
pub struct Shell {
    verbose: bool,
    use_color: bool,
}

impl Shell {
    /// Create a new shell.
    pub fn new(verbose: bool, color: ColorChoice) -> Shell {
        let use_color = match color {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };
        Shell { verbose, use_color }
    }

    /// Check if verbose output is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if colors are enabled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print a status message, format `{status:>12} {message}`.
    pub fn status(&self, status: Status, msg: impl Display) {
        eprintln!("{} {}", self.format_status(status), msg);
    }

    /// Print an info message.
    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    /// Print a bold headline, used to separate per-module sections.
    pub fn headline(&self, msg: impl Display) {
        if self.use_color {
            eprintln!("\x1b[1m{msg}\x1b[0m");
        } else {
            eprintln!("{msg}");
        }
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(false, ColorChoice::default())
    }
}
