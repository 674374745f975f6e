//! Diagnostics printed for resolution and generation failures.
//!
//! Rendered in the compiler style:
//!
//! ```text
//! error: could not find package `zlib`
//!  --> Anvil.toml
//!   = no directory matching `zlib` with a descriptor under deps
//!   = help: Check that the package name is spelled correctly
//! ```

use std::fmt::{self, Write as _};
use std::path::PathBuf;

/// Hints shared between error paths.
pub mod suggestions {
    pub const NO_DESCRIPTOR: &str = "Create an Anvil.toml with a [package] section";

    pub const NO_LOCKFILE: &str = "help: Run `anvil lock` to resolve dependencies";

    pub const PACKAGE_NOT_FOUND: &str =
        "Place the dependency in the search directory (default `deps/`)";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }

    /// ANSI bold red for errors, bold yellow for warnings.
    fn ansi(self) -> &'static str {
        match self {
            Severity::Error => "1;31",
            Severity::Warning => "1;33",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// File the problem was found in
    pub location: Option<PathBuf>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
            location: None,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_context(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Render for a terminal, with ANSI colors when `color` is set.
    pub fn format(&self, color: bool) -> String {
        let label = self.severity.label();
        let mut out = if color {
            format!("\x1b[{}m{}\x1b[0m: {}\n", self.severity.ansi(), label, self.message)
        } else {
            format!("{}: {}\n", label, self.message)
        };

        // Writing into a String cannot fail.
        if let Some(path) = &self.location {
            let _ = writeln!(out, " --> {}", path.display());
        }
        for note in &self.notes {
            let _ = writeln!(out, "  = {}", note);
        }
        for help in &self.help {
            let _ = writeln!(out, "  = help: {}", help);
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_lists_location_notes_and_help() {
        let diag = Diagnostic::error("circular dependency detected")
            .with_location("/work/app/Anvil.toml")
            .with_context("cycle: app -> net -> app")
            .with_suggestion("Remove `app` from the dependencies of `net`");

        assert_eq!(
            diag.to_string(),
            "error: circular dependency detected\n \
             --> /work/app/Anvil.toml\n  \
             = cycle: app -> net -> app\n  \
             = help: Remove `app` from the dependencies of `net`\n"
        );
    }

    #[test]
    fn test_colored_label() {
        let output = Diagnostic::warning("module `net` imports unknown module `std`").format(true);
        assert!(output.starts_with("\x1b[1;33mwarning\x1b[0m: "));
        assert!(!output.contains("help"));
    }
}
