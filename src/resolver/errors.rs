//! Resolution error types and diagnostics.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error during descriptor loading, package resolution or module ordering.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("descriptor not found: {}", path.display())]
    DescriptorNotFound { path: PathBuf },

    #[error("malformed descriptor {}: {message}", path.display())]
    DescriptorMalformed { path: PathBuf, message: String },

    #[error("package not found: `{package}`")]
    PackageNotFound {
        package: String,
        search_root: PathBuf,
    },

    #[error("circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    #[error("module `{module}` imports unknown module `{import}`")]
    UnresolvedImport { module: String, import: String },

    #[error("module `{name}` is exported by both {} and {}", first.display(), second.display())]
    DuplicateModule {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("failed to read module source {}: {source}", path.display())]
    ModuleScan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResolveError {
    /// Members of the cycle, without the repeated closing entry.
    pub fn cycle_members(&self) -> Option<&[String]> {
        match self {
            ResolveError::CircularDependency { cycle } if cycle.len() > 1 => {
                Some(&cycle[..cycle.len() - 1])
            }
            ResolveError::CircularDependency { cycle } => Some(cycle),
            _ => None,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::DescriptorNotFound { path } => {
                Diagnostic::error(format!("could not find descriptor `{}`", path.display()))
                    .with_suggestion(suggestions::NO_DESCRIPTOR)
            }

            ResolveError::DescriptorMalformed { path, message } => {
                Diagnostic::error("malformed descriptor")
                    .with_location(path)
                    .with_context(message.clone())
            }

            ResolveError::PackageNotFound {
                package,
                search_root,
            } => Diagnostic::error(format!("could not find package `{}`", package))
                .with_context(format!(
                    "no directory matching `{}` with a descriptor under {}",
                    package,
                    search_root.display()
                ))
                .with_suggestion("Check that the package name is spelled correctly")
                .with_suggestion(suggestions::PACKAGE_NOT_FOUND),

            ResolveError::CircularDependency { cycle } => {
                Diagnostic::error("circular dependency detected")
                    .with_context(format!("cycle: {}", cycle.join(" -> ")))
                    .with_suggestion(
                        "Break the cycle by removing or restructuring dependencies",
                    )
            }

            ResolveError::UnresolvedImport { module, import } => Diagnostic::warning(format!(
                "module `{}` imports `{}`, which no scanned module exports",
                module, import
            ))
            .with_context("the import is compiled without an ordering edge"),

            ResolveError::DuplicateModule {
                name,
                first,
                second,
            } => Diagnostic::error(format!("module `{}` is exported twice", name))
                .with_context(format!("first: {}", first.display()))
                .with_context(format!("second: {}", second.display()))
                .with_suggestion("Rename one of the modules"),

            ResolveError::ModuleScan { path, source } => {
                Diagnostic::error("failed to read module source")
                    .with_location(path)
                    .with_context(source.to_string())
            }
        }
    }
}
