//! Global context for Anvil operations.
//!
//! Provides centralized access to the working directory, output settings
//! and the layered configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::workspace::{find_descriptor, Workspace, DESCRIPTOR_NAME};
use crate::resolver::errors::ResolveError;
use crate::util::config::{global_config_path, load_config, project_config_path, Config};

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Global configuration file (~/.anvil/config.toml)
    global_config: Option<PathBuf>,

    /// Whether to use verbose output
    verbose: bool,

    /// Whether to use colors in output
    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        GlobalContext {
            cwd,
            global_config: global_config_path(),
            verbose: false,
            color: true,
        }
    }

    /// Use a different global configuration file, or none at all.
    pub fn with_global_config(mut self, path: Option<PathBuf>) -> Self {
        self.global_config = path;
        self
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Set color output.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if color output is enabled.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Find the descriptor starting from cwd and searching upward.
    pub fn find_descriptor(&self) -> Result<PathBuf, ResolveError> {
        find_descriptor(&self.cwd).ok_or_else(|| ResolveError::DescriptorNotFound {
            path: self.cwd.join(DESCRIPTOR_NAME),
        })
    }

    /// Merged configuration for a project root.
    pub fn config_for(&self, project_root: &Path) -> Config {
        load_config(
            self.global_config.as_deref(),
            &project_config_path(project_root),
        )
    }

    /// Open the workspace enclosing cwd, or the one rooted at `descriptor`.
    pub fn workspace(&self, descriptor: Option<&Path>) -> Result<Workspace, ResolveError> {
        let descriptor = match descriptor {
            Some(path) => path.to_path_buf(),
            None => self.find_descriptor()?,
        };

        let ws = Workspace::new(&descriptor, &self.cwd, Config::default());
        let config = self.config_for(ws.root());
        Ok(Workspace::new(&descriptor, &self.cwd, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_workspace_loads_project_config() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(DESCRIPTOR_NAME), "[package]\nname = \"app\"\n").unwrap();
        std::fs::create_dir_all(tmp.path().join(".anvil")).unwrap();
        std::fs::write(
            tmp.path().join(".anvil/config.toml"),
            "[build]\nprofile = \"release\"\n",
        )
        .unwrap();

        let nested = tmp.path().join("src");
        std::fs::create_dir_all(&nested).unwrap();
        let ctx = GlobalContext::with_cwd(nested).with_global_config(None);

        let ws = ctx.workspace(None).unwrap();
        assert_eq!(ws.root(), tmp.path());
        assert_eq!(ws.config().profile(), "release");
    }

    #[test]
    fn test_missing_descriptor() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).with_global_config(None);

        let err = ctx.find_descriptor().unwrap_err();
        assert!(matches!(err, ResolveError::DescriptorNotFound { .. }));
    }
}
