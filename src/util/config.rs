//! Configuration file support for Anvil.
//!
//! Anvil reads configuration from two locations:
//! - Global: `~/.anvil/config.toml` - User-wide defaults
//! - Project: `.anvil/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::graph::LinkScope;
use crate::builder::toolchain::ToolchainPlatform;

/// Default directory searched for vendored dependencies.
pub const DEFAULT_SEARCH_DIR: &str = "deps";

/// Default build output directory.
pub const DEFAULT_BUILD_DIR: &str = "build";

/// Default build profile.
pub const DEFAULT_PROFILE: &str = "debug";

/// Anvil configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolution settings
    pub resolve: ResolveConfig,

    /// Build graph settings
    pub build: BuildConfig,
}

/// Resolution-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Directory (relative to the project root) searched for packages that
    /// are not registered yet
    pub search_dir: Option<String>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build output directory (relative to the project root)
    pub build_dir: Option<String>,

    /// Build profile name (debug, release, ...)
    pub profile: Option<String>,

    /// Compiler front end (gcc, clang, msvc)
    pub toolchain: Option<String>,

    /// Which libraries each build target links against (all, closure)
    pub link_scope: Option<String>,

    /// Always emit compile_commands.json
    #[serde(default)]
    pub emit_compile_commands: bool,

    /// Path to the compiler
    pub cc: Option<String>,

    /// Path to the archiver
    pub ar: Option<String>,

    /// Path to the linker
    pub linker: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.resolve.search_dir.is_some() {
            self.resolve.search_dir = other.resolve.search_dir;
        }

        if other.build.build_dir.is_some() {
            self.build.build_dir = other.build.build_dir;
        }
        if other.build.profile.is_some() {
            self.build.profile = other.build.profile;
        }
        if other.build.toolchain.is_some() {
            self.build.toolchain = other.build.toolchain;
        }
        if other.build.link_scope.is_some() {
            self.build.link_scope = other.build.link_scope;
        }
        if other.build.emit_compile_commands {
            self.build.emit_compile_commands = true;
        }
        if other.build.cc.is_some() {
            self.build.cc = other.build.cc;
        }
        if other.build.ar.is_some() {
            self.build.ar = other.build.ar;
        }
        if other.build.linker.is_some() {
            self.build.linker = other.build.linker;
        }
    }

    /// Directory searched for missing packages.
    pub fn search_dir(&self) -> &str {
        self.resolve.search_dir.as_deref().unwrap_or(DEFAULT_SEARCH_DIR)
    }

    /// Build output directory.
    pub fn build_dir(&self) -> &str {
        self.build.build_dir.as_deref().unwrap_or(DEFAULT_BUILD_DIR)
    }

    /// Build profile name.
    pub fn profile(&self) -> &str {
        self.build.profile.as_deref().unwrap_or(DEFAULT_PROFILE)
    }

    /// Parse the configured toolchain, if any.
    pub fn toolchain(&self) -> Result<Option<ToolchainPlatform>> {
        self.build
            .toolchain
            .as_deref()
            .map(|s| s.parse())
            .transpose()
    }

    /// Parse the configured link scope (defaults to linking every library).
    pub fn link_scope(&self) -> Result<LinkScope> {
        match self.build.link_scope.as_deref() {
            Some(s) => s.parse(),
            None => Ok(LinkScope::default()),
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.anvil/config.toml)
/// 2. Global config (~/.anvil/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global anvil config directory (~/.anvil).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".anvil"))
}

/// Get the global config path (~/.anvil/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.anvil/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".anvil").join("config.toml")
}
