//! Workspace - the project root and the paths derived from it.

use std::path::{Path, PathBuf};

use crate::util::config::Config;
use crate::util::fs::absolutize;

/// Descriptor file name.
pub const DESCRIPTOR_NAME: &str = "Anvil.toml";

/// Lockfile name.
pub const LOCKFILE_NAME: &str = "Anvil.lock";

/// Generated ninja file name.
pub const NINJA_FILE_NAME: &str = "build.ninja";

/// Generated compilation database name.
pub const COMPDB_NAME: &str = "compile_commands.json";

/// Find the descriptor in `dir` or any parent directory.
pub fn find_descriptor(dir: &Path) -> Option<PathBuf> {
    let mut current = dir.to_path_buf();
    loop {
        let candidate = current.join(DESCRIPTOR_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// A project rooted at the directory holding its descriptor.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Absolute project root
    root: PathBuf,

    /// Merged configuration
    config: Config,
}

impl Workspace {
    /// Create a workspace from a descriptor path and merged configuration.
    pub fn new(descriptor_path: &Path, cwd: &Path, config: Config) -> Self {
        let descriptor_path = absolutize(cwd, descriptor_path);
        let root = descriptor_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());

        Workspace { root, config }
    }

    /// Project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Merged configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable configuration, for command-line overrides.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Path of the root descriptor.
    pub fn descriptor_path(&self) -> PathBuf {
        self.root.join(DESCRIPTOR_NAME)
    }

    /// Path of the lockfile.
    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join(LOCKFILE_NAME)
    }

    /// Directory searched for packages that are not registered yet.
    pub fn search_root(&self) -> PathBuf {
        absolutize(&self.root, Path::new(self.config.search_dir()))
    }

    /// Build root for the configured profile: `<build_dir>/<profile>`.
    pub fn build_root(&self) -> PathBuf {
        absolutize(&self.root, Path::new(self.config.build_dir())).join(self.config.profile())
    }

    /// Path of the generated ninja file.
    pub fn ninja_path(&self) -> PathBuf {
        self.root.join(NINJA_FILE_NAME)
    }

    /// Path of the generated compilation database.
    pub fn compdb_path(&self) -> PathBuf {
        self.root.join(COMPDB_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_descriptor_searches_upward() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(DESCRIPTOR_NAME), "[package]\nname = \"a\"\n").unwrap();
        let nested = tmp.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_descriptor(&nested).unwrap();
        assert_eq!(found, tmp.path().join(DESCRIPTOR_NAME));
    }

    #[test]
    fn test_workspace_paths() {
        let mut config = Config::default();
        config.build.profile = Some("release".to_string());

        let ws = Workspace::new(Path::new("app/Anvil.toml"), Path::new("/work"), config);
        assert_eq!(ws.root(), Path::new("/work/app"));
        assert_eq!(ws.lockfile_path(), PathBuf::from("/work/app/Anvil.lock"));
        assert_eq!(ws.search_root(), PathBuf::from("/work/app/deps"));
        assert_eq!(ws.build_root(), PathBuf::from("/work/app/build/release"));
    }
}
