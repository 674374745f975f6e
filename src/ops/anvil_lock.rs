//! Implementation of `anvil lock`.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::Workspace;
use crate::ops::lockfile::save_lockfile;
use crate::ops::resolve::resolve_workspace;
use crate::resolver::encode::Lockfile;
use crate::resolver::errors::ResolveError;

/// Outcome of a successful `anvil lock`.
#[derive(Debug)]
pub struct LockResult {
    /// The snapshot that was written
    pub lockfile: Lockfile,

    /// Where it was written
    pub path: PathBuf,

    /// Non-fatal module import problems
    pub unresolved: Vec<ResolveError>,
}

/// Resolve the workspace and write `Anvil.lock`.
///
/// Any resolution failure returns before the lockfile is touched, so a
/// previous lockfile survives a failed run.
pub fn lock(ws: &Workspace) -> Result<LockResult> {
    let resolution = resolve_workspace(ws)?;
    let lockfile = resolution.to_lockfile(ws);
    let path = ws.lockfile_path();
    save_lockfile(&path, &lockfile)?;

    tracing::info!(
        "Locked {} package(s), {} module(s)",
        lockfile.packages().count(),
        lockfile.modules.len()
    );

    Ok(LockResult {
        lockfile,
        path,
        unresolved: resolution.unresolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::config::Config;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn workspace(root: &Path) -> Workspace {
        Workspace::new(&root.join("Anvil.toml"), root, Config::default())
    }

    #[test]
    fn test_lock_writes_lockfile() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "Anvil.toml",
            r#"
[package]
name = "net"
version = "0.2.0"

[library]
include = ["inc"]
sources = ["src/net.cpp"]

[library.dependencies]
core = "1.0"
"#,
        );
        write(root, "src/net.cpp", "");
        write(
            root,
            "deps/core/Anvil.toml",
            "[package]\nname = \"core\"\nversion = \"1.0\"\n\n[library]\ninclude = [\"inc\"]\n",
        );

        let result = lock(&workspace(root)).unwrap();
        assert_eq!(result.path, root.join("Anvil.lock"));
        assert!(result.path.exists());

        let net = &result.lockfile.library["net"];
        assert_eq!(net.include, vec!["deps/core/inc", "inc"]);
        assert_eq!(net.dependencies, vec!["core"]);
    }

    #[test]
    fn test_failed_lock_keeps_previous_lockfile() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "Anvil.toml",
            "[package]\nname = \"app\"\n\n[library.dependencies]\nmissing = \"1\"\n",
        );
        write(root, "Anvil.lock", "previous");

        let err = lock(&workspace(root)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::PackageNotFound { .. })
        ));
        assert_eq!(
            std::fs::read_to_string(root.join("Anvil.lock")).unwrap(),
            "previous"
        );
    }

    #[test]
    fn test_lock_ignores_unrelated_search_matches() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "Anvil.toml",
            "[package]\nname = \"app\"\n\n[library.dependencies]\nfmt = \"10\"\n",
        );
        write(
            root,
            "deps/fmt-extras/Anvil.toml",
            "[package]\nname = \"fmt-extras\"\n\n[library.dependencies]\nnonexistent = \"1\"\n",
        );
        write(root, "deps/libfmt/Anvil.toml", "[package]\nname = \"fmt\"\n");

        let result = lock(&workspace(root)).unwrap();
        let names: Vec<&str> = result.lockfile.library.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["app", "fmt"]);
        assert_eq!(result.lockfile.library["fmt"].base_path, "deps/libfmt");
    }
}
