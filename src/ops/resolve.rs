//! Workspace resolution operations.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::Result;

use crate::core::descriptor::Profile;
use crate::core::{Module, Workspace};
use crate::resolver::encode::Lockfile;
use crate::resolver::errors::ResolveError;
use crate::resolver::modules::ModuleSet;
use crate::resolver::packages::PackageResolver;
use crate::resolver::registry::PackageRegistry;

/// Everything resolution learns about a workspace.
#[derive(Debug)]
pub struct Resolution {
    /// Fully merged packages
    pub registry: PackageRegistry,

    /// Flattened flag profiles of the root descriptor
    pub profiles: BTreeMap<String, Profile>,

    /// Scanned module units
    pub modules: ModuleSet,

    /// Module files in compilation order
    pub module_order: Vec<PathBuf>,

    /// Imports no scanned module exports
    pub unresolved: Vec<ResolveError>,
}

impl Resolution {
    /// Snapshot the resolution for a project root.
    pub fn to_lockfile(&self, ws: &Workspace) -> Lockfile {
        Lockfile::from_registry(&self.registry, ws.root(), &self.module_order)
            .with_profiles(self.profiles.clone())
    }
}

/// Resolve the workspace: load the root descriptor, resolve every package,
/// then scan and order the modules they declare.
///
/// Nothing is written to disk.
pub fn resolve_workspace(ws: &Workspace) -> Result<Resolution> {
    let search_root = ws.search_root();
    tracing::debug!("searching for packages under {}", search_root.display());

    let mut resolver = PackageResolver::new(search_root);
    let root = resolver.load_root(&ws.descriptor_path())?;
    resolver.resolve_all()?;
    let profiles = resolver.profiles().clone();
    let registry = resolver.into_registry();

    tracing::info!(
        "Resolved `{}`: {} library(ies), {} build target(s)",
        root,
        registry.libraries().count(),
        registry.build_targets().count()
    );

    let modules = scan_modules(&registry)?;
    let module_order = modules.ordered_files()?;
    let unresolved = modules.unresolved_imports();

    Ok(Resolution {
        registry,
        profiles,
        modules,
        module_order,
        unresolved,
    })
}

/// Scan every module file declared by a registered package.
///
/// A file shared by several packages is scanned once. Files are visited in
/// path order so unnamed units keep a stable position.
pub fn scan_modules(registry: &PackageRegistry) -> Result<ModuleSet, ResolveError> {
    let files: BTreeSet<PathBuf> = registry
        .iter()
        .flat_map(|package| package.modules.iter().map(|m| package.rooted(m)))
        .collect();

    let mut set = ModuleSet::new();
    for file in &files {
        let module = Module::scan(file)?;
        tracing::debug!(
            "scanned {} ({})",
            file.display(),
            module.name().unwrap_or("<unnamed>")
        );
        set.insert(module)?;
    }

    Ok(set)
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
    fn test_resolve_orders_modules_across_packages() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "Anvil.toml",
            r#"
[package]
name = "app"

[build.app]
sources = ["main.cpp"]
modules = ["app.cppm"]

[build.app.dependencies]
core = "1.0"
"#,
        );
        write(root, "main.cpp", "int main() {}\n");
        write(root, "app.cppm", "export module app;\nimport core;\n");
        write(
            root,
            "deps/core/Anvil.toml",
            "[package]\nname = \"core\"\nversion = \"1.0\"\n\n[library]\nmodules = [\"core.cppm\"]\n",
        );
        write(root, "deps/core/core.cppm", "export module core;\n");

        let resolution = resolve_workspace(&workspace(root)).unwrap();

        let order: Vec<_> = resolution
            .module_order
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(order, vec!["core.cppm", "app.cppm"]);
        assert!(resolution.unresolved.is_empty());

        let lock = resolution.to_lockfile(&workspace(root));
        assert_eq!(lock.modules, vec!["deps/core/core.cppm", "app.cppm"]);
        assert_eq!(lock.build["app"].dependencies, vec!["core"]);
    }

    #[test]
    fn test_unknown_import_is_reported_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "Anvil.toml",
            "[package]\nname = \"app\"\n\n[library]\nmodules = [\"a.cppm\"]\n",
        );
        write(root, "a.cppm", "export module a;\nimport std.missing;\n");

        let resolution = resolve_workspace(&workspace(root)).unwrap();
        assert_eq!(resolution.module_order.len(), 1);
        assert_eq!(resolution.unresolved.len(), 1);
    }

    #[test]
    fn test_unnamed_unit_with_unknown_import_is_reported() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "Anvil.toml",
            "[package]\nname = \"app\"\n\n[library]\nmodules = [\"core.cppm\", \"main.cpp\"]\n",
        );
        write(root, "core.cppm", "export module core;\n");
        write(root, "main.cpp", "import nosuch;\nimport core;\n");

        let resolution = resolve_workspace(&workspace(root)).unwrap();
        assert_eq!(resolution.modules.len(), 2);
        assert_eq!(resolution.unresolved.len(), 1);
        assert!(resolution.unresolved[0].to_string().contains("`nosuch`"));
    }

    #[test]
    fn test_root_profiles_reach_the_lockfile() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "Anvil.toml",
            "[package]\nname = \"app\"\n\n[profile.base]\ncflags = [\"-Wall\"]\n\n[profile.release]\ninherits = \"base\"\ncflags = [\"-O2\"]\n",
        );

        let resolution = resolve_workspace(&workspace(root)).unwrap();
        let lock = resolution.to_lockfile(&workspace(root));
        assert_eq!(lock.profile("release").unwrap().cflags, vec!["-Wall", "-O2"]);
    }

    #[test]
    fn test_package_cycle_is_downcastable() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "Anvil.toml",
            "[package]\nname = \"app\"\n\n[build.app.dependencies]\na = \"1\"\n",
        );
        write(
            root,
            "deps/a/Anvil.toml",
            "[package]\nname = \"a\"\n\n[library.dependencies]\nb = \"1\"\n",
        );
        write(
            root,
            "deps/b/Anvil.toml",
            "[package]\nname = \"b\"\n\n[library.dependencies]\na = \"1\"\n",
        );

        let err = resolve_workspace(&workspace(root)).unwrap_err();
        let err = err.downcast_ref::<ResolveError>().unwrap();
        let members = err.cycle_members().unwrap();
        assert!(members.contains(&"a".to_string()));
        assert!(members.contains(&"b".to_string()));
    }

    #[test]
    fn test_duplicate_exporters_fail() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "Anvil.toml",
            "[package]\nname = \"app\"\n\n[library]\nmodules = [\"a.cppm\", \"b.cppm\"]\n",
        );
        write(root, "a.cppm", "export module dup;\n");
        write(root, "b.cppm", "export module dup;\n");

        let err = resolve_workspace(&workspace(root)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::DuplicateModule { .. })
        ));
    }
}
