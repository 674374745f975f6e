//! Package resolution - depth-first dependency merging.
//!
//! The resolver owns a [`PackageRegistry`] and a search root. Resolving a
//! package resolves each of its dependencies first, then merges the
//! dependency's include paths and flags into it. Packages that are not yet
//! registered are located by searching the search root for a directory
//! whose name matches.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::descriptor::{descriptor_path, Descriptor, Profile};
use crate::core::{Package, PackageKind};
use crate::resolver::errors::ResolveError;
use crate::resolver::registry::PackageRegistry;
use crate::util::fs::make_absolute;

type PackageKey = (PackageKind, String);

/// Resolution context for one run.
///
/// After a failed `resolve*` call the registry may hold partially merged
/// packages; discard the resolver instead of reusing it.
#[derive(Debug)]
pub struct PackageResolver {
    registry: PackageRegistry,
    search_root: PathBuf,
    resolved: HashSet<PackageKey>,
    /// Flag profiles of the root descriptor
    profiles: BTreeMap<String, Profile>,
}

impl PackageResolver {
    /// Create a resolver that searches `search_root` for missing packages.
    pub fn new(search_root: impl Into<PathBuf>) -> Self {
        Self::with_registry(PackageRegistry::new(), search_root)
    }

    /// Create a resolver over a pre-populated registry.
    pub fn with_registry(registry: PackageRegistry, search_root: impl Into<PathBuf>) -> Self {
        PackageResolver {
            registry,
            search_root: search_root.into(),
            resolved: HashSet::new(),
            profiles: BTreeMap::new(),
        }
    }

    /// Load the root descriptor, registering its library and build targets.
    ///
    /// Returns the root package name.
    pub fn load_root(&mut self, descriptor: &Path) -> Result<String, ResolveError> {
        self.load_descriptor(descriptor, true)
    }

    /// Load a descriptor and register the packages it declares.
    ///
    /// Build targets are only registered when `is_base` is set.
    pub fn load_descriptor(&mut self, path: &Path, is_base: bool) -> Result<String, ResolveError> {
        let path = make_absolute(path);
        let descriptor = Descriptor::load(&path)?;
        self.register_descriptor(descriptor, &path, is_base)
    }

    fn register_descriptor(
        &mut self,
        descriptor: Descriptor,
        path: &Path,
        is_base: bool,
    ) -> Result<String, ResolveError> {
        let name = descriptor.name().to_string();
        let base_path = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        tracing::debug!("loading descriptor {}", path.display());
        if is_base {
            self.profiles = descriptor.profiles(path)?;
        }
        for package in descriptor.into_packages(&base_path, path, is_base)? {
            self.register(package);
        }

        Ok(name)
    }

    /// Register a package. Existing registrations are kept.
    pub fn register(&mut self, package: Package) -> bool {
        self.registry.register(package)
    }

    /// Resolve a package by name, library namespace first.
    ///
    /// Names not registered under either kind are searched for as
    /// libraries.
    pub fn resolve(&mut self, name: &str) -> Result<&Package, ResolveError> {
        let kind = self.registry.lookup(name).unwrap_or(PackageKind::Library);
        self.resolve_kind(kind, name)
    }

    /// Resolve a package of a specific kind.
    pub fn resolve_kind(&mut self, kind: PackageKind, name: &str) -> Result<&Package, ResolveError> {
        let mut stack = Vec::new();
        self.resolve_inner(kind, name, &mut stack)?;
        self.registry
            .get(kind, name)
            .ok_or_else(|| self.not_found(name))
    }

    /// Resolve every registered package: libraries, then build targets,
    /// each in name order.
    pub fn resolve_all(&mut self) -> Result<(), ResolveError> {
        let libraries: Vec<String> = self.registry.libraries().map(|p| p.name.clone()).collect();
        for name in libraries {
            self.resolve_kind(PackageKind::Library, &name)?;
        }

        let targets: Vec<String> = self
            .registry
            .build_targets()
            .map(|p| p.name.clone())
            .collect();
        for name in targets {
            self.resolve_kind(PackageKind::BuildTarget, &name)?;
        }

        Ok(())
    }

    fn resolve_inner(
        &mut self,
        kind: PackageKind,
        name: &str,
        stack: &mut Vec<PackageKey>,
    ) -> Result<(), ResolveError> {
        let key = (kind, name.to_string());
        if self.resolved.contains(&key) {
            return Ok(());
        }

        if let Some(pos) = stack.iter().position(|k| *k == key) {
            let mut cycle: Vec<String> = stack[pos..].iter().map(|(_, n)| n.clone()).collect();
            cycle.push(name.to_string());
            return Err(ResolveError::CircularDependency { cycle });
        }

        if !self.registry.contains(kind, name) {
            let found = kind == PackageKind::Library && self.search(name)?;
            if !found {
                return Err(self.not_found(name));
            }
        }

        let deps: Vec<String> = match self.registry.get(kind, name) {
            Some(package) => package.dependencies.keys().cloned().collect(),
            None => return Err(self.not_found(name)),
        };

        stack.push(key.clone());
        for dep in deps {
            tracing::info!("resolving dependency `{}` for `{}`", dep, name);
            self.resolve_inner(PackageKind::Library, &dep, stack)?;

            let dep_package = match self.registry.get(PackageKind::Library, &dep) {
                Some(package) => package.clone(),
                None => return Err(self.not_found(&dep)),
            };
            if let Some(package) = self.registry.get_mut(kind, name) {
                package.merge(&dep_package);
            }
        }
        stack.pop();

        self.resolved.insert(key);
        Ok(())
    }

    /// Search the search root for a directory providing library `name`.
    ///
    /// Directories named exactly `name` are tried first, then directories
    /// whose name contains it, in sorted order. Returns whether a library of
    /// that name ended up registered.
    fn search(&mut self, name: &str) -> Result<bool, ResolveError> {
        if !self.search_root.is_dir() {
            tracing::warn!(
                "search directory {} does not exist",
                self.search_root.display()
            );
            return Ok(false);
        }

        tracing::info!("searching {} for `{}`", self.search_root.display(), name);

        let mut candidates: Vec<PathBuf> = WalkDir::new(&self.search_root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .filter(|e| e.file_name().to_string_lossy().contains(name))
            .map(|e| e.into_path())
            .collect();
        candidates.sort_by_key(|dir| dir.file_name().map_or(true, |n| n != name));

        for dir in candidates {
            let path = make_absolute(&descriptor_path(&dir));
            if !path.is_file() {
                tracing::debug!("skipping {}: no descriptor", dir.display());
                continue;
            }

            let descriptor = Descriptor::load(&path)?;
            if descriptor.name() != name {
                tracing::debug!(
                    "{} declares `{}`, not `{}`",
                    path.display(),
                    descriptor.name(),
                    name
                );
                continue;
            }

            self.register_descriptor(descriptor, &path, false)?;
            tracing::info!("found `{}` in {}", name, dir.display());
            return Ok(self.registry.contains(PackageKind::Library, name));
        }

        Ok(false)
    }

    fn not_found(&self, name: &str) -> ResolveError {
        ResolveError::PackageNotFound {
            package: name.to_string(),
            search_root: self.search_root.clone(),
        }
    }

    /// The registry, with every resolved package merged.
    pub fn registry(&self) -> &PackageRegistry {
        &self.registry
    }

    /// Flag profiles declared by the root descriptor.
    pub fn profiles(&self) -> &BTreeMap<String, Profile> {
        &self.profiles
    }

    pub fn into_registry(self) -> PackageRegistry {
        self.registry
    }

    pub fn search_root(&self) -> &Path {
        &self.search_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_descriptor(dir: &Path, content: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("Anvil.toml"), content).unwrap();
    }

    fn core() -> Package {
        Package::new("core", "1.0", "/work/deps/core", PackageKind::Library).with_include("inc")
    }

    fn net() -> Package {
        Package::new("net", "0.2", "/work/net", PackageKind::Library)
            .with_include("net/inc")
            .with_dependency("core", "1.0")
    }

    #[test]
    fn test_resolve_merges_dependency_includes() {
        let mut resolver = PackageResolver::new("/work/deps");
        resolver.register(core());
        resolver.register(net());

        let net = resolver.resolve("net").unwrap();
        let include: Vec<_> = net.include.iter().map(String::as_str).collect();
        assert_eq!(include, vec!["/work/deps/core/inc", "net/inc"]);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut resolver = PackageResolver::new("/work/deps");
        resolver.register(core());
        resolver.register(net());

        let first = resolver.resolve("net").unwrap().clone();
        let second = resolver.resolve("net").unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_merge_order_does_not_matter() {
        let x = Package::new("x", "1", "/w/x", PackageKind::Library)
            .with_include("xi")
            .with_libflag("-DX");
        let y = Package::new("y", "1", "/w/y", PackageKind::Library)
            .with_include("yi")
            .with_lflag("-ly");

        let resolve_with = |order: [&Package; 2]| {
            let mut resolver = PackageResolver::new("/w/deps");
            for p in order {
                resolver.register(p.clone());
            }
            resolver.register(
                Package::new("a", "1", "/w/a", PackageKind::Library)
                    .with_dependency("y", "1")
                    .with_dependency("x", "1"),
            );
            resolver.resolve("a").unwrap().clone()
        };

        assert_eq!(resolve_with([&x, &y]), resolve_with([&y, &x]));
    }

    #[test]
    fn test_transitive_properties_propagate() {
        let tls = Package::new("tls", "3", "/w/tls", PackageKind::Library)
            .with_include("include")
            .with_lflag("-lssl");
        let core = core().with_dependency("tls", "3");

        let mut resolver = PackageResolver::new("/w/deps");
        resolver.register(tls);
        resolver.register(core);
        resolver.register(net());

        let net = resolver.resolve("net").unwrap();
        assert!(net.include.contains("/w/tls/include"));
        assert!(net.lflags.contains("-lssl"));
        assert!(net.dependencies.contains_key("tls"));
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut resolver = PackageResolver::new("/w/deps");
        resolver.register(
            Package::new("a", "1", "/w/a", PackageKind::Library).with_dependency("b", "1"),
        );
        resolver.register(
            Package::new("b", "1", "/w/b", PackageKind::Library).with_dependency("a", "1"),
        );

        let err = resolver.resolve("a").unwrap_err();
        match err {
            ResolveError::CircularDependency { cycle } => assert_eq!(cycle, ["a", "b", "a"]),
            other => panic!("expected a cycle, got {other}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let mut resolver = PackageResolver::new("/w/deps");
        resolver.register(
            Package::new("a", "1", "/w/a", PackageKind::Library).with_dependency("a", "1"),
        );

        let err = resolver.resolve("a").unwrap_err();
        assert_eq!(err.cycle_members().unwrap(), ["a"]);
    }

    #[test]
    fn test_missing_package_without_search_dir() {
        let tmp = TempDir::new().unwrap();
        let mut resolver = PackageResolver::new(tmp.path().join("deps"));
        resolver.register(
            Package::new("app", "1", tmp.path(), PackageKind::Library).with_dependency("zlib", "1"),
        );

        let err = resolver.resolve("app").unwrap_err();
        assert!(matches!(err, ResolveError::PackageNotFound { ref package, .. } if package == "zlib"));
    }

    #[test]
    fn test_search_prefers_exact_directory() {
        let tmp = TempDir::new().unwrap();
        let deps = tmp.path().join("deps");
        write_descriptor(
            &deps.join("core-extras"),
            "[package]\nname = \"core-extras\"\n",
        );
        write_descriptor(
            &deps.join("core"),
            "[package]\nname = \"core\"\nversion = \"1.0\"\n\n[library]\ninclude = [\"inc\"]\n",
        );

        let mut resolver = PackageResolver::new(&deps);
        let core = resolver.resolve("core").unwrap();
        assert_eq!(core.version, "1.0");
        assert_eq!(core.base_path, make_absolute(&deps.join("core")));
        assert!(!resolver.registry().contains(PackageKind::Library, "core-extras"));
    }

    #[test]
    fn test_search_falls_back_to_substring_match() {
        let tmp = TempDir::new().unwrap();
        let deps = tmp.path().join("deps");
        write_descriptor(&deps.join("libfmt-10"), "[package]\nname = \"fmt\"\n");

        let mut resolver = PackageResolver::new(&deps);
        assert_eq!(resolver.resolve("fmt").unwrap().name, "fmt");
    }

    #[test]
    fn test_search_skips_directories_declaring_another_package() {
        let tmp = TempDir::new().unwrap();
        let deps = tmp.path().join("deps");
        write_descriptor(
            &deps.join("fmt-extras"),
            "[package]\nname = \"fmt-extras\"\n\n[library.dependencies]\nnonexistent = \"1.0\"\n",
        );
        write_descriptor(&deps.join("libfmt"), "[package]\nname = \"fmt\"\n");
        write_descriptor(
            tmp.path(),
            "[package]\nname = \"app\"\n\n[library.dependencies]\nfmt = \"1.0\"\n",
        );

        let mut resolver = PackageResolver::new(&deps);
        resolver.load_root(&tmp.path().join("Anvil.toml")).unwrap();
        resolver.resolve_all().unwrap();

        let registry = resolver.into_registry();
        let names: Vec<&str> = registry.libraries().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["app", "fmt"]);
        assert_eq!(
            registry.get(PackageKind::Library, "fmt").unwrap().base_path,
            make_absolute(&deps.join("libfmt"))
        );
    }

    #[test]
    fn test_root_profiles_are_kept() {
        let tmp = TempDir::new().unwrap();
        write_descriptor(
            &tmp.path().join("deps/core"),
            "[package]\nname = \"core\"\n\n[profile.release]\ncflags = [\"-O1\"]\n",
        );
        write_descriptor(
            tmp.path(),
            "[package]\nname = \"app\"\n\n[library.dependencies]\ncore = \"1.0\"\n\n[profile.release]\ncflags = [\"-O3\"]\n",
        );

        let mut resolver = PackageResolver::new(tmp.path().join("deps"));
        resolver.load_root(&tmp.path().join("Anvil.toml")).unwrap();
        resolver.resolve_all().unwrap();

        assert_eq!(resolver.profiles()["release"].cflags, vec!["-O3"]);
    }

    #[test]
    fn test_searched_descriptor_skips_build_targets() {
        let tmp = TempDir::new().unwrap();
        let deps = tmp.path().join("deps");
        write_descriptor(
            &deps.join("core"),
            "[package]\nname = \"core\"\n\n[build.core-tests]\nsources = [\"t.cpp\"]\n",
        );

        let mut resolver = PackageResolver::new(&deps);
        resolver.resolve("core").unwrap();
        assert_eq!(resolver.registry().build_targets().count(), 0);
    }

    #[test]
    fn test_resolve_all_from_root_descriptor() {
        let tmp = TempDir::new().unwrap();
        write_descriptor(
            &tmp.path().join("deps/core"),
            "[package]\nname = \"core\"\n\n[library]\ninclude = [\"inc\"]\n",
        );
        write_descriptor(
            tmp.path(),
            r#"
[package]
name = "app"

[library]
include = ["include"]

[library.dependencies]
core = "1.0"

[build.app]
sources = ["main.cpp"]

[build.app.dependencies]
app = "0.0.0"
"#,
        );

        let mut resolver = PackageResolver::new(tmp.path().join("deps"));
        let root = resolver.load_root(&tmp.path().join("Anvil.toml")).unwrap();
        assert_eq!(root, "app");
        resolver.resolve_all().unwrap();

        let registry = resolver.into_registry();
        let target = registry.get(PackageKind::BuildTarget, "app").unwrap();
        assert!(target.dependencies.contains_key("core"));
        assert_eq!(target.include.len(), 2);
    }
}
