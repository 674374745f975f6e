//! Lockfile encoding and decoding.
//!
//! Anvil.lock is the resolved, normalized snapshot of the package graph and
//! the only input of build-graph generation. Every path in it is rooted at
//! the owning package, normalized, written with `/` and expressed relative
//! to the project root when it lives inside it.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::descriptor::Profile;
use crate::core::package::root_entry;
use crate::core::{LinkKind, Package, PackageKind};
use crate::resolver::registry::PackageRegistry;
use crate::util::fs::{relative_to_root, to_slash, write_atomic};

/// Current lockfile format version.
pub const LOCKFILE_VERSION: u32 = 1;

const HEADER: &str = "# This file is automatically generated by Anvil.\n\
                      # It is not intended for manual editing.\n\n";

/// Lockfile representation for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Lockfile {
    /// Lockfile format version
    pub version: u32,

    /// Global module compilation order
    #[serde(default)]
    pub modules: Vec<String>,

    /// Resolved libraries by name
    #[serde(default)]
    pub library: BTreeMap<String, LockedPackage>,

    /// Resolved build targets by name
    #[serde(default)]
    pub build: BTreeMap<String, LockedPackage>,

    /// Flattened flag profiles of the root descriptor
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profile: BTreeMap<String, Profile>,
}

/// A locked package entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockedPackage {
    pub version: String,

    pub base_path: String,

    /// Link kind, build targets only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkKind>,

    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default)]
    pub modules: Vec<String>,

    #[serde(default)]
    pub libflags: Vec<String>,

    #[serde(default)]
    pub lflags: Vec<String>,

    /// Prebuilt libraries, located like `include`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libs: Vec<String>,

    /// Transitive dependency names
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Extra compiler flags keyed by located source
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_cflags: BTreeMap<String, Vec<String>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platform_cflags: BTreeMap<String, Vec<String>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub compiler_cflags: BTreeMap<String, Vec<String>>,
}

impl Lockfile {
    /// Create a lockfile from a fully resolved registry.
    ///
    /// `module_order` is the global module compilation order as produced by
    /// module resolution.
    pub fn from_registry(registry: &PackageRegistry, root: &Path, module_order: &[PathBuf]) -> Self {
        let modules: Vec<String> = module_order
            .iter()
            .map(|p| to_slash(&relative_to_root(root, p)))
            .collect();
        let positions: HashMap<&str, usize> = modules
            .iter()
            .enumerate()
            .map(|(i, m)| (m.as_str(), i))
            .collect();

        let lock = |package: &Package| LockedPackage::from_package(package, root, &positions);

        Lockfile {
            version: LOCKFILE_VERSION,
            library: registry
                .libraries()
                .map(|p| (p.name.clone(), lock(p)))
                .collect(),
            build: registry
                .build_targets()
                .map(|p| (p.name.clone(), lock(p)))
                .collect(),
            modules,
            profile: BTreeMap::new(),
        }
    }

    /// Attach the root descriptor's flag profiles.
    pub fn with_profiles(mut self, profiles: BTreeMap<String, Profile>) -> Self {
        self.profile = profiles;
        self
    }

    /// Look up a flag profile by name.
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profile.get(name)
    }

    /// Load a lockfile from a path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read lockfile: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("failed to parse lockfile: {}", path.display()))
    }

    /// Parse lockfile content.
    pub fn parse(content: &str) -> Result<Self> {
        let lockfile: Lockfile = toml::from_str(content)?;
        if !lockfile.is_compatible() {
            anyhow::bail!(
                "unsupported lockfile version {} (expected {})",
                lockfile.version,
                LOCKFILE_VERSION
            );
        }
        Ok(lockfile)
    }

    /// Render the lockfile, header included.
    pub fn to_toml_string(&self) -> Result<String> {
        let content = toml::to_string_pretty(self).context("failed to serialize lockfile")?;
        Ok(format!("{HEADER}{content}"))
    }

    /// Save the lockfile. The write is atomic: on failure the previous
    /// lockfile, if any, is left untouched.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml_string()?;
        write_atomic(path, &content)
            .with_context(|| format!("failed to write lockfile: {}", path.display()))
    }

    /// Check if the lockfile is compatible with this version of Anvil.
    pub fn is_compatible(&self) -> bool {
        self.version == LOCKFILE_VERSION
    }

    /// Look up a locked package.
    pub fn get(&self, kind: PackageKind, name: &str) -> Option<&LockedPackage> {
        match kind {
            PackageKind::Library => self.library.get(name),
            PackageKind::BuildTarget => self.build.get(name),
        }
    }

    /// Dependencies of a package that no other of its dependencies already
    /// pulls in.
    ///
    /// Locked dependency lists are transitive; this recovers the edges worth
    /// drawing in a tree.
    pub fn direct_dependencies(&self, kind: PackageKind, name: &str) -> Vec<&str> {
        let Some(package) = self.get(kind, name) else {
            return Vec::new();
        };

        package
            .dependencies
            .iter()
            .filter(|dep| {
                !package.dependencies.iter().any(|other| {
                    other != *dep
                        && self
                            .library
                            .get(other)
                            .is_some_and(|p| p.dependencies.contains(dep))
                })
            })
            .map(String::as_str)
            .collect()
    }

    /// Every locked package: libraries first, then build targets.
    pub fn packages(&self) -> impl Iterator<Item = (PackageKind, &str, &LockedPackage)> {
        self.library
            .iter()
            .map(|(n, p)| (PackageKind::Library, n.as_str(), p))
            .chain(
                self.build
                    .iter()
                    .map(|(n, p)| (PackageKind::BuildTarget, n.as_str(), p)),
            )
    }
}

impl LockedPackage {
    fn from_package(package: &Package, root: &Path, module_positions: &HashMap<&str, usize>) -> Self {
        let base = &package.base_path;
        let locate = |entry: &String| to_slash(&relative_to_root(root, &root_entry(base, entry)));

        let mut include: Vec<String> = package.include.iter().map(locate).collect();
        include.sort();
        include.dedup();

        let mut libs: Vec<String> = package.libs.iter().map(locate).collect();
        libs.sort();
        libs.dedup();

        let source_cflags = package
            .source_cflags
            .iter()
            .map(|(source, flags)| (locate(source), flags.clone()))
            .collect();

        let mut sources: Vec<String> = Vec::new();
        for source in package.sources.iter().map(locate) {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }

        let mut modules: Vec<String> = Vec::new();
        for module in package.modules.iter().map(locate) {
            if !modules.contains(&module) {
                modules.push(module);
            }
        }
        modules.sort_by_key(|m| module_positions.get(m.as_str()).copied().unwrap_or(usize::MAX));

        LockedPackage {
            version: package.version.clone(),
            base_path: to_slash(&relative_to_root(root, base)),
            link: match package.kind {
                PackageKind::BuildTarget => Some(package.link),
                PackageKind::Library => None,
            },
            include,
            sources,
            modules,
            libflags: package.libflags.iter().cloned().collect(),
            lflags: package.lflags.iter().cloned().collect(),
            libs,
            dependencies: package.dependencies.keys().cloned().collect(),
            source_cflags,
            platform_cflags: package.platform_cflags.clone(),
            compiler_cflags: package.compiler_cflags.clone(),
        }
    }

    /// Link kind, defaulting to executable.
    pub fn link_kind(&self) -> LinkKind {
        self.link.unwrap_or_default()
    }
}
