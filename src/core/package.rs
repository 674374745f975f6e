//! Package - a named build unit with mergeable build properties.
//!
//! Packages come in two kinds that live in independent namespaces: reusable
//! libraries and build targets that produce a final artifact.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::fs::{normalize_lexically, to_slash};

/// The namespace a package is registered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PackageKind {
    /// Reusable, importable by other packages.
    Library,
    /// Produces a final artifact (executable, static or shared library).
    BuildTarget,
}

impl PackageKind {
    /// Name of the descriptor/lockfile group for this kind.
    pub fn section(&self) -> &'static str {
        match self {
            PackageKind::Library => "library",
            PackageKind::BuildTarget => "build",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

/// What a build target links into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Executable program
    #[default]
    Executable,
    /// Static library (.a, .lib)
    Static,
    /// Shared library (.so, .dylib, .dll)
    Shared,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Executable => "executable",
            LinkKind::Static => "static",
            LinkKind::Shared => "shared",
        }
    }
}

impl FromStr for LinkKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "executable" | "exe" => Ok(LinkKind::Executable),
            "static" => Ok(LinkKind::Static),
            "shared" => Ok(LinkKind::Shared),
            _ => anyhow::bail!(
                "invalid link kind `{}`, expected one of: executable, static, shared",
                s
            ),
        }
    }
}

/// A package with its build properties.
///
/// `include` and `sources` entries are relative to `base_path` when the
/// package is created from a descriptor. Entries merged in from a
/// dependency are rooted at that dependency's `base_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Package name (unique within its kind)
    pub name: String,

    /// Opaque version string
    pub version: String,

    /// Directory all relative paths are resolved against
    pub base_path: PathBuf,

    /// Namespace this package lives in
    pub kind: PackageKind,

    /// Link kind, only meaningful for build targets
    pub link: LinkKind,

    /// Include directories
    pub include: BTreeSet<String>,

    /// Compiler flags
    pub libflags: BTreeSet<String>,

    /// Linker flags
    pub lflags: BTreeSet<String>,

    /// Source files, in declaration order
    pub sources: Vec<String>,

    /// Module interface sources, in declaration order
    pub modules: Vec<String>,

    /// Extra compiler flags for individual sources
    pub source_cflags: BTreeMap<String, Vec<String>>,

    /// Prebuilt libraries to link
    pub libs: BTreeSet<String>,

    /// Compiler flags keyed by host platform, not inherited by dependents
    pub platform_cflags: BTreeMap<String, Vec<String>>,

    /// Compiler flags keyed by compiler family, not inherited by dependents
    pub compiler_cflags: BTreeMap<String, Vec<String>>,

    /// Declared requirements: dependency name -> version
    pub dependencies: BTreeMap<String, String>,
}

impl Package {
    /// Create an empty package.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        base_path: impl Into<PathBuf>,
        kind: PackageKind,
    ) -> Self {
        Package {
            name: name.into(),
            version: version.into(),
            base_path: base_path.into(),
            kind,
            link: LinkKind::default(),
            include: BTreeSet::new(),
            libflags: BTreeSet::new(),
            lflags: BTreeSet::new(),
            sources: Vec::new(),
            modules: Vec::new(),
            source_cflags: BTreeMap::new(),
            libs: BTreeSet::new(),
            platform_cflags: BTreeMap::new(),
            compiler_cflags: BTreeMap::new(),
            dependencies: BTreeMap::new(),
        }
    }

    pub fn with_include(mut self, path: impl Into<String>) -> Self {
        self.include.insert(path.into());
        self
    }

    pub fn with_libflag(mut self, flag: impl Into<String>) -> Self {
        self.libflags.insert(flag.into());
        self
    }

    pub fn with_lflag(mut self, flag: impl Into<String>) -> Self {
        self.lflags.insert(flag.into());
        self
    }

    pub fn with_source(mut self, path: impl Into<String>) -> Self {
        self.sources.push(path.into());
        self
    }

    pub fn with_module(mut self, path: impl Into<String>) -> Self {
        self.modules.push(path.into());
        self
    }

    pub fn with_lib(mut self, path: impl Into<String>) -> Self {
        self.libs.insert(path.into());
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), version.into());
        self
    }

    pub fn with_link(mut self, link: LinkKind) -> Self {
        self.link = link;
        self
    }

    pub fn is_library(&self) -> bool {
        self.kind == PackageKind::Library
    }

    /// Resolve one of this package's path entries against its base.
    pub fn rooted(&self, entry: &str) -> PathBuf {
        root_entry(&self.base_path, entry)
    }

    /// Merge a resolved dependency into this package.
    ///
    /// Include paths and prebuilt libraries are rooted at the dependency's
    /// base before insertion. Per-source, per-platform and per-compiler flags
    /// stay with the package that declared them. Everything else is a set
    /// union, so merging the same dependency twice (or
    /// two dependencies sharing a transitive one) changes nothing the
    /// second time.
    pub fn merge(&mut self, dep: &Package) {
        tracing::debug!("merging `{}` into `{}`", dep.name, self.name);

        for path in &dep.include {
            self.include.insert(to_slash(&dep.rooted(path)));
        }
        for lib in &dep.libs {
            self.libs.insert(to_slash(&dep.rooted(lib)));
        }
        self.libflags.extend(dep.libflags.iter().cloned());
        self.lflags.extend(dep.lflags.iter().cloned());

        for (name, version) in &dep.dependencies {
            if name == &self.name && self.is_library() {
                continue;
            }
            match self.dependencies.get(name) {
                Some(existing) if existing != version => {
                    tracing::debug!(
                        "`{}` already requires {} {}, ignoring {} from `{}`",
                        self.name,
                        name,
                        existing,
                        version,
                        dep.name
                    );
                }
                Some(_) => {}
                None => {
                    self.dependencies.insert(name.clone(), version.clone());
                }
            }
        }
    }
}

/// Join `entry` onto `base` and normalize the result.
///
/// Absolute entries (for example include paths merged from another package)
/// come back unchanged apart from normalization.
pub fn root_entry(base: &Path, entry: &str) -> PathBuf {
    normalize_lexically(&base.join(entry))
}
