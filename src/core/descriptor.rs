//! Anvil.toml descriptor parsing and schema.
//!
//! A descriptor declares one package: its identity, an optional library
//! section and zero or more build targets. Flag profiles and the per-platform
//! and per-compiler flag tables sit next to them at the top level. The schema
//! is strict, unknown keys are rejected and every malformed document
//! surfaces as a single [`ResolveError::DescriptorMalformed`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::package::{LinkKind, Package, PackageKind};
use crate::resolver::errors::ResolveError;
use crate::util::fs::expand_patterns;

/// The parsed descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Descriptor {
    /// Package identity
    pub package: PackageMetadata,

    /// The package's library section
    #[serde(default)]
    pub library: Option<Section>,

    /// Build targets by name
    #[serde(default)]
    pub build: BTreeMap<String, Section>,

    /// Named flag profiles, only read from the root descriptor
    #[serde(default)]
    pub profile: BTreeMap<String, ProfileSection>,

    /// Compiler flags per host platform
    #[serde(default)]
    pub platform: BTreeMap<String, FlagSection>,

    /// Compiler flags per compiler family
    #[serde(default)]
    pub compiler: BTreeMap<String, FlagSection>,
}

/// Host platforms accepted as `[platform.<name>]` keys.
pub const PLATFORMS: &[&str] = &["linux", "macos", "windows"];

/// Compiler families accepted as `[compiler.<name>]` keys.
pub const COMPILERS: &[&str] = &["gcc", "clang", "msvc"];

/// Package metadata from the [package] section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageMetadata {
    /// Package name
    pub name: String,

    /// Opaque version string
    #[serde(default = "default_version")]
    pub version: String,

    /// Package description
    #[serde(default)]
    pub description: Option<String>,

    /// License identifier
    #[serde(default)]
    pub license: Option<String>,

    /// Authors
    #[serde(default)]
    pub authors: Vec<String>,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

/// Build properties shared by the library section and build targets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Section {
    /// Include directories
    #[serde(default)]
    pub include: Vec<String>,

    /// Source files (glob patterns allowed). Anything after the first
    /// whitespace is a list of extra compiler flags for those files.
    #[serde(default)]
    pub sources: Vec<String>,

    /// Module interface sources (glob patterns allowed)
    #[serde(default)]
    pub modules: Vec<String>,

    /// Compiler flags
    #[serde(default)]
    pub libflags: Vec<String>,

    /// Linker flags
    #[serde(default)]
    pub lflags: Vec<String>,

    /// Prebuilt libraries to link
    #[serde(default)]
    pub libs: Vec<String>,

    /// Dependencies: library name -> version
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Link kind (build targets only)
    #[serde(default)]
    pub link: Option<LinkKind>,
}

/// A `[profile.<name>]` table as written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileSection {
    /// Profiles whose flags come first
    #[serde(default)]
    pub inherits: Option<Inherits>,

    #[serde(default)]
    pub cflags: Vec<String>,

    #[serde(default)]
    pub lflags: Vec<String>,
}

/// `inherits = "base"` or `inherits = ["base", "lto"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Inherits {
    One(String),
    Many(Vec<String>),
}

impl Inherits {
    pub fn names(&self) -> &[String] {
        match self {
            Inherits::One(name) => std::slice::from_ref(name),
            Inherits::Many(names) => names,
        }
    }
}

/// A `[platform.<name>]` or `[compiler.<name>]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagSection {
    #[serde(default)]
    pub cflags: Vec<String>,
}

/// A profile with its inheritance chain flattened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    #[serde(default)]
    pub cflags: Vec<String>,

    #[serde(default)]
    pub lflags: Vec<String>,
}

impl Profile {
    fn extend(&mut self, other: &Profile) {
        for flag in &other.cflags {
            if !self.cflags.contains(flag) {
                self.cflags.push(flag.clone());
            }
        }
        for flag in &other.lflags {
            if !self.lflags.contains(flag) {
                self.lflags.push(flag.clone());
            }
        }
    }
}

impl Descriptor {
    /// Load a descriptor from a file path.
    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        if !path.is_file() {
            return Err(ResolveError::DescriptorNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ResolveError::DescriptorMalformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::parse(&content, path)
    }

    /// Parse descriptor content; `path` is only used for error reporting.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ResolveError> {
        let descriptor: Descriptor =
            toml::from_str(content).map_err(|e| ResolveError::DescriptorMalformed {
                path: path.to_path_buf(),
                message: e.message().to_string(),
            })?;

        descriptor.validate(path)?;
        Ok(descriptor)
    }

    fn validate(&self, path: &Path) -> Result<(), ResolveError> {
        let malformed = |message: String| ResolveError::DescriptorMalformed {
            path: path.to_path_buf(),
            message,
        };

        validate_name(&self.package.name).map_err(|m| malformed(format!("package name: {}", m)))?;

        if let Some(library) = &self.library {
            if library.link.is_some() {
                return Err(malformed(
                    "`link` is only valid in [build.<name>] sections".to_string(),
                ));
            }
        }

        for name in self.build.keys() {
            validate_name(name).map_err(|m| malformed(format!("build target `{}`: {}", name, m)))?;
        }

        if let Some(name) = self.platform.keys().find(|k| !PLATFORMS.contains(&k.as_str())) {
            return Err(malformed(format!(
                "unknown platform `{}`, expected one of: {}",
                name,
                PLATFORMS.join(", ")
            )));
        }
        if let Some(name) = self.compiler.keys().find(|k| !COMPILERS.contains(&k.as_str())) {
            return Err(malformed(format!(
                "unknown compiler `{}`, expected one of: {}",
                name,
                COMPILERS.join(", ")
            )));
        }

        Ok(())
    }

    /// Flag profiles with `inherits` chains resolved.
    ///
    /// Inherited flags precede the profile's own, in the order the parents
    /// are listed. Unknown parents and inheritance cycles are malformed.
    pub fn profiles(&self, path: &Path) -> Result<BTreeMap<String, Profile>, ResolveError> {
        let mut flattened = BTreeMap::new();
        for name in self.profile.keys() {
            self.flatten_profile(name, path, &mut Vec::new(), &mut flattened)?;
        }
        Ok(flattened)
    }

    fn flatten_profile(
        &self,
        name: &str,
        path: &Path,
        stack: &mut Vec<String>,
        flattened: &mut BTreeMap<String, Profile>,
    ) -> Result<(), ResolveError> {
        if flattened.contains_key(name) {
            return Ok(());
        }
        if stack.iter().any(|n| n == name) {
            stack.push(name.to_string());
            return Err(ResolveError::DescriptorMalformed {
                path: path.to_path_buf(),
                message: format!("profile inheritance cycle: {}", stack.join(" -> ")),
            });
        }

        let Some(section) = self.profile.get(name) else {
            let child = stack.last().cloned().unwrap_or_default();
            return Err(ResolveError::DescriptorMalformed {
                path: path.to_path_buf(),
                message: format!("profile `{}` inherits unknown profile `{}`", child, name),
            });
        };

        stack.push(name.to_string());
        let mut profile = Profile::default();
        for parent in section.inherits.iter().flat_map(Inherits::names) {
            self.flatten_profile(parent, path, stack, flattened)?;
            if let Some(inherited) = flattened.get(parent) {
                profile.extend(inherited);
            }
        }
        stack.pop();

        profile.extend(&Profile {
            cflags: section.cflags.clone(),
            lflags: section.lflags.clone(),
        });
        tracing::debug!(
            "profile `{}`: {} cflag(s), {} lflag(s)",
            name,
            profile.cflags.len(),
            profile.lflags.len()
        );
        flattened.insert(name.to_string(), profile);
        Ok(())
    }

    /// Package name.
    pub fn name(&self) -> &str {
        &self.package.name
    }

    /// Turn the descriptor into packages rooted at `base_path`.
    ///
    /// The library is always produced (an absent [library] section yields
    /// an empty, header-only library). Build targets are only produced when
    /// `include_builds` is set, which is the case for the root descriptor.
    pub fn into_packages(
        self,
        base_path: &Path,
        descriptor_path: &Path,
        include_builds: bool,
    ) -> Result<Vec<Package>, ResolveError> {
        let mut packages = Vec::new();
        let version = self.package.version.clone();

        let library = self.library.unwrap_or_default();
        packages.push(section_to_package(
            &self.package.name,
            &version,
            base_path,
            PackageKind::Library,
            library,
            descriptor_path,
        )?);

        if include_builds {
            for (name, section) in self.build {
                tracing::debug!("found build target: {}", name);
                packages.push(section_to_package(
                    &name,
                    &version,
                    base_path,
                    PackageKind::BuildTarget,
                    section,
                    descriptor_path,
                )?);
            }
        }

        let platform = cflag_table(self.platform);
        let compiler = cflag_table(self.compiler);
        for package in &mut packages {
            package.platform_cflags = platform.clone();
            package.compiler_cflags = compiler.clone();
        }

        Ok(packages)
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("must not be empty".to_string());
    }
    if let Some(c) = name
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '/' | '\\' | ':' | '$'))
    {
        return Err(format!("invalid character `{}` in `{}`", c, name));
    }
    Ok(())
}

fn cflag_table(sections: BTreeMap<String, FlagSection>) -> BTreeMap<String, Vec<String>> {
    sections
        .into_iter()
        .filter(|(_, section)| !section.cflags.is_empty())
        .map(|(name, section)| (name, section.cflags))
        .collect()
}

/// Split `"src/fast.cpp -O3 -ffast-math"` into the path and its flags.
fn split_source_entry(entry: &str) -> (&str, Vec<String>) {
    let entry = entry.trim();
    match entry.split_once(char::is_whitespace) {
        Some((path, flags)) => (path, flags.split_whitespace().map(str::to_string).collect()),
        None => (entry, Vec::new()),
    }
}

fn section_to_package(
    name: &str,
    version: &str,
    base_path: &Path,
    kind: PackageKind,
    section: Section,
    descriptor_path: &Path,
) -> Result<Package, ResolveError> {
    let expand = |patterns: &[String]| {
        expand_patterns(base_path, patterns).map_err(|e| ResolveError::DescriptorMalformed {
            path: descriptor_path.to_path_buf(),
            message: format!("{:#}", e),
        })
    };

    let mut package = Package::new(name, version, base_path, kind);
    package.link = section.link.unwrap_or_default();
    package.include.extend(section.include);
    package.libflags.extend(section.libflags);
    package.lflags.extend(section.lflags);
    package.libs.extend(section.libs);
    package.modules = expand(&section.modules)?;
    package.dependencies = section.dependencies;

    for entry in &section.sources {
        let (pattern, flags) = split_source_entry(entry);
        let pattern = pattern.to_string();
        for source in expand(std::slice::from_ref(&pattern))? {
            if !flags.is_empty() {
                let extra = package.source_cflags.entry(source.clone()).or_default();
                for flag in &flags {
                    if !extra.contains(flag) {
                        extra.push(flag.clone());
                    }
                }
            }
            if !package.sources.contains(&source) {
                package.sources.push(source);
            }
        }
    }

    tracing::debug!(
        "parsed {} `{}`: {} include path(s), {} source(s), {} module(s), {} dependency(ies)",
        kind,
        name,
        package.include.len(),
        package.sources.len(),
        package.modules.len(),
        package.dependencies.len()
    );

    Ok(package)
}

/// Path of the descriptor inside a package directory.
pub fn descriptor_path(dir: &Path) -> PathBuf {
    dir.join(crate::core::workspace::DESCRIPTOR_NAME)
}
