//! Build graph compilation.
//!
//! A [`BuildGraph`] is the set of compile, archive and link edges derived
//! from a lockfile for one toolchain, build profile and build root. It is
//! rebuilt on every invocation and only persisted through a backend file.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::builder::toolchain::{host_platform, LinkMode, Toolchain};
use crate::core::{LinkKind, PackageKind};
use crate::resolver::{LockedPackage, Lockfile};
use crate::util::config::DEFAULT_PROFILE;
use crate::util::diagnostic::Diagnostic;
use crate::util::fs::{relative_to_root, to_slash};

/// Which libraries a build target links against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkScope {
    /// Every archived library in the lockfile
    #[default]
    All,
    /// Only the target's transitive dependencies
    Closure,
}

impl LinkScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkScope::All => "all",
            LinkScope::Closure => "closure",
        }
    }
}

impl fmt::Display for LinkScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(LinkScope::All),
            "closure" => Ok(LinkScope::Closure),
            _ => anyhow::bail!("invalid link scope `{}`, expected `all` or `closure`", s),
        }
    }
}

/// Generation-time choices that select flags out of the lockfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub scope: LinkScope,
    /// Profile whose flags are applied
    pub profile: String,
    /// Key into per-platform flag tables
    pub platform: &'static str,
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings {
            scope: LinkScope::default(),
            profile: DEFAULT_PROFILE.to_string(),
            platform: host_platform(),
        }
    }
}

impl BuildSettings {
    pub fn new(profile: impl Into<String>, scope: LinkScope) -> Self {
        BuildSettings {
            profile: profile.into(),
            scope,
            ..Default::default()
        }
    }

    pub fn with_platform(mut self, platform: &'static str) -> Self {
        self.platform = platform;
        self
    }
}

/// Error while compiling the build graph.
#[derive(Debug, Error)]
pub enum BuildGraphError {
    #[error("source `{source_path}` of {kind} `{package}` does not exist")]
    MissingSource {
        package: String,
        kind: PackageKind,
        source_path: String,
    },

    #[error("`{first}` and `{second}` of {kind} `{package}` both compile to `{object}`")]
    ObjectCollision {
        package: String,
        kind: PackageKind,
        object: String,
        first: String,
        second: String,
    },
}

impl BuildGraphError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            BuildGraphError::MissingSource {
                package,
                source_path,
                ..
            } => Diagnostic::error(format!("source file `{}` not found", source_path))
                .with_context(format!("listed by `{}` in the lockfile", package))
                .with_suggestion("Fix the path in Anvil.toml and run `anvil lock` again"),

            BuildGraphError::ObjectCollision {
                package,
                object,
                first,
                second,
                ..
            } => Diagnostic::error(format!("object file collision in `{}`", package))
                .with_context(format!("{} and {} both produce {}", first, second, object))
                .with_suggestion("Rename one of the sources"),
        }
    }
}

/// Where build outputs go.
///
/// Edge paths are written relative to the project root, which is where the
/// backend runs.
#[derive(Debug, Clone)]
pub struct BuildLayout {
    project_root: PathBuf,
    build_root: PathBuf,
}

impl BuildLayout {
    pub fn new(project_root: impl Into<PathBuf>, build_root: impl Into<PathBuf>) -> Self {
        BuildLayout {
            project_root: project_root.into(),
            build_root: build_root.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// The build root, as written into the backend file.
    pub fn out_dir(&self) -> String {
        to_slash(&relative_to_root(&self.project_root, &self.build_root))
    }

    /// Object directory of a package: `<build_root>/<library|build>/<name>`.
    pub fn object_dir(&self, kind: PackageKind, name: &str) -> String {
        format!("{}/{}/{}", self.out_dir(), kind.section(), name)
    }

    /// Directory receiving compiled module interfaces.
    pub fn module_dir(&self) -> String {
        format!("{}/modules", self.out_dir())
    }

    fn exists(&self, entry: &str) -> bool {
        self.project_root.join(entry).is_file()
    }
}

/// Compile a source to an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileEdge {
    pub package: String,
    pub kind: PackageKind,
    pub source: String,
    pub object: String,
    /// Include flags, then profile, platform, compiler, package and
    /// per-source compiler flags
    pub flags: Vec<String>,
    /// Module interface, compiled with the module rule
    pub module: bool,
    /// Outputs that must exist first without triggering rebuilds
    pub order_only: Vec<String>,
}

/// Bundle objects into a static library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEdge {
    pub package: String,
    pub kind: PackageKind,
    pub objects: Vec<String>,
    pub output: String,
}

/// Link objects and libraries into a binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEdge {
    pub target: String,
    pub mode: LinkMode,
    pub objects: Vec<String>,
    /// Library archives, dependents before their dependencies, followed by
    /// prebuilt libraries
    pub libraries: Vec<String>,
    pub lflags: Vec<String>,
    pub output: String,
}

/// All edges for one lockfile, build root and toolchain.
#[derive(Debug, Clone, Default)]
pub struct BuildGraph {
    pub compile: Vec<CompileEdge>,
    pub archive: Vec<ArchiveEdge>,
    pub link: Vec<LinkEdge>,
    /// Object files per package
    pub objects: BTreeMap<(PackageKind, String), Vec<String>>,
}

impl BuildGraph {
    /// Compile the edge set for `lockfile`.
    pub fn compile(
        lockfile: &Lockfile,
        layout: &BuildLayout,
        toolchain: &dyn Toolchain,
        settings: &BuildSettings,
    ) -> Result<Self, BuildGraphError> {
        if !lockfile.profile.is_empty() && lockfile.profile(&settings.profile).is_none() {
            tracing::warn!(
                "profile `{}` is not declared, building without profile flags",
                settings.profile
            );
        }
        GraphCompiler::new(lockfile, layout, toolchain, settings).run()
    }

    pub fn objects(&self, kind: PackageKind, name: &str) -> &[String] {
        self.objects
            .get(&(kind, name.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Final artifacts: everything produced for build targets, or the
    /// library archives when the project has no build targets.
    pub fn outputs(&self) -> Vec<&str> {
        let mut outputs: Vec<&str> = self
            .link
            .iter()
            .map(|e| e.output.as_str())
            .chain(
                self.archive
                    .iter()
                    .filter(|e| e.kind == PackageKind::BuildTarget)
                    .map(|e| e.output.as_str()),
            )
            .collect();

        if outputs.is_empty() {
            outputs = self.archive.iter().map(|e| e.output.as_str()).collect();
        }
        outputs.sort_unstable();
        outputs
    }

    pub fn is_empty(&self) -> bool {
        self.compile.is_empty() && self.archive.is_empty() && self.link.is_empty()
    }
}

struct GraphCompiler<'a> {
    lockfile: &'a Lockfile,
    layout: &'a BuildLayout,
    toolchain: &'a dyn Toolchain,
    settings: &'a BuildSettings,
    /// Module source -> object, for the global ordering chain
    module_objects: HashMap<&'a str, String>,
    graph: BuildGraph,
}

impl<'a> GraphCompiler<'a> {
    fn new(
        lockfile: &'a Lockfile,
        layout: &'a BuildLayout,
        toolchain: &'a dyn Toolchain,
        settings: &'a BuildSettings,
    ) -> Self {
        let mut module_objects = HashMap::new();
        for (kind, name, package) in lockfile.packages() {
            let dir = layout.object_dir(kind, name);
            for module in &package.modules {
                module_objects.insert(module.as_str(), object_path(&dir, module, toolchain));
            }
        }

        GraphCompiler {
            lockfile,
            layout,
            toolchain,
            settings,
            module_objects,
            graph: BuildGraph::default(),
        }
    }

    fn run(mut self) -> Result<BuildGraph, BuildGraphError> {
        let lockfile = self.lockfile;
        let profile = lockfile.profile(&self.settings.profile);
        let mut archives: Vec<(String, String)> = Vec::new();

        for (name, package) in &lockfile.library {
            let objects = self.compile_package(PackageKind::Library, name, package)?;
            if objects.is_empty() {
                tracing::debug!("library `{}` has no objects, skipping archive", name);
                continue;
            }

            let output = format!(
                "{}/{}",
                self.layout.object_dir(PackageKind::Library, name),
                self.toolchain.static_lib_name(name)
            );
            archives.push((name.clone(), output.clone()));
            self.graph.archive.push(ArchiveEdge {
                package: name.clone(),
                kind: PackageKind::Library,
                objects,
                output,
            });
        }

        for (name, package) in &lockfile.build {
            let objects = self.compile_package(PackageKind::BuildTarget, name, package)?;
            let out_dir = self.layout.out_dir();

            match package.link_kind() {
                LinkKind::Static => {
                    if objects.is_empty() {
                        tracing::warn!("static target `{}` has no objects, skipping", name);
                        continue;
                    }
                    self.graph.archive.push(ArchiveEdge {
                        package: name.clone(),
                        kind: PackageKind::BuildTarget,
                        objects,
                        output: format!("{}/{}", out_dir, self.toolchain.static_lib_name(name)),
                    });
                }
                kind => {
                    let (mode, file) = match kind {
                        LinkKind::Shared => {
                            (LinkMode::SharedLib, self.toolchain.shared_lib_name(name))
                        }
                        _ => (LinkMode::Executable, self.toolchain.exe_name(name)),
                    };
                    let libraries = self.link_libraries(package, &archives);
                    let lflags = package
                        .lflags
                        .iter()
                        .chain(profile.into_iter().flat_map(|p| p.lflags.iter()))
                        .cloned()
                        .collect();

                    tracing::debug!(
                        "link `{}`: {} object(s), {} librar(ies)",
                        name,
                        objects.len(),
                        libraries.len()
                    );
                    self.graph.link.push(LinkEdge {
                        target: name.clone(),
                        mode,
                        objects,
                        libraries,
                        lflags,
                        output: format!("{}/{}", out_dir, file),
                    });
                }
            }
        }

        Ok(self.graph)
    }

    /// Emit compile edges for one package; returns its objects.
    fn compile_package(
        &mut self,
        kind: PackageKind,
        name: &str,
        package: &'a LockedPackage,
    ) -> Result<Vec<String>, BuildGraphError> {
        let dir = self.layout.object_dir(kind, name);
        let flags = self
            .toolchain
            .compile_flags(&package.include, &self.package_cflags(package));

        let mut produced: HashMap<String, &str> = HashMap::new();
        let mut objects = Vec::new();

        let units = package
            .modules
            .iter()
            .map(|m| (m, true))
            .chain(package.sources.iter().map(|s| (s, false)));

        for (source, module) in units {
            if !self.layout.exists(source) {
                return Err(BuildGraphError::MissingSource {
                    package: name.to_string(),
                    kind,
                    source_path: source.clone(),
                });
            }

            let object = object_path(&dir, source, self.toolchain);
            if let Some(first) = produced.insert(object.clone(), source.as_str()) {
                return Err(BuildGraphError::ObjectCollision {
                    package: name.to_string(),
                    kind,
                    object,
                    first: first.to_string(),
                    second: source.clone(),
                });
            }

            let order_only = if module {
                self.previous_module(source).into_iter().collect()
            } else {
                self.last_module().into_iter().collect()
            };

            let mut edge_flags = flags.clone();
            if let Some(extra) = package.source_cflags.get(source) {
                edge_flags.extend(self.toolchain.compile_flags(&[], extra));
            }

            self.graph.compile.push(CompileEdge {
                package: name.to_string(),
                kind,
                source: source.clone(),
                object: object.clone(),
                flags: edge_flags,
                module,
                order_only,
            });
            objects.push(object);
        }

        self.graph
            .objects
            .insert((kind, name.to_string()), objects.clone());
        Ok(objects)
    }

    /// Profile, platform and compiler flags followed by the package's own.
    fn package_cflags(&self, package: &LockedPackage) -> Vec<String> {
        let profile = self.lockfile.profile(&self.settings.profile);
        let platform = package.platform_cflags.get(self.settings.platform);
        let compiler = package
            .compiler_cflags
            .get(self.toolchain.platform().as_str());

        let mut cflags: Vec<String> = Vec::new();
        for flag in profile
            .into_iter()
            .flat_map(|p| p.cflags.iter())
            .chain(platform.into_iter().flatten())
            .chain(compiler.into_iter().flatten())
            .chain(package.libflags.iter())
        {
            if !cflags.contains(flag) {
                cflags.push(flag.clone());
            }
        }
        cflags
    }

    /// Object of the module preceding `source` in the global order.
    fn previous_module(&self, source: &str) -> Option<String> {
        let order = &self.lockfile.modules;
        let index = order.iter().position(|m| m == source)?;
        let previous = order.get(index.checked_sub(1)?)?;
        self.module_objects.get(previous.as_str()).cloned()
    }

    /// Object of the last module in the global order.
    fn last_module(&self) -> Option<String> {
        self.lockfile
            .modules
            .iter()
            .rev()
            .find_map(|m| self.module_objects.get(m.as_str()).cloned())
    }

    fn link_libraries(&self, target: &LockedPackage, archives: &[(String, String)]) -> Vec<String> {
        let scope = self.settings.scope;
        let selected: Vec<&(String, String)> = match scope {
            LinkScope::All => archives.iter().collect(),
            LinkScope::Closure => archives
                .iter()
                .filter(|(name, _)| target.dependencies.contains(name))
                .collect(),
        };

        let names: Vec<&str> = selected.iter().map(|(n, _)| n.as_str()).collect();
        let outputs: HashMap<&str, &str> = selected
            .iter()
            .map(|(n, o)| (n.as_str(), o.as_str()))
            .collect();

        let mut prebuilt: BTreeSet<&str> = target.libs.iter().map(String::as_str).collect();
        if scope == LinkScope::All {
            for library in self.lockfile.library.values() {
                prebuilt.extend(library.libs.iter().map(String::as_str));
            }
        }

        link_order(self.lockfile, &names)
            .into_iter()
            .filter_map(|name| outputs.get(name).map(|o| o.to_string()))
            .chain(prebuilt.into_iter().map(str::to_string))
            .collect()
    }
}

/// Order libraries so each one precedes the libraries it depends on.
///
/// Falls back to name order when the lockfile dependencies contain a cycle.
pub fn link_order<'n>(lockfile: &Lockfile, names: &[&'n str]) -> Vec<&'n str> {
    let mut graph: DiGraph<&'n str, ()> = DiGraph::new();
    let nodes: HashMap<&str, NodeIndex> = names
        .iter()
        .map(|name| (*name, graph.add_node(*name)))
        .collect();

    for name in names {
        let Some(package) = lockfile.library.get(*name) else {
            continue;
        };
        for dep in &package.dependencies {
            if let Some(&to) = nodes.get(dep.as_str()) {
                graph.add_edge(nodes[name], to, ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => order.into_iter().map(|n| graph[n]).collect(),
        Err(cycle) => {
            tracing::warn!(
                "library dependencies form a cycle through `{}`, linking in name order",
                graph[cycle.node_id()]
            );
            let mut sorted = names.to_vec();
            sorted.sort_unstable();
            sorted
        }
    }
}

/// `<dir>/<stem><object-ext>`.
fn object_path(dir: &str, source: &str, toolchain: &dyn Toolchain) -> String {
    let stem = Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string());
    format!("{}/{}{}", dir, stem, toolchain.object_extension())
}
