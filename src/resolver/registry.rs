//! Package registry partitioned by kind.

use std::collections::BTreeMap;

use crate::core::{Package, PackageKind};

/// All packages known to a resolution run.
///
/// Libraries and build targets live in separate namespaces, so a project
/// may have a library and an executable with the same name.
#[derive(Debug, Clone, Default)]
pub struct PackageRegistry {
    libraries: BTreeMap<String, Package>,
    targets: BTreeMap<String, Package>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn namespace(&self, kind: PackageKind) -> &BTreeMap<String, Package> {
        match kind {
            PackageKind::Library => &self.libraries,
            PackageKind::BuildTarget => &self.targets,
        }
    }

    fn namespace_mut(&mut self, kind: PackageKind) -> &mut BTreeMap<String, Package> {
        match kind {
            PackageKind::Library => &mut self.libraries,
            PackageKind::BuildTarget => &mut self.targets,
        }
    }

    /// Register a package. The first registration of a name wins; returns
    /// `false` if the name was already taken in that namespace.
    pub fn register(&mut self, package: Package) -> bool {
        let namespace = self.namespace_mut(package.kind);
        if namespace.contains_key(&package.name) {
            tracing::debug!(
                "{} `{}` is already registered, keeping the first definition",
                package.kind,
                package.name
            );
            return false;
        }
        namespace.insert(package.name.clone(), package);
        true
    }

    pub fn get(&self, kind: PackageKind, name: &str) -> Option<&Package> {
        self.namespace(kind).get(name)
    }

    pub fn get_mut(&mut self, kind: PackageKind, name: &str) -> Option<&mut Package> {
        self.namespace_mut(kind).get_mut(name)
    }

    pub fn contains(&self, kind: PackageKind, name: &str) -> bool {
        self.namespace(kind).contains_key(name)
    }

    /// Find which namespace a name is registered in, libraries first.
    pub fn lookup(&self, name: &str) -> Option<PackageKind> {
        if self.libraries.contains_key(name) {
            Some(PackageKind::Library)
        } else if self.targets.contains_key(name) {
            Some(PackageKind::BuildTarget)
        } else {
            None
        }
    }

    /// Libraries, in name order.
    pub fn libraries(&self) -> impl Iterator<Item = &Package> {
        self.libraries.values()
    }

    /// Build targets, in name order.
    pub fn build_targets(&self) -> impl Iterator<Item = &Package> {
        self.targets.values()
    }

    /// Every package: libraries first, then build targets.
    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.libraries.values().chain(self.targets.values())
    }

    pub fn len(&self) -> usize {
        self.libraries.len() + self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty() && self.targets.is_empty()
    }
}
