//! Module ordering.
//!
//! Binary-interface modules must be compiled before the units importing
//! them. [`ModuleResolver`] produces that order with a depth-first walk
//! over the import graph, failing on cycles. Imports that name no known
//! module are tolerated: they are logged, skipped, and reported through
//! [`ModuleSet::unresolved_imports`].

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use crate::core::Module;
use crate::resolver::errors::ResolveError;

/// The scanned module set: named interfaces plus units that export nothing.
#[derive(Debug, Clone, Default)]
pub struct ModuleSet {
    named: BTreeMap<String, Module>,
    unnamed: Vec<Module>,
}

impl ModuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from scanned modules, rejecting duplicate exporters.
    pub fn from_modules(modules: impl IntoIterator<Item = Module>) -> Result<Self, ResolveError> {
        let mut set = Self::new();
        for module in modules {
            set.insert(module)?;
        }
        Ok(set)
    }

    pub fn insert(&mut self, module: Module) -> Result<(), ResolveError> {
        let Some(name) = module.exported_name.clone() else {
            self.unnamed.push(module);
            return Ok(());
        };

        if let Some(existing) = self.named.get(&name) {
            return Err(ResolveError::DuplicateModule {
                name,
                first: existing.file_path.clone(),
                second: module.file_path,
            });
        }
        self.named.insert(name, module);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.named.len() + self.unnamed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.unnamed.is_empty()
    }

    /// Imports naming no module in the set, from named interfaces and
    /// unnamed units alike. Unnamed units are labelled by their file.
    pub fn unresolved_imports(&self) -> Vec<ResolveError> {
        let mut gaps = ModuleResolver::new(&self.named).unresolved_imports();
        for unit in &self.unnamed {
            let label = unit.file_path.display().to_string();
            for import in unit.imports.iter().filter(|i| !self.named.contains_key(*i)) {
                tracing::warn!("{} imports unknown module `{}`", label, import);
                gaps.push(ResolveError::UnresolvedImport {
                    module: label.clone(),
                    import: import.clone(),
                });
            }
        }
        gaps
    }

    /// Source files in compilation order: named modules in resolved order,
    /// then unnamed units in scan order.
    pub fn ordered_files(&self) -> Result<Vec<PathBuf>, ResolveError> {
        let order = ModuleResolver::new(&self.named).resolve_order()?;

        let mut files: Vec<PathBuf> = order
            .iter()
            .filter_map(|name| self.named.get(name))
            .map(|m| m.file_path.clone())
            .collect();
        files.extend(self.unnamed.iter().map(|m| m.file_path.clone()));
        Ok(files)
    }
}

/// Depth-first orderer over a module registry.
#[derive(Debug, Clone, Copy)]
pub struct ModuleResolver<'a> {
    modules: &'a BTreeMap<String, Module>,
}

#[derive(Default)]
struct Traversal {
    visiting: Vec<String>,
    resolved: HashSet<String>,
    order: Vec<String>,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(modules: &'a BTreeMap<String, Module>) -> Self {
        ModuleResolver { modules }
    }

    /// Order every module so each comes after the modules it imports.
    pub fn resolve_order(&self) -> Result<Vec<String>, ResolveError> {
        let mut traversal = Traversal::default();
        for name in self.modules.keys() {
            self.visit(name, &mut traversal)?;
        }
        Ok(traversal.order)
    }

    fn visit(&self, name: &str, t: &mut Traversal) -> Result<(), ResolveError> {
        if t.resolved.contains(name) {
            return Ok(());
        }
        if let Some(pos) = t.visiting.iter().position(|n| n == name) {
            let mut cycle = t.visiting[pos..].to_vec();
            cycle.push(name.to_string());
            return Err(ResolveError::CircularDependency { cycle });
        }

        t.visiting.push(name.to_string());
        if let Some(module) = self.modules.get(name) {
            for import in &module.imports {
                if self.modules.contains_key(import) {
                    self.visit(import, t)?;
                } else {
                    tracing::warn!("module `{}` imports unknown module `{}`", name, import);
                }
            }
        }
        t.visiting.pop();

        t.resolved.insert(name.to_string());
        t.order.push(name.to_string());
        Ok(())
    }

    /// Imports naming modules outside the registry.
    pub fn unresolved_imports(&self) -> Vec<ResolveError> {
        self.modules
            .iter()
            .flat_map(|(name, module)| {
                module
                    .imports
                    .iter()
                    .filter(|import| !self.modules.contains_key(*import))
                    .map(move |import| ResolveError::UnresolvedImport {
                        module: name.clone(),
                        import: import.clone(),
                    })
            })
            .collect()
    }
}

/// Order a module registry; see [`ModuleResolver::resolve_order`].
pub fn resolve_order(modules: &BTreeMap<String, Module>) -> Result<Vec<String>, ResolveError> {
    ModuleResolver::new(modules).resolve_order()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(modules: &[(&str, &[&str])]) -> BTreeMap<String, Module> {
        modules
            .iter()
            .map(|(name, imports)| {
                (
                    name.to_string(),
                    Module::new(Some(*name), imports, format!("src/{}.cppm", name)),
                )
            })
            .collect()
    }

    #[test]
    fn test_chain_orders_dependencies_first() {
        let modules = registry(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        assert_eq!(resolve_order(&modules).unwrap(), ["c", "b", "a"]);
    }

    #[test]
    fn test_cycle_fails() {
        let modules = registry(&[("m1", &["m2"]), ("m2", &["m1"])]);
        let err = resolve_order(&modules).unwrap_err();
        match err {
            ResolveError::CircularDependency { cycle } => assert_eq!(cycle, ["m1", "m2", "m1"]),
            other => panic!("expected a cycle, got {other}"),
        }
    }

    #[test]
    fn test_order_is_topological() {
        let modules = registry(&[
            ("app", &["net", "log"]),
            ("net", &["core", "log"]),
            ("log", &["core"]),
            ("core", &[]),
            ("util", &["core"]),
        ]);
        let order = resolve_order(&modules).unwrap();
        assert_eq!(order.len(), modules.len());

        let index = |n: &str| order.iter().position(|o| o == n).unwrap();
        for (name, module) in &modules {
            for import in &module.imports {
                assert!(index(import.as_str()) < index(name.as_str()), "{import} must precede {name}");
            }
        }
    }

    #[test]
    fn test_unknown_import_is_tolerated() {
        let modules = registry(&[("app", &["std", "core"]), ("core", &[])]);
        let resolver = ModuleResolver::new(&modules);

        assert_eq!(resolver.resolve_order().unwrap(), ["core", "app"]);

        let gaps = resolver.unresolved_imports();
        assert_eq!(gaps.len(), 1);
        assert!(matches!(
            &gaps[0],
            ResolveError::UnresolvedImport { module, import } if module == "app" && import == "std"
        ));
    }

    #[test]
    fn test_unnamed_unit_imports_are_checked() {
        let set = ModuleSet::from_modules([
            Module::new(None, &["nosuch", "core"], "src/main.cpp"),
            Module::new(Some("core"), &[], "src/core.cppm"),
        ])
        .unwrap();
        assert_eq!(set.len(), 2);

        let gaps = set.unresolved_imports();
        assert_eq!(gaps.len(), 1);
        assert!(matches!(
            &gaps[0],
            ResolveError::UnresolvedImport { module, import }
                if module == "src/main.cpp" && import == "nosuch"
        ));
    }

    #[test]
    fn test_duplicate_exporter_is_rejected() {
        let err = ModuleSet::from_modules([
            Module::new(Some("core"), &[], "a/core.cppm"),
            Module::new(Some("core"), &[], "b/core.cppm"),
        ])
        .unwrap_err();
        assert!(matches!(err, ResolveError::DuplicateModule { .. }));
    }

    #[test]
    fn test_ordered_files_puts_unnamed_units_last() {
        let set = ModuleSet::from_modules([
            Module::new(None, &["net"], "src/impl.cpp"),
            Module::new(Some("net"), &["core"], "src/net.cppm"),
            Module::new(Some("core"), &[], "src/core.cppm"),
        ])
        .unwrap();

        let files = set.ordered_files().unwrap();
        assert_eq!(
            files,
            [
                PathBuf::from("src/core.cppm"),
                PathBuf::from("src/net.cppm"),
                PathBuf::from("src/impl.cpp"),
            ]
        );
    }
}
