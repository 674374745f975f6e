//! Module - a compilation unit in the binary-interface import graph.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::resolver::errors::ResolveError;

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//[^\n]*").expect("valid regex"));

static EXPORT_MODULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*export\s+module\s+([\w.:]+)\s*;").expect("valid regex")
});

static MODULE_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*module\s+([\w.:]+)\s*;").expect("valid regex"));

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:export\s+)?import\s+([\w.:]+)\s*;").expect("valid regex")
});

/// A single compilation unit participating in module ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Importable name (interface or partition); `None` for implementation
    /// units and plain sources
    pub exported_name: Option<String>,

    /// Names of imported modules, in source order
    pub imports: Vec<String>,

    /// Source location
    pub file_path: PathBuf,
}

impl Module {
    pub fn new(exported_name: Option<&str>, imports: &[&str], file_path: impl Into<PathBuf>) -> Self {
        Module {
            exported_name: exported_name.map(str::to_string),
            imports: imports.iter().map(|s| s.to_string()).collect(),
            file_path: file_path.into(),
        }
    }

    /// Read and scan a module source file.
    pub fn scan(path: &Path) -> Result<Self, ResolveError> {
        let content = std::fs::read_to_string(path).map_err(|source| ResolveError::ModuleScan {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content, path))
    }

    /// Extract module declarations from source text.
    ///
    /// Comments are stripped first. Partition imports (`import :part;`) are
    /// qualified with the primary module name the unit declares, exported or
    /// not; header unit imports (`import <vector>;`) are not module names and
    /// are skipped.
    ///
    /// Implementation units (`module net;`) export nothing. Internal
    /// partitions (`module net:impl;`) are named, since other units of the
    /// module import them.
    pub fn parse(content: &str, path: &Path) -> Self {
        let stripped = BLOCK_COMMENT.replace_all(content, "");
        let stripped = LINE_COMMENT.replace_all(&stripped, "");

        let declared = MODULE_DECL.captures(&stripped).map(|c| c[1].to_string());
        let exported_name = EXPORT_MODULE
            .captures(&stripped)
            .map(|c| c[1].to_string())
            .or_else(|| declared.clone().filter(|name| name.contains(':')));

        let primary = exported_name
            .as_deref()
            .or(declared.as_deref())
            .map(|name| name.split(':').next().unwrap_or(name).to_string());

        let mut imports = Vec::new();
        for caps in IMPORT.captures_iter(&stripped) {
            let name = &caps[1];
            let qualified = match (name.strip_prefix(':'), &primary) {
                (Some(part), Some(primary)) => format!("{}:{}", primary, part),
                _ => name.to_string(),
            };
            if !imports.contains(&qualified) {
                imports.push(qualified);
            }
        }

        Module {
            exported_name,
            imports,
            file_path: path.to_path_buf(),
        }
    }

    /// The exported name, if any.
    pub fn name(&self) -> Option<&str> {
        self.exported_name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interface() {
        let src = r#"
module;
#include <cstdio>
export module net.socket;

import core;
export import net.addr;
import <vector>;

export void connect();
"#;
        let module = Module::parse(src, Path::new("socket.cppm"));
        assert_eq!(module.name(), Some("net.socket"));
        assert_eq!(module.imports, vec!["core", "net.addr"]);
    }

    #[test]
    fn test_parse_ignores_commented_declarations() {
        let src = r#"
// export module fake;
/* import hidden;
   import also_hidden; */
export module real;
import dep; // import trailing;
"#;
        let module = Module::parse(src, Path::new("real.ixx"));
        assert_eq!(module.name(), Some("real"));
        assert_eq!(module.imports, vec!["dep"]);
    }

    #[test]
    fn test_internal_partition_qualifies_its_imports() {
        let module = Module::parse("module net:impl;\nimport :part;\n", Path::new("impl.cpp"));
        assert_eq!(module.name(), Some("net:impl"));
        assert_eq!(module.imports, vec!["net:part"]);

        let unit = Module::parse("module net;\nimport :detail;\n", Path::new("net.cpp"));
        assert_eq!(unit.name(), None);
        assert_eq!(unit.imports, vec!["net:detail"]);
    }

    #[test]
    fn test_parse_implementation_unit_has_no_name() {
        let module = Module::parse("module net;\nimport core;\n", Path::new("impl.cpp"));
        assert_eq!(module.name(), None);
        assert_eq!(module.imports, vec!["core"]);
    }

    #[test]
    fn test_parse_qualifies_partition_imports() {
        let src = "export module net;\nexport import :addr;\nimport :detail;\n";
        let module = Module::parse(src, Path::new("net.cppm"));
        assert_eq!(module.imports, vec!["net:addr", "net:detail"]);

        let part = Module::parse("export module net:addr;\nimport :detail;\n", Path::new("addr.cppm"));
        assert_eq!(part.name(), Some("net:addr"));
        assert_eq!(part.imports, vec!["net:detail"]);
    }

    #[test]
    fn test_scan_missing_file() {
        let err = Module::scan(Path::new("/nonexistent/mod.cppm")).unwrap_err();
        assert!(matches!(err, ResolveError::ModuleScan { .. }));
    }
}
