//! build.ninja generation.
//!
//! The output depends only on the graph, the layout and the toolchain, so
//! regenerating from the same lockfile yields a byte-identical file.

use crate::builder::graph::{BuildGraph, BuildLayout};
use crate::builder::toolchain::{LinkMode, Toolchain};
use crate::util::fs::to_slash;

const HEADER: &str = "# This file is automatically generated by Anvil.\n\
                      # It is not intended for manual editing.\n";

/// Escape a path for use in a `build` line.
pub fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '$' => out.push_str("$$"),
            ' ' => out.push_str("$ "),
            ':' => out.push_str("$:"),
            '\n' => out.push_str("$\n"),
            c => out.push(c),
        }
    }
    out
}

/// Escape a variable value.
pub fn escape_value(value: &str) -> String {
    value.replace('$', "$$")
}

fn escape_paths<'a>(paths: impl IntoIterator<Item = &'a String>) -> String {
    paths
        .into_iter()
        .map(|p| escape_path(p))
        .collect::<Vec<_>>()
        .join(" ")
}

struct NinjaWriter {
    out: String,
}

impl NinjaWriter {
    fn new() -> Self {
        NinjaWriter {
            out: String::from(HEADER),
        }
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn variable(&mut self, key: &str, value: &str, indent: bool) {
        if indent {
            self.out.push_str("  ");
        }
        self.out.push_str(&format!("{} = {}\n", key, value));
    }

    fn rule(&mut self, name: &str, command: &str, description: &str) {
        self.out.push_str(&format!("rule {}\n", name));
        self.variable("command", command, true);
        self.variable("description", description, true);
        self.blank();
    }

    fn build(&mut self, outputs: &str, rule: &str, inputs: &str, order_only: &str) {
        self.out.push_str(&format!("build {}: {}", outputs, rule));
        if !inputs.is_empty() {
            self.out.push(' ');
            self.out.push_str(inputs);
        }
        if !order_only.is_empty() {
            self.out.push_str(" || ");
            self.out.push_str(order_only);
        }
        self.out.push('\n');
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Render the ninja file for a build graph.
pub fn render(graph: &BuildGraph, layout: &BuildLayout, toolchain: &dyn Toolchain) -> String {
    let mut w = NinjaWriter::new();
    w.blank();

    w.variable("ninja_required_version", "1.3", false);
    w.variable("builddir", &escape_value(&layout.out_dir()), false);
    w.variable("module_dir", &escape_value(&layout.module_dir()), false);
    w.variable("cxx", &escape_value(&to_slash(toolchain.compiler())), false);
    w.variable("ar", &escape_value(&to_slash(toolchain.archiver())), false);
    w.variable("ld", &escape_value(&to_slash(toolchain.linker())), false);
    w.blank();

    w.rule("compile", &toolchain.compile_rule(), "CXX $out");
    w.rule("module_compile", &toolchain.module_compile_rule(), "MODULE $out");
    w.rule("archive", &toolchain.archive_rule(), "AR $out");
    w.rule("link", &toolchain.link_rule(LinkMode::Executable), "LINK $out");
    w.rule("link_shared", &toolchain.link_rule(LinkMode::SharedLib), "LINK $out");

    for edge in &graph.compile {
        let rule = if edge.module { "module_compile" } else { "compile" };
        w.build(
            &escape_path(&edge.object),
            rule,
            &escape_path(&edge.source),
            &escape_paths(&edge.order_only),
        );
        w.variable("cflags", &escape_value(&edge.flags.join(" ")), true);
    }
    if !graph.compile.is_empty() {
        w.blank();
    }

    for edge in &graph.archive {
        w.build(&escape_path(&edge.output), "archive", &escape_paths(&edge.objects), "");
    }
    if !graph.archive.is_empty() {
        w.blank();
    }

    for edge in &graph.link {
        let rule = match edge.mode {
            LinkMode::Executable => "link",
            LinkMode::SharedLib => "link_shared",
        };
        let inputs = escape_paths(edge.objects.iter().chain(edge.libraries.iter()));
        w.build(&escape_path(&edge.output), rule, &inputs, "");
        w.variable("lflags", &escape_value(&edge.lflags.join(" ")), true);
    }
    if !graph.link.is_empty() {
        w.blank();
    }

    let defaults = graph.outputs();
    if !defaults.is_empty() {
        let defaults: Vec<String> = defaults.into_iter().map(escape_path).collect();
        w.out.push_str(&format!("default {}\n", defaults.join(" ")));
    }

    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::graph::{ArchiveEdge, CompileEdge, LinkEdge};
    use crate::builder::toolchain::{GccToolchain, ToolchainPlatform};
    use crate::core::PackageKind;

    fn graph() -> BuildGraph {
        BuildGraph {
            compile: vec![
                CompileEdge {
                    package: "core".to_string(),
                    kind: PackageKind::Library,
                    source: "src/core.cpp".to_string(),
                    object: "build/debug/library/core/core.o".to_string(),
                    flags: vec!["-Iinc".to_string(), "-O2".to_string()],
                    module: false,
                    order_only: Vec::new(),
                },
                CompileEdge {
                    package: "app".to_string(),
                    kind: PackageKind::BuildTarget,
                    source: "my app/main.cpp".to_string(),
                    object: "build/debug/build/app/main.o".to_string(),
                    flags: Vec::new(),
                    module: false,
                    order_only: Vec::new(),
                },
            ],
            archive: vec![ArchiveEdge {
                package: "core".to_string(),
                kind: PackageKind::Library,
                objects: vec!["build/debug/library/core/core.o".to_string()],
                output: "build/debug/library/core/libcore.a".to_string(),
            }],
            link: vec![LinkEdge {
                target: "app".to_string(),
                mode: LinkMode::Executable,
                objects: vec!["build/debug/build/app/main.o".to_string()],
                libraries: vec!["build/debug/library/core/libcore.a".to_string()],
                lflags: vec!["-lm".to_string()],
                output: "build/debug/app".to_string(),
            }],
            ..Default::default()
        }
    }

    fn render_gcc(graph: &BuildGraph) -> String {
        let layout = BuildLayout::new("/work/app", "/work/app/build/debug");
        let gcc = GccToolchain::new("g++", "ar", "g++", ToolchainPlatform::Gcc);
        render(graph, &layout, &gcc)
    }

    #[test]
    fn test_escape_path() {
        assert_eq!(escape_path("C:/a b/$x"), "C$:/a$ b/$$x");
    }

    #[test]
    fn test_render_edges() {
        let ninja = render_gcc(&graph());

        assert!(ninja.starts_with("# This file is automatically generated by Anvil."));
        assert!(ninja.contains("rule compile\n  command = $cxx -c $in -o $out $cflags\n"));
        assert!(ninja.contains("rule link_shared\n"));
        assert!(ninja.contains(
            "build build/debug/library/core/core.o: compile src/core.cpp\n  cflags = -Iinc -O2\n"
        ));
        assert!(ninja.contains("build build/debug/build/app/main.o: compile my$ app/main.cpp\n"));
        assert!(ninja.contains(
            "build build/debug/library/core/libcore.a: archive build/debug/library/core/core.o\n"
        ));
        assert!(ninja.contains(
            "build build/debug/app: link build/debug/build/app/main.o build/debug/library/core/libcore.a\n  lflags = -lm\n"
        ));
        assert!(ninja.ends_with("default build/debug/app\n"));
    }

    #[test]
    fn test_order_only_dependencies() {
        let mut graph = graph();
        graph.compile[1].order_only = vec!["build/debug/library/core/m.o".to_string()];

        let ninja = render_gcc(&graph);
        assert!(ninja.contains("my$ app/main.cpp || build/debug/library/core/m.o\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(render_gcc(&graph()), render_gcc(&graph()));
    }
}
