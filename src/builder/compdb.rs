//! compile_commands.json generation.

use serde::{Deserialize, Serialize};

use crate::builder::graph::{BuildGraph, BuildLayout};
use crate::builder::toolchain::Toolchain;
use crate::util::fs::to_slash;

/// A compile_commands.json entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCommand {
    /// Working directory
    pub directory: String,
    /// Source file
    pub file: String,
    /// Command arguments
    pub arguments: Vec<String>,
    /// Output file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// One entry per compile edge, run from the project root.
pub fn compile_commands(
    graph: &BuildGraph,
    layout: &BuildLayout,
    toolchain: &dyn Toolchain,
) -> Vec<CompileCommand> {
    let directory = to_slash(layout.project_root());
    let module_dir = layout.module_dir();

    graph
        .compile
        .iter()
        .map(|edge| {
            let spec = toolchain.compile_command(
                &edge.source,
                &edge.object,
                &edge.flags,
                edge.module.then_some(module_dir.as_str()),
            );

            CompileCommand {
                directory: directory.clone(),
                file: edge.source.clone(),
                arguments: spec.to_argv(),
                output: Some(edge.object.clone()),
            }
        })
        .collect()
}

/// Render the compilation database as pretty-printed JSON.
pub fn render(
    graph: &BuildGraph,
    layout: &BuildLayout,
    toolchain: &dyn Toolchain,
) -> serde_json::Result<String> {
    let mut json = serde_json::to_string_pretty(&compile_commands(graph, layout, toolchain))?;
    json.push('\n');
    Ok(json)
}
