//! Implementation of `anvil generate`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::builder::graph::{BuildGraph, BuildLayout, BuildSettings};
use crate::builder::toolchain::{detect_toolchain, ToolchainPlatform};
use crate::builder::{compdb, ninja};
use crate::core::Workspace;
use crate::ops::lockfile::require_lockfile;
use crate::util::fs::write_atomic;

/// Options for the generate command.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Emit compile_commands.json next to build.ninja
    pub emit_compile_commands: bool,
}

/// Outcome of a successful `anvil generate`.
#[derive(Debug)]
pub struct GenerateResult {
    pub ninja_path: PathBuf,
    pub compdb_path: Option<PathBuf>,
    pub toolchain: ToolchainPlatform,
    pub compile_edges: usize,
    pub archive_edges: usize,
    pub link_edges: usize,
}

/// Turn `Anvil.lock` into `build.ninja` for the configured profile and
/// toolchain.
///
/// Only the lockfile is read; descriptors are not consulted again.
pub fn generate(ws: &Workspace, opts: &GenerateOptions) -> Result<GenerateResult> {
    let lockfile = require_lockfile(&ws.lockfile_path())?;
    let config = ws.config();

    let toolchain = detect_toolchain(config)?;
    let settings = BuildSettings::new(config.profile(), config.link_scope()?);
    let layout = BuildLayout::new(ws.root(), ws.build_root());

    tracing::info!(
        "Generating `{}` profile with {} on {} ({} linking)",
        settings.profile,
        toolchain.platform(),
        settings.platform,
        settings.scope
    );

    let graph = BuildGraph::compile(&lockfile, &layout, toolchain.as_ref(), &settings)?;
    if graph.is_empty() {
        tracing::warn!("nothing to build: the lockfile declares no sources");
    }

    let ninja_path = ws.ninja_path();
    let content = ninja::render(&graph, &layout, toolchain.as_ref());
    write_atomic(&ninja_path, &content)
        .with_context(|| format!("failed to write {}", ninja_path.display()))?;
    tracing::info!("Wrote {}", ninja_path.display());

    let compdb_path = if opts.emit_compile_commands || config.build.emit_compile_commands {
        let path = ws.compdb_path();
        let content = compdb::render(&graph, &layout, toolchain.as_ref())
            .context("failed to serialize compile_commands.json")?;
        write_atomic(&path, &content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("Wrote {}", path.display());
        Some(path)
    } else {
        None
    };

    Ok(GenerateResult {
        ninja_path,
        compdb_path,
        toolchain: toolchain.platform(),
        compile_edges: graph.compile.len(),
        archive_edges: graph.archive.len(),
        link_edges: graph.link.len(),
    })
}
