//! `anvil generate` command

use std::path::Path;

use anyhow::Result;

use crate::cli::GenerateArgs;
use anvil::ops::{generate, GenerateOptions};
use anvil::GlobalContext;

pub fn execute(args: GenerateArgs, ctx: &GlobalContext, manifest: Option<&Path>) -> Result<()> {
    let mut ws = ctx.workspace(manifest)?;

    let config = ws.config_mut();
    if args.release {
        config.build.profile = Some("release".to_string());
    }
    if let Some(toolchain) = args.toolchain {
        config.build.toolchain = Some(toolchain.to_string());
    }

    let opts = GenerateOptions {
        emit_compile_commands: args.compile_commands,
    };
    let result = generate(&ws, &opts)?;

    println!(
        "Generated {} ({} compile, {} archive, {} link)",
        result.ninja_path.display(),
        result.compile_edges,
        result.archive_edges,
        result.link_edges
    );
    if let Some(path) = result.compdb_path {
        println!("Generated {}", path.display());
    }
    Ok(())
}
