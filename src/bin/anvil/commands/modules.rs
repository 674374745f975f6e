//! `anvil modules` command

use std::path::Path;

use anyhow::Result;

use anvil::ops::resolve_workspace;
use anvil::util::diagnostic::emit;
use anvil::util::fs::{relative_to_root, to_slash};
use anvil::GlobalContext;

pub fn execute(ctx: &GlobalContext, manifest: Option<&Path>) -> Result<()> {
    let ws = ctx.workspace(manifest)?;
    let resolution = resolve_workspace(&ws)?;

    for problem in &resolution.unresolved {
        emit(&problem.to_diagnostic(), ctx.color());
    }

    if resolution.module_order.is_empty() {
        println!("No modules declared");
        return Ok(());
    }

    for (i, file) in resolution.module_order.iter().enumerate() {
        println!("{:>3}. {}", i + 1, to_slash(&relative_to_root(ws.root(), file)));
    }
    Ok(())
}
