//! `anvil lock` command

use std::path::Path;

use anyhow::Result;

use anvil::ops::lock;
use anvil::util::diagnostic::emit;
use anvil::GlobalContext;

pub fn execute(ctx: &GlobalContext, manifest: Option<&Path>) -> Result<()> {
    let ws = ctx.workspace(manifest)?;
    let result = lock(&ws)?;

    for problem in &result.unresolved {
        emit(&problem.to_diagnostic(), ctx.color());
    }

    println!(
        "Locked {} package(s) into {}",
        result.lockfile.packages().count(),
        result.path.display()
    );
    Ok(())
}
