//! `anvil tree` command

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Result};

use crate::cli::TreeArgs;
use anvil::ops::require_lockfile;
use anvil::resolver::Lockfile;
use anvil::{GlobalContext, PackageKind};

pub fn execute(args: TreeArgs, ctx: &GlobalContext, manifest: Option<&Path>) -> Result<()> {
    let ws = ctx.workspace(manifest)?;
    let lockfile = require_lockfile(&ws.lockfile_path())?;
    let max_depth = args.depth.unwrap_or(usize::MAX);

    let roots: Vec<(PackageKind, String)> = match args.package {
        Some(name) => {
            if lockfile.get(PackageKind::BuildTarget, &name).is_some() {
                vec![(PackageKind::BuildTarget, name)]
            } else if lockfile.get(PackageKind::Library, &name).is_some() {
                vec![(PackageKind::Library, name)]
            } else {
                bail!(
                    "package `{}` is not in the lockfile\n\
                     hint: run `anvil lock` after editing Anvil.toml",
                    name
                );
            }
        }
        None if lockfile.build.is_empty() => lockfile
            .library
            .keys()
            .map(|n| (PackageKind::Library, n.clone()))
            .collect(),
        None => lockfile
            .build
            .keys()
            .map(|n| (PackageKind::BuildTarget, n.clone()))
            .collect(),
    };

    for (kind, name) in &roots {
        let mut seen = HashSet::new();
        print_tree(&lockfile, *kind, name, 0, max_depth, &mut seen);
    }

    Ok(())
}

fn print_tree(
    lockfile: &Lockfile,
    kind: PackageKind,
    name: &str,
    depth: usize,
    max_depth: usize,
    seen: &mut HashSet<String>,
) {
    if depth > max_depth {
        return;
    }

    let Some(package) = lockfile.get(kind, name) else {
        return;
    };

    let is_duplicate = depth > 0 && !seen.insert(name.to_string());

    let prefix = if depth == 0 {
        String::new()
    } else {
        format!("{}├── ", "│   ".repeat(depth - 1))
    };
    let marker = match (kind, package.link) {
        (PackageKind::BuildTarget, Some(link)) => format!(" [{}]", link.as_str()),
        _ => String::new(),
    };
    let dup_marker = if is_duplicate { " (*)" } else { "" };

    println!("{}{} v{}{}{}", prefix, name, package.version, marker, dup_marker);

    if is_duplicate {
        return;
    }

    for dep in lockfile.direct_dependencies(kind, name) {
        print_tree(lockfile, PackageKind::Library, dep, depth + 1, max_depth, seen);
    }
}
