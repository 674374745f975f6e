//! Lockfile I/O operations.

use std::path::Path;

use anyhow::{Context, Result};

use crate::resolver::encode::Lockfile;
use crate::util::diagnostic::suggestions;

/// Load a lockfile from the given path, if there is one.
pub fn load_lockfile(path: &Path) -> Result<Option<Lockfile>> {
    if !path.exists() {
        return Ok(None);
    }

    let lockfile = Lockfile::load(path)?;
    Ok(Some(lockfile))
}

/// Load a lockfile that must exist.
pub fn require_lockfile(path: &Path) -> Result<Lockfile> {
    load_lockfile(path)?.with_context(|| {
        format!(
            "no lockfile at {}\n{}",
            path.display(),
            suggestions::NO_LOCKFILE
        )
    })
}

/// Save a lockfile, replacing any previous one atomically.
pub fn save_lockfile(path: &Path, lockfile: &Lockfile) -> Result<()> {
    lockfile.save(path)?;
    tracing::debug!("wrote {}", path.display());
    Ok(())
}
