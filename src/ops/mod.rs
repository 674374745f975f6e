//! High-level operations.
//!
//! This module contains the implementation of Anvil commands.

pub mod anvil_generate;
pub mod anvil_lock;
pub mod lockfile;
pub mod resolve;

pub use anvil_generate::{generate, GenerateOptions, GenerateResult};
pub use anvil_lock::{lock, LockResult};
pub use lockfile::{load_lockfile, require_lockfile, save_lockfile};
pub use resolve::{resolve_workspace, scan_modules, Resolution};
