//! Core data structures for Anvil.
//!
//! This module contains the descriptor model used throughout Anvil:
//! - Descriptors (the typed Anvil.toml schema)
//! - Packages and their mergeable build properties
//! - Modules for binary-interface ordering
//! - Workspace paths

pub mod descriptor;
pub mod module;
pub mod package;
pub mod workspace;

pub use descriptor::Descriptor;
pub use module::Module;
pub use package::{LinkKind, Package, PackageKind};
pub use workspace::{
    find_descriptor, Workspace, COMPDB_NAME, DESCRIPTOR_NAME, LOCKFILE_NAME, NINJA_FILE_NAME,
};
