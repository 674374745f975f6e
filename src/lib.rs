//! Anvil - dependency resolution and build-graph generation for C++
//!
//! This crate provides the core library functionality for Anvil: loading
//! `Anvil.toml` descriptors, merging packages with their dependencies,
//! ordering C++ modules, snapshotting the result into `Anvil.lock` and
//! turning that snapshot into a ninja build graph.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod util;

pub use core::{Module, Package, PackageKind, Workspace};

pub use resolver::{Lockfile, PackageResolver, ResolveError};
pub use util::context::GlobalContext;
