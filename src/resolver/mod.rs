//! Dependency resolution.
//!
//! Two independent resolvers live here: [`PackageResolver`] merges build
//! properties along package dependencies, and [`ModuleResolver`] orders
//! binary-interface modules. Their combined result is encoded as the
//! [`Lockfile`].

pub mod encode;
pub mod errors;
pub mod modules;
pub mod packages;
pub mod registry;

pub use encode::{LockedPackage, Lockfile, LOCKFILE_VERSION};
pub use errors::ResolveError;
pub use modules::{resolve_order, ModuleResolver, ModuleSet};
pub use packages::PackageResolver;
pub use registry::PackageRegistry;
