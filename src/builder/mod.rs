//! Build graph generation.
//!
//! Turns a lockfile into compile/archive/link edges for a toolchain profile
//! and renders them for the ninja backend and for compilation databases.

pub mod compdb;
pub mod graph;
pub mod ninja;
pub mod toolchain;

pub use graph::{
    ArchiveEdge, BuildGraph, BuildGraphError, BuildLayout, BuildSettings, CompileEdge, LinkEdge,
    LinkScope,
};
pub use toolchain::{
    detect_toolchain, CommandSpec, GccToolchain, LinkMode, MsvcToolchain, Toolchain,
    ToolchainPlatform,
};
