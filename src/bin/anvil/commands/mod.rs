//! Command implementations

pub mod generate;
pub mod lock;
pub mod modules;
pub mod tree;
