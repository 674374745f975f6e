//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use anvil::builder::ToolchainPlatform;

/// Anvil - dependency resolution and build-graph generation for C++
#[derive(Parser)]
#[command(name = "anvil")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to Anvil.toml (defaults to searching from the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve dependencies and write Anvil.lock
    Lock,

    /// Generate build.ninja from Anvil.lock
    Generate(GenerateArgs),

    /// Print the module compilation order
    Modules,

    /// Display the dependency tree
    Tree(TreeArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Generate for the release profile
    #[arg(short, long)]
    pub release: bool,

    /// Compiler family (gcc, clang, msvc)
    #[arg(long)]
    pub toolchain: Option<ToolchainPlatform>,

    /// Emit compile_commands.json
    #[arg(long)]
    pub compile_commands: bool,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Package to show tree for (defaults to every build target)
    pub package: Option<String>,

    /// Maximum depth to display
    #[arg(short, long)]
    pub depth: Option<usize>,
}
