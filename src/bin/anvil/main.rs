//! Anvil CLI - dependency resolution and build-graph generation for C++

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use anvil::builder::BuildGraphError;
use anvil::util::diagnostic::emit;
use anvil::{GlobalContext, ResolveError};
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;

    if let Err(e) = run(cli) {
        report(&e, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("anvil=debug")
    } else {
        EnvFilter::new("anvil=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);
    ctx.set_color(!cli.no_color);
    let manifest = cli.manifest_path.as_deref();

    match cli.command {
        Commands::Lock => commands::lock::execute(&ctx, manifest),
        Commands::Generate(args) => commands::generate::execute(args, &ctx, manifest),
        Commands::Modules => commands::modules::execute(&ctx, manifest),
        Commands::Tree(args) => commands::tree::execute(args, &ctx, manifest),
    }
}

/// Render typed errors as diagnostics, anything else as a plain chain.
fn report(err: &anyhow::Error, color: bool) {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<ResolveError>() {
            emit(&e.to_diagnostic(), color);
            return;
        }
        if let Some(e) = cause.downcast_ref::<BuildGraphError>() {
            emit(&e.to_diagnostic(), color);
            return;
        }
    }
    eprintln!("error: {:#}", err);
}
