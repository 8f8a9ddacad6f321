//! batchbuild CLI - batch checkout-and-build orchestration

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use batchbuild::util::shell::{ColorChoice, Shell};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("batchbuild=debug")
    } else {
        EnvFilter::new("batchbuild=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let shell = Shell::new(cli.verbose, color);

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(&shell, args),
        Commands::List(args) => commands::list::execute(args),
        Commands::Doctor => commands::doctor::execute(),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
