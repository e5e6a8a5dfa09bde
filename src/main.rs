//! mlbox - machine-learning artifact client
//!
//! Moves versioned dataset and model bundles between a local and a remote
//! store, and runs evaluation jobs on the host or in a container.

use clap::Parser;
use tracing::Level;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let root = cli.root.as_deref();
    let result = match cli.command {
        Commands::Upload(args) => commands::sync::upload(root, args),
        Commands::Download(args) => commands::sync::download(root, args),
        Commands::Eval(args) => commands::eval::run(root, args),
        Commands::Version => commands::version::run(),
        Commands::Completions(args) => commands::completions::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
