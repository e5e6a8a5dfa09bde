//! CLI definitions using clap derive API
//!
//! Argument types live in one submodule per command:
//! - sync: upload and download arguments
//! - eval: evaluation job arguments
//! - completions: completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod completions;
pub mod eval;
pub mod sync;

pub use completions::CompletionsArgs;
pub use eval::EvalArgs;
pub use sync::SyncArgs;

/// mlbox - machine-learning artifact client
#[derive(Parser, Debug)]
#[command(
    name = "mlbox",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Sync versioned ML bundles and run evaluation jobs",
    long_about = "mlbox moves content-addressed dataset and model bundles between a local store \
                  and a remote store, and runs evaluation jobs on the host or inside a container.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  mlbox upload mnist/gq4wmmrrgezd --remote /mnt/shared    \x1b[90m# Push a dataset version\x1b[0m\n   \
                  mlbox download mnist/gq4wmmrrgezd --remote /mnt/shared  \x1b[90m# Fetch it elsewhere\x1b[0m\n   \
                  mlbox eval --model ./mnist --dataset mnist/gq4wmmrrgezd  \x1b[90m# Evaluate on the host\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Client root directory (defaults to ~/.mlbox)
    #[arg(long, global = true, env = "MLBOX_ROOT")]
    pub root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Push a local bundle version to a remote store
    Upload(SyncArgs),

    /// Fetch a bundle version from a remote store
    Download(SyncArgs),

    /// Run an evaluation job
    Eval(EvalArgs),

    /// Show version information
    #[command(hide = true)]
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}
