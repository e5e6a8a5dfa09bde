//! Command implementations for the mlbox CLI

pub mod completions;
pub mod eval;
pub mod sync;
pub mod version;

use std::path::Path;

use mlbox::config::ClientConfig;
use mlbox::error::Result;

/// Client configuration with an optional root override from the command line
pub fn load_config(root: Option<&Path>) -> Result<ClientConfig> {
    ClientConfig::from_vars(|key| match (key, root) {
        ("MLBOX_ROOT", Some(root)) => Some(root.display().to_string()),
        _ => std::env::var(key).ok(),
    })
}

/// Progress bars only make sense on an interactive terminal
pub fn show_progress(disabled: bool) -> bool {
    !disabled && console::Term::stderr().is_term()
}
