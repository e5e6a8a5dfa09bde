//! Version command implementation

use mlbox::content::OBJECT_HASH_ALGO;
use mlbox::error::Result;

/// Run version command
pub fn run() -> Result<()> {
    println!("mlbox {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Build info:");
    println!("  Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    println!("  Profile: {}", build_profile());
    println!("  Object hash: {}", OBJECT_HASH_ALGO);

    Ok(())
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}
