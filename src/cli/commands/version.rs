//! cli::commands::version
//!
//! Print version information.

use anyhow::Result;

/// Print the version string.
pub fn version() -> Result<()> {
    println!("commit-headless v{}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
