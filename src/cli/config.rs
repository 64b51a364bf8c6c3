//! Config command handler.

use anyhow::{Context, Result};

use parley::config::Config;

/// Print the resolved configuration with API keys masked.
pub(crate) fn cmd_config() -> Result<()> {
    let config = Config::load().with_context(|| "Failed to load configuration")?;

    println!("Config file: {}", Config::path().display());
    println!();
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    Ok(())
}
