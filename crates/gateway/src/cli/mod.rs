//! Command-line surface, trimmed from the teacher's `Cli`/`Command` pair
//! down to what this service needs (SPEC_FULL.md §2.4).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sa_domain::config::Config;

#[derive(Parser, Debug)]
#[command(name = "observability-gateway", about = "Agent communication observability gateway")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP/WebSocket server (the default when no subcommand is given).
    Serve,
    /// Inspect or validate the active configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the resolved configuration as TOML.
    Show,
    /// Validate the resolved configuration and exit nonzero on errors.
    Validate,
}

fn config_path() -> PathBuf {
    std::env::var("SA_CONFIG")
        .unwrap_or_else(|_| "config.toml".to_string())
        .into()
}

/// Loads configuration from `SA_CONFIG` (default `config.toml`), falling
/// back to `Config::default()` when the file does not exist.
pub fn load_config() -> anyhow::Result<Config> {
    let path = config_path();
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file found, using defaults");
        return Ok(Config::default());
    }
    Config::load(&path).map_err(|e| anyhow::anyhow!("failed to load config from {}: {e}", path.display()))
}
