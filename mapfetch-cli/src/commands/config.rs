//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init` for locating,
//! viewing and creating the configuration file.

use clap::Subcommand;
use mapfetch::config::{format_size, ConfigFile};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration (file values over defaults)
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(runner: &CliRunner, command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(runner),
        ConfigCommands::Show => run_show(runner),
        ConfigCommands::Init { force } => run_init(runner, force),
    }
}

/// Show the configuration file path.
fn run_path(runner: &CliRunner) -> Result<(), CliError> {
    println!("{}", runner.config_path().display());
    Ok(())
}

/// List all configuration settings.
fn run_show(runner: &CliRunner) -> Result<(), CliError> {
    let config = runner.config();
    let path = runner.config_path();

    println!("Configuration Settings");
    println!("======================");
    if !path.exists() {
        println!("(no file at {}, showing defaults)", path.display());
    }
    println!();

    println!("[network]");
    println!(
        "  access_token = {}",
        config
            .network
            .access_token
            .as_deref()
            .map(mask_token)
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!("  api_base_url = {}", config.network.api_base_url);
    if config.network.managed_hosts.is_empty() {
        println!("  managed_hosts = (not set)");
    } else {
        println!("  managed_hosts = {}", config.network.managed_hosts.join(", "));
    }
    println!("  user_agent = {}", config.network.user_agent);
    println!("  timeout = {}", config.network.timeout);
    match &config.network.ca_bundle {
        Some(path) => println!("  ca_bundle = {}", path.display()),
        None => println!("  ca_bundle = (not set)"),
    }
    println!();

    println!("[cache]");
    println!("  path = {}", config.cache.directory.display());
    println!("  max_size = {}", format_size(config.cache.max_size));
    println!("  enabled = {}", config.cache.enabled);
    println!();

    println!("[coordinator]");
    println!(
        "  max_concurrent_transfers = {}",
        config.coordinator.max_concurrent_transfers
    );
    println!();

    println!("[logging]");
    println!("  directory = {}", config.logging.directory.display());
    println!("  file = {}", config.logging.file);

    Ok(())
}

/// Write the default configuration file.
fn run_init(runner: &CliRunner, force: bool) -> Result<(), CliError> {
    let path = runner.config_path();

    if force {
        ConfigFile::default().save_to(path)?;
        println!("Wrote default configuration to {}", path.display());
    } else if ConfigFile::ensure_exists_at(path)? {
        println!("Created configuration file at {}", path.display());
    } else {
        println!("Configuration file already exists at {}", path.display());
        println!("Use --force to overwrite it with defaults.");
    }

    Ok(())
}

/// Show only the first few characters of a token.
fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(6).collect();
    if visible.len() == token.len() {
        "*".repeat(token.chars().count())
    } else {
        format!("{}…", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("pk.eyJ1Ijoi"), "pk.eyJ…");
        assert_eq!(mask_token("short"), "*****");
    }
}
