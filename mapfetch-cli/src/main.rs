//! MapFetch CLI - Command-line interface
//!
//! This binary provides a command-line interface to the MapFetch library.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use error::CliError;
use mapfetch::coordinator::MaxConcurrentTransfers;
use mapfetch::resource::ResourceKind;
use runner::{CliRunner, GlobalOptions};

#[derive(Parser)]
#[command(name = "mapfetch")]
#[command(version = mapfetch::VERSION)]
#[command(about = "Fetch map styles, sources, tiles, glyphs and sprites", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.mapfetch/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write the log file configured in [logging]
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch resources through the request coordinator
    Fetch {
        /// Resource kind: style, source, tile, glyphs, sprite-image, sprite-json, other
        #[arg(long, default_value = "other")]
        kind: ResourceKind,

        /// URLs to fetch (duplicates share one transfer)
        #[arg(required = true)]
        urls: Vec<String>,

        /// Access token (overrides config.ini)
        #[arg(long)]
        token: Option<String>,

        /// Directory to save fetched bodies into
        #[arg(long)]
        output: Option<PathBuf>,

        /// Bypass the persistent cache and ask intermediaries to revalidate
        #[arg(long)]
        no_cache: bool,

        /// Maximum transfers in flight, or 'unbounded' (overrides config.ini)
        #[arg(long)]
        max_concurrent: Option<MaxConcurrentTransfers>,
    },

    /// Print the normalized URL a resource would be fetched with
    Normalize {
        /// Resource kind
        #[arg(long, default_value = "other")]
        kind: ResourceKind,

        /// URL to normalize
        url: String,

        /// Access token (overrides config.ini)
        #[arg(long)]
        token: Option<String>,
    },

    /// Manage the persistent cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let runner = CliRunner::new(&GlobalOptions {
        config: cli.config,
        verbose: cli.verbose,
        log_file: cli.log_file,
    })?;

    match cli.command {
        Commands::Fetch {
            kind,
            urls,
            token,
            output,
            no_cache,
            max_concurrent,
        } => commands::fetch::run(
            &runner,
            FetchArgs {
                kind,
                urls,
                token,
                output,
                no_cache,
                max_concurrent,
            },
        ),
        Commands::Normalize { kind, url, token } => {
            commands::normalize::run(&runner, kind, &url, token.as_deref())
        }
        Commands::Cache { action } => commands::cache::run(&runner, action),
        Commands::Config { command } => commands::config::run(&runner, command),
    }
}
