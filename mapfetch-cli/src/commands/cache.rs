//! Cache management CLI commands.

use clap::Subcommand;
use mapfetch::cache::DiskCache;
use mapfetch::config::format_size;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Clear the persistent cache, removing all cached resources
    Clear,
    /// Show persistent cache statistics
    Stats,
}

/// Run a cache subcommand.
pub fn run(runner: &CliRunner, action: CacheAction) -> Result<(), CliError> {
    let settings = &runner.config().cache;
    let cache_dir = &settings.directory;

    if !settings.enabled {
        println!("Note: the persistent cache is disabled in the configuration.");
    }

    let cache = DiskCache::new(cache_dir, settings.max_size)?;

    match action {
        CacheAction::Clear => {
            println!("Clearing cache at: {}", cache_dir.display());
            let (files, bytes) = cache.clear()?;
            println!("Deleted {} files, freed {} bytes", files, bytes);
            Ok(())
        }
        CacheAction::Stats => {
            println!("Cache: {}", cache_dir.display());
            println!("  Files: {}", cache.entry_count());
            println!("  Size:  {} bytes", cache.size_bytes());
            println!("  Limit: {}", format_size(cache.max_size_bytes()));
            Ok(())
        }
    }
}
