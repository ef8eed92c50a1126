//! Fetch command - fetch one or more resources through the coordinator.
//!
//! All URLs are submitted before any response is awaited, so duplicates
//! coalesce and the admission limit applies exactly as it would for a
//! renderer.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use mapfetch::coordinator::{CoordinatorConfig, CoordinatorStats, MaxConcurrentTransfers};
use mapfetch::resource::{Resource, ResourceKind, Response, ResponseStatus};
use mapfetch::service::{FetchService, ServiceError};
use mapfetch::transport::CachePreference;
use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the fetch command.
pub struct FetchArgs {
    pub kind: ResourceKind,
    pub urls: Vec<String>,
    pub token: Option<String>,
    pub output: Option<PathBuf>,
    pub no_cache: bool,
    pub max_concurrent: Option<MaxConcurrentTransfers>,
}

/// Run the fetch command.
pub fn run(runner: &CliRunner, args: FetchArgs) -> Result<(), CliError> {
    runner.log_startup("fetch");

    let mut config = runner.config().clone();
    if let Some(token) = args.token {
        config.network.access_token = Some(token);
    }
    if args.no_cache {
        config.cache.enabled = false;
    }

    let mut coordinator = CoordinatorConfig::from(&config);
    if let Some(limit) = args.max_concurrent {
        coordinator = coordinator.with_max_concurrent_transfers(limit);
    }
    if args.no_cache {
        coordinator = coordinator.with_cache_preference(CachePreference::PreferNetwork);
    }

    if let Some(dir) = &args.output {
        fs::create_dir_all(dir).map_err(|e| CliError::FileWrite {
            path: dir.display().to_string(),
            error: e,
        })?;
    }

    let resources: Vec<Resource> = args
        .urls
        .iter()
        .map(|url| Resource::new(args.kind, url.as_str()))
        .collect();

    println!(
        "Fetching {} {} resource(s) (max concurrent transfers: {})",
        resources.len(),
        args.kind,
        coordinator.max_concurrent_transfers
    );

    let start = Instant::now();
    let (responses, stats) = runner.block_on(fetch_all(&config, coordinator, &resources))??;
    let elapsed = start.elapsed();

    let mut failed = 0;
    for (index, (resource, response)) in resources.iter().zip(&responses).enumerate() {
        match response.status {
            ResponseStatus::Successful => {
                let origin = if response.from_cache { ", cached" } else { "" };
                println!("✓ {} ({} bytes{})", resource.url, response.data.len(), origin);

                if let Some(dir) = &args.output {
                    let path = dir.join(output_file_name(&resource.url, index));
                    write_output(&path, response)?;
                    println!("  Saved: {}", path.display());
                }
            }
            _ => {
                failed += 1;
                println!(
                    "✗ {}: {}",
                    resource.url,
                    response.message.as_deref().unwrap_or("no data")
                );
            }
        }
    }

    println!();
    println!("Completed in {:.2}s", elapsed.as_secs_f64());
    if let Some(stats) = stats {
        println!(
            "  Requests: {}  Transfers: {}  Coalesced: {}  Cache hits: {}",
            stats.requests, stats.transfers_started, stats.coalesced, stats.cache_hits
        );
        info!(?stats, "Fetch finished");
    }

    if failed > 0 {
        return Err(CliError::Fetch {
            failed,
            total: resources.len(),
        });
    }
    Ok(())
}

async fn fetch_all(
    config: &mapfetch::config::ConfigFile,
    coordinator: CoordinatorConfig,
    resources: &[Resource],
) -> Result<(Vec<Arc<Response>>, Option<CoordinatorStats>), CliError> {
    let service = FetchService::start_with(config, coordinator)?;

    let pending: Vec<_> = resources
        .iter()
        .map(|resource| service.source().fetch(resource))
        .collect();

    let mut responses = Vec::with_capacity(pending.len());
    for ((_handle, rx), resource) in pending.into_iter().zip(resources) {
        let response = rx.await.map_err(|_| {
            ServiceError::NotRunning(format!("no response for {}", resource.url))
        })?;
        responses.push(response);
    }

    let stats = service.snapshot().await.map(|snapshot| snapshot.stats);
    service.shutdown().await;

    Ok((responses, stats))
}

fn write_output(path: &Path, response: &Response) -> Result<(), CliError> {
    fs::write(path, &response.data).map_err(|e| CliError::FileWrite {
        path: path.display().to_string(),
        error: e,
    })
}

/// File name for a fetched URL: its path with `/` replaced by `_`.
///
/// Scheme, host, query and fragment are dropped. Falls back to
/// `resource-<n>` when nothing usable remains.
fn output_file_name(url: &str, index: usize) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme
        .split_once('/')
        .map_or("", |(_, path)| path)
        .split(['?', '#'])
        .next()
        .unwrap_or("");

    let name: String = path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .collect::<Vec<_>>()
        .join("_");

    if name.is_empty() {
        format!("resource-{}", index + 1)
    } else {
        name
    }
}
