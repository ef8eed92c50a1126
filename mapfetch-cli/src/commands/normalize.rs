//! Normalize command - print the coalescing key for a URL.

use mapfetch::coordinator::CoordinatorConfig;
use mapfetch::normalize::UrlNormalizer;
use mapfetch::resource::{Resource, ResourceKind};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the normalize command.
///
/// Uses the managed hosting and access token from the configuration unless
/// `token` overrides the token.
pub fn run(
    runner: &CliRunner,
    kind: ResourceKind,
    url: &str,
    token: Option<&str>,
) -> Result<(), CliError> {
    let coordinator = CoordinatorConfig::from(runner.config());
    let token = token.unwrap_or(&coordinator.access_token);
    let normalizer = UrlNormalizer::new(coordinator.hosting.clone());

    let normalized = normalizer.normalize_resource(&Resource::new(kind, url), token);
    println!("{}", normalized);

    Ok(())
}
