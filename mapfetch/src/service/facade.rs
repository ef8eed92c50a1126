//! Fetch service facade implementation.

use super::error::ServiceError;
use crate::cache::{open_cache, CacheConfig, ResourceCache};
use crate::config::ConfigFile;
use crate::coordinator::{CoordinatorConfig, CoordinatorDaemon, CoordinatorSnapshot, FileSource};
use crate::resource::{Resource, Response};
use crate::transport::{HttpTransport, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// High-level facade for fetching map resources.
///
/// Encapsulates component creation and wiring: the HTTP transport, the
/// persistent cache and the coordinator daemon. Callers use [`source`]
/// for callback-style requests or [`fetch`] to await a single response.
///
/// # Example
///
/// ```ignore
/// use mapfetch::config::ConfigFile;
/// use mapfetch::resource::Resource;
/// use mapfetch::service::FetchService;
///
/// let service = FetchService::start(&ConfigFile::load()?)?;
/// let response = service.fetch(&Resource::style("mapbox://styles/mapbox/streets-v11")).await?;
/// service.shutdown().await;
/// ```
///
/// [`source`]: FetchService::source
/// [`fetch`]: FetchService::fetch
pub struct FetchService {
    source: FileSource,
    cache: Arc<dyn ResourceCache>,
    shutdown: CancellationToken,
    daemon: JoinHandle<()>,
}

impl FetchService {
    /// Start a service from the configuration file.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or no runtime is
    /// available. An unusable cache directory is not an error; the service
    /// runs without persistence.
    pub fn start(config: &ConfigFile) -> Result<Self, ServiceError> {
        Self::start_with(config, CoordinatorConfig::from(config))
    }

    /// Like [`start`](Self::start), with explicit coordinator settings.
    pub fn start_with(
        config: &ConfigFile,
        coordinator: CoordinatorConfig,
    ) -> Result<Self, ServiceError> {
        let transport = HttpTransport::with_options(
            Duration::from_secs(config.network.timeout),
            config.network.ca_bundle.as_deref(),
        )?;
        let cache = open_cache(&CacheConfig::from(&config.cache));

        Self::with_parts(coordinator, Arc::new(transport), cache)
    }

    /// Start a service from already-built components.
    pub fn with_parts<T: Transport>(
        config: CoordinatorConfig,
        transport: Arc<T>,
        cache: Arc<dyn ResourceCache>,
    ) -> Result<Self, ServiceError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ServiceError::Runtime(e.to_string()))?;

        info!(
            max_concurrent_transfers = %config.max_concurrent_transfers,
            cache = cache.name(),
            "Starting fetch service"
        );

        let (daemon, source) = CoordinatorDaemon::new(config, transport, Arc::clone(&cache));
        let shutdown = CancellationToken::new();
        let daemon = runtime.spawn(daemon.run(shutdown.clone()));

        Ok(Self {
            source,
            cache,
            shutdown,
            daemon,
        })
    }

    /// Handle for submitting requests; clone freely.
    pub fn source(&self) -> &FileSource {
        &self.source
    }

    /// The persistent cache in use.
    pub fn cache(&self) -> &Arc<dyn ResourceCache> {
        &self.cache
    }

    /// Fetch one resource and wait for its response.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotRunning`] if the coordinator stops before
    /// answering. Transport failures are not errors here; they arrive as a
    /// response with [`ResponseStatus::Error`](crate::resource::ResponseStatus::Error).
    pub async fn fetch(&self, resource: &Resource) -> Result<Arc<Response>, ServiceError> {
        let (_handle, response) = self.source.fetch(resource);
        response
            .await
            .map_err(|_| ServiceError::NotRunning(format!("no response for {}", resource.url)))
    }

    /// Current coordinator state, or `None` once it has stopped.
    pub async fn snapshot(&self) -> Option<CoordinatorSnapshot> {
        self.source.snapshot().await
    }

    /// Stop the coordinator and wait for it to exit.
    ///
    /// Transfers still in flight are aborted; their callers get no response.
    pub async fn shutdown(self) {
        debug!("Shutting down fetch service");
        self.shutdown.cancel();
        if let Err(e) = self.daemon.await {
            debug!(error = %e, "Coordinator task ended abnormally");
        }
        info!("Fetch service stopped");
    }
}
