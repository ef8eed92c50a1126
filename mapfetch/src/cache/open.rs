//! Cache construction from configuration.

use crate::cache::disk::DiskCache;
use crate::cache::r#trait::{NoOpCache, ResourceCache};
use crate::cache::types::CacheConfig;
use std::sync::Arc;
use tracing::{info, warn};

/// Open the cache described by `config`.
///
/// Never fails: a disabled cache, a zero size limit or a directory that
/// cannot be used all yield a [`NoOpCache`], so fetching keeps working
/// without persistence.
pub fn open_cache(config: &CacheConfig) -> Arc<dyn ResourceCache> {
    if !config.enabled {
        info!("Persistent cache disabled");
        return Arc::new(NoOpCache);
    }

    match DiskCache::new(&config.directory, config.max_size_bytes) {
        Ok(cache) => {
            info!(
                directory = %config.directory.display(),
                max_size_bytes = config.max_size_bytes,
                entries = cache.entry_count(),
                "Opened disk cache"
            );
            Arc::new(cache)
        }
        Err(e) => {
            warn!(
                directory = %config.directory.display(),
                error = %e,
                "Failed to open disk cache, continuing without persistence"
            );
            Arc::new(NoOpCache)
        }
    }
}
