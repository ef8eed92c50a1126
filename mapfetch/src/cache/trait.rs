//! Cache trait definition for dependency injection.

use crate::cache::types::CacheError;
use crate::normalize::NormalizedUrl;
use bytes::Bytes;

/// Key-value byte store keyed by normalized URL.
///
/// Implementations are called from the blocking thread pool, so they may do
/// synchronous disk I/O.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use mapfetch::cache::{NoOpCache, ResourceCache};
/// use mapfetch::normalize::NormalizedUrl;
///
/// fn read_through(cache: &dyn ResourceCache, url: &NormalizedUrl) -> Bytes {
///     if let Some(data) = cache.lookup(url) {
///         return data;
///     }
///     let data = Bytes::from_static(b"fetched");
///     cache.store(url, data.clone()).ok();
///     data
/// }
///
/// let url = NormalizedUrl::new("https://example.com/style.json");
/// assert_eq!(read_through(&NoOpCache, &url), Bytes::from_static(b"fetched"));
/// ```
pub trait ResourceCache: Send + Sync {
    /// Returns the cached bytes for `url`, if present.
    fn lookup(&self, url: &NormalizedUrl) -> Option<Bytes>;

    /// Stores bytes for `url`, replacing any previous value.
    fn store(&self, url: &NormalizedUrl, data: Bytes) -> Result<(), CacheError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Cache that never stores anything.
///
/// Used when caching is disabled or the configured cache could not be opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCache;

impl ResourceCache for NoOpCache {
    fn lookup(&self, _url: &NormalizedUrl) -> Option<Bytes> {
        None
    }

    fn store(&self, _url: &NormalizedUrl, _data: Bytes) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "none"
    }
}
