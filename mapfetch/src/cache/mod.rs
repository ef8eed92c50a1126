//! Persistent resource cache.
//!
//! The coordinator only sees the cache through [`ResourceCache`]: a lookup
//! before dispatch and a best-effort store after a successful transfer.
//! Capacity and eviction belong to the store itself.

mod disk;
mod open;
mod path;
mod stats;
mod r#trait;
mod types;

pub use disk::DiskCache;
pub use open::open_cache;
pub use path::{cache_file_name, cache_path};
pub use r#trait::{NoOpCache, ResourceCache};
pub use stats::CacheStats;
pub use types::{CacheConfig, CacheError, DEFAULT_CACHE_MAX_SIZE};
