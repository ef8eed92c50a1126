//! Disk cache with size-bounded, least-recently-used trimming.

use crate::cache::path::{cache_file_name, cache_path, CACHE_FILE_EXTENSION};
use crate::cache::r#trait::ResourceCache;
use crate::cache::types::CacheError;
use crate::cache::CacheStats;
use crate::normalize::NormalizedUrl;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

/// Persistent cache storing one file per normalized URL.
///
/// An in-memory index (file name → size, last access) is rebuilt from the
/// directory on open. When the total size goes over the limit, the least
/// recently used entries are removed until the cache is back under 90% of
/// the limit.
pub struct DiskCache {
    /// Cache directory root
    cache_dir: PathBuf,
    /// Maximum size in bytes
    max_size_bytes: usize,
    index: Mutex<DiskIndex>,
    stats: Mutex<CacheStats>,
}

#[derive(Default)]
struct DiskIndex {
    entries: HashMap<String, IndexEntry>,
    size_bytes: usize,
    /// Monotonic access counter; higher means more recently used.
    clock: u64,
}

struct IndexEntry {
    path: PathBuf,
    size: usize,
    last_access: u64,
}

impl DiskIndex {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn remove(&mut self, name: &str) -> Option<IndexEntry> {
        let entry = self.entries.remove(name)?;
        self.size_bytes = self.size_bytes.saturating_sub(entry.size);
        Some(entry)
    }
}

impl DiskCache {
    /// Opens (or creates) a disk cache.
    ///
    /// # Arguments
    ///
    /// * `cache_dir` - Root directory for cache storage
    /// * `max_size_bytes` - Maximum disk space to use
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or written to, or if
    /// `max_size_bytes` is zero.
    pub fn new(cache_dir: impl Into<PathBuf>, max_size_bytes: usize) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.into();

        if max_size_bytes == 0 {
            return Err(CacheError::InvalidConfig(
                "maximum cache size must be greater than zero".to_string(),
            ));
        }

        fs::create_dir_all(&cache_dir)?;
        probe_writable(&cache_dir)?;

        let cache = Self {
            cache_dir,
            max_size_bytes,
            index: Mutex::new(DiskIndex::default()),
            stats: Mutex::new(CacheStats::new()),
        };

        cache.scan_cache_dir()?;
        cache.evict_if_over_limit();

        Ok(cache)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Check if a URL has a cache entry.
    pub fn contains(&self, url: &NormalizedUrl) -> bool {
        self.index.lock().entries.contains_key(&cache_file_name(url))
    }

    pub fn entry_count(&self) -> usize {
        self.index.lock().entries.len()
    }

    pub fn size_bytes(&self) -> usize {
        self.index.lock().size_bytes
    }

    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    /// Remove every entry from the cache.
    ///
    /// Returns the number of files deleted and the bytes freed.
    pub fn clear(&self) -> Result<(usize, usize), CacheError> {
        let mut index = self.index.lock();

        let mut deleted = 0;
        for entry in index.entries.values() {
            if fs::remove_file(&entry.path).is_ok() {
                deleted += 1;
            }
        }
        let freed = index.size_bytes;

        index.entries.clear();
        index.size_bytes = 0;
        self.stats.lock().update_size(0, 0);

        info!(
            cache_dir = %self.cache_dir.display(),
            files = deleted,
            bytes = freed,
            "Cleared disk cache"
        );
        Ok((deleted, freed))
    }

    /// Evict least recently used entries until under the size limit.
    ///
    /// Returns the number of entries removed.
    pub fn evict_if_over_limit(&self) -> usize {
        let mut index = self.index.lock();
        self.evict_locked(&mut index)
    }

    fn evict_locked(&self, index: &mut DiskIndex) -> usize {
        if index.size_bytes <= self.max_size_bytes {
            return 0;
        }

        let target_size = self.max_size_bytes / 10 * 9; // Evict to 90%

        let mut by_age: Vec<(u64, String)> = index
            .entries
            .iter()
            .map(|(name, entry)| (entry.last_access, name.clone()))
            .collect();
        by_age.sort_unstable();

        let mut evicted = 0;
        let mut freed = 0;
        for (_, name) in by_age {
            if index.size_bytes <= target_size {
                break;
            }
            if let Some(entry) = index.remove(&name) {
                // A file that is already gone still frees its slot in the index
                let _ = fs::remove_file(&entry.path);
                freed += entry.size;
                evicted += 1;
            }
        }

        let mut stats = self.stats.lock();
        stats.record_eviction(evicted as u64);
        stats.update_size(index.size_bytes, index.entries.len());

        info!(
            evicted,
            freed_bytes = freed,
            size_bytes = index.size_bytes,
            "Disk cache eviction"
        );
        evicted
    }

    /// Rebuild the index from the files on disk, oldest modification first.
    fn scan_cache_dir(&self) -> Result<(), CacheError> {
        let mut found: Vec<(SystemTime, String, PathBuf, usize)> = Vec::new();

        for shard in fs::read_dir(&self.cache_dir)? {
            let shard = shard?.path();
            if !shard.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&shard)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some(CACHE_FILE_EXTENSION) {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if name.len() != 64 || !name.bytes().all(|b| b.is_ascii_hexdigit()) {
                    continue;
                }
                if let Ok(metadata) = fs::metadata(&path) {
                    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                    found.push((modified, name.to_string(), path.clone(), metadata.len() as usize));
                }
            }
        }

        found.sort_by_key(|(modified, ..)| *modified);

        let mut index = self.index.lock();
        for (_, name, path, size) in found {
            let last_access = index.tick();
            index.size_bytes += size;
            index.entries.insert(
                name,
                IndexEntry {
                    path,
                    size,
                    last_access,
                },
            );
        }

        self.stats
            .lock()
            .update_size(index.size_bytes, index.entries.len());

        debug!(
            cache_dir = %self.cache_dir.display(),
            entries = index.entries.len(),
            size_bytes = index.size_bytes,
            "Scanned disk cache"
        );
        Ok(())
    }
}

impl ResourceCache for DiskCache {
    fn lookup(&self, url: &NormalizedUrl) -> Option<Bytes> {
        let name = cache_file_name(url);
        let path = self.index.lock().entries.get(&name).map(|e| e.path.clone());

        let Some(path) = path else {
            self.stats.lock().record_miss();
            return None;
        };

        match fs::read(&path) {
            Ok(data) => {
                let mut index = self.index.lock();
                let now = index.tick();
                if let Some(entry) = index.entries.get_mut(&name) {
                    entry.last_access = now;
                }
                self.stats.lock().record_hit();
                Some(Bytes::from(data))
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cache file unreadable, dropping entry");
                let mut index = self.index.lock();
                index.remove(&name);
                let mut stats = self.stats.lock();
                stats.record_miss();
                stats.update_size(index.size_bytes, index.entries.len());
                None
            }
        }
    }

    fn store(&self, url: &NormalizedUrl, data: Bytes) -> Result<(), CacheError> {
        if data.len() > self.max_size_bytes {
            self.stats.lock().record_write_failure();
            return Err(CacheError::EntryTooLarge {
                size: data.len(),
                limit: self.max_size_bytes,
            });
        }

        let name = cache_file_name(url);
        let path = cache_path(&self.cache_dir, url);

        if let Err(e) = write_atomically(&path, &data) {
            self.stats.lock().record_write_failure();
            return Err(e.into());
        }

        let mut index = self.index.lock();
        index.remove(&name);
        let last_access = index.tick();
        index.size_bytes += data.len();
        index.entries.insert(
            name,
            IndexEntry {
                path,
                size: data.len(),
                last_access,
            },
        );

        {
            let mut stats = self.stats.lock();
            stats.record_write();
            stats.update_size(index.size_bytes, index.entries.len());
        }

        self.evict_locked(&mut index);
        Ok(())
    }

    fn name(&self) -> &str {
        "disk"
    }
}

/// Write to a temporary sibling and rename into place so readers never see a
/// partial file.
fn write_atomically(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)
}

fn probe_writable(dir: &Path) -> std::io::Result<()> {
    let probe = dir.join(".write-probe");
    fs::write(&probe, b"")?;
    fs::remove_file(&probe)
}
