//! Cache statistics tracking and reporting.

use std::time::Instant;

/// Cache statistics for monitoring and debugging.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_failures: u64,
    pub evictions: u64,
    pub size_bytes: usize,
    pub entry_count: usize,
    pub created_at: Instant,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStats {
    /// Create a new statistics tracker.
    pub fn new() -> Self {
        Self {
            hits: 0,
            misses: 0,
            writes: 0,
            write_failures: 0,
            evictions: 0,
            size_bytes: 0,
            entry_count: 0,
            created_at: Instant::now(),
        }
    }

    /// Hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
    }

    pub fn record_eviction(&mut self, count: u64) {
        self.evictions += count;
    }

    pub fn update_size(&mut self, size_bytes: usize, entry_count: usize) {
        self.size_bytes = size_bytes;
        self.entry_count = entry_count;
    }

    /// Format statistics as a human-readable block.
    pub fn format(&self) -> String {
        format!(
            r#"Entries:     {}
Size:        {:.2} MB
Hits:        {}
Misses:      {}
Hit Rate:    {:.1}%
Writes:      {} ({} failed)
Evictions:   {}"#,
            self.entry_count,
            self.size_bytes as f64 / (1024.0 * 1024.0),
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.writes,
            self.write_failures,
            self.evictions,
        )
    }
}
