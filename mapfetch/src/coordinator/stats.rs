//! Coordinator counters.

/// Cumulative counters kept by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Requests received by the daemon
    pub requests: u64,
    /// Requests attached to an entry that already existed
    pub coalesced: u64,
    /// Transfers answered from the persistent cache
    pub cache_hits: u64,
    /// Entries dispatched (cache lookup plus optional network fetch)
    pub transfers_started: u64,
    /// Dispatched entries whose result was fanned out
    pub transfers_completed: u64,
    /// Dispatched entries aborted because every waiter cancelled
    pub transfers_aborted: u64,
    /// Requests that had to wait in the admission queue
    pub queued: u64,
    /// Completions ignored because their entry no longer existed
    pub stale_completions: u64,
}

impl CoordinatorStats {
    /// Returns the coalescing ratio (0.0 to 1.0)
    pub fn coalescing_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.coalesced as f64 / self.requests as f64
        }
    }
}

/// Point-in-time view of the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorSnapshot {
    /// Entries with at least one waiter
    pub pending: usize,
    /// Transfers holding an admission slot
    pub active_transfers: usize,
    /// Requests waiting for a slot
    pub queued: usize,
    pub stats: CoordinatorStats,
}

impl CoordinatorSnapshot {
    /// True when nothing is pending, queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.active_transfers == 0 && self.queued == 0
    }
}
