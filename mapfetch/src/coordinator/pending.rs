//! In-flight entries keyed by normalized URL.

use super::request::{RequestId, RequestSlot};
use crate::normalize::NormalizedUrl;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Identity of one dispatched entry.
///
/// A URL can be dispatched, aborted and dispatched again; completions carry
/// the id so that a late result of the first transfer is not mistaken for the
/// second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct EntryId(u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One in-flight fetch and the requests waiting on it.
#[derive(Debug)]
pub(crate) struct PendingEntry {
    pub(crate) id: EntryId,
    pub(crate) url: NormalizedUrl,
    /// Waiters in arrival order
    pub(crate) waiters: Vec<Arc<RequestSlot>>,
    pub(crate) abort: CancellationToken,
}

impl PendingEntry {
    pub(crate) fn attach(&mut self, slot: Arc<RequestSlot>) {
        self.waiters.push(slot);
    }

    /// Remove request `id`, along with any waiter already cancelled.
    ///
    /// Returns true if `id` was a waiter of this entry.
    pub(crate) fn detach(&mut self, id: RequestId) -> bool {
        let found = self.waiters.iter().any(|w| w.id == id);
        self.waiters.retain(|w| w.id != id && w.is_armed());
        found
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

/// The coalescing map: at most one entry per normalized URL.
#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    entries: HashMap<NormalizedUrl, PendingEntry>,
    next_id: u64,
}

impl PendingTable {
    pub(crate) fn get_mut(&mut self, url: &NormalizedUrl) -> Option<&mut PendingEntry> {
        self.entries.get_mut(url)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, url: &NormalizedUrl) -> bool {
        self.entries.contains_key(url)
    }

    /// Create the entry for `url` with its first waiters.
    ///
    /// Returns the new entry's id and abort token.
    pub(crate) fn insert(
        &mut self,
        url: NormalizedUrl,
        waiters: Vec<Arc<RequestSlot>>,
    ) -> (EntryId, CancellationToken) {
        self.next_id += 1;
        let id = EntryId(self.next_id);
        let abort = CancellationToken::new();

        self.entries.insert(
            url.clone(),
            PendingEntry {
                id,
                url,
                waiters,
                abort: abort.clone(),
            },
        );
        (id, abort)
    }

    pub(crate) fn remove(&mut self, url: &NormalizedUrl) -> Option<PendingEntry> {
        self.entries.remove(url)
    }

    /// Remove the entry for `url` only if it is entry `id`.
    pub(crate) fn remove_if(&mut self, url: &NormalizedUrl, id: EntryId) -> Option<PendingEntry> {
        match self.entries.get(url) {
            Some(entry) if entry.id == id => self.entries.remove(url),
            _ => None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = PendingEntry> + '_ {
        self.entries.drain().map(|(_, entry)| entry)
    }
}
