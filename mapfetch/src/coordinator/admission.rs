//! Admission control: the concurrency bound and its FIFO queue.

use super::config::MaxConcurrentTransfers;
use super::request::{RequestId, RequestSlot};
use crate::normalize::NormalizedUrl;
use std::collections::VecDeque;
use std::sync::Arc;

/// Counts active transfers and queues requests that must wait for a slot.
#[derive(Debug)]
pub(crate) struct Admission {
    limit: MaxConcurrentTransfers,
    active: usize,
    queue: VecDeque<Arc<RequestSlot>>,
}

impl Admission {
    pub(crate) fn new(limit: MaxConcurrentTransfers) -> Self {
        Self {
            limit,
            active: 0,
            queue: VecDeque::new(),
        }
    }

    pub(crate) fn has_capacity(&self) -> bool {
        self.limit.allows(self.active)
    }

    pub(crate) fn acquire(&mut self) {
        self.active += 1;
    }

    pub(crate) fn release(&mut self) {
        self.active = self.active.saturating_sub(1);
    }

    pub(crate) fn enqueue(&mut self, slot: Arc<RequestSlot>) {
        self.queue.push_back(slot);
    }

    /// Remove a queued request. Returns false if it was not queued.
    pub(crate) fn remove_queued(&mut self, id: RequestId) -> bool {
        match self.queue.iter().position(|slot| slot.id == id) {
            Some(pos) => {
                self.queue.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Pop the oldest queued request that is still outstanding, if a slot is
    /// free. Cancelled requests found on the way are discarded.
    pub(crate) fn next_ready(&mut self) -> Option<Arc<RequestSlot>> {
        if !self.has_capacity() {
            return None;
        }
        while let Some(slot) = self.queue.pop_front() {
            if slot.is_armed() {
                return Some(slot);
            }
        }
        None
    }

    /// Take every outstanding queued request for `url`, in queue order.
    pub(crate) fn take_url(&mut self, url: &NormalizedUrl) -> Vec<Arc<RequestSlot>> {
        let mut taken = Vec::new();
        self.queue.retain(|slot| {
            if &slot.url == url {
                if slot.is_armed() {
                    taken.push(Arc::clone(slot));
                }
                false
            } else {
                true
            }
        });
        taken
    }

    pub(crate) fn active(&self) -> usize {
        self.active
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
        self.active = 0;
    }
}
