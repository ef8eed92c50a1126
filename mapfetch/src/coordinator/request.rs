//! Requests and the handles callers keep for them.

use super::daemon::Command;
use crate::normalize::NormalizedUrl;
use crate::resource::Response;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Callback receiving the shared response of a request.
pub type Callback = Box<dyn FnOnce(Arc<Response>) + Send + 'static>;

/// Unique identifier of a submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub(crate) u64);

impl RequestId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A request as seen by the daemon.
///
/// The callback sits behind a mutex shared with the caller's
/// [`RequestHandle`]. Whoever takes it first wins: delivery invokes it,
/// cancellation drops it. This makes "no callback after cancel returns" hold
/// without waiting for the daemon.
pub(crate) struct RequestSlot {
    pub(crate) id: RequestId,
    pub(crate) url: NormalizedUrl,
    callback: Mutex<Option<Callback>>,
}

impl RequestSlot {
    pub(crate) fn new(id: RequestId, url: NormalizedUrl, callback: Callback) -> Self {
        Self {
            id,
            url,
            callback: Mutex::new(Some(callback)),
        }
    }

    /// True until the request has been delivered or cancelled.
    pub(crate) fn is_armed(&self) -> bool {
        self.callback.lock().is_some()
    }

    pub(crate) fn take_callback(&self) -> Option<Callback> {
        self.callback.lock().take()
    }

    /// Invoke the callback with `response`.
    ///
    /// Returns false if the request was already cancelled. The lock is
    /// released before the callback runs, so a callback may cancel other
    /// requests.
    pub(crate) fn deliver(&self, response: Arc<Response>) -> bool {
        match self.take_callback() {
            Some(callback) => {
                callback(response);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for RequestSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSlot")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// Caller-side handle of a submitted request.
///
/// Dropping the handle does not cancel the request.
pub struct RequestHandle {
    slot: Arc<RequestSlot>,
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl RequestHandle {
    pub(crate) fn new(slot: Arc<RequestSlot>, commands: mpsc::WeakUnboundedSender<Command>) -> Self {
        Self { slot, commands }
    }

    pub fn id(&self) -> RequestId {
        self.slot.id
    }

    /// Normalized URL the request was coalesced under.
    pub fn url(&self) -> &NormalizedUrl {
        &self.slot.url
    }

    /// True until the response has been delivered or the request cancelled.
    pub fn is_active(&self) -> bool {
        self.slot.is_armed()
    }

    /// Cancel the request.
    ///
    /// Once this returns the callback will not be invoked, unless delivery
    /// had already started. Other requests for the same URL are unaffected;
    /// the transfer is aborted only when its last waiter cancels.
    ///
    /// Returns true if the request was still outstanding.
    pub fn cancel(&self) -> bool {
        if self.slot.take_callback().is_none() {
            return false;
        }

        trace!(request = %self.slot.id, url = %self.slot.url, "Request cancelled");
        if let Some(commands) = self.commands.upgrade() {
            let _ = commands.send(Command::Cancel {
                id: self.slot.id,
                url: self.slot.url.clone(),
            });
        }
        true
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.slot.id)
            .field("url", &self.slot.url)
            .finish()
    }
}
