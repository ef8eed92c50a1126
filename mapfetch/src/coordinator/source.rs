//! Caller-facing handle of the coordinator.

use super::daemon::Command;
use super::request::{RequestHandle, RequestId, RequestSlot};
use super::stats::CoordinatorSnapshot;
use crate::normalize::{NormalizedUrl, UrlNormalizer};
use crate::resource::{Resource, Response};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{trace, warn};

/// Message of the error response delivered when the daemon is not running.
pub const COORDINATOR_STOPPED_MESSAGE: &str = "request coordinator is not running";

/// Submits resource requests to a running [`CoordinatorDaemon`](super::CoordinatorDaemon).
///
/// Cheap to clone and usable from any thread; none of its methods block.
/// The daemon stops once every clone has been dropped.
#[derive(Clone)]
pub struct FileSource {
    commands: mpsc::UnboundedSender<Command>,
    normalizer: Arc<UrlNormalizer>,
    access_token: Arc<RwLock<String>>,
    next_id: Arc<AtomicU64>,
}

impl FileSource {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        normalizer: UrlNormalizer,
        access_token: String,
    ) -> Self {
        Self {
            commands,
            normalizer: Arc::new(normalizer),
            access_token: Arc::new(RwLock::new(access_token)),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Request `resource`; `callback` receives the response exactly once
    /// unless the request is cancelled first.
    ///
    /// The URL is normalized with the current access token before the
    /// request reaches the daemon. If the daemon has stopped, `callback` is
    /// invoked immediately with an error response.
    pub fn submit<F>(&self, resource: &Resource, callback: F) -> RequestHandle
    where
        F: FnOnce(Arc<Response>) + Send + 'static,
    {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let url = self.normalize(resource);
        trace!(request = %id, kind = %resource.kind, url = %url, "Request submitted");

        let slot = Arc::new(RequestSlot::new(id, url, Box::new(callback)));
        let handle = RequestHandle::new(Arc::clone(&slot), self.commands.downgrade());

        if self.commands.send(Command::Submit(Arc::clone(&slot))).is_err() {
            warn!(request = %id, "Request coordinator is not running");
            slot.deliver(Arc::new(Response::error(COORDINATOR_STOPPED_MESSAGE)));
        }
        handle
    }

    /// Async convenience over [`submit`](Self::submit).
    ///
    /// The receiver resolves with the response, or errors if the request is
    /// cancelled or the daemon shuts down first.
    pub fn fetch(&self, resource: &Resource) -> (RequestHandle, oneshot::Receiver<Arc<Response>>) {
        let (tx, rx) = oneshot::channel();
        let handle = self.submit(resource, move |response| {
            let _ = tx.send(response);
        });
        (handle, rx)
    }

    /// Same as [`RequestHandle::cancel`].
    pub fn cancel(&self, handle: &RequestHandle) -> bool {
        handle.cancel()
    }

    /// Replace the access token used for requests submitted from now on.
    ///
    /// Requests already submitted keep the URL they were normalized with.
    pub fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write() = token.into();
    }

    pub fn access_token(&self) -> String {
        self.access_token.read().clone()
    }

    /// The coalescing key `resource` would be submitted under.
    pub fn normalize(&self, resource: &Resource) -> NormalizedUrl {
        let token = self.access_token.read();
        self.normalizer.normalize_resource(resource, &token)
    }

    /// Ask the daemon for its current state.
    ///
    /// Returns `None` if the daemon has stopped.
    pub async fn snapshot(&self) -> Option<CoordinatorSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(Command::Snapshot(tx)).ok()?;
        rx.await.ok()
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}
