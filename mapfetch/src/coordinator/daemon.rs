//! The coordinator daemon.
//!
//! [`CoordinatorDaemon`] is a long-running task that owns every piece of
//! shared state: the coalescing map, the waiter lists and the admission
//! queue. Callers reach it only through [`FileSource`] commands, and dispatch
//! tasks report back through a completion channel, so no locks guard the
//! maps.
//!
//! ```text
//!  FileSource ── Submit/Cancel/Snapshot ──►┌──────────────────┐
//!                                          │ CoordinatorDaemon │
//!                                          │  PendingTable     │
//!                                          │  Admission        │
//!  dispatch task ───── Completion ────────►└────────┬─────────┘
//!       ▲                                           │
//!       └───────────── spawn (per entry) ───────────┘
//!
//!  dispatch task: cache lookup ──► hit ──► CacheHit
//!                               └─► miss ─► Transport::get ──► Fetched
//! ```

use super::admission::Admission;
use super::config::CoordinatorConfig;
use super::fanout::{fan_out, write_through, TransferOutcome};
use super::pending::{EntryId, PendingTable};
use super::request::{RequestId, RequestSlot};
use super::source::FileSource;
use super::stats::{CoordinatorSnapshot, CoordinatorStats};
use crate::cache::ResourceCache;
use crate::normalize::{NormalizedUrl, UrlNormalizer};
use crate::transport::{resolve_asset_url, CachePreference, Transport, TransportRequest};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

// =============================================================================
// Messages
// =============================================================================

/// Commands sent by [`FileSource`] and [`RequestHandle`](super::RequestHandle).
#[derive(Debug)]
pub(crate) enum Command {
    Submit(Arc<RequestSlot>),
    Cancel { id: RequestId, url: NormalizedUrl },
    Snapshot(oneshot::Sender<CoordinatorSnapshot>),
}

/// Result of a dispatch task, tagged with the entry it was started for.
#[derive(Debug)]
struct Completion {
    entry: EntryId,
    url: NormalizedUrl,
    outcome: TransferOutcome,
}

// =============================================================================
// Daemon
// =============================================================================

/// Owns the coordinator state and processes commands and completions.
///
/// # Type Parameters
///
/// * `T` - Transport used for cache misses
pub struct CoordinatorDaemon<T: Transport> {
    transport: Arc<T>,
    cache: Arc<dyn ResourceCache>,
    user_agent: String,
    cache_preference: CachePreference,

    command_rx: mpsc::UnboundedReceiver<Command>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,

    pending: PendingTable,
    admission: Admission,
    stats: CoordinatorStats,
}

impl<T: Transport> CoordinatorDaemon<T> {
    /// Creates a daemon and the [`FileSource`] that feeds it.
    ///
    /// # Arguments
    ///
    /// * `config` - Coordinator configuration
    /// * `transport` - Transport for cache misses
    /// * `cache` - Persistent cache for read-through and write-through
    pub fn new(
        config: CoordinatorConfig,
        transport: Arc<T>,
        cache: Arc<dyn ResourceCache>,
    ) -> (Self, FileSource) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let source = FileSource::new(
            command_tx,
            UrlNormalizer::new(config.hosting),
            config.access_token,
        );

        let daemon = Self {
            transport,
            cache,
            user_agent: config.user_agent,
            cache_preference: config.cache_preference,
            command_rx,
            completion_tx,
            completion_rx,
            pending: PendingTable::default(),
            admission: Admission::new(config.max_concurrent_transfers),
            stats: CoordinatorStats::default(),
        };

        (daemon, source)
    }

    /// Runs until `shutdown` is cancelled or every [`FileSource`] is dropped.
    ///
    /// In-flight transfers are aborted on exit and outstanding requests
    /// receive no callback.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(cache = self.cache.name(), "Request coordinator starting");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Request coordinator shutting down");
                    break;
                }

                Some(completion) = self.completion_rx.recv() => {
                    self.handle_completion(completion);
                }

                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("All file sources dropped");
                        break;
                    }
                },
            }
        }

        self.abort_all();
        info!(
            requests = self.stats.requests,
            coalesced = self.stats.coalesced,
            cache_hits = self.stats.cache_hits,
            "Request coordinator stopped"
        );
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit(slot) => self.handle_submit(slot),
            Command::Cancel { id, url } => self.handle_cancel(id, &url),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn handle_submit(&mut self, slot: Arc<RequestSlot>) {
        self.stats.requests += 1;

        if !slot.is_armed() {
            trace!(request = %slot.id, "Request cancelled before it was received");
            return;
        }

        if let Some(entry) = self.pending.get_mut(&slot.url) {
            debug!(
                request = %slot.id,
                url = %slot.url,
                waiters = entry.waiters.len() + 1,
                "Request coalesced - waiting for in-flight transfer"
            );
            entry.attach(slot);
            self.stats.coalesced += 1;
            return;
        }

        if self.admission.has_capacity() {
            let url = slot.url.clone();
            self.start_entry(url, vec![slot]);
        } else {
            debug!(
                request = %slot.id,
                url = %slot.url,
                active = self.admission.active(),
                queued = self.admission.queued() + 1,
                "Transfer limit reached - request queued"
            );
            self.admission.enqueue(slot);
            self.stats.queued += 1;
        }
    }

    fn handle_cancel(&mut self, id: RequestId, url: &NormalizedUrl) {
        if self.admission.remove_queued(id) {
            debug!(request = %id, url = %url, "Queued request cancelled");
            return;
        }

        let Some(entry) = self.pending.get_mut(url) else {
            trace!(request = %id, "Cancel for a request that already completed");
            return;
        };

        if !entry.detach(id) {
            trace!(request = %id, url = %url, "Waiter already swept from entry");
        }
        if !entry.is_empty() {
            debug!(
                request = %id,
                url = %url,
                remaining = entry.waiters.len(),
                "Waiter cancelled"
            );
            return;
        }

        if let Some(entry) = self.pending.remove(url) {
            entry.abort.cancel();
            self.admission.release();
            self.stats.transfers_aborted += 1;
            debug!(
                entry = %entry.id,
                url = %entry.url,
                "Last waiter cancelled - transfer aborted"
            );
            self.promote_queued();
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        let Completion {
            entry,
            url,
            outcome,
        } = completion;

        let Some(entry) = self.pending.remove_if(&url, entry) else {
            self.stats.stale_completions += 1;
            trace!(entry = %entry, url = %url, "Ignoring completion of aborted transfer");
            return;
        };

        self.admission.release();
        self.stats.transfers_completed += 1;
        if outcome.is_cache_hit() {
            self.stats.cache_hits += 1;
        }

        let response = Arc::new(outcome.into_response());
        let delivered = fan_out(&response, entry.waiters);
        debug!(
            entry = %entry.id,
            url = %url,
            status = ?response.status,
            from_cache = response.from_cache,
            waiters = delivered,
            "Transfer complete"
        );

        write_through(&self.cache, url, &response);
        self.promote_queued();
    }

    /// Start queued requests while slots are free.
    ///
    /// Every other queued request for a promoted URL joins the same entry.
    fn promote_queued(&mut self) {
        while let Some(head) = self.admission.next_ready() {
            let url = head.url.clone();
            let mut waiters = vec![head];
            waiters.extend(self.admission.take_url(&url));

            if let Some(entry) = self.pending.get_mut(&url) {
                for waiter in waiters {
                    entry.attach(waiter);
                }
                continue;
            }

            debug!(url = %url, waiters = waiters.len(), "Promoting queued request");
            self.start_entry(url, waiters);
        }
    }

    fn start_entry(&mut self, url: NormalizedUrl, waiters: Vec<Arc<RequestSlot>>) {
        let (entry, abort) = self.pending.insert(url.clone(), waiters);
        self.admission.acquire();
        self.stats.transfers_started += 1;

        trace!(
            entry = %entry,
            url = %url,
            active = self.admission.active(),
            "Dispatching transfer"
        );

        let task = DispatchTask {
            entry,
            url,
            transport: Arc::clone(&self.transport),
            cache: Arc::clone(&self.cache),
            user_agent: self.user_agent.clone(),
            cache_preference: self.cache_preference,
            completions: self.completion_tx.clone(),
        };
        tokio::spawn(task.run(abort));
    }

    fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            pending: self.pending.len(),
            active_transfers: self.admission.active(),
            queued: self.admission.queued(),
            stats: self.stats.clone(),
        }
    }

    fn abort_all(&mut self) {
        let mut aborted = 0;
        for entry in self.pending.drain() {
            trace!(entry = %entry.id, url = %entry.url, "Aborting transfer on shutdown");
            entry.abort.cancel();
            aborted += 1;
        }
        let queued = self.admission.queued();
        self.admission.clear();

        if aborted > 0 || queued > 0 {
            warn!(
                aborted,
                queued, "Dropping outstanding requests on coordinator shutdown"
            );
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// One transfer: cache lookup, then the transport on a miss.
struct DispatchTask<T: Transport> {
    entry: EntryId,
    url: NormalizedUrl,
    transport: Arc<T>,
    cache: Arc<dyn ResourceCache>,
    user_agent: String,
    cache_preference: CachePreference,
    completions: mpsc::UnboundedSender<Completion>,
}

impl<T: Transport> DispatchTask<T> {
    async fn run(self, abort: CancellationToken) {
        let outcome = tokio::select! {
            _ = abort.cancelled() => {
                trace!(entry = %self.entry, url = %self.url, "Transfer aborted");
                return;
            }
            outcome = self.transfer() => outcome,
        };

        let _ = self.completions.send(Completion {
            entry: self.entry,
            url: self.url,
            outcome,
        });
    }

    async fn transfer(&self) -> TransferOutcome {
        let cache = Arc::clone(&self.cache);
        let key = self.url.clone();
        match tokio::task::spawn_blocking(move || cache.lookup(&key)).await {
            Ok(Some(data)) => {
                trace!(url = %self.url, bytes = data.len(), "Cache hit");
                return TransferOutcome::CacheHit(data);
            }
            Ok(None) => {}
            Err(e) => warn!(url = %self.url, error = %e, "Cache lookup task failed"),
        }

        let request = TransportRequest::new(resolve_asset_url(self.url.as_str()).into_owned())
            .with_user_agent(self.user_agent.as_str())
            .with_cache_preference(self.cache_preference);

        TransferOutcome::Fetched(self.transport.get(&request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, NoOpCache};
    use crate::normalize::ManagedHosting;
    use crate::resource::{Resource, Response, ResponseStatus, EMPTY_BODY_MESSAGE};
    use crate::coordinator::MaxConcurrentTransfers;
    use crate::transport::TransportError;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    // =========================================================================
    // Test doubles
    // =========================================================================

    /// Transport that blocks every call until the test releases it.
    struct GatedTransport {
        gate: Semaphore,
        started: mpsc::UnboundedSender<String>,
        bodies: Mutex<HashMap<String, Result<Bytes, TransportError>>>,
        calls: AtomicUsize,
        requests: Mutex<Vec<TransportRequest>>,
    }

    impl GatedTransport {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
            let (started, started_rx) = mpsc::unbounded_channel();
            let transport = Arc::new(Self {
                gate: Semaphore::new(0),
                started,
                bodies: Mutex::new(HashMap::new()),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            });
            (transport, started_rx)
        }

        fn open() -> Arc<Self> {
            let (transport, _rx) = Self::new();
            transport.gate.add_permits(Semaphore::MAX_PERMITS / 2);
            transport
        }

        fn respond(&self, url: &str, body: Result<Bytes, TransportError>) {
            self.bodies.lock().insert(url.to_string(), body);
        }

        fn release(&self, n: usize) {
            self.gate.add_permits(n);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Transport for GatedTransport {
        async fn get(&self, request: &TransportRequest) -> Result<Bytes, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().push(request.clone());
            let _ = self.started.send(request.url.clone());

            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }

            self.bodies
                .lock()
                .get(&request.url)
                .cloned()
                .unwrap_or_else(|| Ok(Bytes::from(format!("body of {}", request.url))))
        }
    }

    /// In-memory cache recording stores.
    #[derive(Default)]
    struct MemoryCache {
        entries: Mutex<HashMap<NormalizedUrl, Bytes>>,
        stores: AtomicUsize,
        fail_stores: bool,
    }

    impl ResourceCache for MemoryCache {
        fn lookup(&self, url: &NormalizedUrl) -> Option<Bytes> {
            self.entries.lock().get(url).cloned()
        }

        fn store(&self, url: &NormalizedUrl, data: Bytes) -> Result<(), CacheError> {
            if !self.fail_stores {
                self.entries.lock().insert(url.clone(), data);
            }
            self.stores.fetch_add(1, Ordering::SeqCst);
            if self.fail_stores {
                return Err(CacheError::InvalidConfig("read-only".to_string()));
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "memory"
        }
    }

    fn start(
        config: CoordinatorConfig,
        transport: Arc<GatedTransport>,
        cache: Arc<dyn ResourceCache>,
    ) -> (FileSource, CancellationToken) {
        let (daemon, source) = CoordinatorDaemon::new(config, transport, cache);
        let shutdown = CancellationToken::new();
        tokio::spawn(daemon.run(shutdown.clone()));
        (source, shutdown)
    }

    fn tile(url: &str) -> Resource {
        Resource::tile(url)
    }

    async fn recv_timeout<V>(rx: &mut mpsc::UnboundedReceiver<V>) -> V {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed")
    }

    async fn response(rx: oneshot::Receiver<Arc<Response>>) -> Arc<Response> {
        tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .expect("timed out")
            .expect("request dropped")
    }

    async fn wait_idle(source: &FileSource) -> CoordinatorSnapshot {
        for _ in 0..500 {
            let snapshot = source.snapshot().await.unwrap();
            if snapshot.is_idle() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("coordinator never became idle");
    }

    // =========================================================================
    // Coalescing
    // =========================================================================

    #[tokio::test]
    async fn test_identical_requests_share_one_transfer() {
        let (transport, mut started) = GatedTransport::new();
        let (source, _shutdown) = start(
            CoordinatorConfig::default(),
            Arc::clone(&transport),
            Arc::new(NoOpCache),
        );

        let receivers: Vec<_> = (0..5)
            .map(|_| source.fetch(&tile("https://tiles.example/1/2/3.pbf")))
            .collect();

        recv_timeout(&mut started).await;
        let snapshot = source.snapshot().await.unwrap();
        assert_eq!(snapshot.pending, 1);
        assert_eq!(snapshot.stats.coalesced, 4);

        transport.release(1);

        let mut responses = Vec::new();
        for (_handle, rx) in receivers {
            responses.push(response(rx).await);
        }

        assert_eq!(transport.calls(), 1);
        for r in &responses {
            assert!(Arc::ptr_eq(r, &responses[0]));
        }
        assert_eq!(responses[0].status, ResponseStatus::Successful);
        assert_eq!(wait_idle(&source).await.stats.transfers_started, 1);
    }

    #[tokio::test]
    async fn test_different_urls_are_not_coalesced() {
        let transport = GatedTransport::open();
        let (source, _shutdown) = start(
            CoordinatorConfig::default(),
            Arc::clone(&transport),
            Arc::new(NoOpCache),
        );

        let (_a, rx_a) = source.fetch(&tile("https://tiles.example/a"));
        let (_b, rx_b) = source.fetch(&tile("https://tiles.example/b"));

        assert_eq!(response(rx_a).await.data, Bytes::from("body of https://tiles.example/a"));
        assert_eq!(response(rx_b).await.data, Bytes::from("body of https://tiles.example/b"));
        assert_eq!(transport.calls(), 2);
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    #[tokio::test]
    async fn test_cancel_one_waiter_keeps_siblings() {
        let (transport, mut started) = GatedTransport::new();
        let (source, _shutdown) = start(
            CoordinatorConfig::default(),
            Arc::clone(&transport),
            Arc::new(NoOpCache),
        );

        let delivered = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let delivered = Arc::clone(&delivered);
                let tx = tx.clone();
                source.submit(&tile("https://tiles.example/x"), move |response| {
                    delivered.fetch_add(1, Ordering::SeqCst);
                    let _ = tx.send(response);
                })
            })
            .collect();
        recv_timeout(&mut started).await;

        assert!(handles[1].cancel());
        let snapshot = source.snapshot().await.unwrap();
        assert_eq!(snapshot.pending, 1);
        assert_eq!(snapshot.stats.transfers_aborted, 0);

        transport.release(1);

        let first = recv_timeout(&mut rx).await;
        let second = recv_timeout(&mut rx).await;
        assert_eq!(first.status, ResponseStatus::Successful);
        assert!(Arc::ptr_eq(&first, &second));

        wait_idle(&source).await;
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_last_waiter_aborts_transfer() {
        let (transport, mut started) = GatedTransport::new();
        let (source, _shutdown) = start(
            CoordinatorConfig::default(),
            Arc::clone(&transport),
            Arc::new(NoOpCache),
        );

        let (a, rx_a) = source.fetch(&tile("https://tiles.example/x"));
        let (b, rx_b) = source.fetch(&tile("https://tiles.example/x"));
        recv_timeout(&mut started).await;

        a.cancel();
        b.cancel();

        let snapshot = wait_idle(&source).await;
        assert_eq!(snapshot.stats.transfers_aborted, 1);
        assert_eq!(snapshot.stats.transfers_completed, 0);
        assert!(rx_a.await.is_err());
        assert!(rx_b.await.is_err());
    }

    /// Sets its flag when dropped.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Transport whose calls never finish on their own.
    struct HangingTransport {
        dropped: Arc<AtomicBool>,
        started: mpsc::UnboundedSender<()>,
    }

    impl Transport for HangingTransport {
        async fn get(&self, _request: &TransportRequest) -> Result<Bytes, TransportError> {
            let _flag = DropFlag(Arc::clone(&self.dropped));
            let _ = self.started.send(());
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancel_last_waiter_drops_transport_call() {
        let dropped = Arc::new(AtomicBool::new(false));
        let (started_tx, mut started) = mpsc::unbounded_channel();
        let transport = Arc::new(HangingTransport {
            dropped: Arc::clone(&dropped),
            started: started_tx,
        });
        let (daemon, source) =
            CoordinatorDaemon::new(CoordinatorConfig::default(), transport, Arc::new(NoOpCache));
        let shutdown = CancellationToken::new();
        tokio::spawn(daemon.run(shutdown.clone()));

        let (handle, _rx) = source.fetch(&tile("https://tiles.example/slow"));
        recv_timeout(&mut started).await;
        assert!(!dropped.load(Ordering::SeqCst));

        assert!(handle.cancel());

        tokio::time::timeout(Duration::from_secs(5), async {
            while !dropped.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("transport call was not dropped");

        let snapshot = wait_idle(&source).await;
        assert_eq!(snapshot.stats.transfers_aborted, 1);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_noop() {
        let transport = GatedTransport::open();
        let (source, _shutdown) = start(
            CoordinatorConfig::default(),
            transport,
            Arc::new(NoOpCache),
        );

        let (handle, rx) = source.fetch(&tile("https://tiles.example/x"));
        response(rx).await;

        assert!(!handle.cancel());
        let snapshot = wait_idle(&source).await;
        assert_eq!(snapshot.stats.transfers_aborted, 0);
    }

    #[tokio::test]
    async fn test_no_residue_after_repeated_cycles() {
        let (transport, mut started) = GatedTransport::new();
        let (source, _shutdown) = start(
            CoordinatorConfig::default(),
            Arc::clone(&transport),
            Arc::new(NoOpCache),
        );

        for i in 0..20 {
            let url = format!("https://tiles.example/{}", i % 3);
            let (a, _rx_a) = source.fetch(&tile(&url));
            let (b, rx_b) = source.fetch(&tile(&url));
            recv_timeout(&mut started).await;

            if i % 2 == 0 {
                a.cancel();
                transport.release(1);
                response(rx_b).await;
            } else {
                a.cancel();
                b.cancel();
            }
            wait_idle(&source).await;
        }

        let snapshot = wait_idle(&source).await;
        assert_eq!(snapshot.pending, 0);
        assert_eq!(snapshot.stats.transfers_completed, 10);
        assert_eq!(snapshot.stats.transfers_aborted, 10);
    }

    #[tokio::test]
    async fn test_same_url_after_abort_gets_fresh_transfer() {
        let (transport, mut started) = GatedTransport::new();
        let (source, _shutdown) = start(
            CoordinatorConfig::default(),
            Arc::clone(&transport),
            Arc::new(NoOpCache),
        );

        let (first, _rx_first) = source.fetch(&tile("https://tiles.example/x"));
        recv_timeout(&mut started).await;
        first.cancel();
        wait_idle(&source).await;

        let (_second, rx_second) = source.fetch(&tile("https://tiles.example/x"));
        recv_timeout(&mut started).await;
        transport.release(1);

        assert_eq!(response(rx_second).await.status, ResponseStatus::Successful);
        let snapshot = wait_idle(&source).await;
        assert_eq!(snapshot.stats.transfers_started, 2);
        assert_eq!(snapshot.stats.transfers_completed, 1);
    }

    /// Feed every queued command to a daemon that is not running.
    fn pump(daemon: &mut CoordinatorDaemon<GatedTransport>) {
        while let Ok(command) = daemon.command_rx.try_recv() {
            daemon.handle_command(command);
        }
    }

    #[tokio::test]
    async fn test_stale_completion_is_ignored() {
        let (transport, _started) = GatedTransport::new();
        let (mut daemon, source) =
            CoordinatorDaemon::new(CoordinatorConfig::default(), transport, Arc::new(NoOpCache));
        let url = NormalizedUrl::new("https://tiles.example/x");

        let (first, _rx_first) = source.fetch(&tile(url.as_str()));
        pump(&mut daemon);
        let stale_id = daemon.pending.get_mut(&url).unwrap().id;

        first.cancel();
        pump(&mut daemon);
        assert_eq!(daemon.pending.len(), 0);

        let (_second, mut rx_second) = source.fetch(&tile(url.as_str()));
        pump(&mut daemon);

        // The aborted transfer's result arrives after the URL was re-dispatched.
        daemon.handle_completion(Completion {
            entry: stale_id,
            url: url.clone(),
            outcome: TransferOutcome::Fetched(Ok(Bytes::from_static(b"stale"))),
        });

        assert_eq!(daemon.stats.stale_completions, 1);
        assert_eq!(daemon.pending.len(), 1);
        assert_eq!(daemon.admission.active(), 1);
        assert!(rx_second.try_recv().is_err());

        let current = daemon.pending.get_mut(&url).unwrap().id;
        daemon.handle_completion(Completion {
            entry: current,
            url,
            outcome: TransferOutcome::Fetched(Ok(Bytes::from_static(b"fresh"))),
        });
        assert_eq!(rx_second.try_recv().unwrap().data, Bytes::from_static(b"fresh"));
        assert_eq!(daemon.admission.active(), 0);
    }

    // =========================================================================
    // Admission control
    // =========================================================================

    #[tokio::test]
    async fn test_admission_limit_and_fifo_promotion() {
        let (transport, mut started) = GatedTransport::new();
        let (source, _shutdown) = start(
            CoordinatorConfig::default()
                .with_max_concurrent_transfers(MaxConcurrentTransfers::Limited(4)),
            Arc::clone(&transport),
            Arc::new(NoOpCache),
        );

        let urls: Vec<String> = (1..=6).map(|i| format!("https://tiles.example/{}", i)).collect();
        let mut receivers = Vec::new();
        for url in &urls {
            receivers.push(source.fetch(&tile(url)));
        }

        let mut first_batch = Vec::new();
        for _ in 0..4 {
            first_batch.push(recv_timeout(&mut started).await);
        }
        first_batch.sort();
        let mut expected: Vec<String> = urls[..4].to_vec();
        expected.sort();
        assert_eq!(first_batch, expected);

        let snapshot = source.snapshot().await.unwrap();
        assert_eq!(snapshot.active_transfers, 4);
        assert_eq!(snapshot.queued, 2);
        assert_eq!(transport.calls(), 4);

        transport.release(1);
        assert_eq!(recv_timeout(&mut started).await, urls[4]);

        transport.release(1);
        assert_eq!(recv_timeout(&mut started).await, urls[5]);

        transport.release(4);
        for (_handle, rx) in receivers {
            assert_eq!(response(rx).await.status, ResponseStatus::Successful);
        }
        assert_eq!(wait_idle(&source).await.stats.queued, 2);
    }

    #[tokio::test]
    async fn test_queued_requests_for_same_url_promote_together() {
        let (transport, mut started) = GatedTransport::new();
        let (source, _shutdown) = start(
            CoordinatorConfig::default()
                .with_max_concurrent_transfers(MaxConcurrentTransfers::Limited(1)),
            Arc::clone(&transport),
            Arc::new(NoOpCache),
        );

        let (_a, rx_a) = source.fetch(&tile("https://tiles.example/a"));
        recv_timeout(&mut started).await;
        let (_b1, rx_b1) = source.fetch(&tile("https://tiles.example/b"));
        let (_c, rx_c) = source.fetch(&tile("https://tiles.example/c"));
        let (_b2, rx_b2) = source.fetch(&tile("https://tiles.example/b"));

        assert_eq!(source.snapshot().await.unwrap().queued, 3);

        transport.release(1);
        response(rx_a).await;
        assert_eq!(recv_timeout(&mut started).await, "https://tiles.example/b");
        assert_eq!(source.snapshot().await.unwrap().queued, 1);

        transport.release(1);
        let b1 = response(rx_b1).await;
        let b2 = response(rx_b2).await;
        assert!(Arc::ptr_eq(&b1, &b2));

        transport.release(1);
        response(rx_c).await;
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_cancel_queued_request() {
        let (transport, mut started) = GatedTransport::new();
        let (source, _shutdown) = start(
            CoordinatorConfig::default()
                .with_max_concurrent_transfers(MaxConcurrentTransfers::Limited(1)),
            Arc::clone(&transport),
            Arc::new(NoOpCache),
        );

        let (_a, rx_a) = source.fetch(&tile("https://tiles.example/a"));
        recv_timeout(&mut started).await;
        let (queued, rx_queued) = source.fetch(&tile("https://tiles.example/b"));
        assert_eq!(source.snapshot().await.unwrap().queued, 1);

        queued.cancel();
        assert_eq!(source.snapshot().await.unwrap().queued, 0);

        transport.release(1);
        response(rx_a).await;
        assert!(rx_queued.await.is_err());
        wait_idle(&source).await;
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_abort_frees_slot_for_queued_request() {
        let (transport, mut started) = GatedTransport::new();
        let (source, _shutdown) = start(
            CoordinatorConfig::default()
                .with_max_concurrent_transfers(MaxConcurrentTransfers::Limited(1)),
            Arc::clone(&transport),
            Arc::new(NoOpCache),
        );

        let (a, _rx_a) = source.fetch(&tile("https://tiles.example/a"));
        recv_timeout(&mut started).await;
        let (_b, rx_b) = source.fetch(&tile("https://tiles.example/b"));

        a.cancel();
        assert_eq!(recv_timeout(&mut started).await, "https://tiles.example/b");

        transport.release(1);
        assert_eq!(response(rx_b).await.status, ResponseStatus::Successful);
    }

    // =========================================================================
    // Cache
    // =========================================================================

    #[tokio::test]
    async fn test_cache_hit_skips_transport() {
        let transport = GatedTransport::open();
        let cache = Arc::new(MemoryCache::default());
        let url = NormalizedUrl::new("https://tiles.example/cached");
        cache.entries.lock().insert(url, Bytes::from_static(b"from disk"));

        let (source, _shutdown) = start(
            CoordinatorConfig::default(),
            Arc::clone(&transport),
            cache.clone(),
        );

        let (_h, rx) = source.fetch(&tile("https://tiles.example/cached"));
        let response = response(rx).await;

        assert_eq!(response.status, ResponseStatus::Successful);
        assert!(response.from_cache);
        assert_eq!(response.data, Bytes::from_static(b"from disk"));
        assert_eq!(transport.calls(), 0);

        let snapshot = wait_idle(&source).await;
        assert_eq!(snapshot.stats.cache_hits, 1);
        assert_eq!(cache.stores.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_response_is_written_through() {
        let transport = GatedTransport::open();
        let cache = Arc::new(MemoryCache::default());
        let (source, _shutdown) = start(
            CoordinatorConfig::default(),
            Arc::clone(&transport),
            cache.clone(),
        );

        let (_h, rx) = source.fetch(&tile("https://tiles.example/new"));
        response(rx).await;

        for _ in 0..500 {
            if cache.stores.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(
            cache.lookup(&NormalizedUrl::new("https://tiles.example/new")),
            Some(Bytes::from("body of https://tiles.example/new"))
        );

        // Second request is served from the cache.
        let (_h, rx) = source.fetch(&tile("https://tiles.example/new"));
        assert!(response(rx).await.from_cache);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_write_failure_is_swallowed() {
        let transport = GatedTransport::open();
        let cache = Arc::new(MemoryCache {
            fail_stores: true,
            ..Default::default()
        });
        let (source, _shutdown) = start(
            CoordinatorConfig::default(),
            Arc::clone(&transport),
            cache.clone(),
        );

        let (_h, rx) = source.fetch(&tile("https://tiles.example/a"));
        assert_eq!(response(rx).await.status, ResponseStatus::Successful);

        let (_h, rx) = source.fetch(&tile("https://tiles.example/a"));
        assert_eq!(response(rx).await.status, ResponseStatus::Successful);
        assert_eq!(transport.calls(), 2);
    }

    // =========================================================================
    // Completion policy
    // =========================================================================

    #[tokio::test]
    async fn test_error_is_fanned_out_and_not_cached() {
        let transport = GatedTransport::open();
        transport.respond(
            "https://tiles.example/missing",
            Err(TransportError::Status {
                status: "404 Not Found".to_string(),
                url: "https://tiles.example/missing".to_string(),
            }),
        );
        let cache = Arc::new(MemoryCache::default());
        let (source, _shutdown) = start(
            CoordinatorConfig::default(),
            Arc::clone(&transport),
            cache.clone(),
        );

        let (_a, rx_a) = source.fetch(&tile("https://tiles.example/missing"));
        let (_b, rx_b) = source.fetch(&tile("https://tiles.example/missing"));

        let a = response(rx_a).await;
        let b = response(rx_b).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.status, ResponseStatus::Error);
        assert_eq!(
            a.message.as_deref(),
            Some("HTTP 404 Not Found from https://tiles.example/missing")
        );
        wait_idle(&source).await;
        assert_eq!(cache.stores.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_body_yields_empty_status() {
        let transport = GatedTransport::open();
        transport.respond("https://tiles.example/empty", Ok(Bytes::new()));
        let cache = Arc::new(MemoryCache::default());
        let (source, _shutdown) = start(
            CoordinatorConfig::default(),
            Arc::clone(&transport),
            cache.clone(),
        );

        let (_h, rx) = source.fetch(&tile("https://tiles.example/empty"));
        let response = response(rx).await;

        assert_eq!(response.status, ResponseStatus::Empty);
        assert_eq!(response.message.as_deref(), Some(EMPTY_BODY_MESSAGE));
        wait_idle(&source).await;
        assert_eq!(cache.stores.load(Ordering::SeqCst), 0);
    }

    // =========================================================================
    // Dispatch details
    // =========================================================================

    #[tokio::test]
    async fn test_transport_request_carries_agent_and_preference() {
        let transport = GatedTransport::open();
        let (source, _shutdown) = start(
            CoordinatorConfig::default()
                .with_user_agent("MapFetch/test [reqwest]")
                .with_cache_preference(CachePreference::PreferNetwork),
            Arc::clone(&transport),
            Arc::new(NoOpCache),
        );

        let (_h, rx) = source.fetch(&tile("https://tiles.example/a"));
        response(rx).await;

        let requests = transport.requests.lock();
        assert_eq!(requests[0].user_agent, "MapFetch/test [reqwest]");
        assert_eq!(requests[0].cache_preference, CachePreference::PreferNetwork);
    }

    #[tokio::test]
    async fn test_asset_url_resolved_at_dispatch() {
        let transport = GatedTransport::open();
        let (source, _shutdown) = start(
            CoordinatorConfig::default(),
            Arc::clone(&transport),
            Arc::new(NoOpCache),
        );

        let (handle, rx) = source.fetch(&Resource::style("asset://styles/local.json"));
        response(rx).await;

        assert_eq!(handle.url().as_str(), "asset://styles/local.json");
        assert_eq!(
            transport.requests.lock()[0].url,
            resolve_asset_url("asset://styles/local.json")
        );
        assert!(transport.requests.lock()[0].url.starts_with("file:///"));
    }

    #[tokio::test]
    async fn test_token_added_for_managed_host() {
        let transport = GatedTransport::open();
        let (source, _shutdown) = start(
            CoordinatorConfig::default()
                .with_hosting(ManagedHosting::default().with_host("api.example"))
                .with_access_token("T"),
            Arc::clone(&transport),
            Arc::new(NoOpCache),
        );

        let (_h, rx) = source.fetch(&Resource::source("https://api.example/tile/1/2/3"));
        response(rx).await;

        assert!(transport.requests.lock()[0].url.contains("access_token=T"));
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    #[tokio::test]
    async fn test_shutdown_drops_outstanding_requests() {
        let (transport, mut started) = GatedTransport::new();
        let (source, shutdown) = start(
            CoordinatorConfig::default(),
            Arc::clone(&transport),
            Arc::new(NoOpCache),
        );

        let (_h, rx) = source.fetch(&tile("https://tiles.example/a"));
        recv_timeout(&mut started).await;

        shutdown.cancel();
        assert!(tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .expect("timed out")
            .is_err());

        for _ in 0..500 {
            if !source.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let (_h, rx) = source.fetch(&tile("https://tiles.example/b"));
        assert_eq!(response(rx).await.status, ResponseStatus::Error);
    }

    #[tokio::test]
    async fn test_daemon_exits_when_sources_dropped() {
        let transport = GatedTransport::open();
        let (daemon, source) =
            CoordinatorDaemon::new(CoordinatorConfig::default(), transport, Arc::new(NoOpCache));
        let task = tokio::spawn(daemon.run(CancellationToken::new()));

        drop(source);

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("daemon did not stop")
            .unwrap();
    }
}
