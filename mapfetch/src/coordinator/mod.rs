//! Request coordination: coalescing, admission control, cancellation and
//! fan-out.
//!
//! Identical requests (same normalized URL) share one transfer and receive
//! the same `Arc<Response>`. New URLs beyond the concurrency limit wait in a
//! FIFO queue. A transfer is aborted only when its last waiter cancels.
//!
//! # Example
//!
//! ```ignore
//! use mapfetch::coordinator::{CoordinatorConfig, CoordinatorDaemon};
//!
//! let (daemon, source) = CoordinatorDaemon::new(config, transport, cache);
//! let shutdown = CancellationToken::new();
//! tokio::spawn(daemon.run(shutdown.clone()));
//!
//! let (handle, response_rx) = source.fetch(&Resource::style("mapbox://styles/u/s"));
//! let response = response_rx.await?;
//! ```

mod admission;
mod config;
mod daemon;
mod fanout;
mod pending;
mod request;
mod source;
mod stats;

pub use config::{CoordinatorConfig, MaxConcurrentTransfers, DEFAULT_MAX_CONCURRENT_TRANSFERS};
pub use daemon::CoordinatorDaemon;
pub use request::{Callback, RequestHandle, RequestId};
pub use source::{FileSource, COORDINATOR_STOPPED_MESSAGE};
pub use stats::{CoordinatorSnapshot, CoordinatorStats};
