//! MapFetch - Request coordination for map resources
//!
//! This library fetches the resources a map renderer needs (styles, sources,
//! tiles, glyphs, sprites) through a single coordinator that:
//!
//! - normalizes each URL so equivalent requests share one key
//! - coalesces concurrent requests for the same URL into one transfer
//! - limits how many transfers run at once, queueing the rest in FIFO order
//! - aborts a transfer once every caller waiting on it has cancelled
//! - reads from and writes to a bounded persistent cache
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use mapfetch::config::ConfigFile;
//! use mapfetch::resource::Resource;
//! use mapfetch::service::FetchService;
//!
//! let service = FetchService::start(&ConfigFile::load()?)?;
//! let handle = service.source().submit(&Resource::tile(url), |response| {
//!     println!("{:?}", response.status);
//! });
//! ```

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod logging;
pub mod normalize;
pub mod resource;
pub mod service;
pub mod transport;

/// Version of the MapFetch library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
