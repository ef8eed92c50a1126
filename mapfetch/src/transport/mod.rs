//! Network and local-file transport.
//!
//! The coordinator talks to a [`Transport`]: one GET per dispatched entry,
//! returning the whole body. [`HttpTransport`] is the production
//! implementation; tests substitute their own.

mod asset;
mod http;
mod tls;
mod types;

pub use asset::{resolve_asset_url, resolve_asset_url_in, ASSET_SCHEME};
pub use http::{HttpTransport, Transport, DEFAULT_TIMEOUT_SECS};
pub use tls::load_trust_store;
pub use types::{CachePreference, TransportError, TransportRequest, DEFAULT_USER_AGENT};

#[cfg(test)]
pub(crate) use http::tests::MockTransport;
