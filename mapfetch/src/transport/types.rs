//! Transport request and error types.

use thiserror::Error;

/// Identifying `User-Agent` sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("MapFetch/", env!("CARGO_PKG_VERSION"), " [reqwest]");

/// Errors reported by a transport.
///
/// The coordinator turns these into an `Error` response whose message is the
/// error's display text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be sent or the connection failed
    #[error("Request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: String, url: String },

    /// The response body could not be read
    #[error("Failed to read response: {0}")]
    Body(String),

    /// A local `file://` resource could not be read
    #[error("Failed to read {path}: {message}")]
    File { path: String, message: String },

    /// The URL scheme is not handled by this transport
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    /// The HTTP client could not be built
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// How the transport should treat intermediate HTTP caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePreference {
    /// Accept cached responses; no extra header.
    #[default]
    PreferCache,
    /// Ask intermediaries to revalidate (`Cache-Control: no-cache`).
    PreferNetwork,
}

impl CachePreference {
    /// Extra request header for this preference, if any.
    pub fn header(&self) -> Option<(&'static str, &'static str)> {
        match self {
            CachePreference::PreferCache => None,
            CachePreference::PreferNetwork => Some(("Cache-Control", "no-cache")),
        }
    }
}

/// A single GET issued by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: String,
    pub user_agent: String,
    pub cache_preference: CachePreference,
}

impl TransportRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_preference: CachePreference::default(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_cache_preference(mut self, preference: CachePreference) -> Self {
        self.cache_preference = preference;
        self
    }
}
