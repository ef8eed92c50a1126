//! Fetch result shared by every waiter of one coalesced request.

use bytes::Bytes;

/// Message attached to [`ResponseStatus::Empty`] responses.
pub const EMPTY_BODY_MESSAGE: &str = "empty response body";

/// Outcome of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Bytes were fetched (from the network or the cache)
    Successful,
    /// The transport failed; see [`Response::message`]
    Error,
    /// The transport succeeded but returned no bytes
    Empty,
}

/// Result of one fetch attempt.
///
/// Built once per pending entry and handed to every waiter as
/// `Arc<Response>`, so all callers of a coalesced fetch see the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: ResponseStatus,
    pub data: Bytes,
    pub message: Option<String>,
    /// True when the bytes were served from the persistent cache.
    pub from_cache: bool,
}

impl Response {
    /// Successful response fetched over the network.
    pub fn successful(data: Bytes) -> Self {
        Self {
            status: ResponseStatus::Successful,
            data,
            message: None,
            from_cache: false,
        }
    }

    /// Successful response served from the persistent cache.
    pub fn cached(data: Bytes) -> Self {
        Self {
            from_cache: true,
            ..Self::successful(data)
        }
    }

    /// Error response carrying a human-readable message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            data: Bytes::new(),
            message: Some(message.into()),
            from_cache: false,
        }
    }

    /// Response for a transfer that completed without a body.
    pub fn empty() -> Self {
        Self {
            status: ResponseStatus::Empty,
            data: Bytes::new(),
            message: Some(EMPTY_BODY_MESSAGE.to_string()),
            from_cache: false,
        }
    }

    /// Builds the response for a finished network transfer.
    ///
    /// A zero-length body maps to [`ResponseStatus::Empty`], never to
    /// `Successful`.
    pub fn from_body(body: Bytes) -> Self {
        if body.is_empty() {
            Self::empty()
        } else {
            Self::successful(body)
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status == ResponseStatus::Successful
    }
}
