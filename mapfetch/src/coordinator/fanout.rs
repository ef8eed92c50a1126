//! Response fan-out and cache write-through.

use super::request::RequestSlot;
use crate::cache::ResourceCache;
use crate::normalize::NormalizedUrl;
use crate::resource::{Response, ResponseStatus};
use crate::transport::TransportError;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// What a dispatch task produced.
#[derive(Debug)]
pub(crate) enum TransferOutcome {
    /// Bytes found in the persistent cache; the transport was not called.
    CacheHit(Bytes),
    /// Result of the transport call.
    Fetched(Result<Bytes, TransportError>),
}

impl TransferOutcome {
    pub(crate) fn is_cache_hit(&self) -> bool {
        matches!(self, TransferOutcome::CacheHit(_))
    }

    pub(crate) fn into_response(self) -> Response {
        match self {
            TransferOutcome::CacheHit(data) if data.is_empty() => Response::empty(),
            TransferOutcome::CacheHit(data) => Response::cached(data),
            TransferOutcome::Fetched(Ok(body)) => Response::from_body(body),
            TransferOutcome::Fetched(Err(e)) => Response::error(e.to_string()),
        }
    }
}

/// Hand `response` to every waiter in arrival order.
///
/// Waiters cancelled in the meantime are skipped. Returns how many
/// callbacks ran.
pub(crate) fn fan_out(response: &Arc<Response>, waiters: Vec<Arc<RequestSlot>>) -> usize {
    let mut delivered = 0;
    for waiter in waiters {
        if waiter.deliver(Arc::clone(response)) {
            delivered += 1;
        } else {
            trace!(request = %waiter.id, "Skipping cancelled waiter");
        }
    }
    delivered
}

/// Store a successful network response in the cache on the blocking pool.
///
/// Responses served from the cache, errors and empty bodies are not stored.
/// Store failures are logged and otherwise ignored.
pub(crate) fn write_through(cache: &Arc<dyn ResourceCache>, url: NormalizedUrl, response: &Response) {
    if response.from_cache || response.status != ResponseStatus::Successful {
        return;
    }

    let cache = Arc::clone(cache);
    let data = response.data.clone();
    tokio::task::spawn_blocking(move || match cache.store(&url, data) {
        Ok(()) => debug!(url = %url, cache = cache.name(), "Stored response in cache"),
        Err(e) => warn!(url = %url, cache = cache.name(), error = %e, "Cache write failed"),
    });
}
