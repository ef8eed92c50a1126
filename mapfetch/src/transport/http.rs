//! Transport abstraction and the reqwest-backed implementation.

use super::tls::load_trust_store;
use super::types::{TransportError, TransportRequest};
use bytes::Bytes;
use reqwest::header::USER_AGENT;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};
use url::Url;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fetches the bytes behind a URL.
///
/// This abstraction lets the coordinator run against a mock in tests. A
/// transport should honour future cancellation: when the coordinator aborts
/// a transfer it simply drops the future.
pub trait Transport: Send + Sync + 'static {
    /// Performs a GET for `request.url`.
    ///
    /// # Returns
    ///
    /// The full response body or an error. An empty body is not an error
    /// at this level.
    fn get(
        &self,
        request: &TransportRequest,
    ) -> impl Future<Output = Result<Bytes, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn get(
        &self,
        request: &TransportRequest,
    ) -> impl Future<Output = Result<Bytes, TransportError>> + Send {
        (**self).get(request)
    }
}

/// HTTP(S) and `file://` transport built on reqwest.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with the default timeout and system trust roots.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_options(Duration::from_secs(DEFAULT_TIMEOUT_SECS), None)
    }

    /// Creates a transport with a custom timeout and optional CA bundle.
    ///
    /// Certificates from `ca_bundle` are added on top of the system roots.
    pub fn with_options(timeout: Duration, ca_bundle: Option<&Path>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true);

        if let Some(path) = ca_bundle {
            for cert in load_trust_store(path) {
                builder = builder.add_root_certificate(cert);
            }
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    fn build_request(&self, request: &TransportRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .get(&request.url)
            .header(USER_AGENT, &request.user_agent);

        if let Some((name, value)) = request.cache_preference.header() {
            builder = builder.header(name, value);
        }
        builder
    }

    async fn get_http(&self, request: &TransportRequest) -> Result<Bytes, TransportError> {
        let url = request.url.as_str();
        trace!(url = url, "HTTP GET request starting");

        let response = match self.build_request(request).send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(TransportError::Request(e.to_string()));
            }
        };

        if !response.status().is_success() {
            warn!(
                url = url,
                status = response.status().as_u16(),
                "HTTP error status"
            );
            return Err(TransportError::Status {
                status: response.status().to_string(),
                url: url.to_string(),
            });
        }

        match response.bytes().await {
            Ok(bytes) => {
                trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                Ok(bytes)
            }
            Err(e) => {
                warn!(url = url, error = %e, "Failed to read response body");
                Err(TransportError::Body(e.to_string()))
            }
        }
    }
}

async fn read_file_url(url: &Url) -> Result<Bytes, TransportError> {
    let path = url
        .to_file_path()
        .map_err(|()| TransportError::UnsupportedUrl(url.to_string()))?;
    trace!(path = %path.display(), "Reading local file");

    tokio::fs::read(&path)
        .await
        .map(Bytes::from)
        .map_err(|e| TransportError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

impl Transport for HttpTransport {
    async fn get(&self, request: &TransportRequest) -> Result<Bytes, TransportError> {
        let parsed = Url::parse(&request.url)
            .map_err(|_| TransportError::UnsupportedUrl(request.url.clone()))?;
        match parsed.scheme() {
            "file" => read_file_url(&parsed).await,
            "http" | "https" => self.get_http(request).await,
            _ => Err(TransportError::UnsupportedUrl(request.url.clone())),
        }
    }
}
