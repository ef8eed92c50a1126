//! URL normalization.
//!
//! Turns a caller-supplied [`Resource`] URL into the canonical string used as
//! both the coalescing key and the cache key. Normalization is pure: no I/O,
//! no logging, and the same input always yields the same output.
//!
//! # Managed hosting
//!
//! URLs on the managed-hosting scheme (`mapbox://`) are rewritten to the
//! HTTP API and get the access token injected. `http(s)` URLs already
//! pointing at a managed host keep their shape but also get the token.
//! Everything else passes through untouched, including malformed input.
//!
//! ```
//! use mapfetch::normalize::normalize;
//! use mapfetch::resource::ResourceKind;
//!
//! let url = normalize(ResourceKind::Style, "mapbox://styles/user/abc", "TOKEN");
//! assert_eq!(
//!     url.as_str(),
//!     "https://api.mapbox.com/styles/v1/user/abc?access_token=TOKEN"
//! );
//! ```
//!
//! The `asset://` scheme is deliberately left alone here; it is resolved to a
//! local path at dispatch time (see [`crate::transport::resolve_asset_url`]).

mod mapbox;

use crate::resource::{Resource, ResourceKind};
use std::fmt;

pub use mapbox::{DEFAULT_API_BASE_URL, MANAGED_SCHEME};

/// Canonical form of a resource URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    /// Wraps a string that is already in canonical form.
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Managed-hosting configuration: where `mapbox://` URLs are rewritten to and
/// which HTTP hosts receive the access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedHosting {
    api_base_url: String,
    hosts: Vec<String>,
}

impl ManagedHosting {
    /// Creates a hosting configuration for the given API base URL.
    ///
    /// The host of the base URL is registered as a managed host.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        let api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        let hosts = mapbox::host_of(&api_base_url)
            .map(|host| vec![host.to_ascii_lowercase()])
            .unwrap_or_default();
        Self {
            api_base_url,
            hosts,
        }
    }

    /// Registers an additional host whose `http(s)` URLs receive the token.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into().trim().to_ascii_lowercase();
        if !host.is_empty() && !self.hosts.contains(&host) {
            self.hosts.push(host);
        }
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    fn is_managed_host(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }
}

impl Default for ManagedHosting {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

/// Configured URL normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlNormalizer {
    hosting: ManagedHosting,
}

impl UrlNormalizer {
    pub fn new(hosting: ManagedHosting) -> Self {
        Self { hosting }
    }

    pub fn hosting(&self) -> &ManagedHosting {
        &self.hosting
    }

    /// Normalizes a resource URL for the given kind and access token.
    pub fn normalize(&self, kind: ResourceKind, url: &str, access_token: &str) -> NormalizedUrl {
        if !kind.is_managed() {
            return NormalizedUrl::new(url);
        }

        if mapbox::is_managed_url(url) {
            let base = self.hosting.api_base_url();
            let rewritten = match kind {
                ResourceKind::Style => mapbox::normalize_style_url(base, url, access_token),
                ResourceKind::Source => mapbox::normalize_source_url(base, url, access_token),
                ResourceKind::Glyphs => mapbox::normalize_glyphs_url(base, url, access_token),
                ResourceKind::SpriteImage | ResourceKind::SpriteJson => {
                    mapbox::normalize_sprite_url(base, url, access_token)
                }
                ResourceKind::Tile | ResourceKind::Other => None,
            };
            return NormalizedUrl::new(rewritten.unwrap_or_else(|| url.to_string()));
        }

        match mapbox::http_host_of(url) {
            Some(host) if self.hosting.is_managed_host(&host) => {
                NormalizedUrl::new(mapbox::append_access_token(url, access_token))
            }
            _ => NormalizedUrl::new(url),
        }
    }

    /// Normalizes a [`Resource`].
    pub fn normalize_resource(&self, resource: &Resource, access_token: &str) -> NormalizedUrl {
        self.normalize(resource.kind, &resource.url, access_token)
    }
}

/// Normalizes a URL with the default managed hosting.
pub fn normalize(kind: ResourceKind, url: &str, access_token: &str) -> NormalizedUrl {
    UrlNormalizer::default().normalize(kind, url, access_token)
}
