//! Coordinator configuration.

use crate::normalize::ManagedHosting;
use crate::transport::{CachePreference, DEFAULT_USER_AGENT};
use std::fmt;
use std::str::FromStr;

/// Default bound on concurrent transfers.
pub const DEFAULT_MAX_CONCURRENT_TRANSFERS: usize = 4;

/// Admission limit for dispatched transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxConcurrentTransfers {
    /// Every new URL is dispatched immediately.
    Unbounded,
    /// At most `n` transfers in flight; further URLs wait in a FIFO queue.
    /// A limit of zero behaves like one.
    Limited(usize),
}

impl MaxConcurrentTransfers {
    /// Whether another transfer may start while `active` are in flight.
    pub fn allows(&self, active: usize) -> bool {
        match self {
            MaxConcurrentTransfers::Unbounded => true,
            MaxConcurrentTransfers::Limited(n) => active < (*n).max(1),
        }
    }
}

impl Default for MaxConcurrentTransfers {
    fn default() -> Self {
        MaxConcurrentTransfers::Limited(DEFAULT_MAX_CONCURRENT_TRANSFERS)
    }
}

impl fmt::Display for MaxConcurrentTransfers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxConcurrentTransfers::Unbounded => write!(f, "unbounded"),
            MaxConcurrentTransfers::Limited(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for MaxConcurrentTransfers {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unbounded") {
            return Ok(MaxConcurrentTransfers::Unbounded);
        }
        match s.parse::<usize>() {
            Ok(0) => Err("must be at least 1 or 'unbounded'".to_string()),
            Ok(n) => Ok(MaxConcurrentTransfers::Limited(n)),
            Err(_) => Err("must be a positive integer or 'unbounded'".to_string()),
        }
    }
}

/// Configuration for a [`CoordinatorDaemon`](super::CoordinatorDaemon).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Admission limit.
    pub max_concurrent_transfers: MaxConcurrentTransfers,
    /// Managed hosting used by URL normalization.
    pub hosting: ManagedHosting,
    /// Initial access token; can be changed later on the `FileSource`.
    pub access_token: String,
    /// `User-Agent` for every transport request.
    pub user_agent: String,
    /// Cache preference passed to the transport.
    pub cache_preference: CachePreference,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_transfers: MaxConcurrentTransfers::default(),
            hosting: ManagedHosting::default(),
            access_token: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_preference: CachePreference::default(),
        }
    }
}

impl From<&crate::config::ConfigFile> for CoordinatorConfig {
    fn from(config: &crate::config::ConfigFile) -> Self {
        let hosting = config
            .network
            .managed_hosts
            .iter()
            .fold(ManagedHosting::new(config.network.api_base_url.as_str()), |hosting, host| {
                hosting.with_host(host.as_str())
            });

        Self {
            max_concurrent_transfers: config.coordinator.max_concurrent_transfers,
            hosting,
            access_token: config.network.access_token.clone().unwrap_or_default(),
            user_agent: config.network.user_agent.clone(),
            cache_preference: CachePreference::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn with_max_concurrent_transfers(mut self, limit: MaxConcurrentTransfers) -> Self {
        self.max_concurrent_transfers = limit;
        self
    }

    pub fn with_hosting(mut self, hosting: ManagedHosting) -> Self {
        self.hosting = hosting;
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
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
