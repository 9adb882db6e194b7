use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::io::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT};
use crate::tile::{RetryPolicy, DEFAULT_CONCURRENCY};

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_ROOT: &str = "./tile-cache";

/// Library-level settings for a [`TileMap`](super::TileMap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMapConfig {
    /// Root of the on-disk tile cache.
    pub cache_root: PathBuf,

    /// Endpoint returning one proxy per GET. Enables concurrent fetching.
    pub proxy_pool_endpoint: Option<String>,

    pub retry: RetryPolicy,

    pub request_timeout: Duration,

    pub user_agent: String,

    /// In-flight request limit; only applies with a proxy pool.
    pub concurrency: NonZeroUsize,
}

impl TileMapConfig {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            ..Self::default()
        }
    }

    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_root.as_os_str().is_empty() {
            return Err("cache_root must not be empty".to_string());
        }
        if self.request_timeout.is_zero() {
            return Err("request_timeout must be greater than 0".to_string());
        }
        if self.user_agent.trim().is_empty() {
            return Err("user_agent must not be empty".to_string());
        }
        if let Some(endpoint) = &self.proxy_pool_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!(
                    "proxy pool endpoint must be an http(s) URL, got '{endpoint}'"
                ));
            }
        }
        Ok(())
    }
}

impl Default for TileMapConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(DEFAULT_CACHE_ROOT),
            proxy_pool_endpoint: None,
            retry: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            concurrency: NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN),
        }
    }
}
