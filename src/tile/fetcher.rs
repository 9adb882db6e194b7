//! Per-tile fetch with cache and retry.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        TileFetcher                           │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                      fetch(tile)                       │  │
//! │  │  1. Validate zoom      4. GET with retry/backoff       │  │
//! │  │  2. Check disk cache   5. Decode                       │  │
//! │  │  3. Render URL, proxy  6. Persist payload & return     │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │        │                  │                    │             │
//! │        ▼                  ▼                    ▼             │
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────────┐    │
//! │  │DiskTileCache│   │ HttpClient  │   │    ProxyPool     │    │
//! │  └─────────────┘   └─────────────┘   └──────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A cache hit performs no network I/O at all. A corrupt cache entry is a
//! `Decode` error, not a silent refetch.

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use tracing::{debug, trace, warn};

use crate::error::{IoError, TileError};
use crate::io::{HttpClient, HttpRequest, ProxyPool, DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT};
use crate::provider::{render_url, Provider, RandomSubdomain, SubdomainSelector};

use super::cache::DiskTileCache;
use super::decoder::TileDecoder;
use super::index::TileIndex;
use super::raster::TileImage;
use super::zoom::validate_zoom;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default fixed wait between attempts.
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_millis(500);

// =============================================================================
// Retry Policy
// =============================================================================

/// Fixed-backoff retry budget for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` means one attempt total.
    pub max_retries: u32,
    /// Wait between attempts.
    pub wait: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, wait: Duration) -> Self {
        Self { max_retries, wait }
    }

    /// Total attempts, first one included.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_WAIT)
    }
}

/// Statuses worth another attempt: throttling, timeouts, and gateway errors.
fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::REQUEST_TIMEOUT
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

// =============================================================================
// Tile Fetcher
// =============================================================================

/// Returns decoded tiles for one provider, from cache or network.
///
/// # Type Parameters
///
/// * `C` - The HTTP client implementation
pub struct TileFetcher<C: HttpClient> {
    provider: Arc<Provider>,
    client: Arc<C>,
    cache: DiskTileCache,
    proxy_pool: Option<Arc<dyn ProxyPool>>,
    subdomains: Arc<dyn SubdomainSelector>,
    decoder: TileDecoder,
    retry: RetryPolicy,
    timeout: Duration,
    user_agent: String,
}

impl<C: HttpClient> TileFetcher<C> {
    /// Create a fetcher with default retry, timeout, random subdomains and
    /// no proxy pool.
    pub fn new(provider: Provider, client: Arc<C>, cache: DiskTileCache) -> Self {
        Self {
            provider: Arc::new(provider),
            client,
            cache,
            proxy_pool: None,
            subdomains: Arc::new(RandomSubdomain),
            decoder: TileDecoder::new(),
            retry: RetryPolicy::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_proxy_pool(mut self, pool: Arc<dyn ProxyPool>) -> Self {
        self.proxy_pool = Some(pool);
        self
    }

    pub fn with_subdomain_selector(mut self, selector: Arc<dyn SubdomainSelector>) -> Self {
        self.subdomains = selector;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn cache(&self) -> &DiskTileCache {
        &self.cache
    }

    pub fn has_proxy_pool(&self) -> bool {
        self.proxy_pool.is_some()
    }

    /// Fetch one tile.
    ///
    /// # Errors
    ///
    /// - `InvalidZoom` if the zoom exceeds the provider's maximum
    /// - `TileNotFound` on a 404 (never retried)
    /// - `RetryExhausted` when transient failures outlast the retry budget
    /// - `HttpStatus` for any other non-2xx status
    /// - `Decode` for an undecodable payload or cache entry
    /// - `CacheReadFailure` / `CacheWriteFailure` on filesystem errors
    pub async fn fetch(&self, tile: TileIndex) -> Result<TileImage, TileError> {
        let name = self.provider.name();
        validate_zoom(tile.zoom, name, self.provider.max_zoom())?;

        if let Some(payload) = self.cache.read(&self.provider, tile).await? {
            trace!(provider = name, tile = %tile, "Tile cache hit");
            let pixels = self.decoder.decode(name, tile, &payload)?;
            return Ok(TileImage::new(tile, pixels));
        }

        let subdomain = self.subdomains.select(self.provider.subdomains());
        let url = render_url(&self.provider, tile, subdomain)?;

        let proxy = match &self.proxy_pool {
            Some(pool) => pool.get_proxy().await,
            None => None,
        };

        debug!(provider = name, tile = %tile, url = %url, proxy = ?proxy, "Fetching tile");
        let payload = self.download(tile, &url, proxy.as_deref()).await?;

        // Decode first so an undecodable body never lands in the cache
        let pixels = self.decoder.decode(name, tile, &payload)?;
        self.cache.write(&self.provider, tile, &payload).await?;

        Ok(TileImage::new(tile, pixels))
    }

    async fn download(
        &self,
        tile: TileIndex,
        url: &str,
        proxy: Option<&str>,
    ) -> Result<bytes::Bytes, TileError> {
        let name = self.provider.name();
        let attempts = self.retry.attempts();
        let mut request = HttpRequest {
            url,
            user_agent: &self.user_agent,
            proxy,
            timeout: self.timeout,
        };

        let mut last_error = String::new();
        for attempt in 1..=attempts {
            let mut result = self.client.get(&request).await;
            let mut fall_back = false;
            if let (Some(proxy), Err(IoError::InvalidProxy(reason))) = (request.proxy, &result) {
                // An unusable proxy will not improve on retry; go direct
                warn!(
                    provider = name,
                    tile = %tile,
                    proxy,
                    error = %reason,
                    "Invalid proxy, falling back to a direct request"
                );
                fall_back = true;
            }
            if fall_back {
                request.proxy = None;
                result = self.client.get(&request).await;
            }

            match result {
                Ok(response) if response.status.is_success() => return Ok(response.body),
                Ok(response) if response.status == StatusCode::NOT_FOUND => {
                    return Err(TileError::TileNotFound {
                        provider: name.to_string(),
                        tile,
                        url: url.to_string(),
                    });
                }
                Ok(response) if is_retryable(response.status) => {
                    last_error = format!("HTTP {}", response.status);
                }
                Ok(response) => {
                    return Err(TileError::HttpStatus {
                        provider: name.to_string(),
                        tile,
                        status: response.status,
                    });
                }
                Err(e) => last_error = e.to_string(),
            }

            if attempt < attempts {
                warn!(
                    provider = name,
                    tile = %tile,
                    attempt,
                    max_attempts = attempts,
                    error = %last_error,
                    "Tile fetch failed, retrying in {:?}",
                    self.retry.wait
                );
                tokio::time::sleep(self.retry.wait).await;
            }
        }

        Err(TileError::RetryExhausted {
            provider: name.to_string(),
            tile,
            attempts,
            last_error,
        })
    }
}
