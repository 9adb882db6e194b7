use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use reqwest::header::USER_AGENT;

use crate::error::IoError;

/// User agent sent with tile requests.
///
/// Several providers reject requests without a browser-like agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/104.0.5112.102 Safari/537.36";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One GET request.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    pub url: &'a str,
    pub user_agent: &'a str,
    /// Proxy to route this request through, as `host:port` or a full URL.
    pub proxy: Option<&'a str>,
    pub timeout: Duration,
}

impl<'a> HttpRequest<'a> {
    pub fn new(url: &'a str) -> Self {
        Self {
            url,
            user_agent: DEFAULT_USER_AGENT,
            proxy: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Status and body of a completed request, whatever the status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Trait for issuing HTTP GET requests.
///
/// A response with any status is `Ok`; `Err` is reserved for transport
/// failures (connection, timeout, proxy). Implementations must be
/// thread-safe; one client is shared by every concurrent tile fetch.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, request: &HttpRequest<'_>) -> Result<HttpResponse, IoError>;
}

// =============================================================================
// Reqwest Client
// =============================================================================

/// `reqwest`-backed [`HttpClient`].
///
/// Direct requests share one connection pool. Proxied requests build a
/// client per proxy, since `reqwest` binds proxies at client construction.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self, IoError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| IoError::Client(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn proxied(proxy: &str) -> Result<reqwest::Client, IoError> {
        let url = if proxy.contains("://") {
            proxy.to_string()
        } else {
            format!("http://{proxy}")
        };
        let proxy = reqwest::Proxy::all(&url)
            .map_err(|e| IoError::InvalidProxy(format!("{url}: {e}")))?;

        reqwest::Client::builder()
            .proxy(proxy)
            .build()
            .map_err(|e| IoError::Client(format!("Failed to create proxied HTTP client: {e}")))
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, request: &HttpRequest<'_>) -> Result<HttpResponse, IoError> {
        let client = match request.proxy {
            Some(proxy) => Self::proxied(proxy)?,
            None => self.client.clone(),
        };

        let response = client
            .get(request.url)
            .header(USER_AGENT, request.user_agent)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| transport_error(request.url, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(request.url, e))?;

        Ok(HttpResponse { status, body })
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> IoError {
    if e.is_timeout() {
        IoError::Timeout(format!("{url}: {e}"))
    } else if e.is_builder() {
        IoError::Client(format!("{url}: {e}"))
    } else {
        IoError::Connection(format!("{url}: {e}"))
    }
}
