use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::client::{HttpClient, HttpRequest};

/// Trait for sources of per-request HTTP proxies.
///
/// `None` means "go direct". A pool must never fail a fetch: an
/// unreachable or empty pool yields `None` and the request proceeds
/// without a proxy.
#[async_trait]
pub trait ProxyPool: Send + Sync {
    async fn get_proxy(&self) -> Option<String>;
}

/// Proxy pool served by an HTTP endpoint whose body is one `host:port`.
pub struct HttpProxyPool<C: HttpClient> {
    endpoint: String,
    client: Arc<C>,
}

impl<C: HttpClient> HttpProxyPool<C> {
    pub fn new(endpoint: impl Into<String>, client: Arc<C>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl<C: HttpClient> ProxyPool for HttpProxyPool<C> {
    async fn get_proxy(&self) -> Option<String> {
        let response = match self.client.get(&HttpRequest::new(&self.endpoint)).await {
            Ok(response) => response,
            Err(e) => {
                debug!(endpoint = %self.endpoint, error = %e, "Proxy pool unreachable");
                return None;
            }
        };

        if !response.status.is_success() {
            debug!(endpoint = %self.endpoint, status = %response.status, "Proxy pool refused");
            return None;
        }

        let proxy = String::from_utf8_lossy(&response.body).trim().to_string();
        (!proxy.is_empty()).then_some(proxy)
    }
}

/// Pool that always hands out the same proxy.
#[derive(Debug, Clone)]
pub struct StaticProxyPool {
    proxy: String,
}

impl StaticProxyPool {
    pub fn new(proxy: impl Into<String>) -> Self {
        Self {
            proxy: proxy.into(),
        }
    }
}

#[async_trait]
impl ProxyPool for StaticProxyPool {
    async fn get_proxy(&self) -> Option<String> {
        Some(self.proxy.clone())
    }
}
