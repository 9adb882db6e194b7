//! Test utilities for integration tests.
//!
//! This module provides a scripted HTTP client, a tracking proxy pool and
//! helpers for building PNG tile payloads and temporary caches.

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use tilemap::error::IoError;
use tilemap::io::{HttpClient, HttpRequest, HttpResponse, ProxyPool};
use tilemap::provider::{FixedSubdomain, Provider};
use tilemap::tile::{DiskTileCache, RetryPolicy, TileFetcher};
use tilemap::CoordinateSystem;

// =============================================================================
// Payloads
// =============================================================================

/// Encode a solid-color RGBA image as PNG.
pub fn png_tile(width: u32, height: u32, color: [u8; 4]) -> Bytes {
    let image = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    Bytes::from(buf.into_inner())
}

/// A 256x256 PNG whose color is derived from the URL, so tests can tell
/// tiles apart after a merge.
pub fn png_for_url(url: &str) -> Bytes {
    let hash = url
        .bytes()
        .fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    let [r, g, b, _] = hash.to_le_bytes();
    png_tile(256, 256, [r, g, b, 255])
}

// =============================================================================
// Scripted HTTP Client
// =============================================================================

/// What the mock answers for one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Ok(Bytes),
    Status(u16),
    Transport,
}

impl Reply {
    fn into_result(self) -> Result<HttpResponse, IoError> {
        match self {
            Reply::Ok(body) => Ok(HttpResponse {
                status: StatusCode::OK,
                body,
            }),
            Reply::Status(code) => Ok(HttpResponse {
                status: StatusCode::from_u16(code).unwrap(),
                body: Bytes::new(),
            }),
            Reply::Transport => Err(IoError::Connection("connection reset".to_string())),
        }
    }
}

type Responder = dyn Fn(&str, usize) -> Reply + Send + Sync;

/// One recorded request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub proxy: Option<String>,
}

/// An HTTP client that answers through a closure of `(url, call_number)`
/// and records every request.
///
/// `call_number` counts calls to the same URL, starting at 1.
pub struct MockHttpClient {
    responder: Box<Responder>,
    delay: Duration,
    reject_proxies: bool,
    requests: Mutex<Vec<RecordedRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockHttpClient {
    pub fn new(responder: impl Fn(&str, usize) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            reject_proxies: false,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every URL succeeds with a URL-colored 256x256 PNG.
    pub fn serving_tiles() -> Self {
        Self::new(|url, _| Reply::Ok(png_for_url(url)))
    }

    /// Every URL answers the same status.
    pub fn always_status(code: u16) -> Self {
        Self::new(move |_, _| Reply::Status(code))
    }

    /// Hold each request open for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every proxied request with `InvalidProxy`.
    pub fn rejecting_proxies(mut self) -> Self {
        self.reject_proxies = true;
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Highest number of requests observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, request: &HttpRequest<'_>) -> Result<HttpResponse, IoError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(RecordedRequest {
                url: request.url.to_string(),
                proxy: request.proxy.map(str::to_string),
            });
            requests.iter().filter(|r| r.url == request.url).count()
        };

        if self.reject_proxies {
            if let Some(proxy) = request.proxy {
                return Err(IoError::InvalidProxy(format!("{proxy}: bad proxy")));
            }
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        (self.responder)(request.url, call).into_result()
    }
}

// =============================================================================
// Tracking Proxy Pool
// =============================================================================

/// Hands out `proxy-1:8080`, `proxy-2:8080`, ... and counts requests.
#[derive(Default)]
pub struct CountingProxyPool {
    handed_out: AtomicUsize,
}

impl CountingProxyPool {
    pub fn handed_out(&self) -> usize {
        self.handed_out.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProxyPool for CountingProxyPool {
    async fn get_proxy(&self) -> Option<String> {
        let n = self.handed_out.fetch_add(1, Ordering::SeqCst) + 1;
        Some(format!("proxy-{n}:8080"))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A standard-scheme provider with a deterministic URL.
pub fn osm_provider() -> Provider {
    Provider::new(
        "Test.Osm",
        "https://{s}.tiles.test/{z}/{x}/{y}.png",
        CoordinateSystem::Standard,
    )
    .with_subdomains("abc")
    .with_max_zoom(18)
}

/// A linear-scheme (BD-09) provider.
pub fn baidu_provider() -> Provider {
    Provider::new(
        "Test.Baidu",
        "https://maps{s}.test/tile/?x={x}&y={y}&z={z}",
        CoordinateSystem::Bd,
    )
    .with_subdomains("01")
    .with_max_zoom(19)
}

/// A fetcher over `client` with a cache under `dir`, the first subdomain
/// always selected, and `max_retries` retries with no wait.
pub fn test_fetcher(
    provider: Provider,
    client: Arc<MockHttpClient>,
    dir: &TempDir,
    max_retries: u32,
) -> TileFetcher<MockHttpClient> {
    TileFetcher::new(provider, client, DiskTileCache::new(dir.path()))
        .with_subdomain_selector(Arc::new(FixedSubdomain(0)))
        .with_retry(RetryPolicy::new(max_retries, Duration::ZERO))
}

pub fn temp_cache_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}
