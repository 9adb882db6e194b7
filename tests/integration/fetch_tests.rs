//! Per-tile fetch behavior: cache, retry, proxies and batch scheduling.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tilemap::tile::{FetchScheduler, TileIndex};
use tilemap::TileError;

use super::test_utils::{
    osm_provider, png_for_url, png_tile, temp_cache_dir, test_fetcher, CountingProxyPool,
    MockHttpClient, Reply,
};

fn tile() -> TileIndex {
    TileIndex::new(3, 5, 4)
}

const TILE_URL: &str = "https://a.tiles.test/4/3/5.png";

// =============================================================================
// Cache
// =============================================================================

#[tokio::test]
async fn test_cache_hit_makes_no_network_call() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 2);

    fetcher
        .cache()
        .write(fetcher.provider(), tile(), &png_tile(256, 256, [1, 2, 3, 255]))
        .await
        .unwrap();

    let image = fetcher.fetch(tile()).await.unwrap();
    assert_eq!(image.index, tile());
    assert_eq!(image.dimensions(), (256, 256));
    assert_eq!(image.pixels.get_pixel(0, 0).0, [1, 2, 3, 255]);
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_fetch_writes_through_to_cache() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 2);

    fetcher.fetch(tile()).await.unwrap();
    assert_eq!(client.request_count(), 1);
    assert_eq!(client.requests()[0].url, TILE_URL);

    let path = fetcher.cache().path(fetcher.provider(), tile());
    assert!(path.ends_with("4/3/5.png"));
    assert_eq!(std::fs::read(&path).unwrap(), png_for_url(TILE_URL).to_vec());

    // Served from disk the second time
    fetcher.fetch(tile()).await.unwrap();
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn test_corrupt_cache_entry_is_a_decode_error() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 2);

    fetcher
        .cache()
        .write(fetcher.provider(), tile(), b"not an image")
        .await
        .unwrap();

    match fetcher.fetch(tile()).await {
        Err(TileError::Decode { provider, tile: t, .. }) => {
            assert_eq!(provider, "Test.Osm");
            assert_eq!(t, tile());
        }
        other => panic!("Expected Decode, got {other:?}"),
    }
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_undecodable_body_is_not_cached() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::new(|_, _| {
        Reply::Ok(bytes::Bytes::from_static(b"<html>blocked</html>"))
    }));
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 2);

    assert!(matches!(
        fetcher.fetch(tile()).await,
        Err(TileError::Decode { .. })
    ));
    assert!(!fetcher.cache().contains(fetcher.provider(), tile()).await);
}

// =============================================================================
// Retry
// =============================================================================

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::new(|url, call| {
        if call <= 2 {
            Reply::Status(503)
        } else {
            Reply::Ok(png_for_url(url))
        }
    }));
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 2);

    let image = fetcher.fetch(tile()).await.unwrap();
    assert_eq!(image.dimensions(), (256, 256));
    assert_eq!(client.request_count(), 3);
}

#[tokio::test]
async fn test_retry_exhausted_after_budget() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::always_status(429));
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 2);

    match fetcher.fetch(tile()).await {
        Err(TileError::RetryExhausted {
            provider,
            tile: t,
            attempts,
            last_error,
        }) => {
            assert_eq!(provider, "Test.Osm");
            assert_eq!(t, tile());
            assert_eq!(attempts, 3);
            assert!(last_error.contains("429"));
        }
        other => panic!("Expected RetryExhausted, got {other:?}"),
    }
    assert_eq!(client.request_count(), 3);
    assert!(!fetcher.cache().contains(fetcher.provider(), tile()).await);
}

#[tokio::test]
async fn test_transport_errors_are_retried() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::new(|_, _| Reply::Transport));
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 1);

    match fetcher.fetch(tile()).await {
        Err(TileError::RetryExhausted {
            attempts,
            last_error,
            ..
        }) => {
            assert_eq!(attempts, 2);
            assert!(last_error.contains("connection reset"));
        }
        other => panic!("Expected RetryExhausted, got {other:?}"),
    }
    assert_eq!(client.request_count(), 2);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::always_status(404));
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 2);

    match fetcher.fetch(tile()).await {
        Err(TileError::TileNotFound { tile: t, url, .. }) => {
            assert_eq!(t, tile());
            assert_eq!(url, TILE_URL);
        }
        other => panic!("Expected TileNotFound, got {other:?}"),
    }
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn test_non_retryable_status_fails_immediately() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::always_status(403));
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 2);

    match fetcher.fetch(tile()).await {
        Err(TileError::HttpStatus { status, .. }) => assert_eq!(status.as_u16(), 403),
        other => panic!("Expected HttpStatus, got {other:?}"),
    }
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn test_zoom_above_provider_max_is_rejected_before_io() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 2);

    match fetcher.fetch(TileIndex::new(0, 0, 19)).await {
        Err(TileError::InvalidZoom { zoom, max_zoom, .. }) => {
            assert_eq!(zoom, 19);
            assert_eq!(max_zoom, 18);
        }
        other => panic!("Expected InvalidZoom, got {other:?}"),
    }
    assert_eq!(client.request_count(), 0);
}

// =============================================================================
// Proxies
// =============================================================================

#[tokio::test]
async fn test_one_proxy_per_tile_across_retries() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::new(|url, call| {
        if call == 1 {
            Reply::Status(502)
        } else {
            Reply::Ok(png_for_url(url))
        }
    }));
    let pool = Arc::new(CountingProxyPool::default());
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 2)
        .with_proxy_pool(pool.clone());

    fetcher.fetch(tile()).await.unwrap();

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests
        .iter()
        .all(|r| r.proxy.as_deref() == Some("proxy-1:8080")));
    assert_eq!(pool.handed_out(), 1);
}

#[tokio::test]
async fn test_invalid_proxy_falls_back_to_direct_request() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles().rejecting_proxies());
    let pool = Arc::new(CountingProxyPool::default());
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 0)
        .with_proxy_pool(pool.clone());

    // No retry budget: the direct request happens within the first attempt
    let image = fetcher.fetch(tile()).await.unwrap();
    assert_eq!(image.dimensions(), (256, 256));

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].proxy.as_deref(), Some("proxy-1:8080"));
    assert_eq!(requests[1].proxy, None);
    assert_eq!(pool.handed_out(), 1);
}

#[tokio::test]
async fn test_cache_hit_skips_proxy_pool() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let pool = Arc::new(CountingProxyPool::default());
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 2)
        .with_proxy_pool(pool.clone());

    fetcher.fetch(tile()).await.unwrap();
    fetcher.fetch(tile()).await.unwrap();
    assert_eq!(pool.handed_out(), 1);
}

// =============================================================================
// Scheduling
// =============================================================================

fn row_of_tiles(count: i64) -> Vec<TileIndex> {
    (0..count).map(|x| TileIndex::new(x, 7, 4)).collect()
}

#[tokio::test]
async fn test_scheduler_preserves_input_order() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles().with_delay(Duration::from_millis(5)));
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 0);
    let scheduler = FetchScheduler::new(NonZeroUsize::new(4).unwrap());

    let tiles = row_of_tiles(10);
    let images = scheduler.fetch_all(&fetcher, tiles.clone()).await.unwrap();

    let fetched: Vec<TileIndex> = images.iter().map(|i| i.index).collect();
    assert_eq!(fetched, tiles);
    assert!(client.max_in_flight() > 1);
    assert!(client.max_in_flight() <= 4);
}

#[tokio::test]
async fn test_sequential_scheduler_has_one_request_in_flight() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles().with_delay(Duration::from_millis(2)));
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 0);

    let images = FetchScheduler::sequential()
        .fetch_all(&fetcher, row_of_tiles(5))
        .await
        .unwrap();
    assert_eq!(images.len(), 5);
    assert_eq!(client.max_in_flight(), 1);
}

#[tokio::test]
async fn test_batch_fails_as_a_whole() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::new(|url, _| {
        if url.ends_with("/4/2/7.png") {
            Reply::Status(404)
        } else {
            Reply::Ok(png_for_url(url))
        }
    }));
    let fetcher = test_fetcher(osm_provider(), Arc::clone(&client), &dir, 0);
    let scheduler = FetchScheduler::new(NonZeroUsize::new(3).unwrap());

    let err = scheduler
        .fetch_all(&fetcher, row_of_tiles(6))
        .await
        .unwrap_err();
    assert_eq!(err.tile(), Some(TileIndex::new(2, 7, 4)));
    assert_eq!(err.provider(), Some("Test.Osm"));
}
