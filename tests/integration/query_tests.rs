//! End-to-end queries through `TileMap`: planning, fetching, merging and
//! extents.

use std::num::NonZeroUsize;
use std::sync::Arc;

use image::ImageReader;
use std::io::Cursor;

use tilemap::tile::{auto_zoom, TileIndex, TileScheme};
use tilemap::{BoundingBox, CoordinateSystem, StaticProxyPool, TileError, TileMap, Zoom};

use super::test_utils::{
    baidu_provider, osm_provider, png_for_url, temp_cache_dir, test_fetcher, MockHttpClient, Reply,
};

fn concurrency(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn shenzhen() -> BoundingBox {
    BoundingBox::new(113.93329, 22.57102, 113.94413, 22.58131).unwrap()
}

// =============================================================================
// Linear (BD-09) Provider
// =============================================================================

#[tokio::test]
async fn test_baidu_query_covers_requested_box() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let map = TileMap::from_fetcher(
        test_fetcher(baidu_provider(), Arc::clone(&client), &dir, 0),
        concurrency(8),
    );

    let bbox = shenzhen();
    let count = map
        .count_tiles(&bbox, Zoom::Level(18), CoordinateSystem::Standard)
        .unwrap();
    let raster = map
        .query(&bbox, Zoom::Level(18), CoordinateSystem::Standard)
        .await
        .unwrap();

    assert_eq!(raster.zoom, 18);
    assert_eq!(raster.extent.system, CoordinateSystem::Standard);
    assert!(raster.extent.encloses(&bbox, 1e-4), "{:?}", raster.extent);
    assert_eq!(raster.width() % 256, 0);
    assert_eq!(raster.height() % 256, 0);
    assert_eq!(u64::from(raster.width() / 256), count.columns);
    assert_eq!(u64::from(raster.height() / 256), count.rows);
    assert_eq!(client.request_count() as u64, count.tiles);
}

#[tokio::test]
async fn test_baidu_rows_grow_northward() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let map = TileMap::from_fetcher(
        test_fetcher(baidu_provider(), Arc::clone(&client), &dir, 0),
        concurrency(1),
    );

    let bbox = shenzhen();
    let range = map.scheme().enumerate(
        &bbox.convert(CoordinateSystem::Standard, CoordinateSystem::Bd).unwrap(),
        18,
    );
    let raster = map
        .query(&bbox, Zoom::Level(18), CoordinateSystem::Standard)
        .await
        .unwrap();

    // The northernmost row lands at the top of the canvas
    let (_, rows) = range.dimensions();
    let tiles: Vec<TileIndex> = range.collect();
    let west = tiles.iter().map(|t| t.x).min().unwrap();
    let north = tiles.iter().map(|t| t.y).max().unwrap();
    let top_left = TileIndex::new(west, north, 18);
    let url = format!(
        "https://maps0.test/tile/?x={}&y={}&z=18",
        top_left.x, top_left.y
    );
    let expected = decode(&png_for_url(&url));
    assert_eq!(raster.image.get_pixel(0, 0), expected.get_pixel(0, 0));
    assert_eq!(u64::from(raster.height()), rows * 256);
}

#[tokio::test]
async fn test_baidu_boxes_at_world_edges_are_addressable() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let map = TileMap::from_fetcher(
        test_fetcher(baidu_provider(), Arc::clone(&client), &dir, 0),
        concurrency(1),
    );

    for bbox in [
        BoundingBox::new(170.0, 10.0, 180.0, 20.0).unwrap(),
        BoundingBox::new(100.0, 80.0, 110.0, 90.0).unwrap(),
        BoundingBox::new(-180.0, -85.0, 180.0, 85.0).unwrap(),
    ] {
        let count = map
            .count_tiles(&bbox, Zoom::Level(3), CoordinateSystem::Standard)
            .unwrap();
        assert!(count.tiles >= 1, "{bbox:?}");
    }
    assert_eq!(client.request_count(), 0);
}

// =============================================================================
// Standard Provider
// =============================================================================

#[tokio::test]
async fn test_zoom_one_world_merges_to_512() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let map = TileMap::from_fetcher(
        test_fetcher(osm_provider(), Arc::clone(&client), &dir, 0),
        concurrency(1),
    );

    let bbox = BoundingBox::new(-180.0, -85.0, 180.0, 85.0).unwrap();
    let raster = map
        .query(&bbox, Zoom::Level(1), CoordinateSystem::Standard)
        .await
        .unwrap();

    assert_eq!((raster.width(), raster.height()), (512, 512));
    assert_eq!(client.request_count(), 4);

    let extent = raster.extent;
    assert!((extent.west + 180.0).abs() < 1e-9);
    assert!((extent.east - 180.0).abs() < 1e-9);
    assert!((extent.south + 85.0511).abs() < 1e-4);
    assert!((extent.north - 85.0511).abs() < 1e-4);

    // Tile (1, 1) is the south-east quadrant
    let south_east = decode(&png_for_url("https://a.tiles.test/1/1/1.png"));
    assert_eq!(raster.image.get_pixel(300, 300), south_east.get_pixel(0, 0));
}

#[tokio::test]
async fn test_single_tile_query_equals_the_tile() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let map = TileMap::from_fetcher(
        test_fetcher(osm_provider(), Arc::clone(&client), &dir, 0),
        concurrency(1),
    );

    let bbox = BoundingBox::new(1.0, 1.0, 2.0, 2.0).unwrap();
    let count = map
        .count_tiles(&bbox, Zoom::Level(4), CoordinateSystem::Standard)
        .unwrap();
    assert_eq!(count.tiles, 1);

    let raster = map
        .query(&bbox, Zoom::Level(4), CoordinateSystem::Standard)
        .await
        .unwrap();
    let tile = decode(&png_for_url("https://a.tiles.test/4/8/7.png"));
    assert_eq!(raster.image, tile);
}

#[tokio::test]
async fn test_auto_zoom_resolves_from_box() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let map = TileMap::from_fetcher(
        test_fetcher(osm_provider(), client, &dir, 0),
        concurrency(1),
    );

    let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
    let count = map
        .count_tiles(&bbox, Zoom::Auto, CoordinateSystem::Standard)
        .unwrap();
    assert_eq!(u32::from(count.zoom), auto_zoom(&bbox));
    assert_eq!(count.zoom, 6);

    // Tiny boxes clamp to the provider maximum
    let tiny = BoundingBox::new(0.0, 0.0, 1e-7, 1e-7).unwrap();
    let count = map
        .count_tiles(&tiny, Zoom::Auto, CoordinateSystem::Standard)
        .unwrap();
    assert_eq!(count.zoom, 18);
}

#[tokio::test]
async fn test_explicit_zoom_above_max_is_rejected() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let map = TileMap::from_fetcher(
        test_fetcher(osm_provider(), Arc::clone(&client), &dir, 0),
        concurrency(1),
    );

    let result = map
        .query(&shenzhen(), Zoom::Level(19), CoordinateSystem::Standard)
        .await;
    assert!(matches!(result, Err(TileError::InvalidZoom { zoom: 19, .. })));
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_failed_tile_fails_query_with_attribution() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::new(|url, _| {
        if url.ends_with("/1/0/1.png") {
            Reply::Status(404)
        } else {
            Reply::Ok(png_for_url(url))
        }
    }));
    let map = TileMap::from_fetcher(
        test_fetcher(osm_provider(), client, &dir, 0),
        concurrency(1),
    );

    let bbox = BoundingBox::new(-180.0, -85.0, 180.0, 85.0).unwrap();
    let err = map
        .query(&bbox, Zoom::Level(1), CoordinateSystem::Standard)
        .await
        .unwrap_err();
    assert_eq!(err.tile(), Some(TileIndex::new(0, 1, 1)));
    assert_eq!(err.provider(), Some("Test.Osm"));
    assert!(err.to_string().contains("0/1/1"));
}

#[tokio::test]
async fn test_repeat_query_is_served_from_cache() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let map = TileMap::from_fetcher(
        test_fetcher(osm_provider(), Arc::clone(&client), &dir, 0),
        concurrency(1),
    );

    let bbox = BoundingBox::new(-10.0, -10.0, 10.0, 10.0).unwrap();
    let first = map
        .query(&bbox, Zoom::Level(3), CoordinateSystem::Standard)
        .await
        .unwrap();
    let calls = client.request_count();
    assert!(calls > 0);

    let second = map
        .query(&bbox, Zoom::Level(3), CoordinateSystem::Standard)
        .await
        .unwrap();
    assert_eq!(client.request_count(), calls);
    assert_eq!(first.image, second.image);
    assert_eq!(first.extent, second.extent);
}

#[tokio::test]
async fn test_extent_is_reported_in_input_system() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let map = TileMap::from_fetcher(
        test_fetcher(baidu_provider(), client, &dir, 0),
        concurrency(1),
    );

    let bbox = BoundingBox::new(113.938, 22.575, 113.940, 22.577).unwrap();
    let raster = map
        .query(&bbox, Zoom::Level(17), CoordinateSystem::Gcj)
        .await
        .unwrap();
    assert_eq!(raster.extent.system, CoordinateSystem::Gcj);
    assert!(raster.extent.encloses(&bbox, 1e-4));
}

// =============================================================================
// Single Tiles and Scheduling
// =============================================================================

#[tokio::test]
async fn test_fetch_tile_by_point() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());
    let map = TileMap::from_fetcher(
        test_fetcher(osm_provider(), Arc::clone(&client), &dir, 0),
        concurrency(1),
    );

    let image = map
        .fetch_tile_lnglat(1.5, 1.5, 4, CoordinateSystem::Standard)
        .await
        .unwrap();
    assert_eq!(image.index, TileIndex::new(8, 7, 4));
    assert_eq!(client.requests()[0].url, "https://a.tiles.test/4/8/7.png");

    let same = map.fetch_tile_xyz(8, 7, 4).await.unwrap();
    assert_eq!(same.pixels, image.pixels);
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn test_concurrency_requires_proxy_pool() {
    let dir = temp_cache_dir();
    let client = Arc::new(MockHttpClient::serving_tiles());

    let direct = TileMap::from_fetcher(
        test_fetcher(osm_provider(), Arc::clone(&client), &dir, 0),
        concurrency(8),
    );
    assert_eq!(direct.scheduler().concurrency().get(), 1);

    let proxied = TileMap::from_fetcher(
        test_fetcher(osm_provider(), client, &dir, 0)
            .with_proxy_pool(Arc::new(StaticProxyPool::new("127.0.0.1:3128"))),
        concurrency(8),
    );
    assert_eq!(proxied.scheduler().concurrency().get(), 8);
}

fn decode(payload: &[u8]) -> image::RgbaImage {
    ImageReader::new(Cursor::new(payload))
        .with_guessed_format()
        .unwrap()
        .decode()
        .unwrap()
        .to_rgba8()
}
