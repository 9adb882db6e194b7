//! # tilemap
//!
//! Fetch, cache and stitch map tiles from web tile providers that publish in
//! WGS84, GCJ-02 or BD-09.
//!
//! Given a bounding box, a zoom (or `auto`) and a provider, the library
//! enumerates the covering tiles in the provider's own tiling scheme,
//! downloads them through a write-through disk cache, and merges them into a
//! single RGBA raster with the geographic extent of the result.
//!
//! ## Features
//!
//! - **Three coordinate systems**: WGS84, GCJ-02 and BD-09 with conversions in both directions
//! - **Two tiling schemes**: XYZ web-Mercator tiles and Baidu's linear BD-09 Mercator grid
//! - **Write-through disk cache**: `<root>/<provider>/<z>/<x>/<y>.<ext>`, never refetched once present
//! - **Retry and proxy rotation**: bounded retries on transient failures, optional proxy pool
//! - **Bounded concurrency**: order-preserving fan-out when a proxy pool is configured
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`coord`] - Coordinate systems and datum conversions
//! - [`tile`] - Tile addressing, schemes, fetching, caching and merging
//! - [`provider`] - Provider descriptors, URL templates and the catalog
//! - [`io`] - HTTP client and proxy-pool collaborators
//! - [`map`] - The [`TileMap`] query façade
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use tilemap::{builtin, BoundingBox, CoordinateSystem, TileMap, TileMapConfig, Zoom};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tilemap::TileError> {
//!     let provider = builtin().get("Baidu.Tile")?.clone();
//!     let map = TileMap::new(provider, &TileMapConfig::new("./tile-cache"))?;
//!
//!     let bbox = BoundingBox::new(113.93329, 22.57102, 113.94413, 22.58131)?;
//!     let raster = map
//!         .query(&bbox, Zoom::Level(18), CoordinateSystem::Standard)
//!         .await?;
//!
//!     raster.save("shenzhen.png")?;
//!     println!("{:?}", raster.extent);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coord;
pub mod error;
pub mod io;
pub mod map;
pub mod provider;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, Command, CountConfig, FetchConfig, ProvidersConfig, TileConfig};
pub use coord::CoordinateSystem;
pub use error::{IoError, TileError};
pub use io::{
    HttpClient, HttpProxyPool, HttpRequest, HttpResponse, ProxyPool, ReqwestHttpClient,
    StaticProxyPool,
};
pub use map::{TileCount, TileMap, TileMapConfig};
pub use provider::{
    builtin, render_url, Catalog, FixedSubdomain, Provider, RandomSubdomain, SubdomainSelector,
};
pub use tile::{
    merge_tiles, BoundingBox, DiskTileCache, Extent, FetchScheduler, RasterResult, RetryPolicy,
    Scheme, TileFetcher, TileImage, TileIndex, TileRange, TileScheme, Zoom,
};
