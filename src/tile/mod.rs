//! Tile addressing, fetching and merging.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                 TileMap                 │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┼──────────────┐
//!          ▼           ▼              ▼
//! ┌──────────────┐ ┌──────────────┐ ┌────────────┐
//! │  TileScheme  │ │FetchScheduler│ │ merge_tiles│
//! │ (enumerate,  │ │ (bounded,    │ │ (canvas,   │
//! │  bounds)     │ │  ordered)    │ │  extent)   │
//! └──────────────┘ └──────┬───────┘ └────────────┘
//!                         │
//!                         ▼
//! ┌─────────────────────────────────────────┐
//! │               TileFetcher               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │DiskTileCache │  │   TileDecoder   │  │
//! │  │ (raw payload │  │  (PNG/JPEG →    │  │
//! │  │  per tile)   │  │   RGBA8)        │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileIndex`], [`BoundingBox`], [`Extent`]: addressing value types
//! - [`TileScheme`]: enumerate and bound tiles; [`StandardScheme`] (XYZ) and
//!   [`LinearScheme`] (BD-Mercator), resolved per provider as [`Scheme`]
//! - [`Zoom`], [`resolve_zoom`]: auto and explicit zoom selection
//! - [`TileFetcher`]: one tile from cache or network, with [`RetryPolicy`]
//! - [`FetchScheduler`]: bounded, order-preserving fan-out
//! - [`merge_tiles`]: stitch a grid into a [`RasterResult`]

mod cache;
mod decoder;
mod fetcher;
mod index;
mod merge;
mod raster;
mod scheduler;
mod scheme;
mod zoom;

pub use cache::DiskTileCache;
pub use decoder::TileDecoder;
pub use fetcher::{RetryPolicy, TileFetcher, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_WAIT};
pub use index::{BoundingBox, Extent, TileIndex};
pub use merge::merge_tiles;
pub use raster::{RasterResult, TileImage};
pub use scheduler::{FetchScheduler, DEFAULT_CONCURRENCY};
pub use scheme::{
    LinearScheme, Scheme, StandardScheme, TileRange, TileScheme, LINEAR_BASE_ZOOM, MAX_LATITUDE,
};
pub use zoom::{auto_zoom, resolve_zoom, validate_zoom, Zoom, MAX_SUPPORTED_ZOOM};
