use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::coord::{self, CoordinateSystem};
use crate::error::TileError;
use crate::io::{HttpClient, HttpProxyPool, ReqwestHttpClient};
use crate::provider::Provider;
use crate::tile::{
    resolve_zoom, validate_zoom, BoundingBox, DiskTileCache, FetchScheduler, RasterResult,
    Scheme, TileFetcher, TileImage, TileIndex, TileRange, TileScheme, Zoom,
};

use super::config::TileMapConfig;

/// Tile budget of a query, without fetching anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileCount {
    pub zoom: u8,
    pub columns: u64,
    pub rows: u64,
    pub tiles: u64,
}

/// Query façade for one provider.
///
/// The only component that mixes coordinate systems: a query box arrives in
/// the caller's system, is addressed in the provider's native system, and
/// the resulting extent is returned in the caller's system again.
///
/// Fetching is sequential unless a proxy pool is configured, in which case
/// up to `concurrency` tiles are in flight at once.
///
/// # Type Parameters
///
/// * `C` - The HTTP client implementation
pub struct TileMap<C: HttpClient = ReqwestHttpClient> {
    fetcher: TileFetcher<C>,
    scheme: Scheme,
    scheduler: FetchScheduler,
}

impl TileMap<ReqwestHttpClient> {
    /// Build a map backed by `reqwest`.
    pub fn new(provider: Provider, config: &TileMapConfig) -> Result<Self, TileError> {
        let client = Arc::new(ReqwestHttpClient::new()?);
        let mut fetcher = TileFetcher::new(
            provider,
            Arc::clone(&client),
            DiskTileCache::new(&config.cache_root),
        )
        .with_retry(config.retry)
        .with_timeout(config.request_timeout)
        .with_user_agent(config.user_agent.clone());

        if let Some(endpoint) = &config.proxy_pool_endpoint {
            let pool = HttpProxyPool::new(endpoint.clone(), client);
            info!(endpoint = pool.endpoint(), "Fetching through proxy pool");
            fetcher = fetcher.with_proxy_pool(Arc::new(pool));
        }

        Ok(Self::from_fetcher(fetcher, config.concurrency))
    }
}

impl<C: HttpClient> TileMap<C> {
    /// Wrap a configured fetcher. `concurrency` is ignored without a proxy
    /// pool.
    pub fn from_fetcher(fetcher: TileFetcher<C>, concurrency: NonZeroUsize) -> Self {
        let scheme = Scheme::for_system(fetcher.provider().system());
        let scheduler = if fetcher.has_proxy_pool() {
            FetchScheduler::new(concurrency)
        } else {
            FetchScheduler::sequential()
        };

        Self {
            fetcher,
            scheme,
            scheduler,
        }
    }

    pub fn provider(&self) -> &Provider {
        self.fetcher.provider()
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn scheduler(&self) -> FetchScheduler {
        self.scheduler
    }

    pub fn fetcher(&self) -> &TileFetcher<C> {
        &self.fetcher
    }

    /// Fetch and stitch every tile covering `bbox`.
    ///
    /// `bbox` is interpreted in `input_system`; the returned extent is
    /// expressed in `input_system` too. Any tile failure fails the whole
    /// query, and the error names the tile and provider.
    pub async fn query(
        &self,
        bbox: &BoundingBox,
        zoom: Zoom,
        input_system: CoordinateSystem,
    ) -> Result<RasterResult, TileError> {
        let tiles = self.fetch_tiles(bbox, zoom, input_system).await?;
        let raster = self.scheme.merge(tiles)?;
        Ok(raster.with_extent_in(input_system))
    }

    /// Fetch every tile covering `bbox` without merging, in enumeration
    /// order.
    pub async fn fetch_tiles(
        &self,
        bbox: &BoundingBox,
        zoom: Zoom,
        input_system: CoordinateSystem,
    ) -> Result<Vec<TileImage>, TileError> {
        let range = self.plan(bbox, zoom, input_system)?;
        if range.tile_count() == 0 {
            return Err(TileError::EmptyTileSet);
        }

        info!(
            provider = self.provider().name(),
            zoom = range.zoom(),
            tiles = range.tile_count(),
            concurrency = self.scheduler.concurrency().get(),
            "Fetching tiles"
        );
        self.scheduler.fetch_all(&self.fetcher, range).await
    }

    /// Resolve zoom and count the tiles `bbox` needs.
    pub fn count_tiles(
        &self,
        bbox: &BoundingBox,
        zoom: Zoom,
        input_system: CoordinateSystem,
    ) -> Result<TileCount, TileError> {
        let range = self.plan(bbox, zoom, input_system)?;
        let (columns, rows) = range.dimensions();
        Ok(TileCount {
            zoom: range.zoom(),
            columns,
            rows,
            tiles: range.tile_count(),
        })
    }

    /// Fetch one tile by its native index.
    pub async fn fetch_tile_xyz(&self, x: i64, y: i64, zoom: u8) -> Result<TileImage, TileError> {
        self.fetcher.fetch(TileIndex::new(x, y, zoom)).await
    }

    /// Fetch the tile containing a point expressed in `system`.
    pub async fn fetch_tile_lnglat(
        &self,
        lng: f64,
        lat: f64,
        zoom: u8,
        system: CoordinateSystem,
    ) -> Result<TileImage, TileError> {
        let tile = self.tile_at(lng, lat, zoom, system)?;
        self.fetcher.fetch(tile).await
    }

    /// Native index of the tile containing a point expressed in `system`.
    pub fn tile_at(
        &self,
        lng: f64,
        lat: f64,
        zoom: u8,
        system: CoordinateSystem,
    ) -> Result<TileIndex, TileError> {
        let provider = self.provider();
        let zoom = validate_zoom(zoom, provider.name(), provider.max_zoom())?;
        let (lng, lat) = coord::convert(system, self.scheme.native_system(), lng, lat);
        Ok(self.scheme.tile_at(lng, lat, zoom))
    }

    /// Convert `bbox` to the native system, resolve zoom and enumerate.
    fn plan(
        &self,
        bbox: &BoundingBox,
        zoom: Zoom,
        input_system: CoordinateSystem,
    ) -> Result<TileRange, TileError> {
        let native = bbox.convert(input_system, self.scheme.native_system())?;
        let provider = self.provider();
        let zoom = resolve_zoom(zoom, &native, provider.name(), provider.max_zoom())?;
        Ok(self.scheme.enumerate(&native, zoom))
    }
}
