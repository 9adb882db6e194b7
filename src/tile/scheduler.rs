//! Bounded fan-out over a tile sequence.

use std::num::NonZeroUsize;

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::error::TileError;
use crate::io::HttpClient;

use super::fetcher::TileFetcher;
use super::index::TileIndex;
use super::raster::TileImage;

/// Default in-flight limit when fetching through a proxy pool.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Drives a [`TileFetcher`] over many tiles with at most `concurrency`
/// requests in flight.
///
/// Results come back in input order regardless of completion order. The
/// batch is all-or-nothing: the first failure (in input order) is returned
/// and no partial result is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchScheduler {
    concurrency: NonZeroUsize,
}

impl FetchScheduler {
    pub fn new(concurrency: NonZeroUsize) -> Self {
        Self { concurrency }
    }

    /// One request at a time.
    pub fn sequential() -> Self {
        Self::new(NonZeroUsize::MIN)
    }

    pub fn concurrency(&self) -> NonZeroUsize {
        self.concurrency
    }

    pub async fn fetch_all<C, I>(
        &self,
        fetcher: &TileFetcher<C>,
        tiles: I,
    ) -> Result<Vec<TileImage>, TileError>
    where
        C: HttpClient,
        I: IntoIterator<Item = TileIndex>,
    {
        stream::iter(tiles)
            .map(|tile| fetcher.fetch(tile))
            .buffered(self.concurrency.get())
            .try_collect()
            .await
    }
}

impl Default for FetchScheduler {
    fn default() -> Self {
        Self::sequential()
    }
}
