use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;

use crate::tile::TileIndex;

/// I/O errors raised by the HTTP and proxy-pool collaborators
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Network or connection error (connect refused, reset, TLS failure)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The request did not complete within its timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// A proxy specification could not be used
    #[error("Invalid proxy: {0}")]
    InvalidProxy(String),

    /// The HTTP client itself could not be built
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Errors that can occur while addressing, fetching or merging tiles
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Zoom level outside the provider's supported range
    #[error("Invalid zoom {zoom} for provider {provider} (valid zooms: 0 - {max_zoom})")]
    InvalidZoom {
        provider: String,
        zoom: u8,
        max_zoom: u8,
    },

    /// The provider answered with a definitive "does not exist"
    #[error("Tile not found: provider {provider}, tile {tile}, url {url}")]
    TileNotFound {
        provider: String,
        tile: TileIndex,
        url: String,
    },

    /// Transient failures exceeded the retry budget
    #[error(
        "Retries exhausted after {attempts} attempt(s): provider {provider}, tile {tile}: {last_error}"
    )]
    RetryExhausted {
        provider: String,
        tile: TileIndex,
        attempts: u32,
        last_error: String,
    },

    /// Non-2xx status that is neither retryable nor "not found"
    #[error("HTTP {status}: provider {provider}, tile {tile}")]
    HttpStatus {
        provider: String,
        tile: TileIndex,
        status: StatusCode,
    },

    /// Bounding box that cannot be addressed
    #[error("Malformed bounding box: {reason}")]
    MalformedBoundingBox { reason: String },

    /// A decoded tile could not be persisted
    #[error("Cache write failed for provider {provider}, tile {tile} at {}: {message}", path.display())]
    CacheWriteFailure {
        provider: String,
        tile: TileIndex,
        path: PathBuf,
        message: String,
    },

    /// An existing cache entry could not be read
    #[error("Cache read failed for provider {provider}, tile {tile} at {}: {message}", path.display())]
    CacheReadFailure {
        provider: String,
        tile: TileIndex,
        path: PathBuf,
        message: String,
    },

    /// Response body or cache file is not a decodable image
    #[error("Failed to decode tile: provider {provider}, tile {tile}: {message}")]
    Decode {
        provider: String,
        tile: TileIndex,
        message: String,
    },

    /// Coordinate system tag outside {wgs, gcj, bd}
    #[error("Unsupported coordinate system: {0} (expected one of wgs, gcj, bd)")]
    UnsupportedCoordinateSystem(String),

    /// URL template references a placeholder that cannot be substituted
    #[error("Invalid URL template for provider {provider}: {message}")]
    InvalidUrlTemplate { provider: String, message: String },

    /// Merge inputs do not form one grid at one zoom with one tile size
    #[error("Inconsistent tiles: {reason}")]
    InconsistentTiles { reason: String },

    /// Merge or query over zero tiles
    #[error("No tiles to merge")]
    EmptyTileSet,

    /// No catalog entry with this name
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Provider catalog could not be loaded
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// A merged raster could not be written to disk
    #[error("Failed to write output {}: {message}", path.display())]
    OutputWriteFailure { path: PathBuf, message: String },

    /// Collaborator failure outside of a tile request
    #[error(transparent)]
    Io(#[from] IoError),
}

impl TileError {
    /// The tile this error is attributed to, if any.
    pub fn tile(&self) -> Option<TileIndex> {
        match self {
            TileError::TileNotFound { tile, .. }
            | TileError::RetryExhausted { tile, .. }
            | TileError::HttpStatus { tile, .. }
            | TileError::CacheWriteFailure { tile, .. }
            | TileError::CacheReadFailure { tile, .. }
            | TileError::Decode { tile, .. } => Some(*tile),
            _ => None,
        }
    }

    /// The provider this error is attributed to, if any.
    pub fn provider(&self) -> Option<&str> {
        match self {
            TileError::InvalidZoom { provider, .. }
            | TileError::TileNotFound { provider, .. }
            | TileError::RetryExhausted { provider, .. }
            | TileError::HttpStatus { provider, .. }
            | TileError::CacheWriteFailure { provider, .. }
            | TileError::CacheReadFailure { provider, .. }
            | TileError::Decode { provider, .. }
            | TileError::InvalidUrlTemplate { provider, .. } => Some(provider),
            _ => None,
        }
    }
}
