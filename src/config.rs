//! Command-line configuration for the `tilemap` binary.
//!
//! Every networked option can also be set through a `TILEMAP_` environment
//! variable:
//!
//! - `TILEMAP_PROVIDER` - Provider name (default: Amap.Satellite)
//! - `TILEMAP_PROVIDERS_FILE` - JSON catalog overriding the built-in providers
//! - `TILEMAP_CACHE_DIR` - Tile cache root (default: ./tile-cache)
//! - `TILEMAP_PROXY_POOL` - Proxy pool endpoint; enables concurrent fetching
//! - `TILEMAP_CONCURRENCY` - In-flight limit with a proxy pool (default: 8)
//! - `TILEMAP_MAX_RETRIES` - Retries per tile after the first attempt (default: 2)
//! - `TILEMAP_RETRY_WAIT_MS` - Wait between attempts (default: 500)
//! - `TILEMAP_TIMEOUT_SECS` - Per-request timeout (default: 30)
//!
//! # Example
//!
//! ```text
//! tilemap fetch --provider Baidu.Tile --bbox 113.93329,22.57102,113.94413,22.58131 \
//!     --zoom 18 --output shenzhen.png
//! tilemap count --bbox 113.9,22.5,114.0,22.6
//! tilemap tile --provider OpenStreetMap.Mapnik --xyz 3,5,4 --output tile.png
//! ```

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::coord::CoordinateSystem;
use crate::error::TileError;
use crate::io::DEFAULT_USER_AGENT;
use crate::map::{TileMapConfig, DEFAULT_CACHE_ROOT};
use crate::provider::{builtin, Catalog, Provider, DEFAULT_PROVIDER};
use crate::tile::{BoundingBox, RetryPolicy, Zoom, DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES};

// =============================================================================
// Default Values
// =============================================================================

/// Default wait between attempts, in milliseconds.
pub const DEFAULT_RETRY_WAIT_MS: u64 = 500;

/// Default per-request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default output path of `fetch`.
pub const DEFAULT_OUTPUT: &str = "tilemap.png";

// =============================================================================
// CLI Structure
// =============================================================================

/// tilemap - Fetch, cache and stitch map tiles from WGS84, GCJ-02 and BD-09
/// providers.
#[derive(Parser, Debug, Clone)]
#[command(name = "tilemap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download the tiles covering a bounding box and stitch them into one
    /// image. Prints the image extent as JSON.
    Fetch(FetchConfig),

    /// Report the zoom and number of tiles a bounding box needs.
    Count(CountConfig),

    /// Download a single tile.
    Tile(TileConfig),

    /// List available providers.
    Providers(ProvidersConfig),
}

// =============================================================================
// Shared Argument Groups
// =============================================================================

/// Provider selection, shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    /// Provider name, e.g. OpenStreetMap.Mapnik or Baidu.Tile.
    #[arg(long, default_value = DEFAULT_PROVIDER, env = "TILEMAP_PROVIDER")]
    pub provider: String,

    /// JSON catalog of extra providers; entries replace built-ins of the same
    /// name.
    #[arg(long, env = "TILEMAP_PROVIDERS_FILE")]
    pub providers_file: Option<PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ProviderArgs {
    /// The catalog: built-ins, overridden by `--providers-file`.
    pub fn catalog(&self) -> Result<Catalog, TileError> {
        let catalog = builtin();
        match &self.providers_file {
            Some(path) => Ok(catalog.merge(Catalog::from_json_file(path)?)),
            None => Ok(catalog),
        }
    }

    pub fn resolve(&self) -> Result<Provider, TileError> {
        self.catalog()?.get(&self.provider).cloned()
    }
}

/// Cache and network settings for commands that fetch.
#[derive(Args, Debug, Clone)]
pub struct NetworkArgs {
    /// Directory of the on-disk tile cache.
    #[arg(long, default_value = DEFAULT_CACHE_ROOT, env = "TILEMAP_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Proxy pool endpoint returning one `host:port` per GET.
    ///
    /// Enables concurrent fetching.
    #[arg(long, env = "TILEMAP_PROXY_POOL")]
    pub proxy_pool: Option<String>,

    /// Maximum tiles in flight when a proxy pool is configured.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, env = "TILEMAP_CONCURRENCY")]
    pub concurrency: usize,

    /// Retries per tile after the first attempt.
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES, env = "TILEMAP_MAX_RETRIES")]
    pub max_retries: u32,

    /// Wait between attempts, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_RETRY_WAIT_MS, env = "TILEMAP_RETRY_WAIT_MS")]
    pub retry_wait_ms: u64,

    /// Per-request timeout, in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "TILEMAP_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// User-Agent header sent to providers.
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl NetworkArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        self.to_map_config().validate()
    }

    pub fn to_map_config(&self) -> TileMapConfig {
        TileMapConfig {
            cache_root: self.cache_dir.clone(),
            proxy_pool_endpoint: self.proxy_pool.clone(),
            retry: RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_wait_ms)),
            request_timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
            concurrency: NonZeroUsize::new(self.concurrency).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// Query area: bounding box, zoom and the box's coordinate system.
#[derive(Args, Debug, Clone)]
pub struct AreaArgs {
    /// Bounding box as west,south,east,north.
    #[arg(long, required = true, value_delimiter = ',', num_args = 1, allow_hyphen_values = true)]
    pub bbox: Vec<f64>,

    /// Zoom level, or `auto` to pick one from the box size.
    #[arg(long, default_value = "auto")]
    pub zoom: Zoom,

    /// Coordinate system of the bounding box and of the reported extent.
    #[arg(long, default_value = "wgs")]
    pub input_system: CoordinateSystem,

    /// Interpret the box, and report the extent, in web-Mercator meters.
    #[arg(long, default_value_t = false)]
    pub mercator: bool,
}

impl AreaArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.bbox.len() != 4 {
            return Err(format!(
                "bbox must have 4 values (west,south,east,north), got {}",
                self.bbox.len()
            ));
        }
        Ok(())
    }

    /// The boxes to query, split at the antimeridian if `west > east`.
    pub fn bounding_boxes(&self) -> Result<Vec<BoundingBox>, TileError> {
        let [west, south, east, north] = self.edges()?;
        if self.mercator {
            return Ok(vec![BoundingBox::from_web_mercator(west, south, east, north)?]);
        }
        BoundingBox::split_antimeridian(west, south, east, north)
    }

    /// The single box to query; antimeridian-crossing boxes are rejected.
    pub fn bounding_box(&self) -> Result<BoundingBox, TileError> {
        let [west, south, east, north] = self.edges()?;
        if self.mercator {
            BoundingBox::from_web_mercator(west, south, east, north)
        } else {
            BoundingBox::new(west, south, east, north)
        }
    }

    /// Coordinate system of the parsed boxes; web-Mercator input is WGS84.
    pub fn system(&self) -> CoordinateSystem {
        if self.mercator {
            CoordinateSystem::Standard
        } else {
            self.input_system
        }
    }

    fn edges(&self) -> Result<[f64; 4], TileError> {
        <[f64; 4]>::try_from(self.bbox.as_slice()).map_err(|_| TileError::MalformedBoundingBox {
            reason: format!("expected 4 edges, got {}", self.bbox.len()),
        })
    }
}

// =============================================================================
// Fetch Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct FetchConfig {
    #[command(flatten)]
    pub provider: ProviderArgs,

    #[command(flatten)]
    pub network: NetworkArgs,

    #[command(flatten)]
    pub area: AreaArgs,

    /// Output image path; the format follows the extension.
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,
}

impl FetchConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.network.validate()?;
        self.area.validate()?;
        if self.output.as_os_str().is_empty() {
            return Err("output path must not be empty".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Count Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CountConfig {
    #[command(flatten)]
    pub provider: ProviderArgs,

    #[command(flatten)]
    pub area: AreaArgs,
}

impl CountConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.area.validate()
    }
}

// =============================================================================
// Tile Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct TileConfig {
    #[command(flatten)]
    pub provider: ProviderArgs,

    #[command(flatten)]
    pub network: NetworkArgs,

    /// Native tile index as x,y,z.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, conflicts_with = "lnglat")]
    pub xyz: Option<Vec<i64>>,

    /// Point as lng,lat; requires --zoom.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, requires = "zoom")]
    pub lnglat: Option<Vec<f64>>,

    /// Zoom level for --lnglat.
    #[arg(long)]
    pub zoom: Option<u8>,

    /// Coordinate system of --lnglat.
    #[arg(long, default_value = "wgs")]
    pub input_system: CoordinateSystem,

    /// Output image path.
    #[arg(short, long, default_value = "tile.png")]
    pub output: PathBuf,
}

impl TileConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.network.validate()?;
        match (&self.xyz, &self.lnglat) {
            (Some(xyz), None) if xyz.len() == 3 && u8::try_from(xyz[2]).is_err() => {
                Err(format!("zoom must be between 0 and 255, got {}", xyz[2]))
            }
            (Some(xyz), None) if xyz.len() == 3 => Ok(()),
            (Some(xyz), None) => Err(format!("xyz must have 3 values, got {}", xyz.len())),
            (None, Some(p)) if p.len() == 2 && self.zoom.is_some() => Ok(()),
            (None, Some(p)) if p.len() != 2 => {
                Err(format!("lnglat must have 2 values, got {}", p.len()))
            }
            (None, Some(_)) => Err("lnglat requires --zoom".to_string()),
            _ => Err("exactly one of --xyz or --lnglat is required".to_string()),
        }
    }
}

// =============================================================================
// Providers Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ProvidersConfig {
    #[command(flatten)]
    pub provider: ProviderArgs,

    /// Print the catalog as JSON instead of a table.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

// =============================================================================
// Tests
// =============================================================================
