//! tilemap - fetch, cache and stitch map tiles.
//!
//! This binary wires the CLI to the library and reports results on stdout.
//! Logs go to stderr.

use std::process::ExitCode;

use clap::Parser;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tilemap::{
    config::{Cli, Command, CountConfig, FetchConfig, ProvidersConfig, TileConfig},
    TileCount, TileError, TileIndex, TileMap,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Fetch(config) => run_fetch(config).await,
        Command::Count(config) => run_count(config),
        Command::Tile(config) => run_tile(config).await,
        Command::Providers(config) => run_providers(config),
    }
}

// =============================================================================
// Fetch Command
// =============================================================================

async fn run_fetch(config: FetchConfig) -> ExitCode {
    init_logging(config.provider.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match fetch(&config).await {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn fetch(config: &FetchConfig) -> Result<serde_json::Value, TileError> {
    let provider = config.provider.resolve()?;
    let bbox = config.area.bounding_box()?;
    let map = TileMap::new(provider, &config.network.to_map_config())?;

    let raster = map
        .query(&bbox, config.area.zoom, config.area.system())
        .await?;
    raster.save(&config.output)?;

    info!(
        "Wrote {}x{} px at zoom {} to {}",
        raster.width(),
        raster.height(),
        raster.zoom,
        config.output.display()
    );

    let mut report = json!({
        "output": config.output,
        "width": raster.width(),
        "height": raster.height(),
        "zoom": raster.zoom,
        "extent": raster.extent,
        "attribution": map.provider().attribution(),
    });
    if config.area.mercator {
        let (left, bottom, right, top) = raster.extent.to_web_mercator();
        report["mercator_extent"] = json!([left, bottom, right, top]);
    }
    Ok(report)
}

// =============================================================================
// Count Command
// =============================================================================

fn run_count(config: CountConfig) -> ExitCode {
    init_logging(config.provider.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match count(&config) {
        Ok(counts) => {
            let total: u64 = counts.iter().map(|c| c.tiles).sum();
            println!("{}", json!({ "total": total, "boxes": counts }));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn count(config: &CountConfig) -> Result<Vec<TileCount>, TileError> {
    let provider = config.provider.resolve()?;
    // Counting never touches the network or the cache
    let map = TileMap::new(provider, &Default::default())?;

    config
        .area
        .bounding_boxes()?
        .iter()
        .map(|bbox| map.count_tiles(bbox, config.area.zoom, config.area.system()))
        .collect()
}

// =============================================================================
// Tile Command
// =============================================================================

async fn run_tile(config: TileConfig) -> ExitCode {
    init_logging(config.provider.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match tile(&config).await {
        Ok(index) => {
            println!("{}", json!({ "tile": index, "output": config.output }));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn tile(config: &TileConfig) -> Result<TileIndex, TileError> {
    let provider = config.provider.resolve()?;
    let map = TileMap::new(provider, &config.network.to_map_config())?;

    let tile = match (config.xyz.as_deref(), config.lnglat.as_deref(), config.zoom) {
        (Some(&[x, y, z]), _, _) => {
            // Out-of-range zooms are rejected by validate()
            let zoom = u8::try_from(z).unwrap_or(u8::MAX);
            map.fetch_tile_xyz(x, y, zoom).await?
        }
        (None, Some(&[lng, lat]), Some(zoom)) => {
            map.fetch_tile_lnglat(lng, lat, zoom, config.input_system)
                .await?
        }
        _ => {
            return Err(TileError::MalformedBoundingBox {
                reason: "tile requires --xyz x,y,z or --lnglat lng,lat with --zoom".to_string(),
            })
        }
    };

    tile.pixels
        .save(&config.output)
        .map_err(|e| TileError::OutputWriteFailure {
            path: config.output.clone(),
            message: e.to_string(),
        })?;
    Ok(tile.index)
}

// =============================================================================
// Providers Command
// =============================================================================

fn run_providers(config: ProvidersConfig) -> ExitCode {
    let catalog = match config.provider.catalog() {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.json {
        let providers: Vec<_> = catalog.iter().collect();
        match serde_json::to_string_pretty(&providers) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    println!("{:<24} {:<6} {:>8}  ATTRIBUTION", "NAME", "SYSTEM", "MAX ZOOM");
    for provider in catalog.iter() {
        println!(
            "{:<24} {:<6} {:>8}  {}",
            provider.name(),
            provider.system(),
            provider.max_zoom(),
            provider.attribution()
        );
    }
    ExitCode::SUCCESS
}

// =============================================================================
// Logging
// =============================================================================

fn init_logging(verbose: bool) {
    let env_filter = if verbose { "tilemap=debug" } else { "tilemap=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

