//! Query orchestration.
//!
//! [`TileMap`] drives one query end to end:
//!
//! ```text
//! bbox (caller system)
//!   │  convert to provider system
//!   ▼
//! resolve zoom ──▶ enumerate tiles ──▶ fan-out fetch ──▶ merge
//!                                                          │
//!                                  extent back to caller ◀─┘
//! ```

mod config;
mod tile_map;

pub use config::{TileMapConfig, DEFAULT_CACHE_ROOT};
pub use tile_map::{TileCount, TileMap};
