//! On-disk tile cache.
//!
//! Tiles are stored as the raw payload the provider served, one file per
//! tile:
//!
//! ```text
//! <root>/<provider name>/<zoom>/<x>/<y>.<image ext>
//! ```
//!
//! Presence of the file is the only hit signal. Entries never expire and are
//! never deleted by this crate; they are reused across calls and processes.
//!
//! Writes go to a temporary sibling file and are renamed into place, so a
//! concurrent reader sees either no entry or a complete one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;

use crate::error::TileError;
use crate::provider::Provider;

use super::index::TileIndex;

// =============================================================================
// Disk Cache
// =============================================================================

/// Tile cache rooted at one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskTileCache {
    root: PathBuf,
}

impl DiskTileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache location of `tile` for `provider`.
    pub fn path(&self, provider: &Provider, tile: TileIndex) -> PathBuf {
        let mut path = self.root.join(sanitize(provider.name()));
        path.push(tile.zoom.to_string());
        path.push(tile.x.to_string());
        path.push(format!("{}.{}", tile.y, provider.image_ext()));
        path
    }

    /// Read a cached payload, `None` on a miss.
    ///
    /// # Errors
    ///
    /// Returns `CacheReadFailure` if the entry exists but cannot be read.
    pub async fn read(
        &self,
        provider: &Provider,
        tile: TileIndex,
    ) -> Result<Option<Bytes>, TileError> {
        let path = self.path(provider, tile);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TileError::CacheReadFailure {
                provider: provider.name().to_string(),
                tile,
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Persist a payload, creating parent directories as needed.
    ///
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// Returns `CacheWriteFailure` on any filesystem error.
    pub async fn write(
        &self,
        provider: &Provider,
        tile: TileIndex,
        payload: &[u8],
    ) -> Result<PathBuf, TileError> {
        let path = self.path(provider, tile);
        let failure = |path: &Path, e: std::io::Error| TileError::CacheWriteFailure {
            provider: provider.name().to_string(),
            tile,
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| failure(parent, e))?;
        }

        let tmp = temp_path(&path);
        if let Err(e) = fs::write(&tmp, payload).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(failure(&tmp, e));
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(failure(&path, e));
        }

        Ok(path)
    }

    /// Whether an entry exists for `tile`.
    pub async fn contains(&self, provider: &Provider, tile: TileIndex) -> bool {
        fs::try_exists(self.path(provider, tile))
            .await
            .unwrap_or(false)
    }
}

/// Keep provider names from escaping their directory.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{:08x}.tmp", rand::random::<u32>()));
    path.with_file_name(name)
}
