//! Provider catalogs.
//!
//! The built-in catalog carries the sources the crate is tested against.
//! Additional catalogs are JSON arrays of [`Provider`] records and override
//! built-in entries of the same name.

use std::collections::BTreeMap;
use std::path::Path;

use crate::coord::CoordinateSystem;
use crate::error::TileError;
use crate::tile::MAX_SUPPORTED_ZOOM;

use super::Provider;

/// Provider used when none is named.
pub const DEFAULT_PROVIDER: &str = "Amap.Satellite";

/// Named, read-only collection of providers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    providers: BTreeMap<String, Provider>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one entry, keyed by its name.
    pub fn insert(&mut self, provider: Provider) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Result<&Provider, TileError> {
        self.providers
            .get(name)
            .ok_or_else(|| TileError::UnknownProvider(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Provider> {
        self.providers.values()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Parse a JSON array of providers.
    pub fn from_json_str(json: &str) -> Result<Self, TileError> {
        let entries: Vec<Provider> =
            serde_json::from_str(json).map_err(|e| TileError::Catalog(e.to_string()))?;

        let mut catalog = Self::new();
        for provider in entries {
            if provider.max_zoom() > MAX_SUPPORTED_ZOOM {
                return Err(TileError::Catalog(format!(
                    "provider {} declares max_zoom {}, above the supported {}",
                    provider.name(),
                    provider.max_zoom(),
                    MAX_SUPPORTED_ZOOM
                )));
            }
            catalog.insert(provider);
        }
        Ok(catalog)
    }

    /// Read a JSON catalog from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TileError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| TileError::Catalog(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Entries of `other` replace same-named entries of `self`.
    pub fn merge(mut self, other: Catalog) -> Self {
        self.providers.extend(other.providers);
        self
    }
}

/// The built-in providers.
pub fn builtin() -> Catalog {
    let mut catalog = Catalog::new();

    catalog.insert(
        Provider::new(
            "OpenStreetMap.Mapnik",
            "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            CoordinateSystem::Standard,
        )
        .with_subdomains("abc")
        .with_max_zoom(18)
        .with_attribution("(C) OpenStreetMap contributors"),
    );

    for (name, style) in [("Amap.Satellite", 6), ("Amap.Normal", 8)] {
        catalog.insert(
            Provider::new(
                name,
                format!("http://webst0{{s}}.is.autonavi.com/appmaptile?style={style}&x={{x}}&y={{y}}&z={{z}}"),
                CoordinateSystem::Gcj,
            )
            .with_subdomains("1234")
            .with_max_zoom(18)
            .with_attribution("(C) AutoNavi"),
        );
    }

    catalog.insert(
        Provider::new(
            "Baidu.Satellite",
            "https://maponline{s}.bdimg.com/starpic/?qt=satepc&u=x={x};y={y};z={z};v=009;type=sate",
            CoordinateSystem::Bd,
        )
        .with_subdomains("0123")
        .with_max_zoom(19)
        .with_attribution("(C) Baidu contributors"),
    );

    catalog.insert(
        Provider::new(
            "Baidu.Tile",
            "https://mapsv{s}.bdimg.com/tile/?qt=tile&styles=pl&x={x}&y={y}&z={z}",
            CoordinateSystem::Bd,
        )
        .with_subdomains("01")
        .with_max_zoom(19)
        .with_attribution("(C) Baidu contributors"),
    );

    // lyr: m roads, t terrain, p labelled terrain, s satellite,
    // y labelled satellite, h labels only
    catalog.insert(
        Provider::new(
            "Google.Base",
            "http://mt{s}.google.cn/vt/lyrs={lyr}@258000000&hl=zh-CN&gl=CN&src=app&s=Ga&x={x}&y={y}&z={z}",
            CoordinateSystem::Standard,
        )
        .with_subdomains("0123")
        .with_max_zoom(19)
        .with_attribution("(C) Google contributors")
        .with_param("lyr", "m"),
    );

    catalog
}
