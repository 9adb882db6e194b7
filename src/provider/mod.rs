//! Tile providers.
//!
//! A [`Provider`] is an immutable catalog record: URL template, subdomain
//! alphabet, coordinate system, zoom limit and attribution. Requests never
//! mutate a provider; per-request variations are expressed as a copy with
//! overridden fields ([`Provider::with_param`] and friends).
//!
//! # Components
//!
//! - [`Provider`]: one tile source
//! - [`Catalog`]: named providers, built-in or loaded from JSON
//! - [`SubdomainSelector`]: picks a subdomain per request
//! - [`render_url`]: template substitution

mod catalog;
mod subdomain;
mod template;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::coord::CoordinateSystem;

pub use catalog::{builtin, Catalog, DEFAULT_PROVIDER};
pub use subdomain::{FixedSubdomain, RandomSubdomain, SubdomainSelector};
pub use template::render_url;

/// Default zoom limit for catalog entries that omit one.
pub const DEFAULT_MAX_ZOOM: u8 = 22;

/// Default cache-file extension for catalog entries that omit one.
pub const DEFAULT_IMAGE_EXT: &str = "png";

fn default_max_zoom() -> u8 {
    DEFAULT_MAX_ZOOM
}

fn default_image_ext() -> String {
    DEFAULT_IMAGE_EXT.to_string()
}

// =============================================================================
// Provider
// =============================================================================

/// One tile source.
///
/// The URL template uses `{x}`, `{y}` and `{z}` (required), `{s}` for the
/// subdomain, `{r}` for an optional resolution suffix, and any name in
/// [`Provider::params`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    name: String,
    url: String,
    #[serde(default)]
    subdomains: String,
    #[serde(default, alias = "sys")]
    system: CoordinateSystem,
    #[serde(default = "default_max_zoom")]
    max_zoom: u8,
    #[serde(default)]
    attribution: String,
    #[serde(default = "default_image_ext")]
    image_ext: String,
    #[serde(default)]
    params: BTreeMap<String, String>,
}

impl Provider {
    /// A provider with no subdomains, no attribution, and default limits.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        system: CoordinateSystem,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            subdomains: String::new(),
            system,
            max_zoom: DEFAULT_MAX_ZOOM,
            attribution: String::new(),
            image_ext: default_image_ext(),
            params: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Subdomain alphabet; each character is one candidate for `{s}`.
    pub fn subdomains(&self) -> &str {
        &self.subdomains
    }

    pub fn system(&self) -> CoordinateSystem {
        self.system
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    pub fn attribution(&self) -> &str {
        &self.attribution
    }

    /// Extension of cache files, without the dot.
    pub fn image_ext(&self) -> &str {
        &self.image_ext
    }

    /// Extra template parameters substituted verbatim.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn with_subdomains(mut self, subdomains: impl Into<String>) -> Self {
        self.subdomains = subdomains.into();
        self
    }

    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = attribution.into();
        self
    }

    pub fn with_image_ext(mut self, image_ext: impl Into<String>) -> Self {
        self.image_ext = image_ext.into();
        self
    }

    /// Copy with one extra template parameter set or replaced.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Copy under a different name, so its cache lives in its own directory.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
