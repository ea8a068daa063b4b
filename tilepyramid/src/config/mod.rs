//! Configuration for tile maps and their transport.
//!
//! [`MapConfig`] groups the settings a host needs to build a
//! [`TileMap`](crate::map::TileMap): where tiles come from, how they are
//! fetched, and what happens to tiles that leave the view. It can be built
//! in code or loaded from `~/.tilepyramid/config.ini`.
//!
//! # Example
//!
//! ```
//! use tilepyramid::config::MapConfig;
//! use tilepyramid::map::EvictionPolicy;
//!
//! let config = MapConfig::new()
//!     .with_access_token("pk.test")
//!     .with_retain_tiles(128);
//!
//! assert_eq!(config.eviction_policy(), EvictionPolicy::RetainLoaded { capacity: 128 });
//! ```
//!
//! # File format
//!
//! ```ini
//! [source]
//! url_template = https://api.mapbox.com/v4/{source}/{z}/{x}/{y}.png?access_token={token}
//! default_source = mapbox.satellite
//! access_token = pk.xxx
//!
//! [http]
//! timeout = 30
//! user_agent = tilepyramid/0.1.0
//!
//! [cache]
//! retain_tiles = 0
//!
//! [map]
//! zoom = 3
//! ```

mod file;
mod parser;

pub use file::{config_directory, config_file_path, ConfigFileError};

use tokio::runtime::Handle;

use crate::coord::MAX_ZOOM;
use crate::map::EvictionPolicy;
use crate::provider::{
    HttpRequestProvider, ProviderError, UrlTemplateSource, DEFAULT_TIMEOUT_SECS,
    DEFAULT_USER_AGENT,
};
use crate::tile::TileKind;

/// Zoom level used when none is configured.
pub const DEFAULT_ZOOM: u8 = 3;

/// Settings for a tile map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapConfig {
    /// URL template; `None` picks the Mapbox preset for the tile kind.
    url_template: Option<String>,
    /// Source used when the map has none; `None` picks the preset's default.
    default_source: Option<String>,
    access_token: Option<String>,
    timeout_secs: u64,
    user_agent: String,
    /// Loaded tiles kept after leaving the view (0 = discard)
    retain_tiles: usize,
    zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            url_template: None,
            default_source: None,
            access_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retain_tiles: 0,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl MapConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the default path, falling back to defaults if missing.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = Some(template.into());
        self
    }

    pub fn with_default_source(mut self, source: impl Into<String>) -> Self {
        self.default_source = Some(source.into());
        self
    }

    /// Set the access token. An empty token clears it.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.access_token = (!token.is_empty()).then_some(token);
        self
    }

    /// Set the HTTP timeout in seconds. Default: 30.
    pub fn with_timeout_secs(mut self, timeout: u64) -> Self {
        self.timeout_secs = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Keep up to `count` loaded tiles for reuse after they leave the view.
    /// Zero discards them. Default: 0.
    pub fn with_retain_tiles(mut self, count: usize) -> Self {
        self.retain_tiles = count;
        self
    }

    /// Set the initial zoom level, clamped to the supported range.
    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom.min(MAX_ZOOM);
        self
    }

    pub fn url_template(&self) -> Option<&str> {
        self.url_template.as_deref()
    }

    pub fn default_source(&self) -> Option<&str> {
        self.default_source.as_deref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn retain_tiles(&self) -> usize {
        self.retain_tiles
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Build the URL resolver for tiles of `kind`.
    ///
    /// Starts from the Mapbox preset for the kind and applies any
    /// configured template and default source on top.
    pub fn tile_source(&self, kind: TileKind) -> UrlTemplateSource {
        let token = self.access_token.clone().unwrap_or_default();
        let mut source = match kind {
            TileKind::Raster => UrlTemplateSource::mapbox_raster(token),
            TileKind::Vector => UrlTemplateSource::mapbox_vector(token),
        };
        if let Some(template) = &self.url_template {
            source = source.with_template(template.as_str());
        }
        if let Some(default) = &self.default_source {
            source = source.with_default_source(default.as_str());
        }
        source
    }

    /// Build an HTTP provider with the configured timeout and user agent.
    pub fn http_provider(&self, runtime: Handle) -> Result<HttpRequestProvider, ProviderError> {
        HttpRequestProvider::with_settings(runtime, self.timeout_secs, &self.user_agent)
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy::from_capacity(self.retain_tiles)
    }
}
