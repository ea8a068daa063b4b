//! Tile source URL resolution.
//!
//! A [`TileSource`] maps a tile id and an optional named data source to the
//! URL that serves it. [`UrlTemplateSource`] covers the usual XYZ and quadkey
//! endpoints through a placeholder template:
//!
//! | Placeholder | Value |
//! |---|---|
//! | `{source}` | named source, or the configured default |
//! | `{z}` `{x}` `{y}` | zoom, column, row |
//! | `{quadkey}` | Bing-style quadkey |
//! | `{token}` | access token, empty if none |

use crate::coord::TileId;

/// Mapbox raster endpoint, served as PNG.
pub const MAPBOX_RASTER_TEMPLATE: &str =
    "https://api.mapbox.com/v4/{source}/{z}/{x}/{y}.png?access_token={token}";

/// Mapbox vector endpoint, served as gzipped protobuf.
pub const MAPBOX_VECTOR_TEMPLATE: &str =
    "https://api.mapbox.com/v4/{source}/{z}/{x}/{y}.vector.pbf?access_token={token}";

/// Default Mapbox raster source.
pub const MAPBOX_DEFAULT_RASTER_SOURCE: &str = "mapbox.satellite";

/// Default Mapbox vector source.
pub const MAPBOX_DEFAULT_VECTOR_SOURCE: &str = "mapbox.mapbox-streets-v7";

/// Resolves the URL for a tile under a named source.
///
/// Must be pure: the same `(id, source)` always yields the same URL. A
/// `None` or empty source selects the implementation's default.
pub trait TileSource: Send + Sync {
    fn resolve_url(&self, id: TileId, source: Option<&str>) -> String;
}

impl<F> TileSource for F
where
    F: Fn(TileId, Option<&str>) -> String + Send + Sync,
{
    fn resolve_url(&self, id: TileId, source: Option<&str>) -> String {
        self(id, source)
    }
}

/// Template-driven [`TileSource`].
///
/// # Example
///
/// ```
/// use tilepyramid::coord::TileId;
/// use tilepyramid::provider::{TileSource, UrlTemplateSource};
///
/// let source = UrlTemplateSource::new("https://tiles.example.com/{source}/{z}/{x}/{y}.png", "base");
/// let id = TileId::new(2, 1, 3).unwrap();
///
/// assert_eq!(source.resolve_url(id, None), "https://tiles.example.com/base/2/1/3.png");
/// assert_eq!(source.resolve_url(id, Some("terrain")), "https://tiles.example.com/terrain/2/1/3.png");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplateSource {
    template: String,
    default_source: String,
    access_token: Option<String>,
}

impl UrlTemplateSource {
    /// Creates a source from a URL template and the default source name.
    pub fn new(template: impl Into<String>, default_source: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            default_source: default_source.into(),
            access_token: None,
        }
    }

    /// Mapbox raster tiles (`.png`), defaulting to satellite imagery.
    pub fn mapbox_raster(access_token: impl Into<String>) -> Self {
        Self::new(MAPBOX_RASTER_TEMPLATE, MAPBOX_DEFAULT_RASTER_SOURCE)
            .with_access_token(access_token)
    }

    /// Mapbox vector tiles (`.vector.pbf`), defaulting to streets.
    pub fn mapbox_vector(access_token: impl Into<String>) -> Self {
        Self::new(MAPBOX_VECTOR_TEMPLATE, MAPBOX_DEFAULT_VECTOR_SOURCE)
            .with_access_token(access_token)
    }

    /// Set the access token substituted for `{token}`.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.access_token = (!token.is_empty()).then_some(token);
        self
    }

    /// Replace the URL template.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Replace the default source name.
    pub fn with_default_source(mut self, source: impl Into<String>) -> Self {
        self.default_source = source.into();
        self
    }

    /// The URL template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The source used when none is given.
    pub fn default_source(&self) -> &str {
        &self.default_source
    }

    /// Resolve a requested source name, falling back to the default.
    pub fn source_name<'a>(&'a self, source: Option<&'a str>) -> &'a str {
        match source {
            Some(name) if !name.is_empty() => name,
            _ => &self.default_source,
        }
    }
}

impl TileSource for UrlTemplateSource {
    fn resolve_url(&self, id: TileId, source: Option<&str>) -> String {
        self.template
            .replace("{source}", self.source_name(source))
            .replace("{z}", &id.zoom().to_string())
            .replace("{x}", &id.col().to_string())
            .replace("{y}", &id.row().to_string())
            .replace("{quadkey}", &id.quadkey())
            .replace("{token}", self.access_token.as_deref().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helsinki() -> TileId {
        TileId::new(13, 4663, 2371).unwrap()
    }

    #[test]
    fn test_mapbox_raster_default_source() {
        let source = UrlTemplateSource::mapbox_raster("pk.test");
        assert_eq!(
            source.resolve_url(helsinki(), None),
            "https://api.mapbox.com/v4/mapbox.satellite/13/4663/2371.png?access_token=pk.test"
        );
    }

    #[test]
    fn test_empty_source_uses_default() {
        let source = UrlTemplateSource::mapbox_raster("pk.test");
        assert_eq!(
            source.resolve_url(helsinki(), Some("")),
            source.resolve_url(helsinki(), None)
        );
    }

    #[test]
    fn test_named_source_overrides_default() {
        let source = UrlTemplateSource::mapbox_raster("pk.test");
        let url = source.resolve_url(helsinki(), Some("mapbox.terrain-rgb"));
        assert!(url.starts_with("https://api.mapbox.com/v4/mapbox.terrain-rgb/13/4663/2371.png"));
    }

    #[test]
    fn test_mapbox_vector_url() {
        let source = UrlTemplateSource::mapbox_vector("pk.test");
        let url = source.resolve_url(TileId::new(3, 1, 2).unwrap(), None);
        assert_eq!(
            url,
            "https://api.mapbox.com/v4/mapbox.mapbox-streets-v7/3/1/2.vector.pbf?access_token=pk.test"
        );
    }

    #[test]
    fn test_quadkey_template() {
        let source = UrlTemplateSource::new("https://ecn.t0.tiles.example.net/a{quadkey}.jpeg", "aerial");
        let url = source.resolve_url(TileId::new(3, 3, 5).unwrap(), None);
        assert_eq!(url, "https://ecn.t0.tiles.example.net/a213.jpeg");
    }

    #[test]
    fn test_missing_token_is_empty() {
        let source = UrlTemplateSource::new("https://t.example/{z}/{x}/{y}?k={token}", "base")
            .with_access_token("");
        let url = source.resolve_url(TileId::new(0, 0, 0).unwrap(), None);
        assert_eq!(url, "https://t.example/0/0/0?k=");
    }

    #[test]
    fn test_closure_source() {
        let source = |id: TileId, name: Option<&str>| format!("{}@{}", id, name.unwrap_or("default"));
        assert_eq!(source.resolve_url(TileId::new(1, 0, 1).unwrap(), None), "1/0/1@default");
        assert_eq!(source.resolve_url(TileId::new(1, 0, 1).unwrap(), Some("x")), "1/0/1@x");
    }
}
