//! Tile transport and URL resolution
//!
//! This module provides the seams between the tile map and the outside
//! world: the [`RequestProvider`] transport trait with its cancellable
//! handles, and the [`TileSource`] resolver that turns a tile id plus a named
//! data source into a URL.
//!
//! # Example
//!
//! ```ignore
//! use tilepyramid::provider::{HttpRequestProvider, UrlTemplateSource};
//!
//! let provider = HttpRequestProvider::new(runtime.handle().clone())?;
//! let source = UrlTemplateSource::mapbox_raster("pk.your-token");
//! ```

mod http;
mod queued;
mod source;
mod types;

pub use http::{HttpRequestProvider, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use queued::QueuedRequestProvider;
pub use source::{
    TileSource, UrlTemplateSource, MAPBOX_DEFAULT_RASTER_SOURCE, MAPBOX_DEFAULT_VECTOR_SOURCE,
    MAPBOX_RASTER_TEMPLATE, MAPBOX_VECTOR_TEMPLATE,
};
pub use types::{CancellableRequest, ProviderError, RequestProvider, Response, ResponseCallback};
