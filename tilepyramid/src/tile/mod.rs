//! Map tiles and their fetch lifecycle
//!
//! A [`Tile`] owns one in-flight request at a time and turns the provider's
//! response into decoded content through a [`TileDecoder`]. Two decoders are
//! provided: [`RasterDecoder`] for PNG/JPEG imagery and [`VectorDecoder`] for
//! Mapbox Vector Tiles.

mod decoder;
mod error;
mod lifecycle;
mod raster;
mod vector;

pub use decoder::{TileDecoder, TileKind};
pub use error::{DecodeError, TileError};
pub use lifecycle::{
    completion_channel, Completion, CompletionReceiver, CompletionSender, RequestTicket, Tile,
    TileKey, TileState,
};
pub use raster::{RasterDecoder, RasterTile};
pub use vector::{VectorDecoder, VectorLayer, VectorTile};

pub(crate) use lifecycle::normalize_source;
