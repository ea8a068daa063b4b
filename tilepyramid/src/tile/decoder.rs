//! Decoding capability selected when a tile is constructed.

use std::fmt;
use std::str::FromStr;

use super::error::DecodeError;

/// Payload family a decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    /// Raster imagery (PNG, JPEG).
    Raster,
    /// Mapbox Vector Tile protobuf.
    Vector,
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileKind::Raster => write!(f, "raster"),
            TileKind::Vector => write!(f, "vector"),
        }
    }
}

impl FromStr for TileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raster" => Ok(TileKind::Raster),
            "vector" => Ok(TileKind::Vector),
            other => Err(format!("unknown tile kind '{}'", other)),
        }
    }
}

/// Turns fetched bytes into a parsed tile representation.
///
/// The tile map is generic over its decoder, so the decode step is
/// statically dispatched and the map itself never inspects payloads.
/// Decoding must be deterministic and free of side effects.
pub trait TileDecoder: Send + Sync + 'static {
    /// Parsed representation stored on a loaded tile.
    type Content: Send + 'static;

    /// Payload family, used to pick a matching URL template.
    fn kind(&self) -> TileKind;

    /// Parse a payload.
    fn decode(&self, data: &[u8]) -> Result<Self::Content, DecodeError>;
}
