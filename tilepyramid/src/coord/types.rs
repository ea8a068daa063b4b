//! Coordinate value types and constants.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -85.05112878;
/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.05112878;
/// Minimum longitude.
pub const MIN_LON: f64 = -180.0;
/// Maximum longitude.
pub const MAX_LON: f64 = 180.0;
/// Minimum zoom level.
pub const MIN_ZOOM: u8 = 0;
/// Maximum zoom level supported by the tile grid.
pub const MAX_ZOOM: u8 = 22;

/// Errors from coordinate validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid latitude: {0} (must be between -85.05112878 and 85.05112878)")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),

    #[error("Invalid zoom level: {0} (must be at most 22)")]
    InvalidZoom(u8),

    #[error("Tile {col}/{row} is outside the grid at zoom {zoom}")]
    OutOfGrid { zoom: u8, col: u32, row: u32 },
}

/// Canonical address of a tile in the Web Mercator pyramid.
///
/// Columns grow eastward from the antimeridian and rows grow southward from
/// the northern Mercator limit. Ordering is by zoom, then column, then row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId {
    zoom: u8,
    col: u32,
    row: u32,
}

impl TileId {
    /// Create a tile id, validating it against the grid at `zoom`.
    ///
    /// # Example
    ///
    /// ```
    /// use tilepyramid::coord::TileId;
    ///
    /// let id = TileId::new(3, 4, 2).unwrap();
    /// assert_eq!(id.to_string(), "3/4/2");
    /// assert!(TileId::new(3, 8, 0).is_err());
    /// ```
    pub fn new(zoom: u8, col: u32, row: u32) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let side = Self::tiles_per_side(zoom);
        if col >= side || row >= side {
            return Err(CoordError::OutOfGrid { zoom, col, row });
        }
        Ok(Self { zoom, col, row })
    }

    /// Construct without validation. Callers guarantee the grid invariant.
    pub(crate) fn new_unchecked(zoom: u8, col: u32, row: u32) -> Self {
        debug_assert!(zoom <= MAX_ZOOM);
        debug_assert!(col < Self::tiles_per_side(zoom) && row < Self::tiles_per_side(zoom));
        Self { zoom, col, row }
    }

    /// Zoom level.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Column (x).
    pub fn col(&self) -> u32 {
        self.col
    }

    /// Row (y).
    pub fn row(&self) -> u32 {
        self.row
    }

    /// Number of tiles along one edge of the grid at `zoom`.
    pub fn tiles_per_side(zoom: u8) -> u32 {
        1u32 << zoom.min(MAX_ZOOM)
    }

    /// The tile one level up that contains this one.
    pub fn parent(&self) -> Option<TileId> {
        if self.zoom == 0 {
            return None;
        }
        Some(Self::new_unchecked(self.zoom - 1, self.col / 2, self.row / 2))
    }

    /// The four tiles one level down, in row-major order.
    pub fn children(&self) -> Option<[TileId; 4]> {
        if self.zoom >= MAX_ZOOM {
            return None;
        }
        let zoom = self.zoom + 1;
        let (col, row) = (self.col * 2, self.row * 2);
        Some([
            Self::new_unchecked(zoom, col, row),
            Self::new_unchecked(zoom, col + 1, row),
            Self::new_unchecked(zoom, col, row + 1),
            Self::new_unchecked(zoom, col + 1, row + 1),
        ])
    }

    /// Bing-style quadkey for this tile. Empty at zoom 0.
    pub fn quadkey(&self) -> String {
        (1..=self.zoom)
            .rev()
            .map(|level| {
                let mask = 1u32 << (level - 1);
                let mut digit = b'0';
                if self.col & mask != 0 {
                    digit += 1;
                }
                if self.row & mask != 0 {
                    digit += 2;
                }
                digit as char
            })
            .collect()
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.col, self.row)
    }
}

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Create a coordinate from latitude and longitude in degrees.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for GeoCoordinate {
    /// Formats as `lon,lat` with five decimals, the order tile URLs and
    /// geocoding endpoints expect.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.longitude, self.latitude)
    }
}

/// A geographic bounding box.
///
/// `south_west.longitude > north_east.longitude` denotes a box that crosses
/// the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south_west: GeoCoordinate,
    pub north_east: GeoCoordinate,
}

impl GeoBounds {
    /// Create bounds from the south-west and north-east corners.
    pub fn new(south_west: GeoCoordinate, north_east: GeoCoordinate) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Create bounds from south, west, north and east edges.
    pub fn from_edges(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(
            GeoCoordinate::new(south, west),
            GeoCoordinate::new(north, east),
        )
    }

    /// Degenerate bounds around a single point.
    pub fn from_point(point: GeoCoordinate) -> Self {
        Self::new(point, point)
    }

    /// Bounds covering the whole Web Mercator square.
    pub fn world() -> Self {
        Self::from_edges(MIN_LAT, MIN_LON, MAX_LAT, MAX_LON)
    }

    pub fn south(&self) -> f64 {
        self.south_west.latitude
    }

    pub fn west(&self) -> f64 {
        self.south_west.longitude
    }

    pub fn north(&self) -> f64 {
        self.north_east.latitude
    }

    pub fn east(&self) -> f64 {
        self.north_east.longitude
    }

    /// True when the box wraps across the ±180° meridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.west() > self.east()
    }

    /// Center of the box, honouring antimeridian wrap.
    pub fn center(&self) -> GeoCoordinate {
        let latitude = (self.south() + self.north()) / 2.0;
        let mut longitude = if self.crosses_antimeridian() {
            (self.west() + self.east() + 360.0) / 2.0
        } else {
            (self.west() + self.east()) / 2.0
        };
        if longitude > MAX_LON {
            longitude -= 360.0;
        }
        GeoCoordinate::new(latitude, longitude)
    }
}
