//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile coordinates, and computes the set of tiles covering
//! a bounding box.

mod types;

pub use types::{
    CoordError, GeoBounds, GeoCoordinate, TileId, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
    MIN_ZOOM,
};

use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::ops::RangeInclusive;

/// Converts geographic coordinates to a tile id.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 22)
///
/// # Returns
///
/// A `Result` containing the tile id or an error if inputs are invalid.
#[inline]
pub fn to_tile_id(lat: f64, lon: f64, zoom: u8) -> Result<TileId, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let (col, row) = project(GeoCoordinate::new(lat, lon), zoom);
    Ok(TileId::new_unchecked(zoom, col, row))
}

/// Converts a tile id back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileId) -> (f64, f64) {
    corner_to_lat_lon(tile.col(), tile.row(), tile.zoom())
}

/// Geographic extent of a tile.
pub fn tile_bounds(tile: &TileId) -> GeoBounds {
    let (north, west) = corner_to_lat_lon(tile.col(), tile.row(), tile.zoom());
    let (south, east) = corner_to_lat_lon(tile.col() + 1, tile.row() + 1, tile.zoom());
    GeoBounds::from_edges(south, west, north, east)
}

/// Computes the tiles covering `bounds` at `zoom`.
///
/// Corners are projected with the spherical Mercator transform, floored and
/// clamped to the grid, and the inclusive column and row spans between them
/// are expanded. A box whose west edge lies east of its east edge crosses
/// the antimeridian and covers both ends of the column range. Zoom levels
/// above [`MAX_ZOOM`] are clamped.
///
/// # Example
///
/// ```
/// use tilepyramid::coord::{tile_range, GeoBounds};
///
/// assert_eq!(tile_range(&GeoBounds::world(), 3).len(), 64);
/// ```
pub fn tile_range(bounds: &GeoBounds, zoom: u8) -> BTreeSet<TileId> {
    let zoom = zoom.min(MAX_ZOOM);
    let last = TileId::tiles_per_side(zoom) - 1;

    let west = wrap_longitude(bounds.west());
    let east = wrap_longitude(bounds.east());
    let (west_col, south_row) = project(GeoCoordinate::new(bounds.south(), west), zoom);
    let (east_col, north_row) = project(GeoCoordinate::new(bounds.north(), east), zoom);

    let rows = north_row.min(south_row)..=north_row.max(south_row);
    let columns: Vec<RangeInclusive<u32>> = if west > east {
        vec![west_col..=last, 0..=east_col]
    } else {
        vec![west_col.min(east_col)..=west_col.max(east_col)]
    };

    columns
        .into_iter()
        .flat_map(|cols| {
            let rows = rows.clone();
            cols.flat_map(move |col| {
                rows.clone()
                    .map(move |row| TileId::new_unchecked(zoom, col, row))
            })
        })
        .collect()
}

/// Projects a coordinate onto the tile grid, clamping to valid indices.
fn project(coord: GeoCoordinate, zoom: u8) -> (u32, u32) {
    let side = TileId::tiles_per_side(zoom);
    let n = side as f64;

    let lon = wrap_longitude(coord.longitude);
    let lat = coord.latitude.clamp(MIN_LAT, MAX_LAT);

    let x = (lon + 180.0) / 360.0 * n;

    // Web Mercator forward transform
    let lat_rad = lat * PI / 180.0;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;

    (clamp_index(x, side), clamp_index(y, side))
}

fn clamp_index(value: f64, side: u32) -> u32 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    (value.floor() as u64).min(u64::from(side) - 1) as u32
}

/// Brings a longitude into [-180, 180], leaving the edges themselves alone.
fn wrap_longitude(lon: f64) -> f64 {
    if (MIN_LON..=MAX_LON).contains(&lon) || !lon.is_finite() {
        return lon;
    }
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

fn corner_to_lat_lon(col: u32, row: u32, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);

    let lon = col as f64 / n * 360.0 - 180.0;

    // Inverse Web Mercator
    let y = row as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}
