//! What part of the world the map covers.

use crate::coord::{GeoBounds, GeoCoordinate};

/// Area the map should hold tiles for.
///
/// A center covers exactly the tile containing that point at the current
/// zoom; bounds cover every tile they touch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Viewport {
    Bounds(GeoBounds),
    Center(GeoCoordinate),
}

impl Viewport {
    /// Geographic area to cover.
    pub fn bounds(&self) -> GeoBounds {
        match self {
            Viewport::Bounds(bounds) => *bounds,
            Viewport::Center(center) => GeoBounds::from_point(*center),
        }
    }

    pub fn center(&self) -> GeoCoordinate {
        match self {
            Viewport::Bounds(bounds) => bounds.center(),
            Viewport::Center(center) => *center,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_viewport_is_a_point() {
        let helsinki = GeoCoordinate::new(60.1632, 24.9377);
        let bounds = Viewport::Center(helsinki).bounds();
        assert_eq!(bounds.south_west, helsinki);
        assert_eq!(bounds.north_east, helsinki);
    }

    #[test]
    fn test_bounds_viewport_center() {
        let viewport = Viewport::Bounds(GeoBounds::from_edges(10.0, 20.0, 30.0, 40.0));
        let center = viewport.center();
        assert_eq!(center.latitude, 20.0);
        assert_eq!(center.longitude, 30.0);
    }
}
