//! Argument types shared across commands.

use clap::Args;
use tilepyramid::coord::{GeoBounds, GeoCoordinate, MAX_ZOOM};
use tilepyramid::map::Viewport;

use crate::error::CliError;

/// Which part of the map to cover.
#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    /// Bounding box as SOUTH,WEST,NORTH,EAST in degrees
    #[arg(long, value_parser = parse_bounds, allow_hyphen_values = true, conflicts_with = "center")]
    pub bounds: Option<GeoBounds>,

    /// Center point as LAT,LON in degrees (covers a single tile)
    #[arg(long, value_parser = parse_center, allow_hyphen_values = true)]
    pub center: Option<GeoCoordinate>,

    /// Zoom level (0-22)
    #[arg(long, short, value_parser = clap::value_parser!(u8).range(0..=(MAX_ZOOM as i64)))]
    pub zoom: Option<u8>,
}

impl ViewArgs {
    /// The requested viewport.
    pub fn viewport(&self) -> Result<Viewport, CliError> {
        match (self.bounds, self.center) {
            (Some(bounds), None) => Ok(Viewport::Bounds(bounds)),
            (None, Some(center)) => Ok(Viewport::Center(center)),
            (Some(_), Some(_)) => Err(CliError::InvalidArgument(
                "use either --bounds or --center, not both".to_string(),
            )),
            (None, None) => Err(CliError::InvalidArgument(
                "one of --bounds or --center is required".to_string(),
            )),
        }
    }
}

/// Parse `SOUTH,WEST,NORTH,EAST`.
pub fn parse_bounds(s: &str) -> Result<GeoBounds, String> {
    let values = parse_numbers(s)?;
    let &[south, west, north, east] = values.as_slice() else {
        return Err(format!(
            "expected SOUTH,WEST,NORTH,EAST, got {} value(s)",
            values.len()
        ));
    };
    if south > north {
        return Err(format!("south ({}) is north of north ({})", south, north));
    }
    for lat in [south, north] {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude {} out of range", lat));
        }
    }
    for lon in [west, east] {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(format!("longitude {} out of range", lon));
        }
    }
    Ok(GeoBounds::from_edges(south, west, north, east))
}

/// Parse `LAT,LON`.
pub fn parse_center(s: &str) -> Result<GeoCoordinate, String> {
    let values = parse_numbers(s)?;
    let &[lat, lon] = values.as_slice() else {
        return Err(format!("expected LAT,LON, got {} value(s)", values.len()));
    };
    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {} out of range", lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(format!("longitude {} out of range", lon));
    }
    Ok(GeoCoordinate::new(lat, lon))
}

fn parse_numbers(s: &str) -> Result<Vec<f64>, String> {
    s.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", part))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bounds() {
        let bounds = parse_bounds("59.9, 24.5, 60.4, 25.3").unwrap();
        assert_eq!(bounds.south(), 59.9);
        assert_eq!(bounds.west(), 24.5);
        assert_eq!(bounds.north(), 60.4);
        assert_eq!(bounds.east(), 25.3);
    }

    #[test]
    fn test_parse_bounds_across_antimeridian() {
        let bounds = parse_bounds("-20,170,-10,-170").unwrap();
        assert!(bounds.crosses_antimeridian());
    }

    #[test]
    fn test_parse_bounds_rejects_bad_input() {
        assert!(parse_bounds("1,2,3").is_err());
        assert!(parse_bounds("10,0,5,1").is_err());
        assert!(parse_bounds("0,0,95,1").is_err());
        assert!(parse_bounds("a,b,c,d").is_err());
    }

    #[test]
    fn test_parse_center() {
        let center = parse_center("60.1632,24.9377").unwrap();
        assert_eq!(center.latitude, 60.1632);
        assert_eq!(center.longitude, 24.9377);
        assert!(parse_center("60.1").is_err());
        assert!(parse_center("0,200").is_err());
    }

    #[test]
    fn test_viewport_requires_one_area() {
        let args = ViewArgs {
            bounds: None,
            center: None,
            zoom: Some(3),
        };
        assert!(args.viewport().is_err());

        let args = ViewArgs {
            bounds: None,
            center: Some(GeoCoordinate::new(0.0, 0.0)),
            zoom: None,
        };
        assert!(matches!(args.viewport(), Ok(Viewport::Center(_))));
    }
}
