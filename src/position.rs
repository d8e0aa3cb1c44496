use geo::{Bearing, Distance, Geodesic, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// geo points are (x = lon, y = lat)
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// Parses "LAT,LON" (whitespace around either number is allowed).
pub fn parse_coordinate(s: &str) -> Option<Coordinate> {
    let (lat, lon) = s.split_once(',')?;
    let c = Coordinate::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?);
    if c.is_valid() { Some(c) } else { None }
}

/// Geodesic distance in meters and initial bearing in degrees [0, 360).
pub fn distance_and_bearing(from: Coordinate, to: Coordinate) -> (f64, f64) {
    let start = from.to_point();
    let end = to.to_point();
    let distance = Geodesic.distance(start, end);
    let raw_bearing = Geodesic.bearing(start, end);
    let bearing = (raw_bearing + 360.0) % 360.0;
    (distance, bearing)
}

/// < 1000m: show as whole meters
/// >= 1000m: show as km with 2 decimal places
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 { format!("{:.0} m", meters) } else { format!("{:.2} km", meters / 1000.0) }
}

/// Format bearing for display (compass direction)
pub fn format_bearing(degrees: f64) -> String {
    let directions = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let idx = ((degrees + 22.5) / 45.0) as usize % 8;
    format!("{:.0}° {}", degrees, directions[idx])
}

/// Get distance and bearing string between two points
/// Returns None if either point is invalid
pub fn get_distance_bearing_string(from: Coordinate, to: Coordinate) -> Option<String> {
    if !from.is_valid() || !to.is_valid() {
        return None;
    }

    let (distance, bearing) = distance_and_bearing(from, to);
    Some(format!("{} @ {}", format_distance(distance), format_bearing(bearing)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("40.0,-74.0"), Some(Coordinate::new(40.0, -74.0)));
        assert_eq!(parse_coordinate(" 37.5 , -122.25 "), Some(Coordinate::new(37.5, -122.25)));
        assert_eq!(parse_coordinate("91.0,0.0"), None);
        assert_eq!(parse_coordinate("40.0"), None);
        assert_eq!(parse_coordinate("north,east"), None);
    }

    #[test]
    fn test_distance_due_north() {
        let from = Coordinate::new(0.0, 0.0);
        let to = Coordinate::new(1.0, 0.0);
        let (dist, bearing) = distance_and_bearing(from, to);
        // One degree of latitude at the equator is ~110.57 km on WGS84
        assert!((dist - 110_574.0).abs() < 50.0, "unexpected distance {}", dist);
        assert!(bearing.abs() < 1e-6 || (bearing - 360.0).abs() < 1e-6);
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_distance(42.4), "42 m");
        assert_eq!(format_distance(1234.0), "1.23 km");
        assert_eq!(format_bearing(0.0), "0° N");
        assert_eq!(format_bearing(90.0), "90° E");
        assert_eq!(format_bearing(350.0), "350° N");
    }

    #[test]
    fn test_distance_bearing_string_rejects_out_of_range() {
        let ok = Coordinate::new(40.0, -74.0);
        let bad = Coordinate::new(120.0, -74.0);
        assert!(get_distance_bearing_string(ok, bad).is_none());
        let same = get_distance_bearing_string(ok, ok).unwrap_or_default();
        assert!(same.starts_with("0 m @ "), "got {}", same);
    }
}
