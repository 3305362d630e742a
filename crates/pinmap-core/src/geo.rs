//! Great-circle distance and unit conversion.

use crate::types::Coordinate;

/// Mean Earth radius (IUGG) in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

pub const METERS_PER_MILE: f64 = 1_609.344;

#[must_use]
pub fn miles_to_meters(miles: f64) -> f64 {
    miles * METERS_PER_MILE
}

/// Haversine distance between `a` and `b` in meters.
///
/// NaN components propagate to a NaN result.
#[must_use]
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Clamp guards asin against h drifting just above 1.0 for antipodal points.
    2.0 * EARTH_RADIUS_M * h.sqrt().clamp(0.0, 1.0).asin()
}
