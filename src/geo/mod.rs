use crate::error::AppError;
use crate::models::profile::Coordinate;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Great-circle distance between two coordinates via the haversine formula.
///
/// Both inputs must be in valid range; out-of-range values fail with
/// `InvalidCoordinate` instead of producing a silently wrong distance.
pub fn distance_km(a: &Coordinate, b: &Coordinate) -> Result<f64, AppError> {
    a.validate()?;
    b.validate()?;

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lon = (delta_lon / 2.0).sin();

    let h = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lon * sin_lon;
    let central_angle = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    Ok(EARTH_RADIUS_KM * central_angle)
}

/// Whether two coordinates are strictly closer than `threshold_km`.
/// A pair exactly at the threshold is NOT nearby.
pub fn is_nearby(a: &Coordinate, b: &Coordinate, threshold_km: f64) -> Result<bool, AppError> {
    Ok(distance_km(a, b)? < threshold_km)
}
