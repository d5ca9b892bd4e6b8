//! Frame conversion between geodetic and local NED coordinates.

use crate::models::{GeodeticPosition, LocalPosition};

// ==== Local tangent-plane conversion ====
// Latitude-aware meters-per-degree scaling around the home reference.

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Convert a global point to the local NED frame anchored at `home`.
///
/// North/east are metric offsets on the tangent plane at the home latitude;
/// `down` is the negated altitude difference.
pub fn global_to_local(point: &GeodeticPosition, home: &GeodeticPosition) -> LocalPosition {
    let north = (point.latitude - home.latitude) * meters_per_deg_lat(home.latitude);
    let east = (point.longitude - home.longitude) * meters_per_deg_lon(home.latitude);
    let down = -(point.altitude - home.altitude);
    LocalPosition { north, east, down }
}

/// Inverse of [`global_to_local`] for the same home reference.
pub fn local_to_global(local: &LocalPosition, home: &GeodeticPosition) -> GeodeticPosition {
    let latitude = home.latitude + local.north / meters_per_deg_lat(home.latitude).max(1e-9);
    let longitude = home.longitude + local.east / meters_per_deg_lon(home.latitude).max(1e-9);
    GeodeticPosition {
        longitude,
        latitude,
        altitude: home.altitude + local.altitude(),
    }
}
