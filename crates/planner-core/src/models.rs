//! Core data models shared by the planner and the vehicle side.
//!
//! Altitudes are up-positive above home everywhere except in
//! [`LocalPosition`] and [`LocalVelocity`], which keep the NED
//! (down-positive) layout the vehicle link reports.

use serde::{Deserialize, Serialize};

/// A point in the global (geodetic) frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPosition {
    pub longitude: f64,
    pub latitude: f64,
    /// Altitude above the reference, up-positive
    pub altitude: f64,
}

impl GeodeticPosition {
    pub fn new(longitude: f64, latitude: f64, altitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            altitude,
        }
    }
}

/// A point in the local NED frame, relative to the vehicle home.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalPosition {
    pub north: f64,
    pub east: f64,
    /// Down-positive, as reported by the vehicle link
    pub down: f64,
}

impl LocalPosition {
    pub fn new(north: f64, east: f64, down: f64) -> Self {
        Self { north, east, down }
    }

    /// Height above home, up-positive.
    pub fn altitude(&self) -> f64 {
        -self.down
    }
}

/// Local NED velocity in m/s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalVelocity {
    pub north: f64,
    pub east: f64,
    pub down: f64,
}

impl LocalVelocity {
    pub fn new(north: f64, east: f64, down: f64) -> Self {
        Self { north, east, down }
    }

    pub fn horizontal_speed(&self) -> f64 {
        self.north.hypot(self.east)
    }
}

/// A directed waypoint the low-level controller can track.
///
/// Serialized as a `[north, east, altitude, heading]` array so a finished
/// plan encodes as an ordered list of 4-tuples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Waypoint {
    pub north: f64,
    pub east: f64,
    /// Up-positive
    pub altitude: f64,
    /// Radians, 0 = north, π/2 = east
    pub heading: f64,
}

impl Waypoint {
    pub fn new(north: f64, east: f64, altitude: f64, heading: f64) -> Self {
        Self {
            north,
            east,
            altitude,
            heading,
        }
    }

    /// Bearing from `self` to `next` in radians.
    pub fn bearing_to(&self, next: &Waypoint) -> f64 {
        (next.east - self.east).atan2(next.north - self.north)
    }
}

impl From<[f64; 4]> for Waypoint {
    fn from(value: [f64; 4]) -> Self {
        Self::new(value[0], value[1], value[2], value[3])
    }
}

impl From<Waypoint> for [f64; 4] {
    fn from(value: Waypoint) -> Self {
        [value.north, value.east, value.altitude, value.heading]
    }
}

/// The currently commanded setpoint.
///
/// Transitions replace the whole value rather than editing it in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetPosition {
    pub north: f64,
    pub east: f64,
    /// Up-positive
    pub altitude: f64,
    pub heading: f64,
}

impl TargetPosition {
    /// Same setpoint with a new altitude.
    pub fn with_altitude(self, altitude: f64) -> Self {
        Self { altitude, ..self }
    }

    /// Horizontal distance from the setpoint to a reported position.
    pub fn horizontal_distance(&self, position: &LocalPosition) -> f64 {
        (self.north - position.north).hypot(self.east - position.east)
    }

    /// Full 3D distance, with the reported position flipped to up-positive.
    pub fn distance(&self, position: &LocalPosition) -> f64 {
        let dz = self.altitude - position.altitude();
        (self.horizontal_distance(position).powi(2) + dz * dz).sqrt()
    }
}

impl From<Waypoint> for TargetPosition {
    fn from(wp: Waypoint) -> Self {
        Self {
            north: wp.north,
            east: wp.east,
            altitude: wp.altitude,
            heading: wp.heading,
        }
    }
}

/// A named location the vehicle can be sent to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    /// Target altitude above home at the destination, up-positive
    pub altitude: f64,
}

impl Destination {
    pub fn new(name: impl Into<String>, longitude: f64, latitude: f64, altitude: f64) -> Self {
        Self {
            name: name.into(),
            longitude,
            latitude,
            altitude,
        }
    }

    pub fn position(&self) -> GeodeticPosition {
        GeodeticPosition::new(self.longitude, self.latitude, self.altitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waypoint_serializes_as_four_tuple() {
        let waypoints = vec![
            Waypoint::new(1.0, 2.0, 5.0, 0.0),
            Waypoint::new(3.0, 4.0, 6.0, 0.5),
        ];
        let json = serde_json::to_string(&waypoints).unwrap();
        assert_eq!(json, "[[1.0,2.0,5.0,0.0],[3.0,4.0,6.0,0.5]]");

        let decoded: Vec<Waypoint> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, waypoints);
    }

    #[test]
    fn local_altitude_flips_down_axis() {
        let position = LocalPosition::new(0.0, 0.0, -4.0);
        assert_eq!(position.altitude(), 4.0);
    }

    #[test]
    fn target_distance_uses_up_positive_altitude() {
        let target = TargetPosition {
            north: 3.0,
            east: 0.0,
            altitude: 5.0,
            heading: 0.0,
        };
        // Vehicle hovering 5 m up (down = -5) right under the target horizontally.
        let position = LocalPosition::new(3.0, 4.0, -5.0);
        assert!((target.horizontal_distance(&position) - 4.0).abs() < 1e-9);
        assert!((target.distance(&position) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn bearing_points_east() {
        let a = Waypoint::new(0.0, 0.0, 5.0, 0.0);
        let b = Waypoint::new(0.0, 10.0, 5.0, 0.0);
        assert!((a.bearing_to(&b) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }
}
