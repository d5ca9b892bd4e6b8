//! Telemetry events and the latest-known vehicle state.

use planner_core::{GeodeticPosition, LocalPosition, LocalVelocity};
use serde::{Deserialize, Serialize};

/// One telemetry callback from the vehicle link, delivered in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TelemetryEvent {
    LocalPosition(LocalPosition),
    LocalVelocity(LocalVelocity),
    VehicleState { armed: bool, guided: bool },
    GlobalPosition(GeodeticPosition),
    GlobalHome(GeodeticPosition),
}

/// Which transition handler an event feeds. Global position and home
/// updates only refresh the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    LocalPosition,
    LocalVelocity,
    VehicleState,
}

impl TelemetryEvent {
    pub fn trigger(&self) -> Option<Trigger> {
        match self {
            Self::LocalPosition(_) => Some(Trigger::LocalPosition),
            Self::LocalVelocity(_) => Some(Trigger::LocalVelocity),
            Self::VehicleState { .. } => Some(Trigger::VehicleState),
            Self::GlobalPosition(_) | Self::GlobalHome(_) => None,
        }
    }
}

/// Most recent value of every telemetry stream.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Snapshot {
    pub local_position: LocalPosition,
    pub local_velocity: LocalVelocity,
    pub global_position: Option<GeodeticPosition>,
    pub global_home: Option<GeodeticPosition>,
    pub armed: bool,
    pub guided: bool,
}

impl Snapshot {
    pub fn apply(&mut self, event: &TelemetryEvent) {
        match *event {
            TelemetryEvent::LocalPosition(position) => self.local_position = position,
            TelemetryEvent::LocalVelocity(velocity) => self.local_velocity = velocity,
            TelemetryEvent::VehicleState { armed, guided } => {
                self.armed = armed;
                self.guided = guided;
            }
            TelemetryEvent::GlobalPosition(position) => self.global_position = Some(position),
            TelemetryEvent::GlobalHome(home) => self.global_home = Some(home),
        }
    }

    /// Height above home from the global streams, falling back to the
    /// local frame until both global values have been reported.
    pub fn height_above_home(&self) -> f64 {
        match (self.global_position, self.global_home) {
            (Some(position), Some(home)) => position.altitude - home.altitude,
            _ => self.local_position.altitude(),
        }
    }
}
