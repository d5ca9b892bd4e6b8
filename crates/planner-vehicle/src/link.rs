//! Vehicle link contract and a channel-backed implementation.

use anyhow::Result;
use planner_core::{GeodeticPosition, Waypoint};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Commands the state machine issues to the vehicle.
///
/// Implementations own retries and connection faults; the state machine
/// logs a failed command and carries on.
pub trait VehicleLink {
    fn arm(&mut self) -> Result<()>;
    fn disarm(&mut self) -> Result<()>;
    fn take_control(&mut self) -> Result<()>;
    fn release_control(&mut self) -> Result<()>;
    fn set_home_position(&mut self, home: GeodeticPosition) -> Result<()>;
    /// Climb to an up-positive altitude above home.
    fn takeoff(&mut self, altitude: f64) -> Result<()>;
    fn land(&mut self) -> Result<()>;
    fn command_position(&mut self, north: f64, east: f64, altitude: f64, heading: f64) -> Result<()>;
    /// Deliver a finished plan for visualisation. Not flight-critical.
    fn send_waypoints(&mut self, waypoints: &[Waypoint]) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
}

/// Wire framing of one link call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleCommand {
    Arm,
    Disarm,
    TakeControl,
    ReleaseControl,
    SetHomePosition {
        longitude: f64,
        latitude: f64,
        altitude: f64,
    },
    Takeoff {
        altitude: f64,
    },
    Land,
    Position {
        north: f64,
        east: f64,
        altitude: f64,
        heading: f64,
    },
    /// Plan as an ordered list of `[north, east, altitude, heading]`
    Waypoints {
        waypoints: Vec<Waypoint>,
    },
    Stop,
}

impl VehicleCommand {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A [`VehicleLink`] that forwards every call as a [`VehicleCommand`] to
/// whatever task owns the actual connection.
#[derive(Debug, Clone)]
pub struct CommandChannel {
    tx: mpsc::UnboundedSender<VehicleCommand>,
}

impl CommandChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<VehicleCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, command: VehicleCommand) -> Result<()> {
        tracing::debug!("link command: {:?}", command);
        self.tx
            .send(command)
            .map_err(|err| anyhow::anyhow!("vehicle transport closed, dropped {:?}", err.0))
    }
}

impl VehicleLink for CommandChannel {
    fn arm(&mut self) -> Result<()> {
        self.send(VehicleCommand::Arm)
    }

    fn disarm(&mut self) -> Result<()> {
        self.send(VehicleCommand::Disarm)
    }

    fn take_control(&mut self) -> Result<()> {
        self.send(VehicleCommand::TakeControl)
    }

    fn release_control(&mut self) -> Result<()> {
        self.send(VehicleCommand::ReleaseControl)
    }

    fn set_home_position(&mut self, home: GeodeticPosition) -> Result<()> {
        self.send(VehicleCommand::SetHomePosition {
            longitude: home.longitude,
            latitude: home.latitude,
            altitude: home.altitude,
        })
    }

    fn takeoff(&mut self, altitude: f64) -> Result<()> {
        self.send(VehicleCommand::Takeoff { altitude })
    }

    fn land(&mut self) -> Result<()> {
        self.send(VehicleCommand::Land)
    }

    fn command_position(&mut self, north: f64, east: f64, altitude: f64, heading: f64) -> Result<()> {
        self.send(VehicleCommand::Position {
            north,
            east,
            altitude,
            heading,
        })
    }

    fn send_waypoints(&mut self, waypoints: &[Waypoint]) -> Result<()> {
        tracing::info!("Sending {} waypoints to simulator", waypoints.len());
        self.send(VehicleCommand::Waypoints {
            waypoints: waypoints.to_vec(),
        })
    }

    fn stop(&mut self) -> Result<()> {
        self.send(VehicleCommand::Stop)
    }
}
