//! Flight phases and the transition table.
//!
//! [`transition`] is a pure function of the current phase, the event kind
//! that fired, the latest telemetry and a read-only view of the mission. It
//! decides the next phase and the single action to issue; applying that
//! action is the state machine's job.

use crate::telemetry::{Snapshot, Trigger};
use planner_core::TargetPosition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fraction of the target altitude that completes a takeoff.
pub const TAKEOFF_ALTITUDE_RATIO: f64 = 0.95;
/// Horizontal distance to the target that counts as arrival.
pub const WAYPOINT_HORIZONTAL_RADIUS_M: f64 = 1.0;
/// Full 3D distance required before advancing to the next waypoint.
pub const WAYPOINT_ARRIVAL_RADIUS_M: f64 = 7.0;
/// Horizontal speed below which a hovering vehicle may land.
pub const LANDING_MAX_SPEED_MPS: f64 = 1.0;
/// Global height above home that counts as touchdown.
pub const TOUCHDOWN_HEIGHT_M: f64 = 0.1;
/// Local vertical offset that counts as touchdown.
pub const TOUCHDOWN_LOCAL_DOWN_M: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightPhase {
    Manual,
    Arming,
    Planning,
    Takeoff,
    Waypoint,
    Landing,
    Disarming,
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Manual => "MANUAL",
            Self::Arming => "ARMING",
            Self::Planning => "PLANNING",
            Self::Takeoff => "TAKEOFF",
            Self::Waypoint => "WAYPOINT",
            Self::Landing => "LANDING",
            Self::Disarming => "DISARMING",
        };
        f.write_str(name)
    }
}

/// Side effect attached to a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Take control, then arm.
    Arm,
    /// Run the plan orchestrator.
    Plan,
    /// Climb to the given up-positive altitude.
    Takeoff(f64),
    /// Pop the queue head and command it.
    NextWaypoint,
    Land,
    /// Disarm, then release control.
    Disarm,
    /// Stop the link and end the mission.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub to: FlightPhase,
    pub action: Action,
}

impl Transition {
    fn new(to: FlightPhase, action: Action) -> Self {
        Self { to, action }
    }
}

/// Mission state the guards read but never write.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MissionView {
    pub in_mission: bool,
    /// A plan was produced for the current PLANNING entry.
    pub plan_ready: bool,
    pub target: TargetPosition,
    pub queued_waypoints: usize,
}

/// Next phase and action, or `None` when no guard holds.
pub fn transition(
    phase: FlightPhase,
    trigger: Trigger,
    snapshot: &Snapshot,
    mission: &MissionView,
) -> Option<Transition> {
    match (trigger, phase) {
        (Trigger::VehicleState, _) if !mission.in_mission => None,
        (Trigger::VehicleState, FlightPhase::Manual) => {
            Some(Transition::new(FlightPhase::Arming, Action::Arm))
        }
        (Trigger::VehicleState, FlightPhase::Arming) if snapshot.armed => {
            Some(Transition::new(FlightPhase::Planning, Action::Plan))
        }
        (Trigger::VehicleState, FlightPhase::Planning) if mission.plan_ready => Some(
            Transition::new(FlightPhase::Takeoff, Action::Takeoff(mission.target.altitude)),
        ),
        (Trigger::VehicleState, FlightPhase::Disarming) if !snapshot.armed && !snapshot.guided => {
            Some(Transition::new(FlightPhase::Manual, Action::Stop))
        }
        (Trigger::LocalPosition, FlightPhase::Takeoff) => takeoff_complete(snapshot, mission),
        (Trigger::LocalPosition, FlightPhase::Waypoint) => waypoint_reached(snapshot, mission),
        (Trigger::LocalVelocity, FlightPhase::Landing) => touchdown(snapshot),
        _ => None,
    }
}

fn takeoff_complete(snapshot: &Snapshot, mission: &MissionView) -> Option<Transition> {
    let altitude = snapshot.local_position.altitude();
    if altitude < TAKEOFF_ALTITUDE_RATIO * mission.target.altitude {
        return None;
    }
    if mission.queued_waypoints > 0 {
        Some(Transition::new(FlightPhase::Waypoint, Action::NextWaypoint))
    } else {
        // Nothing to fly: the vehicle is already at its goal.
        Some(Transition::new(FlightPhase::Landing, Action::Land))
    }
}

fn waypoint_reached(snapshot: &Snapshot, mission: &MissionView) -> Option<Transition> {
    let position = &snapshot.local_position;
    // Coarse horizontal gate first; the 3D check only runs once close.
    if mission.target.horizontal_distance(position) >= WAYPOINT_HORIZONTAL_RADIUS_M {
        return None;
    }
    if mission.queued_waypoints > 0 {
        (mission.target.distance(position) < WAYPOINT_ARRIVAL_RADIUS_M)
            .then(|| Transition::new(FlightPhase::Waypoint, Action::NextWaypoint))
    } else {
        (snapshot.local_velocity.horizontal_speed() < LANDING_MAX_SPEED_MPS)
            .then(|| Transition::new(FlightPhase::Landing, Action::Land))
    }
}

fn touchdown(snapshot: &Snapshot) -> Option<Transition> {
    let landed = snapshot.height_above_home() < TOUCHDOWN_HEIGHT_M
        && snapshot.local_position.down.abs() < TOUCHDOWN_LOCAL_DOWN_M;
    landed.then(|| Transition::new(FlightPhase::Disarming, Action::Disarm))
}
