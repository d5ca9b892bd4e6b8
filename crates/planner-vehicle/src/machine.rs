//! Flight-phase state machine.
//!
//! Owns the phase, the commanded target and the waypoint queue. Events are
//! handled one at a time to completion; only this type talks to the link.

use crate::config::DestinationChoice;
use crate::error::MissionError;
use crate::link::VehicleLink;
use crate::phase::{transition, Action, FlightPhase, MissionView, Transition};
use crate::telemetry::{Snapshot, TelemetryEvent};
use planner_core::{
    Destination, DestinationRegistry, MapBuilder, ObstacleMap, PathSearch, PlanError,
    PlanOrchestrator, PlanRequest, TargetPosition, Waypoint,
};
use std::collections::VecDeque;

pub struct FlightMachine<L, M, S> {
    link: L,
    planner: PlanOrchestrator<M, S>,
    obstacles: ObstacleMap,
    destination: Destination,
    phase: FlightPhase,
    snapshot: Snapshot,
    target: TargetPosition,
    waypoints: VecDeque<Waypoint>,
    in_mission: bool,
    plan_ready: bool,
    waypoints_flown: usize,
    history: Vec<FlightPhase>,
}

impl<L: VehicleLink, M: MapBuilder, S: PathSearch> FlightMachine<L, M, S> {
    /// Resolve the destination and start in MANUAL with a mission pending.
    ///
    /// An unknown destination name fails here, before any transition.
    pub fn new(
        link: L,
        planner: PlanOrchestrator<M, S>,
        obstacles: ObstacleMap,
        registry: &DestinationRegistry,
        destination: &DestinationChoice,
    ) -> Result<Self, MissionError> {
        let destination = match destination {
            DestinationChoice::Named(name) => registry.require(name)?.clone(),
            DestinationChoice::Random => registry.get_random().clone(),
        };
        tracing::info!("Mission destination: {}", destination.name);

        Ok(Self {
            link,
            planner,
            obstacles,
            destination,
            phase: FlightPhase::Manual,
            snapshot: Snapshot::default(),
            target: TargetPosition::default(),
            waypoints: VecDeque::new(),
            in_mission: true,
            plan_ready: false,
            waypoints_flown: 0,
            history: vec![FlightPhase::Manual],
        })
    }

    /// Record the event, then fire at most one transition.
    pub fn handle(&mut self, event: TelemetryEvent) -> Result<(), MissionError> {
        self.snapshot.apply(&event);
        let Some(trigger) = event.trigger() else {
            return Ok(());
        };
        match transition(self.phase, trigger, &self.snapshot, &self.view()) {
            Some(next) => self.apply(next),
            None => Ok(()),
        }
    }

    fn view(&self) -> MissionView {
        MissionView {
            in_mission: self.in_mission,
            plan_ready: self.plan_ready,
            target: self.target,
            queued_waypoints: self.waypoints.len(),
        }
    }

    fn apply(&mut self, next: Transition) -> Result<(), MissionError> {
        tracing::info!("{} -> {} transition", self.phase, next.to);
        self.phase = next.to;
        self.history.push(next.to);

        match next.action {
            Action::Arm => {
                self.command("take_control", |link| link.take_control());
                self.command("arm", |link| link.arm());
            }
            Action::Plan => self.plan_path()?,
            Action::Takeoff(altitude) => {
                self.command("takeoff", |link| link.takeoff(altitude));
            }
            Action::NextWaypoint => {
                if let Some(waypoint) = self.waypoints.pop_front() {
                    self.target = TargetPosition::from(waypoint);
                    self.waypoints_flown += 1;
                    tracing::info!("target position {:?}", self.target);
                    let target = self.target;
                    self.command("command_position", |link| {
                        link.command_position(target.north, target.east, target.altitude, target.heading)
                    });
                }
            }
            Action::Land => self.command("land", |link| link.land()),
            Action::Disarm => {
                self.command("disarm", |link| link.disarm());
                self.command("release_control", |link| link.release_control());
            }
            Action::Stop => {
                self.command("stop", |link| link.stop());
                self.in_mission = false;
            }
        }
        Ok(())
    }

    /// Runs once per PLANNING entry. On failure the phase stays PLANNING
    /// and the mission flag drops, so no takeoff follows.
    fn plan_path(&mut self) -> Result<(), MissionError> {
        self.plan_ready = false;
        self.target = self
            .target
            .with_altitude(self.planner.config().target_altitude_m);

        let home = self.obstacles.home();
        tracing::info!("Lat: {}, Lon: {}", home.latitude, home.longitude);
        self.command("set_home_position", |link| link.set_home_position(home));
        self.snapshot.global_home = Some(home);

        let result = match self.snapshot.global_position {
            Some(current) => self.planner.plan(&PlanRequest {
                current,
                home,
                destination: &self.destination,
                obstacles: &self.obstacles,
            }),
            None => Err(PlanError::MissingTelemetry("global position")),
        };

        match result {
            Ok(plan) => {
                self.command("send_waypoints", |link| link.send_waypoints(&plan.waypoints));
                self.waypoints = plan.waypoints.into();
                self.plan_ready = true;
                Ok(())
            }
            Err(err) => {
                tracing::error!("Planning to {} failed: {}", self.destination.name, err);
                self.in_mission = false;
                Err(err.into())
            }
        }
    }

    /// Issue one link command. Failures belong to the link layer; they are
    /// logged and never alter the phase logic.
    fn command(&mut self, name: &str, call: impl FnOnce(&mut L) -> anyhow::Result<()>) {
        if let Err(err) = call(&mut self.link) {
            tracing::warn!("vehicle command {} failed: {:#}", name, err);
        }
    }

    /// Halt the vehicle link after a fatal error or shutdown.
    pub fn abort(&mut self) {
        tracing::warn!("Aborting mission in {}", self.phase);
        self.command("stop", |link| link.stop());
        self.in_mission = false;
    }

    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    pub fn target(&self) -> TargetPosition {
        self.target
    }

    pub fn remaining_waypoints(&self) -> &VecDeque<Waypoint> {
        &self.waypoints
    }

    pub fn in_mission(&self) -> bool {
        self.in_mission
    }

    /// Every phase entered, starting with the initial MANUAL.
    pub fn history(&self) -> &[FlightPhase] {
        &self.history
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn waypoints_flown(&self) -> usize {
        self.waypoints_flown
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}
