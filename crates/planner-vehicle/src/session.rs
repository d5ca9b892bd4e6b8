//! Mission session: feeds telemetry to the state machine until the mission
//! ends, the source closes or shutdown is requested.

use crate::config::MissionConfig;
use crate::error::MissionError;
use crate::link::VehicleLink;
use crate::machine::FlightMachine;
use crate::phase::FlightPhase;
use crate::telemetry::TelemetryEvent;
use chrono::{DateTime, Utc};
use planner_core::{DestinationRegistry, MapBuilder, ObstacleMap, PathSearch, PlanOrchestrator};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tracing::Instrument;

/// Summary of one mission run.
#[derive(Debug, Clone, Serialize)]
pub struct MissionReport {
    pub destination: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub phases: Vec<FlightPhase>,
    pub waypoints_flown: usize,
    /// Landed, disarmed and back in MANUAL.
    pub completed: bool,
}

pub struct VehicleSession<L, M, S> {
    machine: FlightMachine<L, M, S>,
}

impl<L: VehicleLink, M: MapBuilder, S: PathSearch> VehicleSession<L, M, S> {
    pub fn new(machine: FlightMachine<L, M, S>) -> Self {
        Self { machine }
    }

    /// Load the obstacle file, resolve the destination and build the
    /// machine. Nothing reaches the link if any of that fails.
    pub fn start(
        config: &MissionConfig,
        registry: &DestinationRegistry,
        link: L,
        map_builder: M,
        search: S,
    ) -> Result<Self, MissionError> {
        let obstacles = ObstacleMap::load(&config.colliders_path)?;
        let planner = PlanOrchestrator::new(map_builder, search, config.planner.clone());
        let machine = FlightMachine::new(link, planner, obstacles, registry, &config.destination)?;
        tracing::info!(
            "Mission ready: {} via {}",
            machine.destination().name,
            config.colliders_path.display()
        );
        Ok(Self::new(machine))
    }

    pub fn machine(&self) -> &FlightMachine<L, M, S> {
        &self.machine
    }

    pub async fn run(
        &mut self,
        events: mpsc::Receiver<TelemetryEvent>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<MissionReport, MissionError> {
        let span = tracing::info_span!("mission", destination = %self.machine.destination().name);
        self.run_inner(events, shutdown).instrument(span).await
    }

    async fn run_inner(
        &mut self,
        mut events: mpsc::Receiver<TelemetryEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<MissionReport, MissionError> {
        let started_at = Utc::now();
        tracing::info!("starting connection");

        // A dropped sender only disables the shutdown arm.
        let mut shutdown_open = true;

        let outcome = loop {
            tokio::select! {
                signal = shutdown.recv(), if shutdown_open => match signal {
                    Ok(()) | Err(RecvError::Lagged(_)) => {
                        tracing::info!("Mission session shutting down");
                        if self.machine.in_mission() {
                            self.machine.abort();
                        }
                        break Ok(());
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("Shutdown channel closed, running until the mission ends");
                        shutdown_open = false;
                    }
                },
                event = events.recv() => {
                    let Some(event) = event else {
                        break Err(MissionError::LinkClosed);
                    };
                    if let Err(err) = self.machine.handle(event) {
                        break Err(err);
                    }
                    if !self.machine.in_mission() {
                        break Ok(());
                    }
                }
            }
        };

        if let Err(err) = outcome {
            tracing::error!("Mission failed: {}", err);
            self.machine.abort();
            return Err(err);
        }

        let report = MissionReport {
            destination: self.machine.destination().name.clone(),
            started_at,
            finished_at: Utc::now(),
            phases: self.machine.history().to_vec(),
            waypoints_flown: self.machine.waypoints_flown(),
            completed: self.completed(),
        };
        tracing::info!(
            "Mission finished: completed={}, {} waypoints flown",
            report.completed,
            report.waypoints_flown
        );
        Ok(report)
    }

    fn completed(&self) -> bool {
        self.machine.phase() == FlightPhase::Manual
            && self.machine.history().contains(&FlightPhase::Disarming)
    }
}
