//! Mission-level errors.

use planner_core::{ObstacleMapError, PlanError, RegistryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("destination registry: {0}")]
    Destination(#[from] RegistryError),
    #[error("obstacle map unusable: {0}")]
    ObstacleMap(#[from] ObstacleMapError),
    #[error("planning failed: {0}")]
    Planning(#[from] PlanError),
    #[error("telemetry source closed before the mission ended")]
    LinkClosed,
}

impl MissionError {
    /// Configuration/data errors stop a mission before it arms.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Destination(_) | Self::ObstacleMap(_))
    }
}
