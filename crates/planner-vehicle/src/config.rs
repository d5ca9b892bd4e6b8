//! Mission configuration from environment.

use planner_core::PlannerConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Which destination a mission flies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationChoice {
    Named(String),
    Random,
}

impl DestinationChoice {
    /// `random` (any case) selects at random; anything else is a name.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("random") {
            Self::Random
        } else {
            Self::Named(value.to_string())
        }
    }
}

impl Default for DestinationChoice {
    fn default() -> Self {
        Self::Named("Washington Street".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionConfig {
    pub destination: DestinationChoice,
    pub planner: PlannerConfig,
    pub colliders_path: PathBuf,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            destination: DestinationChoice::default(),
            planner: PlannerConfig::default(),
            colliders_path: PathBuf::from("colliders.csv"),
        }
    }
}

impl MissionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            destination: lookup("PLANNER_DESTINATION")
                .map(|s| DestinationChoice::parse(s.trim()))
                .unwrap_or(defaults.destination),
            planner: PlannerConfig {
                target_altitude_m: lookup("PLANNER_TARGET_ALTITUDE")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.planner.target_altitude_m),
                safety_distance_m: lookup("PLANNER_SAFETY_DISTANCE")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.planner.safety_distance_m),
            },
            colliders_path: lookup("PLANNER_COLLIDERS")
                .map(PathBuf::from)
                .unwrap_or(defaults.colliders_path),
        }
    }
}
