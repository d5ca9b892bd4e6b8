//! Named mission destinations.

use crate::models::Destination;
use rand::Rng;
use std::collections::HashSet;
use thiserror::Error;

const DEFAULT_ALT: f64 = 5.0;
const ROOF_ALT: f64 = 136.0;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("destination registry must contain at least one entry")]
    Empty,
    #[error("duplicate destination name: {0}")]
    Duplicate(String),
    #[error("unknown destination: {0}")]
    Unknown(String),
}

/// Immutable set of destinations keyed by unique name.
#[derive(Debug, Clone)]
pub struct DestinationRegistry {
    entries: Vec<Destination>,
}

impl DestinationRegistry {
    /// Build a registry, rejecting empty input and repeated names.
    pub fn new(entries: Vec<Destination>) -> Result<Self, RegistryError> {
        if entries.is_empty() {
            return Err(RegistryError::Empty);
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.name.as_str()) {
                return Err(RegistryError::Duplicate(entry.name.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Exact lookup by name.
    pub fn get(&self, name: &str) -> Option<&Destination> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Lookup that reports an unknown name as an error.
    pub fn require(&self, name: &str) -> Result<&Destination, RegistryError> {
        self.get(name)
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))
    }

    /// Uniformly pick one destination using the thread RNG.
    pub fn get_random(&self) -> &Destination {
        self.get_random_with(&mut rand::rng())
    }

    /// Uniformly pick one destination using the given RNG.
    pub fn get_random_with<R: Rng>(&self, rng: &mut R) -> &Destination {
        let idx = rng.random_range(0..self.entries.len());
        let destination = &self.entries[idx];
        tracing::info!("Destination: {}", destination.name);
        destination
    }

    pub fn iter(&self) -> impl Iterator<Item = &Destination> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DestinationRegistry {
    /// Landmarks around the simulator's downtown San Francisco map.
    fn default() -> Self {
        Self {
            entries: vec![
                Destination::new("Mission Spear", -122.39314, 37.79270, DEFAULT_ALT),
                Destination::new("Washington Street", -122.40131, 37.79666, DEFAULT_ALT),
                Destination::new("California Street", -122.39624, 37.79391, DEFAULT_ALT),
                Destination::new("Sacramento Front", -122.39931, 37.79471, DEFAULT_ALT),
                Destination::new("Roof of building", -122.39876, 37.79553, ROOF_ALT),
            ],
        }
    }
}
