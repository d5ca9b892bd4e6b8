//! Operator tools for the motion planner.
//!
//! Helpers behind the `planner` binary: registry listings, obstacle map
//! summaries and frame conversions, kept here so they can be tested
//! without spawning the binary.

use planner_core::{
    global_to_local, Destination, DestinationRegistry, GeodeticPosition, GridOffset,
    LocalPosition, ObstacleExtents, ObstacleMap,
};
use serde::Serialize;
use std::fmt;

/// What `planner inspect` reports about an obstacle file.
#[derive(Debug, Clone, Serialize)]
pub struct MapSummary {
    pub reference_latitude: f64,
    pub reference_longitude: f64,
    pub obstacle_count: usize,
    pub extents: Option<ObstacleExtents>,
    pub grid_offset: Option<GridOffset>,
}

impl MapSummary {
    pub fn new(map: &ObstacleMap) -> Self {
        let extents = map.extents();
        Self {
            reference_latitude: map.reference_latitude,
            reference_longitude: map.reference_longitude,
            obstacle_count: map.obstacles.len(),
            extents,
            grid_offset: extents.map(|e| e.grid_offset()),
        }
    }
}

impl fmt::Display for MapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Reference: lat0 {}, lon0 {}",
            self.reference_latitude, self.reference_longitude
        )?;
        writeln!(f, "Obstacles: {}", self.obstacle_count)?;
        if let (Some(extents), Some(offset)) = (self.extents, self.grid_offset) {
            writeln!(
                f,
                "North: {:.1} .. {:.1} m",
                extents.north_min, extents.north_max
            )?;
            writeln!(f, "East:  {:.1} .. {:.1} m", extents.east_min, extents.east_max)?;
            writeln!(f, "Tallest obstacle: {:.1} m", extents.max_height)?;
            write!(f, "North offset = {}, east offset = {}", offset.north, offset.east)?;
        }
        Ok(())
    }
}

/// A global point expressed in the local frame of some home.
#[derive(Debug, Clone, Serialize)]
pub struct LocalConversion {
    pub name: Option<String>,
    pub global: GeodeticPosition,
    pub home: GeodeticPosition,
    pub local: LocalPosition,
    /// Grid indices when a grid offset is known
    pub grid: Option<(i64, i64)>,
}

impl LocalConversion {
    pub fn new(global: GeodeticPosition, home: GeodeticPosition, offset: Option<GridOffset>) -> Self {
        let local = global_to_local(&global, &home);
        Self {
            name: None,
            global,
            home,
            local,
            grid: offset.map(|o| o.to_grid(local.north, local.east)),
        }
    }

    pub fn for_destination(destination: &Destination, map: &ObstacleMap) -> Self {
        let offset = map.extents().map(|e| e.grid_offset());
        Self {
            name: Some(destination.name.clone()),
            ..Self::new(destination.position(), map.home(), offset)
        }
    }
}

impl fmt::Display for LocalConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            writeln!(f, "{name}")?;
        }
        write!(
            f,
            "north {:.2} m, east {:.2} m, altitude {:.2} m",
            self.local.north,
            self.local.east,
            self.local.altitude()
        )?;
        if let Some((north, east)) = self.grid {
            write!(f, " (grid {north}, {east})")?;
        }
        Ok(())
    }
}

/// One line per destination: name, longitude, latitude, altitude.
pub fn destination_lines(registry: &DestinationRegistry) -> Vec<String> {
    let width = registry.iter().map(|d| d.name.len()).max().unwrap_or(0);
    registry
        .iter()
        .map(|d| {
            format!(
                "{:<width$}  {:>11.5}  {:>9.5}  {:>6.1} m",
                d.name,
                d.longitude,
                d.latitude,
                d.altitude,
                width = width
            )
        })
        .collect()
}
