//! Obstacle map loading.
//!
//! The file layout is the simulator's `colliders.csv`:
//!
//! ```text
//! lat0 37.792480, lon0 -122.397450
//! posX,posY,posZ,halfSizeX,halfSizeY,halfSizeZ
//! -310.2389,-439.2315,85.5,5,5,85.5
//! ...
//! ```
//!
//! The first line carries the reference coordinate pair used as home; every
//! row after the column header is one box obstacle in the local frame.

use crate::grid::GridOffset;
use crate::models::GeodeticPosition;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*lat0\s+(-?\d+(?:\.\d*)?)\s*,\s*lon0\s+(-?\d+(?:\.\d*)?)\s*$")
        .expect("static header pattern")
});

const ROW_FIELDS: usize = 6;

#[derive(Debug, Error)]
pub enum ObstacleMapError {
    #[error("failed to read obstacle map {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed obstacle map header: {0:?}")]
    Header(String),
    #[error("malformed obstacle row at line {line}: {message}")]
    Row { line: u64, message: String },
    #[error("obstacle map CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One box obstacle, centre and half extents in the local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub north: f64,
    pub east: f64,
    pub altitude: f64,
    pub half_north: f64,
    pub half_east: f64,
    pub half_altitude: f64,
}

impl Obstacle {
    /// Height of the obstacle's top above home.
    pub fn top(&self) -> f64 {
        self.altitude + self.half_altitude
    }
}

/// Bounding box of all obstacles on the ground plane plus the tallest top.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObstacleExtents {
    pub north_min: f64,
    pub north_max: f64,
    pub east_min: f64,
    pub east_max: f64,
    pub max_height: f64,
}

impl ObstacleExtents {
    /// Offset of a grid whose origin cell sits at the map's south-west corner.
    pub fn grid_offset(&self) -> GridOffset {
        GridOffset::new(self.north_min.floor() as i64, self.east_min.floor() as i64)
    }
}

/// Loaded obstacle data plus its reference coordinate pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObstacleMap {
    pub reference_latitude: f64,
    pub reference_longitude: f64,
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleMap {
    /// Load and validate an obstacle file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ObstacleMapError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ObstacleMapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::parse(file)?;
        tracing::info!(
            "Loaded {} obstacles from {} (lat0 {}, lon0 {})",
            map.obstacles.len(),
            path.display(),
            map.reference_latitude,
            map.reference_longitude
        );
        Ok(map)
    }

    /// Parse an obstacle file from any reader.
    pub fn parse<R: Read>(mut reader: R) -> Result<Self, ObstacleMapError> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|source| ObstacleMapError::Io {
                path: PathBuf::from("<reader>"),
                source,
            })?;

        let (header, body) = content.split_once('\n').unwrap_or((content.as_str(), ""));
        let (reference_latitude, reference_longitude) = parse_header(header)?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(body.as_bytes());

        let mut obstacles = Vec::new();
        for record in rdr.records() {
            let record = record?;
            // +1 for the reference line consumed before the CSV reader.
            let line = record.position().map(|pos| pos.line() + 1).unwrap_or(0);
            obstacles.push(parse_row(&record, line)?);
        }

        Ok(Self {
            reference_latitude,
            reference_longitude,
            obstacles,
        })
    }

    /// Global home implied by the file: (lon0, lat0, 0).
    pub fn home(&self) -> GeodeticPosition {
        GeodeticPosition::new(self.reference_longitude, self.reference_latitude, 0.0)
    }

    /// Ground-plane bounds of every obstacle footprint, `None` for an empty map.
    pub fn extents(&self) -> Option<ObstacleExtents> {
        let first = self.obstacles.first()?;
        let mut extents = ObstacleExtents {
            north_min: first.north - first.half_north,
            north_max: first.north + first.half_north,
            east_min: first.east - first.half_east,
            east_max: first.east + first.half_east,
            max_height: first.top(),
        };
        for obstacle in &self.obstacles[1..] {
            extents.north_min = extents.north_min.min(obstacle.north - obstacle.half_north);
            extents.north_max = extents.north_max.max(obstacle.north + obstacle.half_north);
            extents.east_min = extents.east_min.min(obstacle.east - obstacle.half_east);
            extents.east_max = extents.east_max.max(obstacle.east + obstacle.half_east);
            extents.max_height = extents.max_height.max(obstacle.top());
        }
        Some(extents)
    }
}

fn parse_header(line: &str) -> Result<(f64, f64), ObstacleMapError> {
    let header_error = || ObstacleMapError::Header(line.trim_end().to_string());
    let captures = HEADER_REGEX.captures(line.trim_end()).ok_or_else(header_error)?;
    let lat: f64 = captures[1].parse().map_err(|_| header_error())?;
    let lon: f64 = captures[2].parse().map_err(|_| header_error())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(header_error());
    }
    Ok((lat, lon))
}

fn parse_row(record: &csv::StringRecord, line: u64) -> Result<Obstacle, ObstacleMapError> {
    if record.len() != ROW_FIELDS {
        return Err(ObstacleMapError::Row {
            line,
            message: format!("expected {} fields, found {}", ROW_FIELDS, record.len()),
        });
    }
    let mut values = [0.0_f64; ROW_FIELDS];
    for (idx, field) in record.iter().enumerate() {
        values[idx] = field.parse().map_err(|_| ObstacleMapError::Row {
            line,
            message: format!("field {} is not a number: {:?}", idx + 1, field),
        })?;
        if !values[idx].is_finite() {
            return Err(ObstacleMapError::Row {
                line,
                message: format!("field {} is not finite", idx + 1),
            });
        }
    }
    Ok(Obstacle {
        north: values[0],
        east: values[1],
        altitude: values[2],
        half_north: values[3],
        half_east: values[4],
        half_altitude: values[5],
    })
}
