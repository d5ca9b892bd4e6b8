pub mod grid;
pub mod models;
pub mod obstacles;
pub mod planner;
pub mod refine;
pub mod registry;
pub mod spatial;

pub use grid::{Edge, GraphNode, Grid, GridOffset, GridPoint, NavGraph, NavigableMap};
pub use models::{
    Destination, GeodeticPosition, LocalPosition, LocalVelocity, TargetPosition, Waypoint,
};
pub use obstacles::{Obstacle, ObstacleExtents, ObstacleMap, ObstacleMapError};
pub use planner::{
    assign_headings, euclidean_heuristic, Heuristic, MapBuilder, PathSearch, Plan, PlanError,
    PlanOrchestrator, PlanRequest, PlannerConfig, SearchError, SearchPath,
};
pub use refine::{line_of_sight_clear, simplify_path, smooth_altitude_gradient};
pub use registry::{DestinationRegistry, RegistryError};
pub use spatial::{global_to_local, local_to_global};
