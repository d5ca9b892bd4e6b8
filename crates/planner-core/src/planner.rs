//! Plan orchestration: geographic goal in, directed waypoints out.
//!
//! The pipeline stitches together frame conversion, the injected map
//! builder and graph search, nearest-node approximation, altitude
//! smoothing, a final exact hop to the true goal, pruning, and heading
//! assignment. Map discretisation and the search algorithm itself are
//! supplied by the caller through [`MapBuilder`] and [`PathSearch`].

use crate::grid::{GridPoint, NavGraph, NavigableMap};
use crate::models::{Destination, GeodeticPosition, Waypoint};
use crate::obstacles::ObstacleMap;
use crate::refine::{line_of_sight_clear, simplify_path, smooth_altitude_gradient};
use crate::spatial::global_to_local;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Planning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Cruise/takeoff altitude above home in metres
    pub target_altitude_m: f64,
    /// Horizontal clearance kept from mapped obstacles in metres
    pub safety_distance_m: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            target_altitude_m: 5.0,
            safety_distance_m: 5.0,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchError {
    #[error("no path from {start:?} to {goal:?}")]
    Unreachable { start: GridPoint, goal: GridPoint },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("map builder failed: {0}")]
    MapBuilder(String),
    #[error("map builder produced no graph edges")]
    NoEdges,
    #[error("navigable graph has no nodes")]
    EmptyGraph,
    #[error("missing telemetry for planning: {0}")]
    MissingTelemetry(&'static str),
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Admissible distance estimate between two graph-space points.
pub type Heuristic = fn(&GridPoint, &GridPoint) -> f64;

/// Straight-line horizontal distance.
pub fn euclidean_heuristic(a: &GridPoint, b: &GridPoint) -> f64 {
    a.horizontal_distance(b)
}

/// Discretises obstacle data into a grid plus graph edges at one altitude.
pub trait MapBuilder {
    fn build(
        &self,
        obstacles: &ObstacleMap,
        altitude: f64,
        clearance: f64,
    ) -> Result<NavigableMap, PlanError>;
}

/// Ordered search result in grid-index coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPath {
    /// Empty when start and goal coincide
    pub points: Vec<GridPoint>,
    pub cost: f64,
}

/// Shortest-path search over a [`NavGraph`].
pub trait PathSearch {
    fn shortest_path(
        &self,
        graph: &NavGraph,
        heuristic: Heuristic,
        start: GridPoint,
        goal: GridPoint,
    ) -> Result<SearchPath, SearchError>;
}

/// Inputs for one planning run.
#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    pub current: GeodeticPosition,
    pub home: GeodeticPosition,
    pub destination: &'a Destination,
    pub obstacles: &'a ObstacleMap,
}

/// A finished plan plus the intermediate values worth logging or testing.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub waypoints: Vec<Waypoint>,
    pub grid_start: (i64, i64),
    pub grid_goal: (i64, i64),
    /// Nearest graph node to the start, at home altitude
    pub start_point: GridPoint,
    /// Nearest graph node to the goal, at destination altitude
    pub goal_point: GridPoint,
    pub raw_path_len: usize,
    pub pruned_path_len: usize,
    pub goal_appended: bool,
}

pub struct PlanOrchestrator<M, S> {
    map_builder: M,
    search: S,
    heuristic: Heuristic,
    config: PlannerConfig,
}

impl<M: MapBuilder, S: PathSearch> PlanOrchestrator<M, S> {
    pub fn new(map_builder: M, search: S, config: PlannerConfig) -> Self {
        Self {
            map_builder,
            search,
            heuristic: euclidean_heuristic,
            config,
        }
    }

    /// Replace the default Euclidean heuristic.
    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn plan(&self, request: &PlanRequest<'_>) -> Result<Plan, PlanError> {
        tracing::info!("Searching for a path to {}", request.destination.name);

        let start_local = global_to_local(&request.current, &request.home);
        let goal_local = global_to_local(&request.destination.position(), &request.home);
        tracing::debug!(
            "global home {:?}, position {:?}, local start {:?}, local goal {:?}",
            request.home,
            request.current,
            start_local,
            goal_local
        );

        let map = self.map_builder.build(
            request.obstacles,
            self.config.target_altitude_m,
            self.config.safety_distance_m,
        )?;
        if map.edges.is_empty() {
            return Err(PlanError::NoEdges);
        }
        let graph = NavGraph::from_edges(&map.edges);
        if graph.is_empty() {
            return Err(PlanError::EmptyGraph);
        }
        tracing::info!(
            "Graph created with {} nodes and {} edges; north offset = {}, east offset = {}",
            graph.node_count(),
            graph.edge_count(),
            map.offset.north,
            map.offset.east
        );

        let grid_start = map.offset.to_grid(start_local.north, start_local.east);
        let grid_goal = map.offset.to_grid(goal_local.north, goal_local.east);

        let start_node = graph
            .nearest_node(grid_start.0 as f64, grid_start.1 as f64)
            .ok_or(PlanError::EmptyGraph)?;
        let goal_node = graph
            .nearest_node(grid_goal.0 as f64, grid_goal.1 as f64)
            .ok_or(PlanError::EmptyGraph)?;

        // Search altitudes are up-positive: the start sits at home altitude,
        // the goal at the destination height (the negated local down value).
        let goal_altitude = -goal_local.down.trunc();
        let start_point = start_node.at_altitude(request.home.altitude);
        let goal_point = goal_node.at_altitude(goal_altitude);
        tracing::info!("Local start and goal: {:?} {:?}", start_point, goal_point);

        let found = self
            .search
            .shortest_path(&graph, self.heuristic, start_point, goal_point)?;
        let raw_path_len = found.points.len();
        tracing::debug!("Search returned {} points, cost {:.2}", raw_path_len, found.cost);

        let mut path = smooth_altitude_gradient(&found.points, &start_point, &goal_point);

        let true_goal = GridPoint::new(grid_goal.0 as f64, grid_goal.1 as f64, goal_altitude);
        let goal_appended = append_true_goal(&mut path, true_goal, &map);

        let pruned = simplify_path(&path, &map.grid);
        tracing::debug!("Pruned path from {} to {} points", path.len(), pruned.len());

        let mut waypoints: Vec<Waypoint> = pruned
            .iter()
            .map(|point| {
                let (north, east) = map.offset.to_local(point.north as i64, point.east as i64);
                Waypoint::new(north as f64, east as f64, point.altitude.trunc(), 0.0)
            })
            .collect();
        assign_headings(&mut waypoints);
        tracing::info!("Waypoints: {:?}", waypoints);

        Ok(Plan {
            waypoints,
            grid_start,
            grid_goal,
            start_point,
            goal_point,
            raw_path_len,
            pruned_path_len: pruned.len(),
            goal_appended,
        })
    }
}

/// Recover the precision lost to nearest-node snapping: finish on the
/// exact goal cell when it is visible from the last searched point.
fn append_true_goal(path: &mut Vec<GridPoint>, true_goal: GridPoint, map: &NavigableMap) -> bool {
    let Some(last) = path.last() else {
        return false;
    };
    if last.same_cell_position(&true_goal) {
        return false;
    }
    if !line_of_sight_clear(last, &true_goal, &map.grid) {
        tracing::debug!("True goal {:?} not visible from {:?}", true_goal, last);
        return false;
    }
    tracing::info!("Adding end position {:?}", true_goal);
    path.push(true_goal);
    true
}

/// Point every waypoint after the first along the leg that reaches it.
/// The first waypoint keeps its heading.
pub fn assign_headings(waypoints: &mut [Waypoint]) {
    for i in 1..waypoints.len() {
        waypoints[i].heading = waypoints[i - 1].bearing_to(&waypoints[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Edge, Grid, GraphNode, GridOffset};
    use crate::spatial::local_to_global;
    use crate::models::LocalPosition;
    use std::collections::{HashMap, VecDeque};

    struct FixedMap(NavigableMap);

    impl MapBuilder for FixedMap {
        fn build(&self, _: &ObstacleMap, _: f64, _: f64) -> Result<NavigableMap, PlanError> {
            Ok(self.0.clone())
        }
    }

    struct FailingMap;

    impl MapBuilder for FailingMap {
        fn build(&self, _: &ObstacleMap, _: f64, _: f64) -> Result<NavigableMap, PlanError> {
            Err(PlanError::MapBuilder("altitude above ceiling".to_string()))
        }
    }

    /// Breadth-first search; every point carries the start altitude except
    /// the goal.
    struct BfsSearch;

    impl PathSearch for BfsSearch {
        fn shortest_path(
            &self,
            graph: &NavGraph,
            heuristic: Heuristic,
            start: GridPoint,
            goal: GridPoint,
        ) -> Result<SearchPath, SearchError> {
            if start.same_cell_position(&goal) {
                return Ok(SearchPath::default());
            }
            let key = |node: &GraphNode| (node.north.to_bits(), node.east.to_bits());
            let mut came_from: HashMap<(u64, u64), GraphNode> = HashMap::new();
            let mut queue = VecDeque::from([start.node()]);
            came_from.insert(key(&start.node()), start.node());
            while let Some(node) = queue.pop_front() {
                if node == goal.node() {
                    let mut nodes = vec![node];
                    let mut current = node;
                    while current != start.node() {
                        current = came_from[&key(&current)];
                        nodes.push(current);
                    }
                    nodes.reverse();
                    let last = nodes.len() - 1;
                    let points: Vec<GridPoint> = nodes
                        .iter()
                        .enumerate()
                        .map(|(i, n)| {
                            n.at_altitude(if i == last { goal.altitude } else { start.altitude })
                        })
                        .collect();
                    let cost = heuristic(&start, &goal);
                    return Ok(SearchPath { points, cost });
                }
                for (next, _) in graph.neighbors(&node) {
                    if !came_from.contains_key(&key(&next)) {
                        came_from.insert(key(&next), node);
                        queue.push_back(next);
                    }
                }
            }
            Err(SearchError::Unreachable { start, goal })
        }
    }

    fn home() -> GeodeticPosition {
        GeodeticPosition::new(-122.397450, 37.792480, 0.0)
    }

    fn obstacles() -> ObstacleMap {
        ObstacleMap {
            reference_latitude: 37.792480,
            reference_longitude: -122.397450,
            obstacles: Vec::new(),
        }
    }

    /// Chain of nodes along north = 0..=10 at east = 0, offset so that the
    /// local origin maps to grid (0, 0).
    fn line_map(offset: GridOffset) -> NavigableMap {
        let edges = (0..10)
            .map(|i| Edge::new(GraphNode::new(i as f64, 0.0), GraphNode::new(i as f64 + 1.0, 0.0)))
            .collect();
        NavigableMap {
            grid: Grid::new(20, 20),
            offset,
            edges,
        }
    }

    fn destination_at(local: LocalPosition, altitude: f64) -> Destination {
        let global = local_to_global(&local, &home());
        Destination::new("Target", global.longitude, global.latitude, altitude)
    }

    fn orchestrator(map: NavigableMap) -> PlanOrchestrator<FixedMap, BfsSearch> {
        PlanOrchestrator::new(FixedMap(map), BfsSearch, PlannerConfig::default())
    }

    #[test]
    fn straight_line_collapses_to_endpoints() {
        let planner = orchestrator(line_map(GridOffset::new(0, 0)));
        // Goal exactly on node (10, 0); offsets by half a metre keep truncation stable.
        let destination = destination_at(LocalPosition::new(10.5, 0.5, 0.0), 5.0);
        let obstacles = obstacles();
        let plan = planner
            .plan(&PlanRequest {
                current: home(),
                home: home(),
                destination: &destination,
                obstacles: &obstacles,
            })
            .unwrap();

        assert_eq!(plan.grid_goal, (10, 0));
        assert_eq!(plan.goal_point, GridPoint::new(10.0, 0.0, 5.0));
        assert!(!plan.goal_appended);
        assert_eq!(plan.raw_path_len, 11);
        assert_eq!(plan.pruned_path_len, 2);
        assert_eq!(
            plan.waypoints,
            vec![Waypoint::new(0.0, 0.0, 0.0, 0.0), Waypoint::new(10.0, 0.0, 5.0, 0.0)]
        );
    }

    #[test]
    fn true_goal_is_appended_when_visible() {
        let planner = orchestrator(line_map(GridOffset::new(0, 0)));
        // Nearest node is (10, 0) but the true goal cell is (13, 2).
        let destination = destination_at(LocalPosition::new(13.5, 2.5, 0.0), 5.0);
        let obstacles = obstacles();
        let plan = planner
            .plan(&PlanRequest {
                current: home(),
                home: home(),
                destination: &destination,
                obstacles: &obstacles,
            })
            .unwrap();

        assert_eq!(plan.grid_goal, (13, 2));
        assert!(plan.goal_appended);
        let last = plan.waypoints.last().unwrap();
        assert_eq!((last.north, last.east, last.altitude), (13.0, 2.0, 5.0));
        assert_ne!(last.heading, 0.0);

        assert_eq!(plan.waypoints[0].heading, 0.0);
        for leg in plan.waypoints.windows(2) {
            let expected = (leg[1].east - leg[0].east).atan2(leg[1].north - leg[0].north);
            assert!((leg[1].heading - expected).abs() < 1e-12, "{leg:?}");
        }
    }

    #[test]
    fn true_goal_is_skipped_when_blocked() {
        let mut map = line_map(GridOffset::new(0, 0));
        for east in 0..20 {
            map.grid.set_height(12, east, 100.0);
        }
        let planner = orchestrator(map);
        let destination = destination_at(LocalPosition::new(13.5, 2.5, 0.0), 5.0);
        let obstacles = obstacles();
        let plan = planner
            .plan(&PlanRequest {
                current: home(),
                home: home(),
                destination: &destination,
                obstacles: &obstacles,
            })
            .unwrap();

        assert!(!plan.goal_appended);
        let last = plan.waypoints.last().unwrap();
        assert_eq!((last.north, last.east), (10.0, 0.0));
    }

    #[test]
    fn offsets_translate_back_to_local_frame() {
        let planner = orchestrator(line_map(GridOffset::new(-20, 7)));
        // Local (-9.5, 7.5) truncates to (-9, 7), grid (11, 0).
        let destination = destination_at(LocalPosition::new(-9.5, 7.5, 0.0), 5.0);
        let current_local = LocalPosition::new(-19.5, 7.5, 0.0);
        let obstacles = obstacles();
        let plan = planner
            .plan(&PlanRequest {
                current: local_to_global(&current_local, &home()),
                home: home(),
                destination: &destination,
                obstacles: &obstacles,
            })
            .unwrap();

        assert_eq!(plan.grid_start, (1, 0));
        assert_eq!(plan.grid_goal, (11, 0));
        let first = plan.waypoints.first().unwrap();
        let last = plan.waypoints.last().unwrap();
        assert_eq!((first.north, first.east), (-19.0, 7.0));
        assert_eq!((last.north, last.east), (-9.0, 7.0));
    }

    #[test]
    fn already_at_goal_yields_empty_plan() {
        let planner = orchestrator(line_map(GridOffset::new(0, 0)));
        let destination = destination_at(LocalPosition::new(0.0, 0.0, 0.0), 5.0);
        let obstacles = obstacles();
        let plan = planner
            .plan(&PlanRequest {
                current: home(),
                home: home(),
                destination: &destination,
                obstacles: &obstacles,
            })
            .unwrap();
        assert!(plan.waypoints.is_empty());
        assert!(!plan.goal_appended);
    }

    #[test]
    fn planning_is_deterministic() {
        let planner = orchestrator(line_map(GridOffset::new(0, 0)));
        let destination = destination_at(LocalPosition::new(13.5, 2.5, 0.0), 5.0);
        let obstacles = obstacles();
        let request = PlanRequest {
            current: home(),
            home: home(),
            destination: &destination,
            obstacles: &obstacles,
        };
        assert_eq!(planner.plan(&request).unwrap(), planner.plan(&request).unwrap());
    }

    #[test]
    fn empty_edge_set_is_fatal() {
        let mut map = line_map(GridOffset::new(0, 0));
        map.edges.clear();
        let planner = orchestrator(map);
        let destination = destination_at(LocalPosition::new(10.5, 0.5, 0.0), 5.0);
        let obstacles = obstacles();
        let err = planner
            .plan(&PlanRequest {
                current: home(),
                home: home(),
                destination: &destination,
                obstacles: &obstacles,
            })
            .unwrap_err();
        assert_eq!(err, PlanError::NoEdges);
    }

    #[test]
    fn map_builder_failure_propagates() {
        let planner = PlanOrchestrator::new(FailingMap, BfsSearch, PlannerConfig::default());
        let destination = destination_at(LocalPosition::new(10.5, 0.5, 0.0), 5.0);
        let obstacles = obstacles();
        let err = planner
            .plan(&PlanRequest {
                current: home(),
                home: home(),
                destination: &destination,
                obstacles: &obstacles,
            })
            .unwrap_err();
        assert!(matches!(err, PlanError::MapBuilder(_)));
    }

    #[test]
    fn unreachable_goal_is_distinct_from_empty_path() {
        let mut map = line_map(GridOffset::new(0, 0));
        map.edges.push(Edge::new(GraphNode::new(0.0, 15.0), GraphNode::new(5.0, 15.0)));
        let planner = orchestrator(map);
        let destination = destination_at(LocalPosition::new(5.5, 15.5, 0.0), 5.0);
        let obstacles = obstacles();
        let err = planner
            .plan(&PlanRequest {
                current: home(),
                home: home(),
                destination: &destination,
                obstacles: &obstacles,
            })
            .unwrap_err();
        assert!(matches!(err, PlanError::Search(SearchError::Unreachable { .. })));
    }

    #[test]
    fn headings_follow_each_leg() {
        let mut waypoints = vec![
            Waypoint::new(0.0, 0.0, 5.0, 1.23),
            Waypoint::new(10.0, 0.0, 5.0, 0.0),
            Waypoint::new(10.0, 10.0, 5.0, 0.0),
            Waypoint::new(0.0, 0.0, 5.0, 0.0),
        ];
        assign_headings(&mut waypoints);
        assert_eq!(waypoints[0].heading, 1.23);
        for i in 1..waypoints.len() {
            let expected = (waypoints[i].east - waypoints[i - 1].east)
                .atan2(waypoints[i].north - waypoints[i - 1].north);
            assert_eq!(waypoints[i].heading, expected);
        }
        assert!((waypoints[2].heading - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }
}
