//! Navigable grid and graph types exchanged with the map builder.
//!
//! Grid-index coordinates are local-frame metres shifted by an integer
//! [`GridOffset`]. Graph nodes live in the same index frame but keep
//! fractional coordinates, since builders typically place them on
//! medial-axis or Voronoi edges rather than cell centres.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Discretised obstacle map. Each cell holds the height of the tallest
/// obstacle (including clearance) covering it; `0.0` means free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    north_size: usize,
    east_size: usize,
    heights: Vec<f64>,
}

impl Grid {
    /// An all-free grid.
    pub fn new(north_size: usize, east_size: usize) -> Self {
        Self {
            north_size,
            east_size,
            heights: vec![0.0; north_size * east_size],
        }
    }

    /// Wrap row-major heights (north-major). `None` if the length is wrong.
    pub fn from_heights(north_size: usize, east_size: usize, heights: Vec<f64>) -> Option<Self> {
        if heights.len() != north_size * east_size {
            return None;
        }
        Some(Self {
            north_size,
            east_size,
            heights,
        })
    }

    pub fn north_size(&self) -> usize {
        self.north_size
    }

    pub fn east_size(&self) -> usize {
        self.east_size
    }

    /// Set one cell's obstacle height. Out-of-range cells are ignored.
    pub fn set_height(&mut self, north: usize, east: usize, height: f64) {
        if north < self.north_size && east < self.east_size {
            self.heights[north * self.east_size + east] = height;
        }
    }

    /// Obstacle height at an index, `None` outside the grid.
    pub fn height(&self, north: i64, east: i64) -> Option<f64> {
        if north < 0 || east < 0 {
            return None;
        }
        let (north, east) = (north as usize, east as usize);
        if north >= self.north_size || east >= self.east_size {
            return None;
        }
        Some(self.heights[north * self.east_size + east])
    }

    /// A cell is free at `altitude` when it is inside the grid and its
    /// obstacle height is strictly below that altitude.
    pub fn is_free(&self, north: i64, east: i64, altitude: f64) -> bool {
        self.height(north, east)
            .map(|height| height < altitude || height <= 0.0)
            .unwrap_or(false)
    }
}

/// Integer translation between local-frame metres and grid indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridOffset {
    pub north: i64,
    pub east: i64,
}

impl GridOffset {
    pub fn new(north: i64, east: i64) -> Self {
        Self { north, east }
    }

    /// Truncate a local position toward zero, then subtract the offsets.
    pub fn to_grid(&self, local_north: f64, local_east: f64) -> (i64, i64) {
        (
            local_north as i64 - self.north,
            local_east as i64 - self.east,
        )
    }

    /// Add the offsets back to grid indices.
    pub fn to_local(&self, grid_north: i64, grid_east: i64) -> (i64, i64) {
        (grid_north + self.north, grid_east + self.east)
    }
}

/// A path point in grid-index coordinates, altitude up-positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub north: f64,
    pub east: f64,
    pub altitude: f64,
}

impl GridPoint {
    pub fn new(north: f64, east: f64, altitude: f64) -> Self {
        Self {
            north,
            east,
            altitude,
        }
    }

    pub fn horizontal_distance(&self, other: &GridPoint) -> f64 {
        (self.north - other.north).hypot(self.east - other.east)
    }

    pub fn same_cell_position(&self, other: &GridPoint) -> bool {
        self.north == other.north && self.east == other.east
    }

    pub fn node(&self) -> GraphNode {
        GraphNode::new(self.north, self.east)
    }
}

/// A navigable graph node (2D, grid-index frame).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub north: f64,
    pub east: f64,
}

impl GraphNode {
    pub fn new(north: f64, east: f64) -> Self {
        Self { north, east }
    }

    pub fn at_altitude(&self, altitude: f64) -> GridPoint {
        GridPoint::new(self.north, self.east, altitude)
    }

    pub fn distance(&self, other: &GraphNode) -> f64 {
        (self.north - other.north).hypot(self.east - other.east)
    }

    fn key(&self) -> NodeKey {
        NodeKey(self.north.to_bits(), self.east.to_bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeKey(u64, u64);

/// A directly traversable segment between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: GraphNode,
    pub to: GraphNode,
}

impl Edge {
    pub fn new(from: GraphNode, to: GraphNode) -> Self {
        Self { from, to }
    }
}

/// Everything a map builder hands back for one altitude/clearance pair.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigableMap {
    pub grid: Grid,
    pub offset: GridOffset,
    pub edges: Vec<Edge>,
}

/// Undirected weighted graph over [`GraphNode`]s.
///
/// Nodes keep first-seen order from the edge list so nearest-node lookups
/// are deterministic for a given input.
#[derive(Debug, Clone, Default)]
pub struct NavGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<NodeKey, usize>,
    adjacency: Vec<Vec<(usize, f64)>>,
    edge_count: usize,
}

impl NavGraph {
    pub fn from_edges(edges: &[Edge]) -> Self {
        let mut graph = Self::default();
        for edge in edges {
            let a = graph.intern(edge.from);
            let b = graph.intern(edge.to);
            if a == b {
                continue;
            }
            let weight = edge.from.distance(&edge.to);
            graph.adjacency[a].push((b, weight));
            graph.adjacency[b].push((a, weight));
            graph.edge_count += 1;
        }
        graph
    }

    fn intern(&mut self, node: GraphNode) -> usize {
        let key = node.key();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(node);
        self.adjacency.push(Vec::new());
        self.index.insert(key, idx);
        idx
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Neighbours of `node` with edge lengths. Empty for unknown nodes.
    pub fn neighbors(&self, node: &GraphNode) -> impl Iterator<Item = (GraphNode, f64)> + '_ {
        self.index
            .get(&node.key())
            .map(|&idx| self.adjacency[idx].as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|&(other, weight)| (self.nodes[other], weight))
    }

    /// Node closest (2D Euclidean) to a grid-index position; ties go to
    /// the earliest node.
    pub fn nearest_node(&self, north: f64, east: f64) -> Option<GraphNode> {
        let target = GraphNode::new(north, east);
        let mut best: Option<(GraphNode, f64)> = None;
        for node in &self.nodes {
            let dist = node.distance(&target);
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((*node, dist)),
            }
        }
        best.map(|(node, _)| node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(north: f64, east: f64) -> GraphNode {
        GraphNode::new(north, east)
    }

    #[test]
    fn offset_round_trip_reproduces_truncated_local_point() {
        let offsets = [
            GridOffset::new(-316, -445),
            GridOffset::new(0, 0),
            GridOffset::new(12, -7),
        ];
        let points = [
            (0.0, 0.0),
            (463.95, -340.2),
            (-0.7, 0.7),
            (-12.999, 310.5),
            (1e4 + 0.25, -1e4 - 0.25),
        ];
        for offset in offsets {
            for (north, east) in points {
                let (gn, ge) = offset.to_grid(north, east);
                assert_eq!(
                    offset.to_local(gn, ge),
                    (north.trunc() as i64, east.trunc() as i64)
                );
            }
        }
    }

    #[test]
    fn grid_bounds_and_heights() {
        let mut grid = Grid::new(4, 3);
        grid.set_height(1, 2, 20.0);
        grid.set_height(9, 9, 99.0);

        assert_eq!(grid.height(1, 2), Some(20.0));
        assert_eq!(grid.height(-1, 0), None);
        assert_eq!(grid.height(4, 0), None);
        assert!(grid.is_free(0, 0, 0.0));
        assert!(!grid.is_free(1, 2, 5.0));
        assert!(grid.is_free(1, 2, 25.0));
        assert!(!grid.is_free(0, 3, 5.0));

        assert!(Grid::from_heights(2, 2, vec![0.0; 3]).is_none());
    }

    #[test]
    fn graph_deduplicates_nodes_and_counts_edges() {
        let edges = vec![
            Edge::new(n(0.0, 0.0), n(5.0, 0.0)),
            Edge::new(n(5.0, 0.0), n(10.0, 0.0)),
            Edge::new(n(10.0, 0.0), n(10.0, 0.0)),
        ];
        let graph = NavGraph::from_edges(&edges);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(!graph.is_empty());
        assert_eq!(graph.nodes(), &[n(0.0, 0.0), n(5.0, 0.0), n(10.0, 0.0)]);

        let neighbors: Vec<_> = graph.neighbors(&n(5.0, 0.0)).collect();
        assert_eq!(neighbors, vec![(n(0.0, 0.0), 5.0), (n(10.0, 0.0), 5.0)]);
        assert_eq!(graph.neighbors(&n(99.0, 99.0)).count(), 0);
    }

    #[test]
    fn nearest_node_prefers_closest_then_earliest() {
        let edges = vec![
            Edge::new(n(0.0, 0.0), n(4.0, 0.0)),
            Edge::new(n(4.0, 0.0), n(8.0, 0.0)),
        ];
        let graph = NavGraph::from_edges(&edges);
        assert_eq!(graph.nearest_node(3.4, 1.0), Some(n(4.0, 0.0)));
        // Equidistant from (0,0) and (4,0): earliest wins.
        assert_eq!(graph.nearest_node(2.0, 0.0), Some(n(0.0, 0.0)));

        assert_eq!(NavGraph::from_edges(&[]).nearest_node(0.0, 0.0), None);
    }
}
