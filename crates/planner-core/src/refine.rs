//! Post-search path refinement: altitude profile, line of sight and pruning.

use crate::grid::{Grid, GridPoint};

/// Samples per grid cell when walking a segment.
const SAMPLES_PER_CELL: f64 = 2.0;

/// Spread the altitude change from `start` to `goal` across the path in
/// proportion to horizontal distance travelled, instead of one jump.
pub fn smooth_altitude_gradient(
    path: &[GridPoint],
    start: &GridPoint,
    goal: &GridPoint,
) -> Vec<GridPoint> {
    if path.is_empty() {
        return Vec::new();
    }

    let mut cumulative = Vec::with_capacity(path.len());
    let mut total = 0.0;
    cumulative.push(0.0);
    for pair in path.windows(2) {
        total += pair[0].horizontal_distance(&pair[1]);
        cumulative.push(total);
    }

    let climb = goal.altitude - start.altitude;
    path.iter()
        .zip(cumulative)
        .map(|(point, travelled)| {
            let fraction = if total > f64::EPSILON {
                travelled / total
            } else {
                1.0
            };
            GridPoint::new(point.north, point.east, start.altitude + climb * fraction)
        })
        .collect()
}

/// True when the straight segment `a → b` never enters a blocked cell.
///
/// The altitude is interpolated along the segment, so a path may pass over
/// obstacles lower than the points it connects.
pub fn line_of_sight_clear(a: &GridPoint, b: &GridPoint, grid: &Grid) -> bool {
    let dn = b.north - a.north;
    let de = b.east - a.east;
    let dz = b.altitude - a.altitude;
    let span = dn.abs().max(de.abs());
    let steps = ((span * SAMPLES_PER_CELL).ceil() as usize).max(1);

    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let north = (a.north + t * dn).floor() as i64;
        let east = (a.east + t * de).floor() as i64;
        let altitude = a.altitude + t * dz;
        if !grid.is_free(north, east, altitude) {
            return false;
        }
    }
    true
}

/// Drop intermediate points not needed for obstacle avoidance.
///
/// From each kept point, jump to the furthest later point still in line of
/// sight. The first and last points always survive.
pub fn simplify_path(path: &[GridPoint], grid: &Grid) -> Vec<GridPoint> {
    if path.len() <= 2 {
        return path.to_vec();
    }

    let mut simplified = vec![path[0]];
    let mut current_idx = 0usize;

    while current_idx < path.len() - 1 {
        let current = &path[current_idx];
        let mut furthest_valid = current_idx + 1;

        for target_idx in (current_idx + 2)..path.len() {
            if line_of_sight_clear(current, &path[target_idx], grid) {
                furthest_valid = target_idx;
            }
        }

        simplified.push(path[furthest_valid]);
        current_idx = furthest_valid;
    }

    simplified
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(north: f64, east: f64, altitude: f64) -> GridPoint {
        GridPoint::new(north, east, altitude)
    }

    fn wall_grid() -> Grid {
        // 12x12 open field with a wall at north = 5 for east 0..=8.
        let mut grid = Grid::new(12, 12);
        for east in 0..=8 {
            grid.set_height(5, east, 50.0);
        }
        grid
    }

    #[test]
    fn gradient_interpolates_by_horizontal_distance() {
        let path = vec![p(0.0, 0.0, 0.0), p(3.0, 0.0, 0.0), p(3.0, 4.0, 0.0), p(10.0, 4.0, 0.0)];
        let start = p(0.0, 0.0, 0.0);
        let goal = p(10.0, 4.0, 14.0);

        let smoothed = smooth_altitude_gradient(&path, &start, &goal);
        let expected = [0.0, 3.0, 7.0, 14.0];
        for (point, want) in smoothed.iter().zip(expected) {
            assert!((point.altitude - want).abs() < 1e-9, "{} vs {}", point.altitude, want);
        }
        for (before, after) in path.iter().zip(&smoothed) {
            assert!(before.same_cell_position(after));
        }
    }

    #[test]
    fn gradient_handles_degenerate_paths() {
        assert!(smooth_altitude_gradient(&[], &p(0.0, 0.0, 0.0), &p(1.0, 1.0, 5.0)).is_empty());
        let single = smooth_altitude_gradient(&[p(2.0, 2.0, 0.0)], &p(2.0, 2.0, 0.0), &p(2.0, 2.0, 5.0));
        assert_eq!(single, vec![p(2.0, 2.0, 5.0)]);
    }

    #[test]
    fn line_of_sight_respects_walls_and_altitude() {
        let grid = wall_grid();
        assert!(line_of_sight_clear(&p(0.0, 0.0, 5.0), &p(4.0, 11.0, 5.0), &grid));
        assert!(!line_of_sight_clear(&p(0.0, 0.0, 5.0), &p(10.0, 0.0, 5.0), &grid));
        // High enough to clear the wall.
        assert!(line_of_sight_clear(&p(0.0, 0.0, 60.0), &p(10.0, 0.0, 60.0), &grid));
        // Leaving the grid is never clear.
        assert!(!line_of_sight_clear(&p(0.0, 0.0, 5.0), &p(0.0, 20.0, 5.0), &grid));
    }

    #[test]
    fn straight_unobstructed_line_collapses_to_endpoints() {
        let grid = Grid::new(12, 12);
        let path: Vec<GridPoint> = (0..=10).map(|north| p(north as f64, 0.0, 5.0)).collect();
        let simplified = simplify_path(&path, &grid);
        assert_eq!(simplified, vec![p(0.0, 0.0, 5.0), p(10.0, 0.0, 5.0)]);
    }

    #[test]
    fn pruning_keeps_corner_around_wall() {
        let grid = wall_grid();
        let path = vec![
            p(0.0, 0.0, 5.0),
            p(2.0, 5.0, 5.0),
            p(4.0, 10.0, 5.0),
            p(6.0, 10.0, 5.0),
            p(8.0, 5.0, 5.0),
            p(10.0, 0.0, 5.0),
        ];
        let simplified = simplify_path(&path, &grid);
        assert_eq!(simplified.first(), path.first());
        assert_eq!(simplified.last(), path.last());
        assert!(simplified.len() < path.len());
        for pair in simplified.windows(2) {
            assert!(line_of_sight_clear(&pair[0], &pair[1], &grid));
        }
    }

    #[test]
    fn short_paths_are_untouched() {
        let grid = wall_grid();
        let path = vec![p(0.0, 0.0, 5.0), p(10.0, 0.0, 5.0)];
        assert_eq!(simplify_path(&path, &grid), path);
    }
}
