//! Independent check of a path against a maze.
//!
//! This does not trust the solver: it replays the path cell by cell and
//! reports the first rule it breaks, or metrics about the path when it holds.

use serde::Serialize;
use thiserror::Error;

use crate::maze::{Maze, Position};
use crate::solver::Path;

/// Metrics collected while replaying a path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathMetrics {
    /// Cells on the path, start and end included
    pub length: usize,
    pub waypoints_visited: usize,
    /// Changes of direction between consecutive steps
    pub turns: usize,
}

/// Why a path is not a solution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathViolation {
    #[error("path is empty")]
    Empty,
    #[error("maze has no start or no end cell")]
    MissingStartOrEnd,
    #[error("path begins at {0} instead of the start cell")]
    WrongStart(Position),
    #[error("path finishes at {0} instead of the end cell")]
    WrongEnd(Position),
    #[error("{0} is outside the grid")]
    OffGrid(Position),
    #[error("{0} is visited twice")]
    Revisit(Position),
    #[error("{from} and {to} are not neighbors")]
    NotAdjacent { from: Position, to: Position },
    #[error("a wall separates {from} and {to}")]
    Blocked { from: Position, to: Position },
    #[error("waypoint {found} at {at} reached while {expected} was due")]
    WaypointOutOfOrder {
        at: Position,
        expected: u8,
        found: u8,
    },
    #[error("end reached after waypoint {reached} but waypoint {required} is the last")]
    WaypointsMissing { reached: u8, required: u8 },
}

/// Check that `path` is a valid solution of `maze`.
pub fn verify_path(maze: &Maze, path: &Path) -> Result<PathMetrics, PathViolation> {
    let (first, last) = match (path.first(), path.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(PathViolation::Empty),
    };
    let (start, end) = maze
        .endpoints()
        .map_err(|_| PathViolation::MissingStartOrEnd)?;

    if first != start {
        return Err(PathViolation::WrongStart(first));
    }
    if last != end {
        return Err(PathViolation::WrongEnd(last));
    }

    let mut metrics = PathMetrics {
        length: path.len(),
        ..Default::default()
    };
    let mut visited = maze.cell_set();
    let mut last_seen = 0u8;
    let mut previous_side = None;

    for (i, &pos) in path.cells.iter().enumerate() {
        let cell = maze.cell(pos).ok_or(PathViolation::OffGrid(pos))?;
        if !visited.insert(pos) {
            return Err(PathViolation::Revisit(pos));
        }

        if i > 0 {
            let from = path.cells[i - 1];
            match maze.wall_between(from, pos) {
                None => return Err(PathViolation::NotAdjacent { from, to: pos }),
                Some(true) => return Err(PathViolation::Blocked { from, to: pos }),
                Some(false) => {}
            }
            let side = from.side_toward(pos);
            if previous_side.is_some() && side != previous_side {
                metrics.turns += 1;
            }
            previous_side = side;
        }

        if let Some(found) = cell.number {
            let expected = last_seen.saturating_add(1);
            // The start cell is taken as-is; every later waypoint must be next in line.
            if i > 0 && found != expected {
                return Err(PathViolation::WaypointOutOfOrder {
                    at: pos,
                    expected,
                    found,
                });
            }
            last_seen = found;
            metrics.waypoints_visited += 1;
        }
    }

    if let Some(required) = maze.max_number() {
        if last_seen != required {
            return Err(PathViolation::WaypointsMissing {
                reached: last_seen,
                required,
            });
        }
    }

    Ok(metrics)
}

/// Simple verification: is the path a solution?
pub fn is_solution(maze: &Maze, path: &Path) -> bool {
    verify_path(maze, path).is_ok()
}
