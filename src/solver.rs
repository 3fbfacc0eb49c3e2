//! Path search from start to end under the waypoint ordering rule.
//!
//! Three strategies share one contract: every returned [`Path`] is a simple
//! walk through open walls from start to end that meets the waypoints in
//! strictly increasing order. The depth-first and heuristic searches keep an
//! explicit stack of `(parent, candidate)` frames and unwind the live path to
//! the next frame's parent on dead ends; breadth-first keeps whole paths.

use clap::ValueEnum;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::Result;
use crate::maze::{CellSet, Maze, Position};

/// A walk through the maze, starting at the start cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Path {
    pub cells: Vec<Position>,
    /// Highest waypoint number met along `cells` (0 if none).
    pub last_seen_number: u8,
}

impl Path {
    fn starting_at(maze: &Maze, start: Position) -> Self {
        Self {
            cells: vec![start],
            last_seen_number: number_at(maze, start).unwrap_or(0),
        }
    }

    /// A copy of this path with `next` appended.
    fn extended(&self, maze: &Maze, next: Position) -> Self {
        let mut cells = Vec::with_capacity(self.cells.len() + 1);
        cells.extend_from_slice(&self.cells);
        cells.push(next);
        Self {
            cells,
            last_seen_number: number_at(maze, next).unwrap_or(self.last_seen_number),
        }
    }

    /// Wrap an existing walk, taking `last_seen_number` from its last
    /// numbered cell.
    pub fn from_cells(maze: &Maze, cells: Vec<Position>) -> Self {
        let last_seen_number = cells
            .iter()
            .rev()
            .find_map(|&pos| number_at(maze, pos))
            .unwrap_or(0);
        Self {
            cells,
            last_seen_number,
        }
    }

    fn visited(&self, maze: &Maze) -> CellSet {
        let mut visited = maze.cell_set();
        for &pos in &self.cells {
            visited.insert(pos);
        }
        visited
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn first(&self) -> Option<Position> {
        self.cells.first().copied()
    }

    pub fn last(&self) -> Option<Position> {
        self.cells.last().copied()
    }
}

/// Search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Exhaustive depth-first search with backtracking
    #[value(name = "dfs")]
    DepthFirst,
    /// Breadth-first enumeration of whole paths
    #[value(name = "bfs")]
    BreadthFirst,
    /// Depth-first search that tries the move closest to the next goal first
    #[value(name = "human")]
    Heuristic,
}

/// Run `strategy`. With `one_solution` the search stops at the first path found.
pub fn solve(maze: &Maze, strategy: Strategy, one_solution: bool) -> Result<Vec<Path>> {
    match strategy {
        Strategy::DepthFirst => solve_dfs(maze, one_solution),
        Strategy::BreadthFirst => solve_bfs(maze, one_solution),
        Strategy::Heuristic => solve_human_search(maze, one_solution),
    }
}

pub fn solve_dfs(maze: &Maze, one_solution: bool) -> Result<Vec<Path>> {
    backtrack(maze, one_solution, false)
}

/// Backtracking search that orders candidate moves by straight-line
/// distance to the next unvisited waypoint (or the end once all are seen).
pub fn solve_human_search(maze: &Maze, one_solution: bool) -> Result<Vec<Path>> {
    backtrack(maze, one_solution, true)
}

/// Breadth-first enumeration. The frontier holds complete paths and is
/// replaced wholesale each round, so memory grows with the number of open
/// paths; only practical on small grids.
pub fn solve_bfs(maze: &Maze, one_solution: bool) -> Result<Vec<Path>> {
    let (start, end) = maze.endpoints()?;

    let mut solutions = Vec::new();
    let mut frontier = vec![Path::starting_at(maze, start)];
    let mut rounds = 0usize;

    while !frontier.is_empty() {
        rounds += 1;
        let mut next_frontier = Vec::new();

        for path in frontier {
            let Some(tail) = path.last() else {
                continue;
            };
            if tail == end {
                if one_solution {
                    debug!(rounds, "bfs found a solution");
                    return Ok(vec![path]);
                }
                solutions.push(path);
                continue;
            }

            let visited = path.visited(maze);
            for neighbor in maze.legal_neighbors(tail, &visited, path.last_seen_number) {
                next_frontier.push(path.extended(maze, neighbor));
            }
        }

        frontier = next_frontier;
    }

    debug!(rounds, solutions = solutions.len(), "bfs exhausted");
    Ok(solutions)
}

/// A pending move on the search stack
#[derive(Debug, Clone, Copy)]
struct Frame {
    parent: Option<Position>,
    candidate: Position,
}

fn backtrack(maze: &Maze, one_solution: bool, guided: bool) -> Result<Vec<Path>> {
    let (start, end) = maze.endpoints()?;

    let mut solutions = Vec::new();
    let mut stack = vec![Frame {
        parent: None,
        candidate: start,
    }];
    let mut path: Vec<Position> = Vec::new();
    let mut visited = maze.cell_set();
    let mut last_seen = 0u8;
    let mut expanded = 0usize;

    while let Some(frame) = stack.pop() {
        expanded += 1;
        path.push(frame.candidate);
        visited.insert(frame.candidate);
        if let Some(n) = number_at(maze, frame.candidate) {
            last_seen = n;
        }

        let neighbors: SmallVec<[Position; 4]> = if frame.candidate == end {
            solutions.push(Path {
                cells: path.clone(),
                last_seen_number: last_seen,
            });
            if one_solution {
                debug!(expanded, guided, "backtracking search found a solution");
                return Ok(solutions);
            }
            SmallVec::new()
        } else {
            let mut next = maze.legal_neighbors(frame.candidate, &visited, last_seen);
            if guided {
                order_toward_goal(maze, &mut next, last_seen, end);
            }
            next
        };

        if neighbors.is_empty() {
            // Dead end (or a finished solution): unwind to the next branch point.
            let Some(pending) = stack.last() else {
                break;
            };
            while let Some(&tail) = path.last() {
                if Some(tail) == pending.parent {
                    break;
                }
                path.pop();
                visited.remove(tail);
                if number_at(maze, tail).is_some() {
                    last_seen = last_seen.saturating_sub(1);
                }
            }
        } else {
            let parent = Some(frame.candidate);
            stack.extend(
                neighbors
                    .into_iter()
                    .map(|candidate| Frame { parent, candidate }),
            );
        }
    }

    debug!(
        expanded,
        guided,
        solutions = solutions.len(),
        "backtracking search exhausted"
    );
    Ok(solutions)
}

/// Sort so the candidate nearest the current goal ends up on top of the stack.
fn order_toward_goal(maze: &Maze, candidates: &mut [Position], last_seen: u8, end: Position) {
    let goal = if maze.all_waypoints_seen(last_seen) {
        end
    } else {
        maze.find_number(last_seen.saturating_add(1)).unwrap_or(end)
    };
    candidates.sort_by(|a, b| b.distance(goal).total_cmp(&a.distance(goal)));
}

fn number_at(maze: &Maze, pos: Position) -> Option<u8> {
    maze.cell(pos).and_then(|c| c.number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MazeError;
    use crate::maze::Side;
    use crate::verify::verify_path;

    fn p(x: i32, y: i32) -> Position {
        Position::new(x, y)
    }

    fn open_maze(width: usize, height: usize) -> Maze {
        let mut maze = Maze::new(width, height).unwrap();
        maze.set_start(p(0, 0)).unwrap();
        maze.set_end(p(width as i32 - 1, height as i32 - 1)).unwrap();
        maze
    }

    fn waypoint_maze() -> Maze {
        let mut maze = open_maze(3, 3);
        maze.set_number(p(2, 0), Some(1)).unwrap();
        maze.set_number(p(0, 2), Some(2)).unwrap();
        maze
    }

    fn sorted_cells(paths: &[Path]) -> Vec<Vec<Position>> {
        let mut cells: Vec<Vec<Position>> = paths.iter().map(|p| p.cells.clone()).collect();
        cells.sort_by_key(|c| c.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>());
        cells
    }

    #[test]
    fn test_bfs_two_by_two() {
        let maze = open_maze(2, 2);
        let solutions = solve_bfs(&maze, false).unwrap();
        let cells: Vec<Vec<Position>> = solutions.into_iter().map(|p| p.cells).collect();
        assert_eq!(
            cells,
            vec![
                vec![p(0, 0), p(1, 0), p(1, 1)],
                vec![p(0, 0), p(0, 1), p(1, 1)],
            ]
        );
    }

    #[test]
    fn test_strategies_agree_on_all_solutions() {
        let maze = waypoint_maze();
        let dfs = solve_dfs(&maze, false).unwrap();
        let bfs = solve_bfs(&maze, false).unwrap();
        let human = solve_human_search(&maze, false).unwrap();

        assert!(!dfs.is_empty());
        assert_eq!(sorted_cells(&dfs), sorted_cells(&bfs));
        assert_eq!(sorted_cells(&dfs), sorted_cells(&human));
    }

    #[test]
    fn test_solutions_visit_waypoints_in_order() {
        let maze = waypoint_maze();
        for strategy in [Strategy::DepthFirst, Strategy::BreadthFirst, Strategy::Heuristic] {
            let solutions = solve(&maze, strategy, false).unwrap();
            for path in &solutions {
                let metrics = verify_path(&maze, path).unwrap();
                assert_eq!(metrics.waypoints_visited, 2);
                assert_eq!(path.last_seen_number, 2);
            }
        }
    }

    #[test]
    fn test_one_solution_stops_early() {
        let maze = open_maze(3, 3);
        for strategy in [Strategy::DepthFirst, Strategy::BreadthFirst, Strategy::Heuristic] {
            let solutions = solve(&maze, strategy, true).unwrap();
            assert_eq!(solutions.len(), 1);
            assert!(verify_path(&maze, &solutions[0]).is_ok());
        }
        // The first breadth-first solution is a shortest one.
        assert_eq!(solve_bfs(&maze, true).unwrap()[0].len(), 5);
    }

    #[test]
    fn test_human_search_heads_for_goal() {
        let maze = open_maze(4, 4);
        let first = solve_human_search(&maze, true).unwrap();
        assert_eq!(first[0].len(), 7);
    }

    #[test]
    fn test_walled_off_end_has_no_solution() {
        let mut maze = open_maze(3, 3);
        maze.set_wall(p(2, 2), Side::Top, true).unwrap();
        maze.set_wall(p(2, 2), Side::Left, true).unwrap();
        for strategy in [Strategy::DepthFirst, Strategy::BreadthFirst, Strategy::Heuristic] {
            assert!(solve(&maze, strategy, false).unwrap().is_empty());
        }
    }

    #[test]
    fn test_waypoint_gap_is_unsolvable() {
        let mut maze = open_maze(3, 1);
        maze.set_number(p(1, 0), Some(2)).unwrap();
        assert!(solve_dfs(&maze, false).unwrap().is_empty());
        assert!(solve_bfs(&maze, false).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_waypoint_numbers() {
        // Either copy of waypoint 1 satisfies the ordering.
        let mut maze = open_maze(2, 2);
        maze.set_number(p(1, 0), Some(1)).unwrap();
        maze.set_number(p(0, 1), Some(1)).unwrap();
        let solutions = solve_dfs(&maze, false).unwrap();
        assert_eq!(
            sorted_cells(&solutions),
            vec![
                vec![p(0, 0), p(0, 1), p(1, 1)],
                vec![p(0, 0), p(1, 0), p(1, 1)],
            ]
        );
        for path in &solutions {
            assert_eq!(path.last_seen_number, 1);
            assert!(verify_path(&maze, path).is_ok());
        }

        // Once one copy is seen the other can no longer be entered.
        let mut corridor = open_maze(4, 1);
        corridor.set_number(p(1, 0), Some(1)).unwrap();
        corridor.set_number(p(2, 0), Some(1)).unwrap();
        assert!(solve_dfs(&corridor, false).unwrap().is_empty());
    }

    #[test]
    fn test_requires_start_and_end() {
        let mut maze = Maze::new(2, 2).unwrap();
        maze.set_start(p(0, 0)).unwrap();
        assert!(matches!(solve_dfs(&maze, true), Err(MazeError::MissingStartOrEnd)));
        assert!(matches!(solve_bfs(&maze, true), Err(MazeError::MissingStartOrEnd)));
    }

    #[test]
    fn test_start_is_end() {
        let mut maze = Maze::new(1, 1).unwrap();
        maze.set_start(p(0, 0)).unwrap();
        maze.set_end(p(0, 0)).unwrap();
        let solutions = solve_dfs(&maze, false).unwrap();
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].cells, vec![p(0, 0)]);
    }

    #[test]
    fn test_dfs_backtracks_out_of_waypoint_branch() {
        // Waypoint 1 sits beside the end and is reached from both directions,
        // so last_seen must be unwound after every recorded solution.
        let mut maze = open_maze(3, 2);
        maze.set_number(p(2, 0), Some(1)).unwrap();
        let solutions = solve_dfs(&maze, false).unwrap();
        assert!(!solutions.is_empty());
        for path in &solutions {
            assert!(path.cells.contains(&p(2, 0)));
            assert!(verify_path(&maze, path).is_ok());
        }
        assert_eq!(sorted_cells(&solutions), sorted_cells(&solve_bfs(&maze, false).unwrap()));
    }
}
