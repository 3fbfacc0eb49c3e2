//! Waypoint maze library.
//!
//! This crate models rectangular wall mazes whose solutions must visit
//! numbered waypoints in ascending order before reaching the end. It
//! provides the grid model, a compact binary file format, three search
//! strategies and a generator that only emits solvable mazes.

pub mod codec;
pub mod error;
pub mod generator;
pub mod maze;
pub mod solver;
pub mod verify;

// Re-export main types
pub use codec::{decode, encode, load, save};
pub use error::{MazeError, Result};
pub use generator::{GenerationMode, Generator, GeneratorConfig};
pub use maze::{Cell, CellSet, Maze, Position, Side, Walls, MAX_SIDE, MAX_WAYPOINT};
pub use solver::{solve, solve_bfs, solve_dfs, solve_human_search, Path, Strategy};
pub use verify::{is_solution, verify_path, PathMetrics, PathViolation};
