//! Error type shared by the grid model, codec, solver and generator.

use thiserror::Error;

/// Failures returned by maze operations.
///
/// An unsolvable maze is not an error: solvers return an empty list instead.
#[derive(Debug, Error)]
pub enum MazeError {
    #[error("position ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: usize,
        height: usize,
    },

    #[error("invalid maze size {width}x{height}; each side must be between 1 and 255")]
    InvalidSize { width: usize, height: usize },

    #[error("waypoint number {0} is outside 1..=15")]
    InvalidWaypoint(u8),

    #[error("maze file truncated: expected {expected} bytes, found {actual}")]
    TruncatedFile { expected: usize, actual: usize },

    #[error("maze file header declares an empty {width}x{height} grid")]
    InvalidHeader { width: u8, height: u8 },

    #[error("maze has no start or no end cell")]
    MissingStartOrEnd,

    #[error("no solvable maze produced after {attempts} attempts")]
    GenerationExhausted { attempts: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MazeError>;
