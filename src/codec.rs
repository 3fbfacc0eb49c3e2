//! Binary maze file format.
//!
//! Layout (all fields single bytes):
//!
//! ```text
//! 0: width   1: height   2: start_x   3: start_y   4: end_x   5: end_y
//! then width*height cell bytes, row-major (y outer, x inner):
//!   bits 7..4  walls: top, right, bottom, left (1 = wall)
//!   bits 3..0  waypoint number, 0 = none
//! ```

use std::fs;
use std::io::{Cursor, ErrorKind};
use std::path::Path;

use byteorder::{ReadBytesExt, WriteBytesExt};
use tracing::{debug, warn};

use crate::error::{MazeError, Result};
use crate::maze::{Maze, Position, Side, Walls};

/// Bytes before the first cell.
pub const HEADER_LEN: usize = 6;

const NUMBER_MASK: u8 = 0x0f;

fn wall_bit(side: Side) -> u8 {
    match side {
        Side::Top => 0b1000_0000,
        Side::Right => 0b0100_0000,
        Side::Bottom => 0b0010_0000,
        Side::Left => 0b0001_0000,
    }
}

/// Pack one cell's walls and waypoint number into a byte.
pub fn encode_cell(walls: &Walls, number: Option<u8>) -> u8 {
    let wall_bits = Side::ALL
        .into_iter()
        .filter(|&side| walls.get(side))
        .fold(0u8, |acc, side| acc | wall_bit(side));
    wall_bits | (number.unwrap_or(0) & NUMBER_MASK)
}

/// Unpack a cell byte into walls and an optional waypoint number.
pub fn decode_cell(byte: u8) -> (Walls, Option<u8>) {
    let mut walls = Walls::default();
    for side in Side::ALL {
        walls.set(side, byte & wall_bit(side) != 0);
    }
    let number = byte & NUMBER_MASK;
    (walls, (number != 0).then_some(number))
}

/// Serialize a maze. Start and end must both be set.
pub fn encode(maze: &Maze) -> Result<Vec<u8>> {
    let (start, end) = maze.endpoints()?;
    let mut out = Vec::with_capacity(HEADER_LEN + maze.cell_count());

    // Sizes are bounded to 1..=255 by Maze::new and coordinates lie inside them.
    for value in [
        maze.width() as u8,
        maze.height() as u8,
        start.x as u8,
        start.y as u8,
        end.x as u8,
        end.y as u8,
    ] {
        out.write_u8(value)?;
    }

    for pos in maze.positions() {
        if let Some(cell) = maze.cell(pos) {
            out.write_u8(encode_cell(&cell.walls, cell.number))?;
        }
    }

    Ok(out)
}

/// Rebuild a maze from its serialized form.
pub fn decode(bytes: &[u8]) -> Result<Maze> {
    let mut reader = Cursor::new(bytes);
    let mut header = [0u8; HEADER_LEN];
    for slot in header.iter_mut() {
        *slot = reader.read_u8().map_err(|e| truncated(e, HEADER_LEN, bytes.len()))?;
    }
    let [width, height, start_x, start_y, end_x, end_y] = header;

    if width == 0 || height == 0 {
        return Err(MazeError::InvalidHeader { width, height });
    }

    let expected = HEADER_LEN + usize::from(width) * usize::from(height);
    if bytes.len() < expected {
        return Err(MazeError::TruncatedFile {
            expected,
            actual: bytes.len(),
        });
    }

    let mut maze = Maze::new(usize::from(width), usize::from(height))?;
    maze.set_start(Position::new(i32::from(start_x), i32::from(start_y)))?;
    maze.set_end(Position::new(i32::from(end_x), i32::from(end_y)))?;

    let positions: Vec<Position> = maze.positions().collect();
    for pos in positions {
        let byte = reader.read_u8().map_err(|e| truncated(e, expected, bytes.len()))?;
        let (walls, number) = decode_cell(byte);
        maze.set_walls_raw(pos, walls)?;
        maze.set_number(pos, number)?;
    }

    if bytes.len() > expected {
        debug!(extra = bytes.len() - expected, "ignoring trailing bytes after maze cells");
    }
    if !maze.is_symmetric() {
        warn!("decoded maze has walls that disagree between neighboring cells");
    }
    debug!(
        width = maze.width(),
        height = maze.height(),
        waypoints = maze.numbers().len(),
        "decoded maze"
    );

    Ok(maze)
}

fn truncated(err: std::io::Error, expected: usize, actual: usize) -> MazeError {
    if err.kind() == ErrorKind::UnexpectedEof {
        MazeError::TruncatedFile { expected, actual }
    } else {
        MazeError::Io(err)
    }
}

/// Write a maze to `path` as a single blob.
pub fn save(maze: &Maze, path: impl AsRef<Path>) -> Result<()> {
    let bytes = encode(maze)?;
    fs::write(path.as_ref(), &bytes)?;
    debug!(path = %path.as_ref().display(), bytes = bytes.len(), "saved maze");
    Ok(())
}

/// Read a maze previously written by [`save`].
pub fn load(path: impl AsRef<Path>) -> Result<Maze> {
    let bytes = fs::read(path.as_ref())?;
    decode(&bytes)
}
