//! Grid model: cells, walls, start/end flags and waypoint numbers.
//!
//! Cells are stored densely in row-major order (`y * width + x`). Every wall
//! mutation goes through [`Maze::set_wall`], which keeps the two sides of a
//! shared wall in agreement.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{MazeError, Result};

/// Largest side length a maze may have (one byte in the file header).
pub const MAX_SIDE: usize = 255;

/// Largest waypoint number a cell may carry (four bits in the file format).
pub const MAX_WAYPOINT: u8 = 15;

/// Side of a cell. `y` grows downwards, so `Top` is `y - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    /// All sides, in the order neighbors are enumerated.
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    pub fn opposite(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Right => Side::Left,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Side::Top => (0, -1),
            Side::Right => (1, 0),
            Side::Bottom => (0, 1),
            Side::Left => (-1, 0),
        }
    }
}

/// Position on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The position one step across `side`.
    pub fn step(self, side: Side) -> Position {
        let (dx, dy) = side.delta();
        Position::new(self.x + dx, self.y + dy)
    }

    /// The side of `self` that faces `other`, if the two are orthogonally adjacent.
    pub fn side_toward(self, other: Position) -> Option<Side> {
        Side::ALL.into_iter().find(|&side| self.step(side) == other)
    }

    /// Straight-line distance between two positions.
    pub fn distance(self, other: Position) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Position::new(x, y)
    }
}

/// Wall flags of a single cell; `true` means the side is impassable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Walls {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Walls {
    pub fn get(&self, side: Side) -> bool {
        match side {
            Side::Top => self.top,
            Side::Right => self.right,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
        }
    }

    pub fn set(&mut self, side: Side, present: bool) {
        match side {
            Side::Top => self.top = present,
            Side::Right => self.right = present,
            Side::Bottom => self.bottom = present,
            Side::Left => self.left = present,
        }
    }
}

/// A cell on the grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub walls: Walls,
    pub number: Option<u8>,
    #[serde(rename = "isStart")]
    pub is_start: bool,
    #[serde(rename = "isEnd")]
    pub is_end: bool,
}

/// Dense membership set over the cells of one maze.
#[derive(Debug, Clone)]
pub struct CellSet {
    width: usize,
    height: usize,
    members: Vec<bool>,
}

impl CellSet {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            members: vec![false; width * height],
        }
    }

    fn index(&self, pos: Position) -> Option<usize> {
        let (x, y) = (usize::try_from(pos.x).ok()?, usize::try_from(pos.y).ok()?);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Insert a position; returns `false` if it was already present or off-grid.
    pub fn insert(&mut self, pos: Position) -> bool {
        match self.index(pos) {
            Some(i) if !self.members[i] => {
                self.members[i] = true;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, pos: Position) {
        if let Some(i) = self.index(pos) {
            self.members[i] = false;
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.index(pos).is_some_and(|i| self.members[i])
    }
}

/// A rectangular maze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Maze {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    start: Option<Position>,
    end: Option<Position>,
    /// Assigned waypoint numbers, ascending. Duplicates are kept.
    numbers: Vec<u8>,
}

impl Maze {
    /// Create a `width` x `height` maze with every wall open and no start,
    /// end or waypoints.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 || width > MAX_SIDE || height > MAX_SIDE {
            return Err(MazeError::InvalidSize { width, height });
        }
        Ok(Self {
            width,
            height,
            cells: vec![Cell::default(); width * height],
            start: None,
            end: None,
            numbers: Vec::new(),
        })
    }

    /// Replace this maze with a fresh one of the given size.
    pub fn reset(&mut self, width: usize, height: usize) -> Result<()> {
        *self = Maze::new(width, height)?;
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn start(&self) -> Option<Position> {
        self.start
    }

    pub fn end(&self) -> Option<Position> {
        self.end
    }

    /// Start and end together, or `MissingStartOrEnd`.
    pub fn endpoints(&self) -> Result<(Position, Position)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(MazeError::MissingStartOrEnd),
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.index(pos).is_some()
    }

    fn index(&self, pos: Position) -> Option<usize> {
        let (x, y) = (usize::try_from(pos.x).ok()?, usize::try_from(pos.y).ok()?);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    fn checked_index(&self, pos: Position) -> Result<usize> {
        self.index(pos).ok_or(MazeError::OutOfBounds {
            x: pos.x,
            y: pos.y,
            width: self.width,
            height: self.height,
        })
    }

    /// Get the cell at a position (bounds-checked)
    pub fn cell(&self, pos: Position) -> Option<&Cell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    /// All positions in row-major order (`y` outer, `x` inner).
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x as i32, y as i32)))
    }

    /// An empty [`CellSet`] sized for this maze.
    pub fn cell_set(&self) -> CellSet {
        CellSet::new(self.width, self.height)
    }

    /// Flag `pos` as the start, clearing the previous start cell.
    pub fn set_start(&mut self, pos: Position) -> Result<()> {
        let index = self.checked_index(pos)?;
        if let Some(old) = self.start.and_then(|p| self.index(p)) {
            self.cells[old].is_start = false;
        }
        self.cells[index].is_start = true;
        self.start = Some(pos);
        Ok(())
    }

    /// Flag `pos` as the end, clearing the previous end cell.
    pub fn set_end(&mut self, pos: Position) -> Result<()> {
        let index = self.checked_index(pos)?;
        if let Some(old) = self.end.and_then(|p| self.index(p)) {
            self.cells[old].is_end = false;
        }
        self.cells[index].is_end = true;
        self.end = Some(pos);
        Ok(())
    }

    pub fn has_wall(&self, pos: Position, side: Side) -> bool {
        self.cell(pos).is_some_and(|c| c.walls.get(side))
    }

    /// Set the wall on `side` of `pos` and the matching wall of the neighbor
    /// across it. Boundary sides have no neighbor to update.
    pub fn set_wall(&mut self, pos: Position, side: Side, present: bool) -> Result<()> {
        let index = self.checked_index(pos)?;
        self.cells[index].walls.set(side, present);
        if let Some(other) = self.index(pos.step(side)) {
            self.cells[other].walls.set(side.opposite(), present);
        }
        Ok(())
    }

    /// Flip the wall on `side` of `pos` (and its mirror on the neighbor).
    pub fn toggle_wall(&mut self, pos: Position, side: Side) -> Result<()> {
        let index = self.checked_index(pos)?;
        let present = !self.cells[index].walls.get(side);
        self.set_wall(pos, side, present)
    }

    /// Whether a wall separates two adjacent cells; `None` if they are not neighbors.
    pub fn wall_between(&self, a: Position, b: Position) -> Option<bool> {
        let side = a.side_toward(b)?;
        let cell = self.cell(a)?;
        self.cell(b)?;
        Some(cell.walls.get(side))
    }

    /// Overwrite one cell's walls without touching its neighbors. Used when
    /// decoding, where every cell's byte is authoritative.
    pub(crate) fn set_walls_raw(&mut self, pos: Position, walls: Walls) -> Result<()> {
        let index = self.checked_index(pos)?;
        self.cells[index].walls = walls;
        Ok(())
    }

    /// Assign (or clear, with `None`) the waypoint number of a cell, keeping
    /// the sorted number list in step.
    pub fn set_number(&mut self, pos: Position, number: Option<u8>) -> Result<()> {
        let index = self.checked_index(pos)?;
        if let Some(n) = number {
            validate_waypoint(n)?;
        }
        if let Some(old) = self.cells[index].number.take() {
            self.remove_number(old);
        }
        if let Some(n) = number {
            self.add_number(n)?;
            self.cells[index].number = Some(n);
        }
        Ok(())
    }

    /// Insert `n` into the ascending waypoint list.
    pub fn add_number(&mut self, n: u8) -> Result<()> {
        validate_waypoint(n)?;
        let at = self.numbers.partition_point(|&m| m <= n);
        self.numbers.insert(at, n);
        Ok(())
    }

    /// Remove one occurrence of `n`; returns whether it was present.
    pub fn remove_number(&mut self, n: u8) -> bool {
        match self.numbers.binary_search(&n) {
            Ok(at) => {
                self.numbers.remove(at);
                true
            }
            Err(_) => false,
        }
    }

    /// Remove every waypoint from the list and from the cells.
    pub fn clear_numbers(&mut self) {
        self.numbers.clear();
        for cell in &mut self.cells {
            cell.number = None;
        }
    }

    /// Assigned waypoint numbers in ascending order
    pub fn numbers(&self) -> &[u8] {
        &self.numbers
    }

    pub fn max_number(&self) -> Option<u8> {
        self.numbers.last().copied()
    }

    /// First cell (row-major) carrying waypoint `n`.
    pub fn find_number(&self, n: u8) -> Option<Position> {
        self.positions().find(|&p| self.cell(p).and_then(|c| c.number) == Some(n))
    }

    /// Whether a path that has seen waypoints up to `last_seen` may enter the end.
    pub fn all_waypoints_seen(&self, last_seen: u8) -> bool {
        self.max_number().map_or(true, |max| last_seen == max)
    }

    /// Orthogonal neighbors of `pos` that a path may step to next: on the
    /// grid, not walled off, not in `visited`, and admissible under the
    /// waypoint ordering rule given the highest number seen so far.
    pub fn legal_neighbors(
        &self,
        pos: Position,
        visited: &CellSet,
        last_seen: u8,
    ) -> SmallVec<[Position; 4]> {
        let mut neighbors = SmallVec::new();
        let Some(cell) = self.cell(pos) else {
            return neighbors;
        };

        for side in Side::ALL {
            if cell.walls.get(side) {
                continue;
            }
            let next = pos.step(side);
            let Some(neighbor) = self.cell(next) else {
                continue;
            };
            if visited.contains(next) {
                continue;
            }
            if let Some(n) = neighbor.number {
                if u16::from(n) != u16::from(last_seen) + 1 {
                    continue;
                }
            }
            if neighbor.is_end && !self.all_waypoints_seen(last_seen) {
                continue;
            }
            neighbors.push(next);
        }

        neighbors
    }

    /// Whether every shared wall agrees on both of its sides.
    pub fn is_symmetric(&self) -> bool {
        self.positions().all(|pos| {
            [Side::Right, Side::Bottom].into_iter().all(|side| {
                let next = pos.step(side);
                !self.contains(next) || self.has_wall(pos, side) == self.has_wall(next, side.opposite())
            })
        })
    }

    /// Whether `pos` is enclosed on every side, counting grid edges as walls.
    pub fn is_boxed(&self, pos: Position) -> bool {
        self.cell(pos).is_some_and(|cell| {
            Side::ALL
                .into_iter()
                .all(|side| cell.walls.get(side) || !self.contains(pos.step(side)))
        })
    }
}

fn validate_waypoint(n: u8) -> Result<()> {
    if n == 0 || n > MAX_WAYPOINT {
        return Err(MazeError::InvalidWaypoint(n));
    }
    Ok(())
}
