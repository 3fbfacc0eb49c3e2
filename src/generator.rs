//! Procedural maze generation.
//!
//! Two modes are offered. `Walls` flips a coin for every interior wall and
//! retries until the result is solvable. `Path` carves a long random walk from
//! start to end, walls it into a corridor, drops ordered waypoints along it,
//! randomizes the rest of the grid and finally opens one side of any cell
//! that ended up boxed in. `Walls` confirms solvability with the depth-first
//! solver; `Path` checks its accepted walk as a solution with
//! [`verify_path`].

use std::collections::HashMap;

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::error::{MazeError, Result};
use crate::maze::{Maze, Position, Side, MAX_WAYPOINT};
use crate::solver::{solve_dfs, Path};
use crate::verify::verify_path;

/// Configuration for the generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Seed for reproducible output; `None` seeds from the OS
    pub seed: Option<u64>,
    /// Chance that an interior wall is present in `Walls` mode
    pub wall_probability: f64,
    /// Fraction of all cells the carved walk must cover
    pub min_coverage: f64,
    /// Toggle chance for wall pairs touching the corridor
    pub corridor_toggle_probability: f64,
    /// Toggle chance for wall pairs away from the corridor
    pub open_toggle_probability: f64,
    /// Maximum shift applied to each evenly spaced waypoint index
    pub index_jitter: usize,
    /// Give up after this many attempts; `None` retries forever
    pub max_attempts: Option<usize>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            wall_probability: 0.5,
            min_coverage: 0.7,
            corridor_toggle_probability: 0.2,
            open_toggle_probability: 0.5,
            index_jitter: 2,
            max_attempts: None,
        }
    }
}

/// Generation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Independent random interior walls, retried until solvable
    Walls,
    /// Random corridor with ordered waypoints
    Path,
}

/// Maze generator owning its random source.
pub struct Generator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn generate(&mut self, mode: GenerationMode, width: usize, height: usize) -> Result<Maze> {
        match mode {
            GenerationMode::Walls => self.generate_random_walls(width, height),
            GenerationMode::Path => self.generate_random_path(width, height),
        }
    }

    /// Randomize every interior wall until the maze has a solution.
    ///
    /// Without `max_attempts` this does not return for configurations that
    /// can never be solved.
    pub fn generate_random_walls(&mut self, width: usize, height: usize) -> Result<Maze> {
        let mut attempts = 0;
        loop {
            self.check_attempts(attempts)?;
            attempts += 1;

            let mut maze = corner_maze(width, height)?;
            for (pos, side) in interior_walls(&maze) {
                let present = self.chance(self.config.wall_probability);
                maze.set_wall(pos, side, present)?;
            }
            maze.clear_numbers();

            if !solve_dfs(&maze, true)?.is_empty() {
                debug!(width, height, attempts, "random walls produced a solvable maze");
                return Ok(maze);
            }
            trace!(attempts, "random walls left the maze unsolvable");
        }
    }

    /// Carve a corridor along a random walk covering most of the grid.
    pub fn generate_random_path(&mut self, width: usize, height: usize) -> Result<Maze> {
        let mut attempts = 0;
        loop {
            self.check_attempts(attempts)?;
            attempts += 1;

            let mut maze = corner_maze(width, height)?;
            let Some(walk) = self.random_walk(&maze)? else {
                trace!(attempts, "random walk fell short of the coverage target");
                continue;
            };

            wall_corridor(&mut maze, &walk)?;
            self.place_waypoints(&mut maze, &walk)?;
            self.randomize_walls(&mut maze, &walk)?;
            self.repair_boxed_cells(&mut maze)?;

            let solution = Path::from_cells(&maze, walk);
            if let Err(violation) = verify_path(&maze, &solution) {
                warn!(attempts, %violation, "carved maze failed validation, retrying");
                continue;
            }

            debug!(
                width,
                height,
                attempts,
                corridor = solution.len(),
                waypoints = maze.numbers().len(),
                "carved maze"
            );
            return Ok(maze);
        }
    }

    fn check_attempts(&self, attempts: usize) -> Result<()> {
        match self.config.max_attempts {
            Some(max) if attempts >= max => Err(MazeError::GenerationExhausted { attempts }),
            _ => Ok(()),
        }
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    /// Self-avoiding walk from start to end over an open grid. On a dead end
    /// the walk retreats up to `width + height` steps. The end is only
    /// entered once the walk is long enough to meet the coverage target.
    /// The move budget grows with the square of the cell count.
    fn random_walk(&mut self, maze: &Maze) -> Result<Option<Vec<Position>>> {
        let (start, end) = maze.endpoints()?;
        let cells = maze.cell_count();
        let required = ((cells as f64 * self.config.min_coverage).ceil() as usize).clamp(1, cells);
        let retreat_limit = maze.width() + maze.height();
        let step_budget = cells.saturating_mul(cells).saturating_mul(16).saturating_add(64);

        let mut walk = vec![start];
        let mut on_walk = maze.cell_set();
        on_walk.insert(start);
        if start == end {
            return Ok(Some(walk));
        }

        for _ in 0..step_budget {
            let Some(&tail) = walk.last() else {
                break;
            };
            let long_enough = walk.len() + 1 >= required;
            let candidates: SmallVec<[Position; 4]> = Side::ALL
                .into_iter()
                .map(|side| tail.step(side))
                .filter(|&next| maze.contains(next) && !on_walk.contains(next))
                .filter(|&next| next != end || long_enough)
                .collect();

            match candidates.choose(&mut self.rng) {
                Some(&next) => {
                    walk.push(next);
                    on_walk.insert(next);
                    if next == end {
                        return Ok(Some(walk));
                    }
                }
                None => {
                    let retreat = self.rng.gen_range(1..=retreat_limit).min(walk.len() - 1);
                    if retreat == 0 {
                        break;
                    }
                    for _ in 0..retreat {
                        if let Some(cell) = walk.pop() {
                            on_walk.remove(cell);
                        }
                    }
                }
            }
        }

        Ok(None)
    }

    /// Number cells along the walk 1..=k, where k is a quarter of
    /// `width + height`. Each waypoint sits one even step past the previous
    /// one, with the step jittered by up to `index_jitter`.
    fn place_waypoints(&mut self, maze: &mut Maze, walk: &[Position]) -> Result<()> {
        let wanted = (maze.width() + maze.height()) / 2 / 2;
        let count = wanted
            .min(usize::from(MAX_WAYPOINT))
            .min(walk.len().saturating_sub(2));
        if count == 0 {
            return Ok(());
        }

        let step = walk.len() / (count + 1);
        let jitter = self.config.index_jitter as isize;
        let mut previous = 0;
        for number in 1..=count {
            let shift = if jitter > 0 {
                self.rng.gen_range(-jitter..=jitter)
            } else {
                0
            };
            // Leave room for the remaining waypoints and keep the end free.
            let lowest = previous + 1;
            let highest = walk.len() - 2 - (count - number);
            let index = ((previous + step) as isize + shift).clamp(lowest as isize, highest as isize) as usize;

            maze.set_number(walk[index], Some(number as u8))?;
            previous = index;
        }
        Ok(())
    }

    /// Toggle walls off the corridor. Consecutive corridor cells are never
    /// touched; pairs touching the corridor toggle rarely, the rest evenly.
    fn randomize_walls(&mut self, maze: &mut Maze, walk: &[Position]) -> Result<()> {
        let order: HashMap<Position, usize> = walk.iter().enumerate().map(|(i, &p)| (p, i)).collect();

        for (pos, side) in interior_walls(maze) {
            let other = pos.step(side);
            let probability = match (order.get(&pos), order.get(&other)) {
                (Some(a), Some(b)) if a.abs_diff(*b) == 1 => continue,
                (None, None) => self.config.open_toggle_probability,
                _ => self.config.corridor_toggle_probability,
            };
            if self.chance(probability) {
                maze.toggle_wall(pos, side)?;
            }
        }
        Ok(())
    }

    /// Open one random inner side of every cell walled in on all sides.
    fn repair_boxed_cells(&mut self, maze: &mut Maze) -> Result<()> {
        let positions: Vec<Position> = maze.positions().collect();
        for pos in positions {
            if !maze.is_boxed(pos) {
                continue;
            }
            let inner: SmallVec<[Side; 4]> = Side::ALL
                .into_iter()
                .filter(|&side| maze.contains(pos.step(side)))
                .collect();
            if let Some(&side) = inner.choose(&mut self.rng) {
                trace!(%pos, ?side, "opening boxed cell");
                maze.set_wall(pos, side, false)?;
            }
        }
        Ok(())
    }
}

/// Fresh open maze with start top-left and end bottom-right.
fn corner_maze(width: usize, height: usize) -> Result<Maze> {
    let mut maze = Maze::new(width, height)?;
    maze.set_start(Position::new(0, 0))?;
    maze.set_end(Position::new(width as i32 - 1, height as i32 - 1))?;
    Ok(maze)
}

/// Every shared wall once, as the right or bottom side of its cell.
fn interior_walls(maze: &Maze) -> Vec<(Position, Side)> {
    maze.positions()
        .flat_map(|pos| [(pos, Side::Right), (pos, Side::Bottom)])
        .filter(|&(pos, side)| maze.contains(pos.step(side)))
        .collect()
}

/// Seal every cell of the walk except where consecutive cells meet.
fn wall_corridor(maze: &mut Maze, walk: &[Position]) -> Result<()> {
    for pair in walk.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        for side in Side::ALL {
            if a.step(side) != b {
                maze.set_wall(a, side, true)?;
            }
            if b.step(side) != a {
                maze.set_wall(b, side, true)?;
            }
        }
    }
    for pair in walk.windows(2) {
        if let Some(side) = pair[0].side_toward(pair[1]) {
            maze.set_wall(pair[0], side, false)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> Generator {
        Generator::new(GeneratorConfig {
            seed: Some(seed),
            ..Default::default()
        })
    }

    fn assert_solvable(maze: &Maze) {
        let solutions = solve_dfs(maze, true).unwrap();
        assert_eq!(solutions.len(), 1);
        assert!(verify_path(maze, &solutions[0]).is_ok());
    }

    #[test]
    fn test_random_walls_solvable_and_symmetric() {
        let mut generator = seeded(7);
        for _ in 0..5 {
            let maze = generator.generate_random_walls(6, 5).unwrap();
            assert!(maze.is_symmetric());
            assert_eq!(maze.start(), Some(Position::new(0, 0)));
            assert_eq!(maze.end(), Some(Position::new(5, 4)));
            assert!(maze.numbers().is_empty());
            assert_solvable(&maze);
        }
    }

    #[test]
    fn test_random_path_properties() {
        let mut generator = seeded(42);
        for _ in 0..5 {
            let maze = generator.generate_random_path(8, 6).unwrap();
            assert!(maze.is_symmetric());
            assert_eq!(maze.numbers(), &[1, 2, 3]);
            assert!(maze.positions().all(|pos| !maze.is_boxed(pos)));
            assert_solvable(&maze);
        }
    }

    #[test]
    fn test_random_path_larger_grid() {
        let mut generator = Generator::new(GeneratorConfig {
            seed: Some(11),
            max_attempts: Some(20),
            ..Default::default()
        });
        let maze = generator.generate_random_path(12, 12).unwrap();
        assert!(maze.is_symmetric());
        assert_eq!(maze.numbers(), &[1, 2, 3, 4, 5, 6]);
        assert!(maze.positions().all(|pos| !maze.is_boxed(pos)));
    }

    #[test]
    fn test_waypoints_follow_walk_order() {
        let mut generator = seeded(8);
        let mut maze = corner_maze(10, 2).unwrap();
        let walk: Vec<Position> = (0..10)
            .map(|x| Position::new(x, 0))
            .chain((0..10).rev().map(|x| Position::new(x, 1)))
            .collect();
        maze.set_end(Position::new(0, 1)).unwrap();
        wall_corridor(&mut maze, &walk).unwrap();
        generator.place_waypoints(&mut maze, &walk).unwrap();

        assert_eq!(maze.numbers(), &[1, 2, 3]);
        let indices: Vec<usize> = (1..=3)
            .map(|n| {
                let pos = maze.find_number(n).unwrap();
                walk.iter().position(|&p| p == pos).unwrap()
            })
            .collect();
        assert!(indices[0] >= 1);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        assert!(indices[2] <= walk.len() - 2);

        let solution = Path::from_cells(&maze, walk);
        assert_eq!(solution.last_seen_number, 3);
        assert!(verify_path(&maze, &solution).is_ok());
    }

    #[test]
    fn test_random_walk_covers_grid() {
        let mut generator = seeded(3);
        let maze = corner_maze(6, 6).unwrap();
        let walk = loop {
            if let Some(walk) = generator.random_walk(&maze).unwrap() {
                break walk;
            }
        };
        assert!(walk.len() >= 26);
        assert_eq!(walk.first(), Some(&Position::new(0, 0)));
        assert_eq!(walk.last(), Some(&Position::new(5, 5)));
        for pair in walk.windows(2) {
            assert!(pair[0].side_toward(pair[1]).is_some());
        }
    }

    #[test]
    fn test_corridor_is_single_width() {
        let mut maze = corner_maze(3, 3).unwrap();
        let walk = [
            Position::new(0, 0),
            Position::new(1, 0),
            Position::new(1, 1),
        ];
        wall_corridor(&mut maze, &walk).unwrap();
        assert_eq!(maze.wall_between(walk[0], walk[1]), Some(false));
        assert_eq!(maze.wall_between(walk[1], walk[2]), Some(false));
        assert_eq!(maze.wall_between(walk[0], Position::new(0, 1)), Some(true));
        assert_eq!(maze.wall_between(walk[2], Position::new(0, 1)), Some(true));
        assert!(maze.has_wall(walk[1], Side::Top));
        assert!(maze.is_symmetric());
    }

    #[test]
    fn test_same_seed_same_maze() {
        let a = seeded(99).generate_random_path(7, 7).unwrap();
        let b = seeded(99).generate_random_path(7, 7).unwrap();
        assert_eq!(a, b);
        let c = seeded(99).generate_random_walls(7, 7).unwrap();
        let d = seeded(99).generate_random_walls(7, 7).unwrap();
        assert_eq!(c, d);
    }

    #[test]
    fn test_attempt_cap() {
        let mut generator = Generator::new(GeneratorConfig {
            seed: Some(1),
            wall_probability: 1.0,
            max_attempts: Some(3),
            ..Default::default()
        });
        assert!(matches!(
            generator.generate_random_walls(2, 2),
            Err(MazeError::GenerationExhausted { attempts: 3 })
        ));
    }

    #[test]
    fn test_single_cell() {
        let mut generator = seeded(5);
        let maze = generator.generate(GenerationMode::Path, 1, 1).unwrap();
        assert_eq!(maze.start(), maze.end());
        assert!(maze.numbers().is_empty());
        assert!(generator.generate(GenerationMode::Walls, 0, 3).is_err());
    }
}
