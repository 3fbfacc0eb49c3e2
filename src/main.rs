//! CLI entry point for the waypoint maze tools.
//!
//! Usage:
//!   waypoint-maze generate --width <w> --height <h> --mode <walls|path> --out <FILE> [options]
//!   waypoint-maze solve <FILE> [--strategy <dfs|bfs|human>] [--all]
//!   waypoint-maze inspect <FILE>
//!
//! Generate options:
//!   --seed <n>                 Seed for reproducible mazes
//!   --wall-probability <f>     Interior wall chance in walls mode (default: 0.5)
//!   --min-coverage <f>         Fraction of cells the carved corridor covers (default: 0.7)
//!   --max-attempts <n>         Stop retrying after n attempts (default: unbounded)
//!
//! Logging goes to stderr and is controlled with RUST_LOG (default: warn).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use waypoint_maze::{
    codec, solve, verify_path, GenerationMode, Generator, GeneratorConfig, Maze, Path, PathMetrics,
    Position, Strategy,
};

#[derive(Parser)]
#[command(name = "waypoint-maze")]
#[command(about = "Generate, inspect and solve waypoint mazes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a solvable maze and write it to a file
    Generate {
        /// Grid width in cells
        #[arg(long, default_value = "15")]
        width: usize,

        /// Grid height in cells
        #[arg(long, default_value = "12")]
        height: usize,

        /// Generation mode
        #[arg(long, value_enum, default_value = "path")]
        mode: GenerationMode,

        /// Output file
        #[arg(long, value_name = "FILE")]
        out: PathBuf,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Chance of each interior wall in walls mode
        #[arg(long, default_value = "0.5")]
        wall_probability: f64,

        /// Fraction of cells the carved corridor must cover
        #[arg(long, default_value = "0.7")]
        min_coverage: f64,

        /// Give up after this many attempts
        #[arg(long)]
        max_attempts: Option<usize>,
    },

    /// Solve a maze file
    Solve {
        /// Path to maze file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Search strategy
        #[arg(long, value_enum, default_value = "dfs")]
        strategy: Strategy,

        /// Collect every solution instead of stopping at the first
        #[arg(long)]
        all: bool,
    },

    /// Print a summary of a maze file
    Inspect {
        /// Path to maze file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Output format for a maze summary
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MazeSummary {
    width: usize,
    height: usize,
    start: Option<Position>,
    end: Option<Position>,
    waypoints: Vec<u8>,
    symmetric: bool,
}

impl MazeSummary {
    fn of(maze: &Maze) -> Self {
        Self {
            width: maze.width(),
            height: maze.height(),
            start: maze.start(),
            end: maze.end(),
            waypoints: maze.numbers().to_vec(),
            symmetric: maze.is_symmetric(),
        }
    }
}

/// Output format for a solve run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveOutput {
    strategy: Strategy,
    solved: bool,
    solution_count: usize,
    solutions: Vec<SolutionOutput>,
}

#[derive(Debug, Serialize)]
struct SolutionOutput {
    path: Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<PathMetrics>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

/// Run a command; `Ok(false)` means it ran but found no solution.
fn run(command: Commands) -> Result<bool, Box<dyn std::error::Error>> {
    match command {
        Commands::Generate {
            width,
            height,
            mode,
            out,
            seed,
            wall_probability,
            min_coverage,
            max_attempts,
        } => {
            let config = GeneratorConfig {
                seed,
                wall_probability,
                min_coverage,
                max_attempts,
                ..Default::default()
            };
            let maze = Generator::new(config).generate(mode, width, height)?;
            codec::save(&maze, &out)?;
            println!("{}", serde_json::to_string_pretty(&MazeSummary::of(&maze))?);
            Ok(true)
        }

        Commands::Solve {
            file,
            strategy,
            all,
        } => {
            let maze = codec::load(&file)?;
            let solutions = solve(&maze, strategy, !all)?;
            let output = format_solutions(&maze, strategy, solutions);
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(output.solved)
        }

        Commands::Inspect { file } => {
            let maze = codec::load(&file)?;
            println!("{}", serde_json::to_string_pretty(&MazeSummary::of(&maze))?);
            Ok(true)
        }
    }
}

fn format_solutions(maze: &Maze, strategy: Strategy, solutions: Vec<Path>) -> SolveOutput {
    let solutions: Vec<SolutionOutput> = solutions
        .into_iter()
        .map(|path| SolutionOutput {
            metrics: verify_path(maze, &path).ok(),
            path,
        })
        .collect();

    SolveOutput {
        strategy,
        solved: !solutions.is_empty(),
        solution_count: solutions.len(),
        solutions,
    }
}
