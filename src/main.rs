use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use sokoban_ids::levels::split_levels;
use sokoban_ids::replay::replay;
use sokoban_ids::{Board, SolveOutcome, SolverConfig, SolverKind};

/// Solve a Sokoban level with iterative-deepening search.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Level file, possibly holding several levels
    file: PathBuf,

    /// Which level of the file to solve, counting from 1
    #[arg(long, default_value_t = 1)]
    level: usize,

    /// pusher, puller, bidirectional, parallel-pusher or steps
    #[arg(long, default_value_t = SolverKind::Bidirectional)]
    solver: SolverKind,

    /// Replay the solution from the start and check it
    #[arg(long)]
    validate: bool,

    /// Print moves separated by spaces
    #[arg(long)]
    spaced: bool,

    #[arg(long, default_value_t = 3)]
    depth_step: u32,

    #[arg(long, default_value_t = 1000)]
    depth_limit: u32,

    /// Give up after expanding this many nodes
    #[arg(long)]
    max_nodes: Option<u64>,

    /// Give up after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Disable tunnel compression
    #[arg(long)]
    no_tunnels: bool,

    /// Disable the freeze deadlock check
    #[arg(long)]
    no_freeze: bool,
}

impl Args {
    fn config(&self) -> SolverConfig {
        SolverConfig::default()
            .with_depth_step(self.depth_step)
            .with_depth_limit(self.depth_limit)
            .with_node_budget(self.max_nodes)
            .with_time_budget(self.timeout_ms.map(Duration::from_millis))
            .with_tunnels(!self.no_tunnels)
            .with_freeze_deadlocks(!self.no_freeze)
    }
}

fn load(args: &Args) -> Result<Board, Box<dyn Error>> {
    let text = fs::read_to_string(&args.file)?;
    let levels = split_levels(&text);
    let level = args
        .level
        .checked_sub(1)
        .and_then(|i| levels.get(i))
        .ok_or_else(|| format!("level {} not found, the file holds {}", args.level, levels.len()))?;
    Ok(level.parse()?)
}

/// Returns whether a solution was found.
fn run(args: &Args) -> Result<bool, Box<dyn Error>> {
    let board = load(args)?;
    println!("{board}\n");

    let mut solver = args.solver.build(args.config());
    let started = Instant::now();
    let outcome = solver.solve(&board);
    let elapsed = started.elapsed();

    let solved = match &outcome {
        SolveOutcome::Solved(solution) => {
            if args.spaced {
                println!("{}", solution.spaced());
            } else {
                println!("{solution}");
            }
            println!("moves: {}, pushes: {}", solution.len(), solution.pushes());
            if args.validate {
                replay(&board, &solution.to_string())?;
                println!("solution verified");
            }
            true
        }
        other => {
            println!("{other}");
            false
        }
    };

    println!("solver: {}", args.solver);
    println!("nodes: {}", solver.iterations_count());
    println!("time: {:.3}s", elapsed.as_secs_f64());
    Ok(solved)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}
