use std::fmt;
use std::str::FromStr;

use crate::board::Board;
use crate::config::SolverConfig;
use crate::error::{ReplayError, UnknownSolver};
use crate::position::Direction;
use crate::replay::replay_directions;
use crate::search::{BidirectionalSolver, ParallelPushSolver, PullSolver, PushSolver, StepSolver};

/// A checked move sequence that takes its board from start to solved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    moves: Vec<Direction>,
    pushes: usize,
}

impl Solution {
    /// Replays `moves` from `start` and keeps them only if they solve it.
    pub fn check(start: &Board, moves: impl IntoIterator<Item = Direction>) -> Result<Self, ReplayError> {
        let moves: Vec<Direction> = moves.into_iter().collect();
        let replayed = replay_directions(start, moves.iter().copied())?;
        Ok(Solution {
            moves,
            pushes: replayed.pushes,
        })
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn pushes(&self) -> usize {
        self.pushes
    }

    /// Moves separated by single spaces, e.g. `"R D"`.
    pub fn spaced(&self) -> String {
        let mut out = String::with_capacity(self.moves.len() * 2);
        for (i, dir) in self.moves.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push(dir.to_char());
        }
        out
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.moves.iter().try_for_each(|dir| write!(f, "{dir}"))
    }
}

/// How a solve ended.
#[derive(Clone, Debug, PartialEq, Eq, derive_more::Display, derive_more::IsVariant)]
pub enum SolveOutcome {
    #[display("{_0}")]
    Solved(Solution),
    /// Proven unsolvable.
    #[display("no solution")]
    NoSolution,
    #[display("maximum depth reached")]
    DepthExhausted,
    #[display("search budget exhausted")]
    BudgetExhausted,
}

impl SolveOutcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SolveOutcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    /// The move string, if solved.
    pub fn into_moves(self) -> Option<String> {
        match self {
            SolveOutcome::Solved(solution) => Some(solution.to_string()),
            _ => None,
        }
    }
}

pub trait Solver {
    fn solve(&mut self, board: &Board) -> SolveOutcome;

    /// Search nodes expanded over every call to [`Solver::solve`].
    fn iterations_count(&self) -> u64;
}

/// Every solver this crate provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SolverKind {
    Pusher,
    Puller,
    #[default]
    Bidirectional,
    ParallelPusher,
    Steps,
}

impl SolverKind {
    pub const ALL: [SolverKind; 5] = [
        SolverKind::Pusher,
        SolverKind::Puller,
        SolverKind::Bidirectional,
        SolverKind::ParallelPusher,
        SolverKind::Steps,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            SolverKind::Pusher => "pusher",
            SolverKind::Puller => "puller",
            SolverKind::Bidirectional => "bidirectional",
            SolverKind::ParallelPusher => "parallel-pusher",
            SolverKind::Steps => "steps",
        }
    }

    pub fn build(self, config: SolverConfig) -> Box<dyn Solver + Send> {
        match self {
            SolverKind::Pusher => Box::new(PushSolver::new(config)),
            SolverKind::Puller => Box::new(PullSolver::new(config)),
            SolverKind::Bidirectional => Box::new(BidirectionalSolver::new(config)),
            SolverKind::ParallelPusher => Box::new(ParallelPushSolver::new(config)),
            SolverKind::Steps => Box::new(StepSolver::new(config)),
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverKind {
    type Err = UnknownSolver;

    fn from_str(name: &str) -> Result<Self, UnknownSolver> {
        let wanted = name.trim().to_ascii_lowercase().replace('_', "-");
        SolverKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| UnknownSolver { name: name.to_owned() })
    }
}

/// Solves `board` with the default solver and settings.
pub fn solve(board: &Board) -> Option<String> {
    let mut solver = SolverKind::default().build(SolverConfig::default());
    let outcome = solver.solve(board);
    log::info!("{} after {} nodes", outcome, solver.iterations_count());
    outcome.into_moves()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "####\n#@ #\n# $#\n# .#\n####";

    #[test]
    fn solution_formats() {
        let board: Board = SIMPLE.parse().expect("valid board");
        let solution = Solution::check(&board, [Direction::Right, Direction::Down]).expect("solves");
        assert_eq!(solution.to_string(), "RD");
        assert_eq!(solution.spaced(), "R D");
        assert_eq!(solution.pushes(), 1);
        assert_eq!(solution.len(), 2);
        assert!(Solution::check(&board, [Direction::Right]).is_err());
    }

    #[test]
    fn kinds_round_trip_through_names() {
        for kind in SolverKind::ALL {
            assert_eq!(kind.name().parse::<SolverKind>(), Ok(kind));
        }
        assert_eq!("Parallel_Pusher".parse::<SolverKind>(), Ok(SolverKind::ParallelPusher));
        assert!("astar".parse::<SolverKind>().is_err());
    }

    #[test]
    fn every_kind_solves_the_simple_board() {
        let board: Board = SIMPLE.parse().expect("valid board");
        for kind in SolverKind::ALL {
            let mut solver = kind.build(SolverConfig::default());
            let outcome = solver.solve(&board);
            assert_eq!(outcome.solution().map(Solution::pushes), Some(1), "{kind}");
        }
    }

    #[test]
    fn top_level_solve() {
        let board: Board = SIMPLE.parse().expect("valid board");
        assert_eq!(solve(&board).as_deref(), Some("RD"));
        let stuck: Board = "#######\n#@#$ .#\n#######".parse().expect("valid board");
        assert_eq!(solve(&stuck), None);
    }

    #[test]
    fn outcome_messages() {
        assert_eq!(SolveOutcome::NoSolution.to_string(), "no solution");
        assert_eq!(SolveOutcome::DepthExhausted.to_string(), "maximum depth reached");
        assert!(SolveOutcome::BudgetExhausted.is_budget_exhausted());
    }
}
