//! Iterative-deepening Sokoban search.
//!
//! Parse a [`Board`] from its text form, then hand it to a [`Solver`]:
//!
//! ```
//! use sokoban_ids::{Board, Solver, SolverConfig, SolverKind};
//!
//! let board: Board = "####\n#@ #\n# $#\n# .#\n####".parse().unwrap();
//! let mut solver = SolverKind::Pusher.build(SolverConfig::default());
//! assert_eq!(solver.solve(&board).into_moves().as_deref(), Some("RD"));
//! ```

pub mod board;
pub mod bound;
pub mod config;
pub mod deadlock;
pub mod error;
pub mod levels;
pub mod position;
pub mod replay;
pub mod search;
pub mod solver;
pub mod zobrist;

pub use board::{Board, BoxMove, Cell};
pub use config::SolverConfig;
pub use error::{ParseError, ReplayError, UnknownSolver};
pub use position::{Direction, Position};
pub use search::SearchStatus;
pub use solver::{solve, SolveOutcome, Solution, Solver, SolverKind};
