use crate::position::{Direction, Position};

/// Errors produced while reading a board from its text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ParseError {
    #[display("board is empty")]
    Empty,
    #[display("board has no player")]
    MissingPlayer,
    #[display("board has more than one player: {first} and {second}")]
    MultiplePlayers { first: Position, second: Position },
    #[display("unknown board character {ch:?} at row {row}, column {col}")]
    UnknownChar { ch: char, row: usize, col: usize },
    #[display("board has {boxes} boxes but {goals} goals")]
    BoxGoalMismatch { boxes: usize, goals: usize },
    #[display("board of {width}x{height} cells is too large")]
    TooLarge { width: usize, height: usize },
}

/// Errors produced while replaying a move string against a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ReplayError {
    #[display("unknown move character {ch:?} at index {index}")]
    UnknownMove { ch: char, index: usize },
    #[display("move {dir} at index {index} is blocked")]
    Blocked { dir: Direction, index: usize },
    #[display("{remaining} goals are still uncovered after the last move")]
    Unsolved { remaining: usize },
}

/// A solver name that [`SolverKind`](crate::solver::SolverKind) does not know.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown solver {name:?} (expected pusher, puller, bidirectional, parallel-pusher or steps)")]
pub struct UnknownSolver {
    pub name: String,
}
