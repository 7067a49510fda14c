use std::collections::VecDeque;

use smallvec::SmallVec;

use super::{deepen, CollisionRecord, Mode, Side, Steps, Successors};
use crate::board::{Board, Cell};
use crate::bound::lower_bound;
use crate::config::SolverConfig;
use crate::deadlock::is_freeze_deadlock;
use crate::position::{Direction, Position};
use crate::solver::{SolveOutcome, Solver};

/// Search over single player steps, walking the board with
/// [`Board::make_move`] and [`Board::undo_move`].
#[derive(Clone, Debug)]
pub(crate) struct StepMode {
    goals: Vec<Position>,
    freeze_deadlocks: bool,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct StepUndo {
    dir: Direction,
}

impl StepMode {
    pub fn new(board: &Board, config: &SolverConfig) -> Self {
        StepMode {
            goals: board.targets(),
            freeze_deadlocks: config.freeze_deadlocks,
        }
    }
}

impl Mode for StepMode {
    type Step = Direction;
    type Undo = StepUndo;

    fn goal_moves(&self, board: &Board) -> Option<VecDeque<Direction>> {
        board.is_solved().then(VecDeque::new)
    }

    /// Keyed by the exact fingerprint. Steps back onto cells walked since
    /// the last push are skipped, which leaves the node incomplete.
    fn successors(&self, board: &mut Board, _root: bool, out: &mut Steps<Direction>) -> Successors {
        let open = board.open_directions();
        let complete = Direction::ALL
            .into_iter()
            .all(|dir| open.contains(&dir) || !board.is(board.player().step(dir), Cell::VISITED));
        out.extend(open);
        Successors {
            key: board.fingerprint(),
            complete,
        }
    }

    fn apply(&self, board: &mut Board, dir: Direction) -> Option<StepUndo> {
        let pushed = board.is(board.player().step(dir), Cell::BOX);
        board.make_move(dir);
        if pushed && self.freeze_deadlocks && is_freeze_deadlock(board, board.player().step(dir)) {
            self.revert(board, StepUndo { dir });
            return None;
        }
        Some(StepUndo { dir })
    }

    fn revert(&self, board: &mut Board, undo: StepUndo) {
        let undone = board.undo_move();
        assert_eq!(undone, Some(undo.dir), "reverted a step that was never made");
    }

    fn cost(&self, _undo: &StepUndo) -> u32 {
        1
    }

    fn lower_bound(&self, board: &Board) -> u32 {
        let boxes: SmallVec<[Position; 16]> = board.boxes().collect();
        lower_bound(&boxes, &self.goals)
    }

    fn extend(&self, _board: &Board, undo: &StepUndo, _root: bool, moves: &mut VecDeque<Direction>) -> bool {
        moves.push_front(undo.dir);
        true
    }

    fn record(&self, undo: &StepUndo, parent: u64) -> CollisionRecord {
        CollisionRecord {
            dir: undo.dir,
            length: 0,
            parent: Some(parent),
            ..CollisionRecord::root(Position::new(0, 0))
        }
    }
}

/// Iterative deepening over individual player moves.
#[derive(Debug, Default)]
pub struct StepSolver {
    config: SolverConfig,
    nodes: u64,
}

impl StepSolver {
    pub fn new(config: SolverConfig) -> Self {
        StepSolver { config, nodes: 0 }
    }
}

impl Solver for StepSolver {
    fn solve(&mut self, board: &Board) -> SolveOutcome {
        let mut side = Side::new(StepMode::new(board, &self.config), board.clone());
        let outcome = deepen(&mut side, board, &self.config);
        self.nodes += side.nodes;
        outcome
    }

    fn iterations_count(&self) -> u64 {
        self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(text: &str) -> Board {
        text.parse().expect("valid board")
    }

    #[test]
    fn walking_back_leaves_the_node_incomplete() {
        let mut b = board("######\n#@   #\n# $  #\n#  . #\n######");
        let mode = StepMode::new(&b, &SolverConfig::default());
        let mut steps = Steps::new();
        assert!(mode.successors(&mut b, true, &mut steps).complete);

        b.make_move(Direction::Right);
        let mut steps = Steps::new();
        let after = mode.successors(&mut b, false, &mut steps);
        assert!(!after.complete);
        assert!(!steps.contains(&Direction::Left));
        assert_eq!(after.key, b.fingerprint());
    }

    #[test]
    fn frozen_push_is_undone() {
        // pushing (3,2) down completes a 2x2 block off the goals
        let mut b = board("######\n#    #\n# @  #\n# $  #\n#  $ #\n# $$ #\n#    #\n#....#\n######");
        let before = b.clone();
        let mode = StepMode::new(&b, &SolverConfig::default());
        assert!(mode.apply(&mut b, Direction::Down).is_none());
        assert_eq!(b, before);
        assert_eq!(b.history_len(), 0);
    }

    #[test]
    #[should_panic(expected = "never made")]
    fn reverting_without_a_step_panics() {
        let mut b = board("####\n#@ #\n# $#\n# .#\n####");
        let mode = StepMode::new(&b, &SolverConfig::default());
        mode.revert(&mut b, StepUndo { dir: Direction::Right });
    }

    #[test]
    fn solves_small_board_in_two_steps() {
        let b = board("####\n#@ #\n# $#\n# .#\n####");
        let mut solver = StepSolver::new(SolverConfig::default());
        assert_eq!(solver.solve(&b).into_moves().as_deref(), Some("RD"));
    }

    #[test]
    fn boxed_in_board_is_proven_unsolvable() {
        let b = board("#######\n#@#$ .#\n#######");
        let mut solver = StepSolver::new(SolverConfig::default());
        assert_eq!(solver.solve(&b), SolveOutcome::NoSolution);
    }
}
