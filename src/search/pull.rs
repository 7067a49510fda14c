use std::collections::VecDeque;

use smallvec::SmallVec;

use super::{deepen, CollisionRecord, Mode, Side, Steps, Successors};
use crate::board::{Board, BoxMove};
use crate::bound::lower_bound;
use crate::config::SolverConfig;
use crate::position::{Direction, Position};
use crate::solver::{SolveOutcome, Solver};

/// Backward search over box pulls on the [reversed](Board::reversed) board.
///
/// The root is special: the player may start next to any box, since the
/// forward solution's last push can come from anywhere.
#[derive(Clone, Debug)]
pub(crate) struct PullMode {
    starts: Vec<Position>,
    player_start: Position,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct PullUndo {
    from: Position,
    dir: Direction,
    player: Position,
}

impl PullMode {
    /// `reversed` is the board the search runs on; its player still stands
    /// on the real start.
    pub fn new(reversed: &Board) -> Self {
        PullMode {
            starts: reversed.targets(),
            player_start: reversed.player(),
        }
    }
}

impl Mode for PullMode {
    type Step = BoxMove;
    type Undo = PullUndo;

    /// Every box is back on its starting cell and the real player start is
    /// inside the current region; the forward solution begins with the
    /// walk from there.
    fn goal_moves(&self, board: &Board) -> Option<VecDeque<Direction>> {
        if board.boxes_off_start() != 0 {
            return None;
        }
        board.path_between(self.player_start, board.player()).map(VecDeque::from)
    }

    fn successors(&self, board: &mut Board, root: bool, out: &mut Steps<BoxMove>) -> Successors {
        if root {
            out.extend(board.all_pulls());
            return Successors {
                key: board.box_hash(),
                complete: true,
            };
        }
        let reach = board.find_reachable_pullable_boxes();
        out.extend(reach.moves);
        Successors {
            key: board.box_hash() ^ board.zobrist().player_key(reach.normalized),
            complete: true,
        }
    }

    fn apply(&self, board: &mut Board, step: BoxMove) -> Option<PullUndo> {
        let player = board.player();
        let to = step.box_pos.step(step.dir);
        board.relocate_box(step.box_pos, to, to.step(step.dir));
        Some(PullUndo {
            from: step.box_pos,
            dir: step.dir,
            player,
        })
    }

    fn revert(&self, board: &mut Board, undo: PullUndo) {
        board.relocate_box(undo.from.step(undo.dir), undo.from, undo.player);
    }

    fn cost(&self, _undo: &PullUndo) -> u32 {
        1
    }

    fn lower_bound(&self, board: &Board) -> u32 {
        let boxes: SmallVec<[Position; 16]> = board.boxes().collect();
        lower_bound(&boxes, &self.starts)
    }

    /// The forward replay of a pull is a push back the other way, followed
    /// by the walk back to where this node's player stood.
    fn extend(&self, board: &Board, undo: &PullUndo, root: bool, moves: &mut VecDeque<Direction>) -> bool {
        moves.push_back(undo.dir.opposite());
        if root {
            return true;
        }
        let Some(walk) = board.path_between(undo.from.step(undo.dir), undo.player) else {
            return false;
        };
        moves.extend(walk);
        true
    }

    fn record(&self, undo: &PullUndo, parent: u64) -> CollisionRecord {
        let box_pos = undo.from.step(undo.dir);
        CollisionRecord {
            dir: undo.dir,
            box_pos,
            player: box_pos.step(undo.dir),
            length: 1,
            parent: Some(parent),
        }
    }

    fn meets_at_root(&self) -> bool {
        false
    }
}

/// Iterative deepening over pulls from the solved position back to the start.
#[derive(Debug, Default)]
pub struct PullSolver {
    config: SolverConfig,
    nodes: u64,
}

impl PullSolver {
    pub fn new(config: SolverConfig) -> Self {
        PullSolver { config, nodes: 0 }
    }
}

impl Solver for PullSolver {
    fn solve(&mut self, board: &Board) -> SolveOutcome {
        let reversed = board.reversed();
        let mut side = Side::new(PullMode::new(&reversed), reversed);
        let outcome = deepen(&mut side, board, &self.config);
        self.nodes += side.nodes;
        outcome
    }

    fn iterations_count(&self) -> u64 {
        self.nodes
    }
}
