use std::collections::VecDeque;

use smallvec::SmallVec;

use super::{deepen, CollisionRecord, Mode, Side, Steps, Successors};
use crate::board::{Board, BoxMove, Cell};
use crate::bound::lower_bound;
use crate::config::SolverConfig;
use crate::deadlock::{in_tunnel, is_freeze_deadlock};
use crate::position::{Direction, Position};
use crate::solver::{SolveOutcome, Solver};

/// Forward search over box pushes.
#[derive(Clone, Debug)]
pub(crate) struct PushMode {
    goals: Vec<Position>,
    tunnels: bool,
    freeze_deadlocks: bool,
}

/// An applied push, possibly several cells long.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PushUndo {
    from: Position,
    dir: Direction,
    len: i16,
    player: Position,
}

impl PushUndo {
    fn to(&self) -> Position {
        self.from.offset(self.dir, self.len)
    }
}

impl PushMode {
    pub fn new(board: &Board, config: &SolverConfig) -> Self {
        PushMode {
            goals: board.targets(),
            tunnels: config.tunnels,
            freeze_deadlocks: config.freeze_deadlocks,
        }
    }
}

impl Mode for PushMode {
    type Step = BoxMove;
    type Undo = PushUndo;

    fn goal_moves(&self, board: &Board) -> Option<VecDeque<Direction>> {
        board.is_solved().then(VecDeque::new)
    }

    fn successors(&self, board: &mut Board, _root: bool, out: &mut Steps<BoxMove>) -> Successors {
        let reach = board.find_reachable_pushable_boxes();
        out.extend(reach.moves);
        Successors {
            key: board.box_hash() ^ board.zobrist().player_key(reach.normalized),
            complete: true,
        }
    }

    fn apply(&self, board: &mut Board, step: BoxMove) -> Option<PushUndo> {
        let dir = step.dir;
        let mut to = step.box_pos.step(dir);
        let mut len = 1;
        if self.tunnels {
            while in_tunnel(board, dir, to)
                && !board.is(to, Cell::GOAL)
                && !board.is(to.step(dir), Cell::REJECT_BOX | Cell::GOAL)
            {
                to = to.step(dir);
                len += 1;
            }
        }

        let player = board.player();
        board.relocate_box(step.box_pos, to, to.step(dir.opposite()));
        let undo = PushUndo {
            from: step.box_pos,
            dir,
            len,
            player,
        };
        if self.freeze_deadlocks && is_freeze_deadlock(board, to) {
            self.revert(board, undo);
            return None;
        }
        Some(undo)
    }

    fn revert(&self, board: &mut Board, undo: PushUndo) {
        board.relocate_box(undo.to(), undo.from, undo.player);
    }

    fn cost(&self, undo: &PushUndo) -> u32 {
        undo.len as u32
    }

    fn lower_bound(&self, board: &Board) -> u32 {
        let boxes: SmallVec<[Position; 16]> = board.boxes().collect();
        lower_bound(&boxes, &self.goals)
    }

    fn extend(&self, board: &Board, undo: &PushUndo, _root: bool, moves: &mut VecDeque<Direction>) -> bool {
        let stand = undo.from.step(undo.dir.opposite());
        let Some(walk) = board.find_path(stand) else {
            return false;
        };
        for _ in 0..undo.len {
            moves.push_front(undo.dir);
        }
        for &dir in walk.iter().rev() {
            moves.push_front(dir);
        }
        true
    }

    fn record(&self, undo: &PushUndo, parent: u64) -> CollisionRecord {
        let box_pos = undo.to();
        CollisionRecord {
            dir: undo.dir,
            box_pos,
            player: box_pos.step(undo.dir.opposite()),
            length: undo.len,
            parent: Some(parent),
        }
    }
}

/// Iterative deepening over pushes from the starting position.
#[derive(Debug, Default)]
pub struct PushSolver {
    config: SolverConfig,
    nodes: u64,
}

impl PushSolver {
    pub fn new(config: SolverConfig) -> Self {
        PushSolver { config, nodes: 0 }
    }
}

impl Solver for PushSolver {
    fn solve(&mut self, board: &Board) -> SolveOutcome {
        let mut side = Side::new(PushMode::new(board, &self.config), board.clone());
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
    fn tunnel_push_slides_to_the_corridor_end() {
        let mut b = board("#########\n#@$    .#\n#########");
        let mode = PushMode::new(&b, &SolverConfig::default());
        let before = b.clone();
        let undo = mode
            .apply(&mut b, BoxMove { box_pos: Position::new(1, 2), dir: Direction::Right })
            .expect("live push");
        // stops in front of the goal cell
        assert_eq!(undo.to(), Position::new(1, 6));
        assert_eq!(mode.cost(&undo), 4);
        assert_eq!(b.player(), Position::new(1, 5));
        mode.revert(&mut b, undo);
        assert_eq!(b, before);
    }

    #[test]
    fn tunnels_can_be_disabled() {
        let mut b = board("#########\n#@$    .#\n#########");
        let mode = PushMode::new(&b, &SolverConfig::default().with_tunnels(false));
        let undo = mode
            .apply(&mut b, BoxMove { box_pos: Position::new(1, 2), dir: Direction::Right })
            .expect("live push");
        assert_eq!(mode.cost(&undo), 1);
    }

    #[test]
    fn frozen_push_is_rejected_untouched() {
        // pushing (4,3) up completes a 2x2 block
        let mut b = board("########\n#      #\n#  $$  #\n#   $  #\n#  $   #\n#  @   #\n#....  #\n########");
        let before = b.clone();
        let push_up = BoxMove { box_pos: Position::new(4, 3), dir: Direction::Up };

        let mode = PushMode::new(&b, &SolverConfig::default());
        assert!(mode.apply(&mut b, push_up).is_none());
        assert_eq!(b, before);

        let lenient = PushMode::new(&b, &SolverConfig::default().with_freeze_deadlocks(false));
        assert!(lenient.apply(&mut b, push_up).is_some());
    }

    #[test]
    fn solution_walk_is_prepended() {
        let mut b = board("####\n#@ #\n# $#\n# .#\n####");
        let mode = PushMode::new(&b, &SolverConfig::default());
        let step = BoxMove { box_pos: Position::new(2, 2), dir: Direction::Down };
        let undo = mode.apply(&mut b, step).expect("live push");
        assert!(mode.goal_moves(&b).is_some());
        mode.revert(&mut b, undo);
        let mut moves = VecDeque::new();
        assert!(mode.extend(&b, &undo, true, &mut moves));
        assert_eq!(moves, VecDeque::from(vec![Direction::Right, Direction::Down]));
    }

    #[test]
    fn solves_small_board() {
        let b = board("####\n#@ #\n# $#\n# .#\n####");
        let mut solver = PushSolver::new(SolverConfig::default());
        let outcome = solver.solve(&b);
        assert_eq!(outcome.into_moves().as_deref(), Some("RD"));
        assert!(solver.iterations_count() > 0);
    }

    #[test]
    fn boxed_in_board_is_proven_unsolvable() {
        let b = board("#######\n#@#$ .#\n#######");
        let mut solver = PushSolver::new(SolverConfig::default());
        assert_eq!(solver.solve(&b), SolveOutcome::NoSolution);
    }
}
