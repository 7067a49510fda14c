//! Depth-bounded search shared by every solver.
//!
//! A [`Mode`] says what one search step is (a push, a pull or a single player
//! move), how to apply and revert it on a [`Board`] and how to turn a found
//! solution back into player moves. [`node`] is the recursive search that
//! runs any mode under a bound, and [`deepen`] raises that bound until the
//! search succeeds, proves failure or runs out of room.

mod bidirectional;
mod parallel;
mod pull;
mod push;
mod step;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::board::Board;
use crate::config::SolverConfig;
use crate::position::{Direction, Position};
use crate::solver::{SolveOutcome, Solution};

pub use bidirectional::BidirectionalSolver;
pub use parallel::ParallelPushSolver;
pub use pull::PullSolver;
pub use push::PushSolver;
pub use step::StepSolver;

/// Result of searching one subtree under a bound.
#[derive(Clone, Debug, PartialEq, Eq, derive_more::IsVariant)]
pub enum SearchStatus {
    /// Player moves that finish the puzzle from this node.
    Solution(VecDeque<Direction>),
    /// The bound, a revisit or the budget stopped the search somewhere below.
    Inconclusive,
    /// Nothing below this node can ever solve the puzzle.
    Failed,
    /// This node's key was already reached by the opposite search.
    Met(u64),
}

/// Keys and available steps of one node.
pub(crate) struct Successors {
    pub key: u64,
    /// False when some move was held back for a reason other than a dead
    /// end, so running out of children proves nothing.
    pub complete: bool,
}

pub(crate) type Steps<S> = SmallVec<[S; 16]>;

pub(crate) trait Mode: Sync {
    type Step: Copy + Send + Sync;
    type Undo: Copy;

    /// Moves that finish the puzzle from `board`, if it is a finished state.
    fn goal_moves(&self, board: &Board) -> Option<VecDeque<Direction>>;

    /// Fills `out` with the steps to try and returns the node's key.
    fn successors(&self, board: &mut Board, root: bool, out: &mut Steps<Self::Step>) -> Successors;

    /// Applies `step`, or returns `None` with the board untouched when the
    /// result is already known to be dead.
    fn apply(&self, board: &mut Board, step: Self::Step) -> Option<Self::Undo>;

    fn revert(&self, board: &mut Board, undo: Self::Undo);

    /// Bound consumed by an applied step.
    fn cost(&self, undo: &Self::Undo) -> u32;

    /// Admissible estimate of the bound still needed from `board`.
    fn lower_bound(&self, board: &Board) -> u32;

    /// Adds the player moves of `undo` to `moves`, the solution found below
    /// it. `board` is back in the state before `undo` was applied.
    fn extend(&self, board: &Board, undo: &Self::Undo, root: bool, moves: &mut VecDeque<Direction>) -> bool;

    /// How the node reached through `undo` is remembered for rendezvous.
    fn record(&self, undo: &Self::Undo, parent: u64) -> CollisionRecord;

    /// Whether the root's key is comparable with the other side's keys.
    fn meets_at_root(&self) -> bool {
        true
    }
}

/// How a search side first reached a key: the box move that produced it and
/// the key it came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct CollisionRecord {
    pub dir: Direction,
    /// Where the moved box ended up.
    pub box_pos: Position,
    /// Where the player ended up.
    pub player: Position,
    /// Cells the box travelled; zero for a root.
    pub length: i16,
    pub parent: Option<u64>,
}

impl CollisionRecord {
    pub fn root(player: Position) -> Self {
        CollisionRecord {
            dir: Direction::Up,
            box_pos: player,
            player,
            length: 0,
            parent: None,
        }
    }
}

/// Every key one side of a bidirectional search has entered, across
/// iterations. The first record for a key is kept, so parent chains always
/// lead back to the root.
#[derive(Default, Debug)]
pub(crate) struct SideMap {
    records: FxHashMap<u64, CollisionRecord>,
}

impl SideMap {
    pub fn insert(&mut self, key: u64, record: CollisionRecord) {
        self.records.entry(key).or_insert(record);
    }

    pub fn contains(&self, key: u64) -> bool {
        self.records.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records from `key` back to the root, root excluded.
    pub fn chain(&self, key: u64) -> Option<Vec<CollisionRecord>> {
        let mut chain = Vec::new();
        let mut at = key;
        loop {
            let record = *self.records.get(&at)?;
            let Some(parent) = record.parent else {
                return Some(chain);
            };
            chain.push(record);
            if chain.len() > self.records.len() {
                return None;
            }
            at = parent;
        }
    }
}

pub(crate) struct Collisions<'a> {
    pub ours: &'a mut SideMap,
    pub theirs: &'a SideMap,
}

/// Node and time ceiling shared by everything one solve runs, including
/// parallel workers.
#[derive(Debug)]
pub(crate) struct Budget {
    spent: AtomicU64,
    exhausted: AtomicBool,
    node_limit: Option<u64>,
    deadline: Option<Instant>,
}

impl Budget {
    pub fn new(config: &SolverConfig) -> Self {
        Budget {
            spent: AtomicU64::new(0),
            exhausted: AtomicBool::new(false),
            node_limit: config.node_budget,
            deadline: config.time_budget.map(|t| Instant::now() + t),
        }
    }

    /// Counts one expanded node; false once the budget is used up.
    pub fn charge(&self) -> bool {
        if self.exhausted.load(Ordering::Relaxed) {
            return false;
        }
        let spent = self.spent.fetch_add(1, Ordering::Relaxed) + 1;
        let over_nodes = self.node_limit.is_some_and(|limit| spent > limit);
        let over_time = spent % 256 == 0 && self.deadline.is_some_and(|d| Instant::now() >= d);
        if over_nodes || over_time {
            self.exhausted.store(true, Ordering::Relaxed);
            return false;
        }
        true
    }
}

/// Per-iteration state of one search side.
pub(crate) struct SearchContext<'a> {
    /// Keys proven dead in earlier iterations.
    pub failed: &'a FxHashSet<u64>,
    /// Keys proven dead in this iteration.
    pub new_failed: FxHashSet<u64>,
    /// Remaining bound each key was entered with this iteration.
    pub visited: FxHashMap<u64, u32>,
    pub nodes: u64,
    /// Some node was cut off by the bound.
    pub cutoff: bool,
    pub aborted: bool,
    pub budget: &'a Budget,
    pub collisions: Option<Collisions<'a>>,
}

impl<'a> SearchContext<'a> {
    pub fn new(failed: &'a FxHashSet<u64>, budget: &'a Budget, collisions: Option<Collisions<'a>>) -> Self {
        SearchContext {
            failed,
            new_failed: FxHashSet::default(),
            visited: FxHashMap::default(),
            nodes: 0,
            cutoff: false,
            aborted: false,
            budget,
            collisions,
        }
    }

    fn is_failed(&self, key: u64) -> bool {
        self.failed.contains(&key) || self.new_failed.contains(&key)
    }
}

/// Searches the subtree below `board` with `depth` bound left.
pub(crate) fn node<M: Mode>(
    mode: &M,
    ctx: &mut SearchContext<'_>,
    board: &mut Board,
    depth: u32,
    root: bool,
    record: CollisionRecord,
) -> SearchStatus {
    if let Some(moves) = mode.goal_moves(board) {
        return SearchStatus::Solution(moves);
    }

    ctx.nodes += 1;
    if !ctx.budget.charge() {
        ctx.aborted = true;
        return SearchStatus::Inconclusive;
    }

    let mut steps = Steps::new();
    let Successors { key, complete } = mode.successors(board, root, &mut steps);

    if ctx.is_failed(key) {
        return SearchStatus::Failed;
    }

    if let Some(collisions) = ctx.collisions.as_mut() {
        collisions.ours.insert(key, record);
        if (!root || mode.meets_at_root()) && collisions.theirs.contains(key) {
            log::trace!("met the opposite search at {key:#018x}");
            return SearchStatus::Met(key);
        }
    }

    if ctx.visited.get(&key).is_some_and(|&seen| seen >= depth) {
        return SearchStatus::Inconclusive;
    }
    ctx.visited.insert(key, depth);

    if depth == 0 || mode.lower_bound(board) > depth {
        ctx.cutoff = true;
        return SearchStatus::Inconclusive;
    }

    let mut all_failed = complete;
    for step in steps {
        let Some(undo) = mode.apply(board, step) else {
            continue;
        };
        let cost = mode.cost(&undo);
        let status = if cost > depth {
            ctx.cutoff = true;
            SearchStatus::Inconclusive
        } else {
            node(mode, ctx, board, depth - cost, false, mode.record(&undo, key))
        };
        mode.revert(board, undo);

        match status {
            SearchStatus::Solution(mut moves) => {
                if mode.extend(board, &undo, root, &mut moves) {
                    return SearchStatus::Solution(moves);
                }
                log::error!("could not rebuild the player walk of a solution");
                ctx.cutoff = true;
                all_failed = false;
            }
            SearchStatus::Met(met) => return SearchStatus::Met(met),
            SearchStatus::Failed => {}
            SearchStatus::Inconclusive => all_failed = false,
        }
        if ctx.aborted {
            return SearchStatus::Inconclusive;
        }
    }

    if all_failed {
        ctx.new_failed.insert(key);
        SearchStatus::Failed
    } else {
        SearchStatus::Inconclusive
    }
}

/// Outcome of one bounded pass.
#[derive(Debug)]
pub(crate) struct Iteration {
    pub status: SearchStatus,
    pub cutoff: bool,
    pub aborted: bool,
    pub nodes: u64,
}

impl Iteration {
    /// The pass saw every reachable state, so no bound will ever help.
    pub fn proves_unsolvable(&self) -> bool {
        match self.status {
            SearchStatus::Failed => true,
            SearchStatus::Inconclusive => !self.cutoff && !self.aborted,
            _ => false,
        }
    }
}

/// One direction of search: a mode, its working board and what it has
/// learned so far.
pub(crate) struct Side<M: Mode> {
    pub mode: M,
    pub board: Board,
    pub failed: FxHashSet<u64>,
    pub nodes: u64,
}

impl<M: Mode> Side<M> {
    pub fn new(mode: M, mut board: Board) -> Self {
        board.commit();
        Side {
            mode,
            board,
            failed: FxHashSet::default(),
            nodes: 0,
        }
    }

    pub fn initial_bound(&self) -> u32 {
        self.mode.lower_bound(&self.board)
    }

    /// Runs a single pass under `bound`.
    pub fn iterate(&mut self, bound: u32, budget: &Budget, collisions: Option<Collisions<'_>>) -> Iteration {
        let root = CollisionRecord::root(self.board.player());
        let mut ctx = SearchContext::new(&self.failed, budget, collisions);
        let status = node(&self.mode, &mut ctx, &mut self.board, bound, true, root);

        let SearchContext {
            new_failed,
            nodes,
            cutoff,
            aborted,
            ..
        } = ctx;
        self.failed.extend(new_failed);
        self.nodes += nodes;
        debug_assert_eq!(self.board.history_len(), 0);

        Iteration {
            status,
            cutoff,
            aborted,
            nodes,
        }
    }
}

/// Next bound after `bound`, or `None` past the ceiling.
pub(crate) fn next_bound(bound: u32, config: &SolverConfig) -> Option<u32> {
    let next = bound.saturating_add(config.depth_step.max(1));
    (next <= config.depth_limit).then_some(next)
}

/// Iterative deepening of a single side from its lower bound.
pub(crate) fn deepen<M: Mode>(side: &mut Side<M>, start: &Board, config: &SolverConfig) -> SolveOutcome {
    let budget = Budget::new(config);
    let initial = side.initial_bound();
    deepen_with(start, initial, config, |bound| side.iterate(bound, &budget, None))
}

/// Calls `pass` with growing bounds until it solves `start`, proves it
/// unsolvable or hits a limit.
pub(crate) fn deepen_with(
    start: &Board,
    initial: u32,
    config: &SolverConfig,
    mut pass: impl FnMut(u32) -> Iteration,
) -> SolveOutcome {
    let mut bound = initial;
    if bound > config.depth_limit {
        return SolveOutcome::DepthExhausted;
    }

    loop {
        let iteration = pass(bound);
        log::debug!("bound {bound}: {} nodes, cutoff={}", iteration.nodes, iteration.cutoff);

        if let SearchStatus::Solution(moves) = iteration.status {
            match Solution::check(start, moves) {
                Ok(solution) => return SolveOutcome::Solved(solution),
                Err(err) => log::error!("discarding invalid solution at bound {bound}: {err}"),
            }
        } else if iteration.proves_unsolvable() {
            return SolveOutcome::NoSolution;
        }
        if iteration.aborted {
            log::warn!("search budget exhausted at bound {bound}");
            return SolveOutcome::BudgetExhausted;
        }
        match next_bound(bound, config) {
            Some(next) => bound = next,
            None => return SolveOutcome::DepthExhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(parent: Option<u64>) -> CollisionRecord {
        CollisionRecord {
            parent,
            length: 1,
            ..CollisionRecord::root(Position::new(1, 1))
        }
    }

    #[test]
    fn side_map_keeps_first_record_and_walks_chains() {
        let mut map = SideMap::default();
        map.insert(1, CollisionRecord::root(Position::new(1, 1)));
        map.insert(2, record(Some(1)));
        map.insert(3, record(Some(2)));
        map.insert(3, record(Some(1)));

        let chain = map.chain(3).expect("chain");
        assert_eq!(chain.iter().map(|r| r.parent).collect::<Vec<_>>(), vec![Some(2), Some(1)]);
        assert_eq!(map.chain(1), Some(Vec::new()));
        assert_eq!(map.chain(9), None);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn budget_stops_after_node_limit() {
        let config = SolverConfig::default().with_node_budget(Some(2));
        let budget = Budget::new(&config);
        assert!(budget.charge());
        assert!(budget.charge());
        assert!(!budget.charge());
        assert!(!budget.charge());
    }

    #[test]
    fn deadline_is_checked_every_256_nodes() {
        let config = SolverConfig::default().with_time_budget(Some(std::time::Duration::ZERO));
        let budget = Budget::new(&config);
        assert!((1..256).all(|_| budget.charge()));
        assert!(!budget.charge());
        assert!(!budget.charge());
    }

    #[test]
    fn bounds_grow_by_step_up_to_limit() {
        let config = SolverConfig::default().with_depth_step(3).with_depth_limit(7);
        assert_eq!(next_bound(2, &config), Some(5));
        assert_eq!(next_bound(5, &config), None);
    }

    #[test]
    fn exhaustion_without_cutoff_proves_failure() {
        let it = |status, cutoff, aborted| Iteration {
            status,
            cutoff,
            aborted,
            nodes: 0,
        };
        assert!(it(SearchStatus::Failed, true, false).proves_unsolvable());
        assert!(it(SearchStatus::Inconclusive, false, false).proves_unsolvable());
        assert!(!it(SearchStatus::Inconclusive, true, false).proves_unsolvable());
        assert!(!it(SearchStatus::Inconclusive, false, true).proves_unsolvable());
    }
}
