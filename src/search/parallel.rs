use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use super::push::PushMode;
use super::{deepen_with, node, Budget, Iteration, Mode, SearchContext, SearchStatus, Steps};
use crate::board::{Board, BoxMove};
use crate::config::SolverConfig;
use crate::solver::{SolveOutcome, Solver};

/// The pusher with the root's branches spread over the rayon pool.
///
/// Each branch works on its own board clone and visited map. Keys proven
/// dead in earlier iterations are shared read-only; new ones are collected
/// under a lock and published when the iteration ends.
#[derive(Debug, Default)]
pub struct ParallelPushSolver {
    config: SolverConfig,
    nodes: u64,
}

impl ParallelPushSolver {
    pub fn new(config: SolverConfig) -> Self {
        ParallelPushSolver { config, nodes: 0 }
    }
}

struct Branch {
    status: SearchStatus,
    cutoff: bool,
    aborted: bool,
    nodes: u64,
}

impl Branch {
    fn dead() -> Self {
        Branch {
            status: SearchStatus::Failed,
            cutoff: false,
            aborted: false,
            nodes: 0,
        }
    }
}

/// What every branch of one pass reads or adds to.
struct Shared<'a> {
    /// Keys proven dead before this pass.
    failed: &'a FxHashSet<u64>,
    /// Keys the branches prove dead during this pass.
    pending: Mutex<FxHashSet<u64>>,
    budget: &'a Budget,
}

fn run_branch(mode: &PushMode, root: &Board, root_key: u64, step: BoxMove, bound: u32, shared: &Shared<'_>) -> Branch {
    let mut board = root.clone();
    let Some(undo) = mode.apply(&mut board, step) else {
        return Branch::dead();
    };
    let cost = mode.cost(&undo);
    if cost > bound {
        return Branch {
            status: SearchStatus::Inconclusive,
            cutoff: true,
            ..Branch::dead()
        };
    }

    let mut ctx = SearchContext::new(shared.failed, shared.budget, None);
    ctx.visited.insert(root_key, bound);
    let mut status = node(mode, &mut ctx, &mut board, bound - cost, false, mode.record(&undo, root_key));
    mode.revert(&mut board, undo);

    if let SearchStatus::Solution(moves) = &mut status {
        if !mode.extend(&board, &undo, true, moves) {
            log::error!("could not rebuild the player walk of a solution");
            status = SearchStatus::Inconclusive;
            ctx.cutoff = true;
        }
    }

    shared.pending.lock().extend(ctx.new_failed.drain());
    Branch {
        status,
        cutoff: ctx.cutoff,
        aborted: ctx.aborted,
        nodes: ctx.nodes,
    }
}

/// One bounded pass with the root expanded here and its children searched
/// in parallel. Results are merged in branch order.
fn parallel_pass(
    mode: &PushMode,
    root: &mut Board,
    failed: &mut FxHashSet<u64>,
    bound: u32,
    budget: &Budget,
) -> Iteration {
    let mut iteration = Iteration {
        status: SearchStatus::Inconclusive,
        cutoff: false,
        aborted: false,
        nodes: 1,
    };
    if let Some(moves) = mode.goal_moves(root) {
        iteration.status = SearchStatus::Solution(moves);
        return iteration;
    }
    if !budget.charge() {
        iteration.aborted = true;
        return iteration;
    }

    let mut steps = Steps::new();
    let key = mode.successors(root, true, &mut steps).key;
    if failed.contains(&key) {
        iteration.status = SearchStatus::Failed;
        return iteration;
    }
    if bound == 0 || mode.lower_bound(root) > bound {
        iteration.cutoff = true;
        return iteration;
    }

    let shared = Shared {
        failed: &*failed,
        pending: Mutex::new(FxHashSet::default()),
        budget,
    };
    let root_board: &Board = root;
    let branches: Vec<Branch> = steps
        .as_slice()
        .par_iter()
        .map(|&step| run_branch(mode, root_board, key, step, bound, &shared))
        .collect();
    let pending = shared.pending.into_inner();

    let mut all_failed = true;
    for branch in branches {
        iteration.nodes += branch.nodes;
        iteration.cutoff |= branch.cutoff;
        iteration.aborted |= branch.aborted;
        match branch.status {
            SearchStatus::Solution(moves) if !iteration.status.is_solution() => {
                iteration.status = SearchStatus::Solution(moves);
            }
            SearchStatus::Failed => {}
            _ => all_failed = false,
        }
    }

    failed.extend(pending);
    if !iteration.status.is_solution() && all_failed {
        failed.insert(key);
        iteration.status = SearchStatus::Failed;
    }
    iteration
}

impl Solver for ParallelPushSolver {
    fn solve(&mut self, board: &Board) -> SolveOutcome {
        let config = self.config;
        let budget = Budget::new(&config);
        let mode = PushMode::new(board, &config);
        let mut root = board.clone();
        root.commit();
        let mut failed = FxHashSet::default();
        let mut nodes = 0;

        let initial = mode.lower_bound(&root);
        let outcome = deepen_with(board, initial, &config, |bound| {
            let iteration = parallel_pass(&mode, &mut root, &mut failed, bound, &budget);
            nodes += iteration.nodes;
            iteration
        });
        self.nodes += nodes;
        outcome
    }

    fn iterations_count(&self) -> u64 {
        self.nodes
    }
}
