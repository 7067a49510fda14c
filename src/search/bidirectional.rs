use super::pull::PullMode;
use super::push::PushMode;
use super::{next_bound, Budget, CollisionRecord, Collisions, Iteration, SearchStatus, Side, SideMap};
use crate::board::Board;
use crate::config::SolverConfig;
use crate::position::{Direction, Position};
use crate::solver::{SolveOutcome, Solution, Solver};

/// Runs a pusher and a puller in alternation at the same bound until one of
/// them enters a state the other has already recorded, then joins the two
/// halves.
#[derive(Debug, Default)]
pub struct BidirectionalSolver {
    config: SolverConfig,
    nodes: u64,
    joins: u64,
}

impl BidirectionalSolver {
    pub fn new(config: SolverConfig) -> Self {
        BidirectionalSolver {
            config,
            nodes: 0,
            joins: 0,
        }
    }

    /// Solutions assembled from a meeting of the two searches rather than
    /// found by one side alone.
    pub fn joins(&self) -> u64 {
        self.joins
    }
}

/// What one side's pass means for the whole solve.
enum Verdict {
    Done(SolveOutcome),
    Joined(Solution),
    Exhausted,
    Continue,
}

fn judge(start: &Board, name: &str, iteration: Iteration, pushes: &SideMap, pulls: &SideMap) -> Verdict {
    let proves_unsolvable = iteration.proves_unsolvable();
    match iteration.status {
        SearchStatus::Solution(moves) => match Solution::check(start, moves) {
            Ok(solution) => return Verdict::Done(SolveOutcome::Solved(solution)),
            Err(err) => log::error!("{name} returned an invalid solution: {err}"),
        },
        SearchStatus::Met(key) => {
            if let Some(solution) = splice(start, pushes, pulls, key) {
                return Verdict::Joined(solution);
            }
            log::warn!("{name} met the other side at {key:#018x} but the halves do not join");
        }
        _ if proves_unsolvable => {
            log::debug!("{name} search exhausted");
            return Verdict::Exhausted;
        }
        _ => {}
    }
    if iteration.aborted {
        log::warn!("search budget exhausted in the {name} pass");
        return Verdict::Done(SolveOutcome::BudgetExhausted);
    }
    Verdict::Continue
}

/// Walks to `stand` and steps `dir` `times` times, recording every move.
fn walk_and_push(board: &mut Board, stand: Position, dir: Direction, times: i16, moves: &mut Vec<Direction>) -> Option<()> {
    let walk = board.find_path(stand)?;
    for step in walk.into_iter().chain(std::iter::repeat(dir).take(times as usize)) {
        if !board.is_legal(step) {
            return None;
        }
        board.make_move(step);
        moves.push(step);
    }
    Some(())
}

/// Joins the pusher's path to `key` with the puller's path from `key`.
fn splice(start: &Board, pushes: &SideMap, pulls: &SideMap, key: u64) -> Option<Solution> {
    let mut forward = pushes.chain(key)?;
    forward.reverse();
    let backward = pulls.chain(key)?;
    log::trace!("joining {} pushes with {} pulls", forward.len(), backward.len());

    let mut board = start.clone();
    board.commit();
    let mut moves = Vec::new();

    for &CollisionRecord { dir, box_pos, length, .. } in &forward {
        let box_from = box_pos.offset(dir.opposite(), length);
        walk_and_push(&mut board, box_from.step(dir.opposite()), dir, length, &mut moves)?;
    }
    // a pull in `dir` is undone by pushing back from where the puller stood
    for &CollisionRecord { dir, player, .. } in &backward {
        walk_and_push(&mut board, player, dir.opposite(), 1, &mut moves)?;
    }

    match Solution::check(start, moves) {
        Ok(solution) => Some(solution),
        Err(err) => {
            log::error!("joined solution does not replay: {err}");
            None
        }
    }
}

impl Solver for BidirectionalSolver {
    fn solve(&mut self, board: &Board) -> SolveOutcome {
        let config = self.config;
        let budget = Budget::new(&config);
        let mut pusher = Side::new(PushMode::new(board, &config), board.clone());
        let reversed = board.reversed();
        let mut puller = Side::new(PullMode::new(&reversed), reversed);
        let mut push_map = SideMap::default();
        let mut pull_map = SideMap::default();
        let (mut push_live, mut pull_live) = (true, true);

        let mut bound = pusher.initial_bound().min(puller.initial_bound());
        let outcome = loop {
            if bound > config.depth_limit {
                break SolveOutcome::DepthExhausted;
            }

            if push_live {
                let collisions = Collisions {
                    ours: &mut push_map,
                    theirs: &pull_map,
                };
                let iteration = pusher.iterate(bound, &budget, Some(collisions));
                match judge(board, "pusher", iteration, &push_map, &pull_map) {
                    Verdict::Done(outcome) => break outcome,
                    Verdict::Joined(solution) => {
                        self.joins += 1;
                        break SolveOutcome::Solved(solution);
                    }
                    Verdict::Exhausted => push_live = false,
                    Verdict::Continue => {}
                }
            }

            if pull_live {
                let collisions = Collisions {
                    ours: &mut pull_map,
                    theirs: &push_map,
                };
                let iteration = puller.iterate(bound, &budget, Some(collisions));
                match judge(board, "puller", iteration, &push_map, &pull_map) {
                    Verdict::Done(outcome) => break outcome,
                    Verdict::Joined(solution) => {
                        self.joins += 1;
                        break SolveOutcome::Solved(solution);
                    }
                    Verdict::Exhausted => pull_live = false,
                    Verdict::Continue => {}
                }
            }

            log::debug!(
                "bound {bound}: pusher {} nodes / {} keys, puller {} nodes / {} keys",
                pusher.nodes,
                push_map.len(),
                puller.nodes,
                pull_map.len()
            );

            if !push_live && !pull_live {
                break SolveOutcome::NoSolution;
            }
            match next_bound(bound, &config) {
                Some(next) => bound = next,
                None => break SolveOutcome::DepthExhausted,
            }
        };

        self.nodes += pusher.nodes + puller.nodes;
        outcome
    }

    fn iterations_count(&self) -> u64 {
        self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::replay;

    fn board(text: &str) -> Board {
        text.parse().expect("valid board")
    }

    #[test]
    fn solves_small_board() {
        let b = board("####\n#@ #\n# $#\n# .#\n####");
        let mut solver = BidirectionalSolver::new(SolverConfig::default());
        let moves = solver.solve(&b).into_moves().expect("solved");
        assert!(replay(&b, &moves).is_ok());
        assert!(solver.iterations_count() > 0);
    }

    #[test]
    fn both_sides_exhausted_means_no_solution() {
        let b = board("#######\n#@#$ .#\n#######");
        let mut solver = BidirectionalSolver::new(SolverConfig::default());
        assert_eq!(solver.solve(&b), SolveOutcome::NoSolution);
    }

    #[test]
    fn two_boxes_take_the_minimal_push_count() {
        let b = board("#########\n#@      #\n# $   $ #\n#       #\n# .   . #\n#########");
        let mut solver = BidirectionalSolver::new(SolverConfig::default().with_depth_step(1));
        let moves = solver.solve(&b).into_moves().expect("solved");
        let done = replay(&b, &moves).expect("valid");
        assert_eq!(done.pushes, 4);
    }

    #[test]
    fn splice_replays_recorded_chains() {
        let b = board("####\n#@ #\n# $#\n# .#\n####");
        let mut pushes = SideMap::default();
        let mut pulls = SideMap::default();
        pushes.insert(1, CollisionRecord::root(b.player()));
        pulls.insert(2, CollisionRecord::root(b.player()));
        // the puller pulled the box from the goal up onto (2,2), standing on (1,2)
        pulls.insert(
            7,
            CollisionRecord {
                dir: Direction::Up,
                box_pos: Position::new(2, 2),
                player: Position::new(1, 2),
                length: 1,
                parent: Some(2),
            },
        );
        pushes.insert(7, CollisionRecord { parent: None, ..CollisionRecord::root(b.player()) });

        let solution = splice(&b, &pushes, &pulls, 7).expect("joins");
        assert_eq!(solution.to_string(), "RD");
    }
}
