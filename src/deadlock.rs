//! Static dead squares and the dynamic freeze check.

use std::collections::VecDeque;

use crate::board::{Board, Cell};
use crate::position::{Direction, Position};

/// Marks [`Cell::BOX_TRAP`] on a forward board.
///
/// Non-goal corners are traps. A straight run of non-goal cells between two
/// traps (or a trap and a wall) that keeps a wall along one whole side is a
/// trap too, since a box in it can only slide along the run. Repeats until
/// nothing new is marked.
pub fn mark_box_traps(board: &mut Board) {
    board.clear_flags_everywhere(Cell::BOX_TRAP);

    let corners: Vec<Position> = board
        .positions()
        .filter(|&pos| !board.is(pos, Cell::WALL | Cell::GOAL))
        .filter(|&pos| {
            let vertical = board.is(pos.step(Direction::Up), Cell::WALL)
                || board.is(pos.step(Direction::Down), Cell::WALL);
            let horizontal = board.is(pos.step(Direction::Left), Cell::WALL)
                || board.is(pos.step(Direction::Right), Cell::WALL);
            vertical && horizontal
        })
        .collect();
    for pos in corners {
        board.set_flags(pos, Cell::BOX_TRAP);
    }

    loop {
        let traps: Vec<Position> = board
            .positions()
            .filter(|&pos| board.cell(pos).contains(Cell::BOX_TRAP))
            .collect();
        let mut changed = false;
        for start in traps {
            for dir in Direction::ALL {
                changed |= mark_run(board, start, dir);
            }
        }
        if !changed {
            break;
        }
    }
}

fn mark_run(board: &mut Board, start: Position, dir: Direction) -> bool {
    let sides = dir.perpendicular();
    let mut walled = [true, true];
    let mut cur = start.step(dir);
    let mut len = 0;

    loop {
        let cell = board.cell(cur);
        if cell.intersects(Cell::WALL | Cell::BOX_TRAP) {
            break;
        }
        if cell.contains(Cell::GOAL) {
            return false;
        }
        for (walled, side) in walled.iter_mut().zip(sides) {
            *walled &= board.is(cur.step(side), Cell::WALL);
        }
        if !walled[0] && !walled[1] {
            return false;
        }
        cur = cur.step(dir);
        len += 1;
    }

    for i in 1..=len {
        board.set_flags(start.offset(dir, i), Cell::BOX_TRAP);
    }
    len > 0
}

/// Marks [`Cell::BOX_TRAP`] on a reversed board: every cell from which no
/// sequence of pulls brings a box back to a starting box cell.
///
/// Pull-reachability from a cell equals push-reachability into it, so this
/// walks pushes outward from the starting cells and traps everything not
/// reached.
pub fn mark_pull_traps(board: &mut Board) {
    board.clear_flags_everywhere(Cell::BOX_TRAP);

    let size = board.width() * board.height();
    let width = board.width();
    let idx = |p: Position| p.row as usize * width + p.col as usize;
    let mut live_squares = vec![false; size];
    let mut queue = VecDeque::with_capacity(board.box_count() * 4);

    for start in board.box_starts() {
        live_squares[idx(start)] = true;
        queue.push_back(start);
    }

    while let Some(box_pos) = queue.pop_front() {
        for dir in Direction::ALL {
            let to = box_pos.step(dir);
            let player = box_pos.step(dir.opposite());
            if board.is(to, Cell::WALL) || board.is(player, Cell::WALL) {
                continue;
            }
            if !live_squares[idx(to)] {
                live_squares[idx(to)] = true;
                queue.push_back(to);
            }
        }
    }

    let dead: Vec<Position> = board
        .positions()
        .filter(|&pos| !board.is(pos, Cell::WALL) && !live_squares[idx(pos)])
        .collect();
    for pos in dead {
        board.set_flags(pos, Cell::BOX_TRAP);
    }
}

/// Boxes already examined by the current freeze check, innermost first.
/// They count as walls, which keeps cycles of boxes from recursing forever.
struct Trail<'a> {
    pos: Position,
    prev: Option<&'a Trail<'a>>,
}

impl Trail<'_> {
    fn contains(&self, pos: Position) -> bool {
        let mut link = Some(self);
        while let Some(t) = link {
            if t.pos == pos {
                return true;
            }
            link = t.prev;
        }
        false
    }
}

/// True if the box at `pos` is stuck on both axes while off a goal.
pub fn is_freeze_deadlock(board: &Board, pos: Position) -> bool {
    if board.is(pos, Cell::GOAL) {
        return false;
    }
    let trail = Trail { pos, prev: None };
    blocked_on_axis(board, pos, Direction::Left, &trail) && blocked_on_axis(board, pos, Direction::Up, &trail)
}

/// Whether the box at `pos` can never move along the axis of `axis`.
fn blocked_on_axis(board: &Board, pos: Position, axis: Direction, trail: &Trail<'_>) -> bool {
    let a = pos.step(axis);
    let b = pos.step(axis.opposite());

    if board.is(a, Cell::WALL) || board.is(b, Cell::WALL) || trail.contains(a) || trail.contains(b) {
        return true;
    }
    if board.is(a, Cell::BOX_TRAP) && board.is(b, Cell::BOX_TRAP) {
        return true;
    }

    // a neighbouring box only gets out of the way across this axis
    let across = axis.perpendicular()[0];
    [a, b].into_iter().any(|n| {
        board.is(n, Cell::BOX) && {
            let next = Trail { pos: n, prev: Some(trail) };
            blocked_on_axis(board, n, across, &next)
        }
    })
}

/// True if a box pushed `dir` onto `box_pos` sits in a one-wide corridor,
/// walled on both sides at its own cell and at the cell behind it.
pub fn in_tunnel(board: &Board, dir: Direction, box_pos: Position) -> bool {
    let behind = box_pos.step(dir.opposite());
    dir.perpendicular()
        .into_iter()
        .all(|side| board.is(box_pos.step(side), Cell::WALL) && board.is(behind.step(side), Cell::WALL))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(text: &str) -> Board {
        text.parse().expect("valid board")
    }

    fn traps(b: &Board) -> Vec<Position> {
        b.positions().filter(|&p| b.is(p, Cell::BOX_TRAP)).collect()
    }

    #[test]
    fn corners_become_traps_but_goals_never_do() {
        let b = board("####\n#@ #\n# $#\n# .#\n####");
        assert!(b.is(Position::new(1, 1), Cell::BOX_TRAP));
        assert!(b.is(Position::new(1, 2), Cell::BOX_TRAP));
        assert!(b.is(Position::new(3, 1), Cell::BOX_TRAP));
        assert!(!b.is(Position::new(3, 2), Cell::BOX_TRAP));
        assert!(!b.is(Position::new(2, 2), Cell::BOX_TRAP));
    }

    #[test]
    fn wall_runs_propagate() {
        let b = board("#######\n#@    #\n#     #\n#  $ .#\n#######");
        // the whole top row hugs the wall and has no goal
        for col in 1..=5 {
            assert!(b.is(Position::new(1, col), Cell::BOX_TRAP), "col {col}");
        }
        // the bottom row holds a goal, so only its corner is dead
        assert!(b.is(Position::new(3, 1), Cell::BOX_TRAP));
        assert!(!b.is(Position::new(3, 2), Cell::BOX_TRAP));
        // the left column between two corners
        assert!(b.is(Position::new(2, 1), Cell::BOX_TRAP));
        assert!(!b.is(Position::new(2, 3), Cell::BOX_TRAP));
    }

    #[test]
    fn runs_with_an_opening_are_kept() {
        let b = board("#######\n#@    #\n### # #\n  #$ .#\n  #####");
        // row 1 has openings below at cols 3 and 5, but the top side is solid wall
        assert!(b.is(Position::new(1, 3), Cell::BOX_TRAP));
        // col 5 leads down to the goal
        assert!(!b.is(Position::new(2, 5), Cell::BOX_TRAP));
    }

    #[test]
    fn pull_traps_follow_push_reachability() {
        let b = board("#######\n#@#$ .#\n#######");
        let r = b.reversed();
        assert_eq!(
            traps(&r),
            vec![Position::new(1, 1), Position::new(1, 4), Position::new(1, 5)]
        );
    }

    #[test]
    fn single_box_against_wall_corner_is_frozen() {
        let mut b = board("######\n#@   #\n#  $ #\n#.   #\n######");
        assert!(!is_freeze_deadlock(&b, Position::new(2, 3)));
        b.relocate_box(Position::new(2, 3), Position::new(1, 3), Position::new(2, 3));
        assert!(is_freeze_deadlock(&b, Position::new(1, 3)));
    }

    #[test]
    fn two_boxes_side_by_side_on_a_wall_freeze() {
        let b = board("######\n#    #\n# $$ #\n#  @ #\n#..  #\n######");
        assert!(!is_freeze_deadlock(&b, Position::new(2, 2)));

        let frozen = board("######\n# $$ #\n#    #\n#  @ #\n#..  #\n######");
        assert!(is_freeze_deadlock(&frozen, Position::new(1, 2)));
        assert!(is_freeze_deadlock(&frozen, Position::new(1, 3)));
    }

    #[test]
    fn two_by_two_block_is_frozen_even_off_walls() {
        let b = board("########\n#      #\n#  $$  #\n#  $$  #\n#   @  #\n#....  #\n########");
        for pos in [(2, 3), (2, 4), (3, 3), (3, 4)] {
            assert!(is_freeze_deadlock(&b, Position::new(pos.0, pos.1)));
        }
    }

    #[test]
    fn box_on_goal_is_never_a_deadlock() {
        let b = board("####\n#*@#\n####");
        assert!(!is_freeze_deadlock(&b, Position::new(1, 1)));
    }

    #[test]
    fn tunnel_detection() {
        let b = board("#######\n#@ $  #\n### ###\n  #.#\n  ###");
        assert!(!in_tunnel(&b, Direction::Right, Position::new(1, 3)));
        let corridor = board("#########\n#@$    .#\n#########");
        assert!(in_tunnel(&corridor, Direction::Right, Position::new(1, 3)));
        assert!(!in_tunnel(&corridor, Direction::Down, Position::new(1, 3)));
    }
}
