//! Checking a move sequence against the plain game rules.

use crate::board::{Board, Cell};
use crate::error::ReplayError;
use crate::position::Direction;

/// Final state of a successful replay.
#[derive(Clone, Debug)]
pub struct Replay {
    pub board: Board,
    pub moves: usize,
    pub pushes: usize,
}

/// Replays a move string such as `"RRuL"` or `"R R U L"` from `start` and
/// checks that every goal ends up covered. Whitespace is skipped.
pub fn replay(start: &Board, moves: &str) -> Result<Replay, ReplayError> {
    let mut dirs = Vec::with_capacity(moves.len());
    for (index, ch) in moves.chars().enumerate() {
        if ch.is_whitespace() {
            continue;
        }
        let dir = Direction::from_char(ch).ok_or(ReplayError::UnknownMove { ch, index })?;
        dirs.push(dir);
    }
    replay_directions(start, dirs)
}

/// Like [`replay`], for an already decoded sequence.
pub fn replay_directions(
    start: &Board,
    moves: impl IntoIterator<Item = Direction>,
) -> Result<Replay, ReplayError> {
    let mut board = start.clone();
    board.commit();
    let mut count = 0;
    let mut pushes = 0;

    for (index, dir) in moves.into_iter().enumerate() {
        if !board.is_legal(dir) {
            return Err(ReplayError::Blocked { dir, index });
        }
        if board.is(board.player().step(dir), Cell::BOX) {
            pushes += 1;
        }
        board.make_move(dir);
        count += 1;
    }
    board.commit();

    if !board.is_solved() {
        return Err(ReplayError::Unsolved {
            remaining: board.remaining_boxes(),
        });
    }
    Ok(Replay {
        board,
        moves: count,
        pushes,
    })
}
