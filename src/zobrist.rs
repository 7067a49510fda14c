use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash, Hasher};

use crate::board::Board;
use crate::position::Position;

const PLAYER: usize = 0;
const BOX: usize = 1;

/// Random keys for every (cell, occupant) pair of one board geometry.
///
/// A state fingerprint is the XOR of the player key of the player's cell and
/// the box keys of every box cell, so moving one box or the player is an
/// O(1) update.
#[derive(Debug, PartialEq, Eq)]
pub struct Zobrist {
    width: i16,
    table: Vec<[u64; 2]>,
}

impl Zobrist {
    pub fn new(width: usize, height: usize) -> Self {
        let random_state = RandomState::new();
        let size = width * height;
        let mut table = vec![[0u64; 2]; size];

        for (i, keys) in table.iter_mut().enumerate() {
            let mut hasher1 = random_state.build_hasher();
            (i, PLAYER as u8).hash(&mut hasher1);
            keys[PLAYER] = hasher1.finish();

            let mut hasher2 = random_state.build_hasher();
            (i, BOX as u8).hash(&mut hasher2);
            keys[BOX] = hasher2.finish();
        }

        Zobrist { width: width as i16, table }
    }

    #[inline(always)]
    fn idx(&self, pos: Position) -> usize {
        (pos.row as isize * self.width as isize + pos.col as isize) as usize
    }

    #[inline(always)]
    pub fn player_key(&self, pos: Position) -> u64 {
        self.table[self.idx(pos)][PLAYER]
    }

    #[inline(always)]
    pub fn box_key(&self, pos: Position) -> u64 {
        self.table[self.idx(pos)][BOX]
    }

    /// Hash of a box set alone.
    pub fn boxes_hash(&self, boxes: impl IntoIterator<Item = Position>) -> u64 {
        boxes.into_iter().fold(0, |key, b| key ^ self.box_key(b))
    }

    /// Recomputes a board's fingerprint from scratch.
    pub fn full_hash(&self, board: &Board) -> u64 {
        self.boxes_hash(board.boxes()) ^ self.player_key(board.player())
    }

    #[inline(always)]
    pub fn update(
        &self,
        old_hash: u64,
        old_player: Position,
        new_player: Position,
        moved_box: Option<(Position, Position)>,
    ) -> u64 {
        let mut hash = old_hash ^ self.player_key(old_player) ^ self.player_key(new_player);
        if let Some((from, to)) = moved_box {
            hash ^= self.box_key(from) ^ self.box_key(to);
        }
        hash
    }
}
