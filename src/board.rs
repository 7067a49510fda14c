use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arrayvec::ArrayVec;
use bitflags::bitflags;
use smallvec::SmallVec;

use crate::deadlock;
use crate::error::ParseError;
use crate::position::{Direction, Position};
use crate::zobrist::Zobrist;

const MAX_SIDE: usize = 4096;

bitflags! {
    /// Per-cell state bits.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct Cell: u8 {
        const WALL = 0x01;
        const BOX = 0x02;
        const GOAL = 0x04;
        /// Static dead square: a box here can never reach a target.
        const BOX_TRAP = 0x08;
        /// Left by the player since the last push.
        const VISITED = 0x10;
        /// Transient flood-fill marker, never left set between calls.
        const REACHABLE = 0x20;
        /// A box stood here in the starting position.
        const BOX_START = 0x40;

        const OCCUPIED = Self::WALL.bits() | Self::BOX.bits();
        const REJECT_BOX = Self::WALL.bits() | Self::BOX.bits() | Self::BOX_TRAP.bits();
    }
}

/// A box together with the direction it would move in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BoxMove {
    pub box_pos: Position,
    pub dir: Direction,
}

/// Result of a player flood fill: the region's canonical cell and the box
/// moves available from it.
#[derive(Clone, Debug)]
pub struct Reachable {
    pub normalized: Position,
    pub moves: SmallVec<[BoxMove; 16]>,
}

#[derive(Clone, Copy, Debug)]
struct Frame {
    log_len: usize,
    dir: Direction,
    player: Position,
    remaining_boxes: usize,
    boxes_off_start: usize,
    fingerprint: u64,
}

/// One Sokoban configuration.
///
/// `cells` is a row-major grid of [`Cell`] flags. The board keeps three
/// counters current under every mutation: `remaining_boxes` (goal cells
/// without a box), `boxes_off_start` (starting box cells without a box) and
/// the Zobrist `fingerprint` of box cells plus the player cell.
///
/// Two mutation styles are offered. [`Board::make_move`] / [`Board::undo_move`]
/// work one player step at a time through an undo log, and
/// [`Board::relocate_box`] moves a box and the player in O(1) and is its own
/// inverse when called with the arguments swapped.
#[derive(Clone)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    player: Position,
    remaining_boxes: usize,
    boxes_off_start: usize,
    box_count: usize,
    fingerprint: u64,
    reversed: bool,
    zobrist: Arc<Zobrist>,
    history: Vec<Frame>,
    log: Vec<(u32, Cell)>,
}

impl Board {
    fn from_cells(width: usize, height: usize, cells: Vec<Cell>, player: Position) -> Self {
        let zobrist = Arc::new(Zobrist::new(width, height));
        let mut board = Board {
            width,
            height,
            cells,
            player,
            remaining_boxes: 0,
            boxes_off_start: 0,
            box_count: 0,
            fingerprint: 0,
            reversed: false,
            zobrist,
            history: Vec::new(),
            log: Vec::new(),
        };
        board.refresh();
        board
    }

    /// Recounts boxes, recomputes the fingerprint and re-marks static traps.
    pub fn refresh(&mut self) {
        self.recount();
        if self.reversed {
            deadlock::mark_pull_traps(self);
        } else {
            deadlock::mark_box_traps(self);
        }
    }

    fn recount(&mut self) {
        let mut remaining = 0;
        let mut off_start = 0;
        let mut boxes = 0;
        for &cell in &self.cells {
            if cell.contains(Cell::BOX) {
                boxes += 1;
            }
            if cell.contains(Cell::GOAL) && !cell.contains(Cell::BOX) {
                remaining += 1;
            }
            if cell.contains(Cell::BOX_START) && !cell.contains(Cell::BOX) {
                off_start += 1;
            }
        }
        self.remaining_boxes = remaining;
        self.boxes_off_start = off_start;
        self.box_count = boxes;
        self.fingerprint = self.zobrist.full_hash(self);
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    pub fn player(&self) -> Position {
        self.player
    }

    /// Goal cells that do not hold a box.
    #[inline(always)]
    pub fn remaining_boxes(&self) -> usize {
        self.remaining_boxes
    }

    /// Starting box cells that do not hold a box.
    #[inline(always)]
    pub fn boxes_off_start(&self) -> usize {
        self.boxes_off_start
    }

    #[inline(always)]
    pub fn box_count(&self) -> usize {
        self.box_count
    }

    #[inline(always)]
    pub fn is_solved(&self) -> bool {
        self.remaining_boxes == 0
    }

    #[inline(always)]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// The fingerprint with the player's contribution removed.
    #[inline(always)]
    pub fn box_hash(&self) -> u64 {
        self.fingerprint ^ self.zobrist.player_key(self.player)
    }

    #[inline(always)]
    pub fn zobrist(&self) -> &Zobrist {
        &self.zobrist
    }

    #[inline(always)]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row >= 0 && (pos.row as usize) < self.height && pos.col >= 0 && (pos.col as usize) < self.width
    }

    #[inline(always)]
    fn idx(&self, pos: Position) -> usize {
        pos.row as usize * self.width + pos.col as usize
    }

    #[inline(always)]
    fn pos_of(&self, idx: usize) -> Position {
        Position::new((idx / self.width) as i16, (idx % self.width) as i16)
    }

    /// Cell flags at `pos`; anything off the board reads as wall.
    #[inline(always)]
    pub fn cell(&self, pos: Position) -> Cell {
        if self.in_bounds(pos) {
            self.cells[self.idx(pos)]
        } else {
            Cell::WALL
        }
    }

    /// True if the cell at `pos` has any of the bits in `mask`.
    #[inline(always)]
    pub fn is(&self, pos: Position, mask: Cell) -> bool {
        self.cell(pos).intersects(mask)
    }

    pub(crate) fn set_flags(&mut self, pos: Position, flags: Cell) {
        let idx = self.idx(pos);
        self.cells[idx] |= flags;
    }

    pub(crate) fn clear_flags_everywhere(&mut self, flags: Cell) {
        for cell in &mut self.cells {
            cell.remove(flags);
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(|i| self.pos_of(i))
    }

    fn positions_with(&self, flag: Cell) -> impl Iterator<Item = Position> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.contains(flag))
            .map(|(i, _)| self.pos_of(i))
    }

    pub fn boxes(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions_with(Cell::BOX)
    }

    pub fn goals(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions_with(Cell::GOAL)
    }

    pub fn box_starts(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions_with(Cell::BOX_START)
    }

    /// Targets the boxes of this board are heading for: goals going forward,
    /// starting cells on a reversed board.
    pub fn targets(&self) -> Vec<Position> {
        if self.reversed {
            self.box_starts().collect()
        } else {
            self.goals().collect()
        }
    }

    /// Search legality of a player step: the destination must not be a wall
    /// or a cell already walked since the last push, and a pushed box must not
    /// land on a wall, another box or a trap.
    pub fn can_move(&self, dir: Direction) -> bool {
        let to = self.player.step(dir);
        let cell = self.cell(to);
        if cell.intersects(Cell::WALL | Cell::VISITED) {
            return false;
        }
        if cell.contains(Cell::BOX) {
            return !self.is(to.step(dir), Cell::REJECT_BOX);
        }
        true
    }

    /// Plain game legality of a player step, ignoring walk history and traps.
    pub fn is_legal(&self, dir: Direction) -> bool {
        let to = self.player.step(dir);
        let cell = self.cell(to);
        if cell.contains(Cell::WALL) {
            return false;
        }
        if cell.contains(Cell::BOX) {
            return !self.is(to.step(dir), Cell::OCCUPIED);
        }
        true
    }

    /// Directions that pass [`Board::can_move`].
    pub fn open_directions(&self) -> ArrayVec<Direction, 4> {
        Direction::ALL.into_iter().filter(|&dir| self.can_move(dir)).collect()
    }

    #[inline(always)]
    fn write_cell(&mut self, idx: usize, value: Cell, logged: bool) {
        if logged {
            self.log.push((idx as u32, self.cells[idx]));
        }
        self.cells[idx] = value;
    }

    fn shift_box(&mut self, from: Position, to: Position, logged: bool) {
        let fi = self.idx(from);
        let ti = self.idx(to);
        let f = self.cells[fi];
        let t = self.cells[ti];
        debug_assert!(f.contains(Cell::BOX), "no box to move at {from}");
        debug_assert!(!t.intersects(Cell::OCCUPIED) || fi == ti, "box moved onto occupied {to}");

        if f.contains(Cell::GOAL) {
            self.remaining_boxes += 1;
        }
        if t.contains(Cell::GOAL) {
            self.remaining_boxes -= 1;
        }
        if f.contains(Cell::BOX_START) {
            self.boxes_off_start += 1;
        }
        if t.contains(Cell::BOX_START) {
            self.boxes_off_start -= 1;
        }
        self.write_cell(fi, f - Cell::BOX, logged);
        self.write_cell(ti, self.cells[ti] | Cell::BOX, logged);
    }

    /// Moves the player one step, pushing a box ahead if there is one.
    ///
    /// The vacated cell is marked [`Cell::VISITED`]; a push clears every
    /// such mark instead. The change is recorded so that
    /// [`Board::undo_move`] restores the board bit for bit.
    ///
    /// # Panics
    ///
    /// Panics if the step is not [legal](Board::is_legal).
    pub fn make_move(&mut self, dir: Direction) {
        assert!(self.is_legal(dir), "illegal move {dir} from {}", self.player);

        self.history.push(Frame {
            log_len: self.log.len(),
            dir,
            player: self.player,
            remaining_boxes: self.remaining_boxes,
            boxes_off_start: self.boxes_off_start,
            fingerprint: self.fingerprint,
        });

        let from = self.player;
        let to = from.step(dir);
        if self.is(to, Cell::BOX) {
            let beyond = to.step(dir);
            for i in 0..self.cells.len() {
                if self.cells[i].contains(Cell::VISITED) {
                    self.write_cell(i, self.cells[i] - Cell::VISITED, true);
                }
            }
            self.shift_box(to, beyond, true);
            self.fingerprint = self.zobrist.update(self.fingerprint, from, to, Some((to, beyond)));
        } else {
            let fi = self.idx(from);
            self.write_cell(fi, self.cells[fi] | Cell::VISITED, true);
            self.fingerprint = self.zobrist.update(self.fingerprint, from, to, None);
        }
        self.player = to;
    }

    /// Reverts the last [`Board::make_move`], returning its direction.
    pub fn undo_move(&mut self) -> Option<Direction> {
        let frame = self.history.pop()?;
        for (idx, old) in self.log.drain(frame.log_len..).rev() {
            self.cells[idx as usize] = old;
        }
        self.player = frame.player;
        self.remaining_boxes = frame.remaining_boxes;
        self.boxes_off_start = frame.boxes_off_start;
        self.fingerprint = frame.fingerprint;
        Some(frame.dir)
    }

    /// Number of moves that can still be undone.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Forgets the undo history and walk marks, keeping the current state.
    pub fn commit(&mut self) {
        self.history.clear();
        self.log.clear();
        self.clear_flags_everywhere(Cell::VISITED);
    }

    /// Moves the box at `from` to `to` and puts the player on `player`.
    ///
    /// No legality check beyond debug assertions; calling it again with
    /// `from`/`to` swapped and the old player position restores the board
    /// exactly.
    #[inline]
    pub fn relocate_box(&mut self, from: Position, to: Position, player: Position) {
        self.shift_box(from, to, false);
        self.fingerprint = self.zobrist.update(self.fingerprint, self.player, player, Some((from, to)));
        self.player = player;
    }

    fn flood_player_region(&mut self) -> Vec<usize> {
        let start = self.idx(self.player);
        let mut region = Vec::with_capacity(64);
        self.cells[start] |= Cell::REACHABLE;
        region.push(start);

        let mut head = 0;
        while head < region.len() {
            let pos = self.pos_of(region[head]);
            head += 1;
            for dir in Direction::ALL {
                let next = pos.step(dir);
                if !self.in_bounds(next) {
                    continue;
                }
                let ni = self.idx(next);
                if self.cells[ni].intersects(Cell::OCCUPIED | Cell::REACHABLE) {
                    continue;
                }
                self.cells[ni] |= Cell::REACHABLE;
                region.push(ni);
            }
        }
        region
    }

    fn clear_region(&mut self, region: &[usize]) {
        for &i in region {
            self.cells[i].remove(Cell::REACHABLE);
        }
    }

    /// The top-left-most cell of the player's region.
    pub fn normalized_player(&mut self) -> Position {
        let region = self.flood_player_region();
        self.clear_region(&region);
        let min = region.iter().copied().min().unwrap_or(self.idx(self.player));
        self.pos_of(min)
    }

    /// Flood-fills the player's region and lists every push it allows: a box
    /// next to a reached cell that can move away from the player onto a cell
    /// that is neither occupied nor a trap.
    pub fn find_reachable_pushable_boxes(&mut self) -> Reachable {
        let region = self.flood_player_region();
        let mut moves = SmallVec::new();
        for &i in &region {
            let stand = self.pos_of(i);
            for dir in Direction::ALL {
                let box_pos = stand.step(dir);
                if self.is(box_pos, Cell::BOX) && !self.is(box_pos.step(dir), Cell::REJECT_BOX) {
                    moves.push(BoxMove { box_pos, dir });
                }
            }
        }
        self.clear_region(&region);
        let normalized = self.pos_of(region.iter().copied().min().unwrap_or(0));
        Reachable { normalized, moves }
    }

    /// Flood-fills the player's region and lists every pull it allows. A pull
    /// `{box_pos, dir}` has the player on `box_pos + dir` stepping on to
    /// `box_pos + 2*dir` while the box follows into `box_pos + dir`.
    pub fn find_reachable_pullable_boxes(&mut self) -> Reachable {
        let region = self.flood_player_region();
        let mut moves = SmallVec::new();
        for &i in &region {
            let stand = self.pos_of(i);
            if self.is(stand, Cell::BOX_TRAP) {
                continue;
            }
            for dir in Direction::ALL {
                let box_pos = stand.step(dir.opposite());
                if self.is(box_pos, Cell::BOX) && !self.is(stand.step(dir), Cell::OCCUPIED) {
                    moves.push(BoxMove { box_pos, dir });
                }
            }
        }
        self.clear_region(&region);
        let normalized = self.pos_of(region.iter().copied().min().unwrap_or(0));
        Reachable { normalized, moves }
    }

    /// Every pull available to a player free to stand anywhere.
    pub fn all_pulls(&self) -> SmallVec<[BoxMove; 16]> {
        let mut moves = SmallVec::new();
        for box_pos in self.boxes() {
            for dir in Direction::ALL {
                let stand = box_pos.step(dir);
                if !self.is(stand, Cell::OCCUPIED | Cell::BOX_TRAP) && !self.is(stand.step(dir), Cell::OCCUPIED) {
                    moves.push(BoxMove { box_pos, dir });
                }
            }
        }
        moves
    }

    /// Shortest walk from the player to `target` over free cells.
    pub fn find_path(&self, target: Position) -> Option<Vec<Direction>> {
        self.path_between(self.player, target)
    }

    /// Shortest walk from `from` to `target` over cells holding neither a
    /// wall nor a box. `from` itself is not checked.
    pub fn path_between(&self, from: Position, target: Position) -> Option<Vec<Direction>> {
        if from == target {
            return Some(Vec::new());
        }
        if !self.in_bounds(from) || self.is(target, Cell::OCCUPIED) {
            return None;
        }

        let mut came: Vec<Option<Direction>> = vec![None; self.cells.len()];
        let mut seen = vec![false; self.cells.len()];
        let mut queue = VecDeque::with_capacity(64);
        seen[self.idx(from)] = true;
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            for dir in Direction::ALL {
                let next = current.step(dir);
                if !self.in_bounds(next) || self.is(next, Cell::OCCUPIED) {
                    continue;
                }
                let ni = self.idx(next);
                if seen[ni] {
                    continue;
                }
                seen[ni] = true;
                came[ni] = Some(dir);
                if next == target {
                    let mut path = Vec::new();
                    let mut at = target;
                    while let Some(d) = came[self.idx(at)] {
                        path.push(d);
                        at = at.step(d.opposite());
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// The board the puller searches on: every goal holds a box, the
    /// starting box cells become the targets, and traps are recomputed for
    /// pulling.
    pub fn reversed(&self) -> Board {
        let mut board = self.clone();
        board.history.clear();
        board.log.clear();
        for cell in &mut board.cells {
            cell.remove(Cell::BOX | Cell::BOX_TRAP | Cell::VISITED | Cell::REACHABLE);
            if cell.contains(Cell::GOAL) {
                cell.insert(Cell::BOX);
            }
        }
        board.reversed = !self.reversed;
        board.refresh();
        board
    }
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.player == other.player
            && self.remaining_boxes == other.remaining_boxes
            && self.boxes_off_start == other.boxes_off_start
            && self.fingerprint == other.fingerprint
            && self.cells == other.cells
    }
}

impl Eq for Board {}

impl FromStr for Board {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, ParseError> {
        let mut lines: Vec<&str> = text.lines().map(|l| l.trim_end_matches('\r')).collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }

        let height = lines.len();
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(ParseError::Empty);
        }
        if width > MAX_SIDE || height > MAX_SIDE {
            return Err(ParseError::TooLarge { width, height });
        }

        let mut cells = vec![Cell::empty(); width * height];
        let mut player: Option<Position> = None;
        let (mut boxes, mut goals) = (0, 0);

        for (row, line) in lines.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                let idx = row * width + col;
                let pos = Position::new(row as i16, col as i16);
                cells[idx] = match ch {
                    '#' => Cell::WALL,
                    '$' => Cell::BOX | Cell::BOX_START,
                    '.' => Cell::GOAL,
                    '*' => Cell::BOX | Cell::GOAL | Cell::BOX_START,
                    '@' | '+' => {
                        if let Some(first) = player {
                            return Err(ParseError::MultiplePlayers { first, second: pos });
                        }
                        player = Some(pos);
                        if ch == '+' {
                            Cell::GOAL
                        } else {
                            Cell::empty()
                        }
                    }
                    ' ' | '-' | '_' => Cell::empty(),
                    _ => return Err(ParseError::UnknownChar { ch, row, col }),
                };
                if cells[idx].contains(Cell::BOX) {
                    boxes += 1;
                }
                if cells[idx].contains(Cell::GOAL) {
                    goals += 1;
                }
            }
        }

        let player = player.ok_or(ParseError::MissingPlayer)?;
        if boxes != goals {
            return Err(ParseError::BoxGoalMismatch { boxes, goals });
        }
        Ok(Board::from_cells(width, height, cells, player))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.height {
            let mut line = String::with_capacity(self.width);
            for col in 0..self.width {
                let pos = Position::new(row as i16, col as i16);
                let cell = self.cell(pos);
                let ch = if pos == self.player {
                    if cell.contains(Cell::GOAL) {
                        '+'
                    } else {
                        '@'
                    }
                } else if cell.contains(Cell::WALL) {
                    '#'
                } else if cell.contains(Cell::BOX | Cell::GOAL) {
                    '*'
                } else if cell.contains(Cell::BOX) {
                    '$'
                } else if cell.contains(Cell::GOAL) {
                    '.'
                } else {
                    ' '
                };
                line.push(ch);
            }
            if row > 0 {
                f.write_str("\n")?;
            }
            f.write_str(line.trim_end())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Board {}x{} player={} remaining={} off_start={} reversed={}",
            self.width, self.height, self.player, self.remaining_boxes, self.boxes_off_start, self.reversed
        )?;
        write!(f, "{self}")
    }
}
