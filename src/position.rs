use std::fmt;

/// A (row, column) cell coordinate.
///
/// Coordinates are signed so that stepping off the edge of the board yields a
/// position that simply fails the bounds check instead of wrapping.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
#[repr(C)]
pub struct Position {
    pub row: i16,
    pub col: i16,
}

impl Position {
    #[inline(always)]
    pub const fn new(row: i16, col: i16) -> Self {
        Position { row, col }
    }

    /// The neighbouring position one step in `dir`.
    #[inline(always)]
    pub const fn step(self, dir: Direction) -> Self {
        let (drow, dcol) = dir.delta();
        Position::new(self.row + drow as i16, self.col + dcol as i16)
    }

    /// The position `n` steps in `dir`.
    #[inline(always)]
    pub const fn offset(self, dir: Direction, n: i16) -> Self {
        let (drow, dcol) = dir.delta();
        Position::new(self.row + drow as i16 * n, self.col + dcol as i16 * n)
    }

    #[inline(always)]
    pub fn manhattan(self, other: Position) -> u32 {
        (self.row - other.row).unsigned_abs() as u32 + (self.col - other.col).unsigned_abs() as u32
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}]", self.row, self.col)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

const DIR_OFFSETS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const DIR_CHARS: [char; 4] = ['U', 'D', 'L', 'R'];

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    #[inline(always)]
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Unit (row, column) delta.
    #[inline(always)]
    pub const fn delta(self) -> (i8, i8) {
        DIR_OFFSETS[self as usize]
    }

    /// The two directions at right angles to this one.
    #[inline(always)]
    pub const fn perpendicular(self) -> [Direction; 2] {
        match self {
            Direction::Up | Direction::Down => [Direction::Left, Direction::Right],
            Direction::Left | Direction::Right => [Direction::Up, Direction::Down],
        }
    }

    #[inline(always)]
    pub const fn to_char(self) -> char {
        DIR_CHARS[self as usize]
    }

    /// Parses a move character; lowercase letters are accepted too.
    pub fn from_char(ch: char) -> Option<Direction> {
        match ch.to_ascii_uppercase() {
            'U' => Some(Direction::Up),
            'D' => Some(Direction::Down),
            'L' => Some(Direction::Left),
            'R' => Some(Direction::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}
