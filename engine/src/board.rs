use std::fmt;
use bitvec::{prelude::*, slice::IterOnes};
use serde::{Serialize, Deserialize};
use serde::ser::{Serializer, SerializeSeq, SerializeTuple};
use serde::de::{Deserializer, SeqAccess, Visitor};

pub const SIZE: usize = 8;
const B: usize = SIZE * SIZE;
pub type BitBoard = BitArr!(for B, in u64, Lsb0);
// squares are indexed row-major: row * SIZE + col

const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1), (0, 1),
    (1, -1), (1, 0), (1, 1),
];

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
pub struct Position {
    row: usize,
    col: usize,
}

impl Position {
    /// Panics if either coordinate is off the board.
    pub fn new(row: usize, col: usize) -> Self {
        assert!(row < SIZE && col < SIZE, "position ({}, {}) is off the board", row, col);
        Self { row, col }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }

    fn index(&self) -> usize {
        assert!(self.row < SIZE && self.col < SIZE, "position ({}, {}) is off the board", self.row, self.col);
        self.row * SIZE + self.col
    }

    fn from_index(idx: usize) -> Self {
        Self::new(idx / SIZE, idx % SIZE)
    }

    /// Neighbouring square in direction `(dr, dc)`, or `None` past the edge.
    fn step(&self, dr: isize, dc: isize) -> Option<Self> {
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        if row < SIZE && col < SIZE { Some(Self { row, col }) } else { None }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl Serialize for Position {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        let mut s = serializer.serialize_tuple(2)?;
        s.serialize_element(&self.row)?;
        s.serialize_element(&self.col)?;
        s.end()
    }
}

struct PositionVisitor;
impl<'de> Visitor<'de> for PositionVisitor {
    type Value = Position;
    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a [row, col] pair with both values in 0..8")
    }
    fn visit_seq<V>(self, mut seq: V) -> Result<Position, V::Error> where V: SeqAccess<'de> {
        let row: usize = seq.next_element()?.ok_or_else(|| serde::de::Error::invalid_length(0, &self))?;
        let col: usize = seq.next_element()?.ok_or_else(|| serde::de::Error::invalid_length(1, &self))?;
        if seq.next_element::<serde::de::IgnoredAny>()?.is_some() {
            return Err(serde::de::Error::invalid_length(3, &self));
        }
        if row >= SIZE || col >= SIZE {
            return Err(serde::de::Error::custom(format!("position ({}, {}) is off the board", row, col)));
        }
        Ok(Position { row, col })
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: Deserializer<'de> {
        deserializer.deserialize_seq(PositionVisitor)
    }
}

pub trait BitArr2D {
    fn empty() -> Self;
    fn set_point(&mut self, pos: Position, value: bool);
    fn get_point(&self, pos: Position) -> bool;
    fn from_point(pos: Position) -> Self;
    type IterPoints<'a>: Iterator<Item=Position> + 'a where Self: 'a;
    fn iter_set_points(&'_ self) -> Self::IterPoints<'_>;
}

impl BitArr2D for BitBoard {
    fn empty() -> Self {
        bitarr!(u64, Lsb0; 0; B)
    }

    fn set_point(&mut self, pos: Position, value: bool) {
        self.set(pos.index(), value);
    }

    fn get_point(&self, pos: Position) -> bool {
        self[pos.index()]
    }

    fn from_point(pos: Position) -> Self {
        let mut square: BitBoard = BitBoard::empty();
        square.set_point(pos, true);
        square
    }

    type IterPoints<'a> = std::iter::Map<IterOnes<'a, u64, Lsb0>, fn(usize) -> Position>;

    fn iter_set_points(&'_ self) -> Self::IterPoints<'_> {
        self.iter_ones().map(Position::from_index)
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    Black,
    White,
}

impl Player {
    pub fn opponent(&self) -> Player {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Player::Black => f.write_str("black"),
            Player::White => f.write_str("white"),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    Empty,
    Black,
    White,
}

/// Result of checking a single placement.
#[derive(PartialEq, Eq, Clone, Debug, Serialize)]
pub struct MoveCheck {
    #[serde(rename = "valid")]
    pub is_valid: bool,
    /// Opponent squares flipped by the move, direction by direction, nearest first.
    pub captured: Vec<Position>,
}

impl MoveCheck {
    fn invalid() -> Self {
        Self { is_valid: false, captured: Vec::new() }
    }
}

#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct Board {
    black_squares: BitBoard,
    white_squares: BitBoard,
}

impl Board {
    /// The standard opening: White on (3,3) and (4,4), Black on (3,4) and (4,3).
    pub fn new() -> Self {
        let mut board = Self::empty();
        board.set(Position::new(3, 3), Cell::White);
        board.set(Position::new(3, 4), Cell::Black);
        board.set(Position::new(4, 3), Cell::Black);
        board.set(Position::new(4, 4), Cell::White);
        board
    }

    pub fn empty() -> Self {
        Self {
            black_squares: BitBoard::empty(),
            white_squares: BitBoard::empty(),
        }
    }

    pub fn get(&self, pos: Position) -> Cell {
        if self.black_squares.get_point(pos) {
            Cell::Black
        } else if self.white_squares.get_point(pos) {
            Cell::White
        } else {
            Cell::Empty
        }
    }

    pub fn set(&mut self, pos: Position, cell: Cell) {
        self.black_squares.set_point(pos, cell == Cell::Black);
        self.white_squares.set_point(pos, cell == Cell::White);
    }

    fn squares(&self, player: Player) -> &BitBoard {
        match player {
            Player::Black => &self.black_squares,
            Player::White => &self.white_squares,
        }
    }

    fn squares_mut(&mut self, player: Player) -> &mut BitBoard {
        match player {
            Player::Black => &mut self.black_squares,
            Player::White => &mut self.white_squares,
        }
    }

    pub fn count(&self, player: Player) -> usize {
        self.squares(player).count_ones()
    }

    pub fn count_empty(&self) -> usize {
        B - self.count(Player::Black) - self.count(Player::White)
    }

    pub fn validate_move(&self, pos: Position, player: Player) -> MoveCheck {
        if self.get(pos) != Cell::Empty {
            return MoveCheck::invalid();
        }

        let mine = self.squares(player);
        let theirs = self.squares(player.opponent());
        let mut captured = Vec::new();

        for (dr, dc) in DIRECTIONS {
            let mut line = Vec::new();
            let mut next = pos.step(dr, dc);
            while let Some(square) = next.filter(|sq| theirs.get_point(*sq)) {
                line.push(square);
                next = square.step(dr, dc);
            }
            // a run only counts when it is closed off by one of our own pieces
            if !line.is_empty() && next.map_or(false, |sq| mine.get_point(sq)) {
                captured.extend(line);
            }
        }

        MoveCheck { is_valid: !captured.is_empty(), captured }
    }

    pub fn legal_moves(&self, player: Player) -> Vec<Position> {
        let occupied = self.black_squares | self.white_squares;
        (!occupied).iter_set_points()
            .filter(|pos| self.validate_move(*pos, player).is_valid)
            .collect()
    }

    /// Writes `player` onto `pos` and every captured square, leaving `self` untouched.
    /// Legality is the caller's responsibility.
    pub fn place(&self, pos: Position, player: Player, captured: &[Position]) -> Self {
        let mut board = self.clone();
        let mut flipped = BitBoard::from_point(pos);
        for square in captured {
            flipped.set_point(*square, true);
        }
        *board.squares_mut(player) |= flipped;
        *board.squares_mut(player.opponent()) &= !flipped;
        board
    }

    /// Plays `pos` for `player`, flipping whatever the move brackets.
    pub fn apply(&self, pos: Position, player: Player) -> Self {
        let check = self.validate_move(pos, player);
        self.place(pos, player, &check.captured)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for Board {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        let mut s = serializer.serialize_seq(Some(SIZE))?;
        for row in 0..SIZE {
            let cells: Vec<Cell> = (0..SIZE).map(|col| self.get(Position::new(row, col))).collect();
            s.serialize_element(&cells)?;
        }
        s.end()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in 0..SIZE {
            for col in 0..SIZE {
                let symbol = match self.get(Position::new(row, col)) {
                    Cell::Empty => '.',
                    Cell::Black => 'X',
                    Cell::White => 'O',
                };
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
