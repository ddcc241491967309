use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ROWS: usize = 6;
pub const COLS: usize = 7;
pub const CELL_COUNT: usize = ROWS * COLS;
pub const WIN_STREAK: usize = 4;

/// Line directions as (row step, col step): horizontal, vertical, and both diagonals.
pub const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    PlayerOne,
    PlayerTwo,
}

impl Side {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::PlayerOne => Self::PlayerTwo,
            Self::PlayerTwo => Self::PlayerOne,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::PlayerOne => 0,
            Self::PlayerTwo => 1,
        }
    }

    /// Wire digit of this side's disc.
    pub const fn digit(self) -> char {
        match self {
            Self::PlayerOne => '1',
            Self::PlayerTwo => '2',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoardStatus {
    InProgress,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardParseError {
    WrongLength(usize),
    InvalidDigit { index: usize, found: char },
    FloatingDisc { row: usize, col: usize },
    ImpossiblePosition,
}

impl fmt::Display for BoardParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongLength(len) => write!(f, "board state must be {CELL_COUNT} cells, got {len}"),
            Self::InvalidDigit { index, found } => {
                write!(f, "invalid cell '{found}' at index {index}")
            }
            Self::FloatingDisc { row, col } => write!(f, "disc at ({row}, {col}) has no support"),
            Self::ImpossiblePosition => write!(f, "disc counts or lines cannot arise from play"),
        }
    }
}

impl std::error::Error for BoardParseError {}

/// A 6x7 Connect-Four grid. Row 0 is the top row; discs settle towards row 5.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Side>; COLS]; ROWS],
    next_to_move: Side,
    status: BoardStatus,
    winner: Option<Side>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cells: [[None; COLS]; ROWS],
            next_to_move: Side::PlayerOne,
            status: BoardStatus::InProgress,
            winner: None,
        }
    }

    pub const fn next_to_move(&self) -> Side {
        self.next_to_move
    }

    pub const fn status(&self) -> BoardStatus {
        self.status
    }

    pub const fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn is_finished(&self) -> bool {
        self.status == BoardStatus::Finished
    }

    #[must_use]
    pub fn get_cell(&self, row: usize, col: usize) -> Option<Side> {
        self.cells.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    fn cell_at(&self, row: isize, col: isize) -> Option<Side> {
        let row = usize::try_from(row).ok()?;
        let col = usize::try_from(col).ok()?;
        self.get_cell(row, col)
    }

    pub fn is_column_full(&self, col: usize) -> bool {
        col >= COLS || self.cells[0][col].is_some()
    }

    /// Columns that still accept a disc, in ascending order.
    pub fn legal_columns(&self) -> impl Iterator<Item = usize> + '_ {
        (0..COLS).filter(|&c| !self.is_column_full(c))
    }

    pub fn lowest_open_column(&self) -> Option<usize> {
        self.legal_columns().next()
    }

    pub fn disc_count(&self, side: Side) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| **cell == Some(side))
            .count()
    }

    pub fn move_count(&self) -> usize {
        self.cells.iter().flatten().filter(|cell| cell.is_some()).count()
    }

    fn is_full(&self) -> bool {
        self.cells[0].iter().all(Option::is_some)
    }

    pub(crate) fn set_next_to_move(&mut self, side: Side) {
        self.next_to_move = side;
    }

    /// Drops a disc for the side to move. Returns false, leaving the board
    /// untouched, when the column is out of range or full, or the game is over.
    pub fn apply_move(&mut self, col: usize) -> bool {
        if col >= COLS || self.status != BoardStatus::InProgress {
            return false;
        }

        let Some(row) = (0..ROWS).rev().find(|&r| self.cells[r][col].is_none()) else {
            return false;
        };

        let side = self.next_to_move;
        self.cells[row][col] = Some(side);

        if self.completes_line(row, col, side) {
            self.status = BoardStatus::Finished;
            self.winner = Some(side);
        } else if self.is_full() {
            self.status = BoardStatus::Finished;
            self.winner = None;
        } else {
            self.next_to_move = side.opposite();
        }

        true
    }

    /// Checks only the four lines through (row, col).
    fn completes_line(&self, row: usize, col: usize, side: Side) -> bool {
        DIRECTIONS.iter().any(|&(dr, dc)| {
            1 + self.run_length(row, col, dr, dc, side) + self.run_length(row, col, -dr, -dc, side)
                >= WIN_STREAK
        })
    }

    fn run_length(&self, row: usize, col: usize, dr: isize, dc: isize, side: Side) -> usize {
        let mut count = 0;
        #[allow(clippy::cast_possible_wrap)]
        let (mut r, mut c) = (row as isize + dr, col as isize + dc);
        while self.cell_at(r, c) == Some(side) {
            count += 1;
            r += dr;
            c += dc;
        }
        count
    }

    fn has_line(&self, side: Side) -> bool {
        (0..ROWS).any(|r| {
            (0..COLS).any(|c| self.get_cell(r, c) == Some(side) && self.completes_line(r, c, side))
        })
    }

    /// Row-major, top row first; '0' empty, '1'/'2' for the sides.
    pub fn serialize(&self) -> String {
        self.cells
            .iter()
            .flatten()
            .map(|cell| cell.map_or('0', Side::digit))
            .collect()
    }

    /// Lenient counterpart of [`FromStr`]: anything malformed yields a fresh board.
    #[must_use]
    pub fn deserialize(state: &str) -> Self {
        state.parse().unwrap_or_default()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl FromStr for Board {
    type Err = BoardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != CELL_COUNT {
            return Err(BoardParseError::WrongLength(s.chars().count()));
        }

        let mut board = Self::new();
        for (index, ch) in s.chars().enumerate() {
            let cell = match ch {
                '0' => None,
                '1' => Some(Side::PlayerOne),
                '2' => Some(Side::PlayerTwo),
                found => return Err(BoardParseError::InvalidDigit { index, found }),
            };
            board.cells[index / COLS][index % COLS] = cell;
        }

        for row in 0..ROWS - 1 {
            for col in 0..COLS {
                if board.cells[row][col].is_some() && board.cells[row + 1][col].is_none() {
                    return Err(BoardParseError::FloatingDisc { row, col });
                }
            }
        }

        let ones = board.disc_count(Side::PlayerOne);
        let twos = board.disc_count(Side::PlayerTwo);
        let last_mover = match ones.checked_sub(twos) {
            Some(0) => Side::PlayerTwo,
            Some(1) => Side::PlayerOne,
            _ => return Err(BoardParseError::ImpossiblePosition),
        };

        let one_wins = board.has_line(Side::PlayerOne);
        let two_wins = board.has_line(Side::PlayerTwo);
        board.winner = match (one_wins, two_wins) {
            (true, true) => return Err(BoardParseError::ImpossiblePosition),
            (true, false) => Some(Side::PlayerOne),
            (false, true) => Some(Side::PlayerTwo),
            (false, false) => None,
        };

        if let Some(winner) = board.winner {
            // The winning disc ends the game, so the winner moved last.
            if winner != last_mover {
                return Err(BoardParseError::ImpossiblePosition);
            }
            board.status = BoardStatus::Finished;
            board.next_to_move = winner;
        } else if board.is_full() {
            board.status = BoardStatus::Finished;
            board.next_to_move = last_mover;
        } else if ones + twos > 0 {
            board.next_to_move = last_mover.opposite();
        }

        Ok(board)
    }
}
