use std::fmt;

use thiserror::Error;

/// Side length of the board.
pub const SIZE: usize = 6;
/// Number of cells on the board.
pub const CELLS: usize = SIZE * SIZE;
/// Number of distinct rotation codes (4 quadrants x 2 directions).
pub const ROTATIONS: u8 = 8;
/// Marks in a row needed to win.
pub const WIN_LENGTH: usize = 5;

const QUADRANT: usize = 3;
const WINDOW_COUNT: usize = 32;

/// Every five-cell window that wins when filled with one mark.
static WINDOWS: [[usize; WIN_LENGTH]; WINDOW_COUNT] = build_windows();

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mark {
    Black,
    White,
}

impl Mark {
    pub fn other(self) -> Mark {
        match self {
            Mark::Black => Mark::White,
            Mark::White => Mark::Black,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::Black => f.write_str("black"),
            Mark::White => f.write_str("white"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Cell {
    #[default]
    Empty,
    Black,
    White,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn mark(&self) -> Option<Mark> {
        match self {
            Cell::Empty => None,
            Cell::Black => Some(Mark::Black),
            Cell::White => Some(Mark::White),
        }
    }

    fn symbol(&self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Black => 'B',
            Cell::White => 'W',
        }
    }
}

impl From<Mark> for Cell {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::Black => Cell::Black,
            Mark::White => Cell::White,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    /// (row, col) of the quadrant's top-left cell.
    pub fn origin(&self) -> (usize, usize) {
        match self {
            Quadrant::TopLeft => (0, 0),
            Quadrant::TopRight => (0, QUADRANT),
            Quadrant::BottomLeft => (QUADRANT, 0),
            Quadrant::BottomRight => (QUADRANT, QUADRANT),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    CounterClockwise,
    Clockwise,
}

/// A quadrant turn, encoded on the wire as `quadrant * 2 + direction`
/// where an even code turns counter-clockwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rotation {
    pub quadrant: Quadrant,
    pub direction: Direction,
}

impl Rotation {
    pub fn new(quadrant: Quadrant, direction: Direction) -> Self {
        Self {
            quadrant,
            direction,
        }
    }

    pub fn from_code(code: u8) -> Option<Rotation> {
        if code >= ROTATIONS {
            return None;
        }
        let quadrant = Quadrant::ALL[(code / 2) as usize];
        let direction = if code % 2 == 0 {
            Direction::CounterClockwise
        } else {
            Direction::Clockwise
        };
        Some(Rotation::new(quadrant, direction))
    }

    pub fn code(&self) -> u8 {
        let quadrant = match self.quadrant {
            Quadrant::TopLeft => 0,
            Quadrant::TopRight => 1,
            Quadrant::BottomLeft => 2,
            Quadrant::BottomRight => 3,
        };
        let direction = match self.direction {
            Direction::CounterClockwise => 0,
            Direction::Clockwise => 1,
        };
        quadrant * 2 + direction
    }
}

/// A placement followed by a quadrant turn, as sent on the wire.
///
/// Values are kept raw (negative or huge numbers included); use
/// [`Board::check_move`] before trusting them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub index: i64,
    pub rotation: i64,
}

impl Move {
    pub fn new(index: usize, rotation: u8) -> Self {
        Self::raw(i64::try_from(index).unwrap_or(i64::MAX), rotation.into())
    }

    pub fn raw(index: i64, rotation: i64) -> Self {
        Self { index, rotation }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("field {0} is not on the board")]
    IndexOutOfRange(i64),
    #[error("rotation {0} does not exist")]
    InvalidRotation(i64),
    #[error("field {0} is already taken")]
    Occupied(usize),
}

pub fn index(row: usize, col: usize) -> usize {
    row * SIZE + col
}

/// The 6x6 playing field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [Cell; CELLS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [Cell::Empty; CELLS],
        }
    }

    pub fn cells(&self) -> &[Cell; CELLS] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<Cell> {
        if row >= SIZE || col >= SIZE {
            return None;
        }
        Some(self.cells[index(row, col)])
    }

    /// Overwrites a cell without rotating. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, cell: Cell) {
        if let Some(slot) = self.cells.get_mut(index) {
            *slot = cell;
        }
    }

    /// Independent copy for look-ahead.
    pub fn copy(&self) -> Board {
        *self
    }

    pub fn is_legal_move(&self, index: usize, rotation: u8) -> bool {
        self.check_move(Move::new(index, rotation)).is_ok()
    }

    /// Validates a raw move, returning the target cell and the turn to make.
    pub fn check_move(&self, mv: Move) -> Result<(usize, Rotation), MoveError> {
        let rotation = u8::try_from(mv.rotation)
            .ok()
            .and_then(Rotation::from_code)
            .ok_or(MoveError::InvalidRotation(mv.rotation))?;
        let index = usize::try_from(mv.index)
            .ok()
            .filter(|&i| i < CELLS)
            .ok_or(MoveError::IndexOutOfRange(mv.index))?;
        if !self.cells[index].is_empty() {
            return Err(MoveError::Occupied(index));
        }
        Ok((index, rotation))
    }

    /// Places `mark` and turns the chosen quadrant. Illegal moves leave the
    /// board untouched.
    pub fn apply_move(&mut self, mv: Move, mark: Mark) -> Result<(), MoveError> {
        let (index, rotation) = self.check_move(mv)?;
        self.cells[index] = mark.into();
        self.rotate(rotation);
        Ok(())
    }

    /// Turns one quadrant by 90 degrees: transpose it, then mirror the outer
    /// rows (counter-clockwise) or the outer columns (clockwise).
    pub fn rotate(&mut self, rotation: Rotation) {
        let (row, col) = rotation.quadrant.origin();
        self.transpose(row, col);
        match rotation.direction {
            Direction::CounterClockwise => {
                for c in col..col + QUADRANT {
                    self.cells
                        .swap(index(row, c), index(row + QUADRANT - 1, c));
                }
            }
            Direction::Clockwise => {
                for r in row..row + QUADRANT {
                    self.cells
                        .swap(index(r, col), index(r, col + QUADRANT - 1));
                }
            }
        }
    }

    fn transpose(&mut self, row: usize, col: usize) {
        for i in 0..QUADRANT {
            for j in i + 1..QUADRANT {
                self.cells
                    .swap(index(row + i, col + j), index(row + j, col + i));
            }
        }
    }

    pub fn is_winner(&self, mark: Mark) -> bool {
        let cell = Cell::from(mark);
        WINDOWS
            .iter()
            .any(|window| window.iter().all(|&i| self.cells[i] == cell))
    }

    /// Marks that currently own a winning line; after a rotation both can.
    pub fn winners(&self) -> Vec<Mark> {
        [Mark::Black, Mark::White]
            .into_iter()
            .filter(|mark| self.is_winner(*mark))
            .collect()
    }

    pub fn has_winner(&self) -> bool {
        self.is_winner(Mark::Black) || self.is_winner(Mark::White)
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| !cell.is_empty())
    }

    pub fn is_over(&self) -> bool {
        self.is_full() || self.has_winner()
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(i, _)| i)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..SIZE {
            if row == QUADRANT {
                writeln!(f, "------+------")?;
            }
            for col in 0..SIZE {
                if col == QUADRANT {
                    f.write_str("| ")?;
                }
                write!(f, "{} ", self.cells[index(row, col)].symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

const fn build_windows() -> [[usize; WIN_LENGTH]; WINDOW_COUNT] {
    let mut out = [[0; WIN_LENGTH]; WINDOW_COUNT];
    let mut n = 0;

    // Rows and columns: two windows per line.
    let mut line = 0;
    while line < SIZE {
        let mut start = 0;
        while start + WIN_LENGTH <= SIZE {
            let mut k = 0;
            while k < WIN_LENGTH {
                out[n][k] = line * SIZE + start + k;
                out[n + 1][k] = (start + k) * SIZE + line;
                k += 1;
            }
            n += 2;
            start += 1;
        }
        line += 1;
    }

    // Main and anti diagonals: two windows each.
    let mut offset = 0;
    while offset + WIN_LENGTH <= SIZE {
        let mut k = 0;
        while k < WIN_LENGTH {
            let i = offset + k;
            out[n][k] = i * SIZE + i;
            out[n + 1][k] = i * SIZE + (SIZE - 1 - i);
            k += 1;
        }
        n += 2;
        offset += 1;
    }

    // The four length-5 diagonals beside them.
    let mut k = 0;
    while k < WIN_LENGTH {
        out[n][k] = k * SIZE + k + 1;
        out[n + 1][k] = (k + 1) * SIZE + k;
        out[n + 2][k] = k * SIZE + (SIZE - 2 - k);
        out[n + 3][k] = (k + 1) * SIZE + (SIZE - 1 - k);
        k += 1;
    }
    assert!(n + 4 == WINDOW_COUNT);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_rotations() -> Vec<Rotation> {
        (0..ROTATIONS).filter_map(Rotation::from_code).collect()
    }

    fn numbered_board() -> Board {
        // A board whose cells are distinguishable enough to catch a wrong turn.
        let mut board = Board::new();
        for i in 0..CELLS {
            let cell = match i % 3 {
                0 => Cell::Empty,
                1 => Cell::Black,
                _ => Cell::White,
            };
            board.set(i, cell);
        }
        board.set(4, Cell::Black);
        board.set(13, Cell::White);
        board
    }

    #[test]
    fn rotation_codes_round_trip() {
        for code in 0..ROTATIONS {
            assert_eq!(Rotation::from_code(code).unwrap().code(), code);
        }
        assert_eq!(Rotation::from_code(8), None);
        assert_eq!(
            Rotation::from_code(5),
            Some(Rotation::new(Quadrant::BottomLeft, Direction::Clockwise))
        );
    }

    #[test]
    fn four_turns_restore_the_board() {
        let original = numbered_board();
        for rotation in all_rotations() {
            let mut board = original;
            for _ in 0..4 {
                board.rotate(rotation);
            }
            assert_eq!(board, original, "rotation {:?}", rotation);
        }
    }

    #[test]
    fn one_turn_changes_only_its_quadrant() {
        let original = numbered_board();
        for rotation in all_rotations() {
            let mut board = original;
            board.rotate(rotation);
            let (row, col) = rotation.quadrant.origin();
            for r in 0..SIZE {
                for c in 0..SIZE {
                    let inside = (row..row + 3).contains(&r) && (col..col + 3).contains(&c);
                    if !inside {
                        assert_eq!(board.cell_at(r, c), original.cell_at(r, c));
                    }
                }
            }
        }
    }

    #[test]
    fn clockwise_moves_top_left_corner_to_top_right() {
        let mut board = Board::new();
        board.set(index(0, 0), Cell::Black);
        board.rotate(Rotation::new(Quadrant::TopLeft, Direction::Clockwise));
        assert_eq!(board.cell_at(0, 2), Some(Cell::Black));
        assert_eq!(board.cell_at(0, 0), Some(Cell::Empty));
    }

    #[test]
    fn counter_clockwise_moves_top_left_corner_to_bottom_left() {
        let mut board = Board::new();
        board.set(index(3, 3), Cell::White);
        board.rotate(Rotation::new(Quadrant::BottomRight, Direction::CounterClockwise));
        assert_eq!(board.cell_at(5, 3), Some(Cell::White));
    }

    #[test]
    fn opposite_turns_cancel() {
        let original = numbered_board();
        for quadrant in Quadrant::ALL {
            let mut board = original;
            board.rotate(Rotation::new(quadrant, Direction::Clockwise));
            board.rotate(Rotation::new(quadrant, Direction::CounterClockwise));
            assert_eq!(board, original);
        }
    }

    #[test]
    fn legality() {
        let mut board = Board::new();
        assert!(board.is_legal_move(0, 0));
        assert!(board.is_legal_move(35, 7));
        assert!(!board.is_legal_move(36, 0));
        assert!(!board.is_legal_move(0, 8));

        board.set(7, Cell::White);
        assert!(!board.is_legal_move(7, 3));
        assert_eq!(board.check_move(Move::new(7, 3)), Err(MoveError::Occupied(7)));
        assert_eq!(
            board.check_move(Move::new(40, 1)),
            Err(MoveError::IndexOutOfRange(40))
        );
        assert_eq!(
            board.check_move(Move::new(1, 9)),
            Err(MoveError::InvalidRotation(9))
        );
    }

    #[test]
    fn raw_values_outside_the_board_are_rejected() {
        let board = Board::new();
        assert_eq!(
            board.check_move(Move::raw(-1, 0)),
            Err(MoveError::IndexOutOfRange(-1))
        );
        assert_eq!(
            board.check_move(Move::raw(7, 300)),
            Err(MoveError::InvalidRotation(300))
        );
        assert_eq!(
            board.check_move(Move::raw(7, -2)),
            Err(MoveError::InvalidRotation(-2))
        );
        assert_eq!(
            board.check_move(Move::raw(i64::MAX, 0)),
            Err(MoveError::IndexOutOfRange(i64::MAX))
        );
        assert_eq!(
            board.check_move(Move::raw(35, 7)),
            Ok((35, Rotation::new(Quadrant::BottomRight, Direction::Clockwise)))
        );
    }

    #[test]
    fn illegal_move_leaves_board_untouched() {
        let mut board = numbered_board();
        let before = board;
        assert!(board.apply_move(Move::new(1, 0), Mark::Black).is_err());
        assert!(board.apply_move(Move::new(0, 8), Mark::Black).is_err());
        assert_eq!(board, before);
    }

    #[test]
    fn apply_move_places_then_rotates() {
        let mut board = Board::new();
        // Cell 7 is the centre of the top-left quadrant, so no turn moves it.
        board.apply_move(Move::new(7, 0), Mark::Black).unwrap();
        assert_eq!(board.cell(7), Some(Cell::Black));

        // Cell 0 turned clockwise lands on cell 2.
        board.apply_move(Move::new(0, 1), Mark::White).unwrap();
        assert_eq!(board.cell(2), Some(Cell::White));
        assert_eq!(board.cell(0), Some(Cell::Empty));
    }

    #[test]
    fn moves_keep_every_cell_valid() {
        let mut board = Board::new();
        let mut mark = Mark::Black;
        let mut played = 0;
        for step in 0..200usize {
            let index = (step * 7 + 3) % CELLS;
            let rotation = (step % 8) as u8;
            if board.apply_move(Move::new(index, rotation), mark).is_ok() {
                played += 1;
                mark = mark.other();
            }
            assert_eq!(board.cells().len(), CELLS);
            let filled = board.cells().iter().filter(|c| !c.is_empty()).count();
            assert_eq!(filled, played);
        }
    }

    #[test]
    fn five_in_a_row_wins_four_does_not() {
        let mut board = Board::new();
        for col in 0..4 {
            board.set(index(0, col), Cell::Black);
        }
        assert!(!board.is_winner(Mark::Black));

        board.set(index(0, 4), Cell::Black);
        assert!(board.is_winner(Mark::Black));
        assert!(!board.is_winner(Mark::White));
    }

    #[test]
    fn second_window_of_a_row_and_column_wins() {
        let mut board = Board::new();
        for col in 1..6 {
            board.set(index(5, col), Cell::White);
        }
        assert!(board.is_winner(Mark::White));

        let mut board = Board::new();
        for row in 1..6 {
            board.set(index(row, 2), Cell::Black);
        }
        assert!(board.is_winner(Mark::Black));
    }

    #[test]
    fn diagonals_win() {
        let diagonals: [[(usize, usize); 5]; 4] = [
            [(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)],
            [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)],
            [(1, 4), (2, 3), (3, 2), (4, 1), (5, 0)],
            [(1, 5), (2, 4), (3, 3), (4, 2), (5, 1)],
        ];
        for diagonal in diagonals {
            let mut board = Board::new();
            for (r, c) in diagonal {
                board.set(index(r, c), Cell::White);
            }
            assert!(board.is_winner(Mark::White), "{:?}", diagonal);
        }
    }

    #[test]
    fn broken_line_does_not_win() {
        let mut board = Board::new();
        for (r, c) in [(0, 0), (1, 1), (2, 2), (4, 4), (5, 5)] {
            board.set(index(r, c), Cell::Black);
        }
        assert!(!board.is_winner(Mark::Black));
    }

    #[test]
    fn both_marks_can_win_at_once() {
        let mut board = Board::new();
        for col in 0..5 {
            board.set(index(0, col), Cell::Black);
            board.set(index(5, col), Cell::White);
        }
        assert_eq!(board.winners(), vec![Mark::Black, Mark::White]);
        assert!(board.is_over());
    }

    #[test]
    fn full_board_is_over() {
        let mut board = Board::new();
        assert!(!board.is_over());
        for i in 0..CELLS {
            let row = i / SIZE;
            let cell = if ((i % SIZE) / 2 + row) % 2 == 0 {
                Cell::Black
            } else {
                Cell::White
            };
            board.set(i, cell);
        }
        assert!(board.is_full());
        assert!(board.is_over());
    }

    #[test]
    fn copy_is_independent() {
        let board = Board::new();
        let mut copy = board.copy();
        copy.apply_move(Move::new(3, 2), Mark::White).unwrap();
        assert_ne!(board, copy);
        assert!(board.cells().iter().all(Cell::is_empty));
    }

    #[test]
    fn display_draws_quadrants() {
        let mut board = Board::new();
        board.set(0, Cell::Black);
        let text = board.to_string();
        assert!(text.starts_with("B . . | . . . "));
        assert!(text.contains("------+------"));
        assert_eq!(text.lines().count(), SIZE + 1);
    }
}
