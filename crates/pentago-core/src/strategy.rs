//! Move pickers for computer players.

use std::fmt;
use std::str::FromStr;

use rand::RngExt;
use rand::rng;

use crate::board::{Board, Mark, Move, ROTATIONS};

/// Centre cells of the four quadrants; they never move under rotation.
const CENTRES: [usize; 4] = [7, 10, 25, 28];

pub trait Strategy {
    fn name(&self) -> &'static str;

    /// The move to play as `mark`, or `None` when the game is already over.
    fn suggest_move(&self, board: &Board, mark: Mark) -> Option<Move>;
}

fn legal_moves(board: &Board) -> impl Iterator<Item = Move> + '_ {
    board
        .empty_cells()
        .flat_map(|index| (0..ROTATIONS).map(move |rotation| Move::new(index, rotation)))
}

fn winning_move(board: &Board, mark: Mark) -> Option<Move> {
    legal_moves(board).find(|&mv| {
        let mut copy = board.copy();
        copy.apply_move(mv, mark).is_ok() && copy.is_winner(mark)
    })
}

fn random_move(board: &Board) -> Option<Move> {
    let empty: Vec<usize> = board.empty_cells().collect();
    if empty.is_empty() {
        return None;
    }
    let mut rng = rng();
    let index = empty[rng.random_range(0..empty.len())];
    Some(Move::new(index, rng.random_range(0..ROTATIONS)))
}

/// Any legal move, picked uniformly at random.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveStrategy;

impl Strategy for NaiveStrategy {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn suggest_move(&self, board: &Board, _mark: Mark) -> Option<Move> {
        if board.is_over() {
            return None;
        }
        let moves: Vec<Move> = legal_moves(board).collect();
        if moves.is_empty() {
            return None;
        }
        Some(moves[rng().random_range(0..moves.len())])
    }
}

/// Takes the centres, then wins when it can, then blocks the opponent.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmartStrategy;

impl Strategy for SmartStrategy {
    fn name(&self) -> &'static str {
        "smart"
    }

    fn suggest_move(&self, board: &Board, mark: Mark) -> Option<Move> {
        if board.is_over() {
            return None;
        }
        if let Some(&centre) = CENTRES
            .iter()
            .find(|&&i| board.cell(i).is_some_and(|c| c.is_empty()))
        {
            return Some(Move::new(centre, 0));
        }
        winning_move(board, mark)
            .or_else(|| winning_move(board, mark.other()))
            .or_else(|| random_move(board))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    Naive,
    #[default]
    Smart,
}

impl StrategyKind {
    pub fn build(self) -> Box<dyn Strategy + Send + Sync> {
        match self {
            StrategyKind::Naive => Box::new(NaiveStrategy),
            StrategyKind::Smart => Box::new(SmartStrategy),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "naive" => Ok(StrategyKind::Naive),
            "smart" => Ok(StrategyKind::Smart),
            other => Err(format!("unknown strategy {other:?}, expected naive or smart")),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrategyKind::Naive => "naive",
            StrategyKind::Smart => "smart",
        })
    }
}
