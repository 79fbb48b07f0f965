use thiserror::Error;

use crate::board::{Board, Mark, Move, MoveError};

pub type MatchId = u64;

/// A participant of one match. Fixed once the match starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub mark: Mark,
}

impl Player {
    pub fn new(name: impl Into<String>, mark: Mark) -> Self {
        Self {
            name: name.into(),
            mark,
        }
    }
}

/// Match state machine. `Won` and `Draw` are final.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchStatus {
    InProgress,
    Won(Player),
    Draw,
}

impl MatchStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, MatchStatus::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("the match is already over")]
    Finished,
    #[error("not your turn")]
    NotYourTurn,
    #[error(transparent)]
    Illegal(#[from] MoveError),
}

/// One game between two players: the board, who is who, and whose turn it is.
#[derive(Clone, Debug)]
pub struct MatchSession {
    id: MatchId,
    board: Board,
    players: [Player; 2],
    turn: usize,
    status: MatchStatus,
}

impl MatchSession {
    /// The first player gets black and moves first.
    pub fn new(id: MatchId, first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            id,
            board: Board::new(),
            players: [
                Player::new(first, Mark::Black),
                Player::new(second, Mark::White),
            ],
            turn: 0,
            status: MatchStatus::InProgress,
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn players(&self) -> &[Player; 2] {
        &self.players
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn current_player(&self) -> &Player {
        &self.players[self.turn]
    }

    pub fn status(&self) -> &MatchStatus {
        &self.status
    }

    pub fn seat_of(&self, name: &str) -> Option<usize> {
        self.players.iter().position(|p| p.name == name)
    }

    /// Plays `mv` for the player holding `mark`.
    ///
    /// Rejections leave the session untouched. When both marks own a line
    /// after the turn, the mover is declared the winner.
    pub fn register_move(&mut self, mark: Mark, mv: Move) -> Result<&MatchStatus, MatchError> {
        if self.status.is_finished() {
            return Err(MatchError::Finished);
        }
        let mover = &self.players[self.turn];
        if mover.mark != mark {
            return Err(MatchError::NotYourTurn);
        }
        self.board.apply_move(mv, mark)?;

        let opponent = &self.players[1 - self.turn];
        self.status = if self.board.is_winner(mark) {
            MatchStatus::Won(mover.clone())
        } else if self.board.is_winner(mark.other()) {
            MatchStatus::Won(opponent.clone())
        } else if self.board.is_full() {
            MatchStatus::Draw
        } else {
            self.turn = 1 - self.turn;
            MatchStatus::InProgress
        };
        Ok(&self.status)
    }
}
