pub mod board;
pub mod game;
pub mod protocol;
pub mod ranking;
pub mod strategy;

pub use board::{Board, Cell, Mark, Move, MoveError, Rotation};
pub use game::{MatchError, MatchId, MatchSession, MatchStatus, Player};
pub use protocol::{Capability, ClientMessage, GameOver, ProtocolError, ServerMessage};
pub use ranking::RankingTable;
pub use strategy::{NaiveStrategy, SmartStrategy, Strategy, StrategyKind};
