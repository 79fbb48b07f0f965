use log::{debug, info, warn};

use pentago_core::protocol::{Capability, ClientMessage, GameOver, ServerMessage};
use pentago_core::{Board, Mark, Move, MoveError, Strategy};

/// Client-side view of one connection: login, queueing and the match in play.
pub struct BotGame {
    base_name: String,
    name: String,
    attempts: u32,
    strategy: Box<dyn Strategy + Send + Sync>,
    /// Matches to play, 0 for no limit.
    games: u32,
    played: u32,
    mark: Option<Mark>,
    board: Board,
    to_move: Mark,
    done: bool,
}

impl BotGame {
    pub fn new(name: String, strategy: Box<dyn Strategy + Send + Sync>, games: u32) -> Self {
        Self {
            base_name: name.clone(),
            name,
            attempts: 0,
            strategy,
            games,
            played: 0,
            mark: None,
            board: Board::new(),
            to_move: Mark::Black,
            done: false,
        }
    }

    pub fn greeting(&self) -> ClientMessage {
        ClientMessage::Hello {
            banner: format!("pentago-bot ({})", self.strategy.name()),
            capabilities: vec![Capability::Rank],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn my_turn(&self) -> bool {
        self.mark == Some(self.to_move)
    }

    /// Resets the board for a new match. Returns our mark, if we are in it.
    pub fn start(&mut self, first: &str, second: &str) -> Option<Mark> {
        self.mark = if first == self.name {
            Some(Mark::Black)
        } else if second == self.name {
            Some(Mark::White)
        } else {
            None
        };
        self.board = Board::new();
        self.to_move = Mark::Black;
        self.mark
    }

    /// Plays a move echoed by the server for whoever is on turn.
    pub fn apply(&mut self, mv: Move) -> Result<(), MoveError> {
        self.board.apply_move(mv, self.to_move)?;
        self.to_move = self.to_move.other();
        Ok(())
    }

    pub fn next_move(&self) -> Option<Move> {
        let mark = self.mark.filter(|_| self.my_turn())?;
        self.strategy.suggest_move(&self.board, mark)
    }

    fn play(&self) -> Vec<ClientMessage> {
        self.next_move().map(ClientMessage::Move).into_iter().collect()
    }

    /// Reacts to one server line and returns what to send back.
    pub fn handle(&mut self, msg: ServerMessage) -> Vec<ClientMessage> {
        match msg {
            ServerMessage::Hello { banner } => {
                info!("Server says hello: {banner}");
                vec![ClientMessage::Login {
                    username: self.name.clone(),
                }]
            }
            ServerMessage::AlreadyLoggedIn => {
                self.attempts += 1;
                self.name = format!("{}{}", self.base_name, self.attempts);
                debug!("Name taken, trying {}", self.name);
                vec![ClientMessage::Login {
                    username: self.name.clone(),
                }]
            }
            ServerMessage::Login => {
                info!("Logged in as {}", self.name);
                vec![ClientMessage::Queue]
            }
            ServerMessage::NewGame { first, second } => {
                match self.start(&first, &second) {
                    Some(mark) => info!("New game {first} vs {second}, playing {mark}"),
                    None => warn!("Paired into a game without us: {first} vs {second}"),
                }
                self.play()
            }
            ServerMessage::Move(mv) => {
                if let Err(e) = self.apply(mv) {
                    warn!("Server move {}~{} does not fit our board: {e}", mv.index, mv.rotation);
                    return Vec::new();
                }
                self.play()
            }
            ServerMessage::GameOver(outcome) => {
                self.mark = None;
                self.played += 1;
                match &outcome {
                    GameOver::Victory(winner) if *winner == self.name => info!("Won"),
                    GameOver::Victory(winner) => info!("Lost to {winner}"),
                    GameOver::Disconnect(_) => info!("Opponent left"),
                    GameOver::Draw => info!("Draw"),
                }
                info!("Final board:\n{}", self.board);
                if self.games != 0 && self.played >= self.games {
                    vec![ClientMessage::Rank]
                } else {
                    vec![ClientMessage::Queue]
                }
            }
            ServerMessage::Rank(standings) => {
                for (name, wins) in &standings {
                    info!("{name}: {wins}");
                }
                self.done = true;
                vec![ClientMessage::Quit]
            }
            ServerMessage::Ping => vec![ClientMessage::Pong],
            ServerMessage::Error { reason } => {
                warn!("Server rejected our move: {reason}");
                Vec::new()
            }
            other => {
                debug!("Ignoring {other}");
                Vec::new()
            }
        }
    }
}
