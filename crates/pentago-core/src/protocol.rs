//! The `~`-separated line protocol spoken between clients and the server.
//!
//! Every message is one line: a command word followed by its fields, all
//! joined by [`SEPARATOR`]. Free text (chat bodies) is always the last field
//! and may itself contain the separator.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::board::Move;

pub const SEPARATOR: char = '~';

/// Optional protocol extensions announced in the client's HELLO.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Rank,
    Chat,
}

impl Capability {
    pub fn token(&self) -> &'static str {
        match self {
            Capability::Rank => "RANK",
            Capability::Chat => "CHAT",
        }
    }

    pub fn from_token(token: &str) -> Option<Capability> {
        match token {
            "RANK" => Some(Capability::Rank),
            "CHAT" => Some(Capability::Chat),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty line")]
    Empty,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("{command} is missing its {field}")]
    MissingField {
        command: &'static str,
        field: &'static str,
    },
    #[error("{command} has unexpected trailing fields")]
    TrailingFields { command: &'static str },
    #[error("{command} {field} is not a number: {value:?}")]
    InvalidNumber {
        command: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("{command} is not allowed {reason}")]
    OutOfSequence {
        command: &'static str,
        reason: &'static str,
    },
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Hello {
        banner: String,
        capabilities: Vec<Capability>,
    },
    Login {
        username: String,
    },
    /// Joins the queue, or leaves it when already waiting.
    Queue,
    Move(Move),
    Ping,
    Pong,
    List,
    Rank,
    Chat {
        text: String,
    },
    Whisper {
        target: String,
        text: String,
    },
    Quit,
}

impl ClientMessage {
    pub fn command(&self) -> &'static str {
        match self {
            ClientMessage::Hello { .. } => "HELLO",
            ClientMessage::Login { .. } => "LOGIN",
            ClientMessage::Queue => "QUEUE",
            ClientMessage::Move(_) => "MOVE",
            ClientMessage::Ping => "PING",
            ClientMessage::Pong => "PONG",
            ClientMessage::List => "LIST",
            ClientMessage::Rank => "RANK",
            ClientMessage::Chat { .. } => "CHAT",
            ClientMessage::Whisper { .. } => "WHISPER",
            ClientMessage::Quit => "QUIT",
        }
    }
}

/// Why a match ended, with the winner's name where there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOver {
    Victory(String),
    Draw,
    Disconnect(String),
}

impl GameOver {
    pub fn winner(&self) -> Option<&str> {
        match self {
            GameOver::Victory(name) | GameOver::Disconnect(name) => Some(name),
            GameOver::Draw => None,
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Hello {
        banner: String,
    },
    Login,
    AlreadyLoggedIn,
    /// The first name holds black and moves first.
    NewGame {
        first: String,
        second: String,
    },
    Move(Move),
    GameOver(GameOver),
    Ping,
    Pong,
    List(Vec<String>),
    Rank(Vec<(String, u32)>),
    Chat {
        sender: String,
        text: String,
    },
    Whisper {
        sender: String,
        text: String,
    },
    CannotWhisper {
        target: String,
    },
    Error {
        reason: String,
    },
}

/// Splits a line into its command word and the untouched remainder.
fn split_command(line: &str) -> Result<(&str, Option<&str>), ProtocolError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Err(ProtocolError::Empty);
    }
    Ok(match line.split_once(SEPARATOR) {
        Some((command, rest)) => (command, Some(rest)),
        None => (line, None),
    })
}

fn required<'a>(
    rest: Option<&'a str>,
    command: &'static str,
    field: &'static str,
) -> Result<&'a str, ProtocolError> {
    match rest {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ProtocolError::MissingField { command, field }),
    }
}

/// A single field that must be the last one on the line.
fn single<'a>(
    rest: Option<&'a str>,
    command: &'static str,
    field: &'static str,
) -> Result<&'a str, ProtocolError> {
    let value = required(rest, command, field)?;
    if value.contains(SEPARATOR) {
        return Err(ProtocolError::TrailingFields { command });
    }
    Ok(value)
}

/// Splits off the next field, leaving the rest (which may contain separators).
fn pair<'a>(
    rest: Option<&'a str>,
    command: &'static str,
    first: &'static str,
    second: &'static str,
) -> Result<(&'a str, &'a str), ProtocolError> {
    let rest = required(rest, command, first)?;
    let (a, b) = rest
        .split_once(SEPARATOR)
        .ok_or(ProtocolError::MissingField {
            command,
            field: second,
        })?;
    if a.is_empty() {
        return Err(ProtocolError::MissingField {
            command,
            field: first,
        });
    }
    Ok((a, b))
}

fn number<T: FromStr>(
    value: &str,
    command: &'static str,
    field: &'static str,
) -> Result<T, ProtocolError> {
    value.parse().map_err(|_| ProtocolError::InvalidNumber {
        command,
        field,
        value: value.to_string(),
    })
}

/// A decimal integer of any size. Values beyond `i64` saturate, so they
/// still reach the board and fail its range check.
fn integer(value: &str, command: &'static str, field: &'static str) -> Result<i64, ProtocolError> {
    if let Ok(n) = value.parse::<i64>() {
        return Ok(n);
    }
    let (negative, digits) = match value.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::InvalidNumber {
            command,
            field,
            value: value.to_string(),
        });
    }
    Ok(if negative { i64::MIN } else { i64::MAX })
}

fn parse_move(rest: Option<&str>) -> Result<Move, ProtocolError> {
    let (index, rotation) = pair(rest, "MOVE", "index", "rotation")?;
    if rotation.contains(SEPARATOR) {
        return Err(ProtocolError::TrailingFields { command: "MOVE" });
    }
    Ok(Move::raw(
        integer(index, "MOVE", "index")?,
        integer(rotation, "MOVE", "rotation")?,
    ))
}

impl FromStr for ClientMessage {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (command, rest) = split_command(line)?;
        let message = match command {
            "HELLO" => {
                let mut fields = rest.unwrap_or_default().split(SEPARATOR);
                let banner = fields.next().unwrap_or_default().to_string();
                let capabilities = fields.filter_map(Capability::from_token).collect();
                ClientMessage::Hello {
                    banner,
                    capabilities,
                }
            }
            "LOGIN" => ClientMessage::Login {
                username: single(rest, "LOGIN", "username")?.to_string(),
            },
            "QUEUE" => ClientMessage::Queue,
            "MOVE" => ClientMessage::Move(parse_move(rest)?),
            "PING" => ClientMessage::Ping,
            "PONG" => ClientMessage::Pong,
            "LIST" => ClientMessage::List,
            "RANK" => ClientMessage::Rank,
            "CHAT" => ClientMessage::Chat {
                text: required(rest, "CHAT", "text")?.to_string(),
            },
            "WHISPER" => {
                let (target, text) = pair(rest, "WHISPER", "target", "text")?;
                ClientMessage::Whisper {
                    target: target.to_string(),
                    text: text.to_string(),
                }
            }
            "QUIT" => ClientMessage::Quit,
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };
        Ok(message)
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())?;
        match self {
            ClientMessage::Hello {
                banner,
                capabilities,
            } => {
                write!(f, "{SEPARATOR}{banner}")?;
                for capability in capabilities {
                    write!(f, "{SEPARATOR}{}", capability.token())?;
                }
                Ok(())
            }
            ClientMessage::Login { username } => write!(f, "{SEPARATOR}{username}"),
            ClientMessage::Move(mv) => write!(f, "{SEPARATOR}{}{SEPARATOR}{}", mv.index, mv.rotation),
            ClientMessage::Chat { text } => write!(f, "{SEPARATOR}{text}"),
            ClientMessage::Whisper { target, text } => {
                write!(f, "{SEPARATOR}{target}{SEPARATOR}{text}")
            }
            ClientMessage::Queue
            | ClientMessage::Ping
            | ClientMessage::Pong
            | ClientMessage::List
            | ClientMessage::Rank
            | ClientMessage::Quit => Ok(()),
        }
    }
}

impl FromStr for ServerMessage {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (command, rest) = split_command(line)?;
        let message = match command {
            "HELLO" => ServerMessage::Hello {
                banner: rest.unwrap_or_default().to_string(),
            },
            "LOGIN" => ServerMessage::Login,
            "ALREADYLOGGEDIN" => ServerMessage::AlreadyLoggedIn,
            "NEWGAME" => {
                let (first, second) = pair(rest, "NEWGAME", "first player", "second player")?;
                ServerMessage::NewGame {
                    first: first.to_string(),
                    second: second.to_string(),
                }
            }
            "MOVE" => ServerMessage::Move(parse_move(rest)?),
            "GAMEOVER" => {
                let reason = required(rest, "GAMEOVER", "reason")?;
                let (reason, winner) = match reason.split_once(SEPARATOR) {
                    Some((reason, winner)) => (reason, Some(winner.to_string())),
                    None => (reason, None),
                };
                let missing = ProtocolError::MissingField {
                    command: "GAMEOVER",
                    field: "winner",
                };
                ServerMessage::GameOver(match reason {
                    "VICTORY" => GameOver::Victory(winner.ok_or(missing)?),
                    "DISCONNECT" => GameOver::Disconnect(winner.ok_or(missing)?),
                    "DRAW" => GameOver::Draw,
                    other => return Err(ProtocolError::UnknownCommand(other.to_string())),
                })
            }
            "PING" => ServerMessage::Ping,
            "PONG" => ServerMessage::Pong,
            "LIST" => ServerMessage::List(
                rest.map(|names| names.split(SEPARATOR).map(str::to_string).collect())
                    .unwrap_or_default(),
            ),
            "RANK" => {
                let mut standings = Vec::new();
                if let Some(rest) = rest {
                    let mut fields = rest.split(SEPARATOR);
                    while let Some(name) = fields.next() {
                        let wins = fields.next().ok_or(ProtocolError::MissingField {
                            command: "RANK",
                            field: "wins",
                        })?;
                        standings.push((name.to_string(), number(wins, "RANK", "wins")?));
                    }
                }
                ServerMessage::Rank(standings)
            }
            "CHAT" => {
                let (sender, text) = pair(rest, "CHAT", "sender", "text")?;
                ServerMessage::Chat {
                    sender: sender.to_string(),
                    text: text.to_string(),
                }
            }
            "WHISPER" => {
                let (sender, text) = pair(rest, "WHISPER", "sender", "text")?;
                ServerMessage::Whisper {
                    sender: sender.to_string(),
                    text: text.to_string(),
                }
            }
            "CANNOTWHISPER" => ServerMessage::CannotWhisper {
                target: required(rest, "CANNOTWHISPER", "target")?.to_string(),
            },
            "ERROR" => ServerMessage::Error {
                reason: rest.unwrap_or_default().to_string(),
            },
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };
        Ok(message)
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const S: char = SEPARATOR;
        match self {
            ServerMessage::Hello { banner } => write!(f, "HELLO{S}{banner}"),
            ServerMessage::Login => f.write_str("LOGIN"),
            ServerMessage::AlreadyLoggedIn => f.write_str("ALREADYLOGGEDIN"),
            ServerMessage::NewGame { first, second } => write!(f, "NEWGAME{S}{first}{S}{second}"),
            ServerMessage::Move(mv) => write!(f, "MOVE{S}{}{S}{}", mv.index, mv.rotation),
            ServerMessage::GameOver(GameOver::Victory(winner)) => {
                write!(f, "GAMEOVER{S}VICTORY{S}{winner}")
            }
            ServerMessage::GameOver(GameOver::Disconnect(winner)) => {
                write!(f, "GAMEOVER{S}DISCONNECT{S}{winner}")
            }
            ServerMessage::GameOver(GameOver::Draw) => write!(f, "GAMEOVER{S}DRAW"),
            ServerMessage::Ping => f.write_str("PING"),
            ServerMessage::Pong => f.write_str("PONG"),
            ServerMessage::List(names) => {
                f.write_str("LIST")?;
                for name in names {
                    write!(f, "{S}{name}")?;
                }
                Ok(())
            }
            ServerMessage::Rank(standings) => {
                f.write_str("RANK")?;
                for (name, wins) in standings {
                    write!(f, "{S}{name}{S}{wins}")?;
                }
                Ok(())
            }
            ServerMessage::Chat { sender, text } => write!(f, "CHAT{S}{sender}{S}{text}"),
            ServerMessage::Whisper { sender, text } => write!(f, "WHISPER{S}{sender}{S}{text}"),
            ServerMessage::CannotWhisper { target } => write!(f, "CANNOTWHISPER{S}{target}"),
            ServerMessage::Error { reason } => write!(f, "ERROR{S}{reason}"),
        }
    }
}
