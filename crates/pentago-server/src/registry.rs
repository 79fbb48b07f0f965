//! Shared server state and every request a client can make against it.
//!
//! Locking: the lobby mutex covers connections, names, the queue, the chat
//! set and rankings. Each running match sits in its own `matches` entry.
//! Locks are always taken lobby first, then a match entry; code holding a
//! match entry never waits on the lobby. Whoever removes a match from
//! `matches` is the one that reports its outcome.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use log::{debug, info, warn};

use pentago_core::{
    Capability, GameOver, MatchError, MatchId, MatchSession, MatchStatus, Move, RankingTable,
    ServerMessage,
};

use crate::error::{GameError, out_of_sequence};
use crate::queue::MatchmakingQueue;
use crate::state::{ActiveMatch, ConnectionHandle, ConnectionId, Outbound};

#[derive(Debug, Default)]
struct Lobby {
    connections: HashMap<ConnectionId, ConnectionHandle>,
    /// Logged-in name -> owning connection.
    names: HashMap<String, ConnectionId>,
    queue: MatchmakingQueue,
    chat: HashSet<ConnectionId>,
    rankings: RankingTable,
    next_match_id: MatchId,
}

fn accepted<'a>(
    connections: &'a mut HashMap<ConnectionId, ConnectionHandle>,
    id: ConnectionId,
    command: &'static str,
) -> Result<&'a mut ConnectionHandle, GameError> {
    let handle = connections
        .get_mut(&id)
        .ok_or_else(|| out_of_sequence(command, "on a closed connection"))?;
    if !handle.accepted {
        return Err(out_of_sequence(command, "before HELLO"));
    }
    Ok(handle)
}

fn logged_in<'a>(
    connections: &'a mut HashMap<ConnectionId, ConnectionHandle>,
    id: ConnectionId,
    command: &'static str,
) -> Result<&'a mut ConnectionHandle, GameError> {
    let handle = accepted(connections, id, command)?;
    if !handle.is_logged_in() {
        return Err(out_of_sequence(command, "before LOGIN"));
    }
    Ok(handle)
}

pub struct Registry {
    banner: String,
    lobby: Mutex<Lobby>,
    matches: DashMap<MatchId, ActiveMatch>,
    next_connection_id: AtomicU64,
}

impl Registry {
    pub fn new(banner: impl Into<String>) -> Self {
        Self {
            banner: banner.into(),
            lobby: Mutex::new(Lobby {
                next_match_id: 1,
                ..Lobby::default()
            }),
            matches: DashMap::new(),
            next_connection_id: AtomicU64::new(1),
        }
    }

    fn lobby(&self) -> MutexGuard<'_, Lobby> {
        self.lobby.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a freshly accepted socket.
    pub fn connect(&self, addr: SocketAddr, tx: Outbound) -> ConnectionId {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        self.lobby()
            .connections
            .insert(id, ConnectionHandle::new(id, addr, tx));
        info!("connection {id} from {addr}");
        id
    }

    pub fn handshake(
        &self,
        id: ConnectionId,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Result<(), GameError> {
        let mut guard = self.lobby();
        let lobby = &mut *guard;
        let handle = lobby
            .connections
            .get_mut(&id)
            .ok_or_else(|| out_of_sequence("HELLO", "on a closed connection"))?;
        handle.accepted = true;
        handle.capabilities.extend(capabilities);
        if handle.has(Capability::Chat) {
            lobby.chat.insert(id);
        }
        handle.send(ServerMessage::Hello {
            banner: self.banner.clone(),
        });
        Ok(())
    }

    pub fn login(&self, id: ConnectionId, name: &str) -> Result<(), GameError> {
        let mut guard = self.lobby();
        let lobby = &mut *guard;
        let handle = accepted(&mut lobby.connections, id, "LOGIN")?;
        if handle.is_logged_in() || lobby.names.contains_key(name) {
            return Err(GameError::NameTaken(name.to_string()));
        }
        lobby.names.insert(name.to_string(), id);
        handle.username = Some(name.to_string());
        handle.send(ServerMessage::Login);
        info!("connection {id} logged in as {name}");
        Ok(())
    }

    /// Joins or leaves the queue, starting a match when two are waiting.
    pub fn toggle_queue(&self, id: ConnectionId) -> Result<(), GameError> {
        let mut guard = self.lobby();
        let lobby = &mut *guard;
        let handle = logged_in(&mut lobby.connections, id, "QUEUE")?;
        if handle.match_id.is_some() {
            return Err(out_of_sequence("QUEUE", "during a match"));
        }
        let queued = lobby.queue.toggle(id);
        debug!(
            "connection {id} {} the queue",
            if queued { "joined" } else { "left" }
        );
        if let Some((first, second)) = lobby.queue.try_pair() {
            self.start_match(lobby, first, second);
        }
        Ok(())
    }

    fn start_match(&self, lobby: &mut Lobby, first: ConnectionId, second: ConnectionId) {
        let player = |id: ConnectionId| {
            let handle = lobby.connections.get(&id)?;
            Some((handle.username.clone()?, handle.tx.clone()))
        };
        let (Some((first_name, first_tx)), Some((second_name, second_tx))) =
            (player(first), player(second))
        else {
            warn!("dropping pairing of {first} and {second}: connection gone");
            return;
        };

        let match_id = lobby.next_match_id;
        lobby.next_match_id += 1;
        for peer in [first, second] {
            if let Some(handle) = lobby.connections.get_mut(&peer) {
                handle.match_id = Some(match_id);
            }
        }

        let active = ActiveMatch {
            session: MatchSession::new(match_id, first_name.clone(), second_name.clone()),
            peers: [(first, first_tx), (second, second_tx)],
        };
        active.broadcast(&ServerMessage::NewGame {
            first: first_name.clone(),
            second: second_name.clone(),
        });
        self.matches.insert(match_id, active);
        info!("match {match_id} started: {first_name} vs {second_name}");
    }

    /// Plays a move for the sender's seat and relays it to both players.
    pub fn submit_move(&self, id: ConnectionId, mv: Move) -> Result<(), GameError> {
        let match_id = {
            let mut lobby = self.lobby();
            let handle = logged_in(&mut lobby.connections, id, "MOVE")?;
            handle
                .match_id
                .ok_or_else(|| out_of_sequence("MOVE", "outside a match"))?
        };

        let finished = {
            let mut entry = self
                .matches
                .get_mut(&match_id)
                .ok_or_else(|| out_of_sequence("MOVE", "after the match ended"))?;
            let active = entry.value_mut();
            let seat = active
                .seat_of(id)
                .ok_or_else(|| out_of_sequence("MOVE", "in someone else's match"))?;
            let mark = active.session.players()[seat].mark;
            let finished = match active.session.register_move(mark, mv) {
                Ok(status) => status.is_finished(),
                Err(MatchError::NotYourTurn) => return Err(GameError::TurnOrder),
                Err(MatchError::Illegal(err)) => return Err(GameError::IllegalMove(err)),
                Err(MatchError::Finished) => {
                    return Err(out_of_sequence("MOVE", "after the match ended"));
                }
            };
            active.broadcast(&ServerMessage::Move(mv));
            finished
        };

        if finished {
            let mut lobby = self.lobby();
            if let Some((_, active)) = self.matches.remove(&match_id) {
                self.conclude(&mut lobby, active, None);
            }
        }
        Ok(())
    }

    /// Reports the outcome of a match that was just removed from `matches`.
    /// `leaver` is the connection that dropped out, if that is why it ended.
    fn conclude(&self, lobby: &mut Lobby, active: ActiveMatch, leaver: Option<ConnectionId>) {
        let session = &active.session;
        let outcome = match session.status() {
            MatchStatus::Won(player) => GameOver::Victory(player.name.clone()),
            MatchStatus::Draw => GameOver::Draw,
            MatchStatus::InProgress => {
                let Some(seat) = leaver.and_then(|id| active.seat_of(id)) else {
                    warn!("match {} removed while still running", session.id());
                    return;
                };
                GameOver::Disconnect(session.players()[1 - seat].name.clone())
            }
        };

        if let Some(winner) = outcome.winner() {
            let wins = lobby.rankings.record_win(winner);
            info!("match {} over: {winner} wins ({wins} total)", session.id());
        } else {
            info!("match {} over: draw", session.id());
        }

        active.broadcast(&ServerMessage::GameOver(outcome));
        for (peer, _) in &active.peers {
            if let Some(handle) = lobby.connections.get_mut(peer) {
                handle.match_id = None;
            }
        }
    }

    /// Forgets a connection. Safe to call more than once.
    pub fn disconnect(&self, id: ConnectionId) {
        let mut guard = self.lobby();
        let lobby = &mut *guard;
        let Some(handle) = lobby.connections.remove(&id) else {
            return;
        };
        if let Some(name) = &handle.username
            && lobby.names.get(name) == Some(&id)
        {
            lobby.names.remove(name);
        }
        lobby.queue.remove(id);
        lobby.chat.remove(&id);

        if let Some(match_id) = handle.match_id
            && let Some((_, active)) = self.matches.remove(&match_id)
        {
            self.conclude(lobby, active, Some(id));
        }
        info!(
            "connection {id} ({} from {}) closed",
            handle.username.as_deref().unwrap_or("anonymous"),
            handle.addr
        );
    }

    fn chat_sender<'a>(
        lobby: &'a mut Lobby,
        id: ConnectionId,
        command: &'static str,
    ) -> Result<&'a ConnectionHandle, GameError> {
        let handle = logged_in(&mut lobby.connections, id, command)?;
        if !handle.has(Capability::Chat) {
            return Err(GameError::Capability(Capability::Chat));
        }
        Ok(handle)
    }

    /// Sends `text` to every connection that speaks CHAT, the sender included.
    pub fn chat(&self, id: ConnectionId, text: &str) -> Result<(), GameError> {
        let mut guard = self.lobby();
        let sender = Self::chat_sender(&mut guard, id, "CHAT")?
            .username
            .clone()
            .unwrap_or_default();
        let msg = ServerMessage::Chat {
            sender,
            text: text.to_string(),
        };
        for peer in &guard.chat {
            if let Some(handle) = guard.connections.get(peer) {
                handle.send(msg.clone());
            }
        }
        Ok(())
    }

    pub fn whisper(&self, id: ConnectionId, target: &str, text: &str) -> Result<(), GameError> {
        let mut guard = self.lobby();
        let sender = Self::chat_sender(&mut guard, id, "WHISPER")?
            .username
            .clone()
            .unwrap_or_default();
        let recipient = guard
            .names
            .get(target)
            .filter(|peer| guard.chat.contains(*peer))
            .and_then(|peer| guard.connections.get(peer));
        match recipient {
            Some(recipient) => recipient.send(ServerMessage::Whisper {
                sender,
                text: text.to_string(),
            }),
            None => {
                if let Some(handle) = guard.connections.get(&id) {
                    handle.send(ServerMessage::CannotWhisper {
                        target: target.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn list(&self, id: ConnectionId) -> Result<(), GameError> {
        let mut guard = self.lobby();
        let lobby = &mut *guard;
        let handle = logged_in(&mut lobby.connections, id, "LIST")?;
        let mut names: Vec<String> = lobby.names.keys().cloned().collect();
        names.sort();
        handle.send(ServerMessage::List(names));
        Ok(())
    }

    pub fn rank(&self, id: ConnectionId) -> Result<(), GameError> {
        let mut guard = self.lobby();
        let lobby = &mut *guard;
        let handle = logged_in(&mut lobby.connections, id, "RANK")?;
        if !handle.has(Capability::Rank) {
            return Err(GameError::Capability(Capability::Rank));
        }
        handle.send(ServerMessage::Rank(lobby.rankings.standings()));
        Ok(())
    }

    pub fn ping(&self, id: ConnectionId) -> Result<(), GameError> {
        let mut lobby = self.lobby();
        accepted(&mut lobby.connections, id, "PING")?.send(ServerMessage::Pong);
        Ok(())
    }

    pub fn match_of(&self, id: ConnectionId) -> Option<MatchId> {
        self.lobby().connections.get(&id).and_then(|h| h.match_id)
    }

    /// Snapshot of a running match.
    pub fn session(&self, match_id: MatchId) -> Option<MatchSession> {
        self.matches.get(&match_id).map(|m| m.session.clone())
    }

    pub fn queued(&self) -> Vec<ConnectionId> {
        self.lobby().queue.iter().collect()
    }

    pub fn wins(&self, name: &str) -> u32 {
        self.lobby().rankings.wins(name)
    }

    pub fn connection_count(&self) -> usize {
        self.lobby().connections.len()
    }
}
