use std::collections::HashSet;
use std::net::SocketAddr;

use tokio::sync::mpsc;

use pentago_core::{Capability, MatchId, MatchSession, ServerMessage};

pub type ConnectionId = u64;

/// Push side of a connection's writer task.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// Handle to push messages to a connected client.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    /// Set once HELLO has been accepted.
    pub accepted: bool,
    pub username: Option<String>,
    pub capabilities: HashSet<Capability>,
    pub match_id: Option<MatchId>,
    pub tx: Outbound,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, addr: SocketAddr, tx: Outbound) -> Self {
        Self {
            id,
            addr,
            accepted: false,
            username: None,
            capabilities: HashSet::new(),
            match_id: None,
            tx,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.username.is_some()
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Queues a line for the writer task. A closed writer means the client
    /// is already going away, so the message is dropped.
    pub fn send(&self, msg: ServerMessage) {
        let _ = self.tx.send(msg);
    }
}

/// A running match and the outbound channels of its two players, in seat order.
#[derive(Debug)]
pub struct ActiveMatch {
    pub session: MatchSession,
    pub peers: [(ConnectionId, Outbound); 2],
}

impl ActiveMatch {
    pub fn seat_of(&self, id: ConnectionId) -> Option<usize> {
        self.peers.iter().position(|(peer, _)| *peer == id)
    }

    pub fn broadcast(&self, msg: &ServerMessage) {
        for (_, tx) in &self.peers {
            let _ = tx.send(msg.clone());
        }
    }
}
