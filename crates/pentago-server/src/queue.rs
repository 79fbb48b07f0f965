use std::collections::VecDeque;

use crate::state::ConnectionId;

/// First-come first-served waiting line. Each connection appears at most once.
#[derive(Debug, Default)]
pub struct MatchmakingQueue {
    waiting: VecDeque<ConnectionId>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the queue, or leaves it if already waiting. Returns whether
    /// `id` is queued afterwards.
    pub fn toggle(&mut self, id: ConnectionId) -> bool {
        if self.contains(id) {
            self.remove(id);
            false
        } else {
            self.waiting.push_back(id);
            true
        }
    }

    pub fn remove(&mut self, id: ConnectionId) {
        self.waiting.retain(|&queued| queued != id);
    }

    /// Pops the two longest-waiting connections, oldest first.
    pub fn try_pair(&mut self) -> Option<(ConnectionId, ConnectionId)> {
        if self.waiting.len() < 2 {
            return None;
        }
        let first = self.waiting.pop_front()?;
        let second = self.waiting.pop_front()?;
        Some((first, second))
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.waiting.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.waiting.iter().copied()
    }
}
