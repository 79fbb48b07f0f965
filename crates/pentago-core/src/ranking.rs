use std::collections::HashMap;

/// Wins per player name for the lifetime of the server.
#[derive(Debug, Default, Clone)]
pub struct RankingTable {
    wins: HashMap<String, u32>,
}

impl RankingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one win and returns the new total.
    pub fn record_win(&mut self, name: &str) -> u32 {
        let wins = self.wins.entry(name.to_string()).or_insert(0);
        *wins += 1;
        *wins
    }

    pub fn wins(&self, name: &str) -> u32 {
        self.wins.get(name).copied().unwrap_or(0)
    }

    /// Most wins first, ties broken by name.
    pub fn standings(&self) -> Vec<(String, u32)> {
        let mut standings: Vec<_> = self
            .wins
            .iter()
            .map(|(name, wins)| (name.clone(), *wins))
            .collect();
        standings.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        standings
    }
}
