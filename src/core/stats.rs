//! Run statistics

use rustc_hash::FxHashMap;

use crate::ai::NpcState;

/// Counters gathered while the simulation runs
#[derive(Debug, Default, Clone)]
pub struct SimStats {
    /// Ticks run so far
    ticks: u64,
    /// Agent-ticks spent in each state
    state_ticks: FxHashMap<NpcState, u64>,
    /// State changes across all agents
    transitions: u64,
    /// Contacts delivered to vehicles
    contacts: u64,
    /// NPCs spawned, including the first
    spawned: u64,
}

impl SimStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&mut self) {
        self.ticks += 1;
    }

    /// Count one agent-tick in `state`
    pub fn record_state(&mut self, state: NpcState) {
        *self.state_ticks.entry(state).or_default() += 1;
    }

    pub fn record_transition(&mut self) {
        self.transitions += 1;
    }

    pub fn record_contacts(&mut self, count: usize) {
        self.contacts += count as u64;
    }

    pub fn record_spawn(&mut self) {
        self.spawned += 1;
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn contacts(&self) -> u64 {
        self.contacts
    }

    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Agent-ticks per state, every state listed
    pub fn histogram(&self) -> [(NpcState, u64); 4] {
        NpcState::ALL.map(|state| (state, self.state_ticks.get(&state).copied().unwrap_or(0)))
    }

    /// One-line summary
    pub fn format_stats(&self) -> String {
        let states = self
            .histogram()
            .iter()
            .map(|(state, n)| format!("{state}: {n}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "ticks: {} | spawned: {} | transitions: {} | contacts: {} | {states}",
            self.ticks, self.spawned, self.transitions, self.contacts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_lists_every_state() {
        let mut stats = SimStats::new();
        stats.record_state(NpcState::Roam);
        stats.record_state(NpcState::Roam);
        stats.record_state(NpcState::Evade);

        assert_eq!(
            stats.histogram(),
            [
                (NpcState::Roam, 2),
                (NpcState::Evade, 1),
                (NpcState::AvoidObstacle, 0),
                (NpcState::Idle, 0),
            ]
        );
    }

    #[test]
    fn test_format_stats() {
        let mut stats = SimStats::new();
        stats.record_tick();
        stats.record_spawn();
        stats.record_contacts(3);
        let line = stats.format_stats();
        assert!(line.starts_with("ticks: 1 | spawned: 1"));
        assert!(line.contains("contacts: 3"));
        assert!(line.contains("Idle: 0"));
    }
}
