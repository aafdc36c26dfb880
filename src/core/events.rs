//! Simulation events
//!
//! A double-buffered queue of [`SimEvent`]s. Stages push during tick N; the
//! harness swaps at the start of tick N+1, so consumers always see one
//! complete tick regardless of stage order.

use std::collections::VecDeque;

use glam::Vec3;
use hecs::Entity;

use crate::ai::NpcState;
use crate::physics::RigidBodyHandle;

// ============================================================================
// Event Types
// ============================================================================

/// Something that happened during a tick.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SimEvent {
    /// A new NPC vehicle entered the arena.
    NpcSpawned {
        npc: Entity,
        body: RigidBodyHandle,
        position: Vec3,
    },

    /// An NPC changed behavior state.
    StateChanged {
        npc: Entity,
        from: NpcState,
        to: NpcState,
    },

    /// A vehicle started touching something.
    Contact {
        body: RigidBodyHandle,
        other: Option<RigidBodyHandle>,
        /// Points from `other` toward `body`
        normal: Vec3,
    },

    /// The player caught an NPC.
    NpcHit { npc: Entity, body: RigidBodyHandle },

    /// Score after a catch.
    ScoreChanged { score: u32 },
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue.
///
/// Events pushed during tick N are readable during tick N+1.
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written this tick
    pending: VecDeque<SimEvent>,
    /// Events from the previous tick
    processing: VecDeque<SimEvent>,
}

impl EventQueue {
    const DEFAULT_CAPACITY: usize = 64;

    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Queue an event for the next tick.
    #[inline]
    pub fn push(&mut self, event: SimEvent) {
        self.pending.push_back(event);
    }

    /// Make this tick's events readable and start a fresh pending buffer.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Events from the previous tick
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.processing.iter()
    }

    /// Events pushed so far this tick
    #[inline]
    pub fn pending(&self) -> impl Iterator<Item = &SimEvent> {
        self.pending.iter()
    }

    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = SimEvent> + '_ {
        self.processing.drain(..)
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npc() -> Entity {
        let mut world = hecs::World::new();
        world.spawn(())
    }

    #[test]
    fn test_events_visible_after_swap() {
        let mut queue = EventQueue::new();

        queue.push(SimEvent::ScoreChanged { score: 1 });
        assert!(queue.is_empty());
        assert_eq!(queue.pending_count(), 1);

        queue.swap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.iter().next(), Some(&SimEvent::ScoreChanged { score: 1 }));
    }

    #[test]
    fn test_ticks_are_isolated() {
        let mut queue = EventQueue::new();
        let entity = npc();

        queue.push(SimEvent::StateChanged {
            npc: entity,
            from: NpcState::Roam,
            to: NpcState::Evade,
        });
        queue.swap();
        queue.push(SimEvent::ScoreChanged { score: 2 });

        let seen: Vec<_> = queue.iter().collect();
        assert_eq!(seen.len(), 1);
        assert!(matches!(
            seen[0],
            SimEvent::StateChanged {
                to: NpcState::Evade,
                ..
            }
        ));

        queue.swap();
        assert!(matches!(
            queue.iter().next(),
            Some(SimEvent::ScoreChanged { score: 2 })
        ));
    }

    #[test]
    fn test_drain_and_clear() {
        let mut queue = EventQueue::new();
        queue.push(SimEvent::ScoreChanged { score: 1 });
        queue.push(SimEvent::ScoreChanged { score: 2 });
        queue.swap();

        assert_eq!(queue.drain().count(), 2);
        assert!(queue.is_empty());

        queue.push(SimEvent::ScoreChanged { score: 3 });
        queue.clear();
        assert_eq!(queue.pending_count(), 0);
    }
}
