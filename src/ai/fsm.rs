//! NPC behavior state machine
//!
//! The states, the per-tick sensing snapshot the transition rules read, and
//! the rules themselves. Rule evaluation is a pure function of the current
//! state and the snapshot; the agent owns the side effects of entering a state.
//!
//! # Transition order
//!
//! Evaluated once per tick before any motion, first match wins:
//!
//! 1. Obstacle ahead and not already fleeing → [`NpcState::AvoidObstacle`]
//! 2. Target within the detection radius → [`NpcState::Evade`]
//! 3. Evading with the target gone, or avoiding with the path clear → [`NpcState::Roam`]
//! 4. Otherwise stay
//!
//! The rules never choose [`NpcState::Idle`]; it is entered explicitly, and
//! left either explicitly or by rule 1 or 2 firing.

use std::fmt;

use crate::physics::RayHit;

// ============================================================================
// States
// ============================================================================

/// Behavior state of one NPC vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NpcState {
    /// Wander on a timer-driven random heading
    #[default]
    Roam,
    /// Flee the target
    Evade,
    /// Steer off a reflected heading until the path clears
    AvoidObstacle,
    /// Parked; only a small heading correction
    Idle,
}

impl NpcState {
    /// Every state, in declaration order
    pub const ALL: [NpcState; 4] = [
        NpcState::Roam,
        NpcState::Evade,
        NpcState::AvoidObstacle,
        NpcState::Idle,
    ];

    /// State name for debugging and logging.
    pub fn name(self) -> &'static str {
        match self {
            NpcState::Roam => "Roam",
            NpcState::Evade => "Evade",
            NpcState::AvoidObstacle => "AvoidObstacle",
            NpcState::Idle => "Idle",
        }
    }

    /// States that are already reacting to a threat; obstacles do not pre-empt them.
    pub fn is_flee_response(self) -> bool {
        matches!(self, NpcState::Evade | NpcState::AvoidObstacle)
    }
}

impl fmt::Display for NpcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// ============================================================================
// Transition
// ============================================================================

/// Represents a state transition decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Stay in the current state.
    None,
    /// Transition to a new state.
    To(NpcState),
}

/// A state change that happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: NpcState,
    pub to: NpcState,
}

// ============================================================================
// Sensing
// ============================================================================

/// What an agent perceived at the start of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sensing {
    /// Nearest non-target hit of the forward probe
    pub obstacle: Option<RayHit>,
    /// Horizontal distance to the target, `None` when it is not tracked
    pub target_distance: Option<f32>,
}

impl Sensing {
    /// Target tracked and strictly inside `radius`
    pub fn target_within(&self, radius: f32) -> bool {
        self.target_distance.is_some_and(|d| d < radius)
    }
}

// ============================================================================
// Rules
// ============================================================================

/// Decide this tick's transition.
pub fn evaluate(current: NpcState, sensing: &Sensing, detection_radius: f32) -> Transition {
    let obstacle = sensing.obstacle.is_some();
    let next = if obstacle && !current.is_flee_response() {
        NpcState::AvoidObstacle
    } else if sensing.target_within(detection_radius) {
        NpcState::Evade
    } else if current == NpcState::Evade || (current == NpcState::AvoidObstacle && !obstacle) {
        NpcState::Roam
    } else {
        current
    };

    if next == current {
        Transition::None
    } else {
        Transition::To(next)
    }
}

/// State to move to when the wander timer expires.
///
/// Only Roam and Evade run the timer; the result equal to `current` means
/// "stay and resample".
pub fn on_wander_expiry(current: NpcState, sensing: &Sensing, detection_radius: f32) -> NpcState {
    match current {
        NpcState::Roam | NpcState::Evade if sensing.target_within(detection_radius) => {
            NpcState::Evade
        }
        NpcState::Roam | NpcState::Evade => NpcState::Roam,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn wall() -> Option<RayHit> {
        Some(RayHit {
            point: Vec3::new(0.0, 0.0, -2.0),
            normal: Vec3::Z,
            distance: 2.0,
            body: None,
        })
    }

    fn sensing(obstacle: Option<RayHit>, target_distance: Option<f32>) -> Sensing {
        Sensing {
            obstacle,
            target_distance,
        }
    }

    #[test]
    fn test_names_are_distinct() {
        let names: Vec<_> = NpcState::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["Roam", "Evade", "AvoidObstacle", "Idle"]);
        assert_eq!(NpcState::default(), NpcState::Roam);
        assert_eq!(NpcState::Evade.to_string(), "Evade");
    }

    #[test]
    fn test_obstacle_interrupts_roam() {
        let t = evaluate(NpcState::Roam, &sensing(wall(), None), 10.0);
        assert_eq!(t, Transition::To(NpcState::AvoidObstacle));
    }

    #[test]
    fn test_obstacle_does_not_interrupt_flee() {
        // Evade keeps fleeing and blends in the reflection instead
        let t = evaluate(NpcState::Evade, &sensing(wall(), Some(4.0)), 10.0);
        assert_eq!(t, Transition::None);
        let t = evaluate(NpcState::AvoidObstacle, &sensing(wall(), None), 10.0);
        assert_eq!(t, Transition::None);
    }

    #[test]
    fn test_obstacle_beats_target() {
        let t = evaluate(NpcState::Roam, &sensing(wall(), Some(1.0)), 10.0);
        assert_eq!(t, Transition::To(NpcState::AvoidObstacle));
    }

    #[test]
    fn test_evade_enter_and_leave() {
        let enter = evaluate(NpcState::Roam, &sensing(None, Some(5.0)), 10.0);
        assert_eq!(enter, Transition::To(NpcState::Evade));

        let stay = evaluate(NpcState::Evade, &sensing(None, Some(9.9)), 10.0);
        assert_eq!(stay, Transition::None);

        let leave = evaluate(NpcState::Evade, &sensing(None, Some(10.5)), 10.0);
        assert_eq!(leave, Transition::To(NpcState::Roam));

        let untracked = evaluate(NpcState::Evade, &sensing(None, None), 10.0);
        assert_eq!(untracked, Transition::To(NpcState::Roam));
    }

    #[test]
    fn test_radius_is_exclusive() {
        let t = evaluate(NpcState::Roam, &sensing(None, Some(10.0)), 10.0);
        assert_eq!(t, Transition::None);
    }

    #[test]
    fn test_avoid_returns_to_roam_when_clear() {
        let t = evaluate(NpcState::AvoidObstacle, &sensing(None, None), 10.0);
        assert_eq!(t, Transition::To(NpcState::Roam));
    }

    #[test]
    fn test_avoid_hands_over_to_evade() {
        let t = evaluate(NpcState::AvoidObstacle, &sensing(wall(), Some(3.0)), 10.0);
        assert_eq!(t, Transition::To(NpcState::Evade));
    }

    #[test]
    fn test_idle_reacts_to_obstacle_and_target() {
        let t = evaluate(NpcState::Idle, &sensing(wall(), None), 10.0);
        assert_eq!(t, Transition::To(NpcState::AvoidObstacle));

        let t = evaluate(NpcState::Idle, &sensing(None, Some(5.0)), 10.0);
        assert_eq!(t, Transition::To(NpcState::Evade));

        let t = evaluate(NpcState::Idle, &sensing(wall(), Some(5.0)), 10.0);
        assert_eq!(t, Transition::To(NpcState::AvoidObstacle));
    }

    #[test]
    fn test_idle_stays_when_nothing_is_sensed() {
        for s in [sensing(None, None), sensing(None, Some(10.0)), sensing(None, Some(40.0))] {
            assert_eq!(evaluate(NpcState::Idle, &s, 10.0), Transition::None);
        }
    }

    #[test]
    fn test_every_outcome_is_a_valid_state() {
        let snapshots = [
            sensing(None, None),
            sensing(wall(), None),
            sensing(None, Some(2.0)),
            sensing(wall(), Some(2.0)),
            sensing(None, Some(50.0)),
        ];
        for state in NpcState::ALL {
            for s in &snapshots {
                if let Transition::To(next) = evaluate(state, s, 10.0) {
                    assert!(NpcState::ALL.contains(&next));
                    assert_ne!(next, state);
                    assert_ne!(next, NpcState::Idle);
                }
            }
        }
    }

    #[test]
    fn test_wander_expiry() {
        let near = sensing(None, Some(3.0));
        let far = sensing(None, None);
        assert_eq!(on_wander_expiry(NpcState::Roam, &far, 10.0), NpcState::Roam);
        assert_eq!(on_wander_expiry(NpcState::Roam, &near, 10.0), NpcState::Evade);
        assert_eq!(on_wander_expiry(NpcState::Evade, &near, 10.0), NpcState::Evade);
        assert_eq!(on_wander_expiry(NpcState::Evade, &far, 10.0), NpcState::Roam);
        assert_eq!(
            on_wander_expiry(NpcState::AvoidObstacle, &near, 10.0),
            NpcState::AvoidObstacle
        );
    }
}
