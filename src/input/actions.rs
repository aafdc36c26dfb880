//! Logical drive actions
//!
//! Physical keys map to [`DriveAction`]s through an [`ActionMapper`]; the set
//! of held actions becomes a [`SteeringIntent`] each tick.

use rustc_hash::{FxHashMap, FxHashSet};

use super::intent::{DriverView, IntentSource};
use crate::vehicle::SteeringIntent;

/// What the driver wants the car to do, independent of the key that asked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveAction {
    Forward,
    Backward,
    Left,
    Right,
}

/// Maps key names to drive actions.
#[derive(Debug, Clone, Default)]
pub struct ActionMapper {
    bindings: FxHashMap<char, DriveAction>,
}

impl ActionMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// WASD plus the vi-style `ijkl` cluster
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut mapper = Self::new();
        mapper.bind('w', DriveAction::Forward);
        mapper.bind('s', DriveAction::Backward);
        mapper.bind('a', DriveAction::Left);
        mapper.bind('d', DriveAction::Right);
        mapper.bind('i', DriveAction::Forward);
        mapper.bind('k', DriveAction::Backward);
        mapper.bind('j', DriveAction::Left);
        mapper.bind('l', DriveAction::Right);
        mapper
    }

    /// Bind a key, replacing any previous binding for it.
    pub fn bind(&mut self, key: char, action: DriveAction) {
        self.bindings.insert(key.to_ascii_lowercase(), action);
    }

    pub fn unbind(&mut self, key: char) {
        self.bindings.remove(&key.to_ascii_lowercase());
    }

    #[must_use]
    pub fn get_action(&self, key: char) -> Option<DriveAction> {
        self.bindings.get(&key.to_ascii_lowercase()).copied()
    }
}

/// Currently held drive actions.
#[derive(Debug, Clone, Default)]
pub struct DriveActions {
    mapper: ActionMapper,
    held: FxHashSet<DriveAction>,
}

impl DriveActions {
    #[must_use]
    pub fn new(mapper: ActionMapper) -> Self {
        Self {
            mapper,
            held: FxHashSet::default(),
        }
    }

    pub fn press(&mut self, action: DriveAction) {
        self.held.insert(action);
    }

    pub fn release(&mut self, action: DriveAction) {
        self.held.remove(&action);
    }

    /// Feed a raw key event; unbound keys are ignored.
    pub fn key(&mut self, key: char, pressed: bool) {
        if let Some(action) = self.mapper.get_action(key) {
            if pressed {
                self.press(action);
            } else {
                self.release(action);
            }
        }
    }

    #[must_use]
    pub fn is_held(&self, action: DriveAction) -> bool {
        self.held.contains(&action)
    }

    /// Intent from the held set; opposing actions cancel.
    #[must_use]
    pub fn current(&self) -> SteeringIntent {
        let axis = |positive: DriveAction, negative: DriveAction| {
            f32::from(u8::from(self.is_held(positive))) - f32::from(u8::from(self.is_held(negative)))
        };
        SteeringIntent::new(
            axis(DriveAction::Right, DriveAction::Left),
            axis(DriveAction::Forward, DriveAction::Backward),
        )
    }
}

impl IntentSource for DriveActions {
    fn intent(&mut self, _view: &DriverView<'_>) -> SteeringIntent {
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let mapper = ActionMapper::with_defaults();
        assert_eq!(mapper.get_action('w'), Some(DriveAction::Forward));
        assert_eq!(mapper.get_action('D'), Some(DriveAction::Right));
        assert_eq!(mapper.get_action('x'), None);
    }

    #[test]
    fn test_rebind_and_unbind() {
        let mut mapper = ActionMapper::with_defaults();
        mapper.bind('w', DriveAction::Backward);
        assert_eq!(mapper.get_action('w'), Some(DriveAction::Backward));
        mapper.unbind('w');
        assert_eq!(mapper.get_action('w'), None);
    }

    #[test]
    fn test_held_actions_become_intent() {
        let mut actions = DriveActions::new(ActionMapper::with_defaults());
        assert_eq!(actions.current(), SteeringIntent::NEUTRAL);

        actions.key('w', true);
        actions.key('d', true);
        assert_eq!(actions.current(), SteeringIntent::new(1.0, 1.0));

        actions.key('a', true);
        assert_eq!(actions.current(), SteeringIntent::new(0.0, 1.0));

        actions.key('w', false);
        actions.key('d', false);
        assert_eq!(actions.current(), SteeringIntent::new(-1.0, 0.0));
    }

    #[test]
    fn test_unbound_keys_are_ignored() {
        let mut actions = DriveActions::new(ActionMapper::new());
        actions.key('w', true);
        assert!(!actions.is_held(DriveAction::Forward));
    }
}
