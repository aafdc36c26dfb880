//! Components attached to simulation entities

use crate::physics::RigidBodyHandle;
use crate::vehicle::{LocomotionModel, StabilizerController};

/// A physics-driven car: its body plus the controllers every car runs
#[derive(Debug, Clone, Copy)]
pub struct Vehicle {
    pub body: RigidBodyHandle,
    pub locomotion: LocomotionModel,
    pub stabilizer: StabilizerController,
}

impl Vehicle {
    pub fn new(
        body: RigidBodyHandle,
        locomotion: LocomotionModel,
        stabilizer: StabilizerController,
    ) -> Self {
        Self {
            body,
            locomotion,
            stabilizer,
        }
    }
}

/// Who is driving an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Driven by an intent source; the target every NPC evades
    Player,
    /// Driven by an `NpcAgent`
    Npc,
}

/// Name component for debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
