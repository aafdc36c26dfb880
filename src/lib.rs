//! Vehicle control core for a headless chase simulation
//!
//! This crate provides:
//! - A shared drive model and self-righting controller for every car
//! - NPC steering AI that roams, evades the player and avoids obstacles
//! - A fixed-tick harness on rapier3d physics and a hecs entity registry

pub mod ai;
pub mod core;
pub mod ecs;
pub mod input;
pub mod physics;
pub mod vehicle;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::ai::{HitSink, NpcAgent, NpcParams, NpcState};
    pub use crate::core::{ConfigError, SimConfig, SimEvent, Simulation};
    pub use crate::ecs::{Name, Role, Vehicle, World};
    pub use crate::input::{DriveActions, IntentSource, PursuitAutopilot, ScriptedIntent};
    pub use crate::physics::{BodyActuator, Physics, Pose, RigidBodyHandle, SpatialQuery};
    pub use crate::vehicle::{
        LocomotionModel, LocomotionParams, StabilizerController, StabilizerParams, SteeringIntent,
    };
    pub use glam::{Quat, Vec3};
}
