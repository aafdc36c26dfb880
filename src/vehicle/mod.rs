//! Vehicle control shared by the player and every NPC
//!
//! - [`LocomotionModel`] turns steer/throttle intent into drive and yaw
//! - [`StabilizerController`] keeps the chassis upright

mod locomotion;
mod stabilizer;

pub use locomotion::{
    IntegrationPolicy, LocomotionModel, LocomotionParams, MIN_HEADING_LENGTH_SQ, SteeringIntent,
    look_rotation, rotate_towards,
};
pub use stabilizer::{StabilizerController, StabilizerParams};
