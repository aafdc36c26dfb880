//! Physics simulation module
//!
//! Built on top of rapier3d, exposed to the vehicle core through the
//! [`SpatialQuery`] and [`BodyActuator`] port traits.

pub mod port;
mod world;

pub use port::{
    BodyActuator, Contact, ForceMode, Pose, RayHit, RayHits, SpatialQuery, VehiclePort,
};
pub use world::{ColliderHandle, Physics, RigidBodyHandle};
