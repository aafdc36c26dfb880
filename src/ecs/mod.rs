//! Entity registry
//!
//! Built on top of the hecs ECS library

mod components;
mod world;

pub use components::{Name, Role, Vehicle};
pub use world::World;
