//! Simulation harness
//!
//! Configuration, events, progression and the fixed-tick [`Simulation`] loop
//! that wires physics, the vehicle controllers and the NPC AI together.

mod config;
mod events;
mod progression;
mod sim;
mod stats;

pub use config::{ArenaSettings, ConfigError, SimConfig, SimSettings, VehicleShape};
pub use events::{EventQueue, SimEvent};
pub use progression::{Progression, ProgressionParams};
pub use sim::Simulation;
pub use stats::SimStats;
