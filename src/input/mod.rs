//! Player input
//!
//! Anything that can drive the player car implements [`IntentSource`].

mod actions;
mod intent;

pub use actions::{ActionMapper, DriveAction, DriveActions};
pub use intent::{DriverView, IntentSource, PursuitAutopilot, ScriptedIntent};
