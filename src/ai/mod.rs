//! NPC steering AI
//!
//! Sensing, a four-state behavior machine and the steering math that turns a
//! state into a heading for the shared vehicle drive model.

mod agent;
mod fsm;
mod random;
mod steering;

pub use agent::{
    EVADE_REFLECTION_WEIGHT, GROUND_NORMAL_Y, HitSink, NpcAgent, NpcParams, WANDER_SAMPLE_ATTEMPTS,
};
pub use fsm::{NpcState, Sensing, StateChange, Transition, evaluate, on_wander_expiry};
pub use random::{SteeringRng, seeded};
pub use steering::{
    SteeringOutput, blend, flee_direction, horizontal, jittered_reflection, random_horizontal,
    reflect, rotate_yaw,
};
