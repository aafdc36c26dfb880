//! Score keeping and difficulty ramp
//!
//! Every caught NPC bumps the score, is queued for despawn, and makes the
//! next NPC faster, more evasive and more alert.

use log::info;
use serde::{Deserialize, Serialize};

use crate::ai::{HitSink, NpcParams};
use crate::physics::RigidBodyHandle;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionParams {
    /// Added to `move_acceleration` per point
    pub speed_increment: f32,
    /// Added to `avoidance_strength` per point
    pub avoidance_increment: f32,
    /// Added to `detection_radius` per point
    pub detect_increment: f32,
}

impl Default for ProgressionParams {
    fn default() -> Self {
        Self {
            speed_increment: 2.0,
            avoidance_increment: 0.25,
            detect_increment: 1.0,
        }
    }
}

#[derive(Debug, Default)]
pub struct Progression {
    params: ProgressionParams,
    score: u32,
    consumed: Vec<RigidBodyHandle>,
}

impl Progression {
    pub fn new(params: ProgressionParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Parameters for the next NPC at the current score.
    pub fn scaled(&self, base: &NpcParams) -> NpcParams {
        let points = self.score as f32;
        NpcParams {
            move_acceleration: base.move_acceleration + self.params.speed_increment * points,
            avoidance_strength: base.avoidance_strength + self.params.avoidance_increment * points,
            detection_radius: base.detection_radius + self.params.detect_increment * points,
            ..*base
        }
    }

    /// Bodies caught since the last call, oldest first
    pub fn take_consumed(&mut self) -> Vec<RigidBodyHandle> {
        std::mem::take(&mut self.consumed)
    }

    pub fn has_pending(&self) -> bool {
        !self.consumed.is_empty()
    }
}

impl HitSink for Progression {
    fn report_hit(&mut self, agent: RigidBodyHandle) {
        if self.consumed.contains(&agent) {
            return;
        }
        self.score += 1;
        self.consumed.push(agent);
        info!("npc {:?} caught, score {}", agent, self.score);
    }
}
