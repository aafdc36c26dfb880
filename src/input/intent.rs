//! Player intent sources

use glam::Vec3;

use crate::physics::Pose;
use crate::vehicle::SteeringIntent;

/// What a driver can see when choosing this tick's intent
#[derive(Debug, Clone, Copy)]
pub struct DriverView<'a> {
    /// The player vehicle's pose
    pub pose: Pose,
    /// Positions of every live NPC
    pub npcs: &'a [Vec3],
}

/// Produces the player's steering intent once per tick.
pub trait IntentSource {
    fn intent(&mut self, view: &DriverView<'_>) -> SteeringIntent;
}

/// The same intent every tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScriptedIntent(pub SteeringIntent);

impl IntentSource for ScriptedIntent {
    fn intent(&mut self, _view: &DriverView<'_>) -> SteeringIntent {
        self.0
    }
}

/// Drives at the nearest NPC.
///
/// Steer is proportional to the signed heading error and saturates at
/// `full_lock_deg`. Throttle eases off for targets behind the car.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PursuitAutopilot {
    pub full_lock_deg: f32,
    pub reverse_throttle: f32,
}

impl Default for PursuitAutopilot {
    fn default() -> Self {
        Self {
            full_lock_deg: 30.0,
            reverse_throttle: 0.4,
        }
    }
}

impl PursuitAutopilot {
    /// Heading error toward `target` in degrees, positive to the right
    pub fn heading_error_deg(pose: &Pose, target: Vec3) -> Option<f32> {
        let forward = Vec3::new(pose.forward().x, 0.0, pose.forward().z).try_normalize()?;
        let desired = Vec3::new(target.x - pose.position.x, 0.0, target.z - pose.position.z)
            .try_normalize()?;
        // Clockwise from above is a negative turn about +Y
        let left = forward.cross(desired).y;
        Some(-left.atan2(forward.dot(desired)).to_degrees())
    }
}

impl IntentSource for PursuitAutopilot {
    fn intent(&mut self, view: &DriverView<'_>) -> SteeringIntent {
        let nearest = view.npcs.iter().copied().min_by(|a, b| {
            view.pose
                .horizontal_distance(*a)
                .total_cmp(&view.pose.horizontal_distance(*b))
        });
        let Some(error) = nearest.and_then(|npc| Self::heading_error_deg(&view.pose, npc)) else {
            return SteeringIntent::NEUTRAL;
        };

        let steer = (error / self.full_lock_deg.max(f32::EPSILON)).clamp(-1.0, 1.0);
        let throttle = if error.abs() > 90.0 {
            self.reverse_throttle
        } else {
            1.0
        };
        SteeringIntent::new(steer, throttle)
    }
}
