//! Shared drive model for player and NPC vehicles
//!
//! Turns an abstract steer/throttle intent into a drive force along the body's
//! forward axis plus a yaw rotation, once per fixed tick.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::physics::{BodyActuator, ForceMode, RigidBodyHandle};

/// Headings shorter than this (squared) are treated as "no direction".
pub const MIN_HEADING_LENGTH_SQ: f32 = 0.01;

/// Normalized driver intent for one tick.
///
/// Both components are expected in `[-1, 1]`; values outside that range are
/// scaled, not rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringIntent {
    /// -1 full left, 1 full right
    pub steer: f32,
    /// -1 full reverse, 1 full forward
    pub throttle: f32,
}

impl SteeringIntent {
    /// No steering, no throttle
    pub const NEUTRAL: Self = Self {
        steer: 0.0,
        throttle: 0.0,
    };

    /// Create an intent
    #[must_use]
    pub fn new(steer: f32, throttle: f32) -> Self {
        Self { steer, throttle }
    }

    /// Clamp both components into `[-1, 1]`
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            steer: self.steer.clamp(-1.0, 1.0),
            throttle: self.throttle.clamp(-1.0, 1.0),
        }
    }
}

/// How drive input reaches the body velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationPolicy {
    /// Add the drive as an acceleration-mode force; collision pushes survive
    #[default]
    Force,
    /// Overwrite horizontal velocity directly, keeping the vertical component
    VelocityOverride,
}

/// Drive tuning for one vehicle class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionParams {
    /// Forward acceleration at full throttle (m/s²)
    pub acceleration: f32,
    /// Yaw rate at full steer (degrees per second)
    pub turn_rate: f32,
    /// Horizontal speed at full throttle, used by `VelocityOverride` only
    pub top_speed: f32,
    /// Integration policy
    pub policy: IntegrationPolicy,
}

impl Default for LocomotionParams {
    fn default() -> Self {
        Self {
            acceleration: 30.0,
            turn_rate: 100.0,
            top_speed: 20.0,
            policy: IntegrationPolicy::Force,
        }
    }
}

/// Yaw-only rotation whose forward axis (-Z) points along `direction`.
///
/// Returns `None` when the horizontal part of `direction` is degenerate.
#[must_use]
pub fn look_rotation(direction: Vec3) -> Option<Quat> {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    if flat.length_squared() < 1e-8 {
        return None;
    }
    Some(Quat::from_rotation_y((-flat.x).atan2(-flat.z)))
}

/// Rotate `from` toward `to` by at most `max_angle` radians.
#[must_use]
pub fn rotate_towards(from: Quat, to: Quat, max_angle: f32) -> Quat {
    let angle = from.angle_between(to);
    if angle <= max_angle || angle <= f32::EPSILON {
        return to;
    }
    from.slerp(to, max_angle / angle).normalize()
}

/// Converts intent into forces and rotations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocomotionModel {
    pub params: LocomotionParams,
}

impl LocomotionModel {
    /// Create a model from tuning parameters
    #[must_use]
    pub fn new(params: LocomotionParams) -> Self {
        Self { params }
    }

    /// Apply one tick of driver intent.
    ///
    /// Positive steer turns right (clockwise seen from above).
    pub fn apply(
        &self,
        port: &mut impl BodyActuator,
        body: RigidBodyHandle,
        intent: SteeringIntent,
        dt: f32,
    ) {
        let Some(pose) = port.pose(body) else {
            return;
        };

        self.drive(port, body, pose.forward(), intent.throttle, self.params.acceleration);

        let yaw = (intent.steer * self.params.turn_rate * dt).to_radians();
        if yaw != 0.0 {
            port.set_rotation(body, pose.rotation * Quat::from_rotation_y(-yaw));
        }
    }

    /// Push along the body's forward axis at the given acceleration.
    pub fn drive_forward(
        &self,
        port: &mut impl BodyActuator,
        body: RigidBodyHandle,
        acceleration: f32,
    ) {
        if let Some(pose) = port.pose(body) {
            self.drive(port, body, pose.forward(), 1.0, acceleration);
        }
    }

    /// Yaw toward `heading` by at most `turn_rate * dt` degrees.
    ///
    /// Returns `false` (and leaves the body untouched) when the heading is too
    /// short or vertical to define a yaw.
    pub fn turn_toward(
        &self,
        port: &mut impl BodyActuator,
        body: RigidBodyHandle,
        heading: Vec3,
        turn_rate: f32,
        dt: f32,
    ) -> bool {
        if heading.length_squared() < MIN_HEADING_LENGTH_SQ {
            return false;
        }
        let (Some(pose), Some(target)) = (port.pose(body), look_rotation(heading)) else {
            return false;
        };

        let next = rotate_towards(pose.rotation, target, (turn_rate * dt).to_radians());
        port.set_rotation(body, next);
        true
    }

    fn drive(
        &self,
        port: &mut impl BodyActuator,
        body: RigidBodyHandle,
        forward: Vec3,
        throttle: f32,
        acceleration: f32,
    ) {
        match self.params.policy {
            IntegrationPolicy::Force => {
                if throttle != 0.0 {
                    port.apply_force(body, forward * throttle * acceleration, ForceMode::Acceleration);
                }
            }
            IntegrationPolicy::VelocityOverride => {
                let vertical = port.linear_velocity(body).map_or(0.0, |v| v.y);
                let flat = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
                let scale = if self.params.acceleration > 0.0 {
                    acceleration / self.params.acceleration
                } else {
                    1.0
                };
                let horizontal = flat * throttle * self.params.top_speed * scale;
                port.set_linear_velocity(body, horizontal + Vec3::Y * vertical);
            }
        }
    }
}
