//! Self-righting controller
//!
//! A proportional controller that torques a vehicle's up axis back toward
//! world up. Runs every tick on every vehicle, whoever is driving it.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::physics::{BodyActuator, ForceMode, RigidBodyHandle};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerParams {
    pub upright_torque_gain: f32, // angular accel per degree of tilt
    pub deadband_deg: f32,        // no correction at or below this tilt
    pub center_of_mass_offset: f32, // vertical CoM shift, negative lowers it
}

impl Default for StabilizerParams {
    fn default() -> Self {
        Self {
            upright_torque_gain: 5.0,
            deadband_deg: 1.0,
            center_of_mass_offset: -1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct StabilizerController {
    pub params: StabilizerParams,
}

impl StabilizerController {
    pub fn new(params: StabilizerParams) -> Self {
        Self { params }
    }

    /// One-time chassis setup: lower the centre of mass and lock roll/pitch.
    pub fn setup(&self, port: &mut impl BodyActuator, body: RigidBodyHandle) {
        port.set_center_of_mass_offset(body, Vec3::Y * self.params.center_of_mass_offset);
        port.lock_tilt(body, true);
    }

    /// Tilt between the body's up axis and world up, in degrees.
    pub fn tilt_deg(rotation: Quat) -> f32 {
        (rotation * Vec3::Y).angle_between(Vec3::Y).to_degrees()
    }

    /// Corrective torque for an orientation, `None` inside the deadband.
    pub fn correction(&self, rotation: Quat) -> Option<Vec3> {
        let up = rotation * Vec3::Y;
        let angle = Self::tilt_deg(rotation);
        if !(angle > self.params.deadband_deg) {
            return None;
        }

        // Fully inverted: up x world-up vanishes, roll about the body's right axis
        let axis = match up.cross(Vec3::Y).try_normalize() {
            Some(axis) => axis,
            None => (rotation * Vec3::X).normalize(),
        };

        // Keep only the horizontal part so the correction never adds yaw
        let torque = axis * angle * self.params.upright_torque_gain;
        Some(Vec3::new(torque.x, 0.0, torque.z))
    }

    /// Apply this tick's correction, returning the torque that was applied.
    pub fn stabilize(&self, port: &mut impl BodyActuator, body: RigidBodyHandle) -> Option<Vec3> {
        let pose = port.pose(body)?;
        let torque = self.correction(pose.rotation)?;
        port.apply_torque(body, torque, ForceMode::Acceleration);
        Some(torque)
    }
}
