//! Steering primitives for the NPC vehicles
//!
//! Pure direction math: flee vectors, reflection off surfaces, blending and
//! random horizontal headings. Everything here works on the horizontal plane;
//! vertical components are dropped before a heading reaches the drive model.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};

use super::random::SteeringRng;

/// Output from a steering behavior: where to head and how hard to push.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringOutput {
    /// Desired horizontal heading; zero means "keep the current heading"
    pub heading: Vec3,
    /// Forward acceleration (m/s²)
    pub acceleration: f32,
    /// Maximum yaw rate toward `heading` (degrees per second)
    pub turn_rate: f32,
}

impl SteeringOutput {
    /// Create a steering output
    #[must_use]
    pub fn new(heading: Vec3, acceleration: f32, turn_rate: f32) -> Self {
        Self {
            heading,
            acceleration,
            turn_rate,
        }
    }
}

/// Drop the vertical component
#[must_use]
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Mirror `direction` across a surface with unit normal `normal`.
///
/// `r = d - 2(d·n)n`
#[must_use]
pub fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - 2.0 * direction.dot(normal) * normal
}

/// Horizontal unit vector pointing from `threat` to `position`.
///
/// `None` when the two points share the same horizontal location.
#[must_use]
pub fn flee_direction(position: Vec3, threat: Vec3) -> Option<Vec3> {
    horizontal(position - threat).try_normalize()
}

/// Linear blend of two directions, renormalized.
///
/// `weight` 0 keeps `a`, 1 gives `b`. Returns zero for opposite inputs at 0.5.
#[must_use]
pub fn blend(a: Vec3, b: Vec3, weight: f32) -> Vec3 {
    a.lerp(b, weight).normalize_or_zero()
}

/// Rotate a direction about world up (positive is counter-clockwise from above)
#[must_use]
pub fn rotate_yaw(direction: Vec3, degrees: f32) -> Vec3 {
    Quat::from_rotation_y(degrees.to_radians()) * direction
}

/// Uniformly distributed horizontal unit vector
pub fn random_horizontal(rng: &mut impl SteeringRng) -> Vec3 {
    let angle = rng.uniform(0.0, TAU);
    Vec3::new(angle.cos(), 0.0, angle.sin())
}

/// Reflect off a surface, flatten, and rotate by a random yaw in
/// `[-jitter_deg, +jitter_deg]`.
///
/// Falls back to `direction` when the flattened reflection is degenerate.
pub fn jittered_reflection(
    direction: Vec3,
    normal: Vec3,
    jitter_deg: f32,
    rng: &mut impl SteeringRng,
) -> Vec3 {
    let Some(reflected) = horizontal(reflect(direction, normal)).try_normalize() else {
        return direction;
    };
    let jitter = rng.uniform(-jitter_deg, jitter_deg);
    horizontal(rotate_yaw(reflected, jitter))
        .try_normalize()
        .unwrap_or(reflected)
}
