//! Sensing and actuation port consumed by the vehicle core
//!
//! The locomotion model, the stabilizer and the NPC steering AI never talk to
//! rapier directly. They see the world through two narrow traits:
//!
//! - [`SpatialQuery`] for ray-cast sensing
//! - [`BodyActuator`] for reading poses and pushing forces, torques and rotations
//!
//! [`crate::physics::Physics`] implements both on top of rapier3d; tests use
//! the scripted [`mock::MockWorld`].

use glam::{Quat, Vec3};
use smallvec::SmallVec;

use super::RigidBodyHandle;

/// Position and orientation of a rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// World-space position
    pub position: Vec3,
    /// World-space orientation
    pub rotation: Quat,
}

impl Pose {
    /// Create a pose from a position and rotation
    #[must_use]
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Forward direction (negative Z in local space)
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Up direction (positive Y in local space)
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Distance to another point ignoring height
    #[must_use]
    pub fn horizontal_distance(&self, other: Vec3) -> f32 {
        let delta = other - self.position;
        Vec3::new(delta.x, 0.0, delta.z).length()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

/// How a force or torque vector is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Newtons (or newton-metres); the body's mass scales the response
    Force,
    /// Direct acceleration; mass independent
    Acceleration,
}

/// Result of a ray cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The point of intersection
    pub point: Vec3,
    /// Surface normal at the hit point
    pub normal: Vec3,
    /// Distance from ray origin
    pub distance: f32,
    /// Body owning the hit collider, if it has one
    pub body: Option<RigidBodyHandle>,
}

/// All hits of one ray, nearest first.
pub type RayHits = SmallVec<[RayHit; 4]>;

/// A contact that started during the last physics step, seen from `body`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// The body receiving this contact
    pub body: RigidBodyHandle,
    /// The body it touched, `None` for a parentless collider
    pub other: Option<RigidBodyHandle>,
    /// Contact normal pointing from `other` toward `body`
    pub normal: Vec3,
    /// World-space contact point
    pub point: Vec3,
}

/// Ray-cast sensing.
pub trait SpatialQuery {
    /// Cast a ray and return the nearest hit, ignoring `exclude`.
    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<RigidBodyHandle>,
    ) -> Option<RayHit>;

    /// Cast a ray and return every hit sorted by distance.
    fn cast_all(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<RigidBodyHandle>,
    ) -> RayHits;
}

/// Rigid-body read access and actuation.
///
/// Calls on a body that does not exist are ignored; reads return `None`.
pub trait BodyActuator {
    /// Current pose
    fn pose(&self, body: RigidBodyHandle) -> Option<Pose>;

    /// Current linear velocity
    fn linear_velocity(&self, body: RigidBodyHandle) -> Option<Vec3>;

    /// Accumulate a force for the next step
    fn apply_force(&mut self, body: RigidBodyHandle, force: Vec3, mode: ForceMode);

    /// Accumulate a torque for the next step
    fn apply_torque(&mut self, body: RigidBodyHandle, torque: Vec3, mode: ForceMode);

    /// Replace the orientation
    fn set_rotation(&mut self, body: RigidBodyHandle, rotation: Quat);

    /// Replace the linear velocity
    fn set_linear_velocity(&mut self, body: RigidBodyHandle, velocity: Vec3);

    /// Shift the centre of mass by a local-space offset
    fn set_center_of_mass_offset(&mut self, body: RigidBodyHandle, offset: Vec3);

    /// Lock (or unlock) roll and pitch, leaving yaw free
    fn lock_tilt(&mut self, body: RigidBodyHandle, locked: bool);
}

/// Everything a vehicle controller needs from the world.
pub trait VehiclePort: SpatialQuery + BodyActuator {}

impl<T: SpatialQuery + BodyActuator + ?Sized> VehiclePort for T {}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted world for controller tests.

    use rustc_hash::FxHashMap;

    use super::*;

    /// Infinite plane obstacle
    #[derive(Debug, Clone, Copy)]
    pub struct Plane {
        pub point: Vec3,
        pub normal: Vec3,
        pub body: Option<RigidBodyHandle>,
    }

    #[derive(Debug, Clone, Default)]
    pub struct MockBody {
        pub pose: Pose,
        pub velocity: Vec3,
        /// Sphere radius when the body should block rays
        pub radius: Option<f32>,
        pub forces: Vec<(Vec3, ForceMode)>,
        pub torques: Vec<(Vec3, ForceMode)>,
        pub com_offset: Vec3,
        pub tilt_locked: bool,
    }

    #[derive(Debug, Default)]
    pub struct MockWorld {
        pub bodies: FxHashMap<RigidBodyHandle, MockBody>,
        pub planes: Vec<Plane>,
        next_index: u32,
    }

    impl MockWorld {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_body(&mut self, pose: Pose) -> RigidBodyHandle {
            let handle = RigidBodyHandle::from_raw_parts(self.next_index, 0);
            self.next_index += 1;
            self.bodies.insert(
                handle,
                MockBody {
                    pose,
                    ..Default::default()
                },
            );
            handle
        }

        pub fn add_solid_body(&mut self, position: Vec3, radius: f32) -> RigidBodyHandle {
            let handle = self.add_body(Pose::new(position, Quat::IDENTITY));
            self.body_mut(handle).radius = Some(radius);
            handle
        }

        pub fn add_wall(&mut self, point: Vec3, normal: Vec3) {
            self.planes.push(Plane {
                point,
                normal: normal.normalize(),
                body: None,
            });
        }

        pub fn body(&self, handle: RigidBodyHandle) -> &MockBody {
            &self.bodies[&handle]
        }

        pub fn body_mut(&mut self, handle: RigidBodyHandle) -> &mut MockBody {
            self.bodies.get_mut(&handle).expect("unknown mock body")
        }

        pub fn clear_accumulators(&mut self) {
            for body in self.bodies.values_mut() {
                body.forces.clear();
                body.torques.clear();
            }
        }

        fn hits(
            &self,
            origin: Vec3,
            direction: Vec3,
            max_distance: f32,
            exclude: Option<RigidBodyHandle>,
        ) -> RayHits {
            let dir = direction.normalize_or_zero();
            let mut hits = RayHits::new();
            if dir == Vec3::ZERO {
                return hits;
            }

            for plane in &self.planes {
                let denom = dir.dot(plane.normal);
                if denom >= 0.0 {
                    continue;
                }
                let t = (plane.point - origin).dot(plane.normal) / denom;
                if (0.0..=max_distance).contains(&t) {
                    hits.push(RayHit {
                        point: origin + dir * t,
                        normal: plane.normal,
                        distance: t,
                        body: plane.body,
                    });
                }
            }

            for (&handle, body) in &self.bodies {
                let Some(radius) = body.radius else { continue };
                if Some(handle) == exclude {
                    continue;
                }
                let to_center = body.pose.position - origin;
                let along = to_center.dot(dir);
                let closest_sq = to_center.length_squared() - along * along;
                if along < 0.0 || closest_sq > radius * radius {
                    continue;
                }
                let t = along - (radius * radius - closest_sq).sqrt();
                if (0.0..=max_distance).contains(&t) {
                    let point = origin + dir * t;
                    hits.push(RayHit {
                        point,
                        normal: (point - body.pose.position).normalize_or_zero(),
                        distance: t,
                        body: Some(handle),
                    });
                }
            }

            hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            hits
        }
    }

    impl SpatialQuery for MockWorld {
        fn cast(
            &self,
            origin: Vec3,
            direction: Vec3,
            max_distance: f32,
            exclude: Option<RigidBodyHandle>,
        ) -> Option<RayHit> {
            self.hits(origin, direction, max_distance, exclude)
                .first()
                .copied()
        }

        fn cast_all(
            &self,
            origin: Vec3,
            direction: Vec3,
            max_distance: f32,
            exclude: Option<RigidBodyHandle>,
        ) -> RayHits {
            self.hits(origin, direction, max_distance, exclude)
        }
    }

    impl BodyActuator for MockWorld {
        fn pose(&self, body: RigidBodyHandle) -> Option<Pose> {
            self.bodies.get(&body).map(|b| b.pose)
        }

        fn linear_velocity(&self, body: RigidBodyHandle) -> Option<Vec3> {
            self.bodies.get(&body).map(|b| b.velocity)
        }

        fn apply_force(&mut self, body: RigidBodyHandle, force: Vec3, mode: ForceMode) {
            if let Some(b) = self.bodies.get_mut(&body) {
                b.forces.push((force, mode));
            }
        }

        fn apply_torque(&mut self, body: RigidBodyHandle, torque: Vec3, mode: ForceMode) {
            if let Some(b) = self.bodies.get_mut(&body) {
                b.torques.push((torque, mode));
            }
        }

        fn set_rotation(&mut self, body: RigidBodyHandle, rotation: Quat) {
            if let Some(b) = self.bodies.get_mut(&body) {
                b.pose.rotation = rotation;
            }
        }

        fn set_linear_velocity(&mut self, body: RigidBodyHandle, velocity: Vec3) {
            if let Some(b) = self.bodies.get_mut(&body) {
                b.velocity = velocity;
            }
        }

        fn set_center_of_mass_offset(&mut self, body: RigidBodyHandle, offset: Vec3) {
            if let Some(b) = self.bodies.get_mut(&body) {
                b.com_offset += offset;
            }
        }

        fn lock_tilt(&mut self, body: RigidBodyHandle, locked: bool) {
            if let Some(b) = self.bodies.get_mut(&body) {
                b.tilt_locked = locked;
            }
        }
    }
}
