//! Physics simulation using rapier3d

use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;
use rustc_hash::FxHashSet;

use super::port::{BodyActuator, Contact, ForceMode, Pose, RayHit, RayHits, SpatialQuery};

/// Handle to a rigid body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RigidBodyHandle(pub rapier3d::dynamics::RigidBodyHandle);

impl RigidBodyHandle {
    /// Build a handle from its raw index and generation
    #[must_use]
    pub fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self(rapier3d::dynamics::RigidBodyHandle::from_raw_parts(
            index, generation,
        ))
    }
}

/// Handle to a collider in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderHandle(pub rapier3d::geometry::ColliderHandle);

/// Convert glam Quat to rapier3d UnitQuaternion
fn quat_to_rapier(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

/// Convert rapier3d UnitQuaternion to glam Quat
fn rapier_to_quat(uq: &UnitQuaternion<f32>) -> Quat {
    let q = uq.quaternion();
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

fn to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// Physics world manager
pub struct Physics {
    /// Gravity vector
    pub gravity: Vec3,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// Query pipeline for raycasting
    query_pipeline: QueryPipeline,
    integration_parameters: IntegrationParameters,
    /// Collider pairs touching at the end of the last step
    touching: FxHashSet<(rapier3d::geometry::ColliderHandle, rapier3d::geometry::ColliderHandle)>,
    /// Contacts that started during the last step
    contacts: Vec<Contact>,
}

impl Physics {
    /// Create a new physics world with default gravity
    pub fn new() -> Self {
        Self::with_gravity(Vec3::new(0.0, -9.81, 0.0))
    }

    /// Create a new physics world with custom gravity
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            touching: FxHashSet::default(),
            contacts: Vec::new(),
        }
    }

    /// Step the physics simulation
    ///
    /// Forces and torques accumulated through [`BodyActuator`] apply to this
    /// step only and are cleared afterwards.
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;

        self.pipeline.step(
            &vector![self.gravity.x, self.gravity.y, self.gravity.z],
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        for (_, rb) in self.rigid_body_set.iter_mut() {
            rb.reset_forces(false);
            rb.reset_torques(false);
        }

        self.collect_contacts();
    }

    /// Record every collider pair that started touching during this step
    fn collect_contacts(&mut self) {
        let mut touching = FxHashSet::default();

        for pair in self.narrow_phase.contact_pairs() {
            if !pair.has_any_active_contact {
                continue;
            }
            let key = (pair.collider1, pair.collider2);
            touching.insert(key);
            if self.touching.contains(&key) {
                continue;
            }

            let Some(manifold) = pair.manifolds.iter().find(|m| !m.points.is_empty()) else {
                continue;
            };
            // Normal points from collider1 toward collider2
            let normal = to_vec3(&manifold.data.normal);
            let point = self
                .collider_set
                .get(pair.collider1)
                .map(|c| c.position() * manifold.points[0].local_p1)
                .map(|p| Vec3::new(p.x, p.y, p.z))
                .unwrap_or_default();

            let body1 = self
                .collider_set
                .get(pair.collider1)
                .and_then(|c| c.parent())
                .map(RigidBodyHandle);
            let body2 = self
                .collider_set
                .get(pair.collider2)
                .and_then(|c| c.parent())
                .map(RigidBodyHandle);

            if let Some(body) = body1 {
                self.contacts.push(Contact {
                    body,
                    other: body2,
                    normal: -normal,
                    point,
                });
            }
            if let Some(body) = body2 {
                self.contacts.push(Contact {
                    body,
                    other: body1,
                    normal,
                    point,
                });
            }
        }

        self.touching = touching;
    }

    /// Take the contacts that started since the last call
    pub fn take_contacts(&mut self) -> Vec<Contact> {
        std::mem::take(&mut self.contacts)
    }

    /// Refresh ray-cast structures after adding colliders outside a step
    pub fn update_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Create a static rigid body (doesn't move)
    pub fn create_static_body(&mut self, position: Vec3, rotation: Quat) -> RigidBodyHandle {
        let isometry = Isometry::from_parts(
            Translation3::new(position.x, position.y, position.z),
            quat_to_rapier(rotation),
        );
        let body = RigidBodyBuilder::fixed().position(isometry).build();

        RigidBodyHandle(self.rigid_body_set.insert(body))
    }

    /// Create a dynamic vehicle chassis with a box collider
    ///
    /// Vehicles never sleep so that per-tick forces are always integrated.
    pub fn create_vehicle_body(
        &mut self,
        position: Vec3,
        rotation: Quat,
        half_extents: Vec3,
        density: f32,
    ) -> RigidBodyHandle {
        let isometry = Isometry::from_parts(
            Translation3::new(position.x, position.y, position.z),
            quat_to_rapier(rotation),
        );
        let body = RigidBodyBuilder::dynamic()
            .position(isometry)
            .can_sleep(false)
            .linear_damping(0.5)
            .angular_damping(1.0)
            .build();
        let handle = RigidBodyHandle(self.rigid_body_set.insert(body));
        self.add_box_collider(handle, half_extents, density);
        handle
    }

    /// Add a box collider to a rigid body
    pub fn add_box_collider(
        &mut self,
        body: RigidBodyHandle,
        half_extents: Vec3,
        density: f32,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .density(density)
            .build();

        ColliderHandle(self.collider_set.insert_with_parent(
            collider,
            body.0,
            &mut self.rigid_body_set,
        ))
    }

    /// Add a square ground slab whose top face sits at the body origin
    pub fn add_ground_plane(&mut self, body: RigidBodyHandle, half_extent: f32) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extent, 0.1, half_extent)
            .translation(vector![0.0, -0.1, 0.0])
            .build();

        ColliderHandle(self.collider_set.insert_with_parent(
            collider,
            body.0,
            &mut self.rigid_body_set,
        ))
    }

    /// Get the position of a rigid body
    pub fn get_position(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set
            .get(body.0)
            .map(|rb| to_vec3(rb.translation()))
    }

    /// Check whether a body is still alive
    pub fn contains(&self, body: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(body.0)
    }

    /// Remove a rigid body and its colliders
    pub fn remove_body(&mut self, body: RigidBodyHandle) {
        self.rigid_body_set.remove(
            body.0,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    fn ray_filter(exclude: Option<RigidBodyHandle>) -> QueryFilter<'static> {
        let filter = QueryFilter::default().exclude_sensors();
        match exclude {
            Some(body) => filter.exclude_rigid_body(body.0),
            None => filter,
        }
    }

    fn hit_from(&self, ray: &Ray, handle: rapier3d::geometry::ColliderHandle, hit: RayIntersection) -> RayHit {
        let point = ray.point_at(hit.time_of_impact);
        RayHit {
            point: Vec3::new(point.x, point.y, point.z),
            normal: to_vec3(&hit.normal),
            distance: hit.time_of_impact,
            body: self
                .collider_set
                .get(handle)
                .and_then(|c| c.parent())
                .map(RigidBodyHandle),
        }
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialQuery for Physics {
    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<RigidBodyHandle>,
    ) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }
        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            vector![direction.x, direction.y, direction.z],
        );

        self.query_pipeline
            .cast_ray_and_get_normal(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_distance,
                true,
                Self::ray_filter(exclude),
            )
            .map(|(handle, hit)| self.hit_from(&ray, handle, hit))
    }

    fn cast_all(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<RigidBodyHandle>,
    ) -> RayHits {
        let mut hits = RayHits::new();
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return hits;
        }
        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            vector![direction.x, direction.y, direction.z],
        );

        self.query_pipeline.intersections_with_ray(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true,
            Self::ray_filter(exclude),
            |handle, hit| {
                hits.push(self.hit_from(&ray, handle, hit));
                true
            },
        );

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

impl BodyActuator for Physics {
    fn pose(&self, body: RigidBodyHandle) -> Option<Pose> {
        self.rigid_body_set
            .get(body.0)
            .map(|rb| Pose::new(to_vec3(rb.translation()), rapier_to_quat(rb.rotation())))
    }

    fn linear_velocity(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set.get(body.0).map(|rb| to_vec3(rb.linvel()))
    }

    fn apply_force(&mut self, body: RigidBodyHandle, force: Vec3, mode: ForceMode) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            let scale = match mode {
                ForceMode::Force => 1.0,
                ForceMode::Acceleration => rb.mass(),
            };
            rb.add_force(vector![force.x, force.y, force.z] * scale, true);
        }
    }

    fn apply_torque(&mut self, body: RigidBodyHandle, torque: Vec3, mode: ForceMode) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            let torque = match mode {
                ForceMode::Force => vector![torque.x, torque.y, torque.z],
                // Scale in the principal inertia frame, then back to world
                ForceMode::Acceleration => {
                    let mprops = &rb.mass_properties().local_mprops;
                    let frame = *rb.rotation() * mprops.principal_inertia_local_frame;
                    let local =
                        frame.inverse_transform_vector(&vector![torque.x, torque.y, torque.z]);
                    frame * local.component_mul(&mprops.principal_inertia())
                }
            };
            rb.add_torque(torque, true);
        }
    }

    fn set_rotation(&mut self, body: RigidBodyHandle, rotation: Quat) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_rotation(quat_to_rapier(rotation), true);
        }
    }

    fn set_linear_velocity(&mut self, body: RigidBodyHandle, velocity: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_linvel(vector![velocity.x, velocity.y, velocity.z], true);
        }
    }

    fn set_center_of_mass_offset(&mut self, body: RigidBodyHandle, offset: Vec3) {
        let Some(colliders) = self
            .rigid_body_set
            .get(body.0)
            .map(|rb| rb.colliders().to_vec())
        else {
            return;
        };

        for handle in colliders {
            if let Some(collider) = self.collider_set.get_mut(handle) {
                let props = collider.mass_properties();
                let shifted = MassProperties::new(
                    props.local_com + vector![offset.x, offset.y, offset.z],
                    props.mass(),
                    props.principal_inertia(),
                );
                collider.set_mass_properties(shifted);
            }
        }
    }

    fn lock_tilt(&mut self, body: RigidBodyHandle, locked: bool) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_enabled_rotations(!locked, true, !locked, true);
        }
    }
}
