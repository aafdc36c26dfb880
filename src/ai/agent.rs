//! NPC vehicle controller
//!
//! An [`NpcAgent`] senses with a forward ray, runs the transition rules in
//! [`super::fsm`], turns the active state into a [`SteeringOutput`] and hands
//! that to the shared [`LocomotionModel`]. Collisions arrive separately through
//! [`NpcAgent::on_contact`].

use glam::Vec3;
use log::{debug, info};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::fsm::{self, NpcState, Sensing, StateChange, Transition};
use super::random::SteeringRng;
use super::steering::{self, SteeringOutput, horizontal};
use crate::physics::{Contact, Pose, RayHit, RigidBodyHandle, SpatialQuery, VehiclePort};
use crate::vehicle::LocomotionModel;

/// Candidate headings tried when resampling the wander direction
pub const WANDER_SAMPLE_ATTEMPTS: usize = 8;

/// Weight of the reflected heading when evading toward an obstacle
pub const EVADE_REFLECTION_WEIGHT: f32 = 0.5;

/// Contacts whose normal has a larger vertical component are ground contacts
pub const GROUND_NORMAL_Y: f32 = 0.7;

const ROAM_TURN_FACTOR: f32 = 0.5;
const AVOID_TURN_FACTOR: f32 = 2.0;
const IDLE_TURN_FACTOR: f32 = 0.1;

/// Tuning for one NPC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcParams {
    /// Drive acceleration while evading or avoiding (m/s²)
    pub move_acceleration: f32,
    /// Drive acceleration while roaming (m/s²)
    pub wander_acceleration: f32,
    /// Base yaw rate (degrees per second)
    pub turn_speed: f32,
    /// Target distance that triggers evasion
    pub detection_radius: f32,
    /// Turn-rate multiplier while evading
    pub avoidance_strength: f32,
    /// Seconds between wander resamples
    pub wander_interval: f32,
    /// Length of the forward obstacle probe
    pub obstacle_detect_distance: f32,
    /// Half-width of the random yaw added to reflected headings (degrees)
    pub obstacle_jitter_angle: f32,
}

impl Default for NpcParams {
    fn default() -> Self {
        Self {
            move_acceleration: 25.0,
            wander_acceleration: 15.0,
            turn_speed: 100.0,
            detection_radius: 10.0,
            avoidance_strength: 2.0,
            wander_interval: 3.0,
            obstacle_detect_distance: 3.0,
            obstacle_jitter_angle: 15.0,
        }
    }
}

/// Receives "this agent touched the target" notifications.
pub trait HitSink {
    fn report_hit(&mut self, agent: RigidBodyHandle);
}

/// One NPC vehicle's brain.
#[derive(Debug)]
pub struct NpcAgent<R = StdRng> {
    body: RigidBodyHandle,
    target: Option<RigidBodyHandle>,
    params: NpcParams,
    state: NpcState,
    wander_direction: Vec3,
    wander_timer: f32,
    has_been_hit: bool,
    rng: R,
}

impl<R: SteeringRng> NpcAgent<R> {
    /// Start roaming with a freshly sampled wander direction.
    pub fn spawn(
        body: RigidBodyHandle,
        params: NpcParams,
        target: Option<RigidBodyHandle>,
        rng: R,
        port: &impl VehiclePort,
    ) -> Self {
        let mut agent = Self {
            body,
            target,
            params,
            state: NpcState::Roam,
            wander_direction: Vec3::NEG_Z,
            wander_timer: params.wander_interval,
            has_been_hit: false,
            rng,
        };
        let origin = port.pose(body).map_or(Vec3::ZERO, |p| p.position);
        agent.wander_direction = agent.sample_wander_direction(port, origin);

        if target.is_none() {
            info!("npc {:?} spawned without a target, it will never evade", body);
        }
        agent
    }

    /// Run one fixed tick: sense, transition, steer.
    ///
    /// Returns the state change made this tick, if any. Consumed agents and
    /// agents whose body is gone do nothing.
    pub fn tick(
        &mut self,
        port: &mut impl VehiclePort,
        locomotion: &LocomotionModel,
        dt: f32,
    ) -> Option<StateChange> {
        if self.has_been_hit {
            return None;
        }
        let pose = port.pose(self.body)?;
        let from = self.state;
        let sensing = self.sense(&*port, &pose);

        let mut just_entered = false;
        if let Transition::To(next) =
            fsm::evaluate(self.state, &sensing, self.params.detection_radius)
        {
            self.enter(next, &*port, pose.position, sensing.obstacle.as_ref());
            just_entered = true;
        }

        let output = match self.state {
            NpcState::Roam => Some(self.roam(&*port, &pose, &sensing, dt)),
            NpcState::Evade => Some(self.evade(&*port, &pose, &sensing, dt)),
            NpcState::AvoidObstacle => Some(self.avoid(&*port, &pose, just_entered)),
            NpcState::Idle => {
                self.idle(port, locomotion, &pose, dt);
                None
            }
        };

        if let Some(out) = output {
            locomotion.drive_forward(port, self.body, out.acceleration);
            locomotion.turn_toward(port, self.body, out.heading, out.turn_rate, dt);
        }

        (self.state != from).then_some(StateChange {
            from,
            to: self.state,
        })
    }

    /// React to a contact that started this step.
    ///
    /// Returns `true` when the contact was the target and a hit was reported.
    pub fn on_contact(&mut self, contact: &Contact, sink: &mut dyn HitSink) -> bool {
        if self.has_been_hit || contact.body != self.body {
            return false;
        }

        if contact.other.is_some() && contact.other == self.target {
            self.has_been_hit = true;
            info!("npc {:?} caught by target", self.body);
            sink.report_hit(self.body);
            return true;
        }

        if contact.normal.y.abs() > GROUND_NORMAL_Y {
            return false;
        }
        let Some(normal) = horizontal(contact.normal).try_normalize() else {
            return false;
        };

        if let Some(bounced) =
            horizontal(steering::reflect(self.wander_direction, normal)).try_normalize()
        {
            self.wander_direction = bounced;
        }
        self.wander_timer = self.params.wander_interval;
        debug!(
            "npc {:?} bounced off {:?}, wander now {}",
            self.body, contact.other, self.wander_direction
        );
        false
    }

    /// Park in Idle until [`resume`](Self::resume) or an obstacle or the target
    /// shows up.
    pub fn hold(&mut self, port: &impl VehiclePort) -> Option<StateChange> {
        self.force_state(NpcState::Idle, port, |s| s != NpcState::Idle)
    }

    /// Leave Idle and go back to roaming.
    pub fn resume(&mut self, port: &impl VehiclePort) -> Option<StateChange> {
        self.force_state(NpcState::Roam, port, |s| s == NpcState::Idle)
    }

    /// Point the agent at a new target body (e.g. after a respawn).
    pub fn rebind_target(&mut self, target: Option<RigidBodyHandle>) {
        self.target = target;
    }

    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    pub fn target(&self) -> Option<RigidBodyHandle> {
        self.target
    }

    pub fn state(&self) -> NpcState {
        self.state
    }

    pub fn params(&self) -> &NpcParams {
        &self.params
    }

    pub fn wander_direction(&self) -> Vec3 {
        self.wander_direction
    }

    pub fn wander_timer(&self) -> f32 {
        self.wander_timer
    }

    /// The agent touched its target and is waiting to be despawned
    pub fn has_been_hit(&self) -> bool {
        self.has_been_hit
    }

    // ------------------------------------------------------------------------
    // Sensing
    // ------------------------------------------------------------------------

    fn sense(&self, port: &impl VehiclePort, pose: &Pose) -> Sensing {
        let obstacle = port
            .cast(
                pose.position,
                pose.forward(),
                self.params.obstacle_detect_distance,
                Some(self.body),
            )
            .filter(|hit| !self.is_target(hit.body));

        let target_distance = self
            .target
            .and_then(|t| port.pose(t))
            .map(|target| pose.horizontal_distance(target.position));

        Sensing {
            obstacle,
            target_distance,
        }
    }

    fn is_target(&self, body: Option<RigidBodyHandle>) -> bool {
        body.is_some() && body == self.target
    }

    fn is_clear(&self, port: &impl SpatialQuery, origin: Vec3, direction: Vec3) -> bool {
        port.cast(
            origin,
            direction,
            self.params.obstacle_detect_distance,
            Some(self.body),
        )
        .is_none_or(|hit| self.is_target(hit.body))
    }

    fn sample_wander_direction(&mut self, port: &impl SpatialQuery, origin: Vec3) -> Vec3 {
        let mut candidate = self.wander_direction;
        for _ in 0..WANDER_SAMPLE_ATTEMPTS {
            candidate = steering::random_horizontal(&mut self.rng);
            if self.is_clear(port, origin, candidate) {
                return candidate;
            }
        }
        candidate
    }

    fn avoidance_heading(&mut self, direction: Vec3, normal: Vec3) -> Vec3 {
        let normal = horizontal(normal).try_normalize().unwrap_or(normal);
        steering::jittered_reflection(
            direction,
            normal,
            self.params.obstacle_jitter_angle,
            &mut self.rng,
        )
    }

    // ------------------------------------------------------------------------
    // State entry
    // ------------------------------------------------------------------------

    fn enter(
        &mut self,
        next: NpcState,
        port: &impl SpatialQuery,
        origin: Vec3,
        obstacle: Option<&RayHit>,
    ) {
        if next != self.state {
            debug!("npc {:?}: {} -> {}", self.body, self.state, next);
        }
        self.state = next;
        self.wander_timer = self.params.wander_interval;

        let prior = self.wander_direction;
        self.wander_direction = match (next, obstacle) {
            (NpcState::AvoidObstacle, Some(hit)) => self.avoidance_heading(prior, hit.normal),
            _ => self.sample_wander_direction(port, origin),
        };
    }

    fn force_state(
        &mut self,
        next: NpcState,
        port: &impl VehiclePort,
        allowed_from: impl Fn(NpcState) -> bool,
    ) -> Option<StateChange> {
        if self.has_been_hit || !allowed_from(self.state) {
            return None;
        }
        let from = self.state;
        let origin = port.pose(self.body).map_or(Vec3::ZERO, |p| p.position);
        self.enter(next, port, origin, None);
        Some(StateChange { from, to: next })
    }

    // ------------------------------------------------------------------------
    // Per-state behavior
    // ------------------------------------------------------------------------

    fn tick_wander(&mut self, port: &impl SpatialQuery, pose: &Pose, sensing: &Sensing, dt: f32) {
        self.wander_timer -= dt;
        if self.wander_timer <= 0.0 {
            let next = fsm::on_wander_expiry(self.state, sensing, self.params.detection_radius);
            self.enter(next, port, pose.position, None);
        }
    }

    fn roam(
        &mut self,
        port: &impl SpatialQuery,
        pose: &Pose,
        sensing: &Sensing,
        dt: f32,
    ) -> SteeringOutput {
        let out = SteeringOutput::new(
            self.wander_direction,
            self.params.wander_acceleration,
            self.params.turn_speed * ROAM_TURN_FACTOR,
        );
        self.tick_wander(port, pose, sensing, dt);
        out
    }

    fn evade(
        &mut self,
        port: &impl VehiclePort,
        pose: &Pose,
        sensing: &Sensing,
        dt: f32,
    ) -> SteeringOutput {
        let away = self
            .target
            .and_then(|t| port.pose(t))
            .and_then(|target| steering::flee_direction(pose.position, target.position));

        let heading = match (away, sensing.obstacle) {
            (Some(away), Some(hit)) => {
                let reflected = horizontal(steering::reflect(away, hit.normal));
                steering::blend(away, reflected, EVADE_REFLECTION_WEIGHT)
            }
            (Some(away), None) => away,
            (None, _) => Vec3::ZERO,
        };

        self.tick_wander(port, pose, sensing, dt);
        SteeringOutput::new(
            heading,
            self.params.move_acceleration,
            self.params.turn_speed * self.params.avoidance_strength,
        )
    }

    fn avoid(&mut self, port: &impl SpatialQuery, pose: &Pose, just_entered: bool) -> SteeringOutput {
        if !just_entered {
            let nearest = port
                .cast_all(
                    pose.position,
                    pose.forward(),
                    self.params.obstacle_detect_distance,
                    Some(self.body),
                )
                .into_iter()
                .find(|hit| !self.is_target(hit.body));

            if let Some(hit) = nearest {
                if self.wander_direction.dot(hit.normal) < 0.0 {
                    let prior = self.wander_direction;
                    self.wander_direction = self.avoidance_heading(prior, hit.normal);
                }
            }
        }

        SteeringOutput::new(
            self.wander_direction,
            self.params.move_acceleration,
            self.params.turn_speed * AVOID_TURN_FACTOR,
        )
    }

    fn idle(
        &mut self,
        port: &mut impl VehiclePort,
        locomotion: &LocomotionModel,
        pose: &Pose,
        dt: f32,
    ) {
        let velocity = port.linear_velocity(self.body).unwrap_or(Vec3::ZERO);
        port.set_linear_velocity(self.body, Vec3::new(0.0, velocity.y, 0.0));
        locomotion.turn_toward(
            port,
            self.body,
            horizontal(pose.forward()),
            self.params.turn_speed * IDLE_TURN_FACTOR,
            dt,
        );
    }
}
