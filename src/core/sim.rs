//! Fixed-tick chase simulation
//!
//! Owns the physics world and the entity registry and runs, once per tick:
//! contact delivery, player intent, NPC sensing and steering, stabilization of
//! every vehicle, the physics step, then despawn/respawn of caught NPCs.

use glam::{Quat, Vec3};
use hecs::Entity;
use log::{info, warn};
use rand::rngs::StdRng;

use super::config::{ArenaSettings, ConfigError, SimConfig};
use super::events::{EventQueue, SimEvent};
use super::progression::Progression;
use super::stats::SimStats;
use crate::ai::{NpcAgent, NpcState, SteeringRng, seeded};
use crate::ecs::{Name, Role, Vehicle, World};
use crate::input::{DriverView, IntentSource};
use crate::physics::{BodyActuator, Physics, RigidBodyHandle, SpatialQuery};
use crate::vehicle::{LocomotionModel, LocomotionParams, StabilizerController};

/// Random spawn probes before falling back to the arena centre
const SPAWN_ATTEMPTS: usize = 10;
/// Height above the walls the spawn probe starts from
const SPAWN_PROBE_HEIGHT: f32 = 5.0;
/// Gap left between a new chassis and the ground
const SPAWN_CLEARANCE: f32 = 0.05;

pub struct Simulation {
    config: SimConfig,
    physics: Physics,
    world: World,
    events: EventQueue,
    progression: Progression,
    stats: SimStats,
    driver: Box<dyn IntentSource>,
    ground: RigidBodyHandle,
    spawn_rng: StdRng,
}

impl Simulation {
    /// Build the arena, the player and the first NPC.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration fails validation
    pub fn new(config: SimConfig, driver: Box<dyn IntentSource>) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut physics = Physics::new();
        let ground = build_arena(&mut physics, &config.arena);
        physics.update_queries();

        let mut sim = Self {
            progression: Progression::new(config.progression),
            spawn_rng: seeded(config.sim.seed),
            config,
            physics,
            world: World::new(),
            events: EventQueue::new(),
            stats: SimStats::new(),
            driver,
            ground,
        };

        sim.spawn_player();
        sim.spawn_npc();
        info!(
            "arena ready: half extent {}, dt {}, seed {}",
            sim.config.arena.half_extent, sim.config.sim.dt, sim.config.sim.seed
        );
        Ok(sim)
    }

    /// Run `ticks` fixed ticks
    pub fn run(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Advance one fixed tick
    pub fn tick(&mut self) {
        let dt = self.config.sim.dt;
        self.events.swap();

        self.deliver_contacts();
        self.drive_player(dt);
        self.drive_npcs(dt);
        self.stabilize();
        self.physics.step(dt);
        self.apply_progression();

        self.stats.record_tick();
    }

    /// A point on the ground to drop a vehicle onto.
    ///
    /// Probes random spots from above; a probe that lands on anything but the
    /// ground (another car, a wall) is rejected.
    pub fn spawn_point(&mut self) -> Vec3 {
        let margin = self.config.vehicle.half_extents.max_element();
        let reach = (self.config.arena.half_extent - margin).max(0.0);
        let start_height = self.config.arena.wall_height + SPAWN_PROBE_HEIGHT;

        for _ in 0..SPAWN_ATTEMPTS {
            let x = self.spawn_rng.uniform(-reach, reach);
            let z = self.spawn_rng.uniform(-reach, reach);
            let top = Vec3::new(x, start_height, z);
            if let Some(hit) = self
                .physics
                .cast(top, Vec3::NEG_Y, start_height + SPAWN_PROBE_HEIGHT, None)
                && hit.body == Some(self.ground)
            {
                return hit.point;
            }
        }

        warn!("no clear spawn point after {SPAWN_ATTEMPTS} probes, using arena centre");
        Vec3::ZERO
    }

    /// Spawn an NPC at a random spawn point
    pub fn spawn_npc(&mut self) -> Entity {
        let point = self.spawn_point();
        self.spawn_npc_at(point)
    }

    /// Spawn an NPC resting on the ground at `point`, scaled by the current score.
    pub fn spawn_npc_at(&mut self, point: Vec3) -> Entity {
        let body = self.spawn_chassis(point);
        let stabilizer = StabilizerController::new(self.config.stabilizer);
        stabilizer.setup(&mut self.physics, body);

        let params = self.progression.scaled(&self.config.npc);
        let locomotion = LocomotionModel::new(LocomotionParams {
            acceleration: params.move_acceleration,
            turn_rate: params.turn_speed,
            ..LocomotionParams::default()
        });

        let target = self
            .world
            .find_by_role(Role::Player)
            .and_then(|player| self.world.body_of(player));
        let index = self.stats.spawned();
        let rng = seeded(self.config.sim.seed ^ (index + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let agent: NpcAgent = NpcAgent::spawn(body, params, target, rng, &self.physics);

        let npc = self.world.spawn((
            Role::Npc,
            Name::new(format!("npc-{index}")),
            Vehicle::new(body, locomotion, stabilizer),
            agent,
        ));
        let position = self.physics.pose(body).map_or(point, |p| p.position);
        self.events.push(SimEvent::NpcSpawned {
            npc,
            body,
            position,
        });
        self.stats.record_spawn();
        info!(
            "spawned npc-{index} at {position} (accel {}, avoidance {}, radius {})",
            params.move_acceleration, params.avoidance_strength, params.detection_radius
        );
        npc
    }

    /// Remove an NPC and its body. Returns `false` for anything that is not an NPC.
    pub fn despawn_npc(&mut self, npc: Entity) -> bool {
        let is_npc = self.world.get::<Role>(npc).is_ok_and(|role| *role == Role::Npc);
        if !is_npc {
            return false;
        }
        if let Some(body) = self.world.body_of(npc) {
            self.physics.remove_body(body);
        }
        self.world.despawn(npc).is_ok()
    }

    /// Replace the player car at the arena centre and retarget every NPC.
    pub fn respawn_player(&mut self) -> Entity {
        if let Some(old) = self.world.find_by_role(Role::Player) {
            if let Some(body) = self.world.body_of(old) {
                self.physics.remove_body(body);
            }
            if self.world.despawn(old).is_err() {
                warn!("player entity {old:?} was already gone");
            }
        }

        let player = self.spawn_player();
        let body = self.world.body_of(player);
        for (_, agent) in self.world.query_mut::<&mut NpcAgent>() {
            agent.rebind_target(body);
        }
        player
    }

    /// Park every NPC
    pub fn hold_npcs(&mut self) {
        for (npc, agent) in self.world.query_mut::<&mut NpcAgent>() {
            if let Some(change) = agent.hold(&self.physics) {
                self.events.push(SimEvent::StateChanged {
                    npc,
                    from: change.from,
                    to: change.to,
                });
            }
        }
    }

    /// Release every parked NPC
    pub fn resume_npcs(&mut self) {
        for (npc, agent) in self.world.query_mut::<&mut NpcAgent>() {
            if let Some(change) = agent.resume(&self.physics) {
                self.events.push(SimEvent::StateChanged {
                    npc,
                    from: change.from,
                    to: change.to,
                });
            }
        }
    }

    pub fn score(&self) -> u32 {
        self.progression.score()
    }

    /// Current state of every live NPC
    pub fn npc_states(&self) -> Vec<(Entity, NpcState)> {
        self.world
            .query::<&NpcAgent>()
            .iter()
            .map(|(npc, agent)| (npc, agent.state()))
            .collect()
    }

    /// Events from the previous tick
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn physics(&self) -> &Physics {
        &self.physics
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn player(&self) -> Option<Entity> {
        self.world.find_by_role(Role::Player)
    }

    pub fn player_body(&self) -> Option<RigidBodyHandle> {
        self.player().and_then(|p| self.world.body_of(p))
    }

    // ------------------------------------------------------------------------
    // Tick stages
    // ------------------------------------------------------------------------

    fn deliver_contacts(&mut self) {
        let contacts = self.physics.take_contacts();
        if contacts.is_empty() {
            return;
        }
        self.stats.record_contacts(contacts.len());

        for contact in &contacts {
            if self.world.entity_of(contact.body).is_some() {
                self.events.push(SimEvent::Contact {
                    body: contact.body,
                    other: contact.other,
                    normal: contact.normal,
                });
            }
        }

        for (npc, agent) in self.world.query_mut::<&mut NpcAgent>() {
            let body = agent.body();
            for contact in contacts.iter().filter(|c| c.body == body) {
                if agent.on_contact(contact, &mut self.progression) {
                    self.events.push(SimEvent::NpcHit {
                        npc,
                        body: agent.body(),
                    });
                }
            }
        }
    }

    fn drive_player(&mut self, dt: f32) {
        let Some(vehicle) = self
            .player()
            .and_then(|p| self.world.get::<Vehicle>(p).ok().map(|v| *v))
        else {
            return;
        };
        let Some(pose) = self.physics.pose(vehicle.body) else {
            return;
        };

        let npcs: Vec<Vec3> = self
            .world
            .query::<&NpcAgent>()
            .iter()
            .filter(|(_, agent)| !agent.has_been_hit())
            .filter_map(|(_, agent)| self.physics.pose(agent.body()).map(|p| p.position))
            .collect();

        let view = DriverView {
            pose,
            npcs: &npcs,
        };
        let intent = self.driver.intent(&view);
        vehicle
            .locomotion
            .apply(&mut self.physics, vehicle.body, intent, dt);
    }

    fn drive_npcs(&mut self, dt: f32) {
        for (npc, (vehicle, agent)) in self.world.query_mut::<(&Vehicle, &mut NpcAgent)>() {
            if let Some(change) = agent.tick(&mut self.physics, &vehicle.locomotion, dt) {
                self.stats.record_transition();
                self.events.push(SimEvent::StateChanged {
                    npc,
                    from: change.from,
                    to: change.to,
                });
            }
            if !agent.has_been_hit() {
                self.stats.record_state(agent.state());
            }
        }
    }

    fn stabilize(&mut self) {
        for (_, vehicle) in self.world.query::<&Vehicle>().iter() {
            vehicle.stabilizer.stabilize(&mut self.physics, vehicle.body);
        }
    }

    fn apply_progression(&mut self) {
        if !self.progression.has_pending() {
            return;
        }

        for body in self.progression.take_consumed() {
            match self.world.entity_of(body) {
                Some(npc) => {
                    self.despawn_npc(npc);
                }
                None => warn!("caught body {body:?} has no entity"),
            }
            self.spawn_npc();
        }
        self.events.push(SimEvent::ScoreChanged {
            score: self.progression.score(),
        });
    }

    fn spawn_player(&mut self) -> Entity {
        let body = self.spawn_chassis(Vec3::ZERO);
        let stabilizer = StabilizerController::new(self.config.stabilizer);
        stabilizer.setup(&mut self.physics, body);
        let locomotion = LocomotionModel::new(self.config.player);

        info!("spawned player");
        self.world.spawn((
            Role::Player,
            Name::new("player"),
            Vehicle::new(body, locomotion, stabilizer),
        ))
    }

    fn spawn_chassis(&mut self, ground_point: Vec3) -> RigidBodyHandle {
        let shape = self.config.vehicle;
        let position = ground_point + Vec3::Y * (shape.half_extents.y + SPAWN_CLEARANCE);
        let body = self.physics.create_vehicle_body(
            position,
            Quat::IDENTITY,
            shape.half_extents,
            shape.density,
        );
        self.physics.update_queries();
        body
    }
}

/// Ground slab plus four boundary walls. Returns the ground body.
fn build_arena(physics: &mut Physics, arena: &ArenaSettings) -> RigidBodyHandle {
    let h = arena.half_extent;
    let t = arena.wall_thickness;
    let half_height = arena.wall_height * 0.5;

    let ground = physics.create_static_body(Vec3::ZERO, Quat::IDENTITY);
    physics.add_ground_plane(ground, h + t);

    let offset = h + t * 0.5;
    let walls = [
        (Vec3::new(offset, half_height, 0.0), Vec3::new(t * 0.5, half_height, h + t)),
        (Vec3::new(-offset, half_height, 0.0), Vec3::new(t * 0.5, half_height, h + t)),
        (Vec3::new(0.0, half_height, offset), Vec3::new(h + t, half_height, t * 0.5)),
        (Vec3::new(0.0, half_height, -offset), Vec3::new(h + t, half_height, t * 0.5)),
    ];
    for (center, half_extents) in walls {
        let wall = physics.create_static_body(center, Quat::IDENTITY);
        physics.add_box_collider(wall, half_extents, 1.0);
    }
    ground
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{PursuitAutopilot, ScriptedIntent};
    use crate::vehicle::SteeringIntent;

    fn neutral() -> Box<dyn IntentSource> {
        Box::new(ScriptedIntent(SteeringIntent::NEUTRAL))
    }

    fn npc_count(sim: &Simulation) -> usize {
        sim.npc_states().len()
    }

    #[test]
    fn test_new_builds_player_and_first_npc() {
        let mut sim = Simulation::new(SimConfig::default(), neutral()).unwrap();
        assert!(sim.player().is_some());
        assert_eq!(npc_count(&sim), 1);
        assert_eq!(sim.npc_states()[0].1, NpcState::Roam);
        assert_eq!(sim.score(), 0);

        sim.tick();
        assert!(
            sim.events()
                .iter()
                .any(|e| matches!(e, SimEvent::NpcSpawned { .. }))
        );
        assert_eq!(sim.stats().ticks(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = SimConfig::default();
        config.sim.dt = 0.0;
        assert!(matches!(
            Simulation::new(config, neutral()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_spawn_points_land_on_ground() {
        let mut sim = Simulation::new(SimConfig::default(), neutral()).unwrap();
        let half = sim.config().arena.half_extent;
        for _ in 0..20 {
            let point = sim.spawn_point();
            assert!(point.y.abs() < 0.05, "spawn point off the ground: {point}");
            assert!(point.x.abs() <= half && point.z.abs() <= half);
        }
    }

    #[test]
    fn test_vehicles_stay_upright_and_in_arena() {
        let mut sim = Simulation::new(SimConfig::default(), Box::new(PursuitAutopilot::default()))
            .unwrap();
        sim.run(300);

        let half = sim.config().arena.half_extent + 1.0;
        for (_, vehicle) in sim.world().query::<&Vehicle>().iter() {
            let pose = sim.physics().pose(vehicle.body).unwrap();
            assert!(StabilizerController::tilt_deg(pose.rotation) < 5.0);
            assert!(pose.position.y > -0.5 && pose.position.y < 3.0);
            assert!(pose.position.x.abs() < half && pose.position.z.abs() < half);
        }
        for (_, state) in sim.npc_states() {
            assert!(NpcState::ALL.contains(&state));
        }
    }

    #[test]
    fn test_catching_scores_and_respawns_scaled() {
        let mut config = SimConfig::default();
        config.npc.move_acceleration = 0.0;
        config.npc.wander_acceleration = 0.0;
        let driver = Box::new(ScriptedIntent(SteeringIntent::new(0.0, 1.0)));
        let mut sim = Simulation::new(config, driver).unwrap();

        let (first, _) = sim.npc_states()[0];
        assert!(sim.despawn_npc(first));
        let prey = sim.spawn_npc_at(Vec3::new(0.0, 0.0, -8.0));

        let mut hit_seen = false;
        let mut score_seen = false;
        for _ in 0..300 {
            sim.tick();
            hit_seen |= sim
                .events()
                .pending()
                .any(|e| matches!(e, SimEvent::NpcHit { npc, .. } if *npc == prey));
            score_seen |= sim
                .events()
                .pending()
                .any(|e| matches!(e, SimEvent::ScoreChanged { score: 1 }));
            if sim.score() > 0 {
                break;
            }
        }

        assert_eq!(sim.score(), 1);
        assert!(hit_seen && score_seen);
        assert!(!sim.world().contains(prey));
        assert_eq!(npc_count(&sim), 1);

        let next = sim
            .world()
            .query::<&NpcAgent>()
            .iter()
            .map(|(_, agent)| agent.params().move_acceleration)
            .next()
            .unwrap();
        assert_eq!(next, sim.config().progression.speed_increment);
    }

    #[test]
    fn test_despawn_refuses_player() {
        let mut sim = Simulation::new(SimConfig::default(), neutral()).unwrap();
        let player = sim.player().unwrap();
        assert!(!sim.despawn_npc(player));
        assert!(sim.world().contains(player));
    }

    #[test]
    fn test_respawn_player_rebinds_targets() {
        let mut sim = Simulation::new(SimConfig::default(), neutral()).unwrap();
        sim.spawn_npc();
        let old = sim.player_body().unwrap();

        sim.respawn_player();
        let new = sim.player_body().unwrap();
        assert_ne!(old, new);
        assert!(!sim.physics().contains(old));
        for (_, agent) in sim.world().query::<&NpcAgent>().iter() {
            assert_eq!(agent.target(), Some(new));
        }
    }

    #[test]
    fn test_hold_and_resume_npcs() {
        let mut sim = Simulation::new(SimConfig::default(), neutral()).unwrap();
        let (first, _) = sim.npc_states()[0];
        sim.despawn_npc(first);
        // Well outside the detection radius and clear of the walls
        sim.spawn_npc_at(Vec3::new(15.0, 0.0, 15.0));

        sim.hold_npcs();
        sim.run(20);
        assert!(sim.npc_states().iter().all(|(_, s)| *s == NpcState::Idle));

        sim.resume_npcs();
        assert!(sim.npc_states().iter().all(|(_, s)| *s == NpcState::Roam));
    }

    #[test]
    fn test_same_seed_same_run() {
        let positions = |seed: u64| {
            let mut config = SimConfig::default();
            config.sim.seed = seed;
            let mut sim = Simulation::new(config, neutral()).unwrap();
            sim.run(120);
            sim.world()
                .query::<&NpcAgent>()
                .iter()
                .map(|(_, agent)| sim.physics().pose(agent.body()).unwrap().position)
                .collect::<Vec<_>>()
        };
        assert_eq!(positions(3), positions(3));
    }
}
