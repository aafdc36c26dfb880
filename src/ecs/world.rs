//! World wrapper around hecs

use hecs::Entity;

use super::components::{Role, Vehicle};
use crate::physics::RigidBodyHandle;

/// Registry of every entity in the simulation
pub struct World {
    /// The underlying hecs world
    pub inner: hecs::World,
}

impl World {
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn an entity with the given components
    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> Entity {
        self.inner.spawn(components)
    }

    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.inner.despawn(entity)
    }

    /// Get a reference to a component
    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<'_, T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// First entity playing `role`, if any.
    ///
    /// NPCs resolve their target through this once at spawn.
    pub fn find_by_role(&self, role: Role) -> Option<Entity> {
        self.inner
            .query::<&Role>()
            .iter()
            .find(|(_, r)| **r == role)
            .map(|(entity, _)| entity)
    }

    /// Physics body of a vehicle entity
    pub fn body_of(&self, entity: Entity) -> Option<RigidBodyHandle> {
        self.get::<Vehicle>(entity).ok().map(|v| v.body)
    }

    /// Entity owning a physics body
    pub fn entity_of(&self, body: RigidBodyHandle) -> Option<Entity> {
        self.inner
            .query::<&Vehicle>()
            .iter()
            .find(|(_, v)| v.body == body)
            .map(|(entity, _)| entity)
    }

    /// Query for entities with specific components
    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<'_, Q> {
        self.inner.query::<Q>()
    }

    /// Query for entities with specific components (mutable)
    pub fn query_mut<Q: hecs::Query>(&mut self) -> hecs::QueryMut<'_, Q> {
        self.inner.query_mut::<Q>()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Name;
    use crate::vehicle::{LocomotionModel, StabilizerController};

    fn vehicle(index: u32) -> Vehicle {
        Vehicle::new(
            RigidBodyHandle::from_raw_parts(index, 0),
            LocomotionModel::default(),
            StabilizerController::default(),
        )
    }

    #[test]
    fn test_find_by_role() {
        let mut world = World::new();
        assert!(world.find_by_role(Role::Player).is_none());

        let npc = world.spawn((Role::Npc, vehicle(0)));
        let player = world.spawn((Role::Player, Name::new("player"), vehicle(1)));

        assert_eq!(world.find_by_role(Role::Player), Some(player));
        assert_eq!(world.find_by_role(Role::Npc), Some(npc));

        world.despawn(player).unwrap();
        assert!(world.find_by_role(Role::Player).is_none());
    }

    #[test]
    fn test_body_lookup_both_ways() {
        let mut world = World::new();
        let entity = world.spawn((Role::Npc, vehicle(4)));
        let body = RigidBodyHandle::from_raw_parts(4, 0);

        assert_eq!(world.body_of(entity), Some(body));
        assert_eq!(world.entity_of(body), Some(entity));
        assert!(world.entity_of(RigidBodyHandle::from_raw_parts(5, 0)).is_none());
        assert_eq!(world.len(), 1);
    }
}
