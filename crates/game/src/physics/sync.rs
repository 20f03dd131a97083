use glam::Vec3;

use crate::snapshot::{Entity, EntityId, EntityKind, World};

use super::PhysicsWorld;

const BARREL_HALF_EXTENTS: Vec3 = Vec3::new(30.0, 45.0, 30.0);
const BARREL_MASS: f32 = 80.0;
const DRONE_RADIUS: f32 = 25.0;
const DRONE_MASS: f32 = 20.0;
const DRONE_DAMPING: f32 = 0.5;

pub struct PhysicsSync;

impl PhysicsSync {
    pub fn physics_to_entity(entity: &mut Entity, physics: &PhysicsWorld) {
        let Some(handle) = entity.physics_handle else {
            return;
        };

        if let Some(pos) = physics.body_position(handle) {
            if entity.position != pos {
                entity.position = pos;
                entity.dirty = true;
            }
        }

        if let Some(vel) = physics.body_velocity(handle) {
            if entity.velocity != vel {
                entity.velocity = vel;
                entity.dirty = true;
            }
        }
    }

    pub fn sync_physics_to_world(physics: &PhysicsWorld, world: &mut World) {
        for entity in world.entities_mut() {
            Self::physics_to_entity(entity, physics);
        }
    }

    /// Players and projectiles are moved by the simulation itself and get no body.
    pub fn create_physics_body(entity: &mut Entity, physics: &mut PhysicsWorld) {
        if entity.physics_handle.is_some() {
            return;
        }

        let handle = match entity.kind {
            EntityKind::ExplosiveBarrel => {
                physics.add_dynamic_box(entity.position, BARREL_HALF_EXTENTS, BARREL_MASS)
            }
            EntityKind::TrackerDrone => physics.add_dynamic_sphere(
                entity.position,
                DRONE_RADIUS,
                DRONE_MASS,
                DRONE_DAMPING,
            ),
            EntityKind::Player
            | EntityKind::Weapon
            | EntityKind::Projectile
            | EntityKind::Static => {
                return;
            }
        };

        physics.attach(entity.id, handle);
        entity.physics_handle = Some(handle);
    }

    pub fn destroy_physics_body(entity: &mut Entity, physics: &mut PhysicsWorld) {
        physics.remove_hit_zones(entity.id);
        if let Some(handle) = entity.physics_handle.take() {
            physics.remove_body(handle);
        }
    }

    /// Brings the query set's hit zones in line with the world: zones follow
    /// collidable entities and vanish with hidden or despawned ones.
    pub fn sync_hit_zones(world: &World, physics: &mut PhysicsWorld) {
        let stale: Vec<EntityId> = physics
            .hit_zone_owners()
            .filter(|id| !world.get(*id).is_some_and(Entity::is_collidable))
            .collect();
        for id in stale {
            physics.remove_hit_zones(id);
        }

        for entity in world.entities().filter(|e| e.is_collidable()) {
            physics.place_hit_zones(entity.id, entity.position, entity.hit_zones());
        }
    }

    /// Stops simulating a body without removing the entity, e.g. an exploded drone.
    pub fn freeze(entity: &Entity, physics: &mut PhysicsWorld) {
        if let Some(handle) = entity.physics_handle {
            physics.set_body_velocity(handle, Vec3::ZERO);
            if let Some(body) = physics.bodies.get_mut(handle) {
                body.set_enabled(false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barrels_and_drones_get_bodies() {
        let mut physics = PhysicsWorld::new();
        let mut world = World::new();
        let barrel = world.spawn_at(EntityKind::ExplosiveBarrel, Vec3::new(0.0, 45.0, 0.0));
        let player = world.spawn(EntityKind::Player);

        for id in [barrel, player] {
            let entity = world.get_mut(id).unwrap();
            PhysicsSync::create_physics_body(entity, &mut physics);
        }

        assert!(world.get(barrel).unwrap().physics_handle.is_some());
        assert!(world.get(player).unwrap().physics_handle.is_none());
        assert!(physics.handle_of(barrel).is_some());
    }

    #[test]
    fn hit_zones_track_collidable_entities() {
        let mut physics = PhysicsWorld::new();
        let mut world = World::new();
        let player = world.spawn_at(EntityKind::Player, Vec3::new(500.0, 0.0, 0.0));
        let drone = world.spawn_at(EntityKind::TrackerDrone, Vec3::new(0.0, 0.0, 500.0));
        world.spawn(EntityKind::Weapon);

        PhysicsSync::sync_hit_zones(&world, &mut physics);
        let mut owners: Vec<_> = physics.hit_zone_owners().collect();
        owners.sort();
        assert_eq!(owners, vec![player, drone]);

        world.get_mut(drone).unwrap().hide();
        world.get_mut(player).unwrap().position = Vec3::new(800.0, 0.0, 0.0);
        PhysicsSync::sync_hit_zones(&world, &mut physics);

        assert_eq!(physics.hit_zone_owners().collect::<Vec<_>>(), vec![player]);
        let hit = physics
            .cast_ray(Vec3::new(0.0, 90.0, 0.0), Vec3::X, 10_000.0, &[])
            .unwrap();
        assert_eq!(hit.entity, Some(player));
        assert!((hit.distance - 760.0).abs() < 0.5);
    }

    #[test]
    fn falling_body_updates_entity() {
        let mut physics = PhysicsWorld::new();
        let mut world = World::new();
        let drone = world.spawn_at(EntityKind::TrackerDrone, Vec3::new(0.0, 500.0, 0.0));
        PhysicsSync::create_physics_body(world.get_mut(drone).unwrap(), &mut physics);
        world.clear_replication_state();

        for _ in 0..10 {
            physics.step(1.0 / 60.0);
        }
        PhysicsSync::sync_physics_to_world(&physics, &mut world);

        let entity = world.get(drone).unwrap();
        assert!(entity.position.y < 500.0);
        assert!(entity.dirty);
    }
}
