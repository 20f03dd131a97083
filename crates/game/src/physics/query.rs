use glam::Vec3;

use crate::services::{Overlap, RayHit, SpatialQuery};
use crate::snapshot::{EntityId, World};

use super::PhysicsWorld;

/// Spatial queries over one arena: entity hit zones plus fixed geometry.
///
/// Expects the hit zones to be current, see
/// [`PhysicsSync::sync_hit_zones`](super::PhysicsSync::sync_hit_zones).
pub struct ArenaSpace<'a> {
    world: &'a World,
    physics: &'a PhysicsWorld,
}

impl<'a> ArenaSpace<'a> {
    pub fn new(world: &'a World, physics: &'a PhysicsWorld) -> Self {
        Self { world, physics }
    }
}

impl SpatialQuery for ArenaSpace<'_> {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        ignore: &[EntityId],
    ) -> Option<RayHit> {
        let direction = direction.try_normalize()?;
        self.physics.cast_ray(origin, direction, max_distance, ignore)
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32) -> Vec<Overlap> {
        self.physics
            .overlap_hit_zones(center, radius)
            .into_iter()
            .filter_map(|(entity, distance)| {
                let kind = self.world.get(entity)?.kind;
                Some(Overlap {
                    entity,
                    kind,
                    distance,
                })
            })
            .collect()
    }
}
