use glam::Vec3;

use crate::simulation::{Arena, ArenaError};
use crate::snapshot::EntityId;

use super::{MapObject, MapObjectKind};

/// Walled square arena with a barrel cluster and a drone patrol line.
pub struct TestingGround {
    objects: Vec<MapObject>,
}

impl Default for TestingGround {
    fn default() -> Self {
        Self::new(4, 6)
    }
}

impl TestingGround {
    const HALF_SIZE: f32 = 5000.0;
    const WALL_HEIGHT: f32 = 300.0;
    const WALL_THICKNESS: f32 = 50.0;
    const BARREL_SPACING: f32 = 150.0;
    const DRONE_SPACING: f32 = 300.0;
    const DRONE_HOVER: f32 = 100.0;

    pub fn new(drones: usize, barrels: usize) -> Self {
        let mut objects = vec![MapObject::ground(0.0, Self::HALF_SIZE)];

        Self::add_walls(&mut objects);
        Self::add_cover(&mut objects);
        Self::add_barrels(&mut objects, barrels);
        Self::add_drones(&mut objects, drones);
        Self::add_spawns(&mut objects);

        Self { objects }
    }

    fn add_walls(objects: &mut Vec<MapObject>) {
        let h = Self::HALF_SIZE;
        let y = Self::WALL_HEIGHT;
        let t = Self::WALL_THICKNESS;

        for sign in [-1.0, 1.0] {
            objects.push(MapObject::wall(
                Vec3::new(sign * (h + t), y, 0.0),
                Vec3::new(t, y, h),
            ));
            objects.push(MapObject::wall(
                Vec3::new(0.0, y, sign * (h + t)),
                Vec3::new(h, y, t),
            ));
        }
    }

    fn add_cover(objects: &mut Vec<MapObject>) {
        for x in [-1500.0, 0.0, 1500.0] {
            objects.push(MapObject::wall(
                Vec3::new(x, 100.0, -1200.0),
                Vec3::new(200.0, 100.0, 25.0),
            ));
        }
    }

    fn add_barrels(objects: &mut Vec<MapObject>, count: usize) {
        let origin = Vec3::new(1000.0, 45.0, 600.0);
        for i in 0..count {
            let (row, col) = ((i / 3) as f32, (i % 3) as f32);
            objects.push(MapObject::barrel(
                origin + Vec3::new(col * Self::BARREL_SPACING, 0.0, row * Self::BARREL_SPACING),
            ));
        }
    }

    fn add_drones(objects: &mut Vec<MapObject>, count: usize) {
        let start = -(count.saturating_sub(1) as f32) * Self::DRONE_SPACING * 0.5;
        for i in 0..count {
            objects.push(MapObject::drone(Vec3::new(
                start + i as f32 * Self::DRONE_SPACING,
                Self::DRONE_HOVER,
                -3000.0,
            )));
        }
    }

    fn add_spawns(objects: &mut Vec<MapObject>) {
        for x in [-600.0, -200.0, 200.0, 600.0] {
            objects.push(MapObject::player_spawn(Vec3::new(x, 0.0, 1500.0)));
        }
    }

    pub fn objects(&self) -> &[MapObject] {
        &self.objects
    }

    pub fn player_spawns(&self) -> Vec<Vec3> {
        self.positions_of(MapObjectKind::PlayerSpawn)
    }

    pub fn positions_of(&self, kind: MapObjectKind) -> Vec<Vec3> {
        self.objects
            .iter()
            .filter(|o| o.kind == kind)
            .map(|o| o.position)
            .collect()
    }

    /// Builds the map into an arena. Observers only receive the geometry;
    /// the host also spawns the hazards and drones, returning their ids.
    pub fn spawn_into(&self, arena: &mut Arena) -> Result<Vec<EntityId>, ArenaError> {
        let host = arena.role().is_host();
        let mut spawned = Vec::new();

        for object in &self.objects {
            match object.kind {
                MapObjectKind::Ground => arena.add_ground(object.position.y, object.half_extents.x),
                MapObjectKind::Wall => arena.add_wall(object.position, object.half_extents),
                MapObjectKind::Barrel if host => spawned.push(arena.spawn_barrel(object.position)?),
                MapObjectKind::Drone if host => spawned.push(arena.spawn_drone(object.position)?),
                MapObjectKind::Barrel | MapObjectKind::Drone | MapObjectKind::PlayerSpawn => {}
            }
        }

        Ok(spawned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::ParticipantId;
    use crate::simulation::ArenaConfig;
    use crate::snapshot::EntityKind;

    #[test]
    fn host_spawns_hazards_and_drones() {
        let ground = TestingGround::new(3, 5);
        let mut arena = Arena::host(ArenaConfig::default());

        let spawned = ground.spawn_into(&mut arena).unwrap();

        assert_eq!(spawned.len(), 8);
        assert_eq!(arena.entities_of(EntityKind::TrackerDrone).len(), 3);
        assert_eq!(arena.entities_of(EntityKind::ExplosiveBarrel).len(), 5);
        assert!(arena.physics().body_count() >= 8);
    }

    #[test]
    fn observer_gets_geometry_only() {
        let ground = TestingGround::default();
        let mut arena = Arena::observer(ParticipantId(1), ArenaConfig::default());

        let spawned = ground.spawn_into(&mut arena).unwrap();

        assert!(spawned.is_empty());
        assert_eq!(arena.world().entity_count(), 0);
    }

    #[test]
    fn spawns_are_inside_the_walls() {
        let ground = TestingGround::default();
        for spawn in ground.player_spawns() {
            assert!(spawn.x.abs() < TestingGround::HALF_SIZE);
            assert!(spawn.z.abs() < TestingGround::HALF_SIZE);
        }
    }
}
