use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapObjectKind {
    Ground,
    Wall,
    Barrel,
    Drone,
    PlayerSpawn,
}

#[derive(Debug, Clone)]
pub struct MapObject {
    pub kind: MapObjectKind,
    pub position: Vec3,
    pub half_extents: Vec3,
}

impl MapObject {
    pub fn ground(y: f32, half_size: f32) -> Self {
        Self {
            kind: MapObjectKind::Ground,
            position: Vec3::new(0.0, y, 0.0),
            half_extents: Vec3::new(half_size, 0.0, half_size),
        }
    }

    pub fn wall(position: Vec3, half_extents: Vec3) -> Self {
        Self {
            kind: MapObjectKind::Wall,
            position,
            half_extents,
        }
    }

    pub fn barrel(position: Vec3) -> Self {
        Self::marker(MapObjectKind::Barrel, position)
    }

    pub fn drone(position: Vec3) -> Self {
        Self::marker(MapObjectKind::Drone, position)
    }

    pub fn player_spawn(position: Vec3) -> Self {
        Self::marker(MapObjectKind::PlayerSpawn, position)
    }

    fn marker(kind: MapObjectKind, position: Vec3) -> Self {
        Self {
            kind,
            position,
            half_extents: Vec3::ZERO,
        }
    }

    /// Geometry is built on every participant; everything else is spawned
    /// by the host and replicated.
    pub fn is_geometry(&self) -> bool {
        matches!(self.kind, MapObjectKind::Ground | MapObjectKind::Wall)
    }
}
