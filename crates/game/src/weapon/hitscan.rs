use glam::Vec3;

use crate::effects::SurfaceClass;
use crate::services::SpatialQuery;
use crate::snapshot::EntityId;

/// Outcome of one instantaneous ray shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub origin: Vec3,
    pub direction: Vec3,
    pub endpoint: Vec3,
    pub surface: SurfaceClass,
    pub victim: Option<EntityId>,
}

impl Shot {
    pub fn is_hit(&self) -> bool {
        self.victim.is_some()
    }
}

/// A miss still yields an endpoint at `range` so a tracer has somewhere to go.
pub fn resolve(
    space: &impl SpatialQuery,
    origin: Vec3,
    direction: Vec3,
    range: f32,
    ignore: &[EntityId],
) -> Shot {
    let direction = direction.normalize_or_zero();

    match space.cast_ray(origin, direction, range, ignore) {
        Some(hit) => Shot {
            origin,
            direction,
            endpoint: hit.point,
            surface: hit.surface,
            victim: hit.entity,
        },
        None => Shot {
            origin,
            direction,
            endpoint: origin + direction * range,
            surface: SurfaceClass::Default,
            victim: None,
        },
    }
}
