//! Collaborator contracts the combat core calls into.
//!
//! Each trait is the narrow boundary to a subsystem whose internals live
//! outside the core: spatial queries, effect playback, rigid-body reactions,
//! entity lifetimes and navigation.

use glam::Vec3;

use crate::effects::{Cue, SurfaceClass};
use crate::snapshot::{EntityId, EntityKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub distance: f32,
    pub surface: SurfaceClass,
    pub entity: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    pub entity: EntityId,
    pub kind: EntityKind,
    pub distance: f32,
}

pub trait SpatialQuery {
    /// First blocking surface along `direction` within `max_distance`.
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        ignore: &[EntityId],
    ) -> Option<RayHit>;

    /// Collidable entities whose bounds intersect the sphere.
    fn overlap_sphere(&self, center: Vec3, radius: f32) -> Vec<Overlap>;
}

pub trait Presentation {
    fn play(&mut self, cue: Cue);
}

/// Impulses are velocity changes: mass does not scale the response.
pub trait PhysicalReaction {
    fn add_impulse(&mut self, entity: EntityId, impulse: Vec3);

    /// Pushes every simulated body within `radius` away from `origin`.
    /// Returns the number of bodies affected.
    fn radial_impulse(
        &mut self,
        origin: Vec3,
        radius: f32,
        strength: f32,
        ignore: Option<EntityId>,
    ) -> usize;
}

pub trait EntityLifecycle {
    fn spawn(&mut self, kind: EntityKind, position: Vec3, velocity: Vec3) -> EntityId;
    fn destroy(&mut self, entity: EntityId) -> bool;
    fn schedule_removal(&mut self, entity: EntityId, delay: f64);
}

pub trait Pathfinding {
    /// Waypoints from `start` to `goal`, starting with `start`.
    fn find_path(&self, start: Vec3, goal: Vec3) -> Vec<Vec3>;
}

/// Open-field navigation: the only waypoint is the goal itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLinePath;

impl Pathfinding for StraightLinePath {
    fn find_path(&self, start: Vec3, goal: Vec3) -> Vec<Vec3> {
        vec![start, goal]
    }
}
