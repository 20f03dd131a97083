use std::collections::HashMap;

use glam::Vec3;
use rapier3d::prelude::*;

use crate::effects::SurfaceClass;
use crate::services::{PhysicalReaction, RayHit};
use crate::snapshot::{EntityId, HitZone};

pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    gravity: Vector,
    attached: HashMap<EntityId, RigidBodyHandle>,
    hit_zones: HashMap<EntityId, Vec<ColliderHandle>>,
}

fn to_vector(v: Vec3) -> Vector {
    Vector::new(v.x, v.y, v.z)
}

/// Hit zones carry their owner and surface in `user_data`: the entity id
/// plus one above the low byte, the surface class in it. Zero is geometry.
fn zone_tag(entity: EntityId, surface: SurfaceClass) -> u128 {
    ((entity.0 as u128 + 1) << 8) | surface as u128
}

fn zone_of(collider: &Collider) -> Option<(EntityId, SurfaceClass)> {
    let owner = (collider.user_data >> 8).checked_sub(1)?;
    let surface = SurfaceClass::from((collider.user_data & 0xff) as u8);
    Some((EntityId(owner as u32), surface))
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// World units are centimetres.
    pub const GRAVITY: Real = -980.0;

    pub fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = 1.0 / 60.0;
        integration_parameters.min_ccd_dt = integration_parameters.dt / 100.0;
        integration_parameters.length_unit = 100.0;

        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity: Vector::new(0.0, Self::GRAVITY, 0.0),
            attached: HashMap::new(),
            hit_zones: HashMap::new(),
        }
    }

    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.integration_parameters.min_ccd_dt = dt / 100.0;

        self.pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }

    pub fn add_static_box(&mut self, position: Vec3, half_extents: Vec3) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(Vector::new(position.x, position.y, position.z))
            .build();
        let handle = self.colliders.insert(collider);
        self.index_collider(handle);
        handle
    }

    pub fn add_ground(&mut self, y: Real, half_size: Real) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_size, 10.0, half_size)
            .translation(Vector::new(0.0, y - 10.0, 0.0))
            .build();
        let handle = self.colliders.insert(collider);
        self.index_collider(handle);
        handle
    }

    pub fn add_dynamic_box(
        &mut self,
        position: Vec3,
        half_extents: Vec3,
        mass: Real,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(position.x, position.y, position.z))
            .ccd_enabled(true)
            .build();

        let handle = self.bodies.insert(body);

        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .mass(mass)
            .friction(0.5)
            .restitution(0.3)
            .build();

        let collider = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        self.index_collider(collider);

        handle
    }

    pub fn add_dynamic_sphere(
        &mut self,
        position: Vec3,
        radius: f32,
        mass: f32,
        linear_damping: f32,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(position.x, position.y, position.z))
            .linear_damping(linear_damping)
            .ccd_enabled(true)
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::ball(radius)
            .mass(mass)
            .friction(0.5)
            .restitution(0.3)
            .build();
        let collider = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        self.index_collider(collider);
        handle
    }

    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.attached.retain(|_, h| *h != handle);
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Makes the body reachable through [`PhysicalReaction`] by entity id.
    pub fn attach(&mut self, entity: EntityId, handle: RigidBodyHandle) {
        self.attached.insert(entity, handle);
    }

    pub fn handle_of(&self, entity: EntityId) -> Option<RigidBodyHandle> {
        self.attached.get(&entity).copied()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn body_position(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| {
            let t = b.translation();
            Vec3::new(t.x, t.y, t.z)
        })
    }

    pub fn body_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| {
            let v = b.linvel();
            Vec3::new(v.x, v.y, v.z)
        })
    }

    pub fn set_body_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(Vector::new(velocity.x, velocity.y, velocity.z), true);
        }
    }

    /// Adds `delta` to the body's linear velocity, ignoring its mass.
    pub fn add_velocity(&mut self, handle: RigidBodyHandle, delta: Vec3) -> bool {
        let Some(body) = self.bodies.get_mut(handle) else {
            return false;
        };
        if !body.is_dynamic() {
            return false;
        }
        let v = body.linvel();
        let velocity = Vector::new(v.x + delta.x, v.y + delta.y, v.z + delta.z);
        body.set_linvel(velocity, true);
        true
    }

    /// Puts a collider into the query tree now instead of at the next step.
    fn index_collider(&mut self, handle: ColliderHandle) {
        if let Some(collider) = self.colliders.get(handle) {
            self.broad_phase
                .set_aabb(&self.integration_parameters, handle, collider.compute_aabb());
        }
    }

    /// Creates or moves the sensor balls standing in for an entity's hit
    /// zones. They have no body, so they never push or get pushed.
    pub fn place_hit_zones(&mut self, entity: EntityId, position: Vec3, zones: &[HitZone]) {
        if let Some(handles) = self.hit_zones.get(&entity).cloned() {
            for (handle, zone) in handles.into_iter().zip(zones) {
                let target = to_vector(position + zone.offset);
                let Some(collider) = self.colliders.get_mut(handle) else {
                    continue;
                };
                if collider.translation() != target {
                    collider.set_translation(target);
                    self.index_collider(handle);
                }
            }
            return;
        }

        let mut handles = Vec::with_capacity(zones.len());
        for zone in zones {
            let collider = ColliderBuilder::ball(zone.radius)
                .sensor(true)
                .user_data(zone_tag(entity, zone.surface))
                .translation(to_vector(position + zone.offset))
                .build();
            let handle = self.colliders.insert(collider);
            self.index_collider(handle);
            handles.push(handle);
        }
        self.hit_zones.insert(entity, handles);
    }

    pub fn remove_hit_zones(&mut self, entity: EntityId) {
        for handle in self.hit_zones.remove(&entity).unwrap_or_default() {
            self.colliders
                .remove(handle, &mut self.islands, &mut self.bodies, false);
        }
    }

    pub fn hit_zone_owners(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.hit_zones.keys().copied()
    }

    fn query_pipeline<'a>(&'a self, filter: QueryFilter<'a>) -> QueryPipeline<'a> {
        self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        )
    }

    /// First hit among fixed geometry and hit zones. Simulated props are
    /// found through their zones, never through their rigid bodies.
    pub fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: Real,
        ignore: &[EntityId],
    ) -> Option<RayHit> {
        let not_ignored = |_: ColliderHandle, collider: &Collider| {
            zone_of(collider).is_none_or(|(owner, _)| !ignore.contains(&owner))
        };
        let query = self.query_pipeline(QueryFilter::only_fixed().predicate(&not_ignored));
        let ray = Ray::new(to_vector(origin), to_vector(direction));

        let (handle, toi) = query.cast_ray(&ray, max_distance, true)?;
        let zone = self.colliders.get(handle).and_then(zone_of);
        Some(RayHit {
            point: origin + direction * toi,
            distance: toi,
            surface: zone.map_or(SurfaceClass::Default, |(_, surface)| surface),
            entity: zone.map(|(owner, _)| owner),
        })
    }

    /// Owners of hit zones touching the sphere, each with the distance from
    /// `center` to its nearest zone.
    pub fn overlap_hit_zones(&self, center: Vec3, radius: Real) -> Vec<(EntityId, Real)> {
        let ball = Ball::new(radius);
        let pose = Pose::translation(center.x, center.y, center.z);
        let query = self.query_pipeline(QueryFilter::only_fixed());

        let mut found: Vec<(EntityId, Real)> = Vec::new();
        for (_, collider) in query.intersect_shape(pose, &ball) {
            let Some((owner, _)) = zone_of(collider) else {
                continue;
            };
            let distance =
                collider
                    .shape()
                    .distance_to_point(collider.position(), to_vector(center), true);
            match found.iter_mut().find(|(entity, _)| *entity == owner) {
                Some(entry) => entry.1 = entry.1.min(distance),
                None => found.push((owner, distance)),
            }
        }
        found
    }
}

impl PhysicalReaction for PhysicsWorld {
    fn add_impulse(&mut self, entity: EntityId, impulse: Vec3) {
        if let Some(handle) = self.handle_of(entity) {
            self.add_velocity(handle, impulse);
        }
    }

    fn radial_impulse(
        &mut self,
        origin: Vec3,
        radius: f32,
        strength: f32,
        ignore: Option<EntityId>,
    ) -> usize {
        let ball = Ball::new(radius);
        let pose = Pose::translation(origin.x, origin.y, origin.z);
        let mut filter = QueryFilter::only_dynamic();
        if let Some(handle) = ignore.and_then(|entity| self.handle_of(entity)) {
            filter = filter.exclude_rigid_body(handle);
        }

        let mut targets: Vec<RigidBodyHandle> = self
            .query_pipeline(filter)
            .intersect_shape(pose, &ball)
            .filter_map(|(_, collider)| collider.parent())
            .filter(|handle| self.bodies.get(*handle).is_some_and(|b| b.is_enabled()))
            .collect();
        targets.sort_by_key(|handle| handle.into_raw_parts());
        targets.dedup();

        let mut pushed = 0;
        for handle in targets {
            let Some(position) = self.body_position(handle) else {
                continue;
            };
            let direction = (position - origin).try_normalize().unwrap_or(Vec3::Y);
            if self.add_velocity(handle, direction * strength) {
                pushed += 1;
            }
        }
        pushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radial_impulse_pushes_bodies_away() {
        let mut physics = PhysicsWorld::new();
        let near = physics.add_dynamic_box(Vec3::new(100.0, 0.0, 0.0), Vec3::splat(30.0), 50.0);
        let far = physics.add_dynamic_box(Vec3::new(900.0, 0.0, 0.0), Vec3::splat(30.0), 50.0);
        let source = physics.add_dynamic_box(Vec3::ZERO, Vec3::splat(30.0), 50.0);
        physics.attach(EntityId(1), near);
        physics.attach(EntityId(2), far);
        physics.attach(EntityId(3), source);

        let pushed = physics.radial_impulse(Vec3::ZERO, 250.0, 1000.0, Some(EntityId(3)));

        assert_eq!(pushed, 1);
        let velocity = physics.body_velocity(near).unwrap();
        assert!(velocity.x > 999.0);
        assert_eq!(physics.body_velocity(far), Some(Vec3::ZERO));
        assert_eq!(physics.body_velocity(source), Some(Vec3::ZERO));
    }

    #[test]
    fn impulse_is_a_velocity_change() {
        let mut physics = PhysicsWorld::new();
        let light = physics.add_dynamic_box(Vec3::ZERO, Vec3::splat(10.0), 1.0);
        let heavy = physics.add_dynamic_box(Vec3::new(500.0, 0.0, 0.0), Vec3::splat(10.0), 500.0);
        physics.attach(EntityId(1), light);
        physics.attach(EntityId(2), heavy);

        physics.add_impulse(EntityId(1), Vec3::Y * 400.0);
        physics.add_impulse(EntityId(2), Vec3::Y * 400.0);

        assert_eq!(physics.body_velocity(light), physics.body_velocity(heavy));
    }

    #[test]
    fn raycast_hits_walls_without_a_step() {
        let mut physics = PhysicsWorld::new();
        physics.add_static_box(Vec3::new(500.0, 0.0, 0.0), Vec3::new(10.0, 200.0, 200.0));

        let hit = physics.cast_ray(Vec3::ZERO, Vec3::X, 10_000.0, &[]).unwrap();
        assert!((hit.distance - 490.0).abs() < 0.5);
        assert!((hit.point.x - 490.0).abs() < 0.5);
        assert_eq!(hit.entity, None);
        assert!(physics.cast_ray(Vec3::ZERO, Vec3::NEG_X, 10_000.0, &[]).is_none());
    }

    #[test]
    fn hit_zones_report_owner_and_surface() {
        let mut physics = PhysicsWorld::new();
        let zones = [
            HitZone {
                offset: Vec3::ZERO,
                radius: 40.0,
                surface: SurfaceClass::Flesh,
            },
            HitZone {
                offset: Vec3::new(0.0, 100.0, 0.0),
                radius: 10.0,
                surface: SurfaceClass::FleshVulnerable,
            },
        ];
        physics.place_hit_zones(EntityId(7), Vec3::new(1_000.0, 0.0, 0.0), &zones);

        let body = physics.cast_ray(Vec3::ZERO, Vec3::X, 10_000.0, &[]).unwrap();
        assert_eq!(body.entity, Some(EntityId(7)));
        assert_eq!(body.surface, SurfaceClass::Flesh);
        assert!((body.distance - 960.0).abs() < 0.5);

        let head = physics
            .cast_ray(Vec3::new(0.0, 100.0, 0.0), Vec3::X, 10_000.0, &[])
            .unwrap();
        assert_eq!(head.surface, SurfaceClass::FleshVulnerable);

        assert!(physics
            .cast_ray(Vec3::ZERO, Vec3::X, 10_000.0, &[EntityId(7)])
            .is_none());
    }

    #[test]
    fn moved_and_removed_zones_follow_their_entity() {
        let mut physics = PhysicsWorld::new();
        let zone = [HitZone {
            offset: Vec3::ZERO,
            radius: 25.0,
            surface: SurfaceClass::Default,
        }];
        physics.place_hit_zones(EntityId(1), Vec3::new(300.0, 0.0, 0.0), &zone);
        physics.place_hit_zones(EntityId(1), Vec3::new(300.0, 500.0, 0.0), &zone);

        assert!(physics.cast_ray(Vec3::ZERO, Vec3::X, 10_000.0, &[]).is_none());
        let overlaps = physics.overlap_hit_zones(Vec3::new(300.0, 450.0, 0.0), 30.0);
        assert_eq!(overlaps.len(), 1);
        assert!((overlaps[0].1 - 25.0).abs() < 0.5);

        physics.remove_hit_zones(EntityId(1));
        assert!(physics
            .overlap_hit_zones(Vec3::new(300.0, 500.0, 0.0), 30.0)
            .is_empty());
        assert_eq!(physics.hit_zone_owners().count(), 0);
    }

    #[test]
    fn rigid_bodies_are_not_ray_targets() {
        let mut physics = PhysicsWorld::new();
        let handle = physics.add_dynamic_box(Vec3::new(300.0, 0.0, 0.0), Vec3::splat(30.0), 50.0);
        physics.attach(EntityId(1), handle);

        assert!(physics.cast_ray(Vec3::ZERO, Vec3::X, 10_000.0, &[]).is_none());
    }
}
