use std::collections::{HashMap, VecDeque};

use glam::Vec3;

use crate::agent::TrackerDrone;
use crate::authority::{
    AcceptAll, ActionRequest, ParticipantId, RequestContext, RequestValidator, Role,
};
use crate::damage::{DamageEvent, DamageKind, DamageSink, HealthChanged, Subscriber};
use crate::effects::{Cue, CueLog};
use crate::event::{ArenaEvent, EventLog, LoggedEvent};
use crate::hazard::ExplosiveBarrel;
use crate::net::{FieldUpdate, FieldValue, ReplicationFrame, StateDiff};
use crate::physics::{ArenaSpace, PhysicsSync, PhysicsWorld};
use crate::services::{
    EntityLifecycle, PhysicalReaction, Pathfinding, Presentation, SpatialQuery, StraightLinePath,
};
use crate::snapshot::{Entity, EntityFlags, EntityId, EntityKind, World};
use crate::weapon::{hitscan, play_shot, FireControl, FireMode};

use super::{ArenaConfig, RequestBuffer, TimerAction, TimerManager};

const MUZZLE_OFFSET: f32 = 50.0;

#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("{0} is reserved for the host")]
    NotAuthoritative(&'static str),
    #[error("{0} is reserved for observers")]
    NotObserver(&'static str),
    #[error("unknown entity {0}")]
    UnknownEntity(u32),
    #[error("entity {0} is not a weapon")]
    UnknownWeapon(u32),
}

#[derive(Debug, Clone, Copy)]
struct Aim {
    origin: Vec3,
    direction: Vec3,
    holder: Option<EntityId>,
}

/// One participant's copy of the combat simulation.
///
/// The host runs every rule and publishes replicated fields; an observer
/// mirrors them through [`Arena::apply_diff`] and only predicts its own
/// shots locally. Both roles route reactions through the same handlers.
pub struct Arena {
    role: Role,
    participant: ParticipantId,
    config: ArenaConfig,
    world: World,
    physics: PhysicsWorld,
    timers: TimerManager,
    sinks: HashMap<EntityId, DamageSink>,
    weapons: HashMap<EntityId, FireControl>,
    barrels: HashMap<EntityId, ExplosiveBarrel>,
    drones: HashMap<EntityId, TrackerDrone>,
    pending_damage: VecDeque<(EntityId, DamageEvent)>,
    requests: RequestBuffer,
    outbox: Vec<ActionRequest>,
    validator: Box<dyn RequestValidator>,
    pathfinding: Box<dyn Pathfinding>,
    cues: CueLog,
    events: EventLog,
}

impl Arena {
    pub fn host(config: ArenaConfig) -> Self {
        Self::new(Role::Host, ParticipantId::HOST, config)
    }

    pub fn observer(participant: ParticipantId, config: ArenaConfig) -> Self {
        Self::new(Role::Observer, participant, config)
    }

    fn new(role: Role, participant: ParticipantId, config: ArenaConfig) -> Self {
        let requests = RequestBuffer::new(config.request_capacity);
        let events = EventLog::new(config.event_capacity);
        Self {
            role,
            participant,
            config,
            world: World::new(),
            physics: PhysicsWorld::new(),
            timers: TimerManager::new(),
            sinks: HashMap::new(),
            weapons: HashMap::new(),
            barrels: HashMap::new(),
            drones: HashMap::new(),
            pending_damage: VecDeque::new(),
            requests,
            outbox: Vec::new(),
            validator: Box::new(AcceptAll),
            pathfinding: Box::new(StraightLinePath),
            cues: CueLog::new(),
            events,
        }
    }

    pub fn with_validator(mut self, validator: impl RequestValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn with_pathfinding(mut self, pathfinding: impl Pathfinding + 'static) -> Self {
        self.pathfinding = Box::new(pathfinding);
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn time(&self) -> f64 {
        self.world.time()
    }

    pub fn tick(&self) -> u32 {
        self.world.tick()
    }

    pub fn sink(&self, entity: EntityId) -> Option<&DamageSink> {
        self.sinks.get(&entity)
    }

    pub fn health(&self, entity: EntityId) -> Option<f32> {
        self.sinks.get(&entity).map(DamageSink::current)
    }

    pub fn weapon(&self, weapon: EntityId) -> Option<&FireControl> {
        self.weapons.get(&weapon)
    }

    pub fn barrel(&self, barrel: EntityId) -> Option<&ExplosiveBarrel> {
        self.barrels.get(&barrel)
    }

    pub fn drone(&self, drone: EntityId) -> Option<&TrackerDrone> {
        self.drones.get(&drone)
    }

    pub fn entities_of(&self, kind: EntityKind) -> Vec<EntityId> {
        let mut ids: Vec<_> = self
            .world
            .entities()
            .filter(|e| e.kind == kind)
            .map(|e| e.id)
            .collect();
        ids.sort();
        ids
    }

    /// Closest visible entity of `kind`, used for targeting.
    pub fn nearest(&self, kind: EntityKind, from: Vec3) -> Option<EntityId> {
        self.world
            .entities()
            .filter(|e| e.kind == kind && !e.flags.contains(EntityFlags::HIDDEN))
            .min_by(|a, b| {
                a.position
                    .distance_squared(from)
                    .total_cmp(&b.position.distance_squared(from))
            })
            .map(|e| e.id)
    }

    pub fn entity_position(&self, entity: EntityId) -> Option<Vec3> {
        self.world.get(entity).map(|e| e.position)
    }

    pub fn drain_cues(&mut self) -> Vec<Cue> {
        self.cues.drain().collect()
    }

    pub fn drain_events(&mut self) -> Vec<LoggedEvent> {
        self.events.drain()
    }

    fn log_event(&mut self, event: ArenaEvent) {
        self.events
            .push(self.world.tick(), self.world.time_ms(), event);
    }

    fn require_host(&self, operation: &'static str) -> Result<(), ArenaError> {
        if self.role.is_host() {
            Ok(())
        } else {
            Err(ArenaError::NotAuthoritative(operation))
        }
    }

    // Static geometry exists on every participant; it is never replicated.

    pub fn add_ground(&mut self, y: f32, half_size: f32) {
        self.physics.add_ground(y, half_size);
    }

    pub fn add_wall(&mut self, position: Vec3, half_extents: Vec3) {
        self.physics.add_static_box(position, half_extents);
    }

    pub fn spawn_player(
        &mut self,
        owner: ParticipantId,
        position: Vec3,
    ) -> Result<EntityId, ArenaError> {
        self.require_host("spawning players")?;
        let id = self.world.spawn_at(EntityKind::Player, position);
        if let Some(entity) = self.world.get_mut(id) {
            entity.owner = Some(owner);
        }
        self.attach_components(id);
        Ok(id)
    }

    pub fn spawn_weapon(&mut self, holder: EntityId, mode: FireMode) -> Result<EntityId, ArenaError> {
        self.require_host("spawning weapons")?;
        let holder_entity = self
            .world
            .get(holder)
            .ok_or(ArenaError::UnknownEntity(holder.0))?;
        let (position, owner) = (holder_entity.position, holder_entity.owner);

        let id = self.world.spawn_at(EntityKind::Weapon, position);
        if let Some(entity) = self.world.get_mut(id) {
            entity.variant = mode as u8;
            entity.owner = owner;
            entity.attached_to = Some(holder);
        }
        self.attach_components(id);
        Ok(id)
    }

    pub fn spawn_barrel(&mut self, position: Vec3) -> Result<EntityId, ArenaError> {
        self.require_host("spawning barrels")?;
        let id = self.world.spawn_at(EntityKind::ExplosiveBarrel, position);
        self.attach_components(id);
        Ok(id)
    }

    pub fn spawn_drone(&mut self, position: Vec3) -> Result<EntityId, ArenaError> {
        self.require_host("spawning drones")?;
        let id = self.world.spawn_at(EntityKind::TrackerDrone, position);
        self.attach_components(id);

        let now = self.world.time();
        if let Some(drone) = self.drones.get_mut(&id) {
            drone.start(&mut self.timers, now);
        }
        self.refresh_drone_path(id);
        Ok(id)
    }

    /// Builds the components behind an entity from its kind. Used for host
    /// spawns and for entities an observer learns about from a diff.
    fn attach_components(&mut self, id: EntityId) {
        let role = self.role;
        let Some(entity) = self.world.get_mut(id) else {
            return;
        };

        match entity.kind {
            EntityKind::Player => {
                self.sinks
                    .insert(id, DamageSink::new(id, self.config.player_health));
            }
            EntityKind::Weapon => {
                let mode = FireMode::from(entity.variant);
                let mut control = FireControl::new(id, self.config.weapon(mode).clone());
                if let Some(holder) = entity.attached_to {
                    control = control.held_by(holder, entity.owner);
                }
                self.weapons.insert(id, control);
            }
            EntityKind::ExplosiveBarrel => {
                let config = self.config.barrel.clone();
                let mut sink = DamageSink::new(id, config.max_health);
                sink.subscribe(Subscriber::Hazard(id));
                self.sinks.insert(id, sink);
                self.barrels.insert(id, ExplosiveBarrel::new(id, config));
                if role.is_host() {
                    PhysicsSync::create_physics_body(entity, &mut self.physics);
                }
            }
            EntityKind::TrackerDrone => {
                let config = self.config.drone.clone();
                let mut sink = DamageSink::new(id, config.max_health);
                sink.subscribe(Subscriber::Agent(id));
                self.sinks.insert(id, sink);
                self.drones.insert(id, TrackerDrone::new(id, config));
                if role.is_host() {
                    PhysicsSync::create_physics_body(entity, &mut self.physics);
                }
            }
            EntityKind::Projectile | EntityKind::Static => {}
        }
    }

    fn forget_components(&mut self, id: EntityId) {
        self.sinks.remove(&id);
        self.weapons.remove(&id);
        self.barrels.remove(&id);
        self.drones.remove(&id);
        self.timers.clear_entity(id);
    }

    /// Points a player's view at `target`. Held weapons follow the view.
    pub fn aim_at(&mut self, entity: EntityId, target: Vec3) -> Result<(), ArenaError> {
        self.world
            .get_mut(entity)
            .ok_or(ArenaError::UnknownEntity(entity.0))?
            .look_at(target);
        Ok(())
    }

    pub fn begin_fire(&mut self, weapon: EntityId) -> Result<(), ArenaError> {
        let now = self.world.time();
        self.weapons
            .get_mut(&weapon)
            .ok_or(ArenaError::UnknownWeapon(weapon.0))?
            .begin_fire(&mut self.timers, now);
        Ok(())
    }

    pub fn end_fire(&mut self, weapon: EntityId) -> Result<(), ArenaError> {
        self.weapons
            .get_mut(&weapon)
            .ok_or(ArenaError::UnknownWeapon(weapon.0))?
            .end_fire(&mut self.timers);
        Ok(())
    }

    /// Local intent to fire one round. On the host this executes the shot;
    /// on an observer it requests the shot and predicts its presentation.
    /// Returns whether a round left the magazine.
    pub fn pull_trigger(&mut self, weapon: EntityId) -> Result<bool, ArenaError> {
        let fired = match self.role {
            Role::Host => self.execute_pull_trigger(weapon)?,
            Role::Observer => self.predict_pull_trigger(weapon)?,
        };
        self.drain_damage();
        Ok(fired)
    }

    pub fn begin_reload(&mut self, weapon: EntityId) -> Result<u16, ArenaError> {
        match self.role {
            Role::Host => self.execute_reload(weapon),
            Role::Observer => {
                let moved = self
                    .weapons
                    .get_mut(&weapon)
                    .ok_or(ArenaError::UnknownWeapon(weapon.0))?
                    .reload();
                self.outbox.push(ActionRequest::BeginReload {
                    weapon_id: weapon.0,
                });
                Ok(moved)
            }
        }
    }

    fn aim_of(&self, weapon: EntityId) -> Result<Aim, ArenaError> {
        let control = self
            .weapons
            .get(&weapon)
            .ok_or(ArenaError::UnknownWeapon(weapon.0))?;

        let shooter = control
            .holder()
            .and_then(|holder| self.world.get(holder))
            .or_else(|| self.world.get(weapon))
            .ok_or(ArenaError::UnknownEntity(weapon.0))?;

        Ok(Aim {
            origin: shooter.eye_position(),
            direction: shooter.aim_direction(),
            holder: control.holder(),
        })
    }

    fn execute_pull_trigger(&mut self, weapon: EntityId) -> Result<bool, ArenaError> {
        let aim = self.aim_of(weapon)?;
        let now = self.world.time();
        self.sync_hit_zones();

        let Some(control) = self.weapons.get_mut(&weapon) else {
            return Err(ArenaError::UnknownWeapon(weapon.0));
        };
        if !control.try_consume(now) {
            return Ok(false);
        }

        let mode = control.config().fire_mode;
        match mode {
            FireMode::HitScan => {
                let mut ignore = vec![weapon];
                ignore.extend(aim.holder);

                let space = ArenaSpace::new(&self.world, &self.physics);
                let shot = hitscan::resolve(
                    &space,
                    aim.origin,
                    aim.direction,
                    control.config().max_range,
                    &ignore,
                );

                let shooter = control.owner();
                if let Some(victim) = shot.victim.filter(|v| self.sinks.contains_key(v)) {
                    let event = DamageEvent::new(control.damage_for(shot.surface), DamageKind::Bullet)
                        .with_instigator(shooter)
                        .with_causer(weapon);
                    self.pending_damage.push_back((victim, event));
                }

                control.record_hit(shot.endpoint, shot.surface);
                play_shot(&mut self.cues, weapon, aim.origin, shot.endpoint, shot.surface);
                self.log_event(ArenaEvent::ShotFired {
                    weapon,
                    shooter,
                    endpoint: shot.endpoint,
                    surface: shot.surface,
                    victim: shot.victim,
                });
            }
            FireMode::Launcher => {
                let speed = control.config().projectile_speed;
                let lifetime = control.config().projectile_lifetime;
                let owner = control.owner();

                let muzzle = aim.origin + aim.direction * MUZZLE_OFFSET;
                let projectile = EntityLifecycle::spawn(
                    &mut self.world,
                    EntityKind::Projectile,
                    muzzle,
                    aim.direction * speed,
                );
                if let Some(entity) = self.world.get_mut(projectile) {
                    entity.owner = owner;
                    entity.orientation = glam::Quat::from_rotation_arc(Vec3::NEG_Z, aim.direction);
                }
                self.world.schedule_removal(projectile, lifetime);

                self.cues.play(Cue::MuzzleFlash { weapon });
                self.log_event(ArenaEvent::ProjectileLaunched { weapon, projectile });
            }
        }

        Ok(true)
    }

    fn predict_pull_trigger(&mut self, weapon: EntityId) -> Result<bool, ArenaError> {
        let aim = self.aim_of(weapon)?;
        let now = self.world.time();
        self.sync_hit_zones();

        let Some(control) = self.weapons.get_mut(&weapon) else {
            return Err(ArenaError::UnknownWeapon(weapon.0));
        };
        if !control.try_consume(now) {
            return Ok(false);
        }
        self.outbox.push(ActionRequest::PullTrigger {
            weapon_id: weapon.0,
        });

        let mode = control.config().fire_mode;
        match mode {
            FireMode::HitScan => {
                let mut ignore = vec![weapon];
                ignore.extend(aim.holder);
                let space = ArenaSpace::new(&self.world, &self.physics);
                let shot = hitscan::resolve(
                    &space,
                    aim.origin,
                    aim.direction,
                    control.config().max_range,
                    &ignore,
                );
                play_shot(&mut self.cues, weapon, aim.origin, shot.endpoint, shot.surface);
            }
            FireMode::Launcher => self.cues.play(Cue::MuzzleFlash { weapon }),
        }

        Ok(true)
    }

    fn execute_reload(&mut self, weapon: EntityId) -> Result<u16, ArenaError> {
        let moved = self
            .weapons
            .get_mut(&weapon)
            .ok_or(ArenaError::UnknownWeapon(weapon.0))?
            .reload();
        if moved > 0 {
            self.log_event(ArenaEvent::Reloaded { weapon, moved });
        }
        Ok(moved)
    }

    /// Requests produced by local intents, waiting to be sent to the host.
    pub fn take_requests(&mut self) -> Vec<ActionRequest> {
        std::mem::take(&mut self.outbox)
    }

    /// Queues a request that arrived from an observer; it runs on the next step.
    pub fn enqueue_request(&mut self, from: ParticipantId, request: ActionRequest) {
        let now = self.world.time();
        self.requests.push(from, request, now);
    }

    /// Validates and executes one observer request. Rejected or meaningless
    /// requests are dropped without touching any state.
    pub fn receive_request(&mut self, from: ParticipantId, request: ActionRequest) -> bool {
        if !self.role.is_host() {
            log::debug!("observer {} ignored a forwarded request", self.participant.0);
            return false;
        }

        let weapon = EntityId(request.weapon_id());
        let Some(control) = self.weapons.get(&weapon) else {
            log::warn!(
                "participant {} sent {:?} for unknown weapon",
                from.0,
                request
            );
            self.log_event(ArenaEvent::RequestDropped { from, request });
            return false;
        };

        let ctx = RequestContext {
            from,
            weapon_owner: control.owner(),
            now: self.world.time(),
            last_fire: control.last_fire(),
            min_interval: control.config().min_interval(),
        };
        if !self.validator.validate(&request, &ctx) {
            log::warn!("dropped {:?} from participant {}", request, from.0);
            self.log_event(ArenaEvent::RequestDropped { from, request });
            return false;
        }

        let result = match request {
            ActionRequest::PullTrigger { .. } => self.execute_pull_trigger(weapon).map(|_| ()),
            ActionRequest::BeginReload { .. } => self.execute_reload(weapon).map(|_| ()),
        };
        self.drain_damage();

        if let Err(err) = result {
            log::warn!("request from participant {} failed: {}", from.0, err);
            return false;
        }
        true
    }

    pub fn apply_damage(&mut self, target: EntityId, event: DamageEvent) -> Result<(), ArenaError> {
        self.require_host("applying damage")?;
        if !self.sinks.contains_key(&target) {
            return Err(ArenaError::UnknownEntity(target.0));
        }
        self.pending_damage.push_back((target, event));
        self.drain_damage();
        Ok(())
    }

    /// Applies queued damage until no reaction queues more. Chained
    /// explosions are resolved here iteratively.
    fn drain_damage(&mut self) {
        while let Some((target, event)) = self.pending_damage.pop_front() {
            let Some(sink) = self.sinks.get_mut(&target) else {
                continue;
            };
            let Some(change) = sink.apply_damage(self.role, &event) else {
                continue;
            };
            let subscribers = sink.subscribers().to_vec();

            self.log_event(ArenaEvent::Damaged {
                entity: target,
                amount: change.delta,
                remaining: change.current,
                kind: change.kind,
            });
            self.dispatch_health_change(&change, &subscribers);
        }
    }

    fn dispatch_health_change(&mut self, change: &HealthChanged, subscribers: &[Subscriber]) {
        for subscriber in subscribers {
            match *subscriber {
                Subscriber::Hazard(barrel) => self.on_barrel_health(barrel, change),
                Subscriber::Agent(drone) => self.on_drone_health(drone, change),
            }
        }
    }

    fn on_barrel_health(&mut self, id: EntityId, change: &HealthChanged) {
        let at = self.entity_position(id).unwrap_or_default();
        let Some(barrel) = self.barrels.get_mut(&id) else {
            return;
        };
        let Some(detonation) = barrel.on_health_changed(self.role, change) else {
            return;
        };

        self.physics.add_impulse(id, detonation.impulse);
        let pushed = self.physics.radial_impulse(
            at,
            detonation.force_radius,
            detonation.force_strength,
            Some(id),
        );
        barrel.on_rep_triggered(&mut self.cues, at);

        self.log_event(ArenaEvent::BarrelExploded {
            barrel: id,
            bodies_pushed: pushed,
        });
    }

    fn on_drone_health(&mut self, id: EntityId, change: &HealthChanged) {
        let at = self.entity_position(id).unwrap_or_default();
        let now = self.world.time();
        let Some(drone) = self.drones.get_mut(&id) else {
            return;
        };

        let blast =
            drone.on_health_changed(self.role, change, at, now, &mut self.timers, &mut self.cues);
        if !drone.is_exploded() {
            return;
        }

        if let Some(entity) = self.world.get_mut(id) {
            if !entity.flags.contains(EntityFlags::HIDDEN) {
                entity.hide();
                PhysicsSync::freeze(entity, &mut self.physics);
            }
        }

        let Some(blast) = blast else {
            return;
        };

        self.sync_hit_zones();
        let victims: Vec<EntityId> = ArenaSpace::new(&self.world, &self.physics)
            .overlap_sphere(blast.at, blast.radius)
            .into_iter()
            .filter(|o| o.entity != blast.drone && o.kind.is_damageable())
            .map(|o| o.entity)
            .collect();

        for victim in &victims {
            let event =
                DamageEvent::new(blast.damage, DamageKind::Explosion).with_causer(blast.drone);
            self.pending_damage.push_back((*victim, event));
        }
        self.world.schedule_removal(blast.drone, blast.removal_grace);

        self.log_event(ArenaEvent::DroneSelfDestructed {
            drone: blast.drone,
            damage: blast.damage,
            victims: victims.len(),
        });
    }

    fn sync_hit_zones(&mut self) {
        PhysicsSync::sync_hit_zones(&self.world, &mut self.physics);
    }

    fn refresh_drone_path(&mut self, id: EntityId) {
        let Some(position) = self.entity_position(id) else {
            return;
        };
        let goal = self
            .nearest(EntityKind::Player, position)
            .and_then(|player| self.entity_position(player));
        let now = self.world.time();

        if let Some(drone) = self.drones.get_mut(&id) {
            drone.refresh_path(
                self.pathfinding.as_ref(),
                position,
                goal,
                &mut self.timers,
                now,
            );
        }
    }

    fn aggregate_power(&mut self, id: EntityId) {
        let Some(position) = self.entity_position(id) else {
            return;
        };
        let Some(radius) = self.drones.get(&id).map(|d| d.config().aggregation_radius) else {
            return;
        };
        self.sync_hit_zones();

        let nearby = ArenaSpace::new(&self.world, &self.physics)
            .overlap_sphere(position, radius)
            .into_iter()
            .filter(|o| o.kind == EntityKind::TrackerDrone && o.entity != id)
            .count();

        let Some(drone) = self.drones.get_mut(&id) else {
            return;
        };
        if drone.aggregate(self.role, nearby) {
            drone.on_rep_power_level(&mut self.cues);
            let level = drone.power_level();
            self.log_event(ArenaEvent::PowerLevelChanged { drone: id, level });
        }
    }

    fn run_timer(&mut self, action: TimerAction) {
        match action {
            TimerAction::PullTrigger(weapon) => {
                if let Err(err) = self.pull_trigger(weapon) {
                    log::debug!("trigger timer for {}: {}", weapon.0, err);
                }
            }
            TimerAction::AggregatePower(drone) => self.aggregate_power(drone),
            TimerAction::SelfDamage(drone) => {
                let amount = self.drones.get(&drone).map(|d| d.config().self_damage);
                if let Some(amount) = amount {
                    let event =
                        DamageEvent::new(amount, DamageKind::SelfDestruct).with_causer(drone);
                    self.pending_damage.push_back((drone, event));
                }
            }
            TimerAction::RefreshPath(drone) => self.refresh_drone_path(drone),
        }
    }

    /// Arms drones touching a player. Runs on every participant so the
    /// warning plays everywhere; only the host starts the countdown.
    fn check_fuses(&mut self) {
        let now = self.world.time();
        self.sync_hit_zones();
        let mut armed = Vec::new();

        for (id, drone) in &mut self.drones {
            if drone.fuse() == crate::agent::Fuse::Armed || drone.is_exploded() {
                continue;
            }
            let Some(position) = self.world.get(*id).map(|e| e.position) else {
                continue;
            };
            let touching = ArenaSpace::new(&self.world, &self.physics)
                .overlap_sphere(position, drone.config().arm_radius)
                .iter()
                .any(|o| o.kind == EntityKind::Player);

            if touching && drone.arm(self.role, now, &mut self.timers, &mut self.cues) {
                armed.push(*id);
            }
        }

        for drone in armed {
            self.log_event(ArenaEvent::DroneArmed { drone });
        }
    }

    fn steer_drones(&mut self, dt: f32) {
        let mut ids: Vec<EntityId> = self.drones.keys().copied().collect();
        ids.sort();

        for id in ids {
            let Some(position) = self.entity_position(id) else {
                continue;
            };
            let Some(drone) = self.drones.get(&id) else {
                continue;
            };
            if drone.is_exploded() {
                continue;
            }
            if drone.needs_path(position) {
                self.refresh_drone_path(id);
            } else if let Some(impulse) = drone.steering(position, dt) {
                self.physics.add_impulse(id, impulse);
            }
        }
    }

    fn simulate_projectiles(&mut self, dt: f32) {
        for entity in self.world.entities_mut() {
            if entity.kind == EntityKind::Projectile {
                simulate_projectile(entity, dt);
            }
        }
    }

    fn expire_removals(&mut self) {
        for mut entity in self.world.expire_removals() {
            PhysicsSync::destroy_physics_body(&mut entity, &mut self.physics);
            self.forget_components(entity.id);
            self.log_event(ArenaEvent::EntityRemoved { entity: entity.id });
        }
    }

    /// Advances the simulation by `dt` seconds. Timers run in due order with
    /// the clock set to their exact due time, and every damage they queue
    /// is resolved before the next one runs.
    pub fn step(&mut self, dt: f32) {
        let end = self.world.time() + dt.max(0.0) as f64;

        if self.role.is_host() {
            for pending in self.requests.drain() {
                self.receive_request(pending.from, pending.request);
            }
        }

        while let Some((action, due)) = self.timers.pop_due(end) {
            self.world.set_time(due);
            self.run_timer(action);
            self.drain_damage();
        }
        self.world.set_time(end);

        if self.role.is_host() {
            self.steer_drones(dt);
            self.simulate_projectiles(dt);
        }
        self.check_fuses();
        self.drain_damage();

        if self.role.is_host() {
            self.physics.step(dt);
            PhysicsSync::sync_physics_to_world(&self.physics, &mut self.world);
        }

        self.expire_removals();
        self.world.advance_tick();
    }

    /// Collects every replicated value that changed since the last publish.
    pub fn publish(&mut self) -> ReplicationFrame {
        let mut frame = ReplicationFrame::new(self.world.tick(), self.world.time_ms());
        if !self.role.is_host() {
            return frame;
        }

        frame.entities = self.world.dirty_states();
        frame.entities.sort_by_key(|s| s.entity_id);

        for (id, sink) in &mut self.sinks {
            if let Some(health) = sink.take_dirty() {
                frame.push_field(FieldUpdate::new(id.0, FieldValue::Health(health)));
            }
        }
        for (id, control) in &mut self.weapons {
            if let Some((loaded, reserve)) = control.take_ammo_dirty() {
                if let Some(owner) = control.owner() {
                    let update = FieldUpdate::new(id.0, FieldValue::Ammo { loaded, reserve });
                    frame.push_owner_field(owner, update);
                }
            }
            if let Some(record) = control.take_hit_dirty() {
                frame.push_field(FieldUpdate::new(id.0, FieldValue::HitRecord(record)));
            }
        }
        for (id, barrel) in &mut self.barrels {
            if let Some(triggered) = barrel.take_triggered_dirty() {
                frame.push_field(FieldUpdate::new(id.0, FieldValue::Triggered(triggered)));
            }
        }
        for (id, drone) in &mut self.drones {
            if let Some(level) = drone.take_power_dirty() {
                frame.push_field(FieldUpdate::new(id.0, FieldValue::PowerLevel(level)));
            }
        }
        frame.fields.sort_by_key(|f| f.entity_id);

        frame.removed_entity_ids = self
            .world
            .clear_replication_state()
            .into_iter()
            .map(EntityId::id)
            .collect();
        frame
    }

    /// Full current state for a participant joining late. Past shots are
    /// not part of it; only shots fired after joining are replayed.
    pub fn baseline(&self, participant: ParticipantId) -> StateDiff {
        let mut diff = StateDiff::new(self.world.tick(), self.world.time_ms());
        diff.entities = self.world.full_states();
        diff.entities.sort_by_key(|s| s.entity_id);

        for (id, sink) in &self.sinks {
            diff.fields
                .push(FieldUpdate::new(id.0, FieldValue::Health(sink.current())));
        }
        for (id, control) in &self.weapons {
            if control.owner() == Some(participant) {
                let loadout = control.loadout();
                diff.fields.push(FieldUpdate::new(
                    id.0,
                    FieldValue::Ammo {
                        loaded: loadout.loaded(),
                        reserve: loadout.reserve(),
                    },
                ));
            }
        }
        for (id, barrel) in &self.barrels {
            if barrel.is_triggered() {
                diff.fields
                    .push(FieldUpdate::new(id.0, FieldValue::Triggered(true)));
            }
        }
        for (id, drone) in &self.drones {
            diff.fields.push(FieldUpdate::new(
                id.0,
                FieldValue::PowerLevel(drone.power_level()),
            ));
        }
        diff.fields.sort_by_key(|f| f.entity_id);
        diff
    }

    /// Mirrors a host diff: entity states first, then field changes through
    /// the same handlers the host runs, then removals.
    pub fn apply_diff(&mut self, diff: &StateDiff) -> Result<(), ArenaError> {
        if self.role.is_host() {
            return Err(ArenaError::NotObserver("applying state diffs"));
        }

        for state in &diff.entities {
            let id = EntityId(state.entity_id);
            match self.world.get_mut(id) {
                Some(entity) => entity.apply_network_state(state),
                None => {
                    self.world.insert(Entity::from_network_state(state));
                    self.attach_components(id);
                }
            }
        }

        for update in &diff.fields {
            self.apply_field(update);
        }

        for raw in &diff.removed_entity_ids {
            let id = EntityId(*raw);
            if let Some(mut entity) = self.world.despawn(id) {
                PhysicsSync::destroy_physics_body(&mut entity, &mut self.physics);
                self.forget_components(id);
            }
        }
        self.world.clear_replication_state();
        Ok(())
    }

    fn apply_field(&mut self, update: &FieldUpdate) {
        let id = EntityId(update.entity_id);
        let at = self.entity_position(id).unwrap_or_default();

        match update.value {
            FieldValue::Health(current) => {
                let Some(sink) = self.sinks.get_mut(&id) else {
                    log::debug!("health for unknown entity {}", id.0);
                    return;
                };
                if let Some(change) = sink.receive_replicated(current) {
                    let subscribers = sink.subscribers().to_vec();
                    self.dispatch_health_change(&change, &subscribers);
                }
            }
            FieldValue::Ammo { loaded, reserve } => {
                if let Some(control) = self.weapons.get_mut(&id) {
                    control.receive_ammo(loaded, reserve);
                }
            }
            FieldValue::HitRecord(state) => {
                let from = self.aim_of(id).map(|aim| aim.origin).unwrap_or(at);
                let Some(control) = self.weapons.get_mut(&id) else {
                    return;
                };
                if let Some(record) = control.receive_hit_record(&state) {
                    play_shot(
                        &mut self.cues,
                        id,
                        from,
                        record.endpoint(),
                        record.surface(),
                    );
                }
            }
            FieldValue::Triggered(triggered) => {
                if let Some(barrel) = self.barrels.get_mut(&id) {
                    if barrel.receive_triggered(triggered) {
                        barrel.on_rep_triggered(&mut self.cues, at);
                    }
                }
            }
            FieldValue::PowerLevel(level) => {
                if let Some(drone) = self.drones.get_mut(&id) {
                    if drone.receive_power_level(level) {
                        drone.on_rep_power_level(&mut self.cues);
                    }
                }
            }
        }
    }
}

fn simulate_projectile(entity: &mut Entity, dt: f32) {
    entity.velocity.y += PhysicsWorld::GRAVITY * dt;
    entity.position += entity.velocity * dt;

    if entity.position.y < 0.0 {
        entity.position.y = 0.0;
        entity.velocity = Vec3::ZERO;
    }

    entity.dirty = true;
}
