use glam::Vec3;

use crate::authority::Role;
use crate::damage::HealthChanged;
use crate::effects::Cue;
use crate::services::{Pathfinding, Presentation};
use crate::simulation::{TimerAction, TimerHandle, TimerManager};
use crate::snapshot::EntityId;

use super::DroneConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DronePhase {
    #[default]
    Active,
    Exploded,
}

/// Self-destruct countdown. Arming happens at most once per drone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fuse {
    #[default]
    Idle,
    Armed,
}

/// Radial damage the host still has to deal after a self-destruct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blast {
    pub drone: EntityId,
    pub at: Vec3,
    pub damage: f32,
    pub radius: f32,
    pub removal_grace: f64,
}

#[derive(Debug, Clone)]
pub struct TrackerDrone {
    entity: EntityId,
    config: DroneConfig,
    phase: DronePhase,
    fuse: Fuse,
    power_level: f32,
    power_dirty: bool,
    next_path_point: Option<Vec3>,
    aggregation_timer: Option<TimerHandle>,
    path_timer: Option<TimerHandle>,
    self_damage_timer: Option<TimerHandle>,
}

impl TrackerDrone {
    pub fn new(entity: EntityId, config: DroneConfig) -> Self {
        Self {
            entity,
            config,
            phase: DronePhase::Active,
            fuse: Fuse::Idle,
            power_level: 0.0,
            power_dirty: false,
            next_path_point: None,
            aggregation_timer: None,
            path_timer: None,
            self_damage_timer: None,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn config(&self) -> &DroneConfig {
        &self.config
    }

    pub fn phase(&self) -> DronePhase {
        self.phase
    }

    pub fn is_exploded(&self) -> bool {
        self.phase == DronePhase::Exploded
    }

    pub fn fuse(&self) -> Fuse {
        self.fuse
    }

    pub fn power_level(&self) -> f32 {
        self.power_level
    }

    pub fn next_path_point(&self) -> Option<Vec3> {
        self.next_path_point
    }

    pub fn actual_damage(&self) -> f32 {
        self.config.base_explosion_damage * (1.0 + self.power_level)
    }

    /// Starts the host-side aggregation loop. The first count happens one
    /// period after spawn.
    pub fn start(&mut self, timers: &mut TimerManager, now: f64) {
        let period = self.config.aggregation_period;
        self.aggregation_timer = Some(timers.set(
            TimerAction::AggregatePower(self.entity),
            now,
            period,
            Some(period),
        ));
    }

    pub fn on_health_changed(
        &mut self,
        role: Role,
        change: &HealthChanged,
        at: Vec3,
        now: f64,
        timers: &mut TimerManager,
        fx: &mut impl Presentation,
    ) -> Option<Blast> {
        fx.play(Cue::DamagePulse {
            entity: self.entity,
            time: now,
        });
        log::debug!("drone {} health {}", self.entity.0, change.current);

        if change.is_lethal() {
            self.self_destruct(role, at, timers, fx)
        } else {
            None
        }
    }

    /// Plays the explosion wherever it runs; only the host gets a [`Blast`].
    pub fn self_destruct(
        &mut self,
        role: Role,
        at: Vec3,
        timers: &mut TimerManager,
        fx: &mut impl Presentation,
    ) -> Option<Blast> {
        if self.phase == DronePhase::Exploded {
            return None;
        }
        self.phase = DronePhase::Exploded;
        self.stop_timers(timers);

        fx.play(Cue::Explosion {
            entity: self.entity,
            at,
        });
        fx.play(Cue::HideMesh {
            entity: self.entity,
        });

        if !role.is_host() {
            return None;
        }

        let damage = self.actual_damage();
        log::info!(
            "drone {} self-destructed for {} damage (power {})",
            self.entity.0,
            damage,
            self.power_level
        );

        Some(Blast {
            drone: self.entity,
            at,
            damage,
            radius: self.config.explosion_radius,
            removal_grace: self.config.removal_grace,
        })
    }

    /// Stores the clamped count of nearby drones. Returns true on change.
    pub fn aggregate(&mut self, role: Role, nearby: usize) -> bool {
        if !role.is_host() || self.is_exploded() {
            return false;
        }

        let level = (nearby as f32).clamp(0.0, self.config.max_power_level);
        if level == self.power_level {
            return false;
        }
        self.power_level = level;
        self.power_dirty = true;
        true
    }

    pub fn receive_power_level(&mut self, level: f32) -> bool {
        let level = level.clamp(0.0, self.config.max_power_level);
        if level == self.power_level {
            return false;
        }
        self.power_level = level;
        true
    }

    pub fn on_rep_power_level(&self, fx: &mut impl Presentation) {
        let alpha = if self.config.max_power_level > 0.0 {
            self.power_level / self.config.max_power_level
        } else {
            0.0
        };
        fx.play(Cue::PowerLevel {
            entity: self.entity,
            alpha,
        });
    }

    pub fn take_power_dirty(&mut self) -> Option<f32> {
        std::mem::take(&mut self.power_dirty).then_some(self.power_level)
    }

    /// First player overlap. Only the host schedules the self-damage ticks,
    /// starting immediately.
    pub fn arm(
        &mut self,
        role: Role,
        now: f64,
        timers: &mut TimerManager,
        fx: &mut impl Presentation,
    ) -> bool {
        if self.fuse == Fuse::Armed || self.is_exploded() {
            return false;
        }
        self.fuse = Fuse::Armed;

        if role.is_host() {
            let period = self.config.self_damage_period;
            self.self_damage_timer = Some(timers.set(
                TimerAction::SelfDamage(self.entity),
                now,
                0.0,
                Some(period),
            ));
        }

        fx.play(Cue::SelfDestructWarning {
            entity: self.entity,
        });
        log::debug!("drone {} armed", self.entity.0);
        true
    }

    /// Picks the next waypoint towards `goal` and re-arms the one-shot
    /// refresh timer. Without a goal the drone holds its position.
    pub fn refresh_path(
        &mut self,
        pathfinding: &dyn Pathfinding,
        position: Vec3,
        goal: Option<Vec3>,
        timers: &mut TimerManager,
        now: f64,
    ) {
        if let Some(handle) = self.path_timer.take() {
            timers.clear(handle);
        }
        if self.is_exploded() {
            return;
        }

        self.next_path_point = Some(match goal {
            Some(goal) => {
                let path = pathfinding.find_path(position, goal);
                path.get(1).copied().unwrap_or(position)
            }
            None => position,
        });

        self.path_timer = Some(timers.set(
            TimerAction::RefreshPath(self.entity),
            now,
            self.config.path_refresh_period,
            None,
        ));
    }

    pub fn needs_path(&self, position: Vec3) -> bool {
        match self.next_path_point {
            Some(point) => point.distance(position) <= self.config.required_distance,
            None => true,
        }
    }

    /// Velocity change to apply this step towards the current waypoint.
    pub fn steering(&self, position: Vec3, dt: f32) -> Option<Vec3> {
        if self.is_exploded() || self.needs_path(position) {
            return None;
        }
        let point = self.next_path_point?;
        let direction = (point - position).normalize_or_zero();
        (direction != Vec3::ZERO).then(|| direction * self.config.movement_force * dt)
    }

    pub fn stop_timers(&mut self, timers: &mut TimerManager) {
        for handle in [
            self.aggregation_timer.take(),
            self.path_timer.take(),
            self.self_damage_timer.take(),
        ]
        .into_iter()
        .flatten()
        {
            timers.clear(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::DamageKind;
    use crate::services::StraightLinePath;

    fn drone() -> TrackerDrone {
        TrackerDrone::new(EntityId(7), DroneConfig::default())
    }

    fn lethal() -> HealthChanged {
        HealthChanged {
            entity: EntityId(7),
            current: 0.0,
            delta: 20.0,
            kind: DamageKind::SelfDestruct,
            instigator: None,
            causer: Some(EntityId(7)),
        }
    }

    #[test]
    fn power_level_is_clamped() {
        let mut drone = drone();
        assert!(drone.aggregate(Role::Host, 7));
        assert_eq!(drone.power_level(), 4.0);
        assert!(!drone.aggregate(Role::Host, 9));
        assert_eq!(drone.take_power_dirty(), Some(4.0));

        assert!(drone.aggregate(Role::Host, 0));
        assert_eq!(drone.power_level(), 0.0);
    }

    #[test]
    fn observers_do_not_aggregate() {
        let mut drone = drone();
        assert!(!drone.aggregate(Role::Observer, 2));
        assert_eq!(drone.power_level(), 0.0);
        assert!(drone.receive_power_level(2.0));
        assert_eq!(drone.power_level(), 2.0);
    }

    #[test]
    fn blast_scales_with_power() {
        let mut drone = drone();
        drone.aggregate(Role::Host, 2);
        let mut timers = TimerManager::new();
        let mut cues = Vec::new();

        let blast = drone
            .self_destruct(Role::Host, Vec3::ZERO, &mut timers, &mut cues)
            .unwrap();
        assert_eq!(blast.damage, 120.0);
        assert_eq!(blast.radius, 200.0);
    }

    #[test]
    fn self_destruct_happens_once() {
        let mut drone = drone();
        let mut timers = TimerManager::new();
        let mut cues = Vec::new();

        let first =
            drone.on_health_changed(Role::Host, &lethal(), Vec3::ZERO, 1.0, &mut timers, &mut cues);
        let second =
            drone.on_health_changed(Role::Host, &lethal(), Vec3::ZERO, 1.0, &mut timers, &mut cues);

        assert!(first.is_some());
        assert!(second.is_none());
        let explosions = cues
            .iter()
            .filter(|cue| matches!(cue, Cue::Explosion { .. }))
            .count();
        assert_eq!(explosions, 1);
    }

    #[test]
    fn observer_self_destruct_presents_without_blast() {
        let mut drone = drone();
        let mut timers = TimerManager::new();
        let mut cues = Vec::new();

        assert!(drone
            .self_destruct(Role::Observer, Vec3::ZERO, &mut timers, &mut cues)
            .is_none());
        assert!(drone.is_exploded());
        assert!(cues.contains(&Cue::HideMesh {
            entity: EntityId(7)
        }));
    }

    #[test]
    fn arming_schedules_immediate_self_damage_on_host() {
        let mut drone = drone();
        let mut timers = TimerManager::new();
        let mut cues = Vec::new();

        assert!(drone.arm(Role::Host, 3.0, &mut timers, &mut cues));
        assert!(!drone.arm(Role::Host, 3.2, &mut timers, &mut cues));
        assert_eq!(
            timers.pop_due(3.0),
            Some((TimerAction::SelfDamage(EntityId(7)), 3.0))
        );
        assert_eq!(timers.pop_due(3.4), None);
        assert!(timers.pop_due(3.5).is_some());
    }

    #[test]
    fn exploding_clears_timers() {
        let mut drone = drone();
        let mut timers = TimerManager::new();
        let mut cues = Vec::new();

        drone.start(&mut timers, 0.0);
        drone.arm(Role::Host, 0.0, &mut timers, &mut cues);
        drone.refresh_path(&StraightLinePath, Vec3::ZERO, Some(Vec3::X), &mut timers, 0.0);
        assert_eq!(timers.len(), 3);

        drone.self_destruct(Role::Host, Vec3::ZERO, &mut timers, &mut cues);
        assert!(timers.is_empty());
    }

    #[test]
    fn steering_heads_for_waypoint() {
        let mut drone = drone();
        let mut timers = TimerManager::new();
        let goal = Vec3::new(1_000.0, 0.0, 0.0);

        assert!(drone.needs_path(Vec3::ZERO));
        drone.refresh_path(&StraightLinePath, Vec3::ZERO, Some(goal), &mut timers, 0.0);
        assert_eq!(drone.next_path_point(), Some(goal));

        let impulse = drone.steering(Vec3::ZERO, 0.5).unwrap();
        assert!((impulse - Vec3::new(500.0, 0.0, 0.0)).length() < 1e-3);

        let close = Vec3::new(950.0, 0.0, 0.0);
        assert!(drone.needs_path(close));
        assert!(drone.steering(close, 0.5).is_none());
    }
}
