use glam::Vec3;

use crate::authority::ParticipantId;
use crate::effects::{Cue, EffectReplay, HitRecord, HitRecordState, SurfaceClass};
use crate::services::Presentation;
use crate::simulation::{TimerAction, TimerHandle, TimerManager};
use crate::snapshot::EntityId;

use super::{WeaponConfig, WeaponLoadout};

/// Reloading is an instant counter transfer, so it has no state of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FireState {
    #[default]
    Idle,
    Firing(TimerHandle),
}

/// Rate limiting, ammunition and the latest published shot of one weapon.
#[derive(Debug, Clone)]
pub struct FireControl {
    weapon: EntityId,
    holder: Option<EntityId>,
    owner: Option<ParticipantId>,
    config: WeaponConfig,
    loadout: WeaponLoadout,
    state: FireState,
    last_fire: Option<f64>,
    hit_record: HitRecord,
    replay: EffectReplay,
    ammo_dirty: bool,
    hit_dirty: bool,
}

impl FireControl {
    pub fn new(weapon: EntityId, config: WeaponConfig) -> Self {
        let loadout = WeaponLoadout::from_config(&config);
        Self {
            weapon,
            holder: None,
            owner: None,
            config,
            loadout,
            state: FireState::Idle,
            last_fire: None,
            hit_record: HitRecord::default(),
            replay: EffectReplay::default(),
            ammo_dirty: false,
            hit_dirty: false,
        }
    }

    pub fn held_by(mut self, holder: EntityId, owner: Option<ParticipantId>) -> Self {
        self.holder = Some(holder);
        self.owner = owner;
        self
    }

    pub fn weapon(&self) -> EntityId {
        self.weapon
    }

    pub fn holder(&self) -> Option<EntityId> {
        self.holder
    }

    pub fn owner(&self) -> Option<ParticipantId> {
        self.owner
    }

    pub fn config(&self) -> &WeaponConfig {
        &self.config
    }

    pub fn loadout(&self) -> &WeaponLoadout {
        &self.loadout
    }

    pub fn state(&self) -> FireState {
        self.state
    }

    pub fn is_firing(&self) -> bool {
        matches!(self.state, FireState::Firing(_))
    }

    pub fn last_fire(&self) -> Option<f64> {
        self.last_fire
    }

    pub fn hit_record(&self) -> &HitRecord {
        &self.hit_record
    }

    /// Delay before the next pull may happen without breaking the cadence.
    pub fn first_shot_delay(&self, now: f64) -> f64 {
        match self.last_fire {
            Some(last) => (last + self.config.min_interval() - now).max(0.0),
            None => 0.0,
        }
    }

    /// Re-arms the repeating trigger; pressing again while firing restarts
    /// the timer from the cadence-respecting delay.
    pub fn begin_fire(&mut self, timers: &mut TimerManager, now: f64) {
        if let FireState::Firing(handle) = self.state {
            timers.clear(handle);
        }

        let delay = self.first_shot_delay(now);
        let handle = timers.set(
            TimerAction::PullTrigger(self.weapon),
            now,
            delay,
            Some(self.config.min_interval()),
        );
        self.state = FireState::Firing(handle);
    }

    pub fn end_fire(&mut self, timers: &mut TimerManager) -> bool {
        match std::mem::take(&mut self.state) {
            FireState::Firing(handle) => {
                timers.clear(handle);
                true
            }
            FireState::Idle => false,
        }
    }

    /// Spends one round. An empty magazine absorbs the pull silently.
    pub fn try_consume(&mut self, now: f64) -> bool {
        if !self.loadout.consume_round() {
            return false;
        }
        self.last_fire = Some(now);
        self.ammo_dirty = true;
        true
    }

    pub fn reload(&mut self) -> u16 {
        let moved = self.loadout.reload();
        if moved > 0 {
            self.ammo_dirty = true;
            log::debug!(
                "weapon {} reloaded {} rounds ({}/{})",
                self.weapon.0,
                moved,
                self.loadout.loaded(),
                self.loadout.reserve()
            );
        }
        moved
    }

    pub fn damage_for(&self, surface: SurfaceClass) -> f32 {
        match surface {
            SurfaceClass::FleshVulnerable => {
                self.config.base_damage * self.config.vulnerable_multiplier
            }
            SurfaceClass::Default | SurfaceClass::Flesh => self.config.base_damage,
        }
    }

    pub fn record_hit(&mut self, endpoint: Vec3, surface: SurfaceClass) -> HitRecord {
        self.hit_record.publish(endpoint, surface);
        self.hit_dirty = true;
        self.hit_record
    }

    /// Stores a replicated record and returns it if it still needs replaying.
    pub fn receive_hit_record(&mut self, state: &HitRecordState) -> Option<HitRecord> {
        let record = HitRecord::from_state(state);
        self.hit_record = record;
        self.replay.accept(&record).then_some(record)
    }

    pub fn receive_ammo(&mut self, loaded: u16, reserve: u16) {
        self.loadout.set_rounds(loaded, reserve);
    }

    pub fn take_ammo_dirty(&mut self) -> Option<(u16, u16)> {
        std::mem::take(&mut self.ammo_dirty)
            .then(|| (self.loadout.loaded(), self.loadout.reserve()))
    }

    pub fn take_hit_dirty(&mut self) -> Option<HitRecordState> {
        std::mem::take(&mut self.hit_dirty).then(|| self.hit_record.to_state())
    }
}

pub fn play_shot(
    fx: &mut impl Presentation,
    weapon: EntityId,
    from: Vec3,
    endpoint: Vec3,
    surface: SurfaceClass,
) {
    fx.play(Cue::MuzzleFlash { weapon });
    fx.play(Cue::Tracer {
        weapon,
        from,
        to: endpoint,
    });
    fx.play(Cue::Impact {
        at: endpoint,
        surface,
    });
}
