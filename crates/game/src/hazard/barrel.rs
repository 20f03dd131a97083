use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::authority::Role;
use crate::damage::HealthChanged;
use crate::effects::Cue;
use crate::services::Presentation;
use crate::snapshot::EntityId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarrelConfig {
    pub max_health: f32,
    pub explosion_impulse: f32,
    pub force_radius: f32,
    pub force_strength: f32,
}

impl Default for BarrelConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            explosion_impulse: 400.0,
            force_radius: 250.0,
            force_strength: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HazardPhase {
    #[default]
    Intact,
    Exploded,
}

/// Physical reaction the host owes the world after a barrel goes off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detonation {
    pub barrel: EntityId,
    pub impulse: Vec3,
    pub force_radius: f32,
    pub force_strength: f32,
}

#[derive(Debug, Clone)]
pub struct ExplosiveBarrel {
    entity: EntityId,
    config: BarrelConfig,
    phase: HazardPhase,
    triggered_dirty: bool,
}

impl ExplosiveBarrel {
    pub fn new(entity: EntityId, config: BarrelConfig) -> Self {
        Self {
            entity,
            config,
            phase: HazardPhase::Intact,
            triggered_dirty: false,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn config(&self) -> &BarrelConfig {
        &self.config
    }

    pub fn phase(&self) -> HazardPhase {
        self.phase
    }

    pub fn is_triggered(&self) -> bool {
        self.phase == HazardPhase::Exploded
    }

    /// Decides the explosion. Only the host decides, and only once.
    pub fn on_health_changed(&mut self, role: Role, change: &HealthChanged) -> Option<Detonation> {
        if !role.is_host() || !change.is_lethal() || self.phase == HazardPhase::Exploded {
            return None;
        }

        self.phase = HazardPhase::Exploded;
        self.triggered_dirty = true;
        log::info!("barrel {} exploded", self.entity.0);

        Some(Detonation {
            barrel: self.entity,
            impulse: Vec3::Y * self.config.explosion_impulse,
            force_radius: self.config.force_radius,
            force_strength: self.config.force_strength,
        })
    }

    /// Mirrors the replicated flag; true when this call performed the transition.
    pub fn receive_triggered(&mut self, triggered: bool) -> bool {
        if !triggered || self.phase == HazardPhase::Exploded {
            return false;
        }
        self.phase = HazardPhase::Exploded;
        true
    }

    /// Presents the explosion. Runs on every participant, the host included.
    pub fn on_rep_triggered(&self, fx: &mut impl Presentation, at: Vec3) {
        fx.play(Cue::Explosion {
            entity: self.entity,
            at,
        });
        fx.play(Cue::ExplodedMaterial {
            entity: self.entity,
        });
    }

    pub fn take_triggered_dirty(&mut self) -> Option<bool> {
        std::mem::take(&mut self.triggered_dirty).then_some(self.is_triggered())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::{DamageEvent, DamageKind, DamageSink};

    #[test]
    fn overlapping_lethal_hits_detonate_once() {
        let mut sink = DamageSink::new(EntityId(1), 100.0);
        let mut barrel = ExplosiveBarrel::new(EntityId(1), BarrelConfig::default());

        let mut detonations = 0;
        for _ in 0..2 {
            let event = DamageEvent::new(60.0, DamageKind::Bullet);
            if let Some(change) = sink.apply_damage(Role::Host, &event) {
                detonations += barrel.on_health_changed(Role::Host, &change).iter().count();
            }
        }

        assert_eq!(sink.current(), 0.0);
        assert_eq!(detonations, 1);
        assert!(barrel.is_triggered());
        assert_eq!(barrel.take_triggered_dirty(), Some(true));
        assert_eq!(barrel.take_triggered_dirty(), None);
    }

    #[test]
    fn observers_never_decide() {
        let mut barrel = ExplosiveBarrel::new(EntityId(1), BarrelConfig::default());
        let change = HealthChanged {
            entity: EntityId(1),
            current: 0.0,
            delta: 100.0,
            kind: DamageKind::Generic,
            instigator: None,
            causer: None,
        };

        assert!(barrel.on_health_changed(Role::Observer, &change).is_none());
        assert_eq!(barrel.phase(), HazardPhase::Intact);
    }

    #[test]
    fn replicated_flag_is_one_way() {
        let mut barrel = ExplosiveBarrel::new(EntityId(1), BarrelConfig::default());
        assert!(!barrel.receive_triggered(false));
        assert!(barrel.receive_triggered(true));
        assert!(!barrel.receive_triggered(true));
        assert!(!barrel.receive_triggered(false));
        assert!(barrel.is_triggered());
    }

    #[test]
    fn presentation_plays_explosion_and_material() {
        let barrel = ExplosiveBarrel::new(EntityId(4), BarrelConfig::default());
        let mut cues = Vec::new();
        barrel.on_rep_triggered(&mut cues, Vec3::ZERO);

        assert_eq!(cues.len(), 2);
        assert!(matches!(cues[1], Cue::ExplodedMaterial { entity } if entity == EntityId(4)));
    }
}
