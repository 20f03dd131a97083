use glam::Vec3;

use crate::services::Presentation;
use crate::snapshot::EntityId;

use super::SurfaceClass;

/// One-shot presentation request. Playback itself happens outside the core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cue {
    MuzzleFlash { weapon: EntityId },
    Tracer { weapon: EntityId, from: Vec3, to: Vec3 },
    Impact { at: Vec3, surface: SurfaceClass },
    Explosion { entity: EntityId, at: Vec3 },
    ExplodedMaterial { entity: EntityId },
    HideMesh { entity: EntityId },
    DamagePulse { entity: EntityId, time: f64 },
    PowerLevel { entity: EntityId, alpha: f32 },
    SelfDestructWarning { entity: EntityId },
}

impl Cue {
    pub fn entity(&self) -> Option<EntityId> {
        match *self {
            Self::MuzzleFlash { weapon } | Self::Tracer { weapon, .. } => Some(weapon),
            Self::Explosion { entity, .. }
            | Self::ExplodedMaterial { entity }
            | Self::HideMesh { entity }
            | Self::DamagePulse { entity, .. }
            | Self::PowerLevel { entity, .. }
            | Self::SelfDestructWarning { entity } => Some(entity),
            Self::Impact { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct CueLog {
    cues: Vec<Cue>,
}

impl CueLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Cue> + '_ {
        self.cues.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cue> {
        self.cues.iter()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

impl Presentation for CueLog {
    fn play(&mut self, cue: Cue) {
        self.cues.push(cue);
    }
}

impl Presentation for Vec<Cue> {
    fn play(&mut self, cue: Cue) {
        self.push(cue);
    }
}
