use glam::Vec3;

use crate::authority::{ActionRequest, ParticipantId};
use crate::damage::DamageKind;
use crate::effects::SurfaceClass;
use crate::snapshot::EntityId;

/// Notable things that happened in an arena step, kept for operators and tooling.
#[derive(Debug, Clone, PartialEq)]
pub enum ArenaEvent {
    ShotFired {
        weapon: EntityId,
        shooter: Option<ParticipantId>,
        endpoint: Vec3,
        surface: SurfaceClass,
        victim: Option<EntityId>,
    },
    ProjectileLaunched {
        weapon: EntityId,
        projectile: EntityId,
    },
    Reloaded {
        weapon: EntityId,
        moved: u16,
    },
    Damaged {
        entity: EntityId,
        amount: f32,
        remaining: f32,
        kind: DamageKind,
    },
    BarrelExploded {
        barrel: EntityId,
        bodies_pushed: usize,
    },
    DroneArmed {
        drone: EntityId,
    },
    DroneSelfDestructed {
        drone: EntityId,
        damage: f32,
        victims: usize,
    },
    PowerLevelChanged {
        drone: EntityId,
        level: f32,
    },
    RequestDropped {
        from: ParticipantId,
        request: ActionRequest,
    },
    EntityRemoved {
        entity: EntityId,
    },
}

impl ArenaEvent {
    pub fn is_explosion(&self) -> bool {
        matches!(
            self,
            Self::BarrelExploded { .. } | Self::DroneSelfDestructed { .. }
        )
    }
}
