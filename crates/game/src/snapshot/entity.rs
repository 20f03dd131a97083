use bitflags::bitflags;
use glam::{Quat, Vec3};
use rapier3d::dynamics::RigidBodyHandle;
use serde::{Deserialize, Serialize};

use crate::authority::ParticipantId;
use crate::effects::SurfaceClass;
use crate::net::EntityState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn id(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum EntityKind {
    #[default]
    Player = 0,
    Weapon = 1,
    Projectile = 2,
    ExplosiveBarrel = 3,
    TrackerDrone = 4,
    Static = 5,
}

impl From<u8> for EntityKind {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Player,
            1 => Self::Weapon,
            2 => Self::Projectile,
            3 => Self::ExplosiveBarrel,
            4 => Self::TrackerDrone,
            _ => Self::Static,
        }
    }
}

impl EntityKind {
    pub fn is_damageable(self) -> bool {
        matches!(
            self,
            Self::Player | Self::ExplosiveBarrel | Self::TrackerDrone
        )
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EntityFlags: u16 {
        const COLLIDABLE = 1 << 0;
        const HIDDEN = 1 << 1;
        const PENDING_REMOVAL = 1 << 2;
    }
}

/// Sphere used by ray and overlap queries, relative to the entity origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitZone {
    pub offset: Vec3,
    pub radius: f32,
    pub surface: SurfaceClass,
}

const PLAYER_ZONES: [HitZone; 2] = [
    HitZone {
        offset: Vec3::new(0.0, 90.0, 0.0),
        radius: 40.0,
        surface: SurfaceClass::Flesh,
    },
    HitZone {
        offset: Vec3::new(0.0, 162.0, 0.0),
        radius: 16.0,
        surface: SurfaceClass::FleshVulnerable,
    },
];

const DRONE_ZONES: [HitZone; 1] = [HitZone {
    offset: Vec3::ZERO,
    radius: 25.0,
    surface: SurfaceClass::Default,
}];

const BARREL_ZONES: [HitZone; 1] = [HitZone {
    offset: Vec3::ZERO,
    radius: 45.0,
    surface: SurfaceClass::Default,
}];

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub variant: u8,
    pub owner: Option<ParticipantId>,
    pub attached_to: Option<EntityId>,
    pub position: Vec3,
    pub velocity: Vec3,
    pub orientation: Quat,
    pub physics_handle: Option<RigidBodyHandle>,
    pub flags: EntityFlags,
    pub dirty: bool,
}

impl Entity {
    pub const EYE_HEIGHT: f32 = 165.0;

    pub fn new(id: EntityId, kind: EntityKind) -> Self {
        let flags = if kind.is_damageable() {
            EntityFlags::COLLIDABLE
        } else {
            EntityFlags::empty()
        };

        Self {
            id,
            kind,
            variant: 0,
            owner: None,
            attached_to: None,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            physics_handle: None,
            flags,
            dirty: true,
        }
    }

    pub fn hit_zones(&self) -> &'static [HitZone] {
        match self.kind {
            EntityKind::Player => &PLAYER_ZONES,
            EntityKind::TrackerDrone => &DRONE_ZONES,
            EntityKind::ExplosiveBarrel => &BARREL_ZONES,
            EntityKind::Weapon | EntityKind::Projectile | EntityKind::Static => &[],
        }
    }

    pub fn is_collidable(&self) -> bool {
        self.flags.contains(EntityFlags::COLLIDABLE) && !self.flags.contains(EntityFlags::HIDDEN)
    }

    pub fn eye_position(&self) -> Vec3 {
        match self.kind {
            EntityKind::Player => self.position + Vec3::Y * Self::EYE_HEIGHT,
            _ => self.position,
        }
    }

    pub fn aim_direction(&self) -> Vec3 {
        (self.orientation * Vec3::NEG_Z).normalize_or_zero()
    }

    pub fn look_at(&mut self, target: Vec3) {
        let direction = (target - self.eye_position()).normalize_or_zero();
        if direction == Vec3::ZERO {
            return;
        }
        self.orientation = Quat::from_rotation_arc(Vec3::NEG_Z, direction);
        self.dirty = true;
    }

    pub fn hide(&mut self) {
        self.flags.insert(EntityFlags::HIDDEN);
        self.flags.remove(EntityFlags::COLLIDABLE);
        self.dirty = true;
    }

    pub fn to_network_state(&self) -> EntityState {
        let mut state = EntityState::new(self.id.0, self.kind as u8);
        state.variant = self.variant;
        state.owner_id = self.owner.map(|p| p.0);
        state.attached_to = self.attached_to.map(|e| e.0);
        state.position = self.position.into();
        state.encode_velocity(self.velocity.into());
        state.encode_orientation([
            self.orientation.x,
            self.orientation.y,
            self.orientation.z,
            self.orientation.w,
        ]);
        state.flags = self.flags.bits();
        state
    }

    pub fn from_network_state(state: &EntityState) -> Self {
        let mut entity = Self::new(EntityId(state.entity_id), EntityKind::from(state.entity_type));
        entity.variant = state.variant;
        entity.owner = state.owner_id.map(ParticipantId);
        entity.attached_to = state.attached_to.map(EntityId);
        entity.apply_network_state(state);
        entity.dirty = false;
        entity
    }

    pub fn apply_network_state(&mut self, state: &EntityState) {
        let vel = state.decode_velocity();
        let quat = state.decode_orientation();

        self.position = Vec3::from(state.position);
        self.velocity = Vec3::from(vel);
        self.orientation = Quat::from_xyzw(quat[0], quat[1], quat[2], quat[3]).normalize();
        self.flags = EntityFlags::from_bits_truncate(state.flags);
    }
}
