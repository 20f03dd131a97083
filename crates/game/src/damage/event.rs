use crate::authority::ParticipantId;
use crate::snapshot::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DamageKind {
    #[default]
    Generic,
    Bullet,
    Explosion,
    SelfDestruct,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub amount: f32,
    pub kind: DamageKind,
    pub instigator: Option<ParticipantId>,
    pub causer: Option<EntityId>,
}

impl DamageEvent {
    pub fn new(amount: f32, kind: DamageKind) -> Self {
        Self {
            amount,
            kind,
            instigator: None,
            causer: None,
        }
    }

    pub fn with_instigator(mut self, instigator: Option<ParticipantId>) -> Self {
        self.instigator = instigator;
        self
    }

    pub fn with_causer(mut self, causer: EntityId) -> Self {
        self.causer = Some(causer);
        self
    }
}

/// Notification fanned out after a sink's health changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthChanged {
    pub entity: EntityId,
    pub current: f32,
    pub delta: f32,
    pub kind: DamageKind,
    pub instigator: Option<ParticipantId>,
    pub causer: Option<EntityId>,
}

impl HealthChanged {
    pub fn is_lethal(&self) -> bool {
        self.current <= 0.0
    }
}
