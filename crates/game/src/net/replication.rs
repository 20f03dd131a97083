use crate::authority::ParticipantId;

use super::protocol::{EntityState, FieldUpdate, StateDiff};

/// Everything the host published in one step, before it is split per observer.
#[derive(Debug, Clone, Default)]
pub struct ReplicationFrame {
    pub tick: u32,
    pub server_time_ms: u64,
    pub entities: Vec<EntityState>,
    pub fields: Vec<FieldUpdate>,
    pub owner_fields: Vec<(ParticipantId, FieldUpdate)>,
    pub removed_entity_ids: Vec<u32>,
}

impl ReplicationFrame {
    pub fn new(tick: u32, server_time_ms: u64) -> Self {
        Self {
            tick,
            server_time_ms,
            ..Default::default()
        }
    }

    pub fn push_field(&mut self, update: FieldUpdate) {
        self.fields.push(update);
    }

    /// Queues a field that only the owning participant may see.
    pub fn push_owner_field(&mut self, owner: ParticipantId, update: FieldUpdate) {
        self.owner_fields.push((owner, update));
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
            && self.fields.is_empty()
            && self.owner_fields.is_empty()
            && self.removed_entity_ids.is_empty()
    }

    pub fn for_observer(&self, participant: ParticipantId) -> StateDiff {
        let mut diff = StateDiff::new(self.tick, self.server_time_ms);
        diff.entities = self.entities.clone();
        diff.fields = self.fields.clone();
        diff.fields.extend(
            self.owner_fields
                .iter()
                .filter(|(owner, _)| *owner == participant)
                .map(|(_, update)| *update),
        );
        diff.removed_entity_ids = self.removed_entity_ids.clone();
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::FieldValue;

    #[test]
    fn ammo_reaches_only_its_owner() {
        let mut frame = ReplicationFrame::new(1, 16);
        frame.push_field(FieldUpdate::new(4, FieldValue::Health(80.0)));
        frame.push_owner_field(
            ParticipantId(2),
            FieldUpdate::new(
                6,
                FieldValue::Ammo {
                    loaded: 29,
                    reserve: 90,
                },
            ),
        );

        let owner = frame.for_observer(ParticipantId(2));
        let other = frame.for_observer(ParticipantId(3));

        assert_eq!(owner.fields.len(), 2);
        assert_eq!(other.fields.len(), 1);
        assert!(other
            .fields
            .iter()
            .all(|f| !matches!(f.value, FieldValue::Ammo { .. })));
    }
}
