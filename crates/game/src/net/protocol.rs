use rkyv::{rancor, Archive, Deserialize, Serialize};

use crate::authority::ActionRequest;
use crate::effects::HitRecordState;

pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_MAGIC: u32 = 0x41534846;
pub const DEFAULT_TICK_RATE: u32 = 60;

const SEQUENCE_WRAP_THRESHOLD: u32 = u32::MAX / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct PacketHeader {
    pub magic: u32,
    pub version: u32,
    pub sequence: u32,
}

impl PacketHeader {
    pub fn new(sequence: u32) -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
            sequence,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == PROTOCOL_MAGIC && self.version == PROTOCOL_VERSION
    }
}

#[inline]
pub fn sequence_greater_than(s1: u32, s2: u32) -> bool {
    ((s1 > s2) && (s1 - s2 <= SEQUENCE_WRAP_THRESHOLD))
        || ((s1 < s2) && (s2 - s1 > SEQUENCE_WRAP_THRESHOLD))
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum PacketType {
    StateDiff(StateDiff),
    ActionRequest {
        participant: u32,
        request: ActionRequest,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct EntityState {
    pub entity_id: u32,
    pub entity_type: u8,
    pub variant: u8,
    pub owner_id: Option<u32>,
    pub attached_to: Option<u32>,
    pub position: [f32; 3],
    pub velocity: [i16; 3],
    pub orientation: [i16; 4],
    pub flags: u16,
}

impl EntityState {
    pub const MAX_VELOCITY: f32 = 3276.7;

    pub fn new(entity_id: u32, entity_type: u8) -> Self {
        Self {
            entity_id,
            entity_type,
            variant: 0,
            owner_id: None,
            attached_to: None,
            position: [0.0; 3],
            velocity: [0; 3],
            orientation: [0, 0, 0, 32767],
            flags: 0,
        }
    }

    pub fn encode_velocity(&mut self, vel: [f32; 3]) {
        self.velocity = [
            (vel[0].clamp(-Self::MAX_VELOCITY, Self::MAX_VELOCITY) * 10.0) as i16,
            (vel[1].clamp(-Self::MAX_VELOCITY, Self::MAX_VELOCITY) * 10.0) as i16,
            (vel[2].clamp(-Self::MAX_VELOCITY, Self::MAX_VELOCITY) * 10.0) as i16,
        ];
    }

    pub fn decode_velocity(&self) -> [f32; 3] {
        [
            self.velocity[0] as f32 / 10.0,
            self.velocity[1] as f32 / 10.0,
            self.velocity[2] as f32 / 10.0,
        ]
    }

    pub fn encode_orientation(&mut self, quat: [f32; 4]) {
        self.orientation = [
            (quat[0].clamp(-1.0, 1.0) * 32767.0) as i16,
            (quat[1].clamp(-1.0, 1.0) * 32767.0) as i16,
            (quat[2].clamp(-1.0, 1.0) * 32767.0) as i16,
            (quat[3].clamp(-1.0, 1.0) * 32767.0) as i16,
        ];
    }

    pub fn decode_orientation(&self) -> [f32; 4] {
        [
            self.orientation[0] as f32 / 32767.0,
            self.orientation[1] as f32 / 32767.0,
            self.orientation[2] as f32 / 32767.0,
            self.orientation[3] as f32 / 32767.0,
        ]
    }
}

/// New value of one replicated component field.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum FieldValue {
    Health(f32),
    /// Only ever sent to the weapon's owner.
    Ammo { loaded: u16, reserve: u16 },
    HitRecord(HitRecordState),
    Triggered(bool),
    PowerLevel(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct FieldUpdate {
    pub entity_id: u32,
    pub value: FieldValue,
}

impl FieldUpdate {
    pub fn new(entity_id: u32, value: FieldValue) -> Self {
        Self { entity_id, value }
    }
}

#[derive(Debug, Clone, Default, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct StateDiff {
    pub tick: u32,
    pub server_time_ms: u64,
    pub entities: Vec<EntityState>,
    pub fields: Vec<FieldUpdate>,
    pub removed_entity_ids: Vec<u32>,
}

impl StateDiff {
    pub fn new(tick: u32, server_time_ms: u64) -> Self {
        Self {
            tick,
            server_time_ms,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.fields.is_empty() && self.removed_entity_ids.is_empty()
    }
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: PacketType,
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
    #[error("bad header (magic {magic:#x}, version {version})")]
    InvalidHeader { magic: u32, version: u32 },
}

impl Packet {
    pub fn new(header: PacketHeader, payload: PacketType) -> Self {
        Self { header, payload }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, PacketError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(PacketError::Serialize)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, PacketError> {
        let packet =
            rkyv::from_bytes::<Self, rancor::Error>(data).map_err(PacketError::Deserialize)?;
        if !packet.header.is_valid() {
            return Err(PacketError::InvalidHeader {
                magic: packet.header.magic,
                version: packet.header.version,
            });
        }
        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_comparison() {
        assert!(sequence_greater_than(2, 1));
        assert!(!sequence_greater_than(1, 2));
        assert!(sequence_greater_than(0, u32::MAX));
        assert!(!sequence_greater_than(u32::MAX, 0));
    }

    #[test]
    fn test_entity_state_encoding() {
        let mut state = EntityState::new(1, 0);
        state.position = [100.5, 50.25, -30.0];
        state.encode_velocity([1050.5, -5.25, 0.0]);
        state.encode_orientation([0.0, 0.0, 0.0, 1.0]);

        let vel = state.decode_velocity();
        assert!((vel[0] - 1050.5).abs() < 0.1);
        assert!((vel[1] - -5.25).abs() < 0.1);

        let quat = state.decode_orientation();
        assert!((quat[3] - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_state_diff_packet() {
        let mut diff = StateDiff::new(12, 200);
        diff.entities.push(EntityState::new(3, 4));
        diff.fields.push(FieldUpdate::new(3, FieldValue::PowerLevel(2.0)));
        diff.fields.push(FieldUpdate::new(
            5,
            FieldValue::HitRecord(HitRecordState {
                endpoint: [10, -4, 8],
                surface: 2,
                sequence: 255,
            }),
        ));
        diff.removed_entity_ids.push(9);

        let packet = Packet::new(PacketHeader::new(1), PacketType::StateDiff(diff));
        let bytes = packet.serialize().unwrap();
        let decoded = Packet::deserialize(&bytes).unwrap();

        let PacketType::StateDiff(decoded) = decoded.payload else {
            panic!("expected a state diff");
        };
        assert_eq!(decoded.tick, 12);
        assert_eq!(decoded.entities[0].entity_type, 4);
        assert_eq!(decoded.fields[0].value, FieldValue::PowerLevel(2.0));
        assert!(matches!(
            decoded.fields[1].value,
            FieldValue::HitRecord(HitRecordState { sequence: 255, .. })
        ));
        assert_eq!(decoded.removed_entity_ids, vec![9]);
    }

    #[test]
    fn test_action_request_packet() {
        let payload = PacketType::ActionRequest {
            participant: 2,
            request: ActionRequest::BeginReload { weapon_id: 7 },
        };
        let bytes = Packet::new(PacketHeader::new(4), payload)
            .serialize()
            .unwrap();

        match Packet::deserialize(&bytes).unwrap().payload {
            PacketType::ActionRequest {
                participant,
                request,
            } => {
                assert_eq!(participant, 2);
                assert_eq!(request, ActionRequest::BeginReload { weapon_id: 7 });
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_foreign_header_rejected() {
        let mut header = PacketHeader::new(1);
        header.magic = 0xDEADBEEF;
        let bytes = Packet::new(header, PacketType::StateDiff(StateDiff::new(1, 0)))
            .serialize()
            .unwrap();
        assert!(matches!(
            Packet::deserialize(&bytes),
            Err(PacketError::InvalidHeader { .. })
        ));
    }
}
