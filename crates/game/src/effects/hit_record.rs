use glam::{IVec3, Vec3};
use rkyv::{Archive, Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum SurfaceClass {
    #[default]
    Default = 0,
    Flesh = 1,
    FleshVulnerable = 2,
}

impl From<u8> for SurfaceClass {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Flesh,
            2 => Self::FleshVulnerable,
            _ => Self::Default,
        }
    }
}

/// Wire form of the latest shot of one weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct HitRecordState {
    pub endpoint: [i32; 3],
    pub surface: u8,
    pub sequence: u8,
}

/// Latest authoritative shot, overwritten in place on every publish.
///
/// `sequence` advances on each publish so two shots landing on the same
/// quantized point are still distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HitRecord {
    endpoint: IVec3,
    surface: SurfaceClass,
    sequence: u8,
}

impl HitRecord {
    pub fn publish(&mut self, endpoint: Vec3, surface: SurfaceClass) {
        self.endpoint = quantize(endpoint);
        self.surface = surface;
        self.sequence = self.sequence.wrapping_add(1);
    }

    pub fn endpoint(&self) -> Vec3 {
        self.endpoint.as_vec3()
    }

    pub fn surface(&self) -> SurfaceClass {
        self.surface
    }

    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    pub fn to_state(&self) -> HitRecordState {
        HitRecordState {
            endpoint: self.endpoint.to_array(),
            surface: self.surface as u8,
            sequence: self.sequence,
        }
    }

    pub fn from_state(state: &HitRecordState) -> Self {
        Self {
            endpoint: IVec3::from_array(state.endpoint),
            surface: SurfaceClass::from(state.surface),
            sequence: state.sequence,
        }
    }
}

pub fn quantize(point: Vec3) -> IVec3 {
    point.round().as_ivec3()
}

#[inline]
pub fn sequence_newer(s1: u8, s2: u8) -> bool {
    s1 != s2 && s1.wrapping_sub(s2) < 128
}

/// Observer-side filter deciding which received records still need a replay.
#[derive(Debug, Clone, Copy, Default)]
pub struct EffectReplay {
    last_applied: Option<u8>,
}

impl EffectReplay {
    pub fn accept(&mut self, record: &HitRecord) -> bool {
        let fresh = match self.last_applied {
            Some(last) => sequence_newer(record.sequence(), last),
            None => true,
        };
        if fresh {
            self.last_applied = Some(record.sequence());
        }
        fresh
    }

    pub fn last_applied(&self) -> Option<u8> {
        self.last_applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_quantizes_to_whole_units() {
        let mut record = HitRecord::default();
        record.publish(Vec3::new(10.4, -3.6, 7.5), SurfaceClass::Flesh);

        assert_eq!(record.endpoint(), Vec3::new(10.0, -4.0, 8.0));
        assert_eq!(record.sequence(), 1);
    }

    #[test]
    fn sequence_advances_for_identical_shots() {
        let mut record = HitRecord::default();
        record.publish(Vec3::new(1.0, 2.0, 3.0), SurfaceClass::Default);
        let first = record;
        record.publish(Vec3::new(1.0, 2.0, 3.0), SurfaceClass::Default);

        assert_eq!(first.endpoint(), record.endpoint());
        assert!(sequence_newer(record.sequence(), first.sequence()));
    }

    #[test]
    fn sequence_comparison_wraps() {
        assert!(sequence_newer(1, 0));
        assert!(!sequence_newer(0, 1));
        assert!(sequence_newer(0, 255));
        assert!(!sequence_newer(255, 0));
        assert!(!sequence_newer(7, 7));
    }

    #[test]
    fn replay_skips_stale_and_repeated_records() {
        let mut replay = EffectReplay::default();
        let mut record = HitRecord::default();

        record.publish(Vec3::ZERO, SurfaceClass::Default);
        let older = record;
        record.publish(Vec3::ZERO, SurfaceClass::Default);

        assert!(replay.accept(&record));
        assert!(!replay.accept(&record));
        assert!(!replay.accept(&older));

        record.publish(Vec3::ZERO, SurfaceClass::Default);
        assert!(replay.accept(&record));
    }

    #[test]
    fn replay_follows_wraparound() {
        let mut replay = EffectReplay::default();
        let mut record = HitRecord::default();
        for _ in 0..255 {
            record.publish(Vec3::ONE, SurfaceClass::Default);
        }
        assert_eq!(record.sequence(), 255);
        assert!(replay.accept(&record));

        record.publish(Vec3::ONE, SurfaceClass::Default);
        assert_eq!(record.sequence(), 0);
        assert!(replay.accept(&record));
    }
}
