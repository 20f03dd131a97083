mod cue;
mod hit_record;

pub use cue::{Cue, CueLog};
pub use hit_record::{
    quantize, sequence_newer, ArchivedHitRecordState, EffectReplay, HitRecord, HitRecordState,
    SurfaceClass,
};
