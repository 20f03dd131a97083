mod loopback;
mod protocol;
mod replication;
mod stats;

pub use loopback::LoopbackLink;
pub use protocol::{sequence_greater_than, ArchivedPacket};
pub use protocol::{
    EntityState, FieldUpdate, FieldValue, Packet, PacketError, PacketHeader, PacketType,
    StateDiff, DEFAULT_TICK_RATE, PROTOCOL_MAGIC, PROTOCOL_VERSION,
};
pub use replication::ReplicationFrame;
pub use stats::LinkStats;
