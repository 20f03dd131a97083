use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub u32);

impl ParticipantId {
    pub const HOST: Self = Self(0);
}

/// Which side of the replication boundary a simulation runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Host,
    Observer,
}

impl Role {
    #[inline]
    pub fn is_host(self) -> bool {
        matches!(self, Self::Host)
    }

    #[inline]
    pub fn is_observer(self) -> bool {
        matches!(self, Self::Observer)
    }
}
