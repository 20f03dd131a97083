//! Combat and replication core for a small networked arena shooter.
//!
//! One [`Arena`] runs per participant. The host owns every rule that touches
//! health, ammunition and hazards; observers mirror replicated fields and
//! replay their presentation.

pub mod agent;
pub mod authority;
pub mod damage;
pub mod effects;
pub mod event;
pub mod hazard;
pub mod map;
pub mod net;
pub mod physics;
pub mod services;
pub mod simulation;
pub mod snapshot;
pub mod weapon;

pub use agent::{DroneConfig, DronePhase, Fuse, TrackerDrone};
pub use authority::{ActionRequest, ParticipantId, RequestValidator, Role};
pub use damage::{DamageEvent, DamageKind, DamageSink, HealthChanged};
pub use effects::{Cue, CueLog, HitRecord, SurfaceClass};
pub use event::{ArenaEvent, EventLog, LoggedEvent};
pub use hazard::{BarrelConfig, ExplosiveBarrel, HazardPhase};
pub use map::TestingGround;
pub use net::{
    DEFAULT_TICK_RATE, FieldUpdate, FieldValue, LoopbackLink, Packet, PacketError,
    ReplicationFrame, StateDiff,
};
pub use physics::{ArenaSpace, PhysicsSync, PhysicsWorld};
pub use simulation::{Arena, ArenaConfig, ArenaError, FixedTimestep};
pub use snapshot::{Entity, EntityId, EntityKind, World};
pub use weapon::{FireControl, FireMode, WeaponConfig, WeaponLoadout};
