mod entity;
mod world;

pub use entity::{Entity, EntityFlags, EntityId, EntityKind, HitZone};
pub use world::World;
