mod query;
mod sync;
mod world;

pub use query::ArenaSpace;
pub use sync::PhysicsSync;
pub use world::PhysicsWorld;
