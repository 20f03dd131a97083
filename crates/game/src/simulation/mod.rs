mod arena;
mod command;
mod config;
mod tick;
mod timer;

pub use arena::{Arena, ArenaError};
pub use command::{PendingRequest, RequestBuffer};
pub use config::ArenaConfig;
pub use tick::FixedTimestep;
pub use timer::{TimerAction, TimerHandle, TimerManager};
