mod queue;
mod types;

pub use queue::{EventLog, LoggedEvent};
pub use types::ArenaEvent;
