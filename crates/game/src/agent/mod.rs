mod config;
mod drone;

pub use config::DroneConfig;
pub use drone::{Blast, DronePhase, Fuse, TrackerDrone};
