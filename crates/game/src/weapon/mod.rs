mod config;
mod fire_control;
pub mod hitscan;
mod loadout;

pub use config::{FireMode, WeaponConfig};
pub use fire_control::{play_shot, FireControl, FireState};
pub use hitscan::Shot;
pub use loadout::WeaponLoadout;
