use serde::{Deserialize, Serialize};

use crate::agent::DroneConfig;
use crate::hazard::BarrelConfig;
use crate::net::DEFAULT_TICK_RATE;
use crate::weapon::{FireMode, WeaponConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfig {
    pub tick_rate: u32,
    pub player_health: f32,
    pub rifle: WeaponConfig,
    pub launcher: WeaponConfig,
    pub barrel: BarrelConfig,
    pub drone: DroneConfig,
    pub event_capacity: usize,
    pub request_capacity: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            player_health: 100.0,
            rifle: WeaponConfig::default(),
            launcher: WeaponConfig::grenade_launcher(),
            barrel: BarrelConfig::default(),
            drone: DroneConfig::default(),
            event_capacity: 1024,
            request_capacity: 256,
        }
    }
}

impl ArenaConfig {
    pub fn weapon(&self, mode: FireMode) -> &WeaponConfig {
        match mode {
            FireMode::HitScan => &self.rifle,
            FireMode::Launcher => &self.launcher,
        }
    }

    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}
