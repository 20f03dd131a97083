use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum FireMode {
    #[default]
    HitScan = 0,
    Launcher = 1,
}

impl From<u8> for FireMode {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Launcher,
            _ => Self::HitScan,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponConfig {
    pub fire_mode: FireMode,

    pub base_damage: f32,
    pub vulnerable_multiplier: f32,
    pub rate_of_fire: f32,
    pub max_range: f32,

    pub max_loaded: u16,
    pub max_reserve: u16,

    pub projectile_speed: f32,
    pub projectile_lifetime: f64,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            fire_mode: FireMode::HitScan,

            base_damage: 20.0,
            vulnerable_multiplier: 4.0,
            rate_of_fire: 600.0,
            max_range: 10_000.0,

            max_loaded: 30,
            max_reserve: 90,

            projectile_speed: 2000.0,
            projectile_lifetime: 3.0,
        }
    }
}

impl WeaponConfig {
    pub fn grenade_launcher() -> Self {
        Self {
            fire_mode: FireMode::Launcher,
            base_damage: 0.0,
            rate_of_fire: 60.0,
            max_loaded: 4,
            max_reserve: 12,
            ..Self::default()
        }
    }

    /// Seconds between two trigger pulls.
    pub fn min_interval(&self) -> f64 {
        60.0 / self.rate_of_fire.max(f32::EPSILON) as f64
    }
}
