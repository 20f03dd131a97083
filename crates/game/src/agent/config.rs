use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneConfig {
    pub max_health: f32,

    pub base_explosion_damage: f32,
    pub explosion_radius: f32,
    pub removal_grace: f64,

    pub max_power_level: f32,
    pub aggregation_radius: f32,
    pub aggregation_period: f64,

    pub arm_radius: f32,
    pub self_damage: f32,
    pub self_damage_period: f64,

    pub movement_force: f32,
    pub required_distance: f32,
    pub path_refresh_period: f64,
}

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,

            base_explosion_damage: 40.0,
            explosion_radius: 200.0,
            removal_grace: 2.0,

            max_power_level: 4.0,
            aggregation_radius: 600.0,
            aggregation_period: 1.0,

            arm_radius: 200.0,
            self_damage: 20.0,
            self_damage_period: 0.5,

            movement_force: 1000.0,
            required_distance: 100.0,
            path_refresh_period: 5.0,
        }
    }
}
