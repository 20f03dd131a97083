use ashfall::ArenaConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tick_rate: u32,
    pub drones: usize,
    pub barrels: usize,
    pub observers: usize,
    pub latency_ms: u32,
    pub duration_secs: Option<f64>,
    pub validate_cadence: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            drones: 4,
            barrels: 6,
            observers: 2,
            latency_ms: 40,
            duration_secs: None,
            validate_cadence: false,
        }
    }
}

impl ServerConfig {
    pub fn arena(&self) -> ArenaConfig {
        ArenaConfig {
            tick_rate: self.tick_rate,
            ..ArenaConfig::default()
        }
    }

    pub fn latency(&self) -> f64 {
        self.latency_ms as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_checks_are_opt_in() {
        let config = ServerConfig::default();
        assert!(!config.validate_cadence);
        assert_eq!(config.arena().tick_rate, 60);
        assert!((config.latency() - 0.04).abs() < 1e-9);
    }
}
