use super::WeaponConfig;

/// Ammunition counters of one weapon.
///
/// `loaded + reserve` never grows: firing spends from `loaded`, reloading
/// only moves rounds from `reserve` into `loaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaponLoadout {
    loaded: u16,
    reserve: u16,
    max_loaded: u16,
    max_reserve: u16,
}

impl WeaponLoadout {
    pub fn new(max_loaded: u16, max_reserve: u16) -> Self {
        Self {
            loaded: max_loaded,
            reserve: max_reserve,
            max_loaded,
            max_reserve,
        }
    }

    pub fn from_config(config: &WeaponConfig) -> Self {
        Self::new(config.max_loaded, config.max_reserve)
    }

    pub fn with_rounds(mut self, loaded: u16, reserve: u16) -> Self {
        self.set_rounds(loaded, reserve);
        self
    }

    pub fn loaded(&self) -> u16 {
        self.loaded
    }

    pub fn reserve(&self) -> u16 {
        self.reserve
    }

    pub fn max_loaded(&self) -> u16 {
        self.max_loaded
    }

    pub fn max_reserve(&self) -> u16 {
        self.max_reserve
    }

    pub fn total(&self) -> u32 {
        self.loaded as u32 + self.reserve as u32
    }

    pub fn is_empty(&self) -> bool {
        self.loaded == 0
    }

    pub fn consume_round(&mut self) -> bool {
        if self.loaded == 0 {
            return false;
        }
        self.loaded -= 1;
        true
    }

    /// Returns the number of rounds moved; zero means nothing changed.
    pub fn reload(&mut self) -> u16 {
        if self.reserve == 0 || self.loaded >= self.max_loaded {
            return 0;
        }
        let moved = self.reserve.min(self.max_loaded - self.loaded);
        self.reserve -= moved;
        self.loaded += moved;
        moved
    }

    pub fn set_rounds(&mut self, loaded: u16, reserve: u16) {
        self.loaded = loaded.min(self.max_loaded);
        self.reserve = reserve.min(self.max_reserve);
    }
}
