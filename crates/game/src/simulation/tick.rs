/// Turns wall-clock deltas into whole simulation steps.
pub struct FixedTimestep {
    tick_rate: u32,
    dt: f64,
    accumulator: f64,
    max_steps: u32,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            tick_rate,
            dt: 1.0 / tick_rate as f64,
            accumulator: 0.0,
            max_steps: 8,
        }
    }

    /// Caps how many steps one `advance` may ask for after a stall.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn dt(&self) -> f32 {
        self.dt as f32
    }

    /// Number of steps due after `delta` seconds of real time.
    pub fn advance(&mut self, delta: f64) -> u32 {
        self.accumulator += delta.max(0.0);

        let mut steps = 0;
        while self.accumulator >= self.dt && steps < self.max_steps {
            self.accumulator -= self.dt;
            steps += 1;
        }

        if steps == self.max_steps && self.accumulator >= self.dt {
            log::debug!("simulation fell behind, skipping {:.3}s", self.accumulator);
            self.accumulator %= self.dt;
        }

        steps
    }

    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.dt) as f32
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
