#[derive(Debug, Clone, Default)]
pub struct LinkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_rejected: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl LinkStats {
    pub fn record_sent(&mut self, bytes: usize) {
        self.packets_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    pub fn record_received(&mut self, bytes: usize) {
        self.packets_received += 1;
        self.bytes_received += bytes as u64;
    }

    pub fn record_rejected(&mut self) {
        self.packets_rejected += 1;
    }

    pub fn average_packet_size(&self) -> f32 {
        if self.packets_sent == 0 {
            return 0.0;
        }
        self.bytes_sent as f32 / self.packets_sent as f32
    }
}
