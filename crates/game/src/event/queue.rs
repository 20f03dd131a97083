use std::collections::VecDeque;

use super::types::ArenaEvent;

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub tick: u32,
    pub time_ms: u64,
    pub event: ArenaEvent,
}

/// Bounded log of arena events; the oldest entry goes first when full.
#[derive(Debug)]
pub struct EventLog {
    pending: VecDeque<LoggedEvent>,
    max_pending: usize,
    dropped: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventLog {
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(max_pending.min(1024)),
            max_pending: max_pending.max(1),
            dropped: 0,
        }
    }

    pub fn push(&mut self, tick: u32, time_ms: u64, event: ArenaEvent) {
        if self.pending.len() >= self.max_pending {
            self.pending.pop_front();
            self.dropped += 1;
        }
        self.pending.push_back(LoggedEvent {
            tick,
            time_ms,
            event,
        });
    }

    pub fn drain(&mut self) -> Vec<LoggedEvent> {
        self.pending.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.pending.iter()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
