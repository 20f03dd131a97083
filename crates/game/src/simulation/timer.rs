use crate::snapshot::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerAction {
    PullTrigger(EntityId),
    AggregatePower(EntityId),
    SelfDamage(EntityId),
    RefreshPath(EntityId),
}

impl TimerAction {
    pub fn entity(self) -> EntityId {
        match self {
            Self::PullTrigger(id)
            | Self::AggregatePower(id)
            | Self::SelfDamage(id)
            | Self::RefreshPath(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    handle: TimerHandle,
    action: TimerAction,
    due: f64,
    period: Option<f64>,
}

/// Cooperative timers driven by the simulation clock.
///
/// Timers never fire on their own; [`TimerManager::pop_due`] hands out the
/// earliest due timer so the caller can run it with the clock set to the
/// exact due time.
#[derive(Debug, Default)]
pub struct TimerManager {
    timers: Vec<Timer>,
    next_handle: u64,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        action: TimerAction,
        now: f64,
        first_delay: f64,
        period: Option<f64>,
    ) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;

        self.timers.push(Timer {
            handle,
            action,
            due: now + first_delay.max(0.0),
            period: period.filter(|p| *p > 0.0),
        });

        handle
    }

    /// Safe to call with a handle that never existed or already expired.
    pub fn clear(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        self.timers.len() != before
    }

    pub fn clear_entity(&mut self, entity: EntityId) {
        self.timers.retain(|t| t.action.entity() != entity);
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|t| t.handle == handle)
    }

    pub fn due_time(&self, handle: TimerHandle) -> Option<f64> {
        self.timers
            .iter()
            .find(|t| t.handle == handle)
            .map(|t| t.due)
    }

    /// Removes or reschedules the earliest timer due at or before `until`.
    pub fn pop_due(&mut self, until: f64) -> Option<(TimerAction, f64)> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= until)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.handle.cmp(&b.handle)))
            .map(|(i, _)| i)?;

        let timer = self.timers[index];
        match timer.period {
            Some(period) => self.timers[index].due += period,
            None => {
                self.timers.swap_remove(index);
            }
        }

        Some((timer.action, timer.due))
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
