use crate::authority::Role;
use crate::snapshot::EntityId;

use super::{DamageEvent, DamageKind, HealthChanged};

/// Handle to a component listening for health changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subscriber {
    Hazard(EntityId),
    Agent(EntityId),
}

/// Health pool of one damageable entity.
///
/// `current` only moves on the host through [`DamageSink::apply_damage`].
/// Observers mirror the replicated value through
/// [`DamageSink::receive_replicated`], which raises the same notification
/// so reactions run through one code path on every participant.
#[derive(Debug, Clone)]
pub struct DamageSink {
    entity: EntityId,
    current: f32,
    max: f32,
    subscribers: Vec<Subscriber>,
    dirty: bool,
}

impl DamageSink {
    pub fn new(entity: EntityId, max: f32) -> Self {
        let max = max.max(0.0);
        Self {
            entity,
            current: max,
            max,
            subscribers: Vec::new(),
            dirty: false,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) {
        if !self.subscribers.contains(&subscriber) {
            self.subscribers.push(subscriber);
        }
    }

    pub fn unsubscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.retain(|s| *s != subscriber);
    }

    pub fn subscribers(&self) -> &[Subscriber] {
        &self.subscribers
    }

    pub fn apply_damage(&mut self, role: Role, event: &DamageEvent) -> Option<HealthChanged> {
        if !role.is_host() {
            return None;
        }

        if event.amount.is_nan() || event.amount <= 0.0 {
            return None;
        }

        self.current = (self.current - event.amount).clamp(0.0, self.max);
        self.dirty = true;

        log::debug!(
            "entity {} health changed to {} ({:?})",
            self.entity.0,
            self.current,
            event.kind
        );

        Some(HealthChanged {
            entity: self.entity,
            current: self.current,
            delta: event.amount,
            kind: event.kind,
            instigator: event.instigator,
            causer: event.causer,
        })
    }

    pub fn receive_replicated(&mut self, current: f32) -> Option<HealthChanged> {
        let current = current.clamp(0.0, self.max);
        if current == self.current {
            return None;
        }

        let delta = self.current - current;
        self.current = current;

        Some(HealthChanged {
            entity: self.entity,
            current,
            delta,
            kind: DamageKind::Generic,
            instigator: None,
            causer: None,
        })
    }

    pub fn take_dirty(&mut self) -> Option<f32> {
        std::mem::take(&mut self.dirty).then_some(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> DamageSink {
        DamageSink::new(EntityId(1), 100.0)
    }

    #[test]
    fn non_positive_damage_is_ignored() {
        let mut sink = sink();
        for amount in [0.0, -5.0, -0.0, f32::NAN] {
            let event = DamageEvent::new(amount, DamageKind::Bullet);
            assert!(sink.apply_damage(Role::Host, &event).is_none());
        }
        assert_eq!(sink.current(), 100.0);
        assert!(sink.take_dirty().is_none());
    }

    #[test]
    fn damage_clamps_within_bounds() {
        let mut sink = sink();
        let amounts = [30.0, 0.5, 45.0, 1000.0, 12.0];
        for amount in amounts {
            sink.apply_damage(Role::Host, &DamageEvent::new(amount, DamageKind::Generic));
            assert!(sink.current() >= 0.0 && sink.current() <= sink.max());
        }
        assert_eq!(sink.current(), 0.0);
    }

    #[test]
    fn notification_carries_event_fields() {
        let mut sink = sink();
        let event = DamageEvent::new(25.0, DamageKind::Explosion).with_causer(EntityId(9));
        let change = sink.apply_damage(Role::Host, &event).unwrap();

        assert_eq!(change.current, 75.0);
        assert_eq!(change.delta, 25.0);
        assert_eq!(change.kind, DamageKind::Explosion);
        assert_eq!(change.causer, Some(EntityId(9)));
        assert_eq!(sink.take_dirty(), Some(75.0));
        assert!(sink.take_dirty().is_none());
    }

    #[test]
    fn observers_cannot_apply_damage() {
        let mut sink = sink();
        let event = DamageEvent::new(10.0, DamageKind::Bullet);
        assert!(sink.apply_damage(Role::Observer, &event).is_none());
        assert_eq!(sink.current(), 100.0);
    }

    #[test]
    fn replicated_value_raises_notification_once() {
        let mut sink = sink();
        let change = sink.receive_replicated(40.0).unwrap();
        assert_eq!(change.current, 40.0);
        assert_eq!(change.delta, 60.0);
        assert!(sink.receive_replicated(40.0).is_none());
        assert!(sink.take_dirty().is_none());
    }

    #[test]
    fn subscribe_is_idempotent() {
        let mut sink = sink();
        sink.subscribe(Subscriber::Hazard(EntityId(1)));
        sink.subscribe(Subscriber::Hazard(EntityId(1)));
        assert_eq!(sink.subscribers().len(), 1);
        sink.unsubscribe(Subscriber::Hazard(EntityId(1)));
        assert!(sink.subscribers().is_empty());
    }
}
