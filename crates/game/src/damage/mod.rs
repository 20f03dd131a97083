mod event;
mod sink;

pub use event::{DamageEvent, DamageKind, HealthChanged};
pub use sink::{DamageSink, Subscriber};
