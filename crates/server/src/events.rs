use ashfall::{ArenaEvent, LoggedEvent, ParticipantId};

#[derive(Debug, Clone)]
pub enum ServerEvent {
    ObserverJoined {
        participant: ParticipantId,
        entity_count: usize,
    },
    Combat {
        tick: u32,
        event: ArenaEvent,
    },
    LinkError {
        participant: ParticipantId,
        message: String,
    },
    Finished {
        tick: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Notice,
    Warn,
}

impl From<LoggedEvent> for ServerEvent {
    fn from(logged: LoggedEvent) -> Self {
        Self::Combat {
            tick: logged.tick,
            event: logged.event,
        }
    }
}

impl ServerEvent {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Combat { event, .. } if event.is_explosion() => Severity::Notice,
            Self::Combat {
                event: ArenaEvent::RequestDropped { .. },
                ..
            }
            | Self::LinkError { .. } => Severity::Warn,
            _ => Severity::Info,
        }
    }

    /// Noisy per-shot events stay out of the operator log.
    pub fn is_routine(&self) -> bool {
        matches!(
            self,
            Self::Combat {
                event: ArenaEvent::ShotFired { .. }
                    | ArenaEvent::Damaged { .. }
                    | ArenaEvent::ProjectileLaunched { .. },
                ..
            }
        )
    }

    pub fn log(&self) {
        if self.is_routine() {
            log::debug!("{}", self.describe());
            return;
        }
        match self.severity() {
            Severity::Warn => log::warn!("{}", self.describe()),
            Severity::Info | Severity::Notice => log::info!("{}", self.describe()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::ObserverJoined {
                participant,
                entity_count,
            } => format!(
                "observer {} joined ({} entities in baseline)",
                participant.0, entity_count
            ),
            Self::Combat { tick, event } => format!("[{tick}] {}", describe_combat(event)),
            Self::LinkError {
                participant,
                message,
            } => format!("link to observer {} failed: {}", participant.0, message),
            Self::Finished { tick } => format!("session finished at tick {tick}"),
        }
    }
}

fn describe_combat(event: &ArenaEvent) -> String {
    match event {
        ArenaEvent::ShotFired {
            weapon, victim, ..
        } => match victim {
            Some(victim) => format!("weapon {} hit entity {}", weapon.0, victim.0),
            None => format!("weapon {} missed", weapon.0),
        },
        ArenaEvent::ProjectileLaunched { weapon, projectile } => {
            format!("weapon {} launched projectile {}", weapon.0, projectile.0)
        }
        ArenaEvent::Reloaded { weapon, moved } => {
            format!("weapon {} reloaded {} rounds", weapon.0, moved)
        }
        ArenaEvent::Damaged {
            entity,
            amount,
            remaining,
            kind,
        } => format!(
            "entity {} took {:.0} {:?} damage ({:.0} left)",
            entity.0, amount, kind, remaining
        ),
        ArenaEvent::BarrelExploded {
            barrel,
            bodies_pushed,
        } => format!("barrel {} exploded, pushed {} bodies", barrel.0, bodies_pushed),
        ArenaEvent::DroneArmed { drone } => format!("drone {} armed", drone.0),
        ArenaEvent::DroneSelfDestructed {
            drone,
            damage,
            victims,
        } => format!(
            "drone {} self-destructed for {:.0} damage, {} caught",
            drone.0, damage, victims
        ),
        ArenaEvent::PowerLevelChanged { drone, level } => {
            format!("drone {} power level {:.0}", drone.0, level)
        }
        ArenaEvent::RequestDropped { from, request } => {
            format!("dropped {:?} from participant {}", request, from.0)
        }
        ArenaEvent::EntityRemoved { entity } => format!("entity {} removed", entity.0),
    }
}
