use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use glam::Vec3;

use ashfall::authority::CadenceValidator;
use ashfall::map::MapObjectKind;
use ashfall::net::LinkStats;
use ashfall::{
    Arena, EntityId, EntityKind, FireMode, FixedTimestep, LoopbackLink, ParticipantId,
    TestingGround,
};

use crate::config::ServerConfig;
use crate::events::ServerEvent;

const MAX_PENDING_EVENTS: usize = 512;

/// One simulated remote participant: its own arena mirror, the link to the
/// host and the entities it controls.
struct ObserverSlot {
    arena: Arena,
    link: LoopbackLink,
    player: EntityId,
    weapon: EntityId,
}

#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    pub tick: u32,
    pub uptime_secs: u64,
    pub sim_time: f64,
    pub entity_count: usize,
    pub observers: usize,
    pub drones_alive: usize,
    pub peak_power: f32,
    pub barrels_intact: usize,
    pub barrels_total: usize,
    pub players: Vec<PlayerInfo>,
    pub downstream: LinkStats,
    pub upstream: LinkStats,
    pub waves: u32,
}

#[derive(Debug, Clone)]
pub struct PlayerInfo {
    pub participant: ParticipantId,
    pub health: f32,
    pub loaded: u16,
    pub reserve: u16,
}

pub struct ArenaServer {
    config: ServerConfig,
    ground: TestingGround,
    host: Arena,
    observers: Vec<ObserverSlot>,
    timestep: FixedTimestep,
    last_tick_time: Instant,
    start_time: Instant,
    running: Arc<AtomicBool>,
    pending_events: VecDeque<ServerEvent>,
    waves: u32,
}

impl ArenaServer {
    pub fn new(config: ServerConfig) -> Result<Self> {
        let arena_config = config.arena();
        let ground = TestingGround::new(config.drones, config.barrels);

        let mut host = Arena::host(arena_config.clone());
        if config.validate_cadence {
            host = host.with_validator(CadenceValidator::default());
        }
        ground
            .spawn_into(&mut host)
            .context("failed to build the testing ground")?;

        let spawns = ground.player_spawns();
        let mut controlled = Vec::with_capacity(config.observers);
        for index in 0..config.observers {
            let participant = ParticipantId(index as u32 + 1);
            let position = spawns
                .get(index % spawns.len().max(1))
                .copied()
                .unwrap_or(Vec3::ZERO)
                + Vec3::X * (index / spawns.len().max(1)) as f32 * 100.0;

            let player = host.spawn_player(participant, position)?;
            let weapon = host.spawn_weapon(player, FireMode::HitScan)?;
            controlled.push((participant, player, weapon));
        }

        // Baselines below carry every spawn.
        host.publish();

        let mut observers = Vec::with_capacity(controlled.len());
        let mut pending_events = VecDeque::new();
        for (participant, player, weapon) in controlled {
            let mut arena = Arena::observer(participant, arena_config.clone());
            ground.spawn_into(&mut arena)?;

            let mut link = LoopbackLink::new(participant, config.latency());
            let baseline = host.baseline(participant);
            let entity_count = baseline.entities.len();
            link.send_diff(baseline, host.time())?;

            pending_events.push_back(ServerEvent::ObserverJoined {
                participant,
                entity_count,
            });
            observers.push(ObserverSlot {
                arena,
                link,
                player,
                weapon,
            });
        }

        log::info!(
            "arena ready: {} drones, {} barrels, {} observers",
            config.drones,
            config.barrels,
            config.observers
        );

        Ok(Self {
            timestep: FixedTimestep::new(config.tick_rate),
            config,
            ground,
            host,
            observers,
            last_tick_time: Instant::now(),
            start_time: Instant::now(),
            running: Arc::new(AtomicBool::new(true)),
            pending_events,
            waves: 1,
        })
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    fn push_event(&mut self, event: ServerEvent) {
        if self.pending_events.len() >= MAX_PENDING_EVENTS {
            self.pending_events.pop_front();
        }
        self.pending_events.push_back(event);
    }

    /// Real-time loop for headless runs; events go to the log.
    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.tick_once();
            for event in self.pending_events.drain(..) {
                event.log();
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Runs as fast as possible for `seconds` of simulated time.
    pub fn run_for(&mut self, seconds: f64) {
        let steps = (seconds * self.config.tick_rate as f64).round() as u64;
        for _ in 0..steps {
            self.step();
        }
    }

    pub fn tick_once(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_tick_time;
        self.last_tick_time = now;

        for _ in 0..self.timestep.advance(delta.as_secs_f64()) {
            self.step();
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
        }
    }

    pub fn step(&mut self) {
        let dt = self.timestep.dt();
        let now = self.host.time();

        for slot in &mut self.observers {
            drive_bot(slot, &mut self.host);
            slot.arena.step(dt);

            for request in slot.arena.take_requests() {
                if let Err(err) = slot.link.send_request(request, now) {
                    log::warn!("observer {}: {}", slot.link.participant().0, err);
                }
            }
        }

        let mut link_errors = Vec::new();
        for slot in &mut self.observers {
            for (from, request) in slot.link.recv_requests(now) {
                self.host.enqueue_request(from, request);
            }
        }

        self.host.step(dt);
        let frame = self.host.publish();
        let now = self.host.time();

        for slot in &mut self.observers {
            let participant = slot.link.participant();
            let diff = frame.for_observer(participant);
            if let Err(err) = slot.link.send_diff(diff, now) {
                link_errors.push((participant, err.to_string()));
                continue;
            }

            for diff in &slot.link.recv_diffs(now) {
                if let Err(err) = slot.arena.apply_diff(diff) {
                    link_errors.push((participant, err.to_string()));
                }
            }
            // Presentation is not rendered server-side.
            slot.arena.drain_cues();
        }

        for (participant, message) in link_errors {
            self.push_event(ServerEvent::LinkError {
                participant,
                message,
            });
        }
        for logged in self.host.drain_events() {
            self.push_event(logged.into());
        }
        self.host.drain_cues();

        self.respawn_wave_if_cleared();

        if let Some(limit) = self.config.duration_secs {
            if self.host.time() >= limit && self.running.swap(false, Ordering::SeqCst) {
                let tick = self.host.tick();
                log::info!("duration reached at tick {}", tick);
                self.push_event(ServerEvent::Finished { tick });
            }
        }
    }

    fn respawn_wave_if_cleared(&mut self) {
        if self.config.drones == 0 || !self.host.entities_of(EntityKind::TrackerDrone).is_empty() {
            return;
        }

        for position in self.ground.positions_of(MapObjectKind::Drone) {
            if let Err(err) = self.host.spawn_drone(position) {
                log::error!("failed to respawn drone: {}", err);
                return;
            }
        }
        self.waves += 1;
        log::info!("wave {} spawned", self.waves);
    }

    pub fn stats(&self) -> ServerStats {
        let mut downstream = LinkStats::default();
        let mut upstream = LinkStats::default();
        for slot in &self.observers {
            accumulate(&mut downstream, slot.link.downstream_stats());
            accumulate(&mut upstream, slot.link.upstream_stats());
        }

        let live_drones: Vec<_> = self
            .host
            .entities_of(EntityKind::TrackerDrone)
            .into_iter()
            .filter_map(|id| self.host.drone(id))
            .filter(|d| !d.is_exploded())
            .collect();
        let peak_power = live_drones
            .iter()
            .map(|d| d.power_level())
            .fold(0.0, f32::max);
        let barrels = self.host.entities_of(EntityKind::ExplosiveBarrel);
        let barrels_intact = barrels
            .iter()
            .filter(|id| self.host.barrel(**id).is_some_and(|b| !b.is_triggered()))
            .count();

        let players = self
            .observers
            .iter()
            .map(|slot| {
                let loadout = self.host.weapon(slot.weapon).map(|w| *w.loadout());
                PlayerInfo {
                    participant: slot.link.participant(),
                    health: self.host.health(slot.player).unwrap_or(0.0),
                    loaded: loadout.map_or(0, |l| l.loaded()),
                    reserve: loadout.map_or(0, |l| l.reserve()),
                }
            })
            .collect();

        ServerStats {
            tick: self.host.tick(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            sim_time: self.host.time(),
            entity_count: self.host.world().entity_count(),
            observers: self.observers.len(),
            drones_alive: live_drones.len(),
            peak_power,
            barrels_intact,
            barrels_total: barrels.len(),
            players,
            downstream,
            upstream,
            waves: self.waves,
        }
    }
}

fn accumulate(total: &mut LinkStats, stats: &LinkStats) {
    total.packets_sent += stats.packets_sent;
    total.packets_received += stats.packets_received;
    total.packets_rejected += stats.packets_rejected;
    total.bytes_sent += stats.bytes_sent;
    total.bytes_received += stats.bytes_received;
}

/// Scripted stand-in for a human: track the closest drone the observer can
/// see, hold the trigger while one is visible and reload when dry.
///
/// View direction is not part of the replicated state, so the bot points
/// the host's copy of its player as well.
fn drive_bot(slot: &mut ObserverSlot, host: &mut Arena) {
    let arena = &mut slot.arena;
    let Some(eye) = arena.world().get(slot.player).map(|p| p.eye_position()) else {
        return;
    };

    let target = arena
        .nearest(EntityKind::TrackerDrone, eye)
        .filter(|id| arena.drone(*id).is_some_and(|d| !d.is_exploded()))
        .and_then(|id| arena.entity_position(id));

    let Some(weapon) = arena.weapon(slot.weapon) else {
        return;
    };
    let firing = weapon.is_firing();
    let loadout = *weapon.loadout();

    let result = match target {
        Some(target) => {
            let aimed = arena
                .aim_at(slot.player, target)
                .and_then(|_| host.aim_at(slot.player, target));
            if loadout.loaded() == 0 && loadout.reserve() > 0 {
                aimed
                    .and_then(|_| arena.end_fire(slot.weapon))
                    .and_then(|_| arena.begin_reload(slot.weapon).map(|_| ()))
            } else if !firing {
                aimed.and_then(|_| arena.begin_fire(slot.weapon))
            } else {
                aimed
            }
        }
        None if firing => arena.end_fire(slot.weapon),
        None => Ok(()),
    };

    if let Err(err) = result {
        log::debug!("bot for observer {}: {}", slot.link.participant().0, err);
    }
}
