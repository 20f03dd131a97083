use ashfall::authority::CadenceValidator;
use ashfall::net::FieldValue;
use ashfall::{
    ActionRequest, Arena, ArenaConfig, ArenaError, ArenaEvent, Cue, DamageEvent, DamageKind,
    EntityId, FireMode, ParticipantId, SurfaceClass,
};
use glam::Vec3;

const DT: f32 = 1.0 / 60.0;

fn host_arena(config: ArenaConfig) -> Arena {
    let mut arena = Arena::host(config);
    arena.add_ground(0.0, 5000.0);
    arena
}

fn run_for(arena: &mut Arena, seconds: f32) {
    let steps = (seconds / DT).round() as u32;
    for _ in 0..steps {
        arena.step(DT);
    }
}

fn events(arena: &mut Arena) -> Vec<ArenaEvent> {
    arena.drain_events().into_iter().map(|e| e.event).collect()
}

/// Shooter at the origin holding a rifle, target player 10m down -Z.
fn duel(config: ArenaConfig) -> (Arena, EntityId, EntityId, EntityId) {
    let mut arena = host_arena(config);
    let shooter = arena.spawn_player(ParticipantId::HOST, Vec3::ZERO).unwrap();
    let rifle = arena.spawn_weapon(shooter, FireMode::HitScan).unwrap();
    let target = arena
        .spawn_player(ParticipantId(1), Vec3::new(0.0, 0.0, -1000.0))
        .unwrap();
    (arena, shooter, rifle, target)
}

#[test]
fn body_shot_applies_base_damage() {
    let (mut arena, shooter, rifle, target) = duel(ArenaConfig::default());
    arena.aim_at(shooter, Vec3::new(0.0, 90.0, -1000.0)).unwrap();

    assert!(arena.pull_trigger(rifle).unwrap());

    assert_eq!(arena.health(target), Some(80.0));
    assert_eq!(arena.weapon(rifle).unwrap().loadout().loaded(), 29);

    let fired = events(&mut arena).into_iter().find_map(|e| match e {
        ArenaEvent::ShotFired { victim, surface, .. } => Some((victim, surface)),
        _ => None,
    });
    assert_eq!(fired, Some((Some(target), SurfaceClass::Flesh)));
}

#[test]
fn head_shot_is_multiplied() {
    let (mut arena, shooter, rifle, target) = duel(ArenaConfig::default());
    arena.aim_at(shooter, Vec3::new(0.0, 162.0, -1000.0)).unwrap();

    arena.pull_trigger(rifle).unwrap();

    assert_eq!(arena.health(target), Some(20.0));
}

#[test]
fn miss_draws_tracer_to_max_range() {
    let (mut arena, shooter, rifle, target) = duel(ArenaConfig::default());
    arena.aim_at(shooter, Vec3::new(0.0, 1165.0, 0.0)).unwrap();

    arena.pull_trigger(rifle).unwrap();

    assert_eq!(arena.health(target), Some(100.0));
    let tracer = arena.drain_cues().into_iter().find_map(|cue| match cue {
        Cue::Tracer { from, to, .. } => Some((from, to)),
        _ => None,
    });
    let (from, to) = tracer.unwrap();
    assert!((from.distance(to) - 10_000.0).abs() < 0.5);
    assert!(to.y > from.y);
}

#[test]
fn toggling_fire_cannot_beat_the_cadence() {
    let (mut arena, shooter, rifle, _) = duel(ArenaConfig::default());
    arena.aim_at(shooter, Vec3::new(0.0, 1165.0, 0.0)).unwrap();

    for _ in 0..100 {
        arena.begin_fire(rifle).unwrap();
        arena.step(0.01);
        arena.end_fire(rifle).unwrap();
    }

    // 600 rounds per minute over one second.
    let fired = 30 - arena.weapon(rifle).unwrap().loadout().loaded();
    assert!((9..=11).contains(&fired), "fired {fired}");
}

#[test]
fn held_trigger_fires_at_rate() {
    let (mut arena, shooter, rifle, _) = duel(ArenaConfig::default());
    arena.aim_at(shooter, Vec3::new(0.0, 1165.0, 0.0)).unwrap();

    arena.begin_fire(rifle).unwrap();
    run_for(&mut arena, 0.5);
    arena.end_fire(rifle).unwrap();
    let fired = 30 - arena.weapon(rifle).unwrap().loadout().loaded();
    run_for(&mut arena, 0.5);

    assert!((5..=6).contains(&fired), "fired {fired}");
    assert_eq!(30 - arena.weapon(rifle).unwrap().loadout().loaded(), fired);
    assert!(arena.end_fire(rifle).is_ok());
}

#[test]
fn empty_magazine_absorbs_pulls() {
    let mut config = ArenaConfig::default();
    config.rifle.max_loaded = 2;
    config.rifle.max_reserve = 0;
    let (mut arena, shooter, rifle, target) = duel(config);
    arena.aim_at(shooter, Vec3::new(0.0, 90.0, -1000.0)).unwrap();

    assert!(arena.pull_trigger(rifle).unwrap());
    assert!(arena.pull_trigger(rifle).unwrap());
    assert!(!arena.pull_trigger(rifle).unwrap());

    assert_eq!(arena.health(target), Some(60.0));
    assert_eq!(arena.begin_reload(rifle).unwrap(), 0);
}

#[test]
fn reload_moves_what_the_reserve_holds() {
    let mut config = ArenaConfig::default();
    config.rifle.max_loaded = 30;
    config.rifle.max_reserve = 5;
    let (mut arena, shooter, rifle, _) = duel(config);
    arena.aim_at(shooter, Vec3::new(0.0, 1165.0, 0.0)).unwrap();

    for _ in 0..20 {
        arena.pull_trigger(rifle).unwrap();
    }
    assert_eq!(arena.weapon(rifle).unwrap().loadout().loaded(), 10);

    assert_eq!(arena.begin_reload(rifle).unwrap(), 5);
    let loadout = arena.weapon(rifle).unwrap().loadout();
    assert_eq!((loadout.loaded(), loadout.reserve()), (15, 0));

    assert_eq!(arena.begin_reload(rifle).unwrap(), 0);
    assert!(events(&mut arena)
        .iter()
        .any(|e| matches!(e, ArenaEvent::Reloaded { moved: 5, .. })));
}

#[test]
fn launcher_spawns_a_projectile() {
    let mut arena = host_arena(ArenaConfig::default());
    let shooter = arena.spawn_player(ParticipantId::HOST, Vec3::ZERO).unwrap();
    let launcher = arena.spawn_weapon(shooter, FireMode::Launcher).unwrap();
    arena.aim_at(shooter, Vec3::new(0.0, 165.0, -1000.0)).unwrap();

    assert!(arena.pull_trigger(launcher).unwrap());

    let projectiles = arena.entities_of(ashfall::EntityKind::Projectile);
    assert_eq!(projectiles.len(), 1);
    let start = arena.entity_position(projectiles[0]).unwrap();

    arena.step(DT);
    let moved = arena.entity_position(projectiles[0]).unwrap();
    assert!(moved.z < start.z);

    run_for(&mut arena, 3.5);
    assert!(arena.entities_of(ashfall::EntityKind::Projectile).is_empty());
}

#[test]
fn observers_cannot_spawn_or_damage() {
    let mut arena = Arena::observer(ParticipantId(1), ArenaConfig::default());

    assert!(matches!(
        arena.spawn_barrel(Vec3::ZERO),
        Err(ArenaError::NotAuthoritative(_))
    ));
    assert!(matches!(
        arena.apply_damage(EntityId(1), DamageEvent::new(10.0, DamageKind::Generic)),
        Err(ArenaError::NotAuthoritative(_))
    ));
}

#[test]
fn cadence_validator_drops_bad_requests() {
    let mut arena = host_arena(ArenaConfig::default()).with_validator(CadenceValidator::default());
    let owner = ParticipantId(1);
    let shooter = arena.spawn_player(owner, Vec3::ZERO).unwrap();
    let rifle = arena.spawn_weapon(shooter, FireMode::HitScan).unwrap();
    let pull = ActionRequest::PullTrigger { weapon_id: rifle.0 };

    assert!(!arena.receive_request(ParticipantId(2), pull));
    assert!(arena.receive_request(owner, pull));
    assert!(!arena.receive_request(owner, pull));

    arena.step(0.1);
    assert!(arena.receive_request(owner, pull));

    let dropped = events(&mut arena)
        .iter()
        .filter(|e| matches!(e, ArenaEvent::RequestDropped { .. }))
        .count();
    assert_eq!(dropped, 2);
    assert_eq!(arena.weapon(rifle).unwrap().loadout().loaded(), 28);
}

#[test]
fn buffered_requests_run_on_the_next_step() {
    let mut arena = host_arena(ArenaConfig::default());
    let owner = ParticipantId(1);
    let shooter = arena.spawn_player(owner, Vec3::ZERO).unwrap();
    let rifle = arena.spawn_weapon(shooter, FireMode::HitScan).unwrap();

    arena.enqueue_request(owner, ActionRequest::PullTrigger { weapon_id: rifle.0 });
    assert_eq!(arena.weapon(rifle).unwrap().loadout().loaded(), 30);

    arena.step(DT);
    assert_eq!(arena.weapon(rifle).unwrap().loadout().loaded(), 29);
}

#[test]
fn barrel_explodes_exactly_once() {
    let mut arena = host_arena(ArenaConfig::default());
    let barrel = arena.spawn_barrel(Vec3::new(0.0, 45.0, 0.0)).unwrap();
    let neighbour = arena.spawn_barrel(Vec3::new(120.0, 45.0, 0.0)).unwrap();

    let hit = DamageEvent::new(60.0, DamageKind::Bullet);
    arena.apply_damage(barrel, hit).unwrap();
    arena.apply_damage(barrel, hit).unwrap();

    assert!(arena.barrel(barrel).unwrap().is_triggered());
    assert_eq!(arena.health(barrel), Some(0.0));
    assert!(!arena.barrel(neighbour).unwrap().is_triggered());
    assert_eq!(arena.health(neighbour), Some(100.0));

    let explosions: Vec<_> = events(&mut arena)
        .into_iter()
        .filter_map(|e| match e {
            ArenaEvent::BarrelExploded { bodies_pushed, .. } => Some(bodies_pushed),
            _ => None,
        })
        .collect();
    assert_eq!(explosions, vec![1]);

    let cues = arena.drain_cues();
    let blasts = cues
        .iter()
        .filter(|c| matches!(c, Cue::Explosion { entity, .. } if *entity == barrel))
        .count();
    assert_eq!(blasts, 1);

    let frame = arena.publish();
    assert!(frame
        .fields
        .iter()
        .any(|f| f.entity_id == barrel.0 && f.value == FieldValue::Triggered(true)));
}

#[test]
fn power_level_clamps_at_max() {
    let mut arena = host_arena(ArenaConfig::default());
    let drones: Vec<_> = (0..8)
        .map(|i| {
            arena
                .spawn_drone(Vec3::new(i as f32 * 60.0, 100.0, 0.0))
                .unwrap()
        })
        .collect();

    run_for(&mut arena, 0.5);
    assert_eq!(arena.drone(drones[0]).unwrap().power_level(), 0.0);

    run_for(&mut arena, 0.6);
    for id in &drones {
        let drone = arena.drone(*id).unwrap();
        assert_eq!(drone.power_level(), 4.0);
        assert_eq!(drone.actual_damage(), 200.0);
    }

    let power_fields = arena
        .publish()
        .fields
        .iter()
        .filter(|f| f.value == FieldValue::PowerLevel(4.0))
        .count();
    assert_eq!(power_fields, 8);
}

#[test]
fn blast_scales_with_power_level() {
    let mut arena = host_arena(ArenaConfig::default());
    let center = arena.spawn_drone(Vec3::new(0.0, 100.0, 0.0)).unwrap();
    arena.spawn_drone(Vec3::new(-400.0, 100.0, 0.0)).unwrap();
    arena.spawn_drone(Vec3::new(400.0, 100.0, 0.0)).unwrap();
    let barrel = arena.spawn_barrel(Vec3::new(100.0, 45.0, 0.0)).unwrap();

    run_for(&mut arena, 1.1);
    assert_eq!(arena.drone(center).unwrap().power_level(), 2.0);
    events(&mut arena);

    arena
        .apply_damage(center, DamageEvent::new(100.0, DamageKind::Bullet))
        .unwrap();

    let blasts: Vec<_> = events(&mut arena)
        .into_iter()
        .filter_map(|e| match e {
            ArenaEvent::DroneSelfDestructed { drone, damage, .. } => Some((drone, damage)),
            _ => None,
        })
        .collect();
    assert_eq!(blasts, vec![(center, 120.0)]);
    assert!(arena.barrel(barrel).unwrap().is_triggered());
}

#[test]
fn drone_blasts_chain() {
    let mut arena = host_arena(ArenaConfig::default());
    let first = arena.spawn_drone(Vec3::new(0.0, 100.0, 0.0)).unwrap();
    let second = arena.spawn_drone(Vec3::new(150.0, 100.0, 0.0)).unwrap();

    arena
        .apply_damage(second, DamageEvent::new(70.0, DamageKind::Bullet))
        .unwrap();
    arena
        .apply_damage(first, DamageEvent::new(100.0, DamageKind::Bullet))
        .unwrap();

    assert!(arena.drone(first).unwrap().is_exploded());
    assert!(arena.drone(second).unwrap().is_exploded());

    let blasts = events(&mut arena)
        .iter()
        .filter(|e| matches!(e, ArenaEvent::DroneSelfDestructed { .. }))
        .count();
    assert_eq!(blasts, 2);
}

#[test]
fn armed_drone_counts_down_and_is_removed() {
    let mut arena = host_arena(ArenaConfig::default());
    let player = arena.spawn_player(ParticipantId::HOST, Vec3::ZERO).unwrap();
    let drone = arena.spawn_drone(Vec3::new(0.0, 100.0, 0.0)).unwrap();

    run_for(&mut arena, 0.75);
    assert_eq!(arena.health(drone), Some(60.0));
    let armed = events(&mut arena)
        .iter()
        .filter(|e| matches!(e, ArenaEvent::DroneArmed { .. }))
        .count();
    assert_eq!(armed, 1);

    run_for(&mut arena, 2.25);
    assert!(arena.drone(drone).unwrap().is_exploded());
    assert_eq!(arena.health(player), Some(60.0));
    assert!(arena.world().contains(drone));

    run_for(&mut arena, 1.5);
    assert!(!arena.world().contains(drone));
    assert!(arena.drone(drone).is_none());
    assert!(events(&mut arena)
        .iter()
        .any(|e| matches!(e, ArenaEvent::EntityRemoved { entity } if *entity == drone)));
}

#[test]
fn drone_closes_in_on_the_nearest_player() {
    let mut arena = host_arena(ArenaConfig::default());
    arena
        .spawn_player(ParticipantId::HOST, Vec3::new(0.0, 0.0, -2000.0))
        .unwrap();
    let drone = arena.spawn_drone(Vec3::new(0.0, 100.0, 0.0)).unwrap();

    run_for(&mut arena, 1.0);

    let position = arena.entity_position(drone).unwrap();
    assert!(position.z < -100.0, "drone at {position}");
}
