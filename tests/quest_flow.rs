use altar_quest::enemy::Laser;
use altar_quest::orb::{ORB_COUNT, OrbState};
use altar_quest::physics::BoxProbe;
use altar_quest::quest::{LevelCatalog, LevelLayout, QuestMessage, QuestState};
use altar_quest::world::{GameWorld, WorldConfig, WorldEvent, WorldInput};
use bevy::prelude::*;

const DT: f32 = 1.0 / 60.0;
const ALTAR_TOP: Vec3 = Vec3::new(0.0, 0.3, 0.0);

fn level(id: u32) -> LevelLayout {
    LevelCatalog::builtin()
        .unwrap()
        .get(id)
        .unwrap()
        .clone()
}

fn meadow_world() -> (GameWorld, BoxProbe) {
    let layout = level(1);
    let probe = layout.box_probe();
    let mut world = GameWorld::new(layout, WorldConfig::default(), 42);
    world.audio_unlocked = true;
    (world, probe)
}

fn run(world: &mut GameWorld, probe: &BoxProbe, dt: f32, ticks: usize) -> Vec<WorldEvent> {
    (0..ticks)
        .flat_map(|_| world.tick(dt, &WorldInput::default(), probe))
        .collect()
}

/// Steps onto the altar and sits through the whole cinematic.
fn reach_collecting(world: &mut GameWorld, probe: &BoxProbe) -> Vec<WorldEvent> {
    world.player.body.reset_to(ALTAR_TOP);
    let events = run(world, probe, 0.1, 110);
    assert_eq!(world.quest.state(), QuestState::Collecting);
    events
}

/// Parks every uncollected orb far from the altar, except `near`.
fn offer_orb(world: &mut GameWorld, near: usize) {
    for orb in world.orbs.iter_mut().filter(|orb| !orb.collected) {
        orb.position = if orb.id == near {
            ALTAR_TOP + Vec3::Y * 1.3
        } else {
            Vec3::new(12.0, 3.0, 18.0)
        };
        orb.state = OrbState::Flying {
            target: orb.position,
        };
    }
}

#[test]
fn altar_starts_the_cinematic_and_hands_back_control() {
    let (mut world, probe) = meadow_world();

    let idle = run(&mut world, &probe, DT, 30);
    assert!(!idle.contains(&WorldEvent::OrbsAppeared));
    assert_eq!(world.quest.state(), QuestState::AwaitingTrigger);

    world.player.body.reset_to(ALTAR_TOP);
    let events = run(&mut world, &probe, DT, 1);
    assert!(events.contains(&WorldEvent::OrbsAppeared));
    assert!(world.quest.is_cinematic());
    assert_eq!(world.quest.banner(world.elapsed), Some(QuestMessage::Wait));
    assert!(world.orbs.iter().all(|orb| matches!(orb.state, OrbState::CinematicStack { .. })));

    // Frozen: movement input is ignored until the camera returns
    let push = WorldInput {
        player: altar_quest::player::PlayerInput {
            movement: Vec2::Y,
            jump: false,
        },
        ..default()
    };
    for _ in 0..30 {
        world.tick(DT, &push, &probe);
    }
    assert!(world.player.position().distance(ALTAR_TOP) < 0.05);

    let events = reach_collecting(&mut world, &probe);
    assert!(events.contains(&WorldEvent::MelodiesStarted));
    assert!(world.enemies.iter().all(|enemy| enemy.state.is_active()));
    assert!(world.orbs.iter().all(|orb| matches!(orb.state, OrbState::Flying { .. })));
}

#[test]
fn orbs_are_collected_in_phase_order_and_open_the_door() {
    let (mut world, probe) = meadow_world();
    reach_collecting(&mut world, &probe);
    world.enemies.clear();

    // The middle orb is not collectable first
    offer_orb(&mut world, 1);
    let events = run(&mut world, &probe, DT, 5);
    assert!(!events.iter().any(|event| matches!(event, WorldEvent::PhaseAdvanced { .. })));
    assert!(!world.orbs[1].collected);

    for (id, expected_phase) in (0..ORB_COUNT).zip(1..) {
        offer_orb(&mut world, id);
        let events = run(&mut world, &probe, DT, 1);
        assert!(events.contains(&WorldEvent::PhaseAdvanced {
            phase: expected_phase
        }));
        assert_eq!(world.orbs[id].state, OrbState::Following);
    }
    assert_eq!(world.collected_orbs(), ORB_COUNT);

    let events = run(&mut world, &probe, DT, 5);
    assert!(events.contains(&WorldEvent::DoorsOpened));
    assert_eq!(world.quest.state(), QuestState::DoorOpen);
    assert!(world.orbs.iter().all(|orb| !orb.is_visible()));

    world.player.body.reset_to(Vec3::new(0.0, 0.0, 28.0));
    let events = run(&mut world, &probe, DT, 1);
    assert!(events.contains(&WorldEvent::LevelSwitchRequested(2)));
    assert_eq!(world.quest.state(), QuestState::NextLevel);

    world.load_level(level(2));
    assert_eq!(world.layout.id, 2);
    assert_eq!(world.collected_orbs(), 0);
    assert!(world.enemies.iter().all(|enemy| enemy.state.is_active()));
}

#[test]
fn leaving_the_altar_with_every_orb_asks_to_return() {
    let (mut world, probe) = meadow_world();
    reach_collecting(&mut world, &probe);
    world.enemies.clear();

    for id in 0..ORB_COUNT {
        offer_orb(&mut world, id);
        run(&mut world, &probe, DT, 1);
    }
    assert_eq!(world.collected_orbs(), ORB_COUNT);

    world.player.body.reset_to(Vec3::new(6.0, 0.0, 6.0));
    run(&mut world, &probe, DT, 2);
    assert_eq!(world.quest.state(), QuestState::Collecting);
    assert_eq!(
        world.quest.banner(world.elapsed),
        Some(QuestMessage::ReturnToAltar)
    );
}

#[test]
fn laser_hit_mid_collection_scatters_every_orb() {
    let (mut world, probe) = meadow_world();
    reach_collecting(&mut world, &probe);
    world.enemies.truncate(1);
    world.enemies[0].lasers.clear();

    offer_orb(&mut world, 0);
    run(&mut world, &probe, DT, 1);
    assert_eq!(world.collected_orbs(), 1);
    assert_eq!(world.quest.current_phase(), 1);

    // A beam lying across the player
    let player = world.player.position();
    world.enemies[0].lasers.push(Laser {
        id: 999,
        center: player + Vec3::Y,
        direction: Vec3::X,
        length: 36.0,
        life: 1.0,
    });
    let events = run(&mut world, &probe, DT, 1);

    assert!(events.contains(&WorldEvent::PlayerHit));
    assert!(events.contains(&WorldEvent::OrbsScattered));
    assert_eq!(world.collected_orbs(), 0);
    assert_eq!(world.quest.current_phase(), 0);
    assert_eq!(world.quest.state(), QuestState::Collecting);
    assert!(world.orbs.iter().all(|orb| matches!(orb.state, OrbState::Flying { .. })));
    assert!(world.player.blink.is_some());
}

#[test]
fn three_stomps_defeat_an_enemy() {
    let (mut world, probe) = meadow_world();
    let mut defeated = false;

    for stomp in 1..=3 {
        let perch = world.enemies[0].render_position() + Vec3::Y;
        world.player.body.reset_to(perch);
        let events = run(&mut world, &probe, DT, 1);

        if stomp < 3 {
            assert!(events.contains(&WorldEvent::EnemyStomped {
                enemy: 0,
                hp: 3 - stomp
            }));
        } else {
            defeated = events.contains(&WorldEvent::EnemyDefeated { enemy: 0 });
        }
    }

    assert!(defeated);
    assert!(!world.enemies[0].is_alive());
    assert!(world.enemies[1].is_alive());
}
