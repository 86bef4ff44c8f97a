use avian3d::prelude::*;
use bevy::audio::Volume;
use bevy::prelude::*;

use crate::physics::{AvianProbe, GameLayer, SurfaceKind};
use crate::player::{DragHeld, JumpPressed, LookInput, MoveInput, Player, PlayerInput};
use crate::quest::{LevelCatalog, LevelLoaded};
use crate::world::{GameWorld, WorldConfig, WorldEvent, WorldInput};

/// Per-frame ordering of the game systems
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum GameSet {
    /// Input that acts on the world directly
    Input,
    Advance,
    /// Level switching and (re)building
    Level,
    /// Presentation follows the world state
    Sync,
}

/// A [`WorldEvent`] re-emitted for the presentation systems
#[derive(Message, Clone, Debug)]
pub struct GameMessage(pub WorldEvent);

/// Seed for the orb wander targets
#[derive(Resource, Debug, Clone, Copy)]
pub struct WorldSeed(pub u64);

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0x5eed)
    }
}

pub fn setup_world(
    mut commands: Commands,
    seed: Res<WorldSeed>,
    mut loaded: MessageWriter<LevelLoaded>,
) {
    let catalog = match LevelCatalog::builtin() {
        Ok(catalog) => catalog,
        Err(err) => {
            error!("Built-in levels are unusable: {err}");
            return;
        }
    };
    let Some(layout) = catalog.first().cloned() else {
        error!("No levels to load");
        return;
    };

    info!("Loading level {} ({})", layout.id, layout.name);
    loaded.write(LevelLoaded(layout.id));
    commands.insert_resource(GameWorld::new(layout, WorldConfig::default(), seed.0));
    commands.insert_resource(catalog);
}

/// Advances the world one frame and re-emits its events.
pub fn advance_world(
    time: Res<Time>,
    mut world: ResMut<GameWorld>,
    spatial_query: SpatialQuery,
    surfaces: Query<&SurfaceKind>,
    input: Query<(&MoveInput, &JumpPressed, &LookInput, &DragHeld), With<Player>>,
    mut writer: MessageWriter<GameMessage>,
) {
    let world_input = match input.single() {
        Ok((movement, jump, look, drag)) => WorldInput {
            player: PlayerInput {
                movement: movement.0,
                jump: jump.0,
            },
            drag: look.0,
            dragging: drag.0,
        },
        Err(_) => WorldInput::default(),
    };

    let classify = |entity: Entity| surfaces.get(entity).copied().unwrap_or_default();
    let probe = AvianProbe::new(&spatial_query, GameLayer::World, &classify);

    let dt = time.delta_secs().min(world.config.max_dt);
    for event in world.tick(dt, &world_input, &probe) {
        log_event(&event);
        writer.write(GameMessage(event));
    }
}

fn log_event(event: &WorldEvent) {
    match event {
        WorldEvent::QuestAdvanced { from, to } => {
            info!("Quest: {} -> {}", from.name(), to.name());
        }
        WorldEvent::PhaseAdvanced { phase } => debug!("Orb phase advanced to {phase}"),
        WorldEvent::OrbsScattered => debug!("Player hit, orbs scattered"),
        WorldEvent::EnemyStomped { enemy, hp } => debug!("Enemy {enemy} stomped, {hp} hp left"),
        WorldEvent::EnemyDefeated { enemy } => info!("Enemy {enemy} defeated"),
        WorldEvent::LevelSwitchRequested(level) => info!("Level switch to {level} requested"),
        _ => {}
    }
}

/// The first click or key press unlocks audio and starts the ambience.
pub fn unlock_audio(
    mut commands: Commands,
    mut world: ResMut<GameWorld>,
    mouse: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    asset_server: Res<AssetServer>,
) {
    if world.audio_unlocked {
        return;
    }
    if mouse.get_just_pressed().next().is_none() && keys.get_just_pressed().next().is_none() {
        return;
    }

    world.audio_unlocked = true;
    commands.spawn((
        AudioPlayer::new(asset_server.load("sounds/forest.ogg")),
        PlaybackSettings::LOOP.with_volume(Volume::Linear(0.3)),
    ));
    debug!("Audio unlocked");
}
