use std::f32::consts::FRAC_PI_2;

use avian3d::prelude::*;
use bevy::prelude::*;

use super::director::QuestState;
use super::level::LevelCatalog;
use crate::camera::smoothstep;
use crate::game::{GameMessage, GameSet};
use crate::orb::ORB_COUNT;
use crate::physics::{GameLayer, SurfaceKind};
use crate::world::{GameWorld, WorldEvent};

const DOOR_HEIGHT: f32 = 4.0;
const DOOR_WIDTH: f32 = 6.0;
const DOOR_OPEN_SECONDS: f32 = 1.5;

/// Written once a level's world state is ready to be built
#[derive(Message, Clone, Copy, Debug)]
pub struct LevelLoaded(pub u32);

/// Despawned when the level is swapped out
#[derive(Component, Debug, Clone, Copy)]
pub struct LevelEntity;

/// Pivot of one door leaf. `side` is -1 for the left leaf, 1 for the right.
#[derive(Component, Debug, Clone, Copy)]
pub struct DoorHinge {
    side: f32,
    opened_at: Option<f32>,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct DoorLeaf;

#[derive(Component)]
struct HudBanner;

#[derive(Component)]
struct HudHint;

#[derive(Component)]
struct HudStatus;

pub struct QuestPlugin;

impl Plugin for QuestPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<LevelLoaded>();

        app.add_systems(Startup, spawn_hud);
        app.add_systems(Update, switch_level.in_set(GameSet::Level));
        app.add_systems(
            Update,
            (build_level, open_doors, animate_doors, play_quest_sounds, update_hud)
                .chain()
                .in_set(GameSet::Sync),
        );
    }
}

fn surface_material(surface: SurfaceKind) -> StandardMaterial {
    match surface {
        SurfaceKind::Grass => StandardMaterial {
            base_color: Color::srgb(0.35, 0.55, 0.35),
            perceptual_roughness: 0.9,
            ..default()
        },
        SurfaceKind::Stone => StandardMaterial {
            base_color: Color::srgb(0.45, 0.43, 0.46),
            perceptual_roughness: 0.85,
            ..default()
        },
        SurfaceKind::Altar => StandardMaterial {
            base_color: Color::srgb(0.75, 0.65, 0.35),
            emissive: LinearRgba::rgb(0.3, 0.22, 0.05),
            perceptual_roughness: 0.4,
            metallic: 0.3,
            ..default()
        },
    }
}

fn spawn_block(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    material: Handle<StandardMaterial>,
    center: Vec3,
    size: Vec3,
    surface: SurfaceKind,
) -> Entity {
    commands
        .spawn((
            LevelEntity,
            surface,
            Mesh3d(meshes.add(Cuboid::new(size.x, size.y, size.z))),
            MeshMaterial3d(material),
            Transform::from_translation(center),
            RigidBody::Static,
            Collider::cuboid(size.x, size.y, size.z),
            GameLayer::level_geometry(),
        ))
        .id()
}

/// Spawns the level geometry, altar and door for the loaded layout.
fn build_level(
    mut commands: Commands,
    mut loaded: MessageReader<LevelLoaded>,
    world: Res<GameWorld>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if loaded.read().last().is_none() {
        return;
    }
    let layout = &world.layout;

    for block in &layout.blocks {
        let surface = block.surface();
        let material = materials.add(surface_material(surface));
        spawn_block(
            &mut commands,
            &mut meshes,
            material,
            block.shape.center(),
            block.shape.half_extents() * 2.0,
            surface,
        );
    }

    let altar_material = materials.add(surface_material(SurfaceKind::Altar));
    spawn_block(
        &mut commands,
        &mut meshes,
        altar_material,
        layout.altar.center(),
        layout.altar.half_extents() * 2.0,
        SurfaceKind::Altar,
    );

    // Two leaves hinged at the door frame, closing the gap in the wall
    let door = layout.door();
    let leaf_width = DOOR_WIDTH * 0.5;
    let leaf_mesh = meshes.add(Cuboid::new(leaf_width, DOOR_HEIGHT, 0.3));
    let leaf_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.3, 0.22, 0.15),
        perceptual_roughness: 0.8,
        ..default()
    });
    for side in [-1.0, 1.0] {
        commands
            .spawn((
                LevelEntity,
                DoorHinge {
                    side,
                    opened_at: None,
                },
                Transform::from_translation(door + Vec3::X * side * leaf_width),
                Visibility::default(),
            ))
            .with_child((
                DoorLeaf,
                SurfaceKind::Stone,
                Mesh3d(leaf_mesh.clone()),
                MeshMaterial3d(leaf_material.clone()),
                Transform::from_xyz(-side * leaf_width * 0.5, DOOR_HEIGHT * 0.5, 0.0),
                RigidBody::Static,
                Collider::cuboid(leaf_width, DOOR_HEIGHT, 0.3),
                GameLayer::level_geometry(),
            ));
    }

    info!(
        "Built level {} with {} blocks and {} enemies",
        layout.name,
        layout.blocks.len(),
        layout.enemies.len()
    );
}

/// Swaps the level when the quest asks for the next one.
fn switch_level(
    mut commands: Commands,
    mut messages: MessageReader<GameMessage>,
    catalog: Option<Res<LevelCatalog>>,
    mut world: ResMut<GameWorld>,
    level_entities: Query<Entity, With<LevelEntity>>,
    mut loaded: MessageWriter<LevelLoaded>,
) {
    let Some(next) = messages.read().find_map(|GameMessage(event)| match event {
        WorldEvent::LevelSwitchRequested(level) => Some(*level),
        _ => None,
    }) else {
        return;
    };
    let Some(catalog) = catalog else {
        warn!("No level catalog, cannot switch to level {next}");
        return;
    };
    let layout = match catalog.get(next) {
        Ok(layout) => layout.clone(),
        Err(err) => {
            warn!("{err}, staying on level {}", world.layout.id);
            return;
        }
    };

    for entity in &level_entities {
        commands.entity(entity).despawn();
    }
    info!("Loading level {} ({})", layout.id, layout.name);
    world.load_level(layout);
    loaded.write(LevelLoaded(next));
}

fn open_doors(
    mut commands: Commands,
    mut messages: MessageReader<GameMessage>,
    world: Res<GameWorld>,
    mut hinges: Query<&mut DoorHinge>,
    leaves: Query<Entity, With<DoorLeaf>>,
) {
    if !messages
        .read()
        .any(|GameMessage(event)| *event == WorldEvent::DoorsOpened)
    {
        return;
    }
    for mut hinge in &mut hinges {
        hinge.opened_at = Some(world.elapsed);
    }
    for leaf in &leaves {
        commands.entity(leaf).remove::<Collider>();
    }
}

/// Swings the leaves away from the altar side.
fn animate_doors(world: Res<GameWorld>, mut hinges: Query<(&DoorHinge, &mut Transform)>) {
    for (hinge, mut transform) in &mut hinges {
        let Some(opened_at) = hinge.opened_at else {
            continue;
        };
        let progress = smoothstep((world.elapsed - opened_at) / DOOR_OPEN_SECONDS);
        transform.rotation = Quat::from_rotation_y(hinge.side * FRAC_PI_2 * progress);
    }
}

fn play_quest_sounds(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut messages: MessageReader<GameMessage>,
) {
    for GameMessage(event) in messages.read() {
        let path = match event {
            WorldEvent::OrbsAppeared => "sounds/orb_appear.ogg",
            WorldEvent::PhaseAdvanced { .. } => "sounds/orb_collect.ogg",
            WorldEvent::DoorsOpened => "sounds/door_open.ogg",
            _ => continue,
        };
        commands.spawn((
            AudioPlayer::new(asset_server.load(path)),
            PlaybackSettings::DESPAWN,
        ));
    }
}

fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        HudStatus,
        Text::new(""),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        TextColor(Color::WHITE),
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.5)),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(10.0),
            left: Val::Px(10.0),
            padding: UiRect::all(Val::Px(8.0)),
            ..default()
        },
    ));

    commands
        .spawn(Node {
            position_type: PositionType::Absolute,
            top: Val::Px(60.0),
            width: Val::Percent(100.0),
            justify_content: JustifyContent::Center,
            ..default()
        })
        .with_child((
            HudBanner,
            Text::new(""),
            TextFont {
                font_size: 32.0,
                ..default()
            },
            TextColor(Color::WHITE),
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
            Node {
                padding: UiRect::axes(Val::Px(16.0), Val::Px(8.0)),
                ..default()
            },
            Visibility::Hidden,
        ));

    commands
        .spawn(Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(40.0),
            width: Val::Percent(100.0),
            justify_content: JustifyContent::Center,
            ..default()
        })
        .with_child((
            HudHint,
            Text::new(""),
            TextFont {
                font_size: 20.0,
                ..default()
            },
            TextColor(Color::srgb(1.0, 0.9, 0.5)),
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.5)),
            Node {
                padding: UiRect::axes(Val::Px(12.0), Val::Px(6.0)),
                ..default()
            },
            Visibility::Hidden,
        ));
}

fn update_hud(
    world: Res<GameWorld>,
    mut status: Query<&mut Text, (With<HudStatus>, Without<HudBanner>, Without<HudHint>)>,
    mut banner: Query<(&mut Text, &mut Visibility), (With<HudBanner>, Without<HudHint>)>,
    mut hint: Query<(&mut Text, &mut Visibility), (With<HudHint>, Without<HudBanner>)>,
) {
    let quest = &world.quest;

    if let Ok(mut text) = status.single_mut() {
        let progress = match quest.state() {
            QuestState::Collecting => format!("Orbs: {}/{}", world.collected_orbs(), ORB_COUNT),
            state => state.name().to_string(),
        };
        **text = format!("{}\n{}", world.layout.name, progress);
    }

    if let Ok((mut text, mut visibility)) = banner.single_mut() {
        match quest.banner(world.elapsed) {
            Some(message) => {
                **text = message.text().to_string();
                *visibility = Visibility::Inherited;
            }
            None => *visibility = Visibility::Hidden,
        }
    }

    if let Ok((mut text, mut visibility)) = hint.single_mut() {
        let message = if quest.jump_hint() {
            Some("Jump on the enemy to hurt it!")
        } else if quest.frequency_hint(world.elapsed) {
            Some("Collect the orbs in order: low, mid, high")
        } else {
            None
        };
        match message {
            Some(message) => {
                **text = message.to_string();
                *visibility = Visibility::Inherited;
            }
            None => *visibility = Visibility::Hidden,
        }
    }
}
