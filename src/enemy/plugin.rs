use bevy::audio::Volume;
use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use super::laser::Laser;
use crate::game::{GameMessage, GameSet};
use crate::quest::{LevelEntity, LevelLoaded};
use crate::world::{GameWorld, WorldEvent};

const FLASH_EMISSIVE: LinearRgba = LinearRgba::rgb(4.0, 4.0, 4.0);

/// Presentation of the enemy at this index in the world
#[derive(Component, Debug, Clone, Copy)]
pub struct EnemyModel(pub usize);

/// Material the hit flash is drawn with
#[derive(Component, Debug, Clone)]
pub struct EnemyFlash(pub Handle<StandardMaterial>);

/// Presentation of the laser with this id
#[derive(Component, Debug, Clone, Copy)]
pub struct LaserBeam(pub u64);

/// Shared unit-length beam, stretched along Z per laser
#[derive(Resource)]
struct LaserAssets {
    mesh: Handle<Mesh>,
    material: Handle<StandardMaterial>,
}

pub struct EnemyPlugin;

impl Plugin for EnemyPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_laser_assets);
        app.add_systems(
            Update,
            (spawn_enemies, sync_enemies, sync_lasers, play_laser_sounds)
                .chain()
                .in_set(GameSet::Sync),
        );
    }
}

fn setup_laser_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(LaserAssets {
        mesh: meshes.add(Cuboid::new(0.08, 0.08, 1.0)),
        material: materials.add(StandardMaterial {
            base_color: Color::srgb(1.0, 0.1, 0.1),
            emissive: LinearRgba::rgb(8.0, 0.2, 0.2),
            unlit: true,
            ..default()
        }),
    });
}

fn spawn_enemies(
    mut commands: Commands,
    mut loaded: MessageReader<LevelLoaded>,
    world: Res<GameWorld>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if loaded.read().last().is_none() {
        return;
    }
    let body_mesh = meshes.add(Sphere::new(0.8));
    let wing_mesh = meshes.add(Cuboid::new(2.6, 0.08, 0.7));

    for (index, enemy) in world.enemies.iter().enumerate() {
        let material = materials.add(StandardMaterial {
            base_color: Color::srgb(0.25, 0.25, 0.3),
            metallic: 0.6,
            perceptual_roughness: 0.4,
            ..default()
        });
        commands
            .spawn((
                LevelEntity,
                EnemyModel(index),
                EnemyFlash(material.clone()),
                Transform::from_translation(enemy.render_position())
                    .with_rotation(enemy.render_rotation()),
                Visibility::default(),
            ))
            .with_children(|parent| {
                parent.spawn((
                    Mesh3d(body_mesh.clone()),
                    MeshMaterial3d(material.clone()),
                    Transform::from_scale(Vec3::new(1.0, 0.5, 1.4)),
                ));
                parent.spawn((
                    Mesh3d(wing_mesh.clone()),
                    MeshMaterial3d(material),
                    Transform::from_xyz(0.0, 0.1, -0.2),
                ));
            });
    }
}

/// Moves enemy models and removes the ones that died.
fn sync_enemies(
    mut commands: Commands,
    world: Res<GameWorld>,
    mut models: Query<(Entity, &EnemyModel, &EnemyFlash, &mut Transform)>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (entity, model, flash, mut transform) in &mut models {
        let Some(enemy) = world.enemies.get(model.0) else {
            warn!("Enemy model {} has no enemy, removing it", model.0);
            commands.entity(entity).try_despawn();
            continue;
        };
        if !enemy.is_alive() {
            commands.entity(entity).try_despawn();
            continue;
        }

        transform.translation = enemy.render_position();
        transform.rotation = enemy.render_rotation();

        let emissive = if enemy.flash > 0.0 {
            FLASH_EMISSIVE
        } else {
            LinearRgba::BLACK
        };
        if let Some(material) = materials.get_mut(&flash.0)
            && material.emissive != emissive
        {
            material.emissive = emissive;
        }
    }
}

fn beam_transform(laser: &Laser) -> Transform {
    Transform::from_translation(laser.center)
        .with_rotation(laser.rotation())
        .with_scale(Vec3::new(1.0, 1.0, laser.length))
}

/// Keeps one beam entity per live laser.
fn sync_lasers(
    mut commands: Commands,
    world: Res<GameWorld>,
    assets: Res<LaserAssets>,
    mut beams: Query<(Entity, &LaserBeam, &mut Transform)>,
) {
    let mut live: HashMap<u64, &Laser> = world
        .enemies
        .iter()
        .flat_map(|enemy| enemy.lasers.iter())
        .map(|laser| (laser.id, laser))
        .collect();

    for (entity, beam, mut transform) in &mut beams {
        match live.remove(&beam.0) {
            Some(laser) => *transform = beam_transform(laser),
            None => commands.entity(entity).try_despawn(),
        }
    }

    for (id, laser) in live {
        commands.spawn((
            LevelEntity,
            LaserBeam(id),
            Mesh3d(assets.mesh.clone()),
            MeshMaterial3d(assets.material.clone()),
            beam_transform(laser),
        ));
    }
}

fn play_laser_sounds(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut messages: MessageReader<GameMessage>,
) {
    // One shot per frame, however many enemies fired
    let fired = messages
        .read()
        .filter(|GameMessage(event)| matches!(event, WorldEvent::LaserFired { .. }))
        .count();
    if fired == 0 {
        return;
    }
    commands.spawn((
        AudioPlayer::new(asset_server.load("sounds/laser.ogg")),
        PlaybackSettings::DESPAWN.with_volume(Volume::Linear(0.4)),
    ));
}
