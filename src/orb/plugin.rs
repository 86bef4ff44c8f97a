use bevy::asset::LoadState;
use bevy::prelude::*;

use super::audio::*;
use super::particles::{LayerEmitter, OrbParticle};
use super::visual::BlendMode;
use super::visual::*;
use crate::game::GameSet;
use crate::quest::{LevelEntity, LevelLoaded};
use crate::world::GameWorld;

pub const ORB_VISUAL_CONFIG: &str = "assets/orb_visual.json";
/// Halo size relative to the orb radius
const HALO_SCALE: f32 = 3.0;
/// Opacity steps each particle layer gets a material for
const ALPHA_STEPS: usize = 8;

/// Presentation of the orb with this id
#[derive(Component, Debug, Clone, Copy)]
pub struct OrbModel(pub usize);

/// Glow around an orb, tinted by the primary particle layer
#[derive(Component, Debug, Clone)]
pub struct OrbHalo(pub Handle<StandardMaterial>);

/// Spawn clocks of an orb, one per config layer
#[derive(Component, Debug, Default)]
pub struct OrbEmitters(pub Vec<LayerEmitter>);

/// Shared particle mesh and, per layer, one material per opacity step
#[derive(Resource, Debug)]
pub struct ParticleAssets {
    mesh: Handle<Mesh>,
    materials: Vec<Vec<Handle<StandardMaterial>>>,
}

impl ParticleAssets {
    fn material(&self, layer: usize, alpha: f32) -> Option<Handle<StandardMaterial>> {
        let step = ((alpha * ALPHA_STEPS as f32).ceil() as usize).clamp(1, ALPHA_STEPS) - 1;
        self.materials.get(layer)?.get(step).cloned()
    }
}

/// Sprite texture of the primary layer and what it resolved to
#[derive(Resource, Debug, Default)]
pub struct HaloTexture {
    pub image: Option<Handle<Image>>,
    pub source: Option<ParticleSource>,
}

pub struct OrbPlugin;

impl Plugin for OrbPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HaloTexture>();
        app.add_systems(Startup, (load_visual_config, build_particle_assets).chain());
        app.add_systems(
            Update,
            (
                spawn_orbs,
                resolve_halo_texture,
                sync_orbs,
                emit_orb_particles,
                age_orb_particles,
                sync_orb_melody_volume,
            )
                .chain()
                .in_set(GameSet::Sync),
        );
    }
}

/// Reads the authoring config, falling back to the built-in look.
fn load_visual_config(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut halo: ResMut<HaloTexture>,
) {
    let config = match OrbVisualConfig::load(ORB_VISUAL_CONFIG) {
        Ok(config) => config,
        Err(VisualConfigError::Io { path, .. }) => {
            debug!("No orb visual config at {path}, using defaults");
            OrbVisualConfig::default()
        }
        Err(err) => {
            warn!("{err}, using default orb visuals");
            OrbVisualConfig::default()
        }
    };

    if let Some(layer) = config.primary_layer()
        && let ParticleSource::Image(path) = layer.resolve_source(true)
    {
        halo.image = Some(asset_server.load(path));
    }
    commands.insert_resource(config);
}

fn build_particle_assets(
    mut commands: Commands,
    config: Res<OrbVisualConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // Unit diameter, so the transform scale is the particle size
    let mesh = meshes.add(Sphere::new(0.5).mesh().uv(8, 6));
    let materials = config
        .layers
        .iter()
        .map(|layer| {
            let color = layer.color();
            (1..=ALPHA_STEPS)
                .map(|step| {
                    materials.add(StandardMaterial {
                        base_color: color.with_alpha(step as f32 / ALPHA_STEPS as f32),
                        alpha_mode: match layer.blend_mode {
                            BlendMode::Add => AlphaMode::Add,
                            BlendMode::Normal => AlphaMode::Blend,
                        },
                        unlit: true,
                        ..default()
                    })
                })
                .collect()
        })
        .collect();
    commands.insert_resource(ParticleAssets { mesh, materials });
}

fn spawn_orbs(
    mut commands: Commands,
    mut loaded: MessageReader<LevelLoaded>,
    world: Res<GameWorld>,
    config: Res<OrbVisualConfig>,
    halo_texture: Res<HaloTexture>,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if loaded.read().last().is_none() || !world.layout.has_orbs {
        return;
    }

    let radius = config.orb.radius;
    let sphere = meshes.add(Sphere::new(radius));
    let halo_mesh = meshes.add(Sphere::new(radius * HALO_SCALE));
    let layer = config.primary_layer();

    for orb in &world.orbs {
        let phase_color = orb.phase().color();
        let orb_color = config
            .orb
            .color
            .as_deref()
            .and_then(parse_color)
            .unwrap_or(phase_color);
        let light_color = config
            .light
            .color
            .as_deref()
            .and_then(parse_color)
            .unwrap_or(phase_color);

        let orb_material = materials.add(StandardMaterial {
            base_color: orb_color,
            emissive: LinearRgba::from(orb_color) * 4.0,
            alpha_mode: if config.orb.is_additive() {
                AlphaMode::Add
            } else {
                AlphaMode::Opaque
            },
            ..default()
        });

        let halo_material = layer.map(|layer| {
            let tint = layer.color().with_alpha(layer.alpha.start * layer.global_opacity * 0.35);
            materials.add(StandardMaterial {
                base_color: tint,
                base_color_texture: halo_texture.image.clone(),
                emissive: LinearRgba::from(phase_color),
                alpha_mode: match layer.blend_mode {
                    BlendMode::Add => AlphaMode::Add,
                    BlendMode::Normal => AlphaMode::Blend,
                },
                unlit: true,
                ..default()
            })
        });

        commands
            .spawn((
                LevelEntity,
                OrbModel(orb.id),
                Mesh3d(sphere.clone()),
                MeshMaterial3d(orb_material),
                OrbEmitters(vec![LayerEmitter::default(); config.layers.len()]),
                Transform::from_translation(orb.position),
                Visibility::Hidden,
            ))
            .with_children(|parent| {
                parent.spawn(PointLight {
                    color: light_color,
                    intensity: config.light.intensity * 1000.0,
                    range: 8.0,
                    ..default()
                });
                if let Some(material) = halo_material {
                    parent.spawn((
                        OrbHalo(material.clone()),
                        Mesh3d(halo_mesh.clone()),
                        MeshMaterial3d(material),
                    ));
                }
            });
    }

    spawn_orb_melodies(&mut commands, &asset_server, &world);
}

/// Drops the halo sprite if its image failed to load.
fn resolve_halo_texture(
    asset_server: Res<AssetServer>,
    config: Res<OrbVisualConfig>,
    mut halo_texture: ResMut<HaloTexture>,
    halos: Query<&OrbHalo>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let (Some(image), None) = (&halo_texture.image, &halo_texture.source) else {
        return;
    };
    let image_loaded = match asset_server.load_state(image) {
        LoadState::Loaded => true,
        LoadState::Failed(_) => false,
        _ => return,
    };
    let Some(layer) = config.primary_layer() else {
        return;
    };

    let source = layer.resolve_source(image_loaded);
    if let ParticleSource::Generator(kind) = source {
        warn!("Orb particle image failed to load, using the {kind:?} generator");
        for halo in &halos {
            if let Some(material) = materials.get_mut(&halo.0) {
                material.base_color_texture = None;
            }
        }
    }
    halo_texture.source = Some(source);
}

fn sync_orbs(world: Res<GameWorld>, mut models: Query<(&OrbModel, &mut Transform, &mut Visibility)>) {
    for (model, mut transform, mut visibility) in &mut models {
        let Some(orb) = world.orbs.get(model.0) else {
            continue;
        };
        transform.translation = orb.position;
        let wanted = if orb.is_visible() {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        visibility.set_if_neq(wanted);
    }
}

/// Trails particles behind every orb that is showing.
fn emit_orb_particles(
    mut commands: Commands,
    time: Res<Time>,
    world: Res<GameWorld>,
    config: Res<OrbVisualConfig>,
    assets: Res<ParticleAssets>,
    mut orbs: Query<(&OrbModel, &mut OrbEmitters)>,
) {
    let mut rng = rand::thread_rng();
    for (model, mut emitters) in &mut orbs {
        let Some(orb) = world.orbs.get(model.0) else {
            continue;
        };
        let layers = config.layers.iter().zip(emitters.0.iter_mut()).enumerate();
        for (index, (layer, emitter)) in layers {
            let origins = emitter.emit(layer, time.delta_secs(), orb.position, orb.is_visible());
            for origin in origins {
                let (particle, position) = OrbParticle::spawn(index, layer, origin, &mut rng);
                let Some(material) = assets.material(index, particle.alpha(layer)) else {
                    continue;
                };
                commands.spawn((
                    LevelEntity,
                    particle,
                    Mesh3d(assets.mesh.clone()),
                    MeshMaterial3d(material),
                    Transform::from_translation(position).with_scale(Vec3::splat(layer.scale.start)),
                ));
            }
        }
    }
}

/// Moves particles, fades them along their layer ramps and drops the dead.
fn age_orb_particles(
    mut commands: Commands,
    time: Res<Time>,
    config: Res<OrbVisualConfig>,
    assets: Res<ParticleAssets>,
    mut particles: Query<(
        Entity,
        &mut OrbParticle,
        &mut Transform,
        &mut MeshMaterial3d<StandardMaterial>,
    )>,
) {
    for (entity, mut particle, mut transform, mut material) in &mut particles {
        let Some(layer) = config.layers.get(particle.layer) else {
            commands.entity(entity).try_despawn();
            continue;
        };
        if !particle.advance(layer, time.delta_secs(), &mut transform.translation) {
            commands.entity(entity).try_despawn();
            continue;
        }
        transform.scale = Vec3::splat(particle.scale(layer));
        if let Some(faded) = assets.material(particle.layer, particle.alpha(layer))
            && faded != material.0
        {
            material.0 = faded;
        }
    }
}
