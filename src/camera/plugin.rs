use bevy::prelude::*;

use crate::game::GameSet;
use crate::world::GameWorld;

/// Offset of the sun from the point it lights
const SUN_OFFSET: Vec3 = Vec3::new(20.0, 40.0, -20.0);

/// Marker for the third-person camera driven by the world's camera rig
#[derive(Component, Debug, Default)]
pub struct GameCamera;

/// Directional light that follows the player along the level
#[derive(Component, Debug, Default)]
pub struct Sun;

/// Plugin for the third-person camera and scene lighting
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_camera);
        app.add_systems(
            Update,
            (sync_camera_to_rig, follow_sun).chain().in_set(GameSet::Sync),
        );
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        GameCamera,
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: 60.0_f32.to_radians(),
            ..default()
        }),
        AmbientLight {
            color: Color::srgb(0.6, 0.7, 0.9),
            brightness: 350.0,
            affects_lightmapped_meshes: true,
        },
        Transform::from_xyz(0.0, 4.0, -6.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Sun,
        DirectionalLight {
            illuminance: 14000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_translation(SUN_OFFSET).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn sync_camera_to_rig(world: Res<GameWorld>, mut cameras: Query<&mut Transform, With<GameCamera>>) {
    let Ok(mut transform) = cameras.single_mut() else {
        return;
    };
    transform.translation = world.camera.position;
    transform.rotation = world.camera.rotation();
}

/// Keeps the shadow frustum centred on the player's stretch of the level.
fn follow_sun(world: Res<GameWorld>, mut suns: Query<&mut Transform, With<Sun>>) {
    let Ok(mut transform) = suns.single_mut() else {
        return;
    };
    let target = Vec3::new(0.0, 0.0, world.player.position().z);
    *transform = Transform::from_translation(target + SUN_OFFSET).looking_at(target, Vec3::Y);
}
