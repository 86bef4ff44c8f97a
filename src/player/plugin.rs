use std::hash::Hash;

use bevy::platform::collections::HashMap;
use bevy::prelude::*;
use bevy_enhanced_input::prelude::*;

use super::animation::*;
use super::audio::*;
use super::input::*;
use super::state::*;
use crate::game::GameSet;
use crate::orb::OrbState;
use crate::world::GameWorld;

const BODY_RADIUS: f32 = 0.4;
const BODY_HEIGHT: f32 = 1.8;
const BLINK_EMISSIVE: LinearRgba = LinearRgba::rgb(1.5, 0.1, 0.1);
/// Editor orb speed in units per second
const ORB_NUDGE_SPEED: f32 = 3.0;

/// Child entity turned by the visual yaw; the model and body live under it
#[derive(Component, Debug, Default)]
pub struct PlayerVisual;

/// Stand-in capsule, hidden once the model scene is linked
#[derive(Component, Debug, Default)]
pub struct PlayerBody;

/// Parked orb the editor keys move
#[derive(Resource, Debug, Default)]
pub struct OrbEditorSelection(pub Option<usize>);

/// Plugin for the third-person player: input, presentation and audio
pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EnhancedInputPlugin);

        // Register input context for player
        app.add_input_context::<Player>();

        // Input observers
        app.add_observer(handle_move_input);
        app.add_observer(handle_move_end);
        app.add_observer(handle_look_input);
        app.add_observer(handle_jump_start);
        app.add_observer(handle_drag_start);
        app.add_observer(handle_drag_end);
        app.add_observer(handle_editor_toggle);
        app.add_observer(handle_editor_select);
        app.add_observer(handle_editor_nudge);
        app.add_observer(handle_editor_nudge_end);
        app.add_observer(handle_editor_lift);
        app.add_observer(handle_editor_lift_end);

        app.init_resource::<OrbEditorSelection>();
        app.add_systems(Startup, (spawn_player, spawn_footstep_loops));
        app.add_systems(
            Update,
            (toggle_orb_editor, edit_parked_orbs)
                .chain()
                .in_set(GameSet::Input),
        );
        app.add_systems(
            Update,
            (
                sync_player_transform,
                link_player_animations,
                drive_player_animation,
                apply_damage_blink,
                sync_footsteps,
                play_player_sounds,
            )
                .chain()
                .in_set(GameSet::Sync),
        );

        // One-frame inputs are cleared once everything has read them
        app.add_systems(Last, clear_frame_input);
    }
}

/// Spawns the player entity with its input bindings and visuals
pub fn spawn_player(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(PlayerModel(asset_server.load(PLAYER_MODEL)));

    let body = (
        PlayerBody,
        Mesh3d(meshes.add(Capsule3d::new(BODY_RADIUS, BODY_HEIGHT - BODY_RADIUS * 2.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.85, 0.8, 0.7),
            perceptual_roughness: 0.7,
            ..default()
        })),
        Transform::from_xyz(0.0, BODY_HEIGHT * 0.5, 0.0),
    );
    let model = SceneRoot(asset_server.load(GltfAssetLabel::Scene(0).from_asset(PLAYER_MODEL)));

    commands
        .spawn((
            Player,
            // Input state
            MoveInput::default(),
            LookInput::default(),
            JumpPressed::default(),
            DragHeld::default(),
            EditorToggled::default(),
            EditorSelect::default(),
            EditorNudge::default(),
            EditorLift::default(),
            Transform::default(),
            Visibility::default(),
        ))
        .with_children(|parent| {
            parent
                .spawn((PlayerVisual, Transform::default(), Visibility::default()))
                .with_children(|visual| {
                    visual.spawn(body);
                    visual.spawn(model);
                });
        })
        .insert(
            // Input bindings
            actions!(Player[
                (
                    Action::<MoveAction>::new(),
                    bindings![
                        (KeyCode::KeyW, SwizzleAxis::YXZ),
                        (KeyCode::KeyS, SwizzleAxis::YXZ, Negate::all()),
                        KeyCode::KeyD,
                        (KeyCode::KeyA, Negate::all()),
                        (KeyCode::ArrowUp, SwizzleAxis::YXZ),
                        (KeyCode::ArrowDown, SwizzleAxis::YXZ, Negate::all()),
                        KeyCode::ArrowRight,
                        (KeyCode::ArrowLeft, Negate::all()),
                    ],
                ),
                (
                    Action::<LookAction>::new(),
                    bindings![
                        Binding::mouse_motion(),
                    ],
                ),
                (
                    Action::<JumpAction>::new(),
                    bindings![KeyCode::Space, GamepadButton::South],
                ),
                (
                    Action::<DragAction>::new(),
                    bindings![MouseButton::Left],
                ),
                (
                    Action::<EditorAction>::new(),
                    bindings![KeyCode::F2],
                ),
                (
                    Action::<EditorSelectAction>::new(),
                    bindings![KeyCode::Tab],
                ),
                (
                    Action::<EditorNudgeAction>::new(),
                    bindings![
                        (KeyCode::KeyI, SwizzleAxis::YXZ),
                        (KeyCode::KeyK, SwizzleAxis::YXZ, Negate::all()),
                        KeyCode::KeyL,
                        (KeyCode::KeyJ, Negate::all()),
                    ],
                ),
                (
                    Action::<EditorLiftAction>::new(),
                    bindings![KeyCode::KeyO, (KeyCode::KeyU, Negate::all())],
                ),
            ]),
        );
}

fn toggle_orb_editor(mut world: ResMut<GameWorld>, query: Query<&EditorToggled, With<Player>>) {
    let Ok(toggled) = query.single() else {
        return;
    };
    if !toggled.0 {
        return;
    }
    if world.is_editor_override() {
        for orb in world.orbs.iter().filter(|orb| orb.state == OrbState::EditorOverride) {
            info!("Orb {} parked at {}", orb.id, orb.position);
        }
    }
    if world.toggle_editor_override() {
        info!("Orb editor override on");
    } else {
        info!("Orb editor override off");
    }
}

/// Tab picks the next parked orb; IJKL move it along X and Z, O and U along Y.
fn edit_parked_orbs(
    time: Res<Time>,
    mut world: ResMut<GameWorld>,
    mut selection: ResMut<OrbEditorSelection>,
    query: Query<(&EditorSelect, &EditorNudge, &EditorLift), With<Player>>,
) {
    if !world.is_editor_override() {
        selection.0 = None;
        return;
    }
    let Ok((select, nudge, lift)) = query.single() else {
        return;
    };

    if select.0 || selection.0.is_none() {
        selection.0 = world.next_parked_orb(selection.0);
        if let Some(id) = selection.0 {
            info!("Orb editor: orb {id} selected");
        }
    }
    let Some(id) = selection.0 else {
        return;
    };

    let delta = Vec3::new(nudge.x, lift.0, nudge.y) * ORB_NUDGE_SPEED * time.delta_secs();
    if delta != Vec3::ZERO && world.nudge_orb(id, delta).is_none() {
        warn!("Orb {id} is no longer parked");
        selection.0 = None;
    }
}

fn sync_player_transform(
    world: Res<GameWorld>,
    mut players: Query<&mut Transform, With<Player>>,
    mut visuals: Query<&mut Transform, (With<PlayerVisual>, Without<Player>)>,
) {
    let Ok(mut transform) = players.single_mut() else {
        return;
    };
    transform.translation = world.player.position();
    transform.rotation = world.player.rotation();

    if let Ok(mut visual) = visuals.single_mut() {
        visual.rotation = Quat::from_rotation_y(world.player.visual_yaw);
    }
}

/// Emissive colour each player material had before the blink touched it
struct BaseEmissive<K>(HashMap<K, LinearRgba>);

impl<K> Default for BaseEmissive<K> {
    fn default() -> Self {
        Self(HashMap::default())
    }
}

impl<K: Eq + Hash> BaseEmissive<K> {
    /// The highlight while lit, the material's first seen colour otherwise
    fn resolve(&mut self, key: K, current: LinearRgba, lit: bool) -> LinearRgba {
        let base = *self.0.entry(key).or_insert(current);
        if lit { BLINK_EMISSIVE } else { base }
    }
}

/// Alternates an emissive highlight on every mesh under the player while
/// the damage blink runs.
fn apply_damage_blink(
    world: Res<GameWorld>,
    players: Query<Entity, With<Player>>,
    children: Query<&Children>,
    meshes: Query<&MeshMaterial3d<StandardMaterial>>,
    mut bodies: Query<&mut Visibility, With<PlayerBody>>,
    links: Query<(), With<PlayerAnimationLink>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut base: Local<BaseEmissive<AssetId<StandardMaterial>>>,
) {
    let Ok(player) = players.single() else {
        return;
    };

    if let Ok(mut visibility) = bodies.single_mut() {
        let linked = links.contains(player);
        let wanted = if linked { Visibility::Hidden } else { Visibility::Inherited };
        visibility.set_if_neq(wanted);
    }

    let lit = world.player.blink_lit();
    for entity in children.iter_descendants(player) {
        let Ok(handle) = meshes.get(entity) else {
            continue;
        };
        let Some(current) = materials.get(&handle.0).map(|material| material.emissive) else {
            continue;
        };
        let emissive = base.resolve(handle.id(), current, lit);
        if emissive != current
            && let Some(material) = materials.get_mut(&handle.0)
        {
            material.emissive = emissive;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blink_restores_each_material_emissive() {
        let glowing = LinearRgba::rgb(0.2, 0.6, 1.0);
        let mut base = BaseEmissive::default();

        assert_eq!(base.resolve(1, glowing, false), glowing);
        assert_eq!(base.resolve(2, LinearRgba::BLACK, true), BLINK_EMISSIVE);
        assert_eq!(base.resolve(1, BLINK_EMISSIVE, true), BLINK_EMISSIVE);

        // Once the blink ends both go back to what they started with
        assert_eq!(base.resolve(1, BLINK_EMISSIVE, false), glowing);
        assert_eq!(base.resolve(2, BLINK_EMISSIVE, false), LinearRgba::BLACK);
    }
}
