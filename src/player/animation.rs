use std::time::Duration;

use bevy::gltf::Gltf;
use bevy::prelude::*;

use super::state::*;
use crate::world::GameWorld;

pub const PLAYER_MODEL: &str = "models/player.glb";
const CROSSFADE: Duration = Duration::from_millis(150);

/// Handle to the player model, kept to look up its named clips
#[derive(Resource)]
pub struct PlayerModel(pub Handle<Gltf>);

#[derive(Debug, Clone, Copy, Default)]
struct ClipNodes {
    idle: Option<AnimationNodeIndex>,
    walk: Option<AnimationNodeIndex>,
    run: Option<AnimationNodeIndex>,
    jump: Option<AnimationNodeIndex>,
}

impl ClipNodes {
    fn get(&self, anim: PlayerAnim) -> Option<AnimationNodeIndex> {
        match anim {
            PlayerAnim::Idle => self.idle,
            PlayerAnim::Walk => self.walk,
            PlayerAnim::Run => self.run,
            PlayerAnim::Jump => self.jump,
        }
    }
}

/// Links the player to the `AnimationPlayer` inside its model scene
#[derive(Component, Debug)]
pub struct PlayerAnimationLink {
    animation_player: Entity,
    nodes: ClipNodes,
    clips: AvailableClips,
    current: Option<PlayerAnim>,
}

/// Builds the clip graph once the model and its `AnimationPlayer` exist.
pub fn link_player_animations(
    mut commands: Commands,
    model: Res<PlayerModel>,
    gltfs: Res<Assets<Gltf>>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
    players: Query<Entity, (With<Player>, Without<PlayerAnimationLink>)>,
    children: Query<&Children>,
    animation_players: Query<Entity, With<AnimationPlayer>>,
) {
    let Ok(player) = players.single() else {
        return;
    };
    let Some(gltf) = gltfs.get(&model.0) else {
        return;
    };
    let Some(animation_player) = children
        .iter_descendants(player)
        .find(|entity| animation_players.contains(*entity))
    else {
        return;
    };

    let mut graph = AnimationGraph::new();
    let mut add = |name: &str| {
        gltf.named_animations
            .get(name)
            .map(|clip| graph.add_clip(clip.clone(), 1.0, graph.root))
    };
    let nodes = ClipNodes {
        idle: add("Idle"),
        walk: add("Walk"),
        run: add("Run"),
        jump: add("Jump"),
    };
    if nodes.idle.is_none() || nodes.run.is_none() {
        warn!("Player model has no Idle/Run clips, animation disabled");
    }

    commands.entity(animation_player).insert((
        AnimationGraphHandle(graphs.add(graph)),
        AnimationTransitions::new(),
    ));
    commands.entity(player).insert(PlayerAnimationLink {
        animation_player,
        nodes,
        clips: AvailableClips {
            walk: nodes.walk.is_some(),
            jump: nodes.jump.is_some(),
        },
        current: None,
    });
}

/// Crossfades to the clip the state machine selected and scales its speed.
pub fn drive_player_animation(
    world: Res<GameWorld>,
    mut links: Query<&mut PlayerAnimationLink, With<Player>>,
    mut animation_players: Query<(&mut AnimationPlayer, &mut AnimationTransitions)>,
) {
    let Ok(mut link) = links.single_mut() else {
        return;
    };
    let Ok((mut player, mut transitions)) = animation_players.get_mut(link.animation_player) else {
        return;
    };

    let anim = world.player.anim.resolve(&link.clips);
    let Some(node) = link.nodes.get(anim) else {
        return;
    };

    if link.current != Some(anim) {
        let active = transitions.play(&mut player, node, CROSSFADE);
        if anim != PlayerAnim::Jump {
            active.repeat();
        }
        link.current = Some(anim);
    }
    if let Some(active) = player.animation_mut(node) {
        active.set_speed(world.player.anim_time_scale);
    }
}
