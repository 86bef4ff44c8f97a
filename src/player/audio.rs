use bevy::audio::Volume;
use bevy::prelude::*;

use super::state::*;
use crate::game::GameMessage;
use crate::world::{GameWorld, WorldEvent};

const FOOTSTEP_VOLUME: f32 = 0.6;

impl SurfaceSound {
    pub fn path(self) -> &'static str {
        match self {
            Self::Grass => "sounds/footstep_grass.ogg",
            Self::Stone => "sounds/footstep_stone.ogg",
        }
    }
}

/// One of the two footstep loops. At most one is unpaused.
#[derive(Component, Debug, Clone, Copy)]
pub struct FootstepLoop(pub SurfaceSound);

pub fn spawn_footstep_loops(mut commands: Commands, asset_server: Res<AssetServer>) {
    for sound in [SurfaceSound::Grass, SurfaceSound::Stone] {
        commands.spawn((
            FootstepLoop(sound),
            AudioPlayer::new(asset_server.load(sound.path())),
            PlaybackSettings::LOOP
                .paused()
                .with_volume(Volume::Linear(FOOTSTEP_VOLUME)),
        ));
    }
}

/// Plays the loop matching the current footstep cue and pauses the other.
pub fn sync_footsteps(world: Res<GameWorld>, mut loops: Query<(&FootstepLoop, &mut AudioSink)>) {
    let cue = world.player.footsteps;

    for (footstep, mut sink) in &mut loops {
        match cue {
            Some(cue) if cue.sound == footstep.0 => {
                sink.set_speed(cue.rate);
                if sink.is_paused() {
                    sink.play();
                }
            }
            _ => {
                if !sink.is_paused() {
                    sink.pause();
                }
            }
        }
    }
}

/// One-shot player sounds
pub fn play_player_sounds(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut messages: MessageReader<GameMessage>,
) {
    for GameMessage(event) in messages.read() {
        let path = match event {
            WorldEvent::PlayerJumped => "sounds/jump.ogg",
            WorldEvent::PlayerLanded => "sounds/land.ogg",
            WorldEvent::PlayerHit => "sounds/hurt.ogg",
            _ => continue,
        };
        commands.spawn((
            AudioPlayer::new(asset_server.load(path)),
            PlaybackSettings::DESPAWN,
        ));
    }
}
