use bevy::audio::Volume;
use bevy::prelude::*;

use crate::world::GameWorld;

/// Quadratic falloff: full volume at the source, silent at `radius` and
/// beyond.
pub fn proximity_volume(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 || distance >= radius {
        return 0.0;
    }
    let falloff = (1.0 - distance / radius).max(0.0);
    falloff * falloff
}

/// Looping melody of the orb with this id
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrbMelody(pub usize);

/// Starts every melody muted so they stay in sync once audible.
pub fn spawn_orb_melodies(commands: &mut Commands, asset_server: &AssetServer, world: &GameWorld) {
    for orb in &world.orbs {
        commands.spawn((
            OrbMelody(orb.id),
            crate::quest::LevelEntity,
            AudioPlayer::new(asset_server.load(orb.phase().sound)),
            PlaybackSettings::LOOP.with_volume(Volume::SILENT),
        ));
    }
}

pub fn sync_orb_melody_volume(world: Res<GameWorld>, mut sinks: Query<(&OrbMelody, &mut AudioSink)>) {
    for (melody, mut sink) in &mut sinks {
        let volume = world.orb_volume(melody.0);
        sink.set_volume(Volume::Linear(volume));
    }
}
