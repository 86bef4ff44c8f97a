pub mod camera;
pub mod enemy;
pub mod game;
pub mod orb;
pub mod physics;
pub mod player;
pub mod quest;
pub mod world;

pub use camera::CameraPlugin;
pub use enemy::EnemyPlugin;
pub use orb::OrbPlugin;
pub use physics::PhysicsPlugin;
pub use player::PlayerPlugin;
pub use quest::QuestPlugin;

use bevy::prelude::*;

use game::{GameMessage, GameSet, WorldSeed};

/// Unified plugin that adds the world simulation and every presentation plugin.
pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<PhysicsPlugin>() {
            app.add_plugins(PhysicsPlugin);
        }
        if !app.is_plugin_added::<PlayerPlugin>() {
            app.add_plugins(PlayerPlugin);
        }
        if !app.is_plugin_added::<CameraPlugin>() {
            app.add_plugins(CameraPlugin);
        }
        app.add_plugins((EnemyPlugin, OrbPlugin, QuestPlugin));

        app.add_message::<GameMessage>();
        app.init_resource::<WorldSeed>();

        app.configure_sets(
            Update,
            (GameSet::Input, GameSet::Advance, GameSet::Level, GameSet::Sync).chain(),
        );

        app.add_systems(Startup, game::setup_world);
        app.add_systems(Update, game::unlock_audio.in_set(GameSet::Input));
        app.add_systems(Update, game::advance_world.in_set(GameSet::Advance));
    }
}

pub mod prelude {
    pub use crate::GamePlugin;
    pub use crate::camera::{CameraPlugin, CameraRig, GameCamera};
    pub use crate::enemy::{Enemy, EnemyConfig, EnemyPlugin, EnemyState};
    pub use crate::game::{GameMessage, GameSet, WorldSeed};
    pub use crate::orb::{ORB_COUNT, Orb, OrbPlugin, OrbState};
    pub use crate::physics::{GameLayer, PhysicsPlugin, SpatialProbe, SurfaceKind};
    pub use crate::player::{Player, PlayerConfig, PlayerController, PlayerPlugin};
    pub use crate::quest::{LevelCatalog, LevelLayout, QuestDirector, QuestPlugin, QuestState};
    pub use crate::world::{GameWorld, WorldConfig, WorldEvent, WorldInput};
}
