use avian3d::prelude::*;
use bevy::prelude::*;

/// Collision layers for the level geometry
#[derive(PhysicsLayer, Default)]
pub enum GameLayer {
    #[default]
    Default,
    /// Walkable and blocking level geometry, the only layer actors probe
    World,
}

impl GameLayer {
    /// Membership of a static level collider
    pub fn level_geometry() -> CollisionLayers {
        CollisionLayers::new(GameLayer::World, [GameLayer::Default])
    }
}

/// Plugin that sets up the Avian3D spatial query pipeline.
///
/// Actors are integrated kinematically by [`super::motion`], so Avian only
/// has to keep the static level colliders queryable.
pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(
            PhysicsPlugins::default()
                .with_length_unit(1.0), // 1 unit = 1 meter
        );

        // Nothing in the level is a dynamic body
        app.insert_resource(Gravity(Vec3::ZERO));
    }
}
