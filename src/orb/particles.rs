//! Particle trails behind the orbs, one emitter per configured layer.

use std::f32::consts::TAU;

use bevy::math::FloatExt;
use bevy::prelude::*;
use rand::prelude::*;

use super::visual::ParticleLayer;

/// Longest step a particle takes, so a stalled frame does not fling the trail
pub const MAX_PARTICLE_STEP: f32 = 0.1;

/// Spawn clock of one layer on one orb
#[derive(Debug, Clone, Default)]
pub struct LayerEmitter {
    spawn_timer: f32,
    previous: Option<Vec3>,
}

impl LayerEmitter {
    /// Spawn points for this step. Several spawns in one step are spread
    /// along the line from last step's emitter position to `position`.
    pub fn emit(&mut self, layer: &ParticleLayer, dt: f32, position: Vec3, emitting: bool) -> Vec<Vec3> {
        let start = *self.previous.get_or_insert(position);
        self.previous = Some(position);
        if !emitting || !layer.enabled || layer.emission_rate <= 0.0 {
            return Vec::new();
        }

        let interval = layer.emission_rate.recip();
        self.spawn_timer += dt.min(MAX_PARTICLE_STEP);
        let count = (self.spawn_timer / interval).floor() as usize;
        self.spawn_timer -= count as f32 * interval;

        (1..=count)
            .map(|i| start.lerp(position, i as f32 / count as f32))
            .collect()
    }
}

/// A live particle of layer `layer`
#[derive(Component, Debug, Clone, PartialEq)]
pub struct OrbParticle {
    pub layer: usize,
    pub velocity: Vec3,
    pub age: f32,
    pub life: f32,
}

impl OrbParticle {
    /// A particle somewhere inside the layer's spawn sphere around `origin`,
    /// heading off in a random direction. Returns it with its start position.
    pub fn spawn(layer_index: usize, layer: &ParticleLayer, origin: Vec3, rng: &mut impl Rng) -> (Self, Vec3) {
        let life = layer.life.min + rng.r#gen::<f32>() * (layer.life.max - layer.life.min);
        let offset = random_direction(rng) * rng.r#gen::<f32>() * layer.spawn_radius;
        let speed = layer.speed.value + rng.r#gen::<f32>() * layer.speed.random;

        let particle = Self {
            layer: layer_index,
            velocity: random_direction(rng) * speed,
            age: 0.0,
            life,
        };
        (particle, origin + offset)
    }

    /// Ages the particle and moves `position`. Returns false once it has
    /// outlived its life.
    pub fn advance(&mut self, layer: &ParticleLayer, dt: f32, position: &mut Vec3) -> bool {
        let dt = dt.min(MAX_PARTICLE_STEP);
        self.age += dt;
        if self.age >= self.life {
            return false;
        }
        self.velocity.x += layer.gravity.x * dt;
        self.velocity.y += layer.gravity.y * dt;
        *position += self.velocity * dt;
        true
    }

    fn progress(&self) -> f32 {
        if self.life > 0.0 { (self.age / self.life).clamp(0.0, 1.0) } else { 1.0 }
    }

    pub fn scale(&self, layer: &ParticleLayer) -> f32 {
        layer.scale.start.lerp(layer.scale.end, self.progress())
    }

    pub fn alpha(&self, layer: &ParticleLayer) -> f32 {
        layer.alpha.start.lerp(layer.alpha.end, self.progress()) * layer.global_opacity
    }
}

/// Uniform direction on the unit sphere
fn random_direction(rng: &mut impl Rng) -> Vec3 {
    let theta = rng.gen_range(0.0..TAU);
    let cos_phi = rng.gen_range(-1.0..=1.0f32);
    let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
    Vec3::new(sin_phi * theta.cos(), sin_phi * theta.sin(), cos_phi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orb::visual::{Gravity2, LifeRange, Ramp, SpeedRange};
    use rand::rngs::StdRng;

    fn layer() -> ParticleLayer {
        ParticleLayer {
            emission_rate: 10.0,
            life: LifeRange { min: 0.5, max: 1.0 },
            speed: SpeedRange {
                value: 1.0,
                random: 0.5,
            },
            scale: Ramp {
                start: 0.4,
                end: 0.0,
            },
            alpha: Ramp {
                start: 1.0,
                end: 0.2,
            },
            global_opacity: 0.5,
            spawn_radius: 0.3,
            ..default()
        }
    }

    #[test]
    fn emission_rate_sets_the_spawn_count() {
        let layer = layer();
        let mut emitter = LayerEmitter::default();

        let spawned: usize = (0..60)
            .map(|_| emitter.emit(&layer, 1.0 / 60.0, Vec3::ZERO, true).len())
            .sum();
        assert!((9..=10).contains(&spawned), "spawned {spawned}");

        // A long frame is capped
        let mut stalled = LayerEmitter::default();
        assert_eq!(stalled.emit(&layer, 2.0, Vec3::ZERO, true).len(), 1);
    }

    #[test]
    fn hidden_or_disabled_layers_stay_quiet() {
        let mut layer = layer();
        let mut emitter = LayerEmitter::default();
        assert!(emitter.emit(&layer, 0.1, Vec3::ZERO, false).is_empty());

        layer.enabled = false;
        assert!(emitter.emit(&layer, 0.1, Vec3::ZERO, true).is_empty());
    }

    #[test]
    fn spawns_trail_from_the_last_emitter_position() {
        let layer = ParticleLayer {
            emission_rate: 40.0,
            ..layer()
        };
        let mut emitter = LayerEmitter::default();
        emitter.emit(&layer, 0.0, Vec3::ZERO, true);

        let points = emitter.emit(&layer, 0.1, Vec3::new(4.0, 0.0, 0.0), true);
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(points[3], Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn particles_spawn_inside_their_sphere_and_die_after_their_life() {
        let layer = layer();
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..50 {
            let (mut particle, mut position) = OrbParticle::spawn(1, &layer, Vec3::Y, &mut rng);
            assert_eq!(particle.layer, 1);
            assert!(position.distance(Vec3::Y) <= 0.3 + 1e-4);
            assert!((0.5..=1.0).contains(&particle.life));
            let speed = particle.velocity.length();
            assert!((1.0 - 1e-4..=1.5 + 1e-4).contains(&speed));

            let mut steps = 0;
            while particle.advance(&layer, 0.05, &mut position) {
                steps += 1;
            }
            assert!(steps <= 20);
        }
    }

    #[test]
    fn gravity_bends_the_flight_and_ramps_follow_age() {
        let layer = ParticleLayer {
            gravity: Gravity2 { x: 0.0, y: -10.0 },
            ..layer()
        };
        let mut particle = OrbParticle {
            layer: 0,
            velocity: Vec3::X,
            age: 0.0,
            life: 1.0,
        };
        assert_eq!(particle.scale(&layer), 0.4);
        assert_eq!(particle.alpha(&layer), 0.5);

        let mut position = Vec3::ZERO;
        for _ in 0..5 {
            assert!(particle.advance(&layer, 0.1, &mut position));
        }
        assert!(particle.velocity.y < -4.9);
        assert!(position.y < 0.0);
        assert!((position.x - 0.5).abs() < 1e-4);

        assert!((particle.scale(&layer) - 0.2).abs() < 1e-4);
        assert!((particle.alpha(&layer) - 0.3).abs() < 1e-4);
    }
}
