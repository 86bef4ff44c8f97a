use bevy::prelude::*;

use super::probe::{ProbeHit, SpatialProbe};

/// Tuning for kinematic actor integration
#[derive(Debug, Clone, Copy)]
pub struct MotionConfig {
    /// Vertical acceleration in m/s² (negative is down)
    pub gravity: f32,
    /// Height above the proposed position the floor probe starts from
    pub floor_probe_lift: f32,
    /// Range of the floor probe
    pub floor_probe_range: f32,
    /// Landing tolerance above the floor
    pub land_tolerance: f32,
    /// While grounded, floors this far below stay snapped (walking down steps)
    pub stick_height: f32,
    /// Height of the forward wall probe
    pub wall_probe_height: f32,
    /// Extra wall probe reach beyond the step distance
    pub wall_probe_margin: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            gravity: -60.0,
            floor_probe_lift: 1.5,
            floor_probe_range: 10.0,
            land_tolerance: 0.1,
            stick_height: 0.6,
            wall_probe_height: 0.8,
            wall_probe_margin: 0.5,
        }
    }
}

/// Discrete locomotion state of an actor
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Locomotion {
    Grounded,
    #[default]
    Airborne,
    /// Horizontal position is slaved to another actor's ridable point
    Riding {
        carrier: usize,
        carrier_velocity: Vec3,
    },
}

impl Locomotion {
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Airborne)
    }

    pub fn carrier(self) -> Option<usize> {
        match self {
            Self::Riding { carrier, .. } => Some(carrier),
            _ => None,
        }
    }
}

/// Position and velocity state integrated by [`integrate`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionBody {
    pub position: Vec3,
    pub velocity_y: f32,
    /// One-shot horizontal momentum inherited from a carrier, cleared on landing
    pub momentum: Vec3,
    pub locomotion: Locomotion,
}

impl MotionBody {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..default()
        }
    }

    /// Launches the body upward. Leaving a carrier converts its velocity into
    /// momentum. Returns `false` when the body has nothing to push off from.
    pub fn jump(&mut self, impulse: f32) -> bool {
        if !self.locomotion.is_supported() {
            return false;
        }
        if let Locomotion::Riding {
            carrier_velocity, ..
        } = self.locomotion
        {
            self.momentum = carrier_velocity;
        }
        self.velocity_y = impulse;
        self.locomotion = Locomotion::Airborne;
        true
    }

    /// Zeroes all motion, used when teleporting to a level start.
    pub fn reset_to(&mut self, position: Vec3) {
        *self = Self::at(position);
    }
}

/// Intended horizontal displacement for one tick
#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub direction: Dir3,
    pub distance: f32,
}

/// Carrier the actor is standing on this tick
#[derive(Debug, Clone, Copy)]
pub struct Carrier {
    pub index: usize,
    pub ride_point: Vec3,
    pub velocity: Vec3,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MotionInput {
    pub step: Option<Step>,
    pub carrier: Option<Carrier>,
}

/// What a tick of integration produced
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionOutcome {
    pub delta: Vec3,
    pub grounded: bool,
    /// Floor under the actor, when the floor probe found one
    pub floor: Option<ProbeHit>,
    /// Whether a wall cancelled the requested step
    pub blocked: bool,
}

/// Advances one actor by `dt`.
///
/// Horizontal steps are all-or-nothing: any wall within reach cancels the
/// whole step. Without a floor in range the actor free-falls.
pub fn integrate(
    body: &mut MotionBody,
    dt: f32,
    input: MotionInput,
    probe: &dyn SpatialProbe,
    config: &MotionConfig,
) -> MotionOutcome {
    let start = body.position;
    let mut outcome = MotionOutcome::default();

    if let Some(step) = input.step {
        let origin = body.position + Vec3::Y * config.wall_probe_height;
        let reach = step.distance.abs() + config.wall_probe_margin;
        if probe.cast_ray(origin, step.direction, reach).is_some() {
            outcome.blocked = true;
        } else {
            body.position += step.direction.as_vec3() * step.distance;
        }
    }

    if let Some(carrier) = input.carrier {
        body.position = carrier.ride_point;
        body.velocity_y = 0.0;
        body.locomotion = Locomotion::Riding {
            carrier: carrier.index,
            carrier_velocity: carrier.velocity,
        };
        outcome.delta = body.position - start;
        outcome.grounded = true;
        return outcome;
    }

    // Stepped off a carrier without jumping
    if let Locomotion::Riding { .. } = body.locomotion {
        body.locomotion = Locomotion::Airborne;
    }

    let grounded = body.locomotion == Locomotion::Grounded;
    if !grounded {
        body.position += body.momentum * dt;
        body.velocity_y += config.gravity * dt;
    }

    let proposed_y = body.position.y + body.velocity_y * dt;
    let probe_origin = Vec3::new(
        body.position.x,
        proposed_y + config.floor_probe_lift,
        body.position.z,
    );
    let floor = probe.cast_ray(probe_origin, Dir3::NEG_Y, config.floor_probe_range);
    outcome.floor = floor;

    match floor {
        Some(hit) if proposed_y <= hit.point.y + config.land_tolerance && body.velocity_y <= 0.0 => {
            body.position.y = hit.point.y;
            body.velocity_y = 0.0;
            body.momentum = Vec3::ZERO;
            body.locomotion = Locomotion::Grounded;
        }
        Some(hit) if grounded && body.position.y - hit.point.y < config.stick_height => {
            body.position.y = hit.point.y;
            body.velocity_y = 0.0;
        }
        _ => {
            body.position.y = proposed_y;
            body.locomotion = Locomotion::Airborne;
        }
    }

    outcome.delta = body.position - start;
    outcome.grounded = body.locomotion == Locomotion::Grounded;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::probe::{BoxProbe, ProbeBox, SurfaceKind};

    fn grounded_at(position: Vec3) -> MotionBody {
        MotionBody {
            position,
            locomotion: Locomotion::Grounded,
            ..default()
        }
    }

    #[test]
    fn stationary_grounded_actor_does_not_drift() {
        let probe = BoxProbe::flat_floor(1.25, 50.0, SurfaceKind::Grass);
        let config = MotionConfig::default();

        for dt in [0.0, 0.001, 1.0 / 60.0, 0.05, 0.1] {
            let mut body = grounded_at(Vec3::new(3.0, 1.25, -4.0));
            for _ in 0..500 {
                let outcome = integrate(&mut body, dt, MotionInput::default(), &probe, &config);
                assert!(outcome.grounded);
            }
            assert_eq!(body.position.y, 1.25, "drifted with dt = {dt}");
            assert_eq!(body.velocity_y, 0.0);
        }
    }

    #[test]
    fn falling_actor_lands_and_clears_momentum() {
        let probe = BoxProbe::flat_floor(0.0, 50.0, SurfaceKind::Grass);
        let config = MotionConfig::default();
        let mut body = MotionBody::at(Vec3::new(0.0, 5.0, 0.0));
        body.momentum = Vec3::new(2.0, 0.0, 0.0);

        let mut landed = false;
        for _ in 0..120 {
            if integrate(&mut body, 1.0 / 60.0, MotionInput::default(), &probe, &config).grounded {
                landed = true;
                break;
            }
            assert!(body.velocity_y <= 0.0);
        }

        assert!(landed);
        assert_eq!(body.position.y, 0.0);
        assert_eq!(body.momentum, Vec3::ZERO);
        assert!(body.position.x > 0.0, "momentum carried the actor while airborne");
    }

    #[test]
    fn wall_cancels_the_whole_step() {
        let probe = BoxProbe::flat_floor(0.0, 50.0, SurfaceKind::Grass).with_box(ProbeBox {
            min: Vec3::new(-5.0, 0.0, 1.0),
            max: Vec3::new(5.0, 3.0, 2.0),
            surface: SurfaceKind::Stone,
        });
        let config = MotionConfig::default();
        let mut body = grounded_at(Vec3::new(0.0, 0.0, 0.7));

        let outcome = integrate(
            &mut body,
            1.0 / 60.0,
            MotionInput {
                step: Some(Step {
                    direction: Dir3::Z,
                    distance: 0.125,
                }),
                carrier: None,
            },
            &probe,
            &config,
        );

        assert!(outcome.blocked);
        assert_eq!(body.position, Vec3::new(0.0, 0.0, 0.7));
    }

    #[test]
    fn no_floor_means_free_fall() {
        let probe = BoxProbe::default();
        let config = MotionConfig::default();
        let mut body = grounded_at(Vec3::new(0.0, 2.0, 0.0));

        for _ in 0..200 {
            integrate(&mut body, 1.0 / 60.0, MotionInput::default(), &probe, &config);
        }

        assert_eq!(body.locomotion, Locomotion::Airborne);
        assert!(body.position.y < 0.0);
    }

    #[test]
    fn riding_follows_the_carrier_and_jump_inherits_its_velocity() {
        let probe = BoxProbe::default();
        let config = MotionConfig::default();
        let mut body = MotionBody::at(Vec3::new(0.0, 3.0, 0.0));
        let carrier = Carrier {
            index: 1,
            ride_point: Vec3::new(0.5, 2.8, 0.0),
            velocity: Vec3::new(6.0, 0.0, 0.0),
        };

        let outcome = integrate(
            &mut body,
            1.0 / 60.0,
            MotionInput {
                step: None,
                carrier: Some(carrier),
            },
            &probe,
            &config,
        );

        assert!(outcome.grounded);
        assert_eq!(body.position, carrier.ride_point);
        assert_eq!(body.locomotion.carrier(), Some(1));

        assert!(body.jump(18.0));
        assert_eq!(body.momentum, carrier.velocity);
        assert_eq!(body.locomotion, Locomotion::Airborne);
        assert!(!body.jump(18.0), "no double jump");
    }
}
