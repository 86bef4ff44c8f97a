use std::f32::consts::PI;

use bevy::prelude::*;

use super::state::*;
use crate::camera::wrap_angle;
use crate::physics::{Carrier, MotionInput, SpatialProbe, Step, SurfaceKind, integrate};

/// Player input sampled for one tick
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerInput {
    /// x turns (right positive), y advances (forward positive)
    pub movement: Vec2,
    pub jump: bool,
}

/// An enemy the player may land on
#[derive(Debug, Clone, Copy)]
pub struct RideTarget {
    pub index: usize,
    pub alive: bool,
    /// Body position used for the ride tolerance test
    pub position: Vec3,
    /// Where the rider stands
    pub ride_point: Vec3,
    pub velocity: Vec3,
}

/// Things that happened to the player this tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerTick {
    pub jumped: bool,
    /// Enemy index the player just landed on (new ride)
    pub stomped: Option<usize>,
    pub landed: bool,
}

impl PlayerController {
    /// Runs one tick of the player state machine.
    ///
    /// `frozen` holds the player in place during cinematics.
    pub fn update(
        &mut self,
        dt: f32,
        input: &PlayerInput,
        probe: &dyn SpatialProbe,
        rides: &[RideTarget],
        frozen: bool,
    ) -> PlayerTick {
        let mut tick = PlayerTick::default();
        self.advance_blink(dt);

        if frozen {
            self.speed = 0.0;
            self.moving = false;
            self.footsteps = None;
            self.anim = PlayerAnim::Idle;
            self.anim_time_scale = 1.0;
            return tick;
        }

        let was_supported = self.is_supported();
        let previous_carrier = self.riding();

        if input.jump && self.body.jump(self.config.jump_strength) {
            tick.jumped = true;
            self.footsteps = None;
        }

        let step = self.steer(dt, input);
        let carrier = self.find_carrier(rides);
        if let Some(carrier) = carrier
            && previous_carrier != Some(carrier.index)
        {
            tick.stomped = Some(carrier.index);
        }

        let outcome = integrate(
            &mut self.body,
            dt,
            MotionInput { step, carrier },
            probe,
            &self.config.motion,
        );

        if carrier.is_some() {
            self.surface = SurfaceKind::Stone;
        } else if let Some(floor) = outcome.floor.filter(|_| outcome.grounded) {
            self.surface = floor.surface;
        }

        let supported = self.is_supported();
        tick.landed = supported && !was_supported;

        self.anim = PlayerAnim::select(
            supported,
            self.moving,
            self.speed,
            self.config.run_speed_threshold,
        );
        self.anim_time_scale = match self.anim {
            PlayerAnim::Walk | PlayerAnim::Run => self.speed / self.config.anim_reference_speed,
            PlayerAnim::Idle | PlayerAnim::Jump => 1.0,
        };
        self.footsteps = FootstepCue::select(
            supported,
            self.moving,
            self.speed,
            self.surface,
            &self.config,
        );

        tick
    }

    /// Applies turning and returns the forward/backward step to attempt.
    fn steer(&mut self, dt: f32, input: &PlayerInput) -> Option<Step> {
        let deadzone = self.config.input_deadzone;

        let turn = -input.movement.x;
        if turn.abs() > deadzone {
            self.yaw = wrap_angle(self.yaw + turn * self.config.rotate_speed * dt);
        }

        let advance = input.movement.y.clamp(-1.0, 1.0);
        if advance.abs() <= deadzone {
            self.moving = false;
            self.speed = 0.0;
            self.turn_visual(0.0, self.config.visual_relax_rate, dt);
            return None;
        }

        self.moving = true;
        self.speed = self.config.max_move_speed * advance.abs();

        let facing = if advance < 0.0 { PI } else { 0.0 };
        self.turn_visual(facing, self.config.visual_turn_rate, dt);

        let direction = Dir3::new(self.forward() * advance.signum()).ok()?;
        Some(Step {
            direction,
            distance: self.speed * dt,
        })
    }

    fn turn_visual(&mut self, target: f32, rate: f32, dt: f32) {
        let diff = wrap_angle(target - self.visual_yaw);
        self.visual_yaw += diff * (rate * dt).min(1.0);
    }

    fn find_carrier(&self, rides: &[RideTarget]) -> Option<Carrier> {
        if self.body.velocity_y > 0.0 {
            return None;
        }
        let position = self.position();

        rides
            .iter()
            .filter(|ride| ride.alive)
            .find(|ride| {
                let horizontal = Vec2::new(position.x - ride.position.x, position.z - ride.position.z);
                let relative_y = position.y - ride.position.y;
                horizontal.length() < self.config.ride_radius
                    && relative_y > self.config.ride_min_height
                    && relative_y < self.config.ride_max_height
            })
            .map(|ride| Carrier {
                index: ride.index,
                ride_point: ride.ride_point,
                velocity: ride.velocity,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BoxProbe, Locomotion, ProbeBox};

    const DT: f32 = 1.0 / 60.0;

    fn settled_player(probe: &BoxProbe) -> PlayerController {
        let mut player = PlayerController::new(Vec3::new(0.0, 0.5, 0.0), PlayerConfig::default());
        for _ in 0..30 {
            player.update(DT, &PlayerInput::default(), probe, &[], false);
        }
        assert!(player.is_grounded());
        player
    }

    #[test]
    fn walking_forward_plays_footsteps_on_the_floor_surface() {
        let probe = BoxProbe::flat_floor(0.0, 100.0, SurfaceKind::Stone);
        let mut player = settled_player(&probe);
        let input = PlayerInput {
            movement: Vec2::new(0.0, 1.0),
            jump: false,
        };

        for _ in 0..30 {
            player.update(DT, &input, &probe, &[], false);
        }

        assert!(player.position().z > 3.0);
        assert_eq!(player.anim, PlayerAnim::Run);
        assert_eq!(player.anim_time_scale, 1.0);
        assert_eq!(
            player.footsteps.map(|cue| cue.sound),
            Some(SurfaceSound::Stone)
        );
    }

    #[test]
    fn half_stick_walks_and_reverse_turns_the_visual() {
        let probe = BoxProbe::flat_floor(0.0, 100.0, SurfaceKind::Grass);
        let mut player = settled_player(&probe);
        let input = PlayerInput {
            movement: Vec2::new(0.0, -0.5),
            jump: false,
        };

        for _ in 0..60 {
            player.update(DT, &input, &probe, &[], false);
        }

        assert_eq!(player.anim, PlayerAnim::Walk);
        assert!(player.position().z < 0.0);
        assert!((player.visual_yaw.abs() - PI).abs() < 0.05);
    }

    #[test]
    fn jump_only_from_the_ground() {
        let probe = BoxProbe::flat_floor(0.0, 100.0, SurfaceKind::Grass);
        let mut player = settled_player(&probe);
        let jump = PlayerInput {
            jump: true,
            ..default()
        };

        let tick = player.update(DT, &jump, &probe, &[], false);
        assert!(tick.jumped);
        assert_eq!(player.anim, PlayerAnim::Jump);
        assert!(player.footsteps.is_none());

        let again = player.update(DT, &jump, &probe, &[], false);
        assert!(!again.jumped);
        assert!(player.position().y > 0.0);
    }

    #[test]
    fn wall_blocks_forward_motion() {
        let probe = BoxProbe::flat_floor(0.0, 100.0, SurfaceKind::Grass).with_box(ProbeBox {
            min: Vec3::new(-10.0, 0.0, 2.0),
            max: Vec3::new(10.0, 5.0, 3.0),
            surface: SurfaceKind::Stone,
        });
        let mut player = settled_player(&probe);
        let input = PlayerInput {
            movement: Vec2::Y,
            jump: false,
        };

        for _ in 0..120 {
            player.update(DT, &input, &probe, &[], false);
        }

        assert!(player.position().z < 2.0);
        assert!(player.position().z > 1.0);
    }

    #[test]
    fn landing_on_an_enemy_stomps_once_per_ride() {
        let probe = BoxProbe::flat_floor(0.0, 100.0, SurfaceKind::Grass);
        let mut player = PlayerController::new(Vec3::new(0.0, 4.0, 0.0), PlayerConfig::default());
        let ride = RideTarget {
            index: 0,
            alive: true,
            position: Vec3::new(0.5, 2.0, 0.0),
            ride_point: Vec3::new(0.5, 3.0, 0.0),
            velocity: Vec3::new(6.0, 0.0, 0.0),
        };

        let first = player.update(DT, &PlayerInput::default(), &probe, &[ride], false);
        assert_eq!(first.stomped, Some(0));
        assert_eq!(player.position(), ride.ride_point);
        assert_eq!(player.surface, SurfaceKind::Stone);

        let second = player.update(DT, &PlayerInput::default(), &probe, &[ride], false);
        assert_eq!(second.stomped, None);

        let jump = PlayerInput {
            jump: true,
            ..default()
        };
        player.update(DT, &jump, &probe, &[ride], false);
        assert_eq!(player.body.momentum, ride.velocity);
        assert_eq!(player.body.locomotion, Locomotion::Airborne);
    }

    #[test]
    fn dead_enemies_are_not_ridable() {
        let probe = BoxProbe::flat_floor(0.0, 100.0, SurfaceKind::Grass);
        let mut player = PlayerController::new(Vec3::new(0.0, 4.0, 0.0), PlayerConfig::default());
        let ride = RideTarget {
            index: 0,
            alive: false,
            position: Vec3::new(0.0, 2.0, 0.0),
            ride_point: Vec3::new(0.0, 3.0, 0.0),
            velocity: Vec3::ZERO,
        };

        let tick = player.update(DT, &PlayerInput::default(), &probe, &[ride], false);
        assert_eq!(tick.stomped, None);
        assert!(player.riding().is_none());
    }

    #[test]
    fn frozen_player_idles_in_place() {
        let probe = BoxProbe::flat_floor(0.0, 100.0, SurfaceKind::Grass);
        let mut player = settled_player(&probe);
        let start = player.position();
        let input = PlayerInput {
            movement: Vec2::Y,
            jump: true,
        };

        let tick = player.update(DT, &input, &probe, &[], true);

        assert_eq!(tick, PlayerTick::default());
        assert_eq!(player.position(), start);
        assert_eq!(player.anim, PlayerAnim::Idle);
        assert!(!player.moving);
    }
}
