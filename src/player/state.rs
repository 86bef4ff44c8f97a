use bevy::prelude::*;

use crate::physics::{Locomotion, MotionBody, MotionConfig, SurfaceKind};

/// Marker component for the player avatar (also used as input context)
#[derive(Component, Default)]
pub struct Player;

/// Player movement configuration
#[derive(Debug, Clone, Copy)]
pub struct PlayerConfig {
    /// Top forward speed in m/s
    pub max_move_speed: f32,
    /// Turn rate in rad/s
    pub rotate_speed: f32,
    /// Jump impulse velocity
    pub jump_strength: f32,
    /// Stick/key magnitude below which input is ignored
    pub input_deadzone: f32,
    /// Speed above which the run clip replaces walk
    pub run_speed_threshold: f32,
    /// Speed the walk/run clips were authored at (time scale 1.0)
    pub anim_reference_speed: f32,
    /// Minimum speed for footsteps to play
    pub footstep_min_speed: f32,
    /// Lowest footstep playback rate
    pub footstep_min_rate: f32,
    /// Horizontal reach of the ride test around an enemy
    pub ride_radius: f32,
    /// Lowest player height relative to the enemy that still counts as riding
    pub ride_min_height: f32,
    /// Highest player height relative to the enemy that still counts as riding
    pub ride_max_height: f32,
    /// Visual mesh turn rate while moving
    pub visual_turn_rate: f32,
    /// Visual mesh relax rate back to forward when idle
    pub visual_relax_rate: f32,
    /// Damage blink duration in seconds
    pub blink_duration: f32,
    /// Time per blink on/off half-cycle
    pub blink_interval: f32,
    pub motion: MotionConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_move_speed: 7.5,
            rotate_speed: 2.5,
            jump_strength: 18.0,
            input_deadzone: 0.1,
            run_speed_threshold: 4.0,
            anim_reference_speed: 7.5,
            footstep_min_speed: 0.1,
            footstep_min_rate: 0.8,
            ride_radius: 2.5,
            ride_min_height: -0.5,
            ride_max_height: 4.0,
            visual_turn_rate: 10.0,
            visual_relax_rate: 5.0,
            blink_duration: 0.6,
            blink_interval: 0.1,
            motion: MotionConfig::default(),
        }
    }
}

/// Animation clip the player should be showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerAnim {
    #[default]
    Idle,
    Walk,
    Run,
    Jump,
}

impl PlayerAnim {
    pub fn select(supported: bool, moving: bool, speed: f32, run_threshold: f32) -> Self {
        if !supported {
            Self::Jump
        } else if moving {
            if speed > run_threshold {
                Self::Run
            } else {
                Self::Walk
            }
        } else {
            Self::Idle
        }
    }

    /// Substitutes a clip the loaded model lacks.
    pub fn resolve(self, clips: &AvailableClips) -> Self {
        match self {
            Self::Walk if !clips.walk => Self::Run,
            Self::Jump if !clips.jump => Self::Idle,
            other => other,
        }
    }
}

/// Which optional clips the player model provides
#[derive(Debug, Clone, Copy)]
pub struct AvailableClips {
    pub walk: bool,
    pub jump: bool,
}

impl Default for AvailableClips {
    fn default() -> Self {
        Self {
            walk: true,
            jump: true,
        }
    }
}

/// Looping footstep source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceSound {
    Grass,
    Stone,
}

impl From<SurfaceKind> for SurfaceSound {
    fn from(surface: SurfaceKind) -> Self {
        if surface.is_hard() {
            Self::Stone
        } else {
            Self::Grass
        }
    }
}

/// The footstep loop that should be playing, if any
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootstepCue {
    pub sound: SurfaceSound,
    pub rate: f32,
}

impl FootstepCue {
    /// At most one loop plays: selecting one sound implies the other is off.
    pub fn select(
        supported: bool,
        moving: bool,
        speed: f32,
        surface: SurfaceKind,
        config: &PlayerConfig,
    ) -> Option<Self> {
        if !(supported && moving && speed > config.footstep_min_speed) {
            return None;
        }
        Some(Self {
            sound: surface.into(),
            rate: (speed / config.max_move_speed).max(config.footstep_min_rate),
        })
    }
}

/// Damage feedback: alternating emissive highlight for a fixed duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageBlink {
    pub elapsed: f32,
}

/// Everything the player state machine owns
#[derive(Debug, Clone)]
pub struct PlayerController {
    pub config: PlayerConfig,
    pub body: MotionBody,
    /// Heading of the body, forward is `(sin yaw, 0, cos yaw)`
    pub yaw: f32,
    /// Facing of the visual mesh relative to the body
    pub visual_yaw: f32,
    pub speed: f32,
    pub moving: bool,
    pub surface: SurfaceKind,
    pub anim: PlayerAnim,
    pub anim_time_scale: f32,
    pub footsteps: Option<FootstepCue>,
    pub blink: Option<DamageBlink>,
}

impl PlayerController {
    pub fn new(position: Vec3, config: PlayerConfig) -> Self {
        Self {
            config,
            body: MotionBody::at(position),
            yaw: 0.0,
            visual_yaw: 0.0,
            speed: 0.0,
            moving: false,
            surface: SurfaceKind::default(),
            anim: PlayerAnim::Idle,
            anim_time_scale: 1.0,
            footsteps: None,
            blink: None,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.body.position
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos())
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    pub fn is_supported(&self) -> bool {
        self.body.locomotion.is_supported()
    }

    pub fn riding(&self) -> Option<usize> {
        self.body.locomotion.carrier()
    }

    pub fn is_grounded(&self) -> bool {
        self.body.locomotion == Locomotion::Grounded
    }

    /// Starts the damage blink. A hit during an active blink changes nothing.
    pub fn take_hit(&mut self) -> bool {
        if self.blink.is_some() {
            return false;
        }
        self.blink = Some(DamageBlink { elapsed: 0.0 });
        true
    }

    /// Whether the highlight half of the blink cycle is showing
    pub fn blink_lit(&self) -> bool {
        self.blink.is_some_and(|blink| {
            let half_cycles = (blink.elapsed / self.config.blink_interval) as u32;
            half_cycles % 2 == 0
        })
    }

    /// Teleports to a spawn point with all motion cleared.
    pub fn respawn(&mut self, position: Vec3) {
        self.body.reset_to(position);
        self.speed = 0.0;
        self.moving = false;
        self.footsteps = None;
        self.anim = PlayerAnim::Idle;
    }

    pub(super) fn advance_blink(&mut self, dt: f32) {
        if let Some(blink) = &mut self.blink {
            blink.elapsed += dt;
            if blink.elapsed >= self.config.blink_duration {
                self.blink = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animation_follows_support_and_speed() {
        assert_eq!(PlayerAnim::select(false, true, 7.5, 4.0), PlayerAnim::Jump);
        assert_eq!(PlayerAnim::select(true, true, 7.5, 4.0), PlayerAnim::Run);
        assert_eq!(PlayerAnim::select(true, true, 3.0, 4.0), PlayerAnim::Walk);
        assert_eq!(PlayerAnim::select(true, false, 0.0, 4.0), PlayerAnim::Idle);
    }

    #[test]
    fn missing_clips_fall_back() {
        let clips = AvailableClips {
            walk: false,
            jump: false,
        };
        assert_eq!(PlayerAnim::Walk.resolve(&clips), PlayerAnim::Run);
        assert_eq!(PlayerAnim::Jump.resolve(&clips), PlayerAnim::Idle);
        assert_eq!(PlayerAnim::Run.resolve(&clips), PlayerAnim::Run);
    }

    #[test]
    fn footstep_loops_are_exclusive_and_gated() {
        let config = PlayerConfig::default();

        let stone = FootstepCue::select(true, true, 7.5, SurfaceKind::Altar, &config).unwrap();
        assert_eq!(stone.sound, SurfaceSound::Stone);
        assert_eq!(stone.rate, 1.0);

        let grass = FootstepCue::select(true, true, 1.0, SurfaceKind::Grass, &config).unwrap();
        assert_eq!(grass.sound, SurfaceSound::Grass);
        assert_eq!(grass.rate, config.footstep_min_rate);

        assert!(FootstepCue::select(false, true, 7.5, SurfaceKind::Grass, &config).is_none());
        assert!(FootstepCue::select(true, false, 7.5, SurfaceKind::Grass, &config).is_none());
        assert!(FootstepCue::select(true, true, 0.05, SurfaceKind::Grass, &config).is_none());
    }

    #[test]
    fn blink_retrigger_is_a_no_op() {
        let mut player = PlayerController::new(Vec3::ZERO, PlayerConfig::default());

        assert!(player.take_hit());
        assert!(player.blink_lit());
        player.advance_blink(0.15);
        assert!(!player.blink_lit());

        assert!(!player.take_hit());
        assert_eq!(player.blink, Some(DamageBlink { elapsed: 0.15 }));

        player.advance_blink(1.0);
        assert!(player.blink.is_none());
        assert!(player.take_hit());
    }
}
