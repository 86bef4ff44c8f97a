use bevy::prelude::*;
use rand::prelude::*;

use crate::camera::smoothstep;

/// Colour and melody bound to an orb id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrbPhase {
    pub color: u32,
    pub sound: &'static str,
}

impl OrbPhase {
    pub fn color(&self) -> Color {
        let [_, r, g, b] = self.color.to_be_bytes();
        Color::srgb_u8(r, g, b)
    }
}

pub const ORB_COUNT: usize = 3;

pub static ORB_PHASES: [OrbPhase; ORB_COUNT] = [
    OrbPhase {
        color: 0xffa500,
        sound: "sounds/orb_bass.ogg",
    },
    OrbPhase {
        color: 0x00ff00,
        sound: "sounds/orb_mid.ogg",
    },
    OrbPhase {
        color: 0x00ffff,
        sound: "sounds/orb_high.ogg",
    },
];

/// Orb choreography and wander tuning
#[derive(Debug, Clone, Copy)]
pub struct OrbConfig {
    /// Stack origin distance from the player toward the door
    pub stack_forward: f32,
    pub stack_lift: f32,
    /// Vertical gap between stacked orbs
    pub stack_spacing: f32,
    /// Cinematic seconds the stack hovers before spreading
    pub stack_hold: f32,
    pub rise_duration: f32,
    pub rise_height: f32,
    /// Sideways spread of the outer orbs
    pub spread_side: f32,
    /// Extra rise of the middle orb
    pub spread_up: f32,
    pub bob_amplitude: f32,
    pub bob_frequency: f32,
    pub launch_speed: f32,
    pub diverge_acceleration: f32,
    /// Divergence only applies this close to the camera
    pub diverge_radius: f32,
    pub launch_min_height: f32,
    pub launch_duration: f32,
    pub wander_speed: f32,
    pub drift_amplitude: f32,
    pub drift_frequency: f32,
    /// Distance to the wander target at which a new one is picked
    pub retarget_radius: f32,
    pub min_bounds_extent: f32,
    pub target_min_height: f32,
    pub target_height_range: f32,
    pub fly_min_height: f32,
    pub fly_max_height: f32,
    pub pickup_radius: f32,
    pub trail_distance: f32,
    pub trail_spacing: f32,
    pub trail_height: f32,
    pub trail_rate: f32,
    /// Melodies fall silent beyond this distance
    pub audio_radius: f32,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            stack_forward: 2.0,
            stack_lift: 1.5,
            stack_spacing: 0.6,
            stack_hold: 1.0,
            rise_duration: 1.5,
            rise_height: 2.0,
            spread_side: 3.0,
            spread_up: 2.0,
            bob_amplitude: 0.05,
            bob_frequency: 5.0,
            launch_speed: 20.0,
            diverge_acceleration: 80.0,
            diverge_radius: 8.0,
            launch_min_height: 1.0,
            launch_duration: 1.5,
            wander_speed: 1.6,
            drift_amplitude: 0.5,
            drift_frequency: 2.0,
            retarget_radius: 2.0,
            min_bounds_extent: 20.0,
            target_min_height: 1.6,
            target_height_range: 2.5,
            fly_min_height: 1.6,
            fly_max_height: 5.0,
            pickup_radius: 2.0,
            trail_distance: 1.2,
            trail_spacing: 0.8,
            trail_height: 1.2,
            trail_rate: 4.0,
            audio_radius: 15.0,
        }
    }
}

/// Horizontal region orbs wander in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WanderBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl WanderBounds {
    /// Random target inside the bounds, each horizontal extent widened to
    /// at least `min_bounds_extent`.
    pub fn pick(&self, config: &OrbConfig, rng: &mut impl Rng) -> Vec3 {
        let width = (self.max.x - self.min.x).max(config.min_bounds_extent);
        let depth = (self.max.z - self.min.z).max(config.min_bounds_extent);
        Vec3::new(
            self.min.x + rng.gen_range(0.0..=width),
            config.target_min_height + rng.gen_range(0.0..=config.target_height_range.max(0.0)),
            self.min.z + rng.gen_range(0.0..=depth),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrbState {
    Hidden,
    /// Stacked in front of the player during the cinematic, then spreading
    CinematicStack { stack: Vec3, spread: Vec3 },
    Launching {
        started_at: f32,
        velocity: Vec3,
        diverge: Vec3,
    },
    Flying { target: Vec3 },
    /// Collected; trails the player
    Following,
    /// Parked by the level editor, no automatic updates
    EditorOverride,
}

/// Shared per-tick inputs for all orbs
#[derive(Debug, Clone, Copy)]
pub struct OrbContext {
    pub elapsed: f32,
    /// Seconds since the cinematic started
    pub cinematic_time: f32,
    pub player: Vec3,
    pub player_forward: Vec3,
    pub camera: Vec3,
    pub current_phase: usize,
    pub bounds: WanderBounds,
}

#[derive(Debug, Clone)]
pub struct Orb {
    pub id: usize,
    pub state: OrbState,
    pub position: Vec3,
    pub collected: bool,
    /// Desynchronises the drift between orbs
    drift_phase: f32,
}

impl Orb {
    pub fn new(id: usize, rng: &mut impl Rng) -> Self {
        Self {
            id,
            state: OrbState::Hidden,
            position: Vec3::new(0.0, -9999.0, 0.0),
            collected: false,
            drift_phase: rng.gen_range(0.0..100.0f32),
        }
    }

    pub fn phase(&self) -> &'static OrbPhase {
        &ORB_PHASES[self.id.min(ORB_COUNT - 1)]
    }

    pub fn is_visible(&self) -> bool {
        self.state != OrbState::Hidden
    }

    /// Places the orb in the cinematic stack between the player and the door.
    pub fn spawn_stacked(&mut self, door: Vec3, player: Vec3, config: &OrbConfig) {
        let to_door = (door - player).normalize_or(Vec3::Z);
        let right = to_door.cross(Vec3::Y).normalize_or(Vec3::X);

        let base = player + to_door * config.stack_forward + Vec3::Y * config.stack_lift;
        let stack = base + Vec3::Y * (self.id as f32 * config.stack_spacing);

        let mut spread = stack + Vec3::Y * config.rise_height;
        match self.id {
            0 => spread -= right * config.spread_side,
            1 => spread += Vec3::Y * config.spread_up,
            _ => spread += right * config.spread_side,
        }

        self.collected = false;
        self.position = stack;
        self.state = OrbState::CinematicStack { stack, spread };
    }

    /// Fires the orb at the camera. Each id veers off along its own axis.
    pub fn launch(&mut self, camera: Vec3, elapsed: f32, config: &OrbConfig) {
        let to_camera = (camera - self.position).normalize_or(Vec3::Z);
        let right = to_camera.cross(Vec3::Y).normalize_or(Vec3::X);
        let up = right.cross(to_camera).normalize_or(Vec3::Y);

        let diverge = match self.id {
            0 => -right,
            1 => up,
            _ => right,
        };
        self.state = OrbState::Launching {
            started_at: elapsed,
            velocity: to_camera * config.launch_speed,
            diverge,
        };
    }

    /// Drops any collection progress and sends the orb wandering again.
    pub fn reset_to_flying(&mut self, bounds: &WanderBounds, config: &OrbConfig, rng: &mut impl Rng) {
        self.collected = false;
        self.state = OrbState::Flying {
            target: bounds.pick(config, rng),
        };
    }

    pub fn hide(&mut self) {
        self.state = OrbState::Hidden;
    }

    pub fn begin_editor_override(&mut self, position: Vec3) {
        self.position = position;
        self.state = OrbState::EditorOverride;
    }

    pub fn end_editor_override(&mut self, bounds: &WanderBounds, config: &OrbConfig, rng: &mut impl Rng) {
        if self.state != OrbState::EditorOverride {
            return;
        }
        self.state = if self.collected {
            OrbState::Following
        } else {
            OrbState::Flying {
                target: bounds.pick(config, rng),
            }
        };
    }

    /// Advances the orb. Returns `true` when this tick collected it, which
    /// advances the quest phase.
    pub fn update(
        &mut self,
        dt: f32,
        context: &OrbContext,
        config: &OrbConfig,
        rng: &mut impl Rng,
    ) -> bool {
        match self.state {
            OrbState::Hidden | OrbState::EditorOverride => false,
            OrbState::CinematicStack { stack, spread } => {
                let time = context.cinematic_time;
                self.position = if time > config.stack_hold {
                    let t = (time - config.stack_hold) / config.rise_duration.max(f32::EPSILON);
                    stack.lerp(spread, smoothstep(t))
                } else {
                    let bob = (context.elapsed * config.bob_frequency).sin() * config.bob_amplitude;
                    stack + Vec3::Y * bob
                };
                false
            }
            OrbState::Launching {
                started_at,
                mut velocity,
                diverge,
            } => {
                if self.position.distance(context.camera) < config.diverge_radius {
                    velocity += diverge * config.diverge_acceleration * dt;
                }
                self.position += velocity * dt;
                self.position.y = self.position.y.max(config.launch_min_height);

                self.state = if context.elapsed - started_at > config.launch_duration {
                    OrbState::Flying {
                        target: context.bounds.pick(config, rng),
                    }
                } else {
                    OrbState::Launching {
                        started_at,
                        velocity,
                        diverge,
                    }
                };
                false
            }
            OrbState::Flying { mut target } => {
                let phase = context.elapsed * config.drift_frequency + self.drift_phase;
                let mut direction = (target - self.position).normalize_or_zero();
                direction.x += phase.sin() * config.drift_amplitude;
                direction.z += phase.cos() * config.drift_amplitude;
                self.position += direction.normalize_or_zero() * config.wander_speed * dt;

                if self.position.distance(target) < config.retarget_radius {
                    target = context.bounds.pick(config, rng);
                }
                self.position.y = self
                    .position
                    .y
                    .clamp(config.fly_min_height, config.fly_max_height);

                let in_reach = context.player.distance(self.position) < config.pickup_radius;
                if in_reach && self.id == context.current_phase {
                    self.collected = true;
                    self.state = OrbState::Following;
                    true
                } else {
                    self.state = OrbState::Flying { target };
                    false
                }
            }
            OrbState::Following => {
                let behind = config.trail_distance + self.id as f32 * config.trail_spacing;
                let trail = context.player - context.player_forward * behind
                    + Vec3::Y * config.trail_height;
                self.position = self
                    .position
                    .lerp(trail, (config.trail_rate * dt).min(1.0));
                false
            }
        }
    }
}
