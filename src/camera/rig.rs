use bevy::math::FloatExt;
use bevy::prelude::*;

use super::smoothing::*;
use crate::physics::SpatialProbe;

/// Third-person orbit camera tuning
#[derive(Debug, Clone, Copy)]
pub struct CameraConfig {
    /// Horizontal distance behind the player
    pub base_radius: f32,
    /// Height above the player; with `base_radius` sets the resting elevation
    pub base_height: f32,
    /// Orbit radians per dragged pixel
    pub drag_sensitivity: f32,
    /// Limit for the manual elevation offset and the resulting elevation
    pub max_phi: f32,
    /// Rate at which manual offsets relax while the player moves
    pub relax_rate: f32,
    /// Occlusion rays start this far above the player
    pub pivot_height: f32,
    /// Gap kept between the camera and an occluder
    pub occlusion_margin: f32,
    pub min_distance: f32,
    pub look_height: f32,
    /// Lerp factors per 60Hz frame
    pub position_damping: f32,
    pub look_damping: f32,
    pub return_duration: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            base_radius: 4.5,
            base_height: 2.5,
            drag_sensitivity: 0.005,
            max_phi: 1.5,
            relax_rate: 2.0,
            pivot_height: 1.5,
            occlusion_margin: 0.2,
            min_distance: 0.5,
            look_height: 1.6,
            position_damping: 0.2,
            look_damping: 0.35,
            return_duration: 1.5,
        }
    }
}

impl CameraConfig {
    pub fn base_elevation(&self) -> f32 {
        self.base_height.atan2(self.base_radius)
    }

    pub fn base_distance(&self) -> f32 {
        Vec2::new(self.base_radius, self.base_height).length()
    }
}

/// One scripted camera move: ease to `position` while turning to `look_at`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CinematicShot {
    pub position: Vec3,
    pub look_at: Vec3,
    pub duration: f32,
}

impl CinematicShot {
    /// Pull back behind the player to frame the door, then push in.
    pub fn door_reveal(player: Vec3, door: Vec3) -> Vec<Self> {
        let to_door = (door - player).normalize_or(Vec3::Z);
        let look_at = door + Vec3::Y * 2.0;
        vec![
            Self {
                position: player - to_door * 12.0 + Vec3::Y * 5.0,
                look_at,
                duration: 3.0,
            },
            Self {
                position: player - to_door * 8.0 + Vec3::Y * 3.5,
                look_at,
                duration: 6.5,
            },
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CameraMode {
    Follow,
    Cinematic {
        started_at: f32,
        start_position: Vec3,
        start_look: Vec3,
        shots: Vec<CinematicShot>,
    },
    Returning {
        started_at: f32,
        start_azimuth: f32,
        start_elevation: f32,
        start_distance: f32,
        start_look: Vec3,
    },
}

/// What the camera frames this tick
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowTarget {
    pub position: Vec3,
    pub yaw: f32,
    pub moving: bool,
}

#[derive(Debug, Clone)]
pub struct CameraRig {
    pub config: CameraConfig,
    pub mode: CameraMode,
    pub position: Vec3,
    pub look_at: Vec3,
    /// Manual azimuth offset
    pub theta: f32,
    /// Manual elevation offset
    pub phi: f32,
    pub dragging: bool,
    /// Distance to the player after occlusion shortening
    pub current_distance: f32,
}

impl CameraRig {
    pub fn new(position: Vec3, look_at: Vec3, config: CameraConfig) -> Self {
        Self {
            config,
            mode: CameraMode::Follow,
            position,
            look_at,
            theta: 0.0,
            phi: 0.0,
            dragging: false,
            current_distance: config.base_distance(),
        }
    }

    /// Places the rig at its resting follow pose, skipping any smoothing.
    pub fn snap_behind(&mut self, target: &FollowTarget) {
        self.mode = CameraMode::Follow;
        self.theta = 0.0;
        self.phi = 0.0;
        self.position = target.position
            + orbit_offset(
                target.yaw + std::f32::consts::PI,
                self.config.base_elevation(),
                self.config.base_distance(),
            );
        self.look_at = target.position + Vec3::Y * self.config.look_height;
        self.current_distance = self.config.base_distance();
    }

    /// Applies a pointer drag in pixels. Ignored outside follow mode.
    pub fn drag(&mut self, delta: Vec2) {
        if self.mode != CameraMode::Follow {
            return;
        }
        let sensitivity = self.config.drag_sensitivity;
        self.theta = wrap_angle(self.theta - delta.x * sensitivity);
        self.phi = (self.phi + delta.y * sensitivity).clamp(-self.config.max_phi, self.config.max_phi);
    }

    pub fn is_cinematic(&self) -> bool {
        matches!(self.mode, CameraMode::Cinematic { .. })
    }

    pub fn start_cinematic(&mut self, elapsed: f32, shots: Vec<CinematicShot>) {
        self.mode = CameraMode::Cinematic {
            started_at: elapsed,
            start_position: self.position,
            start_look: self.look_at,
            shots,
        };
    }

    /// Eases from wherever the camera is back to the follow pose. Manual
    /// offsets are cleared.
    pub fn start_return(&mut self, elapsed: f32, player: Vec3) {
        self.theta = 0.0;
        self.phi = 0.0;

        let offset = self.position - player;
        let distance = offset.length().max(self.config.min_distance);
        self.mode = CameraMode::Returning {
            started_at: elapsed,
            start_azimuth: offset.x.atan2(offset.z),
            start_elevation: (offset.y / distance).clamp(-1.0, 1.0).asin(),
            start_distance: distance,
            start_look: self.look_at,
        };
    }

    pub fn rotation(&self) -> Quat {
        Transform::from_translation(self.position)
            .looking_at(self.look_at, Vec3::Y)
            .rotation
    }

    pub fn update(&mut self, dt: f32, elapsed: f32, target: &FollowTarget, probe: &dyn SpatialProbe) {
        match &self.mode {
            CameraMode::Follow => self.follow(dt, target, probe),
            CameraMode::Cinematic {
                started_at,
                start_position,
                start_look,
                shots,
            } => {
                let (position, look_at) =
                    cinematic_pose(elapsed - started_at, *start_position, *start_look, shots);
                self.position = position;
                self.look_at = look_at;
            }
            CameraMode::Returning {
                started_at,
                start_azimuth,
                start_elevation,
                start_distance,
                start_look,
            } => {
                let duration = self.config.return_duration.max(f32::EPSILON);
                let local = elapsed - started_at;
                let s = smoothstep(local / duration);

                let azimuth = lerp_angle(*start_azimuth, target.yaw + std::f32::consts::PI, s);
                let elevation = start_elevation.lerp(self.config.base_elevation(), s);
                let distance = start_distance.lerp(self.config.base_distance(), s);
                let look_target = target.position + Vec3::Y * self.config.look_height;

                self.position = target.position + orbit_offset(azimuth, elevation, distance);
                self.look_at = start_look.lerp(look_target, s);
                self.current_distance = distance;

                if local >= duration {
                    self.mode = CameraMode::Follow;
                }
            }
        }
    }

    fn follow(&mut self, dt: f32, target: &FollowTarget, probe: &dyn SpatialProbe) {
        let config = self.config;

        // Manual offsets stick while the player stands still
        if !self.dragging && target.moving {
            self.theta = relax(self.theta, config.relax_rate, dt);
            self.phi = relax(self.phi, config.relax_rate, dt);
        }

        let azimuth = target.yaw + self.theta + std::f32::consts::PI;
        let elevation =
            (config.base_elevation() + self.phi).clamp(-config.max_phi, config.max_phi);
        let desired = target.position + orbit_offset(azimuth, elevation, config.base_distance());

        let pivot = target.position + Vec3::Y * config.pivot_height;
        let resolved = match Dir3::new(desired - pivot) {
            Ok(direction) => {
                let reach = pivot.distance(desired);
                match probe.cast_ray(pivot, direction, reach) {
                    Some(hit) if hit.distance - config.occlusion_margin < reach => {
                        let distance = (hit.distance - config.occlusion_margin).max(config.min_distance);
                        pivot + direction.as_vec3() * distance
                    }
                    _ => desired,
                }
            }
            Err(_) => desired,
        };

        self.position = self
            .position
            .lerp(resolved, damp_factor(config.position_damping, dt));
        let look_target = target.position + Vec3::Y * config.look_height;
        self.look_at = self
            .look_at
            .lerp(look_target, damp_factor(config.look_damping, dt));
        self.current_distance = self.position.distance(target.position);
    }
}

/// Spherical offset: azimuth about +Y measured from +Z, elevation above the
/// horizontal plane.
pub fn orbit_offset(azimuth: f32, elevation: f32, distance: f32) -> Vec3 {
    let horizontal = elevation.cos() * distance;
    Vec3::new(
        azimuth.sin() * horizontal,
        elevation.sin() * distance,
        azimuth.cos() * horizontal,
    )
}

/// Pose `local` seconds into a shot list. Each shot eases from the end of
/// the previous one; after the last shot the pose holds.
fn cinematic_pose(
    local: f32,
    start_position: Vec3,
    start_look: Vec3,
    shots: &[CinematicShot],
) -> (Vec3, Vec3) {
    let mut from = (start_position, start_look);
    let mut remaining = local.max(0.0);

    for shot in shots {
        if remaining < shot.duration {
            let s = smoothstep(remaining / shot.duration);
            return (
                from.0.lerp(shot.position, s),
                from.1.lerp(shot.look_at, s),
            );
        }
        remaining -= shot.duration;
        from = (shot.position, shot.look_at);
    }
    from
}
