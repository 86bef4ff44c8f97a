use bevy::prelude::*;

use super::laser::{Laser, advance_lasers};
use super::path::FlightPath;
use crate::camera::smoothstep;
use crate::player::RideTarget;

/// Flying enemy tuning
#[derive(Debug, Clone, Copy)]
pub struct EnemyConfig {
    pub max_hp: i32,
    /// Cruise speed along the path and while repositioning
    pub move_speed: f32,
    pub shoot_interval: f32,
    pub laser_speed: f32,
    pub laser_length: f32,
    pub laser_life: f32,
    pub laser_hit_radius: f32,
    /// Lateral offset of the twin lasers
    pub laser_offset: f32,
    pub laser_lift: f32,
    /// Roll gain applied to the change in path heading
    pub tilt_intensity: f32,
    pub max_roll: f32,
    pub roll_blend_rate: f32,
    /// Look-ahead (path fraction) used to measure upcoming curvature
    pub tilt_lookahead: f32,
    pub turn_rate: f32,
    pub roll_relax_rate: f32,
    /// Path node the loop restarts from
    pub loop_start_node: usize,
    pub bounce_tension: f32,
    pub bounce_damping: f32,
    /// Bounce velocity applied by a stomp
    pub stomp_kick: f32,
    pub flash_duration: f32,
    /// Ridable top surface, in the enemy's local frame
    pub ride_offset: Vec3,
    /// Peak height of the take-off arc above the straight intro line
    pub intro_rise: f32,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            max_hp: 3,
            move_speed: 6.0,
            shoot_interval: 1.2,
            laser_speed: 30.0,
            laser_length: 36.0,
            laser_life: 1.5,
            laser_hit_radius: 2.5,
            laser_offset: 0.6,
            laser_lift: 0.2,
            tilt_intensity: 8.0,
            max_roll: 0.5,
            roll_blend_rate: 2.0,
            tilt_lookahead: 0.02,
            turn_rate: 5.0,
            roll_relax_rate: 5.0,
            loop_start_node: 17,
            bounce_tension: 150.0,
            bounce_damping: 10.0,
            stomp_kick: -6.0,
            flash_duration: 0.15,
            ride_offset: Vec3::new(0.0, 1.0, 0.0),
            intro_rise: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnemyState {
    /// Parked at its anchor until the quest cinematic wakes it
    Waiting,
    /// Scripted take-off from the anchor to the loop start
    Intro { elapsed: f32 },
    /// Flying to the loop start node
    MovingToStart,
    /// Following the path; `u` is the arc-length fraction
    PathLoop { u: f32 },
    /// Flying back from the path end to the loop start node
    Repositioning,
    Dead,
}

impl EnemyState {
    /// States in which the enemy flies and shoots
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::MovingToStart | Self::PathLoop { .. } | Self::Repositioning
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StompOutcome {
    /// Already dead
    Ignored,
    Damaged { hp: i32 },
    Killed,
}

/// Damped spring displacing the rendered height after a stomp
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounce {
    pub offset: f32,
    pub velocity: f32,
}

impl Bounce {
    fn step(&mut self, dt: f32, tension: f32, damping: f32) {
        let acceleration = -tension * self.offset - damping * self.velocity;
        self.velocity += acceleration * dt;
        self.offset += self.velocity * dt;
    }
}

/// Result of one enemy tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnemyTick {
    /// Lasers that struck the player
    pub player_hits: usize,
    pub fired: bool,
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub config: EnemyConfig,
    pub state: EnemyState,
    pub hp: i32,
    /// Base position, without the bounce offset
    pub position: Vec3,
    /// Heading, without roll
    pub rotation: Quat,
    pub roll: f32,
    pub velocity: Vec3,
    pub bounce: Bounce,
    pub lasers: Vec<Laser>,
    /// Remaining red flash after a stomp
    pub flash: f32,
    anchor_position: Vec3,
    anchor_rotation: Quat,
    path: Option<FlightPath>,
    loop_start: f32,
    intro_duration: Option<f32>,
    shoot_timer: f32,
    next_laser_id: u64,
}

impl Enemy {
    pub fn new(
        anchor_position: Vec3,
        anchor_rotation: Quat,
        path: Option<FlightPath>,
        intro_duration: Option<f32>,
        config: EnemyConfig,
    ) -> Self {
        let loop_start = path
            .as_ref()
            .map_or(0.0, |path| path.node_param(config.loop_start_node));

        Self {
            config,
            state: EnemyState::Waiting,
            hp: config.max_hp,
            position: anchor_position,
            rotation: anchor_rotation,
            roll: 0.0,
            velocity: Vec3::ZERO,
            bounce: Bounce::default(),
            lasers: Vec::new(),
            flash: 0.0,
            anchor_position,
            anchor_rotation,
            path,
            loop_start,
            intro_duration,
            shoot_timer: 0.0,
            next_laser_id: 0,
        }
    }

    /// Laser ids are unique per enemy; `id_base` separates enemies.
    pub fn with_laser_ids_from(mut self, id_base: u64) -> Self {
        self.next_laser_id = id_base;
        self
    }

    pub fn path(&self) -> Option<&FlightPath> {
        self.path.as_ref()
    }

    pub fn is_alive(&self) -> bool {
        self.state != EnemyState::Dead
    }

    pub fn render_position(&self) -> Vec3 {
        self.position + Vec3::Y * self.bounce.offset
    }

    pub fn render_rotation(&self) -> Quat {
        self.rotation * Quat::from_rotation_z(self.roll)
    }

    /// Wakes the enemy. Without an intro clip it takes off immediately.
    pub fn start_intro(&mut self) -> bool {
        if self.state != EnemyState::Waiting {
            return false;
        }
        self.state = match self.intro_duration {
            Some(duration) if duration > 0.0 => EnemyState::Intro { elapsed: 0.0 },
            _ => EnemyState::MovingToStart,
        };
        true
    }

    /// Advances the enemy and its lasers. `target` is the player position
    /// lasers are tested against.
    pub fn update(&mut self, dt: f32, target: Option<Vec3>) -> EnemyTick {
        let mut tick = EnemyTick::default();
        if self.state == EnemyState::Dead {
            return tick;
        }
        self.flash = (self.flash - dt).max(0.0);

        match self.state {
            EnemyState::Waiting => {
                self.position = self.anchor_position;
                self.rotation = self.anchor_rotation;
                self.velocity = Vec3::ZERO;
            }
            EnemyState::Intro { elapsed } => {
                let elapsed = elapsed + dt;
                let duration = self.intro_duration.unwrap_or(0.0);
                let t = if duration > 0.0 { elapsed / duration } else { 1.0 };
                self.play_intro(t);
                self.state = if t >= 1.0 {
                    EnemyState::MovingToStart
                } else {
                    EnemyState::Intro { elapsed }
                };
            }
            EnemyState::MovingToStart | EnemyState::Repositioning => match self.loop_point() {
                Some(loop_point) => {
                    if self.fly_towards(dt, loop_point) {
                        self.state = EnemyState::PathLoop { u: self.loop_start };
                    }
                }
                None => self.velocity = Vec3::ZERO,
            },
            EnemyState::PathLoop { u } => self.follow_path(dt, u),
            EnemyState::Dead => {}
        }

        let config = self.config;
        self.bounce.step(dt, config.bounce_tension, config.bounce_damping);

        if self.state.is_active() {
            self.shoot_timer += dt;
            if self.shoot_timer > config.shoot_interval {
                self.fire();
                self.shoot_timer = 0.0;
                tick.fired = true;
            }
        }

        tick.player_hits = advance_lasers(
            &mut self.lasers,
            dt,
            config.laser_speed,
            target,
            config.laser_hit_radius,
        );
        tick
    }

    /// Applies one stomp. Dead enemies ignore further stomps.
    pub fn take_damage(&mut self) -> StompOutcome {
        if self.state == EnemyState::Dead {
            return StompOutcome::Ignored;
        }
        self.hp -= 1;
        self.bounce.velocity = self.config.stomp_kick;
        self.flash = self.config.flash_duration;

        if self.hp <= 0 {
            self.state = EnemyState::Dead;
            self.lasers.clear();
            self.velocity = Vec3::ZERO;
            StompOutcome::Killed
        } else {
            StompOutcome::Damaged { hp: self.hp }
        }
    }

    pub fn ride_target(&self, index: usize) -> RideTarget {
        let position = self.render_position();
        RideTarget {
            index,
            alive: self.is_alive(),
            position,
            ride_point: position + self.render_rotation() * self.config.ride_offset,
            velocity: self.velocity,
        }
    }

    fn loop_point(&self) -> Option<Vec3> {
        let path = self.path.as_ref()?;
        Some(path.point_at(self.loop_start))
    }

    /// Intro pose at progress `t`: an eased arc from the anchor to the loop
    /// start, turning from the anchor heading to face along the flight line.
    /// Pathless enemies lift off in place.
    fn play_intro(&mut self, t: f32) {
        let t = t.clamp(0.0, 1.0);
        let eased = smoothstep(t);
        let end = self.loop_point().unwrap_or(self.anchor_position);
        let arc = (t * std::f32::consts::PI).sin() * self.config.intro_rise;

        self.position = self.anchor_position.lerp(end, eased) + Vec3::Y * arc;
        let facing = look_rotation(end - self.anchor_position).unwrap_or(self.anchor_rotation);
        self.rotation = self.anchor_rotation.slerp(facing, eased);
        self.roll = 0.0;
        // Riders inherit the eased glide, not the arc
        self.velocity = match self.intro_duration {
            Some(duration) if duration > 0.0 => {
                (end - self.anchor_position) * (6.0 * t * (1.0 - t) / duration)
            }
            _ => Vec3::ZERO,
        };
    }

    /// Moves straight at `target`. Returns `true` on arrival.
    fn fly_towards(&mut self, dt: f32, target: Vec3) -> bool {
        let offset = target - self.position;
        let distance = offset.length();
        let direction = offset.normalize_or_zero();
        let step = self.config.move_speed * dt;

        let arrived = distance <= step;
        if arrived {
            self.position = target;
        } else {
            self.position += direction * step;
        }

        if let Some(facing) = look_rotation(direction) {
            let blend = (self.config.turn_rate * dt).min(1.0);
            self.rotation = self.rotation.slerp(facing, blend);
        }
        self.roll -= self.roll * (self.config.roll_relax_rate * dt).min(1.0);
        self.velocity = direction * self.config.move_speed;
        arrived
    }

    fn follow_path(&mut self, dt: f32, u: f32) {
        let Some(path) = &self.path else {
            self.state = EnemyState::MovingToStart;
            return;
        };
        let config = self.config;

        let mut u = u + config.move_speed / path.length() * dt;
        self.state = if u >= 1.0 {
            u = 1.0;
            EnemyState::Repositioning
        } else {
            EnemyState::PathLoop { u }
        };

        let tangent = path.tangent_at(u);
        let ahead = path.tangent_at((u + config.tilt_lookahead).min(1.0));
        self.position = path.point_at(u);
        if let Some(facing) = look_rotation(tangent) {
            self.rotation = facing;
        }

        let target_roll =
            (-tangent.cross(ahead).y * config.tilt_intensity).clamp(-config.max_roll, config.max_roll);
        self.roll += (target_roll - self.roll) * (config.roll_blend_rate * dt).min(1.0);
        self.velocity = tangent * config.move_speed;
    }

    fn fire(&mut self) {
        let rotation = self.render_rotation();
        let direction = rotation * Vec3::Z;
        let right = rotation * Vec3::X;
        let origin = self.render_position() + Vec3::Y * self.config.laser_lift;
        let half_length = self.config.laser_length * 0.5;

        for side in [-1.0, 1.0] {
            self.lasers.push(Laser {
                id: self.next_laser_id,
                center: origin + right * (side * self.config.laser_offset) + direction * half_length,
                direction,
                length: self.config.laser_length,
                life: self.config.laser_life,
            });
            self.next_laser_id += 1;
        }
    }
}

/// Rotation whose local +Z points along `forward`, keeping +Y up.
pub fn look_rotation(forward: Vec3) -> Option<Quat> {
    let forward = forward.try_normalize()?;
    let right = Vec3::Y.cross(forward).try_normalize()?;
    let up = forward.cross(right);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, forward)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn straight_path() -> FlightPath {
        let points = (0..=20).map(|i| Vec3::new(0.0, 5.0, i as f32 * 2.0)).collect();
        FlightPath::new(points).unwrap()
    }

    fn enemy_with_path() -> Enemy {
        Enemy::new(
            Vec3::new(0.0, 5.0, 34.0),
            Quat::IDENTITY,
            Some(straight_path()),
            None,
            EnemyConfig::default(),
        )
    }

    #[test]
    fn three_stomps_kill_and_the_fourth_is_ignored() {
        let mut enemy = enemy_with_path();
        enemy.start_intro();

        assert_eq!(enemy.take_damage(), StompOutcome::Damaged { hp: 2 });
        assert_eq!(enemy.bounce.velocity, -6.0);
        assert_eq!(enemy.take_damage(), StompOutcome::Damaged { hp: 1 });
        assert_eq!(enemy.take_damage(), StompOutcome::Killed);
        assert_eq!(enemy.state, EnemyState::Dead);

        assert_eq!(enemy.take_damage(), StompOutcome::Ignored);
        assert_eq!(enemy.hp, 0);
        assert!(!enemy.ride_target(0).alive);
    }

    #[test]
    fn waiting_enemy_ignores_time_until_woken() {
        let mut enemy = enemy_with_path();
        for _ in 0..300 {
            let tick = enemy.update(DT, None);
            assert!(!tick.fired);
        }
        assert_eq!(enemy.state, EnemyState::Waiting);
        assert_eq!(enemy.position, Vec3::new(0.0, 5.0, 34.0));
    }

    #[test]
    fn intro_flies_an_arc_from_the_anchor_to_the_loop_start() {
        let mut enemy = Enemy::new(
            Vec3::ZERO,
            Quat::IDENTITY,
            Some(straight_path()),
            Some(1.0),
            EnemyConfig::default(),
        );
        let loop_start = enemy.path().unwrap().point_at(enemy.loop_start);

        assert!(enemy.start_intro());
        assert!(!enemy.start_intro());
        for _ in 0..30 {
            enemy.update(DT, None);
        }
        assert!(matches!(enemy.state, EnemyState::Intro { .. }));
        let midway = enemy.position;
        assert!(midway.distance(Vec3::ZERO) > 1.0);
        // Above the straight line between the anchor and the loop start
        let straight = Vec3::ZERO.lerp(loop_start, smoothstep(0.5));
        assert!(midway.y > straight.y + 1.5);
        assert!(enemy.velocity.z > 0.0);

        for _ in 0..31 {
            enemy.update(DT, None);
        }
        assert_eq!(enemy.state, EnemyState::MovingToStart);
        assert!(enemy.position.distance(loop_start) < 1e-3);
        assert!((enemy.rotation * Vec3::Z).z > 0.9);

        enemy.update(DT, None);
        assert!(matches!(enemy.state, EnemyState::PathLoop { .. }));
    }

    #[test]
    fn intro_without_a_duration_skips_straight_to_flight() {
        let mut enemy = enemy_with_path();
        enemy.start_intro();
        assert_eq!(enemy.state, EnemyState::MovingToStart);
    }

    #[test]
    fn enemy_reaches_the_loop_and_cycles() {
        let mut enemy = enemy_with_path();
        enemy.start_intro();

        let mut saw_loop = false;
        let mut saw_reposition = false;
        for _ in 0..60 * 20 {
            enemy.update(DT, None);
            match enemy.state {
                EnemyState::PathLoop { u } => {
                    saw_loop = true;
                    assert!((0.0..=1.0).contains(&u));
                }
                EnemyState::Repositioning => saw_reposition = true,
                _ => {}
            }
        }

        assert!(saw_loop && saw_reposition);
        // Laser volleys come in pairs
        assert_eq!(enemy.lasers.len() % 2, 0);
    }

    #[test]
    fn pathless_enemy_hovers_and_keeps_shooting() {
        let mut enemy = Enemy::new(Vec3::ONE, Quat::IDENTITY, None, None, EnemyConfig::default());
        enemy.start_intro();

        let mut volleys = 0;
        for _ in 0..150 {
            if enemy.update(DT, None).fired {
                volleys += 1;
            }
        }

        assert_eq!(enemy.state, EnemyState::MovingToStart);
        assert_eq!(enemy.position, Vec3::ONE);
        assert_eq!(volleys, 2);
    }

    #[test]
    fn lasers_fire_forward_and_hit_the_player() {
        let mut enemy = Enemy::new(Vec3::ZERO, Quat::IDENTITY, None, None, EnemyConfig::default());
        enemy.start_intro();

        let mut hits = 0;
        for _ in 0..120 {
            hits += enemy.update(DT, Some(Vec3::new(0.0, 0.0, 30.0))).player_hits;
        }

        assert_eq!(hits, 2);
    }

    #[test]
    fn bounce_settles_back_to_zero() {
        let mut enemy = enemy_with_path();
        enemy.take_damage();

        for _ in 0..600 {
            enemy.update(DT, None);
        }

        assert!(enemy.bounce.offset.abs() < 1e-3);
        assert_eq!(enemy.position, Vec3::new(0.0, 5.0, 34.0));
    }

    #[test]
    fn look_rotation_points_local_z_forward() {
        let rotation = look_rotation(Vec3::X).unwrap();
        assert!((rotation * Vec3::Z).distance(Vec3::X) < 1e-5);
        assert!((rotation * Vec3::Y).distance(Vec3::Y) < 1e-5);
        assert!(look_rotation(Vec3::Y).is_none());
    }
}
