//! Laser projectiles: long line segments that sweep forward.

use bevy::prelude::*;

/// A live laser. The collision volume is the whole segment, not its centre.
#[derive(Debug, Clone, PartialEq)]
pub struct Laser {
    pub id: u64,
    pub center: Vec3,
    pub direction: Vec3,
    pub length: f32,
    /// Remaining lifetime in seconds
    pub life: f32,
}

impl Laser {
    pub fn endpoints(&self) -> (Vec3, Vec3) {
        let half = self.direction * (self.length * 0.5);
        (self.center - half, self.center + half)
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        let (start, end) = self.endpoints();
        closest_point_on_segment(start, end, point).distance(point)
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_arc(Vec3::Z, self.direction.normalize_or(Vec3::Z))
    }
}

/// Closest point to `point` on the segment `start..end`
pub fn closest_point_on_segment(start: Vec3, end: Vec3, point: Vec3) -> Vec3 {
    let segment = end - start;
    let length_sq = segment.length_squared();
    if length_sq <= 1e-12 {
        return start;
    }
    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    start + segment * t
}

/// Moves every laser, tests it against `target` and culls dead ones.
///
/// Returns how many lasers struck the target; each one is destroyed on
/// contact.
pub fn advance_lasers(
    lasers: &mut Vec<Laser>,
    dt: f32,
    speed: f32,
    target: Option<Vec3>,
    hit_radius: f32,
) -> usize {
    let mut hits = 0;
    for laser in lasers.iter_mut() {
        laser.life -= dt;
        laser.center += laser.direction * speed * dt;

        if let Some(target) = target
            && laser.distance_to(target) < hit_radius
        {
            hits += 1;
            laser.life = -1.0;
        }
    }
    lasers.retain(|laser| laser.life > 0.0);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laser_along_x(center: Vec3) -> Laser {
        Laser {
            id: 0,
            center,
            direction: Vec3::X,
            length: 36.0,
            life: 1.5,
        }
    }

    #[test]
    fn hit_registers_anywhere_along_the_segment() {
        let laser = laser_along_x(Vec3::ZERO);

        // Near the tip, far from the centre
        assert!(laser.distance_to(Vec3::new(17.0, 2.0, 0.0)) < 2.5);
        assert!(laser.distance_to(Vec3::new(-16.5, 0.0, -2.4)) < 2.5);
        assert!(laser.distance_to(Vec3::new(0.0, 0.0, 2.4)) < 2.5);
    }

    #[test]
    fn points_beyond_the_radius_never_hit() {
        let laser = laser_along_x(Vec3::ZERO);

        assert!(laser.distance_to(Vec3::new(5.0, 2.6, 0.0)) >= 2.5);
        // Past the end cap: lateral distance is small but the segment stops
        assert!(laser.distance_to(Vec3::new(21.0, 0.0, 0.0)) >= 2.5);
        assert!(laser.distance_to(Vec3::new(-19.0, 2.0, 2.0)) >= 2.5);
    }

    #[test]
    fn advance_moves_hits_and_expires() {
        let mut lasers = vec![
            laser_along_x(Vec3::new(-30.0, 0.0, 0.0)),
            Laser {
                id: 1,
                life: 0.05,
                ..laser_along_x(Vec3::new(0.0, 50.0, 0.0))
            },
        ];

        // Target sits 1 unit off the path of the first laser
        let hits = advance_lasers(&mut lasers, 0.1, 30.0, Some(Vec3::new(-5.0, 1.0, 0.0)), 2.5);

        assert_eq!(hits, 1);
        assert!(lasers.is_empty());
    }

    #[test]
    fn lasers_live_out_their_lifetime_without_a_target() {
        let mut lasers = vec![laser_along_x(Vec3::ZERO)];

        for _ in 0..14 {
            advance_lasers(&mut lasers, 0.1, 30.0, None, 2.5);
        }
        assert_eq!(lasers.len(), 1);
        assert!((lasers[0].center.x - 42.0).abs() < 1e-3);

        advance_lasers(&mut lasers, 0.1, 30.0, None, 2.5);
        assert!(lasers.is_empty());
    }
}
