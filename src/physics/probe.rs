use avian3d::prelude::*;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Surface classification of a collidable, used for footstep sounds and
/// the altar trigger.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    #[default]
    Grass,
    Stone,
    /// The quest trigger platform. Sounds like stone underfoot.
    Altar,
}

impl SurfaceKind {
    /// Classifies a surface by the name of the level object it came from.
    pub fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("altar") || name.contains("plataforma") {
            Self::Altar
        } else if name.contains("stone") || name.contains("console") || name.contains("mirador") {
            Self::Stone
        } else {
            Self::Grass
        }
    }

    pub fn is_hard(self) -> bool {
        matches!(self, Self::Stone | Self::Altar)
    }
}

/// Nearest hit returned by a [`SpatialProbe`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeHit {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
    pub entity: Option<Entity>,
    pub surface: SurfaceKind,
}

/// Ray queries against the collidable level geometry.
///
/// Every actor goes through this seam, so the state machines never see the
/// physics engine directly.
pub trait SpatialProbe {
    fn cast_ray(&self, origin: Vec3, direction: Dir3, max_distance: f32) -> Option<ProbeHit>;
}

/// [`SpatialProbe`] backed by Avian's spatial query pipeline, restricted to
/// world geometry.
pub struct AvianProbe<'a, 'w, 's> {
    spatial_query: &'a SpatialQuery<'w, 's>,
    filter: SpatialQueryFilter,
    classify: &'a dyn Fn(Entity) -> SurfaceKind,
}

impl<'a, 'w, 's> AvianProbe<'a, 'w, 's> {
    pub fn new(
        spatial_query: &'a SpatialQuery<'w, 's>,
        mask: impl Into<LayerMask>,
        classify: &'a dyn Fn(Entity) -> SurfaceKind,
    ) -> Self {
        Self {
            spatial_query,
            filter: SpatialQueryFilter::default().with_mask(mask),
            classify,
        }
    }
}

impl SpatialProbe for AvianProbe<'_, '_, '_> {
    fn cast_ray(&self, origin: Vec3, direction: Dir3, max_distance: f32) -> Option<ProbeHit> {
        let hit = self
            .spatial_query
            .cast_ray(origin, direction, max_distance, true, &self.filter)?;

        Some(ProbeHit {
            distance: hit.distance,
            point: origin + direction.as_vec3() * hit.distance,
            normal: hit.normal,
            entity: Some(hit.entity),
            surface: (self.classify)(hit.entity),
        })
    }
}

/// Axis-aligned box with a surface tag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeBox {
    pub min: Vec3,
    pub max: Vec3,
    pub surface: SurfaceKind,
}

impl ProbeBox {
    pub fn from_center(center: Vec3, half_extents: Vec3, surface: SurfaceKind) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
            surface,
        }
    }

    /// Slab test. Returns the entry distance and the entry axis, or `None`
    /// when the ray misses or starts inside the box.
    fn ray_entry(&self, origin: Vec3, dir: Vec3) -> Option<(f32, usize)> {
        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut axis = 0;

        for i in 0..3 {
            if dir[i].abs() < 1e-8 {
                if origin[i] < self.min[i] || origin[i] > self.max[i] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir[i];
            let mut t0 = (self.min[i] - origin[i]) * inv;
            let mut t1 = (self.max[i] - origin[i]) * inv;
            if t0 > t1 {
                core::mem::swap(&mut t0, &mut t1);
            }
            if t0 > t_enter {
                t_enter = t0;
                axis = i;
            }
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }

        (t_enter >= 0.0).then_some((t_enter, axis))
    }
}

/// In-memory [`SpatialProbe`] over a handful of boxes.
///
/// Hit points land exactly on the struck face so that ground snapping is
/// free of rounding drift.
#[derive(Debug, Clone, Default)]
pub struct BoxProbe {
    pub boxes: Vec<ProbeBox>,
}

impl BoxProbe {
    pub fn new(boxes: impl IntoIterator<Item = ProbeBox>) -> Self {
        Self {
            boxes: boxes.into_iter().collect(),
        }
    }

    /// A single flat slab whose top face sits at `height`.
    pub fn flat_floor(height: f32, half_size: f32, surface: SurfaceKind) -> Self {
        Self::new([ProbeBox {
            min: Vec3::new(-half_size, height - 1.0, -half_size),
            max: Vec3::new(half_size, height, half_size),
            surface,
        }])
    }

    pub fn with_box(mut self, probe_box: ProbeBox) -> Self {
        self.boxes.push(probe_box);
        self
    }
}

impl SpatialProbe for BoxProbe {
    fn cast_ray(&self, origin: Vec3, direction: Dir3, max_distance: f32) -> Option<ProbeHit> {
        let dir = direction.as_vec3();

        self.boxes
            .iter()
            .filter_map(|b| {
                let (t, axis) = b.ray_entry(origin, dir)?;
                if t > max_distance {
                    return None;
                }
                let mut point = origin + dir * t;
                let mut normal = Vec3::ZERO;
                if dir[axis] > 0.0 {
                    point[axis] = b.min[axis];
                    normal[axis] = -1.0;
                } else {
                    point[axis] = b.max[axis];
                    normal[axis] = 1.0;
                }
                Some(ProbeHit {
                    distance: t,
                    point,
                    normal,
                    entity: None,
                    surface: b.surface,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}
