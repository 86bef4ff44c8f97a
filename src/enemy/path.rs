//! Flight paths extracted from level geometry.

use bevy::math::cubic_splines::{CubicCardinalSpline, CubicCurve, CubicGenerator};
use bevy::prelude::*;

/// Samples closer than this to the previously kept one are dropped
pub const MIN_SAMPLE_SPACING: f32 = 0.05;

/// Arc-length lookup resolution
const ARC_DIVISIONS: usize = 200;

/// Reduces raw vertex samples to an ordered, direction-monotonic point list.
///
/// Two passes: near-duplicates are removed, then any sample that would make
/// the path double back on its running direction is skipped. This is a lossy
/// heuristic; a genuinely sharp (> 90°) turn in the source geometry is
/// discarded along with the noise.
pub fn simplify_samples(raw: &[Vec3]) -> Vec<Vec3> {
    let Some(&first) = raw.first() else {
        return Vec::new();
    };

    let mut spaced = vec![first];
    for &sample in &raw[1..] {
        if let Some(&last) = spaced.last()
            && sample.distance(last) > MIN_SAMPLE_SPACING
        {
            spaced.push(sample);
        }
    }
    if spaced.len() < 3 {
        return spaced;
    }

    let mut kept = vec![spaced[0], spaced[1]];
    let mut direction = (spaced[1] - spaced[0]).normalize_or_zero();
    for &candidate in &spaced[2..] {
        let last = kept[kept.len() - 1];
        let next = (candidate - last).normalize_or_zero();
        if direction.dot(next) > 0.0 {
            kept.push(candidate);
            direction = next;
        }
    }
    kept
}

/// Open Catmull-Rom curve through a point list, sampled by arc length.
///
/// The curve itself is bevy_math's cardinal spline, whose end tangents are
/// mirrored so it passes through every point. Arc length is tabulated on top
/// of it.
#[derive(Debug, Clone)]
pub struct FlightPath {
    points: Vec<Vec3>,
    curve: CubicCurve<Vec3>,
    /// Cumulative length at raw parameter `i / ARC_DIVISIONS`
    arc_lengths: Vec<f32>,
}

impl FlightPath {
    /// Needs at least two distinct points.
    pub fn new(points: Vec<Vec3>) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let curve = CubicCardinalSpline::new_catmull_rom(points.iter().copied())
            .to_curve()
            .ok()?;
        let mut path = Self {
            points,
            curve,
            arc_lengths: Vec::with_capacity(ARC_DIVISIONS + 1),
        };

        let mut total = 0.0;
        let mut previous = path.raw_point(0.0);
        path.arc_lengths.push(0.0);
        for i in 1..=ARC_DIVISIONS {
            let point = path.raw_point(i as f32 / ARC_DIVISIONS as f32);
            total += point.distance(previous);
            path.arc_lengths.push(total);
            previous = point;
        }

        (total > 1e-4).then_some(path)
    }

    /// Simplifies raw geometry samples and builds the curve through them.
    pub fn from_samples(raw: &[Vec3]) -> Option<Self> {
        Self::new(simplify_samples(raw))
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn length(&self) -> f32 {
        self.arc_lengths[ARC_DIVISIONS]
    }

    /// Point at arc-length fraction `u` in [0, 1]
    pub fn point_at(&self, u: f32) -> Vec3 {
        self.raw_point(self.raw_param(u))
    }

    /// Unit tangent at arc-length fraction `u`
    pub fn tangent_at(&self, u: f32) -> Vec3 {
        self.raw_tangent(self.raw_param(u)).normalize_or_zero()
    }

    /// Arc-length fraction at which the curve passes through point `index`
    pub fn node_param(&self, index: usize) -> f32 {
        let index = index.min(self.points.len() - 1);
        let t = index as f32 / (self.points.len() - 1) as f32;
        self.arc_param(t)
    }

    /// Raw curve parameter -> arc-length fraction
    fn arc_param(&self, t: f32) -> f32 {
        let scaled = t.clamp(0.0, 1.0) * ARC_DIVISIONS as f32;
        let i = (scaled.floor() as usize).min(ARC_DIVISIONS - 1);
        let frac = scaled - i as f32;
        let length = self.arc_lengths[i] + (self.arc_lengths[i + 1] - self.arc_lengths[i]) * frac;
        length / self.length()
    }

    /// Arc-length fraction -> raw curve parameter
    fn raw_param(&self, u: f32) -> f32 {
        let target = u.clamp(0.0, 1.0) * self.length();
        let i = self
            .arc_lengths
            .partition_point(|&length| length <= target)
            .saturating_sub(1)
            .min(ARC_DIVISIONS - 1);
        let span = self.arc_lengths[i + 1] - self.arc_lengths[i];
        let frac = if span > 0.0 {
            ((target - self.arc_lengths[i]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (i as f32 + frac) / ARC_DIVISIONS as f32
    }

    /// Normalised parameter -> spline parameter, one unit per segment
    fn curve_param(&self, t: f32) -> f32 {
        t.clamp(0.0, 1.0) * (self.points.len() - 1) as f32
    }

    fn raw_point(&self, t: f32) -> Vec3 {
        self.curve.position(self.curve_param(t))
    }

    fn raw_tangent(&self, t: f32) -> Vec3 {
        self.curve.velocity(self.curve_param(t))
    }
}
