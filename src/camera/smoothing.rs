use std::f32::consts::{PI, TAU};

/// Cubic ease `t²(3 - 2t)`, input clamped to [0, 1]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Wraps an angle into (-PI, PI]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

/// Interpolates between two angles along the shorter arc
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    from + wrap_angle(to - from) * t
}

/// Converts a per-60Hz-frame lerp factor into one for an arbitrary `dt`
pub fn damp_factor(per_frame: f32, dt: f32) -> f32 {
    1.0 - (1.0 - per_frame.clamp(0.0, 1.0)).powf(dt * 60.0)
}

/// Moves `value` toward zero by `rate * dt` of its magnitude
pub fn relax(value: f32, rate: f32, dt: f32) -> f32 {
    value - value * (rate * dt).min(1.0)
}
