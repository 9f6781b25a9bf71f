//! Easing curves and range remapping used by camera blends

use std::f32::consts::PI;

/// Sine window ease with a tension control
///
/// Samples `sin` over a window centred on 45 degrees whose half-width is
/// `tension * 45` degrees and remaps it to `[0, 1]`. Starts fast and settles
/// gently; higher tension means a stronger ease-out.
pub fn ease_tension(t: f32, tension: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let quarter = PI * 0.25;
    let r = quarter * tension.clamp(1e-3, 1.0);
    let bottom = (quarter - r).sin();
    let top = (quarter + r).sin();
    lerp_scale(bottom, top, 0.0, 1.0, lerp(quarter - r, quarter + r, t).sin())
}

/// Quadratic ease-in-out
pub fn quad_ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - 2.0 * (1.0 - t) * (1.0 - t)
    }
}

/// Remap `value` from `[in_min, in_max]` to `[out_min, out_max]` without clamping
pub fn lerp_scale(in_min: f32, in_max: f32, out_min: f32, out_max: f32, value: f32) -> f32 {
    let range = in_max - in_min;
    if range.abs() < f32::EPSILON {
        return out_max;
    }
    out_min + (value - in_min) / range * (out_max - out_min)
}

/// Remap `value` from `[in_min, in_max]` to `[out_min, out_max]`, clamped to the output range
pub fn lerp_scale_clamp(in_min: f32, in_max: f32, out_min: f32, out_max: f32, value: f32) -> f32 {
    let lo = out_min.min(out_max);
    let hi = out_min.max(out_max);
    lerp_scale(in_min, in_max, out_min, out_max, value).clamp(lo, hi)
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_endpoints() {
        assert!(ease_tension(0.0, 0.75).abs() < 1e-6);
        assert!((ease_tension(1.0, 0.75) - 1.0).abs() < 1e-6);
        assert!(ease_tension(0.5, 0.75) > 0.5);
        assert!(ease_tension(0.25, 0.75) < ease_tension(0.5, 0.75));
        assert!((quad_ease_in_out(0.5) - 0.5).abs() < 1e-6);
        assert!((quad_ease_in_out(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lerp_scale() {
        assert!((lerp_scale(0.15, 1.0, 0.0, 1.0, 0.15)).abs() < 1e-6);
        assert!((lerp_scale(0.5, 1.0, 0.5, 1.0, 0.75) - 0.75).abs() < 1e-6);
        assert!((lerp_scale_clamp(0.0, 1.0, 0.0, 1.0, 2.0) - 1.0).abs() < 1e-6);
        assert!((lerp_scale_clamp(0.0, 1.0, 1.0, 0.0, 2.0)).abs() < 1e-6);
    }
}
