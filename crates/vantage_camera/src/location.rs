//! Camera poses and the blend operators the compositor applies to them

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use vantage_math::easing::lerp;
use vantage_math::{Locator, Quat, Vec3};

/// Vertical field of view used when nothing else is known (degrees)
pub const DEFAULT_FOV: f32 = 60.0;

/// Near plane used when nothing else is known
pub const DEFAULT_NEAR_PLANE: f32 = 0.24;

/// A renderable camera pose
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraLocation {
    pub locator: Locator,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Near clip distance; zero or negative means "use the manager default"
    pub near_plane: f32,
    /// Lens distortion amount
    pub distortion: f32,
    /// Point the camera pivots around or looks at
    pub target: Option<Vec3>,
    pub velocity: Option<Vec3>,
}

impl Default for CameraLocation {
    fn default() -> Self {
        Self::new(Locator::IDENTITY)
    }
}

impl CameraLocation {
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            fov: DEFAULT_FOV,
            near_plane: DEFAULT_NEAR_PLANE,
            distortion: 0.0,
            target: None,
            velocity: None,
        }
    }

    /// Pose at `position` looking at `target`, remembering the target
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        Self::new(Locator::looking_at(position, target)).with_target(target)
    }

    pub fn with_fov(mut self, fov: f32) -> Self {
        self.fov = fov;
        self
    }

    pub fn with_near_plane(mut self, near_plane: f32) -> Self {
        self.near_plane = near_plane;
        self
    }

    pub fn with_target(mut self, target: Vec3) -> Self {
        self.target = Some(target);
        self
    }

    pub fn position(&self) -> Vec3 {
        self.locator.position
    }

    pub fn rotation(&self) -> Quat {
        self.locator.rotation
    }

    pub fn forward(&self) -> Vec3 {
        self.locator.rotation.forward()
    }

    pub fn is_finite(&self) -> bool {
        self.locator.is_finite()
            && self.fov.is_finite()
            && self.near_plane.is_finite()
            && self.distortion.is_finite()
            && self.target.map_or(true, |t| t.is_finite())
            && self.velocity.map_or(true, |v| v.is_finite())
    }

    /// Default blend: interpolate towards `other` by `t` (0 = self, 1 = other)
    ///
    /// Position lerps, rotation slerps, lens values lerp. A target present on
    /// only one side is carried through unchanged rather than blended from
    /// nothing.
    pub fn lerp(&self, other: &CameraLocation, t: f32) -> CameraLocation {
        let t = t.clamp(0.0, 1.0);
        CameraLocation {
            locator: Locator::new(
                self.locator.position.lerp(other.locator.position, t),
                self.locator.rotation.slerp(other.locator.rotation, t),
            ),
            fov: lerp(self.fov, other.fov, t),
            near_plane: lerp(self.near_plane, other.near_plane, t),
            distortion: lerp(self.distortion, other.distortion, t),
            target: blend_optional(self.target, other.target, t),
            velocity: blend_optional(self.velocity, other.velocity, t),
        }
    }

    /// Orbit-aware blend around the targets of both poses
    ///
    /// The camera swings around the pivot along the shorter arc instead of
    /// cutting straight through it. When the two poses sit on opposite sides
    /// the arc is ambiguous and `side_first` picks the positive (true) or
    /// negative (false) direction. Falls back to [`lerp`](Self::lerp) when
    /// neither pose has a target.
    pub fn lerp_circular(&self, other: &CameraLocation, t: f32, side_first: bool) -> CameraLocation {
        let (pivot_a, pivot_b) = match (self.target, other.target) {
            (Some(a), Some(b)) => (a, b),
            (Some(a), None) => (a, a),
            (None, Some(b)) => (b, b),
            (None, None) => return self.lerp(other, t),
        };

        let t = t.clamp(0.0, 1.0);
        let offset_a = self.locator.position - pivot_a;
        let offset_b = other.locator.position - pivot_b;

        let angle_a = offset_a.x.atan2(offset_a.z);
        let angle_b = offset_b.x.atan2(offset_b.z);
        let radius_a = (offset_a.x * offset_a.x + offset_a.z * offset_a.z).sqrt();
        let radius_b = (offset_b.x * offset_b.x + offset_b.z * offset_b.z).sqrt();

        let mut delta = wrap_angle(angle_b - angle_a);
        if delta.abs() > PI - 1e-3 {
            delta = if side_first { delta.abs() } else { -delta.abs() };
        }

        let angle = angle_a + delta * t;
        let radius = lerp(radius_a, radius_b, t);
        let pivot = pivot_a.lerp(pivot_b, t);
        let position = pivot
            + Vec3::new(
                angle.sin() * radius,
                lerp(offset_a.y, offset_b.y, t),
                angle.cos() * radius,
            );

        let mut blended = self.lerp(other, t);
        blended.locator.position = position;
        blended
    }
}

fn blend_optional(a: Option<Vec3>, b: Option<Vec3>, t: f32) -> Option<Vec3> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.lerp(b, t)),
        (a, b) => a.or(b),
    }
}

fn wrap_angle(angle: f32) -> f32 {
    let two_pi = 2.0 * PI;
    let mut a = angle % two_pi;
    if a > PI {
        a -= two_pi;
    } else if a <= -PI {
        a += two_pi;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, z: f32) -> CameraLocation {
        CameraLocation::looking_at(Vec3::new(x, 1.0, z), Vec3::ZERO)
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = at(0.0, 5.0).with_fov(50.0);
        let b = at(5.0, 0.0).with_fov(70.0);
        assert_eq!(a.lerp(&b, 0.0).position(), a.position());
        let end = a.lerp(&b, 1.0);
        assert!((end.position() - b.position()).length() < 1e-5);
        assert!((a.lerp(&b, 0.5).fov - 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_target_kept_from_one_side() {
        let a = CameraLocation::default();
        let b = at(3.0, 3.0);
        let mid = a.lerp(&b, 0.25);
        assert_eq!(mid.target, Some(Vec3::ZERO));
    }

    #[test]
    fn test_circular_blend_keeps_radius() {
        let a = at(0.0, 5.0);
        let b = at(5.0, 0.0);
        let mid = a.lerp_circular(&b, 0.5, true);
        let flat = Vec3::new(mid.position().x, 0.0, mid.position().z);
        assert!((flat.length() - 5.0).abs() < 1e-3);
        // Straight lerp would cut inside the orbit
        let straight = a.lerp(&b, 0.5);
        let straight_flat = Vec3::new(straight.position().x, 0.0, straight.position().z);
        assert!(straight_flat.length() < 4.0);
    }

    #[test]
    fn test_circular_blend_side_hint() {
        let a = at(0.0, 5.0);
        let b = at(0.0, -5.0);
        let pos = a.lerp_circular(&b, 0.5, true).position();
        let neg = a.lerp_circular(&b, 0.5, false).position();
        assert!(pos.x > 4.9);
        assert!(neg.x < -4.9);
    }

    #[test]
    fn test_non_finite_detected() {
        let mut loc = CameraLocation::default();
        assert!(loc.is_finite());
        loc.fov = f32::NAN;
        assert!(!loc.is_finite());
    }
}
