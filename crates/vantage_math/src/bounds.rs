//! Bounding volumes and view frustums for visibility tests

use crate::{Locator, Vec3};

/// Bounding sphere
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Check if a point is inside the sphere
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.center.distance(point) <= self.radius
    }
}

/// Perspective view frustum described in camera space
///
/// The camera looks down -Z. Plane tests are done on the point transformed
/// into camera space, which avoids building world-space plane equations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    pub locator: Locator,
    /// Vertical field of view in degrees
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Frustum {
    pub fn new(locator: Locator, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            locator,
            fov_y,
            aspect,
            near,
            far,
        }
    }

    /// Sphere-in-frustum test (conservative, touching counts as inside)
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        let local = self.locator.untransform_point(sphere.center);
        let depth = -local.z;
        let r = sphere.radius.max(0.0);

        if depth + r < self.near || depth - r > self.far {
            return false;
        }

        let half_v = (self.fov_y.to_radians() * 0.5).clamp(0.0, std::f32::consts::FRAC_PI_2);
        let half_h = (half_v.tan() * self.aspect).atan();

        let (sv, cv) = half_v.sin_cos();
        let (sh, ch) = half_h.sin_cos();

        // Signed distances to the four side planes, positive inside
        let top = depth * sv - local.y * cv;
        let bottom = depth * sv + local.y * cv;
        let right = depth * sh - local.x * ch;
        let left = depth * sh + local.x * ch;

        top >= -r && bottom >= -r && right >= -r && left >= -r
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.intersects_sphere(&BoundingSphere::new(point, 0.0))
    }
}
