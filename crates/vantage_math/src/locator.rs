//! Rigid transforms

use crate::{Quat, Vec3};
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Position plus orientation
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct Locator {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Locator {
    pub const IDENTITY: Locator = Locator {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Locator at `position` facing `target`
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::look_rotation(target - position, Vec3::UP),
        }
    }

    /// Transform a point from local space into world space
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation.rotate_vec3(point)
    }

    /// Transform a point from world space into local space
    pub fn untransform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.conjugate().rotate_vec3(point - self.position)
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_round_trip() {
        let loc = Locator::looking_at(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 0.0, -2.0));
        let p = Vec3::new(0.5, -1.0, 7.0);
        let back = loc.untransform_point(loc.transform_point(p));
        assert!((back - p).length() < 1e-4);
    }
}
