//! Fixed camera controller
//!
//! Holds the pose it was started with.

use crate::blend::CameraBlendInfo;
use crate::controller::{CameraController, CameraInstanceInfo};
use crate::location::{CameraLocation, DEFAULT_FOV};
use crate::start_info::CameraStartInfo;
use bytemuck::{Pod, Zeroable};
use vantage_math::Locator;

/// Start parameters for [`FixedCamera`]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct FixedParams {
    /// Vertical field of view (degrees)
    pub fov: f32,
    /// Near plane; zero uses the manager default
    pub near_plane: f32,
}

impl Default for FixedParams {
    fn default() -> Self {
        Self {
            fov: DEFAULT_FOV,
            near_plane: 0.0,
        }
    }
}

/// Static camera
///
/// Placed at the start locator, looking at the start target when one is
/// given. Without a locator it takes over the pose of the camera below.
#[derive(Clone, Debug, Default)]
pub struct FixedCamera {
    start: CameraStartInfo,
    params: FixedParams,
    location: Option<CameraLocation>,
}

impl FixedCamera {
    pub fn new() -> Self {
        Self::default()
    }

    fn placed(&self) -> Option<CameraLocation> {
        let locator = self.start.placement()?;
        let locator = match self.start.target {
            Some(target) => Locator::looking_at(locator.position, target),
            None => locator,
        };
        let mut location = CameraLocation::new(locator)
            .with_fov(self.params.fov)
            .with_near_plane(self.params.near_plane);
        location.target = self.start.target;
        Some(location)
    }
}

impl CameraController for FixedCamera {
    fn start(&mut self, start: &CameraStartInfo) -> CameraBlendInfo {
        self.start = start.clone();
        self.params = start.params.unpack().unwrap_or_default();
        self.location = self.placed();
        CameraBlendInfo::default()
    }

    fn update_location(&mut self, info: &CameraInstanceInfo<'_>) -> CameraLocation {
        *self.location.get_or_insert(*info.previous)
    }

    fn is_equivalent_to(&self, start: &CameraStartInfo) -> bool {
        self.start.common_eq(start) && self.start.params == start.params
    }

    fn initial_location(&self, below: Option<&CameraLocation>) -> CameraLocation {
        self.location
            .or_else(|| below.copied())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_math::Vec3;

    #[test]
    fn test_placed_from_locator() {
        let mut camera = FixedCamera::new();
        let start = CameraStartInfo::new()
            .with_locator(Locator::new(Vec3::new(1.0, 2.0, 3.0), Default::default()))
            .with_target(Vec3::ZERO)
            .with_params(&FixedParams {
                fov: 40.0,
                near_plane: 0.5,
            })
            .unwrap();
        camera.start(&start);

        let location = camera.initial_location(None);
        assert_eq!(location.position(), Vec3::new(1.0, 2.0, 3.0));
        assert!((location.fov - 40.0).abs() < 1e-6);
        let to_target = (Vec3::ZERO - location.position()).normalize();
        assert!((location.forward() - to_target).length() < 1e-4);
    }

    #[test]
    fn test_takes_pose_from_below_without_locator() {
        let mut camera = FixedCamera::new();
        camera.start(&CameraStartInfo::new());
        let below = CameraLocation::looking_at(Vec3::new(5.0, 1.0, 0.0), Vec3::ZERO);
        assert_eq!(camera.initial_location(Some(&below)), below);
    }

    #[test]
    fn test_equivalence_compares_start() {
        let mut camera = FixedCamera::new();
        let start = CameraStartInfo::new().with_locator(Locator::IDENTITY);
        camera.start(&start);
        assert!(camera.is_equivalent_to(&start));
        assert!(camera.is_equivalent_to(&start.clone().forced()));
        assert!(!camera.is_equivalent_to(&CameraStartInfo::new()));
    }
}
