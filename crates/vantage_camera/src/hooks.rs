//! Game-side customisation of a camera context

use crate::location::CameraLocation;
use crate::request::CameraRequest;
use crate::types::ObjectId;
use vantage_math::Vec3;

/// Environment probe results, collected asynchronously by the game
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EnvironmentSample {
    /// Height of the water surface under the camera, if any
    pub water_height: Option<f32>,
    /// Wind velocity at the camera
    pub wind: Vec3,
}

impl EnvironmentSample {
    /// Push `location` vertically so the near plane never straddles the water surface
    pub fn keep_clear_of_water(&self, mut location: CameraLocation) -> CameraLocation {
        let Some(height) = self.water_height else {
            return location;
        };
        let clearance = location.near_plane.max(0.0);
        let offset = location.locator.position.y - height;
        if offset.abs() < clearance {
            location.locator.position.y = if offset >= 0.0 {
                height + clearance
            } else {
                height - clearance
            };
        }
        location
    }
}

/// Hooks a game installs on a [`CameraContext`](crate::CameraContext)
///
/// Every method has a neutral default, so implementors override only what
/// they need.
pub trait CameraManagerHooks: Send + Sync {
    /// Called for every new request; returning false vetoes a persistent insert
    fn on_request_camera(&self, request: &mut CameraRequest, persistent: bool) -> bool {
        let _ = (request, persistent);
        true
    }

    /// Extra validity test for persistent requests during selection
    fn is_persistent_request_valid(
        &self,
        request: &CameraRequest,
        transient: Option<&CameraRequest>,
    ) -> bool {
        let _ = (request, transient);
        true
    }

    /// Photo mode is running; photo cameras then block all but forced requests
    fn is_photo_mode_active(&self) -> bool {
        false
    }

    /// Focus object filled into requests that do not name one
    fn default_focus_object(&self) -> Option<ObjectId> {
        None
    }

    /// Latest environment sample, or `None` while the probe is still pending
    fn poll_environment(&self) -> Option<EnvironmentSample> {
        None
    }

    /// Adjust the final pose to the environment
    fn adjust_to_environment(
        &self,
        location: CameraLocation,
        environment: &EnvironmentSample,
    ) -> CameraLocation {
        environment.keep_clear_of_water(location)
    }
}

/// Hooks with every default in place
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl CameraManagerHooks for NoHooks {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_clearance() {
        let sample = EnvironmentSample {
            water_height: Some(1.0),
            wind: Vec3::ZERO,
        };
        let mut above = CameraLocation::default().with_near_plane(0.25);
        above.locator.position.y = 1.1;
        assert!((sample.keep_clear_of_water(above).position().y - 1.25).abs() < 1e-6);

        let mut below = above;
        below.locator.position.y = 0.9;
        assert!((sample.keep_clear_of_water(below).position().y - 0.75).abs() < 1e-6);

        let mut clear = above;
        clear.locator.position.y = 5.0;
        assert_eq!(sample.keep_clear_of_water(clear), clear);
    }

    #[test]
    fn test_no_water_is_noop() {
        let location = CameraLocation::default();
        assert_eq!(
            NoHooks.adjust_to_environment(location, &EnvironmentSample::default()),
            location
        );
    }
}
