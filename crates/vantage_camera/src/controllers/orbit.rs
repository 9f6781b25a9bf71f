//! Orbit camera controller
//!
//! Pivots around a target point or focus object. Blends circularly against
//! other orbit cameras and may be asked to fade itself out.

use crate::blend::CameraBlendInfo;
use crate::controller::{CameraController, CameraInstanceInfo, ControllerTraits, NeighborInfo};
use crate::location::CameraLocation;
use crate::start_info::CameraStartInfo;
use crate::types::{CameraId, ObjectId};
use bytemuck::{Pod, Zeroable};
use std::f32::consts::PI;
use vantage_math::easing::lerp;
use vantage_math::Vec3;

/// Start parameters for [`OrbitCamera`]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct OrbitParams {
    /// Distance from the target
    pub distance: f32,
    /// Horizontal angle (radians, 0 = camera on +Z of the target)
    pub azimuth: f32,
    /// Vertical angle (radians, positive = above the target)
    pub elevation: f32,
    /// Self-fade duration when asked to fade out; zero defers to the manager
    pub blend_out_seconds: f32,
}

impl Default for OrbitParams {
    fn default() -> Self {
        Self {
            distance: 5.0,
            azimuth: 0.0,
            elevation: 0.3,
            blend_out_seconds: 0.0,
        }
    }
}

/// Orbit camera controller
///
/// Rotates around a target point with adjustable distance. Input rotates
/// and zooms the orbit while the camera owns it.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    /// Point to orbit around
    pub target: Vec3,
    /// Distance from target
    pub distance: f32,
    /// Horizontal angle (radians)
    pub azimuth: f32,
    /// Vertical angle (radians, positive = above)
    pub elevation: f32,

    /// Minimum distance from target
    pub min_distance: f32,
    /// Maximum distance from target
    pub max_distance: f32,
    /// Minimum elevation angle (radians)
    pub min_elevation: f32,
    /// Maximum elevation angle (radians)
    pub max_elevation: f32,

    /// Rotation sensitivity (radians per pixel)
    pub rotation_speed: f32,
    /// Zoom sensitivity (fraction of the distance per step)
    pub zoom_speed: f32,
    /// Smooth damping factor (0 = instant, 1 = no movement)
    pub damping: f32,

    start: CameraStartInfo,
    params: OrbitParams,
    focus: Option<ObjectId>,

    // Smoothing goals
    target_azimuth: f32,
    target_elevation: f32,
    target_distance: f32,
}

impl OrbitCamera {
    pub fn new() -> Self {
        let params = OrbitParams::default();
        Self {
            target: Vec3::ZERO,
            distance: params.distance,
            azimuth: params.azimuth,
            elevation: params.elevation,

            min_distance: 0.1,
            max_distance: 1000.0,
            min_elevation: -PI * 0.45,
            max_elevation: PI * 0.45,

            rotation_speed: 0.005,
            zoom_speed: 0.1,
            damping: 0.1,

            start: CameraStartInfo::default(),
            params,
            focus: None,

            target_azimuth: params.azimuth,
            target_elevation: params.elevation,
            target_distance: params.distance,
        }
    }

    /// Set angles instantly (radians)
    pub fn set_angles(&mut self, azimuth: f32, elevation: f32) {
        self.azimuth = azimuth;
        self.elevation = elevation.clamp(self.min_elevation, self.max_elevation);
        self.target_azimuth = self.azimuth;
        self.target_elevation = self.elevation;
    }

    /// Set distance instantly
    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(self.min_distance, self.max_distance);
        self.target_distance = self.distance;
    }

    fn calculate_position(&self) -> Vec3 {
        let (sin_elev, cos_elev) = self.elevation.sin_cos();
        let (sin_azim, cos_azim) = self.azimuth.sin_cos();
        self.target
            + Vec3::new(
                self.distance * cos_elev * sin_azim,
                self.distance * sin_elev,
                self.distance * cos_elev * cos_azim,
            )
    }

    fn location(&self) -> CameraLocation {
        CameraLocation::looking_at(self.calculate_position(), self.target)
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraController for OrbitCamera {
    fn start(&mut self, start: &CameraStartInfo) -> CameraBlendInfo {
        self.start = start.clone();
        self.params = start.params.unpack().unwrap_or_default();
        self.focus = start.focus_object;
        if let Some(target) = start.target {
            self.target = target;
        }
        self.set_angles(self.params.azimuth, self.params.elevation);
        self.set_distance(self.params.distance);
        CameraBlendInfo::default()
    }

    fn update_location(&mut self, info: &CameraInstanceInfo<'_>) -> CameraLocation {
        if let Some(position) = info.object_position(self.focus) {
            self.target = position;
        }

        let input = info.input;
        if !input.suppressed {
            if input.look_held {
                self.target_azimuth -= input.look_delta.x * self.rotation_speed;
                self.target_elevation += input.look_delta.y * self.rotation_speed;
                self.target_elevation = self.target_elevation.clamp(self.min_elevation, self.max_elevation);
            }
            if input.zoom_delta.abs() > 0.0 {
                self.target_distance -= input.zoom_delta * self.zoom_speed * self.distance;
                self.target_distance = self.target_distance.clamp(self.min_distance, self.max_distance);
            }
        }

        let t = 1.0 - self.damping.powf(info.dt * 60.0);
        self.azimuth = lerp(self.azimuth, self.target_azimuth, t);
        self.elevation = lerp(self.elevation, self.target_elevation, t);
        self.distance = lerp(self.distance, self.target_distance, t);

        self.location()
    }

    fn is_equivalent_to(&self, start: &CameraStartInfo) -> bool {
        self.start.common_eq(start) && self.start.params == start.params
    }

    fn initial_location(&self, _below: Option<&CameraLocation>) -> CameraLocation {
        self.location()
    }

    fn traits(&self) -> ControllerTraits {
        ControllerTraits {
            self_fade_out_allowed: true,
            ..ControllerTraits::default()
        }
    }

    /// Swing around the pivot when handing over from another orbit
    fn circular_blend_hint(&self, below: &NeighborInfo) -> Option<bool> {
        (below.camera_id == CameraId::ORBIT).then_some(self.azimuth >= 0.0)
    }

    fn blend_out_time(&self) -> Option<f32> {
        (self.params.blend_out_seconds > 0.0).then_some(self.params.blend_out_seconds)
    }

    fn focus_object(&self) -> Option<ObjectId> {
        self.focus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CameraRank;

    fn started(params: OrbitParams) -> OrbitCamera {
        let mut camera = OrbitCamera::new();
        camera.start(
            &CameraStartInfo::new()
                .with_target(Vec3::new(1.0, 0.0, 1.0))
                .with_params(&params)
                .unwrap(),
        );
        camera
    }

    #[test]
    fn test_initial_pose_on_orbit() {
        let camera = started(OrbitParams {
            distance: 4.0,
            elevation: 0.0,
            ..OrbitParams::default()
        });
        let location = camera.initial_location(None);
        assert!((location.position() - Vec3::new(1.0, 0.0, 5.0)).length() < 1e-5);
        assert_eq!(location.target, Some(Vec3::new(1.0, 0.0, 1.0)));
    }

    #[test]
    fn test_circular_hint_only_against_orbits() {
        let camera = started(OrbitParams::default());
        let mut below = NeighborInfo {
            camera_id: CameraId::ORBIT,
            rank: CameraRank::Normal,
            location: CameraLocation::default(),
            blend: 1.0,
        };
        assert_eq!(camera.circular_blend_hint(&below), Some(true));
        below.camera_id = CameraId::FIXED;
        assert_eq!(camera.circular_blend_hint(&below), None);
    }

    #[test]
    fn test_blend_out_time() {
        assert_eq!(started(OrbitParams::default()).blend_out_time(), None);
        let camera = started(OrbitParams {
            blend_out_seconds: 1.5,
            ..OrbitParams::default()
        });
        assert_eq!(camera.blend_out_time(), Some(1.5));
        assert!(camera.traits().self_fade_out_allowed);
    }
}
