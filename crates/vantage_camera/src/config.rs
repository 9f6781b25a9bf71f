//! Camera manager configuration
//!
//! Runtime tunables for one [`CameraContext`](crate::CameraContext). Loadable
//! from TOML; every field has a default so partial files are fine.

use crate::error::{CameraError, Result};
use serde::{Deserialize, Serialize};
use vantage_math::Locator;

/// Configuration for a camera context
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraManagerConfig {
    /// Maximum number of nodes on the camera stack
    pub max_cameras: usize,
    /// Maximum number of persistent requests
    pub max_persistent_requests: usize,
    /// Blend used when a controller asks for the default blend (seconds)
    pub default_blend_seconds: f32,
    /// Self-fade duration used when neither request nor camera specify one (seconds)
    pub self_fade_default_seconds: f32,
    /// Time to fade back in when a self-fade is cancelled (seconds)
    pub cancel_self_fade_seconds: f32,
    /// Near plane used when a controller reports a non-positive one
    pub default_near_plane: f32,
    /// Far plane for visibility tests
    pub far_plane: f32,
    /// Viewport aspect ratio for visibility tests
    pub aspect_ratio: f32,
    /// Tolerance for blend comparisons
    pub blend_epsilon: f32,
    /// Final camera speed (units per second) above which the frame counts as a cut
    pub max_cut_speed: f32,
    /// Force every push to blend in instantly
    pub force_zero_blend_times: bool,
    /// Raise the pause flag when the stack overflows
    pub pause_on_stack_overflow: bool,
    /// Panic on invariant violations instead of falling back to the last valid pose
    pub assert_invariants: bool,
    /// Registered name of the Bottom-rank fallback camera
    pub bottom_camera: String,
    /// Locator handed to the first camera that starts without one
    pub start_locator: Locator,
}

impl CameraManagerConfig {
    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: CameraManagerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Shipping build settings: invariant violations fall back silently
    pub fn shipping() -> Self {
        Self {
            assert_invariants: false,
            pause_on_stack_overflow: false,
            ..Self::base()
        }
    }

    /// Development build settings: assert on invariant violations and pause on overflow
    pub fn development() -> Self {
        Self {
            assert_invariants: true,
            pause_on_stack_overflow: true,
            ..Self::base()
        }
    }

    fn base() -> Self {
        Self {
            max_cameras: 32,
            max_persistent_requests: 20,
            default_blend_seconds: 0.5,
            self_fade_default_seconds: 0.5,
            cancel_self_fade_seconds: 0.25,
            default_near_plane: 0.24,
            far_plane: 1000.0,
            aspect_ratio: 16.0 / 9.0,
            blend_epsilon: 1e-4,
            max_cut_speed: 25_000f32.sqrt(),
            force_zero_blend_times: false,
            pause_on_stack_overflow: false,
            assert_invariants: cfg!(debug_assertions),
            bottom_camera: "manual-base".to_string(),
            start_locator: Locator::IDENTITY,
        }
    }

    /// Check that all values are usable
    pub fn validate(&self) -> Result<()> {
        if self.max_cameras < 2 {
            return Err(CameraError::InvalidConfig(format!(
                "max_cameras must leave room above the bottom camera, got {}",
                self.max_cameras
            )));
        }
        if self.max_persistent_requests == 0 {
            return Err(CameraError::InvalidConfig(
                "max_persistent_requests must be positive".into(),
            ));
        }
        if self.default_near_plane <= 0.0 || self.far_plane <= self.default_near_plane {
            return Err(CameraError::InvalidConfig(format!(
                "near/far planes out of order: {} / {}",
                self.default_near_plane, self.far_plane
            )));
        }
        if self.aspect_ratio <= 0.0 {
            return Err(CameraError::InvalidConfig("aspect_ratio must be positive".into()));
        }
        if !(0.0..0.1).contains(&self.blend_epsilon) {
            return Err(CameraError::InvalidConfig(format!(
                "blend_epsilon out of range: {}",
                self.blend_epsilon
            )));
        }
        if self.default_blend_seconds < 0.0
            || self.self_fade_default_seconds < 0.0
            || self.cancel_self_fade_seconds < 0.0
        {
            return Err(CameraError::InvalidConfig("blend times must not be negative".into()));
        }
        Ok(())
    }
}

impl Default for CameraManagerConfig {
    fn default() -> Self {
        Self::base()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(CameraManagerConfig::default().validate().is_ok());
        assert!(CameraManagerConfig::shipping().validate().is_ok());
        assert!(CameraManagerConfig::development().assert_invariants);
        assert!(!CameraManagerConfig::shipping().assert_invariants);
    }

    #[test]
    fn test_partial_toml() {
        let config = CameraManagerConfig::from_toml_str(
            r#"
            max_cameras = 8
            default_blend_seconds = 1.25
            bottom_camera = "fixed"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_cameras, 8);
        assert!((config.default_blend_seconds - 1.25).abs() < 1e-6);
        assert_eq!(config.bottom_camera, "fixed");
        assert_eq!(config.max_persistent_requests, 20);
    }

    #[test]
    fn test_toml_start_locator() {
        let config = CameraManagerConfig::from_toml_str(
            r#"
            [start_locator.position]
            x = 1.0
            y = 2.0
            z = 3.0

            [start_locator.rotation]
            x = 0.0
            y = 0.0
            z = 0.0
            w = 1.0
            "#,
        )
        .unwrap();
        assert!((config.start_locator.position.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = CameraManagerConfig::from_toml_str("max_cameras = 1").unwrap_err();
        assert!(matches!(err, CameraError::InvalidConfig(_)));

        let err = CameraManagerConfig::from_toml_str("max_cameras = \"lots\"").unwrap_err();
        assert!(matches!(err, CameraError::ConfigParse(_)));
    }
}
