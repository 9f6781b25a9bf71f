//! Manual camera controller
//!
//! Free-flight camera with WASD movement and mouse look. Registered twice:
//! as the Debug-rank fly cam and as the Bottom-rank fallback that is always
//! on the stack.

use crate::blend::CameraBlendInfo;
use crate::controller::{CameraController, CameraInstanceInfo, ControllerTraits};
use crate::location::CameraLocation;
use crate::start_info::CameraStartInfo;
use std::f32::consts::PI;
use vantage_math::{Locator, Quat, Vec3};

/// Free-flight camera controller
///
/// Holds still unless it owns the input this frame.
///
/// # Example
///
/// ```ignore
/// let mut manual = ManualCamera::new();
/// manual.move_speed = 10.0;
/// manual.look_speed = 0.003;
/// ```
#[derive(Clone, Debug)]
pub struct ManualCamera {
    /// Current position
    pub position: Vec3,
    /// Yaw angle (radians, 0 = looking down -Z)
    pub yaw: f32,
    /// Pitch angle (radians, positive = looking up)
    pub pitch: f32,

    /// Movement speed (units per second)
    pub move_speed: f32,
    /// Sprint speed multiplier
    pub sprint_multiplier: f32,
    /// Slow speed multiplier
    pub slow_multiplier: f32,
    /// Mouse look sensitivity (radians per pixel)
    pub look_speed: f32,
    /// Field of view change per zoom step (degrees)
    pub zoom_speed: f32,

    /// Minimum pitch angle (radians)
    pub min_pitch: f32,
    /// Maximum pitch angle (radians)
    pub max_pitch: f32,

    /// Smooth movement damping (0 = instant, higher = smoother)
    pub move_damping: f32,

    fov: f32,
    has_start_locator: bool,
    synced: bool,
    velocity: Vec3,
}

impl ManualCamera {
    pub fn new() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            yaw: 0.0,
            pitch: 0.0,

            move_speed: 5.0,
            sprint_multiplier: 2.5,
            slow_multiplier: 0.3,
            look_speed: 0.003,
            zoom_speed: 2.0,

            min_pitch: -PI * 0.49,
            max_pitch: PI * 0.49,

            move_damping: 0.1,

            fov: crate::location::DEFAULT_FOV,
            has_start_locator: false,
            synced: false,
            velocity: Vec3::ZERO,
        }
    }

    /// Place the camera at `locator`, keeping only yaw and pitch of its rotation
    pub fn set_locator(&mut self, locator: &Locator) {
        self.position = locator.position;
        let forward = locator.rotation.forward();
        self.yaw = (-forward.x).atan2(-forward.z);
        self.pitch = forward.y.clamp(-1.0, 1.0).asin().clamp(self.min_pitch, self.max_pitch);
        self.velocity = Vec3::ZERO;
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler_yxz(self.yaw, self.pitch, 0.0)
    }

    fn location(&self) -> CameraLocation {
        CameraLocation::new(Locator::new(self.position, self.rotation())).with_fov(self.fov)
    }
}

impl Default for ManualCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraController for ManualCamera {
    fn start(&mut self, start: &CameraStartInfo) -> CameraBlendInfo {
        if let Some(locator) = &start.placement() {
            self.set_locator(locator);
            self.has_start_locator = true;
        }
        CameraBlendInfo::default()
    }

    fn update_location(&mut self, info: &CameraInstanceInfo<'_>) -> CameraLocation {
        if !self.synced {
            // Pick up wherever the initial pose put us
            self.set_locator(&info.previous.locator);
            self.fov = info.previous.fov;
            self.synced = true;
        }

        let input = info.input;
        if input.suppressed {
            self.velocity = Vec3::ZERO;
            return self.location();
        }

        if input.look_held {
            self.yaw -= input.look_delta.x * self.look_speed;
            self.pitch -= input.look_delta.y * self.look_speed;
            self.pitch = self.pitch.clamp(self.min_pitch, self.max_pitch);
        }
        if input.zoom_delta != 0.0 {
            self.fov = (self.fov - input.zoom_delta * self.zoom_speed).clamp(5.0, 120.0);
        }

        let move_dir = input.movement_direction();
        let speed = self.move_speed * input.keys.speed_multiplier(self.sprint_multiplier, self.slow_multiplier);

        let rotation = self.rotation();
        let target_velocity =
            (rotation.right() * move_dir.x + Vec3::UP * move_dir.y - rotation.forward() * move_dir.z) * speed;

        let t = 1.0 - self.move_damping.powf(info.dt * 60.0);
        self.velocity = self.velocity.lerp(target_velocity, t);
        self.position += self.velocity * info.dt;

        self.location()
    }

    /// Any manual camera is the same manual camera unless a new placement is asked for
    fn is_equivalent_to(&self, start: &CameraStartInfo) -> bool {
        start.locator.is_none() || !self.has_start_locator
    }

    fn initial_location(&self, below: Option<&CameraLocation>) -> CameraLocation {
        match below {
            Some(below) if !self.has_start_locator => *below,
            _ => self.location(),
        }
    }

    fn traits(&self) -> ControllerTraits {
        ControllerTraits {
            manual: true,
            keep_lower_cameras_alive: true,
            run_when_paused: true,
            ..ControllerTraits::default()
        }
    }
}
