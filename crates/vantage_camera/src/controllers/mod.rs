//! Built-in camera controllers
//!
//! - [`ManualCamera`] - Free-flight debug camera, also the Bottom-rank fallback
//! - [`FixedCamera`] - Static camera placed from the start locator
//! - [`OrbitCamera`] - Pivots around a target point
//! - [`FollowCamera`] - Follows a focus object; its distance variant hands
//!   off against the camera below by distance

mod fixed;
mod follow;
mod manual;
mod orbit;

pub use fixed::{FixedCamera, FixedParams};
pub use follow::{FollowCamera, FollowParams};
pub use manual::ManualCamera;
pub use orbit::{OrbitCamera, OrbitParams};

use crate::error::Result;
use crate::registry::{CameraConfig, CameraFamily, CameraRegistry};
use crate::types::{CameraId, CameraPriority, CameraRank, PriorityClass};

/// Register every built-in camera type with `registry`
pub fn register_builtin(registry: &mut CameraRegistry) -> Result<()> {
    registry.register(
        CameraConfig::new(CameraId::MANUAL, || Box::new(ManualCamera::new()))
            .with_rank(CameraRank::Debug)
            .with_priority(CameraPriority::new(
                PriorityClass::Forced,
                CameraPriority::LEVEL_MAX - 1,
            )),
    )?;
    registry.register(
        CameraConfig::new(CameraId::MANUAL_BASE, || Box::new(ManualCamera::new()))
            .with_rank(CameraRank::Bottom)
            .with_priority(CameraPriority::of(PriorityClass::Player)),
    )?;

    registry.register(
        CameraConfig::new(CameraId::FIXED, || Box::new(FixedCamera::new())).with_params::<FixedParams>(),
    )?;
    registry.register(
        CameraConfig::new(CameraId::FIXED_OVERRIDE, || Box::new(FixedCamera::new()))
            .with_rank(CameraRank::Override)
            .with_priority(CameraPriority::of(PriorityClass::Special))
            .with_params::<FixedParams>(),
    )?;

    registry.register(
        CameraConfig::new(CameraId::ORBIT, || Box::new(OrbitCamera::new()))
            .with_priority(CameraPriority::of(PriorityClass::Designer))
            .with_params::<OrbitParams>(),
    )?;

    registry.register(
        CameraConfig::new(CameraId::FOLLOW, || Box::new(FollowCamera::new()))
            .with_family(CameraFamily::DistanceRemapped)
            .with_distance_partner(CameraId::FOLLOW_DISTANCE)
            .with_params::<FollowParams>(),
    )?;
    registry.register(
        CameraConfig::new(CameraId::FOLLOW_DISTANCE, || Box::new(FollowCamera::by_distance()))
            .with_family(CameraFamily::DistanceRemapped)
            .with_params::<FollowParams>(),
    )?;

    Ok(())
}
