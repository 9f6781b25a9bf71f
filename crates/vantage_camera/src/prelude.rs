//! Prelude module for common imports
//!
//! ```rust,ignore
//! use vantage_camera::prelude::*;
//! ```

// Context
pub use crate::config::CameraManagerConfig;
pub use crate::context::{CameraContext, Diagnostics};
pub use crate::frame::{FinalCamera, FrameInput};
pub use crate::hooks::{CameraManagerHooks, EnvironmentSample, NoHooks};

// Requests
pub use crate::blend::{BlendKind, CameraBlendInfo};
pub use crate::request::{CameraRequestExtension, SharedExtension};
pub use crate::start_info::CameraStartInfo;
pub use crate::types::{AssociationId, CameraId, CameraPriority, CameraRank, ObjectId, PriorityClass};

// Controllers
pub use crate::controller::{CameraController, CameraInstanceInfo, ControllerTraits, SceneQuery};
pub use crate::controllers::{
    FixedCamera, FixedParams, FollowCamera, FollowParams, ManualCamera, OrbitCamera, OrbitParams,
};
pub use crate::input::{CameraInput, MovementKeys};
pub use crate::location::CameraLocation;
pub use crate::registry::{CameraConfig, CameraFamily, CameraRegistry};
pub use crate::stack::{ControllerHandle, NodeSnapshot, StackSnapshot};

// Math
pub use vantage_math::{Locator, Quat, Sid, Vec2, Vec3};
