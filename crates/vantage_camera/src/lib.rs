//! # Vantage Camera
//!
//! Camera stack resolution and blending for real-time 3D games.
//!
//! Game code asks for cameras through a [`CameraContext`]. Each request names
//! a registered camera type, a priority and optional start parameters.
//! The context decides which request owns the view and keeps a rank-ordered
//! stack of live camera controllers. Every frame it blends that stack into
//! one [`FinalCamera`].
//!
//! - **Requests**: persistent (named, multi-frame) and transient (one-shot)
//! - **Stack**: Bottom < Normal < Override < Debug ranks, handle-addressed nodes
//! - **Blending**: timed, eased, travel-distance, distance-paired, scripted and
//!   cross-fade blends
//! - **Controllers**: a small trait; built-in manual, fixed, orbit and follow cameras
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vantage_camera::prelude::*;
//!
//! let cameras = CameraContext::builtin(CameraManagerConfig::default())?;
//! cameras.request_persistent_camera(
//!     CameraId::FOLLOW,
//!     AssociationId::new("player"),
//!     None,
//!     Some(CameraStartInfo::new().with_focus(player)),
//! );
//!
//! loop {
//!     let camera = cameras.update(&FrameInput::new(dt).with_scene(&scene));
//!     renderer.set_view(camera.location);
//! }
//! ```

// Identifiers, priorities and ranks
pub mod types;

// Errors
pub mod error;

// Configuration
pub mod config;

// Camera poses and controls
pub mod input;
pub mod location;

// Blend descriptions and tracking
pub mod blend;

// Controller interface and built-in controllers
pub mod controller;
pub mod controllers;

// Camera type registry
pub mod registry;

// Requests and start parameters
pub mod request;
pub mod start_info;

// Camera stack
pub mod stack;

// Stack composition
pub mod compositor;

// Per-frame input and output
pub mod frame;

// Game hooks
pub mod hooks;

// Camera context
pub mod context;

mod reaper;
mod resolver;

// Prelude for common imports
pub mod prelude;

// Re-export core types at crate root
pub use blend::{BlendKind, CameraBlendInfo, BLEND_EPSILON};
pub use compositor::{composite, Composite, CompositeLayer};
pub use config::CameraManagerConfig;
pub use context::{CameraContext, Diagnostics};
pub use controller::{CameraController, CameraInstanceInfo, ControllerTraits, NeighborInfo, SceneQuery};
pub use error::{CameraError, Result};
pub use frame::{FinalCamera, FrameInput};
pub use hooks::{CameraManagerHooks, EnvironmentSample, NoHooks};
pub use input::{CameraInput, MovementKeys};
pub use location::CameraLocation;
pub use registry::{CameraConfig, CameraFamily, CameraRegistry};
pub use request::{CameraRequest, CameraRequestExtension, RequestId, SharedExtension};
pub use stack::{ControllerHandle, NodeSnapshot, StackSnapshot};
pub use start_info::{CameraStartInfo, StartParams};
pub use types::{AssociationId, CameraId, CameraPriority, CameraRank, ObjectId, PriorityClass};
