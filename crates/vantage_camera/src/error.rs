//! Camera stack error types

use crate::types::CameraId;
use thiserror::Error;

/// Errors raised by the camera stack
///
/// None of these escape the caller-facing request API: the context converts
/// them into sticky [`Diagnostics`](crate::Diagnostics) flags and returns a
/// null result instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    /// The camera stack already holds the maximum number of nodes
    #[error("camera stack is full ({capacity} cameras)")]
    StackFull { capacity: usize },

    /// The persistent request list already holds the maximum number of requests
    #[error("persistent camera request list is full ({capacity} requests)")]
    RequestListFull { capacity: usize },

    /// No camera type is registered under this id
    #[error("unknown camera id: {0}")]
    UnknownCamera(CameraId),

    /// A camera type was registered twice
    #[error("camera id registered twice: {0}")]
    DuplicateCamera(CameraId),

    /// The configured fallback camera is missing or not Bottom rank
    #[error("invalid bottom camera: {0}")]
    InvalidBottomCamera(String),

    /// Controller parameters do not fit in the fixed start-info blob
    #[error("start params of {size} bytes exceed the {max} byte maximum")]
    StartParamsTooLarge { size: usize, max: usize },

    /// A controller or blend produced NaN/infinite values
    #[error("non-finite camera pose from {0}")]
    NonFinitePose(CameraId),

    /// More than one node in the stack wants a cross-fade
    #[error("two cross fades in the camera stack ({first} and {second})")]
    MultipleCrossFades { first: CameraId, second: CameraId },

    /// Composition was asked to run over an empty stack
    #[error("camera stack is empty")]
    EmptyStack,

    /// Configuration values out of range
    #[error("invalid camera config: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be parsed
    #[error("failed to parse camera config: {0}")]
    ConfigParse(String),
}

impl From<toml::de::Error> for CameraError {
    fn from(err: toml::de::Error) -> Self {
        CameraError::ConfigParse(err.to_string())
    }
}

impl CameraError {
    /// Capacity errors are expected at runtime; everything else is a programmer error
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            CameraError::StackFull { .. } | CameraError::RequestListFull { .. }
        )
    }
}

/// Result type for camera stack operations
pub type Result<T> = std::result::Result<T, CameraError>;
