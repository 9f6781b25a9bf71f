//! Start parameters copied into camera requests
//!
//! [`CameraStartInfo`] holds the fields every controller understands. The
//! controller-specific part travels in [`StartParams`], a fixed-size blob of
//! plain-old-data that each controller packs and unpacks with its own
//! `bytemuck::Pod` struct.

use crate::error::{CameraError, Result};
use crate::request::SharedExtension;
use crate::types::{CameraPriority, ObjectId};
use bytemuck::Pod;
use std::fmt;
use vantage_math::{Locator, Sid, Vec3};

/// Controller-specific parameters, at most [`StartParams::MAX_BYTES`] long
#[derive(Clone, Copy)]
pub struct StartParams {
    len: usize,
    bytes: [u8; StartParams::MAX_BYTES],
}

impl StartParams {
    /// Size of the largest parameter struct any controller may use
    pub const MAX_BYTES: usize = 128;

    pub const EMPTY: StartParams = StartParams {
        len: 0,
        bytes: [0; StartParams::MAX_BYTES],
    };

    /// Copy `value` into a blob
    pub fn pack<T: Pod>(value: &T) -> Result<Self> {
        let src = bytemuck::bytes_of(value);
        if src.len() > Self::MAX_BYTES {
            return Err(CameraError::StartParamsTooLarge {
                size: src.len(),
                max: Self::MAX_BYTES,
            });
        }
        let mut params = Self::EMPTY;
        params.bytes[..src.len()].copy_from_slice(src);
        params.len = src.len();
        Ok(params)
    }

    /// Read the blob back as `T`; `None` when it holds something else
    pub fn unpack<T: Pod>(&self) -> Option<T> {
        if self.len != std::mem::size_of::<T>() {
            return None;
        }
        bytemuck::try_pod_read_unaligned(&self.bytes[..self.len]).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl Default for StartParams {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl PartialEq for StartParams {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Debug for StartParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartParams").field("len", &self.len).finish()
    }
}

/// Parameters a camera is started with
#[derive(Clone, Debug, Default)]
pub struct CameraStartInfo {
    pub focus_object: Option<ObjectId>,
    pub locator: Option<Locator>,
    /// Placement for cameras started without a locator; not part of equality
    pub fallback_locator: Option<Locator>,
    pub target: Option<Vec3>,
    pub settings_id: Option<Sid>,
    pub spawner_id: Option<Sid>,
    /// Overrides the registered default priority
    pub priority: Option<CameraPriority>,
    /// Push even when an equivalent camera is already active
    pub force: bool,
    pub photo_mode: bool,
    /// Do not fill in the default focus object
    pub no_focus_object: bool,
    /// Started as the spatial base of a distance hand-off pair
    pub distance_base: bool,
    pub params: StartParams,
    /// Set by the resolver from the request's extension
    pub extension: Option<SharedExtension>,
}

impl CameraStartInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_focus(mut self, object: ObjectId) -> Self {
        self.focus_object = Some(object);
        self
    }

    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn with_target(mut self, target: Vec3) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_settings(mut self, settings: Sid) -> Self {
        self.settings_id = Some(settings);
        self
    }

    pub fn with_spawner(mut self, spawner: Sid) -> Self {
        self.spawner_id = Some(spawner);
        self
    }

    pub fn with_priority(mut self, priority: CameraPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn photo_mode(mut self) -> Self {
        self.photo_mode = true;
        self
    }

    /// Explicit locator, else the manager-supplied fallback
    pub fn placement(&self) -> Option<Locator> {
        self.locator.or(self.fallback_locator)
    }

    /// Attach controller-specific parameters
    pub fn with_params<T: Pod>(mut self, params: &T) -> Result<Self> {
        self.params = StartParams::pack(params)?;
        Ok(self)
    }

    /// Equality of the fields shared by every controller, ignoring `params`
    pub fn common_eq(&self, other: &CameraStartInfo) -> bool {
        self.focus_object == other.focus_object
            && self.locator == other.locator
            && self.target == other.target
            && self.settings_id == other.settings_id
            && self.spawner_id == other.spawner_id
            && self.photo_mode == other.photo_mode
    }
}

/// Structural equality; the attached extension is not part of it
impl PartialEq for CameraStartInfo {
    fn eq(&self, other: &Self) -> bool {
        self.common_eq(other)
            && self.priority == other.priority
            && self.force == other.force
            && self.no_focus_object == other.no_focus_object
            && self.distance_base == other.distance_base
            && self.params == other.params
    }
}
