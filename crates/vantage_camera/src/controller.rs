//! Controller capability contract
//!
//! A camera *behavior* (manual fly-cam, fixed camera, orbit, follow, ...) is
//! a [`CameraController`]. The stack owns one boxed controller per node and
//! asks it for a pose every frame; everything else about the node (rank,
//! priority, blend state) lives in the node itself.

use crate::blend::CameraBlendInfo;
use crate::input::CameraInput;
use crate::location::CameraLocation;
use crate::start_info::CameraStartInfo;
use crate::types::{CameraId, CameraRank, ObjectId};
use vantage_math::{Sid, Vec3};

/// Static capabilities a controller declares
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerTraits {
    /// Hands off with the node below by distance to its focus object
    pub fades_in_by_distance: bool,
    /// Keep contributing budget to the nodes below while on top
    pub keep_lower_cameras_alive: bool,
    /// Keep receiving location updates while fully occluded
    pub keep_alive_when_occluded: bool,
    /// May be asked to fade itself out instead of being replaced
    pub self_fade_out_allowed: bool,
    /// Free-fly debug camera driven by raw input
    pub manual: bool,
    /// Exclusive photo mode camera
    pub photo_mode: bool,
    /// Keeps blending and updating while the game is paused
    pub run_when_paused: bool,
    /// Cannot work without its focus object; removed once the object is gone
    pub needs_focus: bool,
    /// Stays on the stack when a needed focus object disappears
    pub dont_kill_on_focus_death: bool,
}

/// A neighbouring node as seen from a controller
#[derive(Clone, Copy, Debug)]
pub struct NeighborInfo {
    pub camera_id: CameraId,
    pub rank: CameraRank,
    pub location: CameraLocation,
    pub blend: f32,
}

/// World lookups available to controllers
pub trait SceneQuery {
    /// Current world position of an object, if it still exists
    fn object_position(&self, object: ObjectId) -> Option<Vec3>;
}

/// Per-frame context handed to [`CameraController::update_location`]
pub struct CameraInstanceInfo<'a> {
    /// Delta time of the clock this node runs on
    pub dt: f32,
    pub camera_id: CameraId,
    pub rank: CameraRank,
    /// Index in the stack, 0 = bottom
    pub stack_index: usize,
    /// Topmost node on the stack; the only one that sees live input
    pub is_top: bool,
    pub blend: f32,
    pub normal_blend: f32,
    /// This node's own pose from last frame
    pub previous: &'a CameraLocation,
    /// Final composited pose from last frame
    pub composited: &'a CameraLocation,
    pub below: Option<NeighborInfo>,
    pub above: Option<NeighborInfo>,
    pub input: &'a CameraInput,
    pub scene: Option<&'a dyn SceneQuery>,
}

impl CameraInstanceInfo<'_> {
    /// Position of `object` in the scene
    pub fn object_position(&self, object: Option<ObjectId>) -> Option<Vec3> {
        let object = object?;
        self.scene?.object_position(object)
    }
}

/// A pluggable camera behavior
pub trait CameraController: Send + Sync {
    /// Initialize from the start parameters and suggest a blend
    ///
    /// Returning `CameraBlendInfo::default()` lets the manager pick.
    fn start(&mut self, start: &CameraStartInfo) -> CameraBlendInfo {
        let _ = start;
        CameraBlendInfo::default()
    }

    /// Compute this frame's desired pose
    fn update_location(&mut self, info: &CameraInstanceInfo<'_>) -> CameraLocation;

    /// Would starting with `start` produce this same camera?
    fn is_equivalent_to(&self, start: &CameraStartInfo) -> bool;

    /// Pose before the first update, given the pose of the node below
    fn initial_location(&self, below: Option<&CameraLocation>) -> CameraLocation {
        below.copied().unwrap_or_default()
    }

    fn traits(&self) -> ControllerTraits {
        ControllerTraits::default()
    }

    /// Hand-off weight against the node below, in [0, 1]
    fn distance_weight(&self) -> f32 {
        1.0
    }

    /// Blend value for `BlendKind::Script` blends
    fn scripted_blend(&self) -> Option<f32> {
        None
    }

    /// Distance the focus object has moved since start, for travel blends
    fn travelled_distance(&self) -> f32 {
        0.0
    }

    /// `Some(side_first)` to blend around a pivot against the node below
    fn circular_blend_hint(&self, below: &NeighborInfo) -> Option<bool> {
        let _ = below;
        None
    }

    /// Preferred self-fade duration when asked to fade out
    fn blend_out_time(&self) -> Option<f32> {
        None
    }

    fn settings_id(&self) -> Option<Sid> {
        None
    }

    fn focus_object(&self) -> Option<ObjectId> {
        None
    }

    /// The camera was pushed with a zero-time blend
    fn notify_cut(&mut self, below: Option<&CameraLocation>) {
        let _ = below;
    }

    /// The node was superseded and will die once covered
    fn on_kill_when_blended_out(&mut self) {}

    /// The node was asked to fade itself out
    fn on_self_fade_out(&mut self, duration: f32) {
        let _ = duration;
    }
}
