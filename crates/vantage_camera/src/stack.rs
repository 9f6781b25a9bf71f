//! The camera stack
//!
//! Nodes live in a slot map and are addressed by generation-checked
//! [`ControllerHandle`]s; a separate ordered list fixes their position,
//! bottom (index 0) to top. Ranks never decrease going up.

use crate::blend::{AboveBlendState, BlendTracker};
use crate::controller::{CameraController, ControllerTraits, NeighborInfo};
use crate::error::{CameraError, Result};
use crate::location::CameraLocation;
use crate::registry::{CameraConfig, CameraFamily};
use crate::request::RequestId;
use crate::start_info::CameraStartInfo;
use crate::types::{CameraId, CameraPriority, CameraRank, ObjectId};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use vantage_math::{Sid, Vec3};

new_key_type! {
    /// Handle to a live camera node; stale once the node is reaped
    pub struct ControllerHandle;
}

/// Handles in stack order, sized for a typical stack without spilling
pub type HandleList = SmallVec<[ControllerHandle; 16]>;

/// One instantiated controller on the stack
pub struct CameraNode {
    pub(crate) camera_id: CameraId,
    pub(crate) family: CameraFamily,
    pub(crate) rank: CameraRank,
    pub(crate) priority: CameraPriority,
    pub(crate) start_info: CameraStartInfo,
    pub(crate) controller: Box<dyn CameraController>,
    pub(crate) traits: ControllerTraits,
    pub(crate) blend: BlendTracker,
    pub(crate) location: CameraLocation,
    pub(crate) last_position: Option<Vec3>,
    pub(crate) request: Option<RequestId>,
    /// Contribution budget left for this node after the nodes above claimed theirs
    pub(crate) budget: f32,
}

impl CameraNode {
    pub(crate) fn new(
        config: &CameraConfig,
        controller: Box<dyn CameraController>,
        start_info: CameraStartInfo,
        rank: CameraRank,
        blend: BlendTracker,
        location: CameraLocation,
    ) -> Self {
        let traits = controller.traits();
        let priority = start_info.priority.unwrap_or(config.default_priority());
        Self {
            camera_id: config.id(),
            family: config.family(),
            rank,
            priority,
            start_info,
            controller,
            traits,
            blend,
            location,
            last_position: None,
            request: None,
            budget: 1.0,
        }
    }

    pub fn camera_id(&self) -> CameraId {
        self.camera_id
    }

    pub fn family(&self) -> CameraFamily {
        self.family
    }

    pub fn rank(&self) -> CameraRank {
        self.rank
    }

    pub fn priority(&self) -> CameraPriority {
        self.priority
    }

    pub fn start_info(&self) -> &CameraStartInfo {
        &self.start_info
    }

    pub fn controller(&self) -> &dyn CameraController {
        self.controller.as_ref()
    }

    pub fn traits(&self) -> ControllerTraits {
        self.traits
    }

    pub fn blend(&self) -> f32 {
        self.blend.blend()
    }

    pub fn normal_blend(&self) -> f32 {
        self.blend.normal_blend()
    }

    pub fn blend_tracker(&self) -> &BlendTracker {
        &self.blend
    }

    pub fn location(&self) -> &CameraLocation {
        &self.location
    }

    pub fn request(&self) -> Option<RequestId> {
        self.request
    }

    pub fn settings_id(&self) -> Option<Sid> {
        self.controller.settings_id().or(self.start_info.settings_id)
    }

    pub fn focus_object(&self) -> Option<ObjectId> {
        self.controller.focus_object().or(self.start_info.focus_object)
    }

    pub fn is_photo_mode(&self) -> bool {
        self.traits.photo_mode || self.start_info.photo_mode
    }

    /// Hand-off by distance is in progress against the node below
    pub fn is_fading_by_distance(&self) -> bool {
        self.traits.fades_in_by_distance
    }

    pub(crate) fn neighbor_info(&self) -> NeighborInfo {
        NeighborInfo {
            camera_id: self.camera_id,
            rank: self.rank,
            location: self.location,
            blend: self.blend.blend(),
        }
    }

    pub(crate) fn above_state(&self) -> AboveBlendState {
        AboveBlendState {
            fades_in_by_travel: self.blend.fades_in_by_travel(),
            pairs_with_below: self.traits.fades_in_by_distance,
            blend: self.blend.blend(),
        }
    }

    pub(crate) fn snapshot(&self, handle: ControllerHandle) -> NodeSnapshot {
        NodeSnapshot {
            handle,
            camera_id: self.camera_id,
            rank: self.rank,
            priority: self.priority,
            blend: self.blend.blend(),
            normal_blend: self.blend.normal_blend(),
            location: self.location,
            dying: self.blend.is_killed() || self.blend.is_ending(),
            wants_cross_fade: self.blend.wants_cross_fade(),
        }
    }
}

/// Read-only copy of a node, safe to hold across frames
#[derive(Clone, Copy, Debug)]
pub struct NodeSnapshot {
    pub handle: ControllerHandle,
    pub camera_id: CameraId,
    pub rank: CameraRank,
    pub priority: CameraPriority,
    pub blend: f32,
    pub normal_blend: f32,
    pub location: CameraLocation,
    /// Superseded or ending; will be reaped once blended out
    pub dying: bool,
    pub wants_cross_fade: bool,
}

/// Versioned copy of the whole stack, published after every write pass
#[derive(Clone, Debug, Default)]
pub struct StackSnapshot {
    /// Bumped whenever a node is inserted or removed
    pub version: u64,
    pub frame: u64,
    /// Bottom to top
    pub nodes: Vec<NodeSnapshot>,
    pub final_location: CameraLocation,
}

impl StackSnapshot {
    pub fn top(&self) -> Option<&NodeSnapshot> {
        self.nodes.last()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Ordered collection of live camera nodes
pub struct CameraStack {
    nodes: SlotMap<ControllerHandle, CameraNode>,
    order: HandleList,
    capacity: usize,
    version: u64,
}

impl CameraStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: SlotMap::with_capacity_and_key(capacity),
            order: SmallVec::new(),
            capacity,
            version: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.order.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn contains(&self, handle: ControllerHandle) -> bool {
        self.nodes.contains_key(handle)
    }

    pub fn get(&self, handle: ControllerHandle) -> Option<&CameraNode> {
        self.nodes.get(handle)
    }

    pub(crate) fn get_mut(&mut self, handle: ControllerHandle) -> Option<&mut CameraNode> {
        self.nodes.get_mut(handle)
    }

    pub fn index_of(&self, handle: ControllerHandle) -> Option<usize> {
        self.order.iter().position(|h| *h == handle)
    }

    pub fn handle_at(&self, index: usize) -> Option<ControllerHandle> {
        self.order.get(index).copied()
    }

    /// Copy of the handle order, bottom to top
    pub fn handles(&self) -> HandleList {
        self.order.clone()
    }

    /// Nodes bottom to top
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (ControllerHandle, &CameraNode)> + '_ {
        self.order.iter().map(move |h| (*h, &self.nodes[*h]))
    }

    pub fn top(&self) -> Option<ControllerHandle> {
        self.order.last().copied()
    }

    /// Node directly below `handle`
    pub fn below(&self, handle: ControllerHandle) -> Option<ControllerHandle> {
        let index = self.index_of(handle)?;
        index.checked_sub(1).and_then(|i| self.handle_at(i))
    }

    /// Node directly above `handle`
    pub fn above(&self, handle: ControllerHandle) -> Option<ControllerHandle> {
        let index = self.index_of(handle)?;
        self.handle_at(index + 1)
    }

    /// Insert `node` by rank, optionally directly above `after`
    ///
    /// Without a hint the node goes above every node of equal or lower rank.
    /// A hint only breaks ties: the position is clamped to the run of nodes
    /// sharing the new node's rank.
    pub fn insert(&mut self, node: CameraNode, after: Option<ControllerHandle>) -> Result<ControllerHandle> {
        if self.is_full() {
            return Err(CameraError::StackFull {
                capacity: self.capacity,
            });
        }

        let rank = node.rank;
        let lo = self.order.iter().filter(|h| self.nodes[**h].rank < rank).count();
        let hi = self.order.iter().filter(|h| self.nodes[**h].rank <= rank).count();
        let index = after
            .and_then(|h| self.index_of(h))
            .map(|i| (i + 1).clamp(lo, hi))
            .unwrap_or(hi);

        let handle = self.nodes.insert(node);
        self.order.insert(index, handle);
        self.version += 1;
        Ok(handle)
    }

    pub(crate) fn remove(&mut self, handle: ControllerHandle) -> Option<CameraNode> {
        let index = self.index_of(handle)?;
        self.order.remove(index);
        self.version += 1;
        self.nodes.remove(handle)
    }

    /// Topmost non-Bottom node; skips Override and Debug unless `include_top_overrides`
    pub fn current(&self, include_top_overrides: bool) -> Option<ControllerHandle> {
        self.find_current(include_top_overrides, |_| true)
    }

    /// Like [`current`](Self::current) but ignoring nodes that are fading themselves out
    pub(crate) fn current_live(&self, include_top_overrides: bool) -> Option<ControllerHandle> {
        self.find_current(include_top_overrides, |node| !node.blend.is_ending())
    }

    fn find_current(
        &self,
        include_top_overrides: bool,
        filter: impl Fn(&CameraNode) -> bool,
    ) -> Option<ControllerHandle> {
        self.iter()
            .rev()
            .find(|(_, node)| {
                node.rank != CameraRank::Bottom
                    && (include_top_overrides
                        || !matches!(node.rank, CameraRank::Override | CameraRank::Debug))
                    && filter(node)
            })
            .map(|(h, _)| h)
    }

    /// Topmost node that is neither Bottom nor Debug
    pub fn current_including_override(&self) -> Option<ControllerHandle> {
        self.iter()
            .rev()
            .find(|(_, node)| !matches!(node.rank, CameraRank::Bottom | CameraRank::Debug))
            .map(|(h, _)| h)
    }

    pub(crate) fn current_including_override_live(&self) -> Option<ControllerHandle> {
        self.iter()
            .rev()
            .find(|(_, node)| {
                !matches!(node.rank, CameraRank::Bottom | CameraRank::Debug) && !node.blend.is_ending()
            })
            .map(|(h, _)| h)
    }

    pub fn topmost_by_id(&self, id: CameraId) -> Option<ControllerHandle> {
        self.iter()
            .rev()
            .find(|(_, node)| node.camera_id == id)
            .map(|(h, _)| h)
    }

    /// Ranks never decrease from bottom to top
    pub fn is_rank_ordered(&self) -> bool {
        self.order
            .windows(2)
            .all(|pair| self.nodes[pair[0]].rank <= self.nodes[pair[1]].rank)
    }

    pub(crate) fn snapshot_nodes(&self) -> Vec<NodeSnapshot> {
        self.iter().map(|(h, node)| node.snapshot(h)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::CameraBlendInfo;
    use crate::registry::CameraRegistry;

    fn node(registry: &CameraRegistry, id: CameraId, rank: CameraRank) -> CameraNode {
        let config = registry.get(id).unwrap();
        CameraNode::new(
            config,
            config.create_controller(),
            CameraStartInfo::default(),
            rank,
            BlendTracker::new(CameraBlendInfo::seconds(0.0), 0.0),
            CameraLocation::default(),
        )
    }

    #[test]
    fn test_rank_ordered_insert() {
        let registry = CameraRegistry::with_builtin_cameras().unwrap();
        let mut stack = CameraStack::new(8);
        let bottom = stack
            .insert(node(&registry, CameraId::MANUAL_BASE, CameraRank::Bottom), None)
            .unwrap();
        let debug = stack
            .insert(node(&registry, CameraId::MANUAL, CameraRank::Debug), None)
            .unwrap();
        let normal = stack
            .insert(node(&registry, CameraId::FIXED, CameraRank::Normal), None)
            .unwrap();
        let over = stack
            .insert(node(&registry, CameraId::FIXED_OVERRIDE, CameraRank::Override), None)
            .unwrap();

        assert_eq!(stack.handles().as_slice(), &[bottom, normal, over, debug]);
        assert!(stack.is_rank_ordered());
        assert_eq!(stack.current(false), Some(normal));
        assert_eq!(stack.current(true), Some(debug));
        assert_eq!(stack.current_including_override(), Some(over));
        assert_eq!(stack.below(normal), Some(bottom));
        assert_eq!(stack.above(normal), Some(over));
    }

    #[test]
    fn test_hint_breaks_ties_only() {
        let registry = CameraRegistry::with_builtin_cameras().unwrap();
        let mut stack = CameraStack::new(8);
        let bottom = stack
            .insert(node(&registry, CameraId::MANUAL_BASE, CameraRank::Bottom), None)
            .unwrap();
        let a = stack
            .insert(node(&registry, CameraId::FIXED, CameraRank::Normal), None)
            .unwrap();
        let b = stack
            .insert(node(&registry, CameraId::FIXED, CameraRank::Normal), None)
            .unwrap();
        let after_a = stack
            .insert(node(&registry, CameraId::ORBIT, CameraRank::Normal), Some(a))
            .unwrap();
        assert_eq!(stack.handles().as_slice(), &[bottom, a, after_a, b]);

        // A hint below the rank run is clamped up to it
        let over = stack
            .insert(node(&registry, CameraId::FIXED_OVERRIDE, CameraRank::Override), Some(bottom))
            .unwrap();
        assert_eq!(stack.top(), Some(over));
        assert!(stack.is_rank_ordered());
    }

    #[test]
    fn test_capacity_and_removal() {
        let registry = CameraRegistry::with_builtin_cameras().unwrap();
        let mut stack = CameraStack::new(2);
        stack
            .insert(node(&registry, CameraId::MANUAL_BASE, CameraRank::Bottom), None)
            .unwrap();
        let a = stack
            .insert(node(&registry, CameraId::FIXED, CameraRank::Normal), None)
            .unwrap();
        let err = stack
            .insert(node(&registry, CameraId::FIXED, CameraRank::Normal), None)
            .err();
        assert_eq!(err, Some(CameraError::StackFull { capacity: 2 }));

        let version = stack.version();
        assert!(stack.remove(a).is_some());
        assert!(!stack.contains(a));
        assert!(stack.remove(a).is_none());
        assert_eq!(stack.version(), version + 1);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_topmost_by_id() {
        let registry = CameraRegistry::with_builtin_cameras().unwrap();
        let mut stack = CameraStack::new(8);
        stack
            .insert(node(&registry, CameraId::FIXED, CameraRank::Normal), None)
            .unwrap();
        let second = stack
            .insert(node(&registry, CameraId::FIXED, CameraRank::Normal), None)
            .unwrap();
        assert_eq!(stack.topmost_by_id(CameraId::FIXED), Some(second));
        assert_eq!(stack.topmost_by_id(CameraId::ORBIT), None);
    }
}
