//! Camera requests
//!
//! A request describes a camera somebody wants active. *Transient* requests
//! live for exactly one resolution pass. *Persistent* requests are named by
//! an [`AssociationId`], kept in a priority-ordered list and survive until
//! disabled, abandoned or replaced.

use crate::blend::CameraBlendInfo;
use crate::registry::CameraConfig;
use crate::stack::ControllerHandle;
use crate::start_info::CameraStartInfo;
use crate::types::{AssociationId, CameraId, CameraPriority, CameraRank};
use std::fmt;
use std::sync::Arc;
use vantage_math::Sid;

/// Extra per-request logic shared between a request and the controller it spawned
///
/// The controller may outlive the request, so the extension is reference
/// counted; every other part of a request is a plain owned value.
pub trait CameraRequestExtension: Send + Sync + fmt::Debug {
    /// Refresh the start parameters before the request is evaluated
    fn update_request(&self, start_info: &mut CameraStartInfo) {
        let _ = start_info;
    }

    /// `Some(blend)` asks for a new resolution pass next frame using `blend`
    fn should_reevaluate(&self) -> Option<CameraBlendInfo> {
        None
    }

    /// False once whatever fed this request has gone away
    fn has_sources(&self) -> bool {
        true
    }
}

/// Shared handle to a request extension
pub type SharedExtension = Arc<dyn CameraRequestExtension>;

/// Unique id of a request within one context
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub(crate) u64);

/// A desired camera activation
#[derive(Clone, Debug)]
pub struct CameraRequest {
    pub(crate) id: RequestId,
    pub(crate) camera_id: CameraId,
    pub(crate) association: AssociationId,
    pub(crate) start_info: CameraStartInfo,
    pub(crate) blend: CameraBlendInfo,
    pub(crate) extension: Option<SharedExtension>,
    pub(crate) priority: CameraPriority,
    pub(crate) rank: CameraRank,
    pub(crate) is_active: bool,
    pub(crate) is_abandoned: bool,
    pub(crate) is_dormant: bool,
    pub(crate) controller: Option<ControllerHandle>,
}

impl CameraRequest {
    pub(crate) fn new(
        id: RequestId,
        config: &CameraConfig,
        association: AssociationId,
        blend: Option<CameraBlendInfo>,
        start_info: Option<CameraStartInfo>,
    ) -> Self {
        let start_info = start_info.unwrap_or_else(|| config.default_start_info().clone());
        let priority = start_info.priority.unwrap_or(config.default_priority());
        Self {
            id,
            camera_id: config.id(),
            association,
            start_info,
            blend: blend.unwrap_or_default(),
            extension: config.create_extension(),
            priority,
            rank: config.default_rank(),
            is_active: true,
            is_abandoned: false,
            is_dormant: false,
            controller: None,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn camera_id(&self) -> CameraId {
        self.camera_id
    }

    pub fn association(&self) -> AssociationId {
        self.association
    }

    pub fn start_info(&self) -> &CameraStartInfo {
        &self.start_info
    }

    pub fn start_info_mut(&mut self) -> &mut CameraStartInfo {
        &mut self.start_info
    }

    pub fn blend(&self) -> CameraBlendInfo {
        self.blend
    }

    pub fn priority(&self) -> CameraPriority {
        self.priority
    }

    pub fn rank(&self) -> CameraRank {
        self.rank
    }

    pub fn extension(&self) -> Option<&SharedExtension> {
        self.extension.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_abandoned(&self) -> bool {
        self.is_abandoned
    }

    pub fn is_dormant(&self) -> bool {
        self.is_dormant
    }

    /// Controller this request last spawned; may no longer be on the stack
    pub fn controller(&self) -> Option<ControllerHandle> {
        self.controller
    }

    /// Structural validity, before the manager hook gets a say
    pub(crate) fn is_selectable(&self) -> bool {
        self.is_active
            && !self.is_dormant
            && self.extension.as_ref().map_or(true, |ext| ext.has_sources())
    }
}

/// Abandoned requests to skip or keep during selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Abandoned {
    Include,
    Exclude,
}

/// Result of offering a persistent request to the book
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InsertOutcome {
    Inserted(RequestId),
    Duplicate,
    Full,
}

/// Persistent request list plus the resolver's per-context request state
pub(crate) struct RequestBook {
    /// Highest priority first; equal priorities newest first
    persistent: Vec<CameraRequest>,
    capacity: usize,
    next_id: u64,
    pub(crate) blend_override_high: Option<CameraBlendInfo>,
    pub(crate) blend_override_low: Option<CameraBlendInfo>,
    /// `Some` when a resolution pass is due; holds the blend to use
    pub(crate) pending: Option<Option<CameraBlendInfo>>,
    pub(crate) starting_first_camera: bool,
}

impl RequestBook {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            persistent: Vec::with_capacity(capacity),
            capacity,
            next_id: 1,
            blend_override_high: None,
            blend_override_low: None,
            pending: None,
            starting_first_camera: true,
        }
    }

    pub(crate) fn allocate_id(&mut self) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn len(&self) -> usize {
        self.persistent.len()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.persistent.len() >= self.capacity
    }

    pub(crate) fn requests(&self) -> &[CameraRequest] {
        &self.persistent
    }

    pub(crate) fn get(&self, index: usize) -> Option<&CameraRequest> {
        self.persistent.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut CameraRequest> {
        self.persistent.get_mut(index)
    }

    pub(crate) fn index_of(&self, id: RequestId) -> Option<usize> {
        self.persistent.iter().position(|r| r.id == id)
    }

    /// Ask for a resolution pass; an explicit blend wins over a pending default
    pub(crate) fn schedule(&mut self, blend: Option<CameraBlendInfo>) {
        self.pending = match (self.pending.take(), blend) {
            (_, Some(blend)) => Some(Some(blend)),
            (Some(previous), None) => Some(previous),
            (None, None) => Some(None),
        };
    }

    /// Same priority and association as a request already in the book
    pub(crate) fn is_duplicate(&self, request: &CameraRequest) -> bool {
        self.persistent
            .iter()
            .any(|r| r.priority == request.priority && r.association == request.association)
    }

    /// Insert in priority order, deduplicating on priority + association
    pub(crate) fn insert(&mut self, request: CameraRequest) -> InsertOutcome {
        if self.is_duplicate(&request) {
            return InsertOutcome::Duplicate;
        }
        if self.is_full() {
            return InsertOutcome::Full;
        }

        let index = self
            .persistent
            .iter()
            .position(|r| r.priority <= request.priority)
            .unwrap_or(self.persistent.len());
        let id = request.id;
        self.persistent.insert(index, request);
        InsertOutcome::Inserted(id)
    }

    /// Index of the first request passing `valid`, in priority order
    ///
    /// Extensions get to refresh their request first, and may schedule a
    /// re-evaluation for next frame.
    pub(crate) fn best_index(
        &mut self,
        abandoned: Abandoned,
        mut valid: impl FnMut(&CameraRequest) -> bool,
    ) -> Option<usize> {
        let mut reevaluate = None;
        let mut best = None;

        for (index, request) in self.persistent.iter_mut().enumerate() {
            if abandoned == Abandoned::Exclude && request.is_abandoned {
                continue;
            }
            if let Some(ext) = request.extension.clone() {
                ext.update_request(&mut request.start_info);
                if let Some(blend) = ext.should_reevaluate() {
                    reevaluate = Some(blend);
                }
            }
            if request.is_selectable() && valid(request) {
                best = Some(index);
                break;
            }
        }

        if let Some(blend) = reevaluate {
            self.schedule(Some(blend));
        }
        best
    }

    /// Oldest request with `name` matching `filter`, searching from the back
    fn find_from_back(&self, name: Sid, filter: impl Fn(&CameraRequest) -> bool) -> Option<usize> {
        self.persistent
            .iter()
            .rposition(|r| r.association.name == name && filter(r))
    }

    pub(crate) fn find(&self, name: Sid) -> Option<&CameraRequest> {
        self.find_from_back(name, |_| true)
            .map(|index| &self.persistent[index])
    }

    /// Deactivate the oldest active request named `name`
    pub(crate) fn disable(&mut self, name: Sid) -> Option<&mut CameraRequest> {
        let index = self.find_from_back(name, |r| r.is_active)?;
        let request = &mut self.persistent[index];
        request.is_active = false;
        Some(request)
    }

    /// Mark the oldest non-abandoned request named `name` as abandoned
    pub(crate) fn abandon(&mut self, name: Sid) -> bool {
        match self.find_from_back(name, |r| !r.is_abandoned) {
            Some(index) => {
                self.persistent[index].is_abandoned = true;
                true
            }
            None => false,
        }
    }

    /// Flip the dormant flag of the oldest request named `name` that differs
    pub(crate) fn set_dormant(&mut self, name: Sid, dormant: bool) -> Option<&CameraRequest> {
        let index = self.find_from_back(name, |r| r.is_dormant != dormant)?;
        let request = &mut self.persistent[index];
        request.is_dormant = dormant;
        Some(request)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut CameraRequest> {
        self.persistent.iter_mut()
    }

    pub(crate) fn clear(&mut self) -> usize {
        let count = self.persistent.len();
        self.persistent.clear();
        count
    }

    /// Drop requests that are done
    ///
    /// A request goes once it is inactive and its controller has left the
    /// stack, or, when `reap_abandoned` is set, as soon as it is abandoned.
    pub(crate) fn reap(
        &mut self,
        reap_abandoned: bool,
        controller_alive: impl Fn(ControllerHandle) -> bool,
    ) -> usize {
        let before = self.persistent.len();
        self.persistent.retain(|r| {
            let finished = !r.is_active && !r.controller.map_or(false, &controller_alive);
            let abandoned = reap_abandoned && r.is_abandoned;
            !(finished || abandoned)
        });
        before - self.persistent.len()
    }

    /// Drop older requests re-targeted by `association` (same name, other index)
    pub(crate) fn reap_association(&mut self, association: AssociationId) -> usize {
        let before = self.persistent.len();
        self.persistent.retain(|r| {
            r.association.name != association.name || r.association.index == association.index
        });
        before - self.persistent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CameraRegistry;
    use crate::types::PriorityClass;

    fn request(book: &mut RequestBook, name: &str, class: PriorityClass) -> CameraRequest {
        let registry = CameraRegistry::with_builtin_cameras().unwrap();
        let config = registry.get(CameraId::FIXED).unwrap();
        let start = CameraStartInfo::new().with_priority(CameraPriority::of(class));
        CameraRequest::new(
            book.allocate_id(),
            config,
            AssociationId::new(name),
            None,
            Some(start),
        )
    }

    #[test]
    fn test_priority_order() {
        let mut book = RequestBook::new(8);
        let low = request(&mut book, "low", PriorityClass::Gameplay);
        let high = request(&mut book, "high", PriorityClass::Forced);
        let mid = request(&mut book, "mid", PriorityClass::Special);
        book.insert(low);
        book.insert(high);
        book.insert(mid);

        let names: Vec<_> = book.requests().iter().map(|r| r.association).collect();
        assert_eq!(
            names,
            vec![
                AssociationId::new("high"),
                AssociationId::new("mid"),
                AssociationId::new("low")
            ]
        );
    }

    #[test]
    fn test_duplicate_is_noop() {
        let mut book = RequestBook::new(8);
        let a = request(&mut book, "door", PriorityClass::Gameplay);
        let b = request(&mut book, "door", PriorityClass::Gameplay);
        assert!(matches!(book.insert(a), InsertOutcome::Inserted(_)));
        assert_eq!(book.insert(b), InsertOutcome::Duplicate);
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_capacity() {
        let mut book = RequestBook::new(1);
        let a = request(&mut book, "a", PriorityClass::Gameplay);
        let b = request(&mut book, "b", PriorityClass::Gameplay);
        book.insert(a);
        assert_eq!(book.insert(b), InsertOutcome::Full);
    }

    #[test]
    fn test_best_skips_inactive_dormant_and_abandoned() {
        let mut book = RequestBook::new(8);
        let a = request(&mut book, "a", PriorityClass::Forced);
        let b = request(&mut book, "b", PriorityClass::Special);
        let c = request(&mut book, "c", PriorityClass::Gameplay);
        book.insert(a);
        book.insert(b);
        book.insert(c);

        assert_eq!(book.best_index(Abandoned::Include, |_| true), Some(0));
        assert!(book.abandon(Sid::new("a")));
        assert_eq!(book.best_index(Abandoned::Include, |_| true), Some(0));
        assert_eq!(book.best_index(Abandoned::Exclude, |_| true), Some(1));

        assert!(book.set_dormant(Sid::new("b"), true).is_some());
        assert_eq!(book.best_index(Abandoned::Exclude, |_| true), Some(2));

        assert!(book.disable(Sid::new("c")).is_some());
        assert_eq!(book.best_index(Abandoned::Exclude, |_| true), None);
    }

    #[test]
    fn test_reap_rules() {
        let mut book = RequestBook::new(8);
        let a = request(&mut book, "a", PriorityClass::Forced);
        let b = request(&mut book, "b", PriorityClass::Gameplay);
        book.insert(a);
        book.insert(b);
        book.abandon(Sid::new("a"));
        book.disable(Sid::new("b"));

        assert_eq!(book.reap(false, |_| true), 1);
        assert_eq!(book.len(), 1);
        assert_eq!(book.reap(true, |_| true), 1);
        assert_eq!(book.len(), 0);
    }

    #[test]
    fn test_reap_association_index() {
        let mut book = RequestBook::new(8);
        let mut a = request(&mut book, "door", PriorityClass::Gameplay);
        a.association = AssociationId::new("door").with_index(1);
        book.insert(a);
        assert_eq!(book.reap_association(AssociationId::new("door").with_index(2)), 1);
        assert_eq!(book.len(), 0);
    }

    #[test]
    fn test_schedule_keeps_explicit_blend() {
        let mut book = RequestBook::new(2);
        book.schedule(Some(CameraBlendInfo::seconds(1.0)));
        book.schedule(None);
        assert_eq!(book.pending, Some(Some(CameraBlendInfo::seconds(1.0))));
    }
}
