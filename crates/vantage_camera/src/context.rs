//! Camera context
//!
//! One [`CameraContext`] per player or viewport. It owns the request book,
//! the camera stack and the per-frame state, and runs the frame pipeline:
//!
//! 1. Advance the game and camera clocks
//! 2. Resolve requests if a pass was scheduled
//! 3. Advance every node's blend, then hand out the contribution budget
//! 4. Ask each contributing controller for its pose, bottom to top
//! 5. Composite the stack, apply near plane, environment and velocity
//! 6. Reap dead nodes and finished requests, shift the cut flags
//! 7. Publish a snapshot for readers
//!
//! All request calls and [`update`](CameraContext::update) take the write
//! locks in a fixed order: requests, stack, frame state, snapshot. Queries
//! only take read locks. Hooks are called with the locks held and must not
//! call back into the context.

use crate::blend::{BlendInputs, CameraBlendInfo};
use crate::compositor::{composite, Composite, CompositeLayer};
use crate::config::CameraManagerConfig;
use crate::error::{CameraError, Result};
use crate::frame::{CutTracker, FinalCamera, FrameClocks, FrameInput, NearPlaneOverride};
use crate::hooks::{CameraManagerHooks, EnvironmentSample, NoHooks};
use crate::input::CameraInput;
use crate::reaper;
use crate::registry::CameraRegistry;
use crate::request::{CameraRequest, InsertOutcome, RequestBook};
use crate::resolver::Resolver;
use crate::stack::{CameraNode, CameraStack, ControllerHandle, NodeSnapshot, StackSnapshot};
use crate::types::{AssociationId, CameraId, CameraRank};
use crate::controller::{CameraInstanceInfo, SceneQuery};
use crate::location::CameraLocation;
use crate::start_info::CameraStartInfo;
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockWriteGuard};
use smallvec::SmallVec;
use std::sync::Arc;
use vantage_math::{BoundingSphere, Frustum, Sid, Vec3};

/// Sticky error flags; set when something goes wrong, cleared only on request
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diagnostics {
    /// A push was dropped because the stack was full
    pub stack_overflow: bool,
    /// A persistent request was dropped because the list was full
    pub request_overflow: bool,
    /// Set alongside an overflow when the config asks for a pause
    pub paused_on_overflow: bool,
    pub invariant_violations: u32,
    pub last_error: Option<CameraError>,
}

/// Frame-scoped state shared by the resolver and the update pass
#[derive(Debug, Default)]
pub(crate) struct FrameState {
    pub clocks: FrameClocks,
    pub cuts: CutTracker,
    pub near_plane: NearPlaneOverride,
    pub last_final: FinalCamera,
    /// Cut flag of the latest unpaused frame
    pub game_frame_cut: bool,
    /// Cut flag of the unpaused frame before that one
    pub previous_cut: bool,
    pub velocity: Vec3,
    pub environment: Option<EnvironmentSample>,
    pub diagnostics: Diagnostics,
}

impl FrameState {
    /// Invariant violations panic in development and fall back in shipping
    pub(crate) fn report_invariant(&mut self, config: &CameraManagerConfig, err: CameraError) {
        tracing::error!(error = %err, "camera invariant violated");
        self.diagnostics.invariant_violations += 1;
        self.diagnostics.last_error = Some(err.clone());
        if config.assert_invariants {
            panic!("camera invariant violated: {err}");
        }
    }

    /// Capacity errors drop the request and leave a sticky flag
    pub(crate) fn report_capacity(&mut self, config: &CameraManagerConfig, err: CameraError) {
        tracing::error!(error = %err, "camera capacity exhausted");
        match err {
            CameraError::StackFull { .. } => self.diagnostics.stack_overflow = true,
            CameraError::RequestListFull { .. } => self.diagnostics.request_overflow = true,
            _ => {}
        }
        if config.pause_on_stack_overflow {
            self.diagnostics.paused_on_overflow = true;
        }
        self.diagnostics.last_error = Some(err);
    }
}

/// Write locks held for one mutation of the context
struct WritePass<'a> {
    requests: MutexGuard<'a, RequestBook>,
    stack: RwLockWriteGuard<'a, CameraStack>,
    state: MutexGuard<'a, FrameState>,
}

/// Layers handed to the compositor, bottom to top
type LayerList = SmallVec<[CompositeLayer; 16]>;

/// Camera manager for one viewport
pub struct CameraContext {
    registry: Arc<CameraRegistry>,
    config: CameraManagerConfig,
    hooks: Box<dyn CameraManagerHooks>,
    requests: Mutex<RequestBook>,
    stack: RwLock<CameraStack>,
    state: Mutex<FrameState>,
    snapshot: RwLock<Arc<StackSnapshot>>,
}

impl std::fmt::Debug for CameraContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraContext")
            .field("config", &self.config)
            .field("cameras", &self.stack.read().len())
            .finish_non_exhaustive()
    }
}

impl CameraContext {
    /// Create a context and put the configured bottom camera on the stack
    pub fn new(
        registry: Arc<CameraRegistry>,
        config: CameraManagerConfig,
        hooks: Box<dyn CameraManagerHooks>,
    ) -> Result<Self> {
        config.validate()?;
        registry.validate()?;

        let bottom = registry
            .find_by_name(&config.bottom_camera)
            .filter(|bottom| bottom.default_rank() == CameraRank::Bottom)
            .ok_or_else(|| CameraError::InvalidBottomCamera(config.bottom_camera.clone()))?;

        let mut requests = RequestBook::new(config.max_persistent_requests);
        let mut stack = CameraStack::new(config.max_cameras);
        let mut state = FrameState::default();

        let mut start = bottom.default_start_info().clone();
        start.fallback_locator = Some(config.start_locator);
        let mut controller = bottom.create_controller();
        controller.start(&start);

        Resolver {
            registry: &registry,
            config: &config,
            hooks: hooks.as_ref(),
            book: &mut requests,
            stack: &mut stack,
            state: &mut state,
        }
        .start_internal(
            bottom,
            controller,
            start,
            CameraRank::Bottom,
            CameraBlendInfo::seconds(0.0),
            None,
        )
        .ok_or(CameraError::StackFull {
            capacity: config.max_cameras,
        })?;

        tracing::debug!(bottom = %bottom.id(), "camera context created");

        let context = Self {
            registry,
            config,
            hooks,
            requests: Mutex::new(requests),
            stack: RwLock::new(stack),
            state: Mutex::new(state),
            snapshot: RwLock::new(Arc::new(StackSnapshot::default())),
        };
        context.publish(&context.stack.read(), &context.state.lock());
        Ok(context)
    }

    /// Context over the built-in cameras with no hooks installed
    pub fn builtin(config: CameraManagerConfig) -> Result<Self> {
        Self::new(
            Arc::new(CameraRegistry::with_builtin_cameras()?),
            config,
            Box::new(NoHooks),
        )
    }

    pub fn config(&self) -> &CameraManagerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CameraRegistry> {
        &self.registry
    }

    fn write(&self) -> WritePass<'_> {
        WritePass {
            requests: self.requests.lock(),
            stack: self.stack.write(),
            state: self.state.lock(),
        }
    }

    fn resolver<'b>(&'b self, pass: &'b mut WritePass<'_>) -> Resolver<'b> {
        Resolver {
            registry: &self.registry,
            config: &self.config,
            hooks: self.hooks.as_ref(),
            book: &mut pass.requests,
            stack: &mut pass.stack,
            state: &mut pass.state,
        }
    }

    /// Publish a fresh snapshot and release the write locks
    fn finish(&self, pass: WritePass<'_>) {
        self.publish(&pass.stack, &pass.state);
    }

    fn publish(&self, stack: &CameraStack, state: &FrameState) {
        let snapshot = StackSnapshot {
            version: stack.version(),
            frame: state.clocks.frame,
            nodes: stack.snapshot_nodes(),
            final_location: state.last_final.location,
        };
        *self.snapshot.write() = Arc::new(snapshot);
    }

    fn unknown_camera(&self, id: CameraId) {
        self.state
            .lock()
            .report_invariant(&self.config, CameraError::UnknownCamera(id));
    }

    fn fill_focus(&self, request: &mut CameraRequest) {
        let start = request.start_info_mut();
        if start.focus_object.is_none() && !start.no_focus_object {
            start.focus_object = self.hooks.default_focus_object();
        }
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// One-shot request, resolved immediately against the persistent requests
    ///
    /// Returns the handle of the pushed camera, or `None` when nothing was
    /// pushed (lost to a stronger request, already active, or blocked).
    pub fn request_camera(
        &self,
        id: CameraId,
        blend: Option<CameraBlendInfo>,
        start: Option<CameraStartInfo>,
    ) -> Option<ControllerHandle> {
        let Some(config) = self.registry.get(id) else {
            self.unknown_camera(id);
            return None;
        };

        let mut pass = self.write();
        let mut request = CameraRequest::new(
            pass.requests.allocate_id(),
            config,
            AssociationId::default(),
            blend,
            start,
        );
        self.fill_focus(&mut request);
        self.hooks.on_request_camera(&mut request, false);

        let pushed = self.resolver(&mut pass).resolve(Some(request), None);
        self.finish(pass);
        pushed
    }

    /// Add a long-lived request, resolved on the next update
    ///
    /// Returns false only when the request list is full. A request equal in
    /// priority and association to one already held is dropped silently.
    pub fn request_persistent_camera(
        &self,
        id: CameraId,
        association: AssociationId,
        blend: Option<CameraBlendInfo>,
        start: Option<CameraStartInfo>,
    ) -> bool {
        let Some(config) = self.registry.get(id) else {
            self.unknown_camera(id);
            return false;
        };

        let mut pass = self.write();
        if pass.requests.is_full() {
            let capacity = self.config.max_persistent_requests;
            pass.state
                .report_capacity(&self.config, CameraError::RequestListFull { capacity });
            return false;
        }

        let mut request = CameraRequest::new(pass.requests.allocate_id(), config, association, blend, start);
        self.fill_focus(&mut request);
        let allowed = self.hooks.on_request_camera(&mut request, true);

        if pass.requests.is_duplicate(&request) {
            tracing::debug!(camera = %id, association = %association.name, "duplicate camera request dropped");
            pass.requests.schedule(None);
            return true;
        }
        if !allowed {
            tracing::debug!(camera = %id, association = %association.name, "camera request vetoed");
            return true;
        }

        let inserted = match pass.requests.insert(request) {
            InsertOutcome::Inserted(inserted) => inserted,
            InsertOutcome::Duplicate => return true,
            InsertOutcome::Full => {
                let capacity = self.config.max_persistent_requests;
                pass.state
                    .report_capacity(&self.config, CameraError::RequestListFull { capacity });
                return false;
            }
        };
        tracing::debug!(camera = %id, association = %association.name, "persistent camera requested");

        // Abandoned requests only go once a live request takes the lead
        let leads = pass
            .requests
            .requests()
            .iter()
            .find(|r| !r.is_abandoned())
            .map(|r| r.id())
            == Some(inserted);
        let WritePass {
            requests, stack, ..
        } = &mut pass;
        let stack = &**stack;
        let reaped = requests.reap(leads, |h| stack.contains(h)) + requests.reap_association(association);
        if reaped > 0 {
            tracing::debug!(count = reaped, "camera requests reaped");
        }

        pass.requests.schedule(None);
        self.finish(pass);
        true
    }

    /// Resolve right away instead of waiting for the next update
    pub fn evaluate_requests(&self, blend: Option<CameraBlendInfo>) -> Option<ControllerHandle> {
        let mut pass = self.write();
        pass.requests.pending = None;
        let pushed = self.resolver(&mut pass).resolve(None, blend);
        self.finish(pass);
        pushed
    }

    /// Deactivate the oldest active request named `name` and resolve at once
    pub fn disable_persistent_camera(&self, name: Sid, blend: Option<CameraBlendInfo>) -> bool {
        let mut pass = self.write();
        let Some(controller) = pass.requests.disable(name).map(|request| request.controller()) else {
            return false;
        };
        tracing::debug!(association = %name, "persistent camera disabled");

        self.end_override(&mut pass, controller, blend);
        self.resolver(&mut pass).resolve(None, blend);
        self.finish(pass);
        true
    }

    pub fn disable_all_persistent_cameras(&self, blend: Option<CameraBlendInfo>) {
        let mut pass = self.write();
        let controllers: SmallVec<[Option<ControllerHandle>; 8]> = pass
            .requests
            .iter_mut()
            .map(|request| {
                request.is_active = false;
                request.controller
            })
            .collect();
        for controller in controllers {
            self.end_override(&mut pass, controller, blend);
        }
        self.resolver(&mut pass).resolve(None, blend);
        self.finish(pass);
    }

    /// Override cameras do not get replaced by a lower request, so end them
    fn end_override(
        &self,
        pass: &mut WritePass<'_>,
        controller: Option<ControllerHandle>,
        blend: Option<CameraBlendInfo>,
    ) {
        let Some(handle) = controller else {
            return;
        };
        let blend = blend.unwrap_or(CameraBlendInfo::seconds(0.0));
        let clocks = pass.state.clocks;
        let Some(node) = pass.stack.get_mut(handle) else {
            return;
        };
        if node.rank != CameraRank::Override {
            return;
        }
        node.blend.end(blend, clocks.for_node(node.traits.run_when_paused).now);
        tracing::debug!(camera = %node.camera_id, seconds = blend.amount, "override camera ended");
        if blend.amount <= 0.0 {
            pass.state.cuts.notify_in_frames(2);
        }
    }

    /// Mark a request as no longer wanted; it goes once a live request takes over
    pub fn abandon_persistent_camera(&self, name: Sid) -> bool {
        self.requests.lock().abandon(name)
    }

    pub fn abandon_all_persistent_cameras(&self) {
        for request in self.requests.lock().iter_mut() {
            request.is_abandoned = true;
        }
    }

    /// Drop every persistent request; the cameras they started stay until replaced
    pub fn clear_all_persistent_cameras(&self) {
        let count = self.requests.lock().clear();
        tracing::debug!(count, "persistent camera requests cleared");
    }

    /// A dormant request is skipped during selection but kept in the list
    pub fn set_persistent_camera_dormant(
        &self,
        name: Sid,
        dormant: bool,
        blend: Option<CameraBlendInfo>,
    ) -> bool {
        let mut pass = self.write();
        let Some(controller) = pass.requests.set_dormant(name, dormant).map(|r| r.controller()) else {
            return false;
        };
        tracing::debug!(association = %name, dormant, "persistent camera dormancy changed");
        if dormant {
            self.end_override(&mut pass, controller, blend);
        }
        pass.requests.schedule(blend);
        self.finish(pass);
        true
    }

    pub fn set_blend_override_high(&self, blend: CameraBlendInfo) {
        self.requests.lock().blend_override_high = Some(blend);
    }

    pub fn set_blend_override_low(&self, blend: CameraBlendInfo) {
        self.requests.lock().blend_override_low = Some(blend);
    }

    // ------------------------------------------------------------------
    // Node control
    // ------------------------------------------------------------------

    /// Fade `handle` out over `blend`; a zero blend removes it on the next update
    pub fn end_camera(&self, handle: ControllerHandle, blend: Option<CameraBlendInfo>) -> bool {
        let mut pass = self.write();
        let blend = blend.unwrap_or(CameraBlendInfo::seconds(0.0));
        let clocks = pass.state.clocks;
        let Some(node) = pass.stack.get_mut(handle) else {
            return false;
        };
        if node.rank == CameraRank::Bottom {
            return false;
        }
        node.blend.end(blend, clocks.for_node(node.traits.run_when_paused).now);
        tracing::debug!(camera = %node.camera_id, seconds = blend.amount, "camera ended");
        pass.requests.schedule(None);
        self.finish(pass);
        true
    }

    /// Remove `handle` once nothing above leaves it any contribution
    pub fn kill_when_blended_out(&self, handle: ControllerHandle) -> bool {
        let mut pass = self.write();
        if !pass.stack.contains(handle) {
            return false;
        }
        self.resolver(&mut pass).kill(handle);
        self.finish(pass);
        true
    }

    /// Fade `handle` away without a replacement; falls back to the configured time
    pub fn request_self_fade_out(&self, handle: ControllerHandle, duration: Option<f32>) -> bool {
        let mut pass = self.write();
        let Some(node) = pass.stack.get(handle) else {
            return false;
        };
        let duration = duration
            .or_else(|| node.controller.blend_out_time())
            .unwrap_or(self.config.self_fade_default_seconds);
        self.resolver(&mut pass).self_fade(handle, duration);
        self.finish(pass);
        true
    }

    /// Remove every game camera at once; only Bottom and Debug cameras stay
    pub fn clear_all_game_cameras(&self) {
        let mut pass = self.write();
        let doomed: SmallVec<[ControllerHandle; 16]> = pass
            .stack
            .iter()
            .filter(|(_, node)| !matches!(node.rank, CameraRank::Bottom | CameraRank::Debug))
            .map(|(handle, _)| handle)
            .collect();
        for handle in &doomed {
            pass.stack.remove(*handle);
        }
        if !doomed.is_empty() {
            pass.state.cuts.notify();
        }
        tracing::debug!(count = doomed.len(), "game cameras cleared");
        self.finish(pass);
    }

    // ------------------------------------------------------------------
    // Manual camera
    // ------------------------------------------------------------------

    pub fn activate_manual_camera(&self) -> Option<ControllerHandle> {
        self.request_camera(CameraId::MANUAL, Some(CameraBlendInfo::seconds(0.0)), None)
    }

    /// End the manual camera on top, cutting back to the game cameras
    pub fn deactivate_manual_camera(&self) -> bool {
        let mut pass = self.write();
        let Some(handle) = Self::active_manual(&pass.stack) else {
            return false;
        };
        let clocks = pass.state.clocks;
        if let Some(node) = pass.stack.get_mut(handle) {
            node.blend.end(CameraBlendInfo::seconds(0.0), clocks.camera.now);
        }
        pass.state.cuts.notify();
        tracing::debug!("manual camera deactivated");
        self.finish(pass);
        true
    }

    /// Returns whether the manual camera is active afterwards
    pub fn toggle_manual_camera(&self) -> bool {
        if self.is_manual_camera_active() {
            self.deactivate_manual_camera();
            false
        } else {
            self.activate_manual_camera().is_some()
        }
    }

    pub fn is_manual_camera_active(&self) -> bool {
        Self::active_manual(&self.stack.read()).is_some()
    }

    fn active_manual(stack: &CameraStack) -> Option<ControllerHandle> {
        let top = stack.top()?;
        let node = stack.get(top)?;
        (node.rank == CameraRank::Debug && node.traits.manual && !node.blend.is_ending()).then_some(top)
    }

    // ------------------------------------------------------------------
    // Cuts and overrides
    // ------------------------------------------------------------------

    pub fn notify_camera_cut(&self) {
        self.state.lock().cuts.notify();
    }

    pub fn notify_camera_cut_next_frame(&self) {
        self.state.lock().cuts.notify_next_frame();
    }

    pub fn notify_camera_cut_in_frames(&self, frames: u32) {
        self.state.lock().cuts.notify_in_frames(frames);
    }

    /// Cut flag of the most recently produced frame
    pub fn did_camera_cut_this_frame(&self) -> bool {
        self.state.lock().last_final.camera_cut
    }

    pub fn did_camera_cut_last_frame(&self) -> bool {
        self.state.lock().previous_cut
    }

    /// Force the near plane for the coming frame and the one after
    pub fn override_near_plane(&self, distance: f32, priority: u32) {
        let mut state = self.state.lock();
        let frame = state.clocks.game_frame + 1;
        state.near_plane.set(distance, priority, frame);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn current_camera(&self, include_top_overrides: bool) -> Option<ControllerHandle> {
        self.stack.read().current(include_top_overrides)
    }

    pub fn current_camera_including_override(&self) -> Option<ControllerHandle> {
        self.stack.read().current_including_override()
    }

    pub fn current_camera_id(&self, include_top_overrides: bool) -> Option<CameraId> {
        let stack = self.stack.read();
        let handle = stack.current(include_top_overrides)?;
        stack.get(handle).map(|node| node.camera_id)
    }

    pub fn previous_camera(&self, handle: ControllerHandle) -> Option<ControllerHandle> {
        self.stack.read().below(handle)
    }

    pub fn next_camera(&self, handle: ControllerHandle) -> Option<ControllerHandle> {
        self.stack.read().above(handle)
    }

    pub fn topmost_camera_by_id(&self, id: CameraId) -> Option<ControllerHandle> {
        self.stack.read().topmost_by_id(id)
    }

    pub fn camera_info(&self, handle: ControllerHandle) -> Option<NodeSnapshot> {
        self.stack.read().get(handle).map(|node| node.snapshot(handle))
    }

    pub fn stack_len(&self) -> usize {
        self.stack.read().len()
    }

    pub fn persistent_requests(&self) -> Vec<CameraRequest> {
        self.requests.lock().requests().to_vec()
    }

    pub fn find_persistent_request(&self, name: Sid) -> Option<CameraRequest> {
        self.requests.lock().find(name).cloned()
    }

    /// Latest published stack snapshot
    pub fn snapshot(&self) -> Arc<StackSnapshot> {
        self.snapshot.read().clone()
    }

    pub fn final_camera(&self) -> FinalCamera {
        self.state.lock().last_final
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.state.lock().diagnostics.clone()
    }

    pub fn clear_diagnostics(&self) {
        self.state.lock().diagnostics = Diagnostics::default();
    }

    /// Pose used for visibility: the game view while a debug camera is on top
    fn view_location(&self) -> (CameraLocation, f32) {
        let stack = self.stack.read();
        let debug_on_top = stack
            .top()
            .and_then(|h| stack.get(h))
            .map_or(false, |node| node.rank == CameraRank::Debug);
        let state = self.state.lock();
        let last = &state.last_final;
        let location = if debug_on_top { last.no_manual } else { last.location };
        (location, last.near_plane)
    }

    /// Sphere visibility against the last render camera
    pub fn is_on_screen(&self, point: Vec3, radius: f32) -> bool {
        let (location, near) = self.view_location();
        Frustum::new(
            location.locator,
            location.fov,
            self.config.aspect_ratio,
            near,
            self.config.far_plane,
        )
        .intersects_sphere(&BoundingSphere::new(point, radius))
    }

    /// Angle in radians between the camera forward and the direction to `point`
    pub fn target_angle(&self, point: Vec3) -> f32 {
        let (location, _) = self.view_location();
        let to_point = point - location.position();
        if to_point.length() <= f32::EPSILON {
            return 0.0;
        }
        location
            .forward()
            .dot(to_point.normalize())
            .clamp(-1.0, 1.0)
            .acos()
    }

    // ------------------------------------------------------------------
    // Frame update
    // ------------------------------------------------------------------

    /// Advance one frame and produce the camera to render
    pub fn update(&self, frame: &FrameInput<'_>) -> FinalCamera {
        let mut pass = self.write();
        pass.state.clocks.advance(frame.dt, frame.paused);

        if let Some(sample) = self.hooks.poll_environment() {
            pass.state.environment = Some(sample);
        }

        if let Some(blend) = pass.requests.pending.take() {
            self.resolver(&mut pass).resolve(None, blend);
        }

        let WritePass {
            requests,
            stack,
            state,
        } = &mut pass;
        let (requests, stack, state) = (&mut **requests, &mut **stack, &mut **state);

        self.update_blends(stack, &state.clocks);
        self.update_budgets(stack);
        self.update_locations(stack, state, frame);

        let final_camera = self.compose(stack, state, frame);

        let removed = reaper::reap_nodes(stack);
        let dropped = requests.reap(false, |h| stack.contains(h));
        if dropped > 0 {
            tracing::debug!(count = dropped, "finished camera requests reaped");
        }
        if !removed.is_empty() && stack.current(false).is_none() {
            tracing::debug!("only the bottom camera is left");
        }

        if !frame.paused {
            state.cuts.shift();
            // Paused frames do not move the cut pipeline
            state.previous_cut = std::mem::replace(&mut state.game_frame_cut, final_camera.camera_cut);
        }
        state.last_final = final_camera;

        self.finish(pass);
        final_camera
    }

    fn update_blends(&self, stack: &mut CameraStack, clocks: &FrameClocks) {
        let handles = stack.handles();
        for (index, handle) in handles.iter().enumerate() {
            let covered_by_non_debug = handles
                .get(index + 1)
                .and_then(|above| stack.get(*above))
                .map_or(false, |above| above.rank != CameraRank::Debug);
            let Some(node) = stack.get_mut(*handle) else {
                continue;
            };
            let run_when_paused = node.traits.run_when_paused;
            if clocks.paused && !run_when_paused {
                continue;
            }
            let inputs = BlendInputs {
                clock: clocks.for_node(run_when_paused),
                travelled: node.controller.travelled_distance(),
                scripted: node.controller.scripted_blend(),
                covered_by_non_debug,
            };
            node.blend.update(&inputs);
        }
    }

    /// Hand the contribution budget out top to bottom
    fn update_budgets(&self, stack: &mut CameraStack) {
        let handles = stack.handles();
        let mut contribute = 1.0_f32;
        let mut index = handles.len();

        while index > 0 {
            index -= 1;
            let Some(node) = stack.get_mut(handles[index]) else {
                continue;
            };
            node.budget = contribute;

            if node.traits.fades_in_by_distance && index > 0 {
                let weight = node.controller.distance_weight().clamp(0.0, 1.0);
                let pair_weight = weight * node.blend.blend();
                node.blend.update_normal(contribute, Some(weight));

                // The base shares the pair's slot with the node above
                index -= 1;
                if let Some(base) = stack.get_mut(handles[index]) {
                    base.budget = contribute;
                    base.blend.update_normal(contribute, Some(1.0 - pair_weight));
                    contribute -= contribute * base.blend.blend();
                }
            } else {
                node.blend.update_normal(contribute, None);
                if !node.traits.keep_lower_cameras_alive {
                    contribute -= node.blend.normal_blend();
                }
            }
            contribute = contribute.max(0.0);
        }
    }

    /// Ask every contributing controller for its pose, bottom to top
    fn update_locations(&self, stack: &mut CameraStack, state: &mut FrameState, frame: &FrameInput<'_>) {
        let handles = stack.handles();
        let top = stack.top();
        let composited = state.last_final.location;
        let suppressed = CameraInput::suppressed();
        let epsilon = self.config.blend_epsilon;

        for (index, handle) in handles.iter().enumerate() {
            let below = index
                .checked_sub(1)
                .and_then(|i| stack.get(handles[i]))
                .map(|node| node.neighbor_info());
            let above = handles
                .get(index + 1)
                .and_then(|h| stack.get(*h))
                .map(|node| node.neighbor_info());

            let Some(node) = stack.get_mut(*handle) else {
                continue;
            };
            if let Some(scene) = frame.scene {
                Self::check_focus(node, scene);
            }
            let run_when_paused = node.traits.run_when_paused;
            if state.clocks.paused && !run_when_paused {
                continue;
            }
            if node.budget <= epsilon && !node.traits.keep_alive_when_occluded {
                continue;
            }

            let dt = state.clocks.for_node(run_when_paused).dt;
            let is_top = Some(*handle) == top;
            let previous = node.location;
            let info = CameraInstanceInfo {
                dt,
                camera_id: node.camera_id,
                rank: node.rank,
                stack_index: index,
                is_top,
                blend: node.blend.blend(),
                normal_blend: node.blend.normal_blend(),
                previous: &previous,
                composited: &composited,
                below,
                above,
                input: if is_top { &frame.input } else { &suppressed },
                scene: frame.scene,
            };

            let mut location = node.controller.update_location(&info);
            if !location.is_finite() {
                let id = node.camera_id;
                state.report_invariant(&self.config, CameraError::NonFinitePose(id));
                continue;
            }
            if location.near_plane <= 0.0 {
                location.near_plane = self.config.default_near_plane;
            }

            let position = location.position();
            location.velocity = match node.last_position {
                Some(last) if dt > 0.0 => Some((position - last) * (1.0 / dt)),
                _ => Some(Vec3::ZERO),
            };
            node.last_position = Some(position);
            node.location = location;
        }
    }

    /// Flag a node whose focus object has left the scene; the reaper removes it
    fn check_focus(node: &mut CameraNode, scene: &dyn SceneQuery) {
        if !node.traits.needs_focus || node.traits.dont_kill_on_focus_death || node.blend.has_lost_focus() {
            return;
        }
        let Some(object) = node.focus_object() else {
            return;
        };
        if scene.object_position(object).is_none() {
            node.blend.lose_focus();
            tracing::debug!(camera = %node.camera_id, object = object.0, "focus object lost");
        }
    }

    fn layers(stack: &CameraStack, include_debug: bool) -> LayerList {
        let mut layers = LayerList::new();
        let mut below = None;
        for (_, node) in stack.iter() {
            if !include_debug && node.rank == CameraRank::Debug {
                continue;
            }
            let mut layer = CompositeLayer::new(node.camera_id, node.location, node.blend.blend());
            layer.cross_fade = node.blend.wants_cross_fade();
            if !layers.is_empty() && node.traits.fades_in_by_distance {
                layer.distance_weight = Some(node.controller.distance_weight());
            }
            if let Some(below) = &below {
                layer.circular = node.controller.circular_blend_hint(below);
            }
            below = Some(node.neighbor_info());
            layers.push(layer);
        }
        layers
    }

    /// Composite and reject non-finite results
    fn checked_composite(layers: &LayerList) -> Result<Composite> {
        let result = composite(layers)?;
        if result.after.is_finite() && result.before.map_or(true, |b| b.is_finite()) {
            Ok(result)
        } else {
            let top = layers.last().map_or(CameraId::MANUAL_BASE, |layer| layer.camera_id);
            Err(CameraError::NonFinitePose(top))
        }
    }

    fn compose(&self, stack: &CameraStack, state: &mut FrameState, frame: &FrameInput<'_>) -> FinalCamera {
        let last = state.last_final;

        // Only the full pass reports; the no-manual pass sees a subset of the same layers
        let full = match Self::checked_composite(&Self::layers(stack, true)) {
            Ok(result) => result,
            Err(err) => {
                state.report_invariant(&self.config, err);
                Composite {
                    after: last.location,
                    before: None,
                    cross_fade: 0.0,
                }
            }
        };
        let mut no_manual = Self::checked_composite(&Self::layers(stack, false))
            .map_or(last.no_manual, |result| result.after);
        let mut after = full.after;
        let mut before = full.before;

        if let Some(environment) = &state.environment {
            let manual_on_top = stack
                .top()
                .and_then(|h| stack.get(h))
                .map_or(false, |node| node.traits.manual);
            if !manual_on_top {
                after = self.hooks.adjust_to_environment(after, environment);
                before = before.map(|b| self.hooks.adjust_to_environment(b, environment));
            }
            no_manual = self.hooks.adjust_to_environment(no_manual, environment);
        }

        self.update_velocity(stack, state, frame);

        let near_plane = state
            .near_plane
            .get(state.clocks.game_frame)
            .unwrap_or(if after.near_plane > 0.0 {
                after.near_plane
            } else {
                self.config.default_near_plane
            });
        after.near_plane = near_plane;

        FinalCamera {
            location: after,
            before_cross_fade: before,
            cross_fade: full.cross_fade,
            no_manual,
            velocity: state.velocity,
            near_plane,
            camera_cut: state.cuts.this_frame(),
            frame: state.clocks.frame,
        }
    }

    /// Blend the velocities of the top two nodes; a speed past the limit is a cut
    fn update_velocity(&self, stack: &CameraStack, state: &mut FrameState, frame: &FrameInput<'_>) {
        if state.cuts.this_frame() || state.cuts.last_frame() {
            state.velocity = Vec3::ZERO;
            return;
        }
        if frame.paused || frame.dt <= 0.0 {
            return;
        }

        let mut nodes = stack.iter().rev().map(|(_, node)| node);
        let velocity_of = |location: &CameraLocation| location.velocity.unwrap_or(Vec3::ZERO);
        let velocity = match (nodes.next(), nodes.next()) {
            (Some(top), Some(below)) => {
                velocity_of(&top.location).lerp(velocity_of(&below.location), 1.0 - top.blend.blend())
            }
            (Some(top), None) => velocity_of(&top.location),
            _ => Vec3::ZERO,
        };

        if velocity.length() > self.config.max_cut_speed {
            tracing::debug!(speed = velocity.length(), "camera speed cut");
            state.cuts.notify();
        } else {
            state.velocity = velocity;
        }
    }
}
