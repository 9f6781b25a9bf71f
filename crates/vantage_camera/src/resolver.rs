//! Request resolution
//!
//! Decides which request owns the camera and mutates the stack accordingly.
//! One pass picks a candidate from the best persistent request and the
//! transient request. It runs the candidate through the special-case gates,
//! then pushes a single camera or a distance hand-off pair.

use crate::blend::{BlendKind, BlendTracker, CameraBlendInfo, BLEND_EPSILON};
use crate::config::CameraManagerConfig;
use crate::context::FrameState;
use crate::controller::CameraController;
use crate::error::CameraError;
use crate::hooks::CameraManagerHooks;
use crate::location::CameraLocation;
use crate::registry::{CameraConfig, CameraFamily, CameraRegistry};
use crate::request::{Abandoned, CameraRequest, RequestBook, RequestId};
use crate::stack::{CameraNode, CameraStack, ControllerHandle};
use crate::start_info::CameraStartInfo;
use crate::types::{CameraRank, PriorityClass};

/// Blend used for a distance hand-off when nobody asked for anything else
const PAIR_BLEND_SECONDS: f32 = 1.0;

/// Everything one resolution pass may touch
pub(crate) struct Resolver<'a> {
    pub registry: &'a CameraRegistry,
    pub config: &'a CameraManagerConfig,
    pub hooks: &'a dyn CameraManagerHooks,
    pub book: &'a mut RequestBook,
    pub stack: &'a mut CameraStack,
    pub state: &'a mut FrameState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    Transient,
    Persistent(RequestId),
}

struct Candidate {
    request: CameraRequest,
    source: Source,
}

impl Resolver<'_> {
    /// Run one resolution pass
    ///
    /// Returns the handle of the camera pushed on top, if any. The transient
    /// request is consumed whatever the outcome.
    pub fn resolve(
        &mut self,
        transient: Option<CameraRequest>,
        caller_blend: Option<CameraBlendInfo>,
    ) -> Option<ControllerHandle> {
        if self.stack.is_full() {
            self.state.report_capacity(
                self.config,
                CameraError::StackFull {
                    capacity: self.stack.capacity(),
                },
            );
            return None;
        }

        let mut current = self.stack.current_live(false);
        let previous = current.and_then(|h| self.stack.below(h));

        let persistent = self
            .best_persistent(transient.as_ref())
            .and_then(|index| self.book.get(index))
            .cloned();
        let persistent_id = persistent.as_ref().map(|r| r.id);

        let mut candidate = match (transient, persistent) {
            (Some(t), Some(p)) => {
                if matches!(t.rank, CameraRank::Debug | CameraRank::Override) || p.priority <= t.priority {
                    Some(Candidate {
                        request: t,
                        source: Source::Transient,
                    })
                } else {
                    Some(Candidate {
                        source: Source::Persistent(p.id),
                        request: p,
                    })
                }
            }
            (Some(t), None) => Some(Candidate {
                request: t,
                source: Source::Transient,
            }),
            (None, Some(p)) => Some(Candidate {
                source: Source::Persistent(p.id),
                request: p,
            }),
            (None, None) => None,
        };

        let mut equivalent = false;

        if let Some(c) = &candidate {
            if self.photo_mode_blocks(&c.request) {
                candidate = None;
            } else {
                // A Debug request is checked against the Debug camera already on top
                let active = if c.request.rank == CameraRank::Debug {
                    self.stack.current_live(true)
                } else {
                    current
                };
                let absorbed = active.and_then(|h| self.stack.get(h)).map_or(false, |node| {
                    !node.blend.self_fade_requested() && self.matches(node, &c.request)
                });
                if absorbed {
                    equivalent = true;
                    candidate = None;
                }
            }
        }

        let mut pushed = None;

        if let Some(c) = candidate.take() {
            if c.request.rank == CameraRank::Override {
                current = self.stack.current_including_override_live();
            }
            candidate = match current {
                Some(cur) => self.apply_gates(cur, previous, c, persistent_id, &mut equivalent),
                None => Some(c),
            };

            if let (Some(c), Some(cur)) = (&candidate, current) {
                pushed = self.try_push_pair(cur, c, caller_blend);
                if pushed.is_some() {
                    candidate = None;
                }
            }
        }

        if let Some(c) = candidate {
            pushed = self.push(c, current, caller_blend);
        } else if pushed.is_none() && !equivalent {
            if let Some(blend) = caller_blend {
                // The blend did not take; keep it for the next push
                self.book.blend_override_low = Some(blend);
            }
        }

        pushed
    }

    fn best_persistent(&mut self, transient: Option<&CameraRequest>) -> Option<usize> {
        let hooks = self.hooks;
        self.book.best_index(Abandoned::Include, |request| {
            hooks.is_persistent_request_valid(request, transient)
        })
    }

    fn family_of(&self, request: &CameraRequest) -> CameraFamily {
        self.registry
            .get(request.camera_id)
            .map(CameraConfig::family)
            .unwrap_or_default()
    }

    /// Would `request` start the camera `node` already is?
    fn matches(&self, node: &CameraNode, request: &CameraRequest) -> bool {
        let same_camera = node.camera_id == request.camera_id
            || self
                .registry
                .get(request.camera_id)
                .and_then(CameraConfig::distance_partner)
                == Some(node.camera_id);
        same_camera && node.controller.is_equivalent_to(&request.start_info)
    }

    /// A photo camera on top blocks everything short of a forced request
    fn photo_mode_blocks(&self, request: &CameraRequest) -> bool {
        let top = self.stack.current_live(true);
        top.and_then(|h| self.stack.get(h)).map_or(false, |node| {
            node.is_photo_mode()
                && self.hooks.is_photo_mode_active()
                && request.priority.class != PriorityClass::Forced
        })
    }

    /// Gates run against the current camera; `None` means the candidate was absorbed
    fn apply_gates(
        &mut self,
        current: ControllerHandle,
        previous: Option<ControllerHandle>,
        candidate: Candidate,
        persistent_id: Option<RequestId>,
        equivalent: &mut bool,
    ) -> Option<Candidate> {
        let node = self.stack.get(current)?;
        let class = candidate.request.priority.class;
        if node.priority.class == PriorityClass::Death
            && !matches!(class, PriorityClass::Forced | PriorityClass::Death)
            && Some(candidate.request.id) != persistent_id
        {
            tracing::debug!(camera = %candidate.request.camera_id, "request blocked by death camera");
            return None;
        }

        if self.matches(node, &candidate.request) {
            *equivalent = true;
            if node.blend.self_fade_requested() {
                let duration = self.config.cancel_self_fade_seconds;
                let now = self.node_clock(current);
                if let Some(node) = self.stack.get_mut(current) {
                    node.blend.cancel_self_fade_out(duration, now);
                    tracing::debug!(camera = %node.camera_id, "self fade cancelled");
                }
            }
            return None;
        }

        let family = self.family_of(&candidate.request);

        if family == CameraFamily::DistanceRemapped
            && node.is_fading_by_distance()
            && self.search_backwards(previous, &candidate.request)
        {
            // Leaving a hand-off region: drop the distance camera and fall back to its base
            self.kill(current);
            *equivalent = true;
            return None;
        }

        if !candidate.request.start_info.photo_mode
            && candidate.request.rank == CameraRank::Normal
            && node.traits.self_fade_out_allowed
            && family == CameraFamily::DistanceRemapped
        {
            let settings = candidate.request.start_info.settings_id;
            let prev_matches = previous.and_then(|h| self.stack.get(h)).map_or(false, |prev| {
                prev.family == CameraFamily::DistanceRemapped
                    && settings.is_some()
                    && (prev.settings_id() == settings || prev.is_fading_by_distance())
            });

            if prev_matches {
                let mut duration = match candidate.request.blend.kind {
                    BlendKind::FixedTime => candidate.request.blend.amount,
                    _ => self.config.self_fade_default_seconds,
                };
                if let Some(blend_out) = node.controller.blend_out_time() {
                    duration = blend_out;
                }
                self.self_fade(current, duration);
                return None;
            }
        }

        Some(candidate)
    }

    /// Walk down from `from` looking for a camera `request` would reproduce
    ///
    /// Stops at the first camera of the same type, equivalent or not.
    fn search_backwards(&self, from: Option<ControllerHandle>, request: &CameraRequest) -> bool {
        let mut cursor = from;
        while let Some(handle) = cursor {
            let Some(node) = self.stack.get(handle) else {
                break;
            };
            if node.camera_id == request.camera_id {
                return node.controller.is_equivalent_to(&request.start_info);
            }
            cursor = self.stack.below(handle);
        }
        false
    }

    fn node_clock(&self, handle: ControllerHandle) -> f64 {
        let run_when_paused = self
            .stack
            .get(handle)
            .map_or(false, |node| node.traits.run_when_paused);
        self.state.clocks.for_node(run_when_paused).now
    }

    pub(crate) fn kill(&mut self, handle: ControllerHandle) {
        if let Some(node) = self.stack.get_mut(handle) {
            if !node.blend.is_killed() {
                node.blend.kill_when_blended_out();
                node.controller.on_kill_when_blended_out();
                tracing::debug!(camera = %node.camera_id, "camera superseded");
            }
        }
    }

    pub(crate) fn self_fade(&mut self, handle: ControllerHandle, duration: f32) {
        let now = self.node_clock(handle);
        if let Some(node) = self.stack.get_mut(handle) {
            if !node.blend.self_fade_requested() {
                node.blend.request_self_fade_out(duration, now);
                node.controller.on_self_fade_out(duration);
                tracing::debug!(camera = %node.camera_id, duration, "self fade requested");
            }
        }
    }

    fn record_controller(&mut self, source: Source, handle: ControllerHandle) {
        if let Source::Persistent(id) = source {
            if let Some(request) = self.book.index_of(id).and_then(|i| self.book.get_mut(i)) {
                request.controller = Some(handle);
            }
        }
    }

    fn clear_overrides(&mut self) {
        self.book.blend_override_high = None;
        self.book.blend_override_low = None;
    }

    /// Replace the current camera with a distance hand-off pair
    ///
    /// The current camera keeps serving as the spatial base when it has
    /// fully blended in. Otherwise a fresh base is pushed first, so the
    /// unfinished blend does not pop.
    fn try_push_pair(
        &mut self,
        current: ControllerHandle,
        candidate: &Candidate,
        caller_blend: Option<CameraBlendInfo>,
    ) -> Option<ControllerHandle> {
        let request = &candidate.request;
        if request.start_info.photo_mode {
            return None;
        }
        let registry = self.registry;
        let config = registry.get(request.camera_id)?;
        if config.family() != CameraFamily::DistanceRemapped {
            return None;
        }
        let partner_id = config.distance_partner()?;

        let node = self.stack.get(current)?;
        if node.family != CameraFamily::DistanceRemapped
            || node.is_fading_by_distance()
            || node.blend.fades_in_by_travel()
            || node.settings_id() != request.start_info.settings_id
        {
            return None;
        }
        let need_base = node.blend() < 1.0 - BLEND_EPSILON;
        let rank = node.rank;

        let Some(partner) = registry.get(partner_id) else {
            self.state
                .report_invariant(self.config, CameraError::UnknownCamera(partner_id));
            return None;
        };

        let needed = if need_base { 2 } else { 1 };
        if self.stack.len() + needed > self.stack.capacity() {
            self.state.report_capacity(
                self.config,
                CameraError::StackFull {
                    capacity: self.stack.capacity(),
                },
            );
            return None;
        }

        let pair_blend = self
            .book
            .blend_override_high
            .or(caller_blend)
            .unwrap_or(CameraBlendInfo::seconds(PAIR_BLEND_SECONDS));

        let mut base = current;
        if need_base {
            let mut start = request.start_info.clone();
            start.distance_base = true;
            start.extension = request.extension.clone();
            let mut controller = config.create_controller();
            controller.start(&start);
            base = self.start_internal(config, controller, start, rank, pair_blend, None)?;
            if let Some(node) = self.stack.get_mut(base) {
                node.request = Some(request.id);
            }
            self.kill(current);
        }

        let base_priority = self.stack.get(base).map(|node| node.priority);

        let mut start = request.start_info.clone();
        start.distance_base = false;
        start.extension = request.extension.clone();
        let mut controller = partner.create_controller();
        let mut blend = controller.start(&start);
        if blend.is_default() {
            blend = CameraBlendInfo::distance_to_object(pair_blend.amount);
        } else if pair_blend.kind == BlendKind::FixedTime {
            blend.amount = pair_blend.amount;
        }

        let top = self.start_internal(partner, controller, start, rank, blend, Some(base))?;
        if let Some(node) = self.stack.get_mut(top) {
            node.request = Some(request.id);
            if let Some(priority) = base_priority {
                node.priority = priority;
            }
        }
        self.kill(base);
        self.clear_overrides();
        self.record_controller(candidate.source, top);

        tracing::debug!(
            base = %request.camera_id,
            top = %partner_id,
            new_base = need_base,
            "distance hand-off pushed"
        );
        Some(top)
    }

    /// Instantiate the candidate's camera and put it on top of `current`
    fn push(
        &mut self,
        candidate: Candidate,
        current: Option<ControllerHandle>,
        caller_blend: Option<CameraBlendInfo>,
    ) -> Option<ControllerHandle> {
        let Candidate { request, source } = candidate;

        // A live request taking over clears out everything that was abandoned
        if !request.is_abandoned {
            let stack = &*self.stack;
            let reaped = self.book.reap(true, |h| stack.contains(h));
            if reaped > 0 {
                tracing::debug!(count = reaped, "abandoned camera requests reaped");
            }
        }

        let registry = self.registry;
        let Some(config) = registry.get(request.camera_id) else {
            self.state
                .report_invariant(self.config, CameraError::UnknownCamera(request.camera_id));
            return None;
        };

        let mut start = request.start_info.clone();
        if (current.is_none() || self.book.starting_first_camera) && start.locator.is_none() {
            start.fallback_locator = Some(self.config.start_locator);
        }
        start.extension = request.extension.clone();

        let mut controller = config.create_controller();
        let suggested = controller.start(&start);
        let blend = self.pick_blend(current.is_some(), config, &request, caller_blend, suggested);

        self.clear_overrides();
        self.book.starting_first_camera = false;

        let rank = if controller.traits().photo_mode || start.photo_mode {
            CameraRank::Debug
        } else {
            config.default_rank()
        };

        let handle = self.start_internal(config, controller, start, rank, blend, None)?;
        if let Some(node) = self.stack.get_mut(handle) {
            node.request = Some(request.id);
        }
        self.record_controller(source, handle);

        // Debug cameras sit above the game cameras without replacing them
        if let Some(old) = current {
            if old != handle && rank != CameraRank::Debug {
                self.kill(old);
            }
        }
        Some(handle)
    }

    fn pick_blend(
        &self,
        has_current: bool,
        config: &CameraConfig,
        request: &CameraRequest,
        caller_blend: Option<CameraBlendInfo>,
        suggested: CameraBlendInfo,
    ) -> CameraBlendInfo {
        let blend = if !has_current {
            CameraBlendInfo::seconds(0.0)
        } else if let Some(high) = self.book.blend_override_high {
            high
        } else if let Some(caller) = caller_blend {
            caller
        } else if !request.blend.is_default() {
            request.blend
        } else if config.default_priority().class < PriorityClass::Special {
            self.book.blend_override_low.unwrap_or(suggested)
        } else {
            suggested
        };

        if self.config.force_zero_blend_times {
            CameraBlendInfo::seconds(0.0)
        } else {
            blend
        }
    }

    /// Put a started controller on the stack
    pub(crate) fn start_internal(
        &mut self,
        config: &CameraConfig,
        controller: Box<dyn CameraController>,
        start: CameraStartInfo,
        rank: CameraRank,
        blend: CameraBlendInfo,
        after: Option<ControllerHandle>,
    ) -> Option<ControllerHandle> {
        let mut blend = blend.resolve(self.config.default_blend_seconds);

        let cut = blend.amount <= 0.0
            && blend.is_time_based()
            && blend.kind != BlendKind::DistanceToObject;
        if cut {
            self.state.cuts.notify();
            if blend.kind == BlendKind::CrossFade {
                blend.kind = BlendKind::FixedTime;
            }
        }

        if blend.kind == BlendKind::CrossFade
            && self.stack.iter().any(|(_, node)| node.blend.wants_cross_fade())
        {
            tracing::warn!(camera = %config.id(), "second cross fade requested, using a timed blend");
            blend.kind = BlendKind::FixedTime;
        }

        if rank == CameraRank::Debug {
            let debug_nodes: Vec<_> = self
                .stack
                .iter()
                .filter(|(_, node)| node.rank == CameraRank::Debug)
                .map(|(h, _)| h)
                .collect();
            for handle in debug_nodes {
                let now = self.node_clock(handle);
                if let Some(node) = self.stack.get_mut(handle) {
                    node.blend.end(CameraBlendInfo::seconds(0.0), now);
                }
            }
        }

        let run_when_paused = controller.traits().run_when_paused;
        let now = self.state.clocks.for_node(run_when_paused).now;
        let node = CameraNode::new(
            config,
            controller,
            start,
            rank,
            BlendTracker::new(blend, now),
            CameraLocation::default(),
        );

        let handle = match self.stack.insert(node, after) {
            Ok(handle) => handle,
            Err(err) => {
                self.state.report_capacity(self.config, err);
                return None;
            }
        };

        let below = self
            .stack
            .below(handle)
            .and_then(|h| self.stack.get(h))
            .map(|node| node.location);

        if let Some(node) = self.stack.get_mut(handle) {
            node.location = node.controller.initial_location(below.as_ref());
            if cut {
                node.controller.notify_cut(below.as_ref());
            }
            tracing::debug!(
                camera = %node.camera_id,
                rank = ?node.rank,
                priority = %node.priority,
                blend = ?blend.kind,
                seconds = blend.amount,
                "camera pushed"
            );
        }
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use crate::blend::CameraBlendInfo;
    use crate::context::CameraContext;
    use crate::controller::SceneQuery;
    use crate::controllers::{FollowParams, OrbitParams};
    use crate::frame::FrameInput;
    use crate::hooks::CameraManagerHooks;
    use crate::config::CameraManagerConfig;
    use crate::registry::CameraRegistry;
    use crate::start_info::CameraStartInfo;
    use crate::types::{AssociationId, CameraId, CameraPriority, CameraRank, ObjectId, PriorityClass};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use vantage_math::{Locator, Sid, Vec3};

    fn context() -> CameraContext {
        CameraContext::builtin(CameraManagerConfig::shipping()).unwrap()
    }

    fn fixed_at(x: f32) -> CameraStartInfo {
        CameraStartInfo::new().with_locator(Locator::looking_at(Vec3::new(x, 2.0, 8.0), Vec3::ZERO))
    }

    fn step(ctx: &CameraContext, frames: usize) {
        for _ in 0..frames {
            ctx.update(&FrameInput::new(1.0 / 30.0));
        }
    }

    #[test]
    fn test_transient_beats_weaker_persistent() {
        let ctx = context();
        assert!(ctx.request_persistent_camera(
            CameraId::FIXED,
            AssociationId::new("gameplay"),
            None,
            Some(fixed_at(0.0)),
        ));
        step(&ctx, 1);
        let gameplay = ctx.current_camera(false).unwrap();

        let start = fixed_at(5.0).with_priority(CameraPriority::of(PriorityClass::Special));
        let pushed = ctx.request_camera(CameraId::FIXED, Some(CameraBlendInfo::seconds(0.5)), Some(start));
        assert!(pushed.is_some());
        assert_eq!(ctx.current_camera(false), pushed);
        assert!(ctx.camera_info(gameplay).unwrap().dying);
    }

    #[test]
    fn test_transient_loses_to_stronger_persistent() {
        let ctx = context();
        let forced = fixed_at(0.0).with_priority(CameraPriority::of(PriorityClass::Forced));
        ctx.request_persistent_camera(CameraId::FIXED, AssociationId::new("forced"), None, Some(forced));
        step(&ctx, 1);
        let before = ctx.current_camera(false);

        // Weaker transient request resolves to the persistent camera, which is already active
        let pushed = ctx.request_camera(CameraId::FIXED, None, Some(fixed_at(9.0)));
        assert!(pushed.is_none());
        assert_eq!(ctx.current_camera(false), before);
    }

    #[test]
    fn test_override_transient_always_wins() {
        let ctx = context();
        let forced = fixed_at(0.0).with_priority(CameraPriority::of(PriorityClass::Forced));
        ctx.request_persistent_camera(CameraId::FIXED, AssociationId::new("forced"), None, Some(forced));
        step(&ctx, 1);

        let pushed = ctx.request_camera(CameraId::FIXED_OVERRIDE, None, Some(fixed_at(3.0)));
        assert!(pushed.is_some());
        assert_eq!(ctx.current_camera_including_override(), pushed);
        assert_eq!(ctx.camera_info(pushed.unwrap()).unwrap().rank, CameraRank::Override);
    }

    #[test]
    fn test_death_camera_blocks_weaker_requests() {
        let ctx = context();
        let death = fixed_at(0.0).with_priority(CameraPriority::of(PriorityClass::Death));
        let death_cam = ctx.request_camera(CameraId::FIXED, None, Some(death)).unwrap();

        let special = fixed_at(4.0).with_priority(CameraPriority::of(PriorityClass::Special));
        assert!(ctx.request_camera(CameraId::FIXED, None, Some(special)).is_none());
        assert_eq!(ctx.current_camera(false), Some(death_cam));

        let forced = fixed_at(4.0).with_priority(CameraPriority::of(PriorityClass::Forced));
        assert!(ctx.request_camera(CameraId::FIXED, None, Some(forced)).is_some());
    }

    #[derive(Default)]
    struct PhotoHooks {
        active: AtomicBool,
    }

    struct SharedPhotoHooks(Arc<PhotoHooks>);

    impl CameraManagerHooks for SharedPhotoHooks {
        fn is_photo_mode_active(&self) -> bool {
            self.0.active.load(Ordering::Relaxed)
        }
    }

    #[test]
    fn test_photo_mode_blocks_non_forced() {
        let hooks = Arc::new(PhotoHooks::default());
        let registry = Arc::new(CameraRegistry::with_builtin_cameras().unwrap());
        let ctx = CameraContext::new(
            registry,
            CameraManagerConfig::shipping(),
            Box::new(SharedPhotoHooks(hooks.clone())),
        )
        .unwrap();

        let photo = ctx
            .request_camera(CameraId::FIXED, None, Some(fixed_at(0.0).photo_mode()))
            .unwrap();
        assert_eq!(ctx.camera_info(photo).unwrap().rank, CameraRank::Debug);
        hooks.active.store(true, Ordering::Relaxed);

        let len = ctx.stack_len();
        let special = fixed_at(3.0).with_priority(CameraPriority::of(PriorityClass::Special));
        assert!(ctx.request_camera(CameraId::FIXED, None, Some(special)).is_none());
        assert_eq!(ctx.stack_len(), len);

        let forced = fixed_at(3.0).with_priority(CameraPriority::of(PriorityClass::Forced));
        assert!(ctx.request_camera(CameraId::FIXED, None, Some(forced)).is_some());
        assert_eq!(ctx.current_camera(true), Some(photo));

        // Once photo mode closes, ordinary requests go through again
        hooks.active.store(false, Ordering::Relaxed);
        let special = fixed_at(6.0).with_priority(CameraPriority::of(PriorityClass::Special));
        assert!(ctx.request_camera(CameraId::FIXED, None, Some(special)).is_some());
    }

    #[test]
    fn test_self_fade_instead_of_replacement() {
        let ctx = context();
        let settings = Sid::new("street");
        let follow = CameraStartInfo::new()
            .with_focus(ObjectId(1))
            .with_settings(settings)
            .with_params(&FollowParams::default())
            .unwrap();
        ctx.request_persistent_camera(CameraId::FOLLOW, AssociationId::new("follow"), None, Some(follow.clone()));
        step(&ctx, 1);

        let orbit_start = CameraStartInfo::new()
            .with_target(Vec3::ZERO)
            .with_priority(CameraPriority::of(PriorityClass::Special))
            .with_params(&OrbitParams::default())
            .unwrap();
        let orbit = ctx
            .request_camera(CameraId::ORBIT, Some(CameraBlendInfo::seconds(2.0)), Some(orbit_start))
            .unwrap();
        step(&ctx, 3);
        let len = ctx.stack_len();

        // The follow camera is still blending out underneath, so the orbit fades itself away
        ctx.request_camera(CameraId::FOLLOW, Some(CameraBlendInfo::seconds(0.5)), Some(follow));
        assert_eq!(ctx.stack_len(), len);
        assert_eq!(ctx.current_camera(false), Some(orbit));

        step(&ctx, 40);
        assert!(ctx.camera_info(orbit).is_none());
        assert_eq!(ctx.current_camera_id(false), Some(CameraId::FOLLOW));
    }

    #[test]
    fn test_distance_pair_push() {
        let ctx = context();
        let street = CameraStartInfo::new()
            .with_focus(ObjectId(7))
            .with_settings(Sid::new("street"))
            .with_params(&FollowParams::default())
            .unwrap();
        ctx.request_persistent_camera(CameraId::FOLLOW, AssociationId::new("street"), None, Some(street));
        step(&ctx, 2);
        let base = ctx.current_camera(false).unwrap();

        let region = CameraStartInfo::new()
            .with_locator(Locator::IDENTITY)
            .with_focus(ObjectId(7))
            .with_settings(Sid::new("street"))
            .with_priority(CameraPriority::of(PriorityClass::Designer))
            .with_params(&FollowParams {
                distance: 9.0,
                ..FollowParams::default()
            })
            .unwrap();
        ctx.request_persistent_camera(CameraId::FOLLOW, AssociationId::new("region"), None, Some(region));
        step(&ctx, 1);

        // The fully blended follow camera stays as the base under a distance camera
        let top = ctx.current_camera(false).unwrap();
        let info = ctx.camera_info(top).unwrap();
        assert_eq!(info.camera_id, CameraId::FOLLOW_DISTANCE);
        assert_eq!(ctx.previous_camera(top), Some(base));
        assert!(ctx.camera_info(base).unwrap().dying);

        // Re-resolving the same request is a no-op
        let len = ctx.stack_len();
        ctx.evaluate_requests(None);
        assert_eq!(ctx.stack_len(), len);

        // Leaving the region drops the distance camera and keeps the base
        ctx.disable_persistent_camera(Sid::new("region"), None);
        assert!(ctx.camera_info(top).unwrap().dying);
        assert_eq!(ctx.stack_len(), len);

        // Once the focus is far from the anchor the distance camera no longer contributes
        let away = Focus(Vec3::new(30.0, 0.0, 0.0));
        for _ in 0..60 {
            ctx.update(&FrameInput::new(1.0 / 30.0).with_scene(&away));
        }
        assert!(ctx.camera_info(top).is_none());
        assert_eq!(ctx.current_camera(false), Some(base));
        assert_eq!(ctx.stack_len(), len - 1);
    }

    struct Focus(Vec3);

    impl SceneQuery for Focus {
        fn object_position(&self, object: ObjectId) -> Option<Vec3> {
            (object == ObjectId(7)).then_some(self.0)
        }
    }

    #[test]
    fn test_manual_rerequest_keeps_controller() {
        let ctx = context();
        ctx.request_camera(CameraId::FIXED, None, Some(fixed_at(0.0))).unwrap();
        step(&ctx, 1);
        let manual = ctx
            .request_camera(CameraId::MANUAL, Some(CameraBlendInfo::seconds(0.0)), None)
            .unwrap();
        step(&ctx, 1);
        let len = ctx.stack_len();

        let again = ctx.request_camera(CameraId::MANUAL, Some(CameraBlendInfo::seconds(0.0)), None);
        assert!(again.is_none());
        assert_eq!(ctx.stack_len(), len);
        assert_eq!(ctx.current_camera(true), Some(manual));
        assert!(!ctx.camera_info(manual).unwrap().dying);

        step(&ctx, 1);
        assert_eq!(ctx.stack_len(), len);
        assert!(ctx.is_manual_camera_active());
    }

    #[test]
    fn test_unused_caller_blend_becomes_low_override() {
        let ctx = context();
        ctx.request_camera(CameraId::FIXED, None, Some(fixed_at(0.0))).unwrap();
        step(&ctx, 1);

        // Nothing to resolve, so the blend is kept for the next push
        assert!(ctx.evaluate_requests(Some(CameraBlendInfo::seconds(2.0))).is_none());
        let pushed = ctx.request_camera(CameraId::FIXED, None, Some(fixed_at(4.0))).unwrap();
        step(&ctx, 10);
        // A third of a second into a two second blend
        assert!(ctx.camera_info(pushed).unwrap().blend < 0.2);

        // The override was consumed by that push; the default half second applies again
        let next = ctx.request_camera(CameraId::FIXED, None, Some(fixed_at(8.0))).unwrap();
        step(&ctx, 10);
        assert!(ctx.camera_info(next).unwrap().blend > 0.5);
    }
}
