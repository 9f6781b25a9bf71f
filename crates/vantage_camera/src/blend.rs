//! Blend descriptions and per-node blend tracking
//!
//! A node's **blend** is its blend-in progress: 0 when it has just been
//! pushed, 1 once it fully covers everything below it. The compositor weights
//! the layers beneath a node by `1 - blend`. The **normalized blend** is the
//! share of the final image the node actually owns once the nodes above it
//! have claimed theirs.

use vantage_math::easing::{ease_tension, lerp_scale, lerp_scale_clamp, quad_ease_in_out};

/// Tolerance used for "fully in" / "fully out" checks
pub const BLEND_EPSILON: f32 = 1e-4;

const EASE_TENSION: f32 = 0.75;

/// Metric driving a node's blend-in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendKind {
    /// Let the controller or the manager pick
    #[default]
    Default,
    /// Eased over `amount` seconds
    FixedTime,
    /// Dissolve between two rendered images over `amount` seconds
    CrossFade,
    /// Like `FixedTime` but holds back for the first 15% of the blend
    AcceleratedEase,
    /// Eased over `amount` units travelled by the focus object
    TravelDistance,
    /// Reaches full blend over `amount` seconds; hand-off is driven by the distance weight
    DistanceToObject,
    /// Blend value supplied by the controller each frame
    Script,
}

/// How fast, and by which metric, a node ramps in
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraBlendInfo {
    pub kind: BlendKind,
    /// Seconds or distance, depending on `kind`
    pub amount: f32,
}

impl CameraBlendInfo {
    pub const fn new(kind: BlendKind, amount: f32) -> Self {
        Self { kind, amount }
    }

    pub const fn seconds(seconds: f32) -> Self {
        Self::new(BlendKind::FixedTime, seconds)
    }

    pub const fn cross_fade(seconds: f32) -> Self {
        Self::new(BlendKind::CrossFade, seconds)
    }

    pub const fn accelerated(seconds: f32) -> Self {
        Self::new(BlendKind::AcceleratedEase, seconds)
    }

    pub const fn travel_distance(distance: f32) -> Self {
        Self::new(BlendKind::TravelDistance, distance)
    }

    pub const fn distance_to_object(seconds: f32) -> Self {
        Self::new(BlendKind::DistanceToObject, seconds)
    }

    pub const fn script() -> Self {
        Self::new(BlendKind::Script, 0.0)
    }

    pub fn is_default(&self) -> bool {
        self.kind == BlendKind::Default
    }

    /// Blend progress is measured in seconds
    pub fn is_time_based(&self) -> bool {
        matches!(
            self.kind,
            BlendKind::FixedTime
                | BlendKind::CrossFade
                | BlendKind::AcceleratedEase
                | BlendKind::DistanceToObject
        )
    }

    /// A zero-length time blend: the node is fully in on the frame it is pushed
    pub fn is_instant(&self) -> bool {
        (self.is_time_based() || self.kind == BlendKind::TravelDistance) && self.amount <= 0.0
    }

    /// Replace `Default` with a timed blend of `default_seconds`
    pub fn resolve(self, default_seconds: f32) -> Self {
        if self.is_default() {
            Self::seconds(default_seconds)
        } else {
            self
        }
    }
}

/// Clock a tracker reads this frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BlendClock {
    pub now: f64,
    pub dt: f32,
}

/// Per-frame inputs supplied by the node's controller
#[derive(Clone, Copy, Debug, Default)]
pub struct BlendInputs {
    pub clock: BlendClock,
    /// Distance travelled by the focus object since the node was pushed
    pub travelled: f32,
    /// Controller supplied blend for `BlendKind::Script`
    pub scripted: Option<f32>,
    /// The node above exists and is not Debug rank
    pub covered_by_non_debug: bool,
}

/// State of the node directly above, used by the death test
#[derive(Clone, Copy, Debug, Default)]
pub struct AboveBlendState {
    pub fades_in_by_travel: bool,
    /// The node above hands off against this one by distance
    pub pairs_with_below: bool,
    pub blend: f32,
}

#[derive(Clone, Copy, Debug)]
struct SelfFade {
    requested: bool,
    current: f32,
    when_requested: f32,
    duration: f32,
    start_time: Option<f64>,
}

impl Default for SelfFade {
    fn default() -> Self {
        Self {
            requested: false,
            current: 1.0,
            when_requested: 1.0,
            duration: 0.0,
            start_time: None,
        }
    }
}

/// Blend state owned by a single stack node
#[derive(Clone, Debug)]
pub struct BlendTracker {
    info: CameraBlendInfo,
    death_blend: CameraBlendInfo,
    base_blend: f32,
    blend: f32,
    normal_blend: f32,
    start_time: f64,
    end_time: Option<f64>,
    kill_when_blended_out: bool,
    dying: bool,
    dead: bool,
    focus_lost: bool,
    self_fade: SelfFade,
}

impl BlendTracker {
    /// Start tracking a freshly pushed node; `info` must already be resolved
    pub fn new(info: CameraBlendInfo, now: f64) -> Self {
        let initial = if info.is_instant() { 1.0 } else { 0.0 };
        Self {
            info,
            death_blend: CameraBlendInfo::seconds(0.0),
            base_blend: initial,
            blend: initial,
            normal_blend: 0.0,
            start_time: now,
            end_time: None,
            kill_when_blended_out: false,
            dying: false,
            dead: false,
            focus_lost: false,
            self_fade: SelfFade::default(),
        }
    }

    pub fn info(&self) -> CameraBlendInfo {
        self.info
    }

    pub fn blend(&self) -> f32 {
        self.blend
    }

    pub fn normal_blend(&self) -> f32 {
        self.normal_blend
    }

    pub fn wants_cross_fade(&self) -> bool {
        self.info.kind == BlendKind::CrossFade
    }

    /// Demote a cross-fade to a plain timed blend
    pub fn clear_cross_fade(&mut self) {
        if self.info.kind == BlendKind::CrossFade {
            self.info.kind = BlendKind::FixedTime;
        }
    }

    pub fn fades_in_by_travel(&self) -> bool {
        self.info.kind == BlendKind::TravelDistance
    }

    pub fn kill_when_blended_out(&mut self) {
        self.kill_when_blended_out = true;
    }

    pub fn is_killed(&self) -> bool {
        self.kill_when_blended_out
    }

    /// The focus object this node needs no longer exists
    pub fn lose_focus(&mut self) {
        self.focus_lost = true;
    }

    pub fn has_lost_focus(&self) -> bool {
        self.focus_lost
    }

    /// `end` has been called and the node is fading itself out
    pub fn is_ending(&self) -> bool {
        self.dying || self.dead
    }

    /// Fade this node out over `blend`; a zero duration ends it immediately
    pub fn end(&mut self, blend: CameraBlendInfo, now: f64) {
        self.death_blend = blend;
        self.dying = true;

        if blend.amount <= 0.0 {
            self.end_time = Some(now);
            self.dying = false;
            self.dead = true;
            self.base_blend = 0.0;
            self.blend = 0.0;
        }
    }

    pub fn self_fade_requested(&self) -> bool {
        self.self_fade.requested
    }

    pub fn self_fade(&self) -> f32 {
        self.self_fade.current
    }

    /// Ramp this node's contribution down to nothing without a replacement
    pub fn request_self_fade_out(&mut self, duration: f32, now: f64) {
        if self.self_fade.requested {
            return;
        }
        let fade = &mut self.self_fade;
        fade.requested = true;
        fade.when_requested = fade.current;
        fade.duration = lerp_scale(0.5, 1.0, 0.5, 1.0, self.blend) * duration;
        fade.start_time = Some(now);
    }

    /// Undo a pending self-fade, fading back in over `duration`
    pub fn cancel_self_fade_out(&mut self, duration: f32, now: f64) {
        if !self.self_fade.requested {
            return;
        }
        let fade = &mut self.self_fade;
        fade.requested = false;
        fade.when_requested = fade.current;
        fade.duration = lerp_scale(0.5, 1.0, 0.5, 1.0, 1.0 - self.blend) * duration;
        fade.start_time = Some(now);
    }

    /// Advance the blend for this frame
    pub fn update(&mut self, inputs: &BlendInputs) {
        match self.info.kind {
            BlendKind::Script => self.update_by_script(inputs),
            BlendKind::TravelDistance if self.end_time.is_none() && !self.dying => {
                let progress = if self.info.amount > 0.0 {
                    ease_tension(inputs.travelled / self.info.amount, EASE_TENSION)
                } else {
                    1.0
                };
                self.base_blend = quad_ease_in_out(progress);
            }
            _ => self.update_by_time(inputs.clock),
        }

        self.update_self_fade(inputs.clock.now);
        self.blend = (self.base_blend * self.self_fade.current).clamp(0.0, 1.0);
    }

    fn update_by_script(&mut self, inputs: &BlendInputs) {
        if let Some(value) = inputs.scripted {
            self.base_blend = value.clamp(0.0, 1.0);
        }
        let fully_in = self.base_blend >= 1.0 - BLEND_EPSILON;
        let not_contributing = inputs.covered_by_non_debug && self.normal_blend < BLEND_EPSILON;
        if fully_in || not_contributing {
            self.reset_to_time_based();
        }
    }

    fn reset_to_time_based(&mut self) {
        self.info.kind = BlendKind::FixedTime;
        if self.info.amount <= 0.0 {
            self.info.amount = 0.5;
        }
        // Already fully in; restart the clock so the timed blend does not re-ramp from zero
        self.start_time = f64::NEG_INFINITY;
    }

    fn update_by_time(&mut self, clock: BlendClock) {
        let (basis, duration) = match self.end_time {
            Some(end) => ((end - clock.now).max(0.0) as f32, self.death_blend.amount),
            None => ((clock.now - self.start_time).max(0.0) as f32, self.info.amount),
        };

        let progress = if duration > 0.0 {
            ease_tension(basis / duration, EASE_TENSION)
        } else if self.dead {
            0.0
        } else {
            1.0
        };

        if self.dying {
            self.end_time = Some(clock.now + self.death_blend.amount as f64);
            self.dying = false;
            self.dead = true;
        }

        let kind = if self.dead {
            self.death_blend.kind
        } else {
            self.info.kind
        };

        self.base_blend = if duration > 0.0 {
            if kind == BlendKind::AcceleratedEase {
                quad_ease_in_out(lerp_scale(0.15, 1.0, 0.0, 1.0, progress))
            } else {
                quad_ease_in_out(progress)
            }
        } else if self.end_time.is_some() {
            if progress > 0.0 {
                1.0
            } else {
                0.0
            }
        } else if progress >= 1.0 {
            1.0
        } else {
            0.0
        };

        if self.base_blend >= 1.0 - BLEND_EPSILON {
            self.clear_cross_fade();
        }
    }

    fn update_self_fade(&mut self, now: f64) {
        let Some(start) = self.self_fade.start_time else {
            return;
        };
        let fade = &mut self.self_fade;
        let basis = (now - start).max(0.0) as f32;
        let progress = if fade.duration > 0.0 {
            ease_tension(basis / fade.duration, EASE_TENSION)
        } else {
            1.0
        };

        fade.current = if fade.requested {
            lerp_scale_clamp(1.0, 0.0, fade.when_requested, 0.0, quad_ease_in_out(1.0 - progress))
        } else {
            lerp_scale_clamp(0.0, 1.0, fade.when_requested, 1.0, progress)
        };
    }

    /// Recompute the normalized blend from the remaining contribution budget
    pub fn update_normal(&mut self, contribute: f32, distance_weight: Option<f32>) {
        let mut normal = self.blend * contribute;
        if let Some(weight) = distance_weight {
            normal *= weight;
        }
        self.normal_blend = normal.clamp(0.0, 1.0);
    }

    /// Whether this node can be removed from the stack
    pub fn is_dead(&self, above: Option<AboveBlendState>) -> bool {
        if self.self_fade.requested && self.self_fade.current < BLEND_EPSILON {
            return true;
        }

        if self.dead && !self.dying && self.base_blend < BLEND_EPSILON {
            return true;
        }

        if self.kill_when_blended_out
            && self.normal_blend < BLEND_EPSILON
            && self.blend > 1.0 - BLEND_EPSILON
        {
            // A travel-distance camera above still needs us as its blend source
            if let Some(above) = above {
                if above.pairs_with_below {
                    return false;
                }
                if above.fades_in_by_travel && above.blend < 1.0 - BLEND_EPSILON {
                    return false;
                }
            }
            return true;
        }

        self.focus_lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(now: f64) -> BlendInputs {
        BlendInputs {
            clock: BlendClock { now, dt: 1.0 / 60.0 },
            ..Default::default()
        }
    }

    #[test]
    fn test_instant_blend_is_full_immediately() {
        let tracker = BlendTracker::new(CameraBlendInfo::seconds(0.0), 3.0);
        assert!((tracker.blend() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_timed_blend_ramps_monotonically() {
        let mut tracker = BlendTracker::new(CameraBlendInfo::seconds(1.0), 0.0);
        assert_eq!(tracker.blend(), 0.0);

        let mut last = 0.0;
        for i in 1..=10 {
            tracker.update(&at(i as f64 * 0.1));
            assert!(tracker.blend() >= last);
            assert!((0.0..=1.0).contains(&tracker.blend()));
            last = tracker.blend();
        }
        assert!((tracker.blend() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_accelerated_ease_holds_back() {
        let mut plain = BlendTracker::new(CameraBlendInfo::seconds(1.0), 0.0);
        let mut accel = BlendTracker::new(CameraBlendInfo::accelerated(1.0), 0.0);
        plain.update(&at(0.05));
        accel.update(&at(0.05));
        assert!(accel.blend() <= plain.blend());
    }

    #[test]
    fn test_cross_fade_becomes_timed_when_complete() {
        let mut tracker = BlendTracker::new(CameraBlendInfo::cross_fade(0.5), 0.0);
        assert!(tracker.wants_cross_fade());
        tracker.update(&at(0.25));
        assert!(tracker.wants_cross_fade());
        tracker.update(&at(1.0));
        assert!(!tracker.wants_cross_fade());
        assert_eq!(tracker.info().kind, BlendKind::FixedTime);
    }

    #[test]
    fn test_end_with_zero_time_is_dead() {
        let mut tracker = BlendTracker::new(CameraBlendInfo::seconds(0.0), 0.0);
        tracker.end(CameraBlendInfo::seconds(0.0), 1.0);
        assert_eq!(tracker.blend(), 0.0);
        assert!(tracker.is_dead(None));
    }

    #[test]
    fn test_end_with_death_blend_fades_out() {
        let mut tracker = BlendTracker::new(CameraBlendInfo::seconds(0.0), 0.0);
        tracker.update(&at(0.1));
        tracker.end(CameraBlendInfo::seconds(1.0), 0.1);
        tracker.update(&at(0.1));
        assert!(tracker.is_ending());
        assert!(!tracker.is_dead(None));

        tracker.update(&at(0.6));
        assert!(tracker.blend() < 1.0);
        tracker.update(&at(1.2));
        assert!(tracker.blend() < BLEND_EPSILON);
        assert!(tracker.is_dead(None));
    }

    #[test]
    fn test_lost_focus_is_dead() {
        let mut tracker = BlendTracker::new(CameraBlendInfo::seconds(0.0), 0.0);
        tracker.update(&at(0.1));
        tracker.update_normal(1.0, None);
        assert!(!tracker.is_dead(None));
        tracker.lose_focus();
        assert!(tracker.has_lost_focus());
        assert!(tracker.is_dead(None));
    }

    #[test]
    fn test_killed_node_dies_once_covered() {
        let mut tracker = BlendTracker::new(CameraBlendInfo::seconds(0.0), 0.0);
        tracker.update(&at(0.0));
        tracker.kill_when_blended_out();
        tracker.update_normal(0.5, None);
        assert!(!tracker.is_dead(None));
        tracker.update_normal(0.0, None);
        assert!(tracker.is_dead(None));

        let above = AboveBlendState {
            fades_in_by_travel: true,
            pairs_with_below: false,
            blend: 0.5,
        };
        assert!(!tracker.is_dead(Some(above)));

        let paired = AboveBlendState {
            fades_in_by_travel: false,
            pairs_with_below: true,
            blend: 1.0,
        };
        assert!(!tracker.is_dead(Some(paired)));
    }

    #[test]
    fn test_self_fade_out_and_cancel() {
        let mut tracker = BlendTracker::new(CameraBlendInfo::seconds(0.0), 0.0);
        tracker.update(&at(0.0));
        tracker.request_self_fade_out(0.5, 0.0);
        assert!(tracker.self_fade_requested());

        tracker.update(&at(0.25));
        let halfway = tracker.self_fade();
        assert!(halfway < 1.0 && halfway > 0.0);
        assert!((tracker.blend() - halfway).abs() < 1e-6);

        tracker.cancel_self_fade_out(0.25, 0.25);
        tracker.update(&at(1.0));
        assert!((tracker.self_fade() - 1.0).abs() < 1e-4);
        assert!(!tracker.is_dead(None));

        tracker.request_self_fade_out(0.5, 1.0);
        tracker.update(&at(2.0));
        assert!(tracker.self_fade() < BLEND_EPSILON);
        assert!(tracker.is_dead(None));
    }

    #[test]
    fn test_script_blend_resets_when_full() {
        let mut tracker = BlendTracker::new(CameraBlendInfo::script(), 0.0);
        let mut inputs = at(0.1);
        inputs.scripted = Some(0.4);
        tracker.update(&inputs);
        assert!((tracker.blend() - 0.4).abs() < 1e-6);

        inputs.scripted = Some(1.0);
        tracker.update(&inputs);
        assert_eq!(tracker.info().kind, BlendKind::FixedTime);
        assert!((tracker.blend() - 1.0).abs() < 1e-6);

        tracker.update(&at(0.2));
        assert!((tracker.blend() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_travel_distance_blend() {
        let mut tracker = BlendTracker::new(CameraBlendInfo::travel_distance(4.0), 0.0);
        let mut inputs = at(0.1);
        inputs.travelled = 2.0;
        tracker.update(&inputs);
        assert!(tracker.blend() > 0.0 && tracker.blend() < 1.0);
        inputs.travelled = 5.0;
        tracker.update(&inputs);
        assert!((tracker.blend() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normal_blend_scaling() {
        let mut tracker = BlendTracker::new(CameraBlendInfo::seconds(0.0), 0.0);
        tracker.update_normal(0.5, Some(0.5));
        assert!((tracker.normal_blend() - 0.25).abs() < 1e-6);
        tracker.update_normal(2.0, None);
        assert!((tracker.normal_blend() - 1.0).abs() < 1e-6);
    }
}
