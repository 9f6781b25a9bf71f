//! Per-frame input, clocks and frame-scoped state

use crate::blend::BlendClock;
use crate::controller::SceneQuery;
use crate::input::CameraInput;
use crate::location::CameraLocation;
use vantage_math::Vec3;

/// Everything a context needs to advance one frame
pub struct FrameInput<'a> {
    /// Seconds since the previous frame
    pub dt: f32,
    /// Game clock is stopped; only cameras that run while paused keep going
    pub paused: bool,
    /// Raw controls, delivered to the topmost contributing camera
    pub input: CameraInput,
    pub scene: Option<&'a dyn SceneQuery>,
}

impl<'a> FrameInput<'a> {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            paused: false,
            input: CameraInput::default(),
            scene: None,
        }
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    pub fn with_input(mut self, input: CameraInput) -> Self {
        self.input = input;
        self
    }

    pub fn with_scene(mut self, scene: &'a dyn SceneQuery) -> Self {
        self.scene = Some(scene);
        self
    }
}

/// Game and camera clocks
///
/// The game clock stops while paused, the camera clock never does.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FrameClocks {
    pub game: BlendClock,
    pub camera: BlendClock,
    /// Every update, paused or not
    pub frame: u64,
    /// Unpaused updates only
    pub game_frame: u64,
    pub paused: bool,
}

impl FrameClocks {
    pub fn advance(&mut self, dt: f32, paused: bool) {
        let dt = dt.max(0.0);
        self.frame += 1;
        self.paused = paused;
        self.camera.now += dt as f64;
        self.camera.dt = dt;
        if paused {
            self.game.dt = 0.0;
        } else {
            self.game.now += dt as f64;
            self.game.dt = dt;
            self.game_frame += 1;
        }
    }

    /// Clock a node runs on
    pub fn for_node(&self, run_when_paused: bool) -> BlendClock {
        if run_when_paused {
            self.camera
        } else {
            self.game
        }
    }
}

/// Camera cut flags, shifted forward once per unpaused frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CutTracker {
    last_frame: bool,
    this_frame: bool,
    next_frame: bool,
    in_two_frames: bool,
    in_three_frames: bool,
}

impl CutTracker {
    pub fn notify(&mut self) {
        self.this_frame = true;
    }

    pub fn notify_next_frame(&mut self) {
        self.next_frame = true;
    }

    /// Flag a cut `frames` frames from now; anything past three lands on the third
    pub fn notify_in_frames(&mut self, frames: u32) {
        match frames {
            0 => self.this_frame = true,
            1 => self.next_frame = true,
            2 => self.in_two_frames = true,
            _ => self.in_three_frames = true,
        }
    }

    pub fn this_frame(&self) -> bool {
        self.this_frame
    }

    pub fn last_frame(&self) -> bool {
        self.last_frame
    }

    pub(crate) fn shift(&mut self) {
        self.last_frame = self.this_frame;
        self.this_frame = self.next_frame;
        self.next_frame = self.in_two_frames;
        self.in_two_frames = self.in_three_frames;
        self.in_three_frames = false;
    }
}

#[derive(Clone, Copy, Debug)]
struct NearPlaneSlot {
    game_frame: u64,
    distance: f32,
    priority: u32,
}

/// Near-plane requests keyed by frame; a request covers its frame and the next
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct NearPlaneOverride {
    slots: [Option<NearPlaneSlot>; 2],
}

impl NearPlaneOverride {
    pub fn set(&mut self, distance: f32, priority: u32, game_frame: u64) {
        self.set_slot(distance, priority, game_frame);
        self.set_slot(distance, priority, game_frame + 1);
    }

    fn set_slot(&mut self, distance: f32, priority: u32, game_frame: u64) {
        let slot = NearPlaneSlot {
            game_frame,
            distance,
            priority,
        };

        if let Some(existing) = self
            .slots
            .iter_mut()
            .flatten()
            .find(|s| s.game_frame == game_frame)
        {
            if existing.priority < priority {
                *existing = slot;
            }
            return;
        }

        // Replace an empty slot, else the oldest one
        let index = match self.slots {
            [None, _] => 0,
            [_, None] => 1,
            [Some(a), Some(b)] => usize::from(b.game_frame < a.game_frame),
        };
        self.slots[index] = Some(slot);
    }

    /// Override active on `game_frame`, if any
    pub fn get(&self, game_frame: u64) -> Option<f32> {
        self.slots
            .iter()
            .flatten()
            .find(|s| s.game_frame == game_frame && s.distance > 0.0)
            .map(|s| s.distance)
    }
}

/// The camera a context produced for one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FinalCamera {
    /// Render pose, environment adjusted and with the final near plane
    pub location: CameraLocation,
    /// Pose beneath the cross-fade node, when one is blending
    pub before_cross_fade: Option<CameraLocation>,
    /// Dissolve factor between `before_cross_fade` and `location`
    pub cross_fade: f32,
    /// Composite with debug cameras left out
    pub no_manual: CameraLocation,
    pub velocity: Vec3,
    pub near_plane: f32,
    /// Renderers and audio should treat this frame as a teleport
    pub camera_cut: bool,
    pub frame: u64,
}

impl Default for FinalCamera {
    fn default() -> Self {
        Self {
            location: CameraLocation::default(),
            before_cross_fade: None,
            cross_fade: 0.0,
            no_manual: CameraLocation::default(),
            velocity: Vec3::ZERO,
            near_plane: crate::location::DEFAULT_NEAR_PLANE,
            camera_cut: false,
            frame: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clocks_pause() {
        let mut clocks = FrameClocks::default();
        clocks.advance(0.5, false);
        clocks.advance(0.5, true);
        assert!((clocks.game.now - 0.5).abs() < 1e-9);
        assert!((clocks.camera.now - 1.0).abs() < 1e-9);
        assert_eq!(clocks.game.dt, 0.0);
        assert_eq!(clocks.frame, 2);
        assert_eq!(clocks.game_frame, 1);
        assert!((clocks.for_node(true).now - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cut_shift() {
        let mut cuts = CutTracker::default();
        cuts.notify_in_frames(2);
        assert!(!cuts.this_frame());
        cuts.shift();
        assert!(!cuts.this_frame());
        cuts.shift();
        assert!(cuts.this_frame());
        cuts.shift();
        assert!(!cuts.this_frame());
        assert!(cuts.last_frame());
    }

    #[test]
    fn test_near_plane_override_spans_two_frames() {
        let mut near = NearPlaneOverride::default();
        near.set(0.1, 1, 10);
        assert_eq!(near.get(10), Some(0.1));
        assert_eq!(near.get(11), Some(0.1));
        assert_eq!(near.get(12), None);

        // Lower priority does not win, higher does
        near.set(0.5, 0, 11);
        assert_eq!(near.get(11), Some(0.1));
        near.set(0.05, 5, 11);
        assert_eq!(near.get(11), Some(0.05));
        assert_eq!(near.get(12), Some(0.05));
        assert_eq!(near.get(10), None);
    }
}
