//! Camera input state

use vantage_math::{Vec2, Vec3};

/// Input state handed to controllers each frame
///
/// Only the topmost contributing camera receives live input; every other
/// node sees [`CameraInput::suppressed`] set and should hold still.
#[derive(Clone, Debug, Default)]
pub struct CameraInput {
    /// Look delta this frame (mouse pixels or stick deflection)
    pub look_delta: Vec2,
    /// Zoom delta (positive = zoom in)
    pub zoom_delta: f32,
    /// Movement keys currently held
    pub keys: MovementKeys,
    /// Look is only applied while this is held (right mouse button)
    pub look_held: bool,
    /// Input belongs to another camera this frame
    pub suppressed: bool,
}

impl CameraInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input for a camera that does not own the controls this frame
    pub fn suppressed() -> Self {
        Self {
            suppressed: true,
            ..Self::default()
        }
    }

    /// Check if any movement keys are pressed
    pub fn has_movement(&self) -> bool {
        !self.suppressed && self.keys.any()
    }

    /// Normalized movement direction in camera space (-Z forward)
    pub fn movement_direction(&self) -> Vec3 {
        if self.suppressed {
            return Vec3::ZERO;
        }
        let k = &self.keys;
        let axis = |pos: bool, neg: bool| (pos as i32 - neg as i32) as f32;
        Vec3::new(
            axis(k.right, k.left),
            axis(k.up, k.down),
            axis(k.backward, k.forward),
        )
        .normalize()
    }
}

/// Movement key states
#[derive(Clone, Debug, Default)]
pub struct MovementKeys {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub sprint: bool,
    pub slow: bool,
}

impl MovementKeys {
    pub fn any(&self) -> bool {
        self.forward || self.backward || self.left || self.right || self.up || self.down
    }

    /// Speed multiplier based on modifiers
    pub fn speed_multiplier(&self, sprint_mult: f32, slow_mult: f32) -> f32 {
        if self.sprint {
            sprint_mult
        } else if self.slow {
            slow_mult
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_direction() {
        let mut input = CameraInput::new();
        input.keys.forward = true;
        input.keys.right = true;
        let dir = input.movement_direction();
        assert!((dir.length() - 1.0).abs() < 1e-5);
        assert!(dir.z < 0.0 && dir.x > 0.0);

        input.suppressed = true;
        assert_eq!(input.movement_direction(), Vec3::ZERO);
        assert!(!input.has_movement());
    }
}
