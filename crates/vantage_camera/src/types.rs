//! Camera identity, priority and rank

use std::fmt;
use vantage_math::Sid;

/// Identifies a camera *type* in the [`CameraRegistry`](crate::CameraRegistry)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraId(&'static str);

impl CameraId {
    /// Free-fly debug camera
    pub const MANUAL: CameraId = CameraId("manual");
    /// Bottom-rank fallback camera that is always on the stack
    pub const MANUAL_BASE: CameraId = CameraId("manual-base");
    /// Static camera placed from a locator
    pub const FIXED: CameraId = CameraId("fixed");
    /// Static camera that sits above gameplay cameras
    pub const FIXED_OVERRIDE: CameraId = CameraId("fixed-override");
    /// Pivot camera orbiting a target
    pub const ORBIT: CameraId = CameraId("orbit");
    /// Follow camera (distance-remapped family)
    pub const FOLLOW: CameraId = CameraId("follow");
    /// Follow camera variant that fades in by distance to its focus object
    pub const FOLLOW_DISTANCE: CameraId = CameraId("follow-distance");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Coarse priority class, ordered from weakest to strongest
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriorityClass {
    Player,
    Gameplay,
    Designer,
    Special,
    Journal,
    Death,
    Forced,
}

/// Total order of class, then level within the class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraPriority {
    pub class: PriorityClass,
    pub level: u16,
}

impl CameraPriority {
    /// Highest level within a class
    pub const LEVEL_MAX: u16 = 1000;

    pub const fn new(class: PriorityClass, level: u16) -> Self {
        Self { class, level }
    }

    /// Lowest level of `class`
    pub const fn of(class: PriorityClass) -> Self {
        Self { class, level: 0 }
    }
}

impl fmt::Display for CameraPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.class, self.level)
    }
}

/// Structural slot of a camera in the stack
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CameraRank {
    /// Fallback camera, always at index 0
    Bottom,
    Normal,
    /// Above every normal camera, below debug
    Override,
    /// Always topmost
    Debug,
}

/// Handle of a world object a camera can focus on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// Stable name of a persistent request
///
/// Requests sharing a name but differing in `index` re-target each other: a
/// newer index replaces the older request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AssociationId {
    pub name: Sid,
    pub index: i32,
}

impl AssociationId {
    pub const fn new(name: &str) -> Self {
        Self {
            name: Sid::new(name),
            index: 0,
        }
    }

    pub const fn with_index(mut self, index: i32) -> Self {
        self.index = index;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let gameplay = CameraPriority::of(PriorityClass::Gameplay);
        let gameplay_hi = CameraPriority::new(PriorityClass::Gameplay, 10);
        let forced = CameraPriority::of(PriorityClass::Forced);
        assert!(gameplay < gameplay_hi);
        assert!(gameplay_hi < forced);
        assert!(CameraPriority::of(PriorityClass::Death) < forced);
    }

    #[test]
    fn test_rank_order() {
        assert!(CameraRank::Bottom < CameraRank::Normal);
        assert!(CameraRank::Normal < CameraRank::Override);
        assert!(CameraRank::Override < CameraRank::Debug);
    }
}
