//! Follow camera controller
//!
//! Trails a focus object with a world-space offset and damping. The
//! distance variant is pushed on top of a plain follow camera and hands off
//! against it as the focus object approaches the variant's anchor.

use crate::blend::CameraBlendInfo;
use crate::controller::{CameraController, CameraInstanceInfo, ControllerTraits};
use crate::location::CameraLocation;
use crate::start_info::CameraStartInfo;
use crate::types::ObjectId;
use bytemuck::{Pod, Zeroable};
use vantage_math::easing::lerp_scale_clamp;
use vantage_math::{Quat, Sid, Vec3};

/// Start parameters for [`FollowCamera`]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct FollowParams {
    /// Horizontal distance behind the focus object
    pub distance: f32,
    /// Height above the focus object
    pub height: f32,
    /// Look-at height above the focus object
    pub look_height: f32,
    /// Position smoothing (0 = instant, higher = slower)
    pub damping: f32,
    /// Focus distance to the anchor at which the distance variant fully owns the view
    pub fade_near: f32,
    /// Focus distance to the anchor at which the distance variant is gone
    pub fade_far: f32,
}

impl Default for FollowParams {
    fn default() -> Self {
        Self {
            distance: 8.0,
            height: 3.0,
            look_height: 1.0,
            damping: 0.05,
            fade_near: 2.0,
            fade_far: 10.0,
        }
    }
}

/// Follow camera controller
#[derive(Clone, Debug)]
pub struct FollowCamera {
    by_distance: bool,
    start: CameraStartInfo,
    params: FollowParams,

    focus_position: Vec3,
    anchor: Option<Vec3>,
    current_position: Vec3,
    current_rotation: Quat,
    weight: f32,
    travelled: f32,
    settled: bool,
}

impl FollowCamera {
    /// Plain follow camera
    pub fn new() -> Self {
        Self {
            by_distance: false,
            start: CameraStartInfo::default(),
            params: FollowParams::default(),

            focus_position: Vec3::ZERO,
            anchor: None,
            current_position: Vec3::ZERO,
            current_rotation: Quat::IDENTITY,
            weight: 1.0,
            travelled: 0.0,
            settled: false,
        }
    }

    /// Variant that fades in by distance against the camera below
    pub fn by_distance() -> Self {
        Self {
            by_distance: true,
            ..Self::new()
        }
    }

    fn desired_position(&self) -> Vec3 {
        self.focus_position + Vec3::new(0.0, self.params.height, self.params.distance)
    }

    fn look_at(&self) -> Vec3 {
        self.focus_position + Vec3::new(0.0, self.params.look_height, 0.0)
    }

    fn rotation_towards(&self, position: Vec3) -> Quat {
        Quat::look_rotation(self.look_at() - position, Vec3::UP)
    }

    fn location(&self) -> CameraLocation {
        let mut location = CameraLocation::new(vantage_math::Locator::new(
            self.current_position,
            self.current_rotation,
        ));
        location.target = Some(self.look_at());
        location
    }

    fn update_weight(&mut self) {
        self.weight = match self.anchor {
            Some(anchor) => lerp_scale_clamp(
                self.params.fade_far,
                self.params.fade_near,
                0.0,
                1.0,
                self.focus_position.distance(anchor),
            ),
            None => 1.0,
        };
    }
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraController for FollowCamera {
    fn start(&mut self, start: &CameraStartInfo) -> CameraBlendInfo {
        self.start = start.clone();
        self.params = start.params.unpack().unwrap_or_default();
        self.anchor = start.locator.map(|locator| locator.position);
        if let Some(target) = start.target {
            self.focus_position = target;
            if self.anchor.is_none() {
                self.anchor = Some(target);
            }
        }
        self.current_position = self.desired_position();
        self.current_rotation = self.rotation_towards(self.current_position);
        self.update_weight();

        if self.by_distance {
            CameraBlendInfo::distance_to_object(1.0)
        } else {
            CameraBlendInfo::default()
        }
    }

    fn update_location(&mut self, info: &CameraInstanceInfo<'_>) -> CameraLocation {
        if let Some(position) = info.object_position(self.start.focus_object) {
            if self.settled {
                self.travelled += position.distance(self.focus_position);
            }
            self.focus_position = position;
        }
        self.update_weight();

        let desired = self.desired_position();
        if !self.settled {
            self.current_position = desired;
            self.settled = true;
        } else {
            let t = 1.0 - self.params.damping.clamp(0.0, 1.0).powf(info.dt * 60.0);
            self.current_position = self.current_position.lerp(desired, t);
        }
        self.current_rotation = self.rotation_towards(self.current_position);

        self.location()
    }

    fn is_equivalent_to(&self, start: &CameraStartInfo) -> bool {
        self.start.common_eq(start)
            && self.start.params == start.params
            && self.start.distance_base == start.distance_base
    }

    fn initial_location(&self, _below: Option<&CameraLocation>) -> CameraLocation {
        self.location()
    }

    fn traits(&self) -> ControllerTraits {
        ControllerTraits {
            fades_in_by_distance: self.by_distance,
            needs_focus: self.start.focus_object.is_some(),
            ..ControllerTraits::default()
        }
    }

    fn distance_weight(&self) -> f32 {
        self.weight
    }

    fn travelled_distance(&self) -> f32 {
        self.travelled
    }

    fn settings_id(&self) -> Option<Sid> {
        self.start.settings_id
    }

    fn focus_object(&self) -> Option<ObjectId> {
        self.start.focus_object
    }

    fn notify_cut(&mut self, _below: Option<&CameraLocation>) {
        self.current_position = self.desired_position();
        self.current_rotation = self.rotation_towards(self.current_position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SceneQuery;
    use crate::input::CameraInput;
    use crate::types::{CameraId, CameraRank};
    use vantage_math::Locator;

    struct OneObject(Vec3);

    impl SceneQuery for OneObject {
        fn object_position(&self, object: ObjectId) -> Option<Vec3> {
            (object == ObjectId(1)).then_some(self.0)
        }
    }

    fn update(camera: &mut FollowCamera, scene: &OneObject) -> CameraLocation {
        let previous = CameraLocation::default();
        let input = CameraInput::suppressed();
        camera.update_location(&CameraInstanceInfo {
            dt: 1.0 / 60.0,
            camera_id: CameraId::FOLLOW_DISTANCE,
            rank: CameraRank::Normal,
            stack_index: 2,
            is_top: true,
            blend: 1.0,
            normal_blend: 1.0,
            previous: &previous,
            composited: &previous,
            below: None,
            above: None,
            input: &input,
            scene: Some(scene),
        })
    }

    #[test]
    fn test_follows_focus_object() {
        let mut camera = FollowCamera::new();
        camera.start(&CameraStartInfo::new().with_focus(ObjectId(1)));
        let location = update(&mut camera, &OneObject(Vec3::new(10.0, 0.0, 0.0)));
        assert!((location.position() - Vec3::new(10.0, 3.0, 8.0)).length() < 1e-4);
        assert_eq!(location.target, Some(Vec3::new(10.0, 1.0, 0.0)));
    }

    #[test]
    fn test_distance_weight_remaps_anchor_distance() {
        let mut camera = FollowCamera::by_distance();
        let blend = camera.start(
            &CameraStartInfo::new()
                .with_focus(ObjectId(1))
                .with_locator(Locator::new(Vec3::ZERO, Quat::IDENTITY)),
        );
        assert_eq!(blend, CameraBlendInfo::distance_to_object(1.0));
        assert!(camera.traits().fades_in_by_distance);

        update(&mut camera, &OneObject(Vec3::new(1.0, 0.0, 0.0)));
        assert!((camera.distance_weight() - 1.0).abs() < 1e-6);
        update(&mut camera, &OneObject(Vec3::new(6.0, 0.0, 0.0)));
        assert!((camera.distance_weight() - 0.5).abs() < 1e-5);
        update(&mut camera, &OneObject(Vec3::new(20.0, 0.0, 0.0)));
        assert!(camera.distance_weight().abs() < 1e-6);
    }

    #[test]
    fn test_equivalence_tracks_distance_base() {
        let mut camera = FollowCamera::new();
        let start = CameraStartInfo::new().with_focus(ObjectId(1));
        camera.start(&start);
        assert!(camera.is_equivalent_to(&start));

        let mut base = start.clone();
        base.distance_base = true;
        assert!(!camera.is_equivalent_to(&base));
    }
}
