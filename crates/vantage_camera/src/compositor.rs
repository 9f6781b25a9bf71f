//! Blend compositor
//!
//! Folds the stack into one pose, top to bottom. Each layer is blended with
//! the composite of everything beneath it, weighted by `1 - blend`.
//!
//! When a layer wants a cross-fade the fold runs twice. The *after* pass stops
//! at the cross-fade layer, and the *before* pass starts just beneath it.
//! Renderers dissolve between the two images using the cross-fade layer's
//! blend.

use crate::error::{CameraError, Result};
use crate::location::CameraLocation;
use crate::types::CameraId;

/// One stack node as seen by the compositor
#[derive(Clone, Copy, Debug)]
pub struct CompositeLayer {
    pub camera_id: CameraId,
    pub location: CameraLocation,
    /// Blend-in progress of this layer, 1 = fully covering the layers below
    pub blend: f32,
    /// Set when this layer hands off with the layer directly below by distance;
    /// the pair then blends against the rest with the lower layer's blend
    pub distance_weight: Option<f32>,
    /// `Some(side_first)` to blend around a pivot against the layer below
    pub circular: Option<bool>,
    pub cross_fade: bool,
}

impl CompositeLayer {
    pub fn new(camera_id: CameraId, location: CameraLocation, blend: f32) -> Self {
        Self {
            camera_id,
            location,
            blend,
            distance_weight: None,
            circular: None,
            cross_fade: false,
        }
    }
}

/// Result of compositing a stack
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Composite {
    /// Final pose, including the cross-fade layer and everything above it
    pub after: CameraLocation,
    /// Pose beneath the cross-fade layer, when one exists
    pub before: Option<CameraLocation>,
    /// Dissolve factor from `before` to `after`; 0 without a cross-fade
    pub cross_fade: f32,
}

/// Composite `layers`, given bottom to top
pub fn composite(layers: &[CompositeLayer]) -> Result<Composite> {
    if layers.is_empty() {
        return Err(CameraError::EmptyStack);
    }

    let mut cross_fades = layers.iter().rev().filter(|layer| layer.cross_fade);
    let cross_fade_layer = cross_fades.next();
    if let (Some(first), Some(second)) = (cross_fade_layer, cross_fades.next()) {
        return Err(CameraError::MultipleCrossFades {
            first: first.camera_id,
            second: second.camera_id,
        });
    }

    let after = fold(layers);
    let (before, cross_fade) = match layers.iter().rposition(|layer| layer.cross_fade) {
        Some(index) => {
            let before = if index == 0 { after } else { fold(&layers[..index]) };
            (Some(before), layers[index].blend.clamp(0.0, 1.0))
        }
        None => (None, 0.0),
    };

    Ok(Composite {
        after,
        before,
        cross_fade,
    })
}

/// Fold bottom-to-top `layers` into one pose; a cross-fade layer terminates
fn fold(layers: &[CompositeLayer]) -> CameraLocation {
    let Some((top, mut rest)) = layers.split_last() else {
        return CameraLocation::default();
    };
    if rest.is_empty() || top.cross_fade {
        return top.location;
    }

    let mut location = top.location;
    let mut blend = top.blend;
    if let Some(weight) = top.distance_weight {
        // The pair owns the base's slot; the top fades in over the base by time and distance
        if let Some((base, below_base)) = rest.split_last() {
            let weight = (weight * top.blend).clamp(0.0, 1.0);
            location = base.location.lerp(&location, weight);
            blend = base.blend;
            rest = below_base;
        }
        if rest.is_empty() {
            return location;
        }
    }

    let below = fold(rest);
    let weight_below = (1.0 - blend).clamp(0.0, 1.0);
    match top.circular {
        Some(side_first) => location.lerp_circular(&below, weight_below, side_first),
        None => location.lerp(&below, weight_below),
    }
}
