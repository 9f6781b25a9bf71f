//! Removal of finished stack nodes
//!
//! Runs once per frame after composition. A node goes once its blend
//! tracker reports it dead: ended and faded out, fully self-faded,
//! superseded and no longer contributing, or left without the focus object
//! it needs. The Bottom node is never removed.

use crate::stack::{CameraStack, HandleList};
use crate::types::CameraRank;

/// Remove every dead node, top to bottom; returns the removed handles
pub(crate) fn reap_nodes(stack: &mut CameraStack) -> HandleList {
    let mut removed = HandleList::new();

    // Walk a copy of the order so removals above do not shift the cursor
    for handle in stack.handles().into_iter().rev() {
        let Some(node) = stack.get(handle) else {
            continue;
        };
        if node.rank == CameraRank::Bottom {
            continue;
        }

        let above = stack
            .above(handle)
            .and_then(|h| stack.get(h))
            .map(|above| above.above_state());
        if !node.blend.is_dead(above) {
            continue;
        }

        if let Some(node) = stack.remove(handle) {
            tracing::debug!(
                camera = %node.camera_id,
                rank = ?node.rank,
                "camera reaped"
            );
            removed.push(handle);
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::{BlendClock, BlendInputs, BlendTracker, CameraBlendInfo};
    use crate::location::CameraLocation;
    use crate::registry::CameraRegistry;
    use crate::stack::{CameraNode, ControllerHandle};
    use crate::start_info::CameraStartInfo;
    use crate::types::CameraId;

    fn push(
        stack: &mut CameraStack,
        registry: &CameraRegistry,
        id: CameraId,
        rank: CameraRank,
    ) -> ControllerHandle {
        let config = registry.get(id).unwrap();
        let node = CameraNode::new(
            config,
            config.create_controller(),
            CameraStartInfo::default(),
            rank,
            BlendTracker::new(CameraBlendInfo::seconds(0.0), 0.0),
            CameraLocation::default(),
        );
        stack.insert(node, None).unwrap()
    }

    fn settle(stack: &mut CameraStack, normals: &[(ControllerHandle, f32)]) {
        for (handle, normal) in normals {
            let node = stack.get_mut(*handle).unwrap();
            node.blend.update(&BlendInputs {
                clock: BlendClock { now: 1.0, dt: 0.1 },
                ..Default::default()
            });
            node.blend.update_normal(*normal, None);
        }
    }

    #[test]
    fn test_superseded_node_is_removed_once() {
        let registry = CameraRegistry::with_builtin_cameras().unwrap();
        let mut stack = CameraStack::new(8);
        let bottom = push(&mut stack, &registry, CameraId::MANUAL_BASE, CameraRank::Bottom);
        let old = push(&mut stack, &registry, CameraId::FIXED, CameraRank::Normal);
        let new = push(&mut stack, &registry, CameraId::FIXED, CameraRank::Normal);

        stack.get_mut(old).unwrap().blend.kill_when_blended_out();
        settle(&mut stack, &[(new, 1.0), (old, 0.0), (bottom, 0.0)]);

        let len = stack.len();
        let removed = reap_nodes(&mut stack);
        assert_eq!(removed.as_slice(), &[old]);
        assert_eq!(stack.len(), len - 1);
        assert!(!stack.contains(old));

        // Nothing else is dead
        assert!(reap_nodes(&mut stack).is_empty());
    }

    #[test]
    fn test_contributing_node_survives_kill() {
        let registry = CameraRegistry::with_builtin_cameras().unwrap();
        let mut stack = CameraStack::new(8);
        push(&mut stack, &registry, CameraId::MANUAL_BASE, CameraRank::Bottom);
        let old = push(&mut stack, &registry, CameraId::FIXED, CameraRank::Normal);
        let new = push(&mut stack, &registry, CameraId::FIXED, CameraRank::Normal);

        stack.get_mut(old).unwrap().blend.kill_when_blended_out();
        settle(&mut stack, &[(new, 0.6), (old, 0.4)]);
        assert!(reap_nodes(&mut stack).is_empty());
    }

    #[test]
    fn test_node_without_focus_is_removed() {
        let registry = CameraRegistry::with_builtin_cameras().unwrap();
        let mut stack = CameraStack::new(8);
        push(&mut stack, &registry, CameraId::MANUAL_BASE, CameraRank::Bottom);
        let follow = push(&mut stack, &registry, CameraId::FOLLOW, CameraRank::Normal);
        settle(&mut stack, &[(follow, 1.0)]);
        assert!(reap_nodes(&mut stack).is_empty());

        stack.get_mut(follow).unwrap().blend.lose_focus();
        assert_eq!(reap_nodes(&mut stack).as_slice(), &[follow]);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_bottom_is_never_reaped() {
        let registry = CameraRegistry::with_builtin_cameras().unwrap();
        let mut stack = CameraStack::new(8);
        let bottom = push(&mut stack, &registry, CameraId::MANUAL_BASE, CameraRank::Bottom);
        stack
            .get_mut(bottom)
            .unwrap()
            .blend
            .end(CameraBlendInfo::seconds(0.0), 0.0);
        assert!(reap_nodes(&mut stack).is_empty());
        assert!(stack.contains(bottom));
    }
}
