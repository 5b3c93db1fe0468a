use super::{Children, Parent, Transform3D, WorldTransform3D};
use bevy_ecs::prelude::*;
use glam::Mat4;
use smallvec::SmallVec;

/// Depth-first world-transform propagation over the scene forest.
/// The hierarchy is built append-only (`attach_child` never re-parents),
/// so every node is reachable from exactly one root.
pub fn sys_propagate_transforms(
    mut nodes: Query<(&Transform3D, Option<&Children>, &mut WorldTransform3D)>,
    roots: Query<Entity, (With<WorldTransform3D>, Without<Parent>)>,
) {
    let mut stack: SmallVec<[(Entity, Mat4); 64]> = SmallVec::new();
    for root in roots.iter() {
        let Ok((local, children, mut world)) = nodes.get_mut(root) else {
            continue;
        };
        let world_mat = local.matrix();
        world.0 = world_mat;
        if let Some(children) = children {
            for &child in children.0.iter().rev() {
                stack.push((child, world_mat));
            }
        }
        while let Some((entity, parent_world)) = stack.pop() {
            let Ok((local, children, mut world)) = nodes.get_mut(entity) else {
                continue;
            };
            let world_mat = parent_world * local.matrix();
            world.0 = world_mat;
            if let Some(children) = children {
                for &child in children.0.iter().rev() {
                    stack.push((child, world_mat));
                }
            }
        }
    }
}
