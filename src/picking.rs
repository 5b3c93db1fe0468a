//! Pointer-to-scene ray picking against the target registry.

use crate::camera3d::Camera3D;
use crate::config::TargetKind;
use crate::ecs::{Children, HitShape, StageWorld, TargetEntry, WorldTransform3D};
use crate::input::PointerState;
use bevy_ecs::prelude::Entity;
use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy)]
pub struct PickHit {
    pub kind: TargetKind,
    pub root: Entity,
    pub distance: f32,
}

/// Continuous hover pick. Returns `None` while the pointer is unarmed,
/// when the registry is empty, or when nothing intersects; a miss is
/// never an error. Exactly equal distances resolve by registry order.
pub fn pick(stage: &StageWorld, camera: &Camera3D, pointer: &PointerState) -> Option<PickHit> {
    if !pointer.armed {
        return None;
    }
    let (origin, dir) = camera.ndc_ray(pointer.ndc)?;
    pick_ray(stage, origin, dir)
}

/// Ray pick used both by the per-frame hover path and the discrete
/// touch-tap path. Tests every registered target recursively over its
/// descendants and reports the owning container of the nearest hit.
pub fn pick_ray(stage: &StageWorld, origin: Vec3, dir: Vec3) -> Option<PickHit> {
    let entries: Vec<TargetEntry> = stage.registry().snapshot();
    let mut best: Option<PickHit> = None;
    for entry in entries {
        if let Some(distance) = hit_target(stage, entry.root, origin, dir) {
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(PickHit { kind: entry.kind, root: entry.root, distance });
            }
        }
    }
    best
}

/// Nearest intersection distance over the target's subtree, or `None`.
fn hit_target(stage: &StageWorld, root: Entity, origin: Vec3, dir: Vec3) -> Option<f32> {
    let mut nearest: Option<f32> = None;
    let mut stack = vec![root];
    while let Some(entity) = stack.pop() {
        if let (Some(shape), Some(world)) = (
            stage.world.get::<HitShape>(entity),
            stage.world.get::<WorldTransform3D>(entity),
        ) {
            if let Some(distance) = ray_hit_shape(origin, dir, &world.0, shape) {
                if nearest.map_or(true, |n| distance < n) {
                    nearest = Some(distance);
                }
            }
        }
        if let Some(children) = stage.world.get::<Children>(entity) {
            stack.extend(children.0.iter().copied());
        }
    }
    nearest
}

/// Ray-vs-oriented-box: the ray is carried into the shape's local space
/// through the inverse world matrix, then tested against the local AABB;
/// the returned distance is measured in world space.
pub fn ray_hit_shape(origin: Vec3, dir: Vec3, world: &Mat4, shape: &HitShape) -> Option<f32> {
    let inv = world.inverse();
    if !inv.to_cols_array().iter().all(|v| v.is_finite()) {
        return None;
    }
    let origin_local = inv.transform_point3(origin);
    let dir_local = inv.transform_vector3(dir);
    if dir_local.length_squared() <= f32::EPSILON {
        return None;
    }
    let dir_local = dir_local.normalize();
    let (min, max) = shape.local_aabb();
    let (_, hit_local) = ray_aabb_intersection(origin_local, dir_local, min, max)?;
    let hit_world = world.transform_point3(hit_local);
    Some((hit_world - origin).length())
}

pub fn ray_aabb_intersection(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let mut t_min: f32 = 0.0;
    let mut t_max: f32 = f32::INFINITY;
    for i in 0..3 {
        let o = origin[i];
        let d = dir[i];
        if d.abs() < 1e-6 {
            if o < min[i] || o > max[i] {
                return None;
            }
        } else {
            let inv_d = 1.0 / d;
            let mut t1 = (min[i] - o) * inv_d;
            let mut t2 = (max[i] - o) * inv_d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
    }
    if t_max < 0.0 {
        return None;
    }
    let t_hit = if t_min >= 0.0 { t_min } else { t_max };
    Some((t_hit, origin + dir * t_hit))
}
