use super::types::*;
use crate::events::{EventBus, StageEvent};
use bevy_ecs::prelude::*;
use glam::{Mat3, Quat, Vec3};

/// Advances clip mixers. A bound clip owns the node's rotation for as long
/// as the effect lives.
pub fn sys_advance_clips(mut query: Query<(&mut ClipBinding, &mut Transform3D)>, dt: Res<TimeDelta>) {
    for (mut binding, mut transform) in &mut query {
        let duration = binding.clip.duration.max(f32::EPSILON);
        binding.time = (binding.time + dt.0) % duration;
        transform.rotation = binding.clip.sample_rotation(binding.time);
    }
}

pub fn sys_advance_trajectories(
    mut query: Query<(&mut Transform3D, &mut Trajectory)>,
    dt: Res<TimeDelta>,
) {
    for (mut transform, mut trajectory) in &mut query {
        let t = trajectory.tween.advance(dt.0);
        transform.translation = trajectory.from.lerp(trajectory.to, t);
    }
}

/// Sprite growth and fade. Completion is the disposal signal for
/// fade-driven effects; timer-driven effects are untouched here.
pub fn sys_advance_scale_fades(
    mut commands: Commands,
    mut query: Query<(Entity, &mut ScaleFade, &mut Transform3D, &mut Tint, &Effect)>,
    dt: Res<TimeDelta>,
    mut events: ResMut<EventBus>,
) {
    for (entity, mut fade, mut transform, mut tint, effect) in &mut query {
        let t = fade.tween.advance(dt.0);
        let scale = fade.from_scale + (fade.to_scale - fade.from_scale) * t;
        transform.scale = Vec3::splat(scale.max(0.001));
        tint.0.w = 1.0 - t;
        if fade.tween.finished() && effect.disposal == Disposal::FadeCompletion {
            commands.entity(entity).despawn();
            events.push(StageEvent::EffectExpired { kind: effect.kind });
        }
    }
}

pub fn sys_expire_effect_timers(
    mut commands: Commands,
    mut query: Query<(Entity, &mut Effect)>,
    dt: Res<TimeDelta>,
    mut events: ResMut<EventBus>,
) {
    for (entity, mut effect) in &mut query {
        let Disposal::Timer { remaining } = &mut effect.disposal else {
            continue;
        };
        *remaining -= dt.0;
        if *remaining <= 0.0 {
            commands.entity(entity).despawn();
            events.push(StageEvent::EffectExpired { kind: effect.kind });
        }
    }
}

/// Re-orients every target toward the viewpoint: billboards face it
/// outright, modelled labels combine it with their authored-forward
/// correction.
pub fn sys_face_viewpoint(
    pose: Res<ViewpointPose>,
    mut query: Query<(&mut Transform3D, &Facing, &WorldTransform3D)>,
) {
    for (mut transform, facing, world) in &mut query {
        let position = world.0.w_axis.truncate();
        let towards = pose.position - position;
        if towards.length_squared() <= 1e-8 {
            continue;
        }
        let look = look_rotation(towards.normalize());
        transform.rotation = match facing {
            Facing::Billboard => look,
            Facing::Forward { correction } => look * *correction,
        };
    }
}

/// Orientation whose +Z axis points along `forward`, world-Y up.
pub fn look_rotation(forward: Vec3) -> Quat {
    let f = forward.normalize();
    let r = Vec3::Y.cross(f);
    if r.length_squared() <= 1e-8 {
        // Looking straight up or down; any yaw will do.
        return Quat::from_rotation_arc(Vec3::Z, f);
    }
    let r = r.normalize();
    let u = f.cross(r);
    Quat::from_mat3(&Mat3::from_cols(r, u, f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_rotation_points_z_along_forward() {
        for forward in [Vec3::Z, Vec3::X, Vec3::new(0.3, 0.2, -0.9).normalize()] {
            let q = look_rotation(forward);
            let z = q * Vec3::Z;
            assert!((z - forward.normalize()).length() < 1e-5, "forward {forward:?} gave {z:?}");
        }
    }

    #[test]
    fn look_rotation_handles_poles() {
        let q = look_rotation(Vec3::Y);
        let z = q * Vec3::Z;
        assert!((z - Vec3::Y).length() < 1e-5);
    }
}
