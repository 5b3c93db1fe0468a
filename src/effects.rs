//! Transient effect spawning: launch math, batch scheduling and the two
//! disposal strategies (mesh timers, sprite fade-completion).

use crate::assets::AnimClip;
use crate::attachment::{AnchorPose, AttachmentPoint};
use crate::config::{EffectKind, EffectsConfig};
use crate::ecs::{
    ClipBinding, Disposal, Effect, ScaleFade, Shape, SpriteVisual, StageWorld, Tint, Trajectory,
    Transform3D, WorldTransform3D,
};
use crate::events::StageEvent;
use crate::tween::{Easing, Tween};
use bevy_ecs::prelude::Entity;
use glam::{EulerRot, Quat, Vec3, Vec4};
use rand::Rng;
use std::sync::Arc;

const MESH_TINT: Vec4 = Vec4::new(0.96, 0.78, 0.22, 1.0);

/// Chooses an effect kind per spawn call.
#[derive(Debug, Clone, Copy)]
pub enum KindSelector {
    Fixed(EffectKind),
    /// `sprite_weight` chance of a sprite, otherwise a mesh.
    Weighted { sprite_weight: f32 },
}

impl KindSelector {
    fn choose(self, rng: &mut impl Rng) -> EffectKind {
        match self {
            KindSelector::Fixed(kind) => kind,
            KindSelector::Weighted { sprite_weight } => {
                if rng.gen::<f32>() < sprite_weight {
                    EffectKind::Sprite
                } else {
                    EffectKind::Mesh
                }
            }
        }
    }
}

struct PendingSpawn {
    countdown: f32,
    selector: KindSelector,
}

pub struct EffectSpawner {
    anchor: AttachmentPoint,
    tuning: EffectsConfig,
    pending: Vec<PendingSpawn>,
    prop_clip: Option<Arc<AnimClip>>,
}

impl EffectSpawner {
    pub fn new(tuning: &EffectsConfig) -> Self {
        let [rx, ry, rz] = tuning.fallback_orientation_degrees;
        let fallback = AnchorPose {
            position: Vec3::from(tuning.fallback_position),
            orientation: Quat::from_euler(
                EulerRot::YXZ,
                ry.to_radians(),
                rx.to_radians(),
                rz.to_radians(),
            ),
        };
        Self {
            anchor: AttachmentPoint::new(Vec3::from(tuning.anchor_offset), fallback),
            tuning: tuning.clone(),
            pending: Vec::new(),
            prop_clip: None,
        }
    }

    pub fn set_owner(&mut self, owner: Entity) {
        self.anchor.set_owner(owner);
    }

    pub fn set_prop_clip(&mut self, clip: Arc<AnimClip>) {
        self.prop_clip = Some(clip);
    }

    pub fn anchor(&self) -> &AttachmentPoint {
        &self.anchor
    }

    pub fn pending_spawns(&self) -> usize {
        self.pending.len()
    }

    /// Schedules `count` independent spawns spaced `delay` seconds apart,
    /// the first firing on the next tick. Batches always run to
    /// completion; a later batch never cancels an earlier one.
    pub fn queue_batch(&mut self, selector: KindSelector, count: u32, delay: f32) {
        for i in 0..count {
            self.pending.push(PendingSpawn { countdown: i as f32 * delay, selector });
        }
    }

    /// Fires scheduled spawns whose delay has elapsed.
    pub fn tick(&mut self, stage: &mut StageWorld, dt: f32) {
        if self.pending.is_empty() {
            return;
        }
        let mut due = Vec::new();
        self.pending.retain_mut(|spawn| {
            spawn.countdown -= dt;
            if spawn.countdown <= 0.0 {
                due.push(spawn.selector);
                false
            } else {
                true
            }
        });
        let mut rng = rand::thread_rng();
        for selector in due {
            let kind = selector.choose(&mut rng);
            self.spawn_with_rng(stage, kind, &mut rng);
        }
    }

    pub fn spawn(&mut self, stage: &mut StageWorld, kind: EffectKind) -> Option<Entity> {
        let mut rng = rand::thread_rng();
        self.spawn_with_rng(stage, kind, &mut rng)
    }

    fn spawn_with_rng(
        &mut self,
        stage: &mut StageWorld,
        kind: EffectKind,
        rng: &mut impl Rng,
    ) -> Option<Entity> {
        let caps = stage.effect_caps();
        if stage.live_effects() >= caps.max_live {
            stage.push_event(StageEvent::EffectDropped { kind });
            return None;
        }

        let pose = self.anchor.resolve(stage);
        let target = self.launch_target(&pose, rng);

        let tuning = &self.tuning;
        let trajectory = Trajectory {
            from: pose.position,
            to: target,
            tween: Tween::new(tuning.duration, Easing::EaseOutCubic),
        };

        let entity = match kind {
            EffectKind::Mesh => {
                let rotation = Quat::from_euler(
                    EulerRot::XYZ,
                    rng.gen_range(0.0..std::f32::consts::TAU),
                    rng.gen_range(0.0..std::f32::consts::TAU),
                    rng.gen_range(0.0..std::f32::consts::TAU),
                );
                let mut entity = stage.world.spawn((
                    Transform3D {
                        translation: pose.position,
                        rotation,
                        scale: Vec3::splat(tuning.mesh_scale),
                    },
                    WorldTransform3D::default(),
                    Shape::Cube,
                    Tint(MESH_TINT),
                    Effect {
                        kind,
                        disposal: Disposal::Timer { remaining: tuning.duration + tuning.guard },
                    },
                    trajectory,
                ));
                if let Some(clip) = &self.prop_clip {
                    entity.insert(ClipBinding { clip: Arc::clone(clip), time: 0.0 });
                }
                entity.id()
            }
            EffectKind::Sprite => stage
                .world
                .spawn((
                    Transform3D {
                        translation: pose.position,
                        rotation: Quat::IDENTITY,
                        scale: Vec3::splat(tuning.sprite_scale),
                    },
                    WorldTransform3D::default(),
                    Shape::Quad,
                    SpriteVisual,
                    Tint(Vec4::ONE),
                    Effect { kind, disposal: Disposal::FadeCompletion },
                    trajectory,
                    ScaleFade {
                        from_scale: tuning.sprite_scale,
                        to_scale: tuning.sprite_scale * tuning.sprite_end_scale,
                        tween: Tween::new(tuning.fade_duration, Easing::EaseOutQuad),
                    },
                ))
                .id(),
        };

        stage.push_event(StageEvent::EffectSpawned { kind });
        Some(entity)
    }

    /// Launch target: the configured base direction carried into world
    /// space by the anchor orientation, two axes jittered and the result
    /// renormalized, scaled by a randomized travel distance.
    fn launch_target(&self, pose: &AnchorPose, rng: &mut impl Rng) -> Vec3 {
        let tuning = &self.tuning;
        let base = Vec3::from(tuning.base_direction).normalize_or_zero();
        let mut dir = pose.orientation * base;
        let jitter = tuning.jitter.max(0.0);
        if jitter > 0.0 {
            dir.x += rng.gen_range(-jitter..=jitter);
            dir.z += rng.gen_range(-jitter..=jitter);
        }
        let dir = dir.normalize_or_zero();
        let distance = tuning.base_distance + rng.gen_range(0.0..=tuning.extra_distance.max(0.0));
        pose.position + dir * distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn fixed_selector_always_returns_its_kind() {
        let mut rng = StepRng::new(0, 1);
        for _ in 0..8 {
            assert_eq!(KindSelector::Fixed(EffectKind::Sprite).choose(&mut rng), EffectKind::Sprite);
        }
    }

    #[test]
    fn weight_extremes_are_deterministic() {
        let mut rng = rand::thread_rng();
        for _ in 0..32 {
            assert_eq!(
                KindSelector::Weighted { sprite_weight: 0.0 }.choose(&mut rng),
                EffectKind::Mesh
            );
            assert_eq!(
                KindSelector::Weighted { sprite_weight: 1.0 }.choose(&mut rng),
                EffectKind::Sprite
            );
        }
    }

    #[test]
    fn launch_target_stays_within_distance_bounds() {
        let tuning = EffectsConfig::default();
        let spawner = EffectSpawner::new(&tuning);
        let pose = spawner.anchor().fallback();
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let target = spawner.launch_target(&pose, &mut rng);
            let travelled = (target - pose.position).length();
            assert!(
                travelled >= tuning.base_distance - 1e-3
                    && travelled <= tuning.base_distance + tuning.extra_distance + 1e-3,
                "travel distance {travelled} outside configured bounds"
            );
        }
    }
}
