use crate::assets::AnimClip;
use crate::config::{EffectKind, TargetKind};
use crate::tween::Tween;
use bevy_ecs::prelude::*;
use glam::{Mat4, Quat, Vec3, Vec4};
use std::sync::Arc;

#[derive(Component, Clone, Copy)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}
impl Default for Transform3D {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}
impl Transform3D {
    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Self::default() }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Component, Clone, Copy, Default)]
pub struct WorldTransform3D(pub Mat4);

#[derive(Component, Clone, Copy)]
pub struct Parent(pub Entity);

#[derive(Component, Default)]
pub struct Children(pub Vec<Entity>);

/// Marks the registered container of an interactive target. Picking always
/// reports this entity, never a bare descendant.
#[derive(Component, Clone, Copy)]
pub struct Label {
    pub kind: TargetKind,
}

/// Geometry a pick ray is tested against, in the entity's local space.
#[derive(Component, Clone, Copy)]
pub enum HitShape {
    /// Explicit box centered on the node.
    Box { half: Vec3 },
    /// Bounds captured from a loaded mesh.
    Bounds { min: Vec3, max: Vec3 },
}

impl HitShape {
    pub fn local_aabb(&self) -> (Vec3, Vec3) {
        match *self {
            HitShape::Box { half } => (-half, half),
            HitShape::Bounds { min, max } => (min, max),
        }
    }
}

/// How a target re-orients toward the viewpoint each frame.
#[derive(Component, Clone, Copy)]
pub enum Facing {
    /// Face the viewpoint directly (text titles).
    Billboard,
    /// Face the viewpoint combined with a fixed correction for the
    /// asset's authored forward axis (modelled signs).
    Forward { correction: Quat },
}

#[derive(Component, Clone, Copy)]
pub struct Tint(pub Vec4);

/// Which unit geometry the instanced pass draws for this entity.
#[derive(Component, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Cube,
    Quad,
}

/// Marks quads sampled from the sprite texture rather than flat-tinted.
#[derive(Component, Clone, Copy, Default)]
pub struct SpriteVisual;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Disposal {
    /// Removed by countdown, set slightly past the trajectory so the
    /// despawn never lands mid-transition.
    Timer { remaining: f32 },
    /// Removed when the scale/fade tween reports completion.
    FadeCompletion,
}

#[derive(Component, Clone, Copy)]
pub struct Effect {
    pub kind: EffectKind,
    pub disposal: Disposal,
}

/// Position tween from spawn point to launch target.
#[derive(Component, Clone, Copy)]
pub struct Trajectory {
    pub from: Vec3,
    pub to: Vec3,
    pub tween: Tween,
}

/// Sprite growth + fade-out; alpha follows `1 - progress`.
#[derive(Component, Clone, Copy)]
pub struct ScaleFade {
    pub from_scale: f32,
    pub to_scale: f32,
    pub tween: Tween,
}

/// Binds an animation clip to its owning effect; despawned with it.
#[derive(Component, Clone)]
pub struct ClipBinding {
    pub clip: Arc<AnimClip>,
    pub time: f32,
}

// ---------- Resources ----------

#[derive(Resource, Clone, Copy, Default)]
pub struct TimeDelta(pub f32);

/// Camera pose sampled once per frame for billboarding.
#[derive(Resource, Clone, Copy)]
pub struct ViewpointPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for ViewpointPose {
    fn default() -> Self {
        Self { position: Vec3::new(0.0, 0.0, 5.0), orientation: Quat::IDENTITY }
    }
}

#[derive(Clone, Copy)]
pub struct TargetEntry {
    pub kind: TargetKind,
    pub root: Entity,
}

/// Append-only roster of interactive targets, filled in as asset loads
/// complete. Entries are never removed during a session.
#[derive(Resource, Default)]
pub struct TargetRegistry {
    entries: Vec<TargetEntry>,
}

impl TargetRegistry {
    pub fn register(&mut self, kind: TargetKind, root: Entity) {
        self.entries.push(TargetEntry { kind, root });
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetEntry> {
        self.entries.iter()
    }

    pub fn snapshot(&self) -> Vec<TargetEntry> {
        self.entries.clone()
    }

    pub fn root_of(&self, kind: TargetKind) -> Option<Entity> {
        self.entries.iter().find(|e| e.kind == kind).map(|e| e.root)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Resource, Clone, Copy)]
pub struct EffectCaps {
    pub max_live: u32,
}

impl Default for EffectCaps {
    fn default() -> Self {
        Self { max_live: 64 }
    }
}
