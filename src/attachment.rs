//! World-space anchor resolution on an owner that may still be loading.

use crate::ecs::{StageWorld, Transform3D, WorldTransform3D};
use bevy_ecs::prelude::Entity;
use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorPose {
    pub position: Vec3,
    pub orientation: Quat,
}

/// A named launch anchor relative to an asynchronously loaded owner.
///
/// Resolution never fails: an unresolved owner yields the configured
/// fallback pose, and once the owner exists a child anchor node is
/// synthesized at the local offset (at most once) and re-read on every
/// call so it tracks the owner's motion.
pub struct AttachmentPoint {
    owner: Option<Entity>,
    anchor: Option<Entity>,
    local_offset: Vec3,
    fallback: AnchorPose,
}

impl AttachmentPoint {
    pub fn new(local_offset: Vec3, fallback: AnchorPose) -> Self {
        Self { owner: None, anchor: None, local_offset, fallback }
    }

    pub fn set_owner(&mut self, owner: Entity) {
        if self.owner != Some(owner) {
            self.owner = Some(owner);
            self.anchor = None;
        }
    }

    pub fn owner(&self) -> Option<Entity> {
        self.owner
    }

    pub fn anchor(&self) -> Option<Entity> {
        self.anchor
    }

    pub fn fallback(&self) -> AnchorPose {
        self.fallback
    }

    pub fn resolve(&mut self, stage: &mut StageWorld) -> AnchorPose {
        let Some(owner) = self.owner else {
            return self.fallback;
        };
        if !stage.entity_exists(owner) {
            return self.fallback;
        }
        let anchor = match self.anchor {
            Some(anchor) if stage.entity_exists(anchor) => anchor,
            _ => {
                let anchor = stage
                    .world
                    .spawn((
                        Transform3D::from_translation(self.local_offset),
                        WorldTransform3D::default(),
                    ))
                    .id();
                stage.attach_child(owner, anchor);
                self.anchor = Some(anchor);
                anchor
            }
        };
        let world = stage.world_transform(anchor);
        let (_, orientation, position) = world.to_scale_rotation_translation();
        AnchorPose { position, orientation }
    }
}
