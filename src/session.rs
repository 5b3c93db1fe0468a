//! The one place cross-cutting session state lives. Asset completions and
//! the frame loop mutate it through setters; nothing shares closures.

use crate::assets::LoadedModel;
use crate::config::TargetKind;
use bevy_ecs::prelude::Entity;
use std::sync::Arc;

#[derive(Default)]
pub struct SessionContext {
    showcase_root: Option<Entity>,
    font: Option<Arc<Vec<u8>>>,
    prop_model: Option<Arc<LoadedModel>>,
    sprite_texture_ready: bool,
    hovered: Option<TargetKind>,
}

impl SessionContext {
    pub fn set_showcase_root(&mut self, root: Entity) {
        self.showcase_root = Some(root);
    }

    pub fn showcase_root(&self) -> Option<Entity> {
        self.showcase_root
    }

    pub fn set_font(&mut self, font: Arc<Vec<u8>>) {
        self.font = Some(font);
    }

    pub fn font_loaded(&self) -> bool {
        self.font.is_some()
    }

    pub fn set_prop_model(&mut self, model: Arc<LoadedModel>) {
        self.prop_model = Some(model);
    }

    pub fn prop_model(&self) -> Option<&Arc<LoadedModel>> {
        self.prop_model.as_ref()
    }

    pub fn mark_sprite_texture_ready(&mut self) {
        self.sprite_texture_ready = true;
    }

    pub fn sprite_texture_ready(&self) -> bool {
        self.sprite_texture_ready
    }

    pub fn set_hovered(&mut self, hovered: Option<TargetKind>) {
        self.hovered = hovered;
    }

    pub fn hovered(&self) -> Option<TargetKind> {
        self.hovered
    }
}
