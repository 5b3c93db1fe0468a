use super::systems::{
    sys_advance_clips, sys_advance_scale_fades, sys_advance_trajectories, sys_expire_effect_timers,
    sys_face_viewpoint,
};
use super::transform::sys_propagate_transforms;
use super::types::*;
use crate::assets::LoadedModel;
use crate::config::TargetKind;
use crate::events::{EventBus, StageEvent};
use bevy_ecs::prelude::{Entity, Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;
use glam::{Mat4, Quat, Vec3, Vec4};

/// The scene world plus its per-frame schedule. The chained system order
/// is the frame contract: clip mixers, then tweens and disposals, then
/// target orientation, then world-transform propagation. Everything the
/// picker and renderer read afterwards is settled for the frame.
pub struct StageWorld {
    pub world: World,
    schedule: Schedule,
}

impl Default for StageWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl StageWorld {
    pub fn new() -> Self {
        let mut world = World::new();
        world.insert_resource(TimeDelta(0.0));
        world.insert_resource(ViewpointPose::default());
        world.insert_resource(TargetRegistry::default());
        world.insert_resource(EffectCaps::default());
        world.insert_resource(EventBus::default());

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                sys_advance_clips,
                sys_advance_trajectories,
                sys_advance_scale_fades,
                sys_expire_effect_timers,
                sys_face_viewpoint,
                sys_propagate_transforms,
            )
                .chain(),
        );

        Self { world, schedule }
    }

    pub fn update(&mut self, dt: f32) {
        self.world.resource_mut::<TimeDelta>().0 = dt;
        self.schedule.run(&mut self.world);
    }

    pub fn set_viewpoint(&mut self, position: Vec3, orientation: Quat) {
        *self.world.resource_mut::<ViewpointPose>() = ViewpointPose { position, orientation };
    }

    pub fn set_effect_caps(&mut self, caps: EffectCaps) {
        *self.world.resource_mut::<EffectCaps>() = caps;
    }

    pub fn effect_caps(&self) -> EffectCaps {
        *self.world.resource::<EffectCaps>()
    }

    pub fn push_event(&mut self, event: StageEvent) {
        self.world.resource_mut::<EventBus>().push(event);
    }

    pub fn drain_events(&mut self) -> Vec<StageEvent> {
        self.world.resource_mut::<EventBus>().drain()
    }

    pub fn entity_exists(&self, entity: Entity) -> bool {
        self.world.get_entity(entity).is_ok()
    }

    pub fn registry(&self) -> &TargetRegistry {
        self.world.resource::<TargetRegistry>()
    }

    pub fn target_root(&self, kind: TargetKind) -> Option<Entity> {
        self.registry().root_of(kind)
    }

    pub fn live_effects(&mut self) -> u32 {
        let mut query = self.world.query::<&Effect>();
        query.iter(&self.world).count() as u32
    }

    /// Parents `child` under `parent`. Only ever called on freshly spawned
    /// entities; the hierarchy never re-parents.
    pub fn attach_child(&mut self, parent: Entity, child: Entity) {
        self.world.entity_mut(child).insert(Parent(parent));
        if let Some(mut children) = self.world.get_mut::<Children>(parent) {
            children.0.push(child);
        } else {
            self.world.entity_mut(parent).insert(Children(vec![child]));
        }
    }

    /// Composes the entity's world transform from its parent chain,
    /// independent of the cached per-frame propagation.
    pub fn world_transform(&self, entity: Entity) -> Mat4 {
        let mut matrix = self
            .world
            .get::<Transform3D>(entity)
            .map(|t| t.matrix())
            .unwrap_or(Mat4::IDENTITY);
        let mut current = entity;
        while let Some(parent) = self.world.get::<Parent>(current) {
            let parent = parent.0;
            if let Some(t) = self.world.get::<Transform3D>(parent) {
                matrix = t.matrix() * matrix;
            }
            current = parent;
        }
        matrix
    }

    /// Spawns a billboarded text title and registers it as a target.
    pub fn spawn_text_label(
        &mut self,
        kind: TargetKind,
        position: Vec3,
        hit_half: Vec3,
        color: Vec3,
    ) -> Entity {
        // The quad is scaled to the title's world footprint, so the local
        // hit box is the unit quad with the configured depth.
        let entity = self
            .world
            .spawn((
                Transform3D {
                    translation: position,
                    rotation: Quat::IDENTITY,
                    scale: Vec3::new(hit_half.x * 2.0, hit_half.y * 2.0, 1.0),
                },
                WorldTransform3D::default(),
                Label { kind },
                HitShape::Box { half: Vec3::new(0.5, 0.5, hit_half.z) },
                Facing::Billboard,
                Shape::Quad,
                Tint(color.extend(1.0)),
            ))
            .id();
        self.register_target(kind, entity);
        entity
    }

    /// Spawns a modelled label (sign), registering the container root;
    /// hit geometry comes from the model's mesh bounds.
    pub fn spawn_model_label(
        &mut self,
        kind: TargetKind,
        position: Vec3,
        model: &LoadedModel,
        correction: Quat,
        color: Vec3,
    ) -> Entity {
        let root = self
            .world
            .spawn((
                Transform3D::from_translation(position),
                WorldTransform3D::default(),
                Label { kind },
                Facing::Forward { correction },
                Children::default(),
            ))
            .id();
        self.instantiate_model(model, root, color.extend(1.0));
        self.register_target(kind, root);
        root
    }

    /// Spawns the centerpiece model scaled to `fit_size`, centered on the
    /// origin and dropped by `floor_drop`.
    pub fn spawn_showcase(&mut self, model: &LoadedModel, fit_size: f32, floor_drop: f32) -> Entity {
        let (scale, center) = match model.bounds {
            Some((min, max)) => {
                let extent = (max - min).max_element().max(f32::EPSILON);
                (fit_size / extent, (min + max) * 0.5)
            }
            None => (1.0, Vec3::ZERO),
        };
        let translation = -center * scale - Vec3::new(0.0, floor_drop, 0.0);
        let root = self
            .world
            .spawn((
                Transform3D { translation, rotation: Quat::IDENTITY, scale: Vec3::splat(scale) },
                WorldTransform3D::default(),
                Children::default(),
            ))
            .id();
        self.instantiate_model(model, root, Vec4::new(0.72, 0.72, 0.78, 1.0));
        root
    }

    fn instantiate_model(&mut self, model: &LoadedModel, root: Entity, tint: Vec4) {
        let mut spawned = Vec::with_capacity(model.nodes.len());
        for template in &model.nodes {
            let mut entity = self.world.spawn((
                Transform3D {
                    translation: template.translation,
                    rotation: template.rotation,
                    scale: template.scale,
                },
                WorldTransform3D::default(),
            ));
            if let Some((min, max)) = template.bounds {
                entity.insert((HitShape::Bounds { min, max }, Shape::Cube, Tint(tint)));
            }
            spawned.push(entity.id());
        }
        for (index, template) in model.nodes.iter().enumerate() {
            let parent = match template.parent {
                Some(parent_index) => spawned[parent_index],
                None => root,
            };
            self.attach_child(parent, spawned[index]);
        }
    }

    fn register_target(&mut self, kind: TargetKind, root: Entity) {
        self.world.resource_mut::<TargetRegistry>().register(kind, root);
        self.push_event(StageEvent::TargetRegistered { kind });
    }
}
