use glam::{Quat, Vec2, Vec3};
use vitrine::assets::{LoadedModel, NodeTemplate};
use vitrine::camera3d::Camera3D;
use vitrine::config::TargetKind;
use vitrine::ecs::StageWorld;
use vitrine::input::PointerState;
use vitrine::picking;
use winit::dpi::PhysicalSize;

fn test_camera() -> Camera3D {
    let mut camera =
        Camera3D::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 45f32.to_radians(), 0.1, 100.0);
    camera.set_aspect(PhysicalSize::new(800, 600));
    camera
}

fn armed_center() -> PointerState {
    PointerState { ndc: Vec2::ZERO, armed: true }
}

#[test]
fn empty_registry_is_a_miss_not_an_error() {
    let stage = StageWorld::new();
    let camera = test_camera();
    assert!(picking::pick(&stage, &camera, &armed_center()).is_none());
}

#[test]
fn armed_pointer_hits_a_label_on_the_ray() {
    let mut stage = StageWorld::new();
    stage.spawn_text_label(
        TargetKind::Chart,
        Vec3::ZERO,
        Vec3::new(0.7, 0.15, 0.15),
        Vec3::splat(0.5),
    );
    stage.update(0.0);

    let camera = test_camera();
    let hit = picking::pick(&stage, &camera, &armed_center()).expect("label should be hit");
    assert_eq!(hit.kind, TargetKind::Chart);
    assert!(hit.distance > 0.0 && hit.distance < 5.0);
}

#[test]
fn unarmed_pointer_is_never_consulted() {
    let mut stage = StageWorld::new();
    stage.spawn_text_label(
        TargetKind::Chart,
        Vec3::ZERO,
        Vec3::new(2.0, 2.0, 0.5),
        Vec3::splat(0.5),
    );
    stage.update(0.0);

    let camera = test_camera();
    for ndc in [Vec2::ZERO, Vec2::new(0.3, -0.2), Vec2::new(-1.0, 1.0)] {
        let pointer = PointerState { ndc, armed: false };
        assert!(picking::pick(&stage, &camera, &pointer).is_none());
    }
}

#[test]
fn nearest_target_wins_when_two_share_the_ray() {
    let mut stage = StageWorld::new();
    let half = Vec3::new(0.5, 0.5, 0.1);
    stage.spawn_text_label(TargetKind::Chart, Vec3::new(0.0, 0.0, -2.0), half, Vec3::splat(0.5));
    stage.spawn_text_label(TargetKind::Info, Vec3::ZERO, half, Vec3::splat(0.5));
    stage.update(0.0);

    let camera = test_camera();
    let hit = picking::pick(&stage, &camera, &armed_center()).expect("hit");
    assert_eq!(hit.kind, TargetKind::Info, "the closer label along the ray is reported");
}

#[test]
fn descendant_hits_climb_to_the_owning_container() {
    let mut stage = StageWorld::new();
    // A modelled sign whose only hit geometry sits on a child mesh node.
    let model = LoadedModel {
        nodes: vec![
            NodeTemplate {
                name: Some("sign_root".to_string()),
                parent: None,
                translation: Vec3::ZERO,
                rotation: Quat::IDENTITY,
                scale: Vec3::ONE,
                bounds: None,
            },
            NodeTemplate {
                name: Some("sign_panel".to_string()),
                parent: Some(0),
                translation: Vec3::new(0.0, 0.2, 0.0),
                rotation: Quat::IDENTITY,
                scale: Vec3::ONE,
                bounds: Some((Vec3::splat(-0.4), Vec3::splat(0.4))),
            },
        ],
        clips: Vec::new(),
        bounds: Some((Vec3::splat(-0.4), Vec3::splat(0.4))),
    };
    let root = stage.spawn_model_label(
        TargetKind::Contract,
        Vec3::new(0.0, -0.2, 0.0),
        &model,
        Quat::IDENTITY,
        Vec3::splat(0.5),
    );
    stage.update(0.0);

    let camera = test_camera();
    let hit = picking::pick(&stage, &camera, &armed_center()).expect("child mesh should be hit");
    assert_eq!(hit.kind, TargetKind::Contract);
    assert_eq!(hit.root, root, "the registered container is reported, never the mesh node");
}

#[test]
fn registry_filled_incrementally_extends_pickable_set() {
    let mut stage = StageWorld::new();
    let camera = test_camera();
    assert!(picking::pick(&stage, &camera, &armed_center()).is_none());

    stage.spawn_text_label(
        TargetKind::Info,
        Vec3::ZERO,
        Vec3::new(0.7, 0.2, 0.1),
        Vec3::splat(0.5),
    );
    stage.update(0.0);
    assert!(picking::pick(&stage, &camera, &armed_center()).is_some());
    assert_eq!(stage.registry().len(), 1);
}
