use glam::{Vec2, Vec3};
use vitrine::config::{AppConfig, PopupContent, TargetKind};
use vitrine::ecs::StageWorld;
use vitrine::input::PointerState;
use vitrine::picking;
use vitrine::popup::{PanelId, PanelPosition, PopupController, PopupPhase, PopupSurface};

#[derive(Debug, Clone, PartialEq)]
enum SurfaceOp {
    Create(PanelId),
    Clear(PanelId),
    Install(PanelId, TargetKind),
    Position(PanelId),
    Measure(PanelId),
    Entrance(PanelId),
}

#[derive(Default)]
struct RecordingSurface {
    ops: Vec<SurfaceOp>,
    created: u64,
}

impl PopupSurface for RecordingSurface {
    fn create_panel(&mut self) -> PanelId {
        let id = self.created;
        self.created += 1;
        self.ops.push(SurfaceOp::Create(id));
        id
    }
    fn clear_content(&mut self, panel: PanelId) {
        self.ops.push(SurfaceOp::Clear(panel));
    }
    fn install_content(&mut self, panel: PanelId, kind: TargetKind, _content: &PopupContent) {
        self.ops.push(SurfaceOp::Install(panel, kind));
    }
    fn set_position(&mut self, panel: PanelId, _position: PanelPosition) {
        self.ops.push(SurfaceOp::Position(panel));
    }
    fn measure(&mut self, panel: PanelId) -> Vec2 {
        self.ops.push(SurfaceOp::Measure(panel));
        Vec2::new(200.0, 120.0)
    }
    fn play_entrance(&mut self, panel: PanelId) {
        self.ops.push(SurfaceOp::Entrance(panel));
    }
}

impl RecordingSurface {
    fn installs(&self) -> Vec<TargetKind> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                SurfaceOp::Install(_, kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    fn count(&self, matcher: impl Fn(&SurfaceOp) -> bool) -> usize {
        self.ops.iter().filter(|op| matcher(op)).count()
    }
}

fn controller() -> PopupController {
    PopupController::from_targets(&AppConfig::default().targets)
}

#[test]
fn first_hit_creates_the_panel_once() {
    let mut surface = RecordingSurface::default();
    let mut popup = controller();
    assert_eq!(popup.phase(), PopupPhase::Hidden);

    popup.on_hit(TargetKind::Chart, None, &mut surface);
    assert_eq!(popup.phase(), PopupPhase::Showing(TargetKind::Chart));
    assert_eq!(surface.created, 1);
    assert_eq!(surface.installs(), vec![TargetKind::Chart]);
}

#[test]
fn switching_targets_reuses_the_same_panel() {
    let mut surface = RecordingSurface::default();
    let mut popup = controller();

    popup.on_hit(TargetKind::Chart, None, &mut surface);
    let panel = popup.panel().expect("panel exists after first show");
    popup.on_hit(TargetKind::Info, Some(Vec2::new(420.0, 260.0)), &mut surface);

    assert_eq!(popup.phase(), PopupPhase::Showing(TargetKind::Info));
    assert_eq!(popup.panel(), Some(panel), "panel identity survives the transition");
    assert_eq!(surface.created, 1, "no second panel is ever created");
    assert_eq!(surface.installs(), vec![TargetKind::Chart, TargetKind::Info]);
    assert_eq!(
        surface.count(|op| matches!(op, SurfaceOp::Clear(_))),
        1,
        "prior content is cleared exactly once per switch"
    );
}

#[test]
fn re_hitting_the_same_target_leaves_content_alone() {
    let mut surface = RecordingSurface::default();
    let mut popup = controller();

    // Chart sits in a fixed corner: a re-hit should not even move it.
    popup.on_hit(TargetKind::Chart, None, &mut surface);
    let installs_before = surface.installs().len();
    let positions_before = surface.count(|op| matches!(op, SurfaceOp::Position(_)));
    popup.on_hit(TargetKind::Chart, None, &mut surface);
    assert_eq!(surface.installs().len(), installs_before, "content untouched on same-target re-hit");
    assert_eq!(
        surface.count(|op| matches!(op, SurfaceOp::Position(_))),
        positions_before,
        "fixed-corner popups do not reposition on re-hit"
    );

    // Info is dynamic: a re-hit refreshes position, still without content churn.
    popup.on_hit(TargetKind::Info, Some(Vec2::new(100.0, 100.0)), &mut surface);
    let installs_before = surface.installs().len();
    let positions_before = surface.count(|op| matches!(op, SurfaceOp::Position(_)));
    popup.on_hit(TargetKind::Info, Some(Vec2::new(140.0, 90.0)), &mut surface);
    assert_eq!(surface.installs().len(), installs_before);
    assert_eq!(
        surface.count(|op| matches!(op, SurfaceOp::Position(_))),
        positions_before + 1,
        "dynamic popups track the pointer on re-hit"
    );
}

#[test]
fn measure_always_precedes_the_entrance_animation() {
    let mut surface = RecordingSurface::default();
    let mut popup = controller();
    popup.on_hit(TargetKind::Socials, None, &mut surface);
    popup.on_hit(TargetKind::Chart, None, &mut surface);

    let mut last_install: Option<usize> = None;
    for (index, op) in surface.ops.iter().enumerate() {
        match op {
            SurfaceOp::Install(..) => last_install = Some(index),
            SurfaceOp::Entrance(_) => {
                let install = last_install.expect("entrance without content install");
                let measured_between = surface.ops[install..index]
                    .iter()
                    .any(|op| matches!(op, SurfaceOp::Measure(_)));
                assert!(measured_between, "layout must be read between install and entrance");
            }
            _ => {}
        }
    }
}

#[test]
fn there_is_no_way_back_to_hidden() {
    let mut surface = RecordingSurface::default();
    let mut popup = controller();
    popup.on_hit(TargetKind::Info, Some(Vec2::new(10.0, 10.0)), &mut surface);
    // Frames with no hit at all: the controller is simply not driven, and
    // the popup stays up.
    popup.refresh_dynamic(None, &mut surface);
    popup.refresh_dynamic(Some(Vec2::new(50.0, 60.0)), &mut surface);
    assert_eq!(popup.phase(), PopupPhase::Showing(TargetKind::Info));
}

#[test]
fn hover_sequence_through_picking_matches_expected_states() {
    // Registry {CONTRACT, CHART, INFO}; the simulated ray hits CHART on
    // frame one and INFO on frame two.
    let mut stage = StageWorld::new();
    let half = Vec3::new(0.7, 0.15, 0.15);
    let color = Vec3::splat(0.5);
    stage.spawn_text_label(TargetKind::Contract, Vec3::new(4.0, 0.0, 0.0), half, color);
    let chart = stage.spawn_text_label(TargetKind::Chart, Vec3::new(0.0, 1.0, -1.5), half, color);
    let info = stage.spawn_text_label(TargetKind::Info, Vec3::new(-2.5, 1.0, 1.5), half, color);
    stage.update(0.0);

    let mut surface = RecordingSurface::default();
    let mut popup = controller();
    let mut phases = vec![popup.phase()];

    for target in [chart, info] {
        let center = stage.world_transform(target).w_axis.truncate();
        let origin = center + Vec3::new(0.0, 0.0, 5.0);
        let dir = (center - origin).normalize();
        let hit = picking::pick_ray(&stage, origin, dir).expect("ray should hit the target");
        popup.on_hit(hit.kind, Some(Vec2::new(300.0, 200.0)), &mut surface);
        phases.push(popup.phase());
    }

    assert_eq!(
        phases,
        vec![
            PopupPhase::Hidden,
            PopupPhase::Showing(TargetKind::Chart),
            PopupPhase::Showing(TargetKind::Info),
        ]
    );
    assert_eq!(surface.installs(), vec![TargetKind::Chart, TargetKind::Info]);
    assert_eq!(surface.created, 1);
}

#[test]
fn unarmed_pointer_never_drives_the_popup() {
    let mut stage = StageWorld::new();
    stage.spawn_text_label(
        TargetKind::Info,
        Vec3::ZERO,
        Vec3::new(2.0, 2.0, 0.5),
        Vec3::splat(0.5),
    );
    stage.update(0.0);

    let mut camera = vitrine::camera3d::Camera3D::new(
        Vec3::new(0.0, 0.0, 5.0),
        Vec3::ZERO,
        45f32.to_radians(),
        0.1,
        100.0,
    );
    camera.set_aspect(winit::dpi::PhysicalSize::new(800, 600));

    let pointer = PointerState { ndc: Vec2::ZERO, armed: false };
    assert!(
        picking::pick(&stage, &camera, &pointer).is_none(),
        "a centered default pointer must not produce a phantom hover"
    );
}
