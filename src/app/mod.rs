use crate::assets::{AssetEvent, AssetServer, ModelSlot};
use crate::camera3d::{Camera3D, OrbitController};
use crate::cli::CliOverrides;
use crate::config::{AppConfig, LabelSource, TargetKind};
use crate::ecs::{EffectCaps, Shape, SpriteVisual, StageWorld, Tint, WorldTransform3D};
use crate::effects::{EffectSpawner, KindSelector};
use crate::events::StageEvent;
use crate::input::{PointerEvent, PointerTracker};
use crate::picking::{self, PickHit};
use crate::popup::PopupController;
use crate::renderer::{InstanceData, Renderer};
use crate::session::SessionContext;
use crate::time::Time;

mod popup_panel;
pub use popup_panel::PopupPanel;

use anyhow::{Context, Result};
use bevy_ecs::prelude::Entity;
use glam::{EulerRot, Quat, Vec2, Vec3};
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};

// egui
use egui::Context as EguiCtx;
use egui_wgpu::{Renderer as EguiRenderer, RendererOptions, ScreenDescriptor};
use egui_winit::State as EguiWinit;

const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Centerpiece staging: scaled so its largest extent spans four units,
/// centered, then dropped toward the floor.
const SHOWCASE_FIT_SIZE: f32 = 4.0;
const SHOWCASE_FLOOR_DROP: f32 = 1.2;
const ORBIT_RADIANS_PER_PIXEL: f32 = 0.005;

pub async fn run() -> Result<()> {
    run_with_overrides(CliOverrides::default()).await
}

pub async fn run_with_overrides(cli: CliOverrides) -> Result<()> {
    let config_path = cli.config_path().unwrap_or(DEFAULT_CONFIG_PATH).to_string();
    let mut config = AppConfig::load_or_default(&config_path);
    config.apply_overrides(&cli.into_config_overrides());
    let event_loop = EventLoop::new().context("Failed to create winit event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app).context("Event loop execution failed")?;
    Ok(())
}

pub struct App {
    renderer: Renderer,
    stage: StageWorld,
    time: Time,
    tracker: PointerTracker,
    assets: AssetServer,
    session: SessionContext,
    popup: PopupController,
    panel: PopupPanel,
    spawner: EffectSpawner,
    orbit: OrbitController,
    camera: Camera3D,
    config: AppConfig,
    should_close: bool,

    // egui
    egui_ctx: EguiCtx,
    egui_winit: Option<EguiWinit>,
    egui_renderer: Option<EguiRenderer>,
    egui_screen: Option<ScreenDescriptor>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let renderer = Renderer::new(&config.window);
        let size = PhysicalSize::new(config.window.width.max(1), config.window.height.max(1));

        let mut stage = StageWorld::new();
        stage.set_effect_caps(EffectCaps { max_live: config.effects.max_live });

        let label_models: Vec<(TargetKind, String)> = config
            .targets
            .iter()
            .filter_map(|target| match &target.source {
                LabelSource::Model { path, .. } => Some((target.kind, path.clone())),
                LabelSource::Text => None,
            })
            .collect();
        let assets = AssetServer::start(&config.assets, &label_models);

        let popup = PopupController::from_targets(&config.targets);
        let panel = PopupPanel::new(&config.popup);
        let spawner = EffectSpawner::new(&config.effects);
        let orbit = OrbitController::from_config(&config.camera);
        let mut camera = Camera3D::new(
            orbit.position(),
            orbit.target,
            config.camera.fov_degrees.to_radians(),
            config.camera.near,
            config.camera.far,
        );
        camera.set_aspect(size);

        Self {
            renderer,
            stage,
            time: Time::new(),
            tracker: PointerTracker::new(size),
            assets,
            session: SessionContext::default(),
            popup,
            panel,
            spawner,
            orbit,
            camera,
            config,
            should_close: false,
            egui_ctx: EguiCtx::default(),
            egui_winit: None,
            egui_renderer: None,
            egui_screen: None,
        }
    }

    fn init_overlay(&mut self) {
        if self.egui_winit.is_some() {
            return;
        }
        let Some(window) = self.renderer.window() else {
            return;
        };
        let state = EguiWinit::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(self.renderer.pixels_per_point()),
            window.theme(),
            None,
        );
        self.egui_winit = Some(state);
        self.egui_renderer = Some(EguiRenderer::new(
            self.renderer.device(),
            self.renderer.surface_format(),
            RendererOptions::default(),
        ));
        let size = self.renderer.size();
        self.egui_screen = Some(ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: self.renderer.pixels_per_point(),
        });
    }

    fn apply_asset_event(&mut self, event: AssetEvent) {
        match event {
            AssetEvent::Model { slot, model } => match slot {
                ModelSlot::Showcase => {
                    let root =
                        self.stage.spawn_showcase(&model, SHOWCASE_FIT_SIZE, SHOWCASE_FLOOR_DROP);
                    self.session.set_showcase_root(root);
                    self.spawner.set_owner(root);
                    eprintln!("[assets] showcase model staged ({} nodes)", model.nodes.len());
                }
                ModelSlot::EffectProp => {
                    if self.session.prop_model().is_some() {
                        return;
                    }
                    if let Some(clip) = model.clips.first() {
                        self.spawner.set_prop_clip(Arc::new(clip.clone()));
                    }
                    self.session.set_prop_model(model);
                }
                ModelSlot::LabelModel(kind) => {
                    if self.stage.target_root(kind).is_some() {
                        return;
                    }
                    let Some(target) = self.config.target(kind).cloned() else {
                        return;
                    };
                    let correction = match &target.source {
                        LabelSource::Model { forward_correction_degrees: [x, y, z], .. } => {
                            Quat::from_euler(
                                EulerRot::YXZ,
                                y.to_radians(),
                                x.to_radians(),
                                z.to_radians(),
                            )
                        }
                        LabelSource::Text => Quat::IDENTITY,
                    };
                    self.stage.spawn_model_label(
                        kind,
                        Vec3::from(target.position),
                        &model,
                        correction,
                        Vec3::from(target.color),
                    );
                }
            },
            AssetEvent::Font { bytes } => {
                self.session.set_font(bytes);
                self.spawn_text_labels();
            }
            AssetEvent::SpriteTexture { texture } => {
                self.renderer.set_sprite_texture(&texture);
                self.session.mark_sprite_texture_ready();
            }
            AssetEvent::Failed { what, error } => {
                eprintln!("[assets] {what} failed to load: {error}");
            }
        }
    }

    /// Text titles exist only once the font is in; the registry fills
    /// incrementally as loads complete.
    fn spawn_text_labels(&mut self) {
        let targets: Vec<_> = self
            .config
            .targets
            .iter()
            .filter(|t| matches!(t.source, LabelSource::Text))
            .cloned()
            .collect();
        for target in targets {
            if self.stage.target_root(target.kind).is_some() {
                continue;
            }
            self.stage.spawn_text_label(
                target.kind,
                Vec3::from(target.position),
                Vec3::from(target.hit_half_extents()),
                Vec3::from(target.color),
            );
        }
    }

    fn show_for_hit(&mut self, hit: PickHit) {
        let projected = self.project_root(hit.root);
        let before = self.popup.phase();
        self.popup.on_hit(hit.kind, projected, &mut self.panel);
        if self.popup.phase() != before {
            self.stage.push_event(StageEvent::PopupShown { kind: hit.kind });
        }
        self.session.set_hovered(Some(hit.kind));
    }

    fn project_root(&self, root: Entity) -> Option<Vec2> {
        let world = self.stage.world.get::<WorldTransform3D>(root)?;
        self.camera.project_point(world.0.w_axis.truncate(), self.renderer.size())
    }

    fn project_target(&self, kind: TargetKind) -> Option<Vec2> {
        self.project_root(self.stage.target_root(kind)?)
    }

    fn collect_instances(&mut self) -> (Vec<InstanceData>, Vec<InstanceData>) {
        let sprite_ready = self.session.sprite_texture_ready();
        let mut quads = Vec::new();
        let mut cubes = Vec::new();
        let mut query =
            self.stage.world.query::<(&WorldTransform3D, &Shape, &Tint, Option<&SpriteVisual>)>();
        for (world, shape, tint, sprite) in query.iter(&self.stage.world) {
            let uv_rect =
                if sprite.is_some() && sprite_ready { [0.0, 0.0, 1.0, 1.0] } else { [0.0; 4] };
            let instance =
                InstanceData { model: world.0.to_cols_array_2d(), uv_rect, tint: tint.0.to_array() };
            match shape {
                Shape::Quad => quads.push(instance),
                Shape::Cube => cubes.push(instance),
            }
        }
        (quads, cubes)
    }

    /// One frame, in fixed order: asset completions, scheduled spawns,
    /// clip/tween/orientation systems, camera damping, picking + popup,
    /// render submission.
    fn frame(&mut self) {
        self.time.tick();
        let dt = self.time.delta_seconds();

        for event in self.assets.poll() {
            self.apply_asset_event(event);
        }

        // Camera goals from accumulated pointer input.
        let drag = self.tracker.take_drag_delta();
        if drag.length_squared() > 0.0 {
            self.orbit.orbit(-drag * ORBIT_RADIANS_PER_PIXEL);
        }
        let wheel = self.tracker.take_wheel();
        if wheel.abs() > 0.0 {
            self.orbit.zoom(0.95f32.powf(wheel));
        }

        // Click bursts feed the batch scheduler; the spawner drains what
        // is due this frame.
        for _ in 0..self.tracker.take_clicks() {
            self.spawner.queue_batch(
                KindSelector::Weighted { sprite_weight: self.config.effects.sprite_weight },
                self.config.effects.batch_count,
                self.config.effects.batch_delay,
            );
        }
        self.spawner.tick(&mut self.stage, dt);

        // Clip mixers, tweens/disposals, target orientation, propagation.
        self.stage.set_viewpoint(self.camera.position, self.orbit.orientation());
        self.stage.update(dt);
        self.panel.advance(dt);

        // Camera damping after the world settles.
        self.orbit.update(dt);
        self.orbit.apply_to(&mut self.camera);

        // Discrete touch-taps pick synchronously.
        for ndc in self.tracker.take_tap_picks() {
            if let Some((origin, dir)) = self.camera.ndc_ray(ndc) {
                if let Some(hit) = picking::pick_ray(&self.stage, origin, dir) {
                    self.show_for_hit(hit);
                }
            }
        }
        // Continuous hover pick; gated on the armed flag inside.
        let pointer = self.tracker.pointer();
        if let Some(hit) = picking::pick(&self.stage, &self.camera, &pointer) {
            self.show_for_hit(hit);
        }
        // Dynamic popups track their hovered target every frame.
        if let crate::popup::PopupPhase::Showing(kind) = self.popup.phase() {
            if self.session.hovered() == Some(kind) {
                let projected = self.project_target(kind);
                self.popup.refresh_dynamic(projected, &mut self.panel);
            }
        }

        for event in self.stage.drain_events() {
            match event {
                StageEvent::TargetRegistered { .. } | StageEvent::EffectDropped { .. } => {
                    eprintln!("[stage] {event}");
                }
                _ => {}
            }
        }

        self.submit_frame();
    }

    fn submit_frame(&mut self) {
        let (quads, cubes) = self.collect_instances();
        let view_proj = self.camera.view_projection();

        let result = if self.egui_winit.is_some()
            && self.egui_renderer.is_some()
            && self.egui_screen.is_some()
        {
            let raw_input = {
                let Some(window) = self.renderer.window() else {
                    return;
                };
                self.egui_winit.as_mut().unwrap().take_egui_input(window)
            };
            let ctx = self.egui_ctx.clone();
            let panel = &mut self.panel;
            let full_output = ctx.run(raw_input, |ctx| panel.ui(ctx));
            let egui::FullOutput { platform_output, textures_delta, shapes, .. } = full_output;
            if let Some(window) = self.renderer.window() {
                self.egui_winit.as_mut().unwrap().handle_platform_output(window, platform_output);
            }
            let screen = {
                let s = self.egui_screen.as_ref().unwrap();
                ScreenDescriptor {
                    size_in_pixels: s.size_in_pixels,
                    pixels_per_point: s.pixels_per_point,
                }
            };
            let painter = self.egui_renderer.as_mut().unwrap();
            for (id, delta) in &textures_delta.set {
                painter.update_texture(self.renderer.device(), self.renderer.queue(), *id, delta);
            }
            let meshes = ctx.tessellate(shapes, screen.pixels_per_point);
            let result =
                self.renderer.render(&quads, &cubes, view_proj, Some((painter, &meshes, &screen)));
            for id in &textures_delta.free {
                painter.free_texture(id);
            }
            result
        } else {
            self.renderer.render(&quads, &cubes, view_proj, None)
        };

        match result {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.renderer.size();
                self.renderer.resize(size);
            }
            Err(err) => eprintln!("[render] frame error: {err:?}"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
        self.renderer.ensure_window(event_loop);
        let size = self.renderer.size();
        self.camera.set_aspect(size);
        self.tracker.set_viewport(size);
        self.init_overlay();
    }

    fn window_event(
        &mut self,
        _el: &ActiveEventLoop,
        id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        // The overlay sees events first; cursor motion always reaches the
        // tracker so hover picking keeps working over the popup.
        let mut consumed = false;
        let pointer_event = PointerEvent::from_window_event(&event);
        let is_cursor_event = matches!(pointer_event, Some(PointerEvent::Moved { .. }));
        if let (Some(window), Some(state)) = (self.renderer.window(), self.egui_winit.as_mut()) {
            if id == window.id() {
                let resp = state.on_window_event(window, &event);
                if resp.consumed {
                    consumed = true;
                }
            }
        }
        let Some(pointer_event) = pointer_event else {
            return;
        };
        if !consumed || is_cursor_event {
            self.tracker.push(pointer_event);
        }
        match pointer_event {
            PointerEvent::CloseRequested | PointerEvent::Escape => {
                self.should_close = true;
            }
            PointerEvent::Resized { width, height } => {
                let size = PhysicalSize::new(width, height);
                self.renderer.resize(size);
                self.camera.set_aspect(size);
                self.tracker.set_viewport(size);
                if let Some(screen) = &mut self.egui_screen {
                    screen.size_in_pixels = [width, height];
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_close {
            event_loop.exit();
            return;
        }
        if self.renderer.is_ready() {
            self.frame();
        }
        if let Some(window) = self.renderer.window() {
            window.request_redraw();
        }
    }
}
