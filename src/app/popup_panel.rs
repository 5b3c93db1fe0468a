//! The shipped popup surface: one egui area, created once per session and
//! restyled in place as the controller transitions between targets.

use crate::config::{Corner, PopupContent, PopupTuning, TargetKind};
use crate::popup::{PanelId, PanelPosition, PopupSurface};
use crate::tween::{Easing, Tween};
use glam::Vec2;

const ENTRANCE_SLIDE_PX: f32 = 12.0;

struct PanelState {
    id: PanelId,
    kind: Option<TargetKind>,
    content: PopupContent,
    position: Option<PanelPosition>,
    entrance: Tween,
    measured: Vec2,
}

pub struct PopupPanel {
    state: Option<PanelState>,
    created: u64,
    entrance_duration: f32,
}

impl PopupPanel {
    pub fn new(tuning: &PopupTuning) -> Self {
        Self { state: None, created: 0, entrance_duration: tuning.entrance_duration.max(0.01) }
    }

    /// Panels created so far; stays at one for the whole session.
    pub fn created_panels(&self) -> u64 {
        self.created
    }

    pub fn advance(&mut self, dt: f32) {
        if let Some(state) = &mut self.state {
            state.entrance.advance(dt);
        }
    }

    pub fn ui(&mut self, ctx: &egui::Context) {
        let Some(state) = &mut self.state else {
            return;
        };
        let Some(kind) = state.kind else {
            return;
        };
        let t = state.entrance.progress();
        let mut area = egui::Area::new(egui::Id::new(("vitrine_popup", state.id)))
            .order(egui::Order::Foreground);
        area = match state.position {
            Some(PanelPosition::Corner { corner, margin }) => {
                let (align, offset) = corner_anchor(corner, margin);
                area.anchor(align, offset)
            }
            Some(PanelPosition::Screen { x, y }) => {
                area.fixed_pos(egui::pos2(x, y + (1.0 - t) * ENTRANCE_SLIDE_PX))
            }
            None => area.fixed_pos(egui::pos2(0.0, 0.0)),
        };
        let response = area.show(ctx, |ui| {
            ui.set_opacity(t);
            egui::Frame::window(&ctx.style()).fill(kind_fill(kind)).show(ui, |ui| {
                ui.set_max_width(320.0);
                ui.heading(kind.title());
                let content = &state.content;
                if let Some(body) = &content.body {
                    ui.label(body);
                }
                for link in &content.links {
                    ui.hyperlink_to(&link.label, &link.url);
                }
                if let Some(url) = &content.chart_url {
                    ui.hyperlink_to("Open live chart", url);
                }
                if let Some(address) = &content.contract_address {
                    ui.monospace(address);
                }
            });
        });
        state.measured = Vec2::new(response.response.rect.width(), response.response.rect.height());
    }
}

impl PopupSurface for PopupPanel {
    fn create_panel(&mut self) -> PanelId {
        let id = self.created;
        self.created += 1;
        self.state = Some(PanelState {
            id,
            kind: None,
            content: PopupContent::default(),
            position: None,
            entrance: Tween::new(self.entrance_duration, Easing::EaseOutCubic),
            measured: Vec2::ZERO,
        });
        id
    }

    fn clear_content(&mut self, panel: PanelId) {
        if let Some(state) = self.state.as_mut().filter(|s| s.id == panel) {
            state.kind = None;
            state.content = PopupContent::default();
        }
    }

    fn install_content(&mut self, panel: PanelId, kind: TargetKind, content: &PopupContent) {
        if let Some(state) = self.state.as_mut().filter(|s| s.id == panel) {
            state.kind = Some(kind);
            state.content = content.clone();
        }
    }

    fn set_position(&mut self, panel: PanelId, position: PanelPosition) {
        if let Some(state) = self.state.as_mut().filter(|s| s.id == panel) {
            state.position = Some(position);
        }
    }

    fn measure(&mut self, panel: PanelId) -> Vec2 {
        self.state.as_ref().filter(|s| s.id == panel).map(|s| s.measured).unwrap_or(Vec2::ZERO)
    }

    fn play_entrance(&mut self, panel: PanelId) {
        if let Some(state) = self.state.as_mut().filter(|s| s.id == panel) {
            state.entrance.restart();
        }
    }
}

fn corner_anchor(corner: Corner, margin: f32) -> (egui::Align2, egui::Vec2) {
    match corner {
        Corner::BottomLeft => (egui::Align2::LEFT_BOTTOM, egui::vec2(margin, -margin)),
        Corner::BottomRight => (egui::Align2::RIGHT_BOTTOM, egui::vec2(-margin, -margin)),
        Corner::TopLeft => (egui::Align2::LEFT_TOP, egui::vec2(margin, margin)),
        Corner::TopRight => (egui::Align2::RIGHT_TOP, egui::vec2(-margin, margin)),
    }
}

fn kind_fill(kind: TargetKind) -> egui::Color32 {
    match kind {
        TargetKind::Contract => egui::Color32::from_rgb(24, 28, 38),
        TargetKind::Chart => egui::Color32::from_rgb(18, 24, 32),
        TargetKind::Info => egui::Color32::from_rgb(26, 26, 34),
        TargetKind::Socials => egui::Color32::from_rgb(22, 30, 30),
    }
}
