//! Popup overlay state machine.
//!
//! The controller owns the overlay panel's identity: exactly one panel is
//! ever created, and content transitions reuse it so the surface can
//! animate between states. There is deliberately no way back to `Hidden`
//! once the first popup has shown; the overlay is permanent for the
//! session, matching the shipped behavior.

use crate::config::{Corner, Placement, PopupContent, TargetConfig, TargetKind};
use glam::Vec2;

pub type PanelId = u64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelPosition {
    Corner { corner: Corner, margin: f32 },
    Screen { x: f32, y: f32 },
}

/// The overlay backend the controller drives. The contract mirrors a
/// retained overlay: `install_content` replaces the panel's payload,
/// `measure` must be called after content/position mutations and before
/// `play_entrance`, so the surface observes the pre-transition state and
/// the entrance animation never collapses into a single frame.
pub trait PopupSurface {
    fn create_panel(&mut self) -> PanelId;
    fn clear_content(&mut self, panel: PanelId);
    fn install_content(&mut self, panel: PanelId, kind: TargetKind, content: &PopupContent);
    fn set_position(&mut self, panel: PanelId, position: PanelPosition);
    fn measure(&mut self, panel: PanelId) -> Vec2;
    fn play_entrance(&mut self, panel: PanelId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupPhase {
    Hidden,
    Showing(TargetKind),
}

#[derive(Debug, Clone)]
struct PopupPolicy {
    kind: TargetKind,
    placement: Placement,
    content: PopupContent,
}

pub struct PopupController {
    phase: PopupPhase,
    panel: Option<PanelId>,
    policies: Vec<PopupPolicy>,
}

impl PopupController {
    /// Resolves the per-kind placement/content table once, from config.
    pub fn from_targets(targets: &[TargetConfig]) -> Self {
        let policies = targets
            .iter()
            .map(|t| PopupPolicy { kind: t.kind, placement: t.placement, content: t.content.clone() })
            .collect();
        Self { phase: PopupPhase::Hidden, panel: None, policies }
    }

    pub fn phase(&self) -> PopupPhase {
        self.phase
    }

    pub fn panel(&self) -> Option<PanelId> {
        self.panel
    }

    pub fn placement_of(&self, kind: TargetKind) -> Option<Placement> {
        self.policies.iter().find(|p| p.kind == kind).map(|p| p.placement)
    }

    /// Drives the state machine for a pick hit. `projected` is the
    /// target's screen projection, used by dynamic placements.
    pub fn on_hit(&mut self, kind: TargetKind, projected: Option<Vec2>, surface: &mut dyn PopupSurface) {
        let Some(policy_index) = self.policies.iter().position(|p| p.kind == kind) else {
            return;
        };
        match self.phase {
            PopupPhase::Showing(current) if current == kind => {
                // Same target re-hit: content untouched; only dynamic
                // placements track the pointer.
                if self.placement_of(kind).is_some_and(|p| p.is_dynamic()) {
                    self.refresh_position(kind, projected, surface);
                }
            }
            PopupPhase::Showing(_) => {
                let panel = match self.panel {
                    Some(panel) => panel,
                    None => return,
                };
                let policy = &self.policies[policy_index];
                surface.clear_content(panel);
                surface.install_content(panel, kind, &policy.content);
                self.phase = PopupPhase::Showing(kind);
                self.position_and_enter(kind, projected, surface);
            }
            PopupPhase::Hidden => {
                let panel = *self.panel.get_or_insert_with(|| surface.create_panel());
                let policy = &self.policies[policy_index];
                surface.install_content(panel, kind, &policy.content);
                self.phase = PopupPhase::Showing(kind);
                self.position_and_enter(kind, projected, surface);
            }
        }
    }

    /// Per-frame position refresh for the active dynamic popup.
    pub fn refresh_dynamic(&mut self, projected: Option<Vec2>, surface: &mut dyn PopupSurface) {
        if let PopupPhase::Showing(kind) = self.phase {
            if self.placement_of(kind).is_some_and(|p| p.is_dynamic()) {
                self.refresh_position(kind, projected, surface);
            }
        }
    }

    fn position_and_enter(
        &mut self,
        kind: TargetKind,
        projected: Option<Vec2>,
        surface: &mut dyn PopupSurface,
    ) {
        let Some(panel) = self.panel else {
            return;
        };
        if let Some(position) = self.position_for(kind, projected) {
            surface.set_position(panel, position);
        }
        // Layout read before the transition starts.
        let _ = surface.measure(panel);
        surface.play_entrance(panel);
    }

    fn refresh_position(
        &mut self,
        kind: TargetKind,
        projected: Option<Vec2>,
        surface: &mut dyn PopupSurface,
    ) {
        let Some(panel) = self.panel else {
            return;
        };
        if let Some(position) = self.position_for(kind, projected) {
            surface.set_position(panel, position);
        }
    }

    fn position_for(&self, kind: TargetKind, projected: Option<Vec2>) -> Option<PanelPosition> {
        match self.placement_of(kind)? {
            Placement::FixedCorner { corner, margin } => Some(PanelPosition::Corner { corner, margin }),
            Placement::Dynamic { drop } => {
                projected.map(|p| PanelPosition::Screen { x: p.x, y: p.y + drop })
            }
        }
    }
}
