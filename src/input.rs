use glam::Vec2;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};
use winit::keyboard::{Key, NamedKey};

/// Device-independent pointer snapshot read by the picker each frame.
#[derive(Debug, Clone, Copy)]
pub struct PointerState {
    /// Normalized device coordinates in `[-1, 1]`, y up.
    pub ndc: Vec2,
    /// False until the first real pointer event; gates all picking so the
    /// default centered pointer never produces a phantom hover.
    pub armed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Moved { x: f32, y: f32 },
    TouchStart { x: f32, y: f32 },
    TouchMove { x: f32, y: f32 },
    ButtonPressed,
    ButtonReleased,
    Wheel { delta: f32 },
    Resized { width: u32, height: u32 },
    Escape,
    CloseRequested,
}

impl PointerEvent {
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                Some(PointerEvent::Moved { x: position.x as f32, y: position.y as f32 })
            }
            WindowEvent::Touch(touch) => {
                let x = touch.location.x as f32;
                let y = touch.location.y as f32;
                match touch.phase {
                    TouchPhase::Started => Some(PointerEvent::TouchStart { x, y }),
                    TouchPhase::Moved => Some(PointerEvent::TouchMove { x, y }),
                    _ => None,
                }
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => match state {
                ElementState::Pressed => Some(PointerEvent::ButtonPressed),
                ElementState::Released => Some(PointerEvent::ButtonReleased),
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
                };
                Some(PointerEvent::Wheel { delta: amount })
            }
            WindowEvent::Resized(size) => {
                Some(PointerEvent::Resized { width: size.width, height: size.height })
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && matches!(event.logical_key, Key::Named(NamedKey::Escape))
                {
                    Some(PointerEvent::Escape)
                } else {
                    None
                }
            }
            WindowEvent::CloseRequested => Some(PointerEvent::CloseRequested),
            _ => None,
        }
    }
}

const CLICK_SLOP_PX: f32 = 4.0;

/// Normalizes raw pointer input and queues the discrete requests
/// (touch-taps, click bursts) the frame loop consumes.
pub struct PointerTracker {
    viewport: PhysicalSize<u32>,
    ndc: Vec2,
    armed: bool,
    last_cursor: Option<Vec2>,
    dragging: bool,
    drag_delta: Vec2,
    press_travel: f32,
    wheel: f32,
    tap_picks: Vec<Vec2>,
    clicks: u32,
}

impl PointerTracker {
    pub fn new(viewport: PhysicalSize<u32>) -> Self {
        Self {
            viewport,
            ndc: Vec2::ZERO,
            armed: false,
            last_cursor: None,
            dragging: false,
            drag_delta: Vec2::ZERO,
            press_travel: 0.0,
            wheel: 0.0,
            tap_picks: Vec::new(),
            clicks: 0,
        }
    }

    pub fn set_viewport(&mut self, viewport: PhysicalSize<u32>) {
        self.viewport = viewport;
    }

    fn normalize(&self, x: f32, y: f32) -> Vec2 {
        let w = self.viewport.width.max(1) as f32;
        let h = self.viewport.height.max(1) as f32;
        Vec2::new(x / w * 2.0 - 1.0, 1.0 - y / h * 2.0)
    }

    pub fn push(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Moved { x, y } => {
                self.ndc = self.normalize(x, y);
                self.armed = true;
                let cursor = Vec2::new(x, y);
                if self.dragging {
                    if let Some(last) = self.last_cursor {
                        let step = cursor - last;
                        self.drag_delta += step;
                        self.press_travel += step.length();
                    }
                }
                self.last_cursor = Some(cursor);
            }
            PointerEvent::TouchStart { x, y } => {
                self.ndc = self.normalize(x, y);
                self.armed = true;
                self.tap_picks.push(self.ndc);
            }
            PointerEvent::TouchMove { x, y } => {
                self.ndc = self.normalize(x, y);
                self.armed = true;
            }
            PointerEvent::ButtonPressed => {
                self.dragging = true;
                self.press_travel = 0.0;
            }
            PointerEvent::ButtonReleased => {
                // A press that travelled is an orbit drag, not a click.
                if self.dragging && self.press_travel < CLICK_SLOP_PX {
                    self.clicks += 1;
                }
                self.dragging = false;
            }
            PointerEvent::Wheel { delta } => {
                self.wheel += delta;
            }
            PointerEvent::Resized { width, height } => {
                self.viewport = PhysicalSize::new(width, height);
            }
            PointerEvent::Escape | PointerEvent::CloseRequested => {}
        }
    }

    pub fn pointer(&self) -> PointerState {
        PointerState { ndc: self.ndc, armed: self.armed }
    }

    /// Touch-start pick requests, handled synchronously the frame they
    /// arrive (distinct from the continuous hover pick).
    pub fn take_tap_picks(&mut self) -> Vec<Vec2> {
        std::mem::take(&mut self.tap_picks)
    }

    pub fn take_clicks(&mut self) -> u32 {
        std::mem::take(&mut self.clicks)
    }

    pub fn take_drag_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.drag_delta)
    }

    pub fn take_wheel(&mut self) -> f32 {
        std::mem::take(&mut self.wheel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_stays_unarmed_until_first_event() {
        let tracker = PointerTracker::new(PhysicalSize::new(800, 600));
        assert!(!tracker.pointer().armed);
    }

    #[test]
    fn move_normalizes_to_ndc() {
        let mut tracker = PointerTracker::new(PhysicalSize::new(800, 600));
        tracker.push(PointerEvent::Moved { x: 400.0, y: 300.0 });
        let state = tracker.pointer();
        assert!(state.armed);
        assert!(state.ndc.length() < 1e-6, "center of the window is NDC origin");
        tracker.push(PointerEvent::Moved { x: 800.0, y: 0.0 });
        let state = tracker.pointer();
        assert!((state.ndc - Vec2::new(1.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn touch_start_queues_a_discrete_pick() {
        let mut tracker = PointerTracker::new(PhysicalSize::new(800, 600));
        tracker.push(PointerEvent::TouchStart { x: 200.0, y: 150.0 });
        let taps = tracker.take_tap_picks();
        assert_eq!(taps.len(), 1);
        assert!((taps[0] - Vec2::new(-0.5, 0.5)).length() < 1e-6);
        assert!(tracker.take_tap_picks().is_empty(), "taps drain once");
    }

    #[test]
    fn click_counts_on_release() {
        let mut tracker = PointerTracker::new(PhysicalSize::new(800, 600));
        tracker.push(PointerEvent::ButtonPressed);
        assert_eq!(tracker.take_clicks(), 0, "press alone is not a click");
        tracker.push(PointerEvent::ButtonPressed);
        tracker.push(PointerEvent::ButtonReleased);
        assert_eq!(tracker.take_clicks(), 1);
    }

    #[test]
    fn drag_accumulates_while_button_held() {
        let mut tracker = PointerTracker::new(PhysicalSize::new(800, 600));
        tracker.push(PointerEvent::Moved { x: 100.0, y: 100.0 });
        tracker.push(PointerEvent::ButtonPressed);
        tracker.push(PointerEvent::Moved { x: 120.0, y: 90.0 });
        tracker.push(PointerEvent::ButtonReleased);
        tracker.push(PointerEvent::Moved { x: 500.0, y: 500.0 });
        assert!((tracker.take_drag_delta() - Vec2::new(20.0, -10.0)).length() < 1e-6);
        assert_eq!(tracker.take_clicks(), 0, "a travelled press is a drag, not a click");
    }
}
