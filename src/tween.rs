//! Time-bounded property interpolation for effect trajectories, sprite
//! fades and the popup entrance.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    EaseOutQuad,
    EaseOutCubic,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Tween {
    pub duration: f32,
    pub elapsed: f32,
    pub easing: Easing,
}

impl Tween {
    pub fn new(duration: f32, easing: Easing) -> Self {
        Self { duration: duration.max(f32::EPSILON), elapsed: 0.0, easing }
    }

    /// Advances the clock and returns the eased progress in `[0, 1]`.
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);
        self.progress()
    }

    pub fn progress(&self) -> f32 {
        self.easing.apply(self.elapsed / self.duration)
    }

    pub fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn restart(&mut self) {
        self.elapsed = 0.0;
    }
}
