use glam::{EulerRot, Mat4, Quat, Vec2, Vec3, Vec4};
use winit::dpi::PhysicalSize;

use crate::config::CameraConfig;

const DEFAULT_UP: Vec3 = Vec3::Y;

/// Perspective camera for the showcase viewport.
#[derive(Debug, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
}

impl Camera3D {
    pub fn new(position: Vec3, target: Vec3, fov_y_radians: f32, near: f32, far: f32) -> Self {
        Self { position, target, up: DEFAULT_UP, fov_y_radians, near, far, aspect: 1.0 }
    }

    pub fn set_aspect(&mut self, viewport: PhysicalSize<u32>) {
        if viewport.width > 0 && viewport.height > 0 {
            self.aspect = viewport.width as f32 / viewport.height as f32;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_radians, self.aspect.max(0.0001), self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray through a normalized device coordinate in `[-1, 1]`.
    pub fn ndc_ray(&self, ndc: Vec2) -> Option<(Vec3, Vec3)> {
        let clip = Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let inv_view_proj = self.view_projection().inverse();
        let world = inv_view_proj * clip;
        if world.w.abs() < f32::EPSILON {
            return None;
        }
        let towards = (world.truncate() / world.w) - self.position;
        if towards.length_squared() <= f32::EPSILON {
            return None;
        }
        Some((self.position, towards.normalize()))
    }

    /// Projects a world point to pixel coordinates:
    /// `x = (ndc.x + 1) / 2 * w`, `y = (1 - ndc.y) / 2 * h`.
    pub fn project_point(&self, point: Vec3, viewport: PhysicalSize<u32>) -> Option<Vec2> {
        if viewport.width == 0 || viewport.height == 0 {
            return None;
        }
        let clip = self.view_projection() * point.extend(1.0);
        if clip.w.abs() < f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let x = (ndc.x + 1.0) * 0.5 * viewport.width as f32;
        let y = (1.0 - ndc.y) * 0.5 * viewport.height as f32;
        Some(Vec2::new(x, y))
    }
}

/// Orbit controller with exponential smoothing toward goal angles, so the
/// camera keeps gliding briefly after the pointer stops.
#[derive(Debug, Clone)]
pub struct OrbitController {
    pub target: Vec3,
    yaw: f32,
    pitch: f32,
    radius: f32,
    goal_yaw: f32,
    goal_pitch: f32,
    goal_radius: f32,
    damping: f32,
    min_radius: f32,
    max_radius: f32,
}

impl OrbitController {
    pub fn from_config(cfg: &CameraConfig) -> Self {
        let yaw = cfg.initial_yaw_degrees.to_radians();
        let pitch = cfg.initial_pitch_degrees.to_radians();
        let radius = cfg.orbit_radius.clamp(cfg.min_radius, cfg.max_radius);
        Self {
            target: Vec3::ZERO,
            yaw,
            pitch,
            radius,
            goal_yaw: yaw,
            goal_pitch: pitch,
            goal_radius: radius,
            damping: cfg.damping.max(1e-3),
            min_radius: cfg.min_radius,
            max_radius: cfg.max_radius,
        }
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.goal_yaw += delta.x;
        self.goal_pitch = (self.goal_pitch + delta.y)
            .clamp(-std::f32::consts::FRAC_PI_2 + 0.01, std::f32::consts::FRAC_PI_2 - 0.01);
    }

    pub fn zoom(&mut self, factor: f32) {
        self.goal_radius = (self.goal_radius * factor).clamp(self.min_radius, self.max_radius);
    }

    pub fn update(&mut self, dt: f32) {
        let k = 1.0 - (-dt / self.damping).exp();
        self.yaw += (self.goal_yaw - self.yaw) * k;
        self.pitch += (self.goal_pitch - self.pitch) * k;
        self.radius += (self.goal_radius - self.radius) * k;
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    pub fn position(&self) -> Vec3 {
        self.target + self.orientation() * Vec3::new(0.0, 0.0, self.radius)
    }

    pub fn apply_to(&self, camera: &mut Camera3D) {
        camera.position = self.position();
        camera.target = self.target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera3D {
        let mut cam = Camera3D::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 45f32.to_radians(), 0.1, 100.0);
        cam.set_aspect(PhysicalSize::new(800, 600));
        cam
    }

    #[test]
    fn center_ndc_ray_points_at_target() {
        let cam = camera();
        let (origin, dir) = cam.ndc_ray(Vec2::ZERO).expect("ray");
        assert_eq!(origin, cam.position);
        assert!(dir.z < -0.99, "center ray should look down -Z, got {dir:?}");
    }

    #[test]
    fn projection_maps_center_to_viewport_middle() {
        let cam = camera();
        let px = cam.project_point(Vec3::ZERO, PhysicalSize::new(800, 600)).expect("projected");
        assert!((px.x - 400.0).abs() < 0.5 && (px.y - 300.0).abs() < 0.5, "got {px:?}");
    }

    #[test]
    fn project_and_ray_agree() {
        let cam = camera();
        let world = Vec3::new(0.6, -0.4, 1.0);
        let viewport = PhysicalSize::new(800, 600);
        let px = cam.project_point(world, viewport).expect("projected");
        let ndc = Vec2::new(px.x / 400.0 - 1.0, 1.0 - px.y / 300.0);
        let (origin, dir) = cam.ndc_ray(ndc).expect("ray");
        let closest = origin + dir * (world - origin).dot(dir);
        assert!((closest - world).length() < 1e-3, "ray misses the projected point: {closest:?}");
    }

    #[test]
    fn orbit_settles_on_goal() {
        let mut orbit = OrbitController::from_config(&CameraConfig::default());
        let before = orbit.position();
        orbit.orbit(Vec2::new(0.5, 0.0));
        for _ in 0..240 {
            orbit.update(1.0 / 60.0);
        }
        let after = orbit.position();
        assert!((after - before).length() > 0.1, "orbit should move the camera");
        let goal_now = orbit.position();
        orbit.update(1.0 / 60.0);
        assert!((orbit.position() - goal_now).length() < 1e-3, "orbit should have settled");
    }
}
