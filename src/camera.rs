use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec2, Vec3};

use crate::config::InteractionConfig;
use crate::picking::Ray;

const POLAR_EPSILON: f32 = 1e-6;

/// Perspective camera orbiting a look-at target.
///
/// Rotation is damped: input accumulates a spherical delta that
/// [`OrbitCamera::update`] applies a fraction of each frame.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    /// Cleared while a two-finger touch gesture owns panning.
    pub native_pan_enabled: bool,
    // (theta, phi) still to be applied
    pending_rotation: Vec2,
}

impl OrbitCamera {
    pub fn new(position: Vec3, target: Vec3, fov_degrees: f32) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            fov_degrees,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            native_pan_enabled: true,
            pending_rotation: Vec2::ZERO,
        }
    }

    pub fn apply_config(&mut self, config: &InteractionConfig) {
        self.damping_factor = config.orbit_damping_factor.clamp(0.0, 1.0);
        self.rotate_speed = config.orbit_rotate_speed;
        self.pan_speed = config.orbit_pan_speed;
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize_or_zero()
    }

    pub fn camera_up(&self) -> Vec3 {
        self.right().cross(self.forward()).normalize_or_zero()
    }

    /// Queues an orbit rotation for a pointer drag of `delta` pixels.
    pub fn rotate(&mut self, delta: Vec2, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.pending_rotation.x -= TAU * delta.x / height * self.rotate_speed;
        self.pending_rotation.y -= TAU * delta.y / height * self.rotate_speed;
    }

    /// Screen-space pan for a middle-button drag; no-op while native panning is off.
    pub fn pan(&mut self, delta: Vec2, viewport_height: f32) {
        if !self.native_pan_enabled {
            return;
        }
        let height = viewport_height.max(1.0);
        let visible = self.distance() * (self.fov_degrees.to_radians() * 0.5).tan();
        let scale = 2.0 * visible / height * self.pan_speed;
        let offset = self.right() * (-delta.x * scale) + self.camera_up() * (delta.y * scale);
        self.translate(offset);
    }

    /// Two-finger pan: a fixed number of world units per pixel of midpoint travel.
    pub fn touch_pan(&mut self, delta: Vec2, sensitivity: f32) {
        let delta = delta * sensitivity;
        let offset = self.right() * -delta.x + self.camera_up() * delta.y;
        self.translate(offset);
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
        self.target += offset;
    }

    /// Applies the damped share of any pending rotation around the target.
    pub fn update(&mut self) {
        if self.pending_rotation.length_squared() < 1e-12 {
            self.pending_rotation = Vec2::ZERO;
            return;
        }
        let factor = if self.damping_factor > 0.0 {
            self.damping_factor
        } else {
            1.0
        };
        let offset = self.position - self.target;
        let radius = offset.length();
        if radius > f32::EPSILON {
            let theta = offset.x.atan2(offset.z) + self.pending_rotation.x * factor;
            let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos()
                + self.pending_rotation.y * factor)
                .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
            let (sin_phi, cos_phi) = phi.sin_cos();
            let (sin_theta, cos_theta) = theta.sin_cos();
            self.position = self.target
                + Vec3::new(sin_phi * sin_theta, cos_phi, sin_phi * cos_theta) * radius;
        }
        self.pending_rotation *= 1.0 - factor;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            self.aspect.max(0.01),
            self.near,
            self.far,
        )
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Converts a pixel position to normalized device coordinates (y up).
    pub fn screen_to_ndc(position: Vec2, viewport: (u32, u32)) -> Vec2 {
        let width = viewport.0.max(1) as f32;
        let height = viewport.1.max(1) as f32;
        Vec2::new(
            position.x / width * 2.0 - 1.0,
            -(position.y / height) * 2.0 + 1.0,
        )
    }

    /// Ray from the eye through the given NDC point.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_proj().inverse();
        let through = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.5));
        Ray::new(self.position, through - self.position)
    }
}
