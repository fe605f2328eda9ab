use glam::Vec3;

use crate::camera::OrbitCamera;
use crate::config::InteractionConfig;

/// Wheel and pinch zoom with momentum.
///
/// Input only feeds `velocity`; the camera moves in [`MomentumZoom::update`],
/// once per frame, and the velocity decays geometrically by `friction`.
#[derive(Debug, Clone)]
pub struct MomentumZoom {
    velocity: f32,
    friction: f32,
    sensitivity: f32,
    max_velocity: f32,
    epsilon: f32,
    min_distance: f32,
    fast_scroll_threshold_ms: f64,
    fast_scroll_multiplier: f32,
    pinch_scale: f32,
    last_wheel_ms: Option<f64>,
}

impl MomentumZoom {
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            velocity: 0.0,
            friction: config.zoom_friction,
            sensitivity: config.zoom_sensitivity,
            max_velocity: config.zoom_max_velocity.abs(),
            epsilon: config.zoom_epsilon,
            min_distance: config.zoom_min_distance.max(0.0),
            fast_scroll_threshold_ms: config.fast_scroll_threshold_ms,
            fast_scroll_multiplier: config.fast_scroll_multiplier,
            pinch_scale: config.pinch_scale,
            last_wheel_ms: None,
        }
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn is_moving(&self) -> bool {
        self.velocity != 0.0
    }

    pub fn on_wheel_delta(&mut self, delta_y: f32, now_ms: f64) {
        let mut impulse = delta_y * self.sensitivity;
        let since_last = self.last_wheel_ms.map(|last| now_ms - last);
        if let Some(elapsed) = since_last.filter(|elapsed| elapsed.is_finite()) {
            if elapsed.max(0.0) < self.fast_scroll_threshold_ms {
                impulse *= self.fast_scroll_multiplier;
            }
        }
        self.last_wheel_ms = Some(now_ms);
        self.inject(impulse);
    }

    /// `distance_delta` is the previous finger distance minus the current one.
    pub fn on_pinch_delta(&mut self, distance_delta: f32, _now_ms: f64) {
        self.inject(distance_delta * self.pinch_scale * self.sensitivity);
    }

    /// Moves the camera along its viewing axis, then applies friction.
    pub fn update(&mut self, camera: &mut OrbitCamera) {
        if self.velocity.abs() <= self.epsilon {
            self.velocity = 0.0;
            return;
        }
        let offset = camera.position - camera.target;
        let direction = offset.try_normalize().unwrap_or(Vec3::Z);
        let distance = (offset.length() + self.velocity).max(self.min_distance);
        camera.position = camera.target + direction * distance;
        self.velocity *= self.friction;
        if self.velocity.abs() < self.epsilon {
            self.velocity = 0.0;
        }
    }

    fn inject(&mut self, impulse: f32) {
        if !impulse.is_finite() {
            return;
        }
        self.velocity = (self.velocity + impulse).clamp(-self.max_velocity, self.max_velocity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at(distance: f32) -> OrbitCamera {
        let mut camera = OrbitCamera::new(Vec3::new(0.0, 0.0, distance), Vec3::ZERO, 75.0);
        camera.aspect = 1.0;
        camera
    }

    #[test]
    fn velocity_is_clamped_after_every_impulse() {
        let mut zoom = MomentumZoom::new(&InteractionConfig::default());
        for step in 0..20 {
            zoom.on_wheel_delta(5_000.0, step as f64 * 10.0);
            assert!(zoom.velocity() <= 0.5);
        }
        assert_eq!(zoom.velocity(), 0.5);
        for step in 0..20 {
            zoom.on_pinch_delta(-10_000.0, 1_000.0 + step as f64);
            assert!(zoom.velocity() >= -0.5);
        }
        assert_eq!(zoom.velocity(), -0.5);
    }

    #[test]
    fn fast_scrolling_doubles_the_impulse() {
        let mut zoom = MomentumZoom::new(&InteractionConfig::default());
        zoom.on_wheel_delta(100.0, 1_000.0);
        let first = zoom.velocity();
        assert!((first - 0.05).abs() < 1e-6);
        zoom.on_wheel_delta(100.0, 1_020.0);
        assert!((zoom.velocity() - first - 0.1).abs() < 1e-6);
        zoom.on_wheel_delta(100.0, 1_200.0);
        assert!((zoom.velocity() - first - 0.15).abs() < 1e-6);
    }

    #[test]
    fn velocity_decays_geometrically_and_snaps_to_zero() {
        let mut config = InteractionConfig::default();
        config.zoom_sensitivity = 1.0;
        let mut zoom = MomentumZoom::new(&config);
        zoom.on_wheel_delta(0.4, 0.0);
        let mut camera = camera_at(10.0);

        let mut expected = 0.4f32;
        let mut frames = 0;
        while zoom.is_moving() {
            zoom.update(&mut camera);
            expected *= 0.9;
            frames += 1;
            if expected.abs() >= 0.001 {
                assert!((zoom.velocity() - expected).abs() < 1e-5);
            } else {
                assert_eq!(zoom.velocity(), 0.0);
            }
            assert!(frames < 200);
        }
        // 0.4 * 0.9^n < 0.001 first holds at n = 57.
        assert_eq!(frames, 57);
    }

    #[test]
    fn update_moves_before_decaying() {
        let mut config = InteractionConfig::default();
        config.zoom_sensitivity = 1.0;
        let mut zoom = MomentumZoom::new(&config);
        zoom.on_wheel_delta(0.4, 0.0);
        let mut camera = camera_at(10.0);
        zoom.update(&mut camera);
        assert!((camera.position.z - 10.4).abs() < 1e-5);
        zoom.update(&mut camera);
        assert!((camera.position.z - 10.76).abs() < 1e-5);
    }

    #[test]
    fn spreading_fingers_zooms_in() {
        let mut zoom = MomentumZoom::new(&InteractionConfig::default());
        zoom.on_pinch_delta(-50.0, 0.0);
        assert!(zoom.velocity() < 0.0);
        let mut camera = camera_at(5.0);
        zoom.update(&mut camera);
        assert!(camera.position.z < 5.0);
    }

    #[test]
    fn tiny_velocity_snaps_without_moving() {
        let mut zoom = MomentumZoom::new(&InteractionConfig::default());
        zoom.on_wheel_delta(1.0, 0.0);
        let mut camera = camera_at(3.0);
        zoom.update(&mut camera);
        assert_eq!(zoom.velocity(), 0.0);
        assert_eq!(camera.position.z, 3.0);
    }

    #[test]
    fn momentum_stops_short_of_the_target() {
        let mut config = InteractionConfig::default();
        config.zoom_sensitivity = 1.0;
        let mut zoom = MomentumZoom::new(&config);
        zoom.on_wheel_delta(-0.5, 0.0);
        let mut camera = camera_at(0.3);
        for _ in 0..10 {
            zoom.update(&mut camera);
        }
        assert!((camera.distance() - 0.1).abs() < 1e-6);
        assert_eq!(camera.position.x, 0.0);
    }

    #[test]
    fn camera_sitting_on_its_target_can_still_zoom_out() {
        let mut config = InteractionConfig::default();
        config.zoom_sensitivity = 1.0;
        let mut zoom = MomentumZoom::new(&config);
        zoom.on_wheel_delta(0.4, 0.0);
        let mut camera = camera_at(0.0);
        zoom.update(&mut camera);
        assert!(camera.distance() > 0.39);
        assert!(camera.position.is_finite());
    }
}
