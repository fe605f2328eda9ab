//! Tunable constants for the interaction layer.
//!
//! The defaults reproduce the feel of the hand-tuned browser demo; none of them
//! are invariants, so every value can be overridden from the scene file.

use crate::input::{KeyCode, NamedKey};

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionConfig {
    /// Velocity multiplier applied once per frame.
    pub zoom_friction: f32,
    /// Wheel delta to velocity factor.
    pub zoom_sensitivity: f32,
    pub zoom_max_velocity: f32,
    /// Velocities below this magnitude snap to zero.
    pub zoom_epsilon: f32,
    /// Closest the camera may come to its target.
    pub zoom_min_distance: f32,
    /// Wheel events closer together than this count as fast scrolling.
    pub fast_scroll_threshold_ms: f64,
    pub fast_scroll_multiplier: f32,
    /// Extra factor applied to pinch distance deltas before `zoom_sensitivity`.
    pub pinch_scale: f32,
    /// World units moved per pixel of two-finger pan.
    pub touch_pan_sensitivity: f32,
    pub double_click_ms: f64,
    /// Pointer travel (in pixels) beyond which a press is a drag, not a click.
    pub click_drag_tolerance_px: f32,
    pub focus_duration_s: f32,
    pub bounce_duration_s: f32,
    pub bounce_jump_height: f32,
    pub bounce_frequency: f32,
    pub bounce_rebound_height: f32,
    pub orbit_damping_factor: f32,
    pub orbit_rotate_speed: f32,
    pub orbit_pan_speed: f32,
    pub recenter_key: KeyCode,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            zoom_friction: 0.9,
            zoom_sensitivity: 0.0005,
            zoom_max_velocity: 0.5,
            zoom_epsilon: 0.001,
            zoom_min_distance: 0.1,
            fast_scroll_threshold_ms: 50.0,
            fast_scroll_multiplier: 2.0,
            pinch_scale: 1.8,
            touch_pan_sensitivity: 0.003,
            double_click_ms: 200.0,
            click_drag_tolerance_px: 5.0,
            focus_duration_s: 1.5,
            bounce_duration_s: 1.5,
            bounce_jump_height: 1.5,
            bounce_frequency: 8.0,
            bounce_rebound_height: 0.3,
            orbit_damping_factor: 0.05,
            orbit_rotate_speed: 1.0,
            orbit_pan_speed: 1.0,
            recenter_key: KeyCode::Named(NamedKey::Space),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuned_demo_values() {
        let config = InteractionConfig::default();
        assert_eq!(config.zoom_friction, 0.9);
        assert_eq!(config.zoom_max_velocity, 0.5);
        assert_eq!(config.double_click_ms, 200.0);
        assert_eq!(config.focus_duration_s, 1.5);
        assert_eq!(config.recenter_key, KeyCode::Named(NamedKey::Space));
    }
}
