use glam::Vec3;

/// Ease-out cubic: fast start, slow finish.
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// A running look-at target transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusTransition {
    pub start_ms: f64,
    pub duration_s: f32,
    pub start_target: Vec3,
    pub end_target: Vec3,
}

impl FocusTransition {
    /// Linear progress in `[0, 1]`; non-finite elapsed times count as zero.
    pub fn progress(&self, now_ms: f64) -> f32 {
        let elapsed = now_ms - self.start_ms;
        let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
        let duration_ms = f64::from(self.duration_s) * 1000.0;
        if duration_ms <= 0.0 {
            return 1.0;
        }
        (elapsed / duration_ms).clamp(0.0, 1.0) as f32
    }
}

/// Eases the camera target towards a new focus point.
#[derive(Debug, Clone)]
pub struct FocusAnimator {
    duration_s: f32,
    transition: Option<FocusTransition>,
}

impl FocusAnimator {
    pub fn new(duration_s: f32) -> Self {
        Self {
            duration_s,
            transition: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.transition.is_some()
    }

    pub fn transition(&self) -> Option<&FocusTransition> {
        self.transition.as_ref()
    }

    /// Starts (or restarts) a transition from `current_target` to `end_target`.
    pub fn start(&mut self, end_target: Vec3, current_target: Vec3, now_ms: f64) {
        self.transition = Some(FocusTransition {
            start_ms: now_ms,
            duration_s: self.duration_s,
            start_target: current_target,
            end_target,
        });
    }

    /// Returns the look-at target for `now_ms`, or `None` when idle.
    ///
    /// The final frame returns exactly `end_target` and ends the transition.
    pub fn update(&mut self, now_ms: f64) -> Option<Vec3> {
        let transition = self.transition?;
        let progress = transition.progress(now_ms);
        if progress >= 1.0 {
            self.transition = None;
            return Some(transition.end_target);
        }
        let eased = ease_out_cubic(progress);
        Some(
            transition
                .start_target
                .lerp(transition.end_target, eased),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-6);
    }

    #[test]
    fn transition_runs_from_start_to_exact_end() {
        let mut animator = FocusAnimator::new(1.5);
        let end = Vec3::new(5.0, 0.0, 0.0);
        animator.start(end, Vec3::ZERO, 10_000.0);
        assert_eq!(animator.update(10_000.0), Some(Vec3::ZERO));
        assert!(animator.is_active());

        let halfway = animator.update(10_750.0).unwrap();
        assert!((halfway.x - 4.375).abs() < 1e-5);

        assert_eq!(animator.update(11_500.0), Some(end));
        assert!(!animator.is_active());
        assert_eq!(animator.update(11_516.0), None);
    }

    #[test]
    fn restarting_captures_the_current_target() {
        let mut animator = FocusAnimator::new(1.5);
        animator.start(Vec3::X * 4.0, Vec3::ZERO, 0.0);
        let midway = animator.update(750.0).unwrap();
        animator.start(Vec3::ZERO, midway, 750.0);
        let transition = animator.transition().unwrap();
        assert_eq!(transition.start_target, midway);
        assert_eq!(transition.start_ms, 750.0);
    }

    #[test]
    fn clock_going_backwards_holds_the_start() {
        let mut animator = FocusAnimator::new(1.5);
        animator.start(Vec3::ONE, Vec3::ZERO, 1_000.0);
        assert_eq!(animator.update(500.0), Some(Vec3::ZERO));
        assert_eq!(animator.update(f64::NAN), Some(Vec3::ZERO));
    }
}
