//! Click and touch gesture classification.
//!
//! Nothing in here renders or touches the camera; the classifiers only turn raw
//! pointer traffic into higher level gestures for the viewer to act on.

use std::collections::BTreeMap;

use glam::Vec2;

/// Outcome of click disambiguation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickEvent {
    Single(Vec2),
    Double(Vec2),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClickPhase {
    Idle,
    Armed { deadline_ms: f64, position: Vec2 },
}

/// Two-state machine separating single clicks from double clicks.
///
/// A click arms a deadline. A second click before the deadline cancels the
/// pending single click and reports a double click instead; otherwise
/// [`ClickClassifier::poll`] reports the single click once the deadline passes.
#[derive(Debug, Clone)]
pub struct ClickClassifier {
    delay_ms: f64,
    phase: ClickPhase,
}

impl ClickClassifier {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms: delay_ms.max(0.0),
            phase: ClickPhase::Idle,
        }
    }

    pub fn on_click(&mut self, position: Vec2, now_ms: f64) -> Option<ClickEvent> {
        match self.phase {
            ClickPhase::Armed { deadline_ms, .. } if now_ms < deadline_ms => {
                self.phase = ClickPhase::Idle;
                Some(ClickEvent::Double(position))
            }
            ClickPhase::Armed {
                position: expired, ..
            } => {
                // The earlier click outlived its window without being polled.
                self.arm(position, now_ms);
                Some(ClickEvent::Single(expired))
            }
            ClickPhase::Idle => {
                self.arm(position, now_ms);
                None
            }
        }
    }

    pub fn poll(&mut self, now_ms: f64) -> Option<ClickEvent> {
        match self.phase {
            ClickPhase::Armed {
                deadline_ms,
                position,
            } if now_ms >= deadline_ms => {
                self.phase = ClickPhase::Idle;
                Some(ClickEvent::Single(position))
            }
            _ => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.phase, ClickPhase::Armed { .. })
    }

    fn arm(&mut self, position: Vec2, now_ms: f64) {
        self.phase = ClickPhase::Armed {
            deadline_ms: now_ms + self.delay_ms,
            position,
        };
    }
}

/// Gesture deltas produced by a single touch event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TouchOutput {
    /// Previous pinch distance minus the current one; positive when fingers close.
    pub pinch_delta: Option<f32>,
    /// Midpoint movement of a two-finger pan.
    pub pan_delta: Option<Vec2>,
    /// One-finger drag, forwarded to orbit rotation.
    pub rotate_delta: Option<Vec2>,
    /// A one-finger tap at this position.
    pub tap: Option<Vec2>,
}

/// Tracks active touch contacts and classifies them by arity.
#[derive(Debug, Clone)]
pub struct TouchTracker {
    contacts: BTreeMap<u64, Vec2>,
    last_pinch_distance: Option<f32>,
    last_pan_midpoint: Option<Vec2>,
    tap_origin: Option<(u64, Vec2)>,
    tap_tolerance: f32,
}

impl TouchTracker {
    pub fn new(tap_tolerance: f32) -> Self {
        Self {
            contacts: BTreeMap::new(),
            last_pinch_distance: None,
            last_pan_midpoint: None,
            tap_origin: None,
            tap_tolerance,
        }
    }

    pub fn arity(&self) -> usize {
        self.contacts.len()
    }

    /// True while a two-finger gesture owns panning.
    pub fn is_multi_touch(&self) -> bool {
        self.contacts.len() >= 2
    }

    pub fn touch_start(&mut self, id: u64, position: Vec2) -> TouchOutput {
        self.contacts.insert(id, position);
        match self.contacts.len() {
            1 => self.tap_origin = Some((id, position)),
            2 => {
                self.tap_origin = None;
                self.seed_pair();
            }
            _ => self.tap_origin = None,
        }
        TouchOutput::default()
    }

    pub fn touch_move(&mut self, id: u64, position: Vec2) -> TouchOutput {
        let Some(previous) = self.contacts.insert(id, position) else {
            return TouchOutput::default();
        };
        let mut output = TouchOutput::default();
        match self.contacts.len() {
            1 => {
                output.rotate_delta = Some(position - previous);
                if let Some((_, origin)) = self.tap_origin {
                    if origin.distance(position) > self.tap_tolerance {
                        self.tap_origin = None;
                    }
                }
            }
            2 => {
                if let Some((a, b)) = self.pair() {
                    let distance = a.distance(b);
                    let midpoint = (a + b) * 0.5;
                    if let Some(last) = self.last_pinch_distance.filter(|d| *d > 0.0) {
                        output.pinch_delta = Some(last - distance);
                    }
                    if let Some(last) = self.last_pan_midpoint {
                        output.pan_delta = Some(midpoint - last);
                    }
                    self.last_pinch_distance = Some(distance);
                    self.last_pan_midpoint = Some(midpoint);
                }
            }
            _ => {}
        }
        output
    }

    pub fn touch_end(&mut self, id: u64) -> TouchOutput {
        let Some(position) = self.contacts.remove(&id) else {
            return TouchOutput::default();
        };
        let mut output = TouchOutput::default();
        match self.contacts.len() {
            // The surviving pair may differ from the one last measured.
            2 => self.seed_pair(),
            0 | 1 => {
                self.last_pinch_distance = None;
                self.last_pan_midpoint = None;
            }
            _ => {}
        }
        if let Some((tap_id, _)) = self.tap_origin {
            if tap_id == id && self.contacts.is_empty() {
                output.tap = Some(position);
            }
        }
        if self.contacts.is_empty() {
            self.tap_origin = None;
        }
        output
    }

    fn seed_pair(&mut self) {
        if let Some((a, b)) = self.pair() {
            self.last_pinch_distance = Some(a.distance(b));
            self.last_pan_midpoint = Some((a + b) * 0.5);
        }
    }

    fn pair(&self) -> Option<(Vec2, Vec2)> {
        let mut points = self.contacts.values().copied();
        Some((points.next()?, points.next()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_quick_clicks_are_one_double_click() {
        let mut classifier = ClickClassifier::new(200.0);
        let point = Vec2::new(10.0, 20.0);
        assert_eq!(classifier.on_click(point, 1_000.0), None);
        assert_eq!(
            classifier.on_click(point, 1_100.0),
            Some(ClickEvent::Double(point))
        );
        assert_eq!(classifier.poll(1_500.0), None);
        assert!(!classifier.is_armed());
    }

    #[test]
    fn slow_clicks_are_two_single_clicks() {
        let mut classifier = ClickClassifier::new(200.0);
        let point = Vec2::new(3.0, 4.0);
        let mut events = Vec::new();
        events.extend(classifier.on_click(point, 0.0));
        events.extend(classifier.poll(16.0));
        events.extend(classifier.poll(200.0));
        events.extend(classifier.on_click(point, 300.0));
        events.extend(classifier.poll(500.0));
        assert_eq!(
            events,
            vec![ClickEvent::Single(point), ClickEvent::Single(point)]
        );
    }

    #[test]
    fn expired_click_flushes_when_next_click_arrives() {
        let mut classifier = ClickClassifier::new(200.0);
        let first = Vec2::new(1.0, 1.0);
        let second = Vec2::new(2.0, 2.0);
        classifier.on_click(first, 0.0);
        assert_eq!(
            classifier.on_click(second, 300.0),
            Some(ClickEvent::Single(first))
        );
        assert_eq!(classifier.poll(500.0), Some(ClickEvent::Single(second)));
    }

    #[test]
    fn third_click_after_double_starts_a_new_cycle() {
        let mut classifier = ClickClassifier::new(200.0);
        let point = Vec2::ZERO;
        classifier.on_click(point, 0.0);
        assert_eq!(classifier.on_click(point, 50.0), Some(ClickEvent::Double(point)));
        assert_eq!(classifier.on_click(point, 100.0), None);
        assert!(classifier.is_armed());
        assert_eq!(classifier.poll(300.0), Some(ClickEvent::Single(point)));
    }

    #[test]
    fn pinch_and_pan_need_two_contacts() {
        let mut tracker = TouchTracker::new(5.0);
        tracker.touch_start(1, Vec2::new(0.0, 0.0));
        let single = tracker.touch_move(1, Vec2::new(4.0, 0.0));
        assert_eq!(single.rotate_delta, Some(Vec2::new(4.0, 0.0)));
        assert_eq!(single.pinch_delta, None);

        tracker.touch_start(2, Vec2::new(104.0, 0.0));
        assert!(tracker.is_multi_touch());
        let spread = tracker.touch_move(2, Vec2::new(124.0, 0.0));
        assert_eq!(spread.pinch_delta, Some(-20.0));
        assert_eq!(spread.pan_delta, Some(Vec2::new(10.0, 0.0)));
        assert_eq!(spread.rotate_delta, None);
    }

    #[test]
    fn lifting_a_finger_resets_two_finger_state() {
        let mut tracker = TouchTracker::new(5.0);
        tracker.touch_start(1, Vec2::new(0.0, 0.0));
        tracker.touch_start(2, Vec2::new(10.0, 0.0));
        tracker.touch_end(2);
        assert!(!tracker.is_multi_touch());
        assert_eq!(tracker.last_pinch_distance, None);
        assert_eq!(tracker.last_pan_midpoint, None);

        tracker.touch_start(3, Vec2::new(50.0, 0.0));
        let output = tracker.touch_move(3, Vec2::new(60.0, 0.0));
        assert_eq!(output.pinch_delta, Some(-10.0));
    }

    #[test]
    fn lifting_the_third_finger_remeasures_the_remaining_pair() {
        let mut tracker = TouchTracker::new(5.0);
        tracker.touch_start(1, Vec2::new(0.0, 0.0));
        tracker.touch_start(2, Vec2::new(100.0, 0.0));
        tracker.touch_start(3, Vec2::new(500.0, 0.0));
        tracker.touch_end(1);
        assert_eq!(tracker.arity(), 2);

        let output = tracker.touch_move(3, Vec2::new(501.0, 0.0));
        assert_eq!(output.pinch_delta, Some(-1.0));
        assert_eq!(output.pan_delta, Some(Vec2::new(0.5, 0.0)));
    }

    #[test]
    fn short_single_touch_is_a_tap() {
        let mut tracker = TouchTracker::new(5.0);
        tracker.touch_start(7, Vec2::new(30.0, 30.0));
        tracker.touch_move(7, Vec2::new(32.0, 31.0));
        let output = tracker.touch_end(7);
        assert_eq!(output.tap, Some(Vec2::new(32.0, 31.0)));

        tracker.touch_start(8, Vec2::new(30.0, 30.0));
        tracker.touch_move(8, Vec2::new(60.0, 30.0));
        assert_eq!(tracker.touch_end(8).tap, None);
    }

    #[test]
    fn two_finger_contact_never_taps() {
        let mut tracker = TouchTracker::new(5.0);
        tracker.touch_start(1, Vec2::ZERO);
        tracker.touch_start(2, Vec2::new(10.0, 0.0));
        assert_eq!(tracker.touch_end(2).tap, None);
        assert_eq!(tracker.touch_end(1).tap, None);
    }
}
