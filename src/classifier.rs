//! Gesture classifier finite state machine.
//!
//! Pure logic, no hardware dependencies. Consumes one motion sample and
//! one button level per sampling tick, produces Morse events. Fully
//! testable on host.
//!
//! # Motion
//!
//! - Still (all axes near the at-rest pose): both tilt latches clear
//! - |x| over threshold, x-latch clear: **Dot**, latch x
//! - else |y| over threshold, y-latch clear: **Dash**, latch y
//!
//! A sustained tilt yields one symbol; it repeats only after a still tick.
//!
//! # Button
//!
//! Press edges are counted (clamped at 3). Once the button has stayed
//! released for the gesture window the count is interpreted:
//! 1 → **GapLetter**, 2 → **GapWord**, 3 → **EndMessage**.

use crate::config::PipelineConfig;
use crate::event::MorseEvent;
use crate::sample::MotionSample;
use crate::stats::ClassifierStats;

/// Highest press count a gesture can hold.
pub const MAX_PRESSES: u8 = 3;

/// Per-axis latches that suppress re-triggering while a tilt persists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TiltState {
    pub x_tilted: bool,
    pub y_tilted: bool,
}

impl TiltState {
    #[inline]
    pub fn clear(&mut self) {
        self.x_tilted = false;
        self.y_tilted = false;
    }
}

/// Press counter for the button gesture in progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonState {
    /// Level observed on the previous tick.
    pub pressed: bool,
    /// Press edges in the current gesture, 0..=3.
    pub count: u8,
    /// Timestamp of the last release while a count is pending.
    released_at: Option<u32>,
}

/// Events produced by one tick: at most one from motion, at most one from
/// the button. Motion is reported first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickEvents {
    pub motion: Option<MorseEvent>,
    pub button: Option<MorseEvent>,
}

impl TickEvents {
    pub const NONE: Self = Self {
        motion: None,
        button: None,
    };

    /// Events in emission order.
    pub fn iter(&self) -> impl Iterator<Item = MorseEvent> {
        self.motion.into_iter().chain(self.button)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.motion.is_none() && self.button.is_none()
    }
}

/// Gesture classifier.
///
/// # Example
///
/// ```
/// use morse_tilt_keyer::classifier::GestureClassifier;
/// use morse_tilt_keyer::config::PipelineConfig;
/// use morse_tilt_keyer::event::MorseEvent;
/// use morse_tilt_keyer::sample::MotionSample;
///
/// let mut classifier = GestureClassifier::new(PipelineConfig::default());
///
/// // Tilt along x
/// let tilt = MotionSample::from_accel(0.6, 0.0, 0.8);
/// let events = classifier.tick(0, Some(tilt), false);
/// assert_eq!(events.motion, Some(MorseEvent::Dot));
/// ```
pub struct GestureClassifier {
    config: PipelineConfig,
    tilt: TiltState,
    button: ButtonState,
    stats: ClassifierStats,
}

impl GestureClassifier {
    /// Create a new classifier with given configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            tilt: TiltState::default(),
            button: ButtonState::default(),
            stats: ClassifierStats::default(),
        }
    }

    /// Get current configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current tilt latches.
    pub fn tilt(&self) -> TiltState {
        self.tilt
    }

    /// Current press counter.
    pub fn press_count(&self) -> u8 {
        self.button.count
    }

    /// Counter snapshot.
    pub fn stats(&self) -> ClassifierStats {
        self.stats
    }

    /// Count a producer back-pressure wait reported by the task loop.
    pub fn note_backpressure(&mut self) {
        self.stats.backpressure_waits = self.stats.backpressure_waits.wrapping_add(1);
    }

    /// Run one sampling tick.
    ///
    /// # Arguments
    ///
    /// * `now_ms` - Monotonic milliseconds, only deltas are used
    /// * `sample` - Motion reading, `None` on a transient sensor miss
    /// * `pressed` - Debounced button level
    #[inline]
    pub fn tick(&mut self, now_ms: u32, sample: Option<MotionSample>, pressed: bool) -> TickEvents {
        self.stats.ticks = self.stats.ticks.wrapping_add(1);

        let motion = match sample {
            Some(sample) => self.classify_motion(&sample),
            None => {
                self.stats.sensor_misses = self.stats.sensor_misses.wrapping_add(1);
                None
            }
        };
        let button = self.classify_button(now_ms, pressed);

        let events = TickEvents { motion, button };
        for event in events.iter() {
            self.count(event);
        }
        events
    }

    /// Reset latches and any gesture in progress.
    pub fn reset(&mut self) {
        self.tilt.clear();
        self.button = ButtonState::default();
    }

    // --- Private methods ---

    fn classify_motion(&mut self, sample: &MotionSample) -> Option<MorseEvent> {
        if sample.is_still(self.config.gravity_ref, self.config.still_tolerance) {
            self.tilt.clear();
            return None;
        }

        let threshold = self.config.move_threshold;

        // x wins a simultaneous crossing
        if sample.x_exceeds(threshold) && !self.tilt.x_tilted {
            self.tilt.x_tilted = true;
            Some(MorseEvent::Dot)
        } else if sample.y_exceeds(threshold) && !self.tilt.y_tilted {
            self.tilt.y_tilted = true;
            Some(MorseEvent::Dash)
        } else {
            None
        }
    }

    fn classify_button(&mut self, now_ms: u32, pressed: bool) -> Option<MorseEvent> {
        let was_pressed = self.button.pressed;
        self.button.pressed = pressed;

        if pressed && !was_pressed {
            // Press edge: continue the gesture
            self.button.released_at = None;
            if self.button.count < MAX_PRESSES {
                self.button.count += 1;
            } else {
                self.stats.clamped_presses = self.stats.clamped_presses.wrapping_add(1);
            }
            return None;
        }

        if !pressed && was_pressed && self.button.count > 0 {
            self.button.released_at = Some(now_ms);
        }

        let released_at = self.button.released_at?;
        if now_ms.wrapping_sub(released_at) < self.config.gesture_window_ms {
            return None;
        }

        let count = self.button.count;
        self.button.count = 0;
        self.button.released_at = None;

        let event = MorseEvent::from_press_count(count);
        if event.is_none() {
            self.stats.ignored_gestures = self.stats.ignored_gestures.wrapping_add(1);
        }
        event
    }

    fn count(&mut self, event: MorseEvent) {
        let counter = match event {
            MorseEvent::Dot => &mut self.stats.dots,
            MorseEvent::Dash => &mut self.stats.dashes,
            MorseEvent::GapLetter => &mut self.stats.gaps_letter,
            MorseEvent::GapWord => &mut self.stats.gaps_word,
            MorseEvent::EndMessage => &mut self.stats.ends,
        };
        *counter = counter.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STILL: MotionSample = MotionSample::AT_REST;
    const TILT_X: MotionSample = MotionSample::from_accel(0.6, 0.0, 0.8);
    const TILT_Y: MotionSample = MotionSample::from_accel(0.0, -0.6, 0.8);
    const TILT_XY: MotionSample = MotionSample::from_accel(0.5, 0.5, 0.7);

    fn immediate() -> GestureClassifier {
        GestureClassifier::new(PipelineConfig::default().with_gesture_window(0))
    }

    #[test]
    fn test_single_dot() {
        let mut c = immediate();
        assert_eq!(c.tick(0, Some(TILT_X), false).motion, Some(MorseEvent::Dot));
        assert!(c.tilt().x_tilted);
    }

    #[test]
    fn test_single_dash() {
        let mut c = immediate();
        assert_eq!(c.tick(0, Some(TILT_Y), false).motion, Some(MorseEvent::Dash));
        assert!(c.tilt().y_tilted);
    }

    #[test]
    fn test_x_wins_tie() {
        let mut c = immediate();
        assert_eq!(c.tick(0, Some(TILT_XY), false).motion, Some(MorseEvent::Dot));
        // x latched, y still free: next tick reports the y crossing
        assert_eq!(c.tick(20, Some(TILT_XY), false).motion, Some(MorseEvent::Dash));
        assert_eq!(c.tick(40, Some(TILT_XY), false).motion, None);
    }

    #[test]
    fn test_sustained_tilt_latches() {
        let mut c = immediate();
        let dots = (0..50)
            .filter(|i| c.tick(i * 20, Some(TILT_X), false).motion.is_some())
            .count();
        assert_eq!(dots, 1);
    }

    #[test]
    fn test_still_tick_rearms() {
        let mut c = immediate();
        assert!(c.tick(0, Some(TILT_X), false).motion.is_some());
        assert!(c.tick(20, Some(STILL), false).motion.is_none());
        assert_eq!(c.tilt(), TiltState::default());
        assert_eq!(c.tick(40, Some(TILT_X), false).motion, Some(MorseEvent::Dot));
    }

    #[test]
    fn test_between_bands_keeps_latch() {
        let mut c = immediate();
        c.tick(0, Some(TILT_X), false);
        // Neither still nor over threshold
        let halfway = MotionSample::from_accel(0.2, 0.0, 0.95);
        assert!(c.tick(20, Some(halfway), false).motion.is_none());
        assert!(c.tick(40, Some(TILT_X), false).motion.is_none());
    }

    #[test]
    fn test_sensor_miss_skips_motion() {
        let mut c = immediate();
        assert!(c.tick(0, None, false).is_empty());
        assert_eq!(c.stats().sensor_misses, 1);
        assert_eq!(c.stats().ticks, 1);
    }

    #[test]
    fn test_single_press_is_letter_gap() {
        let mut c = immediate();
        assert!(c.tick(0, Some(STILL), true).is_empty());
        assert_eq!(c.press_count(), 1);
        assert_eq!(c.tick(20, Some(STILL), false).button, Some(MorseEvent::GapLetter));
        assert_eq!(c.press_count(), 0);
    }

    #[test]
    fn test_window_accumulates_presses() {
        let mut c = GestureClassifier::new(PipelineConfig::default().with_gesture_window(100));
        c.tick(0, None, true);
        assert!(c.tick(20, None, false).is_empty());
        c.tick(40, None, true);
        assert!(c.tick(60, None, false).is_empty());
        assert!(c.tick(140, None, false).is_empty());
        assert_eq!(c.tick(160, None, false).button, Some(MorseEvent::GapWord));
    }

    #[test]
    fn test_window_survives_clock_wrap() {
        let mut c = GestureClassifier::new(PipelineConfig::default().with_gesture_window(100));
        let t0 = u32::MAX - 30;
        c.tick(t0, None, true);
        c.tick(t0.wrapping_add(20), None, false);
        assert!(c.tick(t0.wrapping_add(60), None, false).is_empty());
        assert_eq!(
            c.tick(t0.wrapping_add(120), None, false).button,
            Some(MorseEvent::GapLetter)
        );
    }

    #[test]
    fn test_held_button_never_fires() {
        let mut c = immediate();
        for i in 0..20 {
            assert!(c.tick(i * 20, None, true).is_empty());
        }
        assert_eq!(c.press_count(), 1);
    }

    #[test]
    fn test_motion_and_button_same_tick() {
        let mut c = immediate();
        c.tick(0, Some(STILL), true);
        let events = c.tick(20, Some(TILT_Y), false);
        assert_eq!(
            events.iter().collect::<Vec<_>>(),
            vec![MorseEvent::Dash, MorseEvent::GapLetter]
        );
    }
}
