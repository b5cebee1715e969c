//! End-to-end pipeline tests: scripted sensor and button through the
//! classifier task, the event channel and the encoder task.

use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;

use morse_tilt_keyer::channel::EventChannel;
use morse_tilt_keyer::config::PipelineConfig;
use morse_tilt_keyer::hal::{ButtonInput, Clock, Delay, LineSink, MotionSensor};
use morse_tilt_keyer::logging::LogStream;
use morse_tilt_keyer::sample::MotionSample;
use morse_tilt_keyer::stats::{ClassifierStatsCell, EncoderStatsCell};
use morse_tilt_keyer::tasks::{ClassifierTask, EncoderTask};

const PERIOD: u32 = 20;
const WINDOW: u32 = 100;

const STILL: MotionSample = MotionSample::AT_REST;
const TILT_X: MotionSample = MotionSample::from_accel(0.7, 0.0, 0.7);
const TILT_Y: MotionSample = MotionSample::from_accel(0.0, -0.7, 0.7);

// ============================================================================
// Test doubles
// ============================================================================

/// Replays motion readings, one per read, then reports at rest.
struct ScriptedMotion {
    frames: Vec<Option<MotionSample>>,
    next: usize,
}

impl MotionSensor for ScriptedMotion {
    fn read_motion(&mut self) -> Option<MotionSample> {
        let frame = self.frames.get(self.next).copied().unwrap_or(Some(STILL));
        self.next += 1;
        frame
    }
}

/// Replays button levels, one per read, then reports released.
struct ScriptedButton {
    levels: Vec<bool>,
    next: usize,
}

impl ButtonInput for ScriptedButton {
    fn is_pressed(&mut self) -> bool {
        let level = self.levels.get(self.next).copied().unwrap_or(false);
        self.next += 1;
        level
    }
}

/// Clock advanced by the test.
struct ManualClock(AtomicU32);

impl ManualClock {
    fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    fn advance(&self, ms: u32) {
        self.0.fetch_add(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

struct Yield;

impl Delay for Yield {
    fn delay_ms(&mut self, _ms: u32) {
        thread::yield_now();
    }
}

#[derive(Default)]
struct Lines(Vec<String>);

impl LineSink for Lines {
    fn emit_line(&mut self, line: &[u8]) {
        self.0.push(String::from_utf8(line.to_vec()).unwrap());
    }
}

/// Gesture script builder, one frame per sampling tick.
#[derive(Default)]
struct Script {
    motion: Vec<Option<MotionSample>>,
    button: Vec<bool>,
}

impl Script {
    fn frame(mut self, motion: Option<MotionSample>, pressed: bool) -> Self {
        self.motion.push(motion);
        self.button.push(pressed);
        self
    }

    fn dot(self) -> Self {
        self.frame(Some(TILT_X), false).frame(Some(STILL), false)
    }

    fn dash(self) -> Self {
        self.frame(Some(TILT_Y), false).frame(Some(STILL), false)
    }

    fn presses(mut self, n: usize) -> Self {
        for _ in 0..n {
            self = self.frame(Some(STILL), true).frame(Some(STILL), false);
        }
        for _ in 0..(WINDOW / PERIOD) + 1 {
            self = self.frame(Some(STILL), false);
        }
        self
    }

    fn letter_gap(self) -> Self {
        self.presses(1)
    }

    fn word_gap(self) -> Self {
        self.presses(2)
    }

    fn end(self) -> Self {
        self.presses(3)
    }

    fn len(&self) -> usize {
        self.motion.len()
    }
}

struct Outcome {
    lines: Vec<String>,
    classifier: ClassifierStatsCell,
    encoder: EncoderStatsCell,
}

/// Run a script through both tasks on two threads until `expected_lines`
/// lines have been flushed.
fn run_pipeline(script: Script, expected_lines: u32) -> Outcome {
    let channel: EventChannel = EventChannel::new();
    let (tx, rx) = channel.split().unwrap();
    let clock = ManualClock::new();
    let classifier_log = LogStream::new("classifier");
    let encoder_log = LogStream::new("encoder");
    let classifier_stats = ClassifierStatsCell::new();
    let encoder_stats = EncoderStatsCell::new();
    let ticks = script.len();

    let config = PipelineConfig::default().with_gesture_window(WINDOW);
    let sensor = ScriptedMotion {
        frames: script.motion,
        next: 0,
    };
    let button = ScriptedButton {
        levels: script.button,
        next: 0,
    };

    let lines = thread::scope(|s| {
        s.spawn(|| {
            let mut task = ClassifierTask::new(config, sensor, button, &clock, tx, &classifier_log)
                .with_stats(&classifier_stats);
            for _ in 0..ticks {
                task.step(&mut Yield);
                clock.advance(PERIOD);
            }
        });

        let encoder = s.spawn(|| {
            let mut task = EncoderTask::<_, _>::new(rx, Lines::default(), &clock, &encoder_log)
                .with_stats(&encoder_stats);
            while task.encoder().stats().lines < expected_lines {
                task.step(&mut Yield);
            }
            task.sink().0.clone()
        });

        encoder.join().unwrap()
    });

    Outcome {
        lines,
        classifier: classifier_stats,
        encoder: encoder_stats,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_demo_message() {
    let out = run_pipeline(Script::default().dot().dash().word_gap().end(), 1);
    assert_eq!(out.lines, vec![".-  \n"]);
}

#[test]
fn test_letters_and_words() {
    // "A N  E" in Morse symbols
    let script = Script::default()
        .dot()
        .dash()
        .letter_gap()
        .dash()
        .dot()
        .word_gap()
        .dot()
        .end();
    let out = run_pipeline(script, 1);
    assert_eq!(out.lines, vec![".- -.  .  \n"]);
}

#[test]
fn test_consecutive_messages() {
    let script = Script::default().dash().dash().end().dot().end().end();
    let out = run_pipeline(script, 3);
    assert_eq!(out.lines, vec!["--  \n", ".  \n", "  \n"]);
}

#[test]
fn test_leading_gaps_never_reach_output() {
    let script = Script::default().letter_gap().word_gap().dot().end();
    let out = run_pipeline(script, 1);
    assert_eq!(out.lines, vec![".  \n"]);
}

#[test]
fn test_sensor_misses_do_not_break_message() {
    let script = Script::default()
        .frame(None, false)
        .dot()
        .frame(None, false)
        .frame(None, false)
        .dash()
        .end();
    let out = run_pipeline(script, 1);

    assert_eq!(out.lines, vec![".-  \n"]);
    assert_eq!(out.classifier.snapshot().sensor_misses, 3);
}

#[test]
fn test_stats_published() {
    let script = Script::default().dot().dot().dash().letter_gap().end();
    let ticks = script.len() as u32;
    let out = run_pipeline(script, 1);

    let c = out.classifier.snapshot();
    assert_eq!(c.ticks, ticks);
    assert_eq!(c.dots, 2);
    assert_eq!(c.dashes, 1);
    assert_eq!(c.gaps_letter, 1);
    assert_eq!(c.ends, 1);

    let e = out.encoder.snapshot();
    assert_eq!(e.lines, 1);
    assert_eq!(e.events, 5);
    assert_eq!(e.truncated_lines, 0);
}
