//! Pipeline counters for MorseTilt.
//!
//! Nothing in the pipeline is fatal. Sensor misses, dropped appends and
//! producer waits degrade the output instead of halting it, and the only
//! place they become visible is here.
//!
//! Each component owns its plain counters. `StatsCell` is the atomic mirror
//! a task publishes into so the status task can read a snapshot without
//! touching component state.

use core::sync::atomic::{AtomicU32, Ordering};

/// Classifier counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassifierStats {
    /// Sampling ticks run.
    pub ticks: u32,
    /// Ticks where the sensor returned nothing.
    pub sensor_misses: u32,
    pub dots: u32,
    pub dashes: u32,
    pub gaps_letter: u32,
    pub gaps_word: u32,
    pub ends: u32,
    /// Releases whose press count mapped to no event.
    pub ignored_gestures: u32,
    /// Presses beyond 3 in one gesture.
    pub clamped_presses: u32,
    /// Sends that found the channel full.
    pub backpressure_waits: u32,
}

/// Encoder counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncoderStats {
    /// Events applied.
    pub events: u32,
    /// Lines flushed to the sink.
    pub lines: u32,
    /// Appends dropped for lack of room.
    pub dropped_appends: u32,
    /// Lines that lost at least one append.
    pub truncated_lines: u32,
}

/// Atomic mirror of one component's counters.
///
/// Single writer (the owning task), any number of readers.
pub struct StatsCell<const K: usize> {
    words: [AtomicU32; K],
}

impl<const K: usize> StatsCell<K> {
    pub const fn new() -> Self {
        Self {
            words: [const { AtomicU32::new(0) }; K],
        }
    }

    #[inline]
    fn store(&self, values: [u32; K]) {
        for (word, value) in self.words.iter().zip(values) {
            word.store(value, Ordering::Relaxed);
        }
    }

    #[inline]
    fn load(&self) -> [u32; K] {
        let mut out = [0u32; K];
        for (slot, word) in out.iter_mut().zip(&self.words) {
            *slot = word.load(Ordering::Relaxed);
        }
        out
    }
}

impl<const K: usize> Default for StatsCell<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Mirror for `ClassifierStats`.
pub type ClassifierStatsCell = StatsCell<10>;

/// Mirror for `EncoderStats`.
pub type EncoderStatsCell = StatsCell<4>;

impl ClassifierStatsCell {
    /// Publish a snapshot.
    pub fn publish(&self, s: &ClassifierStats) {
        self.store([
            s.ticks,
            s.sensor_misses,
            s.dots,
            s.dashes,
            s.gaps_letter,
            s.gaps_word,
            s.ends,
            s.ignored_gestures,
            s.clamped_presses,
            s.backpressure_waits,
        ]);
    }

    /// Read the last published snapshot.
    pub fn snapshot(&self) -> ClassifierStats {
        let [ticks, sensor_misses, dots, dashes, gaps_letter, gaps_word, ends, ignored_gestures, clamped_presses, backpressure_waits] =
            self.load();
        ClassifierStats {
            ticks,
            sensor_misses,
            dots,
            dashes,
            gaps_letter,
            gaps_word,
            ends,
            ignored_gestures,
            clamped_presses,
            backpressure_waits,
        }
    }
}

impl EncoderStatsCell {
    /// Publish a snapshot.
    pub fn publish(&self, s: &EncoderStats) {
        self.store([s.events, s.lines, s.dropped_appends, s.truncated_lines]);
    }

    /// Read the last published snapshot.
    pub fn snapshot(&self) -> EncoderStats {
        let [events, lines, dropped_appends, truncated_lines] = self.load();
        EncoderStats {
            events,
            lines,
            dropped_appends,
            truncated_lines,
        }
    }
}
