//! GPIO HAL for the gesture button.
//!
//! `IsrButton` is the interrupt-side half: an edge ISR records the level,
//! the classifier task samples it on its next tick. Interrupt context only
//! stores atomics; no formatting, no channel waits.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::ButtonInput;

/// Edges closer than this to the last accepted edge are contact bounce.
pub const DEBOUNCE_MS: u32 = 25;

/// Button pin configuration.
#[derive(Clone, Copy, Debug)]
pub struct ButtonConfig {
    pub pin: i32,
    pub active_low: bool,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            pin: 0,
            active_low: true,
        }
    }
}

/// Debounced level latch written from interrupt context.
///
/// An edge is accepted only when it changes the level and arrives at least
/// `DEBOUNCE_MS` after the previous accepted edge. Rejected edges still
/// update the raw level; `settle` applies it once the contacts are quiet, so
/// a real edge swallowed by the lockout is not lost.
///
/// A press shorter than one sampling period would be lost by plain level
/// polling, so accepted press edges are also counted. `take_level` reports
/// pressed for one tick whenever a press edge arrived since the last tick,
/// even if the button is already released again.
pub struct IsrButton {
    level: AtomicBool,
    raw: AtomicBool,
    armed: AtomicBool,
    last_edge_ms: AtomicU32,
    press_edges: AtomicU32,
    seen_edges: AtomicU32,
    bounces: AtomicU32,
}

impl IsrButton {
    pub const fn new() -> Self {
        Self {
            level: AtomicBool::new(false),
            raw: AtomicBool::new(false),
            armed: AtomicBool::new(false),
            last_edge_ms: AtomicU32::new(0),
            press_edges: AtomicU32::new(0),
            seen_edges: AtomicU32::new(0),
            bounces: AtomicU32::new(0),
        }
    }

    /// Set the level read at boot. Not counted as a press edge.
    pub fn seed(&self, pressed: bool) {
        self.raw.store(pressed, Ordering::Relaxed);
        self.level.store(pressed, Ordering::Release);
    }

    /// Record a level change at `now_ms`. Safe to call from an ISR.
    #[inline]
    pub fn on_edge(&self, pressed: bool, now_ms: u32) {
        self.raw.store(pressed, Ordering::Relaxed);
        if self.in_lockout(now_ms) {
            self.bounces.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.accept(pressed, now_ms);
    }

    /// Apply a raw level left pending by the lockout, once it has expired.
    ///
    /// Called from the sampling task before each read.
    pub fn settle(&self, now_ms: u32) {
        if self.in_lockout(now_ms) {
            return;
        }
        self.accept(self.raw.load(Ordering::Relaxed), now_ms);
    }

    #[inline]
    fn in_lockout(&self, now_ms: u32) -> bool {
        self.armed.load(Ordering::Relaxed)
            && now_ms.wrapping_sub(self.last_edge_ms.load(Ordering::Relaxed)) < DEBOUNCE_MS
    }

    /// Take the transition to `pressed`; no-op if the level already matches.
    fn accept(&self, pressed: bool, now_ms: u32) {
        if self
            .level
            .compare_exchange(!pressed, pressed, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.last_edge_ms.store(now_ms, Ordering::Relaxed);
        self.armed.store(true, Ordering::Relaxed);
        if pressed {
            self.press_edges.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Current debounced level.
    #[inline]
    pub fn level(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }

    /// Level as seen by the sampling task, stretching short presses.
    #[inline]
    pub fn take_level(&self) -> bool {
        let level = self.level.load(Ordering::Acquire);
        let edges = self.press_edges.load(Ordering::Relaxed);
        let seen = self.seen_edges.swap(edges, Ordering::Relaxed);
        level || edges != seen
    }

    /// Accepted press edges since boot.
    #[inline]
    pub fn press_count(&self) -> u32 {
        self.press_edges.load(Ordering::Relaxed)
    }

    /// Edges rejected as bounce since boot.
    #[inline]
    pub fn bounce_count(&self) -> u32 {
        self.bounces.load(Ordering::Relaxed)
    }
}

impl Default for IsrButton {
    fn default() -> Self {
        Self::new()
    }
}

impl ButtonInput for &IsrButton {
    fn is_pressed(&mut self) -> bool {
        self.take_level()
    }
}
