//! Morse line encoder.
//!
//! Pure reducer over (buffer, event). Serializes the event stream into the
//! line protocol and hands each finished line to a `LineSink`.
//!
//! # Line protocol
//!
//! - `.` and `-` for symbols
//! - One space between letters, two between words
//! - Every line ends with exactly `"  \n"`, no carriage return
//! - No leading space, never three spaces in a row
//!
//! # Capacity
//!
//! Appends that would not leave room for the terminator are dropped, so a
//! flushed line never exceeds the buffer capacity and always terminates.

use crate::config::{OUTPUT_BUFFER_CAPACITY, TERMINATOR};
use crate::event::MorseEvent;
use crate::hal::LineSink;
use crate::stats::EncoderStats;

/// Fixed-capacity output buffer.
pub struct LineBuffer<const CAP: usize = OUTPUT_BUFFER_CAPACITY> {
    buf: [u8; CAP],
    len: usize,
}

impl<const CAP: usize> LineBuffer<CAP> {
    /// Create empty buffer
    pub const fn new() -> Self {
        Self {
            buf: [0u8; CAP],
            len: 0,
        }
    }

    /// Push a byte. Returns false, leaving the buffer unchanged, when full.
    #[inline]
    pub fn push(&mut self, c: u8) -> bool {
        if self.len < CAP {
            self.buf[self.len] = c;
            self.len += 1;
            true
        } else {
            false
        }
    }

    /// Last byte, if any.
    #[inline]
    pub fn tail(&self) -> Option<u8> {
        self.as_bytes().last().copied()
    }

    /// Trailing spaces, counted up to 2.
    #[inline]
    pub fn trailing_spaces(&self) -> usize {
        self.as_bytes()
            .iter()
            .rev()
            .take(2)
            .take_while(|&&b| b == b' ')
            .count()
    }

    /// Clear buffer
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Get buffer length
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free bytes.
    pub fn remaining(&self) -> usize {
        CAP - self.len
    }

    /// Get buffer capacity
    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Get buffer as string slice
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(self.as_bytes()).unwrap_or("")
    }
}

impl<const CAP: usize> Default for LineBuffer<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

/// Morse line encoder.
///
/// # Example
///
/// ```
/// use morse_tilt_keyer::encoder::MorseEncoder;
/// use morse_tilt_keyer::event::MorseEvent;
/// use morse_tilt_keyer::hal::LineSink;
///
/// struct Capture(Vec<u8>);
/// impl LineSink for Capture {
///     fn emit_line(&mut self, line: &[u8]) {
///         self.0.extend_from_slice(line);
///     }
/// }
///
/// let mut encoder: MorseEncoder = MorseEncoder::new();
/// let mut sink = Capture(Vec::new());
/// for ev in [MorseEvent::Dot, MorseEvent::Dash, MorseEvent::GapWord, MorseEvent::EndMessage] {
///     encoder.apply(ev, &mut sink);
/// }
/// assert_eq!(sink.0, b".-  \n");
/// ```
pub struct MorseEncoder<const CAP: usize = OUTPUT_BUFFER_CAPACITY> {
    line: LineBuffer<CAP>,
    truncated: bool,
    stats: EncoderStats,
}

impl<const CAP: usize> MorseEncoder<CAP> {
    /// Create an encoder with an empty buffer.
    pub const fn new() -> Self {
        assert!(CAP >= TERMINATOR.len(), "Buffer must hold the terminator");

        Self {
            line: LineBuffer::new(),
            truncated: false,
            stats: EncoderStats {
                events: 0,
                lines: 0,
                dropped_appends: 0,
                truncated_lines: 0,
            },
        }
    }

    /// Apply one event. On `EndMessage` the finished line is written to
    /// `sink` and the buffer is cleared.
    ///
    /// Returns true when a line was flushed.
    pub fn apply<S: LineSink>(&mut self, event: MorseEvent, sink: &mut S) -> bool {
        self.stats.events = self.stats.events.wrapping_add(1);

        match event {
            MorseEvent::Dot | MorseEvent::Dash => {
                if let Some(symbol) = event.symbol() {
                    self.append(symbol);
                }
            }
            MorseEvent::GapLetter => {
                // Idempotent: never leading, never doubled
                if matches!(self.line.tail(), Some(t) if t != b' ') {
                    self.append(b' ');
                }
            }
            MorseEvent::GapWord => {
                if !self.line.is_empty() {
                    while self.line.trailing_spaces() < 2 {
                        if !self.append(b' ') {
                            break;
                        }
                    }
                }
            }
            MorseEvent::EndMessage => {
                self.finish_line(sink);
                return true;
            }
        }
        false
    }

    /// Current buffer contents.
    pub fn pending(&self) -> &[u8] {
        self.line.as_bytes()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> EncoderStats {
        self.stats
    }

    // --- Private methods ---

    /// Append a content byte, keeping room for the rest of the terminator.
    fn append(&mut self, c: u8) -> bool {
        let trailing_after = if c == b' ' {
            (self.line.trailing_spaces() + 1).min(2)
        } else {
            0
        };
        let finish_after = (2 - trailing_after) + 1;

        if self.line.len() + 1 + finish_after <= CAP && self.line.push(c) {
            true
        } else {
            self.stats.dropped_appends = self.stats.dropped_appends.wrapping_add(1);
            self.truncated = true;
            false
        }
    }

    fn finish_line<S: LineSink>(&mut self, sink: &mut S) {
        // Exactly two trailing spaces, then newline
        while self.line.trailing_spaces() < 2 {
            if !self.line.push(b' ') {
                break;
            }
        }
        if !self.line.push(b'\n') {
            self.stats.dropped_appends = self.stats.dropped_appends.wrapping_add(1);
            self.truncated = true;
        }

        sink.emit_line(self.line.as_bytes());

        self.stats.lines = self.stats.lines.wrapping_add(1);
        if self.truncated {
            self.stats.truncated_lines = self.stats.truncated_lines.wrapping_add(1);
        }
        self.line.clear();
        self.truncated = false;
    }
}

impl<const CAP: usize> Default for MorseEncoder<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Lines(Vec<Vec<u8>>);

    impl LineSink for Lines {
        fn emit_line(&mut self, line: &[u8]) {
            self.0.push(line.to_vec());
        }
    }

    fn encode(events: &[MorseEvent]) -> Vec<Vec<u8>> {
        let mut encoder: MorseEncoder = MorseEncoder::new();
        let mut sink = Lines::default();
        for ev in events {
            encoder.apply(*ev, &mut sink);
        }
        sink.0
    }

    use MorseEvent::*;

    #[test]
    fn test_symbols_and_letter_gap() {
        assert_eq!(encode(&[Dot, Dash, GapLetter, Dot, EndMessage]), vec![b".- .  \n".to_vec()]);
    }

    #[test]
    fn test_leading_gaps_are_dropped() {
        assert_eq!(encode(&[GapLetter, GapWord, Dot, EndMessage]), vec![b".  \n".to_vec()]);
    }

    #[test]
    fn test_word_gap_after_letter_gap() {
        assert_eq!(
            encode(&[Dot, GapLetter, GapWord, Dash, EndMessage]),
            vec![b".  -  \n".to_vec()]
        );
    }

    #[test]
    fn test_letter_gap_after_word_gap() {
        assert_eq!(
            encode(&[Dot, GapWord, GapLetter, GapWord, Dash, EndMessage]),
            vec![b".  -  \n".to_vec()]
        );
    }

    #[test]
    fn test_buffer_cleared_after_flush() {
        let mut encoder: MorseEncoder = MorseEncoder::new();
        let mut sink = Lines::default();
        encoder.apply(Dot, &mut sink);
        assert!(encoder.apply(EndMessage, &mut sink));
        assert!(encoder.pending().is_empty());
        encoder.apply(Dash, &mut sink);
        encoder.apply(EndMessage, &mut sink);
        assert_eq!(sink.0, vec![b".  \n".to_vec(), b"-  \n".to_vec()]);
        assert_eq!(encoder.stats().lines, 2);
        assert_eq!(encoder.stats().events, 4);
    }

    #[test]
    fn test_small_buffer_keeps_terminator() {
        let mut encoder = MorseEncoder::<8>::new();
        let mut sink = Lines::default();
        for _ in 0..10 {
            encoder.apply(Dash, &mut sink);
        }
        encoder.apply(EndMessage, &mut sink);
        assert_eq!(sink.0, vec![b"-----  \n".to_vec()]);
        assert_eq!(encoder.stats().dropped_appends, 5);
        assert_eq!(encoder.stats().truncated_lines, 1);
    }

    #[test]
    fn test_word_gap_near_capacity() {
        let mut encoder = MorseEncoder::<6>::new();
        let mut sink = Lines::default();
        // "..." then word gap: only one space fits before the reserve
        for ev in [Dot, Dot, Dot, GapWord, EndMessage] {
            encoder.apply(ev, &mut sink);
        }
        assert_eq!(sink.0, vec![b"...  \n".to_vec()]);
        assert_eq!(encoder.stats().dropped_appends, 0);
    }

    #[test]
    fn test_line_buffer_trailing_spaces() {
        let mut line = LineBuffer::<8>::new();
        assert_eq!(line.trailing_spaces(), 0);
        line.push(b'.');
        line.push(b' ');
        assert_eq!(line.trailing_spaces(), 1);
        line.push(b' ');
        line.push(b' ');
        assert_eq!(line.trailing_spaces(), 2);
        assert_eq!(line.remaining(), 4);
    }
}
