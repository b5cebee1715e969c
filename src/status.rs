//! Low-priority status task.
//!
//! Drains the pipeline log streams and writes them, plus a periodic
//! heartbeat with the pipeline counters, to the diagnostics sink.
//!
//! # Hardware Setup
//!
//! ```text
//! ESP32 UART1 TX ──────▶ USB-UART RX
//!                          └─▶ PC Serial Monitor
//! ```
//!
//! Protocol lines go to the console port instead; the two never share a
//! sink, so a serial client decoding Morse never sees a log line.

use crate::hal::{Clock, Delay, LineSink};
use crate::logging::{format_log_entry, format_to_buffer, LogStream, MAX_LINE_LEN};
use crate::stats::{ClassifierStatsCell, EncoderStatsCell};

/// Sleep between drain passes.
pub const STATUS_POLL_MS: u32 = 50;

/// Log drain and heartbeat.
pub struct StatusTask<'a, S, C> {
    sink: S,
    clock: C,
    streams: &'a [&'a LogStream],
    classifier: &'a ClassifierStatsCell,
    encoder: &'a EncoderStatsCell,
    heartbeat_ms: u32,
    last_heartbeat: Option<u32>,
    buf: [u8; MAX_LINE_LEN],
}

impl<'a, S: LineSink, C: Clock> StatusTask<'a, S, C> {
    pub fn new(
        sink: S,
        clock: C,
        streams: &'a [&'a LogStream],
        classifier: &'a ClassifierStatsCell,
        encoder: &'a EncoderStatsCell,
        heartbeat_ms: u32,
    ) -> Self {
        Self {
            sink,
            clock,
            streams,
            classifier,
            encoder,
            heartbeat_ms,
            last_heartbeat: None,
            buf: [0u8; MAX_LINE_LEN],
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// One drain pass. Returns the number of lines written.
    pub fn step(&mut self) -> usize {
        let mut written = 0;

        // Streams in priority order
        for stream in self.streams {
            while let Some(entry) = stream.drain() {
                let len = format_log_entry(stream.source(), &entry, &mut self.buf);
                self.sink.emit_line(&self.buf[..len]);
                written += 1;
            }
        }

        let now = self.clock.now_ms();
        let due = match self.last_heartbeat {
            Some(last) => now.wrapping_sub(last) >= self.heartbeat_ms,
            None => true,
        };
        if due {
            self.heartbeat(now);
            self.last_heartbeat = Some(now);
            written += 1;
        }

        written
    }

    /// Drain forever.
    pub fn run<D: Delay>(&mut self, delay: &mut D) -> ! {
        loop {
            self.step();
            delay.delay_ms(STATUS_POLL_MS);
        }
    }

    fn heartbeat(&mut self, now: u32) {
        let c = self.classifier.snapshot();
        let e = self.encoder.snapshot();
        let dropped_logs: u32 = self.streams.iter().map(|s| s.take_dropped()).sum();

        let len = format_to_buffer(
            &mut self.buf,
            format_args!(
                "[{:10}] alive ticks={} miss={} sym={} lines={} trunc={} drop={} wait={} logdrop={}\n",
                now,
                c.ticks,
                c.sensor_misses,
                c.dots.wrapping_add(c.dashes),
                e.lines,
                e.truncated_lines,
                e.dropped_appends,
                c.backpressure_waits,
                dropped_logs
            ),
        );
        self.sink.emit_line(&self.buf[..len]);
    }
}
