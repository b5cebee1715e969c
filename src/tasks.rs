//! Pipeline tasks.
//!
//! Two loops connected only by the event channel:
//!
//! ```text
//! sensor ─┐
//! button ─┼─▶ ClassifierTask ──▶ EventChannel ──▶ EncoderTask ──▶ LineSink
//! clock  ─┘    (periodic)                          (blocks on recv)
//! ```
//!
//! Each task owns its state outright; the classifier never sees the output
//! buffer and the encoder never sees tilt or button state. Blocking points:
//! the classifier sleeps between ticks and waits on a full channel, the
//! encoder waits on an empty one. Nothing else blocks.

use crate::channel::{EventConsumer, EventProducer};
use crate::classifier::{GestureClassifier, TickEvents};
use crate::config::{PipelineConfig, EVENT_CHANNEL_CAPACITY, OUTPUT_BUFFER_CAPACITY};
use crate::encoder::MorseEncoder;
use crate::event::MorseEvent;
use crate::hal::{ButtonInput, Clock, Delay, LineSink, MotionSensor};
use crate::logging::LogStream;
use crate::stats::{ClassifierStatsCell, EncoderStatsCell};
use crate::{rt_debug, rt_info, rt_warn};

/// Sampling task: sensor + button → events.
pub struct ClassifierTask<'a, M, B, C, const N: usize = EVENT_CHANNEL_CAPACITY> {
    classifier: GestureClassifier,
    sensor: M,
    button: B,
    clock: C,
    events: EventProducer<'a, N>,
    log: &'a LogStream,
    stats: Option<&'a ClassifierStatsCell>,
}

impl<'a, M, B, C, const N: usize> ClassifierTask<'a, M, B, C, N>
where
    M: MotionSensor,
    B: ButtonInput,
    C: Clock,
{
    pub fn new(
        config: PipelineConfig,
        sensor: M,
        button: B,
        clock: C,
        events: EventProducer<'a, N>,
        log: &'a LogStream,
    ) -> Self {
        Self {
            classifier: GestureClassifier::new(config),
            sensor,
            button,
            clock,
            events,
            log,
            stats: None,
        }
    }

    /// Publish counters into `cell` after every tick.
    pub fn with_stats(mut self, cell: &'a ClassifierStatsCell) -> Self {
        self.stats = Some(cell);
        self
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }

    /// Run one sampling tick and queue whatever it produced.
    ///
    /// Waits on `delay` while the channel is full.
    pub fn step<D: Delay>(&mut self, delay: &mut D) -> TickEvents {
        let now = self.clock.now_ms();
        let sample = self.sensor.read_motion();
        let pressed = self.button.is_pressed();

        let events = self.classifier.tick(now, sample, pressed);
        for event in events.iter() {
            let waits = self.events.send(event, delay);
            if waits > 0 {
                self.classifier.note_backpressure();
                rt_warn!(self.log, now, "channel full, {} waited {} polls", event, waits);
            }
            rt_debug!(self.log, now, "emit {}", event);
        }

        if let Some(cell) = self.stats {
            cell.publish(&self.classifier.stats());
        }
        events
    }

    /// Sample forever at the configured period.
    pub fn run<D: Delay>(&mut self, delay: &mut D) -> ! {
        let period = self.classifier.config().sample_period_ms;
        rt_info!(self.log, self.clock.now_ms(), "sampling every {} ms", period);
        loop {
            self.step(delay);
            delay.delay_ms(period);
        }
    }
}

/// Formatting task: events → protocol lines.
pub struct EncoderTask<'a, S, C, const N: usize = EVENT_CHANNEL_CAPACITY, const CAP: usize = OUTPUT_BUFFER_CAPACITY> {
    encoder: MorseEncoder<CAP>,
    events: EventConsumer<'a, N>,
    sink: S,
    clock: C,
    log: &'a LogStream,
    stats: Option<&'a EncoderStatsCell>,
}

impl<'a, S, C, const N: usize, const CAP: usize> EncoderTask<'a, S, C, N, CAP>
where
    S: LineSink,
    C: Clock,
{
    pub fn new(events: EventConsumer<'a, N>, sink: S, clock: C, log: &'a LogStream) -> Self {
        Self {
            encoder: MorseEncoder::new(),
            events,
            sink,
            clock,
            log,
            stats: None,
        }
    }

    /// Publish counters into `cell` after every event.
    pub fn with_stats(mut self, cell: &'a EncoderStatsCell) -> Self {
        self.stats = Some(cell);
        self
    }

    pub fn encoder(&self) -> &MorseEncoder<CAP> {
        &self.encoder
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Wait for the next event and apply it.
    pub fn step<D: Delay>(&mut self, delay: &mut D) -> MorseEvent {
        let event = self.events.recv(delay);
        self.apply(event);
        event
    }

    /// Apply the next event if one is queued.
    pub fn poll(&mut self) -> Option<MorseEvent> {
        let event = self.events.try_recv().ok()?;
        self.apply(event);
        Some(event)
    }

    /// Consume events forever.
    pub fn run<D: Delay>(&mut self, delay: &mut D) -> ! {
        rt_info!(self.log, self.clock.now_ms(), "encoder ready, line capacity {}", CAP);
        loop {
            self.step(delay);
        }
    }

    fn apply(&mut self, event: MorseEvent) {
        let before = self.encoder.stats();

        if self.encoder.apply(event, &mut self.sink) {
            let after = self.encoder.stats();
            let now = self.clock.now_ms();
            if after.truncated_lines != before.truncated_lines {
                rt_warn!(
                    self.log,
                    now,
                    "line {} truncated, {} appends dropped so far",
                    after.lines,
                    after.dropped_appends
                );
            } else {
                rt_info!(self.log, now, "line {} flushed", after.lines);
            }
        }

        if let Some(cell) = self.stats {
            cell.publish(&self.encoder.stats());
        }
    }
}
