//! Bounded lock-free SPSC (Single Producer, Single Consumer) event channel.
//!
//! All classifier output reaches the encoder through here.
//!
//! # Architecture
//!
//! ```text
//! Classifier ──────▶ EventChannel ──────▶ Encoder
//!  (producer)        (bounded FIFO)       (consumer)
//! ```
//!
//! # Rules
//!
//! - Events are delivered in the order produced, never reordered
//! - A full channel never drops: the producer waits for space
//! - Exactly one producer handle and one consumer handle exist
//! - Only atomic operations for synchronization

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::EVENT_CHANNEL_CAPACITY;
use crate::event::MorseEvent;
use crate::hal::Delay;

/// Poll interval while blocked on a full or empty channel.
pub const WAIT_POLL_MS: u32 = 1;

/// Error from `EventProducer::try_send`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrySendError {
    /// No free slot; the event is handed back.
    Full(MorseEvent),
}

/// Error from `EventConsumer::try_recv`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TryRecvError {
    /// Nothing queued.
    Empty,
}

/// Bounded FIFO of `MorseEvent`.
///
/// # Safety
///
/// Slots use `UnsafeCell` but access is sound because:
/// - `split()` hands out exactly one producer and one consumer
/// - The producer only writes slots in `[tail + len, tail + N)`
/// - The consumer only reads slots in `[tail, head)`
/// - Ownership of a slot changes hands via Release/Acquire on the indices
///
/// # Memory Ordering
///
/// - Producer stores `head` with `Release` after writing the slot
/// - Consumer loads `head` with `Acquire` before reading the slot
/// - Symmetrically for `tail` when a slot is freed
pub struct EventChannel<const N: usize = EVENT_CHANNEL_CAPACITY> {
    /// Ring of event slots.
    slots: [UnsafeCell<MorseEvent>; N],

    /// Next write index (monotonic, wraps via mask).
    head: AtomicU32,

    /// Next read index (monotonic, wraps via mask).
    tail: AtomicU32,

    /// Times the producer found the channel full.
    full_waits: AtomicU32,

    /// Set once `split()` has handed out the endpoints.
    split: AtomicBool,
}

// SAFETY: Single producer, single consumer, atomic coordination.
// Endpoints are unique, enforced by `split()`.
unsafe impl<const N: usize> Sync for EventChannel<N> {}
unsafe impl<const N: usize> Send for EventChannel<N> {}

impl<const N: usize> EventChannel<N> {
    /// Mask for wrapping index to buffer size.
    const MASK: usize = N - 1;

    /// Create a new empty channel.
    ///
    /// # Panics
    ///
    /// Panics at compile time if N is not a power of 2.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Channel size must be power of 2");

        Self {
            slots: [const { UnsafeCell::new(MorseEvent::EMPTY) }; N],
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
            full_waits: AtomicU32::new(0),
            split: AtomicBool::new(false),
        }
    }

    /// Hand out the producer and consumer endpoints.
    ///
    /// Returns `None` on every call after the first.
    pub fn split(&self) -> Option<(EventProducer<'_, N>, EventConsumer<'_, N>)> {
        if self.split.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some((EventProducer { channel: self }, EventConsumer { channel: self }))
    }

    /// Number of queued events.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) as usize
    }

    /// Check if nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the next send would wait.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= N
    }

    /// Times the producer has found the channel full.
    #[inline]
    pub fn full_waits(&self) -> u32 {
        self.full_waits.load(Ordering::Relaxed)
    }

    /// Get the channel capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for EventChannel<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sending half. Owned by the classifier task.
pub struct EventProducer<'a, const N: usize = EVENT_CHANNEL_CAPACITY> {
    channel: &'a EventChannel<N>,
}

impl<'a, const N: usize> EventProducer<'a, N> {
    /// Queue an event if a slot is free.
    ///
    /// # Timing
    ///
    /// O(1), never blocks, never allocates.
    #[inline]
    pub fn try_send(&mut self, event: MorseEvent) -> Result<(), TrySendError> {
        // Only this endpoint writes head
        let head = self.channel.head.load(Ordering::Relaxed);
        let tail = self.channel.tail.load(Ordering::Acquire);

        if head.wrapping_sub(tail) as usize >= N {
            return Err(TrySendError::Full(event));
        }

        // SAFETY: Slot at head is outside [tail, head), consumer never touches it
        unsafe {
            *self.channel.slots[(head as usize) & EventChannel::<N>::MASK].get() = event;
        }

        self.channel.head.store(head.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Queue an event, waiting for space while the channel is full.
    ///
    /// Returns how many poll intervals were spent waiting, zero when the
    /// event went straight in.
    pub fn send<D: Delay>(&mut self, event: MorseEvent, delay: &mut D) -> u32 {
        let mut waits = 0u32;
        loop {
            match self.try_send(event) {
                Ok(()) => return waits,
                Err(TrySendError::Full(_)) => {
                    if waits == 0 {
                        self.channel.full_waits.fetch_add(1, Ordering::Relaxed);
                    }
                    waits = waits.saturating_add(1);
                    delay.delay_ms(WAIT_POLL_MS);
                }
            }
        }
    }

    /// The channel behind this endpoint.
    #[inline]
    pub fn channel(&self) -> &'a EventChannel<N> {
        self.channel
    }
}

/// Receiving half. Owned by the encoder task.
pub struct EventConsumer<'a, const N: usize = EVENT_CHANNEL_CAPACITY> {
    channel: &'a EventChannel<N>,
}

impl<'a, const N: usize> EventConsumer<'a, N> {
    /// Take the oldest event if one is queued.
    ///
    /// # Timing
    ///
    /// O(1), never blocks, never allocates.
    #[inline]
    pub fn try_recv(&mut self) -> Result<MorseEvent, TryRecvError> {
        // Only this endpoint writes tail
        let tail = self.channel.tail.load(Ordering::Relaxed);
        let head = self.channel.head.load(Ordering::Acquire);

        if tail == head {
            return Err(TryRecvError::Empty);
        }

        // SAFETY: Slot at tail is inside [tail, head), producer never touches it
        let event = unsafe { *self.channel.slots[(tail as usize) & EventChannel::<N>::MASK].get() };

        self.channel.tail.store(tail.wrapping_add(1), Ordering::Release);
        Ok(event)
    }

    /// Wait indefinitely for the next event.
    pub fn recv<D: Delay>(&mut self, delay: &mut D) -> MorseEvent {
        loop {
            if let Ok(event) = self.try_recv() {
                return event;
            }
            delay.delay_ms(WAIT_POLL_MS);
        }
    }

    /// Drain all queued events.
    #[inline]
    pub fn drain(&mut self) -> Drain<'_, 'a, N> {
        Drain { consumer: self }
    }

    /// The channel behind this endpoint.
    #[inline]
    pub fn channel(&self) -> &'a EventChannel<N> {
        self.channel
    }
}

/// Iterator over the events queued at each `next()` call.
pub struct Drain<'c, 'a, const N: usize> {
    consumer: &'c mut EventConsumer<'a, N>,
}

impl<'c, 'a, const N: usize> Iterator for Drain<'c, 'a, N> {
    type Item = MorseEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.consumer.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingDelay(u32);

    impl Delay for CountingDelay {
        fn delay_ms(&mut self, _ms: u32) {
            self.0 += 1;
        }
    }

    #[test]
    fn test_channel_basic_send_recv() {
        let channel = EventChannel::<32>::new();
        let (mut tx, mut rx) = channel.split().unwrap();

        tx.try_send(MorseEvent::Dot).unwrap();
        assert_eq!(channel.len(), 1);
        assert_eq!(rx.try_recv(), Ok(MorseEvent::Dot));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_split_only_once() {
        let channel = EventChannel::<32>::new();
        assert!(channel.split().is_some());
        assert!(channel.split().is_none());
    }

    #[test]
    fn test_full_hands_event_back() {
        let channel = EventChannel::<4>::new();
        let (mut tx, _rx) = channel.split().unwrap();

        for _ in 0..4 {
            tx.try_send(MorseEvent::Dash).unwrap();
        }
        assert!(channel.is_full());
        assert_eq!(
            tx.try_send(MorseEvent::EndMessage),
            Err(TrySendError::Full(MorseEvent::EndMessage))
        );
    }

    #[test]
    fn test_fifo_across_wraparound() {
        let channel = EventChannel::<4>::new();
        let (mut tx, mut rx) = channel.split().unwrap();

        let pattern = [
            MorseEvent::Dot,
            MorseEvent::Dash,
            MorseEvent::GapLetter,
            MorseEvent::GapWord,
            MorseEvent::EndMessage,
        ];

        // 3 laps around a 4-slot ring
        let mut received = Vec::new();
        for round in 0..3 {
            for ev in pattern.iter().skip(round).take(3) {
                tx.try_send(*ev).unwrap();
            }
            received.extend(rx.drain());
        }

        assert_eq!(
            received,
            vec![
                MorseEvent::Dot,
                MorseEvent::Dash,
                MorseEvent::GapLetter,
                MorseEvent::Dash,
                MorseEvent::GapLetter,
                MorseEvent::GapWord,
                MorseEvent::GapLetter,
                MorseEvent::GapWord,
                MorseEvent::EndMessage,
            ]
        );
    }

    #[test]
    fn test_recv_polls_until_event() {
        let channel = EventChannel::<32>::new();
        let (mut tx, mut rx) = channel.split().unwrap();
        tx.try_send(MorseEvent::GapWord).unwrap();

        let mut delay = CountingDelay(0);
        assert_eq!(rx.recv(&mut delay), MorseEvent::GapWord);
        assert_eq!(delay.0, 0);
    }

    #[test]
    fn test_send_reports_no_wait_when_room() {
        let channel = EventChannel::<32>::new();
        let (mut tx, _rx) = channel.split().unwrap();
        let mut delay = CountingDelay(0);

        assert_eq!(tx.send(MorseEvent::Dot, &mut delay), 0);
        assert_eq!(channel.full_waits(), 0);
    }
}
