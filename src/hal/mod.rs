//! Hardware Abstraction Layer for MorseTilt.
//!
//! The core consumes these traits only. Board code implements them on
//! top of ESP-IDF; tests implement them with scripted doubles.
//! Business logic stays in core modules, HAL is just I/O.

pub mod gpio;
pub mod imu;

#[cfg(target_os = "espidf")]
pub mod esp;

pub use gpio::IsrButton;
pub use imu::decode_icm42670;

use crate::sample::MotionSample;

/// Periodic raw-sample source.
pub trait MotionSensor {
    /// Non-blocking read. `None` on a transient bus miss.
    fn read_motion(&mut self) -> Option<MotionSample>;
}

/// Debounced digital input.
pub trait ButtonInput {
    /// Instantaneous level, true = pressed.
    fn is_pressed(&mut self) -> bool;
}

/// Monotonic millisecond clock, wraps at `u32::MAX`.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Scheduler sleep primitive.
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

/// Byte sink for finished protocol lines. Synchronous, best-effort.
pub trait LineSink {
    fn emit_line(&mut self, line: &[u8]);
}

impl<T: MotionSensor + ?Sized> MotionSensor for &mut T {
    fn read_motion(&mut self) -> Option<MotionSample> {
        (**self).read_motion()
    }
}

impl<T: ButtonInput + ?Sized> ButtonInput for &mut T {
    fn is_pressed(&mut self) -> bool {
        (**self).is_pressed()
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

impl<T: LineSink + ?Sized> LineSink for &mut T {
    fn emit_line(&mut self, line: &[u8]) {
        (**self).emit_line(line)
    }
}

impl<T: Delay + ?Sized> Delay for &mut T {
    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}
