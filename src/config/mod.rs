//! Module: config
//!
//! Purpose: Tunables for the gesture-to-Morse pipeline.
//!
//! Architecture:
//! - Compile-time capacities for the event channel and output buffer
//! - `PipelineConfig` for the classifier and status thresholds
//! - Validated once at initialization, immutable afterwards
//!
//! Safety: Safe. No unsafe blocks.

mod error;

pub use error::ConfigError;

/// Event channel capacity (power of 2, at least 32).
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Output line buffer capacity in bytes, terminator included.
pub const OUTPUT_BUFFER_CAPACITY: usize = 256;

/// Every message ends with exactly these bytes.
pub const TERMINATOR: &[u8; 3] = b"  \n";

/// Smallest channel capacity the protocol tolerates.
pub const MIN_CHANNEL_CAPACITY: usize = 32;

/// Smallest output buffer the protocol tolerates.
pub const MIN_BUFFER_CAPACITY: usize = 256;

/// Pipeline configuration.
///
/// Thresholds are in sensor units where 1.0 is one g on the vertical axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Sampling period of the classifier task.
    pub sample_period_ms: u32,

    /// |x| or |y| above this starts a tilt.
    pub move_threshold: f32,

    /// Band around the at-rest reading that counts as still.
    pub still_tolerance: f32,

    /// At-rest vertical reading (nominal 1 g).
    pub gravity_ref: f32,

    /// Released time after which a press sequence is interpreted.
    /// Zero interprets on the release tick itself.
    pub gesture_window_ms: u32,

    /// Period of the status task heartbeat line.
    pub heartbeat_ms: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: 20,
            move_threshold: 0.35,
            still_tolerance: 0.1,
            gravity_ref: 1.0,
            gesture_window_ms: 400,
            heartbeat_ms: 1000,
        }
    }
}

impl PipelineConfig {
    /// Default config with a different sampling period.
    pub fn with_sample_period(sample_period_ms: u32) -> Self {
        Self {
            sample_period_ms,
            ..Default::default()
        }
    }

    /// Same config with a different gesture window.
    pub fn with_gesture_window(self, gesture_window_ms: u32) -> Self {
        Self {
            gesture_window_ms,
            ..self
        }
    }

    /// Same config with different motion thresholds.
    pub fn with_thresholds(self, move_threshold: f32, still_tolerance: f32) -> Self {
        Self {
            move_threshold,
            still_tolerance,
            ..self
        }
    }

    /// Check the tunables and the compile-time capacities.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_period_ms == 0 {
            return Err(ConfigError::ZeroSamplePeriod);
        }
        if !self.move_threshold.is_finite() || self.move_threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold);
        }
        if !self.still_tolerance.is_finite() || self.still_tolerance <= 0.0 {
            return Err(ConfigError::InvalidTolerance);
        }
        if !self.gravity_ref.is_finite() {
            return Err(ConfigError::InvalidGravity);
        }
        // A tilt must leave the stillness band, otherwise latches never clear
        if self.move_threshold <= self.still_tolerance {
            return Err(ConfigError::ThresholdInsideStillBand);
        }
        check_capacities(EVENT_CHANNEL_CAPACITY, OUTPUT_BUFFER_CAPACITY)
    }
}

/// Check a channel/buffer capacity pair against the protocol minimums.
pub fn check_capacities(channel: usize, buffer: usize) -> Result<(), ConfigError> {
    if channel < MIN_CHANNEL_CAPACITY || !channel.is_power_of_two() {
        return Err(ConfigError::ChannelCapacity);
    }
    if buffer < MIN_BUFFER_CAPACITY {
        return Err(ConfigError::BufferCapacity);
    }
    Ok(())
}
