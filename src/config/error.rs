//! Configuration error types

/// Configuration error with code and message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// C01: Sampling period must be non-zero
    ZeroSamplePeriod,
    /// C02: Move threshold not a positive finite number
    InvalidThreshold,
    /// C03: Stillness tolerance not a positive finite number
    InvalidTolerance,
    /// C04: Gravity reference not finite
    InvalidGravity,
    /// C05: Move threshold does not leave the stillness band
    ThresholdInsideStillBand,
    /// C06: Channel capacity below minimum or not a power of 2
    ChannelCapacity,
    /// C07: Output buffer below minimum
    BufferCapacity,
}

impl ConfigError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZeroSamplePeriod => "C01",
            Self::InvalidThreshold => "C02",
            Self::InvalidTolerance => "C03",
            Self::InvalidGravity => "C04",
            Self::ThresholdInsideStillBand => "C05",
            Self::ChannelCapacity => "C06",
            Self::BufferCapacity => "C07",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::ZeroSamplePeriod => "sample period is zero",
            Self::InvalidThreshold => "invalid move threshold",
            Self::InvalidTolerance => "invalid stillness tolerance",
            Self::InvalidGravity => "invalid gravity reference",
            Self::ThresholdInsideStillBand => "move threshold inside stillness band",
            Self::ChannelCapacity => "event channel capacity",
            Self::BufferCapacity => "output buffer capacity",
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}
