//! ICM-42670 inertial sensor read path.
//!
//! Only the burst decode lives here unconditionally; the I2C transport is
//! compiled for ESP-IDF targets. Register setup beyond power-on is the
//! board's business.

use crate::sample::MotionSample;

/// ICM-42670 I2C address (AP_AD0 = HIGH)
pub const ICM42670_ADDR: u8 = 0x69;

/// ICM-42670 register addresses
pub mod regs {
    /// First byte of the 14-byte TEMP/ACCEL/GYRO burst
    pub const TEMP_DATA1: u8 = 0x09;
    pub const PWR_MGMT0: u8 = 0x1F;
    pub const WHO_AM_I: u8 = 0x75;
}

/// PWR_MGMT0: accel and gyro in low-noise mode
pub const PWR_LOW_NOISE: u8 = 0x0F;

/// Expected WHO_AM_I value
pub const WHO_AM_I_VALUE: u8 = 0x67;

/// Burst length: temp(2) + accel(6) + gyro(6)
pub const BURST_LEN: usize = 14;

/// LSB per g at the default ±4 g full scale
pub const ACCEL_LSB_PER_G: f32 = 8192.0;

/// LSB per dps at the default ±2000 dps full scale
pub const GYRO_LSB_PER_DPS: f32 = 16.4;

/// Value the sensor reports for a register it has no fresh data for
const DATA_INVALID: i16 = -32768;

/// Decode a TEMP/ACCEL/GYRO burst (big-endian) into a sample.
///
/// Returns `None` while the sensor still reports the invalid marker, which
/// happens for the first reads after power-on.
pub fn decode_icm42670(raw: &[u8; BURST_LEN]) -> Option<MotionSample> {
    let word = |i: usize| i16::from_be_bytes([raw[i], raw[i + 1]]);

    let t = word(0);
    let ax = word(2);
    if t == DATA_INVALID || ax == DATA_INVALID {
        return None;
    }

    Some(MotionSample {
        ax: ax as f32 / ACCEL_LSB_PER_G,
        ay: word(4) as f32 / ACCEL_LSB_PER_G,
        az: word(6) as f32 / ACCEL_LSB_PER_G,
        gx: word(8) as f32 / GYRO_LSB_PER_DPS,
        gy: word(10) as f32 / GYRO_LSB_PER_DPS,
        gz: word(12) as f32 / GYRO_LSB_PER_DPS,
        temp: t as f32 / 128.0 + 25.0,
    })
}
