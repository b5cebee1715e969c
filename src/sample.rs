//! Module: sample
//!
//! Purpose: MotionSample, one raw inertial reading taken on a sampling tick.
//!
//! Architecture:
//! - Produced once per tick by a `MotionSensor`, consumed by the classifier
//! - Not retained past the tick that produced it
//! - Acceleration in g (vertical axis reads ~1.0 at rest), angular rate
//!   in degrees per second, temperature in degrees Celsius
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

/// A single inertial sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionSample {
    /// Acceleration, x axis (horizontal, drives Dot)
    pub ax: f32,
    /// Acceleration, y axis (horizontal, drives Dash)
    pub ay: f32,
    /// Acceleration, z axis (vertical)
    pub az: f32,
    /// Angular rate, x axis
    pub gx: f32,
    /// Angular rate, y axis
    pub gy: f32,
    /// Angular rate, z axis
    pub gz: f32,
    /// Die temperature
    pub temp: f32,
}

impl MotionSample {
    /// Device lying flat and motionless.
    pub const AT_REST: Self = Self {
        ax: 0.0,
        ay: 0.0,
        az: 1.0,
        gx: 0.0,
        gy: 0.0,
        gz: 0.0,
        temp: 25.0,
    };

    /// Sample with only the acceleration axes set.
    pub const fn from_accel(ax: f32, ay: f32, az: f32) -> Self {
        Self {
            ax,
            ay,
            az,
            gx: 0.0,
            gy: 0.0,
            gz: 0.0,
            temp: 0.0,
        }
    }

    /// Check whether the reading is within `tolerance` of the at-rest pose.
    ///
    /// Horizontal axes near zero and the vertical axis near `gravity_ref`.
    /// NaN on any axis is never still.
    #[inline]
    pub fn is_still(&self, gravity_ref: f32, tolerance: f32) -> bool {
        self.ax.abs() < tolerance
            && self.ay.abs() < tolerance
            && (self.az - gravity_ref).abs() < tolerance
    }

    /// |x| strictly above `threshold`.
    #[inline]
    pub fn x_exceeds(&self, threshold: f32) -> bool {
        self.ax.abs() > threshold
    }

    /// |y| strictly above `threshold`.
    #[inline]
    pub fn y_exceeds(&self, threshold: f32) -> bool {
        self.ay.abs() > threshold
    }
}
