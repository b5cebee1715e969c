//! ESP-IDF implementations of the HAL traits.
//!
//! Compiled only for `target_os = "espidf"`. Everything here is thin I/O;
//! decoding and classification live in the core modules.

use core::ffi::c_void;

use esp_idf_svc::hal::delay::{FreeRtos, TickType};
use esp_idf_svc::hal::i2c::I2cDriver;
use esp_idf_svc::hal::uart::UartTxDriver;
use esp_idf_svc::sys::{self as esp_idf_sys, esp, EspError};

use super::gpio::{ButtonConfig, IsrButton};
use super::imu::{self, regs, BURST_LEN, ICM42670_ADDR, PWR_LOW_NOISE, WHO_AM_I_VALUE};
use super::{ButtonInput, Clock, Delay, LineSink, MotionSensor};
use crate::sample::MotionSample;

/// I2C transaction timeout.
const I2C_TIMEOUT_MS: u64 = 10;

/// `esp_timer` microseconds truncated to wrapping milliseconds.
#[derive(Clone, Copy, Default)]
pub struct EspClock;

impl Clock for EspClock {
    #[inline]
    fn now_ms(&self) -> u32 {
        let us = unsafe { esp_idf_sys::esp_timer_get_time() };
        (us / 1000) as u32
    }
}

/// FreeRTOS task sleep.
#[derive(Clone, Copy, Default)]
pub struct FreeRtosDelay;

impl Delay for FreeRtosDelay {
    #[inline]
    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }
}

/// Protocol output on the console (VFS fd 1).
///
/// Best-effort: a failed write drops the rest of the line.
#[derive(Clone, Copy, Default)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn emit_line(&mut self, line: &[u8]) {
        let mut rest = line;
        while !rest.is_empty() {
            let n = unsafe { esp_idf_sys::write(1, rest.as_ptr() as *const c_void, rest.len() as _) };
            if n <= 0 {
                return;
            }
            rest = &rest[(n as usize).min(rest.len())..];
        }
    }
}

/// Diagnostics output on a TX-only UART.
pub struct UartSink<'d> {
    uart: UartTxDriver<'d>,
}

impl<'d> UartSink<'d> {
    pub fn new(uart: UartTxDriver<'d>) -> Self {
        Self { uart }
    }
}

impl LineSink for UartSink<'_> {
    fn emit_line(&mut self, line: &[u8]) {
        let _ = self.uart.write(line);
    }
}

/// Gesture button wired to an edge interrupt, debounced by its latch.
///
/// Must live in a `'static` because its address is handed to the GPIO ISR
/// service.
pub struct GpioButton {
    config: ButtonConfig,
    latch: &'static IsrButton,
}

impl GpioButton {
    pub const fn new(config: ButtonConfig, latch: &'static IsrButton) -> Self {
        Self { config, latch }
    }

    /// Configure the pin (input, pull-up when active-low) and register the
    /// any-edge ISR.
    pub fn install(&'static self) -> Result<(), EspError> {
        let pin = self.config.pin;
        let io = esp_idf_sys::gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: esp_idf_sys::gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: if self.config.active_low {
                esp_idf_sys::gpio_pullup_t_GPIO_PULLUP_ENABLE
            } else {
                esp_idf_sys::gpio_pullup_t_GPIO_PULLUP_DISABLE
            },
            pull_down_en: esp_idf_sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: esp_idf_sys::gpio_int_type_t_GPIO_INTR_ANYEDGE,
            ..Default::default()
        };

        unsafe {
            esp!(esp_idf_sys::gpio_config(&io))?;

            // Already installed by another driver is fine
            let err = esp_idf_sys::gpio_install_isr_service(0);
            if err != esp_idf_sys::ESP_ERR_INVALID_STATE {
                esp!(err)?;
            }

            esp!(esp_idf_sys::gpio_isr_handler_add(
                pin,
                Some(button_isr),
                self as *const Self as *mut c_void,
            ))?;
        }

        self.latch.seed(self.read_level());
        Ok(())
    }

    #[inline]
    fn read_level(&self) -> bool {
        let high = unsafe { esp_idf_sys::gpio_get_level(self.config.pin) } != 0;
        high != self.config.active_low
    }
}

unsafe extern "C" fn button_isr(arg: *mut c_void) {
    // SAFETY: arg is the &'static GpioButton registered in `install`
    let button = &*(arg as *const GpioButton);
    button.latch.on_edge(button.read_level(), EspClock.now_ms());
}

impl ButtonInput for &GpioButton {
    fn is_pressed(&mut self) -> bool {
        self.latch.settle(EspClock.now_ms());
        self.latch.take_level()
    }
}

/// ICM-42670 over I2C.
pub struct Icm42670<'d> {
    i2c: I2cDriver<'d>,
    timeout: u32,
}

impl<'d> Icm42670<'d> {
    /// Probe WHO_AM_I and switch accel and gyro to low-noise mode.
    pub fn new(i2c: I2cDriver<'d>) -> Result<Self, EspError> {
        let mut imu = Self {
            i2c,
            timeout: TickType::new_millis(I2C_TIMEOUT_MS).ticks(),
        };

        let mut who = [0u8; 1];
        imu.i2c
            .write_read(ICM42670_ADDR, &[regs::WHO_AM_I], &mut who, imu.timeout)?;
        if who[0] != WHO_AM_I_VALUE {
            return Err(EspError::from_infallible::<{ esp_idf_sys::ESP_ERR_NOT_FOUND }>());
        }

        imu.i2c
            .write(ICM42670_ADDR, &[regs::PWR_MGMT0, PWR_LOW_NOISE], imu.timeout)?;
        // Gyro needs 45 ms after leaving off mode
        FreeRtos::delay_ms(50);

        Ok(imu)
    }
}

impl MotionSensor for Icm42670<'_> {
    fn read_motion(&mut self) -> Option<MotionSample> {
        let mut raw = [0u8; BURST_LEN];
        self.i2c
            .write_read(ICM42670_ADDR, &[regs::TEMP_DATA1], &mut raw, self.timeout)
            .ok()?;
        imu::decode_icm42670(&raw)
    }
}
