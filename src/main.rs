//! MorseTilt - Main entry point
//!
//! On ESP-IDF:
//! 1. Initialize hardware (I2C IMU, button ISR, diagnostics UART)
//! 2. Start the status task at low priority
//! 3. Start classifier and encoder tasks at equal, higher priority
//! 4. Park the main task
//!
//! On host: replay a short gesture script through the real pipeline and
//! print the resulting protocol line.

#![cfg_attr(target_os = "espidf", no_std, no_main)]

#[cfg(all(target_os = "espidf", not(any(feature = "esp32s3", feature = "esp32c3"))))]
compile_error!("select a board feature: esp32s3 or esp32c3");

#[cfg(target_os = "espidf")]
mod firmware {
    use core::ffi::{c_void, CStr};
    use core::ptr;

    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::gpio;
    use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::uart::{self, UartTxDriver};
    use esp_idf_svc::hal::units::Hertz;
    use esp_idf_svc::sys::{self as esp_idf_sys, EspError};
    use static_cell::StaticCell;

    use morse_tilt_keyer::config::{PipelineConfig, EVENT_CHANNEL_CAPACITY, OUTPUT_BUFFER_CAPACITY};
    use morse_tilt_keyer::hal::esp::{EspClock, FreeRtosDelay, GpioButton, Icm42670, StdoutSink, UartSink};
    use morse_tilt_keyer::hal::gpio::ButtonConfig;
    use morse_tilt_keyer::hal::{Clock, IsrButton};
    use morse_tilt_keyer::logging::LogStream;
    use morse_tilt_keyer::stats::{ClassifierStatsCell, EncoderStatsCell};
    use morse_tilt_keyer::status::StatusTask;
    use morse_tilt_keyer::{rt_error, rt_info};
    use morse_tilt_keyer::{ClassifierTask, EncoderTask, EventChannel};

    #[cfg(feature = "esp32s3")]
    const BUTTON_PIN: i32 = 0;
    #[cfg(all(feature = "esp32c3", not(feature = "esp32s3")))]
    const BUTTON_PIN: i32 = 9;

    /// Encoder task core (single-core parts pin everything to 0)
    #[cfg(feature = "esp32s3")]
    const ENCODER_CORE: i32 = 1;
    #[cfg(all(feature = "esp32c3", not(feature = "esp32s3")))]
    const ENCODER_CORE: i32 = 0;
    const CLASSIFIER_CORE: i32 = 0;

    /// Classifier and encoder share a priority above the status task
    const PIPELINE_PRIORITY: u32 = 5;
    const STATUS_PRIORITY: u32 = 1;
    const TASK_STACK: u32 = 4096;

    // Static allocations
    static CHANNEL: EventChannel = EventChannel::new();
    static CLASSIFIER_LOG: LogStream = LogStream::new("classifier");
    static ENCODER_LOG: LogStream = LogStream::new("encoder");
    static LOG_STREAMS: [&LogStream; 2] = [&CLASSIFIER_LOG, &ENCODER_LOG];
    static CLASSIFIER_STATS: ClassifierStatsCell = ClassifierStatsCell::new();
    static ENCODER_STATS: EncoderStatsCell = EncoderStatsCell::new();

    static BUTTON_LATCH: IsrButton = IsrButton::new();
    static BUTTON: GpioButton = GpioButton::new(
        ButtonConfig {
            pin: BUTTON_PIN,
            active_low: true,
        },
        &BUTTON_LATCH,
    );

    type Encoder = EncoderTask<'static, StdoutSink, EspClock, EVENT_CHANNEL_CAPACITY, OUTPUT_BUFFER_CAPACITY>;
    type Status = StatusTask<'static, UartSink<'static>, EspClock>;
    type Classifier = ClassifierTask<'static, Icm42670<'static>, &'static GpioButton, EspClock>;

    static CLASSIFIER_TASK: StaticCell<Classifier> = StaticCell::new();
    static ENCODER_TASK: StaticCell<Encoder> = StaticCell::new();
    static STATUS_TASK: StaticCell<Status> = StaticCell::new();

    /// Bring up hardware and start all tasks.
    pub fn start() -> Result<(), EspError> {
        let config = PipelineConfig::default();
        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;

        #[cfg(feature = "esp32s3")]
        let (sda, scl, log_tx) = (pins.gpio8, pins.gpio18, pins.gpio17);
        #[cfg(all(feature = "esp32c3", not(feature = "esp32s3")))]
        let (sda, scl, log_tx) = (pins.gpio10, pins.gpio8, pins.gpio4);

        // Diagnostics UART first so later failures are visible
        let uart = UartTxDriver::new(
            peripherals.uart1,
            log_tx,
            Option::<gpio::AnyIOPin>::None,
            Option::<gpio::AnyIOPin>::None,
            &uart::config::Config::default().baudrate(Hertz(115_200)),
        )?;
        let status = STATUS_TASK.init(StatusTask::new(
            UartSink::new(uart),
            EspClock,
            &LOG_STREAMS,
            &CLASSIFIER_STATS,
            &ENCODER_STATS,
            config.heartbeat_ms,
        ));
        spawn(c"status", status_entry, status as *mut Status as *mut c_void, STATUS_PRIORITY, ENCODER_CORE)?;

        if let Err(e) = config.validate() {
            rt_error!(CLASSIFIER_LOG, EspClock.now_ms(), "config {}", e);
            return Err(EspError::from_infallible::<{ esp_idf_sys::ESP_ERR_INVALID_ARG }>());
        }

        let i2c = I2cDriver::new(
            peripherals.i2c0,
            sda,
            scl,
            &I2cConfig::new().baudrate(Hertz(400_000)),
        )?;
        let imu = Icm42670::new(i2c)?;
        BUTTON.install()?;

        // Checked once here; the split cannot fail afterwards
        let Some((tx, rx)) = CHANNEL.split() else {
            return Err(EspError::from_infallible::<{ esp_idf_sys::ESP_ERR_INVALID_STATE }>());
        };

        // Last write from this task to CLASSIFIER_LOG before its producer starts
        rt_info!(CLASSIFIER_LOG, EspClock.now_ms(), "{}", env!("VERSION_STRING"));

        let encoder = ENCODER_TASK.init(EncoderTask::new(rx, StdoutSink, EspClock, &ENCODER_LOG).with_stats(&ENCODER_STATS));
        spawn(c"encoder", encoder_entry, encoder as *mut Encoder as *mut c_void, PIPELINE_PRIORITY, ENCODER_CORE)?;

        let classifier = CLASSIFIER_TASK
            .init(ClassifierTask::new(config, imu, &BUTTON, EspClock, tx, &CLASSIFIER_LOG).with_stats(&CLASSIFIER_STATS));
        spawn(
            c"classifier",
            classifier_entry,
            classifier as *mut Classifier as *mut c_void,
            PIPELINE_PRIORITY,
            CLASSIFIER_CORE,
        )?;
        Ok(())
    }

    fn spawn(
        name: &CStr,
        entry: unsafe extern "C" fn(*mut c_void),
        arg: *mut c_void,
        priority: u32,
        core: i32,
    ) -> Result<(), EspError> {
        let created = unsafe {
            esp_idf_sys::xTaskCreatePinnedToCore(
                Some(entry),
                name.as_ptr(),
                TASK_STACK,
                arg,
                priority,
                ptr::null_mut(),
                core,
            )
        };
        if created == 1 {
            Ok(())
        } else {
            Err(EspError::from_infallible::<{ esp_idf_sys::ESP_ERR_NO_MEM }>())
        }
    }

    unsafe extern "C" fn classifier_entry(arg: *mut c_void) {
        // SAFETY: arg is the &'static mut handed out once by CLASSIFIER_TASK
        let task = &mut *(arg as *mut Classifier);
        task.run(&mut FreeRtosDelay)
    }

    unsafe extern "C" fn encoder_entry(arg: *mut c_void) {
        // SAFETY: arg is the &'static mut handed out once by ENCODER_TASK
        let task = &mut *(arg as *mut Encoder);
        task.run(&mut FreeRtosDelay)
    }

    unsafe extern "C" fn status_entry(arg: *mut c_void) {
        // SAFETY: arg is the &'static mut handed out once by STATUS_TASK
        let task = &mut *(arg as *mut Status);
        task.run(&mut FreeRtosDelay)
    }

    /// Setup failed: report on the ROM console and park the main task.
    pub fn fail(err: EspError) -> ! {
        unsafe {
            esp_idf_sys::esp_rom_printf(c"morse-tilt: setup failed (%d)\n".as_ptr(), err.code());
        }
        park()
    }

    /// Nothing left for the main task once the pipeline runs.
    pub fn park() -> ! {
        loop {
            FreeRtos::delay_ms(1000);
        }
    }
}

#[cfg(target_os = "espidf")]
#[no_mangle]
fn main() {
    esp_idf_svc::sys::link_patches();

    if let Err(err) = firmware::start() {
        firmware::fail(err);
    }
    firmware::park();
}

#[cfg(not(target_os = "espidf"))]
mod demo {
    use std::cell::Cell;
    use std::io::Write;
    use std::thread;
    use std::time::{Duration, Instant};

    use morse_tilt_keyer::hal::{ButtonInput, Clock, Delay, LineSink, MotionSensor};
    use morse_tilt_keyer::logging::LogStream;
    use morse_tilt_keyer::stats::{ClassifierStatsCell, EncoderStatsCell};
    use morse_tilt_keyer::status::StatusTask;
    use morse_tilt_keyer::{ClassifierTask, EncoderTask, EventChannel, MotionSample, PipelineConfig};

    /// One scripted tick: motion reading and button level.
    type Frame = (Option<MotionSample>, bool);

    const GESTURE_WINDOW_MS: u32 = 100;

    /// Dot, Dash, double press (word gap), triple press (end of message).
    pub fn script() -> Vec<Frame> {
        let still = Some(MotionSample::AT_REST);
        let mut frames = vec![
            (Some(MotionSample::from_accel(0.7, 0.0, 0.7)), false),
            (still, false),
            (Some(MotionSample::from_accel(0.0, 0.7, 0.7)), false),
            (still, false),
        ];
        for presses in [2, 3] {
            for _ in 0..presses {
                frames.push((still, true));
                frames.push((still, false));
            }
            // Stay released past the gesture window
            frames.extend(std::iter::repeat((still, false)).take(8));
        }
        frames
    }

    struct Replay<'s> {
        frames: &'s [Frame],
        cursor: &'s Cell<usize>,
    }

    impl MotionSensor for Replay<'_> {
        fn read_motion(&mut self) -> Option<MotionSample> {
            self.frames.get(self.cursor.get()).and_then(|f| f.0)
        }
    }

    impl ButtonInput for Replay<'_> {
        fn is_pressed(&mut self) -> bool {
            self.frames.get(self.cursor.get()).is_some_and(|f| f.1)
        }
    }

    #[derive(Clone, Copy)]
    struct HostClock(Instant);

    impl Clock for HostClock {
        fn now_ms(&self) -> u32 {
            self.0.elapsed().as_millis() as u32
        }
    }

    struct Sleep;

    impl Delay for Sleep {
        fn delay_ms(&mut self, ms: u32) {
            thread::sleep(Duration::from_millis(ms as u64));
        }
    }

    struct Stdout;

    impl LineSink for Stdout {
        fn emit_line(&mut self, line: &[u8]) {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(line);
            let _ = out.flush();
        }
    }

    struct Stderr;

    impl LineSink for Stderr {
        fn emit_line(&mut self, line: &[u8]) {
            let _ = std::io::stderr().write_all(line);
        }
    }

    pub fn run() {
        let config = PipelineConfig::default().with_gesture_window(GESTURE_WINDOW_MS);
        if let Err(e) = config.validate() {
            eprintln!("morse-tilt: {}", e);
            return;
        }

        let channel: EventChannel = EventChannel::new();
        let Some((tx, rx)) = channel.split() else {
            return;
        };
        let classifier_log = LogStream::new("classifier");
        let encoder_log = LogStream::new("encoder");
        let classifier_stats = ClassifierStatsCell::new();
        let encoder_stats = EncoderStatsCell::new();
        let clock = HostClock(Instant::now());
        let frames = script();

        thread::scope(|s| {
            s.spawn(|| {
                let cursor = Cell::new(0);
                let mut task = ClassifierTask::new(
                    config,
                    Replay { frames: &frames, cursor: &cursor },
                    Replay { frames: &frames, cursor: &cursor },
                    clock,
                    tx,
                    &classifier_log,
                )
                .with_stats(&classifier_stats);
                for i in 0..frames.len() {
                    cursor.set(i);
                    task.step(&mut Sleep);
                    Sleep.delay_ms(config.sample_period_ms);
                }
            });

            s.spawn(|| {
                let mut task = EncoderTask::<_, _>::new(rx, Stdout, clock, &encoder_log).with_stats(&encoder_stats);
                while task.encoder().stats().lines == 0 {
                    task.step(&mut Sleep);
                }
            });
        });

        let streams = [&classifier_log, &encoder_log];
        let mut status = StatusTask::new(Stderr, clock, &streams, &classifier_stats, &encoder_stats, config.heartbeat_ms);
        status.step();
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    demo::run();
}
