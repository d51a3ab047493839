//! Twindrive Firmware: Main Entry Point
//!
//! Two threads share one drive:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  UART console ─▶ LineTransport ─▶ CommandInterpreter         │
//! │                                     │ (stop/start/reverse)   │
//! │                                     ▼                        │
//! │                  CommandIntent ◀── turn intents              │
//! │                        │                                     │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │                        ▼                                     │
//! │   ControlLoop ──▶ SharedDrive ──▶ HalPwm (LEDC) + HalPins    │
//! │        │                                                     │
//! │        └──▶ LogEventSink                                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufReader;

use anyhow::Result;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_svc::hal::ledc::config::TimerConfig;
use esp_idf_svc::hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::units::FromValueType;
use log::{error, info, warn};

use twindrive::Error;
use twindrive::adapters::hardware::{HalPins, HalPwm};
use twindrive::adapters::line_transport::LineTransport;
use twindrive::adapters::log_sink::LogEventSink;
use twindrive::app::commands::CommandInterpreter;
use twindrive::app::service::ControlLoop;
use twindrive::config::DriveConfig;
use twindrive::drivers::motor::MotorDriver;
use twindrive::drivers::shared::SharedDrive;
use twindrive::drivers::watchdog::LoopWatchdog;
use twindrive::intent::CommandIntent;
use twindrive::pins;

/// Written by the console thread, consumed by the control loop.
static INTENT: CommandIntent = CommandIntent::new();

/// How long a latched PWM fault is held before the pins are re-initialised.
/// The drive stays stopped afterwards until the operator sends Play.
const FAULT_HOLD_MS: u32 = 5_000;

/// Stack for the console reader thread.
const CONSOLE_STACK_BYTES: usize = 6 * 1024;

fn load_config() -> DriveConfig {
    let Some(json) = option_env!("TWINDRIVE_CONFIG") else {
        return DriveConfig::default();
    };
    match DriveConfig::from_json(json.as_bytes()) {
        Ok(cfg) => {
            info!("Config override applied");
            cfg
        }
        Err(e) => {
            warn!("Config override rejected ({}), using defaults", e);
            DriveConfig::default()
        }
    }
}

fn output(gpio: i32) -> Result<PinDriver<'static, AnyOutputPin, Output>> {
    // SAFETY: each drive GPIO is claimed exactly once, here; the pins of
    // `Peripherals` are never handed to anything else.
    let pin = unsafe { AnyOutputPin::new(gpio) };
    Ok(PinDriver::output(pin)?)
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Twindrive v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config();

    // ── 2. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default()
            .frequency(pins::PWM_FREQ_HZ.Hz())
            .resolution(Resolution::Bits8),
    )?;
    // SAFETY: see `output`; PWMA/PWMB are not claimed anywhere else.
    let (pwma, pwmb) = unsafe {
        (
            AnyOutputPin::new(pins::PWMA_GPIO),
            AnyOutputPin::new(pins::PWMB_GPIO),
        )
    };
    let channel_a = LedcDriver::new(peripherals.ledc.channel0, &timer, pwma)?;
    let channel_b = LedcDriver::new(peripherals.ledc.channel1, &timer, pwmb)?;
    info!(
        "PWM: {} Hz, {}-bit on GPIO {}/{}",
        pins::PWM_FREQ_HZ,
        pins::PWM_RESOLUTION_BITS,
        pins::PWMA_GPIO,
        pins::PWMB_GPIO
    );

    let gpio = HalPins::new(
        output(pins::AIN1_GPIO)?,
        output(pins::AIN2_GPIO)?,
        output(pins::BIN1_GPIO)?,
        output(pins::BIN2_GPIO)?,
        output(pins::STBY_GPIO)?,
    );
    let pwm = HalPwm::new(channel_a, channel_b);
    let drive = SharedDrive::new(MotorDriver::new(pwm, gpio, &config));

    // ── 3. Threads ────────────────────────────────────────────
    std::thread::scope(|scope| -> Result<()> {
        let drive = &drive;

        std::thread::Builder::new()
            .name("console".into())
            .stack_size(CONSOLE_STACK_BYTES)
            .spawn_scoped(scope, move || {
                let interpreter = CommandInterpreter::new(drive, &INTENT);
                let mut transport = LineTransport::new(BufReader::new(std::io::stdin()));
                match transport.pump(&interpreter) {
                    Ok(n) => warn!("console: closed after {} messages", n),
                    Err(e) => error!("console: read failed: {}", e),
                }
            })?;

        let mut control = ControlLoop::new(drive, &INTENT, FreeRtos, LogEventSink::new(), config);
        let watchdog = LoopWatchdog::new(control.config());
        control.start()?;

        // ── 4. Control loop ───────────────────────────────────
        loop {
            match control.run_once() {
                Ok(()) => {}
                Err(e @ Error::PwmBusy { .. }) => {
                    error!("Drive halted: {}", e);
                    for _ in 0..FAULT_HOLD_MS / 500 {
                        FreeRtos::delay_ms(500);
                        watchdog.feed();
                    }
                    drive.clear_fault();
                }
                Err(e) => warn!("Control iteration failed: {}", e),
            }
            watchdog.feed();
        }
    })
}
