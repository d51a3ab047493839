//! Error types for the drive firmware.
//!
//! A single [`Error`] enum that every motor-subsystem operation returns,
//! keeping the control loop's error handling uniform. All variants are
//! `Copy` so they can be passed out of the drive lock and into the fault
//! log without allocation. Nothing here propagates to the transport layer.

use core::fmt;

use crate::app::ports::PwmChannel;
use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// Top-level drive error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The PWM peripheral stayed busy past the retry bound. Hardware fault:
    /// actuation has been halted.
    PwmBusy { channel: PwmChannel, attempts: u32 },
    /// A hardware fault is latched; actuation is refused until cleared.
    Faulted,
    /// The standby line is deasserted, so a maneuver cannot begin.
    Stopped,
    /// Configuration is invalid. `ControlLoop::start` refuses to touch the
    /// pins with one.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmBusy { channel, attempts } => {
                write!(f, "PWM {channel} busy after {attempts} attempts")
            }
            Self::Faulted => write!(f, "hardware fault latched"),
            Self::Stopped => write!(f, "drive in standby"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl core::error::Error for Error {}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
