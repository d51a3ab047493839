//! Port traits at the boundary between drive logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ MotorDriver / ControlLoop (domain)
//! ```
//!
//! The PWM peripheral, GPIO bank, transport and event sinks are excluded
//! collaborators. The domain only ever sees them through these traits, so
//! every drive behaviour is testable with recording mocks on the host.

use core::fmt;

use super::events::DriveEvent;

// ───────────────────────────────────────────────────────────────
// PWM port (domain → speed control)
// ───────────────────────────────────────────────────────────────

/// One of the two TB6612FNG PWM inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PwmChannel {
    /// PWMA, motor A, the left wheel.
    A = 0,
    /// PWMB, motor B, the right wheel.
    B = 1,
}

impl fmt::Display for PwmChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "channel A"),
            Self::B => write!(f, "channel B"),
        }
    }
}

/// Transient rejection from the PWM peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmError {
    /// The peripheral is mid-update; the caller should retry.
    Busy,
}

/// Write-side port for duty-cycle control.
pub trait PwmPort {
    /// Set the duty cycle (0–100) of one channel. May return
    /// [`PwmError::Busy`]; the caller owns the retry policy.
    fn set_duty(&mut self, channel: PwmChannel, percent: u8) -> Result<(), PwmError>;
}

// ───────────────────────────────────────────────────────────────
// GPIO port (domain → direction and standby lines)
// ───────────────────────────────────────────────────────────────

/// The five digital lines of a TB6612FNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrivePin {
    Ain1,
    Ain2,
    Bin1,
    Bin2,
    /// STBY, active high; low cuts drive to both motors.
    Standby,
}

/// Write-side port for the direction and standby lines.
pub trait GpioPort {
    fn set_pin(&mut self, pin: DrivePin);
    fn clear_pin(&mut self, pin: DrivePin);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The control loop emits structured [`DriveEvent`]s through this port.
/// Adapters decide where they go (serial log, telemetry characteristic).
pub trait EventSink {
    fn emit(&mut self, event: &DriveEvent);
}

// ───────────────────────────────────────────────────────────────
// Command handler (transport → domain)
// ───────────────────────────────────────────────────────────────

/// Whatever the transport registers as its inbound-message callback.
///
/// Called from the reception context, so implementations take `&self` and
/// must be safe to run concurrently with the control loop.
pub trait CommandHandler {
    fn on_message(&self, message: &[u8]);
}
