//! Drive configuration parameters.
//!
//! All tunable parameters for the differential drive. Read-only once the
//! control loop has started. Defaults match the bench rig:
//! 1 kHz PWM, a 10–90 % demo ramp in 10 % steps, and a 50 % start speed.

use core::fmt;

use serde::{Deserialize, Serialize};

/// What the control loop does while no maneuver is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// Sleep for the poll interval between intent checks.
    Poll,
    /// Run the speed-ramp demonstration between intent checks.
    Demo,
}

/// Core drive configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    // --- Speed envelope ---
    /// Lowest duty cycle (0-100%) ever written to a PWM channel.
    pub min_speed: u8,
    /// Highest duty cycle (0-100%) ever written to a PWM channel.
    pub max_speed: u8,
    /// Uniform speed applied when the control loop starts.
    pub start_speed: u8,

    // --- Turning ---
    /// Duty on the inside wheel during a turn.
    pub turn_inner_speed: u8,
    /// Duty on the outside wheel during a turn.
    pub turn_outer_speed: u8,
    /// How long a turn maneuver holds the asymmetric duty (milliseconds).
    pub turn_duration_ms: u32,

    // --- Timing ---
    /// Control loop poll interval (milliseconds). Also the granularity at
    /// which a turn or ramp delay checks for cancellation.
    pub poll_interval_ms: u32,
    /// Status report interval (milliseconds).
    pub telemetry_interval_ms: u32,

    // --- PWM ---
    /// Attempts per channel before a busy PWM peripheral is a hardware fault.
    pub pwm_retry_limit: u32,

    // --- Idle behaviour ---
    pub mode: ControlMode,
    /// Speed increment between ramp steps (percent).
    pub ramp_step: u8,
    /// Hold time per ramp step (milliseconds).
    pub ramp_step_delay_ms: u32,
    /// Pause after each full up/down ramp (milliseconds).
    pub ramp_pause_ms: u32,

    // --- Wiring ---
    /// Swap IN1/IN2 for motor A (left wheel mounted mirrored or miswired).
    pub invert_a: bool,
    /// Swap IN1/IN2 for motor B.
    pub invert_b: bool,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            // Speed envelope
            min_speed: 10,
            max_speed: 90,
            start_speed: 50,

            // Turning
            turn_inner_speed: 20,
            turn_outer_speed: 80,
            turn_duration_ms: 500,

            // Timing
            poll_interval_ms: 50,
            telemetry_interval_ms: 10_000,

            // PWM
            pwm_retry_limit: 1_000,

            // Idle behaviour
            mode: ControlMode::Poll,
            ramp_step: 10,
            ramp_step_delay_ms: 1_000,
            ramp_pause_ms: 2_000,

            // Wiring
            invert_a: false,
            invert_b: false,
        }
    }
}

impl DriveConfig {
    /// Reject out-of-range values. Nothing is silently clamped here; speed
    /// requests are clamped at runtime, but the envelope itself must be sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_speed > 100 {
            return Err(ConfigError::ValidationFailed("max_speed must be <= 100"));
        }
        if self.min_speed > self.max_speed {
            return Err(ConfigError::ValidationFailed("min_speed must be <= max_speed"));
        }
        if self.start_speed > 100 || self.turn_inner_speed > 100 || self.turn_outer_speed > 100 {
            return Err(ConfigError::ValidationFailed("speeds must be <= 100"));
        }
        if self.turn_inner_speed > self.turn_outer_speed {
            return Err(ConfigError::ValidationFailed(
                "turn_inner_speed must be <= turn_outer_speed",
            ));
        }
        if self.turn_duration_ms == 0 {
            return Err(ConfigError::ValidationFailed("turn_duration_ms must be > 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll_interval_ms must be > 0"));
        }
        if self.pwm_retry_limit == 0 {
            return Err(ConfigError::ValidationFailed("pwm_retry_limit must be > 0"));
        }
        if self.ramp_step == 0 {
            return Err(ConfigError::ValidationFailed("ramp_step must be > 0"));
        }
        Ok(())
    }

    /// Parse a (possibly partial) JSON document over the defaults and
    /// validate the result.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Clamp a requested duty into `[min_speed, max_speed]`.
    pub fn clamp_speed(&self, percent: u8) -> u8 {
        percent.max(self.min_speed).min(self.max_speed)
    }
}

/// Errors from loading or validating a [`DriveConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not valid JSON for this schema.
    Malformed,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed config document"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}
