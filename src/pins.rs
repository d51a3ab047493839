//! GPIO / peripheral pin assignments for the TB6612FNG carrier board.
//!
//! Every driver references this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Motor A (left wheel)
// ---------------------------------------------------------------------------

/// LEDC PWM output for motor A speed.
pub const PWMA_GPIO: i32 = 1;
/// Direction input 1 of motor A. HIGH with AIN2 LOW = forward.
pub const AIN1_GPIO: i32 = 2;
/// Direction input 2 of motor A.
pub const AIN2_GPIO: i32 = 3;

// ---------------------------------------------------------------------------
// Motor B (right wheel)
// ---------------------------------------------------------------------------

/// LEDC PWM output for motor B speed.
pub const PWMB_GPIO: i32 = 4;
/// Direction input 1 of motor B. HIGH with BIN2 LOW = forward.
pub const BIN1_GPIO: i32 = 5;
/// Direction input 2 of motor B.
pub const BIN2_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// Driver enable
// ---------------------------------------------------------------------------

/// STBY: HIGH enables both H-bridges, LOW puts the driver in standby.
pub const STBY_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits). 8-bit gives 0 to 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// LEDC base frequency for both motor channels.
pub const PWM_FREQ_HZ: u32 = 1_000;
