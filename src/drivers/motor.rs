//! Dual DC motor driver (TB6612FNG H-bridge).
//!
//! Motor A is the left wheel, motor B the right. Both share one speed and
//! one direction except during a turn maneuver, when the two PWM channels
//! run at different duties.
//!
//! ```text
//!            IN1  IN2   STBY
//! Forward     1    0     1
//! Reverse     0    1     1
//! Standby     -    -     0   (outputs high-Z, PWM ignored)
//! ```
//!
//! ## Fault contract
//!
//! A PWM channel that stays busy for `pwm_retry_limit` consecutive attempts
//! is a hardware fault: standby is dropped, the fault is latched and every
//! further actuation returns [`Error::Faulted`] until [`MotorDriver::clear_fault`].
//!
//! This driver is not thread-safe on its own. Shared access from the
//! command callback and the control loop goes through
//! [`SharedDrive`](super::shared::SharedDrive).

use log::{error, info};

use crate::app::ports::{DrivePin, GpioPort, PwmChannel, PwmPort};
use crate::config::DriveConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }

    pub fn is_forward(self) -> bool {
        matches!(self, Self::Forward)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

/// Shared direction and uniform speed of both motors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorState {
    pub direction: Direction,
    /// Last uniform duty successfully applied; restored after a turn.
    pub speed_percent: u8,
}

/// Externally visible driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveState {
    Idle,
    Stopped,
    Turning(TurnDirection),
    Faulted(PwmChannel),
}

/// The latched hardware fault, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveFault {
    pub channel: PwmChannel,
    pub attempts: u32,
}

pub struct MotorDriver<P, G> {
    pwm: P,
    gpio: G,
    min_speed: u8,
    max_speed: u8,
    retry_limit: u32,
    invert_a: bool,
    invert_b: bool,
    motor: MotorState,
    enabled: bool,
    turning: Option<TurnDirection>,
    /// Set by a `stop` that lands while a turn is in flight. Survives a
    /// following `start`, so the maneuver still sees the interruption.
    turn_interrupted: bool,
    fault: Option<DriveFault>,
}

impl<P: PwmPort, G: GpioPort> MotorDriver<P, G> {
    /// Build the driver. Nothing is written to the pins until [`init`].
    ///
    /// [`init`]: Self::init
    pub fn new(pwm: P, gpio: G, config: &DriveConfig) -> Self {
        Self {
            pwm,
            gpio,
            min_speed: config.min_speed,
            max_speed: config.max_speed,
            retry_limit: config.pwm_retry_limit.max(1),
            invert_a: config.invert_a,
            invert_b: config.invert_b,
            motor: MotorState {
                direction: Direction::Forward,
                speed_percent: config.clamp_speed(config.start_speed),
            },
            enabled: false,
            turning: None,
            turn_interrupted: false,
            fault: None,
        }
    }

    /// Drive both direction pairs forward and assert standby.
    /// Does not touch the PWM channels.
    pub fn init(&mut self) {
        self.write_direction_hw(Direction::Forward);
        self.motor.direction = Direction::Forward;
        self.gpio.set_pin(DrivePin::Standby);
        self.enabled = true;
        info!("motor: init (forward, standby asserted)");
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.write_direction_hw(direction);
        self.motor.direction = direction;
    }

    /// Flip the shared orientation and apply it. Returns the new direction.
    pub fn toggle_direction(&mut self) -> Direction {
        let next = self.motor.direction.flipped();
        self.set_direction(next);
        next
    }

    /// Clamp `percent` into the speed envelope and write it to both
    /// channels. Returns the applied duty, which becomes the speed a turn
    /// restores and a `start` resumes.
    pub fn set_speed(&mut self, percent: u8) -> Result<u8> {
        let speed = self.clamp(percent);
        self.write_both(speed, speed)?;
        self.motor.speed_percent = speed;
        Ok(speed)
    }

    /// Deassert standby. Never writes PWM, so it works even when the PWM
    /// peripheral is wedged.
    pub fn stop(&mut self) {
        self.gpio.clear_pin(DrivePin::Standby);
        self.enabled = false;
        if self.turning.is_some() {
            self.turn_interrupted = true;
        }
    }

    /// Assert standby, resuming the last duty written to each channel.
    pub fn start(&mut self) -> Result<()> {
        if self.fault.is_some() {
            return Err(Error::Faulted);
        }
        self.gpio.set_pin(DrivePin::Standby);
        self.enabled = true;
        Ok(())
    }

    /// Apply the asymmetric duty of a turn. The inside wheel gets `inner`,
    /// the outside wheel `outer`, both clamped into the envelope.
    pub fn begin_turn(&mut self, direction: TurnDirection, inner: u8, outer: u8) -> Result<()> {
        if self.fault.is_some() {
            return Err(Error::Faulted);
        }
        if !self.enabled {
            return Err(Error::Stopped);
        }
        let (inner, outer) = (self.clamp(inner), self.clamp(outer));
        let (a, b) = match direction {
            TurnDirection::Left => (inner, outer),
            TurnDirection::Right => (outer, inner),
        };
        self.turning = Some(direction);
        self.turn_interrupted = false;
        if let Err(e) = self.write_both(a, b) {
            self.turning = None;
            return Err(e);
        }
        Ok(())
    }

    /// Restore the recorded uniform speed on both channels.
    pub fn end_turn(&mut self) -> Result<()> {
        self.turning = None;
        self.turn_interrupted = false;
        let speed = self.motor.speed_percent;
        self.write_both(speed, speed)
    }

    /// Flip the IN1/IN2 trim of one motor at runtime and rewrite its pair.
    /// Returns the new trim (`true` = inverted).
    pub fn toggle_trim(&mut self, channel: PwmChannel) -> bool {
        let inverted = match channel {
            PwmChannel::A => {
                self.invert_a = !self.invert_a;
                self.invert_a
            }
            PwmChannel::B => {
                self.invert_b = !self.invert_b;
                self.invert_b
            }
        };
        self.write_direction_hw(self.motor.direction);
        inverted
    }

    /// Re-initialise after a latched fault. Standby is left deasserted;
    /// the caller decides when to start again.
    pub fn clear_fault(&mut self) {
        if let Some(fault) = self.fault.take() {
            info!("motor: fault on {} cleared", fault.channel);
        }
        self.turning = None;
        self.turn_interrupted = false;
        self.write_direction_hw(self.motor.direction);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> DriveState {
        if let Some(fault) = self.fault {
            DriveState::Faulted(fault.channel)
        } else if !self.enabled {
            DriveState::Stopped
        } else if let Some(dir) = self.turning {
            DriveState::Turning(dir)
        } else {
            DriveState::Idle
        }
    }

    pub fn motor(&self) -> MotorState {
        self.motor
    }

    pub fn current_speed(&self) -> u8 {
        self.motor.speed_percent
    }

    pub fn direction(&self) -> Direction {
        self.motor.direction
    }

    /// Standby asserted and no fault latched.
    pub fn is_running(&self) -> bool {
        self.enabled && self.fault.is_none()
    }

    /// A Stop arrived since the current turn began, even if a Start has
    /// since re-enabled the drive.
    pub fn turn_interrupted(&self) -> bool {
        self.turn_interrupted
    }

    pub fn fault(&self) -> Option<DriveFault> {
        self.fault
    }

    // ── Internal ──────────────────────────────────────────────

    fn clamp(&self, percent: u8) -> u8 {
        percent.max(self.min_speed).min(self.max_speed)
    }

    fn write_both(&mut self, a: u8, b: u8) -> Result<()> {
        self.write_duty(PwmChannel::A, a)?;
        self.write_duty(PwmChannel::B, b)
    }

    fn write_duty(&mut self, channel: PwmChannel, percent: u8) -> Result<()> {
        if self.fault.is_some() {
            return Err(Error::Faulted);
        }
        for _ in 0..self.retry_limit {
            if self.pwm.set_duty(channel, percent).is_ok() {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        self.latch_fault(channel);
        Err(Error::PwmBusy {
            channel,
            attempts: self.retry_limit,
        })
    }

    fn latch_fault(&mut self, channel: PwmChannel) {
        self.stop();
        self.turning = None;
        self.fault = Some(DriveFault {
            channel,
            attempts: self.retry_limit,
        });
        error!(
            "motor: PWM {} busy after {} attempts, actuation halted",
            channel, self.retry_limit
        );
    }

    /// Clear the outgoing pin of each pair before setting the incoming one,
    /// so a transition passes through coast (both low) and never through
    /// short brake (both high).
    fn write_direction_hw(&mut self, direction: Direction) {
        let forward_a = direction.is_forward() != self.invert_a;
        let forward_b = direction.is_forward() != self.invert_b;
        Self::write_pair(&mut self.gpio, DrivePin::Ain1, DrivePin::Ain2, forward_a);
        Self::write_pair(&mut self.gpio, DrivePin::Bin1, DrivePin::Bin2, forward_b);
    }

    fn write_pair(gpio: &mut G, in1: DrivePin, in2: DrivePin, forward: bool) {
        let (high, low) = if forward { (in1, in2) } else { (in2, in1) };
        gpio.clear_pin(low);
        gpio.set_pin(high);
    }
}
