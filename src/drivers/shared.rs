//! Lock-guarded handle to the motor driver.
//!
//! The command callback (Stop/Play/Shuffle) and the control loop (turns,
//! ramp) both touch the PWM and GPIO ports. Every access goes through a
//! `critical-section` blocking mutex so their write sequences never
//! interleave. The lock is held for one write sequence at a time and is
//! never held across a delay, so a Stop arriving mid-turn takes effect
//! immediately.
//!
//! ```text
//!  callback ──stop()/start()/toggle──┐
//!                                    ▼
//!                           ┌──────────────────┐
//!                           │ Mutex<RefCell<   │
//!                           │   MotorDriver>>  │
//!                           └──────────────────┘
//!                                    ▲
//!  control loop ──turn()/set_speed──┘
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::app::ports::{GpioPort, PwmChannel, PwmPort};
use crate::error::Result;

use super::motor::{Direction, DriveState, MotorDriver, MotorState, TurnDirection};

/// How a turn maneuver ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Held for the full duration, uniform speed restored.
    Completed,
    /// Cut short by a Stop; uniform duty restored with standby still low.
    Aborted,
}

/// Timing and duty parameters for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnPlan {
    pub inner_speed: u8,
    pub outer_speed: u8,
    pub duration_ms: u32,
    /// Granularity of the cancellation check.
    pub slice_ms: u32,
}

pub struct SharedDrive<P, G> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<MotorDriver<P, G>>>,
}

impl<P: PwmPort, G: GpioPort> SharedDrive<P, G> {
    pub fn new(driver: MotorDriver<P, G>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(driver)),
        }
    }

    /// Run `f` with exclusive access to the driver.
    pub fn with<R>(&self, f: impl FnOnce(&mut MotorDriver<P, G>) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn init(&self) {
        self.with(MotorDriver::init);
    }

    pub fn stop(&self) {
        self.with(MotorDriver::stop);
    }

    pub fn start(&self) -> Result<()> {
        self.with(MotorDriver::start)
    }

    pub fn set_direction(&self, direction: Direction) {
        self.with(|d| d.set_direction(direction));
    }

    pub fn toggle_direction(&self) -> Direction {
        self.with(MotorDriver::toggle_direction)
    }

    pub fn set_speed(&self, percent: u8) -> Result<u8> {
        self.with(|d| d.set_speed(percent))
    }

    /// Flip the IN1/IN2 trim of one motor. Returns the new trim.
    pub fn toggle_trim(&self, channel: PwmChannel) -> bool {
        self.with(|d| d.toggle_trim(channel))
    }

    pub fn clear_fault(&self) {
        self.with(MotorDriver::clear_fault);
    }

    pub fn state(&self) -> DriveState {
        self.with(|d| d.state())
    }

    pub fn motor(&self) -> MotorState {
        self.with(|d| d.motor())
    }

    pub fn is_running(&self) -> bool {
        self.with(|d| d.is_running())
    }

    /// Timed differential turn.
    ///
    /// Blocks the caller for up to `plan.duration_ms`, sleeping in
    /// `plan.slice_ms` slices with the lock released. If the drive was
    /// stopped or faulted during a slice the maneuver is abandoned early,
    /// even when a Start has already re-enabled it.
    /// Either way the recorded uniform speed is written back before
    /// returning, so `current_speed` is unchanged by a turn.
    pub fn turn(
        &self,
        direction: TurnDirection,
        plan: TurnPlan,
        delay: &mut impl DelayNs,
    ) -> Result<TurnOutcome> {
        self.with(|d| d.begin_turn(direction, plan.inner_speed, plan.outer_speed))?;
        info!("turn {:?}: holding {} ms", direction, plan.duration_ms);

        let slice = plan.slice_ms.max(1);
        let mut held = 0;
        let mut outcome = TurnOutcome::Completed;
        while held < plan.duration_ms {
            let step = slice.min(plan.duration_ms - held);
            delay.delay_ms(step);
            held += step;
            if self.with(|d| !d.is_running() || d.turn_interrupted()) {
                warn!("turn {:?}: interrupted after {} ms", direction, held);
                outcome = TurnOutcome::Aborted;
                break;
            }
        }

        self.with(MotorDriver::end_turn)?;
        Ok(outcome)
    }
}
