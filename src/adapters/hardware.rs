//! Hardware adapter bridging embedded-hal peripherals to the drive ports.
//!
//! [`HalPwm`] wraps two [`SetDutyCycle`] channels as a [`PwmPort`];
//! [`HalPins`] wraps the five TB6612FNG lines as a [`GpioPort`]. On ESP-IDF
//! these are `LedcDriver`s and `PinDriver`s; on the host any embedded-hal
//! implementation works.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::app::ports::{DrivePin, GpioPort, PwmChannel, PwmError, PwmPort};

/// Two duty-cycle outputs, A (left) and B (right).
pub struct HalPwm<A, B> {
    a: A,
    b: B,
}

impl<A: SetDutyCycle, B: SetDutyCycle> HalPwm<A, B> {
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

impl<A: SetDutyCycle, B: SetDutyCycle> PwmPort for HalPwm<A, B> {
    /// Any driver error is reported as [`PwmError::Busy`] so the motor
    /// driver's bounded retry decides when it becomes a fault.
    fn set_duty(&mut self, channel: PwmChannel, percent: u8) -> Result<(), PwmError> {
        let percent = percent.min(100);
        let ok = match channel {
            PwmChannel::A => self.a.set_duty_cycle_percent(percent).is_ok(),
            PwmChannel::B => self.b.set_duty_cycle_percent(percent).is_ok(),
        };
        if ok { Ok(()) } else { Err(PwmError::Busy) }
    }
}

/// Direction and standby outputs. All five share one pin type; on ESP-IDF
/// that is a downgraded `PinDriver<AnyOutputPin, Output>`.
pub struct HalPins<O> {
    ain1: O,
    ain2: O,
    bin1: O,
    bin2: O,
    standby: O,
}

impl<O: OutputPin> HalPins<O> {
    pub fn new(ain1: O, ain2: O, bin1: O, bin2: O, standby: O) -> Self {
        Self {
            ain1,
            ain2,
            bin1,
            bin2,
            standby,
        }
    }

    fn line(&mut self, pin: DrivePin) -> &mut O {
        match pin {
            DrivePin::Ain1 => &mut self.ain1,
            DrivePin::Ain2 => &mut self.ain2,
            DrivePin::Bin1 => &mut self.bin1,
            DrivePin::Bin2 => &mut self.bin2,
            DrivePin::Standby => &mut self.standby,
        }
    }
}

impl<O: OutputPin> GpioPort for HalPins<O> {
    fn set_pin(&mut self, pin: DrivePin) {
        if let Err(e) = self.line(pin).set_high() {
            warn!("gpio: set {:?} failed: {:?}", pin, e);
        }
    }

    fn clear_pin(&mut self, pin: DrivePin) {
        if let Err(e) = self.line(pin).set_low() {
            warn!("gpio: clear {:?} failed: {:?}", pin, e);
        }
    }
}
