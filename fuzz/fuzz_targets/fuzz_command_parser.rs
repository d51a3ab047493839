//! Fuzz target: `parse` and `CommandInterpreter::interpret`
//!
//! Feeds arbitrary payloads through the text parser and a live
//! interpreter wired to no-op hardware. Asserts that parsing never panics,
//! only the first MAX_MESSAGE_LEN bytes matter, and the interpreter agrees
//! with the pure parser.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use twindrive::app::commands::{CommandInterpreter, MAX_MESSAGE_LEN, parse};
use twindrive::app::ports::{DrivePin, GpioPort, PwmChannel, PwmError, PwmPort};
use twindrive::config::DriveConfig;
use twindrive::drivers::motor::MotorDriver;
use twindrive::drivers::shared::SharedDrive;
use twindrive::intent::CommandIntent;

struct NullPwm;

impl PwmPort for NullPwm {
    fn set_duty(&mut self, _channel: PwmChannel, _percent: u8) -> Result<(), PwmError> {
        Ok(())
    }
}

struct NullGpio;

impl GpioPort for NullGpio {
    fn set_pin(&mut self, _pin: DrivePin) {}
    fn clear_pin(&mut self, _pin: DrivePin) {}
}

fuzz_target!(|data: &[u8]| {
    let parsed = parse(data);
    let bounded = &data[..data.len().min(MAX_MESSAGE_LEN)];
    assert_eq!(parsed, parse(bounded), "bytes past the bound changed the result");

    let drive = SharedDrive::new(MotorDriver::new(NullPwm, NullGpio, &DriveConfig::default()));
    drive.init();
    let intent = CommandIntent::new();
    let interp = CommandInterpreter::new(&drive, &intent);
    assert_eq!(interp.interpret(data), parsed);
});
