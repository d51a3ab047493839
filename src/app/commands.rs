//! Remote text command interpreter.
//!
//! Inbound payloads are short free-text messages from a phone remote (the
//! media-control buttons of a UART-over-BLE app send strings such as
//! `"FastForward"` or `"Stop"`). Matching is by substring against a fixed
//! vocabulary, tested in priority order; the first hit wins.
//!
//! Stop, Play, Shuffle and Rec are applied synchronously in the calling
//! (reception) context because braking must not wait for the next loop
//! tick. Turns are staged as intents for the control loop, which owns the
//! single maneuver in flight.

use log::{debug, info, warn};

use crate::app::ports::{CommandHandler, GpioPort, PwmChannel, PwmPort};
use crate::drivers::shared::SharedDrive;
use crate::intent::{CommandIntent, Intent};

/// Longest payload the interpreter will search. Bytes beyond this are
/// ignored; this is the data length of one notification at the default
/// BLE MTU.
pub const MAX_MESSAGE_LEN: usize = 20;

/// Recognised commands, after alias resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Drop standby immediately.
    Stop,
    /// Assert standby, resuming the last duty.
    Start,
    /// Toggle forward/reverse for both motors.
    Shuffle,
    /// Stage a left turn.
    TurnLeft,
    /// Stage a right turn.
    TurnRight,
    /// Flip the wiring trim of the left motor (motor A).
    TrimLeft,
}

/// Token table in match priority order. Safety-relevant tokens first.
pub const VOCABULARY: [(&[u8], Command); 8] = [
    (b"Stop", Command::Stop),
    (b"Pause", Command::Stop),
    (b"Play", Command::Start),
    (b"Start", Command::Start),
    (b"Shuffle", Command::Shuffle),
    (b"Rewind", Command::TurnLeft),
    (b"FastForward", Command::TurnRight),
    (b"Rec", Command::TrimLeft),
];

/// Resolve a raw payload to a command without side effects.
///
/// The search covers at most [`MAX_MESSAGE_LEN`] bytes and stops at the
/// first NUL, so an unterminated or padded buffer is handled the same way.
pub fn parse(message: &[u8]) -> Option<Command> {
    let bounded = &message[..message.len().min(MAX_MESSAGE_LEN)];
    let payload = match bounded.iter().position(|&b| b == 0) {
        Some(nul) => &bounded[..nul],
        None => bounded,
    };
    VOCABULARY
        .iter()
        .find(|(token, _)| contains(payload, token))
        .map(|&(_, cmd)| cmd)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Applies parsed commands to the shared drive and intent flags.
pub struct CommandInterpreter<'a, P, G> {
    drive: &'a SharedDrive<P, G>,
    intent: &'a CommandIntent,
}

impl<'a, P: PwmPort, G: GpioPort> CommandInterpreter<'a, P, G> {
    pub fn new(drive: &'a SharedDrive<P, G>, intent: &'a CommandIntent) -> Self {
        Self { drive, intent }
    }

    /// Parse and act on one message. Unrecognised input is a no-op.
    pub fn interpret(&self, message: &[u8]) -> Option<Command> {
        let Some(cmd) = parse(message) else {
            debug!("cmd: ignored {} byte message", message.len());
            return None;
        };

        match cmd {
            Command::Stop => {
                self.drive.stop();
                self.intent.raise(Intent::Stop);
                info!("cmd: stop");
            }
            Command::Start => match self.drive.start() {
                Ok(()) => {
                    self.intent.raise(Intent::Start);
                    info!("cmd: start");
                }
                Err(e) => warn!("cmd: start refused ({})", e),
            },
            Command::Shuffle => {
                let dir = self.drive.toggle_direction();
                self.intent.raise(Intent::Reverse);
                info!("cmd: direction now {:?}", dir);
            }
            Command::TurnLeft => {
                self.intent.raise(Intent::TurnLeft);
                info!("cmd: turn left staged");
            }
            Command::TurnRight => {
                self.intent.raise(Intent::TurnRight);
                info!("cmd: turn right staged");
            }
            Command::TrimLeft => {
                let inverted = self.drive.toggle_trim(PwmChannel::A);
                self.intent.raise(Intent::Reverse);
                info!("cmd: left motor trim inverted={}", inverted);
            }
        }
        Some(cmd)
    }
}

impl<P: PwmPort, G: GpioPort> CommandHandler for CommandInterpreter<'_, P, G> {
    fn on_message(&self, message: &[u8]) {
        let _ = self.interpret(message);
    }
}
