//! Outbound drive events.
//!
//! The [`ControlLoop`](super::service::ControlLoop) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them.

use crate::diagnostics::FaultRecord;
use crate::drivers::motor::{Direction, DriveState, TurnDirection};
use crate::drivers::shared::TurnOutcome;
use crate::intent::IntentSet;

/// Structured events emitted by the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveEvent {
    /// The control loop has started (carries the initial status).
    Started(DriveStatus),

    /// The driver state changed since the previous iteration. Catches
    /// transitions made from the reception context as well.
    StateChanged { from: DriveState, to: DriveState },

    /// A staged turn began.
    TurnStarted(TurnDirection),

    /// A turn ended, normally or cut short by a Stop.
    TurnEnded {
        direction: TurnDirection,
        outcome: TurnOutcome,
    },

    /// The demo ramp applied a new uniform speed.
    SpeedChanged(u8),

    /// A hardware fault halted actuation.
    Fault(FaultRecord),

    /// Periodic status snapshot.
    Telemetry(DriveStatus),
}

/// A point-in-time status snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveStatus {
    pub state: DriveState,
    pub direction: Direction,
    pub speed_percent: u8,
    pub pending: IntentSet,
    pub fault_count: u32,
    pub iterations: u64,
}
