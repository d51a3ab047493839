//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured drive events to the
//! logger (UART console in production). A telemetry characteristic or
//! other transport would implement the same trait.

use log::{error, info, warn};

use crate::app::events::DriveEvent;
use crate::app::ports::EventSink;
use crate::drivers::shared::TurnOutcome;

/// Adapter that logs every [`DriveEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &DriveEvent) {
        match event {
            DriveEvent::Telemetry(s) => {
                info!(
                    "TELEM | state={:?} | dir={:?} | speed={}% | pending=0b{:05b} | \
                     faults={} | iter={}",
                    s.state,
                    s.direction,
                    s.speed_percent,
                    s.pending.bits(),
                    s.fault_count,
                    s.iterations,
                );
            }
            DriveEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            DriveEvent::TurnStarted(dir) => {
                info!("TURN  | {:?} start", dir);
            }
            DriveEvent::TurnEnded { direction, outcome } => match outcome {
                TurnOutcome::Completed => info!("TURN  | {:?} done", direction),
                TurnOutcome::Aborted => warn!("TURN  | {:?} aborted", direction),
            },
            DriveEvent::SpeedChanged(speed) => {
                info!("SPEED | {}%", speed);
            }
            DriveEvent::Fault(f) => {
                error!(
                    "FAULT | {} busy x{} at t={}ms",
                    f.channel, f.attempts, f.uptime_ms
                );
            }
            DriveEvent::Started(s) => {
                info!("START | state={:?} speed={}%", s.state, s.speed_percent);
            }
        }
    }
}
