//! Control loop: the single process-lifetime scheduling entity.
//!
//! [`ControlLoop`] polls the intent flags, runs staged turn maneuvers on the
//! shared drive and, in demo mode, ramps the uniform speed up and down
//! while nothing else is pending. All I/O flows through port traits and
//! the lock-guarded [`SharedDrive`], so the loop is testable with mock
//! adapters and a fake delay.
//!
//! ```text
//!  CommandIntent ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                    │      ControlLoop        │
//!    SharedDrive ◀── │  turns · ramp · faults  │ ◀── DelayNs
//!                    └────────────────────────┘
//! ```
//!
//! Policy decisions:
//!
//! - Left turns win over right turns; the loser stays pending.
//! - Turn intents are held, not dropped, while the drive is stopped or
//!   faulted. They run on the first iteration after a Start.
//! - A Stop during a turn aborts it, even if a Play follows within the same
//!   poll slice; the aborted intent is consumed.
//! - An iteration that runs a turn does not add a poll sleep: the turn
//!   already blocked for `turn_duration_ms` in poll-sized slices.

use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::config::{ControlMode, DriveConfig};
use crate::diagnostics::{FaultLog, FaultRecord};
use crate::drivers::motor::{DriveState, TurnDirection};
use crate::drivers::shared::{SharedDrive, TurnOutcome, TurnPlan};
use crate::error::{Error, Result};
use crate::intent::{CommandIntent, Intent};

use super::events::{DriveEvent, DriveStatus};
use super::ports::{EventSink, GpioPort, PwmPort};

// ───────────────────────────────────────────────────────────────
// Uptime-tracking delay
// ───────────────────────────────────────────────────────────────

/// Forwards to the real delay and accumulates the time slept. The control
/// loop spends nearly all of its wall time in here, so this doubles as
/// its uptime clock.
struct ClockedDelay<D> {
    inner: D,
    elapsed_ns: u64,
}

impl<D: DelayNs> ClockedDelay<D> {
    fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl<D: DelayNs> DelayNs for ClockedDelay<D> {
    fn delay_ns(&mut self, ns: u32) {
        self.inner.delay_ns(ns);
        self.elapsed_ns += u64::from(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.inner.delay_us(us);
        self.elapsed_ns += u64::from(us) * 1_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.inner.delay_ms(ms);
        self.elapsed_ns += u64::from(ms) * 1_000_000;
    }
}

// ───────────────────────────────────────────────────────────────
// Demo ramp
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RampPhase {
    Rising,
    Falling,
    Pause,
}

/// min → max → min in fixed steps, then a pause. The end points are each
/// held twice, once per direction of travel.
#[derive(Debug, Clone, Copy)]
struct Ramp {
    phase: RampPhase,
    speed: u8,
}

impl Ramp {
    fn new(min: u8) -> Self {
        Self {
            phase: RampPhase::Rising,
            speed: min,
        }
    }

    fn advance(&mut self, min: u8, max: u8, step: u8) {
        match self.phase {
            RampPhase::Rising if self.speed >= max => {
                self.phase = RampPhase::Falling;
                self.speed = max;
            }
            RampPhase::Rising => self.speed = self.speed.saturating_add(step).min(max),
            RampPhase::Falling if self.speed <= min => self.phase = RampPhase::Pause,
            RampPhase::Falling => self.speed = self.speed.saturating_sub(step).max(min),
            RampPhase::Pause => *self = Self::new(min),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

pub struct ControlLoop<'a, P, G, D, S> {
    drive: &'a SharedDrive<P, G>,
    intent: &'a CommandIntent,
    delay: ClockedDelay<D>,
    sink: S,
    config: DriveConfig,
    faults: FaultLog,
    ramp: Ramp,
    iterations: u64,
    last_state: DriveState,
    last_telemetry_ms: u64,
}

impl<'a, P, G, D, S> ControlLoop<'a, P, G, D, S>
where
    P: PwmPort,
    G: GpioPort,
    D: DelayNs,
    S: EventSink,
{
    /// Construct the loop. Does **not** touch the hardware; call [`start`]
    /// next.
    ///
    /// [`start`]: Self::start
    pub fn new(
        drive: &'a SharedDrive<P, G>,
        intent: &'a CommandIntent,
        delay: D,
        sink: S,
        config: DriveConfig,
    ) -> Self {
        let ramp = Ramp::new(config.min_speed);
        Self {
            drive,
            intent,
            delay: ClockedDelay {
                inner: delay,
                elapsed_ns: 0,
            },
            sink,
            config,
            faults: FaultLog::new(),
            ramp,
            iterations: 0,
            last_state: DriveState::Stopped,
            last_telemetry_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Validate the configuration, then initialise the pins and apply the
    /// start speed. An invalid configuration is refused before any pin is
    /// touched.
    pub fn start(&mut self) -> Result<()> {
        self.config.validate()?;
        self.drive.init();
        if let Err(e) = self.drive.set_speed(self.config.start_speed) {
            self.on_error(e);
            return Err(e);
        }
        self.last_state = self.drive.state();
        let status = self.status();
        self.sink.emit(&DriveEvent::Started(status));
        info!(
            "control: started in {:?} mode at {}%",
            self.config.mode, status.speed_percent
        );
        Ok(())
    }

    // ── Per-iteration orchestration ──────────────────────────

    /// One loop iteration: acknowledge direct commands, run at most one
    /// staged turn, otherwise idle (poll sleep or one demo ramp step).
    pub fn run_once(&mut self) -> Result<()> {
        self.iterations += 1;
        self.acknowledge_direct();
        self.observe_state();

        let result = match self.runnable_turn() {
            Some(direction) => self.execute_turn(direction),
            None => self.idle(),
        };
        if let Err(e) = result {
            self.on_error(e);
        }

        self.observe_state();
        self.maybe_report();
        result
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> DriveStatus {
        let (state, motor) = self.drive.with(|d| (d.state(), d.motor()));
        DriveStatus {
            state,
            direction: motor.direction,
            speed_percent: motor.speed_percent,
            pending: self.intent.snapshot(),
            fault_count: self.faults.total(),
            iterations: self.iterations,
        }
    }

    pub fn faults(&self) -> &FaultLog {
        &self.faults
    }

    /// Milliseconds spent in the loop's delays since construction.
    pub fn uptime_ms(&self) -> u64 {
        self.delay.elapsed_ms()
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    // ── Internal ──────────────────────────────────────────────

    /// Direct commands already acted in the reception context; the loop
    /// only needs to consume their bits so the ramp stops yielding to them.
    fn acknowledge_direct(&mut self) {
        for intent in [Intent::Stop, Intent::Start, Intent::Reverse] {
            if self.intent.is_pending(intent) {
                self.intent.clear(intent);
                debug!("control: acknowledged {:?}", intent);
            }
        }
    }

    fn runnable_turn(&self) -> Option<TurnDirection> {
        if !self.drive.is_running() {
            return None;
        }
        self.intent.next_turn()
    }

    fn execute_turn(&mut self, direction: TurnDirection) -> Result<()> {
        let plan = TurnPlan {
            inner_speed: self.config.turn_inner_speed,
            outer_speed: self.config.turn_outer_speed,
            duration_ms: self.config.turn_duration_ms,
            slice_ms: self.config.poll_interval_ms,
        };
        self.sink.emit(&DriveEvent::TurnStarted(direction));

        match self.drive.turn(direction, plan, &mut self.delay) {
            Ok(outcome) => {
                self.intent.clear(direction.into());
                self.sink.emit(&DriveEvent::TurnEnded { direction, outcome });
                Ok(())
            }
            // Stop landed between the runnable check and the maneuver;
            // the intent stays pending for after the next Start.
            Err(Error::Stopped) => {
                self.sink.emit(&DriveEvent::TurnEnded {
                    direction,
                    outcome: TurnOutcome::Aborted,
                });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn idle(&mut self) -> Result<()> {
        match self.config.mode {
            ControlMode::Demo if self.drive.is_running() => self.ramp_step(),
            _ => {
                self.delay.delay_ms(self.config.poll_interval_ms);
                Ok(())
            }
        }
    }

    fn ramp_step(&mut self) -> Result<()> {
        let hold_ms = if self.ramp.phase == RampPhase::Pause {
            self.config.ramp_pause_ms
        } else {
            let applied = self.drive.set_speed(self.ramp.speed)?;
            self.sink.emit(&DriveEvent::SpeedChanged(applied));
            self.config.ramp_step_delay_ms
        };

        // An interrupted step is repeated on the next idle iteration.
        if self.wait_interruptibly(hold_ms) {
            self.ramp.advance(
                self.config.min_speed,
                self.config.max_speed,
                self.config.ramp_step,
            );
        }
        Ok(())
    }

    /// Sleep `total_ms` in poll-interval slices. Returns `false` as soon as
    /// any intent is pending.
    fn wait_interruptibly(&mut self, total_ms: u32) -> bool {
        let slice = self.config.poll_interval_ms.max(1);
        let mut waited = 0;
        while waited < total_ms {
            let step = slice.min(total_ms - waited);
            self.delay.delay_ms(step);
            waited += step;
            if self.intent.any_pending() {
                return false;
            }
        }
        true
    }

    fn observe_state(&mut self) {
        let now = self.drive.state();
        if now != self.last_state {
            self.sink.emit(&DriveEvent::StateChanged {
                from: self.last_state,
                to: now,
            });
            self.last_state = now;
        }
    }

    fn on_error(&mut self, e: Error) {
        if let Error::PwmBusy { channel, attempts } = e {
            let record = FaultRecord {
                uptime_ms: self.delay.elapsed_ms(),
                channel,
                attempts,
            };
            self.faults.record(record);
            self.sink.emit(&DriveEvent::Fault(record));
        }
    }

    fn maybe_report(&mut self) {
        let interval = u64::from(self.config.telemetry_interval_ms);
        if interval == 0 {
            return;
        }
        let now = self.delay.elapsed_ms();
        if now.saturating_sub(self.last_telemetry_ms) >= interval {
            self.last_telemetry_ms = now;
            let status = self.status();
            self.sink.emit(&DriveEvent::Telemetry(status));
        }
    }
}
