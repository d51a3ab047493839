//! Integration tests for the ControlLoop → SharedDrive → mock hardware
//! pipeline, with commands injected through the interpreter at fixed
//! points on the fake clock.

use std::cell::RefCell;
use std::rc::Rc;

use crate::mock_hw::{Bench, MockDelay, RecordingSink, rig, test_config};

use twindrive::Error;
use twindrive::app::commands::CommandInterpreter;
use twindrive::app::events::DriveEvent;
use twindrive::app::ports::{CommandHandler, PwmChannel};
use twindrive::app::service::ControlLoop;
use twindrive::config::{ConfigError, ControlMode, DriveConfig};
use twindrive::drivers::motor::{DriveState, TurnDirection};
use twindrive::drivers::shared::TurnOutcome;
use twindrive::intent::{CommandIntent, Intent};

/// Delay hook that records the duty pair at every tick.
fn duty_trace(bench: &Bench) -> (Rc<RefCell<Vec<[u8; 2]>>>, impl FnMut(u64) + 'static) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let bench = bench.clone();
    (seen, move |_| sink.borrow_mut().push(bench.hw().duty))
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_applies_start_speed_forward() {
    let config = test_config();
    let (drive, bench) = rig(&config);
    let intent = CommandIntent::new();
    let mut control = ControlLoop::new(&drive, &intent, MockDelay::new(), RecordingSink::default(), config);

    control.start().unwrap();

    assert_eq!(bench.hw().duty, [50, 50]);
    assert!(bench.hw().standby());
    assert_eq!(control.status().state, DriveState::Idle);
    assert!(matches!(control.sink().events[0], DriveEvent::Started(s) if s.speed_percent == 50));
}

#[test]
fn start_rejects_invalid_config_before_touching_pins() {
    let config = DriveConfig {
        min_speed: 95,
        ..test_config()
    };
    let (drive, bench) = rig(&config);
    let intent = CommandIntent::new();
    let mut control = ControlLoop::new(&drive, &intent, MockDelay::new(), RecordingSink::default(), config);

    assert_eq!(
        control.start(),
        Err(Error::Config(ConfigError::ValidationFailed(
            "min_speed must be <= max_speed"
        )))
    );
    assert!(bench.hw().calls.is_empty());
    assert!(control.sink().events.is_empty());
    assert_eq!(drive.state(), DriveState::Stopped);
}

#[test]
fn idle_poll_mode_only_sleeps() {
    let config = test_config();
    let (drive, bench) = rig(&config);
    let intent = CommandIntent::new();
    let mut control = ControlLoop::new(&drive, &intent, MockDelay::new(), RecordingSink::default(), config);
    control.start().unwrap();
    let writes = bench.hw().calls.len();

    for _ in 0..10 {
        control.run_once().unwrap();
    }

    assert_eq!(bench.hw().calls.len(), writes);
    assert_eq!(control.uptime_ms(), 500);
    assert_eq!(control.iterations(), 10);
}

// ── Turns ─────────────────────────────────────────────────────

#[test]
fn left_turn_runs_asymmetric_then_restores_speed() {
    let config = test_config();
    let (drive, bench) = rig(&config);
    let intent = CommandIntent::new();
    let (seen, trace) = duty_trace(&bench);
    let mut control = ControlLoop::new(
        &drive,
        &intent,
        MockDelay::with_hook(trace),
        RecordingSink::default(),
        config,
    );
    control.start().unwrap();

    intent.raise(Intent::TurnLeft);
    control.run_once().unwrap();

    assert_eq!(seen.borrow()[0], [20, 80], "left turn slows motor A");
    assert_eq!(bench.hw().duty, [50, 50]);
    assert_eq!(drive.motor().speed_percent, 50);
    assert!(intent.snapshot().is_empty());
    assert_eq!(control.uptime_ms(), 500);

    let events = &control.sink().events;
    assert!(events.contains(&DriveEvent::TurnStarted(TurnDirection::Left)));
    assert!(events.contains(&DriveEvent::TurnEnded {
        direction: TurnDirection::Left,
        outcome: TurnOutcome::Completed,
    }));
}

#[test]
fn turn_iteration_adds_no_poll_sleep() {
    let config = test_config();
    let (drive, _bench) = rig(&config);
    let intent = CommandIntent::new();
    let mut control = ControlLoop::new(&drive, &intent, MockDelay::new(), RecordingSink::default(), config);
    control.start().unwrap();

    intent.raise(Intent::TurnRight);
    control.run_once().unwrap();
    assert_eq!(control.uptime_ms(), 500, "only the turn hold");

    control.run_once().unwrap();
    assert_eq!(control.uptime_ms(), 550, "idle iteration sleeps one poll interval");
}

#[test]
fn left_wins_when_both_turns_are_pending() {
    let config = test_config();
    let (drive, bench) = rig(&config);
    let intent = CommandIntent::new();
    let (seen, trace) = duty_trace(&bench);
    let mut control = ControlLoop::new(
        &drive,
        &intent,
        MockDelay::with_hook(trace),
        RecordingSink::default(),
        config,
    );
    control.start().unwrap();

    intent.raise(Intent::TurnRight);
    intent.raise(Intent::TurnLeft);
    control.run_once().unwrap();
    assert_eq!(seen.borrow()[0], [20, 80]);
    assert!(intent.is_pending(Intent::TurnRight));
    assert!(!intent.is_pending(Intent::TurnLeft));

    seen.borrow_mut().clear();
    control.run_once().unwrap();
    assert_eq!(seen.borrow()[0], [80, 20], "right turn slows motor B");
    assert!(intent.snapshot().is_empty());
    assert_eq!(bench.hw().duty, [50, 50]);
}

#[test]
fn turn_staged_while_stopped_runs_after_play() {
    let config = test_config();
    let (drive, bench) = rig(&config);
    let intent = CommandIntent::new();
    let interp = CommandInterpreter::new(&drive, &intent);
    let mut control = ControlLoop::new(&drive, &intent, MockDelay::new(), RecordingSink::default(), config);
    control.start().unwrap();

    interp.on_message(b"Stop");
    interp.on_message(b"FastForward");
    control.run_once().unwrap();

    assert!(intent.is_pending(Intent::TurnRight), "held while stopped");
    assert!(!intent.is_pending(Intent::Stop), "direct stop acknowledged");
    assert_eq!(control.uptime_ms(), 50);
    assert!(!bench.hw().standby());

    interp.on_message(b"Play");
    control.run_once().unwrap();

    assert!(intent.snapshot().is_empty());
    assert_eq!(control.uptime_ms(), 550);
    assert!(control.sink().events.contains(&DriveEvent::TurnEnded {
        direction: TurnDirection::Right,
        outcome: TurnOutcome::Completed,
    }));
}

#[test]
fn stop_mid_turn_aborts_and_consumes_the_turn() {
    let config = test_config();
    let (drive, bench) = rig(&config);
    let intent = CommandIntent::new();
    let interp = CommandInterpreter::new(&drive, &intent);
    let delay = MockDelay::with_hook(move |now| {
        if now == 200 {
            interp.on_message(b"Stop");
        }
    });
    let mut control = ControlLoop::new(&drive, &intent, delay, RecordingSink::default(), config);
    control.start().unwrap();

    intent.raise(Intent::TurnLeft);
    control.run_once().unwrap();

    assert_eq!(control.uptime_ms(), 200);
    assert_eq!(drive.state(), DriveState::Stopped);
    assert!(!bench.hw().standby());
    assert_eq!(bench.hw().duty, [50, 50], "uniform duty restored");
    assert!(!intent.is_pending(Intent::TurnLeft));
    assert!(intent.is_pending(Intent::Stop));

    let events = &control.sink().events;
    assert!(events.contains(&DriveEvent::TurnEnded {
        direction: TurnDirection::Left,
        outcome: TurnOutcome::Aborted,
    }));
    assert!(events.contains(&DriveEvent::StateChanged {
        from: DriveState::Idle,
        to: DriveState::Stopped,
    }));
}

#[test]
fn stop_and_play_in_one_slice_still_abort_the_turn() {
    let config = test_config();
    let (drive, bench) = rig(&config);
    let intent = CommandIntent::new();
    let interp = CommandInterpreter::new(&drive, &intent);
    let delay = MockDelay::with_hook(move |now| {
        if now == 100 {
            interp.on_message(b"Stop");
            interp.on_message(b"Play");
        }
    });
    let mut control = ControlLoop::new(&drive, &intent, delay, RecordingSink::default(), config);
    control.start().unwrap();

    intent.raise(Intent::TurnLeft);
    control.run_once().unwrap();

    assert_eq!(control.uptime_ms(), 100, "abandoned at the slice that saw the Stop");
    assert_eq!(drive.state(), DriveState::Idle);
    assert!(bench.hw().standby());
    assert_eq!(bench.hw().duty, [50, 50], "uniform duty restored");
    assert!(!intent.is_pending(Intent::TurnLeft));
    assert!(control.sink().events.contains(&DriveEvent::TurnEnded {
        direction: TurnDirection::Left,
        outcome: TurnOutcome::Aborted,
    }));
}

#[test]
fn turn_speeds_are_clamped_to_the_envelope() {
    let config = DriveConfig {
        turn_inner_speed: 0,
        turn_outer_speed: 100,
        ..test_config()
    };
    let (drive, bench) = rig(&config);
    let intent = CommandIntent::new();
    let (seen, trace) = duty_trace(&bench);
    let mut control = ControlLoop::new(
        &drive,
        &intent,
        MockDelay::with_hook(trace),
        RecordingSink::default(),
        config,
    );
    control.start().unwrap();

    intent.raise(Intent::TurnLeft);
    control.run_once().unwrap();
    assert_eq!(seen.borrow()[0], [10, 90]);
}

// ── Faults ────────────────────────────────────────────────────

#[test]
fn pwm_fault_is_recorded_and_drive_halted() {
    let config = test_config();
    let (drive, bench) = rig(&config);
    let intent = CommandIntent::new();
    let interp = CommandInterpreter::new(&drive, &intent);
    let mut control = ControlLoop::new(&drive, &intent, MockDelay::new(), RecordingSink::default(), config);
    control.start().unwrap();

    bench.hw().busy[1] = u32::MAX;
    intent.raise(Intent::TurnLeft);
    let err = control.run_once().unwrap_err();

    assert_eq!(
        err,
        Error::PwmBusy {
            channel: PwmChannel::B,
            attempts: 4
        }
    );
    assert_eq!(drive.state(), DriveState::Faulted(PwmChannel::B));
    assert!(!bench.hw().standby());
    assert_eq!(control.faults().total(), 1);
    assert_eq!(control.faults().last().map(|f| f.channel), Some(PwmChannel::B));
    assert_eq!(control.status().fault_count, 1);
    assert!(intent.is_pending(Intent::TurnLeft), "failed turn stays staged");

    let events = &control.sink().events;
    assert!(events.iter().any(|e| matches!(e, DriveEvent::Fault(f) if f.attempts == 4)));
    assert!(events.contains(&DriveEvent::StateChanged {
        from: DriveState::Idle,
        to: DriveState::Faulted(PwmChannel::B),
    }));

    // Faulted: the loop idles and the turn waits.
    control.run_once().unwrap();
    assert!(intent.is_pending(Intent::TurnLeft));

    bench.hw().busy[1] = 0;
    drive.clear_fault();
    interp.on_message(b"Play");
    control.run_once().unwrap();
    assert!(intent.snapshot().is_empty());
    assert_eq!(bench.hw().duty, [50, 50]);
    assert_eq!(control.faults().total(), 1);
}

#[test]
fn transient_busy_within_budget_is_not_a_fault() {
    let config = test_config();
    let (drive, bench) = rig(&config);
    let intent = CommandIntent::new();
    let mut control = ControlLoop::new(&drive, &intent, MockDelay::new(), RecordingSink::default(), config);
    control.start().unwrap();

    bench.hw().busy = [3, 3];
    intent.raise(Intent::TurnRight);
    control.run_once().unwrap();

    assert_eq!(drive.state(), DriveState::Idle);
    assert!(control.faults().is_empty());
    assert_eq!(bench.hw().duty, [50, 50]);
}

// ── Demo ramp ─────────────────────────────────────────────────

#[test]
fn demo_ramp_yields_to_stop_and_repeats_the_step() {
    let config = DriveConfig {
        mode: ControlMode::Demo,
        ..test_config()
    };
    let (drive, _bench) = rig(&config);
    let intent = CommandIntent::new();
    let interp = CommandInterpreter::new(&drive, &intent);
    let stopper = CommandInterpreter::new(&drive, &intent);
    let delay = MockDelay::with_hook(move |now| {
        if now == 2_300 {
            stopper.on_message(b"Stop");
        }
    });
    let mut control = ControlLoop::new(&drive, &intent, delay, RecordingSink::default(), config);
    control.start().unwrap();

    control.run_once().unwrap();
    control.run_once().unwrap();
    assert_eq!(control.uptime_ms(), 2_000);
    assert_eq!(control.sink().speeds(), [10, 20]);

    // Third step is cut short by the Stop at t=2300.
    control.run_once().unwrap();
    assert_eq!(control.uptime_ms(), 2_300);

    // Stopped: plain poll sleep, no ramp writes.
    control.run_once().unwrap();
    assert_eq!(control.uptime_ms(), 2_350);
    assert_eq!(control.sink().speeds(), [10, 20, 30]);

    interp.on_message(b"Play");
    control.run_once().unwrap();
    assert_eq!(control.sink().speeds(), [10, 20, 30, 30]);
    assert_eq!(drive.motor().speed_percent, 30);
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn telemetry_is_emitted_on_interval() {
    let config = DriveConfig {
        telemetry_interval_ms: 100,
        ..test_config()
    };
    let (drive, _bench) = rig(&config);
    let intent = CommandIntent::new();
    let mut control = ControlLoop::new(&drive, &intent, MockDelay::new(), RecordingSink::default(), config);
    control.start().unwrap();

    for _ in 0..4 {
        control.run_once().unwrap();
    }

    let reports: Vec<_> = control
        .sink()
        .events
        .iter()
        .filter_map(|e| match e {
            DriveEvent::Telemetry(s) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].iterations, 2);
    assert_eq!(reports[1].iterations, 4);
    assert_eq!(reports[1].speed_percent, 50);
}

// ── Concurrency ───────────────────────────────────────────────

#[test]
fn concurrent_commands_keep_the_bridge_consistent() {
    let config = test_config();
    let (drive, bench) = rig(&config);
    let intent = CommandIntent::new();
    let mut control = ControlLoop::new(&drive, &intent, MockDelay::new(), RecordingSink::default(), config);
    control.start().unwrap();

    std::thread::scope(|s| {
        s.spawn(|| {
            let interp = CommandInterpreter::new(&drive, &intent);
            let script: [&[u8]; 6] = [b"Rewind", b"Shuffle", b"FastForward", b"Stop", b"Play", b"Shuffle"];
            for message in script.iter().cycle().take(300) {
                interp.on_message(message);
                std::thread::yield_now();
            }
            interp.on_message(b"Play");
        });
        for _ in 0..300 {
            control.run_once().unwrap();
        }
    });

    // Drain whatever the script left staged.
    for _ in 0..4 {
        control.run_once().unwrap();
    }

    let hw = bench.hw();
    assert_eq!(hw.shoot_through, 0);
    assert_eq!(hw.duty, [50, 50], "no turn left half-applied");
    assert!(hw.standby());
    drop(hw);
    assert_eq!(drive.state(), DriveState::Idle);
    assert!(control.faults().is_empty());
}
