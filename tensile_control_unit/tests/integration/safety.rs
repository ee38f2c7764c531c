//! Integration test: interlocks and recovery.
//!
//! Emergency input, travel limit switches and homing timeout, each
//! followed by the reset path back to IDLE.

use tensile_common::tester::error::ErrorCode;
use tensile_common::tester::state::MachineState;
use tensile_control_unit::protocol::Response;

use super::{Bench, quick_config};

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn emergency_input_halts_running_test_within_one_tick() {
    let mut bench = Bench::quick();
    bench.home();
    bench.send("START");
    bench.run_until(400_000, |b| b.force() > 50.0);
    let peak_before = bench.runner.orchestrator().result().peak_force_n;

    bench.estop.press();
    bench.tick();

    assert_eq!(bench.state(), MachineState::Emergency);
    assert_eq!(
        bench.last().unwrap().to_string(),
        "ERROR 8 Emergency stop: Emergency input engaged"
    );
    let motion = bench.runner.motion();
    assert_eq!(motion.velocity(), 0.0);
    assert!(!motion.is_moving());
    assert!(!motion.is_enabled());

    let result = *bench.runner.orchestrator().result();
    assert!(result.peak_force_n >= peak_before);
    assert!(result.duration_ms > 0);
    assert!(!result.completed);
    assert!(!bench.runner.orchestrator().is_streaming());

    // Held: no motion, no further data, no repeated error.
    let position = bench.crosshead.position_mm();
    let emitted = bench.out.len();
    for _ in 0..5_000 {
        bench.tick();
    }
    assert_eq!(bench.crosshead.position_mm(), position);
    assert_eq!(bench.out.len(), emitted);
}

#[test]
fn emergency_reset_requires_release() {
    let mut bench = Bench::quick();
    bench.estop.press();
    bench.tick();
    assert_eq!(bench.state(), MachineState::Emergency);

    assert_eq!(
        bench.send("RESET"),
        Response::error_with(ErrorCode::Emergency, "Emergency input still engaged")
    );
    assert_eq!(bench.state(), MachineState::Emergency);

    bench.estop.release();
    assert_eq!(bench.send_line("RESET"), "OK Reset");
    assert_eq!(bench.state(), MachineState::Idle);

    // The machine works again after the reset.
    bench.home();
}

#[test]
fn emergency_during_homing_aborts_it() {
    let mut cfg = quick_config();
    cfg.simulation.start_position_mm = 20.0;
    let mut bench = Bench::new(&cfg);
    bench.send("HOME");
    for _ in 0..1_000 {
        bench.tick();
    }
    assert_eq!(bench.state(), MachineState::Homing);

    bench.estop.press();
    bench.tick();
    assert_eq!(bench.state(), MachineState::Emergency);
    assert!(!bench.runner.motion().is_homing());
    assert!(!bench.runner.motion().is_homed());

    let position = bench.crosshead.position_mm();
    for _ in 0..1_000 {
        bench.tick();
    }
    assert_eq!(bench.crosshead.position_mm(), position);
}

#[test]
fn estop_command_latches_until_reset() {
    let mut bench = Bench::quick();
    bench.home();
    assert_eq!(bench.send_line("ESTOP"), "OK Emergency stop");
    assert_eq!(bench.state(), MachineState::Emergency);

    assert_eq!(bench.send("UP"), Response::error(ErrorCode::NotReady));
    assert_eq!(bench.send("HOME"), Response::error(ErrorCode::Busy));

    // Input never engaged, so the reset goes through.
    assert_eq!(bench.send_line("RESET"), "OK Reset");
    assert_eq!(bench.state(), MachineState::Idle);
    assert!(bench.runner.motion().is_homed());
}

#[test]
fn homing_timeout_reports_not_homed() {
    let mut cfg = quick_config();
    cfg.simulation.start_position_mm = 20.0;
    cfg.motion.homing_timeout_ms = 200;
    let mut bench = Bench::new(&cfg);

    bench.send("HOME");
    bench.run_while(MachineState::Homing, 100_000);

    assert_eq!(bench.state(), MachineState::Error);
    assert_eq!(bench.last().unwrap().to_string(), "ERROR 7 Not homed: Homing timed out");
    assert!(!bench.runner.motion().is_homed());
    assert!(bench.crosshead.position_mm() > 1.0);
    // Deadline measured from the HOME tick.
    assert!(bench.now_us >= 200_000 && bench.now_us < 200_000 + 2 * bench.tick_us);

    assert_eq!(bench.send("START"), Response::error(ErrorCode::NotReady));
    assert_eq!(bench.send_line("RESET"), "OK Reset");
    assert_eq!(bench.state(), MachineState::Idle);
}

#[test]
fn reset_during_homing_cancels_it() {
    let mut cfg = quick_config();
    cfg.simulation.start_position_mm = 20.0;
    let mut bench = Bench::new(&cfg);
    bench.send("HOME");
    for _ in 0..100 {
        bench.tick();
    }
    assert_eq!(bench.send_line("RESET"), "OK Reset");
    assert_eq!(bench.state(), MachineState::Idle);
    assert!(!bench.runner.motion().is_homing());
    assert!(!bench.runner.motion().is_homed());
}

#[test]
fn top_limit_during_ready_jog_faults() {
    let mut cfg = quick_config();
    cfg.simulation.top_limit_mm = 12.0;
    let mut bench = Bench::new(&cfg);
    bench.home();

    assert_eq!(bench.send_line("UP"), "OK");
    bench.run_while(MachineState::Ready, 400_000);

    assert_eq!(bench.state(), MachineState::Error);
    assert_eq!(
        bench.last(),
        Some(&Response::error_with(ErrorCode::LimitReached, "Limit switch triggered"))
    );
    assert!((bench.crosshead.position_mm() - 12.0).abs() < 0.01);
    assert!(!bench.runner.motion().is_moving());
    assert!(!bench.runner.orchestrator().is_jog_active());

    // Error lamp solid after the next refresh.
    for _ in 0..3_000 {
        bench.tick();
    }
    assert!(bench.runner.lamps().error);
    assert!(!bench.runner.lamps().status);

    assert_eq!(bench.send_line("RESET"), "OK Reset");
    // Jogging away from the asserted switch is allowed.
    assert_eq!(bench.send_line("DOWN 1"), "OK");
    bench.run_until(100_000, |b| !b.runner.orchestrator().is_jog_active());
    assert!(bench.crosshead.position_mm() < 12.0);
}

#[test]
fn top_limit_while_running_faults_and_finalizes() {
    let mut cfg = quick_config();
    cfg.simulation.top_limit_mm = 30.0;
    let mut bench = Bench::new(&cfg);
    bench.home();
    bench.send("START");
    bench.run_while(MachineState::Running, 400_000);

    assert_eq!(bench.state(), MachineState::Error);
    assert_eq!(
        bench.last().unwrap().to_string(),
        "ERROR 6 Limit reached: Limit switch triggered"
    );
    let result = bench.runner.orchestrator().result();
    assert!(result.duration_ms > 0);
    assert!(result.peak_force_n > 0.0);
    assert!(!result.completed);
    assert!(!result.specimen_broke);
}

#[test]
fn bottom_limit_in_idle_only_stops_the_jog() {
    let mut bench = Bench::quick();
    assert_eq!(bench.send_line("DOWN"), "OK");
    bench.run_until(400_000, |b| !b.runner.orchestrator().is_jog_active());

    assert_eq!(bench.state(), MachineState::Idle);
    assert!(bench.crosshead.position_mm().abs() < 0.01);
    assert!(!bench.out.iter().any(Response::is_error));
}

#[test]
fn manual_motion_declined_while_busy() {
    let mut bench = Bench::quick();
    bench.send("HOME");
    assert_eq!(bench.send("UP"), Response::error(ErrorCode::Busy));
    assert_eq!(bench.send("GOTO 5"), Response::error(ErrorCode::Busy));
    bench.run_while(MachineState::Homing, 200_000);

    bench.send("START");
    assert_eq!(bench.send("DOWN 2"), Response::error(ErrorCode::NotReady));
    assert_eq!(bench.send("TARE"), Response::error(ErrorCode::Busy));
    assert_eq!(bench.send_line("RESET"), "ERROR 4 Busy: Test in progress");
    assert_eq!(bench.state(), MachineState::Running);
}
