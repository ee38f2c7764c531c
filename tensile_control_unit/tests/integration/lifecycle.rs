//! Integration test: test lifecycle on the simulated rig.
//!
//! Validates every way a running test ends:
//! 1. specimen break after the peak
//! 2. force limit (error)
//! 3. extension limit (normal stop)
//! 4. commanded move complete
//! 5. operator stop, pause and resume along the way

use tensile_common::tester::error::ErrorCode;
use tensile_common::tester::state::MachineState;
use tensile_control_unit::protocol::Response;

use super::{Bench, quick_config};

const TEST_TICKS: u64 = 400_000;

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn homing_zeroes_above_the_bottom_switch() {
    let mut bench = Bench::quick();
    assert!(!bench.runner.motion().is_homed());
    bench.home();

    assert!(bench.runner.motion().is_homed());
    assert_eq!(bench.runner.motion().position(), 0);
    // Backed off the configured 2 mm from the switch.
    assert!((bench.crosshead.position_mm() - 2.0).abs() < 0.01);
    assert_eq!(bench.last(), Some(&Response::ok_with("Homing complete")));
}

#[test]
fn test_runs_to_specimen_break() {
    let mut bench = Bench::quick();
    bench.home();
    assert_eq!(bench.send_line("START"), "OK Test started");
    assert_eq!(bench.state(), MachineState::Running);

    bench.run_while(MachineState::Running, TEST_TICKS);

    assert_eq!(bench.state(), MachineState::Stopped);
    assert_eq!(bench.last(), Some(&Response::ok_with("Specimen break detected")));
    assert!(bench.specimen.is_broken());

    let result = *bench.runner.orchestrator().result();
    assert!(result.specimen_broke);
    assert!(!result.completed);
    // Plateau of the simulated specimen.
    assert!((result.peak_force_n - 300.0).abs() < 1e-6);
    // Taut 22 mm above home, plateau after 12 mm more, break after 30 mm.
    assert!((result.extension_at_peak_mm - 34.0).abs() < 0.1);
    assert!((result.break_extension_mm - 52.0).abs() < 0.1);
    assert!(result.break_force_n < 150.0);
    assert!(result.duration_ms > 0);
    assert_eq!(result.data_points as usize, bench.data_points());
    assert!(!bench.runner.motion().is_moving());
}

#[test]
fn data_points_follow_test_clock() {
    let mut bench = Bench::quick();
    bench.home();
    bench.send("START");
    bench.run_while(MachineState::Running, TEST_TICKS);

    let points: Vec<_> = bench
        .out
        .iter()
        .filter_map(|r| match r {
            Response::Data(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert!(points.len() > 100);
    assert_eq!(points[0].elapsed_ms, 0);
    assert!(points.windows(2).all(|w| w[0].elapsed_ms < w[1].elapsed_ms));
    // Periodic floor: never more than one interval between points.
    assert!(points.windows(2).all(|w| w[1].elapsed_ms - w[0].elapsed_ms <= 50));
    assert!(points.iter().all(|p| p.stress == 0.0 && p.strain == 0.0));
}

#[test]
fn force_limit_stops_with_overload_error() {
    let mut bench = Bench::quick();
    bench.home();
    assert_eq!(bench.send_line("MAXFORCE 100"), "OK");
    bench.send("START");
    bench.run_while(MachineState::Running, TEST_TICKS);

    assert_eq!(bench.state(), MachineState::Stopped);
    assert_eq!(
        bench.last(),
        Some(&Response::error_with(ErrorCode::Overload, "Force limit exceeded"))
    );
    assert_eq!(
        bench.last().unwrap().to_string(),
        "ERROR 5 Force overload: Force limit exceeded"
    );
    assert!(bench.force() >= 100.0);
    assert!(!bench.runner.orchestrator().result().completed);
    assert!(!bench.specimen.is_broken());
}

#[test]
fn extension_limit_is_a_normal_stop() {
    let mut bench = Bench::quick();
    bench.home();
    bench.send("MAXEXT 10");
    bench.send("START");
    bench.run_while(MachineState::Running, TEST_TICKS);

    assert_eq!(bench.state(), MachineState::Stopped);
    assert_eq!(bench.last(), Some(&Response::ok_with("Extension limit reached")));
    assert_eq!(bench.runner.motion().position(), 4_000);
    assert!(!bench.runner.orchestrator().result().completed);
}

#[test]
fn reaching_the_target_first_completes_the_test() {
    let mut bench = Bench::quick();
    bench.home();
    // Jog up 5 mm, so the absolute 10 mm target lies 5 mm ahead.
    assert_eq!(bench.send_line("UP 5"), "OK");
    bench.run_until(TEST_TICKS, |b| !b.runner.orchestrator().is_jog_active());
    assert_eq!(bench.runner.motion().position(), 2_000);

    bench.send("MAXEXT 10");
    bench.send("START");
    assert!((bench.runner.orchestrator().start_position_mm() - 5.0).abs() < 1e-9);
    bench.run_while(MachineState::Running, TEST_TICKS);

    assert_eq!(bench.last(), Some(&Response::ok_with("Test completed")));
    assert!(bench.runner.orchestrator().result().completed);
}

#[test]
fn pause_holds_then_resume_finishes() {
    let mut bench = Bench::quick();
    bench.home();
    bench.send("START");
    for _ in 0..20_000 {
        bench.tick();
    }

    assert_eq!(bench.send_line("PAUSE"), "OK Test paused");
    bench.run_until(50_000, |b| !b.runner.motion().is_moving());
    let held_at = bench.runner.motion().position();
    let points = bench.data_points();
    for _ in 0..5_000 {
        bench.tick();
    }
    assert_eq!(bench.state(), MachineState::Paused);
    assert_eq!(bench.runner.motion().position(), held_at);
    assert_eq!(bench.data_points(), points);
    assert_eq!(bench.send_line("PAUSE"), "ERROR 3 Not ready");

    assert_eq!(bench.send_line("RESUME"), "OK Test resumed");
    bench.run_while(MachineState::Running, TEST_TICKS);
    assert!(bench.runner.orchestrator().result().specimen_broke);
}

#[test]
fn stop_then_rehome_and_restart() {
    let mut bench = Bench::quick();
    bench.home();
    bench.send("START");
    for _ in 0..30_000 {
        bench.tick();
    }
    assert_eq!(bench.send_line("STOP"), "OK Test stopped");
    assert_eq!(bench.state(), MachineState::Stopped);
    assert_eq!(bench.runner.motion().distance_to_go(), 0);
    let first = *bench.runner.orchestrator().result();
    assert!(first.duration_ms > 0);

    // STOPPED is not READY.
    assert_eq!(bench.send_line("START"), "ERROR 3 Not ready");
    assert_eq!(bench.send_line("STOP"), "ERROR 3 Not ready");

    bench.home();
    bench.specimen.replace();
    assert_eq!(bench.send_line("START"), "OK Test started");
    let fresh = *bench.runner.orchestrator().result();
    assert_eq!(fresh.peak_force_n, 0.0);
    assert_eq!(fresh.data_points, 0);
    assert!(!fresh.specimen_broke);
}

#[test]
fn start_declined_outside_ready() {
    let mut bench = Bench::quick();
    assert_eq!(bench.send("START"), Response::error(ErrorCode::NotReady));
    assert_eq!(bench.state(), MachineState::Idle);

    bench.send("HOME");
    assert_eq!(bench.send("START"), Response::error(ErrorCode::NotReady));
    assert_eq!(bench.state(), MachineState::Homing);

    bench.send("ESTOP");
    assert_eq!(bench.send("START"), Response::error(ErrorCode::NotReady));
    assert_eq!(bench.state(), MachineState::Emergency);
}

#[test]
fn speed_setting_drives_the_test() {
    let mut cfg = quick_config();
    cfg.test.speed_mm_s = 1.0;
    let mut bench = Bench::new(&cfg);
    bench.home();
    assert_eq!(bench.send_line("SPEED 5"), "OK");
    assert_eq!(bench.send_line("CONFIG"), "CONFIG SPD:5.00 MAXF:450.0 MAXE:100.0 SR:50");
    bench.send("START");
    assert_eq!(bench.runner.motion().max_velocity(), 2_000.0);

    bench.run_until(TEST_TICKS, |b| b.runner.motion().velocity() >= 2_000.0);
    for _ in 0..1_000 {
        bench.tick();
        assert!(bench.runner.motion().velocity() <= 2_000.0);
    }
}
