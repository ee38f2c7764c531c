//! Integration test: a command session over the byte channel.
//!
//! Raw input bytes go through the console source, the cycle and the line
//! writer; assertions are on the text that would reach the host.

use std::sync::mpsc;

use tensile_common::tester::state::MachineState;
use tensile_control_unit::console::ConsoleSource;
use tensile_control_unit::cycle::CommandSource;
use tensile_control_unit::protocol::LineWriter;

use super::{Bench, quick_config};

// ── Helpers ─────────────────────────────────────────────────────────

/// Feed `input` in one chunk, tick until every command is consumed plus
/// `extra_ticks`, and return the output lines.
fn session(bench: &mut Bench, input: &[u8], extra_ticks: u64) -> Vec<String> {
    let (tx, rx) = mpsc::channel();
    let estop = bench.estop.clone();
    let mut source = ConsoleSource::new(rx, move |line: &str| match line {
        "ESTOP" => estop.press(),
        "RELEASE" => estop.release(),
        _ => {}
    });
    let mut sink = LineWriter::new(Vec::new());
    tx.send(input.to_vec()).unwrap();

    let mut idle = 0;
    while idle < extra_ticks {
        let command = source.poll();
        if command.is_none() {
            idle += 1;
        }
        bench.now_us += bench.tick_us;
        bench.runner.tick(command, bench.now_us, &mut sink);
    }

    let text = String::from_utf8(sink.into_inner()).unwrap();
    text.lines().map(str::to_string).collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn queries_and_configuration() {
    let mut bench = Bench::quick();
    let lines = session(
        &mut bench,
        b"id\r\n?\nSTATUS\nCONFIG\nSPEED 2.5\nsrate 100\nMaxForce 300\nMAXEXT 80\nCONFIG\nFORCE\nPOS\n",
        1,
    );
    assert_eq!(
        lines,
        [
            "ID TensileTester V2.0.0 DIY-Pico",
            "ID TensileTester V2.0.0 DIY-Pico",
            "STATUS IDLE F:0.00 P:0.000 R:0",
            "CONFIG SPD:10.00 MAXF:450.0 MAXE:100.0 SR:50",
            "OK",
            "OK",
            "OK",
            "OK",
            "CONFIG SPD:2.50 MAXF:300.0 MAXE:80.0 SR:100",
            "FORCE 0.000",
            "POS 0.000",
        ]
    );
}

#[test]
fn malformed_commands_are_answered() {
    let mut bench = Bench::quick();
    let lines = session(
        &mut bench,
        b"JUMP\nSPEED\nSPEED fast\nSPEED 250\nSRATE 5\nMAXFORCE 600\nCALFACTOR 0\nCAL\nDATA\nGOTO\n\n\n",
        1,
    );
    assert_eq!(
        lines,
        [
            "ERROR 1 Unknown command",
            "ERROR 2 Invalid parameter: Parameter required",
            "ERROR 2 Invalid parameter",
            "ERROR 2 Invalid parameter",
            "ERROR 2 Invalid parameter",
            "ERROR 2 Invalid parameter",
            "ERROR 2 Invalid parameter",
            "ERROR 3 Not ready: Not implemented",
            "ERROR 1 Unknown command",
            "ERROR 2 Invalid parameter: Parameter required",
        ]
    );
    // Nothing changed.
    assert_eq!(bench.runner.orchestrator().params().speed_mm_s, 10.0);
    assert_eq!(bench.runner.orchestrator().params().max_force_n, 450.0);
    assert_eq!(bench.state(), MachineState::Idle);
}

#[test]
fn homing_and_test_session_streams_data() {
    let mut bench = Bench::quick();
    let lines = session(&mut bench, b"HOME\n", 200_000);
    assert_eq!(lines, ["OK Homing started", "OK Homing complete"]);
    assert_eq!(bench.state(), MachineState::Ready);

    let lines = session(&mut bench, b"MAXEXT 5\nSTART\n", 30_000);
    assert_eq!(lines[0], "OK");
    assert_eq!(lines[1], "OK Test started");
    assert!(lines[2].starts_with("DATA 0,"));
    assert_eq!(lines.last().map(String::as_str), Some("OK Extension limit reached"));

    let data: Vec<&String> = lines.iter().filter(|l| l.starts_with("DATA ")).collect();
    assert!(data.len() >= 10);
    for line in &data {
        // elapsed,force,extension,stress,strain
        let fields: Vec<&str> = line["DATA ".len()..].split(',').collect();
        assert_eq!(fields.len(), 5);
        assert!(fields[0].parse::<u64>().is_ok());
        assert_eq!(fields[2].split('.').nth(1).map(str::len), Some(4));
        assert_eq!(fields[3], "0.000");
        assert_eq!(fields[4], "0.000000");
    }

    let lines = session(&mut bench, b"STATUS\n", 1);
    assert_eq!(lines, ["STATUS STOPPED F:0.00 P:5.000 R:0"]);
}

#[test]
fn rig_console_emergency_round_trip() {
    let mut bench = Bench::new(&quick_config());
    let lines = session(&mut bench, b"!ESTOP\n", 10);
    assert_eq!(lines, ["ERROR 8 Emergency stop: Emergency input engaged"]);
    assert_eq!(bench.state(), MachineState::Emergency);

    let lines = session(&mut bench, b"RESET\n", 10);
    assert_eq!(lines, ["ERROR 8 Emergency stop: Emergency input still engaged"]);

    // Rig lines act as soon as they are read, ahead of queued commands.
    let lines = session(&mut bench, b"!RELEASE\n", 1);
    assert!(lines.is_empty());

    let lines = session(&mut bench, b"RESET\nSTATUS\n", 1);
    assert_eq!(lines, ["OK Reset", "STATUS IDLE F:0.00 P:0.000 R:0"]);
}
