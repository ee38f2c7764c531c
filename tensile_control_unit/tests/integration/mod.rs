mod lifecycle;
mod protocol_session;
mod safety;
mod sampling;

use std::sync::Arc;

use tensile_common::prelude::*;
use tensile_control_unit::cycle::CycleRunner;
use tensile_control_unit::protocol::{Response, parse_line};
use tensile_hal::SimulatedRig;
use tensile_hal::drivers::simulation::{
    Crosshead, EmergencyHandle, SimActuator, SimEmergencyButton, SimIndicators, SimLoadCell,
    SpecimenModel,
};

// ── Helpers ─────────────────────────────────────────────────────────

pub type SimRunner = CycleRunner<SimActuator, SimLoadCell, SimEmergencyButton, SimIndicators>;

/// Simulated rig wired into a cycle runner, clocked by hand.
pub struct Bench {
    pub runner: SimRunner,
    pub crosshead: Arc<Crosshead>,
    pub specimen: Arc<SpecimenModel>,
    pub estop: EmergencyHandle,
    /// Every response emitted so far.
    pub out: Vec<Response>,
    pub now_us: u64,
    pub tick_us: u64,
}

/// Defaults tuned for short simulated runs: crosshead starts near the
/// bottom switch, fast test speed, 100 µs ticks.
pub fn quick_config() -> RigConfig {
    let mut cfg = RigConfig::default();
    cfg.cycle.tick_us = 100;
    cfg.simulation.start_position_mm = 3.0;
    cfg.test.speed_mm_s = 10.0;
    cfg
}

impl Bench {
    pub fn new(cfg: &RigConfig) -> Self {
        let mut rig = SimulatedRig::new(&cfg.motion, &cfg.load_cell, &cfg.simulation).unwrap();
        rig.load_cell.tare(cfg.load_cell.tare_samples);
        let crosshead = Arc::clone(&rig.crosshead);
        let specimen = Arc::clone(&rig.specimen);
        let estop = rig.emergency.handle();
        let runner =
            CycleRunner::new(cfg, rig.actuator, rig.load_cell, rig.emergency, rig.indicators).unwrap();
        Self {
            runner,
            crosshead,
            specimen,
            estop,
            out: Vec::new(),
            now_us: 0,
            tick_us: cfg.cycle.tick_us,
        }
    }

    pub fn quick() -> Self {
        Self::new(&quick_config())
    }

    pub fn state(&self) -> MachineState {
        self.runner.orchestrator().state()
    }

    /// Run one tick with the given command line and return the command's
    /// reply (the first response of the tick).
    pub fn send(&mut self, line: &str) -> Response {
        let frame = parse_line(line).expect("non-blank command line");
        let before = self.out.len();
        self.advance_clock();
        self.runner.tick(Some(frame), self.now_us, &mut self.out);
        self.out[before]
    }

    /// Like [`Bench::send`], rendered as the wire line.
    pub fn send_line(&mut self, line: &str) -> String {
        self.send(line).to_string()
    }

    pub fn tick(&mut self) {
        self.advance_clock();
        self.runner.tick(None, self.now_us, &mut self.out);
    }

    /// Tick until `done` holds. Panics after `max_ticks`.
    pub fn run_until(&mut self, max_ticks: u64, mut done: impl FnMut(&Self) -> bool) {
        for _ in 0..max_ticks {
            if done(self) {
                return;
            }
            self.tick();
        }
        assert!(done(self), "condition not reached within {max_ticks} ticks");
    }

    /// Tick while the machine stays in `state`.
    pub fn run_while(&mut self, state: MachineState, max_ticks: u64) {
        self.run_until(max_ticks, |b| b.state() != state);
    }

    /// Home and return once READY.
    pub fn home(&mut self) {
        assert_eq!(self.send("HOME"), Response::ok_with("Homing started"));
        self.run_while(MachineState::Homing, 200_000);
        assert_eq!(self.state(), MachineState::Ready);
    }

    pub fn last(&self) -> Option<&Response> {
        self.out.last()
    }

    /// Data points emitted so far.
    pub fn data_points(&self) -> usize {
        self.out
            .iter()
            .filter(|r| matches!(r, Response::Data(_)))
            .count()
    }

    pub fn force(&self) -> f64 {
        self.runner.sensor().last_force()
    }

    fn advance_clock(&mut self) {
        self.now_us += self.tick_us;
    }
}
