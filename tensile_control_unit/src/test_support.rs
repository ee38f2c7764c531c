//! In-memory hardware doubles for unit tests.

use tensile_common::hal::driver::{Actuator, EmergencyInput, ForceSensor, Indicators};
use tensile_common::hal::inputs::LimitInputs;
use tensile_common::tester::state::Direction;

#[derive(Debug, Default)]
pub struct FakeActuator {
    pub enabled: bool,
    pub direction: Direction,
    pub pulses: u64,
    /// Physical position [steps], moves only while enabled.
    pub position: i64,
    pub delay_total_us: u64,
    /// Forced limit levels.
    pub limits: LimitInputs,
    /// Bottom switch asserts at or below this position.
    pub bottom_at: Option<i64>,
}

impl Actuator for FakeActuator {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    fn pulse(&mut self) {
        self.pulses += 1;
        if self.enabled {
            self.position += i64::from(self.direction.sign());
        }
    }

    fn delay_us(&mut self, micros: u32) {
        self.delay_total_us += u64::from(micros);
    }

    fn limit_inputs(&self) -> LimitInputs {
        let mut limits = self.limits;
        if self.bottom_at.is_some_and(|b| self.position <= b) {
            limits |= LimitInputs::BOTTOM;
        }
        limits
    }
}

#[derive(Debug)]
pub struct ScriptedForce {
    /// Value returned by the next read.
    pub force: f64,
    pub last: f64,
    pub tares: u32,
    pub overload: bool,
    pub calibration: f64,
}

impl Default for ScriptedForce {
    fn default() -> Self {
        Self {
            force: 0.0,
            last: 0.0,
            tares: 0,
            overload: false,
            calibration: 1.0,
        }
    }
}

impl ForceSensor for ScriptedForce {
    fn read_force(&mut self) -> f64 {
        self.last = self.force;
        self.last
    }

    fn last_force(&self) -> f64 {
        self.last
    }

    fn tare(&mut self, _samples: u32) {
        self.tares += 1;
    }

    fn is_overload(&self) -> bool {
        self.overload
    }

    fn set_calibration_factor(&mut self, factor: f64) {
        if factor != 0.0 {
            self.calibration = factor;
        }
    }

    fn calibration_factor(&self) -> f64 {
        self.calibration
    }
}

#[derive(Debug, Default)]
pub struct FakeEmergency {
    pub engaged: bool,
}

impl EmergencyInput for FakeEmergency {
    fn is_engaged(&self) -> bool {
        self.engaged
    }
}

#[derive(Debug, Default)]
pub struct RecordingLamps {
    pub status: bool,
    pub error: bool,
    pub writes: u32,
}

impl Indicators for RecordingLamps {
    fn set_status(&mut self, on: bool) {
        self.status = on;
        self.writes += 1;
    }

    fn set_error(&mut self, on: bool) {
        self.error = on;
        self.writes += 1;
    }
}
