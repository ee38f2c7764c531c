//! Simulated step/direction driver.
//!
//! Each pulse moves the shared crosshead one step in the latched
//! direction while the enable line is active. Pulses while disabled are
//! counted but produce no motion, like a real driver with ENA released.

use std::sync::Arc;

use tensile_common::hal::driver::Actuator;
use tensile_common::hal::inputs::LimitInputs;
use tensile_common::tester::state::Direction;
use tracing::{debug, trace};

use super::Crosshead;

pub struct SimActuator {
    crosshead: Arc<Crosshead>,
    enabled: bool,
    direction: Direction,
    /// Pulses that moved the crosshead.
    steps: u64,
    /// Pulses issued while disabled.
    ignored_pulses: u64,
    /// Accumulated setup delays [µs].
    delay_total_us: u64,
}

impl SimActuator {
    pub fn new(crosshead: Arc<Crosshead>) -> Self {
        Self {
            crosshead,
            enabled: false,
            direction: Direction::Up,
            steps: 0,
            ignored_pulses: 0,
            delay_total_us: 0,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    #[inline]
    pub fn ignored_pulses(&self) -> u64 {
        self.ignored_pulses
    }

    #[inline]
    pub fn delay_total_us(&self) -> u64 {
        self.delay_total_us
    }

    pub fn crosshead(&self) -> &Arc<Crosshead> {
        &self.crosshead
    }
}

impl Actuator for SimActuator {
    fn set_enabled(&mut self, enabled: bool) {
        if enabled != self.enabled {
            debug!("SimActuator enable line -> {enabled}");
        }
        self.enabled = enabled;
    }

    fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    fn pulse(&mut self) {
        if !self.enabled {
            self.ignored_pulses += 1;
            return;
        }
        self.crosshead.step(i64::from(self.direction.sign()));
        self.steps += 1;
        trace!(
            "SimActuator step {:?} -> {} steps",
            self.direction,
            self.crosshead.position_steps()
        );
    }

    fn delay_us(&mut self, micros: u32) {
        self.delay_total_us += u64::from(micros);
    }

    fn limit_inputs(&self) -> LimitInputs {
        self.crosshead.limits()
    }
}
