//! Hardware traits and error type.
//!
//! The control unit is written against these traits only. A driver
//! provides one implementation of each for its hardware (or simulation).
//!
//! # Timing Contracts
//!
//! | Operation          | Max Duration | Called from        |
//! |--------------------|--------------|--------------------|
//! | `Actuator::pulse`  | pulse width  | every step         |
//! | `read_force`       | one ADC read | every tick         |
//! | `tare`             | N ADC reads  | operator command   |

use thiserror::Error;

use crate::hal::inputs::LimitInputs;
use crate::tester::state::Direction;

/// Errors raised while building or initializing a driver.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Driver configuration rejected.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Step/direction actuator with travel limit inputs.
pub trait Actuator {
    /// Drive the enable line.
    fn set_enabled(&mut self, enabled: bool);

    /// Drive the direction line.
    fn set_direction(&mut self, direction: Direction);

    /// Emit one step pulse in the current direction.
    fn pulse(&mut self);

    /// Busy-wait for signal setup times.
    fn delay_us(&mut self, micros: u32);

    /// Current state of the travel limit switches.
    fn limit_inputs(&self) -> LimitInputs;
}

/// Load cell front end.
pub trait ForceSensor {
    /// Sample the sensor and return the force [N].
    fn read_force(&mut self) -> f64;

    /// Force from the most recent `read_force` [N].
    fn last_force(&self) -> f64;

    /// Average `samples` raw readings into the zero offset.
    fn tare(&mut self, samples: u32);

    /// Last reading exceeds the overload threshold.
    fn is_overload(&self) -> bool;

    /// Raw counts per newton. Zero is ignored.
    fn set_calibration_factor(&mut self, factor: f64);

    fn calibration_factor(&self) -> f64;
}

/// Emergency stop contact.
pub trait EmergencyInput {
    /// The stop is engaged (button pressed or contact open).
    fn is_engaged(&self) -> bool;
}

/// Status and error lamps.
pub trait Indicators {
    fn set_status(&mut self, on: bool);
    fn set_error(&mut self, on: bool);
}
