//! # Tensile Tester Control Unit
//!
//! Motion and test orchestration core for a motorized tensile tester. A
//! stepper-driven crosshead pulls a specimen while the load cell and the
//! step counter are sampled, under hard interlocks for force overload,
//! travel limits and emergency stop.
//!
//! ## Layers
//!
//! 1. **Motion** ([`motion`]): trapezoidal step profile, limit interlock,
//!    tick-driven homing.
//! 2. **Orchestrator** ([`orchestrator`]): safety state machine, test
//!    lifecycle, jogging, hybrid sampling, break detection.
//! 3. **Protocol** ([`protocol`]): line assembly, command parsing,
//!    response formatting.
//! 4. **Cycle** ([`cycle`]): wires the instances and runs
//!    command → advance → update at a fixed period.
//!
//! No globals: every instance is constructed explicitly and owned by the
//! cycle runner. Time is passed in as monotonic microseconds.

pub mod config;
pub mod console;
pub mod cycle;
pub mod indicator;
pub mod motion;
pub mod orchestrator;
pub mod protocol;

#[cfg(test)]
pub(crate) mod test_support;
