//! Hardware interfaces shared by the drivers and the control unit.
//!
//! - [`driver`] - Actuator, force sensor, emergency input and indicator traits
//! - [`inputs`] - Limit switch input bank

pub mod driver;
pub mod inputs;
