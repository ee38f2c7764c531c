//! HAL driver implementations.
//!
//! - [`simulation`] - Software rig for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `Actuator`, `ForceSensor`, `EmergencyInput` and `Indicators`
//! 3. Wire the instances into `CycleRunner` from the binary

pub mod simulation;
