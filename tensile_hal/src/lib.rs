//! # Tensile Tester HAL
//!
//! Driver implementations of the hardware traits declared in
//! `tensile_common::hal::driver`.
//!
//! # Module Structure
//!
//! - [`drivers`] - Driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 tensile_control_unit                    │
//! │   MotionController<A: Actuator>    Orchestrator         │
//! └──────────────┬──────────────────────────┬───────────────┘
//!                │ Actuator                 │ ForceSensor / EmergencyInput
//!                ▼                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │  drivers::simulation                                    │
//! │   SimActuator ──► Crosshead ◄── SimLoadCell ◄─ Specimen │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod drivers;

pub use crate::drivers::simulation::SimulatedRig;
