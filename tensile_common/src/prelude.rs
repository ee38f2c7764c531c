//! Prelude module for common re-exports.
//!
//! ```rust
//! use tensile_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::tester::config::RigConfig;

// ─── Domain Types ───────────────────────────────────────────────────
pub use crate::tester::command::{Command, CommandFrame};
pub use crate::tester::error::ErrorCode;
pub use crate::tester::params::{DataPoint, ParameterLimits, TestParameters, TestResult};
pub use crate::tester::state::{Direction, MachineState};

// ─── Hardware ───────────────────────────────────────────────────────
pub use crate::hal::driver::{Actuator, EmergencyInput, ForceSensor, HalError, Indicators};
pub use crate::hal::inputs::LimitInputs;
