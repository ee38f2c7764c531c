//! Tensile Tester Common Library
//!
//! Shared constants, configuration loading and domain types used by the
//! hardware layer and the control unit.
//!
//! # Module Structure
//!
//! - [`consts`] - Machine constants and firmware defaults
//! - [`config`] - Configuration loading traits and types
//! - [`tester`] - Machine state, test parameters/results, commands, rig config
//! - [`hal`] - Hardware traits implemented by drivers
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use tensile_common::prelude::*;
//!
//! let params = TestParameters::default();
//! assert_eq!(params.sample_interval_ms, 50);
//! assert_eq!(MachineState::default(), MachineState::Idle);
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
pub mod tester;
