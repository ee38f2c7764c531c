//! Tester domain types shared by the control unit and its tooling.
//!
//! - [`state`] - Machine state and travel direction
//! - [`error`] - Wire-level error taxonomy
//! - [`params`] - Test parameters, results and data points
//! - [`command`] - Inbound command set
//! - [`config`] - Rig configuration file

pub mod command;
pub mod config;
pub mod error;
pub mod params;
pub mod state;
