//! Test parameters, results and recorded data points.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{
    DEFAULT_BREAK_THRESHOLD, DEFAULT_MAX_EXTENSION_MM, DEFAULT_MAX_FORCE_N,
    DEFAULT_SAMPLE_INTERVAL_MS, DEFAULT_SPEED_MM_S, EXTENSION_MAX_LIMIT_MM, LOADCELL_CAPACITY_N,
    MAX_SAMPLE_INTERVAL_MS, MAX_TEST_SPEED_MM_S, MIN_SAMPLE_INTERVAL_MS,
};

/// Rejected parameter update. The field keeps its previous value.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("{field} out of range: {value}")]
pub struct RangeError {
    pub field: &'static str,
    pub value: f64,
}

/// Upper bounds that depend on the installed hardware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterLimits {
    /// Load cell capacity [N].
    pub force_capacity: f64,
    /// Usable crosshead travel [mm].
    pub travel_limit: f64,
}

impl Default for ParameterLimits {
    fn default() -> Self {
        Self {
            force_capacity: LOADCELL_CAPACITY_N,
            travel_limit: EXTENSION_MAX_LIMIT_MM,
        }
    }
}

// ─── Test Parameters ────────────────────────────────────────────────

/// Operator-configurable test settings.
///
/// Every setter validates its input; an out-of-range value returns
/// `RangeError` and leaves the field unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestParameters {
    /// Crosshead speed [mm/s], (0, 100].
    pub speed_mm_s: f64,
    /// Force limit [N], (0, capacity].
    pub max_force_n: f64,
    /// Extension limit [mm], (0, travel limit].
    pub max_extension_mm: f64,
    /// Time-based sample interval [ms], [10, 10000].
    pub sample_interval_ms: u32,
    /// End the test when a break is detected.
    pub stop_on_break: bool,
    /// Drop from peak, as a fraction, that counts as a break.
    pub break_threshold: f64,
}

impl Default for TestParameters {
    fn default() -> Self {
        Self {
            speed_mm_s: DEFAULT_SPEED_MM_S,
            max_force_n: DEFAULT_MAX_FORCE_N,
            max_extension_mm: DEFAULT_MAX_EXTENSION_MM,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            stop_on_break: true,
            break_threshold: DEFAULT_BREAK_THRESHOLD,
        }
    }
}

impl TestParameters {
    pub fn set_speed(&mut self, mm_s: f64) -> Result<(), RangeError> {
        if mm_s > 0.0 && mm_s <= MAX_TEST_SPEED_MM_S {
            self.speed_mm_s = mm_s;
            Ok(())
        } else {
            Err(RangeError {
                field: "speed",
                value: mm_s,
            })
        }
    }

    pub fn set_max_force(&mut self, newtons: f64, limits: &ParameterLimits) -> Result<(), RangeError> {
        if newtons > 0.0 && newtons <= limits.force_capacity {
            self.max_force_n = newtons;
            Ok(())
        } else {
            Err(RangeError {
                field: "max_force",
                value: newtons,
            })
        }
    }

    pub fn set_max_extension(&mut self, mm: f64, limits: &ParameterLimits) -> Result<(), RangeError> {
        if mm > 0.0 && mm <= limits.travel_limit {
            self.max_extension_mm = mm;
            Ok(())
        } else {
            Err(RangeError {
                field: "max_extension",
                value: mm,
            })
        }
    }

    pub fn set_sample_interval(&mut self, ms: u32) -> Result<(), RangeError> {
        if (MIN_SAMPLE_INTERVAL_MS..=MAX_SAMPLE_INTERVAL_MS).contains(&ms) {
            self.sample_interval_ms = ms;
            Ok(())
        } else {
            Err(RangeError {
                field: "sample_interval",
                value: f64::from(ms),
            })
        }
    }

    /// Break threshold must be a fraction in (0, 1).
    pub fn set_break_threshold(&mut self, ratio: f64) -> Result<(), RangeError> {
        if ratio > 0.0 && ratio < 1.0 {
            self.break_threshold = ratio;
            Ok(())
        } else {
            Err(RangeError {
                field: "break_threshold",
                value: ratio,
            })
        }
    }
}

// ─── Test Result ────────────────────────────────────────────────────

/// Outcome of a single test. Reset at start, sealed when the test ends.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TestResult {
    /// Peak force observed [N].
    pub peak_force_n: f64,
    /// Extension at which the peak occurred [mm].
    pub extension_at_peak_mm: f64,
    /// Force at detected break [N].
    pub break_force_n: f64,
    /// Extension at detected break [mm].
    pub break_extension_mm: f64,
    /// Test duration [ms].
    pub duration_ms: u64,
    /// Recorded data points.
    pub data_points: u32,
    /// Motion reached its target without another stop condition.
    pub completed: bool,
    /// A specimen break ended the test.
    pub specimen_broke: bool,
}

impl TestResult {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ─── Data Point ─────────────────────────────────────────────────────

/// One recorded sample. Stress and strain are reserved and always zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DataPoint {
    /// Time since test start [ms].
    pub elapsed_ms: u64,
    /// Force [N].
    pub force_n: f64,
    /// Extension since test start [mm].
    pub extension_mm: f64,
    pub stress: f64,
    pub strain: f64,
}
