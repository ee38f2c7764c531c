//! Rig configuration file.
//!
//! One TOML document with a mandatory `[shared]` table and optional
//! sections for the drive train, load cell, test defaults, safety bounds,
//! cycle pacing and the simulated rig. Missing fields fall back to the
//! firmware constants in [`crate::consts`].
//!
//! ```toml
//! [shared]
//! service_name = "tensile-rig-01"
//!
//! [motion]
//! max_speed = 3200.0
//!
//! [test]
//! max_force_n = 300.0
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, LogLevel, SharedConfig};
use crate::consts::{
    ACCELERATION_STEPS, DEFAULT_TICK_US, EXTENSION_MAX_LIMIT_MM, FORCE_OVERLOAD_LIMIT_N,
    HOMING_BACKOFF_MM, HOMING_TIMEOUT_MS, LOADCELL_CALIBRATION, LOADCELL_CAPACITY_N,
    MAX_SPEED_STEPS, MICROSTEPPING, MIN_SPEED_STEPS, MM_PER_REV, STATUS_UPDATE_MS, STEPS_PER_REV,
    TARE_SAMPLES,
};
use crate::tester::params::{ParameterLimits, TestParameters};
use crate::tester::state::Direction;

// ─── Top-Level Config ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub load_cell: LoadCellConfig,
    /// Power-on test parameters.
    #[serde(default)]
    pub test: TestParameters,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig {
                log_level: LogLevel::Info,
                service_name: "tensile-tester".to_string(),
            },
            motion: MotionConfig::default(),
            load_cell: LoadCellConfig::default(),
            test: TestParameters::default(),
            safety: SafetyConfig::default(),
            cycle: CycleConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl RigConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.motion.validate().map_err(ConfigError::ValidationError)?;
        self.load_cell
            .validate()
            .map_err(ConfigError::ValidationError)?;
        self.validate_test_defaults()
            .map_err(ConfigError::ValidationError)?;
        self.cycle.validate().map_err(ConfigError::ValidationError)?;
        self.simulation
            .validate()
            .map_err(ConfigError::ValidationError)?;
        Ok(())
    }

    /// Hardware-dependent bounds for test parameter updates.
    pub fn parameter_limits(&self) -> ParameterLimits {
        ParameterLimits {
            force_capacity: self.load_cell.capacity_n,
            travel_limit: self.safety.extension_max_limit_mm,
        }
    }

    /// The configured defaults must pass the same checks as runtime updates.
    fn validate_test_defaults(&self) -> Result<(), String> {
        let limits = self.parameter_limits();
        let mut probe = TestParameters::default();
        probe.set_speed(self.test.speed_mm_s).map_err(|e| e.to_string())?;
        probe
            .set_max_force(self.test.max_force_n, &limits)
            .map_err(|e| e.to_string())?;
        probe
            .set_max_extension(self.test.max_extension_mm, &limits)
            .map_err(|e| e.to_string())?;
        probe
            .set_sample_interval(self.test.sample_interval_ms)
            .map_err(|e| e.to_string())?;
        probe
            .set_break_threshold(self.test.break_threshold)
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

// ─── Motion ─────────────────────────────────────────────────────────

/// Drive train and profile settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    #[serde(default = "default_steps_per_rev")]
    pub steps_per_rev: u32,
    #[serde(default = "default_microstepping")]
    pub microstepping: u32,
    /// Lead screw pitch [mm/rev].
    #[serde(default = "default_mm_per_rev")]
    pub mm_per_rev: f64,
    /// Max speed [steps/s].
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    /// Acceleration [steps/s²].
    #[serde(default = "default_acceleration")]
    pub acceleration: f64,
    /// Speed floor while a move is pending [steps/s].
    #[serde(default = "default_min_speed")]
    pub min_speed: f64,
    /// Limit approached by the homing sequence.
    #[serde(default = "default_homing_direction")]
    pub homing_direction: Direction,
    #[serde(default = "default_homing_timeout_ms")]
    pub homing_timeout_ms: u64,
    #[serde(default = "default_homing_backoff_mm")]
    pub homing_backoff_mm: f64,
}

fn default_steps_per_rev() -> u32 {
    STEPS_PER_REV
}
fn default_microstepping() -> u32 {
    MICROSTEPPING
}
fn default_mm_per_rev() -> f64 {
    MM_PER_REV
}
fn default_max_speed() -> f64 {
    MAX_SPEED_STEPS
}
fn default_acceleration() -> f64 {
    ACCELERATION_STEPS
}
fn default_min_speed() -> f64 {
    MIN_SPEED_STEPS
}
fn default_homing_direction() -> Direction {
    Direction::Down
}
fn default_homing_timeout_ms() -> u64 {
    HOMING_TIMEOUT_MS
}
fn default_homing_backoff_mm() -> f64 {
    HOMING_BACKOFF_MM
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            steps_per_rev: STEPS_PER_REV,
            microstepping: MICROSTEPPING,
            mm_per_rev: MM_PER_REV,
            max_speed: MAX_SPEED_STEPS,
            acceleration: ACCELERATION_STEPS,
            min_speed: MIN_SPEED_STEPS,
            homing_direction: Direction::Down,
            homing_timeout_ms: HOMING_TIMEOUT_MS,
            homing_backoff_mm: HOMING_BACKOFF_MM,
        }
    }
}

impl MotionConfig {
    /// Step resolution [steps/mm].
    pub fn steps_per_mm(&self) -> f64 {
        f64::from(self.steps_per_rev * self.microstepping) / self.mm_per_rev
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.steps_per_rev == 0 || self.microstepping == 0 {
            return Err("steps_per_rev and microstepping must be non-zero".to_string());
        }
        if !(self.mm_per_rev > 0.0) {
            return Err(format!("mm_per_rev {} must be positive", self.mm_per_rev));
        }
        if !(self.max_speed > 0.0) || !(self.acceleration > 0.0) {
            return Err(format!(
                "max_speed {} and acceleration {} must be positive",
                self.max_speed, self.acceleration
            ));
        }
        if !(self.min_speed > 0.0) || self.min_speed > self.max_speed {
            return Err(format!(
                "min_speed {} out of range (0, {}]",
                self.min_speed, self.max_speed
            ));
        }
        if self.homing_timeout_ms == 0 {
            return Err("homing_timeout_ms must be non-zero".to_string());
        }
        if self.homing_backoff_mm < 0.0 {
            return Err(format!(
                "homing_backoff_mm {} must not be negative",
                self.homing_backoff_mm
            ));
        }
        Ok(())
    }
}

// ─── Load Cell ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadCellConfig {
    /// Rated capacity [N].
    pub capacity_n: f64,
    /// Overload flag threshold [N].
    pub overload_limit_n: f64,
    /// Raw samples averaged by `TARE`.
    pub tare_samples: u32,
    /// Raw counts per newton.
    pub calibration_factor: f64,
}

impl Default for LoadCellConfig {
    fn default() -> Self {
        Self {
            capacity_n: LOADCELL_CAPACITY_N,
            overload_limit_n: FORCE_OVERLOAD_LIMIT_N,
            tare_samples: TARE_SAMPLES,
            calibration_factor: LOADCELL_CALIBRATION,
        }
    }
}

impl LoadCellConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.capacity_n > 0.0) {
            return Err(format!("capacity_n {} must be positive", self.capacity_n));
        }
        if !(self.overload_limit_n > 0.0) || self.overload_limit_n > self.capacity_n {
            return Err(format!(
                "overload_limit_n {} out of range (0, {}]",
                self.overload_limit_n, self.capacity_n
            ));
        }
        if self.tare_samples == 0 {
            return Err("tare_samples must be non-zero".to_string());
        }
        if self.calibration_factor == 0.0 || !self.calibration_factor.is_finite() {
            return Err("calibration_factor must be finite and non-zero".to_string());
        }
        Ok(())
    }
}

// ─── Safety ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Largest accepted extension limit [mm].
    pub extension_max_limit_mm: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            extension_max_limit_mm: EXTENSION_MAX_LIMIT_MM,
        }
    }
}

// ─── Cycle ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Driving loop period [µs].
    pub tick_us: u64,
    /// Indicator refresh period [ms].
    pub status_update_ms: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            tick_us: DEFAULT_TICK_US,
            status_update_ms: STATUS_UPDATE_MS,
        }
    }
}

impl CycleConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_us == 0 || self.tick_us > 10_000 {
            return Err(format!("tick_us {} out of range [1, 10000]", self.tick_us));
        }
        if self.status_update_ms == 0 {
            return Err("status_update_ms must be non-zero".to_string());
        }
        Ok(())
    }
}

// ─── Simulation ─────────────────────────────────────────────────────

/// Simulated rig: limit switch positions and specimen model.
///
/// Positions are physical [mm] measured from the bottom switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Crosshead position at power-on [mm].
    pub start_position_mm: f64,
    /// Top limit switch asserts at or above this position [mm].
    pub top_limit_mm: f64,
    /// Crosshead position where the specimen becomes taut [mm].
    pub specimen_taut_mm: f64,
    /// Linear stiffness of the specimen [N/mm].
    pub stiffness_n_per_mm: f64,
    /// Force plateau once the specimen yields [N].
    pub ultimate_force_n: f64,
    /// Extension past the taut point at which the specimen breaks [mm].
    pub break_extension_mm: f64,
    /// Raw load cell counts at zero force.
    pub zero_offset_counts: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_position_mm: 20.0,
            top_limit_mm: 160.0,
            specimen_taut_mm: 24.0,
            stiffness_n_per_mm: 25.0,
            ultimate_force_n: 300.0,
            break_extension_mm: 30.0,
            zero_offset_counts: 8_400.0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.top_limit_mm > 0.0) {
            return Err(format!("top_limit_mm {} must be positive", self.top_limit_mm));
        }
        if self.start_position_mm <= 0.0 || self.start_position_mm >= self.top_limit_mm {
            return Err(format!(
                "start_position_mm {} must lie between the limit switches (0, {})",
                self.start_position_mm, self.top_limit_mm
            ));
        }
        if self.stiffness_n_per_mm < 0.0 || self.ultimate_force_n < 0.0 {
            return Err("specimen stiffness and ultimate force must not be negative".to_string());
        }
        if !(self.break_extension_mm > 0.0) {
            return Err(format!(
                "break_extension_mm {} must be positive",
                self.break_extension_mm
            ));
        }
        Ok(())
    }
}
