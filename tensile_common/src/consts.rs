//! Machine constants and firmware defaults.
//!
//! Single source of truth for the numeric limits shared by the hardware
//! layer, the control unit and the configuration defaults.

use static_assertions::const_assert;

// ─── Drive Train ────────────────────────────────────────────────────

/// Full motor steps per revolution (1.8° motor).
pub const STEPS_PER_REV: u32 = 200;

/// Driver microstepping factor.
pub const MICROSTEPPING: u32 = 16;

/// Lead screw pitch [mm/rev].
pub const MM_PER_REV: f64 = 8.0;

/// Derived step resolution [steps/mm].
pub const STEPS_PER_MM: f64 = (STEPS_PER_REV * MICROSTEPPING) as f64 / MM_PER_REV;

/// Maximum actuator speed [steps/s].
pub const MAX_SPEED_STEPS: f64 = 4000.0;

/// Acceleration magnitude [steps/s²].
pub const ACCELERATION_STEPS: f64 = 2000.0;

/// Speed floor while a move is pending [steps/s].
pub const MIN_SPEED_STEPS: f64 = 100.0;

/// Step pulse high time [µs].
pub const STEP_PULSE_WIDTH_US: u32 = 3;

/// Direction signal setup time before a pulse [µs].
pub const DIR_SETUP_TIME_US: u32 = 5;

// ─── Homing ─────────────────────────────────────────────────────────

/// Approach timeout [ms].
pub const HOMING_TIMEOUT_MS: u64 = 60_000;

/// Approach speed as a fraction of max speed.
pub const HOMING_APPROACH_FACTOR: f64 = 0.5;

/// Back-off speed as a fraction of max speed.
pub const HOMING_BACKOFF_FACTOR: f64 = 0.1;

/// Back-off distance after the limit asserts [mm].
pub const HOMING_BACKOFF_MM: f64 = 2.0;

// ─── Load Cell ──────────────────────────────────────────────────────

/// Rated capacity [N].
pub const LOADCELL_CAPACITY_N: f64 = 500.0;

/// Overload protection threshold [N] (96 % of capacity).
pub const FORCE_OVERLOAD_LIMIT_N: f64 = 480.0;

/// Raw samples averaged by a tare.
pub const TARE_SAMPLES: u32 = 10;

/// Raw counts per newton.
pub const LOADCELL_CALIBRATION: f64 = 420_000.0;

// ─── Test Defaults ──────────────────────────────────────────────────

/// Default crosshead speed [mm/s].
pub const DEFAULT_SPEED_MM_S: f64 = 1.0;

/// Default extension limit [mm].
pub const DEFAULT_MAX_EXTENSION_MM: f64 = 100.0;

/// Default force limit [N].
pub const DEFAULT_MAX_FORCE_N: f64 = 450.0;

/// Default time-based sample interval [ms].
pub const DEFAULT_SAMPLE_INTERVAL_MS: u32 = 50;

/// Default break threshold (fraction of peak).
pub const DEFAULT_BREAK_THRESHOLD: f64 = 0.5;

/// Upper bound for the test speed [mm/s].
pub const MAX_TEST_SPEED_MM_S: f64 = 100.0;

/// Sample interval bounds [ms].
pub const MIN_SAMPLE_INTERVAL_MS: u32 = 10;
pub const MAX_SAMPLE_INTERVAL_MS: u32 = 10_000;

/// Absolute travel bound for the extension limit [mm].
pub const EXTENSION_MAX_LIMIT_MM: f64 = 150.0;

// ─── Sampling & Break Detection ─────────────────────────────────────

/// Minimum gap between two event-triggered samples [ms].
pub const SAMPLE_MIN_GAP_MS: u64 = 20;

/// Absolute force change that triggers a sample [N].
pub const SAMPLE_FORCE_DELTA_N: f64 = 5.0;

/// Relative slope change that triggers a sample.
pub const SAMPLE_SLOPE_CHANGE_RATIO: f64 = 0.3;

/// Previous slope magnitude below which slope events are ignored [N/s].
pub const SAMPLE_SLOPE_FLOOR_N_S: f64 = 1.0;

/// Running maximum that arms the drop event [N].
pub const SAMPLE_DROP_ARM_N: f64 = 50.0;

/// Fraction of the running maximum below which the drop event fires.
pub const SAMPLE_DROP_RATIO: f64 = 0.9;

/// Peak force required before break detection is evaluated [N].
pub const BREAK_MIN_PEAK_N: f64 = 10.0;

// ─── Cycle & Protocol ───────────────────────────────────────────────

/// Default driving loop period [µs].
pub const DEFAULT_TICK_US: u64 = 50;

/// Indicator refresh period [ms].
pub const STATUS_UPDATE_MS: u64 = 200;

/// Inbound command line buffer [bytes].
pub const COMMAND_BUFFER_SIZE: usize = 128;

/// Parsed commands held between control ticks [frames].
pub const COMMAND_QUEUE_DEPTH: usize = 32;

/// Outbound response line capacity [bytes].
pub const RESPONSE_LINE_CAPACITY: usize = 128;

/// Identification strings.
pub const DEVICE_NAME: &str = "TensileTester";
pub const DEVICE_VERSION: &str = "2.0.0";
pub const DEVICE_VENDOR: &str = "DIY-Pico";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/tensile.toml";

const_assert!(FORCE_OVERLOAD_LIMIT_N < LOADCELL_CAPACITY_N);
const_assert!(DEFAULT_MAX_FORCE_N <= LOADCELL_CAPACITY_N);
const_assert!(DEFAULT_MAX_EXTENSION_MM <= EXTENSION_MAX_LIMIT_MM);
const_assert!(MIN_SPEED_STEPS < MAX_SPEED_STEPS);
const_assert!(MIN_SAMPLE_INTERVAL_MS <= DEFAULT_SAMPLE_INTERVAL_MS);
const_assert!(DEFAULT_SAMPLE_INTERVAL_MS <= MAX_SAMPLE_INTERVAL_MS);
const_assert!(COMMAND_BUFFER_SIZE >= 32);
const_assert!(COMMAND_QUEUE_DEPTH >= 1);
