//! Machine state and travel direction.
//!
//! `MachineState` uses `#[repr(u8)]` so it can be logged and compared
//! cheaply; exactly one state is active at a time.

use core::fmt;
use serde::{Deserialize, Serialize};

// ─── Machine State ──────────────────────────────────────────────────

/// Operating state of the tester.
///
/// `Error` and `Emergency` are left only through an explicit reset;
/// `Emergency` additionally requires the physical input to be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum MachineState {
    /// Powered, not homed or homing result discarded.
    #[default]
    Idle = 0,
    /// Homing sequence in progress.
    Homing = 1,
    /// Homed and ready to start a test.
    Ready = 2,
    /// Test running, crosshead pulling.
    Running = 3,
    /// Test paused, crosshead decelerated to rest.
    Paused = 4,
    /// Test ended, result sealed.
    Stopped = 5,
    /// Safety or homing fault, reset required.
    Error = 6,
    /// Emergency stop engaged, reset required after release.
    Emergency = 7,
}

impl MachineState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Homing),
            2 => Some(Self::Ready),
            3 => Some(Self::Running),
            4 => Some(Self::Paused),
            5 => Some(Self::Stopped),
            6 => Some(Self::Error),
            7 => Some(Self::Emergency),
            _ => None,
        }
    }

    /// Upper-case name used on the status line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Homing => "HOMING",
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Stopped => "STOPPED",
            Self::Error => "ERROR",
            Self::Emergency => "EMERGENCY",
        }
    }

    /// A test is in progress (running or paused).
    #[inline]
    pub const fn is_test_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// A reset command is required to leave this state.
    #[inline]
    pub const fn requires_reset(self) -> bool {
        matches!(self, Self::Error | Self::Emergency)
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Direction ──────────────────────────────────────────────────────

/// Crosshead travel direction. `Up` pulls the specimen (positive steps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Up,
    Down,
}

impl Direction {
    /// Step sign (+1 for `Up`, -1 for `Down`).
    #[inline]
    pub const fn sign(self) -> i32 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    /// Direction of a signed step delta. `None` for zero.
    #[inline]
    pub const fn from_delta(delta: i64) -> Option<Self> {
        if delta > 0 {
            Some(Self::Up)
        } else if delta < 0 {
            Some(Self::Down)
        } else {
            None
        }
    }
}
