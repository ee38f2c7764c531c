//! Wire-level error taxonomy.
//!
//! Conditions are reported to the command channel, never raised as program
//! faults. The numeric value is part of the line protocol.

use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorCode {
    /// Token not recognized.
    UnknownCommand = 1,
    /// Parameter missing or out of range.
    InvalidParameter = 2,
    /// Operation requires a different state.
    NotReady = 3,
    /// Operation conflicts with one in progress.
    Busy = 4,
    /// Force at or beyond the configured or rated limit.
    Overload = 5,
    /// Travel limit hit.
    LimitReached = 6,
    /// Operation requires a completed homing sequence.
    NotHomed = 7,
    /// Emergency stop engaged.
    Emergency = 8,
}

impl ErrorCode {
    /// Wire value.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::UnknownCommand),
            2 => Some(Self::InvalidParameter),
            3 => Some(Self::NotReady),
            4 => Some(Self::Busy),
            5 => Some(Self::Overload),
            6 => Some(Self::LimitReached),
            7 => Some(Self::NotHomed),
            8 => Some(Self::Emergency),
            _ => None,
        }
    }

    /// Fixed description printed after the code.
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownCommand => "Unknown command",
            Self::InvalidParameter => "Invalid parameter",
            Self::NotReady => "Not ready",
            Self::Busy => "Busy",
            Self::Overload => "Force overload",
            Self::LimitReached => "Limit reached",
            Self::NotHomed => "Not homed",
            Self::Emergency => "Emergency stop",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.description())
    }
}
