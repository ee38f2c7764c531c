//! Inbound command set.
//!
//! A closed set of tokens, matched case-insensitively. Anything else maps
//! to [`Command::Unknown`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    // ── Test control ──
    StartTest,
    StopTest,
    PauseTest,
    ResumeTest,
    EmergencyStop,

    // ── Movement ──
    /// Jog up; optional distance [mm], continuous when absent or zero.
    MoveUp,
    /// Jog down; optional distance [mm], continuous when absent or zero.
    MoveDown,
    /// Absolute move [mm], parameter required.
    MoveTo,
    /// Decelerate an active jog to rest.
    Halt,
    Home,

    // ── Configuration ──
    SetSpeed,
    SetMaxForce,
    SetMaxExtension,
    SetSampleRate,

    // ── Calibration ──
    Tare,
    /// Interactive calibration; always declined.
    Calibrate,
    SetCalFactor,

    // ── Queries ──
    GetStatus,
    GetForce,
    GetPosition,
    GetConfig,
    GetData,

    // ── System ──
    Reset,
    Identify,

    Unknown,
}

impl Command {
    /// Map a command token. Matching ignores ASCII case.
    pub fn from_token(token: &str) -> Self {
        const TABLE: &[(&str, Command)] = &[
            ("START", Command::StartTest),
            ("STOP", Command::StopTest),
            ("PAUSE", Command::PauseTest),
            ("RESUME", Command::ResumeTest),
            ("ESTOP", Command::EmergencyStop),
            ("UP", Command::MoveUp),
            ("DOWN", Command::MoveDown),
            ("GOTO", Command::MoveTo),
            ("HALT", Command::Halt),
            ("HOME", Command::Home),
            ("SPEED", Command::SetSpeed),
            ("MAXFORCE", Command::SetMaxForce),
            ("MAXEXT", Command::SetMaxExtension),
            ("SRATE", Command::SetSampleRate),
            ("TARE", Command::Tare),
            ("CAL", Command::Calibrate),
            ("CALFACTOR", Command::SetCalFactor),
            ("STATUS", Command::GetStatus),
            ("FORCE", Command::GetForce),
            ("POS", Command::GetPosition),
            ("CONFIG", Command::GetConfig),
            ("DATA", Command::GetData),
            ("RESET", Command::Reset),
            ("ID", Command::Identify),
            ("?", Command::Identify),
        ];

        TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(token))
            .map_or(Command::Unknown, |&(_, cmd)| cmd)
    }

    /// Whether the command cannot be executed without a parameter.
    pub const fn requires_parameter(self) -> bool {
        matches!(
            self,
            Self::MoveTo
                | Self::SetSpeed
                | Self::SetMaxForce
                | Self::SetMaxExtension
                | Self::SetSampleRate
                | Self::SetCalFactor
        )
    }
}

/// A parsed command with its optional numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommandFrame {
    pub command: Command,
    pub parameter: Option<f64>,
}

impl CommandFrame {
    pub const fn new(command: Command) -> Self {
        Self {
            command,
            parameter: None,
        }
    }

    pub const fn with_parameter(command: Command, value: f64) -> Self {
        Self {
            command,
            parameter: Some(value),
        }
    }
}
