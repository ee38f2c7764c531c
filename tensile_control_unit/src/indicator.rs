//! Status and error lamp patterns.
//!
//! | State            | Status lamp                  | Error lamp |
//! |------------------|------------------------------|------------|
//! | IDLE / STOPPED   | off                          | off        |
//! | HOMING / RUNNING | blink (toggle per refresh)   | off        |
//! | READY            | on                           | off        |
//! | PAUSED           | blink, first half of second  | off        |
//! | ERROR            | off                          | on         |
//! | EMERGENCY        | off                          | blink      |

use tensile_common::hal::driver::Indicators;
use tensile_common::tester::state::MachineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LampLevels {
    pub status: bool,
    pub error: bool,
}

/// Lamp levels for `state`, given the current blink phase.
pub fn lamp_levels(state: MachineState, phase: bool, now_ms: u64) -> LampLevels {
    use MachineState::*;
    match state {
        Idle | Stopped => LampLevels::default(),
        Ready => LampLevels {
            status: true,
            error: false,
        },
        Homing | Running => LampLevels {
            status: phase,
            error: false,
        },
        Paused => LampLevels {
            status: phase && now_ms % 1000 < 500,
            error: false,
        },
        Error => LampLevels {
            status: false,
            error: true,
        },
        Emergency => LampLevels {
            status: false,
            error: phase,
        },
    }
}

/// Refreshes the lamps once per period, toggling the blink phase.
#[derive(Debug, Clone)]
pub struct StatusIndicator {
    period_ms: u64,
    last_refresh_ms: Option<u64>,
    phase: bool,
}

impl StatusIndicator {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms: period_ms.max(1),
            last_refresh_ms: None,
            phase: false,
        }
    }

    /// Apply the pattern for `state` if a refresh is due. Returns the
    /// levels written, if any.
    pub fn refresh(
        &mut self,
        state: MachineState,
        now_ms: u64,
        lamps: &mut dyn Indicators,
    ) -> Option<LampLevels> {
        if self
            .last_refresh_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.period_ms)
        {
            return None;
        }
        self.last_refresh_ms = Some(now_ms);
        self.phase = !self.phase;

        let levels = lamp_levels(state, self.phase, now_ms);
        lamps.set_status(levels.status);
        lamps.set_error(levels.error);
        Some(levels)
    }
}
