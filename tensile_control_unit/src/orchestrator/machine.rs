//! Tester state transitions.
//!
//! ```text
//! IDLE ──home──▶ HOMING ──ok──▶ READY ──start──▶ RUNNING ◀─resume─ PAUSED
//!                   │                             │   └──pause──────▲
//!                   └─fail─▶ ERROR ◀─fault────────┤
//!                                                 └─end─▶ STOPPED ──home──▶ HOMING
//! any ──emergency──▶ EMERGENCY ──reset (input released)──▶ IDLE
//! ```

use tensile_common::tester::state::MachineState;

/// Result of a transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded, new state.
    Ok(MachineState),
    /// Transition rejected, reason.
    Rejected(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestEvent {
    HomeRequested,
    HomingSucceeded,
    HomingFailed,
    StartRequested,
    PauseRequested,
    ResumeRequested,
    /// Operator stop, limit reached, break or completion.
    TestEnded,
    /// Limit switch in the travel direction.
    SafetyFault,
    /// Command or physical input.
    EmergencyStop,
    Reset { input_released: bool },
}

#[derive(Debug, Clone, Default)]
pub struct TestStateMachine {
    state: MachineState,
}

impl TestStateMachine {
    pub const fn new() -> Self {
        Self {
            state: MachineState::Idle,
        }
    }

    #[inline]
    pub const fn state(&self) -> MachineState {
        self.state
    }

    pub fn handle_event(&mut self, event: TestEvent) -> TransitionResult {
        use MachineState::*;
        use TestEvent::*;

        let next = match (self.state, event) {
            (_, EmergencyStop) => Emergency,

            (Idle | Ready | Stopped, HomeRequested) => Homing,
            (Homing, HomingSucceeded) => Ready,
            (Homing, HomingFailed) => Error,

            (Ready, StartRequested) => Running,
            (Running, PauseRequested) => Paused,
            (Paused, ResumeRequested) => Running,
            (Running | Paused, TestEnded) => Stopped,

            (Emergency, SafetyFault) => {
                return TransitionResult::Rejected("Emergency: fault already latched");
            }
            (_, SafetyFault) => Error,

            (Emergency, Reset { input_released: false }) => {
                return TransitionResult::Rejected("Emergency input still engaged");
            }
            (Running | Paused, Reset { .. }) => {
                return TransitionResult::Rejected("Test in progress");
            }
            (_, Reset { .. }) => Idle,

            _ => {
                return TransitionResult::Rejected(invalid_transition_reason(self.state, event));
            }
        };

        self.state = next;
        TransitionResult::Ok(next)
    }
}

fn invalid_transition_reason(state: MachineState, event: TestEvent) -> &'static str {
    use MachineState::*;
    use TestEvent::*;
    match (state, event) {
        (Homing, HomeRequested) => "Homing already in progress",
        (Running | Paused | Error | Emergency, HomeRequested) => "Homing not allowed in this state",
        (_, StartRequested) => "Start requires READY",
        (_, PauseRequested) => "Pause requires RUNNING",
        (_, ResumeRequested) => "Resume requires PAUSED",
        (_, TestEnded) => "No test in progress",
        (_, HomingSucceeded | HomingFailed) => "Not homing",
        _ => "Invalid event for current state",
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
