//! Tick-driven homing sequence.
//!
//! The sequence decides *when* to pulse and in which direction; the
//! motion controller executes the pulses and applies the result.
//!
//! ## Phases
//!
//! | Phase    | Speed          | Exit                                   |
//! |----------|----------------|----------------------------------------|
//! | Approach | 0.5 · max      | limit for the homing direction asserts |
//! | BackOff  | 0.1 · max      | back-off distance travelled            |
//! | Complete | n/a            | caller zeroes position, sets homed     |
//! | Failed   | n/a            | approach deadline expired              |
//!
//! Only the approach is bounded by the deadline; the back-off is a fixed
//! number of steps.

use tensile_common::consts::{HOMING_APPROACH_FACTOR, HOMING_BACKOFF_FACTOR};
use tensile_common::hal::inputs::LimitInputs;
use tensile_common::tester::state::Direction;

use super::profile::step_interval_us;

// ─── Homing Phases ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HomingPhase {
    #[default]
    Idle,
    Approach,
    BackOff,
    Complete,
    Failed,
}

// ─── Homing Result ──────────────────────────────────────────────────

/// Result of a single homing tick, as seen by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingTickResult {
    /// No homing sequence running.
    Inactive,
    InProgress,
    /// Position is now zero and the machine is homed.
    Success,
    Failed { reason: HomingFailReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingFailReason {
    /// Limit not reached before the approach deadline.
    Timeout,
    /// Sequence cancelled by the caller (emergency, reset).
    Aborted,
}

impl HomingFailReason {
    pub fn message(self) -> &'static str {
        match self {
            HomingFailReason::Timeout => "Homing timed out",
            HomingFailReason::Aborted => "Homing aborted",
        }
    }
}

/// What the motion controller must do for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingAction {
    Idle,
    /// Nothing due yet.
    Hold,
    /// Emit one pulse in this direction.
    Step(Direction),
    Complete,
    Failed(HomingFailReason),
}

// ─── Homing Sequence ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HomingSequence {
    phase: HomingPhase,
    direction: Direction,
    timeout_us: u64,
    backoff_steps: u32,
    remaining_backoff: u32,
    approach_interval_us: f64,
    backoff_interval_us: f64,
    deadline_us: u64,
    last_step_us: Option<u64>,
    fail_reason: Option<HomingFailReason>,
}

impl HomingSequence {
    pub fn new(timeout_ms: u64, backoff_steps: u32) -> Self {
        Self {
            phase: HomingPhase::Idle,
            direction: Direction::Down,
            timeout_us: timeout_ms.saturating_mul(1000),
            backoff_steps,
            remaining_backoff: backoff_steps,
            approach_interval_us: 0.0,
            backoff_interval_us: 0.0,
            deadline_us: 0,
            last_step_us: None,
            fail_reason: None,
        }
    }

    #[inline]
    pub fn phase(&self) -> HomingPhase {
        self.phase
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self.phase, HomingPhase::Approach | HomingPhase::BackOff)
    }

    /// Approach speed for `max_velocity` [steps/s].
    #[inline]
    pub fn approach_speed(max_velocity: f64) -> f64 {
        max_velocity * HOMING_APPROACH_FACTOR
    }

    /// Back-off speed for `max_velocity` [steps/s].
    #[inline]
    pub fn backoff_speed(max_velocity: f64) -> f64 {
        max_velocity * HOMING_BACKOFF_FACTOR
    }

    /// Begin the approach toward the limit for `direction`.
    pub fn start(&mut self, direction: Direction, max_velocity: f64, now_us: u64) {
        self.phase = HomingPhase::Approach;
        self.direction = direction;
        self.remaining_backoff = self.backoff_steps;
        self.approach_interval_us = step_interval_us(Self::approach_speed(max_velocity));
        self.backoff_interval_us = step_interval_us(Self::backoff_speed(max_velocity));
        self.deadline_us = now_us.saturating_add(self.timeout_us);
        self.last_step_us = None;
        self.fail_reason = None;
    }

    /// Advance the sequence once per control tick.
    pub fn tick(&mut self, limits: LimitInputs, now_us: u64) -> HomingAction {
        match self.phase {
            HomingPhase::Idle => HomingAction::Idle,
            HomingPhase::Complete => HomingAction::Complete,
            HomingPhase::Failed => {
                HomingAction::Failed(self.fail_reason.unwrap_or(HomingFailReason::Timeout))
            }
            HomingPhase::Approach => {
                if limits.blocks(self.direction) {
                    self.last_step_us = None;
                    self.phase = if self.backoff_steps == 0 {
                        HomingPhase::Complete
                    } else {
                        HomingPhase::BackOff
                    };
                    return HomingAction::Hold;
                }
                if now_us >= self.deadline_us {
                    return self.fail(HomingFailReason::Timeout);
                }
                if self.pulse_due(now_us, self.approach_interval_us) {
                    self.last_step_us = Some(now_us);
                    HomingAction::Step(self.direction)
                } else {
                    HomingAction::Hold
                }
            }
            HomingPhase::BackOff => {
                if self.remaining_backoff == 0 {
                    self.phase = HomingPhase::Complete;
                    return HomingAction::Complete;
                }
                if self.pulse_due(now_us, self.backoff_interval_us) {
                    self.last_step_us = Some(now_us);
                    self.remaining_backoff -= 1;
                    HomingAction::Step(self.direction.opposite())
                } else {
                    HomingAction::Hold
                }
            }
        }
    }

    /// Cancel a running sequence.
    pub fn abort(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.fail(HomingFailReason::Aborted);
        true
    }

    /// Reset to idle.
    pub fn reset(&mut self) {
        self.phase = HomingPhase::Idle;
        self.remaining_backoff = self.backoff_steps;
        self.last_step_us = None;
        self.fail_reason = None;
    }

    // ── Helpers ──

    fn fail(&mut self, reason: HomingFailReason) -> HomingAction {
        self.phase = HomingPhase::Failed;
        self.fail_reason = Some(reason);
        HomingAction::Failed(reason)
    }

    fn pulse_due(&self, now_us: u64, interval_us: f64) -> bool {
        if interval_us <= 0.0 {
            return false;
        }
        match self.last_step_us {
            None => true,
            Some(last) => now_us.saturating_sub(last) as f64 >= interval_us,
        }
    }
}
