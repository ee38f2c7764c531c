//! Crosshead motion control.
//!
//! Owns the actuator and the commanded position in steps. Each call to
//! [`MotionController::advance`] updates the trapezoidal profile and
//! emits at most one pulse when the step interval has elapsed. Pulses
//! always move toward the target, so a move never overshoots.
//!
//! Travel into an asserted limit is refused: the target collapses to the
//! current position and the profile is cleared.
//!
//! Homing is tick-driven as well (see [`homing`]); while it runs,
//! `advance` is a no-op and [`MotionController::tick_homing`] drives the
//! pulses.

pub mod homing;
pub mod profile;

use tensile_common::consts::DIR_SETUP_TIME_US;
use tensile_common::hal::driver::Actuator;
use tensile_common::hal::inputs::LimitInputs;
use tensile_common::tester::config::MotionConfig;
use tensile_common::tester::state::Direction;
use tracing::{debug, info, warn};

use self::homing::{HomingAction, HomingSequence, HomingTickResult};
use self::profile::{ProfileInput, next_velocity, step_interval_us, stopping_distance};

/// Largest target magnitude [steps]. Targets beyond it are clamped.
pub const MAX_TARGET_STEPS: i64 = (i32::MAX / 2) as i64;

/// Outcome of one [`MotionController::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    /// No move pending (or disabled, or homing).
    Idle,
    Moving,
    /// The limit for the travel direction is asserted; the move was
    /// cancelled.
    StoppedByLimit,
}

pub struct MotionController<A: Actuator> {
    actuator: A,
    steps_per_mm: f64,

    // ── Position ──
    position: i64,
    target: i64,

    // ── Profile ──
    velocity: f64,
    max_velocity: f64,
    acceleration: f64,
    min_speed: f64,
    step_interval_us: f64,
    last_step_us: Option<u64>,
    last_update_us: Option<u64>,

    // ── Drive state ──
    enabled: bool,
    homed: bool,
    /// Direction currently asserted on the driver, `None` until the
    /// first pulse.
    latched_direction: Option<Direction>,
    /// Direction of the most recent commanded travel.
    direction: Direction,

    homing: HomingSequence,
}

impl<A: Actuator> MotionController<A> {
    pub fn new(actuator: A, cfg: &MotionConfig) -> Self {
        let steps_per_mm = cfg.steps_per_mm();
        let backoff_steps = (cfg.homing_backoff_mm * steps_per_mm).round().max(0.0) as u32;
        Self {
            actuator,
            steps_per_mm,
            position: 0,
            target: 0,
            velocity: 0.0,
            max_velocity: cfg.max_speed,
            acceleration: cfg.acceleration,
            min_speed: cfg.min_speed,
            step_interval_us: 0.0,
            last_step_us: None,
            last_update_us: None,
            enabled: false,
            homed: false,
            latched_direction: None,
            direction: Direction::Up,
            homing: HomingSequence::new(cfg.homing_timeout_ms, backoff_steps),
        }
    }

    // ─── Drive Enable ───────────────────────────────────────────────

    pub fn enable(&mut self) {
        if !self.enabled {
            debug!("Motion enabled");
        }
        self.actuator.set_enabled(true);
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        if self.enabled {
            debug!("Motion disabled");
        }
        self.actuator.set_enabled(false);
        self.enabled = false;
    }

    // ─── Targets ────────────────────────────────────────────────────

    /// Set an absolute target [steps], clamped to `±MAX_TARGET_STEPS`.
    /// Repeating the same target is a no-op.
    pub fn move_to(&mut self, position: i64) {
        let position = position.clamp(-MAX_TARGET_STEPS, MAX_TARGET_STEPS);
        if position == self.target {
            return;
        }
        self.target = position;
        if let Some(dir) = Direction::from_delta(self.distance_to_go()) {
            self.direction = dir;
        }
    }

    /// Set a target relative to the current position [steps].
    pub fn move_relative(&mut self, delta: i64) {
        self.move_to(self.position.saturating_add(delta));
    }

    pub fn move_to_mm(&mut self, mm: f64) {
        self.move_to(self.mm_to_steps(mm));
    }

    pub fn move_relative_mm(&mut self, mm: f64) {
        self.move_relative(self.mm_to_steps(mm));
    }

    /// Cancel the move and drop the velocity to zero.
    pub fn stop_immediate(&mut self) {
        self.target = self.position;
        self.clear_profile();
    }

    /// Retarget to the nearest point reachable at the configured
    /// deceleration.
    pub fn stop_decelerate(&mut self) {
        let steps = stopping_distance(self.velocity, self.acceleration) as i64;
        self.target = if self.velocity > 0.0 {
            self.position + steps
        } else if self.velocity < 0.0 {
            self.position - steps
        } else {
            self.position
        };
    }

    /// Zero position and target.
    pub fn reset_position(&mut self) {
        self.position = 0;
        self.target = 0;
        self.clear_profile();
    }

    // ─── Limits ─────────────────────────────────────────────────────

    /// Max speed [steps/s]. The sign is dropped; zero is ignored.
    pub fn set_max_velocity(&mut self, steps_per_s: f64) {
        let steps_per_s = steps_per_s.abs();
        if !(steps_per_s > 0.0) || !steps_per_s.is_finite() {
            warn!("Ignoring max velocity {steps_per_s}");
            return;
        }
        self.max_velocity = steps_per_s;
        if self.velocity.abs() > steps_per_s {
            self.velocity = steps_per_s.copysign(self.velocity);
            self.step_interval_us = step_interval_us(self.velocity);
        }
    }

    pub fn set_speed_mm_per_s(&mut self, mm_s: f64) {
        self.set_max_velocity(mm_s * self.steps_per_mm);
    }

    /// Acceleration [steps/s²]. The sign is dropped; zero is ignored.
    pub fn set_acceleration(&mut self, steps_per_s2: f64) {
        let steps_per_s2 = steps_per_s2.abs();
        if !(steps_per_s2 > 0.0) || !steps_per_s2.is_finite() {
            warn!("Ignoring acceleration {steps_per_s2}");
            return;
        }
        self.acceleration = steps_per_s2;
    }

    // ─── Periodic Update ────────────────────────────────────────────

    /// Update the profile and emit a pulse when one is due.
    pub fn advance(&mut self, now_us: u64) -> MotionOutcome {
        if self.homing.is_active() || !self.enabled {
            return MotionOutcome::Idle;
        }

        let remaining = self.distance_to_go();
        let Some(dir) = Direction::from_delta(remaining) else {
            self.clear_profile();
            return MotionOutcome::Idle;
        };

        if self.actuator.limit_inputs().blocks(dir) {
            warn!(
                "Limit asserted in {dir:?} travel at {:.3} mm, move cancelled",
                self.position_mm()
            );
            self.direction = dir;
            self.stop_immediate();
            return MotionOutcome::StoppedByLimit;
        }

        let dt = self.profile_dt(now_us);
        self.velocity = next_velocity(&ProfileInput {
            velocity: self.velocity,
            remaining,
            max_velocity: self.max_velocity,
            acceleration: self.acceleration,
            min_speed: self.min_speed,
            dt,
        });
        self.step_interval_us = step_interval_us(self.velocity);

        if self.step_due(now_us) {
            self.step_toward_target(now_us);
        }
        MotionOutcome::Moving
    }

    // ─── Homing ─────────────────────────────────────────────────────

    /// Enable the drive and begin homing toward the limit for
    /// `direction`.
    pub fn start_homing(&mut self, direction: Direction, now_us: u64) {
        self.stop_immediate();
        self.enable();
        self.direction = direction;
        self.homing.start(direction, self.max_velocity, now_us);
        self.velocity = HomingSequence::approach_speed(self.max_velocity) * f64::from(direction.sign());
        info!("Homing started toward {direction:?} limit");
    }

    /// Run one homing tick. Terminal results are reported once, then the
    /// sequence returns to idle.
    pub fn tick_homing(&mut self, now_us: u64) -> HomingTickResult {
        match self.homing.tick(self.actuator.limit_inputs(), now_us) {
            HomingAction::Idle => HomingTickResult::Inactive,
            HomingAction::Hold => {
                if self.homing.phase() == homing::HomingPhase::BackOff {
                    let back = self.homing.direction().opposite();
                    self.velocity =
                        HomingSequence::backoff_speed(self.max_velocity) * f64::from(back.sign());
                }
                HomingTickResult::InProgress
            }
            HomingAction::Step(dir) => {
                self.pulse(dir, now_us);
                self.target = self.position;
                HomingTickResult::InProgress
            }
            HomingAction::Complete => {
                self.homing.reset();
                self.reset_position();
                self.homed = true;
                info!("Homing complete, position zeroed");
                HomingTickResult::Success
            }
            HomingAction::Failed(reason) => {
                self.homing.reset();
                self.stop_immediate();
                warn!("Homing failed: {}", reason.message());
                HomingTickResult::Failed { reason }
            }
        }
    }

    /// Cancel a running homing sequence. `homed` is left unchanged.
    pub fn abort_homing(&mut self) {
        if self.homing.abort() {
            self.homing.reset();
            self.stop_immediate();
            info!("Homing aborted");
        }
    }

    #[inline]
    pub fn is_homing(&self) -> bool {
        self.homing.is_active()
    }

    // ─── Accessors ──────────────────────────────────────────────────

    #[inline]
    pub fn position(&self) -> i64 {
        self.position
    }

    #[inline]
    pub fn target(&self) -> i64 {
        self.target
    }

    #[inline]
    pub fn distance_to_go(&self) -> i64 {
        self.target.saturating_sub(self.position)
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.distance_to_go() != 0
    }

    /// Signed velocity [steps/s].
    #[inline]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    #[inline]
    pub fn max_velocity(&self) -> f64 {
        self.max_velocity
    }

    #[inline]
    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn is_homed(&self) -> bool {
        self.homed
    }

    /// Direction of the most recent commanded travel.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn limit_inputs(&self) -> LimitInputs {
        self.actuator.limit_inputs()
    }

    #[inline]
    pub fn steps_per_mm(&self) -> f64 {
        self.steps_per_mm
    }

    #[inline]
    pub fn position_mm(&self) -> f64 {
        self.steps_to_mm(self.position)
    }

    #[inline]
    pub fn mm_to_steps(&self, mm: f64) -> i64 {
        (mm * self.steps_per_mm).round() as i64
    }

    #[inline]
    pub fn steps_to_mm(&self, steps: i64) -> f64 {
        steps as f64 / self.steps_per_mm
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    // ── Helpers ──

    fn clear_profile(&mut self) {
        self.velocity = 0.0;
        self.step_interval_us = 0.0;
        self.last_update_us = None;
    }

    /// Profile integration step [s], capped at one step interval so a
    /// stalled loop cannot jump the velocity.
    fn profile_dt(&mut self, now_us: u64) -> f64 {
        let elapsed_us = match self.last_update_us {
            Some(prev) => now_us.saturating_sub(prev) as f64,
            None => 0.0,
        };
        self.last_update_us = Some(now_us);
        let cap_us = if self.step_interval_us > 0.0 {
            self.step_interval_us
        } else {
            step_interval_us(self.min_speed.min(self.max_velocity))
        };
        elapsed_us.min(cap_us) / 1_000_000.0
    }

    fn step_due(&self, now_us: u64) -> bool {
        if self.step_interval_us <= 0.0 {
            return false;
        }
        match self.last_step_us {
            None => true,
            Some(last) => now_us.saturating_sub(last) as f64 >= self.step_interval_us,
        }
    }

    fn step_toward_target(&mut self, now_us: u64) {
        let Some(dir) = Direction::from_delta(self.distance_to_go()) else {
            return;
        };
        self.pulse(dir, now_us);
        if self.position == self.target {
            self.clear_profile();
        }
    }

    fn pulse(&mut self, dir: Direction, now_us: u64) {
        if self.latched_direction != Some(dir) {
            self.actuator.set_direction(dir);
            self.actuator.delay_us(DIR_SETUP_TIME_US);
            self.latched_direction = Some(dir);
        }
        self.direction = dir;
        self.actuator.pulse();
        self.position += i64::from(dir.sign());
        self.last_step_us = Some(now_us);
    }
}
