//! Trapezoidal velocity profile.
//!
//! Pure function of the current velocity and the remaining distance, so
//! it can be checked in isolation from pulse timing.
//!
//! Per update, with `remaining` signed steps to target and
//! `stop = v² / 2a`:
//!
//! | Condition                          | Action                               |
//! |------------------------------------|--------------------------------------|
//! | moving away from the target        | brake by `a·dt`, reverse at floor    |
//! | `abs(remaining) <= stop`           | decelerate by `a·dt`, floored        |
//! | otherwise                          | accelerate by `a·dt` up to `vmax`    |
//!
//! The floor keeps a pending move progressing and is never above `vmax`.

/// Inputs for one profile update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileInput {
    /// Current velocity [steps/s], sign = direction.
    pub velocity: f64,
    /// Signed steps to target. Must be non-zero.
    pub remaining: i64,
    /// Max velocity magnitude [steps/s].
    pub max_velocity: f64,
    /// Acceleration magnitude [steps/s²].
    pub acceleration: f64,
    /// Speed floor while a move is pending [steps/s].
    pub min_speed: f64,
    /// Time since the previous update [s].
    pub dt: f64,
}

/// Distance needed to stop from `velocity` at `acceleration` [steps].
#[inline]
pub fn stopping_distance(velocity: f64, acceleration: f64) -> f64 {
    if acceleration <= 0.0 {
        return 0.0;
    }
    velocity * velocity / (2.0 * acceleration)
}

/// Compute the velocity for the next step interval.
pub fn next_velocity(p: &ProfileInput) -> f64 {
    if p.remaining == 0 || p.max_velocity <= 0.0 {
        return 0.0;
    }

    let dir = if p.remaining > 0 { 1.0 } else { -1.0 };
    let floor = p.min_speed.min(p.max_velocity);
    let dv = p.acceleration * p.dt.max(0.0);
    // Speed component toward the target.
    let along = p.velocity * dir;

    if along < 0.0 {
        let braked = along + dv;
        return if braked < -floor {
            dir * braked.max(-p.max_velocity)
        } else {
            dir * floor
        };
    }

    let abs_remaining = p.remaining.unsigned_abs() as f64;
    let next = if abs_remaining <= stopping_distance(p.velocity, p.acceleration) {
        along - dv
    } else {
        along + dv
    };

    dir * next.clamp(floor, p.max_velocity)
}

/// Step interval for `velocity` [µs]. Zero when no pulse is due.
#[inline]
pub fn step_interval_us(velocity: f64) -> f64 {
    let speed = velocity.abs();
    if speed > 0.0 { 1_000_000.0 / speed } else { 0.0 }
}
