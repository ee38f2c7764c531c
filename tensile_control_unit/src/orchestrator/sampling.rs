//! Hybrid data point sampling and break detection.
//!
//! A sample is taken when the time-based interval has elapsed, or, at
//! least `SAMPLE_MIN_GAP_MS` after the previous sample, when the force
//! signal shows something worth recording:
//!
//! | Trigger      | Condition                                            |
//! |--------------|------------------------------------------------------|
//! | FORCE_DELTA  | `abs(f - f_last) > 5 N`                              |
//! | SLOPE_CHANGE | `abs(s_last) > 1` and `abs(s - s_last)/abs(s_last) > 0.3` |
//! | PEAK         | `f` above the highest sampled force                  |
//! | DROP         | highest sampled force > 50 N and `f < 0.9 ·` that    |
//!
//! Slopes are in N/s, measured against the previous sample.

use bitflags::bitflags;
use tensile_common::consts::{
    BREAK_MIN_PEAK_N, SAMPLE_DROP_ARM_N, SAMPLE_DROP_RATIO, SAMPLE_FORCE_DELTA_N,
    SAMPLE_MIN_GAP_MS, SAMPLE_SLOPE_CHANGE_RATIO, SAMPLE_SLOPE_FLOOR_N_S,
};

bitflags! {
    /// Why a sample was taken. Empty means skip.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SampleTrigger: u8 {
        const PERIODIC     = 0x01;
        const FORCE_DELTA  = 0x02;
        const SLOPE_CHANGE = 0x04;
        const PEAK         = 0x08;
        const DROP         = 0x10;
    }
}

impl SampleTrigger {
    #[inline]
    pub fn should_record(self) -> bool {
        !self.is_empty()
    }
}

/// Per-test sampler state. Reset at every test start.
#[derive(Debug, Clone, Default)]
pub struct HybridSampler {
    last_sample_ms: Option<u64>,
    last_force: f64,
    last_slope: f64,
    max_seen: f64,
}

impl HybridSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Decide whether `force` at `now_ms` is recorded. When it is, the
    /// sampler state advances to this sample.
    pub fn evaluate(&mut self, now_ms: u64, force: f64, interval_ms: u32) -> SampleTrigger {
        let Some(last_ms) = self.last_sample_ms else {
            self.record(now_ms, force, 0.0);
            return SampleTrigger::PERIODIC;
        };

        let since = now_ms.saturating_sub(last_ms);
        let slope = if since > 0 {
            (force - self.last_force) / (since as f64 / 1000.0)
        } else {
            0.0
        };

        let mut trigger = SampleTrigger::empty();
        if since >= u64::from(interval_ms) {
            trigger |= SampleTrigger::PERIODIC;
        }
        if since >= SAMPLE_MIN_GAP_MS {
            trigger |= self.events(force, slope);
        }

        if trigger.should_record() {
            self.record(now_ms, force, slope);
        }
        trigger
    }

    #[inline]
    pub fn max_seen(&self) -> f64 {
        self.max_seen
    }

    // ── Helpers ──

    fn events(&self, force: f64, slope: f64) -> SampleTrigger {
        let mut events = SampleTrigger::empty();
        if (force - self.last_force).abs() > SAMPLE_FORCE_DELTA_N {
            events |= SampleTrigger::FORCE_DELTA;
        }
        if self.last_slope.abs() > SAMPLE_SLOPE_FLOOR_N_S
            && (slope - self.last_slope).abs() / self.last_slope.abs() > SAMPLE_SLOPE_CHANGE_RATIO
        {
            events |= SampleTrigger::SLOPE_CHANGE;
        }
        if force > self.max_seen {
            events |= SampleTrigger::PEAK;
        }
        if self.max_seen > SAMPLE_DROP_ARM_N && force < self.max_seen * SAMPLE_DROP_RATIO {
            events |= SampleTrigger::DROP;
        }
        events
    }

    fn record(&mut self, now_ms: u64, force: f64, slope: f64) {
        self.last_sample_ms = Some(now_ms);
        self.last_force = force;
        self.last_slope = slope;
        self.max_seen = self.max_seen.max(force);
    }
}

/// A break is a drop from the peak by more than `threshold` (fraction
/// of peak). Never reported while the peak is at or below
/// `BREAK_MIN_PEAK_N`.
pub fn detect_break(force: f64, peak: f64, threshold: f64) -> bool {
    if peak <= BREAK_MIN_PEAK_N {
        return false;
    }
    1.0 - force / peak > threshold
}
