//! Integration test: hybrid sampling and break detection on force
//! signals at control-tick resolution.

use tensile_control_unit::orchestrator::sampling::{HybridSampler, SampleTrigger, detect_break};

// ── Helpers ─────────────────────────────────────────────────────────

/// Feed `signal(ms)` once per millisecond for `duration_ms`, returning
/// the recorded sample times and triggers.
fn sample(
    duration_ms: u64,
    interval_ms: u32,
    mut signal: impl FnMut(u64) -> f64,
) -> Vec<(u64, SampleTrigger)> {
    let mut sampler = HybridSampler::new();
    (0..duration_ms)
        .filter_map(|ms| {
            let trigger = sampler.evaluate(ms, signal(ms), interval_ms);
            trigger.should_record().then_some((ms, trigger))
        })
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn constant_force_samples_once_per_interval() {
    let samples = sample(1_000, 50, |_| 42.0);
    assert_eq!(samples.len(), 20);
    for (i, (ms, trigger)) in samples.iter().enumerate() {
        assert_eq!(*ms, i as u64 * 50);
        assert_eq!(*trigger, SampleTrigger::PERIODIC);
    }
}

#[test]
fn force_jump_adds_an_event_sample() {
    // 10 N step at 130 ms, 30 ms after the periodic sample at 100 ms.
    let samples = sample(200, 50, |ms| if ms < 130 { 20.0 } else { 30.0 });
    let times: Vec<u64> = samples.iter().map(|(ms, _)| *ms).collect();
    // The flat signal after the step is a slope change as well.
    assert_eq!(times, [0, 50, 100, 130, 150]);

    let (_, jump) = samples[3];
    assert!(jump.contains(SampleTrigger::FORCE_DELTA));
    assert!(!jump.contains(SampleTrigger::PERIODIC));
    assert_eq!(samples[4].1, SampleTrigger::SLOPE_CHANGE);
}

#[test]
fn events_wait_for_minimum_gap() {
    // Step 10 ms after a periodic sample: recorded once the 20 ms gap
    // has passed, not at the step.
    let samples = sample(100, 50, |ms| if ms < 60 { 0.0 } else { 10.0 });
    let times: Vec<u64> = samples.iter().map(|(ms, _)| *ms).collect();
    assert_eq!(times, [0, 50, 70, 90]);
}

#[test]
fn rising_ramp_records_peaks_between_intervals() {
    // 1 N/ms ramp: every 20 ms brings a new maximum.
    let samples = sample(200, 100, |ms| ms as f64);
    let times: Vec<u64> = samples.iter().map(|(ms, _)| *ms).collect();
    assert_eq!(times, (0..200).step_by(20).collect::<Vec<_>>());
    assert!(samples[1..].iter().all(|(_, t)| t.contains(SampleTrigger::PEAK)));
}

#[test]
fn drop_after_high_load_is_captured() {
    let samples = sample(300, 1_000, |ms| if ms < 200 { 100.0 } else { 85.0 });
    assert_eq!(samples[0].0, 0);
    let (at, trigger) = samples[1];
    assert_eq!(at, 200);
    assert!(trigger.contains(SampleTrigger::DROP));
    assert!(trigger.contains(SampleTrigger::FORCE_DELTA));

    // Below 90 % of the maximum the drop event keeps firing, paced by
    // the minimum gap.
    let times: Vec<u64> = samples.iter().map(|(ms, _)| *ms).collect();
    assert_eq!(times[1..], (200..300).step_by(20).collect::<Vec<_>>()[..]);
}

#[test]
fn break_needs_a_real_peak() {
    // Peak at or below 10 N never reports a break.
    for peak in [0.0, 1.0, 9.99, 10.0] {
        assert!(!detect_break(0.0, peak, 0.5), "peak {peak}");
        assert!(!detect_break(-5.0, peak, 0.1), "peak {peak}");
    }
    assert!(detect_break(4.9, 10.1, 0.5));
    assert!(!detect_break(60.0, 100.0, 0.5));
    assert!(!detect_break(50.0, 100.0, 0.5));
    assert!(detect_break(49.0, 100.0, 0.5));
}
