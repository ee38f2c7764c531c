//! Cooperative control cycle: command → advance → update.
//!
//! The runner owns every wired instance (motion controller, orchestrator,
//! sensor, inputs, lamps) and executes one tick per period:
//!
//! 1. take at most one pending command and hand it to the orchestrator;
//! 2. one motion `advance()`;
//! 3. one orchestrator `update()`;
//! 4. refresh the lamps when the indicator period has elapsed.
//!
//! Pacing uses `Instant` and `thread::sleep`; overruns are counted and
//! never abort the loop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tensile_common::config::ConfigError;
use tensile_common::hal::driver::{Actuator, EmergencyInput, ForceSensor, HalError, Indicators};
use tensile_common::tester::command::CommandFrame;
use tensile_common::tester::config::RigConfig;
use thiserror::Error;
use tracing::{debug, info};

use crate::indicator::StatusIndicator;
use crate::motion::{MotionController, MotionOutcome};
use crate::orchestrator::{Orchestrator, TickContext};
use crate::protocol::ResponseSink;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle body duration [ns].
    pub last_cycle_ns: u64,
    pub min_cycle_ns: u64,
    pub max_cycle_ns: u64,
    /// Running sum for average computation.
    pub sum_cycle_ns: u64,
    /// Cycles whose body exceeded the period.
    pub overruns: u64,
    /// Commands handed to the orchestrator.
    pub commands: u64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: u64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            commands: 0,
        }
    }

    /// Record a cycle duration.
    #[inline]
    pub fn record(&mut self, duration_ns: u64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> u64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("hardware error: {0}")]
    Hal(#[from] HalError),

    /// The response channel could not be written.
    #[error("response channel failed: {0}")]
    Output(#[from] std::io::Error),
}

// ─── Command Source ─────────────────────────────────────────────────

/// Non-blocking supplier of parsed commands.
pub trait CommandSource {
    fn poll(&mut self) -> Option<CommandFrame>;
}

impl CommandSource for VecDeque<CommandFrame> {
    fn poll(&mut self) -> Option<CommandFrame> {
        self.pop_front()
    }
}

// ─── Cycle Runner ───────────────────────────────────────────────────

pub struct CycleRunner<A, F, E, I>
where
    A: Actuator,
    F: ForceSensor,
    E: EmergencyInput,
    I: Indicators,
{
    motion: MotionController<A>,
    orchestrator: Orchestrator,
    sensor: F,
    emergency: E,
    lamps: I,
    indicator: StatusIndicator,
    stats: CycleStats,
    period: Duration,
}

impl<A, F, E, I> CycleRunner<A, F, E, I>
where
    A: Actuator,
    F: ForceSensor,
    E: EmergencyInput,
    I: Indicators,
{
    /// Wire the instances for `cfg`. The configuration is validated first.
    pub fn new(cfg: &RigConfig, actuator: A, sensor: F, emergency: E, lamps: I) -> Result<Self, CycleError> {
        cfg.validate()?;
        let motion = MotionController::new(actuator, &cfg.motion);
        debug!(
            "Cycle wired: {:.0} steps/mm, tick {} µs, lamps every {} ms",
            motion.steps_per_mm(),
            cfg.cycle.tick_us,
            cfg.cycle.status_update_ms
        );
        Ok(Self {
            motion,
            orchestrator: Orchestrator::new(cfg),
            sensor,
            emergency,
            lamps,
            indicator: StatusIndicator::new(cfg.cycle.status_update_ms),
            stats: CycleStats::new(),
            period: Duration::from_micros(cfg.cycle.tick_us),
        })
    }

    /// Execute one tick at `now_us`.
    pub fn tick(&mut self, command: Option<CommandFrame>, now_us: u64, sink: &mut dyn ResponseSink) {
        if let Some(frame) = command {
            self.stats.commands += 1;
            let mut ctx = TickContext {
                motion: &mut self.motion,
                sensor: &mut self.sensor,
                emergency: &self.emergency,
                sink: &mut *sink,
                now_us,
            };
            self.orchestrator.handle_command(frame, &mut ctx);
        }

        if self.motion.advance(now_us) == MotionOutcome::StoppedByLimit {
            debug!("Move cancelled by limit at {:.3} mm", self.motion.position_mm());
        }

        let mut ctx = TickContext {
            motion: &mut self.motion,
            sensor: &mut self.sensor,
            emergency: &self.emergency,
            sink: &mut *sink,
            now_us,
        };
        self.orchestrator.update(&mut ctx);

        self.indicator
            .refresh(self.orchestrator.state(), now_us / 1000, &mut self.lamps);
    }

    /// Run paced ticks until `running` is cleared.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K, running: &AtomicBool) -> Result<(), CycleError>
    where
        S: CommandSource,
        K: ResponseSink,
    {
        let epoch = Instant::now();
        info!("Control cycle running, period {} µs", self.period.as_micros());

        while running.load(Ordering::SeqCst) {
            let cycle_start = Instant::now();
            let now_us = u64::try_from(epoch.elapsed().as_micros()).unwrap_or(u64::MAX);

            let command = source.poll();
            self.tick(command, now_us, sink);
            sink.flush()?;

            let elapsed = cycle_start.elapsed();
            self.stats
                .record(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX));
            if elapsed > self.period {
                self.stats.overruns += 1;
            }
            if let Some(remaining) = self.period.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }

        info!(
            "Control cycle stopped: {} cycles, avg {} ns, max {} ns, {} overruns, {} commands",
            self.stats.cycle_count,
            self.stats.avg_cycle_ns(),
            self.stats.max_cycle_ns,
            self.stats.overruns,
            self.stats.commands
        );
        Ok(())
    }

    // ─── Accessors ──────────────────────────────────────────────────

    pub fn motion(&self) -> &MotionController<A> {
        &self.motion
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn sensor(&self) -> &F {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut F {
        &mut self.sensor
    }

    pub fn emergency(&self) -> &E {
        &self.emergency
    }

    pub fn lamps(&self) -> &I {
        &self.lamps
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }
}
