//! Simulation driver module.
//!
//! A software rig for development and testing without physical hardware:
//! a crosshead moved by step pulses, limit switches at fixed positions,
//! a load cell reading a specimen model, an emergency button and two lamps.
//!
//! All parts that observe the crosshead share one [`Crosshead`] through
//! an `Arc`, so the rig can be split into independently owned trait
//! objects while staying physically consistent.

mod actuator;
mod load_cell;
mod panel;
mod specimen;

pub use actuator::SimActuator;
pub use load_cell::SimLoadCell;
pub use panel::{EmergencyHandle, SimEmergencyButton, SimIndicators};
pub use specimen::SpecimenModel;

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use tensile_common::hal::driver::HalError;
use tensile_common::hal::inputs::LimitInputs;
use tensile_common::tester::config::{LoadCellConfig, MotionConfig, SimulationConfig};
use tracing::info;

// ─── Crosshead ──────────────────────────────────────────────────────

/// Physical crosshead position shared by the simulated parts.
///
/// Zero is the bottom limit switch; positions at or below zero assert
/// `BOTTOM`, positions at or above the top switch assert `TOP`.
#[derive(Debug)]
pub struct Crosshead {
    position_steps: AtomicI64,
    steps_per_mm: f64,
    top_limit_steps: i64,
}

impl Crosshead {
    pub fn new(start_mm: f64, top_limit_mm: f64, steps_per_mm: f64) -> Self {
        Self {
            position_steps: AtomicI64::new(mm_to_steps(start_mm, steps_per_mm)),
            steps_per_mm,
            top_limit_steps: mm_to_steps(top_limit_mm, steps_per_mm),
        }
    }

    #[inline]
    pub fn position_steps(&self) -> i64 {
        self.position_steps.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn position_mm(&self) -> f64 {
        self.position_steps() as f64 / self.steps_per_mm
    }

    /// Move the crosshead to an absolute position (test setup).
    pub fn place_mm(&self, mm: f64) {
        self.position_steps
            .store(mm_to_steps(mm, self.steps_per_mm), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn step(&self, delta: i64) {
        self.position_steps.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn limits(&self) -> LimitInputs {
        let pos = self.position_steps();
        let mut inputs = LimitInputs::empty();
        if pos >= self.top_limit_steps {
            inputs |= LimitInputs::TOP;
        }
        if pos <= 0 {
            inputs |= LimitInputs::BOTTOM;
        }
        inputs
    }
}

fn mm_to_steps(mm: f64, steps_per_mm: f64) -> i64 {
    (mm * steps_per_mm).round() as i64
}

// ─── Rig ────────────────────────────────────────────────────────────

/// Fully wired simulated rig.
///
/// Fields are public so the caller can move each part to its owner
/// (motion controller, cycle runner).
pub struct SimulatedRig {
    pub actuator: SimActuator,
    pub load_cell: SimLoadCell,
    pub emergency: SimEmergencyButton,
    pub indicators: SimIndicators,
    pub crosshead: Arc<Crosshead>,
    pub specimen: Arc<SpecimenModel>,
}

impl SimulatedRig {
    /// Build a rig from the configuration sections.
    ///
    /// # Errors
    /// Returns `HalError::ConfigError` if any section fails validation.
    pub fn new(
        motion: &MotionConfig,
        load_cell: &LoadCellConfig,
        sim: &SimulationConfig,
    ) -> Result<Self, HalError> {
        motion.validate().map_err(HalError::ConfigError)?;
        load_cell.validate().map_err(HalError::ConfigError)?;
        sim.validate().map_err(HalError::ConfigError)?;

        let crosshead = Arc::new(Crosshead::new(
            sim.start_position_mm,
            sim.top_limit_mm,
            motion.steps_per_mm(),
        ));
        let specimen = Arc::new(SpecimenModel::from_config(sim));

        info!(
            "Simulated rig: crosshead at {:.1} mm, top limit {:.1} mm, specimen taut at {:.1} mm",
            sim.start_position_mm, sim.top_limit_mm, sim.specimen_taut_mm
        );

        Ok(Self {
            actuator: SimActuator::new(Arc::clone(&crosshead)),
            load_cell: SimLoadCell::new(
                Arc::clone(&crosshead),
                Arc::clone(&specimen),
                load_cell,
                sim.zero_offset_counts,
            ),
            emergency: SimEmergencyButton::new(),
            indicators: SimIndicators::default(),
            crosshead,
            specimen,
        })
    }
}
