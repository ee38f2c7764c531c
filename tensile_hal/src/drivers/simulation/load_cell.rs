//! Simulated load cell front end.
//!
//! Produces raw ADC counts from the specimen model at the current
//! crosshead position and converts them with the same offset and
//! calibration factor arithmetic as the hardware driver.

use std::sync::Arc;

use tensile_common::hal::driver::ForceSensor;
use tensile_common::tester::config::LoadCellConfig;
use tracing::{debug, warn};

use super::{Crosshead, SpecimenModel};

pub struct SimLoadCell {
    crosshead: Arc<Crosshead>,
    specimen: Arc<SpecimenModel>,
    /// Raw counts at zero load.
    zero_counts: f64,
    /// Tared offset [counts].
    offset: f64,
    /// Counts per newton.
    calibration_factor: f64,
    overload_limit_n: f64,
    last_force: f64,
    reads: u64,
}

impl SimLoadCell {
    pub fn new(
        crosshead: Arc<Crosshead>,
        specimen: Arc<SpecimenModel>,
        cfg: &LoadCellConfig,
        zero_counts: f64,
    ) -> Self {
        Self {
            crosshead,
            specimen,
            zero_counts,
            offset: 0.0,
            calibration_factor: cfg.calibration_factor,
            overload_limit_n: cfg.overload_limit_n,
            last_force: 0.0,
            reads: 0,
        }
    }

    fn read_raw(&mut self) -> f64 {
        self.reads += 1;
        let force = self.specimen.force_at(self.crosshead.position_mm());
        // Counts are produced with the factory factor so a changed
        // calibration factor shows up as a scale error, as on hardware.
        (force * self.nominal_factor() + self.zero_counts).round()
    }

    #[inline]
    fn nominal_factor(&self) -> f64 {
        tensile_common::consts::LOADCELL_CALIBRATION
    }

    /// Tared offset [counts].
    #[inline]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Raw reads performed so far.
    #[inline]
    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl ForceSensor for SimLoadCell {
    fn read_force(&mut self) -> f64 {
        let raw = self.read_raw();
        self.last_force = (raw - self.offset) / self.calibration_factor;
        self.last_force
    }

    #[inline]
    fn last_force(&self) -> f64 {
        self.last_force
    }

    fn tare(&mut self, samples: u32) {
        let samples = samples.max(1);
        let sum: f64 = (0..samples).map(|_| self.read_raw()).sum();
        self.offset = (sum / f64::from(samples)).round();
        debug!("SimLoadCell tared over {samples} samples: offset {}", self.offset);
    }

    fn is_overload(&self) -> bool {
        self.last_force.abs() > self.overload_limit_n
    }

    fn set_calibration_factor(&mut self, factor: f64) {
        if factor == 0.0 || !factor.is_finite() {
            warn!("SimLoadCell ignoring calibration factor {factor}");
            return;
        }
        self.calibration_factor = factor;
    }

    #[inline]
    fn calibration_factor(&self) -> f64 {
        self.calibration_factor
    }
}
