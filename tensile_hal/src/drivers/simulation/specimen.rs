//! Specimen model for the simulated load cell.
//!
//! Slack until the crosshead reaches the taut position, then linear
//! elastic up to the ultimate force, then a plateau until the break
//! extension. Once broken the specimen carries no load until reset.

use std::sync::atomic::{AtomicBool, Ordering};

use tensile_common::tester::config::SimulationConfig;
use tracing::info;

#[derive(Debug)]
pub struct SpecimenModel {
    taut_mm: f64,
    stiffness_n_per_mm: f64,
    ultimate_force_n: f64,
    break_extension_mm: f64,
    broken: AtomicBool,
}

impl SpecimenModel {
    pub fn from_config(cfg: &SimulationConfig) -> Self {
        Self {
            taut_mm: cfg.specimen_taut_mm,
            stiffness_n_per_mm: cfg.stiffness_n_per_mm,
            ultimate_force_n: cfg.ultimate_force_n,
            break_extension_mm: cfg.break_extension_mm,
            broken: AtomicBool::new(false),
        }
    }

    /// Tensile force at crosshead position `position_mm` [N].
    pub fn force_at(&self, position_mm: f64) -> f64 {
        if self.is_broken() {
            return 0.0;
        }
        let stretch = position_mm - self.taut_mm;
        if stretch <= 0.0 {
            return 0.0;
        }
        if stretch >= self.break_extension_mm {
            if !self.broken.swap(true, Ordering::Relaxed) {
                info!("Simulated specimen broke at {position_mm:.3} mm");
            }
            return 0.0;
        }
        (self.stiffness_n_per_mm * stretch).min(self.ultimate_force_n)
    }

    #[inline]
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Relaxed)
    }

    /// Mount a fresh specimen.
    pub fn replace(&self) {
        self.broken.store(false, Ordering::Relaxed);
    }
}
