//! Operator panel: emergency stop button and indicator lamps.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tensile_common::hal::driver::{EmergencyInput, Indicators};
use tracing::{debug, warn};

/// Simulated latching emergency stop button.
#[derive(Debug, Default)]
pub struct SimEmergencyButton {
    engaged: Arc<AtomicBool>,
}

/// Cloneable handle used to press and release the button from another
/// thread (console, test harness).
#[derive(Debug, Clone)]
pub struct EmergencyHandle {
    engaged: Arc<AtomicBool>,
}

impl SimEmergencyButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> EmergencyHandle {
        EmergencyHandle {
            engaged: Arc::clone(&self.engaged),
        }
    }
}

impl EmergencyInput for SimEmergencyButton {
    #[inline]
    fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }
}

impl EmergencyHandle {
    pub fn press(&self) {
        warn!("Simulated emergency stop pressed");
        self.engaged.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        warn!("Simulated emergency stop released");
        self.engaged.store(false, Ordering::SeqCst);
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }
}

/// Simulated status and error lamps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimIndicators {
    pub status: bool,
    pub error: bool,
}

impl Indicators for SimIndicators {
    fn set_status(&mut self, on: bool) {
        if on != self.status {
            debug!("status lamp -> {}", if on { "on" } else { "off" });
        }
        self.status = on;
    }

    fn set_error(&mut self, on: bool) {
        if on != self.error {
            debug!("error lamp -> {}", if on { "on" } else { "off" });
        }
        self.error = on;
    }
}
