//! Thermocouple reader: calibration and plausibility checks on top of
//! the raw converter driver.
//!
//! No smoothing: the supervisor sees each sample with at most one tick
//! of lag, and a single fault is enough to latch: the furnace is unsafe
//! without sensing.

use kiln_common::consts::{TC_RANGE_MAX_C, TC_RANGE_MIN_C};
use kiln_common::fault::TcFault;
use kiln_hal::driver::Thermocouple;

/// Calibrated temperature reader.
#[derive(Debug)]
pub struct TcReader<T> {
    driver: T,
    offset_c: f64,
}

impl<T: Thermocouple> TcReader<T> {
    pub fn new(driver: T, offset_c: f64) -> Self {
        Self { driver, offset_c }
    }

    #[inline]
    pub const fn offset_c(&self) -> f64 {
        self.offset_c
    }

    /// Update the calibration offset [°C]. Applies from the next read.
    pub fn set_offset_c(&mut self, offset_c: f64) {
        self.offset_c = offset_c;
    }

    /// Sample the process variable [°C], calibrated. Non-finite or
    /// implausible values are reported as faults, never returned.
    pub fn read(&mut self) -> Result<f64, TcFault> {
        let raw_c = self.driver.read()?;
        let pv_c = raw_c + self.offset_c;
        if !pv_c.is_finite() || !(TC_RANGE_MIN_C..=TC_RANGE_MAX_C).contains(&pv_c) {
            return Err(TcFault::Nan);
        }
        Ok(pv_c)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
