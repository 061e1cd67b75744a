//! Persisted parameter store.
//!
//! One TOML file holding the PID gains, the thermocouple calibration
//! offset, and the lifetime relay cycle counter. Writes go through a
//! temp-file-and-rename so a power cut mid-write can never corrupt the
//! live file. The cycle counter is coalesced by the caller (every 1000
//! transitions, plus a flush when the controller returns to idle) to
//! spare the flash.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kiln_common::control::Gains;

/// Store failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("store encode error: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// The on-disk record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistedParams {
    #[serde(default = "default_kp")]
    pub kp: f64,
    #[serde(default = "default_ki")]
    pub ki: f64,
    #[serde(default = "default_kd")]
    pub kd: f64,
    /// Thermocouple calibration offset [°C].
    #[serde(default)]
    pub tc_offset_c: f64,
    /// Lifetime SSR 0→1 transitions.
    #[serde(default)]
    pub relay_cycles: u32,
}

fn default_kp() -> f64 {
    Gains::default().kp
}
fn default_ki() -> f64 {
    Gains::default().ki
}
fn default_kd() -> f64 {
    Gains::default().kd
}

impl Default for PersistedParams {
    fn default() -> Self {
        let gains = Gains::default();
        Self {
            kp: gains.kp,
            ki: gains.ki,
            kd: gains.kd,
            tc_offset_c: 0.0,
            relay_cycles: 0,
        }
    }
}

/// File-backed parameter store. Written only by the supervisor, at the
/// defined boundaries.
#[derive(Debug)]
pub struct ParamStore {
    path: PathBuf,
    params: PersistedParams,
}

impl ParamStore {
    /// Load the store, falling back to defaults when the file does not
    /// exist yet. A present-but-unreadable file is an error: silently
    /// discarding a calibration is worse than refusing to start.
    pub fn load_or_default(path: &Path) -> Result<Self, StoreError> {
        let params = if path.exists() {
            let text = std::fs::read_to_string(path)?;
            toml::from_str(&text)?
        } else {
            info!(path = %path.display(), "no parameter file, using defaults");
            PersistedParams::default()
        };
        Ok(Self {
            path: path.to_path_buf(),
            params,
        })
    }

    #[inline]
    pub fn gains(&self) -> Gains {
        Gains::new(self.params.kp, self.params.ki, self.params.kd)
    }

    #[inline]
    pub const fn tc_offset_c(&self) -> f64 {
        self.params.tc_offset_c
    }

    #[inline]
    pub const fn relay_cycles(&self) -> u32 {
        self.params.relay_cycles
    }

    /// Persist new gains immediately.
    pub fn set_gains(&mut self, gains: Gains) -> Result<(), StoreError> {
        self.params.kp = gains.kp;
        self.params.ki = gains.ki;
        self.params.kd = gains.kd;
        self.save()
    }

    /// Persist a new calibration offset immediately.
    pub fn set_tc_offset_c(&mut self, offset_c: f64) -> Result<(), StoreError> {
        self.params.tc_offset_c = offset_c;
        self.save()
    }

    /// Update the cycle counter in memory only. Call [`Self::save`] at a
    /// write-through boundary.
    pub fn set_relay_cycles(&mut self, cycles: u32) {
        self.params.relay_cycles = cycles;
    }

    /// Write the record atomically.
    pub fn save(&self) -> Result<(), StoreError> {
        let text = toml::to_string_pretty(&self.params)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, text)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            warn!(error = %e, "parameter store rename failed");
            return Err(e.into());
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
