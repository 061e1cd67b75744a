//! Controller configuration types.
//!
//! All config types use `serde::Deserialize` for TOML loading. Optional
//! fields carry `#[serde(default)]` so older config files keep working.
//! Bounds are enforced by `validate()`, called by the loader before the
//! supervisor is constructed.

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_STORE_PATH, SSR_WINDOW_MS, STATUS_INTERVAL_MS, TICK_PERIOD_MS, TICK_PERIOD_MS_MAX,
    TICK_PERIOD_MS_MIN,
};

// ─── Autotune Parameters ────────────────────────────────────────────

/// Relay-feedback autotune parameters.
///
/// Defaults match the factory firmware: step 50, noise band 1 °C,
/// look-back 20 s, start value 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutotuneParams {
    /// Relay step amplitude around `start_value` [ms of window].
    #[serde(default = "default_output_step")]
    pub output_step: f64,

    /// Hysteresis band around the setpoint [°C].
    #[serde(default = "default_noise_band")]
    pub noise_band_c: f64,

    /// Minimum spacing between honored relay flips [s]. Filters
    /// intra-window ripple out of the oscillation measurement.
    #[serde(default = "default_lookback")]
    pub lookback_s: u32,

    /// Mean output the relay oscillates around [ms of window].
    #[serde(default = "default_start_value")]
    pub start_value: f64,

    /// Hard abort deadline [s].
    #[serde(default = "default_max_duration")]
    pub max_duration_s: u32,
}

fn default_output_step() -> f64 {
    50.0
}
fn default_noise_band() -> f64 {
    1.0
}
fn default_lookback() -> u32 {
    20
}
fn default_start_value() -> f64 {
    100.0
}
fn default_max_duration() -> u32 {
    1800
}

impl Default for AutotuneParams {
    fn default() -> Self {
        Self {
            output_step: default_output_step(),
            noise_band_c: default_noise_band(),
            lookback_s: default_lookback(),
            start_value: default_start_value(),
            max_duration_s: default_max_duration(),
        }
    }
}

impl AutotuneParams {
    /// Validate parameter bounds.
    pub fn validate(&self, window_ms: u64) -> Result<(), String> {
        let w = window_ms as f64;
        if !self.output_step.is_finite() || self.output_step <= 0.0 || self.output_step > w {
            return Err(format!(
                "autotune output_step {} out of range (0, {w}]",
                self.output_step
            ));
        }
        if !self.start_value.is_finite() || self.start_value < 0.0 || self.start_value > w {
            return Err(format!(
                "autotune start_value {} out of range [0, {w}]",
                self.start_value
            ));
        }
        if !self.noise_band_c.is_finite() || self.noise_band_c <= 0.0 {
            return Err(format!(
                "autotune noise_band_c {} must be > 0",
                self.noise_band_c
            ));
        }
        if self.lookback_s == 0 || self.lookback_s > 600 {
            return Err(format!(
                "autotune lookback_s {} out of range [1, 600]",
                self.lookback_s
            ));
        }
        if self.max_duration_s < 60 || self.max_duration_s > 14_400 {
            return Err(format!(
                "autotune max_duration_s {} out of range [60, 14400]",
                self.max_duration_s
            ));
        }
        Ok(())
    }
}

// ─── Top-Level Config ───────────────────────────────────────────────

/// Top-level controller configuration, loaded from TOML at startup and
/// immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Supervisor tick period [ms] (default: 100 = 10 Hz).
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,

    /// Status snapshot publish interval [ms] (default: 2000).
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,

    /// SSR time-proportional window [ms] (default: 5000).
    #[serde(default = "default_window_ms")]
    pub ssr_window_ms: u64,

    /// Path of the persisted parameter file.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Inbound command queue depth.
    #[serde(default = "default_command_queue_depth")]
    pub command_queue_depth: usize,

    /// Outbound status queue depth.
    #[serde(default = "default_status_queue_depth")]
    pub status_queue_depth: usize,

    /// Autotune defaults; individual runs may override via the command.
    #[serde(default)]
    pub autotune: AutotuneParams,
}

fn default_tick_period_ms() -> u64 {
    TICK_PERIOD_MS
}
fn default_status_interval_ms() -> u64 {
    STATUS_INTERVAL_MS
}
fn default_window_ms() -> u64 {
    SSR_WINDOW_MS
}
fn default_store_path() -> String {
    DEFAULT_STORE_PATH.to_string()
}
fn default_command_queue_depth() -> usize {
    16
}
fn default_status_queue_depth() -> usize {
    32
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period_ms(),
            status_interval_ms: default_status_interval_ms(),
            ssr_window_ms: default_window_ms(),
            store_path: default_store_path(),
            command_queue_depth: default_command_queue_depth(),
            status_queue_depth: default_status_queue_depth(),
            autotune: AutotuneParams::default(),
        }
    }
}

impl ControllerConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_period_ms < TICK_PERIOD_MS_MIN || self.tick_period_ms > TICK_PERIOD_MS_MAX {
            return Err(format!(
                "tick_period_ms {} out of range [{TICK_PERIOD_MS_MIN}, {TICK_PERIOD_MS_MAX}]",
                self.tick_period_ms
            ));
        }
        if self.ssr_window_ms < 1_000 || self.ssr_window_ms > 60_000 {
            return Err(format!(
                "ssr_window_ms {} out of range [1000, 60000]",
                self.ssr_window_ms
            ));
        }
        if self.ssr_window_ms <= self.tick_period_ms {
            return Err(format!(
                "ssr_window_ms {} must exceed tick_period_ms {}",
                self.ssr_window_ms, self.tick_period_ms
            ));
        }
        if self.status_interval_ms < self.tick_period_ms {
            return Err(format!(
                "status_interval_ms {} shorter than one tick ({})",
                self.status_interval_ms, self.tick_period_ms
            ));
        }
        if self.command_queue_depth == 0 || self.status_queue_depth == 0 {
            return Err("queue depths must be >= 1".to_string());
        }
        if self.store_path.is_empty() {
            return Err("store_path must not be empty".to_string());
        }
        self.autotune.validate(self.ssr_window_ms)?;
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
