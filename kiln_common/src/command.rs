//! Inbound command set.
//!
//! Commands arrive through the supervisor's bounded queue from external
//! surfaces (touch UI, HTTP bridge). Rejections are returned to the
//! submitter synchronously; they are never persisted and never latch.

use serde::{Deserialize, Serialize};

use crate::config::AutotuneParams;
use crate::control::Gains;
use crate::schedule::Schedule;

/// A command accepted by the supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Replace the loaded schedule. Only accepted while idle.
    LoadSchedule {
        schedule: Schedule,
        /// Optional delay before the first step [s].
        start_delay_s: Option<u32>,
    },
    /// Begin firing the loaded schedule.
    Start,
    /// Abort any run or autotune and return to idle. SSR off.
    Stop,
    /// Begin relay-feedback gain identification.
    StartAutotune {
        /// Overrides for the configured tuning parameters.
        params: Option<AutotuneParams>,
    },
    /// Hot-reload PID gains; persisted.
    SetGains { gains: Gains },
    /// Set the thermocouple calibration offset [°C]; persisted.
    SetCalibration { offset_c: f64 },
    /// Clear a latched error after operator acknowledgement.
    ResetError,
}

/// Why a command was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum CommandRejection {
    /// The controller is not idle.
    #[error("busy: {0}")]
    Busy(String),

    /// The submitted schedule failed validation.
    #[error("bad schedule: {0}")]
    BadSchedule(String),

    /// A numeric parameter was out of range.
    #[error("bad parameter: {0}")]
    BadParam(String),
}
