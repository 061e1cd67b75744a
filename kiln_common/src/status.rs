//! Outbound status snapshot.
//!
//! An immutable record published on a fixed cadence (and on every state
//! change) to the telemetry sink. Snapshots are monotonically timestamped;
//! the sink never reads controller internals directly.

use serde::{Deserialize, Serialize};

use crate::control::Gains;
use crate::state::KilnState;

/// One published status record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Monotonic publish time [ms].
    pub timestamp_ms: u64,
    /// Process variable [°C], calibration applied.
    pub pv_c: f64,
    /// Current setpoint [°C].
    pub sp_c: f64,
    /// Controller state at publish time.
    pub state: KilnState,
    /// Active schedule step, when a run is in progress.
    pub step_index: Option<usize>,
    /// Operator-readable fault text. Set while `Error` is latched and
    /// after a failed autotune.
    pub error_text: Option<String>,
    /// Lifetime SSR 0→1 transition count.
    pub relay_cycles: u32,
    /// Thermocouple calibration offset [°C].
    pub tc_offset_c: f64,
    /// Active PID gains.
    pub gains: Gains,
    /// Remaining run time estimate [min], assuming SP is tracked perfectly.
    pub time_remaining_min: Option<u32>,
}
