//! Firing schedule model.
//!
//! A schedule is an ordered, bounded list of tagged steps. Schedules come
//! in from the outside world as JSON; the tag field is validated during
//! deserialization and the numeric invariants by [`Schedule::validate`].

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::consts::{MAX_HOLD_MIN, MAX_SCHEDULE_STEPS, MAX_TEMP_C};
use crate::state::KilnState;

/// One step of a firing schedule.
///
/// Ramp and Cool are rate-limited moves toward `target_c`; Hold maintains
/// `target_c` for a fixed time. Whether a ramp actually heats or cools is
/// decided at step entry from the temperature the kiln is at then.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Step {
    /// Heat toward `target_c` at `rate_c_per_hr`.
    Ramp { target_c: f64, rate_c_per_hr: f64 },
    /// Maintain `target_c` for `duration_min` minutes.
    Hold { target_c: f64, duration_min: u32 },
    /// Cool toward `target_c` at `rate_c_per_hr`.
    Cool { target_c: f64, rate_c_per_hr: f64 },
}

impl Step {
    /// Target temperature of this step [°C].
    #[inline]
    pub const fn target_c(&self) -> f64 {
        match self {
            Self::Ramp { target_c, .. }
            | Self::Hold { target_c, .. }
            | Self::Cool { target_c, .. } => *target_c,
        }
    }

    /// Controller state reported while this step is active.
    #[inline]
    pub const fn active_state(&self) -> KilnState {
        match self {
            Self::Ramp { .. } => KilnState::Heating,
            Self::Hold { .. } => KilnState::Holding,
            Self::Cool { .. } => KilnState::Cooling,
        }
    }
}

/// Schedule validation failure. Reported to the command submitter,
/// never latched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("schedule has no steps")]
    Empty,

    #[error("schedule has {0} steps, maximum is {MAX_SCHEDULE_STEPS}")]
    TooManySteps(usize),

    #[error("step {index}: rate must be a positive finite number")]
    NonPositiveRate { index: usize },

    #[error("step {index}: hold duration {duration_min} min outside [0, {MAX_HOLD_MIN}]")]
    DurationOutOfRange { index: usize, duration_min: u32 },

    #[error("step {index}: target {target_c} °C outside (0, {MAX_TEMP_C}]")]
    TargetOutOfRange { index: usize, target_c: f64 },

    #[error("schedule JSON invalid: {0}")]
    Parse(String),
}

/// A complete, bounded firing schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Operator-facing name, used in logs and snapshots.
    #[serde(default)]
    pub name: String,
    /// Ordered steps, at most [`MAX_SCHEDULE_STEPS`].
    pub steps: Vec<Step, MAX_SCHEDULE_STEPS>,
}

impl Schedule {
    /// Build a schedule from a step slice, enforcing the step bound.
    pub fn from_steps(name: &str, steps: &[Step]) -> Result<Self, ScheduleError> {
        if steps.len() > MAX_SCHEDULE_STEPS {
            return Err(ScheduleError::TooManySteps(steps.len()));
        }
        let mut v: Vec<Step, MAX_SCHEDULE_STEPS> = Vec::new();
        for s in steps {
            // Cannot overflow: length checked above.
            let _ = v.push(*s);
        }
        let schedule = Self {
            name: name.to_string(),
            steps: v,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Parse and validate a schedule from its external JSON form.
    pub fn from_json(json: &str) -> Result<Self, ScheduleError> {
        let schedule: Self =
            serde_json::from_str(json).map_err(|e| ScheduleError::Parse(e.to_string()))?;
        schedule.validate()?;
        Ok(schedule)
    }

    /// Check the numeric invariants of every step.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.steps.is_empty() {
            return Err(ScheduleError::Empty);
        }
        for (index, step) in self.steps.iter().enumerate() {
            let target_c = step.target_c();
            if !target_c.is_finite() || target_c <= 0.0 || target_c > MAX_TEMP_C {
                return Err(ScheduleError::TargetOutOfRange { index, target_c });
            }
            match *step {
                Step::Ramp { rate_c_per_hr, .. } | Step::Cool { rate_c_per_hr, .. } => {
                    if !rate_c_per_hr.is_finite() || rate_c_per_hr <= 0.0 {
                        return Err(ScheduleError::NonPositiveRate { index });
                    }
                }
                Step::Hold { duration_min, .. } => {
                    if duration_min > MAX_HOLD_MIN {
                        return Err(ScheduleError::DurationOutOfRange {
                            index,
                            duration_min,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
