//! Schedule engine: walks the firing schedule and computes the
//! instantaneous setpoint.
//!
//! Ramps are time-based: the setpoint advances on the wall clock at the
//! programmed rate regardless of whether the PV keeps up; a large PV-SP
//! gap is the regulator's concern. The step-start anchors (time and
//! temperature) are captured at the moment each step is entered, so every
//! ramp starts from the temperature actually reached.

use kiln_common::consts::{IDLE_SETPOINT_C, MAX_TEMP_C};
use kiln_common::schedule::{Schedule, Step};
use kiln_common::state::KilnState;

const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_MIN: f64 = 60_000.0;

/// Result of one schedule tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Setpoint for this tick [°C].
    pub sp_c: f64,
    /// Controller state implied by the (possibly just-entered) step.
    pub state: KilnState,
    /// Active step index; equals the step count once finished.
    pub step_index: usize,
    /// The final step completed this tick.
    pub finished: bool,
}

/// Per-run schedule walker.
#[derive(Debug, Clone)]
pub struct ScheduleRunner {
    schedule: Schedule,
    step_index: usize,
    step_start_ms: u64,
    step_start_temp_c: f64,
}

impl ScheduleRunner {
    /// Anchor the first step at `now_ms` and the current PV.
    pub fn new(schedule: Schedule, now_ms: u64, pv_c: f64) -> Self {
        Self {
            schedule,
            step_index: 0,
            step_start_ms: now_ms,
            step_start_temp_c: pv_c,
        }
    }

    /// Re-anchor the current step, e.g. when a start delay expires.
    pub fn rebase(&mut self, now_ms: u64, pv_c: f64) {
        self.step_start_ms = now_ms;
        self.step_start_temp_c = pv_c;
    }

    #[inline]
    pub const fn step_index(&self) -> usize {
        self.step_index
    }

    #[inline]
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Advance the schedule by one tick.
    pub fn tick(&mut self, now_ms: u64, pv_c: f64) -> Progress {
        let num_steps = self.schedule.len();
        if self.step_index >= num_steps {
            return Progress {
                sp_c: IDLE_SETPOINT_C,
                state: KilnState::Idle,
                step_index: num_steps,
                finished: true,
            };
        }

        let step = self.schedule.steps[self.step_index];
        let elapsed_ms = now_ms.saturating_sub(self.step_start_ms);
        let mut advance = false;

        let mut sp_c = match step {
            Step::Ramp {
                target_c,
                rate_c_per_hr,
            } => {
                let sp = self.step_start_temp_c + rate_c_per_hr * elapsed_ms as f64 / MS_PER_HOUR;
                if sp >= target_c {
                    advance = true;
                    target_c
                } else {
                    sp
                }
            }
            Step::Cool {
                target_c,
                rate_c_per_hr,
            } => {
                let sp = self.step_start_temp_c - rate_c_per_hr * elapsed_ms as f64 / MS_PER_HOUR;
                if sp <= target_c {
                    advance = true;
                    target_c
                } else {
                    sp
                }
            }
            Step::Hold {
                target_c,
                duration_min,
            } => {
                if elapsed_ms as f64 / MS_PER_MIN >= f64::from(duration_min) {
                    advance = true;
                }
                target_c
            }
        };

        if advance {
            self.step_index += 1;
            self.step_start_ms = now_ms;
            self.step_start_temp_c = pv_c;
        }

        let finished = self.step_index == num_steps;
        if finished {
            sp_c = IDLE_SETPOINT_C;
        }

        let state = if finished {
            KilnState::Idle
        } else {
            self.schedule.steps[self.step_index].active_state()
        };

        Progress {
            sp_c: sp_c.min(MAX_TEMP_C),
            state,
            step_index: self.step_index,
            finished,
        }
    }

    /// Remaining run time estimate [min], assuming the PV tracks the
    /// setpoint perfectly. `sp_now` is this tick's setpoint.
    pub fn remaining_minutes(&self, now_ms: u64, sp_now: f64) -> u32 {
        let mut total_min = 0.0_f64;
        let mut ref_temp = sp_now;

        for (i, step) in self.schedule.steps.iter().enumerate().skip(self.step_index) {
            match *step {
                Step::Ramp {
                    target_c,
                    rate_c_per_hr,
                }
                | Step::Cool {
                    target_c,
                    rate_c_per_hr,
                } => {
                    total_min += (target_c - ref_temp).abs() / rate_c_per_hr * 60.0;
                    ref_temp = target_c;
                }
                Step::Hold {
                    target_c,
                    duration_min,
                } => {
                    let mut minutes = f64::from(duration_min);
                    if i == self.step_index {
                        let elapsed =
                            now_ms.saturating_sub(self.step_start_ms) as f64 / MS_PER_MIN;
                        minutes = (minutes - elapsed).max(0.0);
                    }
                    total_min += minutes;
                    ref_temp = target_c;
                }
            }
        }

        total_min.round() as u32
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
