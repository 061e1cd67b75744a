//! Positional PID regulator.
//!
//! Output is ON-time demand in milliseconds of the SSR window, clamped to
//! `[0, out_max]`. The integral accumulator is clamped to the same span
//! (anti-windup by output clamping). The derivative acts on the process
//! variable, not the error, so setpoint steps produce no derivative kick.
//! The time base is the actual elapsed time between updates.

use kiln_common::control::Gains;

/// PID regulator state.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: Gains,
    /// Output ceiling [ms]. The floor is 0; the kiln has no active cooling.
    out_max: f64,
    auto_mode: bool,
    /// While held, the integral accumulator is frozen (door-open policy).
    integrator_held: bool,
    integral: f64,
    last_pv: Option<f64>,
    last_output: f64,
}

impl PidController {
    pub fn new(gains: Gains, out_max: f64) -> Self {
        Self {
            gains,
            out_max,
            auto_mode: false,
            integrator_held: false,
            integral: 0.0,
            last_pv: None,
            last_output: 0.0,
        }
    }

    #[inline]
    pub const fn gains(&self) -> Gains {
        self.gains
    }

    /// Atomically replace the gains. Takes effect on the next update.
    pub fn set_gains(&mut self, gains: Gains) {
        self.gains = gains;
    }

    #[inline]
    pub const fn is_auto(&self) -> bool {
        self.auto_mode
    }

    #[inline]
    pub const fn output(&self) -> f64 {
        self.last_output
    }

    /// Stop computing; the output stays at its last value for callers
    /// that still read it.
    pub fn set_manual(&mut self) {
        self.auto_mode = false;
    }

    /// Enable with bumpless transfer: the integral is pre-loaded so the
    /// first computed output equals `resume_output` (within clamping).
    pub fn enable_bumpless(&mut self, resume_output: f64, pv_c: f64, sp_c: f64) {
        let error = sp_c - pv_c;
        self.integral = (resume_output - self.gains.kp * error).clamp(0.0, self.out_max);
        self.last_pv = Some(pv_c);
        self.last_output = resume_output.clamp(0.0, self.out_max);
        self.auto_mode = true;
    }

    /// Freeze or release the integral accumulator.
    pub fn hold_integrator(&mut self, held: bool) {
        self.integrator_held = held;
    }

    /// Clear all internal state and drop to manual.
    pub fn reset(&mut self) {
        self.auto_mode = false;
        self.integrator_held = false;
        self.integral = 0.0;
        self.last_pv = None;
        self.last_output = 0.0;
    }

    /// Compute one cycle. `dt_s` is the elapsed time since the previous
    /// update [s]; non-positive dt returns the previous output.
    pub fn update(&mut self, pv_c: f64, sp_c: f64, dt_s: f64) -> f64 {
        if !self.auto_mode || dt_s <= 0.0 {
            return self.last_output;
        }

        let error = sp_c - pv_c;

        if !self.integrator_held {
            self.integral =
                (self.integral + self.gains.ki * error * dt_s).clamp(0.0, self.out_max);
        }

        // Derivative on measurement: −Kd · dPV/dt.
        let d_term = match self.last_pv {
            Some(last) => -self.gains.kd * (pv_c - last) / dt_s,
            None => 0.0,
        };
        self.last_pv = Some(pv_c);

        let out = (self.gains.kp * error + self.integral + d_term).clamp(0.0, self.out_max);
        self.last_output = out;
        out
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
