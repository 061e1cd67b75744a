//! PID gain set shared between command intake, the regulator, the
//! parameter store, and the status snapshot.

use serde::{Deserialize, Serialize};

/// PID gains. All three are non-negative; zero disables the term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    /// Proportional gain [ms/°C].
    pub kp: f64,
    /// Integral gain [ms/(°C·s)].
    pub ki: f64,
    /// Derivative gain [ms·s/°C].
    pub kd: f64,
}

impl Gains {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    /// Check all gains are finite and non-negative.
    pub fn validate(&self) -> Result<(), String> {
        for (name, v) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !v.is_finite() || v < 0.0 {
                return Err(format!("{name} must be finite and >= 0, got {v}"));
            }
        }
        Ok(())
    }
}

impl Default for Gains {
    /// Factory tuning carried until autotune or an explicit `SetGains`.
    fn default() -> Self {
        Self {
            kp: 2.0,
            ki: 5.0,
            kd: 1.0,
        }
    }
}
