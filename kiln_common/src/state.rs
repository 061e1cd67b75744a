//! Controller state enum.
//!
//! `#[repr(u8)]` for compact snapshot transport. Exactly one state is
//! active at any time; `Error` is latched and exits only via an explicit
//! reset command (or hardware reset).

use serde::{Deserialize, Serialize};

/// Global controller state.
///
/// `Heating`/`Holding`/`Cooling` are derived each tick from the kind of
/// the active schedule step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum KilnState {
    /// Ready, no firing in progress. SSR demand is zero.
    Idle = 0,
    /// Start accepted, waiting for the start delay to elapse.
    Delayed = 1,
    /// Active step is a ramp toward a higher temperature.
    Heating = 2,
    /// Active step is a timed hold.
    Holding = 3,
    /// Active step is a controlled cool-down.
    Cooling = 4,
    /// Relay-feedback gain identification running.
    Autotune = 5,
    /// Latched fault. SSR forced off until reset.
    Error = 6,
}

impl KilnState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Delayed),
            2 => Some(Self::Heating),
            3 => Some(Self::Holding),
            4 => Some(Self::Cooling),
            5 => Some(Self::Autotune),
            6 => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns true while a firing run or autotune owns the controller.
    #[inline]
    pub const fn is_running(&self) -> bool {
        matches!(
            self,
            Self::Delayed | Self::Heating | Self::Holding | Self::Cooling | Self::Autotune
        )
    }

    /// Returns true for the states in which the SSR may be driven.
    #[inline]
    pub const fn allows_actuation(&self) -> bool {
        matches!(
            self,
            Self::Heating | Self::Holding | Self::Cooling | Self::Autotune
        )
    }

    /// Lower-case name, matching the serialized form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Delayed => "delayed",
            Self::Heating => "heating",
            Self::Holding => "holding",
            Self::Cooling => "cooling",
            Self::Autotune => "autotune",
            Self::Error => "error",
        }
    }
}

impl Default for KilnState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for KilnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
