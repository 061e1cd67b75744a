//! System-wide constants for the kiln workspace.
//!
//! Single source of truth for all safety limits, timing defaults, and
//! capacity bounds. Imported by all crates; no duplication permitted.

/// Absolute over-temperature trip point [°C]. PV above this latches Error.
pub const MAX_TEMP_C: f64 = 1300.0;

/// Hardware watchdog timeout [ms]. A missed window resets the device.
pub const WATCHDOG_TIMEOUT_MS: u64 = 30_000;

/// SSR time-proportional window [ms].
pub const SSR_WINDOW_MS: u64 = 5_000;

/// Nominal supervisor tick period [ms] (10 Hz).
pub const TICK_PERIOD_MS: u64 = 100;

/// Minimum allowed tick period [ms] for runtime config.
pub const TICK_PERIOD_MS_MIN: u64 = 50;

/// Maximum allowed tick period [ms]. Beyond this the control loop is
/// too slow to hold the plant.
pub const TICK_PERIOD_MS_MAX: u64 = 500;

/// Status snapshot publish interval [ms].
pub const STATUS_INTERVAL_MS: u64 = 2_000;

/// Maximum number of steps in a firing schedule.
pub const MAX_SCHEDULE_STEPS: usize = 20;

/// Maximum hold duration [min] (24 h).
pub const MAX_HOLD_MIN: u32 = 24 * 60;

/// Setpoint parked when no schedule is active [°C].
pub const IDLE_SETPOINT_C: f64 = 20.0;

/// Relay cycle counter is written through every this many 0→1 transitions.
pub const CYCLE_PERSIST_INTERVAL: u32 = 1_000;

/// Commands drained from the inbound queue per tick.
pub const COMMAND_DRAIN_LIMIT: usize = 4;

/// Lowest plausible thermocouple reading [°C]. Below this is a sensor fault.
pub const TC_RANGE_MIN_C: f64 = -200.0;

/// Highest plausible thermocouple reading [°C]. Above this is a sensor fault.
pub const TC_RANGE_MAX_C: f64 = 1800.0;

/// Largest accepted calibration offset magnitude [°C].
pub const TC_OFFSET_MAX_C: f64 = 50.0;

/// Default path of the persisted parameter file.
pub const DEFAULT_STORE_PATH: &str = "/var/lib/kiln/params.toml";
