//! Driver traits for the kiln's hardware resources.
//!
//! The traits are deliberately thin: they capture what the supervisor
//! needs each tick without mandating a bus library or pin framework.
//! Implementations must complete within the tick I/O budget (< 5 ms);
//! anything slower belongs on its own task with a non-blocking front.

use kiln_common::fault::TcFault;

/// Temperature sensor on the kiln's single thermocouple bus.
pub trait Thermocouple {
    /// Sample the hot-junction temperature [°C], uncalibrated.
    fn read(&mut self) -> Result<f64, TcFault>;
}

/// The digital output gating mains to the heating elements.
pub trait SsrPin {
    /// Drive the pin. Called exactly once per tick by the supervisor.
    fn set(&mut self, on: bool);

    /// Last commanded level.
    fn is_on(&self) -> bool;
}

/// Door switch input (pull-up, asserted LOW = open).
pub trait DoorSwitch {
    /// Returns true while the door is open.
    fn is_open(&mut self) -> bool;
}

/// Hardware watchdog. The supervisor feeds it once per tick; a missed
/// timeout window resets the device without software involvement.
pub trait HardwareWatchdog {
    fn feed(&mut self);
}
