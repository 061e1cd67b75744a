//! Sensor fault and interlock flag types.
//!
//! Interlock flags use the `bitflags` crate. Flags in `LATCHING_MASK`
//! latch the controller into `Error`; the rest pause actuation for as
//! long as the condition persists.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Thermocouple read failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error, Serialize, Deserialize)]
pub enum TcFault {
    /// No thermocouple connected.
    #[error("thermocouple open circuit")]
    OpenCircuit,

    /// Thermocouple shorted to ground.
    #[error("thermocouple short to GND")]
    ShortToGnd,

    /// Thermocouple shorted to supply.
    #[error("thermocouple short to VCC")]
    ShortToVcc,

    /// Converter returned NaN or a reading outside the plausible range.
    #[error("thermocouple reading not a number")]
    Nan,

    /// SPI transfer failed or the frame was malformed.
    #[error("thermocouple bus error")]
    BusError,
}

bitflags! {
    /// Safety interlock flags, re-evaluated every tick.
    ///
    /// Flags in `LATCHING_MASK` latch `Error`. `DOOR_OPEN` is transient:
    /// it forces the SSR off and freezes the PID integrator while set,
    /// then clears itself when the door closes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InterlockFlags: u8 {
        /// PV exceeded the over-temperature trip point. **Latching**.
        const OVER_TEMP = 0x01;
        /// Thermocouple fault. **Latching**.
        const TC_FAULT  = 0x02;
        /// Door switch asserted open while not idle.
        const DOOR_OPEN = 0x04;
    }
}

impl InterlockFlags {
    /// Mask of all flags that latch the controller into `Error`.
    pub const LATCHING_MASK: Self =
        Self::from_bits_truncate(Self::OVER_TEMP.bits() | Self::TC_FAULT.bits());

    /// Returns true if any latching flag is set.
    #[inline]
    pub const fn has_latching(&self) -> bool {
        self.intersects(Self::LATCHING_MASK)
    }
}

impl Default for InterlockFlags {
    fn default() -> Self {
        Self::empty()
    }
}
