//! # Kiln HAL
//!
//! Hardware abstraction for the kiln controller. Defines the four driver
//! traits the supervisor is generic over (thermocouple, SSR pin, door
//! switch, hardware watchdog), decodes MAX31855 SPI frames, and provides
//! a simulation driver with a physics-based thermal plant for tests and
//! bench runs.
//!
//! Each hardware resource has exactly one owner: the supervisor receives
//! the driver instances by value and nothing else touches them.

pub mod driver;
pub mod max31855;
pub mod sim;
