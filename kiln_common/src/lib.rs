//! # Kiln Common Library
//!
//! Shared vocabulary for the kiln controller workspace: safety constants,
//! controller states, thermocouple faults and interlock flags, the firing
//! schedule model, the inbound command set, the outbound status snapshot,
//! and the controller configuration types.
//!
//! This crate contains no I/O. Everything here is plain data with serde
//! support and validation, consumed by `kiln_hal` and `kiln_control_unit`.

pub mod command;
pub mod config;
pub mod consts;
pub mod control;
pub mod fault;
pub mod schedule;
pub mod state;
pub mod status;
