//! # Kiln Control Unit
//!
//! Supervisory control core for a single-zone electric kiln. Provides a
//! fixed-cadence tick that reads the thermocouple, enforces safety
//! interlocks, walks the firing schedule, runs the PID (or the relay
//! autotuner), and modulates the solid-state relay with time-proportional
//! output.
//!
//! ## Tick ordering
//!
//! Safety → Sense → Plan → Act, strictly, every tick. Safety evaluation
//! always precedes any actuation change; a latched error forces the SSR
//! off before anything else runs.
//!
//! ## Ownership
//!
//! The [`supervisor::Supervisor`] exclusively owns the gains, the run
//! context, the SSR window state, and the persisted counters. External
//! surfaces talk to it only through two bounded queues: inbound commands
//! and outbound status snapshots. The GPIO is written from exactly one
//! place, once per tick.

pub mod command;
pub mod config;
pub mod control;
pub mod schedule;
pub mod safety;
pub mod store;
pub mod supervisor;
pub mod thermocouple;
