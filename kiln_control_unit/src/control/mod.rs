//! Control blocks: PID regulator, relay-feedback autotuner, and the
//! time-proportional SSR modulator.

pub mod autotune;
pub mod pid;
pub mod ssr;
