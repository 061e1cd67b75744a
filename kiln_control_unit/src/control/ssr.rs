//! Time-proportional SSR modulation.
//!
//! Demand `d ∈ [0, W]` means "ON for the first `d` ms of each `W` ms
//! window". The window anchor advances in whole-window increments; if the
//! supervisor ticks late the anchor catches up until `now − anchor < W`.
//! The pin decision is re-evaluated every tick so safety can force the
//! relay off mid-window.
//!
//! Every 0→1 transition increments the lifetime cycle counter; the
//! modulator reports when the counter has advanced far enough past the
//! last persisted value for a flash write-through.

use kiln_common::consts::CYCLE_PERSIST_INTERVAL;

/// Pin decision for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsrDecision {
    /// Level the supervisor must drive onto the pin.
    pub on: bool,
    /// The cycle counter is due for a write-through.
    pub persist_due: bool,
}

/// Window state of the time-proportional output.
#[derive(Debug, Clone)]
pub struct SsrModulator {
    window_ms: u64,
    window_start_ms: Option<u64>,
    on: bool,
    cycles: u32,
    persisted_cycles: u32,
}

impl SsrModulator {
    /// `initial_cycles` is the persisted lifetime count loaded at boot.
    pub fn new(window_ms: u64, initial_cycles: u32) -> Self {
        Self {
            window_ms,
            window_start_ms: None,
            on: false,
            cycles: initial_cycles,
            persisted_cycles: initial_cycles,
        }
    }

    /// Lifetime 0→1 transition count.
    #[inline]
    pub const fn cycles(&self) -> u32 {
        self.cycles
    }

    #[inline]
    pub const fn is_on(&self) -> bool {
        self.on
    }

    /// Current window anchor, once the first tick has established it.
    #[inline]
    pub const fn window_start_ms(&self) -> Option<u64> {
        self.window_start_ms
    }

    /// Record that the cycle counter was written through.
    pub fn mark_persisted(&mut self) {
        self.persisted_cycles = self.cycles;
    }

    /// Compute this tick's pin level. `demand_ms` is clamped to the
    /// window; `force_off` overrides everything.
    pub fn tick(&mut self, now_ms: u64, demand_ms: f64, force_off: bool) -> SsrDecision {
        let start = self.window_start_ms.get_or_insert(now_ms);
        while now_ms.saturating_sub(*start) >= self.window_ms {
            *start += self.window_ms;
        }
        let elapsed = (now_ms - *start) as f64;
        let demand = demand_ms.clamp(0.0, self.window_ms as f64);

        let on = !force_off && demand > elapsed;
        if on && !self.on {
            self.cycles = self.cycles.wrapping_add(1);
        }
        self.on = on;

        SsrDecision {
            on,
            persist_due: self.cycles.wrapping_sub(self.persisted_cycles)
                >= CYCLE_PERSIST_INTERVAL,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
