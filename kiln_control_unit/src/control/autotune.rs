//! Relay-feedback PID autotune (Åström–Hägglund).
//!
//! The output relays between `start_value ± output_step`, flipping when
//! the PV crosses the oscillation center ± noise band. Each half-cycle's
//! PV extreme is captured between flips, so intra-window actuation ripple
//! never pollutes the measurement; the look-back horizon additionally
//! rejects flips closer together than the configured spacing.
//!
//! Identification terminates when the last three half-cycle amplitudes
//! agree within 5 %, or aborts at the hard deadline. From the ultimate
//! gain Ku = 4S/(πA) and period Pu the classic Ziegler–Nichols rules give
//! Kp = 0.6·Ku, Ki = 1.2·Ku/Pu, Kd = 0.075·Ku·Pu.

use heapless::Vec;

use kiln_common::config::AutotuneParams;
use kiln_common::control::Gains;

/// Half-cycle amplitude agreement required to terminate.
const CONVERGENCE_TOLERANCE: f64 = 0.05;

/// Peaks retained for period/amplitude estimation.
const MAX_PEAKS: usize = 16;

/// Why identification failed. Reported to the operator; never latches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AutotuneError {
    #[error("autotune timed out before the oscillation converged")]
    Timeout,

    #[error("autotune saw no usable oscillation")]
    InsufficientOscillation,
}

/// Successful identification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutotuneResult {
    pub gains: Gains,
    /// Ultimate gain.
    pub ku: f64,
    /// Ultimate period [s].
    pub pu_s: f64,
    /// Oscillation amplitude [°C] (half peak-to-peak).
    pub amplitude_c: f64,
}

/// Progress of one `update` call.
#[derive(Debug, Clone, PartialEq)]
pub enum AutotuneProgress {
    Running,
    Complete(AutotuneResult),
    Failed(AutotuneError),
}

#[derive(Debug, Clone, Copy)]
struct Peak {
    value_c: f64,
    at_ms: u64,
    high: bool,
}

/// Relay-feedback identification state.
#[derive(Debug)]
pub struct RelayAutotuner {
    params: AutotuneParams,
    out_max: f64,
    /// Oscillation center: the PV at start.
    center_c: f64,
    started_ms: u64,
    relay_high: bool,
    last_flip_ms: u64,
    /// Running extreme of the current half-cycle.
    extreme_c: f64,
    extreme_at_ms: u64,
    /// First flip ends the warm-up half-cycle; its extreme is discarded.
    flips: u32,
    peaks: Vec<Peak, MAX_PEAKS>,
    output_ms: f64,
    outcome: Option<AutotuneProgress>,
}

impl RelayAutotuner {
    /// Begin identification around the current PV. The relay starts high.
    pub fn new(params: AutotuneParams, out_max: f64, now_ms: u64, pv_c: f64) -> Self {
        let output_ms = (params.start_value + params.output_step).clamp(0.0, out_max);
        Self {
            params,
            out_max,
            center_c: pv_c,
            started_ms: now_ms,
            relay_high: true,
            last_flip_ms: now_ms,
            extreme_c: pv_c,
            extreme_at_ms: now_ms,
            flips: 0,
            peaks: Vec::new(),
            output_ms,
            outcome: None,
        }
    }

    /// Current actuation demand [ms of window].
    #[inline]
    pub const fn output_ms(&self) -> f64 {
        self.output_ms
    }

    /// Oscillation center [°C].
    #[inline]
    pub const fn center_c(&self) -> f64 {
        self.center_c
    }

    /// Advance one tick. Call with every fresh PV sample.
    pub fn update(&mut self, now_ms: u64, pv_c: f64) -> AutotuneProgress {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        if now_ms.saturating_sub(self.started_ms) >= u64::from(self.params.max_duration_s) * 1_000
        {
            let err = if self.peaks.len() < 4 {
                AutotuneError::InsufficientOscillation
            } else {
                AutotuneError::Timeout
            };
            self.output_ms = 0.0;
            self.outcome = Some(AutotuneProgress::Failed(err));
            return AutotuneProgress::Failed(err);
        }

        // While the relay drives up we track the trough left behind by
        // the previous half-cycle; while it drives down, the crest.
        let tracking_max = !self.relay_high;
        if (tracking_max && pv_c > self.extreme_c) || (!tracking_max && pv_c < self.extreme_c) {
            self.extreme_c = pv_c;
            self.extreme_at_ms = now_ms;
        }

        let band = self.params.noise_band_c;
        let crossed = if self.relay_high {
            pv_c > self.center_c + band
        } else {
            pv_c < self.center_c - band
        };
        let spacing_ok =
            now_ms.saturating_sub(self.last_flip_ms) >= u64::from(self.params.lookback_s) * 1_000;

        if crossed && spacing_ok {
            self.flip(now_ms, pv_c);
            if let Some(progress) = self.try_finish() {
                self.output_ms = 0.0;
                self.outcome = Some(progress.clone());
                return progress;
            }
        }

        AutotuneProgress::Running
    }

    fn flip(&mut self, now_ms: u64, pv_c: f64) {
        // The extreme gathered since the previous flip is the peak of the
        // half-cycle that just ended. The very first flip only closes the
        // warm-up ramp from the center, which is not a peak.
        if self.flips > 0 {
            let peak = Peak {
                value_c: self.extreme_c,
                at_ms: self.extreme_at_ms,
                high: !self.relay_high,
            };
            if self.peaks.is_full() {
                self.peaks.remove(0);
            }
            let _ = self.peaks.push(peak);
        }

        self.flips += 1;
        self.relay_high = !self.relay_high;
        self.last_flip_ms = now_ms;
        self.extreme_c = pv_c;
        self.extreme_at_ms = now_ms;
        self.output_ms = if self.relay_high {
            (self.params.start_value + self.params.output_step).clamp(0.0, self.out_max)
        } else {
            (self.params.start_value - self.params.output_step).clamp(0.0, self.out_max)
        };
    }

    /// Check the convergence criterion and compute gains when met.
    fn try_finish(&self) -> Option<AutotuneProgress> {
        let n = self.peaks.len();
        if n < 4 {
            return None;
        }

        let amp = |i: usize| (self.peaks[i].value_c - self.peaks[i - 1].value_c).abs();
        let (a1, a2, a3) = (amp(n - 1), amp(n - 2), amp(n - 3));
        let mean = (a1 + a2 + a3) / 3.0;
        if mean <= 0.0 {
            return Some(AutotuneProgress::Failed(
                AutotuneError::InsufficientOscillation,
            ));
        }
        let spread = a1.max(a2).max(a3) - a1.min(a2).min(a3);
        if spread > CONVERGENCE_TOLERANCE * mean {
            return None;
        }

        // Same-type peaks are one full period apart.
        let pu_s = {
            let newest = (self.peaks[n - 1].at_ms - self.peaks[n - 3].at_ms) as f64 / 1_000.0;
            let older = (self.peaks[n - 2].at_ms - self.peaks[n - 4].at_ms) as f64 / 1_000.0;
            (newest + older) / 2.0
        };
        if pu_s <= 0.0 {
            return Some(AutotuneProgress::Failed(
                AutotuneError::InsufficientOscillation,
            ));
        }

        let amplitude_c = mean / 2.0;
        let ku = 4.0 * self.params.output_step / (std::f64::consts::PI * amplitude_c);
        let gains = Gains {
            kp: 0.6 * ku,
            ki: 1.2 * ku / pu_s,
            kd: 0.075 * ku * pu_s,
        };

        Some(AutotuneProgress::Complete(AutotuneResult {
            gains,
            ku,
            pu_s,
            amplitude_c,
        }))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
