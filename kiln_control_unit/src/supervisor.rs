//! The supervisor: owns every piece of controller state and clocks the
//! control blocks at a fixed cadence.
//!
//! Per tick, strictly in order: drain commands → evaluate safety → sample
//! the thermocouple → advance the schedule (or the start delay) → compute
//! demand (PID or autotune) → modulate the SSR → publish telemetry. A
//! latched error short-circuits from safety straight to telemetry with
//! the relay forced off.
//!
//! The tick is driven externally with a monotonic millisecond clock;
//! [`Supervisor::run`] paces it with `Instant` for production, tests feed
//! it a scripted clock.

use std::sync::mpsc::{Receiver, SyncSender, TrySendError};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use kiln_common::command::{Command, CommandRejection};
use kiln_common::config::ControllerConfig;
use kiln_common::consts::{COMMAND_DRAIN_LIMIT, IDLE_SETPOINT_C, TC_OFFSET_MAX_C};
use kiln_common::schedule::Schedule;
use kiln_common::state::KilnState;
use kiln_common::status::StatusSnapshot;
use kiln_hal::driver::{DoorSwitch, HardwareWatchdog, SsrPin, Thermocouple};

use crate::command::CommandEnvelope;
use crate::control::autotune::{AutotuneProgress, AutotuneResult, RelayAutotuner};
use crate::control::pid::PidController;
use crate::control::ssr::SsrModulator;
use crate::safety::SafetySupervisor;
use crate::schedule::ScheduleRunner;
use crate::store::ParamStore;
use crate::thermocouple::TcReader;

// ─── Tick Statistics ────────────────────────────────────────────────

/// O(1) per-tick timing statistics. Updated every tick, no allocation.
#[derive(Debug, Clone)]
pub struct TickStats {
    /// Total ticks executed.
    pub tick_count: u64,
    /// Last tick duration [µs].
    pub last_tick_us: u64,
    /// Maximum tick duration [µs].
    pub max_tick_us: u64,
    /// Running sum for average computation.
    pub sum_tick_us: u64,
    /// Ticks that exceeded the period budget.
    pub overruns: u64,
}

impl TickStats {
    pub const fn new() -> Self {
        Self {
            tick_count: 0,
            last_tick_us: 0,
            max_tick_us: 0,
            sum_tick_us: 0,
            overruns: 0,
        }
    }

    /// Record a tick duration. O(1).
    #[inline]
    pub fn record(&mut self, duration_us: u64, budget_us: u64) {
        self.tick_count += 1;
        self.last_tick_us = duration_us;
        if duration_us > self.max_tick_us {
            self.max_tick_us = duration_us;
        }
        self.sum_tick_us += duration_us;
        if duration_us > budget_us {
            self.overruns += 1;
        }
    }

    /// Average tick time [µs] (0 if no ticks).
    #[inline]
    pub fn avg_tick_us(&self) -> u64 {
        if self.tick_count == 0 {
            0
        } else {
            self.sum_tick_us / self.tick_count
        }
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Run / Autotune Context ─────────────────────────────────────────

/// Present only while a firing run owns the controller.
#[derive(Debug)]
struct RunContext {
    runner: ScheduleRunner,
    /// Set while waiting out the start delay.
    delay_deadline_ms: Option<u64>,
}

/// Present only while autotune owns the controller.
#[derive(Debug)]
struct AutotuneRun {
    tuner: RelayAutotuner,
    /// PID mode to restore on completion.
    prior_auto: bool,
}

// ─── Supervisor ─────────────────────────────────────────────────────

/// The control core. Generic over the four hardware drivers; exclusive
/// owner of the gains, the run context, the SSR window state, and the
/// persisted counters.
pub struct Supervisor<T, S, D, W>
where
    T: Thermocouple,
    S: SsrPin,
    D: DoorSwitch,
    W: HardwareWatchdog,
{
    config: ControllerConfig,
    reader: TcReader<T>,
    ssr_pin: S,
    door: D,
    watchdog: W,

    commands: Receiver<CommandEnvelope>,
    status_tx: SyncSender<StatusSnapshot>,

    store: ParamStore,
    safety: SafetySupervisor,
    pid: PidController,
    ssr: SsrModulator,

    state: KilnState,
    loaded: Option<(Schedule, Option<u32>)>,
    run: Option<RunContext>,
    tune: Option<AutotuneRun>,

    pv_c: f64,
    sp_c: f64,
    demand_ms: f64,
    last_tick_ms: Option<u64>,
    last_publish_ms: Option<u64>,
    last_published_state: Option<KilnState>,
    /// Non-latching fault text (failed autotune), cleared by the next
    /// accepted command.
    transient_error: Option<String>,

    stats: TickStats,
}

impl<T, S, D, W> Supervisor<T, S, D, W>
where
    T: Thermocouple,
    S: SsrPin,
    D: DoorSwitch,
    W: HardwareWatchdog,
{
    pub fn new(
        config: ControllerConfig,
        store: ParamStore,
        thermocouple: T,
        ssr_pin: S,
        door: D,
        watchdog: W,
        commands: Receiver<CommandEnvelope>,
        status_tx: SyncSender<StatusSnapshot>,
    ) -> Self {
        let out_max = config.ssr_window_ms as f64;
        let pid = PidController::new(store.gains(), out_max);
        let ssr = SsrModulator::new(config.ssr_window_ms, store.relay_cycles());
        let reader = TcReader::new(thermocouple, store.tc_offset_c());
        info!(
            gains = ?store.gains(),
            tc_offset_c = store.tc_offset_c(),
            relay_cycles = store.relay_cycles(),
            "supervisor initialized from persisted parameters"
        );
        Self {
            config,
            reader,
            ssr_pin,
            door,
            watchdog,
            commands,
            status_tx,
            store,
            safety: SafetySupervisor::new(),
            pid,
            ssr,
            state: KilnState::Idle,
            loaded: None,
            run: None,
            tune: None,
            pv_c: IDLE_SETPOINT_C,
            sp_c: IDLE_SETPOINT_C,
            demand_ms: 0.0,
            last_tick_ms: None,
            last_publish_ms: None,
            last_published_state: None,
            transient_error: None,
            stats: TickStats::new(),
        }
    }

    // ── Inspection ──

    #[inline]
    pub const fn state(&self) -> KilnState {
        self.state
    }

    #[inline]
    pub const fn pv_c(&self) -> f64 {
        self.pv_c
    }

    #[inline]
    pub const fn sp_c(&self) -> f64 {
        self.sp_c
    }

    #[inline]
    pub const fn relay_cycles(&self) -> u32 {
        self.ssr.cycles()
    }

    #[inline]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    // ── The tick ──

    /// One supervisor cycle. `now_ms` must be monotonic.
    pub fn tick(&mut self, now_ms: u64) {
        self.watchdog.feed();

        let dt_s = match self.last_tick_ms {
            Some(last) if now_ms > last => (now_ms - last) as f64 / 1_000.0,
            _ => 0.0,
        };
        self.last_tick_ms = Some(now_ms);

        // 1. Commands, bounded per tick.
        self.drain_commands(now_ms);

        // 2. Safety, on the PV the previous tick established. Latched
        //    errors skip straight to telemetry with the relay off.
        let door_open = self.door.is_open();
        let verdict = self.safety.evaluate(self.pv_c, door_open, self.state);
        if let Some(text) = verdict.newly_latched {
            self.enter_error(&text);
        }
        if self.state == KilnState::Error {
            self.force_off_and_publish(now_ms);
            return;
        }

        // 3. Sense.
        match self.reader.read() {
            Ok(pv_c) => self.pv_c = pv_c,
            Err(fault) => {
                if let Some(text) = self.safety.note_tc_fault(fault) {
                    self.enter_error(&text);
                }
            }
        }
        if self.state == KilnState::Error {
            self.force_off_and_publish(now_ms);
            return;
        }

        // 4./5. Plan: start-delay expiry, then the schedule.
        match self.state {
            KilnState::Delayed => {
                let due = self
                    .run
                    .as_ref()
                    .and_then(|ctx| ctx.delay_deadline_ms)
                    .map_or(true, |deadline| now_ms >= deadline);
                if due {
                    if let Some(ctx) = self.run.as_mut() {
                        ctx.delay_deadline_ms = None;
                        ctx.runner.rebase(now_ms, self.pv_c);
                    }
                    info!("start delay elapsed, entering first step");
                    self.pid
                        .enable_bumpless(self.demand_ms, self.pv_c, self.sp_c);
                    self.step_schedule(now_ms);
                }
            }
            KilnState::Heating | KilnState::Holding | KilnState::Cooling => {
                self.step_schedule(now_ms)
            }
            _ => {}
        }

        // 6. Act: demand from the PID or the autotuner.
        self.pid.hold_integrator(verdict.freeze_integrator);
        self.demand_ms = match self.state {
            KilnState::Heating | KilnState::Holding | KilnState::Cooling => {
                self.pid.update(self.pv_c, self.sp_c, dt_s)
            }
            KilnState::Autotune => self.step_autotune(now_ms),
            _ => 0.0,
        };

        // 7. SSR window; the pin is written here and nowhere else.
        let force_off = verdict.force_ssr_off || !self.state.allows_actuation();
        let decision = self.ssr.tick(now_ms, self.demand_ms, force_off);
        self.ssr_pin.set(decision.on);
        if decision.persist_due {
            self.persist_cycles("write-through");
        }

        // 8. Telemetry.
        self.publish_if_due(now_ms);
    }

    /// Production pacing loop. Ticks at the configured period until
    /// `duration` elapses (forever when `None`).
    pub fn run(&mut self, duration: Option<Duration>) {
        let period = Duration::from_millis(self.config.tick_period_ms);
        let budget_us = self.config.tick_period_ms * 1_000;
        let epoch = Instant::now();
        let mut next_wake = epoch;
        info!(period_ms = self.config.tick_period_ms, "supervisor loop started");

        loop {
            let tick_start = Instant::now();
            let now_ms = epoch.elapsed().as_millis() as u64;
            self.tick(now_ms);

            let duration_us = tick_start.elapsed().as_micros() as u64;
            self.stats.record(duration_us, budget_us);
            if duration_us > budget_us {
                warn!(duration_us, budget_us, "tick overran its budget");
            }

            if let Some(limit) = duration {
                if epoch.elapsed() >= limit {
                    info!(
                        ticks = self.stats.tick_count,
                        avg_us = self.stats.avg_tick_us(),
                        overruns = self.stats.overruns,
                        "supervisor loop finished"
                    );
                    return;
                }
            }

            next_wake += period;
            let now = Instant::now();
            if next_wake > now {
                std::thread::sleep(next_wake - now);
            } else {
                // Late: re-anchor instead of bursting to catch up.
                next_wake = now;
            }
        }
    }

    // ── Phases ──

    fn drain_commands(&mut self, now_ms: u64) {
        for _ in 0..COMMAND_DRAIN_LIMIT {
            let envelope = match self.commands.try_recv() {
                Ok(envelope) => envelope,
                Err(_) => break,
            };
            let outcome = self.apply_command(envelope.command, now_ms);
            if let Err(rejection) = &outcome {
                debug!(%rejection, "command rejected");
            }
            if let Some(reply) = envelope.reply {
                let _ = reply.try_send(outcome);
            }
        }
    }

    fn step_schedule(&mut self, now_ms: u64) {
        let progress = match self.run.as_mut() {
            Some(ctx) => ctx.runner.tick(now_ms, self.pv_c),
            None => return,
        };
        self.sp_c = progress.sp_c;
        if progress.finished {
            info!(pv_c = self.pv_c, "firing complete");
            self.enter_idle();
        } else {
            if progress.state != self.state {
                info!(
                    step = progress.step_index,
                    state = %progress.state,
                    pv_c = self.pv_c,
                    "schedule step advanced"
                );
            }
            self.state = progress.state;
        }
    }

    fn step_autotune(&mut self, now_ms: u64) -> f64 {
        let pv = self.pv_c;
        let progress = match self.tune.as_mut() {
            Some(t) => t.tuner.update(now_ms, pv),
            None => return 0.0,
        };
        match progress {
            AutotuneProgress::Running => self
                .tune
                .as_ref()
                .map_or(0.0, |t| t.tuner.output_ms()),
            AutotuneProgress::Complete(result) => {
                self.finish_autotune(result);
                0.0
            }
            AutotuneProgress::Failed(err) => {
                warn!(%err, "autotune failed, keeping prior gains");
                if let Some(t) = self.tune.take() {
                    if t.prior_auto {
                        self.pid.enable_bumpless(0.0, self.pv_c, self.sp_c);
                    }
                }
                self.transient_error = Some(format!("Autotune failed: {err}"));
                self.enter_idle();
                0.0
            }
        }
    }

    fn finish_autotune(&mut self, result: AutotuneResult) {
        info!(
            kp = result.gains.kp,
            ki = result.gains.ki,
            kd = result.gains.kd,
            ku = result.ku,
            pu_s = result.pu_s,
            amplitude_c = result.amplitude_c,
            "autotune complete"
        );
        self.pid.set_gains(result.gains);
        if let Err(e) = self.store.set_gains(result.gains) {
            error!(error = %e, "failed to persist autotuned gains");
        }
        if let Some(t) = self.tune.take() {
            if t.prior_auto {
                self.pid.enable_bumpless(0.0, self.pv_c, self.sp_c);
            }
        }
        self.transient_error = None;
        self.enter_idle();
    }

    // ── Commands ──

    fn apply_command(&mut self, command: Command, now_ms: u64) -> Result<(), CommandRejection> {
        match command {
            Command::LoadSchedule {
                schedule,
                start_delay_s,
            } => {
                if self.state != KilnState::Idle {
                    return Err(CommandRejection::Busy(format!(
                        "cannot load a schedule while {}",
                        self.state
                    )));
                }
                schedule
                    .validate()
                    .map_err(|e| CommandRejection::BadSchedule(e.to_string()))?;
                info!(
                    name = %schedule.name,
                    steps = schedule.len(),
                    start_delay_s = start_delay_s.unwrap_or(0),
                    "schedule loaded"
                );
                self.loaded = Some((schedule, start_delay_s));
                self.transient_error = None;
                Ok(())
            }

            Command::Start => {
                if self.state != KilnState::Idle {
                    return Err(CommandRejection::Busy(format!(
                        "cannot start while {}",
                        self.state
                    )));
                }
                let (schedule, delay_s) = self
                    .loaded
                    .clone()
                    .ok_or_else(|| CommandRejection::BadSchedule("no schedule loaded".into()))?;

                let first_state = schedule.steps[0].active_state();
                let runner = ScheduleRunner::new(schedule, now_ms, self.pv_c);
                let delay_ms = u64::from(delay_s.unwrap_or(0)) * 1_000;
                if delay_ms > 0 {
                    self.run = Some(RunContext {
                        runner,
                        delay_deadline_ms: Some(now_ms + delay_ms),
                    });
                    self.state = KilnState::Delayed;
                    info!(delay_s = delay_ms / 1_000, "start accepted, delaying");
                } else {
                    self.run = Some(RunContext {
                        runner,
                        delay_deadline_ms: None,
                    });
                    self.pid
                        .enable_bumpless(self.demand_ms, self.pv_c, self.sp_c);
                    self.state = first_state;
                    info!(pv_c = self.pv_c, "firing started");
                }
                self.transient_error = None;
                Ok(())
            }

            Command::Stop => {
                if self.state.is_running() {
                    info!(state = %self.state, "stopped by command");
                    self.tune = None;
                    self.enter_idle();
                }
                Ok(())
            }

            Command::StartAutotune { params } => {
                if self.state == KilnState::Error {
                    return Err(CommandRejection::Busy("error latched".into()));
                }
                let params = params.unwrap_or(self.config.autotune);
                params
                    .validate(self.config.ssr_window_ms)
                    .map_err(CommandRejection::BadParam)?;

                if self.state.is_running() {
                    // Autotune pre-empts: the run is cancelled and the
                    // controller passes through idle.
                    info!(state = %self.state, "run cancelled for autotune");
                    self.tune = None;
                    self.enter_idle();
                }

                let prior_auto = self.pid.is_auto();
                self.pid.set_manual();
                self.tune = Some(AutotuneRun {
                    tuner: RelayAutotuner::new(
                        params,
                        self.config.ssr_window_ms as f64,
                        now_ms,
                        self.pv_c,
                    ),
                    prior_auto,
                });
                self.state = KilnState::Autotune;
                self.transient_error = None;
                info!(center_c = self.pv_c, "autotune started");
                Ok(())
            }

            Command::SetGains { gains } => {
                gains.validate().map_err(CommandRejection::BadParam)?;
                self.pid.set_gains(gains);
                if let Err(e) = self.store.set_gains(gains) {
                    error!(error = %e, "failed to persist gains");
                }
                self.transient_error = None;
                Ok(())
            }

            Command::SetCalibration { offset_c } => {
                if !offset_c.is_finite() || offset_c.abs() > TC_OFFSET_MAX_C {
                    return Err(CommandRejection::BadParam(format!(
                        "offset {offset_c} °C outside ±{TC_OFFSET_MAX_C}"
                    )));
                }
                self.reader.set_offset_c(offset_c);
                if let Err(e) = self.store.set_tc_offset_c(offset_c) {
                    error!(error = %e, "failed to persist calibration");
                }
                self.transient_error = None;
                Ok(())
            }

            Command::ResetError => {
                if self.state == KilnState::Error {
                    info!("error latch cleared by operator");
                    self.safety.reset();
                    self.transient_error = None;
                    self.state = KilnState::Idle;
                    self.sp_c = IDLE_SETPOINT_C;
                    // Sensing is skipped while latched, so the stored PV
                    // is as old as the latch. Refresh it here; if the
                    // fault persists the next tick latches again.
                    if let Ok(pv_c) = self.reader.read() {
                        self.pv_c = pv_c;
                    }
                }
                Ok(())
            }
        }
    }

    // ── State transitions ──

    fn enter_idle(&mut self) {
        self.state = KilnState::Idle;
        self.sp_c = IDLE_SETPOINT_C;
        self.run = None;
        self.demand_ms = 0.0;
        self.pid.set_manual();
        self.persist_cycles("idle entry");
    }

    fn enter_error(&mut self, text: &str) {
        if self.state == KilnState::Error {
            return;
        }
        error!(%text, "error latched, SSR forced off");
        self.state = KilnState::Error;
        self.run = None;
        self.tune = None;
        self.pid.reset();
        self.demand_ms = 0.0;
        self.sp_c = IDLE_SETPOINT_C;
        self.persist_cycles("error latch");
    }

    fn force_off_and_publish(&mut self, now_ms: u64) {
        self.demand_ms = 0.0;
        let _ = self.ssr.tick(now_ms, 0.0, true);
        self.ssr_pin.set(false);
        self.publish_if_due(now_ms);
    }

    fn persist_cycles(&mut self, reason: &str) {
        self.store.set_relay_cycles(self.ssr.cycles());
        match self.store.save() {
            Ok(()) => {
                self.ssr.mark_persisted();
                debug!(cycles = self.ssr.cycles(), reason, "relay cycles persisted");
            }
            Err(e) => error!(error = %e, reason, "relay cycle persist failed"),
        }
    }

    // ── Telemetry ──

    fn publish_if_due(&mut self, now_ms: u64) {
        let interval_due = match self.last_publish_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.config.status_interval_ms,
        };
        let state_changed = self.last_published_state != Some(self.state);
        if !interval_due && !state_changed {
            return;
        }

        let snapshot = self.snapshot(now_ms);
        match self.status_tx.try_send(snapshot) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("status queue full, snapshot dropped"),
            Err(TrySendError::Disconnected(_)) => debug!("status sink disconnected"),
        }
        self.last_publish_ms = Some(now_ms);
        self.last_published_state = Some(self.state);
    }

    fn snapshot(&self, now_ms: u64) -> StatusSnapshot {
        let time_remaining_min = match self.state {
            KilnState::Heating | KilnState::Holding | KilnState::Cooling => self
                .run
                .as_ref()
                .map(|ctx| ctx.runner.remaining_minutes(now_ms, self.sp_c)),
            _ => None,
        };
        StatusSnapshot {
            timestamp_ms: now_ms,
            pv_c: self.pv_c,
            sp_c: self.sp_c,
            state: self.state,
            step_index: self.run.as_ref().map(|ctx| ctx.runner.step_index()),
            error_text: self
                .safety
                .error_text()
                .map(str::to_string)
                .or_else(|| self.transient_error.clone()),
            relay_cycles: self.ssr.cycles(),
            tc_offset_c: self.store.tc_offset_c(),
            gains: self.pid.gains(),
            time_remaining_min,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
