//! Simulation driver: a physics-based kiln plant plus simulated devices.
//!
//! The plant is a first-order thermal model (heater power in, Newtonian
//! loss to ambient) with a first-order sensor lag in front of the
//! thermocouple. All simulated devices share one plant through
//! [`SimKiln`]; tests and the bench binary advance the physics explicitly
//! between supervisor ticks.
//!
//! The model:
//!
//! ```text
//! dT/dt = heat_rate·u − loss_per_s·(T − ambient)      u ∈ {0, 1}
//! dS/dt = (T − S) / sensor_tau                        S = sensed value
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use tracing::trace;

use kiln_common::fault::TcFault;

use crate::driver::{DoorSwitch, HardwareWatchdog, SsrPin, Thermocouple};

/// Thermal plant coefficients.
#[derive(Debug, Clone, Copy)]
pub struct PlantParams {
    /// Ambient temperature [°C].
    pub ambient_c: f64,
    /// Chamber heating rate at full power [°C/s].
    pub heat_rate_c_per_s: f64,
    /// Loss coefficient toward ambient [1/s].
    pub loss_per_s: f64,
    /// Sensor first-order lag time constant [s].
    pub sensor_tau_s: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        // A small electric kiln: full power tops out near 2000 °C,
        // sensor settles in a few seconds.
        Self {
            ambient_c: 20.0,
            heat_rate_c_per_s: 1.0,
            loss_per_s: 0.0005,
            sensor_tau_s: 2.0,
        }
    }
}

#[derive(Debug)]
struct SimInner {
    params: PlantParams,
    chamber_c: f64,
    sensed_c: f64,
    ssr_on: bool,
    door_open: bool,
    watchdog_feeds: u64,
    injected_fault: Option<TcFault>,
    override_pv_c: Option<f64>,
    /// When set, physics advance from wall time on every sensor read.
    realtime_last: Option<Instant>,
}

impl SimInner {
    fn step(&mut self, dt_s: f64) {
        let p = &self.params;
        let heat = if self.ssr_on { p.heat_rate_c_per_s } else { 0.0 };
        self.chamber_c += (heat - p.loss_per_s * (self.chamber_c - p.ambient_c)) * dt_s;
        let alpha = (dt_s / p.sensor_tau_s).min(1.0);
        self.sensed_c += (self.chamber_c - self.sensed_c) * alpha;
    }
}

/// Handle to a simulated kiln. Clone-free: hand out device views with the
/// accessor methods and keep this for physics stepping and inspection.
pub struct SimKiln {
    inner: Rc<RefCell<SimInner>>,
}

impl SimKiln {
    pub fn new(params: PlantParams) -> Self {
        let inner = SimInner {
            params,
            chamber_c: params.ambient_c,
            sensed_c: params.ambient_c,
            ssr_on: false,
            door_open: false,
            watchdog_feeds: 0,
            injected_fault: None,
            override_pv_c: None,
            realtime_last: None,
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// Advance the physics by `dt_ms` using the current SSR level.
    pub fn advance(&self, dt_ms: u64) {
        let mut inner = self.inner.borrow_mut();
        inner.step(dt_ms as f64 / 1_000.0);
        trace!(
            chamber_c = inner.chamber_c,
            sensed_c = inner.sensed_c,
            ssr_on = inner.ssr_on,
            "plant step"
        );
    }

    /// Step the physics from wall time on every sensor read, for running
    /// against the real pacing loop. Tests leave this off and call
    /// [`Self::advance`] with a scripted clock instead.
    pub fn enable_realtime(&self) {
        self.inner.borrow_mut().realtime_last = Some(Instant::now());
    }

    // ── Device views ──

    pub fn thermocouple(&self) -> SimThermocouple {
        SimThermocouple {
            inner: Rc::clone(&self.inner),
        }
    }

    pub fn ssr_pin(&self) -> SimSsrPin {
        SimSsrPin {
            inner: Rc::clone(&self.inner),
        }
    }

    pub fn door(&self) -> SimDoorSwitch {
        SimDoorSwitch {
            inner: Rc::clone(&self.inner),
        }
    }

    pub fn watchdog(&self) -> SimWatchdog {
        SimWatchdog {
            inner: Rc::clone(&self.inner),
        }
    }

    // ── Test controls & inspection ──

    pub fn chamber_c(&self) -> f64 {
        self.inner.borrow().chamber_c
    }

    /// Force the plant (and sensor) to a temperature, e.g. pre-warmed.
    pub fn set_chamber_c(&self, temp_c: f64) {
        let mut inner = self.inner.borrow_mut();
        inner.chamber_c = temp_c;
        inner.sensed_c = temp_c;
    }

    pub fn ssr_is_on(&self) -> bool {
        self.inner.borrow().ssr_on
    }

    pub fn set_door_open(&self, open: bool) {
        self.inner.borrow_mut().door_open = open;
    }

    /// Make every subsequent read fail with `fault` until cleared.
    pub fn inject_fault(&self, fault: Option<TcFault>) {
        self.inner.borrow_mut().injected_fault = fault;
    }

    /// Pin the sensed value regardless of the plant, e.g. to exercise the
    /// over-temperature trip.
    pub fn override_pv(&self, pv_c: Option<f64>) {
        self.inner.borrow_mut().override_pv_c = pv_c;
    }

    pub fn watchdog_feeds(&self) -> u64 {
        self.inner.borrow().watchdog_feeds
    }
}

/// Simulated thermocouple reading the lagged plant temperature.
pub struct SimThermocouple {
    inner: Rc<RefCell<SimInner>>,
}

impl Thermocouple for SimThermocouple {
    fn read(&mut self) -> Result<f64, TcFault> {
        let mut inner = self.inner.borrow_mut();
        if let Some(last) = inner.realtime_last {
            // Cap the step so a debugger pause cannot explode the model.
            let dt_s = last.elapsed().as_secs_f64().min(1.0);
            inner.realtime_last = Some(Instant::now());
            inner.step(dt_s);
        }
        if let Some(fault) = inner.injected_fault {
            return Err(fault);
        }
        if let Some(pv) = inner.override_pv_c {
            return Ok(pv);
        }
        Ok(inner.sensed_c)
    }
}

/// Simulated SSR output.
pub struct SimSsrPin {
    inner: Rc<RefCell<SimInner>>,
}

impl SsrPin for SimSsrPin {
    fn set(&mut self, on: bool) {
        self.inner.borrow_mut().ssr_on = on;
    }

    fn is_on(&self) -> bool {
        self.inner.borrow().ssr_on
    }
}

/// Simulated door switch.
pub struct SimDoorSwitch {
    inner: Rc<RefCell<SimInner>>,
}

impl DoorSwitch for SimDoorSwitch {
    fn is_open(&mut self) -> bool {
        self.inner.borrow().door_open
    }
}

/// Simulated watchdog counting feeds.
pub struct SimWatchdog {
    inner: Rc<RefCell<SimInner>>,
}

impl HardwareWatchdog for SimWatchdog {
    fn feed(&mut self) {
        self.inner.borrow_mut().watchdog_feeds += 1;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
