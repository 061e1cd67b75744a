//! Shared test harness: a supervisor wired to the simulation HAL with a
//! scripted millisecond clock.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver};

use kiln_common::command::Command;
use kiln_common::config::ControllerConfig;
use kiln_common::schedule::{Schedule, Step};
use kiln_common::status::StatusSnapshot;
use kiln_hal::sim::{
    PlantParams, SimDoorSwitch, SimKiln, SimSsrPin, SimThermocouple, SimWatchdog,
};

use kiln_control_unit::command::{command_channel, CommandClient};
use kiln_control_unit::store::ParamStore;
use kiln_control_unit::supervisor::Supervisor;

pub const TICK_MS: u64 = 100;

pub type SimSupervisor = Supervisor<SimThermocouple, SimSsrPin, SimDoorSwitch, SimWatchdog>;

pub struct Rig {
    pub kiln: SimKiln,
    pub supervisor: SimSupervisor,
    pub client: CommandClient,
    pub status_rx: Receiver<StatusSnapshot>,
    pub now_ms: u64,
    pub store_path: PathBuf,
    _dir: Option<tempfile::TempDir>,
}

impl Rig {
    /// Fresh rig with its own temporary store.
    pub fn new(plant: PlantParams) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("params.toml");
        let mut rig = Self::with_store(plant, &store_path);
        rig._dir = Some(dir);
        rig
    }

    /// Rig on an existing store path; rebuild with the same path to
    /// model a power cycle.
    pub fn with_store(plant: PlantParams, store_path: &Path) -> Self {
        let config = ControllerConfig {
            store_path: store_path.display().to_string(),
            ..Default::default()
        };
        let store = ParamStore::load_or_default(store_path).unwrap();
        let kiln = SimKiln::new(plant);
        let (client, command_rx) = command_channel(config.command_queue_depth);
        let (status_tx, status_rx) = sync_channel(config.status_queue_depth);
        let supervisor = Supervisor::new(
            config,
            store,
            kiln.thermocouple(),
            kiln.ssr_pin(),
            kiln.door(),
            kiln.watchdog(),
            command_rx,
            status_tx,
        );
        Self {
            kiln,
            supervisor,
            client,
            status_rx,
            now_ms: 0,
            store_path: store_path.to_path_buf(),
            _dir: None,
        }
    }

    /// Advance one tick: physics first, then the supervisor.
    pub fn tick(&mut self) {
        self.now_ms += TICK_MS;
        self.kiln.advance(TICK_MS);
        self.supervisor.tick(self.now_ms);
    }

    pub fn step_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    pub fn step_ms(&mut self, ms: u64) {
        self.step_ticks(ms / TICK_MS);
    }

    pub fn drain_snapshots(&mut self) -> Vec<StatusSnapshot> {
        let mut out = Vec::new();
        while let Ok(snap) = self.status_rx.try_recv() {
            out.push(snap);
        }
        out
    }

    /// Load a schedule and start it, applying both on the next tick.
    pub fn load_and_start(&mut self, schedule: Schedule, start_delay_s: Option<u32>) {
        self.client
            .post(Command::LoadSchedule {
                schedule,
                start_delay_s,
            })
            .unwrap();
        self.client.post(Command::Start).unwrap();
        self.tick();
    }
}

pub fn ramp(target_c: f64, rate_c_per_hr: f64) -> Schedule {
    Schedule::from_steps(
        "ramp",
        &[Step::Ramp {
            target_c,
            rate_c_per_hr,
        }],
    )
    .unwrap()
}

pub fn hold(target_c: f64, duration_min: u32) -> Schedule {
    Schedule::from_steps(
        "hold",
        &[Step::Hold {
            target_c,
            duration_min,
        }],
    )
    .unwrap()
}

/// Gains that saturate the window on any real error, so the relay is
/// solidly ON while heating in interlock tests.
pub fn saturating_gains() -> kiln_common::control::Gains {
    kiln_common::control::Gains::new(1_000.0, 0.0, 0.0)
}
