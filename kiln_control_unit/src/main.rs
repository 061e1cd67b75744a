//! # Kiln Control Unit binary
//!
//! Runs the supervisor against the simulation HAL: loads and validates
//! the configuration, restores persisted parameters, optionally loads and
//! starts a schedule from JSON, and logs every status snapshot. The
//! on-device UI and network bridges attach through the same two queues
//! this harness uses.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::mpsc::sync_channel;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use kiln_common::command::Command;
use kiln_common::config::ControllerConfig;
use kiln_common::schedule::Schedule;
use kiln_hal::sim::{PlantParams, SimKiln};

use kiln_control_unit::command::command_channel;
use kiln_control_unit::config::load_config;
use kiln_control_unit::store::ParamStore;
use kiln_control_unit::supervisor::Supervisor;

#[derive(Debug, Parser)]
#[command(name = "kiln_control_unit", about = "Kiln control core (simulation harness)")]
struct Args {
    /// Controller configuration TOML.
    #[arg(long, default_value = "config/kiln.toml")]
    config: PathBuf,

    /// Firing schedule JSON to load at startup.
    #[arg(long)]
    schedule: Option<PathBuf>,

    /// Start the loaded schedule immediately.
    #[arg(long)]
    start: bool,

    /// Exit after this many seconds (runs forever by default).
    #[arg(long)]
    duration_s: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let config = if args.config.exists() {
        match load_config(&args.config) {
            Ok(config) => config,
            Err(e) => {
                error!("FATAL: {e}");
                process::exit(1);
            }
        }
    } else {
        warn!(path = %args.config.display(), "config file not found, using defaults");
        ControllerConfig::default()
    };

    let store = match ParamStore::load_or_default(Path::new(&config.store_path)) {
        Ok(store) => store,
        Err(e) => {
            error!("FATAL: {e}");
            process::exit(1);
        }
    };

    let kiln = SimKiln::new(PlantParams::default());
    kiln.enable_realtime();
    let (client, command_rx) = command_channel(config.command_queue_depth);
    let (status_tx, status_rx) = sync_channel::<kiln_common::status::StatusSnapshot>(config.status_queue_depth);

    // Telemetry sink: log every snapshot until the supervisor goes away.
    let printer = std::thread::spawn(move || {
        while let Ok(snap) = status_rx.recv() {
            info!(
                t_ms = snap.timestamp_ms,
                pv_c = snap.pv_c,
                sp_c = snap.sp_c,
                state = %snap.state,
                step = ?snap.step_index,
                remaining_min = ?snap.time_remaining_min,
                cycles = snap.relay_cycles,
                error = ?snap.error_text,
                "status"
            );
        }
    });

    if let Some(path) = &args.schedule {
        match std::fs::read_to_string(path).map_err(|e| e.to_string()) {
            Ok(json) => match Schedule::from_json(&json) {
                Ok(schedule) => {
                    info!(name = %schedule.name, steps = schedule.len(), "schedule file loaded");
                    if let Err(e) = client.post(Command::LoadSchedule {
                        schedule,
                        start_delay_s: None,
                    }) {
                        error!("FATAL: could not queue schedule: {e}");
                        process::exit(1);
                    }
                    if args.start {
                        if let Err(e) = client.post(Command::Start) {
                            error!("FATAL: could not queue start: {e}");
                            process::exit(1);
                        }
                    }
                }
                Err(e) => {
                    error!("FATAL: {e}");
                    process::exit(1);
                }
            },
            Err(e) => {
                error!("FATAL: failed to read {}: {e}", path.display());
                process::exit(1);
            }
        }
    } else if args.start {
        warn!("--start given without --schedule, ignoring");
    }

    let mut supervisor = Supervisor::new(
        config,
        store,
        kiln.thermocouple(),
        kiln.ssr_pin(),
        kiln.door(),
        kiln.watchdog(),
        command_rx,
        status_tx,
    );

    supervisor.run(args.duration_s.map(Duration::from_secs));
    drop(supervisor);
    let _ = printer.join();
}
