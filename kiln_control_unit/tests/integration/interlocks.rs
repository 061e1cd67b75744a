//! Safety interlocks end to end: over-temperature latch, door pause,
//! sensor faults, and the watchdog feed.

use kiln_common::command::Command;
use kiln_common::fault::TcFault;
use kiln_common::state::KilnState;
use kiln_hal::sim::PlantParams;

use super::harness::{hold, ramp, saturating_gains, Rig};

#[test]
fn over_temperature_latches_until_reset() {
    let mut rig = Rig::new(PlantParams::default());
    rig.client
        .post(Command::SetGains {
            gains: saturating_gains(),
        })
        .unwrap();
    rig.load_and_start(hold(500.0, 60), None);
    rig.step_ticks(5);
    assert!(rig.kiln.ssr_is_on());

    // PV spikes over the limit: Error on the next tick, relay off.
    rig.kiln.override_pv(Some(1_301.0));
    rig.step_ticks(2);
    assert_eq!(rig.supervisor.state(), KilnState::Error);
    assert!(!rig.kiln.ssr_is_on());

    let snaps = rig.drain_snapshots();
    let last = snaps.last().unwrap();
    assert!(last
        .error_text
        .as_deref()
        .unwrap()
        .contains("Over-temperature"));

    // No subsequent tick re-enables the relay, condition present or not.
    rig.step_ms(30_000);
    assert!(!rig.kiln.ssr_is_on());
    assert_eq!(rig.supervisor.state(), KilnState::Error);

    // Commands that would heat are refused while latched.
    rig.client
        .post(Command::StartAutotune { params: None })
        .unwrap();
    rig.step_ticks(2);
    assert_eq!(rig.supervisor.state(), KilnState::Error);

    // Operator clears the condition, then acknowledges.
    rig.kiln.override_pv(None);
    rig.client.post(Command::ResetError).unwrap();
    rig.step_ticks(2);
    assert_eq!(rig.supervisor.state(), KilnState::Idle);
}

#[test]
fn door_open_pauses_without_leaving_heating() {
    let mut rig = Rig::new(PlantParams::default());
    rig.client
        .post(Command::SetGains {
            gains: saturating_gains(),
        })
        .unwrap();
    // Steep ramp: the setpoint runs away from the PV within a tick, so
    // the saturated demand keeps the relay solidly on.
    rig.load_and_start(ramp(1_000.0, 36_000.0), None);
    rig.step_ticks(5);
    assert_eq!(rig.supervisor.state(), KilnState::Heating);
    assert!(rig.kiln.ssr_is_on());

    // Door opens: relay off within one tick, state unchanged.
    rig.kiln.set_door_open(true);
    rig.tick();
    assert!(!rig.kiln.ssr_is_on());
    assert_eq!(rig.supervisor.state(), KilnState::Heating);

    // Stays off for the whole door-open interval.
    rig.step_ms(10_000);
    assert!(!rig.kiln.ssr_is_on());
    assert_eq!(rig.supervisor.state(), KilnState::Heating);

    // Door closes: time-proportional output resumes by itself.
    rig.kiln.set_door_open(false);
    rig.step_ticks(2);
    assert!(rig.kiln.ssr_is_on());
    assert_eq!(rig.supervisor.state(), KilnState::Heating);
}

#[test]
fn door_open_while_idle_changes_nothing() {
    let mut rig = Rig::new(PlantParams::default());
    rig.step_ticks(5);
    rig.kiln.set_door_open(true);
    rig.step_ticks(5);
    assert_eq!(rig.supervisor.state(), KilnState::Idle);
    assert!(!rig.kiln.ssr_is_on());
}

#[test]
fn single_sensor_fault_latches_immediately() {
    let mut rig = Rig::new(PlantParams::default());
    rig.client
        .post(Command::SetGains {
            gains: saturating_gains(),
        })
        .unwrap();
    rig.load_and_start(hold(500.0, 60), None);
    rig.step_ticks(5);

    rig.kiln.inject_fault(Some(TcFault::ShortToVcc));
    rig.tick();
    assert_eq!(rig.supervisor.state(), KilnState::Error);
    assert!(!rig.kiln.ssr_is_on());

    let snaps = rig.drain_snapshots();
    assert!(snaps
        .last()
        .unwrap()
        .error_text
        .as_deref()
        .unwrap()
        .contains("Sensor fault"));
}

#[test]
fn watchdog_is_fed_in_every_state() {
    let mut rig = Rig::new(PlantParams::default());
    rig.step_ticks(10);
    let idle_feeds = rig.kiln.watchdog_feeds();
    assert_eq!(idle_feeds, 10);

    // Even while latched, the loop keeps running and feeding: the
    // watchdog guards a hung loop, not an error state.
    rig.kiln.inject_fault(Some(TcFault::BusError));
    rig.step_ticks(10);
    assert_eq!(rig.supervisor.state(), KilnState::Error);
    assert_eq!(rig.kiln.watchdog_feeds(), 20);
}

#[test]
fn stop_during_delay_cancels_the_run() {
    let mut rig = Rig::new(PlantParams::default());
    rig.load_and_start(hold(100.0, 1), Some(3_600));
    assert_eq!(rig.supervisor.state(), KilnState::Delayed);

    rig.client.post(Command::Stop).unwrap();
    rig.step_ticks(2);
    assert_eq!(rig.supervisor.state(), KilnState::Idle);

    // The delayed run is gone; time passing does not resurrect it.
    rig.step_ms(60_000);
    assert_eq!(rig.supervisor.state(), KilnState::Idle);
}
