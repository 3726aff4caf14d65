use std::sync::atomic::AtomicBool;
use std::time::{Duration, UNIX_EPOCH};

use hydro_core::error::ControlError;
use hydro_core::mocks::{RecordingActuator, ScriptedSensor, SensorScript, ScriptedTransport};
use hydro_core::{
    ControlCfg, HydroController, Outputs, PhaseKind, RunOptions, TelemetryCfg, Thresholds,
};
use hydro_traits::FixedWallClock;
use hydro_traits::clock::test_clock::TestClock;
use rstest::rstest;

struct Rig {
    c: HydroController,
    act: RecordingActuator,
    transport: ScriptedTransport,
    clock: TestClock,
}

fn rig(script: SensorScript) -> Rig {
    let clock = TestClock::new();
    let act = RecordingActuator::new();
    let c = HydroController::builder()
        .with_sensor(ScriptedSensor::new(script))
        .with_actuator(act.clone())
        .with_thresholds(Thresholds::default())
        .with_control(ControlCfg { cycle_ms: 1_000 })
        .with_telemetry(TelemetryCfg {
            period_ms: 3_000,
            reconnect_attempts: 2,
            reconnect_backoff_ms: 100,
        })
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("build controller");
    Rig {
        c,
        act,
        transport: ScriptedTransport::new(),
        clock,
    }
}

fn wall() -> FixedWallClock {
    FixedWallClock(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
}

#[rstest]
fn runs_both_schedules_until_cycle_limit() {
    let mut r = rig(SensorScript::default());
    let stop = AtomicBool::new(false);
    let summary = hydro_core::run(
        &mut r.c,
        &mut r.transport,
        &wall(),
        RunOptions {
            max_cycles: Some(7),
        },
        &stop,
    )
    .expect("run");

    assert_eq!(summary.cycles, 7);
    // telemetry at t=3000 and t=6000
    assert_eq!(summary.published, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(r.clock.elapsed_ms(), 6_000);
    let sent = r.transport.published();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].timestamp, "2023-11-14T22:13:20Z");
}

#[rstest]
fn outputs_are_off_after_run() {
    // low TDS and low level switch pumps on during the run
    let mut r = rig(SensorScript {
        tds_raw: Some(300.0),
        level_raw: Some(400.0),
        ..SensorScript::default()
    });
    let stop = AtomicBool::new(false);
    let summary = hydro_core::run(
        &mut r.c,
        &mut r.transport,
        &wall(),
        RunOptions {
            max_cycles: Some(14),
        },
        &stop,
    )
    .expect("run");
    // Dispensing 0..2000, Mixing 2000..12000, next dose starts at 13000
    assert_eq!(summary.doses_completed, 1);
    assert!(r.transport.published().iter().any(|p| p.water_relay_status));
    assert_eq!(r.act.outputs(), Outputs::default());
}

#[rstest]
fn shutdown_flag_stops_before_first_cycle() {
    let mut r = rig(SensorScript::default());
    let stop = AtomicBool::new(true);
    let summary = hydro_core::run(
        &mut r.c,
        &mut r.transport,
        &wall(),
        RunOptions::default(),
        &stop,
    )
    .expect("run");
    assert_eq!(summary.cycles, 0);
    assert_eq!(r.clock.elapsed_ms(), 0);
    // outputs are still driven off
    assert_eq!(r.act.writes(), 4);
}

#[rstest]
fn skipped_telemetry_is_reported() {
    let mut r = rig(SensorScript::default());
    r.transport.disconnect(u32::MAX);
    let stop = AtomicBool::new(false);
    let summary = hydro_core::run(
        &mut r.c,
        &mut r.transport,
        &wall(),
        RunOptions {
            max_cycles: Some(4),
        },
        &stop,
    )
    .expect("run");
    assert_eq!(summary.published, 0);
    assert_eq!(summary.skipped, 1);
}

#[rstest]
fn failed_shutdown_writes_are_an_error() {
    let mut r = rig(SensorScript::default());
    r.act.set_failing(true);
    let stop = AtomicBool::new(false);
    let err = hydro_core::run(
        &mut r.c,
        &mut r.transport,
        &wall(),
        RunOptions {
            max_cycles: Some(1),
        },
        &stop,
    )
    .expect_err("outputs could not be switched off");
    assert!(matches!(
        err.downcast_ref::<ControlError>(),
        Some(ControlError::HardwareFault(_))
    ));
}

#[rstest]
fn observer_sees_live_state_without_extra_writes() {
    let mut r = rig(SensorScript {
        tds_raw: Some(300.0),
        ..SensorScript::default()
    });
    let stop = AtomicBool::new(false);
    let mut seen = Vec::new();
    let summary = hydro_core::run_observed(
        &mut r.c,
        &mut r.transport,
        &wall(),
        RunOptions {
            max_cycles: Some(3),
        },
        &stop,
        |report, record| seen.push((report.at_ms, record.dosing_phase, record.tds_relay_status)),
    )
    .expect("run");

    assert_eq!(summary.cycles, 3);
    assert_eq!(
        seen,
        vec![
            (0, PhaseKind::Dispensing, true),
            (1_000, PhaseKind::Dispensing, true),
            (2_000, PhaseKind::Mixing, false),
        ]
    );
    // four outputs per cycle plus the final all-off; observing adds none
    assert_eq!(r.act.writes(), 3 * 4 + 4);
}
