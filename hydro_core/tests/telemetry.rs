use std::time::UNIX_EPOCH;

use hydro_core::mocks::ScriptedTransport;
use hydro_core::{
    AlertFlags, ControlError, DosingPhase, Metrics, OperatingMode, Outputs, PublishOutcome,
    TelemetryCfg, TelemetryPublisher, TelemetryRecord,
};
use hydro_traits::clock::test_clock::TestClock;
use rstest::rstest;

fn record() -> TelemetryRecord {
    TelemetryRecord::new(
        &Metrics {
            temperature_c: Some(23.5),
            humidity_pct: Some(61.0),
            distance_cm: Some(42.0),
            tds_ppm: Some(480.0),
            water_level_pct: Some(55),
        },
        &AlertFlags {
            tds: true,
            ..AlertFlags::default()
        },
        &Outputs {
            dosing_pump: true,
            ..Outputs::default()
        },
        OperatingMode::Normal,
        DosingPhase::Dispensing { started_ms: 0 },
        UNIX_EPOCH,
    )
}

#[rstest]
fn wire_schema_uses_camel_case_keys() {
    let v: serde_json::Value =
        serde_json::from_str(&record().to_json().expect("serialize")).expect("parse");
    let obj = v.as_object().expect("object");
    for key in [
        "temperature",
        "humidity",
        "distance",
        "tds",
        "waterLevel",
        "tempAlert",
        "humidityAlert",
        "distanceAlert",
        "tdsAlert",
        "waterLevelAlert",
        "tdsRelayStatus",
        "waterRelayStatus",
        "maintenance",
        "dosingPhase",
        "timestamp",
    ] {
        assert!(obj.contains_key(key), "missing key {key}");
    }
    assert_eq!(obj.len(), 15);
    assert_eq!(v["waterLevel"], 55);
    assert_eq!(v["tdsRelayStatus"], true);
    assert_eq!(v["waterRelayStatus"], false);
    assert_eq!(v["dosingPhase"], "dispensing");
}

#[rstest]
fn first_publish_waits_one_period() {
    let p = TelemetryPublisher::new(TelemetryCfg::default(), 0);
    assert!(!p.due(0));
    assert!(!p.due(29_999));
    assert!(p.due(30_000));
}

#[rstest]
fn exhausted_reconnects_skip_one_cycle() {
    let clock = TestClock::new();
    let mut transport = ScriptedTransport::new();
    let mut p = TelemetryPublisher::new(TelemetryCfg::default(), 0);
    transport.disconnect(10);

    let outcome = p.poll(30_000, &mut transport, &clock, record);
    match outcome {
        Some(PublishOutcome::Skipped { attempts: 10, error }) => {
            assert!(matches!(error, ControlError::Transport(_)));
        }
        other => panic!("expected skip, got {other:?}"),
    }
    assert_eq!(transport.publish_calls(), 1);
    assert_eq!(transport.reconnect_calls(), 10);
    // fixed backoff before every reconnect
    assert_eq!(clock.elapsed_ms(), 10 * 500);
    assert_eq!(p.skipped(), 1);
    assert!(transport.published().is_empty());

    // No catch-up: the next attempt is a full period after the failed one started
    assert!(!p.due(59_999));
    assert!(p.poll(45_000, &mut transport, &clock, record).is_none());

    let outcome = p.poll(60_000, &mut transport, &clock, record);
    assert_eq!(
        outcome,
        Some(PublishOutcome::DeliveredAfterReconnect { attempts: 1 })
    );
    assert_eq!(transport.published().len(), 1);
    assert_eq!(p.delivered(), 1);
}

#[rstest]
fn reconnect_republishes_same_record_once() {
    let clock = TestClock::new();
    let mut transport = ScriptedTransport::new();
    let mut p = TelemetryPublisher::new(TelemetryCfg::default(), 0);
    transport.disconnect(3);

    let rec = record();
    let outcome = p.publish(&mut transport, &rec, &clock);
    assert_eq!(outcome, PublishOutcome::DeliveredAfterReconnect { attempts: 4 });
    assert_eq!(transport.published(), vec![rec]);
    // first try plus the single re-publish
    assert_eq!(transport.publish_calls(), 2);
    assert_eq!(clock.elapsed_ms(), 4 * 500);
}

#[rstest]
fn healthy_link_publishes_without_delay() {
    let clock = TestClock::new();
    let mut transport = ScriptedTransport::new();
    let mut p = TelemetryPublisher::new(TelemetryCfg::default(), 0);
    assert_eq!(
        p.poll(30_000, &mut transport, &clock, record),
        Some(PublishOutcome::Delivered)
    );
    assert_eq!(clock.elapsed_ms(), 0);
    assert_eq!(transport.reconnect_calls(), 0);
}

#[rstest]
#[case(0)]
#[case(1)]
fn small_retry_budgets(#[case] attempts: u32) {
    let clock = TestClock::new();
    let mut transport = ScriptedTransport::new();
    let cfg = TelemetryCfg {
        reconnect_attempts: attempts,
        ..TelemetryCfg::default()
    };
    let mut p = TelemetryPublisher::new(cfg, 0);
    transport.disconnect(u32::MAX);
    let outcome = p.publish(&mut transport, &record(), &clock);
    assert!(!outcome.is_delivered());
    assert_eq!(transport.reconnect_calls(), attempts as usize);
}
