use hydro_core::mocks::{RecordingActuator, ScriptedSensor};
use hydro_core::{ControllerSettings, HydroController, LevelBand};
use rstest::rstest;

const TOML: &str = r#"
[thresholds]
temperature_max_c = 28.0
humidity_max_pct = 65.0
distance_min_cm = 12.5
tds_min_ppm = 650.0

[water_level]
lower_pct = 35.0
upper_pct = 75.0

[smoothing]
tds_window = 8

[dosing]
dispense_ms = 1500
mix_ms = 8000

[telemetry]
period_ms = 10000
reconnect_attempts = 3
reconnect_backoff_ms = 250

[maintenance]
active_low = false

[control]
cycle_ms = 1000

[tds]
k_value = 0.9
temperature_compensation = true

[level_probe]
dry_raw = 3900.0
wet_raw = 1200.0

[hardware]
echo_timeout_ms = 25
"#;

#[rstest]
fn settings_follow_every_section() {
    let cfg = hydro_config::load_toml(TOML).expect("parse");
    cfg.validate().expect("valid");
    let s = ControllerSettings::from(&cfg);

    assert_eq!(s.thresholds.temperature_max_c, 28.0);
    assert_eq!(s.thresholds.distance_min_cm, 12.5);
    assert_eq!(
        s.thresholds.water_level,
        LevelBand {
            lower_pct: 35.0,
            upper_pct: 75.0
        }
    );
    assert_eq!(s.smoothing.tds_window, 8);
    assert_eq!(s.dosing.dispense_ms, 1_500);
    assert_eq!(s.dosing.mix_ms, 8_000);
    assert_eq!(s.telemetry.period_ms, 10_000);
    assert_eq!(s.telemetry.reconnect_attempts, 3);
    assert_eq!(s.telemetry.reconnect_backoff_ms, 250);
    assert!(!s.maintenance.active_low);
    assert_eq!(s.control.cycle_ms, 1_000);
    assert_eq!(s.timeouts.echo_ms, 25);
    assert_eq!(s.tds.k_value, 0.9);
    assert!(s.tds.temperature_compensation);
    // inverted probe: higher raw means drier
    assert_eq!(s.level.to_percent(1200.0), Some(100));
    assert_eq!(s.level.to_percent(3900.0), Some(0));
}

#[rstest]
fn builder_accepts_loaded_config() {
    let cfg = hydro_config::load_toml(TOML).expect("parse");
    let c = HydroController::builder()
        .with_sensor(ScriptedSensor::default())
        .with_actuator(RecordingActuator::new())
        .with_config(&cfg)
        .build()
        .expect("build from config");
    assert_eq!(c.control_cfg().cycle_ms, 1_000);
    assert_eq!(c.telemetry_cfg().reconnect_attempts, 3);
    assert_eq!(c.thresholds().tds_min_ppm, 650.0);
    assert_eq!(c.context().smoother().capacity(), 8);
}
