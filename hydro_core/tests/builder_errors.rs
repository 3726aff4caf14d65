use hydro_core::error::BuildError;
use hydro_core::mocks::{RecordingActuator, ScriptedSensor};
use hydro_core::{
    DosingCfg, HydroController, LevelBand, LevelCalibration, SmoothingCfg, Thresholds,
};
use rstest::rstest;

#[rstest]
fn missing_sensor_yields_typed_build_error() {
    let err = HydroController::builder()
        // missing with_sensor()
        .with_actuator(RecordingActuator::new())
        .with_thresholds(Thresholds::default())
        .try_build()
        .expect_err("should fail with MissingSensor");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingSensor) => {}
        other => panic!("expected MissingSensor, got: {other:?}"),
    }
}

#[rstest]
fn missing_thresholds_yields_typed_build_error() {
    let err = HydroController::builder()
        .with_sensor(ScriptedSensor::default())
        .with_actuator(RecordingActuator::new())
        .try_build()
        .expect_err("should fail with MissingThresholds");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingThresholds)
    ));
}

fn inverted_band() -> Thresholds {
    Thresholds {
        water_level: LevelBand {
            lower_pct: 60.0,
            upper_pct: 40.0,
        },
        ..Thresholds::default()
    }
}

fn nan_threshold() -> Thresholds {
    Thresholds {
        tds_min_ppm: f32::NAN,
        ..Thresholds::default()
    }
}

#[rstest]
#[case::inverted_band(inverted_band(), SmoothingCfg::default(), DosingCfg::default(), "lower < upper")]
#[case::nan_threshold(nan_threshold(), SmoothingCfg::default(), DosingCfg::default(), "finite")]
#[case::zero_window(Thresholds::default(), SmoothingCfg { tds_window: 0 }, DosingCfg::default(), "tds_window")]
#[case::zero_dispense(
    Thresholds::default(),
    SmoothingCfg::default(),
    DosingCfg { dispense_ms: 0, mix_ms: 10_000 },
    "dosing durations"
)]
fn invalid_settings_are_rejected(
    #[case] thresholds: Thresholds,
    #[case] smoothing: SmoothingCfg,
    #[case] dosing: DosingCfg,
    #[case] needle: &str,
) {
    let err = HydroController::builder()
        .with_sensor(ScriptedSensor::default())
        .with_actuator(RecordingActuator::new())
        .with_thresholds(thresholds)
        .with_smoothing(smoothing)
        .with_dosing(dosing)
        .build()
        .expect_err("settings should be rejected");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
    assert!(format!("{err}").contains(needle), "unexpected error: {err}");
}

#[rstest]
fn degenerate_level_probe_is_rejected() {
    let err = HydroController::builder()
        .with_sensor(ScriptedSensor::default())
        .with_actuator(RecordingActuator::new())
        .with_thresholds(Thresholds::default())
        .with_level_calibration(LevelCalibration {
            dry_raw: 100.0,
            wet_raw: 100.0,
        })
        .build()
        .expect_err("should fail");
    assert!(format!("{err}").contains("level probe"));
}
