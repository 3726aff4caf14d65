//! Type-state builder for `HydroController` and generic `build_controller`.
//!
//! The builder enforces at compile time that a sensor, an actuator and the
//! alert thresholds are provided before `build()` is available. `try_build()`
//! is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use hydro_traits::{Actuator, Clock, MonotonicClock, Sensor};

use crate::alerts::{AlertFlags, Metrics};
use crate::calibration::{LevelCalibration, TdsCalibration};
use crate::config::*;
use crate::core::{ControlContext, Controller};
use crate::dosing::DosingStateMachine;
use crate::error::{BuildError, Result};
use crate::hysteresis::HysteresisController;
use crate::mode::ModeArbiter;
use crate::smoother::SignalSmoother;
use crate::status::Outputs;

/// Dynamically dispatched controller.
pub type HydroController = Controller<Box<dyn Sensor>, Box<dyn Actuator>>;

/// Everything the controller needs besides its hardware and clock.
#[derive(Debug, Clone, Default)]
pub struct ControllerSettings {
    pub thresholds: Thresholds,
    pub smoothing: SmoothingCfg,
    pub dosing: DosingCfg,
    pub telemetry: TelemetryCfg,
    pub maintenance: MaintenanceCfg,
    pub control: ControlCfg,
    pub timeouts: Timeouts,
    pub tds: TdsCalibration,
    pub level: LevelCalibration,
}

impl From<&hydro_config::Config> for ControllerSettings {
    fn from(c: &hydro_config::Config) -> Self {
        Self {
            thresholds: Thresholds::from(c),
            smoothing: SmoothingCfg::from(&c.smoothing),
            dosing: DosingCfg::from(&c.dosing),
            telemetry: TelemetryCfg::from(&c.telemetry),
            maintenance: MaintenanceCfg::from(&c.maintenance),
            control: ControlCfg::from(&c.control),
            timeouts: Timeouts::from(&c.hardware),
            tds: TdsCalibration::from(&c.tds),
            level: LevelCalibration::from(&c.level_probe),
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate settings and construct a `Controller` with a fresh context.
///
/// Single source of truth for validation, shared by the builder and
/// `build_controller()`.
fn validate_and_build<S: Sensor, A: Actuator>(
    sensor: S,
    actuator: A,
    settings: ControllerSettings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<Controller<S, A>> {
    let ControllerSettings {
        thresholds,
        smoothing,
        dosing,
        telemetry,
        maintenance,
        control,
        timeouts,
        tds,
        level,
    } = settings;

    // ── Validation ───────────────────────────────────────────────────────────
    let finite = [
        thresholds.temperature_max_c,
        thresholds.humidity_max_pct,
        thresholds.distance_min_cm,
        thresholds.tds_min_ppm,
    ];
    if finite.iter().any(|v| !v.is_finite()) {
        return Err(invalid("thresholds must be finite"));
    }
    if !thresholds.water_level.is_valid() {
        return Err(invalid("water level band requires lower < upper"));
    }
    if smoothing.tds_window == 0 {
        return Err(invalid("tds_window must be >= 1"));
    }
    if dosing.dispense_ms == 0 || dosing.mix_ms == 0 {
        return Err(invalid("dosing durations must be >= 1 ms"));
    }
    if telemetry.period_ms == 0 {
        return Err(invalid("telemetry period must be >= 1 ms"));
    }
    if control.cycle_ms == 0 {
        return Err(invalid("cycle_ms must be >= 1"));
    }
    if timeouts.echo_ms == 0 {
        return Err(invalid("echo timeout must be >= 1 ms"));
    }
    if !(tds.vref > 0.0 && tds.adc_max > 0.0 && tds.k_value > 0.0) {
        return Err(invalid("tds calibration values must be > 0"));
    }
    if level.dry_raw == level.wet_raw {
        return Err(invalid("level probe dry and wet readings must differ"));
    }

    // ── Assemble ─────────────────────────────────────────────────────────────
    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();

    let ctx = ControlContext {
        tds: SignalSmoother::new(smoothing.tds_window),
        metrics: Metrics::default(),
        alerts: AlertFlags::default(),
        refill: HysteresisController::new(thresholds.water_level),
        dosing: DosingStateMachine::new(dosing, thresholds.tds_min_ppm),
        arbiter: ModeArbiter::new(maintenance),
        outputs: Outputs::default(),
        cycles: 0,
    };

    Ok(Controller {
        sensor,
        actuator,
        clock,
        epoch,
        thresholds,
        tds_cal: tds,
        level_cal: level,
        timeouts,
        control,
        telemetry,
        ctx,
    })
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `HydroController`. All fields are validated on `build()`.
pub struct ControllerBuilder<S, A, T> {
    sensor: Option<Box<dyn Sensor>>,
    actuator: Option<Box<dyn Actuator>>,
    thresholds: Option<Thresholds>,
    smoothing: Option<SmoothingCfg>,
    dosing: Option<DosingCfg>,
    telemetry: Option<TelemetryCfg>,
    maintenance: Option<MaintenanceCfg>,
    control: Option<ControlCfg>,
    timeouts: Option<Timeouts>,
    tds: Option<TdsCalibration>,
    level: Option<LevelCalibration>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _s: PhantomData<S>,
    _a: PhantomData<A>,
    _t: PhantomData<T>,
}

impl Default for ControllerBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            sensor: None,
            actuator: None,
            thresholds: None,
            smoothing: None,
            dosing: None,
            telemetry: None,
            maintenance: None,
            control: None,
            timeouts: None,
            tds: None,
            level: None,
            clock: None,
            _s: PhantomData,
            _a: PhantomData,
            _t: PhantomData,
        }
    }
}

impl HydroController {
    /// Start building a controller.
    pub fn builder() -> ControllerBuilder<Missing, Missing, Missing> {
        ControllerBuilder::default()
    }
}

impl<S, A, T> ControllerBuilder<S, A, T> {
    /// Move every field into a builder with different type-state markers.
    fn retag<S2, A2, T2>(self) -> ControllerBuilder<S2, A2, T2> {
        ControllerBuilder {
            sensor: self.sensor,
            actuator: self.actuator,
            thresholds: self.thresholds,
            smoothing: self.smoothing,
            dosing: self.dosing,
            telemetry: self.telemetry,
            maintenance: self.maintenance,
            control: self.control,
            timeouts: self.timeouts,
            tds: self.tds,
            level: self.level,
            clock: self.clock,
            _s: PhantomData,
            _a: PhantomData,
            _t: PhantomData,
        }
    }

    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<HydroController> {
        let sensor = self
            .sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensor))?;
        let actuator = self
            .actuator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator))?;
        let thresholds = self
            .thresholds
            .ok_or_else(|| eyre::Report::new(BuildError::MissingThresholds))?;

        let settings = ControllerSettings {
            thresholds,
            smoothing: self.smoothing.unwrap_or_default(),
            dosing: self.dosing.unwrap_or_default(),
            telemetry: self.telemetry.unwrap_or_default(),
            maintenance: self.maintenance.unwrap_or_default(),
            control: self.control.unwrap_or_default(),
            timeouts: self.timeouts.unwrap_or_default(),
            tds: self.tds.unwrap_or_default(),
            level: self.level.unwrap_or_default(),
        };
        validate_and_build(sensor, actuator, settings, self.clock)
    }
}

/// Chainable setters that do not affect type-state.
impl<S, A, T> ControllerBuilder<S, A, T> {
    pub fn with_smoothing(mut self, smoothing: SmoothingCfg) -> Self {
        self.smoothing = Some(smoothing);
        self
    }
    pub fn with_dosing(mut self, dosing: DosingCfg) -> Self {
        self.dosing = Some(dosing);
        self
    }
    pub fn with_telemetry(mut self, telemetry: TelemetryCfg) -> Self {
        self.telemetry = Some(telemetry);
        self
    }
    pub fn with_maintenance(mut self, maintenance: MaintenanceCfg) -> Self {
        self.maintenance = Some(maintenance);
        self
    }
    pub fn with_control(mut self, control: ControlCfg) -> Self {
        self.control = Some(control);
        self
    }
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }
    pub fn with_tds_calibration(mut self, tds: TdsCalibration) -> Self {
        self.tds = Some(tds);
        self
    }
    pub fn with_level_calibration(mut self, level: LevelCalibration) -> Self {
        self.level = Some(level);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<A, T> ControllerBuilder<Missing, A, T> {
    pub fn with_sensor(mut self, sensor: impl Sensor + 'static) -> ControllerBuilder<Set, A, T> {
        self.sensor = Some(Box::new(sensor));
        self.retag()
    }
}

impl<S, T> ControllerBuilder<S, Missing, T> {
    pub fn with_actuator(
        mut self,
        actuator: impl Actuator + 'static,
    ) -> ControllerBuilder<S, Set, T> {
        self.actuator = Some(Box::new(actuator));
        self.retag()
    }
}

impl<S, A> ControllerBuilder<S, A, Missing> {
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> ControllerBuilder<S, A, Set> {
        self.thresholds = Some(thresholds);
        self.retag()
    }

    /// Take thresholds and every tuning section from a loaded config.
    pub fn with_config(self, cfg: &hydro_config::Config) -> ControllerBuilder<S, A, Set> {
        let s = ControllerSettings::from(cfg);
        self.with_smoothing(s.smoothing)
            .with_dosing(s.dosing)
            .with_telemetry(s.telemetry)
            .with_maintenance(s.maintenance)
            .with_control(s.control)
            .with_timeouts(s.timeouts)
            .with_tds_calibration(s.tds)
            .with_level_calibration(s.level)
            .with_thresholds(s.thresholds)
    }
}

impl ControllerBuilder<Set, Set, Set> {
    /// Validate and build. Only available once sensor, actuator and thresholds are set.
    pub fn build(self) -> Result<HydroController> {
        self.try_build()
    }
}

/// Build a generic, statically-dispatched controller from concrete hardware.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_controller<S, A>(
    sensor: S,
    actuator: A,
    settings: ControllerSettings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<Controller<S, A>>
where
    S: Sensor,
    A: Actuator,
{
    validate_and_build(sensor, actuator, settings, clock)
}
