//! The control loop (`Controller`).
//!
//! One `step()` is one full cycle: maintenance switch, sensor reads,
//! smoothing, alerts, refill and dosing control, then an idempotent write
//! of every output.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use hydro_traits::{
    Actuator, AnalogChannel, BoxError, Clock, DigitalInput, OutputChannel, PulseInput, Sensor,
};

use crate::alerts::{self, AlertFlags, Metrics};
use crate::calibration::{LevelCalibration, TdsCalibration, echo_to_cm};
use crate::config::{ControlCfg, TelemetryCfg, Thresholds, Timeouts};
use crate::dosing::{DosingPhase, DosingStateMachine};
use crate::error::ControlError;
use crate::hw_error::map_hw_error;
use crate::hysteresis::HysteresisController;
use crate::mode::{ModeArbiter, OperatingMode};
use crate::smoother::SignalSmoother;
use crate::status::{CycleReport, Outputs, SensorFaults};
use crate::telemetry::TelemetryRecord;

/// Mutable state carried from one cycle to the next.
#[derive(Debug, Clone)]
pub struct ControlContext {
    pub(crate) tds: SignalSmoother,
    pub(crate) metrics: Metrics,
    pub(crate) alerts: AlertFlags,
    pub(crate) refill: HysteresisController,
    pub(crate) dosing: DosingStateMachine,
    pub(crate) arbiter: ModeArbiter,
    pub(crate) outputs: Outputs,
    pub(crate) cycles: u64,
}

impl ControlContext {
    pub fn smoother(&self) -> &SignalSmoother {
        &self.tds
    }
    pub fn refill(&self) -> &HysteresisController {
        &self.refill
    }
    pub fn dosing(&self) -> &DosingStateMachine {
        &self.dosing
    }
}

pub struct Controller<S: Sensor, A: Actuator> {
    pub(crate) sensor: S,
    pub(crate) actuator: A,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) thresholds: Thresholds,
    pub(crate) tds_cal: TdsCalibration,
    pub(crate) level_cal: LevelCalibration,
    pub(crate) timeouts: Timeouts,
    pub(crate) control: ControlCfg,
    pub(crate) telemetry: TelemetryCfg,
    pub(crate) ctx: ControlContext,
}

impl<S: Sensor, A: Actuator> core::fmt::Debug for Controller<S, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("cycles", &self.ctx.cycles)
            .field("mode", &self.ctx.arbiter.mode())
            .field("phase", &self.ctx.dosing.phase())
            .field("outputs", &self.ctx.outputs)
            .finish()
    }
}

impl<S: Sensor, A: Actuator> Controller<S, A> {
    /// Milliseconds since the controller was built.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn metrics(&self) -> &Metrics {
        &self.ctx.metrics
    }

    pub fn alerts(&self) -> &AlertFlags {
        &self.ctx.alerts
    }

    pub fn phase(&self) -> DosingPhase {
        self.ctx.dosing.phase()
    }

    pub fn mode(&self) -> OperatingMode {
        self.ctx.arbiter.mode()
    }

    /// Outputs written during the last cycle.
    pub fn outputs(&self) -> &Outputs {
        &self.ctx.outputs
    }

    pub fn cycles(&self) -> u64 {
        self.ctx.cycles
    }

    pub fn context(&self) -> &ControlContext {
        &self.ctx
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn control_cfg(&self) -> &ControlCfg {
        &self.control
    }

    pub fn telemetry_cfg(&self) -> &TelemetryCfg {
        &self.telemetry
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    /// Run one control cycle.
    pub fn step(&mut self) -> CycleReport {
        let now = self.now_ms();
        let mut faults = SensorFaults::default();

        // The override is decided before anything else touches an output
        let switch = match self.sensor.read_digital(DigitalInput::MaintenanceSwitch) {
            Ok(level) => Some(level),
            Err(e) => {
                faults.maintenance_switch = true;
                warn_read("maintenance switch", &e);
                None
            }
        };
        let mode = self.ctx.arbiter.update(switch);

        self.read_sensors(&mut faults);
        self.ctx.alerts = alerts::evaluate(&self.ctx.metrics, &self.thresholds);

        let outputs = match mode {
            OperatingMode::Maintenance => Outputs::maintenance(),
            OperatingMode::Normal => {
                let level = self.ctx.metrics.water_level_pct.map(f32::from);
                let main_pump = self.ctx.refill.update(level);
                let phase = self.ctx.dosing.update(now, self.ctx.metrics.tds_ppm);
                Outputs {
                    main_pump,
                    dosing_pump: phase.dosing_pump_on(),
                    mixer: phase.mixer_on(),
                    drain: false,
                }
            }
        };
        let output_errors = self.write_outputs(outputs);
        self.ctx.outputs = outputs;
        self.ctx.cycles += 1;

        tracing::debug!(
            cycle = self.ctx.cycles,
            now_ms = now,
            ?mode,
            phase = ?self.ctx.dosing.phase().kind(),
            tds_ppm = self.ctx.metrics.tds_ppm,
            level_pct = self.ctx.metrics.water_level_pct,
            alerts = self.ctx.alerts.any(),
            "control cycle"
        );

        CycleReport {
            at_ms: now,
            mode,
            metrics: self.ctx.metrics,
            alerts: self.ctx.alerts,
            phase: self.ctx.dosing.phase(),
            outputs,
            faults,
            output_errors,
        }
    }

    /// Build a telemetry record from the current state.
    pub fn snapshot(&self, at: SystemTime) -> TelemetryRecord {
        TelemetryRecord::new(
            &self.ctx.metrics,
            &self.ctx.alerts,
            &self.ctx.outputs,
            self.ctx.arbiter.mode(),
            self.ctx.dosing.phase(),
            at,
        )
    }

    /// Drive every output off (best-effort). Returns the number of failed writes.
    pub fn all_off(&mut self) -> usize {
        let errors = self.write_outputs(Outputs::default());
        self.ctx.outputs = Outputs::default();
        errors
    }

    fn read_sensors(&mut self, faults: &mut SensorFaults) {
        // Temperature and humidity come from one device and only update together
        let temperature = self.read_finite(AnalogChannel::Temperature);
        let humidity = self.read_finite(AnalogChannel::Humidity);
        match (temperature, humidity) {
            (Ok(t), Ok(h)) => {
                self.ctx.metrics.temperature_c = Some(t);
                self.ctx.metrics.humidity_pct = Some(h);
            }
            (Err(e), _) | (_, Err(e)) => {
                faults.climate = true;
                warn_fault("temperature/humidity", &e);
            }
        }

        let timeout = Duration::from_millis(self.timeouts.echo_ms);
        match self
            .sensor
            .measure_pulse_width(PulseInput::UltrasonicEcho, timeout)
        {
            Ok(echo) => self.ctx.metrics.distance_cm = Some(echo_to_cm(echo)),
            Err(e) => {
                faults.distance = true;
                warn_read("ultrasonic echo", &e);
            }
        }

        let tds = self.read_finite(AnalogChannel::Tds).and_then(|raw| {
            self.tds_cal
                .to_ppm(raw, self.ctx.metrics.temperature_c)
                .ok_or(ControlError::InvalidReading("tds"))
        });
        match tds {
            Ok(ppm) => self.ctx.metrics.tds_ppm = Some(self.ctx.tds.record(ppm)),
            Err(e) => {
                faults.tds = true;
                warn_fault("tds", &e);
            }
        }

        let level = self.read_finite(AnalogChannel::WaterLevel).and_then(|raw| {
            self.level_cal
                .to_percent(raw)
                .ok_or(ControlError::InvalidReading("water level"))
        });
        match level {
            Ok(pct) => self.ctx.metrics.water_level_pct = Some(pct),
            Err(e) => {
                faults.water_level = true;
                warn_fault("water level", &e);
            }
        }
    }

    fn read_finite(&mut self, channel: AnalogChannel) -> Result<f32, ControlError> {
        let v = self
            .sensor
            .read_analog(channel)
            .map_err(|e| map_hw_error(&*e))?;
        if v.is_finite() {
            Ok(v)
        } else {
            Err(ControlError::InvalidReading(analog_name(channel)))
        }
    }

    fn write_outputs(&mut self, outputs: Outputs) -> usize {
        let mut errors = 0;
        for channel in OutputChannel::ALL {
            if let Err(e) = self.actuator.set_output(channel, outputs.get(channel)) {
                errors += 1;
                tracing::warn!(?channel, error = %map_hw_error(&*e), "output write failed");
            }
        }
        errors
    }
}

fn analog_name(channel: AnalogChannel) -> &'static str {
    match channel {
        AnalogChannel::Temperature => "temperature",
        AnalogChannel::Humidity => "humidity",
        AnalogChannel::Tds => "tds",
        AnalogChannel::WaterLevel => "water level",
    }
}

fn warn_read(what: &'static str, e: &BoxError) {
    warn_fault(what, &map_hw_error(&**e));
}

fn warn_fault(what: &'static str, e: &ControlError) {
    tracing::warn!(sensor = what, error = %e, "sensor read failed; keeping last value");
}
