//! Backend assembly and the `run`, `snapshot`, `self-check` and `health`
//! commands. `run` owns the hardware; `snapshot` and `health` only read the
//! status file it keeps current.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::WrapErr;
use hydro_config::Config;
use hydro_core::{
    ControlError, CycleReport, HydroController, RunOptions, RunSummary, TelemetryRecord,
};
use hydro_core::util::duration_ms;
use hydro_hardware::error::HwError;
use hydro_hardware::{
    JsonLinesTransport, JsonlFileTransport, PlantState, SimFaults, SimPlant, StatusFile,
};
use hydro_traits::{Actuator, Sensor, SystemWallClock, TelemetryTransport};

type Backend = (Box<dyn Sensor>, Box<dyn Actuator>);

fn env_f32(key: &str) -> Option<f32> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key).is_ok_and(|v| matches!(v.trim(), "1" | "true" | "yes"))
}

/// Parse a comma-separated fault list such as `tds,echo`.
fn parse_faults(list: &str) -> SimFaults {
    let mut faults = SimFaults::default();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match name {
            "climate" => faults.climate = true,
            "echo" => faults.echo = true,
            "tds" => faults.tds = true,
            "level" => faults.level = true,
            "switch" => faults.switch = true,
            "outputs" => faults.outputs = true,
            other => tracing::warn!(fault = other, "unknown simulated fault ignored"),
        }
    }
    faults
}

/// Simulated tank, tunable through `HYDRO_SIM_*` environment variables.
pub fn sim_plant(cfg: &Config) -> SimPlant {
    let mut state = PlantState::default();
    if let Some(v) = env_f32("HYDRO_SIM_TEMP_C") {
        state.temperature_c = v;
    }
    if let Some(v) = env_f32("HYDRO_SIM_HUMIDITY_PCT") {
        state.humidity_pct = v;
    }
    if let Some(v) = env_f32("HYDRO_SIM_DISTANCE_CM") {
        state.distance_cm = v;
    }
    if let Some(v) = env_f32("HYDRO_SIM_TDS_RAW") {
        state.tds_raw = v;
    }
    if let Some(v) = env_f32("HYDRO_SIM_LEVEL_RAW") {
        state.level_raw = v;
    }
    // Electrical level that means "released" for the configured polarity
    let released = cfg.maintenance.active_low;
    state.switch_level = if env_flag("HYDRO_SIM_MAINTENANCE") {
        !released
    } else {
        released
    };
    if let Ok(list) = std::env::var("HYDRO_SIM_FAULTS") {
        state.faults = parse_faults(&list);
    }
    SimPlant::new(state)
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_hardware(cfg: &Config) -> eyre::Result<Backend> {
    use hydro_hardware::{GpioRelays, HardwareSensor, RelayPins, SensorWiring};

    let relays = GpioRelays::open(RelayPins {
        main_pump: cfg.pins.main_pump,
        dosing_pump: cfg.pins.dosing_pump,
        mixer: cfg.pins.mixer,
        drain: cfg.pins.drain,
        active_low: cfg.pins.relay_active_low,
    })
    .wrap_err("open relay pins")?;
    let sensor = HardwareSensor::open(SensorWiring {
        maintenance_switch: cfg.pins.maintenance_switch,
        ultrasonic_trigger: cfg.pins.ultrasonic_trigger,
        ultrasonic_echo: cfg.pins.ultrasonic_echo,
        i2c_bus: cfg.hardware.i2c_bus,
        adc_address: cfg.hardware.adc_address,
        tds_adc_channel: cfg.hardware.tds_adc_channel,
        level_adc_channel: cfg.hardware.level_adc_channel,
        dht_iio_device: cfg.hardware.dht_iio_device.clone().into(),
    })
    .wrap_err("open sensors")?;
    Ok((Box::new(sensor), Box::new(relays)))
}

/// GPIO backend when built with `hardware`, unless `HYDRO_SIM` is set.
fn open_backend(cfg: &Config) -> eyre::Result<Backend> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    if !env_flag("HYDRO_SIM") {
        return open_hardware(cfg);
    }
    let plant = sim_plant(cfg);
    tracing::info!(backend = "sim", "using simulated tank");
    Ok((Box::new(plant.sensor()), Box::new(plant.actuator())))
}

fn build(cfg: &Config) -> eyre::Result<HydroController> {
    let (sensor, actuator) = open_backend(cfg)?;
    HydroController::builder()
        .with_sensor(sensor)
        .with_actuator(actuator)
        .with_config(cfg)
        .build()
}

/// Switch everything off after a one-shot command.
fn finish(controller: &mut HydroController) -> eyre::Result<()> {
    let failed = controller.all_off();
    if failed > 0 {
        return Err(eyre::Report::new(ControlError::HardwareFault(format!(
            "{failed} output(s) failed to switch off"
        ))));
    }
    Ok(())
}

fn open_transport(
    telemetry_file: Option<&Path>,
) -> eyre::Result<Box<dyn TelemetryTransport<TelemetryRecord>>> {
    Ok(match telemetry_file {
        Some(path) => Box::new(
            JsonlFileTransport::open(path)
                .wrap_err_with(|| format!("open telemetry file {}", path.display()))?,
        ),
        None => Box::new(JsonLinesTransport::new(std::io::stdout())),
    })
}

pub fn run_controller(
    cfg: &Config,
    cycles: Option<u64>,
    telemetry_file: Option<&Path>,
    status_file: &Path,
) -> eyre::Result<RunSummary> {
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        })
        .wrap_err("install Ctrl-C handler")?;
    }

    let mut controller = build(cfg)?;
    let mut transport = open_transport(telemetry_file)?;
    let status = StatusFile::new(status_file);
    let cycle_ms = cfg.control.cycle_ms;
    hydro_core::run_observed(
        &mut controller,
        &mut *transport,
        &SystemWallClock,
        RunOptions { max_cycles: cycles },
        &shutdown,
        |report, record| {
            let written = status_doc(cycle_ms, report, record)
                .map_err(HwError::from)
                .and_then(|doc| status.write(&doc));
            if let Err(e) = written {
                tracing::warn!(path = %status.path().display(), error = %e, "status file not updated");
            }
        },
    )
}

fn failed_reads(report: &CycleReport) -> Vec<&'static str> {
    let f = report.faults;
    [
        ("maintenance_switch", f.maintenance_switch),
        ("climate", f.climate),
        ("distance", f.distance),
        ("tds", f.tds),
        ("water_level", f.water_level),
    ]
    .into_iter()
    .filter_map(|(name, failed)| failed.then_some(name))
    .collect()
}

/// What `run` leaves behind after each cycle for `snapshot` and `health`.
fn status_doc(
    cycle_ms: u64,
    report: &CycleReport,
    record: &TelemetryRecord,
) -> serde_json::Result<serde_json::Value> {
    Ok(serde_json::json!({
        "record": serde_json::to_value(record)?,
        "failedReads": failed_reads(report),
        "outputErrors": report.output_errors,
        "cycleMs": cycle_ms,
    }))
}

fn read_status(path: &Path) -> eyre::Result<serde_json::Value> {
    StatusFile::new(path)
        .read()
        .wrap_err_with(|| format!("read status file {}", path.display()))
}

/// The live record as of the running controller's last cycle. Reads the status
/// file only; no backend is opened and no output is touched.
pub fn snapshot(status_file: &Path) -> eyre::Result<serde_json::Value> {
    let mut doc = read_status(status_file)?;
    match doc.get_mut("record").map(serde_json::Value::take) {
        Some(record) if record.is_object() => Ok(record),
        _ => Err(eyre::eyre!(
            "status file {} has no record",
            status_file.display()
        )),
    }
}

/// Every sensor must read and every output must switch.
pub fn self_check(cfg: &Config) -> eyre::Result<()> {
    let mut controller = build(cfg)?;
    let report = controller.step();
    finish(&mut controller)?;
    let failed = failed_reads(&report);
    if !failed.is_empty() {
        return Err(eyre::Report::new(ControlError::HardwareFault(format!(
            "sensor read failed: {}",
            failed.join(", ")
        ))));
    }
    if report.output_errors > 0 {
        return Err(eyre::Report::new(ControlError::HardwareFault(format!(
            "{} output write(s) failed",
            report.output_errors
        ))));
    }
    Ok(())
}

/// Cycles without a status update before the controller counts as stale.
const STALE_CYCLES: u64 = 3;

const ALERT_KEYS: [&str; 5] = [
    "tempAlert",
    "humidityAlert",
    "distanceAlert",
    "tdsAlert",
    "waterLevelAlert",
];

/// Last cycle of the running controller summarized as JSON. Faults degrade
/// the status but do not fail; an old status file is flagged `stale`.
pub fn health(status_file: &Path) -> eyre::Result<serde_json::Value> {
    let doc = read_status(status_file)?;
    let age_ms = std::fs::metadata(status_file)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.elapsed().ok())
        .map(duration_ms)
        .unwrap_or(0);
    let cycle_ms = doc["cycleMs"].as_u64().unwrap_or(0);
    let record = &doc["record"];
    let failed = doc["failedReads"].as_array().cloned().unwrap_or_default();
    let output_errors = doc["outputErrors"].as_u64().unwrap_or(0);
    let degraded = !failed.is_empty() || output_errors > 0;
    Ok(serde_json::json!({
        "status": if degraded { "degraded" } else { "ok" },
        "maintenance": record["maintenance"],
        "dosing_phase": record["dosingPhase"],
        "alerts": ALERT_KEYS.iter().any(|k| record[*k] == true),
        "failed_reads": failed,
        "output_errors": output_errors,
        "age_ms": age_ms,
        "stale": age_ms > cycle_ms.saturating_mul(STALE_CYCLES),
    }))
}
