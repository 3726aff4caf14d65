#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the hydroponic controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated once
//!   at startup; the control loop never sees an invalid config.
//! - Only `[thresholds]` and `[water_level]` are required; every other
//!   section falls back to the firmware defaults.
use serde::Deserialize;
use std::path::Path;

/// BCM pin assignments used by the GPIO backend (ignored in simulation).
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Pins {
    pub main_pump: u8,
    pub dosing_pump: u8,
    pub mixer: u8,
    pub drain: u8,
    pub maintenance_switch: u8,
    pub ultrasonic_trigger: u8,
    pub ultrasonic_echo: u8,
    /// Relay boards that energize on a low level
    pub relay_active_low: bool,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            main_pump: 27,
            dosing_pump: 14,
            mixer: 22,
            drain: 23,
            maintenance_switch: 17,
            ultrasonic_trigger: 5,
            ultrasonic_echo: 18,
            relay_active_low: false,
        }
    }
}

/// Alert thresholds. All comparisons are strict.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Thresholds {
    /// Alert when temperature rises above this (°C)
    pub temperature_max_c: f32,
    /// Alert when relative humidity rises above this (%)
    pub humidity_max_pct: f32,
    /// Alert when an object is closer than this (cm)
    pub distance_min_cm: f32,
    /// Alert (and dose) when smoothed TDS falls below this (ppm)
    pub tds_min_ppm: f32,
}

/// Deadband for the refill pump; also the water-level alert band.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct WaterLevel {
    /// Pump starts when the level drops below this (%)
    pub lower_pct: f32,
    /// Pump stops when the level rises above this (%)
    pub upper_pct: f32,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Smoothing {
    /// Moving-average window for TDS samples
    pub tds_window: usize,
}

impl Default for Smoothing {
    fn default() -> Self {
        Self { tds_window: 20 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Dosing {
    /// Dosing pump run time per cycle (ms)
    pub dispense_ms: u64,
    /// Mixer run time after each dose (ms)
    pub mix_ms: u64,
}

impl Default for Dosing {
    fn default() -> Self {
        Self {
            dispense_ms: 2_000,
            mix_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Telemetry {
    /// Publish period (ms)
    pub period_ms: u64,
    /// Reconnect attempts after a failed publish (0 disables reconnects)
    pub reconnect_attempts: u32,
    /// Fixed delay between reconnect attempts (ms)
    pub reconnect_backoff_ms: u64,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            period_ms: 30_000,
            reconnect_attempts: 10,
            reconnect_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Maintenance {
    /// Treat low level as "switch asserted" when true
    pub active_low: bool,
}

impl Default for Maintenance {
    fn default() -> Self {
        Self { active_low: true }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Control {
    /// Sensing/control period (ms)
    pub cycle_ms: u64,
}

impl Default for Control {
    fn default() -> Self {
        Self { cycle_ms: 5_000 }
    }
}

/// TDS probe conversion parameters.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TdsProbe {
    /// ADC reference voltage (V)
    pub vref: f32,
    /// Full-scale ADC count
    pub adc_max: f32,
    /// Probe cell constant
    pub k_value: f32,
    /// Compensate with the measured air temperature instead of a fixed 25 °C
    pub temperature_compensation: bool,
}

impl Default for TdsProbe {
    fn default() -> Self {
        Self {
            vref: 3.3,
            adc_max: 4095.0,
            k_value: 1.0,
            temperature_compensation: false,
        }
    }
}

/// Resistive water-level probe endpoints in raw ADC counts.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct LevelProbe {
    pub dry_raw: f32,
    pub wet_raw: f32,
}

impl Default for LevelProbe {
    fn default() -> Self {
        Self {
            dry_raw: 0.0,
            wet_raw: 4095.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Hardware {
    /// Max time to wait for an ultrasonic echo before the read fails
    pub echo_timeout_ms: u64,
    /// I2C bus of the ADS1115 ADC
    pub i2c_bus: u8,
    /// I2C address of the ADS1115 ADC
    pub adc_address: u16,
    /// ADC input wired to the TDS probe
    pub tds_adc_channel: u8,
    /// ADC input wired to the level probe
    pub level_adc_channel: u8,
    /// IIO device directory exposed by the Linux dht11 driver
    pub dht_iio_device: String,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            echo_timeout_ms: 30,
            i2c_bus: 1,
            adc_address: 0x48,
            tds_adc_channel: 0,
            level_adc_channel: 1,
            dht_iio_device: "/sys/bus/iio/devices/iio:device0".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub pins: Pins,
    pub thresholds: Thresholds,
    pub water_level: WaterLevel,
    #[serde(default)]
    pub smoothing: Smoothing,
    #[serde(default)]
    pub dosing: Dosing,
    #[serde(default)]
    pub telemetry: Telemetry,
    #[serde(default)]
    pub maintenance: Maintenance,
    #[serde(default)]
    pub control: Control,
    #[serde(default)]
    pub tds: TdsProbe,
    #[serde(default)]
    pub level_probe: LevelProbe,
    #[serde(default)]
    pub hardware: Hardware,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

fn ensure_finite(name: &str, v: f32) -> eyre::Result<()> {
    if !v.is_finite() {
        eyre::bail!("{name} must be a finite number");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Thresholds
        ensure_finite("thresholds.temperature_max_c", self.thresholds.temperature_max_c)?;
        ensure_finite("thresholds.humidity_max_pct", self.thresholds.humidity_max_pct)?;
        ensure_finite("thresholds.distance_min_cm", self.thresholds.distance_min_cm)?;
        ensure_finite("thresholds.tds_min_ppm", self.thresholds.tds_min_ppm)?;
        if !(0.0..=100.0).contains(&self.thresholds.humidity_max_pct) {
            eyre::bail!("thresholds.humidity_max_pct must be in [0, 100]");
        }
        if self.thresholds.distance_min_cm < 0.0 {
            eyre::bail!("thresholds.distance_min_cm must be >= 0");
        }
        if self.thresholds.tds_min_ppm <= 0.0 {
            eyre::bail!("thresholds.tds_min_ppm must be > 0");
        }

        // Water level deadband
        ensure_finite("water_level.lower_pct", self.water_level.lower_pct)?;
        ensure_finite("water_level.upper_pct", self.water_level.upper_pct)?;
        if !(0.0..=100.0).contains(&self.water_level.lower_pct)
            || !(0.0..=100.0).contains(&self.water_level.upper_pct)
        {
            eyre::bail!("water_level bounds must be in [0, 100]");
        }
        if self.water_level.lower_pct >= self.water_level.upper_pct {
            eyre::bail!(
                "water_level.lower_pct must be < water_level.upper_pct (got {} >= {})",
                self.water_level.lower_pct,
                self.water_level.upper_pct
            );
        }

        // Smoothing
        if self.smoothing.tds_window == 0 {
            eyre::bail!("smoothing.tds_window must be >= 1");
        }
        if self.smoothing.tds_window > 10_000 {
            eyre::bail!("smoothing.tds_window is unreasonably large (>10000)");
        }

        // Dosing
        if self.dosing.dispense_ms == 0 {
            eyre::bail!("dosing.dispense_ms must be >= 1");
        }
        if self.dosing.mix_ms == 0 {
            eyre::bail!("dosing.mix_ms must be >= 1");
        }
        if self.dosing.dispense_ms > 10 * 60 * 1000 {
            eyre::bail!("dosing.dispense_ms is unreasonably large (>10min)");
        }

        // Telemetry
        if self.telemetry.period_ms == 0 {
            eyre::bail!("telemetry.period_ms must be >= 1");
        }
        if self.telemetry.reconnect_attempts > 100 {
            eyre::bail!("telemetry.reconnect_attempts must be <= 100");
        }
        let worst_case_retry_ms = self
            .telemetry
            .reconnect_backoff_ms
            .saturating_mul(u64::from(self.telemetry.reconnect_attempts));
        if worst_case_retry_ms >= self.telemetry.period_ms {
            eyre::bail!(
                "telemetry reconnect budget ({worst_case_retry_ms} ms) must be shorter than telemetry.period_ms"
            );
        }

        // Control
        if self.control.cycle_ms == 0 {
            eyre::bail!("control.cycle_ms must be >= 1");
        }

        // Probes
        ensure_finite("tds.vref", self.tds.vref)?;
        ensure_finite("tds.adc_max", self.tds.adc_max)?;
        ensure_finite("tds.k_value", self.tds.k_value)?;
        if self.tds.vref <= 0.0 {
            eyre::bail!("tds.vref must be > 0");
        }
        if self.tds.adc_max <= 0.0 {
            eyre::bail!("tds.adc_max must be > 0");
        }
        if self.tds.k_value <= 0.0 {
            eyre::bail!("tds.k_value must be > 0");
        }
        ensure_finite("level_probe.dry_raw", self.level_probe.dry_raw)?;
        ensure_finite("level_probe.wet_raw", self.level_probe.wet_raw)?;
        if self.level_probe.dry_raw == self.level_probe.wet_raw {
            eyre::bail!("level_probe.dry_raw and level_probe.wet_raw must differ");
        }

        // Hardware
        if self.hardware.echo_timeout_ms == 0 {
            eyre::bail!("hardware.echo_timeout_ms must be >= 1");
        }
        if self.hardware.echo_timeout_ms >= self.control.cycle_ms {
            eyre::bail!("hardware.echo_timeout_ms must be shorter than control.cycle_ms");
        }
        if self.hardware.tds_adc_channel > 3 || self.hardware.level_adc_channel > 3 {
            eyre::bail!("hardware ADC channels must be in 0..=3");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
