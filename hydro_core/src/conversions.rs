//! `From` implementations bridging `hydro_config` types to `hydro_core` types.

use crate::calibration::{LevelCalibration, TdsCalibration};
use crate::config::{
    ControlCfg, DosingCfg, LevelBand, MaintenanceCfg, SmoothingCfg, TelemetryCfg, Thresholds,
    Timeouts,
};

// ── Thresholds ───────────────────────────────────────────────────────────────

impl From<&hydro_config::WaterLevel> for LevelBand {
    fn from(c: &hydro_config::WaterLevel) -> Self {
        Self {
            lower_pct: c.lower_pct,
            upper_pct: c.upper_pct,
        }
    }
}

/// Thresholds span two TOML sections, so convert from the whole config.
impl From<&hydro_config::Config> for Thresholds {
    fn from(c: &hydro_config::Config) -> Self {
        Self {
            temperature_max_c: c.thresholds.temperature_max_c,
            humidity_max_pct: c.thresholds.humidity_max_pct,
            distance_min_cm: c.thresholds.distance_min_cm,
            tds_min_ppm: c.thresholds.tds_min_ppm,
            water_level: LevelBand::from(&c.water_level),
        }
    }
}

// ── Control loop ─────────────────────────────────────────────────────────────

impl From<&hydro_config::Smoothing> for SmoothingCfg {
    fn from(c: &hydro_config::Smoothing) -> Self {
        Self {
            tds_window: c.tds_window,
        }
    }
}

impl From<&hydro_config::Dosing> for DosingCfg {
    fn from(c: &hydro_config::Dosing) -> Self {
        Self {
            dispense_ms: c.dispense_ms,
            mix_ms: c.mix_ms,
        }
    }
}

impl From<&hydro_config::Telemetry> for TelemetryCfg {
    fn from(c: &hydro_config::Telemetry) -> Self {
        Self {
            period_ms: c.period_ms,
            reconnect_attempts: c.reconnect_attempts,
            reconnect_backoff_ms: c.reconnect_backoff_ms,
        }
    }
}

impl From<&hydro_config::Maintenance> for MaintenanceCfg {
    fn from(c: &hydro_config::Maintenance) -> Self {
        Self {
            active_low: c.active_low,
        }
    }
}

impl From<&hydro_config::Control> for ControlCfg {
    fn from(c: &hydro_config::Control) -> Self {
        Self {
            cycle_ms: c.cycle_ms,
        }
    }
}

impl From<&hydro_config::Hardware> for Timeouts {
    fn from(c: &hydro_config::Hardware) -> Self {
        Self {
            echo_ms: c.echo_timeout_ms,
        }
    }
}

// ── Probes ───────────────────────────────────────────────────────────────────

impl From<&hydro_config::TdsProbe> for TdsCalibration {
    fn from(c: &hydro_config::TdsProbe) -> Self {
        Self {
            vref: c.vref,
            adc_max: c.adc_max,
            k_value: c.k_value,
            temperature_compensation: c.temperature_compensation,
        }
    }
}

impl From<&hydro_config::LevelProbe> for LevelCalibration {
    fn from(c: &hydro_config::LevelProbe) -> Self {
        Self {
            dry_raw: c.dry_raw,
            wet_raw: c.wet_raw,
        }
    }
}
