//! Configuration types for the control engine.
//!
//! These are the runtime configuration structs used by `Controller`.
//! They are separate from the TOML-deserialized config in `hydro_config`.

/// Hysteresis band for the refill pump, in percent of tank level.
///
/// Also used as the water-level alert band: a level outside
/// `[lower_pct, upper_pct]` raises `water_level_alert`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelBand {
    /// Pump turns on once the level drops below this.
    pub lower_pct: f32,
    /// Pump turns off once the level rises above this.
    pub upper_pct: f32,
}

impl LevelBand {
    /// A band is usable only when both ends are finite and `lower < upper`.
    pub fn is_valid(&self) -> bool {
        self.lower_pct.is_finite() && self.upper_pct.is_finite() && self.lower_pct < self.upper_pct
    }
}

impl Default for LevelBand {
    fn default() -> Self {
        Self {
            lower_pct: 40.0,
            upper_pct: 60.0,
        }
    }
}

/// Alert thresholds. Every comparison is strict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Alert above this temperature (°C).
    pub temperature_max_c: f32,
    /// Alert above this relative humidity (%).
    pub humidity_max_pct: f32,
    /// Alert when an object is nearer than this (cm).
    pub distance_min_cm: f32,
    /// Alert, and start dosing, below this smoothed TDS (ppm).
    pub tds_min_ppm: f32,
    /// Water-level band shared with the refill controller.
    pub water_level: LevelBand,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature_max_c: 30.0,
            humidity_max_pct: 70.0,
            distance_min_cm: 10.0,
            tds_min_ppm: 500.0,
            water_level: LevelBand::default(),
        }
    }
}

/// Signal smoothing configuration.
#[derive(Debug, Clone, Copy)]
pub struct SmoothingCfg {
    /// Moving-average window for TDS samples.
    pub tds_window: usize,
}

impl Default for SmoothingCfg {
    fn default() -> Self {
        Self { tds_window: 20 }
    }
}

/// Dosing cycle timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosingCfg {
    /// Minimum dosing pump run per cycle (ms).
    pub dispense_ms: u64,
    /// Minimum mixer run after a dose (ms).
    pub mix_ms: u64,
}

impl Default for DosingCfg {
    fn default() -> Self {
        Self {
            dispense_ms: 2_000,
            mix_ms: 10_000,
        }
    }
}

/// Telemetry schedule and retry policy.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryCfg {
    pub period_ms: u64,
    pub reconnect_attempts: u32,
    pub reconnect_backoff_ms: u64,
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self {
            period_ms: 30_000,
            reconnect_attempts: 10,
            reconnect_backoff_ms: 500,
        }
    }
}

/// Maintenance switch polarity.
#[derive(Debug, Clone, Copy)]
pub struct MaintenanceCfg {
    /// Low level means "asserted".
    pub active_low: bool,
}

impl Default for MaintenanceCfg {
    fn default() -> Self {
        Self { active_low: true }
    }
}

/// Control loop period.
#[derive(Debug, Clone, Copy)]
pub struct ControlCfg {
    pub cycle_ms: u64,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self { cycle_ms: 5_000 }
    }
}

/// Timeouts for blocking hardware reads.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Max wait for an ultrasonic echo (ms).
    pub echo_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { echo_ms: 30 }
    }
}
