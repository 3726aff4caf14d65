#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Hydroponic control engine (hardware-agnostic).
//!
//! All hardware interactions go through the `hydro_traits::Sensor`,
//! `hydro_traits::Actuator` and `hydro_traits::TelemetryTransport` traits.
//!
//! ## Architecture
//!
//! - **Calibration**: TDS, level probe and ultrasonic conversions (`calibration`)
//! - **Smoothing**: fixed-window moving average for TDS (`smoother`)
//! - **Alerts**: strict threshold comparisons (`alerts`)
//! - **Control**: refill hysteresis (`hysteresis`), timed dosing cycle (`dosing`)
//!   and the maintenance override (`mode`), combined by `Controller`
//! - **Telemetry**: snapshot records and bounded-retry publishing (`telemetry`)
//! - **Runner**: single-threaded scheduler driving both periodic tasks (`runner`)

pub mod alerts;
pub mod builder;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod core;
pub mod dosing;
pub mod error;
pub mod hw_error;
pub mod hysteresis;
pub mod mocks;
pub mod mode;
pub mod runner;
pub mod schedule;
pub mod smoother;
pub mod status;
pub mod telemetry;
pub mod util;

pub use crate::alerts::{AlertFlags, Metrics};
pub use crate::builder::{
    ControllerBuilder, ControllerSettings, HydroController, Missing, Set, build_controller,
};
pub use crate::calibration::{LevelCalibration, TdsCalibration};
pub use crate::config::{
    ControlCfg, DosingCfg, LevelBand, MaintenanceCfg, SmoothingCfg, TelemetryCfg, Thresholds,
    Timeouts,
};
pub use crate::core::{ControlContext, Controller};
pub use crate::dosing::{DosingPhase, DosingStateMachine, PhaseKind};
pub use crate::error::{BuildError, ControlError, Result};
pub use crate::mode::{ModeArbiter, OperatingMode};
pub use crate::runner::{RunOptions, RunSummary, run, run_observed};
pub use crate::schedule::PeriodicTask;
pub use crate::smoother::SignalSmoother;
pub use crate::status::{CycleReport, Outputs, SensorFaults};
pub use crate::telemetry::{PublishOutcome, TelemetryPublisher, TelemetryRecord};
