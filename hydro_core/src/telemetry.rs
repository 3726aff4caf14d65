//! Telemetry records and the periodic publisher.

use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use hydro_traits::{Clock, TelemetryTransport};
use serde::Serialize;

use crate::alerts::{AlertFlags, Metrics};
use crate::config::TelemetryCfg;
use crate::dosing::{DosingPhase, PhaseKind};
use crate::error::ControlError;
use crate::hw_error::map_transport_error;
use crate::mode::OperatingMode;
use crate::schedule::PeriodicTask;
use crate::status::Outputs;

/// UTC, second resolution, literal `Z` suffix.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Immutable snapshot of the system published to the monitoring endpoint.
///
/// Metrics that have never been read serialize as `0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub temperature: f32,
    pub humidity: f32,
    pub distance: f32,
    pub tds: f32,
    pub water_level: u8,
    #[serde(rename = "tempAlert")]
    pub temperature_alert: bool,
    pub humidity_alert: bool,
    pub distance_alert: bool,
    pub tds_alert: bool,
    pub water_level_alert: bool,
    /// Dosing pump relay.
    pub tds_relay_status: bool,
    /// Refill (main) pump relay.
    pub water_relay_status: bool,
    pub maintenance: bool,
    pub dosing_phase: PhaseKind,
    pub timestamp: String,
}

impl TelemetryRecord {
    pub fn new(
        metrics: &Metrics,
        alerts: &AlertFlags,
        outputs: &Outputs,
        mode: OperatingMode,
        phase: DosingPhase,
        at: SystemTime,
    ) -> Self {
        Self {
            temperature: metrics.temperature_c.unwrap_or(0.0),
            humidity: metrics.humidity_pct.unwrap_or(0.0),
            distance: metrics.distance_cm.unwrap_or(0.0),
            tds: metrics.tds_ppm.unwrap_or(0.0),
            water_level: metrics.water_level_pct.unwrap_or(0),
            temperature_alert: alerts.temperature,
            humidity_alert: alerts.humidity,
            distance_alert: alerts.distance,
            tds_alert: alerts.tds,
            water_level_alert: alerts.water_level,
            tds_relay_status: outputs.dosing_pump,
            water_relay_status: outputs.main_pump,
            maintenance: mode == OperatingMode::Maintenance,
            dosing_phase: phase.kind(),
            timestamp: format_timestamp(at),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub fn format_timestamp(at: SystemTime) -> String {
    DateTime::<Utc>::from(at).format(TIMESTAMP_FORMAT).to_string()
}

/// What happened to one scheduled publish.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Delivered,
    /// Delivered on the re-publish after `attempts` reconnects.
    DeliveredAfterReconnect { attempts: u32 },
    /// Dropped; nothing is queued for the next period.
    Skipped { attempts: u32, error: ControlError },
}

impl PublishOutcome {
    pub fn is_delivered(&self) -> bool {
        !matches!(self, PublishOutcome::Skipped { .. })
    }
}

/// Publishes one record per period with a bounded reconnect policy.
#[derive(Debug, Clone)]
pub struct TelemetryPublisher {
    cfg: TelemetryCfg,
    schedule: PeriodicTask,
    delivered: u64,
    skipped: u64,
}

impl TelemetryPublisher {
    /// The first publish is due one period after `start_ms`.
    pub fn new(cfg: TelemetryCfg, start_ms: u64) -> Self {
        Self {
            schedule: PeriodicTask::deferred(cfg.period_ms, start_ms),
            cfg,
            delivered: 0,
            skipped: 0,
        }
    }

    pub fn due(&self, now_ms: u64) -> bool {
        self.schedule.due(now_ms)
    }

    pub fn next_due_in(&self, now_ms: u64) -> u64 {
        self.schedule.next_due_in(now_ms)
    }

    /// Publish if due. The schedule is marked before the attempt, so retry
    /// time counts against the period rather than pushing it back.
    pub fn poll<T, F>(
        &mut self,
        now_ms: u64,
        transport: &mut T,
        clock: &dyn Clock,
        make_record: F,
    ) -> Option<PublishOutcome>
    where
        T: TelemetryTransport<TelemetryRecord> + ?Sized,
        F: FnOnce() -> TelemetryRecord,
    {
        if !self.schedule.due(now_ms) {
            return None;
        }
        self.schedule.mark(now_ms);
        let record = make_record();
        Some(self.publish(transport, &record, clock))
    }

    /// Publish one record now, reconnecting on failure.
    ///
    /// Each reconnect waits `reconnect_backoff_ms` first. After the first
    /// successful reconnect the record is re-sent exactly once.
    pub fn publish<T>(
        &mut self,
        transport: &mut T,
        record: &TelemetryRecord,
        clock: &dyn Clock,
    ) -> PublishOutcome
    where
        T: TelemetryTransport<TelemetryRecord> + ?Sized,
    {
        let outcome = match transport.publish(record) {
            Ok(()) => PublishOutcome::Delivered,
            Err(e) => {
                let err = map_transport_error(&*e);
                tracing::warn!(error = %err, "telemetry publish failed; reconnecting");
                self.reconnect_and_retry(transport, record, clock, err)
            }
        };
        match &outcome {
            PublishOutcome::Delivered => {
                self.delivered += 1;
                tracing::debug!(timestamp = %record.timestamp, "telemetry delivered");
            }
            PublishOutcome::DeliveredAfterReconnect { attempts } => {
                self.delivered += 1;
                tracing::info!(attempts, "telemetry delivered after reconnect");
            }
            PublishOutcome::Skipped { attempts, error } => {
                self.skipped += 1;
                tracing::warn!(attempts, error = %error, "telemetry cycle skipped");
            }
        }
        outcome
    }

    fn reconnect_and_retry<T>(
        &mut self,
        transport: &mut T,
        record: &TelemetryRecord,
        clock: &dyn Clock,
        mut last_error: ControlError,
    ) -> PublishOutcome
    where
        T: TelemetryTransport<TelemetryRecord> + ?Sized,
    {
        let backoff = Duration::from_millis(self.cfg.reconnect_backoff_ms);
        for attempt in 1..=self.cfg.reconnect_attempts {
            clock.sleep(backoff);
            match transport.reconnect() {
                Ok(()) => {
                    return match transport.publish(record) {
                        Ok(()) => PublishOutcome::DeliveredAfterReconnect { attempts: attempt },
                        Err(e) => PublishOutcome::Skipped {
                            attempts: attempt,
                            error: map_transport_error(&*e),
                        },
                    };
                }
                Err(e) => {
                    last_error = map_transport_error(&*e);
                    tracing::debug!(attempt, error = %last_error, "reconnect failed");
                }
            }
        }
        PublishOutcome::Skipped {
            attempts: self.cfg.reconnect_attempts,
            error: last_error,
        }
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn cfg(&self) -> &TelemetryCfg {
        &self.cfg
    }
}
