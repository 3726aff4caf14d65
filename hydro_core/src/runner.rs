//! Cooperative run loop: the control task and the telemetry task share one
//! thread and one injectable clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use hydro_traits::{Actuator, Clock, Sensor, TelemetryTransport, WallClock};

use crate::core::Controller;
use crate::error::{ControlError, Result};
use crate::schedule::PeriodicTask;
use crate::status::CycleReport;
use crate::telemetry::{PublishOutcome, TelemetryPublisher, TelemetryRecord};
use crate::util::{cycles_per_minute, sleep_slice_ms};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Stop after this many control cycles; `None` runs until shutdown.
    pub max_cycles: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub published: u64,
    pub skipped: u64,
    pub doses_completed: u64,
    pub output_errors: usize,
    pub sensor_faults: usize,
}

/// Drive the controller until `shutdown` is set or `max_cycles` is reached,
/// then switch every output off.
///
/// The first control cycle runs immediately; the first telemetry record
/// goes out one telemetry period after start. Sleeps are sliced so a
/// shutdown request is seen within `MAX_SLEEP_SLICE_MS`.
pub fn run<S, A, T, W>(
    controller: &mut Controller<S, A>,
    transport: &mut T,
    wall: &W,
    opts: RunOptions,
    shutdown: &AtomicBool,
) -> Result<RunSummary>
where
    S: Sensor,
    A: Actuator,
    T: TelemetryTransport<TelemetryRecord> + ?Sized,
    W: WallClock + ?Sized,
{
    run_observed(controller, transport, wall, opts, shutdown, |_, _| {})
}

/// `run`, handing every completed cycle to `observe` together with the
/// live record as of that cycle.
///
/// The observer only reads; it is how readers outside the loop (status
/// files, dashboards) see the same state the telemetry task publishes.
pub fn run_observed<S, A, T, W, F>(
    controller: &mut Controller<S, A>,
    transport: &mut T,
    wall: &W,
    opts: RunOptions,
    shutdown: &AtomicBool,
    mut observe: F,
) -> Result<RunSummary>
where
    S: Sensor,
    A: Actuator,
    T: TelemetryTransport<TelemetryRecord> + ?Sized,
    W: WallClock + ?Sized,
    F: FnMut(&CycleReport, &TelemetryRecord),
{
    let clock: Arc<dyn Clock + Send + Sync> = Arc::clone(controller.clock());
    let mut control = PeriodicTask::new(controller.control_cfg().cycle_ms);
    let mut publisher = TelemetryPublisher::new(*controller.telemetry_cfg(), controller.now_ms());
    let mut summary = RunSummary::default();
    let limit_reached = |s: &RunSummary| opts.max_cycles.is_some_and(|max| s.cycles >= max);

    tracing::info!(
        cycle_ms = control.period_ms(),
        cycles_per_min = cycles_per_minute(control.period_ms()),
        telemetry_ms = publisher.cfg().period_ms,
        max_cycles = opts.max_cycles,
        "controller running"
    );

    loop {
        if shutdown.load(Ordering::SeqCst) {
            tracing::info!("shutdown requested");
            break;
        }
        if limit_reached(&summary) {
            break;
        }

        let now = controller.now_ms();
        if control.due(now) {
            control.mark(now);
            let report = controller.step();
            summary.cycles += 1;
            summary.output_errors += report.output_errors;
            summary.sensor_faults += report.faults.count();
            observe(&report, &controller.snapshot(wall.utc_now()));
        }

        let now = controller.now_ms();
        let outcome = publisher.poll(now, transport, &*clock, || {
            controller.snapshot(wall.utc_now())
        });
        if let Some(PublishOutcome::Skipped { attempts, .. }) = &outcome {
            tracing::debug!(
                attempts,
                next_in_ms = publisher.cfg().period_ms,
                "telemetry deferred to next period"
            );
        }

        if limit_reached(&summary) {
            break;
        }
        let now = controller.now_ms();
        let wait = control.next_due_in(now).min(publisher.next_due_in(now));
        let slice = sleep_slice_ms(wait);
        if slice > 0 {
            clock.sleep(Duration::from_millis(slice));
        }
    }

    summary.published = publisher.delivered();
    summary.skipped = publisher.skipped();
    summary.doses_completed = controller.context().dosing().doses_completed();

    let failed = controller.all_off();
    if failed > 0 {
        tracing::error!(failed, "could not switch every output off");
        return Err(eyre::Report::new(ControlError::HardwareFault(format!(
            "{failed} output(s) failed to switch off"
        ))));
    }
    tracing::info!(
        cycles = summary.cycles,
        published = summary.published,
        skipped = summary.skipped,
        "controller stopped; outputs off"
    );
    Ok(summary)
}
