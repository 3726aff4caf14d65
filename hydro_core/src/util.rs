//! Common time helpers for hydro_core.

use std::time::Duration;

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Longest single sleep of the run loop, so a shutdown request is noticed
/// promptly even with multi-second cycle periods.
pub const MAX_SLEEP_SLICE_MS: u64 = 250;

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
#[inline]
pub fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Length of the next sleep slice given the time remaining until a deadline.
/// - Never longer than `MAX_SLEEP_SLICE_MS`.
/// - Zero when the deadline has passed.
#[inline]
pub fn sleep_slice_ms(remaining_ms: u64) -> u64 {
    remaining_ms.min(MAX_SLEEP_SLICE_MS)
}

/// Rough cycles-per-minute figure for log lines.
#[inline]
pub fn cycles_per_minute(cycle_ms: u64) -> u64 {
    (60 * MILLIS_PER_SEC) / cycle_ms.max(1)
}
