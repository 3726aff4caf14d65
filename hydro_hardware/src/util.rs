use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until `read` reports `level`, or `timeout` expires.
///
/// A zero `poll_interval` busy-polls with `spin_loop`, which microsecond
/// pulses need; anything longer sleeps between polls. Returns the instant
/// the level was first observed.
pub fn wait_for_level(
    mut read: impl FnMut() -> bool,
    level: bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Instant> {
    let deadline = Instant::now() + timeout;
    loop {
        if read() == level {
            return Ok(Instant::now());
        }
        if Instant::now() >= deadline {
            return Err(HwError::Timeout);
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
}

/// Width of the next high pulse on a line, all within `timeout`.
///
/// Waits for the rising edge, then the falling edge. Either edge missing
/// yields `HwError::EchoTimeout`.
pub fn measure_high_pulse(mut read: impl FnMut() -> bool, timeout: Duration) -> Result<Duration> {
    let start = Instant::now();
    let rise = wait_for_level(&mut read, true, timeout, Duration::ZERO)
        .map_err(|_| HwError::EchoTimeout)?;
    let remaining = timeout.saturating_sub(start.elapsed());
    let fall = wait_for_level(&mut read, false, remaining, Duration::ZERO)
        .map_err(|_| HwError::EchoTimeout)?;
    Ok(fall.saturating_duration_since(rise))
}
