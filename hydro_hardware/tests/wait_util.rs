use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use hydro_hardware::error::HwError;
use hydro_hardware::util::{measure_high_pulse, wait_for_level};

#[test]
fn wait_for_level_success_path() {
    let high = Arc::new(AtomicBool::new(true));
    let high_bg = high.clone();
    // Flip low after a short delay
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        high_bg.store(false, Ordering::Relaxed);
    });

    let res = wait_for_level(
        || high.load(Ordering::Relaxed),
        false,
        Duration::from_millis(200),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn wait_for_level_timeout_path() {
    let high = Arc::new(AtomicBool::new(true));

    let err = wait_for_level(
        || high.load(Ordering::Relaxed),
        false,
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout error");

    match err {
        HwError::Timeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn pulse_width_counts_high_polls() {
    // Line reads: low, low, then high for a while, then low
    let mut n = 0u32;
    let width = measure_high_pulse(
        || {
            n += 1;
            if (3..=6).contains(&n) {
                // ~1 ms per high sample keeps the measurement well above jitter
                thread::sleep(Duration::from_millis(1));
                true
            } else {
                false
            }
        },
        Duration::from_millis(500),
    )
    .expect("pulse");
    assert!(width >= Duration::from_millis(3), "width={width:?}");
}

#[test]
fn missing_echo_is_echo_timeout() {
    let err = measure_high_pulse(|| false, Duration::from_millis(2)).expect_err("no pulse");
    assert!(matches!(err, HwError::EchoTimeout));
}

#[test]
fn stuck_high_line_is_echo_timeout() {
    let err = measure_high_pulse(|| true, Duration::from_millis(2)).expect_err("no falling edge");
    assert!(matches!(err, HwError::EchoTimeout));
}
