use hydro_core::SignalSmoother;
use rstest::rstest;

#[rstest]
fn steady_window_then_one_zero() {
    let mut s = SignalSmoother::new(20);
    for _ in 0..20 {
        s.record(300.0);
    }
    assert_eq!(s.average(), Some(300.0));
    // 21st sample evicts one 300 and adds a 0: 19 * 300 / 20
    assert_eq!(s.record(0.0), 285.0);
}

#[rstest]
#[case(1, &[5.0, 7.0, 9.0], 9.0)]
#[case(2, &[5.0, 7.0, 9.0], 8.0)]
#[case(3, &[5.0, 7.0, 9.0], 7.0)]
#[case(10, &[5.0, 7.0, 9.0], 7.0)]
fn mean_over_available_samples(#[case] window: usize, #[case] xs: &[f32], #[case] want: f32) {
    let mut s = SignalSmoother::new(window);
    let got = xs.iter().fold(0.0, |_, &x| s.record(x));
    assert_eq!(got, want);
}

#[rstest]
fn long_run_does_not_drift() {
    let mut s = SignalSmoother::new(7);
    for i in 0..100_000u32 {
        s.record(500.0 + (i % 13) as f32 * 0.1);
    }
    for _ in 0..7 {
        s.record(612.5);
    }
    assert_eq!(s.average(), Some(612.5));
}
