use hydro_core::hysteresis::{HysteresisController, decide};
use hydro_core::{LevelBand, SignalSmoother};
use proptest::prelude::*;

fn mean(xs: &[f32]) -> f64 {
    xs.iter().map(|&v| f64::from(v)).sum::<f64>() / xs.len() as f64
}

fn close(a: f32, b: f64) -> bool {
    (f64::from(a) - b).abs() <= 1e-3 * b.abs().max(1.0)
}

prop_compose! {
    fn band()(lower in 0.0f32..90.0, width in 1.0f32..50.0) -> LevelBand {
        LevelBand { lower_pct: lower, upper_pct: (lower + width).min(100.0) }
    }
}

proptest! {
    #[test]
    fn partial_window_is_exact_mean(
        window in 1usize..64,
        samples in prop::collection::vec(0.0f32..2000.0, 1..64),
    ) {
        prop_assume!(samples.len() <= window);
        let mut s = SignalSmoother::new(window);
        let mut last = 0.0;
        for &x in &samples {
            last = s.record(x);
        }
        prop_assert!(close(last, mean(&samples)));
        prop_assert_eq!(s.len(), samples.len());
    }

    #[test]
    fn full_window_is_mean_of_latest(
        window in 1usize..32,
        samples in prop::collection::vec(0.0f32..2000.0, 33..300),
    ) {
        let mut s = SignalSmoother::new(window);
        for &x in &samples {
            s.record(x);
        }
        let tail = &samples[samples.len() - window..];
        let avg = s.average();
        prop_assert!(avg.is_some_and(|a| close(a, mean(tail))));
        prop_assert_eq!(s.len(), window);
    }

    #[test]
    fn deadband_never_changes_intent(b in band(), frac in 0.0f32..=1.0, prev in any::<bool>()) {
        let level = (b.lower_pct + frac * (b.upper_pct - b.lower_pct))
            .clamp(b.lower_pct, b.upper_pct);
        prop_assert_eq!(decide(level, b.lower_pct, b.upper_pct, prev), prev);
    }

    #[test]
    fn stays_active_until_above_upper(
        b in band(),
        inside in prop::collection::vec(0.0f32..=1.0, 0..50),
    ) {
        let mut c = HysteresisController::new(b);
        prop_assert!(c.update(Some(b.lower_pct - 0.5)));
        for frac in inside {
            let level = (b.lower_pct + frac * (b.upper_pct - b.lower_pct))
                .clamp(b.lower_pct, b.upper_pct);
            prop_assert!(c.update(Some(level)));
        }
        prop_assert!(!c.update(Some(b.upper_pct + 0.5)));
    }
}
