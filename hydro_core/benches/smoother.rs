use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use hydro_core::SignalSmoother;

// Noisy TDS-like trace around 600 ppm
fn synth_trace(n: usize, noise_ppm: f32, seed: u32) -> Vec<f32> {
    // xorshift32
    let mut state = seed.max(1);
    let mut next_f32 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        (x as f32) / (u32::MAX as f32 + 1.0)
    };
    (0..n)
        .map(|i| {
            let drift = (i as f32 / 500.0).sin() * 50.0;
            600.0 + drift + (next_f32() * 2.0 - 1.0) * noise_ppm
        })
        .collect()
}

pub fn bench_record(c: &mut Criterion) {
    let mut g = c.benchmark_group("smoother_record");
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p hydro_core --bench smoother
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    let trace = synth_trace(50_000, 25.0, 0xC0FFEE);

    for &window in &[5usize, 20, 200] {
        g.bench_function(format!("window_{window}"), |b| {
            b.iter_batched(
                || SignalSmoother::new(window),
                |mut s| {
                    for &x in black_box(&trace) {
                        black_box(s.record(x));
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

criterion_group!(smoother, bench_record);
criterion_main!(smoother);
