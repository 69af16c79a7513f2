//! Stacking benchmarks: the three backends on the same moving-average sweep.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use nanosweep::ndarray::Array1;
use nanosweep::{Context, InlineRuntime, Kwargs, NoProgress, compiled, distributed, sequential};

/// Generate a synthetic close series with `n_bars` bars.
///
/// Starts at 100 and drifts using a simple deterministic RNG.
fn generate_closes(n_bars: usize) -> Vec<f64> {
    let mut rng_state: u32 = 42;
    let mut price = 100.0;
    (0..n_bars)
        .map(|_| {
            // xorshift32
            rng_state ^= rng_state << 13;
            rng_state ^= rng_state >> 17;
            rng_state ^= rng_state << 5;
            price *= 1.0 + ((rng_state % 401) as f64 - 200.0) / 10_000.0;
            price
        })
        .collect()
}

/// Trailing mean over `window` bars, NaN during the lookback.
fn rolling_mean(close: &[f64], window: usize) -> Array1<f64> {
    let mut out = Array1::from_elem(close.len(), f64::NAN);
    let mut sum = 0.0;
    for (t, &c) in close.iter().enumerate() {
        sum += c;
        if t >= window {
            sum -= close[t - window];
        }
        if t + 1 >= window {
            out[t] = sum / window as f64;
        }
    }
    out
}

fn bench_backends(c: &mut Criterion) {
    let mut group = c.benchmark_group("stacking/single");
    let close = generate_closes(2_520);

    for n_windows in [10, 100, 500] {
        let windows: Vec<usize> = (2..2 + n_windows).collect();
        let ctx = Context::new(close.clone());

        group.bench_with_input(
            BenchmarkId::new("sequential", n_windows),
            &windows,
            |b, windows| {
                b.iter(|| {
                    black_box(sequential::apply_and_concat_one(
                        windows.len(),
                        &ctx,
                        |i, close: &Vec<f64>, _| rolling_mean(close, windows[i]),
                        &mut NoProgress,
                    ))
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("compiled", n_windows),
            &windows,
            |b, windows| {
                b.iter(|| {
                    black_box(compiled::apply_and_concat_one(
                        windows.len(),
                        &close[..],
                        |i, close| rolling_mean(close, windows[i]),
                    ))
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("distributed_inline", n_windows),
            &windows,
            |b, windows| {
                b.iter(|| {
                    black_box(distributed::apply_and_concat_one(
                        &InlineRuntime,
                        windows.len(),
                        &ctx,
                        |i, close: &Vec<f64>, _: &Kwargs| rolling_mean(close, windows[i]),
                    ))
                });
            },
        );
    }

    group.finish();
}

/// Benchmark: thread pool fan-out with varying pool sizes
#[cfg(feature = "parallel")]
fn bench_thread_pool(c: &mut Criterion) {
    use nanosweep::ThreadPoolRuntime;

    let mut group = c.benchmark_group("stacking/thread_pool");
    let close = generate_closes(2_520);
    let windows: Vec<usize> = (2..502).collect();
    let ctx = Context::new(close);

    for workers in [1, 2, 4] {
        let Ok(runtime) = ThreadPoolRuntime::new(workers) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(workers), &windows, |b, windows| {
            b.iter(|| {
                black_box(distributed::apply_and_concat_one(
                    &runtime,
                    windows.len(),
                    &ctx,
                    |i, close: &Vec<f64>, _: &Kwargs| rolling_mean(close, windows[i]),
                ))
            });
        });
    }

    group.finish();
}

#[cfg(feature = "parallel")]
criterion_group!(benches, bench_backends, bench_thread_pool);

#[cfg(not(feature = "parallel"))]
criterion_group!(benches, bench_backends);

criterion_main!(benches);
