//! Indicator apply functions swept by the CLI.
//!
//! Every function maps a close series to an output of the same length,
//! with `f64::NAN` during the lookback period.
//!
//! - SMA and Bollinger bands use a running window sum.
//! - EMA uses `alpha = 2/(window+1)`, seeded with the SMA of the first window.
//! - RSI uses Wilder's smoothing (`alpha = 1/window`).

use nanosweep::ndarray::Array1;

/// Simple moving average.
pub fn sma(close: &[f64], window: usize) -> Array1<f64> {
    let n = close.len();
    let mut out = Array1::from_elem(n, f64::NAN);
    if window == 0 || n < window {
        return out;
    }

    let mut sum: f64 = close[..window].iter().sum();
    out[window - 1] = sum / window as f64;
    for t in window..n {
        sum += close[t] - close[t - window];
        out[t] = sum / window as f64;
    }
    out
}

/// Exponential moving average.
pub fn ema(close: &[f64], window: usize) -> Array1<f64> {
    let n = close.len();
    let mut out = Array1::from_elem(n, f64::NAN);
    if window == 0 || n < window {
        return out;
    }

    let alpha = 2.0 / (window as f64 + 1.0);
    let mut prev = close[..window].iter().sum::<f64>() / window as f64;
    out[window - 1] = prev;
    for t in window..n {
        prev += alpha * (close[t] - prev);
        out[t] = prev;
    }
    out
}

/// Relative strength index with Wilder's smoothing.
///
/// A flat window gives 0, a window without losses gives 100.
pub fn rsi(close: &[f64], window: usize) -> Array1<f64> {
    let n = close.len();
    let mut out = Array1::from_elem(n, f64::NAN);
    if window == 0 || n <= window {
        return out;
    }

    let k = window as f64;
    let (mut gain, mut loss) = (1..=window).fold((0.0, 0.0), |(g, l), t| {
        let diff = close[t] - close[t - 1];
        (g + diff.max(0.0), l + (-diff).max(0.0))
    });
    gain /= k;
    loss /= k;
    out[window] = strength(gain, loss);

    for t in window + 1..n {
        let diff = close[t] - close[t - 1];
        gain = (gain * (k - 1.0) + diff.max(0.0)) / k;
        loss = (loss * (k - 1.0) + (-diff).max(0.0)) / k;
        out[t] = strength(gain, loss);
    }
    out
}

fn strength(gain: f64, loss: f64) -> f64 {
    if gain == 0.0 && loss == 0.0 {
        0.0
    } else if loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + gain / loss)
    }
}

/// Bollinger bands: `(upper, middle, lower)` around the SMA, `num_std`
/// population standard deviations wide.
pub fn bbands(
    close: &[f64],
    window: usize,
    num_std: f64,
) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
    let middle = sma(close, window);
    let std = rolling_std(close, window);
    let upper = &middle + &(&std * num_std);
    let lower = &middle - &(&std * num_std);
    (upper, middle, lower)
}

/// Rolling population standard deviation from running sums.
fn rolling_std(close: &[f64], window: usize) -> Array1<f64> {
    let n = close.len();
    let mut out = Array1::from_elem(n, f64::NAN);
    if window == 0 || n < window {
        return out;
    }

    let k = window as f64;
    let mut sum: f64 = close[..window].iter().sum();
    let mut sum_sq: f64 = close[..window].iter().map(|v| v * v).sum();
    let std = |sum: f64, sum_sq: f64| {
        let mean = sum / k;
        (sum_sq / k - mean * mean).max(0.0).sqrt()
    };

    out[window - 1] = std(sum, sum_sq);
    for t in window..n {
        let (old, new) = (close[t - window], close[t]);
        sum += new - old;
        sum_sq += new * new - old * old;
        out[t] = std(sum, sum_sq);
    }
    out
}

/// `true` where `fast` crosses above `slow`: above now, at or below on the
/// previous bar. Bars where either input is NaN never cross.
pub fn crossed_above(fast: &Array1<f64>, slow: &Array1<f64>) -> Array1<bool> {
    let n = fast.len().min(slow.len());
    let mut out = Array1::from_elem(n, false);
    for t in 1..n {
        out[t] = fast[t] > slow[t] && fast[t - 1] <= slow[t - 1];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn sma_lookback_and_values() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(out[0].is_nan());
        assert_eq!(out.slice(nanosweep::ndarray::s![1..]).to_vec(), vec![1.5, 2.5, 3.5]);
    }

    #[test]
    fn short_series_is_all_nan() {
        assert!(sma(&[1.0], 3).iter().all(|v| v.is_nan()));
        assert!(ema(&[1.0, 2.0], 3).iter().all(|v| v.is_nan()));
        assert!(rsi(&[1.0, 2.0, 3.0], 3).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_seeded_with_sma() {
        let out = ema(&[2.0, 4.0, 6.0, 8.0], 3);
        assert!(out[1].is_nan());
        assert!(approx(out[2], 4.0));
        assert!(approx(out[3], 4.0 + 0.5 * (8.0 - 4.0)));
    }

    #[test]
    fn rsi_extremes() {
        let up: Vec<f64> = (0..20).map(f64::from).collect();
        assert!(approx(rsi(&up, 14)[19], 100.0));

        let flat = vec![5.0; 20];
        assert!(approx(rsi(&flat, 14)[14], 0.0));
    }

    #[test]
    fn rsi_in_range() {
        let close = [
            44.0, 44.25, 44.5, 43.75, 44.5, 44.25, 43.5, 44.0, 44.5, 43.25, 43.0, 43.5, 44.0,
            44.5, 44.25, 44.0, 43.5, 43.75, 44.0, 43.25,
        ];
        let out = rsi(&close, 14);
        assert!(out[13].is_nan());
        assert!(out.iter().skip(14).all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn bbands_symmetric_around_middle() {
        let close = [1.0, 3.0, 1.0, 3.0, 1.0];
        let (upper, middle, lower) = bbands(&close, 2, 2.0);
        assert!(upper[0].is_nan());
        for t in 1..close.len() {
            assert!(approx(middle[t], 2.0));
            assert!(approx(upper[t], 4.0));
            assert!(approx(lower[t], 0.0));
        }
    }

    #[test]
    fn crossed_above_detects_single_bar() {
        let fast = Array1::from(vec![f64::NAN, 1.0, 3.0, 4.0, 1.0, 5.0]);
        let slow = Array1::from(vec![2.0, 2.0, 2.0, 2.0, 2.0, 2.0]);
        assert_eq!(
            crossed_above(&fast, &slow).to_vec(),
            vec![false, false, true, false, false, true]
        );
    }
}
