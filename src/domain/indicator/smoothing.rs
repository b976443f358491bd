//! Smoothing kernels shared by the indicators.
//!
//! All kernels return one entry per input value, `None` until the first
//! full window has been seen.

/// Smoothing factor of an n-period EMA.
pub(crate) fn ema_alpha(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// Smoothing factor of Wilder's n-period average (RSI, ATR).
pub(crate) fn wilder_alpha(period: usize) -> f64 {
    1.0 / period as f64
}

/// Rolling mean kept as a running sum.
pub(crate) fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut sum = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            sum += v;
            if i >= period {
                sum -= values[i - period];
            }
            (period > 0 && i + 1 >= period).then(|| sum / period as f64)
        })
        .collect()
}

/// Exponential smoothing seeded with the mean of the first `period` values:
/// `s[i] = v[i] * alpha + s[i-1] * (1 - alpha)`.
pub(crate) fn seeded_smoothing(values: &[f64], period: usize, alpha: f64) -> Vec<Option<f64>> {
    if period == 0 || values.len() < period {
        return vec![None; values.len()];
    }

    let seed = values[..period].iter().sum::<f64>() / period as f64;
    let mut out = vec![None; period - 1];
    out.push(Some(seed));

    let mut smoothed = seed;
    for &v in &values[period..] {
        smoothed = v * alpha + smoothed * (1.0 - alpha);
        out.push(Some(smoothed));
    }
    out
}
