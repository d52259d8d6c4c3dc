//! Indicator helpers — pure functions over price slices.
//!
//! Each function takes the full history up to and including the current bar
//! and returns `None` while the lookback window is not yet filled.

/// Simple moving average of the last `period` values ending at `offset` from
/// the end (0 = current bar, 1 = previous bar, ...).
pub fn sma(values: &[f64], period: usize, offset: usize) -> Option<f64> {
    if period == 0 || values.len() < period + offset {
        return None;
    }
    let end = values.len() - offset;
    let window = &values[end - period..end];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Smoothed (Wilder) moving average over the whole series.
///
/// Seeds with the SMA of the first `period` values, then
/// `smma = (prev * (period - 1) + value) / period`. Returns the value at
/// `offset` bars back from the end.
pub fn smoothed_ma(values: &[f64], period: usize, offset: usize) -> Option<f64> {
    if period == 0 || values.len() < period + offset {
        return None;
    }
    let mut smma = values[..period].iter().sum::<f64>() / period as f64;
    let target = values.len() - 1 - offset;
    if target < period - 1 {
        return None;
    }
    for &v in &values[period..=target] {
        smma = (smma * (period as f64 - 1.0) + v) / period as f64;
    }
    Some(smma)
}

/// Relative Strength Index over the last `period` changes.
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }
    let changes: Vec<f64> = values[values.len() - period - 1..]
        .windows(2)
        .map(|w| w[1] - w[0])
        .collect();
    let gain: f64 = changes.iter().filter(|&&c| c > 0.0).sum::<f64>() / period as f64;
    let loss: f64 = -changes.iter().filter(|&&c| c < 0.0).sum::<f64>() / period as f64;
    if loss < 1e-15 {
        return Some(100.0);
    }
    let rs = gain / loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Least-squares regression line over the last `lookback` values.
///
/// Returns `(slope, intercept)` with x = 0..lookback; the fitted value at
/// the current bar is `slope * (lookback - 1) + intercept`.
pub fn linear_regression(values: &[f64], lookback: usize) -> Option<(f64, f64)> {
    if lookback < 2 || values.len() < lookback {
        return None;
    }
    let window = &values[values.len() - lookback..];
    let n = lookback as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = window.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &y) in window.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }
    if sxx < 1e-15 {
        return None;
    }
    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    Some((slope, intercept))
}
