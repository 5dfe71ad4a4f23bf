//! Volume z-score — detects a volume spike against a trailing rolling window.
//!
//! `z[i] = (volume[i] - mean(window)) / stddev(window)`, window is the
//! `window` candles strictly before `i`. `NaN` when stddev is zero or before
//! warmup (matches the NaN-for-undefined convention used throughout §4.2).

use crate::domain::Candle;

pub fn volume_zscore(candles: &[Candle], window: usize) -> Vec<f64> {
    let n = candles.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n <= window {
        return result;
    }

    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

    for i in window..n {
        let slice = &volumes[i - window..i];
        let mean: f64 = slice.iter().sum::<f64>() / window as f64;
        let variance: f64 = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window as f64;
        let stddev = variance.sqrt();
        if stddev > 0.0 {
            result[i] = (volumes[i] - mean) / stddev;
        }
    }

    result
}
