//! Simple Moving Average — mean of the last `n` closes. `NaN` before warmup.

use crate::domain::Candle;

pub fn sma(candles: &[Candle], period: usize) -> Vec<f64> {
    sma_of_series(&closes(candles), period)
}

pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut window_sum: f64 = values[..period].iter().sum();
    result[period - 1] = window_sum / period as f64;
    for i in period..n {
        window_sum += values[i] - values[i - period];
        result[i] = window_sum / period as f64;
    }
    result
}

pub(crate) fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}
