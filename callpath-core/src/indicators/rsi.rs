//! Relative Strength Index — Wilder smoothing of gains/losses (§4.2).
//!
//! `RSI = 100 - 100 / (1 + avg_gain / avg_loss)`. `avg_loss == 0` → RSI=100;
//! `avg_gain == 0` → RSI=0 (and both zero → 50, "no movement").

use crate::domain::Candle;

pub fn rsi(candles: &[Candle], period: usize) -> Vec<f64> {
    let n = candles.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return result;
    }

    let changes: Vec<f64> = (1..n)
        .map(|i| candles[i].close - candles[i - 1].close)
        .collect();

    let mut avg_gain: f64 = changes[..period].iter().filter(|&&c| c > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss: f64 =
        changes[..period].iter().filter(|&&c| c < 0.0).map(|c| -c).sum::<f64>() / period as f64;

    result[period] = compute_rsi(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;
    for i in period..changes.len() {
        let change = changes[i];
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        result[i + 1] = compute_rsi(avg_gain, avg_loss);
    }

    result
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
