//! Ichimoku cloud lines (§4.2).
//!
//! `tenkan = (9-bar high+low)/2`, `kijun = (26-bar high+low)/2`,
//! `span_a = (tenkan+kijun)/2` (unshifted), `span_b = (52-bar high+low)/2`
//! (unshifted). No forward displacement — the simulator only needs the
//! current-bar line values for crossover detection, not the plotted cloud.

use crate::domain::Candle;

#[derive(Debug, Clone, PartialEq)]
pub struct IchimokuLines {
    pub tenkan: Vec<f64>,
    pub kijun: Vec<f64>,
    pub span_a: Vec<f64>,
    pub span_b: Vec<f64>,
}

pub fn ichimoku(candles: &[Candle]) -> IchimokuLines {
    let tenkan = mid_of_highest_lowest(candles, 9);
    let kijun = mid_of_highest_lowest(candles, 26);
    let span_b = mid_of_highest_lowest(candles, 52);

    let n = candles.len();
    let mut span_a = vec![f64::NAN; n];
    for i in 0..n {
        if !tenkan[i].is_nan() && !kijun[i].is_nan() {
            span_a[i] = (tenkan[i] + kijun[i]) / 2.0;
        }
    }

    IchimokuLines { tenkan, kijun, span_a, span_b }
}

fn mid_of_highest_lowest(candles: &[Candle], period: usize) -> Vec<f64> {
    let n = candles.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        let window = &candles[i + 1 - period..=i];
        let hi = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let lo = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        result[i] = (hi + lo) / 2.0;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, h: f64, l: f64, c: f64) -> Candle {
        Candle::new(ts, c, h, l, c, 1.0)
    }

    #[test]
    fn tenkan_is_9_bar_midpoint() {
        let mut candles = Vec::new();
        for i in 0..9 {
            candles.push(candle(i * 60_000, 10.0 + i as f64, 5.0, 7.0));
        }
        let lines = ichimoku(&candles);
        assert!((lines.tenkan[8] - (18.0 + 5.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn short_series_is_all_nan() {
        let candles: Vec<Candle> = (0..5).map(|i| candle(i * 60_000, 10.0, 5.0, 7.0)).collect();
        let lines = ichimoku(&candles);
        assert!(lines.tenkan.iter().all(|v| v.is_nan()));
        assert!(lines.span_b.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn span_a_depends_on_both_tenkan_and_kijun() {
        let candles: Vec<Candle> = (0..30).map(|i| candle(i * 60_000, 10.0, 5.0, 7.0)).collect();
        let lines = ichimoku(&candles);
        assert!(!lines.span_a[29].is_nan());
    }
}
