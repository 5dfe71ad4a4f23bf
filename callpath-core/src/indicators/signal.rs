//! Cross-event detection and indicator-exit evaluation (§4.2, §4.3 Step D).
//!
//! `IndicatorContext` precomputes every series an `IndicatorExitSpec`'s rules
//! reference exactly once per alert, so the simulator's per-candle loop never
//! recomputes an indicator — it only indexes into an already-built series.

use std::collections::HashMap;

use super::ema::ema_of_series;
use super::ichimoku::{ichimoku, IchimokuLines};
use super::rsi::rsi;
use super::sma::closes;
use super::volume::volume_zscore;
use crate::domain::{Candle, CrossDirection, IchimokuLine, IndicatorExitSpec, IndicatorMode, IndicatorRule};

pub struct IndicatorContext {
    closes: Vec<f64>,
    ema: HashMap<usize, Vec<f64>>,
    rsi: HashMap<usize, Vec<f64>>,
    volume: HashMap<usize, Vec<f64>>,
    ichimoku: Option<IchimokuLines>,
}

impl IndicatorContext {
    /// Precompute every series the spec's rules need.
    pub fn build(candles: &[Candle], spec: &IndicatorExitSpec) -> Self {
        let mut ema = HashMap::new();
        let mut rsi_cache = HashMap::new();
        let mut volume = HashMap::new();
        let mut needs_ichimoku = false;
        let values = closes(candles);

        for rule in &spec.rules {
            match rule {
                IndicatorRule::IchimokuCross { .. } => needs_ichimoku = true,
                IndicatorRule::EmaCross { fast_period, slow_period, .. } => {
                    ema.entry(*fast_period).or_insert_with(|| ema_of_series(&values, *fast_period));
                    ema.entry(*slow_period).or_insert_with(|| ema_of_series(&values, *slow_period));
                }
                IndicatorRule::RsiCross { period, .. } => {
                    rsi_cache.entry(*period).or_insert_with(|| rsi(candles, *period));
                }
                IndicatorRule::VolumeSpike { window, .. } => {
                    volume.entry(*window).or_insert_with(|| volume_zscore(candles, *window));
                }
            }
        }

        let ichimoku_lines = if needs_ichimoku { Some(ichimoku(candles)) } else { None };

        IndicatorContext {
            closes: values,
            ema,
            rsi: rsi_cache,
            volume,
            ichimoku: ichimoku_lines,
        }
    }

    /// Evaluate the spec's rules at bar `i` against bar `i - 1` (no crossing
    /// is possible at `i == 0`). Combines per §spec `mode`: `Any` fires if at
    /// least one rule crosses, `All` requires every rule to cross.
    pub fn check(&self, spec: &IndicatorExitSpec, i: usize) -> bool {
        if i == 0 {
            return false;
        }

        let mut results = spec.rules.iter().map(|rule| self.rule_crossed(rule, i));

        match spec.mode {
            IndicatorMode::Any => results.any(|fired| fired),
            IndicatorMode::All => results.all(|fired| fired),
        }
    }

    fn rule_crossed(&self, rule: &IndicatorRule, i: usize) -> bool {
        match rule {
            IndicatorRule::IchimokuCross { direction, line_a, line_b } => {
                let Some(lines) = &self.ichimoku else { return false };
                let a = self.ichimoku_series(lines, *line_a);
                let b = self.ichimoku_series(lines, *line_b);
                crossed(*direction, a[i - 1], b[i - 1], a[i], b[i])
            }
            IndicatorRule::EmaCross { direction, fast_period, slow_period } => {
                let fast = &self.ema[fast_period];
                let slow = &self.ema[slow_period];
                crossed(*direction, fast[i - 1], slow[i - 1], fast[i], slow[i])
            }
            IndicatorRule::RsiCross { direction, period, threshold } => {
                let series = &self.rsi[period];
                crossed(*direction, series[i - 1], *threshold, series[i], *threshold)
            }
            IndicatorRule::VolumeSpike { window, z_threshold } => {
                let series = &self.volume[window];
                !series[i].is_nan() && series[i] >= *z_threshold
            }
        }
    }

    fn ichimoku_series<'a>(&self, lines: &'a IchimokuLines, line: IchimokuLine) -> &'a [f64] {
        match line {
            IchimokuLine::Tenkan => &lines.tenkan,
            IchimokuLine::Kijun => &lines.kijun,
            IchimokuLine::SpanA => &lines.span_a,
            IchimokuLine::SpanB => &lines.span_b,
        }
    }

    pub fn close(&self, i: usize) -> f64 {
        self.closes[i]
    }
}

/// `crosses_above`: `a` was `<= b` and is now strictly `> b`.
/// `crosses_below`: `a` was `>= b` and is now strictly `< b`.
/// A `NaN` on either side of the comparison never registers as a cross.
fn crossed(direction: CrossDirection, prev_a: f64, prev_b: f64, cur_a: f64, cur_b: f64) -> bool {
    if [prev_a, prev_b, cur_a, cur_b].iter().any(|v| v.is_nan()) {
        return false;
    }
    match direction {
        CrossDirection::Above => prev_a <= prev_b && cur_a > cur_b,
        CrossDirection::Below => prev_a >= prev_b && cur_a < cur_b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, close: f64) -> Candle {
        Candle::new(ts, close, close, close, close, 1.0)
    }

    #[test]
    fn ema_cross_above_detected() {
        // Fast EMA starts below slow, then overtakes.
        let closes = [10.0, 10.0, 10.0, 10.0, 20.0, 25.0, 30.0];
        let candles: Vec<Candle> = closes.iter().enumerate().map(|(i, &c)| candle(i as i64 * 60_000, c)).collect();
        let spec = IndicatorExitSpec {
            rules: vec![IndicatorRule::EmaCross {
                direction: CrossDirection::Above,
                fast_period: 2,
                slow_period: 4,
            }],
            mode: IndicatorMode::Any,
        };
        let ctx = IndicatorContext::build(&candles, &spec);
        let fired: Vec<bool> = (0..candles.len()).map(|i| ctx.check(&spec, i)).collect();
        assert!(fired.iter().any(|&f| f));
    }

    #[test]
    fn no_cross_at_index_zero() {
        let candles: Vec<Candle> = (0..5).map(|i| candle(i * 60_000, 10.0)).collect();
        let spec = IndicatorExitSpec {
            rules: vec![IndicatorRule::RsiCross {
                direction: CrossDirection::Above,
                period: 2,
                threshold: 50.0,
            }],
            mode: IndicatorMode::Any,
        };
        let ctx = IndicatorContext::build(&candles, &spec);
        assert!(!ctx.check(&spec, 0));
    }

    #[test]
    fn all_mode_requires_every_rule() {
        let closes = [10.0, 10.0, 10.0, 10.0, 20.0, 25.0, 30.0];
        let candles: Vec<Candle> = closes.iter().enumerate().map(|(i, &c)| candle(i as i64 * 60_000, c)).collect();
        let spec = IndicatorExitSpec {
            rules: vec![
                IndicatorRule::EmaCross {
                    direction: CrossDirection::Above,
                    fast_period: 2,
                    slow_period: 4,
                },
                IndicatorRule::VolumeSpike { window: 3, z_threshold: 100.0 },
            ],
            mode: IndicatorMode::All,
        };
        let ctx = IndicatorContext::build(&candles, &spec);
        // VolumeSpike threshold is unreachable, so ALL mode never fires.
        assert!((0..candles.len()).all(|i| !ctx.check(&spec, i)));
    }
}
