//! Path metrics — policy-independent truth about a token's trajectory
//! after an alert (§3, glossary "Path metrics").

use super::Candle;
use crate::indexer::find_entry_index;
use serde::{Deserialize, Serialize};

/// Per-alert truth: peak multiple, hit flags/times for 2x/3x/4x, and
/// drawdowns, independent of any exit policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathMetrics {
    pub p0: f64,
    /// `max(high)/p0` over the horizon (entry candle through the last
    /// available candle).
    pub peak_multiple: f64,
    pub hit_2x: bool,
    pub t_2x_ms: Option<i64>,
    pub hit_3x: bool,
    pub t_3x_ms: Option<i64>,
    pub hit_4x: bool,
    pub t_4x_ms: Option<i64>,
    /// `10000 * (min(low) - p0) / p0` over the horizon — negative when the
    /// token ever traded below `p0` (same sign convention as
    /// `maxAdverseExcursionBps`, §4.4).
    pub dd_bps: f64,
    /// Same as `dd_bps` but restricted to `[alertTs, t_2x_ms)`; `None` if
    /// `hit_2x` is false (there is no such window).
    pub dd_to_2x_bps: Option<f64>,
    /// Milliseconds from the alert to the first candle at or after it;
    /// `None` if there is no candle after the alert.
    pub alert_to_activity_ms: Option<i64>,
}

impl PathMetrics {
    /// Compute path metrics for one alert over its full candle horizon.
    pub fn compute(candles: &[Candle], alert_ts_ms: i64, p0: f64) -> Self {
        let entry_idx = find_entry_index(candles, alert_ts_ms);

        let Some(entry_idx) = entry_idx else {
            return PathMetrics {
                p0,
                peak_multiple: f64::NAN,
                hit_2x: false,
                t_2x_ms: None,
                hit_3x: false,
                t_3x_ms: None,
                hit_4x: false,
                t_4x_ms: None,
                dd_bps: f64::NAN,
                dd_to_2x_bps: None,
                alert_to_activity_ms: None,
            };
        };

        let horizon = &candles[entry_idx..];
        let alert_to_activity_ms = Some(horizon[0].ts_ms - alert_ts_ms);

        let max_high = horizon
            .iter()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let min_low = horizon.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

        let peak_multiple = max_high / p0;
        let dd_bps = 10_000.0 * (min_low - p0) / p0;

        let t_2x_ms = time_to_multiple(horizon, p0, 2.0);
        let t_3x_ms = time_to_multiple(horizon, p0, 3.0);
        let t_4x_ms = time_to_multiple(horizon, p0, 4.0);

        let dd_to_2x_bps = t_2x_ms.map(|t2| {
            let window: Vec<Candle> = horizon
                .iter()
                .copied()
                .take_while(|c| c.ts_ms < t2)
                .collect();
            if window.is_empty() {
                0.0
            } else {
                let window_min_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
                10_000.0 * (window_min_low - p0) / p0
            }
        });

        PathMetrics {
            p0,
            peak_multiple,
            hit_2x: t_2x_ms.is_some(),
            t_2x_ms,
            hit_3x: t_3x_ms.is_some(),
            t_3x_ms,
            hit_4x: t_4x_ms.is_some(),
            t_4x_ms,
            dd_bps,
            dd_to_2x_bps,
            alert_to_activity_ms,
        }
    }
}

/// First candle timestamp (within `horizon`) where `high >= threshold * p0`.
fn time_to_multiple(horizon: &[Candle], p0: f64, threshold: f64) -> Option<i64> {
    horizon
        .iter()
        .find(|c| c.high >= threshold * p0)
        .map(|c| c.ts_ms)
}
