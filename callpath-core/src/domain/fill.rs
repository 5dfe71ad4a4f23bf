//! Fill — a partial or full exit executed by the simulator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a fill (or a whole-result short-circuit) occurred.
///
/// `TakeProfit` carries the ladder level's label (e.g. `"2x"`, `"150pct"`)
/// so the wire reason renders as `tp_2x` per §3/§8 S1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExitReason {
    TakeProfit(String),
    TrailingStop,
    StopLoss,
    Timeout,
    IndicatorExit,
    /// No fill has occurred yet / the result carries no fills.
    NoExit,
    /// The candle indexer found no candle at or after `entry_ts_ms`.
    NoCandlesAfterEntry,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::TakeProfit(label) => write!(f, "tp_{label}"),
            ExitReason::TrailingStop => write!(f, "trailing_stop"),
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::Timeout => write!(f, "timeout"),
            ExitReason::IndicatorExit => write!(f, "indicator_exit"),
            ExitReason::NoExit => write!(f, "no_exit"),
            ExitReason::NoCandlesAfterEntry => write!(f, "no_candles_after_entry"),
        }
    }
}

impl ExitReason {
    /// A stop-out per §4.4/glossary: exit reason is `stop_loss` or `trailing_stop`.
    pub fn is_stop_out(&self) -> bool {
        matches!(self, ExitReason::StopLoss | ExitReason::TrailingStop)
    }
}

/// A partial or full exit fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub ts_ms: i64,
    /// Net price after slippage and taker fee (§3, §4.3 "Friction").
    pub net_px: f64,
    pub fraction: f64,
    pub reason: ExitReason,
}

impl Fill {
    pub fn new(ts_ms: i64, net_px: f64, fraction: f64, reason: ExitReason) -> Self {
        Self {
            ts_ms,
            net_px,
            fraction,
            reason,
        }
    }
}

/// Result of simulating one alert's exit path against one candle sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitSimResult {
    pub fills: Vec<Fill>,
    pub exit_ts_ms: i64,
    /// Size-weighted mean fill price. `NaN` iff `fills` is empty (§3, §6.4).
    pub exit_px_vwap: f64,
    pub exit_reason: ExitReason,
    pub remaining_fraction: f64,
}

impl ExitSimResult {
    /// The short-circuit result for "no candle at or after entry" (§4.1).
    pub fn no_candles_after_entry(entry_ts_ms: i64) -> Self {
        Self {
            fills: Vec::new(),
            exit_ts_ms: entry_ts_ms,
            exit_px_vwap: f64::NAN,
            exit_reason: ExitReason::NoCandlesAfterEntry,
            remaining_fraction: 1.0,
        }
    }
}
