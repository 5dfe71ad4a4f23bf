//! Trade — a policy-level round-trip outcome (§3, §4.4).

use super::fill::ExitReason;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_ts_ms: i64,
    pub entry_px: f64,
    pub exit_ts_ms: i64,
    pub exit_px: f64,
    pub exit_reason: ExitReason,
    pub realized_return_bps: f64,
    pub stop_out: bool,
    pub max_adverse_excursion_bps: f64,
    pub time_exposed_ms: i64,
    /// `exitPx / peakPrice` over the trade window (§9: denominator is the
    /// trade-window peak, not the full horizon — preserved as-is).
    pub tail_capture: f64,
}
