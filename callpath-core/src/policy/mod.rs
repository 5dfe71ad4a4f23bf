//! Policy Executor (§4.4) — the thin strategic layer over the simulator.
//!
//! Resolves an alert's entry price under an `EntryRule`, runs the simulator
//! against the policy's derived exit plan, and reduces the result to a
//! single `Trade` outcome. Grounded in the teacher's
//! `engine/trade_extraction.rs` (fills + bar data → trade record, MAE walked
//! over the bar window between entry and exit).

use crate::domain::{Alert, Candle, EntryRule, ExitReason, Policy, Trade};
use crate::indexer::find_entry_index;
use crate::simulator::simulate;

/// Parameters that are constant across a batch of alerts for one policy
/// evaluation (entry timing and friction), as opposed to `Policy` itself,
/// which varies per grid candidate.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionParams {
    pub entry_rule: EntryRule,
    pub lag_ms: i64,
    pub taker_fee_bps: f64,
    pub slippage_bps: f64,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        ExecutionParams {
            entry_rule: EntryRule::NextCandleOpen,
            lag_ms: 0,
            taker_fee_bps: 0.0,
            slippage_bps: 0.0,
        }
    }
}

/// Evaluate one alert under one policy, producing a single trade outcome.
pub fn execute(candles: &[Candle], alert: &Alert, policy: &Policy, params: &ExecutionParams) -> Trade {
    let entry_ts_ms = alert.alert_ts_ms + params.lag_ms;
    let entry_idx = find_entry_index(candles, entry_ts_ms);
    let entry_px = resolve_entry_price(candles, alert, entry_idx, params.entry_rule);

    let exit_plan = policy.to_exit_plan();
    let sim_result = simulate(
        candles,
        entry_ts_ms,
        entry_px,
        &exit_plan,
        params.taker_fee_bps,
        params.slippage_bps,
    );

    let exit_px = if sim_result.fills.is_empty() {
        candles.last().map(|c| c.close).unwrap_or(entry_px)
    } else {
        sim_result.exit_px_vwap
    };

    let realized_return_bps = 10_000.0 * (exit_px - entry_px) / entry_px;
    let stop_out = sim_result.exit_reason.is_stop_out();
    let time_exposed_ms = sim_result.exit_ts_ms - entry_ts_ms;

    let (max_adverse_excursion_bps, tail_capture) =
        window_extremes(candles, entry_idx, sim_result.exit_ts_ms, entry_px, exit_px);

    Trade {
        entry_ts_ms,
        entry_px,
        exit_ts_ms: sim_result.exit_ts_ms,
        exit_px,
        exit_reason: sim_result.exit_reason,
        realized_return_bps,
        stop_out,
        max_adverse_excursion_bps,
        time_exposed_ms,
        tail_capture,
    }
}

/// `entryTsMs`/`entryPx` selection per §4.4: `next_candle_open`/`next_candle_close`
/// read the entry candle (the one the lagged timestamp indexes into);
/// `call_time_close` instead reads the close of the candle at the alert's own
/// timestamp (ignoring lag). Falls back to `alert_price` when no candle
/// covers the relevant timestamp at all.
fn resolve_entry_price(candles: &[Candle], alert: &Alert, entry_idx: Option<usize>, entry_rule: EntryRule) -> f64 {
    match entry_rule {
        EntryRule::NextCandleOpen => entry_idx.and_then(|i| candles.get(i)).map(|c| c.open),
        EntryRule::NextCandleClose => entry_idx.and_then(|i| candles.get(i)).map(|c| c.close),
        EntryRule::CallTimeClose => find_entry_index(candles, alert.alert_ts_ms)
            .and_then(|i| candles.get(i))
            .map(|c| c.close),
    }
    .unwrap_or(alert.alert_price)
}

/// Walk the candle window `[entryIdx, exit_ts_ms]` for
/// `maxAdverseExcursionBps` (§4.4), and `[entryIdx, end]` for `tailCapture`'s
/// peak denominator — the window is deliberately the *whole remaining
/// series*, not just up to the exit, matching the documented behavior this
/// component's origin carries forward (§9).
fn window_extremes(
    candles: &[Candle],
    entry_idx: Option<usize>,
    exit_ts_ms: i64,
    entry_px: f64,
    exit_px: f64,
) -> (f64, f64) {
    let Some(start) = entry_idx else {
        return (0.0, 1.0);
    };
    if start >= candles.len() {
        return (0.0, 1.0);
    }

    let mut min_low = f64::INFINITY;
    let mut max_high = f64::NEG_INFINITY;
    for candle in &candles[start..] {
        if candle.ts_ms <= exit_ts_ms {
            min_low = min_low.min(candle.low);
        }
        max_high = max_high.max(candle.high);
    }

    let mae_bps = if min_low.is_finite() {
        10_000.0 * (min_low - entry_px) / entry_px
    } else {
        0.0
    };
    let tail_capture = if max_high.is_finite() && max_high > 0.0 {
        exit_px / max_high
    } else {
        1.0
    };

    (mae_bps, tail_capture)
}

/// `true` for `stop_loss`/`trailing_stop` exit reasons (§4.4/glossary
/// "stop-out").
trait IsStopOut {
    fn is_stop_out(&self) -> bool;
}

impl IsStopOut for ExitReason {
    fn is_stop_out(&self) -> bool {
        ExitReason::is_stop_out(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Policy;

    fn candle(ts_ms: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(ts_ms, open, high, low, close, 1.0)
    }

    fn m(i: i64) -> i64 {
        i * 60_000
    }

    fn alert(alert_ts_ms: i64, alert_price: f64) -> Alert {
        Alert::new("call-1", "caller", "eth", "0xabc", alert_ts_ms, alert_price)
    }

    #[test]
    fn next_candle_open_is_default_entry_rule() {
        let candles = vec![
            candle(m(0), 100.0, 100.0, 100.0, 100.0),
            candle(m(1), 105.0, 110.0, 95.0, 108.0),
        ];
        let policy = Policy::TimeStop { hold_ms: m(5) };
        let params = ExecutionParams::default();
        let trade = execute(&candles, &alert(m(1), 100.0), &policy, &params);
        assert_eq!(trade.entry_px, 105.0);
    }

    #[test]
    fn call_time_close_reads_alert_candle_not_entry_candle() {
        let candles = vec![
            candle(m(0), 100.0, 100.0, 100.0, 97.0),
            candle(m(1), 105.0, 110.0, 95.0, 108.0),
        ];
        let policy = Policy::TimeStop { hold_ms: m(5) };
        let params = ExecutionParams {
            entry_rule: EntryRule::CallTimeClose,
            ..Default::default()
        };
        let trade = execute(&candles, &alert(m(0), 100.0), &policy, &params);
        assert_eq!(trade.entry_px, 97.0);
    }

    #[test]
    fn stop_loss_trade_is_flagged_stop_out() {
        let candles = vec![
            candle(m(0), 100.0, 100.0, 100.0, 100.0),
            candle(m(1), 100.0, 101.0, 85.0, 90.0),
        ];
        let policy = Policy::FixedStop { stop_pct: 0.1, take_profit_pct: None };
        let params = ExecutionParams::default();
        let trade = execute(&candles, &alert(m(0), 100.0), &policy, &params);
        assert!(trade.stop_out);
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
    }

    #[test]
    fn unfilled_at_horizon_exits_at_last_close() {
        let candles = vec![
            candle(m(0), 100.0, 100.0, 100.0, 100.0),
            candle(m(1), 100.0, 101.0, 99.0, 102.0),
        ];
        let policy = Policy::TimeStop { hold_ms: m(100) };
        let params = ExecutionParams::default();
        let trade = execute(&candles, &alert(m(0), 100.0), &policy, &params);
        assert_eq!(trade.exit_px, 102.0);
    }
}
