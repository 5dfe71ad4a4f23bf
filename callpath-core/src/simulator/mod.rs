//! Exit Plan Simulator (§4.3) — the core, per-alert backtest loop.
//!
//! Pure and referentially transparent: no shared mutable state, no
//! suspension points. Consumes one candle slice, an entry, and a validated
//! `ExitPlan`; emits partial fills with reason codes and a remaining
//! unfilled fraction. Grounded in the teacher's
//! `engine/execution/trigger.rs` (bar-range trigger checks) and
//! `engine/execution/cost_model.rs` (friction application at fill time).

use crate::domain::{
    Candle, ExitPlan, ExitReason, ExitSimResult, Fill, ResolvedIntrabarPolicy, TrailingBlock,
};
use crate::indexer::find_entry_index;
use crate::indicators::IndicatorContext;

/// Mutable state threaded through the per-candle loop (§4.3 "State").
struct SimState {
    remaining: f64,
    ladder_cursor: usize,
    trail_active: bool,
    peak: f64,
    fills: Vec<Fill>,
}

impl SimState {
    fn new(p0: f64) -> Self {
        SimState {
            remaining: 1.0,
            ladder_cursor: 0,
            trail_active: false,
            peak: p0,
            fills: Vec::new(),
        }
    }
}

/// Run the simulator for one alert against one candle sequence.
///
/// `candles` must be strictly ascending by `ts_ms` (§4.1 assumes this; the
/// caller validates it, the simulator does not re-check).
pub fn simulate(
    candles: &[Candle],
    entry_ts_ms: i64,
    p0: f64,
    plan: &ExitPlan,
    taker_fee_bps: f64,
    slippage_bps: f64,
) -> ExitSimResult {
    let Some(entry_idx) = find_entry_index(candles, entry_ts_ms) else {
        tracing::debug!(entry_ts_ms, "no candle at or after entry, short-circuiting");
        return ExitSimResult::no_candles_after_entry(entry_ts_ms);
    };

    let entry_candle_ts_ms = candles[entry_idx].ts_ms;
    let indicator_ctx = plan.indicator.as_ref().map(|spec| (spec, IndicatorContext::build(candles, spec)));

    let mut state = SimState::new(p0);

    'outer: for i in entry_idx..candles.len() {
        let candle = &candles[i];

        // Step A — timeout.
        if let Some(max_hold_ms) = plan.max_hold_ms {
            if candle.ts_ms - entry_candle_ts_ms >= max_hold_ms {
                push_full_fill(&mut state, candle.ts_ms, candle.close, ExitReason::Timeout, taker_fee_bps, slippage_bps);
                break 'outer;
            }
        }

        // Step B/C — trailing update, stop check, and ladder fills. Ordering
        // between the stop check and the ladder is gated by intrabar policy
        // (§4.3's ordering decision table); with no trailing block configured
        // there is nothing to order against, so the ladder just runs.
        let resolved_policy = plan.trailing.as_ref().map(|t| t.intrabar_policy.resolved());

        if resolved_policy == Some(ResolvedIntrabarPolicy::StopFirst) {
            let trailing = plan.trailing.as_ref().unwrap();
            if check_stops(&mut state, trailing, candle, p0, taker_fee_bps, slippage_bps) {
                break 'outer;
            }
            activate_and_update_peak(&mut state, trailing, candle, p0);
            if fill_ladder(&mut state, plan, candle, p0, taker_fee_bps, slippage_bps) {
                break 'outer;
            }
        } else if resolved_policy == Some(ResolvedIntrabarPolicy::TpFirst) {
            let trailing = plan.trailing.as_ref().unwrap();
            activate_and_update_peak(&mut state, trailing, candle, p0);
            if fill_ladder(&mut state, plan, candle, p0, taker_fee_bps, slippage_bps) {
                break 'outer;
            }
            if check_stops(&mut state, trailing, candle, p0, taker_fee_bps, slippage_bps) {
                break 'outer;
            }
        } else if fill_ladder(&mut state, plan, candle, p0, taker_fee_bps, slippage_bps) {
            break 'outer;
        }

        // Step D — indicator exit.
        if let Some((spec, ctx)) = &indicator_ctx {
            let held_candles = (i - entry_idx) as u32;
            if held_candles >= plan.min_hold_candles_for_indicator && ctx.check(spec, i) {
                push_full_fill(&mut state, candle.ts_ms, candle.close, ExitReason::IndicatorExit, taker_fee_bps, slippage_bps);
                break 'outer;
            }
        }

        if state.remaining <= 0.0 {
            break 'outer;
        }
    }

    finalize(state, entry_ts_ms)
}

/// Check hard stop (strictly before trailing stop) against `candle.low`.
/// Returns `true` if a stop fired and consumed the full remaining fraction.
fn check_stops(
    state: &mut SimState,
    trailing: &TrailingBlock,
    candle: &Candle,
    p0: f64,
    taker_fee_bps: f64,
    slippage_bps: f64,
) -> bool {
    if let Some(hard_stop_bps) = trailing.hard_stop_bps {
        let hard_stop_px = p0 * (1.0 - hard_stop_bps / 10_000.0);
        if candle.low <= hard_stop_px {
            push_full_fill(state, candle.ts_ms, hard_stop_px, ExitReason::StopLoss, taker_fee_bps, slippage_bps);
            return true;
        }
    }

    if state.trail_active {
        let trailing_stop_px = state.peak * (1.0 - trailing.trail_bps / 10_000.0);
        if candle.low <= trailing_stop_px {
            push_full_fill(state, candle.ts_ms, trailing_stop_px, ExitReason::TrailingStop, taker_fee_bps, slippage_bps);
            return true;
        }
    }

    false
}

/// Activate trailing (if not yet active and the activation threshold is
/// crossed by `candle.high`, or immediately if no activation is configured)
/// and advance the peak.
fn activate_and_update_peak(state: &mut SimState, trailing: &TrailingBlock, candle: &Candle, p0: f64) {
    if !state.trail_active {
        let should_activate = match &trailing.activation {
            None => true,
            Some(activation) => candle.high >= activation.threshold_px(p0),
        };
        if should_activate {
            state.trail_active = true;
        }
    }
    if state.trail_active {
        state.peak = state.peak.max(candle.high);
    }
}

/// Fill any ladder levels reached by `candle.high`. Returns `true` if the
/// remaining fraction was fully consumed.
fn fill_ladder(state: &mut SimState, plan: &ExitPlan, candle: &Candle, p0: f64, taker_fee_bps: f64, slippage_bps: f64) -> bool {
    while state.ladder_cursor < plan.ladder.len() {
        let level = &plan.ladder[state.ladder_cursor];
        let target_px = level.target_px(p0);
        if candle.high < target_px {
            break;
        }
        let fraction = level.fraction.min(state.remaining);
        push_fill(state, candle.ts_ms, target_px, fraction, ExitReason::TakeProfit(level.label.clone()), taker_fee_bps, slippage_bps);
        state.ladder_cursor += 1;
        if state.remaining <= 0.0 {
            return true;
        }
    }
    false
}

fn push_full_fill(state: &mut SimState, ts_ms: i64, raw_px: f64, reason: ExitReason, taker_fee_bps: f64, slippage_bps: f64) {
    let fraction = state.remaining;
    push_fill(state, ts_ms, raw_px, fraction, reason, taker_fee_bps, slippage_bps);
}

fn push_fill(state: &mut SimState, ts_ms: i64, raw_px: f64, fraction: f64, reason: ExitReason, taker_fee_bps: f64, slippage_bps: f64) {
    let net_px = apply_friction(raw_px, slippage_bps, taker_fee_bps);
    state.fills.push(Fill::new(ts_ms, net_px, fraction, reason));
    state.remaining -= fraction;
}

/// `rawPx * (1 - slippage_bps/10000) * (1 - taker_fee_bps/10000)` (§4.3 "Friction").
fn apply_friction(raw_px: f64, slippage_bps: f64, taker_fee_bps: f64) -> f64 {
    raw_px * (1.0 - slippage_bps / 10_000.0) * (1.0 - taker_fee_bps / 10_000.0)
}

fn finalize(state: SimState, entry_ts_ms: i64) -> ExitSimResult {
    let remaining_fraction = state.remaining.max(0.0);
    if state.fills.is_empty() {
        return ExitSimResult {
            fills: Vec::new(),
            exit_ts_ms: entry_ts_ms,
            exit_px_vwap: f64::NAN,
            exit_reason: ExitReason::NoExit,
            remaining_fraction,
        };
    }

    let weighted_sum: f64 = state.fills.iter().map(|f| f.net_px * f.fraction).sum();
    let fraction_sum: f64 = state.fills.iter().map(|f| f.fraction).sum();
    let exit_px_vwap = if fraction_sum > 0.0 { weighted_sum / fraction_sum } else { f64::NAN };

    let last = state.fills.last().unwrap();
    ExitSimResult {
        exit_ts_ms: last.ts_ms,
        exit_reason: last.reason.clone(),
        fills: state.fills,
        exit_px_vwap,
        remaining_fraction,
    }
}
