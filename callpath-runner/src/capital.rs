//! Capital-aware variant (§4.5 "Capital-aware variant") — sequential
//! deployment of a shared capital pool across alerts in `alertTsMs` order,
//! replacing the embarrassingly-parallel per-alert evaluation with a fold.
//!
//! Grounded in teacher's `sweep::ParamSweep::sweep_with_progress` sequential
//! path (same per-item loop shape, `parallel: false`), adapted to thread a
//! capital balance and open-position set through the fold instead of just
//! collecting independent results.

use serde::{Deserialize, Serialize};

use callpath_core::{execute, ExecutionParams, Policy, Trade};

use crate::corpus::CorpusEntry;

/// Capital pool sizing and concurrency rules (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalPolicyConfig {
    pub initial_capital: f64,
    /// Fraction of *currently available* capital committed to each new
    /// position.
    pub position_size_fraction: f64,
    pub max_concurrent_positions: usize,
}

struct OpenPosition {
    exit_ts_ms: i64,
    capital_returned: f64,
}

/// One alert's outcome in the capital-aware run: either a trade was taken,
/// or the alert was skipped for lack of capital or a concurrency-limit hit.
#[derive(Debug, Clone)]
pub enum AllocationOutcome {
    Traded(Trade),
    SkippedNoCapital,
    SkippedConcurrencyLimit,
}

#[derive(Debug, Clone)]
pub struct CapitalAwareResult {
    pub outcomes: Vec<(String, AllocationOutcome)>,
    pub ending_capital: f64,
}

impl CapitalAwareResult {
    pub fn trades(&self) -> Vec<&Trade> {
        self.outcomes
            .iter()
            .filter_map(|(_, outcome)| match outcome {
                AllocationOutcome::Traded(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn skipped_call_ids(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| !matches!(o, AllocationOutcome::Traded(_)))
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// Simulate sequential deployment of one shared capital pool over `entries`,
/// which must already be in `(alertTsMs, callId)` ascending order — see
/// `Corpus::sorted_by_alert_time` (§5 "Capital-aware simulation processes
/// alerts in strict alertTsMs ascending order; ties break by callId
/// lexicographic").
pub fn simulate_capital_aware(
    entries: &[&CorpusEntry],
    policy: &Policy,
    execution: &ExecutionParams,
    config: &CapitalPolicyConfig,
) -> CapitalAwareResult {
    let mut available_capital = config.initial_capital;
    let mut open_positions: Vec<OpenPosition> = Vec::new();
    let mut outcomes = Vec::with_capacity(entries.len());

    for entry in entries {
        release_matured(&mut open_positions, &mut available_capital, entry.alert.alert_ts_ms);

        if open_positions.len() >= config.max_concurrent_positions {
            outcomes.push((entry.alert.call_id.clone(), AllocationOutcome::SkippedConcurrencyLimit));
            continue;
        }

        let position_size = available_capital * config.position_size_fraction;
        if position_size <= 0.0 {
            outcomes.push((entry.alert.call_id.clone(), AllocationOutcome::SkippedNoCapital));
            continue;
        }

        available_capital -= position_size;
        let trade = execute(&entry.candles, &entry.alert, policy, execution);
        let capital_returned = position_size * (1.0 + trade.realized_return_bps / 10_000.0);
        open_positions.push(OpenPosition {
            exit_ts_ms: trade.exit_ts_ms,
            capital_returned,
        });
        outcomes.push((entry.alert.call_id.clone(), AllocationOutcome::Traded(trade)));
    }

    // Settle every position still open once the alert stream is exhausted.
    for position in open_positions.drain(..) {
        available_capital += position.capital_returned;
    }

    CapitalAwareResult {
        outcomes,
        ending_capital: available_capital,
    }
}

/// Return capital for every open position whose trade has already exited by
/// `as_of_ts_ms`, i.e. it no longer ties up the pool or a concurrency slot.
fn release_matured(open_positions: &mut Vec<OpenPosition>, available_capital: &mut f64, as_of_ts_ms: i64) {
    let mut i = 0;
    while i < open_positions.len() {
        if open_positions[i].exit_ts_ms <= as_of_ts_ms {
            let position = open_positions.swap_remove(i);
            *available_capital += position.capital_returned;
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callpath_core::{Alert, Candle, EntryRule};

    fn candle(ts_ms: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(ts_ms, open, high, low, close, 1.0)
    }

    fn m(i: i64) -> i64 {
        i * 60_000
    }

    fn entry(call_id: &str, alert_ts_ms: i64, candles: Vec<Candle>) -> CorpusEntry {
        let alert = Alert::new(call_id, "alice", "eth", "0xabc", alert_ts_ms, 1.0);
        CorpusEntry::new(alert, candles)
    }

    #[test]
    fn skips_when_concurrency_limit_reached() {
        let e1 = entry("c1", m(0), vec![candle(m(0), 1.0, 1.0, 1.0, 1.0), candle(m(100), 1.0, 1.0, 1.0, 1.0)]);
        let e2 = entry("c2", m(1), vec![candle(m(1), 1.0, 1.0, 1.0, 1.0), candle(m(101), 1.0, 1.0, 1.0, 1.0)]);
        let entries = vec![&e1, &e2];

        let policy = Policy::TimeStop { hold_ms: m(200) };
        let execution = ExecutionParams { entry_rule: EntryRule::CallTimeClose, lag_ms: 0, taker_fee_bps: 0.0, slippage_bps: 0.0 };
        let config = CapitalPolicyConfig {
            initial_capital: 1000.0,
            position_size_fraction: 1.0,
            max_concurrent_positions: 1,
        };

        let result = simulate_capital_aware(&entries, &policy, &execution, &config);
        assert!(matches!(result.outcomes[1].1, AllocationOutcome::SkippedConcurrencyLimit));
    }

    #[test]
    fn exited_position_frees_capital_for_next_alert() {
        let e1 = entry("c1", m(0), vec![candle(m(0), 1.0, 1.0, 1.0, 1.0), candle(m(1), 1.0, 1.0, 1.0, 1.0)]);
        let e2 = entry("c2", m(2), vec![candle(m(2), 1.0, 1.0, 1.0, 1.0), candle(m(3), 1.0, 1.0, 1.0, 1.0)]);
        let entries = vec![&e1, &e2];

        let policy = Policy::TimeStop { hold_ms: m(1) };
        let execution = ExecutionParams { entry_rule: EntryRule::CallTimeClose, lag_ms: 0, taker_fee_bps: 0.0, slippage_bps: 0.0 };
        let config = CapitalPolicyConfig {
            initial_capital: 1000.0,
            position_size_fraction: 1.0,
            max_concurrent_positions: 1,
        };

        let result = simulate_capital_aware(&entries, &policy, &execution, &config);
        assert!(matches!(result.outcomes[1].1, AllocationOutcome::Traded(_)));
    }

    #[test]
    fn no_capital_available_skips_alert() {
        let e1 = entry("c1", m(0), vec![candle(m(0), 1.0, 1.0, 1.0, 1.0), candle(m(100), 1.0, 1.0, 1.0, 1.0)]);
        let entries = vec![&e1];
        let policy = Policy::TimeStop { hold_ms: m(200) };
        let execution = ExecutionParams::default();
        let config = CapitalPolicyConfig {
            initial_capital: 0.0,
            position_size_fraction: 1.0,
            max_concurrent_positions: 10,
        };
        let result = simulate_capital_aware(&entries, &policy, &execution, &config);
        assert!(matches!(result.outcomes[0].1, AllocationOutcome::SkippedNoCapital));
    }
}
