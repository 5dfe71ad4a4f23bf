//! Top-level orchestration entry point (§7 "optimizer-level orchestration
//! returns `anyhow::Result`"), grounded in teacher's `runner::run_single_backtest`
//! — one function that wires config, grid construction, and the worker pool
//! together for a caller that just wants to run the whole thing.

use std::time::Duration;

use anyhow::Context;

use crate::config::OptimizerConfig;
use crate::corpus::Corpus;
use crate::optimizer::{optimize, CancellationToken, OptimizerOutcome};

/// Run one full optimization: validate `config.candidates` into a grid,
/// resolve constraints/execution/capital settings, size the worker pool,
/// and sweep `corpus`.
///
/// Validation failures (malformed policy candidates, bad TOML if the config
/// arrived that way) surface as the specific `ConfigError` via `anyhow`'s
/// context chain; everything else the sweep itself can produce (partial
/// results from cancellation or a budget) is reported in the returned
/// `OptimizerOutcome`, not as an error (§7 "data deficiency").
pub fn run_optimization(
    config: &OptimizerConfig,
    corpus: &Corpus,
    cancellation: &CancellationToken,
) -> anyhow::Result<OptimizerOutcome> {
    let grid = config.build_grid().context("optimizer config has an invalid policy candidate")?;
    let constraints = config.constraints.into();
    let execution = config.execution.into();
    let wall_clock_budget = config.wall_clock_budget_ms.map(Duration::from_millis);

    let started_at = chrono::Utc::now();
    tracing::info!(
        %started_at,
        candidates = grid.len(),
        alerts = corpus.len(),
        config_hash = %config.config_hash(),
        "optimizer run starting"
    );

    let outcome = match config.workers {
        Some(workers) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .context("failed to build optimizer worker pool")?;
            pool.install(|| optimize(corpus, &grid, &constraints, &execution, cancellation, wall_clock_budget))
        }
        None => optimize(corpus, &grid, &constraints, &execution, cancellation, wall_clock_budget),
    };

    let elapsed = chrono::Utc::now().signed_duration_since(started_at);
    tracing::info!(
        rows = outcome.rows.len(),
        partial = outcome.partial,
        elapsed_ms = elapsed.num_milliseconds(),
        "optimizer run finished"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConstraintsConfig, EntryRuleConfig, ExecutionConfigWire};
    use crate::corpus::CorpusEntry;
    use crate::frontier::Objective;
    use callpath_core::{Alert, Candle, PolicyWire};

    fn candle(ts_ms: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(ts_ms, open, high, low, close, 1.0)
    }

    fn sample_corpus() -> Corpus {
        Corpus::new(vec![CorpusEntry::new(
            Alert::new("c1", "alice", "eth", "0xabc", 0, 1.0),
            vec![candle(0, 1.0, 1.0, 1.0, 1.0), candle(60_000, 1.0, 1.2, 1.0, 1.2)],
        )])
    }

    fn sample_config() -> OptimizerConfig {
        OptimizerConfig {
            candidates: vec![
                PolicyWire::FixedStop { stop_pct: 0.1, take_profit_pct: None },
                PolicyWire::FixedStop { stop_pct: 0.2, take_profit_pct: None },
            ],
            constraints: ConstraintsConfig {
                min_sample_size: 1,
                max_stop_out_rate: 1.0,
                min_hit_rate: None,
                objective: Objective::AvgReturn,
            },
            execution: ExecutionConfigWire {
                entry_rule: EntryRuleConfig::NextCandleOpen,
                lag_ms: 0,
                taker_fee_bps: 0.0,
                slippage_bps: 0.0,
            },
            workers: Some(2),
            wall_clock_budget_ms: None,
            capital_aware: None,
        }
    }

    #[test]
    fn runs_end_to_end_with_a_sized_worker_pool() {
        let outcome = run_optimization(&sample_config(), &sample_corpus(), &CancellationToken::new()).unwrap();
        assert!(!outcome.partial);
        assert_eq!(outcome.rows.len(), 2);
    }

    #[test]
    fn invalid_candidate_surfaces_as_an_error() {
        let mut config = sample_config();
        config.candidates.push(PolicyWire::FixedStop { stop_pct: 2.0, take_profit_pct: None });
        let result = run_optimization(&config, &sample_corpus(), &CancellationToken::new());
        assert!(result.is_err());
    }
}
