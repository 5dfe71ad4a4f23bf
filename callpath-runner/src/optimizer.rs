//! Optimizer (§4.5) — evaluates a parameter grid per caller over a corpus,
//! scores and ranks the constrained frontier.
//!
//! Grounded in teacher's `sweep::ParamSweep` (rayon-parallel grid evaluation,
//! `sweep_with_progress` callback) generalized from one flat sweep over
//! `RunConfig` to a per-caller sweep over `Policy` candidates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use callpath_core::{execute, ExecutionParams};

use crate::corpus::{Corpus, CorpusEntry};
use crate::frontier::{rank, Constraints, FrontierRow, TradeStats};
use crate::grid::ParamGrid;

/// Cooperative cancellation for an in-progress optimizer run (§5
/// "Cancellation"). Cheap to clone and check; does not interrupt an
/// in-flight candidate, only gates whether a *new* one starts.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The optimizer's result: a frontier per caller, and whether it's complete
/// or was cut short by the wall-clock budget or a cancellation (§5
/// "Timeouts"/"Cancellation").
#[derive(Debug, Clone)]
pub struct OptimizerOutcome {
    pub rows: Vec<FrontierRow>,
    pub partial: bool,
}

/// Evaluate `grid` over `corpus`, partitioned by caller, under `constraints`.
///
/// Parallelism: grid candidates within a caller evaluate concurrently
/// (rayon), and within each candidate every alert's trade is also evaluated
/// concurrently (§5 "the optimizer may parallelise (a) the outer grid sweep
/// and (b) within each candidate the per-alert evaluation").
pub fn optimize(
    corpus: &Corpus,
    grid: &ParamGrid,
    constraints: &Constraints,
    execution: &ExecutionParams,
    cancellation: &CancellationToken,
    wall_clock_budget: Option<Duration>,
) -> OptimizerOutcome {
    let started = Instant::now();
    let mut rows = Vec::new();
    let mut partial = false;

    for (caller_name, entries) in corpus.by_caller() {
        if cancellation.is_cancelled() {
            partial = true;
            break;
        }
        if budget_exhausted(started, wall_clock_budget) {
            partial = true;
            break;
        }

        let caller_rows: Vec<Option<FrontierRow>> = grid
            .candidates()
            .par_iter()
            .map(|candidate| {
                if cancellation.is_cancelled() || budget_exhausted(started, wall_clock_budget) {
                    return None;
                }

                let trades: Vec<_> = entries
                    .par_iter()
                    .map(|entry: &&CorpusEntry| execute(&entry.candles, &entry.alert, &candidate.policy, execution))
                    .collect();

                let stats = TradeStats::compute(&trades);
                let meets_constraints = stats.meets(constraints);
                let objective_score = stats.objective_score(constraints.objective);

                if !meets_constraints && stats.sample_size < constraints.min_sample_size {
                    tracing::warn!(
                        caller = caller_name,
                        grid_index = candidate.index,
                        sample_size = stats.sample_size,
                        "grid point below minimum sample size"
                    );
                }

                Some(FrontierRow {
                    caller_name: caller_name.to_string(),
                    grid_index: candidate.index,
                    policy: candidate.policy.clone(),
                    meets_constraints,
                    objective_score,
                    avg_return_bps: stats.avg_return_bps,
                    median_return_bps: stats.median_return_bps,
                    stop_out_rate: stats.stop_out_rate,
                    hit_rate: stats.hit_rate,
                    sample_size: stats.sample_size,
                    rank: None,
                })
            })
            .collect();

        let completed: Vec<FrontierRow> = caller_rows.into_iter().flatten().collect();
        if completed.len() < grid.len() {
            partial = true;
        }

        tracing::info!(caller = caller_name, candidates = completed.len(), "caller grid sweep complete");

        if completed.iter().all(|r| !r.meets_constraints) {
            tracing::warn!(caller = caller_name, "no grid candidate meets constraints");
        }

        rows.extend(completed);
    }

    rank_per_caller(&mut rows);

    OptimizerOutcome { rows, partial }
}

fn budget_exhausted(started: Instant, budget: Option<Duration>) -> bool {
    budget.map_or(false, |b| started.elapsed() >= b)
}

/// Rank is computed independently per caller — a top candidate for one
/// caller says nothing about another's frontier (§4.5 "emit a Frontier Row
/// per candidate" is scoped to "for each caller").
fn rank_per_caller(rows: &mut [FrontierRow]) {
    let mut callers: Vec<String> = rows.iter().map(|r| r.caller_name.clone()).collect();
    callers.sort();
    callers.dedup();

    for caller in callers {
        let mut indices: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.caller_name == caller)
            .map(|(i, _)| i)
            .collect();
        // `rank` only needs contiguous ordering within the caller's rows;
        // operate on a scratch copy and write results back by original index.
        let mut scratch: Vec<FrontierRow> = indices.iter().map(|&i| rows[i].clone()).collect();
        rank(&mut scratch);
        for (slot, &orig_idx) in indices.drain(..).enumerate() {
            rows[orig_idx].rank = scratch[slot].rank;
        }
    }
}
