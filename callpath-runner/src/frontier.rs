//! Frontier — per-caller constraint checking, objective scoring, and stable
//! ranking of grid candidates (§3 "Frontier Row", §4.5 "Algorithm").

use serde::{Deserialize, Serialize};

use callpath_core::{Policy, Trade};

/// Which summary statistic the optimizer ranks candidates by (§4.5 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    AvgReturn,
    MedianReturn,
    RiskAdjusted,
}

/// Gating rules a candidate must clear to be ranked (§4.5 "constraints").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub min_sample_size: usize,
    pub max_stop_out_rate: f64,
    pub min_hit_rate: Option<f64>,
    pub objective: Objective,
}

impl Default for Constraints {
    fn default() -> Self {
        Constraints {
            min_sample_size: 1,
            max_stop_out_rate: 1.0,
            min_hit_rate: None,
            objective: Objective::AvgReturn,
        }
    }
}

/// One grid candidate's outcome for one caller (§3 "Frontier Row").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierRow {
    pub caller_name: String,
    pub grid_index: usize,
    pub policy: Policy,
    pub meets_constraints: bool,
    pub objective_score: f64,
    pub avg_return_bps: f64,
    pub median_return_bps: f64,
    pub stop_out_rate: f64,
    pub hit_rate: f64,
    pub sample_size: usize,
    pub rank: Option<usize>,
}

/// Summary statistics over one candidate's trades, before constraints or
/// ranking are applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeStats {
    pub avg_return_bps: f64,
    pub median_return_bps: f64,
    pub stop_out_rate: f64,
    /// Fraction of trades with a positive realized return — the policy-level
    /// analogue of path metrics' `hit_2x`/`hit_3x` flags, scoped to whatever
    /// "profitable" means once friction is applied (§4.5's `minHitRate` is
    /// silent on the exact definition; this is the natural reading).
    pub hit_rate: f64,
    pub sample_size: usize,
}

impl TradeStats {
    pub fn compute(trades: &[Trade]) -> Self {
        let sample_size = trades.len();
        if sample_size == 0 {
            return TradeStats {
                avg_return_bps: 0.0,
                median_return_bps: 0.0,
                stop_out_rate: 0.0,
                hit_rate: 0.0,
                sample_size: 0,
            };
        }

        let sum: f64 = trades.iter().map(|t| t.realized_return_bps).sum();
        let avg_return_bps = sum / sample_size as f64;

        let mut returns: Vec<f64> = trades.iter().map(|t| t.realized_return_bps).collect();
        returns.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median_return_bps = median(&returns);

        let stop_outs = trades.iter().filter(|t| t.stop_out).count();
        let stop_out_rate = stop_outs as f64 / sample_size as f64;

        let hits = trades.iter().filter(|t| t.realized_return_bps > 0.0).count();
        let hit_rate = hits as f64 / sample_size as f64;

        TradeStats {
            avg_return_bps,
            median_return_bps,
            stop_out_rate,
            hit_rate,
            sample_size,
        }
    }

    /// `meetsConstraints = (sampleSize >= minSampleSize) AND (stopOutRate <=
    /// maxStopOutRate) AND (hitRate >= minHitRate if specified)` (§4.5 step 3).
    pub fn meets(&self, constraints: &Constraints) -> bool {
        self.sample_size >= constraints.min_sample_size
            && self.stop_out_rate <= constraints.max_stop_out_rate
            && constraints
                .min_hit_rate
                .map_or(true, |min| self.hit_rate >= min)
    }

    /// §4.5 step 4's three objective modes.
    pub fn objective_score(&self, objective: Objective) -> f64 {
        match objective {
            Objective::AvgReturn => self.avg_return_bps,
            Objective::MedianReturn => self.median_return_bps,
            Objective::RiskAdjusted => self.avg_return_bps / (self.stop_out_rate * 10_000.0).max(1.0),
        }
    }
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Rank the constrained subset of `rows` descending by `objective_score`,
/// tie-breaking by ascending `grid_index` (§5 "Ordering guarantees": stable,
/// deterministic under permutation once re-sorted — §8 property 8).
/// Rows that don't meet constraints keep `rank = None`.
pub fn rank(rows: &mut [FrontierRow]) {
    let mut constrained_indices: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| r.meets_constraints)
        .map(|(i, _)| i)
        .collect();

    constrained_indices.sort_by(|&a, &b| {
        rows[b]
            .objective_score
            .partial_cmp(&rows[a].objective_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| rows[a].grid_index.cmp(&rows[b].grid_index))
    });

    for (place, &idx) in constrained_indices.iter().enumerate() {
        rows[idx].rank = Some(place + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callpath_core::ExitReason;

    fn trade(return_bps: f64, stop_out: bool) -> Trade {
        Trade {
            entry_ts_ms: 0,
            entry_px: 1.0,
            exit_ts_ms: 60_000,
            exit_px: 1.0,
            exit_reason: if stop_out {
                ExitReason::StopLoss
            } else {
                ExitReason::TakeProfit("2x".into())
            },
            realized_return_bps: return_bps,
            stop_out,
            max_adverse_excursion_bps: 0.0,
            time_exposed_ms: 60_000,
            tail_capture: 1.0,
        }
    }

    #[test]
    fn stats_avg_and_median() {
        let trades = vec![trade(500.0, false), trade(300.0, false), trade(-2000.0, true)];
        let stats = TradeStats::compute(&trades);
        assert!((stats.avg_return_bps - (-400.0)).abs() < 1e-9);
        assert_eq!(stats.median_return_bps, 300.0);
        assert!((stats.stop_out_rate - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn constraints_gate_on_sample_size_and_stop_out_rate() {
        let trades = vec![trade(500.0, false), trade(300.0, false), trade(-2000.0, true)];
        let stats = TradeStats::compute(&trades);
        let constraints = Constraints {
            min_sample_size: 3,
            max_stop_out_rate: 0.5,
            min_hit_rate: None,
            objective: Objective::AvgReturn,
        };
        assert!(stats.meets(&constraints));

        let tighter = Constraints {
            max_stop_out_rate: 0.2,
            ..constraints
        };
        assert!(!stats.meets(&tighter));
    }

    #[test]
    fn ranking_breaks_ties_by_grid_index() {
        let mut rows = vec![
            FrontierRow {
                caller_name: "alice".into(),
                grid_index: 1,
                policy: Policy::TimeStop { hold_ms: 1 },
                meets_constraints: true,
                objective_score: 100.0,
                avg_return_bps: 100.0,
                median_return_bps: 100.0,
                stop_out_rate: 0.0,
                hit_rate: 1.0,
                sample_size: 3,
                rank: None,
            },
            FrontierRow {
                caller_name: "alice".into(),
                grid_index: 0,
                policy: Policy::TimeStop { hold_ms: 1 },
                meets_constraints: true,
                objective_score: 100.0,
                avg_return_bps: 100.0,
                median_return_bps: 100.0,
                stop_out_rate: 0.0,
                hit_rate: 1.0,
                sample_size: 3,
                rank: None,
            },
        ];
        rank(&mut rows);
        assert_eq!(rows[1].rank, Some(1));
        assert_eq!(rows[0].rank, Some(2));
    }

    #[test]
    fn unconstrained_rows_are_unranked() {
        let mut rows = vec![FrontierRow {
            caller_name: "alice".into(),
            grid_index: 0,
            policy: Policy::TimeStop { hold_ms: 1 },
            meets_constraints: false,
            objective_score: 100.0,
            avg_return_bps: 100.0,
            median_return_bps: 100.0,
            stop_out_rate: 0.0,
            hit_rate: 1.0,
            sample_size: 1,
            rank: None,
        }];
        rank(&mut rows);
        assert_eq!(rows[0].rank, None);
    }
}
