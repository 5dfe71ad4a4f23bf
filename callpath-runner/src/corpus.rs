//! Corpus — the optimizer's input: one `(alert, candle_slice, path_metrics)`
//! triple per evaluated call (§4.5 "Input").
//!
//! Grounded in teacher's `sweep::SweepResults`/`leaderboard::SymbolLeaderboard`
//! grouping idiom, generalized from "per symbol" to "per caller".

use std::collections::BTreeMap;

use callpath_core::{Alert, Candle, PathMetrics};

/// One alert's full evaluation context: the alert itself, the candle slice
/// an execution against it should run over, and its policy-independent path
/// truth (§3 "Path Metrics").
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub alert: Alert,
    pub candles: Vec<Candle>,
    pub path_metrics: PathMetrics,
}

impl CorpusEntry {
    pub fn new(alert: Alert, candles: Vec<Candle>) -> Self {
        let path_metrics = PathMetrics::compute(&candles, alert.alert_ts_ms, alert.alert_price);
        CorpusEntry {
            alert,
            candles,
            path_metrics,
        }
    }
}

/// A corpus of alerts the optimizer sweeps over, partitionable by caller
/// (§4.5 "For each caller (partition of the corpus)").
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    pub fn new(entries: Vec<CorpusEntry>) -> Self {
        Corpus { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    /// Group entries by `caller_name`. The map key ordering (lexicographic)
    /// is what makes per-caller iteration order deterministic across runs;
    /// within a caller's group, entries keep their original corpus order.
    pub fn by_caller(&self) -> BTreeMap<&str, Vec<&CorpusEntry>> {
        let mut grouped: BTreeMap<&str, Vec<&CorpusEntry>> = BTreeMap::new();
        for entry in &self.entries {
            grouped
                .entry(entry.alert.caller_name.as_str())
                .or_default()
                .push(entry);
        }
        grouped
    }

    /// All entries sorted by `(alert_ts_ms, call_id)` ascending, the order
    /// the capital-aware variant requires (§5 "Ordering guarantees").
    pub fn sorted_by_alert_time(&self) -> Vec<&CorpusEntry> {
        let mut sorted: Vec<&CorpusEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| {
            a.alert
                .alert_ts_ms
                .cmp(&b.alert.alert_ts_ms)
                .then_with(|| a.alert.call_id.cmp(&b.alert.call_id))
        });
        sorted
    }
}
