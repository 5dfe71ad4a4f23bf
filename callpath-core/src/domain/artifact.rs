//! Artifact rows and run manifest (§6.2, SPEC_FULL §4.7).
//!
//! The core does not persist these — an external writer does — but it must
//! emit them as plain serializable rows so that writer has something to
//! write. Grounded in `composer::manifest::StrategyManifest`'s
//! deterministic-hash pattern and `reporting::artifacts::manifest::RunManifest`'s
//! flat, directly-serializable row shape.
//!
//! §6.2 names seven logical tables: `alerts`, `paths`, `features`, `trades`,
//! `summary`, `frontier`, `errors`. `FrontierRow` lives in `callpath-runner`
//! (it is an optimizer concept); the other six row shapes live here,
//! alongside the run manifest that inventories them.

use serde::{Deserialize, Serialize};

use super::{Alert, PathMetrics, Trade};

pub type RunId = String;

/// One row of the `alerts` table: the alert as evaluated, unchanged from
/// its input shape but tagged with the run it was evaluated under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRow {
    pub run_id: RunId,
    pub call_id: String,
    pub caller_name: String,
    pub chain: String,
    pub token_address: String,
    pub alert_ts_ms: i64,
    pub alert_price: f64,
}

impl AlertRow {
    pub fn from_alert(run_id: impl Into<RunId>, alert: &Alert) -> Self {
        AlertRow {
            run_id: run_id.into(),
            call_id: alert.call_id.clone(),
            caller_name: alert.caller_name.clone(),
            chain: alert.chain.clone(),
            token_address: alert.token_address.clone(),
            alert_ts_ms: alert.alert_ts_ms,
            alert_price: alert.alert_price,
        }
    }
}

/// One row of the `paths` table: policy-independent truth about a token's
/// trajectory after an alert (§3 "Path Metrics").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRow {
    pub run_id: RunId,
    pub call_id: String,
    pub p0: f64,
    pub peak_multiple: f64,
    pub hit_2x: bool,
    pub t_2x_ms: Option<i64>,
    pub hit_3x: bool,
    pub t_3x_ms: Option<i64>,
    pub hit_4x: bool,
    pub t_4x_ms: Option<i64>,
    pub dd_bps: f64,
    pub dd_to_2x_bps: Option<f64>,
    pub alert_to_activity_ms: Option<i64>,
}

impl PathRow {
    pub fn from_metrics(run_id: impl Into<RunId>, call_id: impl Into<String>, m: &PathMetrics) -> Self {
        PathRow {
            run_id: run_id.into(),
            call_id: call_id.into(),
            p0: m.p0,
            peak_multiple: m.peak_multiple,
            hit_2x: m.hit_2x,
            t_2x_ms: m.t_2x_ms,
            hit_3x: m.hit_3x,
            t_3x_ms: m.t_3x_ms,
            hit_4x: m.hit_4x,
            t_4x_ms: m.t_4x_ms,
            dd_bps: m.dd_bps,
            dd_to_2x_bps: m.dd_to_2x_bps,
            alert_to_activity_ms: m.alert_to_activity_ms,
        }
    }
}

/// One row of the `features` table: a single named derived value (e.g. an
/// indicator reading) at a point in a call's horizon, long-format so the
/// indicator set can grow without a schema migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub run_id: RunId,
    pub call_id: String,
    pub ts_ms: i64,
    pub name: String,
    pub value: f64,
}

/// One row of the `trades` table: a policy-level round-trip outcome (§3
/// "Trade", §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRow {
    pub run_id: RunId,
    pub call_id: String,
    pub entry_ts_ms: i64,
    pub entry_px: f64,
    pub exit_ts_ms: i64,
    pub exit_px: f64,
    pub exit_reason: String,
    pub realized_return_bps: f64,
    pub stop_out: bool,
    pub max_adverse_excursion_bps: f64,
    pub time_exposed_ms: i64,
    pub tail_capture: f64,
}

impl TradeRow {
    pub fn from_trade(run_id: impl Into<RunId>, call_id: impl Into<String>, t: &Trade) -> Self {
        TradeRow {
            run_id: run_id.into(),
            call_id: call_id.into(),
            entry_ts_ms: t.entry_ts_ms,
            entry_px: t.entry_px,
            exit_ts_ms: t.exit_ts_ms,
            exit_px: t.exit_px,
            exit_reason: t.exit_reason.to_string(),
            realized_return_bps: t.realized_return_bps,
            stop_out: t.stop_out,
            max_adverse_excursion_bps: t.max_adverse_excursion_bps,
            time_exposed_ms: t.time_exposed_ms,
            tail_capture: t.tail_capture,
        }
    }
}

/// One row of the `summary` table: one per caller (or one overall row for a
/// policy-only run), always emitted even when `sample_size` is zero (§7
/// "Summary row is always emitted even when empty (zeroed metrics)").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub run_id: RunId,
    pub caller_name: String,
    pub sample_size: usize,
    pub avg_return_bps: f64,
    pub median_return_bps: f64,
    pub stop_out_rate: f64,
    pub hit_rate: f64,
}

impl SummaryRow {
    /// The zeroed row for a caller/run with no successful evaluations (§7
    /// "Summary row is always emitted even when empty").
    pub fn empty(run_id: impl Into<RunId>, caller_name: impl Into<String>) -> Self {
        SummaryRow {
            run_id: run_id.into(),
            caller_name: caller_name.into(),
            sample_size: 0,
            avg_return_bps: 0.0,
            median_return_bps: 0.0,
            stop_out_rate: 0.0,
            hit_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    PathOnly,
    Policy,
    Optimization,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorLevel {
    Warning,
    Error,
}

/// `(run_id, ts, level, phase, call_id?, message, details?)` (§7 "Propagation").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRow {
    pub run_id: RunId,
    pub ts_ms: i64,
    pub level: ErrorLevel,
    pub phase: String,
    pub call_id: Option<String>,
    pub message: String,
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactInventory {
    pub table: String,
    pub row_count: usize,
}

/// Run manifest: identity, status, and inventory for one core invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub run_type: RunType,
    pub status: RunStatus,
    pub dataset_window_start_ms: i64,
    pub dataset_window_end_ms: i64,
    /// Deterministic hash of the run's parameters (grid + constraints),
    /// computed the same way as teacher's `StrategyManifest::compute_hash`.
    pub parameter_hash: String,
    pub schema_version: u32,
    pub artifacts: Vec<ArtifactInventory>,
}

impl RunManifest {
    /// `status = completed` iff at least one alert produced a result,
    /// `failed` otherwise (§7 "User-visible behaviour").
    pub fn status_for(alerts_with_results: usize) -> RunStatus {
        if alerts_with_results >= 1 {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        }
    }

    /// Deterministic parameter hash: BLAKE3 over a canonical JSON encoding
    /// of whatever parameter payload the caller passes in.
    pub fn compute_parameter_hash<T: Serialize>(params: &T) -> String {
        let json = serde_json::to_string(params).expect("parameter payload must serialize");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
