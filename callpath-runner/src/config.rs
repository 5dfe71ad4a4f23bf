//! Optimizer run configuration (§7.2 "Ambient: configuration").
//!
//! Grounded in teacher's `config::RunConfig`: a `serde`-derived,
//! `toml`-deserializable struct with a deterministic `blake3`-backed hash for
//! cache/dedup keys (here, `config_hash` rather than `run_id`, since a single
//! config fans out into a whole grid of candidates rather than one run).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use callpath_core::{EntryRule, Policy, PolicyError, PolicyWire};

use crate::frontier::{Constraints, Objective};
use crate::grid::ParamGrid;

/// Top-level optimizer configuration: what to sweep, what gates a
/// candidate, how to execute, and the resource/time budget (§5, §7.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizerConfig {
    pub candidates: Vec<PolicyWire>,
    pub constraints: ConstraintsConfig,
    pub execution: ExecutionConfigWire,
    /// Worker pool size; `None` means "number of cores" (§5 default).
    pub workers: Option<usize>,
    pub wall_clock_budget_ms: Option<u64>,
    pub capital_aware: Option<CapitalConfigWire>,
}

impl OptimizerConfig {
    /// Deterministic hash of this configuration, for cache keys and for the
    /// run manifest's `parameter_hash` (§6.2), computed the same way as
    /// teacher's `RunConfig::run_id`.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(self).expect("OptimizerConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Parse from a TOML document, the on-disk format teacher's
    /// `RunConfig` uses for saved run definitions.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Validate every `candidates` entry into a `ParamGrid`, in enumeration
    /// order, so a malformed candidate is rejected before the optimizer
    /// runs rather than mid-sweep.
    pub fn build_grid(&self) -> Result<ParamGrid, ConfigError> {
        let policies = self
            .candidates
            .iter()
            .enumerate()
            .map(|(index, wire)| {
                Policy::from_wire(wire).map_err(|source| ConfigError::InvalidCandidate { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ParamGrid::new(policies))
    }
}

/// Errors loading or validating an `OptimizerConfig` (§7.2).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("candidates[{index}]: {source}")]
    InvalidCandidate { index: usize, source: PolicyError },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConstraintsConfig {
    pub min_sample_size: usize,
    pub max_stop_out_rate: f64,
    pub min_hit_rate: Option<f64>,
    pub objective: Objective,
}

impl From<ConstraintsConfig> for Constraints {
    fn from(c: ConstraintsConfig) -> Self {
        Constraints {
            min_sample_size: c.min_sample_size,
            max_stop_out_rate: c.max_stop_out_rate,
            min_hit_rate: c.min_hit_rate,
            objective: c.objective,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExecutionConfigWire {
    #[serde(default)]
    pub entry_rule: EntryRuleConfig,
    #[serde(default)]
    pub lag_ms: i64,
    #[serde(default)]
    pub taker_fee_bps: f64,
    #[serde(default)]
    pub slippage_bps: f64,
}

impl From<ExecutionConfigWire> for callpath_core::ExecutionParams {
    fn from(w: ExecutionConfigWire) -> Self {
        callpath_core::ExecutionParams {
            entry_rule: w.entry_rule.into(),
            lag_ms: w.lag_ms,
            taker_fee_bps: w.taker_fee_bps,
            slippage_bps: w.slippage_bps,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryRuleConfig {
    #[default]
    NextCandleOpen,
    NextCandleClose,
    CallTimeClose,
}

impl From<EntryRuleConfig> for EntryRule {
    fn from(e: EntryRuleConfig) -> Self {
        match e {
            EntryRuleConfig::NextCandleOpen => EntryRule::NextCandleOpen,
            EntryRuleConfig::NextCandleClose => EntryRule::NextCandleClose,
            EntryRuleConfig::CallTimeClose => EntryRule::CallTimeClose,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CapitalConfigWire {
    pub initial_capital: f64,
    pub position_size_fraction: f64,
    pub max_concurrent_positions: usize,
}

impl From<CapitalConfigWire> for crate::capital::CapitalPolicyConfig {
    fn from(c: CapitalConfigWire) -> Self {
        crate::capital::CapitalPolicyConfig {
            initial_capital: c.initial_capital,
            position_size_fraction: c.position_size_fraction,
            max_concurrent_positions: c.max_concurrent_positions,
        }
    }
}
