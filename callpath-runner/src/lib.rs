//! # callpath-runner
//!
//! The Optimizer (§4.5): grid enumeration, per-caller corpus partitioning,
//! constraint-gated frontier ranking, and the capital-aware sequential
//! deployment variant. Wraps `callpath-core`'s simulator and policy
//! executor; owns no storage, no CLI surface, no async runtime.
//!
//! ## Components
//!
//! - `Corpus` / `CorpusEntry`: the optimizer's per-alert input
//! - `ParamGrid` / `GridCandidate`: the cartesian product of policy
//!   parameters being swept
//! - `optimize`: the independent (embarrassingly-parallel) per-alert sweep
//! - `simulate_capital_aware`: the sequential, capital-constrained variant
//! - `FrontierRow` / `Constraints` / `Objective`: scoring and ranking
//! - `OptimizerConfig`: serializable run configuration

pub mod capital;
pub mod config;
pub mod corpus;
pub mod frontier;
pub mod grid;
pub mod optimizer;
pub mod run;

pub use capital::{simulate_capital_aware, AllocationOutcome, CapitalAwareResult, CapitalPolicyConfig};
pub use config::{CapitalConfigWire, ConfigError, ConstraintsConfig, EntryRuleConfig, ExecutionConfigWire, OptimizerConfig};
pub use corpus::{Corpus, CorpusEntry};
pub use frontier::{rank, Constraints, FrontierRow, Objective, TradeStats};
pub use grid::{GridCandidate, ParamGrid};
pub use optimizer::{optimize, CancellationToken, OptimizerOutcome};
pub use run::run_optimization;
