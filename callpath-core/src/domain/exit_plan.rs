//! Exit plan — the central configuration object for the simulator (§6.1).
//!
//! Two representations, mirroring the teacher's config/manifest split:
//! `ExitPlanWire` is the exact wire JSON shape; `ExitPlan` is the validated,
//! normalised internal form the simulator's hot path dispatches on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Wire format (§6.1) ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ExitPlanWire {
    pub ladder: Option<LadderBlockWire>,
    pub trailing: Option<TrailingBlockWire>,
    pub indicator: Option<IndicatorBlockWire>,
    pub max_hold_ms: Option<i64>,
    pub min_hold_candles_for_indicator: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LadderBlockWire {
    pub enabled: bool,
    #[serde(default)]
    pub levels: Vec<LadderLevelWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum LadderLevelWire {
    Multiple { multiple: f64, fraction: f64 },
    Pct { pct: f64, fraction: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrailingBlockWire {
    pub enabled: bool,
    pub trail_bps: f64,
    #[serde(default)]
    pub activation: Option<ActivationWire>,
    #[serde(default)]
    pub hard_stop_bps: Option<f64>,
    #[serde(default)]
    pub intrabar_policy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum ActivationWire {
    Multiple { multiple: f64 },
    Pct { pct: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorBlockWire {
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<IndicatorRuleWire>,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossDirectionWire {
    CrossesAbove,
    CrossesBelow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IchimokuLineWire {
    Tenkan,
    Kijun,
    SpanA,
    SpanB,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum IndicatorRuleWire {
    IchimokuCross {
        direction: CrossDirectionWire,
        line_a: IchimokuLineWire,
        line_b: IchimokuLineWire,
    },
    EmaCross {
        direction: CrossDirectionWire,
        fast_period: usize,
        slow_period: usize,
    },
    RsiCross {
        direction: CrossDirectionWire,
        period: usize,
        threshold: f64,
    },
    VolumeSpike {
        window: usize,
        z_threshold: f64,
    },
}

// ─── Validation errors (§7 "Validation errors") ─────────────────────────

/// One rejection reason, with the offending field path. Surfaced
/// immediately, never wrapped, matching `components::factory::FactoryError`
/// / `data::schema::SchemaError` in the teacher.
#[derive(Debug, Error, PartialEq)]
pub enum ExitPlanError {
    #[error("{field}: negative bps value {value}")]
    NegativeBps { field: &'static str, value: f64 },
    #[error("{field}: fraction {value} outside [0,1]")]
    FractionOutOfRange { field: &'static str, value: f64 },
    #[error("ladder.enabled=true but levels is empty")]
    EmptyLadder,
    #[error("trailing.enabled=true requires trail_bps > 0")]
    EmptyTrailing,
    #[error("indicator.enabled=true but rules is empty")]
    EmptyIndicator,
    #[error("unknown intrabar_policy: {0}")]
    UnknownIntrabarPolicy(String),
    #[error("unknown indicator mode: {0}")]
    UnknownIndicatorMode(String),
    #[error("ladder level multiple must be > 0, got {0}")]
    NonPositiveMultiple(f64),
    #[error("max_hold_ms must be > 0, got {0}")]
    NonPositiveMaxHold(i64),
}

// ─── Internal, validated representation ─────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntrabarPolicy {
    StopFirst,
    TpFirst,
    /// Documented equivalent of `StopFirst` (§9 open question).
    LowThenHigh,
    /// Documented equivalent of `TpFirst` (§9 open question).
    HighThenLow,
}

impl IntrabarPolicy {
    /// Collapse the four wire labels to the two behaviors they actually
    /// produce, so the simulator dispatches on a 2-way tag (§9).
    pub fn resolved(self) -> ResolvedIntrabarPolicy {
        match self {
            IntrabarPolicy::StopFirst | IntrabarPolicy::LowThenHigh => {
                ResolvedIntrabarPolicy::StopFirst
            }
            IntrabarPolicy::TpFirst | IntrabarPolicy::HighThenLow => {
                ResolvedIntrabarPolicy::TpFirst
            }
        }
    }

    fn from_wire_str(s: &str) -> Result<Self, ExitPlanError> {
        match s {
            "STOP_FIRST" => Ok(IntrabarPolicy::StopFirst),
            "TP_FIRST" => Ok(IntrabarPolicy::TpFirst),
            "HIGH_THEN_LOW" => Ok(IntrabarPolicy::HighThenLow),
            "LOW_THEN_HIGH" => Ok(IntrabarPolicy::LowThenHigh),
            other => Err(ExitPlanError::UnknownIntrabarPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedIntrabarPolicy {
    StopFirst,
    TpFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IndicatorMode {
    #[default]
    Any,
    All,
}

/// A ladder level with its target multiplier already resolved to a p0-scale
/// factor (i.e. `target_px = p0 * target_multiplier`). Because target
/// multiplier scales linearly with p0 for both `multiple` and `pct` kinds,
/// ordering by target multiplier is equivalent to ordering by absolute
/// price for any positive p0 — so sorting happens once here, not per-alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderLevel {
    pub label: String,
    pub target_multiplier: f64,
    pub fraction: f64,
}

impl LadderLevel {
    pub fn target_px(&self, p0: f64) -> f64 {
        p0 * self.target_multiplier
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    Multiple(f64),
    Pct(f64),
}

impl Activation {
    pub fn threshold_px(&self, p0: f64) -> f64 {
        match self {
            Activation::Multiple(m) => p0 * m,
            Activation::Pct(p) => p0 * (1.0 + p / 100.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossDirection {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IchimokuLine {
    Tenkan,
    Kijun,
    SpanA,
    SpanB,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorRule {
    IchimokuCross {
        direction: CrossDirection,
        line_a: IchimokuLine,
        line_b: IchimokuLine,
    },
    EmaCross {
        direction: CrossDirection,
        fast_period: usize,
        slow_period: usize,
    },
    RsiCross {
        direction: CrossDirection,
        period: usize,
        threshold: f64,
    },
    VolumeSpike {
        window: usize,
        z_threshold: f64,
    },
}

#[derive(Debug, Clone, Default)]
pub struct TrailingBlock {
    pub trail_bps: f64,
    pub activation: Option<Activation>,
    pub hard_stop_bps: Option<f64>,
    pub intrabar_policy: IntrabarPolicy,
}

impl Default for IntrabarPolicy {
    fn default() -> Self {
        IntrabarPolicy::StopFirst
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorExitSpec {
    pub rules: Vec<IndicatorRule>,
    pub mode: IndicatorMode,
}

/// The validated, normalised exit plan the simulator consumes.
#[derive(Debug, Clone, Default)]
pub struct ExitPlan {
    pub ladder: Vec<LadderLevel>,
    pub trailing: Option<TrailingBlock>,
    pub indicator: Option<IndicatorExitSpec>,
    pub max_hold_ms: Option<i64>,
    pub min_hold_candles_for_indicator: u32,
}

// spec.md's prose ("normalised if >1 by 0.1%", §4.3) and its own boundary
// case ("fractions summing to 1.0002: normalised", §8) disagree on where the
// cutoff sits — 1.0002 doesn't clear a 1.001 threshold. The boundary case is
// the more specific statement, so the cutoff is plain `1.0`: any sum over 1
// gets rescaled, exactly 1.0 (or under) is left alone.
const NORMALIZATION_THRESHOLD: f64 = 1.0;

impl ExitPlan {
    pub fn from_wire(wire: &ExitPlanWire) -> Result<Self, ExitPlanError> {
        let result = Self::try_from_wire(wire);
        if let Err(err) = &result {
            tracing::debug!(error = %err, "exit plan rejected at validation boundary");
        }
        result
    }

    fn try_from_wire(wire: &ExitPlanWire) -> Result<Self, ExitPlanError> {
        let ladder = match &wire.ladder {
            Some(block) if block.enabled => Self::validate_ladder(&block.levels)?,
            _ => Vec::new(),
        };

        let trailing = match &wire.trailing {
            Some(block) if block.enabled => Some(Self::validate_trailing(block)?),
            _ => None,
        };

        let indicator = match &wire.indicator {
            Some(block) if block.enabled => Some(Self::validate_indicator(block)?),
            _ => None,
        };

        if let Some(max_hold) = wire.max_hold_ms {
            if max_hold <= 0 {
                return Err(ExitPlanError::NonPositiveMaxHold(max_hold));
            }
        }

        Ok(ExitPlan {
            ladder,
            trailing,
            indicator,
            max_hold_ms: wire.max_hold_ms,
            min_hold_candles_for_indicator: wire.min_hold_candles_for_indicator.unwrap_or(0),
        })
    }

    fn validate_ladder(levels: &[LadderLevelWire]) -> Result<Vec<LadderLevel>, ExitPlanError> {
        if levels.is_empty() {
            return Err(ExitPlanError::EmptyLadder);
        }

        let mut resolved: Vec<LadderLevel> = levels
            .iter()
            .map(|level| match level {
                LadderLevelWire::Multiple { multiple, fraction } => {
                    if *multiple <= 0.0 {
                        return Err(ExitPlanError::NonPositiveMultiple(*multiple));
                    }
                    if !(0.0..=1.0).contains(fraction) {
                        return Err(ExitPlanError::FractionOutOfRange {
                            field: "ladder.levels[].fraction",
                            value: *fraction,
                        });
                    }
                    Ok(LadderLevel {
                        label: format_multiple_label(*multiple),
                        target_multiplier: *multiple,
                        fraction: *fraction,
                    })
                }
                LadderLevelWire::Pct { pct, fraction } => {
                    if !(0.0..=1.0).contains(fraction) {
                        return Err(ExitPlanError::FractionOutOfRange {
                            field: "ladder.levels[].fraction",
                            value: *fraction,
                        });
                    }
                    Ok(LadderLevel {
                        label: format_pct_label(*pct),
                        target_multiplier: 1.0 + pct / 100.0,
                        fraction: *fraction,
                    })
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(normalize_ladder(resolved))
    }

    fn validate_trailing(block: &TrailingBlockWire) -> Result<TrailingBlock, ExitPlanError> {
        if block.trail_bps <= 0.0 {
            return Err(ExitPlanError::EmptyTrailing);
        }
        if let Some(hard_stop) = block.hard_stop_bps {
            if hard_stop < 0.0 {
                return Err(ExitPlanError::NegativeBps {
                    field: "trailing.hard_stop_bps",
                    value: hard_stop,
                });
            }
        }

        let activation = block
            .activation
            .as_ref()
            .map(|a| match a {
                ActivationWire::Multiple { multiple } => Activation::Multiple(*multiple),
                ActivationWire::Pct { pct } => Activation::Pct(*pct),
            });

        let intrabar_policy = match &block.intrabar_policy {
            Some(s) => IntrabarPolicy::from_wire_str(s)?,
            None => IntrabarPolicy::default(),
        };

        Ok(TrailingBlock {
            trail_bps: block.trail_bps,
            activation,
            hard_stop_bps: block.hard_stop_bps,
            intrabar_policy,
        })
    }

    fn validate_indicator(block: &IndicatorBlockWire) -> Result<IndicatorExitSpec, ExitPlanError> {
        if block.rules.is_empty() {
            return Err(ExitPlanError::EmptyIndicator);
        }

        let mode = match &block.mode {
            Some(s) => match s.as_str() {
                "ANY" => IndicatorMode::Any,
                "ALL" => IndicatorMode::All,
                other => return Err(ExitPlanError::UnknownIndicatorMode(other.to_string())),
            },
            None => IndicatorMode::Any,
        };

        let rules = block
            .rules
            .iter()
            .map(|r| match r {
                IndicatorRuleWire::IchimokuCross {
                    direction,
                    line_a,
                    line_b,
                } => IndicatorRule::IchimokuCross {
                    direction: convert_direction(*direction),
                    line_a: convert_line(*line_a),
                    line_b: convert_line(*line_b),
                },
                IndicatorRuleWire::EmaCross {
                    direction,
                    fast_period,
                    slow_period,
                } => IndicatorRule::EmaCross {
                    direction: convert_direction(*direction),
                    fast_period: *fast_period,
                    slow_period: *slow_period,
                },
                IndicatorRuleWire::RsiCross {
                    direction,
                    period,
                    threshold,
                } => IndicatorRule::RsiCross {
                    direction: convert_direction(*direction),
                    period: *period,
                    threshold: *threshold,
                },
                IndicatorRuleWire::VolumeSpike { window, z_threshold } => {
                    IndicatorRule::VolumeSpike {
                        window: *window,
                        z_threshold: *z_threshold,
                    }
                }
            })
            .collect();

        Ok(IndicatorExitSpec { rules, mode })
    }
}

/// Sort ladder levels ascending by target multiplier and apply §4.3's
/// "level normalisation" rule. Shared by wire validation and by the policy
/// executor's combo merge (§4.4), both of which assemble raw level lists
/// that need the same treatment before the simulator sees them.
pub fn normalize_ladder(mut levels: Vec<LadderLevel>) -> Vec<LadderLevel> {
    levels.sort_by(|a, b| {
        a.target_multiplier
            .partial_cmp(&b.target_multiplier)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let sum: f64 = levels.iter().map(|l| l.fraction).sum();
    if sum > NORMALIZATION_THRESHOLD {
        for level in &mut levels {
            level.fraction /= sum;
        }
    } else {
        for level in &mut levels {
            level.fraction = level.fraction.clamp(0.0, 1.0);
        }
    }
    levels
}

fn convert_direction(d: CrossDirectionWire) -> CrossDirection {
    match d {
        CrossDirectionWire::CrossesAbove => CrossDirection::Above,
        CrossDirectionWire::CrossesBelow => CrossDirection::Below,
    }
}

fn convert_line(l: IchimokuLineWire) -> IchimokuLine {
    match l {
        IchimokuLineWire::Tenkan => IchimokuLine::Tenkan,
        IchimokuLineWire::Kijun => IchimokuLine::Kijun,
        IchimokuLineWire::SpanA => IchimokuLine::SpanA,
        IchimokuLineWire::SpanB => IchimokuLine::SpanB,
    }
}

fn format_multiple_label(v: f64) -> String {
    format!("{}x", trim_trailing_zeros(v))
}

fn format_pct_label(v: f64) -> String {
    format!("{}pct", trim_trailing_zeros(v))
}

fn trim_trailing_zeros(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        let s = format!("{v}");
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder_wire(levels: Vec<LadderLevelWire>) -> ExitPlanWire {
        ExitPlanWire {
            ladder: Some(LadderBlockWire {
                enabled: true,
                levels,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn single_level_at_2x_labels_tp_2x() {
        let wire = ladder_wire(vec![LadderLevelWire::Multiple {
            multiple: 2.0,
            fraction: 1.0,
        }]);
        let plan = ExitPlan::from_wire(&wire).unwrap();
        assert_eq!(plan.ladder.len(), 1);
        assert_eq!(plan.ladder[0].label, "2x");
        assert_eq!(plan.ladder[0].target_multiplier, 2.0);
    }

    #[test]
    fn levels_sorted_ascending_by_target() {
        let wire = ladder_wire(vec![
            LadderLevelWire::Multiple {
                multiple: 3.0,
                fraction: 0.5,
            },
            LadderLevelWire::Multiple {
                multiple: 2.0,
                fraction: 0.5,
            },
        ]);
        let plan = ExitPlan::from_wire(&wire).unwrap();
        assert_eq!(plan.ladder[0].target_multiplier, 2.0);
        assert_eq!(plan.ladder[1].target_multiplier, 3.0);
    }

    #[test]
    fn fractions_normalised_above_threshold() {
        let wire = ladder_wire(vec![
            LadderLevelWire::Multiple {
                multiple: 2.0,
                fraction: 0.6,
            },
            LadderLevelWire::Multiple {
                multiple: 3.0,
                fraction: 0.4002,
            },
        ]);
        let plan = ExitPlan::from_wire(&wire).unwrap();
        let sum: f64 = plan.ladder.iter().map(|l| l.fraction).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_enabled_ladder_rejected() {
        let wire = ladder_wire(vec![]);
        assert_eq!(ExitPlan::from_wire(&wire), Err(ExitPlanError::EmptyLadder));
    }

    #[test]
    fn fraction_out_of_range_rejected() {
        let wire = ladder_wire(vec![LadderLevelWire::Multiple {
            multiple: 2.0,
            fraction: 1.5,
        }]);
        assert!(matches!(
            ExitPlan::from_wire(&wire),
            Err(ExitPlanError::FractionOutOfRange { .. })
        ));
    }

    #[test]
    fn negative_hard_stop_bps_rejected() {
        let wire = ExitPlanWire {
            trailing: Some(TrailingBlockWire {
                enabled: true,
                trail_bps: 100.0,
                activation: None,
                hard_stop_bps: Some(-5.0),
                intrabar_policy: None,
            }),
            ..Default::default()
        };
        assert!(matches!(
            ExitPlan::from_wire(&wire),
            Err(ExitPlanError::NegativeBps { .. })
        ));
    }

    #[test]
    fn trailing_default_policy_is_stop_first() {
        let wire = ExitPlanWire {
            trailing: Some(TrailingBlockWire {
                enabled: true,
                trail_bps: 500.0,
                activation: None,
                hard_stop_bps: None,
                intrabar_policy: None,
            }),
            ..Default::default()
        };
        let plan = ExitPlan::from_wire(&wire).unwrap();
        assert_eq!(
            plan.trailing.unwrap().intrabar_policy,
            IntrabarPolicy::StopFirst
        );
    }

    #[test]
    fn intrabar_policy_resolves_documented_equivalence() {
        assert_eq!(
            IntrabarPolicy::LowThenHigh.resolved(),
            IntrabarPolicy::StopFirst.resolved()
        );
        assert_eq!(
            IntrabarPolicy::HighThenLow.resolved(),
            IntrabarPolicy::TpFirst.resolved()
        );
    }

    #[test]
    fn unknown_intrabar_policy_rejected() {
        let wire = ExitPlanWire {
            trailing: Some(TrailingBlockWire {
                enabled: true,
                trail_bps: 100.0,
                activation: None,
                hard_stop_bps: None,
                intrabar_policy: Some("SIDEWAYS_FIRST".to_string()),
            }),
            ..Default::default()
        };
        assert!(matches!(
            ExitPlan::from_wire(&wire),
            Err(ExitPlanError::UnknownIntrabarPolicy(_))
        ));
    }

    #[test]
    fn disabled_blocks_yield_empty_plan() {
        let wire = ExitPlanWire {
            ladder: Some(LadderBlockWire {
                enabled: false,
                levels: vec![],
            }),
            trailing: Some(TrailingBlockWire {
                enabled: false,
                trail_bps: 100.0,
                activation: None,
                hard_stop_bps: None,
                intrabar_policy: None,
            }),
            indicator: None,
            max_hold_ms: None,
            min_hold_candles_for_indicator: None,
        };
        let plan = ExitPlan::from_wire(&wire).unwrap();
        assert!(plan.ladder.is_empty());
        assert!(plan.trailing.is_none());
    }

    #[test]
    fn wire_roundtrip_preserves_shape() {
        let wire = ladder_wire(vec![LadderLevelWire::Multiple {
            multiple: 2.0,
            fraction: 1.0,
        }]);
        let json = serde_json::to_string(&wire).unwrap();
        let back: ExitPlanWire = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ladder.unwrap().levels.len(), 1);
    }

    #[test]
    fn unknown_field_rejected_by_wire_schema() {
        let json = r#"{"ladder": {"enabled": true, "levels": [], "bogus_field": 1}}"#;
        let result: Result<ExitPlanWire, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
