//! Policy — the five risk-policy shapes the executor wraps around the
//! simulator (§4.4, §6.3), each serialising to an `ExitPlan`.

use super::exit_plan::{
    normalize_ladder, Activation, ExitPlan, IntrabarPolicy, LadderLevel, TrailingBlock,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Wire format (§6.3) ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum PolicyWire {
    FixedStop {
        stop_pct: f64,
        #[serde(default)]
        take_profit_pct: Option<f64>,
    },
    TimeStop {
        hold_ms: i64,
    },
    TrailingStop {
        activation_pct: f64,
        trail_pct: f64,
        #[serde(default)]
        hard_stop_pct: Option<f64>,
    },
    Ladder {
        levels: Vec<LadderLevelSpecWire>,
        #[serde(default)]
        stop_pct: Option<f64>,
    },
    Combo {
        parts: Vec<PolicyWire>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LadderLevelSpecWire {
    pub multiple: f64,
    pub fraction: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("stopPct must be in (0,1), got {0}")]
    StopPctOutOfRange(f64),
    #[error("holdMs must be > 0, got {0}")]
    NonPositiveHoldMs(i64),
    #[error("activationPct must be > 0, got {0}")]
    NonPositiveActivationPct(f64),
    #[error("trailPct must be in (0,1), got {0}")]
    TrailPctOutOfRange(f64),
    #[error("hardStopPct must be in (0,1), got {0}")]
    HardStopPctOutOfRange(f64),
    #[error("ladder level multiple must be > 1, got {0}")]
    MultipleNotAboveOne(f64),
    #[error("ladder level fraction must be in (0,1], got {0}")]
    FractionOutOfRange(f64),
    #[error("combo must have at least one part")]
    EmptyCombo,
}

/// How the entry price is chosen relative to the alert timestamp (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryRule {
    #[default]
    NextCandleOpen,
    NextCandleClose,
    CallTimeClose,
}

/// Validated policy: the same five shapes, with ranges checked.
#[derive(Debug, Clone, PartialEq)]
pub enum Policy {
    FixedStop {
        stop_pct: f64,
        take_profit_pct: Option<f64>,
    },
    TimeStop {
        hold_ms: i64,
    },
    TrailingStop {
        activation_pct: f64,
        trail_pct: f64,
        hard_stop_pct: Option<f64>,
    },
    Ladder {
        levels: Vec<(f64, f64)>,
        stop_pct: Option<f64>,
    },
    Combo {
        parts: Vec<Policy>,
    },
}

/// Merge two trailing blocks field-by-field rather than letting one whole
/// block replace the other, so e.g. a `FixedStop` part's hard stop survives
/// alongside a later `TrailingStop` part's trail percentage (§4.4 "Combo:
/// ... merged field-by-field").  `next`'s fields win wherever it sets them;
/// `prev`'s fields fill in the rest.
fn merge_trailing(prev: Option<TrailingBlock>, next: Option<TrailingBlock>) -> Option<TrailingBlock> {
    match (prev, next) {
        (prev, None) => prev,
        (None, Some(next)) => Some(next),
        (Some(prev), Some(next)) => Some(TrailingBlock {
            trail_bps: if next.trail_bps != 0.0 { next.trail_bps } else { prev.trail_bps },
            activation: next.activation.or(prev.activation),
            hard_stop_bps: next.hard_stop_bps.or(prev.hard_stop_bps),
            intrabar_policy: next.intrabar_policy,
        }),
    }
}

/// Intermediate accumulator for merging a policy tree into one exit plan.
#[derive(Debug, Clone, Default)]
struct ExitPlanParts {
    ladder: Vec<LadderLevel>,
    trailing: Option<TrailingBlock>,
    max_hold_ms: Option<i64>,
}

impl Policy {
    pub fn from_wire(wire: &PolicyWire) -> Result<Self, PolicyError> {
        let result = Self::try_from_wire(wire);
        if let Err(err) = &result {
            tracing::debug!(error = %err, "policy rejected at validation boundary");
        }
        result
    }

    fn try_from_wire(wire: &PolicyWire) -> Result<Self, PolicyError> {
        match wire {
            PolicyWire::FixedStop {
                stop_pct,
                take_profit_pct,
            } => {
                if !(0.0..1.0).contains(stop_pct) || *stop_pct <= 0.0 {
                    return Err(PolicyError::StopPctOutOfRange(*stop_pct));
                }
                if let Some(tp) = take_profit_pct {
                    if *tp <= 0.0 {
                        return Err(PolicyError::MultipleNotAboveOne(*tp));
                    }
                }
                Ok(Policy::FixedStop {
                    stop_pct: *stop_pct,
                    take_profit_pct: *take_profit_pct,
                })
            }
            PolicyWire::TimeStop { hold_ms } => {
                if *hold_ms <= 0 {
                    return Err(PolicyError::NonPositiveHoldMs(*hold_ms));
                }
                Ok(Policy::TimeStop { hold_ms: *hold_ms })
            }
            PolicyWire::TrailingStop {
                activation_pct,
                trail_pct,
                hard_stop_pct,
            } => {
                if *activation_pct <= 0.0 {
                    return Err(PolicyError::NonPositiveActivationPct(*activation_pct));
                }
                if !(0.0..1.0).contains(trail_pct) || *trail_pct <= 0.0 {
                    return Err(PolicyError::TrailPctOutOfRange(*trail_pct));
                }
                if let Some(hsp) = hard_stop_pct {
                    if !(0.0..1.0).contains(hsp) || *hsp <= 0.0 {
                        return Err(PolicyError::HardStopPctOutOfRange(*hsp));
                    }
                }
                Ok(Policy::TrailingStop {
                    activation_pct: *activation_pct,
                    trail_pct: *trail_pct,
                    hard_stop_pct: *hard_stop_pct,
                })
            }
            PolicyWire::Ladder { levels, stop_pct } => {
                let mut validated = Vec::with_capacity(levels.len());
                for level in levels {
                    if level.multiple <= 1.0 {
                        return Err(PolicyError::MultipleNotAboveOne(level.multiple));
                    }
                    if !(0.0..=1.0).contains(&level.fraction) || level.fraction <= 0.0 {
                        return Err(PolicyError::FractionOutOfRange(level.fraction));
                    }
                    validated.push((level.multiple, level.fraction));
                }
                if let Some(sp) = stop_pct {
                    if !(0.0..1.0).contains(sp) || *sp <= 0.0 {
                        return Err(PolicyError::StopPctOutOfRange(*sp));
                    }
                }
                Ok(Policy::Ladder {
                    levels: validated,
                    stop_pct: *stop_pct,
                })
            }
            PolicyWire::Combo { parts } => {
                if parts.is_empty() {
                    return Err(PolicyError::EmptyCombo);
                }
                let validated = parts
                    .iter()
                    .map(Policy::from_wire)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Policy::Combo { parts: validated })
            }
        }
    }

    /// Serialise this policy shape to the validated `ExitPlan` the
    /// simulator consumes (§4.4).
    pub fn to_exit_plan(&self) -> ExitPlan {
        let parts = self.to_parts();
        ExitPlan {
            ladder: normalize_ladder(parts.ladder),
            trailing: parts.trailing,
            indicator: None,
            max_hold_ms: parts.max_hold_ms,
            min_hold_candles_for_indicator: 0,
        }
    }

    fn to_parts(&self) -> ExitPlanParts {
        match self {
            Policy::FixedStop {
                stop_pct,
                take_profit_pct,
            } => {
                let ladder = take_profit_pct
                    .map(|tp| {
                        vec![LadderLevel {
                            label: format!("{}x", 1.0 + tp),
                            target_multiplier: 1.0 + tp,
                            fraction: 1.0,
                        }]
                    })
                    .unwrap_or_default();
                ExitPlanParts {
                    ladder,
                    trailing: Some(TrailingBlock {
                        trail_bps: 0.0,
                        activation: None,
                        hard_stop_bps: Some(stop_pct * 10_000.0),
                        intrabar_policy: IntrabarPolicy::StopFirst,
                    }),
                    max_hold_ms: None,
                }
            }
            Policy::TimeStop { hold_ms } => ExitPlanParts {
                ladder: Vec::new(),
                trailing: None,
                max_hold_ms: Some(*hold_ms),
            },
            Policy::TrailingStop {
                activation_pct,
                trail_pct,
                hard_stop_pct,
            } => ExitPlanParts {
                ladder: Vec::new(),
                trailing: Some(TrailingBlock {
                    trail_bps: trail_pct * 10_000.0,
                    activation: Some(Activation::Multiple(1.0 + activation_pct)),
                    hard_stop_bps: hard_stop_pct.map(|h| h * 10_000.0),
                    intrabar_policy: IntrabarPolicy::StopFirst,
                }),
                max_hold_ms: None,
            },
            Policy::Ladder { levels, stop_pct } => {
                let ladder = levels
                    .iter()
                    .map(|(multiple, fraction)| LadderLevel {
                        label: format!("{multiple}x"),
                        target_multiplier: *multiple,
                        fraction: *fraction,
                    })
                    .collect();
                let trailing = stop_pct.map(|sp| TrailingBlock {
                    trail_bps: 0.0,
                    activation: None,
                    hard_stop_bps: Some(sp * 10_000.0),
                    intrabar_policy: IntrabarPolicy::StopFirst,
                });
                ExitPlanParts {
                    ladder,
                    trailing,
                    max_hold_ms: None,
                }
            }
            Policy::Combo { parts } => {
                let mut merged = ExitPlanParts::default();
                for part in parts {
                    let p = part.to_parts();
                    merged.ladder.extend(p.ladder);
                    merged.trailing = merge_trailing(merged.trailing, p.trailing);
                    if p.max_hold_ms.is_some() {
                        merged.max_hold_ms = p.max_hold_ms;
                    }
                }
                merged
            }
        }
    }
}
