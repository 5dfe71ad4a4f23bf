//! Parameter grid — the cartesian product of parameter lists the optimizer
//! sweeps per caller (§4.5 "Input"/"Algorithm").
//!
//! Grounded in teacher's `sweep::ParamGrid::generate_configs` (nested loops
//! over parameter axes, building one `RunConfig` per combination); here the
//! combinations are `Policy` candidates instead of `RunConfig`s.

use callpath_core::Policy;

/// One grid candidate paired with its enumeration index. Ranking ties break
/// on this index (§5 "Ordering guarantees"), so it must be assigned once,
/// at construction, and never recomputed from a sort.
#[derive(Debug, Clone)]
pub struct GridCandidate {
    pub index: usize,
    pub policy: Policy,
}

/// An enumerated set of policy candidates in stable order.
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    candidates: Vec<GridCandidate>,
}

impl ParamGrid {
    /// Build a grid directly from an ordered list of policies; the list's
    /// position is the grid-enumeration index.
    pub fn new(policies: Vec<Policy>) -> Self {
        let candidates = policies
            .into_iter()
            .enumerate()
            .map(|(index, policy)| GridCandidate { index, policy })
            .collect();
        ParamGrid { candidates }
    }

    /// Cartesian product over `fixed_stop`'s two axes.
    pub fn fixed_stop(stop_pcts: &[f64], take_profit_pcts: &[Option<f64>]) -> Self {
        let mut policies = Vec::with_capacity(stop_pcts.len() * take_profit_pcts.len());
        for &stop_pct in stop_pcts {
            for &take_profit_pct in take_profit_pcts {
                policies.push(Policy::FixedStop {
                    stop_pct,
                    take_profit_pct,
                });
            }
        }
        Self::new(policies)
    }

    /// Cartesian product over `trailing_stop`'s three axes.
    pub fn trailing_stop(
        activation_pcts: &[f64],
        trail_pcts: &[f64],
        hard_stop_pcts: &[Option<f64>],
    ) -> Self {
        let mut policies =
            Vec::with_capacity(activation_pcts.len() * trail_pcts.len() * hard_stop_pcts.len());
        for &activation_pct in activation_pcts {
            for &trail_pct in trail_pcts {
                for &hard_stop_pct in hard_stop_pcts {
                    policies.push(Policy::TrailingStop {
                        activation_pct,
                        trail_pct,
                        hard_stop_pct,
                    });
                }
            }
        }
        Self::new(policies)
    }

    pub fn candidates(&self) -> &[GridCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
