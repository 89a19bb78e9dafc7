//! Size budget classification and the admission arithmetic gate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{OrchestratorError, OrchestratorResult};

/// Ascending size thresholds separating the budget tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetThresholds {
    /// Sizes below this are comfortably within budget.
    pub optimal: u64,
    /// Sizes from here on should start planning a split.
    pub warning: u64,
    /// Sizes from here on should be split before more work is scheduled.
    pub split_trigger: u64,
    /// Sizes from here on are red: refused until split, and suspended even mid-run.
    pub emergency: u64,
}

impl Default for BudgetThresholds {
    fn default() -> Self {
        Self {
            optimal: 80_000,
            warning: 100_000,
            split_trigger: 120_000,
            emergency: 140_000,
        }
    }
}

impl BudgetThresholds {
    /// Require `optimal < warning < split_trigger < emergency`.
    pub fn validate(&self) -> OrchestratorResult<()> {
        let ascending = self.optimal < self.warning
            && self.warning < self.split_trigger
            && self.split_trigger < self.emergency;
        if !ascending {
            return Err(OrchestratorError::InvalidThresholdConfig(format!(
                "thresholds must be strictly ascending, got optimal={} warning={} split_trigger={} emergency={}",
                self.optimal, self.warning, self.split_trigger, self.emergency
            )));
        }
        Ok(())
    }
}

/// Coarse size classification, ordered from healthiest to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    /// Below `optimal`.
    Green,
    /// Between `optimal` and `warning`.
    Yellow,
    /// Between `warning` and `emergency`; `split_trigger` falls inside this band.
    Orange,
    /// At or above `emergency`.
    Red,
}

impl fmt::Display for BudgetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::Red => "red",
        };
        f.write_str(name)
    }
}

/// What the operator should do about a unit in a given tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetAction {
    /// Keep going.
    Continue,
    /// Schedule a split at the next natural boundary.
    PlanSplit,
    /// Split before doing more work.
    SplitNow,
    /// Refuse further scheduling until the unit is split.
    Abort,
}

/// Outcome of checking one launch against the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetDecision {
    /// Tier of the unit's current size.
    pub tier: BudgetTier,
    /// Recommended action for that tier.
    pub action: BudgetAction,
    /// Current size plus task cost plus safety margin.
    pub projected_size: u64,
    /// Ceiling the projection was checked against.
    pub hard_limit: u64,
    /// Whether the projection fits under the ceiling.
    pub admitted: bool,
}

impl BudgetDecision {
    /// Whether the scheduler may run the unit: the projection fits and the
    /// tier does not call for an abort.
    #[must_use]
    pub const fn allows_launch(&self) -> bool {
        self.admitted && !matches!(self.action, BudgetAction::Abort)
    }

    /// Human-readable reason the launch is refused, if it is.
    #[must_use]
    pub fn refusal(&self) -> Option<String> {
        if !self.admitted {
            Some(format!(
                "projected {} exceeds hard limit {}",
                self.projected_size, self.hard_limit
            ))
        } else if matches!(self.action, BudgetAction::Abort) {
            Some(format!("{} tier requires a split before scheduling", self.tier))
        } else {
            None
        }
    }
}

/// Classifies unit sizes and gates admission against a hard ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetTracker {
    thresholds: BudgetThresholds,
    safety_margin: u64,
    hard_limit: u64,
}

impl BudgetTracker {
    /// Create a tracker; thresholds are validated here.
    pub fn new(
        thresholds: BudgetThresholds,
        safety_margin: u64,
        hard_limit: u64,
    ) -> OrchestratorResult<Self> {
        thresholds.validate()?;
        if hard_limit == 0 {
            return Err(OrchestratorError::InvalidThresholdConfig(
                "hard_limit must be greater than 0".into(),
            ));
        }
        Ok(Self {
            thresholds,
            safety_margin,
            hard_limit,
        })
    }

    /// Configured thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> BudgetThresholds {
        self.thresholds
    }

    /// Configured safety margin.
    #[must_use]
    pub const fn safety_margin(&self) -> u64 {
        self.safety_margin
    }

    /// Configured hard ceiling.
    #[must_use]
    pub const fn hard_limit(&self) -> u64 {
        self.hard_limit
    }

    /// Swap thresholds at runtime. Invalid thresholds leave the old ones in place.
    pub fn set_thresholds(&mut self, thresholds: BudgetThresholds) -> OrchestratorResult<()> {
        thresholds.validate()?;
        self.thresholds = thresholds;
        Ok(())
    }

    /// Tier for a size. Monotonic in `size`.
    #[must_use]
    pub const fn classify(&self, size: u64) -> BudgetTier {
        let t = &self.thresholds;
        if size < t.optimal {
            BudgetTier::Green
        } else if size < t.warning {
            BudgetTier::Yellow
        } else if size < t.emergency {
            BudgetTier::Orange
        } else {
            BudgetTier::Red
        }
    }

    /// Whether a size has crossed the emergency threshold, i.e. is red.
    #[must_use]
    pub const fn is_emergency(&self, size: u64) -> bool {
        size >= self.thresholds.emergency
    }

    /// Hard gate: refuse when `current + cost + margin` exceeds `hard_limit`.
    ///
    /// Reaching the limit exactly is allowed. Independent of tier.
    #[must_use]
    pub const fn can_admit(
        current_size: u64,
        estimated_task_cost: u64,
        safety_margin: u64,
        hard_limit: u64,
    ) -> bool {
        current_size
            .saturating_add(estimated_task_cost)
            .saturating_add(safety_margin)
            <= hard_limit
    }

    /// Action recommended for a tier.
    #[must_use]
    pub const fn recommend_action(tier: BudgetTier) -> BudgetAction {
        match tier {
            BudgetTier::Green => BudgetAction::Continue,
            BudgetTier::Yellow => BudgetAction::PlanSplit,
            BudgetTier::Orange => BudgetAction::SplitNow,
            BudgetTier::Red => BudgetAction::Abort,
        }
    }

    /// Check a launch using the configured margin and ceiling.
    #[must_use]
    pub const fn check(&self, current_size: u64, estimated_task_cost: u64) -> BudgetDecision {
        let tier = self.classify(current_size);
        BudgetDecision {
            tier,
            action: Self::recommend_action(tier),
            projected_size: current_size
                .saturating_add(estimated_task_cost)
                .saturating_add(self.safety_margin),
            hard_limit: self.hard_limit,
            admitted: Self::can_admit(
                current_size,
                estimated_task_cost,
                self.safety_margin,
                self.hard_limit,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> BudgetTracker {
        BudgetTracker::new(BudgetThresholds::default(), 20_000, 180_000).unwrap()
    }

    #[test]
    fn test_tier_boundaries() {
        let t = tracker();
        assert_eq!(t.classify(0), BudgetTier::Green);
        assert_eq!(t.classify(79_999), BudgetTier::Green);
        assert_eq!(t.classify(80_000), BudgetTier::Yellow);
        assert_eq!(t.classify(100_000), BudgetTier::Orange);
        assert_eq!(t.classify(119_999), BudgetTier::Orange);
        assert_eq!(t.classify(120_000), BudgetTier::Orange);
        assert_eq!(t.classify(139_999), BudgetTier::Orange);
        assert_eq!(t.classify(140_000), BudgetTier::Red);
        assert_eq!(t.classify(u64::MAX), BudgetTier::Red);
    }

    #[test]
    fn test_emergency_threshold() {
        let t = tracker();
        assert!(!t.is_emergency(139_999));
        assert!(t.is_emergency(140_000));
        assert_eq!(t.is_emergency(139_999), t.classify(139_999) == BudgetTier::Red);
        assert_eq!(t.is_emergency(140_000), t.classify(140_000) == BudgetTier::Red);
    }

    #[test]
    fn test_can_admit_is_inclusive_at_limit() {
        assert!(BudgetTracker::can_admit(100, 50, 50, 200));
        assert!(!BudgetTracker::can_admit(100, 51, 50, 200));
        assert!(!BudgetTracker::can_admit(u64::MAX, 1, 1, u64::MAX - 1));
    }

    #[test]
    fn test_red_decision_never_allows_launch() {
        let t = tracker();
        let red = t.check(140_000, 0);
        assert!(red.admitted);
        assert!(!red.allows_launch());
        assert_eq!(
            red.refusal().as_deref(),
            Some("red tier requires a split before scheduling")
        );

        let orange = t.check(130_000, 0);
        assert!(orange.allows_launch());
        assert!(orange.refusal().is_none());

        let over = t.check(10_000, 170_000);
        assert!(!over.allows_launch());
        assert!(over.refusal().unwrap().starts_with("projected 200000"));
    }

    #[test]
    fn test_equal_thresholds_rejected() {
        let thresholds = BudgetThresholds {
            optimal: 10,
            warning: 10,
            split_trigger: 20,
            emergency: 30,
        };
        assert!(matches!(
            BudgetTracker::new(thresholds, 0, 100),
            Err(OrchestratorError::InvalidThresholdConfig(_))
        ));
    }

    #[test]
    fn test_set_thresholds_keeps_old_on_error() {
        let mut t = tracker();
        let bad = BudgetThresholds {
            optimal: 50,
            warning: 40,
            split_trigger: 60,
            emergency: 70,
        };
        assert!(t.set_thresholds(bad).is_err());
        assert_eq!(t.thresholds(), BudgetThresholds::default());
    }
}
