use crate::features::{FeatureKey, FeatureSet};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SleepStage {
    Wake,
    #[serde(rename = "REM")]
    Rem,
    Deep,
    Light,
}

impl SleepStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            SleepStage::Wake => "Wake",
            SleepStage::Rem => "REM",
            SleepStage::Deep => "Deep",
            SleepStage::Light => "Light",
        }
    }
}

impl fmt::Display for SleepStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    AtLeast,
    AtMost,
}

impl Comparison {
    fn holds(self, value: f64, bound: f64) -> bool {
        match self {
            Comparison::AtLeast => value >= bound,
            Comparison::AtMost => value <= bound,
        }
    }

    fn symbol(self) -> char {
        match self {
            Comparison::AtLeast => '≥',
            Comparison::AtMost => '≤',
        }
    }
}

/// A single threshold test on one feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub key: FeatureKey,
    pub comparison: Comparison,
    pub bound: f64,
}

impl Condition {
    pub const fn at_least(key: FeatureKey, bound: f64) -> Self {
        Self {
            key,
            comparison: Comparison::AtLeast,
            bound,
        }
    }

    pub const fn at_most(key: FeatureKey, bound: f64) -> Self {
        Self {
            key,
            comparison: Comparison::AtMost,
            bound,
        }
    }

    /// Satisfied clause text such as `HR=55.0≤65.0`, or `None` if the feature is
    /// missing or out of bounds.
    pub fn check(&self, features: &FeatureSet) -> Option<String> {
        let value = features.get(self.key)?;
        if !self.comparison.holds(value, self.bound) {
            return None;
        }
        let shown = match self.key {
            FeatureKey::Hr => format!("{value:.1}"),
            _ => format!("{value:.3}"),
        };
        Some(format!(
            "{}={}{}{:?}",
            self.key,
            shown,
            self.comparison.symbol(),
            self.bound
        ))
    }
}

/// A stage assigned when every condition holds.
#[derive(Debug, Clone, Copy)]
pub struct StageRule {
    pub stage: SleepStage,
    pub conditions: &'static [Condition],
}

/// Rules in priority order; the first fully satisfied rule wins.
pub const RULES: [StageRule; 3] = [
    StageRule {
        stage: SleepStage::Wake,
        conditions: &[
            Condition::at_least(FeatureKey::Hr, 80.0),
            Condition::at_least(FeatureKey::Act, 0.15),
        ],
    },
    StageRule {
        stage: SleepStage::Deep,
        conditions: &[
            Condition::at_most(FeatureKey::Hr, 65.0),
            Condition::at_least(FeatureKey::Sdnn, 0.08),
            Condition::at_most(FeatureKey::Act, 0.05),
        ],
    },
    StageRule {
        stage: SleepStage::Rem,
        conditions: &[
            Condition::at_least(FeatureKey::Hr, 65.0),
            Condition::at_most(FeatureKey::Rmssd, 0.05),
            Condition::at_most(FeatureKey::Act, 0.10),
        ],
    },
];

/// Stage assigned when no rule matches.
pub const FALLBACK_STAGE: SleepStage = SleepStage::Light;

pub const FALLBACK_REASON: &str = "no stage rule matched → Light";

impl StageRule {
    /// Joined clause texts if every condition holds.
    pub fn evaluate(&self, features: &FeatureSet) -> Option<String> {
        let clauses = self
            .conditions
            .iter()
            .map(|c| c.check(features))
            .collect::<Option<Vec<_>>>()?;
        Some(clauses.join(", "))
    }
}

/// Assign a stage to a window's features, returning the label and its reason.
pub fn classify(features: &FeatureSet) -> (SleepStage, String) {
    classify_with_rules(features, &RULES)
}

pub fn classify_with_rules(features: &FeatureSet, rules: &[StageRule]) -> (SleepStage, String) {
    rules
        .iter()
        .find_map(|rule| rule.evaluate(features).map(|reason| (rule.stage, reason)))
        .unwrap_or_else(|| (FALLBACK_STAGE, FALLBACK_REASON.to_string()))
}
