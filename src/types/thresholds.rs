//! Versioned threshold sets and per-metric evaluation labels

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::MetricName;

/// Version id of the baseline threshold set
pub const BASELINE_THRESHOLD_VERSION: &str = "ads-v1";

/// Two-sided optimal range `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimalRange {
    pub optimal: [f64; 2],
}

impl OptimalRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { optimal: [min, max] }
    }

    pub fn min(&self) -> f64 {
        self.optimal[0]
    }

    pub fn max(&self) -> f64 {
        self.optimal[1]
    }

    pub fn span(&self) -> f64 {
        self.max() - self.min()
    }
}

/// One-sided upper cap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpperCap {
    pub max: f64,
}

/// One-sided lower floor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowerFloor {
    pub min: f64,
}

/// Which edge of a metric's accepted region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Boundary {
    Lower,
    Upper,
}

/// A published threshold version. Never mutated; new versions are appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdsThresholds {
    pub version: String,
    pub effective_date: DateTime<Utc>,
    pub wpm: OptimalRange,
    pub pause_ratio: OptimalRange,
    pub filler_rate: UpperCap,
    pub pitch_variance: LowerFloor,
    pub energy_stability: LowerFloor,
}

impl AdsThresholds {
    /// Baseline version `ads-v1`
    pub fn baseline() -> Self {
        Self {
            version: BASELINE_THRESHOLD_VERSION.to_string(),
            effective_date: DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default(),
            wpm: OptimalRange::new(120.0, 150.0),
            pause_ratio: OptimalRange::new(0.10, 0.25),
            filler_rate: UpperCap { max: 0.05 },
            pitch_variance: LowerFloor { min: 20.0 },
            energy_stability: LowerFloor { min: 0.60 },
        }
    }

    /// Value of one edge, if the metric has that edge
    pub fn edge(&self, metric: MetricName, boundary: Boundary) -> Option<f64> {
        match (metric, boundary) {
            (MetricName::Wpm, Boundary::Lower) => Some(self.wpm.min()),
            (MetricName::Wpm, Boundary::Upper) => Some(self.wpm.max()),
            (MetricName::PauseRatio, Boundary::Lower) => Some(self.pause_ratio.min()),
            (MetricName::PauseRatio, Boundary::Upper) => Some(self.pause_ratio.max()),
            (MetricName::FillerRate, Boundary::Upper) => Some(self.filler_rate.max),
            (MetricName::PitchVariance, Boundary::Lower) => Some(self.pitch_variance.min),
            (MetricName::EnergyStability, Boundary::Lower) => Some(self.energy_stability.min),
            _ => None,
        }
    }

    /// Copy with one edge moved and a new version id
    pub fn with_edge(
        &self,
        version: impl Into<String>,
        metric: MetricName,
        boundary: Boundary,
        value: f64,
    ) -> Self {
        let mut next = self.clone();
        next.version = version.into();
        next.effective_date = Utc::now();
        match (metric, boundary) {
            (MetricName::Wpm, Boundary::Lower) => next.wpm.optimal[0] = value,
            (MetricName::Wpm, Boundary::Upper) => next.wpm.optimal[1] = value,
            (MetricName::PauseRatio, Boundary::Lower) => next.pause_ratio.optimal[0] = value,
            (MetricName::PauseRatio, Boundary::Upper) => next.pause_ratio.optimal[1] = value,
            (MetricName::FillerRate, _) => next.filler_rate.max = value,
            (MetricName::PitchVariance, _) => next.pitch_variance.min = value,
            (MetricName::EnergyStability, _) => next.energy_stability.min = value,
        }
        next
    }
}

impl Default for AdsThresholds {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Deterministic label for one metric against one threshold version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricStatus {
    Optimal,
    Slow,
    Fast,
    TooFewPauses,
    TooManyPauses,
    High,
    Monotone,
    Unstable,
    Missing,
}

impl MetricStatus {
    pub fn is_optimal(&self) -> bool {
        matches!(self, MetricStatus::Optimal)
    }
}

impl std::fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MetricStatus::Optimal => "OPTIMAL",
            MetricStatus::Slow => "SLOW",
            MetricStatus::Fast => "FAST",
            MetricStatus::TooFewPauses => "TOO_FEW_PAUSES",
            MetricStatus::TooManyPauses => "TOO_MANY_PAUSES",
            MetricStatus::High => "HIGH",
            MetricStatus::Monotone => "MONOTONE",
            MetricStatus::Unstable => "UNSTABLE",
            MetricStatus::Missing => "MISSING",
        };
        write!(f, "{}", name)
    }
}

/// Labels handed to the executor instead of raw thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    pub wpm: MetricStatus,
    pub pause_ratio: MetricStatus,
    pub filler_rate: MetricStatus,
    pub pitch_variance: MetricStatus,
    pub energy_stability: MetricStatus,
}

impl NormalizedMetrics {
    pub fn get(&self, metric: MetricName) -> MetricStatus {
        match metric {
            MetricName::Wpm => self.wpm,
            MetricName::PauseRatio => self.pause_ratio,
            MetricName::FillerRate => self.filler_rate,
            MetricName::PitchVariance => self.pitch_variance,
            MetricName::EnergyStability => self.energy_stability,
        }
    }

    /// Count of metrics inside their optimal region
    pub fn optimal_count(&self) -> usize {
        MetricName::ALL
            .iter()
            .filter(|m| self.get(**m).is_optimal())
            .count()
    }
}

/// PASS / FAIL / SKIPPED for one rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleResult {
    Pass,
    Fail,
    Skipped,
}

/// One deterministic rule evaluation, as recorded in the audit decision path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    pub rule: String,
    pub threshold: String,
    pub value: Option<f64>,
    pub result: RuleResult,
}
