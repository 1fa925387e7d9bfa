//! Proposal generator: boundary stress → proposed threshold change
//!
//! Proposals only ever widen an edge, and only by a fixed increment. They do
//! nothing until a human approves them.

use chrono::Utc;
use uuid::Uuid;

use crate::types::{
    BatchAnalysis, Boundary, BoundaryStress, MetricName, ProposalStatus, ProposedChange,
    RiskAssessment, COHORT_ALL,
};
use crate::PROPOSAL_STRESS_RATIO;

/// Fixed widening step per metric
pub fn widening_increment(metric: MetricName) -> f64 {
    match metric {
        MetricName::Wpm => 5.0,
        MetricName::PauseRatio => 0.02,
        MetricName::FillerRate => 0.01,
        MetricName::PitchVariance => 2.0,
        MetricName::EnergyStability => 0.05,
    }
}

#[derive(Debug, Clone)]
pub struct ProposalGenerator {
    target_cohort: String,
}

impl Default for ProposalGenerator {
    fn default() -> Self {
        Self {
            target_cohort: COHORT_ALL.to_string(),
        }
    }
}

impl ProposalGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cohort the resulting experiment will target
    pub fn for_cohort(target_cohort: impl Into<String>) -> Self {
        Self {
            target_cohort: target_cohort.into(),
        }
    }

    /// One proposal per edge whose stress ratio exceeds 5 %
    pub fn generate(&self, analysis: &BatchAnalysis) -> Vec<ProposedChange> {
        analysis
            .boundary_stress
            .iter()
            .filter(|s| s.ratio > PROPOSAL_STRESS_RATIO)
            .map(|s| self.propose(analysis, s))
            .collect()
    }

    fn propose(&self, analysis: &BatchAnalysis, stress: &BoundaryStress) -> ProposedChange {
        let step = widening_increment(stress.metric);
        let proposed_value = match stress.boundary {
            Boundary::Upper => stress.current_value + step,
            Boundary::Lower => stress.current_value - step,
        };
        let side = match stress.boundary {
            Boundary::Upper => "above the upper",
            Boundary::Lower => "below the lower",
        };

        let justification = format!(
            "{} of {} outcomes ({:.1}%) had {} within {} {} bound of {} and were still reported \
             good; widening {} → {} (FN {}, FP {} in batch, version {})",
            stress.near_boundary_count,
            analysis.sample_count,
            stress.ratio * 100.0,
            stress.metric,
            stress.window,
            side,
            stress.current_value,
            stress.current_value,
            proposed_value,
            analysis.false_negatives,
            analysis.false_positives,
            analysis.threshold_version,
        );

        ProposedChange {
            proposal_id: Uuid::new_v4().to_string(),
            source_version: analysis.threshold_version.clone(),
            metric: stress.metric,
            boundary: stress.boundary,
            current_value: stress.current_value,
            proposed_value,
            justification,
            risk_assessment: assess_risk(stress.ratio, analysis.fp_rate),
            target_cohort: self.target_cohort.clone(),
            status: ProposalStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Strong evidence and few false positives → LOW risk
pub fn assess_risk(stress_ratio: f64, fp_rate: f64) -> RiskAssessment {
    if fp_rate >= 0.10 {
        RiskAssessment::High
    } else if stress_ratio >= 0.15 && fp_rate < 0.05 {
        RiskAssessment::Low
    } else {
        RiskAssessment::Moderate
    }
}

// =============================================================================
// TESTS
// =============================================================================
