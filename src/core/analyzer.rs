//! Threshold analyzer: deterministic batch statistics over outcomes
//!
//! No LLM involvement. Batches below `MIN_ANALYSIS_SAMPLES` are refused.

use crate::error::{AdsError, Result};
use crate::types::{
    AdsThresholds, AuthorityScore, BatchAnalysis, Boundary, BoundaryStress, MetricName, OutcomeData,
};
use crate::MIN_ANALYSIS_SAMPLES;

/// Width of the band just beyond an edge that counts as boundary stress
pub fn stress_window(metric: MetricName) -> f64 {
    match metric {
        MetricName::Wpm => 10.0,
        MetricName::PauseRatio => 0.05,
        MetricName::FillerRate => 0.02,
        MetricName::PitchVariance => 5.0,
        MetricName::EnergyStability => 0.1,
    }
}

/// LOW score, good outcome
pub fn is_false_negative(outcome: &OutcomeData) -> bool {
    outcome.authority_score == AuthorityScore::Low && outcome.outcome.is_good_outcome
}

/// HIGH score, poor outcome
pub fn is_false_positive(outcome: &OutcomeData) -> bool {
    outcome.authority_score == AuthorityScore::High && !outcome.outcome.is_good_outcome
}

/// FN and FP rates over a set, `(0, 0)` when empty
pub fn error_rates(outcomes: &[OutcomeData]) -> (f64, f64) {
    if outcomes.is_empty() {
        return (0.0, 0.0);
    }
    let n = outcomes.len() as f64;
    let fns = outcomes.iter().filter(|o| is_false_negative(o)).count() as f64;
    let fps = outcomes.iter().filter(|o| is_false_positive(o)).count() as f64;
    (fns / n, fps / n)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThresholdAnalyzer;

impl ThresholdAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze_batch(
        &self,
        outcomes: &[OutcomeData],
        thresholds: &AdsThresholds,
    ) -> Result<BatchAnalysis> {
        if outcomes.len() < MIN_ANALYSIS_SAMPLES {
            return Err(AdsError::InsufficientData {
                required: MIN_ANALYSIS_SAMPLES,
                actual: outcomes.len(),
            });
        }

        let sample_count = outcomes.len();
        let false_negatives = outcomes.iter().filter(|o| is_false_negative(o)).count();
        let false_positives = outcomes.iter().filter(|o| is_false_positive(o)).count();

        let mut boundary_stress = Vec::new();
        for metric in MetricName::ALL {
            for boundary in [Boundary::Lower, Boundary::Upper] {
                let Some(edge) = thresholds.edge(metric, boundary) else {
                    continue;
                };
                let window = stress_window(metric);
                let near_boundary_count = outcomes
                    .iter()
                    .filter(|o| o.outcome.is_good_outcome)
                    .filter_map(|o| o.metrics_snapshot.get(metric))
                    .filter(|v| just_beyond(*v, edge, window, boundary))
                    .count();
                boundary_stress.push(BoundaryStress {
                    metric,
                    boundary,
                    current_value: edge,
                    window,
                    near_boundary_count,
                    ratio: near_boundary_count as f64 / sample_count as f64,
                });
            }
        }

        Ok(BatchAnalysis {
            threshold_version: thresholds.version.clone(),
            sample_count,
            false_negatives,
            false_positives,
            fn_rate: false_negatives as f64 / sample_count as f64,
            fp_rate: false_positives as f64 / sample_count as f64,
            boundary_stress,
        })
    }
}

/// Upper: `(edge, edge + window]`. Lower: `[edge - window, edge)`.
fn just_beyond(value: f64, edge: f64, window: f64, boundary: Boundary) -> bool {
    match boundary {
        Boundary::Upper => value > edge && value <= edge + window,
        Boundary::Lower => value < edge && value >= edge - window,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AdsInputMetrics, Confidence, OutcomeReport, UserContext};
    use chrono::Utc;

    fn outcome(wpm: f64, score: AuthorityScore, good: bool) -> OutcomeData {
        OutcomeData {
            session_id: format!("sess-{}", wpm),
            authority_score: score,
            confidence: Confidence::Medium,
            context: UserContext::default(),
            outcome: OutcomeReport {
                is_good_outcome: good,
                ..Default::default()
            },
            metrics_snapshot: AdsInputMetrics::complete(wpm, 0.18, 0.02, 30.0, 0.8),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_precondition() {
        let batch: Vec<_> = (0..99).map(|_| outcome(135.0, AuthorityScore::Medium, true)).collect();
        let err = ThresholdAnalyzer::new()
            .analyze_batch(&batch, &AdsThresholds::baseline())
            .unwrap_err();
        assert!(err.to_string().starts_with("INSUFFICIENT_DATA"));
        assert!(matches!(err, AdsError::InsufficientData { required: 100, actual: 99 }));
    }

    #[test]
    fn test_fn_fp_counts() {
        let mut batch: Vec<_> = (0..96).map(|_| outcome(135.0, AuthorityScore::Medium, true)).collect();
        batch.push(outcome(135.0, AuthorityScore::Low, true));
        batch.push(outcome(135.0, AuthorityScore::Low, true));
        batch.push(outcome(135.0, AuthorityScore::High, false));
        batch.push(outcome(135.0, AuthorityScore::High, true));
        let analysis = ThresholdAnalyzer::new()
            .analyze_batch(&batch, &AdsThresholds::baseline())
            .unwrap();
        assert_eq!(analysis.false_negatives, 2);
        assert_eq!(analysis.false_positives, 1);
        assert!((analysis.fn_rate - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_stress_window_edges() {
        assert!(just_beyond(150.5, 150.0, 10.0, Boundary::Upper));
        assert!(just_beyond(160.0, 150.0, 10.0, Boundary::Upper));
        assert!(!just_beyond(150.0, 150.0, 10.0, Boundary::Upper));
        assert!(!just_beyond(160.1, 150.0, 10.0, Boundary::Upper));
        assert!(just_beyond(115.0, 120.0, 10.0, Boundary::Lower));
        assert!(!just_beyond(120.0, 120.0, 10.0, Boundary::Lower));
    }

    #[test]
    fn test_poor_outcomes_not_stress() {
        let mut batch: Vec<_> = (0..100).map(|_| outcome(135.0, AuthorityScore::Medium, true)).collect();
        for _ in 0..10 {
            batch.push(outcome(155.0, AuthorityScore::Medium, false));
        }
        let analysis = ThresholdAnalyzer::new()
            .analyze_batch(&batch, &AdsThresholds::baseline())
            .unwrap();
        let stress = analysis.stress_for(MetricName::Wpm, Boundary::Upper).unwrap();
        assert_eq!(stress.near_boundary_count, 0);
        assert_eq!(analysis.boundary_stress.len(), 7);
    }
}
