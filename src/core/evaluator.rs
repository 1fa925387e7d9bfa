//! Experiment evaluator: control (A) vs candidate (B) outcome sets

use crate::core::analyzer::error_rates;
use crate::types::{ExperimentEvaluation, OutcomeData, Recommendation};
use crate::{INCONCLUSIVE_EPSILON, PROMOTE_FN_IMPROVEMENT, PROMOTE_FP_DEGRADATION};

#[derive(Debug, Default, Clone, Copy)]
pub struct ExperimentEvaluator;

impl ExperimentEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, a: &[OutcomeData], b: &[OutcomeData]) -> ExperimentEvaluation {
        let (fn_rate_a, fp_rate_a) = error_rates(a);
        let (fn_rate_b, fp_rate_b) = error_rates(b);

        let fn_improvement = relative_change(fn_rate_a, fn_rate_a - fn_rate_b);
        let fp_degradation = relative_change(fp_rate_a, fp_rate_b - fp_rate_a);

        ExperimentEvaluation {
            sample_count_a: a.len(),
            sample_count_b: b.len(),
            fn_rate_a,
            fn_rate_b,
            fp_rate_a,
            fp_rate_b,
            fn_improvement,
            fp_degradation,
            recommendation: recommend(fn_improvement, fp_degradation),
        }
    }
}

/// `delta / base`; the raw delta when the base rate is zero
fn relative_change(base: f64, delta: f64) -> f64 {
    if base > 0.0 {
        delta / base
    } else {
        delta
    }
}

pub fn recommend(fn_improvement: f64, fp_degradation: f64) -> Recommendation {
    if fn_improvement.abs() < INCONCLUSIVE_EPSILON && fp_degradation.abs() < INCONCLUSIVE_EPSILON {
        Recommendation::INCONCLUSIVE
    } else if fn_improvement > PROMOTE_FN_IMPROVEMENT && fp_degradation < PROMOTE_FP_DEGRADATION {
        Recommendation::PROMOTE_B
    } else {
        Recommendation::KEEP_A
    }
}

// =============================================================================
// TESTS
// =============================================================================
