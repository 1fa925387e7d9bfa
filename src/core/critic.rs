//! Critic: deterministic audit of the executor verdict
//!
//! Hard caps, evaluated against the executor's claimed score so they stack:
//! - C1: wpm outside [100, 180] with HIGH → MEDIUM, confidence low
//! - C2: filler_rate > 0.08 with HIGH → MEDIUM, confidence low
//! - C3: pitch_variance < 10 with HIGH → MEDIUM, confidence untouched
//! - Confidence forced low → hitl_required
//!
//! Never downgrades below MEDIUM. Near-boundary flags are informational.

use std::sync::Arc;

use crate::core::normalize::near_boundaries;
use crate::types::{
    AdsInput, AdsOutput, AdsThresholds, AuthorityScore, Boundary, Confidence, CriticVerdict,
};
use crate::{CRITIC_FILLER_RATE_MAX, CRITIC_PITCH_VARIANCE_MIN, CRITIC_WPM_MAX, CRITIC_WPM_MIN};

pub const FLAG_WPM_DOWNGRADE: &str = "CRITIC_DOWNGRADE_WPM_OUT_OF_RANGE";
pub const FLAG_FILLER_DOWNGRADE: &str = "CRITIC_DOWNGRADE_FILLER_RATE_EXCEEDED";
pub const FLAG_PITCH_DOWNGRADE: &str = "CRITIC_DOWNGRADE_PITCH_VARIANCE_LOW";
pub const FLAG_NEAR_BOUNDARY_PREFIX: &str = "NEAR_BOUNDARY_";

/// Critic result: the adjusted output plus what was changed and why
#[derive(Debug, Clone, PartialEq)]
pub struct CriticOutput {
    pub output: AdsOutput,
    pub contradictions: Vec<String>,
    pub confidence_degraded: bool,
    pub flags: Vec<String>,
}

impl CriticOutput {
    /// Unchanged pass-through (rejected decisions)
    pub fn passthrough(output: AdsOutput) -> Self {
        Self {
            output,
            contradictions: Vec::new(),
            confidence_degraded: false,
            flags: Vec::new(),
        }
    }

    /// Audit view
    pub fn verdict(&self) -> CriticVerdict {
        CriticVerdict {
            contradictions: self.contradictions.clone(),
            confidence_degraded: self.confidence_degraded,
            final_confidence: self.output.confidence,
            hitl_required: self.output.needs_review(),
            flags: self.flags.clone(),
        }
    }
}

/// Base critic bound to one threshold snapshot
#[derive(Debug, Clone)]
pub struct Critic {
    thresholds: Arc<AdsThresholds>,
}

impl Critic {
    pub fn new(thresholds: Arc<AdsThresholds>) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AdsThresholds {
        &self.thresholds
    }

    /// Audit an executor verdict. Pure: same inputs, same output.
    pub fn validate(&self, input: &AdsInput, executor_output: &AdsOutput) -> CriticOutput {
        if !executor_output.decision_allowed {
            return CriticOutput::passthrough(executor_output.clone());
        }

        let mut result = CriticOutput::passthrough(executor_output.clone());
        let claimed_high = executor_output.authority_score == Some(AuthorityScore::High);
        let metrics = &input.metrics;
        let mut force_low = false;

        // C1
        if let Some(wpm) = metrics.wpm {
            if claimed_high && (wpm < CRITIC_WPM_MIN || wpm > CRITIC_WPM_MAX) {
                result.contradictions.push(format!(
                    "HIGH authority with wpm {:.1} outside [{}, {}]",
                    wpm, CRITIC_WPM_MIN, CRITIC_WPM_MAX
                ));
                result.flags.push(FLAG_WPM_DOWNGRADE.to_string());
                force_low = true;
            }
        }

        // C2
        if let Some(filler) = metrics.filler_rate {
            if claimed_high && filler > CRITIC_FILLER_RATE_MAX {
                result.contradictions.push(format!(
                    "HIGH authority with filler_rate {:.3} above {}",
                    filler, CRITIC_FILLER_RATE_MAX
                ));
                result.flags.push(FLAG_FILLER_DOWNGRADE.to_string());
                force_low = true;
            }
        }

        // C3: downgrade only, confidence left as reported
        if let Some(pitch) = metrics.pitch_variance {
            if claimed_high && pitch < CRITIC_PITCH_VARIANCE_MIN {
                result.contradictions.push(format!(
                    "HIGH authority with pitch_variance {:.1} below {}",
                    pitch, CRITIC_PITCH_VARIANCE_MIN
                ));
                result.flags.push(FLAG_PITCH_DOWNGRADE.to_string());
            }
        }

        if !result.flags.is_empty() {
            result.output.authority_score = Some(AuthorityScore::Medium);
        }

        if force_low {
            result.confidence_degraded = executor_output.confidence != Some(Confidence::Low);
            result.output.confidence = Some(Confidence::Low);
            result.output.hitl_required = Some(true);
        }

        for (metric, boundary) in near_boundaries(metrics, &self.thresholds) {
            let side = match boundary {
                Boundary::Lower => "LOWER",
                Boundary::Upper => "UPPER",
            };
            result.flags.push(format!(
                "{}{}_{}",
                FLAG_NEAR_BOUNDARY_PREFIX,
                metric.as_str().to_ascii_uppercase(),
                side
            ));
        }

        result
    }
}

// =============================================================================
// TESTS
// =============================================================================
