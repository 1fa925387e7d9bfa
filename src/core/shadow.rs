//! Shadow mode: evaluate one decision against live and candidate thresholds
//!
//! Both evaluations reuse the same executor verdict, so only the threshold
//! set differs. Candidate results are for comparison logs only and never
//! reach the end user.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::critic::Critic;
use crate::core::normalize::{normalize_metrics_for_analyst, rule_based_score};
use crate::types::{AdsInput, AdsOutput, AdsThresholds, AuthorityScore, NormalizedMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShadowTag {
    Live,
    Candidate,
}

/// One side of a shadow comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowResult {
    pub tag: ShadowTag,
    pub threshold_version: String,
    pub normalized: NormalizedMetrics,
    pub rule_based_score: AuthorityScore,
    /// Critic-adjusted executor verdict under this threshold set
    pub output: AdsOutput,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowComparison {
    pub audio_sample_id: String,
    pub live: ShadowResult,
    pub candidate: ShadowResult,
    /// Labels, rule score or final score differ between the two sides
    pub diverged: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ShadowModeEngine;

impl ShadowModeEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run both sides concurrently on the same input and verdict
    pub async fn compare(
        &self,
        input: &AdsInput,
        executor_output: &AdsOutput,
        live: Arc<AdsThresholds>,
        candidate: Arc<AdsThresholds>,
    ) -> ShadowComparison {
        let (live, candidate) = tokio::join!(
            evaluate(ShadowTag::Live, input, executor_output, live),
            evaluate(ShadowTag::Candidate, input, executor_output, candidate),
        );

        let diverged = live.normalized != candidate.normalized
            || live.rule_based_score != candidate.rule_based_score
            || live.output.authority_score != candidate.output.authority_score;

        debug!(
            sample = %input.audio_sample_id,
            live = %live.threshold_version,
            candidate = %candidate.threshold_version,
            diverged,
            "shadow comparison"
        );

        ShadowComparison {
            audio_sample_id: input.audio_sample_id.clone(),
            live,
            candidate,
            diverged,
        }
    }
}

async fn evaluate(
    tag: ShadowTag,
    input: &AdsInput,
    executor_output: &AdsOutput,
    thresholds: Arc<AdsThresholds>,
) -> ShadowResult {
    let normalized = normalize_metrics_for_analyst(&input.metrics, &thresholds);
    let threshold_version = thresholds.version.clone();
    let critic = Critic::new(thresholds).validate(input, executor_output);
    ShadowResult {
        tag,
        threshold_version,
        normalized,
        rule_based_score: rule_based_score(&normalized),
        output: critic.output,
        flags: critic.flags,
    }
}

// =============================================================================
// TESTS
// =============================================================================
