//! Learning loop types: outcomes, analysis, proposals, approvals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AdsInputMetrics, AuthorityScore, Boundary, Confidence, MetricName, UserContext};

/// Self-reported result of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub is_good_outcome: bool,
    /// 1-5 self rating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_achieved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One feedback sample. Consumed only in aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeData {
    pub session_id: String,
    pub authority_score: AuthorityScore,
    pub confidence: Confidence,
    #[serde(default)]
    pub context: UserContext,
    pub outcome: OutcomeReport,
    pub metrics_snapshot: AdsInputMetrics,
    pub timestamp: DateTime<Utc>,
}

/// Good outcomes sitting just beyond one threshold edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryStress {
    pub metric: MetricName,
    pub boundary: Boundary,
    pub current_value: f64,
    /// Width of the band just beyond the edge that was counted
    pub window: f64,
    pub near_boundary_count: usize,
    /// near_boundary_count / sample_count
    pub ratio: f64,
}

/// Deterministic summary of one outcome batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAnalysis {
    pub threshold_version: String,
    pub sample_count: usize,
    pub false_negatives: usize,
    pub false_positives: usize,
    pub fn_rate: f64,
    pub fp_rate: f64,
    pub boundary_stress: Vec<BoundaryStress>,
}

impl BatchAnalysis {
    pub fn stress_for(&self, metric: MetricName, boundary: Boundary) -> Option<&BoundaryStress> {
        self.boundary_stress
            .iter()
            .find(|s| s.metric == metric && s.boundary == boundary)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskAssessment {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
}

/// A threshold change waiting for a human decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedChange {
    pub proposal_id: String,
    pub source_version: String,
    pub metric: MetricName,
    pub boundary: Boundary,
    pub current_value: f64,
    pub proposed_value: f64,
    pub justification: String,
    pub risk_assessment: RiskAssessment,
    pub target_cohort: String,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// What an approval acted on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalSubject {
    ThresholdChange { proposal_id: String },
    Promotion { experiment_id: String },
}

/// Logged for every human decision, approve or reject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub subject: ApprovalSubject,
    pub approver_id: String,
    pub decision: ReviewDecision,
    pub reason: String,
    /// Version published (threshold change) or made live (promotion)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resulting_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum Recommendation {
    PROMOTE_B,
    KEEP_A,
    INCONCLUSIVE,
}

/// Control vs candidate comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentEvaluation {
    pub sample_count_a: usize,
    pub sample_count_b: usize,
    pub fn_rate_a: f64,
    pub fn_rate_b: f64,
    pub fp_rate_a: f64,
    pub fp_rate_b: f64,
    /// Relative FN reduction of B vs A (positive is better)
    pub fn_improvement: f64,
    /// Relative FP increase of B vs A (positive is worse)
    pub fp_degradation: f64,
    pub recommendation: Recommendation,
}
