//! Audit record: one per decision, append-only
//!
//! Corrections are new records whose header `supersedes` the original
//! decision id. Records are never edited in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AdsInputMetrics, Arm, AuthorityScore, Confidence, ReasonCode, RuleEvaluation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditHeader {
    pub decision_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_cohort: String,
    pub threshold_version: String,
    pub experiment_arm: Arm,
    pub model_version: String,
    /// Decision id this record corrects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditInputs {
    pub metrics: AdsInputMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPath {
    pub rule_evaluations: Vec<RuleEvaluation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorContribution {
    pub executor_used: bool,
    pub executor_role: String,
    /// `sha256:<hex>` of the serialized executor output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_output_hash: Option<String>,
    pub interpretable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticVerdict {
    pub contradictions: Vec<String>,
    pub confidence_degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_confidence: Option<Confidence>,
    pub hitl_required: bool,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDecision {
    pub decision_allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_score: Option<AuthorityScore>,
    pub recommended_protocols: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
}

/// Fully validated audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub header: AuditHeader,
    pub inputs: AuditInputs,
    pub decision_path: DecisionPath,
    pub executor_contribution: ExecutorContribution,
    pub critic_verdict: CriticVerdict,
    pub final_decision: FinalDecision,
}

/// Persisted row: record + integrity hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    pub record: AuditRecord,
    /// `sha256:<hex>` over `{header, inputs, final_decision}`
    pub integrity_hash: String,
    pub persisted_at: DateTime<Utc>,
}

/// Why a record could not be built
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditViolation {
    #[error("decision_id missing")]
    MissingDecisionId,
    #[error("threshold_version missing")]
    MissingThresholdVersion,
    #[error("no metric present in inputs")]
    NoMetrics,
    #[error("executor_used without llm_output_hash")]
    MissingExecutorHash,
    #[error("critic_verdict missing")]
    MissingCriticVerdict,
    #[error("section missing: {0}")]
    MissingSection(&'static str),
}
