//! Audit trail builder
//!
//! Key invariant: a record that fails `validate_audit_invariants` is never
//! built, so it can never reach the repository.

use chrono::{DateTime, Utc};

use crate::core::critic::CriticOutput;
use crate::core::executor::ExecutorRun;
use crate::core::normalize::rule_evaluations;
use crate::types::{
    AdsInputMetrics, AdsOutput, AdsThresholds, Arm, AuditHeader, AuditInputs, AuditRecord,
    AuditViolation, CriticVerdict, DecisionPath, ExecutorContribution, FinalDecision,
};
use crate::EXECUTOR_ROLE;

/// Step builder for one `AuditRecord`
#[derive(Debug, Default)]
pub struct AuditTrailBuilder {
    decision_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    user_cohort: String,
    threshold_version: Option<String>,
    experiment_arm: Option<Arm>,
    model_version: String,
    supersedes: Option<String>,
    inputs: Option<AuditInputs>,
    decision_path: Option<DecisionPath>,
    executor_contribution: Option<ExecutorContribution>,
    critic_verdict: Option<CriticVerdict>,
    final_decision: Option<FinalDecision>,
}

impl AuditTrailBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(
        mut self,
        decision_id: impl Into<String>,
        user_cohort: impl Into<String>,
        threshold_version: impl Into<String>,
        experiment_arm: Arm,
        model_version: impl Into<String>,
    ) -> Self {
        self.decision_id = Some(decision_id.into());
        self.user_cohort = user_cohort.into();
        self.threshold_version = Some(threshold_version.into());
        self.experiment_arm = Some(experiment_arm);
        self.model_version = model_version.into();
        self
    }

    /// Fixed timestamp (defaults to build time)
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Mark this record as a correction of an earlier decision
    pub fn supersedes(mut self, decision_id: impl Into<String>) -> Self {
        self.supersedes = Some(decision_id.into());
        self
    }

    pub fn inputs(mut self, metrics: AdsInputMetrics) -> Self {
        self.inputs = Some(AuditInputs { metrics });
        self
    }

    /// Rule evaluations derived from thresholds + metrics only
    pub fn decision_path_from(mut self, thresholds: &AdsThresholds, metrics: &AdsInputMetrics) -> Self {
        self.decision_path = Some(DecisionPath {
            rule_evaluations: rule_evaluations(metrics, thresholds),
        });
        self
    }

    /// `None` when the executor never produced a verdict
    pub fn executor_contribution(mut self, run: Option<&ExecutorRun>) -> Self {
        self.executor_contribution = Some(match run {
            Some(run) => ExecutorContribution {
                executor_used: true,
                executor_role: EXECUTOR_ROLE.to_string(),
                llm_output_hash: Some(run.output_hash.clone()),
                interpretable: run.interpretable,
            },
            None => ExecutorContribution {
                executor_used: false,
                executor_role: EXECUTOR_ROLE.to_string(),
                llm_output_hash: None,
                interpretable: false,
            },
        });
        self
    }

    /// Raw contribution, for records assembled outside the pipeline
    pub fn executor_contribution_raw(mut self, contribution: ExecutorContribution) -> Self {
        self.executor_contribution = Some(contribution);
        self
    }

    pub fn critic_verdict(mut self, verdict: CriticVerdict) -> Self {
        self.critic_verdict = Some(verdict);
        self
    }

    pub fn critic_output(self, critic: &CriticOutput) -> Self {
        self.critic_verdict(critic.verdict())
    }

    pub fn final_decision(mut self, output: &AdsOutput) -> Self {
        self.final_decision = Some(FinalDecision {
            decision_allowed: output.decision_allowed,
            authority_score: output.authority_score,
            recommended_protocols: output.protocols().to_vec(),
            reason: output.reason,
        });
        self
    }

    /// Validate and assemble
    pub fn build(self) -> Result<AuditRecord, AuditViolation> {
        validate_audit_invariants(&self)?;

        let decision_id = self.decision_id.ok_or(AuditViolation::MissingDecisionId)?;
        let threshold_version = self
            .threshold_version
            .ok_or(AuditViolation::MissingThresholdVersion)?;

        Ok(AuditRecord {
            header: AuditHeader {
                decision_id,
                timestamp: self.timestamp.unwrap_or_else(Utc::now),
                user_cohort: self.user_cohort,
                threshold_version,
                experiment_arm: self.experiment_arm.unwrap_or(Arm::A),
                model_version: self.model_version,
                supersedes: self.supersedes,
            },
            inputs: self.inputs.ok_or(AuditViolation::MissingSection("inputs"))?,
            decision_path: self
                .decision_path
                .ok_or(AuditViolation::MissingSection("decision_path"))?,
            executor_contribution: self
                .executor_contribution
                .ok_or(AuditViolation::MissingSection("executor_contribution"))?,
            critic_verdict: self.critic_verdict.ok_or(AuditViolation::MissingCriticVerdict)?,
            final_decision: self
                .final_decision
                .ok_or(AuditViolation::MissingSection("final_decision"))?,
        })
    }
}

/// Reject incomplete records before they are assembled
fn validate_audit_invariants(b: &AuditTrailBuilder) -> Result<(), AuditViolation> {
    if b.decision_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
        return Err(AuditViolation::MissingDecisionId);
    }
    if b.threshold_version.as_deref().map_or(true, |v| v.trim().is_empty()) {
        return Err(AuditViolation::MissingThresholdVersion);
    }
    match &b.inputs {
        None => return Err(AuditViolation::MissingSection("inputs")),
        Some(inputs) if inputs.metrics.present_count() == 0 => {
            return Err(AuditViolation::NoMetrics)
        }
        _ => {}
    }
    if let Some(contribution) = &b.executor_contribution {
        if contribution.executor_used && contribution.llm_output_hash.is_none() {
            return Err(AuditViolation::MissingExecutorHash);
        }
    }
    if b.critic_verdict.is_none() {
        return Err(AuditViolation::MissingCriticVerdict);
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
