//! Human gate: the only path from a proposal to a new threshold version
//!
//! Key invariants:
//! - Nothing is published without an APPROVE from a named approver
//! - Every decision, approve or reject, lands in the approval log
//! - An approved change starts an experiment; it never goes live directly

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::router::ExperimentRegistry;
use crate::core::store::ThresholdStore;
use crate::error::{AdsError, Result};
use crate::types::{
    ApprovalRecord, ApprovalSubject, ExperimentConfig, ExperimentEvaluation, ExperimentStatus,
    ProposalStatus, ProposedChange, Recommendation, ReviewDecision,
};

#[derive(Debug)]
pub struct HumanGate {
    store: Arc<ThresholdStore>,
    registry: Arc<ExperimentRegistry>,
    proposals: Mutex<Vec<ProposedChange>>,
    log: Mutex<Vec<ApprovalRecord>>,
}

impl HumanGate {
    pub fn new(store: Arc<ThresholdStore>, registry: Arc<ExperimentRegistry>) -> Self {
        Self {
            store,
            registry,
            proposals: Mutex::new(Vec::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Queue proposals for review
    pub fn submit(&self, proposals: impl IntoIterator<Item = ProposedChange>) {
        let mut queue = self.proposals.lock();
        for proposal in proposals {
            info!(
                proposal = %proposal.proposal_id,
                metric = %proposal.metric,
                from = proposal.current_value,
                to = proposal.proposed_value,
                "proposal queued for review"
            );
            queue.push(proposal);
        }
    }

    pub fn pending_proposals(&self) -> Vec<ProposedChange> {
        self.proposals
            .lock()
            .iter()
            .filter(|p| p.status == ProposalStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn proposal(&self, proposal_id: &str) -> Option<ProposedChange> {
        self.proposals
            .lock()
            .iter()
            .find(|p| p.proposal_id == proposal_id)
            .cloned()
    }

    /// Approval log, oldest first
    pub fn approval_log(&self) -> Vec<ApprovalRecord> {
        self.log.lock().clone()
    }

    /// APPROVE publishes a new version and starts an ACTIVE experiment
    /// (A = current live, B = new version). REJECT only records the decision.
    pub fn approve_change(
        &self,
        proposal_id: &str,
        approver_id: &str,
        decision: ReviewDecision,
        reason: &str,
    ) -> Result<ApprovalRecord> {
        let mut proposals = self.proposals.lock();
        let proposal = proposals
            .iter_mut()
            .find(|p| p.proposal_id == proposal_id)
            .ok_or_else(|| AdsError::ProposalNotFound(proposal_id.to_string()))?;
        if proposal.status != ProposalStatus::Pending {
            return Err(AdsError::ProposalAlreadyDecided(proposal_id.to_string()));
        }

        let mut record = ApprovalRecord {
            subject: ApprovalSubject::ThresholdChange {
                proposal_id: proposal_id.to_string(),
            },
            approver_id: approver_id.to_string(),
            decision,
            reason: reason.to_string(),
            resulting_version: None,
            experiment_id: None,
            decided_at: Utc::now(),
        };

        match decision {
            ReviewDecision::Reject => {
                proposal.status = ProposalStatus::Rejected;
                info!(proposal = proposal_id, approver = approver_id, "proposal rejected");
            }
            ReviewDecision::Approve => {
                let source = self.store.resolve(&proposal.source_version)?;
                let version = self.store.next_version_id();
                let candidate = source.with_edge(
                    version.clone(),
                    proposal.metric,
                    proposal.boundary,
                    proposal.proposed_value,
                );
                self.store.publish(candidate)?;

                let experiment_id = format!("exp-{}", Uuid::new_v4());
                self.registry.add(ExperimentConfig::active(
                    experiment_id.clone(),
                    proposal.target_cohort.clone(),
                    self.store.live_version(),
                    version.clone(),
                ));

                proposal.status = ProposalStatus::Approved;
                record.resulting_version = Some(version.clone());
                record.experiment_id = Some(experiment_id.clone());
                info!(
                    proposal = proposal_id,
                    approver = approver_id,
                    %version,
                    experiment = %experiment_id,
                    "proposal approved, experiment started"
                );
            }
        }

        self.log.lock().push(record.clone());
        Ok(record)
    }

    /// Make the experiment's candidate live. Refused unless the experiment is
    /// still ACTIVE and the evaluation recommends PROMOTE_B; refusals are
    /// logged too.
    pub fn approve_promotion(
        &self,
        experiment_id: &str,
        approver_id: &str,
        evaluation: &ExperimentEvaluation,
        reason: &str,
    ) -> Result<ApprovalRecord> {
        let experiment = self
            .registry
            .get(experiment_id)
            .ok_or_else(|| AdsError::ExperimentNotFound(experiment_id.to_string()))?;

        let mut record = ApprovalRecord {
            subject: ApprovalSubject::Promotion {
                experiment_id: experiment_id.to_string(),
            },
            approver_id: approver_id.to_string(),
            decision: ReviewDecision::Reject,
            reason: reason.to_string(),
            resulting_version: None,
            experiment_id: Some(experiment_id.to_string()),
            decided_at: Utc::now(),
        };

        let refusal = if experiment.status != ExperimentStatus::Active {
            Some(format!("{} is {:?}, not active", experiment_id, experiment.status))
        } else if evaluation.recommendation != Recommendation::PROMOTE_B {
            Some(format!("{} recommends {:?}", experiment_id, evaluation.recommendation))
        } else {
            None
        };
        if let Some(refusal) = refusal {
            warn!(
                experiment = experiment_id,
                approver = approver_id,
                status = ?experiment.status,
                recommendation = ?evaluation.recommendation,
                "promotion refused"
            );
            self.log.lock().push(record);
            return Err(AdsError::PromotionRejected(refusal));
        }

        self.store.set_live(&experiment.candidate_version)?;
        self.registry
            .set_status(experiment_id, ExperimentStatus::Completed)?;

        record.decision = ReviewDecision::Approve;
        record.resulting_version = Some(experiment.candidate_version.clone());
        info!(
            experiment = experiment_id,
            approver = approver_id,
            version = %experiment.candidate_version,
            "candidate promoted to live"
        );
        self.log.lock().push(record.clone());
        Ok(record)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AdsThresholds, Boundary, MetricName, RiskAssessment};

    fn proposal() -> ProposedChange {
        ProposedChange {
            proposal_id: "p-1".into(),
            source_version: "ads-v1".into(),
            metric: MetricName::Wpm,
            boundary: Boundary::Upper,
            current_value: 150.0,
            proposed_value: 155.0,
            justification: "20 of 150".into(),
            risk_assessment: RiskAssessment::Low,
            target_cohort: "all".into(),
            status: ProposalStatus::Pending,
            created_at: Utc::now(),
        }
    }

    fn gate() -> (HumanGate, Arc<ThresholdStore>, Arc<ExperimentRegistry>) {
        let store = Arc::new(ThresholdStore::new(AdsThresholds::baseline()));
        let registry = Arc::new(ExperimentRegistry::new());
        let gate = HumanGate::new(store.clone(), registry.clone());
        gate.submit([proposal()]);
        (gate, store, registry)
    }

    fn evaluation(recommendation: Recommendation) -> ExperimentEvaluation {
        ExperimentEvaluation {
            sample_count_a: 200,
            sample_count_b: 200,
            fn_rate_a: 0.1,
            fn_rate_b: 0.05,
            fp_rate_a: 0.05,
            fp_rate_b: 0.05,
            fn_improvement: 0.5,
            fp_degradation: 0.0,
            recommendation,
        }
    }

    #[test]
    fn test_approve_publishes_and_starts_experiment() {
        let (gate, store, registry) = gate();
        let record = gate
            .approve_change("p-1", "reviewer-1", ReviewDecision::Approve, "evidence is solid")
            .unwrap();
        assert_eq!(record.resulting_version.as_deref(), Some("ads-v2"));
        assert_eq!(store.live_version(), "ads-v1");
        assert_eq!(store.resolve("ads-v2").unwrap().wpm.max(), 155.0);

        let experiment = registry.active_for("anyone").unwrap();
        assert_eq!(experiment.control_version, "ads-v1");
        assert_eq!(experiment.candidate_version, "ads-v2");
        assert!(gate.pending_proposals().is_empty());
    }

    #[test]
    fn test_reject_publishes_nothing() {
        let (gate, store, registry) = gate();
        gate.approve_change("p-1", "reviewer-1", ReviewDecision::Reject, "too early")
            .unwrap();
        assert_eq!(store.versions(), vec!["ads-v1"]);
        assert!(registry.list().is_empty());
        let log = gate.approval_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].approver_id, "reviewer-1");
        assert_eq!(log[0].reason, "too early");
    }

    #[test]
    fn test_double_decision_refused() {
        let (gate, _, _) = gate();
        gate.approve_change("p-1", "r", ReviewDecision::Reject, "no").unwrap();
        assert!(matches!(
            gate.approve_change("p-1", "r", ReviewDecision::Approve, "yes"),
            Err(AdsError::ProposalAlreadyDecided(_))
        ));
        assert!(matches!(
            gate.approve_change("p-9", "r", ReviewDecision::Approve, "yes"),
            Err(AdsError::ProposalNotFound(_))
        ));
    }

    #[test]
    fn test_promotion_requires_promote_b() {
        let (gate, store, _) = gate();
        let record = gate
            .approve_change("p-1", "r", ReviewDecision::Approve, "ok")
            .unwrap();
        let experiment_id = record.experiment_id.unwrap();

        let refused = gate.approve_promotion(&experiment_id, "r", &evaluation(Recommendation::KEEP_A), "try");
        assert!(matches!(refused, Err(AdsError::PromotionRejected(_))));
        assert_eq!(store.live_version(), "ads-v1");

        gate.approve_promotion(&experiment_id, "r", &evaluation(Recommendation::PROMOTE_B), "clear win")
            .unwrap();
        assert_eq!(store.live_version(), "ads-v2");
        assert_eq!(gate.approval_log().len(), 3);
    }

    #[test]
    fn test_promotion_requires_active_experiment() {
        let (gate, store, registry) = gate();
        let record = gate
            .approve_change("p-1", "r", ReviewDecision::Approve, "ok")
            .unwrap();
        let experiment_id = record.experiment_id.unwrap();
        registry.set_status(&experiment_id, ExperimentStatus::Paused).unwrap();

        let refused = gate.approve_promotion(&experiment_id, "r", &evaluation(Recommendation::PROMOTE_B), "win");
        assert!(matches!(refused, Err(AdsError::PromotionRejected(ref m)) if m.contains("Paused")));
        assert_eq!(store.live_version(), "ads-v1");

        registry.set_status(&experiment_id, ExperimentStatus::Active).unwrap();
        gate.approve_promotion(&experiment_id, "r", &evaluation(Recommendation::PROMOTE_B), "win")
            .unwrap();
        let again = gate.approve_promotion(&experiment_id, "r", &evaluation(Recommendation::PROMOTE_B), "twice");
        assert!(matches!(again, Err(AdsError::PromotionRejected(_))));

        let log = gate.approval_log();
        assert_eq!(log.len(), 4);
        assert_eq!(log[1].decision, ReviewDecision::Reject);
        assert_eq!(log[3].decision, ReviewDecision::Reject);
    }
}
