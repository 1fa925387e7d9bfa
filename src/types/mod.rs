//! Core types for ADS

mod audit;
mod experiment;
mod learning;
mod level;
mod metrics;
mod output;
mod reason;
mod risk;
mod thresholds;

pub use audit::{
    AuditHeader, AuditInputs, AuditRecord, AuditRow, AuditViolation, CriticVerdict, DecisionPath,
    ExecutorContribution, FinalDecision,
};
pub use experiment::{Arm, ExperimentConfig, ExperimentStatus, ThresholdDecision, COHORT_ALL};
pub use learning::{
    ApprovalRecord, ApprovalSubject, BatchAnalysis, BoundaryStress, ExperimentEvaluation,
    OutcomeData, OutcomeReport, ProposalStatus, ProposedChange, Recommendation, ReviewDecision,
    RiskAssessment,
};
pub use level::{AuthorityScore, Confidence};
pub use metrics::{AdsInput, AdsInputMetrics, MetricName, UserContext};
pub use output::{AdsOutput, RiskFlag, SignalBreakdown};
pub use reason::{NextAction, ReasonCode};
pub use risk::{AuditLevel, BoundaryBuffer, RiskProfile, RiskProfileId, Tolerance};
pub use thresholds::{
    AdsThresholds, Boundary, LowerFloor, MetricStatus, NormalizedMetrics, OptimalRange,
    RuleEvaluation, RuleResult, UpperCap, BASELINE_THRESHOLD_VERSION,
};
