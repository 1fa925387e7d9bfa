//! Core modules for ADS

pub mod analyzer;
pub mod audit;
pub mod critic;
pub mod evaluator;
pub mod executor;
pub mod gate;
pub mod hashing;
pub mod history;
pub mod human_gate;
pub mod normalize;
pub mod outcomes;
pub mod pipeline;
pub mod proposal;
pub mod provider;
pub mod repository;
pub mod risk;
pub mod router;
pub mod shadow;
pub mod store;
pub mod voice_map;

pub use analyzer::ThresholdAnalyzer;
pub use audit::AuditTrailBuilder;
pub use critic::{Critic, CriticOutput};
pub use evaluator::ExperimentEvaluator;
pub use executor::{Executor, ExecutorError, ExecutorRun};
pub use gate::{check_decision_allowed, gate_rejection};
pub use history::{InMemoryMetricHistory, MetricHistoryEntry, MetricHistoryStore};
pub use human_gate::HumanGate;
pub use normalize::{normalize_metrics_for_analyst, rule_based_score, rule_evaluations};
pub use outcomes::OutcomeCollector;
pub use pipeline::{DecisionContext, DecisionPipeline};
pub use proposal::ProposalGenerator;
pub use provider::{CompletionProvider, CompletionRequest, HttpCompletionProvider, ProviderError};
pub use repository::{AuditRepository, AuditStore, JsonlAuditStore, MemoryAuditStore};
pub use risk::{RiskAwareCritic, RiskRules};
pub use router::{ExperimentRegistry, ThresholdRouter};
pub use shadow::{ShadowComparison, ShadowModeEngine};
pub use store::ThresholdStore;
pub use voice_map::{map_voice_metrics, VoiceAnalysis};
