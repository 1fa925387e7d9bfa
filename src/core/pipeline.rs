//! Decision pipeline: the single entry point for one authority decision
//!
//! Order per decision:
//! route → threshold snapshot → risk buffer → gate → executor → critic →
//! risk-aware critic → audit → persist → history
//!
//! Gate rejections and executor failures are returned as `Ok` outputs with
//! `decision_allowed = false` and audited like any other decision. Only
//! audit violations, storage failures and unknown pinned versions are `Err`.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::audit::AuditTrailBuilder;
use crate::core::critic::{Critic, CriticOutput};
use crate::core::executor::{Executor, ExecutorRun};
use crate::core::gate::gate_rejection;
use crate::core::history::{InMemoryMetricHistory, MetricHistoryEntry, MetricHistoryStore};
use crate::core::normalize::normalize_metrics_for_analyst;
use crate::core::repository::AuditRepository;
use crate::core::risk::{apply_risk_rules, RiskAwareCritic, RiskRules};
use crate::core::router::{ExperimentRegistry, ThresholdRouter};
use crate::core::shadow::{ShadowComparison, ShadowModeEngine};
use crate::core::store::ThresholdStore;
use crate::error::Result;
use crate::types::{
    AdsInput, AdsOutput, AdsThresholds, Arm, CriticVerdict, ReasonCode, RiskProfile,
    ThresholdDecision, COHORT_ALL,
};

/// Default model version recorded in audit headers
pub const DEFAULT_MODEL_VERSION: &str = "ads-executor-v1";

/// Shadow comparisons kept in memory
const SHADOW_LOG_CAPACITY: usize = 500;

/// Who the decision is for
#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub user_id: String,
    pub cohort: String,
    pub risk_profile: RiskProfile,
}

impl DecisionContext {
    pub fn new(user_id: impl Into<String>, cohort: impl Into<String>, risk_profile: RiskProfile) -> Self {
        Self {
            user_id: user_id.into(),
            cohort: cohort.into(),
            risk_profile,
        }
    }

    /// Balanced profile, cohort `all`
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self::new(user_id, COHORT_ALL, RiskProfile::balanced())
    }
}

pub struct DecisionPipeline {
    store: Arc<ThresholdStore>,
    registry: Arc<ExperimentRegistry>,
    executor: Executor,
    repository: Arc<AuditRepository>,
    history: Arc<dyn MetricHistoryStore>,
    model_version: String,
    shadow: bool,
    shadow_log: Mutex<VecDeque<ShadowComparison>>,
}

impl std::fmt::Debug for DecisionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionPipeline")
            .field("executor", &self.executor)
            .field("model_version", &self.model_version)
            .field("shadow", &self.shadow)
            .finish_non_exhaustive()
    }
}

impl DecisionPipeline {
    pub fn new(
        store: Arc<ThresholdStore>,
        registry: Arc<ExperimentRegistry>,
        executor: Executor,
        repository: Arc<AuditRepository>,
    ) -> Self {
        Self {
            store,
            registry,
            executor,
            repository,
            history: Arc::new(InMemoryMetricHistory::default()),
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            shadow: false,
            shadow_log: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_history(mut self, history: Arc<dyn MetricHistoryStore>) -> Self {
        self.history = history;
        self
    }

    pub fn with_model_version(mut self, model_version: impl Into<String>) -> Self {
        self.model_version = model_version.into();
        self
    }

    /// Also evaluate control-arm decisions against the experiment candidate
    pub fn with_shadow(mut self, enabled: bool) -> Self {
        self.shadow = enabled;
        self
    }

    pub fn repository(&self) -> &AuditRepository {
        &self.repository
    }

    /// Oldest first
    pub fn shadow_comparisons(&self) -> Vec<ShadowComparison> {
        self.shadow_log.lock().iter().cloned().collect()
    }

    /// Routing decision plus the snapshot to evaluate against.
    /// A profile lock wins over any experiment. Inside an experiment, arm A
    /// stays on the control version recorded when the experiment started.
    fn resolve_snapshot(&self, ctx: &DecisionContext) -> Result<(ThresholdDecision, Arc<AdsThresholds>)> {
        if let Some(lock) = &ctx.risk_profile.threshold_lock {
            return Ok((ThresholdDecision::control(), self.store.resolve(lock)?));
        }

        let decision = ThresholdRouter::route(&self.registry, &ctx.user_id, &ctx.cohort);
        let experiment = decision
            .experiment_id
            .as_deref()
            .and_then(|id| self.registry.get(id));
        let snapshot = match (decision.version, &decision.config_id, experiment) {
            (Arm::B, Some(version), _) => self.store.resolve(version)?,
            (Arm::A, _, Some(experiment)) => self.store.resolve(&experiment.control_version)?,
            _ => self.store.live(),
        };
        Ok((decision, snapshot))
    }

    pub async fn execute(&self, ctx: &DecisionContext, input: &AdsInput) -> Result<AdsOutput> {
        let decision_id = Uuid::new_v4().to_string();
        let (route, snapshot) = self.resolve_snapshot(ctx)?;
        let thresholds = Arc::new(RiskRules::apply_boundary_buffer(&snapshot, &ctx.risk_profile));

        debug!(
            decision = %decision_id,
            user = %ctx.user_id,
            arm = %route.version,
            version = %thresholds.version,
            profile = %ctx.risk_profile.profile_id,
            "decision started"
        );

        // Gate
        if let Some(rejected) = gate_rejection(input) {
            info!(decision = %decision_id, reason = ?rejected.reason, "gate rejected input");
            if input.metrics.present_count() == 0 {
                warn!(decision = %decision_id, "no metrics at all, decision not audited");
                return Ok(rejected);
            }
            let verdict = rejection_verdict(&ctx.risk_profile, &rejected);
            self.audit(&decision_id, ctx, &route, &thresholds, input, None, verdict, &rejected)?;
            return Ok(rejected);
        }

        // Executor
        let normalized = normalize_metrics_for_analyst(&input.metrics, &thresholds);
        let run = match self.executor.interpret(input, &normalized).await {
            Ok(run) => run,
            Err(e) => {
                warn!(decision = %decision_id, error = %e, "executor failed, failing closed");
                let rejected = AdsOutput::rejected(ReasonCode::LLM_SERVICE_ERROR);
                let verdict = rejection_verdict(&ctx.risk_profile, &rejected);
                self.audit(&decision_id, ctx, &route, &thresholds, input, None, verdict, &rejected)?;
                return Ok(rejected);
            }
        };

        // Critic + risk-aware critic
        let critic = RiskAwareCritic::new(Critic::new(thresholds.clone()), ctx.risk_profile.clone())
            .validate(input, &run.output);
        self.log_critic(&decision_id, &critic);

        if self.shadow && route.version == Arm::A {
            self.run_shadow(&route, &ctx.risk_profile, input, &run, thresholds.clone()).await;
        }

        self.audit(&decision_id, ctx, &route, &thresholds, input, Some(&run), critic.verdict(), &critic.output)?;

        self.history.append(MetricHistoryEntry {
            decision_id: decision_id.clone(),
            audio_sample_id: input.audio_sample_id.clone(),
            metrics: input.metrics,
            authority_score: critic.output.authority_score,
            recorded_at: Utc::now(),
        });

        info!(
            decision = %decision_id,
            score = ?critic.output.authority_score,
            confidence = ?critic.output.confidence,
            hitl = critic.output.needs_review(),
            "decision complete"
        );
        Ok(critic.output)
    }

    #[allow(clippy::too_many_arguments)]
    fn audit(
        &self,
        decision_id: &str,
        ctx: &DecisionContext,
        route: &ThresholdDecision,
        thresholds: &AdsThresholds,
        input: &AdsInput,
        run: Option<&ExecutorRun>,
        verdict: CriticVerdict,
        output: &AdsOutput,
    ) -> Result<()> {
        let record = AuditTrailBuilder::new()
            .header(
                decision_id,
                ctx.cohort.clone(),
                thresholds.version.clone(),
                route.version,
                self.model_version.clone(),
            )
            .inputs(input.metrics)
            .decision_path_from(thresholds, &input.metrics)
            .executor_contribution(run)
            .critic_verdict(verdict)
            .final_decision(output)
            .build()?;
        self.repository.persist(record)?;
        Ok(())
    }

    fn log_critic(&self, decision_id: &str, critic: &CriticOutput) {
        if !critic.contradictions.is_empty() {
            info!(
                decision = %decision_id,
                contradictions = critic.contradictions.len(),
                degraded = critic.confidence_degraded,
                "critic adjusted executor verdict"
            );
        }
    }

    /// Candidate-side evaluation for comparison only. `live` is already
    /// buffered for the profile; the candidate gets the same buffer.
    async fn run_shadow(
        &self,
        route: &ThresholdDecision,
        profile: &RiskProfile,
        input: &AdsInput,
        run: &ExecutorRun,
        live: Arc<AdsThresholds>,
    ) {
        let Some(experiment) = route
            .experiment_id
            .as_deref()
            .and_then(|id| self.registry.get(id))
        else {
            return;
        };
        let candidate = match self.store.resolve(&experiment.candidate_version) {
            Ok(candidate) => Arc::new(RiskRules::apply_boundary_buffer(&candidate, profile)),
            Err(e) => {
                warn!(experiment = %experiment.experiment_id, error = %e, "shadow candidate missing");
                return;
            }
        };

        let comparison = ShadowModeEngine::new()
            .compare(input, &run.output, live, candidate)
            .await;
        push_bounded(&mut self.shadow_log.lock(), comparison, SHADOW_LOG_CAPACITY);
    }
}

/// Verdict for outputs that never reached the critic: no contradictions,
/// but still tagged with the risk profile whose buffer shaped the decision path
fn rejection_verdict(profile: &RiskProfile, rejected: &AdsOutput) -> CriticVerdict {
    apply_risk_rules(profile, CriticOutput::passthrough(rejected.clone())).verdict()
}

fn push_bounded<T>(log: &mut VecDeque<T>, item: T, capacity: usize) {
    while log.len() >= capacity.max(1) {
        log.pop_front();
    }
    log.push_back(item);
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::{CompletionProvider, CompletionRequest, ProviderError};
    use crate::types::{
        AdsInputMetrics, AuthorityScore, Boundary, Confidence, ExperimentConfig, MetricName, MetricStatus,
        UserContext,
    };
    use async_trait::async_trait;

    struct Fixed(&'static str);

    #[async_trait]
    impl CompletionProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn complete(&self, _request: &CompletionRequest) -> std::result::Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl CompletionProvider for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        async fn complete(&self, _request: &CompletionRequest) -> std::result::Result<String, ProviderError> {
            Err(ProviderError::Http { status: 503, body: "down".into() })
        }
    }

    fn pipeline(provider: Arc<dyn CompletionProvider>) -> DecisionPipeline {
        DecisionPipeline::new(
            Arc::new(ThresholdStore::default()),
            Arc::new(ExperimentRegistry::new()),
            Executor::new(provider),
            Arc::new(AuditRepository::in_memory()),
        )
    }

    fn input(metrics: AdsInputMetrics) -> AdsInput {
        AdsInput {
            audio_sample_id: "s-1".into(),
            transcript: vec!["word"; 30].join(" "),
            duration_seconds: 12.0,
            metrics,
            user_context: UserContext::default(),
        }
    }

    const HIGH: &str = r#"{"confidence":"high","authority_score":"HIGH","recommended_protocol":["keep pace"]}"#;

    #[tokio::test]
    async fn test_allowed_decision_audited() {
        let p = pipeline(Arc::new(Fixed(HIGH)));
        let out = p
            .execute(&DecisionContext::for_user("u-1"), &input(AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8)))
            .await
            .unwrap();
        assert_eq!(out.authority_score, Some(AuthorityScore::High));

        let rows = p.repository().all().unwrap();
        assert_eq!(rows.len(), 1);
        let record = &rows[0].record;
        assert!(record.executor_contribution.executor_used);
        assert_eq!(record.header.threshold_version, "ads-v1");
        assert!(record.critic_verdict.flags.contains(&"RISK_PROFILE:BALANCED".to_string()));
        assert_eq!(record.final_decision.recommended_protocols, vec!["keep pace"]);
    }

    #[tokio::test]
    async fn test_gate_rejection_skips_executor() {
        let p = pipeline(Arc::new(Failing));
        let mut m = AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8);
        m.wpm = None;
        let out = p.execute(&DecisionContext::for_user("u-1"), &input(m)).await.unwrap();
        assert_eq!(out.reason, Some(ReasonCode::MISSING_METRIC_WPM));
        let rows = p.repository().all().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].record.executor_contribution.executor_used);
    }

    #[tokio::test]
    async fn test_provider_failure_fails_closed() {
        let p = pipeline(Arc::new(Failing));
        let out = p
            .execute(&DecisionContext::for_user("u-1"), &input(AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8)))
            .await
            .unwrap();
        assert!(!out.decision_allowed);
        assert_eq!(out.reason, Some(ReasonCode::LLM_SERVICE_ERROR));
        assert_eq!(out.authority_score, None);
        assert_eq!(p.repository().all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_threshold_lock_beats_experiment() {
        let store = Arc::new(ThresholdStore::default());
        store
            .publish(AdsThresholds::baseline().with_edge("ads-v2", MetricName::Wpm, Boundary::Upper, 155.0))
            .unwrap();
        let registry = Arc::new(ExperimentRegistry::new());
        registry.add(ExperimentConfig::active("exp-1", "all", "ads-v1", "ads-v2"));
        let p = DecisionPipeline::new(
            store,
            registry,
            Executor::new(Arc::new(Fixed(HIGH))),
            Arc::new(AuditRepository::in_memory()),
        );

        let ctx = DecisionContext::new("u-1", "enterprise", RiskProfile::enterprise_custom("ads-v1"));
        for i in 0..20 {
            let ctx = DecisionContext { user_id: format!("u-{}", i), ..ctx.clone() };
            p.execute(&ctx, &input(AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8)))
                .await
                .unwrap();
        }
        for row in p.repository().all().unwrap() {
            assert_eq!(row.record.header.threshold_version, "ads-v1");
            assert_eq!(row.record.header.experiment_arm, Arm::A);
        }
    }

    #[tokio::test]
    async fn test_shadow_runs_for_control_arm_only() {
        let store = Arc::new(ThresholdStore::default());
        store
            .publish(AdsThresholds::baseline().with_edge("ads-v2", MetricName::Wpm, Boundary::Upper, 155.0))
            .unwrap();
        let registry = Arc::new(ExperimentRegistry::new());
        registry.add(ExperimentConfig::active("exp-1", "all", "ads-v1", "ads-v2"));
        let p = DecisionPipeline::new(
            store,
            registry,
            Executor::new(Arc::new(Fixed(HIGH))),
            Arc::new(AuditRepository::in_memory()),
        )
        .with_shadow(true);

        for i in 0..20 {
            p.execute(
                &DecisionContext::for_user(format!("u-{}", i)),
                &input(AdsInputMetrics::complete(152.0, 0.18, 0.02, 30.0, 0.8)),
            )
            .await
            .unwrap();
        }

        let control = p
            .repository()
            .all()
            .unwrap()
            .iter()
            .filter(|r| r.record.header.experiment_arm == Arm::A)
            .count();
        let comparisons = p.shadow_comparisons();
        assert_eq!(comparisons.len(), control);
        for c in &comparisons {
            assert_eq!(c.live.threshold_version, "ads-v1");
            assert_eq!(c.candidate.threshold_version, "ads-v2");
            assert!(c.diverged);
        }
    }

    fn experiment_pipeline(shadow: bool) -> (DecisionPipeline, Arc<ThresholdStore>) {
        let store = Arc::new(ThresholdStore::default());
        store
            .publish(AdsThresholds::baseline().with_edge("ads-v2", MetricName::Wpm, Boundary::Upper, 155.0))
            .unwrap();
        let registry = Arc::new(ExperimentRegistry::new());
        registry.add(ExperimentConfig::active("exp-1", "all", "ads-v1", "ads-v2"));
        let p = DecisionPipeline::new(
            store.clone(),
            registry,
            Executor::new(Arc::new(Fixed(HIGH))),
            Arc::new(AuditRepository::in_memory()),
        )
        .with_shadow(shadow);
        (p, store)
    }

    #[tokio::test]
    async fn test_shadow_buffers_candidate_like_live() {
        let (p, _) = experiment_pipeline(true);
        for i in 0..20 {
            let ctx = DecisionContext::new(format!("u-{}", i), "all", RiskProfile::conservative());
            // Far from the moved edge: identical labels on both sides
            p.execute(&ctx, &input(AdsInputMetrics::complete(121.0, 0.18, 0.02, 30.0, 0.8)))
                .await
                .unwrap();
        }
        let quiet = p.shadow_comparisons();
        assert!(!quiet.is_empty());
        for c in &quiet {
            assert_eq!(c.live.normalized.wpm, MetricStatus::Slow);
            assert_eq!(c.candidate.normalized.wpm, MetricStatus::Slow);
            assert!(!c.diverged);
        }

        for i in 0..20 {
            let ctx = DecisionContext::new(format!("u-{}", i), "all", RiskProfile::conservative());
            p.execute(&ctx, &input(AdsInputMetrics::complete(152.0, 0.18, 0.02, 30.0, 0.8)))
                .await
                .unwrap();
        }
        let all = p.shadow_comparisons();
        assert_eq!(all.len(), quiet.len() * 2);
        assert!(all[quiet.len()..].iter().all(|c| c.diverged));
    }

    #[tokio::test]
    async fn test_rejections_carry_profile_flag() {
        let p = pipeline(Arc::new(Failing));
        let ctx = DecisionContext::new("u-1", "all", RiskProfile::conservative());
        p.execute(&ctx, &input(AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8)))
            .await
            .unwrap();
        let mut thin = input(AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8));
        thin.duration_seconds = 3.0;
        p.execute(&ctx, &thin).await.unwrap();

        let rows = p.repository().all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record.final_decision.reason, Some(ReasonCode::LLM_SERVICE_ERROR));
        assert_eq!(
            rows[1].record.final_decision.reason,
            Some(ReasonCode::INSUFFICIENT_DATA_AUDIO_TOO_SHORT)
        );
        for row in &rows {
            assert_eq!(row.record.critic_verdict.flags, vec!["RISK_PROFILE:CONSERVATIVE".to_string()]);
            assert!(row.record.critic_verdict.contradictions.is_empty());
        }
    }

    #[tokio::test]
    async fn test_control_arm_stays_on_experiment_control() {
        let (p, store) = experiment_pipeline(false);
        store
            .publish(AdsThresholds::baseline().with_edge("ads-v3", MetricName::Wpm, Boundary::Upper, 160.0))
            .unwrap();
        store.set_live("ads-v3").unwrap();

        for i in 0..20 {
            p.execute(
                &DecisionContext::for_user(format!("u-{}", i)),
                &input(AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8)),
            )
            .await
            .unwrap();
        }
        for row in p.repository().all().unwrap() {
            let expected = match row.record.header.experiment_arm {
                Arm::A => "ads-v1",
                Arm::B => "ads-v2",
            };
            assert_eq!(row.record.header.threshold_version, expected);
        }
    }

    #[test]
    fn test_push_bounded_drops_oldest() {
        let mut log = VecDeque::new();
        for i in 0..5 {
            push_bounded(&mut log, i, 3);
        }
        assert_eq!(log.into_iter().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_unknown_lock_is_error() {
        let p = pipeline(Arc::new(Fixed(HIGH)));
        let ctx = DecisionContext::new("u-1", "enterprise", RiskProfile::enterprise_custom("ads-v7"));
        let err = p
            .execute(&ctx, &input(AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8)))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::AdsError::UnknownThresholdVersion(_)));
    }

    #[tokio::test]
    async fn test_history_appended() {
        let history = Arc::new(InMemoryMetricHistory::new(10));
        let p = pipeline(Arc::new(Fixed(HIGH))).with_history(history.clone());
        p.execute(&DecisionContext::for_user("u-1"), &input(AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8)))
            .await
            .unwrap();
        assert_eq!(history.recent(5).len(), 1);
        assert_eq!(history.recent(5)[0].authority_score, Some(AuthorityScore::High));
    }

    #[tokio::test]
    async fn test_conservative_confidence_caps() {
        let p = pipeline(Arc::new(Fixed(
            r#"{"confidence":"medium","authority_score":"HIGH"}"#,
        )));
        let ctx = DecisionContext::new("u-1", "all", RiskProfile::conservative());
        let out = p
            .execute(&ctx, &input(AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8)))
            .await
            .unwrap();
        assert_eq!(out.authority_score, Some(AuthorityScore::Medium));
        assert_eq!(out.confidence, Some(Confidence::Medium));
        assert_eq!(out.hitl_required, Some(true));
    }
}
