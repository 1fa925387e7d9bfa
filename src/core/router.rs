//! Experiment registry and sticky threshold routing
//!
//! Assignment is a pure function of `(user_id, experiment_id)`: the same user
//! lands on the same arm for the life of an experiment, in every process.

use parking_lot::RwLock;
use tracing::debug;

use crate::core::hashing::sticky_bucket;
use crate::core::store::ThresholdStore;
use crate::error::{AdsError, Result};
use crate::types::{Arm, ExperimentConfig, ExperimentStatus, ThresholdDecision};

/// Experiments in creation order
#[derive(Debug, Default)]
pub struct ExperimentRegistry {
    experiments: RwLock<Vec<ExperimentConfig>>,
}

impl ExperimentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(experiments: impl IntoIterator<Item = ExperimentConfig>) -> Self {
        Self {
            experiments: RwLock::new(experiments.into_iter().collect()),
        }
    }

    /// Every version an experiment can route to must exist in `store`
    pub fn verify_versions(&self, store: &ThresholdStore) -> Result<()> {
        for experiment in self.experiments.read().iter() {
            store.resolve(&experiment.control_version)?;
            store.resolve(&experiment.candidate_version)?;
            if let Some(config_id) = &experiment.config_id {
                store.resolve(config_id)?;
            }
        }
        Ok(())
    }

    pub fn add(&self, experiment: ExperimentConfig) {
        self.experiments.write().push(experiment);
    }

    pub fn list(&self) -> Vec<ExperimentConfig> {
        self.experiments.read().clone()
    }

    pub fn get(&self, experiment_id: &str) -> Option<ExperimentConfig> {
        self.experiments
            .read()
            .iter()
            .find(|e| e.experiment_id == experiment_id)
            .cloned()
    }

    pub fn set_status(&self, experiment_id: &str, status: ExperimentStatus) -> Result<()> {
        let mut experiments = self.experiments.write();
        let experiment = experiments
            .iter_mut()
            .find(|e| e.experiment_id == experiment_id)
            .ok_or_else(|| AdsError::ExperimentNotFound(experiment_id.to_string()))?;
        experiment.status = status;
        Ok(())
    }

    /// First ACTIVE experiment targeting the cohort
    pub fn active_for(&self, cohort: &str) -> Option<ExperimentConfig> {
        self.experiments
            .read()
            .iter()
            .find(|e| e.status == ExperimentStatus::Active && e.targets(cohort))
            .cloned()
    }
}

/// Stateless arm assignment over a registry
#[derive(Debug, Clone, Copy)]
pub struct ThresholdRouter;

impl ThresholdRouter {
    pub fn route(registry: &ExperimentRegistry, user_id: &str, cohort: &str) -> ThresholdDecision {
        let Some(experiment) = registry.active_for(cohort) else {
            return ThresholdDecision::control();
        };

        let arm = assign_arm(user_id, &experiment.experiment_id);
        debug!(user = user_id, experiment = %experiment.experiment_id, %arm, "routed");

        ThresholdDecision {
            version: arm,
            config_id: match arm {
                Arm::A => None,
                Arm::B => experiment.config_id.clone(),
            },
            experiment_id: Some(experiment.experiment_id),
        }
    }
}

/// bucket 0 → A, 1 → B
pub fn assign_arm(user_id: &str, experiment_id: &str) -> Arm {
    match sticky_bucket(user_id, experiment_id, 2) {
        0 => Arm::A,
        _ => Arm::B,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(experiment: ExperimentConfig) -> ExperimentRegistry {
        let registry = ExperimentRegistry::new();
        registry.add(experiment);
        registry
    }

    #[test]
    fn test_no_experiment_is_control() {
        let registry = ExperimentRegistry::new();
        assert_eq!(
            ThresholdRouter::route(&registry, "u-1", "default"),
            ThresholdDecision::control()
        );
    }

    #[test]
    fn test_inactive_experiment_ignored() {
        let mut exp = ExperimentConfig::active("exp-1", "all", "ads-v1", "ads-v2");
        exp.status = ExperimentStatus::Paused;
        let registry = registry_with(exp);
        assert_eq!(ThresholdRouter::route(&registry, "u-1", "x").version, Arm::A);
        assert_eq!(ThresholdRouter::route(&registry, "u-1", "x").experiment_id, None);
    }

    #[test]
    fn test_cohort_targeting() {
        let registry = registry_with(ExperimentConfig::active("exp-1", "sales", "ads-v1", "ads-v2"));
        assert_eq!(ThresholdRouter::route(&registry, "u-1", "support").experiment_id, None);
        assert_eq!(
            ThresholdRouter::route(&registry, "u-1", "sales").experiment_id.as_deref(),
            Some("exp-1")
        );
    }

    #[test]
    fn test_both_arms_reachable() {
        let registry = registry_with(ExperimentConfig::active("exp-1", "all", "ads-v1", "ads-v2"));
        let arms: Vec<Arm> = (0..200)
            .map(|i| ThresholdRouter::route(&registry, &format!("user-{}", i), "x").version)
            .collect();
        assert!(arms.contains(&Arm::A));
        assert!(arms.contains(&Arm::B));
    }

    #[test]
    fn test_arm_b_carries_config() {
        let registry = registry_with(ExperimentConfig::active("exp-1", "all", "ads-v1", "ads-v2"));
        for i in 0..50 {
            let d = ThresholdRouter::route(&registry, &format!("user-{}", i), "x");
            match d.version {
                Arm::A => assert_eq!(d.config_id, None),
                Arm::B => assert_eq!(d.config_id.as_deref(), Some("ads-v2")),
            }
        }
    }

    #[test]
    fn test_set_status_unknown() {
        let registry = ExperimentRegistry::new();
        assert!(matches!(
            registry.set_status("nope", ExperimentStatus::Completed),
            Err(AdsError::ExperimentNotFound(_))
        ));
    }

    #[test]
    fn test_verify_versions() {
        use crate::types::{AdsThresholds, Boundary, MetricName};

        let registry =
            ExperimentRegistry::from_configs([ExperimentConfig::active("exp-1", "all", "ads-v1", "ads-v2")]);
        let baseline_only = ThresholdStore::default();
        assert!(matches!(
            registry.verify_versions(&baseline_only),
            Err(AdsError::UnknownThresholdVersion(v)) if v == "ads-v2"
        ));

        let store = ThresholdStore::with_published([AdsThresholds::baseline().with_edge(
            "ads-v2",
            MetricName::Wpm,
            Boundary::Upper,
            155.0,
        )])
        .unwrap();
        registry.verify_versions(&store).unwrap();
    }
}
