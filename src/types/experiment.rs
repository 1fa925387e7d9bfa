//! Threshold experiments and sticky arm assignment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Experiment arm. A is control, B is the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arm {
    A,
    B,
}

impl std::fmt::Display for Arm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arm::A => write!(f, "A"),
            Arm::B => write!(f, "B"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperimentStatus {
    Draft,
    Active,
    Paused,
    Completed,
}

/// Cohort matching every user
pub const COHORT_ALL: &str = "all";

/// One threshold experiment: control version vs candidate version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub experiment_id: String,
    pub name: String,
    pub status: ExperimentStatus,
    /// `"all"` or a cohort name
    pub target_cohort: String,
    pub control_version: String,
    pub candidate_version: String,
    /// Config handed back with arm B
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ExperimentConfig {
    /// New active experiment
    pub fn active(
        experiment_id: impl Into<String>,
        target_cohort: impl Into<String>,
        control_version: impl Into<String>,
        candidate_version: impl Into<String>,
    ) -> Self {
        let experiment_id = experiment_id.into();
        let candidate_version = candidate_version.into();
        Self {
            name: format!("thresholds {}", candidate_version),
            config_id: Some(candidate_version.clone()),
            experiment_id,
            status: ExperimentStatus::Active,
            target_cohort: target_cohort.into(),
            control_version: control_version.into(),
            candidate_version,
            created_at: Utc::now(),
        }
    }

    /// Does this experiment apply to the cohort?
    pub fn targets(&self, cohort: &str) -> bool {
        self.target_cohort == COHORT_ALL || self.target_cohort == cohort
    }
}

/// Routing result for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdDecision {
    pub version: Arm,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
}

impl ThresholdDecision {
    /// No experiment applies
    pub fn control() -> Self {
        Self {
            version: Arm::A,
            config_id: None,
            experiment_id: None,
        }
    }
}
