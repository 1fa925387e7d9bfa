//! Per-cohort risk profiles

use serde::{Deserialize, Serialize};

use crate::types::Confidence;

/// Named risk profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskProfileId {
    Conservative,
    Balanced,
    Aggressive,
    EnterpriseCustom,
}

impl RiskProfileId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskProfileId::Conservative => "CONSERVATIVE",
            RiskProfileId::Balanced => "BALANCED",
            RiskProfileId::Aggressive => "AGGRESSIVE",
            RiskProfileId::EnterpriseCustom => "ENTERPRISE_CUSTOM",
        }
    }

    /// Lenient parse (CLI / config)
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "CONSERVATIVE" => Some(Self::Conservative),
            "BALANCED" => Some(Self::Balanced),
            "AGGRESSIVE" => Some(Self::Aggressive),
            "ENTERPRISE_CUSTOM" => Some(Self::EnterpriseCustom),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tolerance for false positives / false negatives
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tolerance {
    VeryLow,
    Low,
    Medium,
    High,
}

/// How the optimal ranges are buffered for this cohort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoundaryBuffer {
    /// Shrink ranges (stricter)
    Wide,
    Standard,
    /// Expand ranges (laxer)
    Narrow,
    /// Left unchanged; overridden manually elsewhere
    Custom,
}

/// Audit verbosity requested by the cohort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditLevel {
    Standard,
    Detailed,
    Forensic,
}

/// Static per-cohort policy, read-only at decision time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub profile_id: RiskProfileId,
    pub fp_tolerance: Tolerance,
    pub fn_tolerance: Tolerance,
    /// Minimum confidence that may carry a HIGH score
    pub min_confidence_for_high: Confidence,
    /// Confidence at or below which a human must review
    pub hitl_threshold: Confidence,
    pub boundary_buffer: BoundaryBuffer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_level: Option<AuditLevel>,
    /// Pins the cohort to one threshold version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_lock: Option<String>,
}

impl RiskProfile {
    pub fn conservative() -> Self {
        Self {
            profile_id: RiskProfileId::Conservative,
            fp_tolerance: Tolerance::VeryLow,
            fn_tolerance: Tolerance::High,
            min_confidence_for_high: Confidence::High,
            hitl_threshold: Confidence::Medium,
            boundary_buffer: BoundaryBuffer::Wide,
            audit_level: Some(AuditLevel::Forensic),
            threshold_lock: None,
        }
    }

    pub fn balanced() -> Self {
        Self {
            profile_id: RiskProfileId::Balanced,
            fp_tolerance: Tolerance::Medium,
            fn_tolerance: Tolerance::Medium,
            min_confidence_for_high: Confidence::Medium,
            hitl_threshold: Confidence::Low,
            boundary_buffer: BoundaryBuffer::Standard,
            audit_level: Some(AuditLevel::Standard),
            threshold_lock: None,
        }
    }

    pub fn aggressive() -> Self {
        Self {
            profile_id: RiskProfileId::Aggressive,
            fp_tolerance: Tolerance::High,
            fn_tolerance: Tolerance::VeryLow,
            min_confidence_for_high: Confidence::Low,
            hitl_threshold: Confidence::Low,
            boundary_buffer: BoundaryBuffer::Narrow,
            audit_level: None,
            threshold_lock: None,
        }
    }

    /// Enterprise cohorts are pinned to a reviewed threshold version
    pub fn enterprise_custom(threshold_lock: impl Into<String>) -> Self {
        Self {
            profile_id: RiskProfileId::EnterpriseCustom,
            fp_tolerance: Tolerance::Low,
            fn_tolerance: Tolerance::Medium,
            min_confidence_for_high: Confidence::High,
            hitl_threshold: Confidence::Medium,
            boundary_buffer: BoundaryBuffer::Custom,
            audit_level: Some(AuditLevel::Detailed),
            threshold_lock: Some(threshold_lock.into()),
        }
    }

    /// Preset by id; enterprise defaults to the baseline version lock
    pub fn preset(id: RiskProfileId) -> Self {
        match id {
            RiskProfileId::Conservative => Self::conservative(),
            RiskProfileId::Balanced => Self::balanced(),
            RiskProfileId::Aggressive => Self::aggressive(),
            RiskProfileId::EnterpriseCustom => {
                Self::enterprise_custom(crate::types::BASELINE_THRESHOLD_VERSION)
            }
        }
    }
}

impl Default for RiskProfile {
    fn default() -> Self {
        Self::balanced()
    }
}
