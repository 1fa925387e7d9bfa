//! Error types for ADS
//!
//! Gate rejections and executor failures are NOT errors: they are returned as
//! `AdsOutput` values with `decision_allowed = false`. Everything here is
//! either a programming/configuration defect or a caller precondition.

use thiserror::Error;

use crate::types::AuditViolation;

/// Result type for ADS operations
pub type Result<T> = std::result::Result<T, AdsError>;

/// Errors surfaced by the decision pipeline and the learning loop
#[derive(Error, Debug)]
pub enum AdsError {
    /// An audit record failed validation and must not be persisted
    #[error("Audit invariant violated: {0}")]
    AuditInvariant(#[from] AuditViolation),

    /// Analysis attempted on too small a batch
    #[error("INSUFFICIENT_DATA: need at least {required} outcomes, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Proposal not found: {0}")]
    ProposalNotFound(String),

    #[error("Proposal already decided: {0}")]
    ProposalAlreadyDecided(String),

    #[error("Experiment not found: {0}")]
    ExperimentNotFound(String),

    /// Promotion requested against an evaluation that does not support it
    #[error("Promotion rejected: {0}")]
    PromotionRejected(String),

    #[error("Unknown threshold version: {0}")]
    UnknownThresholdVersion(String),

    #[error("Threshold version already published: {0}")]
    DuplicateThresholdVersion(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
