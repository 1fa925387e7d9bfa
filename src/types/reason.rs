//! Reason codes for rejected decisions

use serde::{Deserialize, Serialize};

/// Why a decision was not allowed. Serialized verbatim on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // Gate: missing metrics
    // =========================================================================
    /// metrics.wpm absent
    MISSING_METRIC_WPM,
    /// metrics.pitch_variance absent
    MISSING_METRIC_PITCH,

    // =========================================================================
    // Gate: insufficient data
    // =========================================================================
    /// Fewer than 20 words in the transcript
    INSUFFICIENT_DATA_TRANSCRIPT_TOO_SHORT,
    /// Recording shorter than 8 seconds
    INSUFFICIENT_DATA_AUDIO_TOO_SHORT,

    // =========================================================================
    // Executor
    // =========================================================================
    /// LLM call failed, timed out, or returned no usable JSON
    LLM_SERVICE_ERROR,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::MISSING_METRIC_WPM => "MISSING_METRIC_WPM",
            Self::MISSING_METRIC_PITCH => "MISSING_METRIC_PITCH",
            Self::INSUFFICIENT_DATA_TRANSCRIPT_TOO_SHORT => "INSUFFICIENT_DATA_TRANSCRIPT_TOO_SHORT",
            Self::INSUFFICIENT_DATA_AUDIO_TOO_SHORT => "INSUFFICIENT_DATA_AUDIO_TOO_SHORT",
            Self::LLM_SERVICE_ERROR => "LLM_SERVICE_ERROR",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::MISSING_METRIC_WPM => "Speaking rate could not be measured",
            Self::MISSING_METRIC_PITCH => "Pitch variance could not be measured",
            Self::INSUFFICIENT_DATA_TRANSCRIPT_TOO_SHORT => "Transcript has fewer than 20 words",
            Self::INSUFFICIENT_DATA_AUDIO_TOO_SHORT => "Recording is shorter than 8 seconds",
            Self::LLM_SERVICE_ERROR => "Interpretation service unavailable",
        }
    }

    /// What the user should do next
    pub fn next_action(&self) -> NextAction {
        match self {
            Self::LLM_SERVICE_ERROR => NextAction::CONTACT_SUPPORT,
            _ => NextAction::RECORD_AGAIN,
        }
    }

    /// Gate rejections are recoverable by re-recording
    pub fn is_input_insufficiency(&self) -> bool {
        !matches!(self, Self::LLM_SERVICE_ERROR)
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}

/// Instruction shown to the user when no score is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum NextAction {
    RECORD_AGAIN,
    CONTACT_SUPPORT,
}

impl std::fmt::Display for NextAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RECORD_AGAIN => write!(f, "RECORD_AGAIN"),
            Self::CONTACT_SUPPORT => write!(f, "CONTACT_SUPPORT"),
        }
    }
}
