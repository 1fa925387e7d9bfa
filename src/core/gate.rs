//! Deterministic gate: refuses to spend an executor call on thin data
//!
//! Rules, first failure wins:
//! - G1: wpm / pitch_variance present
//! - G2: transcript ≥ 20 words
//! - G3: audio ≥ 8 seconds

use crate::types::{AdsInput, AdsOutput, ReasonCode};
use crate::{MIN_AUDIO_DURATION_SECS, MIN_TRANSCRIPT_WORDS};

/// Policy check only. `Err` carries the rejection reason.
pub fn check_decision_allowed(input: &AdsInput) -> Result<(), ReasonCode> {
    // G1
    if input.metrics.wpm.is_none() {
        return Err(ReasonCode::MISSING_METRIC_WPM);
    }
    if input.metrics.pitch_variance.is_none() {
        return Err(ReasonCode::MISSING_METRIC_PITCH);
    }

    // G2
    if input.word_count() < MIN_TRANSCRIPT_WORDS {
        return Err(ReasonCode::INSUFFICIENT_DATA_TRANSCRIPT_TOO_SHORT);
    }

    // G3
    if input.duration_seconds < MIN_AUDIO_DURATION_SECS {
        return Err(ReasonCode::INSUFFICIENT_DATA_AUDIO_TOO_SHORT);
    }

    Ok(())
}

/// Rejection output for a failed gate, `None` when the decision may proceed
pub fn gate_rejection(input: &AdsInput) -> Option<AdsOutput> {
    check_decision_allowed(input).err().map(AdsOutput::rejected)
}

// =============================================================================
// TESTS
// =============================================================================
