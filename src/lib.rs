//! ADS: Authority Decision System
//!
//! Deterministic-first pipeline: Gate → Executor (one LLM call) → Critic →
//! Risk-aware Critic → Audit trail. Threshold changes flow through the
//! learning loop and the Human Gate only.

pub mod config;
pub mod core;
pub mod error;
pub mod types;

pub use error::{AdsError, Result};

// =============================================================================
// GATE [C] - Minimum data before a decision is attempted
// =============================================================================

/// Minimum whitespace-separated words in the transcript
pub const MIN_TRANSCRIPT_WORDS: usize = 20;

/// Minimum audio duration (seconds)
pub const MIN_AUDIO_DURATION_SECS: f64 = 8.0;

// =============================================================================
// CRITIC HARD CAPS [C] - Never exceeded, regardless of threshold version
// =============================================================================

/// Lowest wpm that can still carry a HIGH score
pub const CRITIC_WPM_MIN: f64 = 100.0;

/// Highest wpm that can still carry a HIGH score
pub const CRITIC_WPM_MAX: f64 = 180.0;

/// Filler rate above which HIGH is downgraded
pub const CRITIC_FILLER_RATE_MAX: f64 = 0.08;

/// Pitch variance below which HIGH is downgraded (confidence untouched)
pub const CRITIC_PITCH_VARIANCE_MIN: f64 = 10.0;

/// Fraction of an optimal span treated as "near boundary"
pub const NEAR_BOUNDARY_FRACTION: f64 = 0.05;

// =============================================================================
// EXECUTOR [C]
// =============================================================================

/// Hard timeout for the single LLM call (seconds)
pub const EXECUTOR_TIMEOUT_SECS: u64 = 10;

/// Sampling temperature for the interpretation call
pub const EXECUTOR_TEMPERATURE: f64 = 0.0;

/// Fixed role recorded in every audit record
pub const EXECUTOR_ROLE: &str = "INTERPRETATION_ONLY";

// =============================================================================
// LEARNING LOOP [C]
// =============================================================================

/// Minimum outcomes per analysis batch
pub const MIN_ANALYSIS_SAMPLES: usize = 100;

/// Boundary-stress ratio that triggers a proposal
pub const PROPOSAL_STRESS_RATIO: f64 = 0.05;

/// Relative FN improvement required to promote B
pub const PROMOTE_FN_IMPROVEMENT: f64 = 0.10;

/// Relative FP degradation tolerated when promoting B
pub const PROMOTE_FP_DEGRADATION: f64 = 0.05;

/// Deltas below this are treated as zero
pub const INCONCLUSIVE_EPSILON: f64 = 0.01;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
