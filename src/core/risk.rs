//! Risk rules and the risk-aware critic
//!
//! Risk-aware pass, after the base critic:
//! - K1: confidence below the profile's bar → cap score at MEDIUM
//! - K2: VERY_LOW fp tolerance + near-boundary flag → human review
//! - K3: confidence at or below hitl_threshold → human review
//! - K4: always tag RISK_PROFILE:<id>

use crate::core::critic::{Critic, CriticOutput};
use crate::types::{
    AdsInput, AdsOutput, AdsThresholds, AuthorityScore, BoundaryBuffer, Confidence, OptimalRange,
    RiskProfile, Tolerance,
};

pub const FLAG_RISK_SCORE_CAP: &str = "RISK_GATED_SCORE_CAP";
pub const FLAG_RISK_ESCALATION: &str = "RISK_ESCALATION_STRICT_BOUNDARY";
pub const FLAG_RISK_HITL_CONFIDENCE: &str = "RISK_HITL_CONFIDENCE";
pub const FLAG_RISK_PROFILE_PREFIX: &str = "RISK_PROFILE:";

/// Fraction of the optimal span moved by WIDE / NARROW buffers
const BUFFER_SPAN_FRACTION: f64 = 0.05;
const WIDE_FILLER_FACTOR: f64 = 0.8;
const NARROW_FILLER_FACTOR: f64 = 1.2;

/// Stateless policy helpers
pub struct RiskRules;

impl RiskRules {
    /// May this confidence carry a HIGH score under the profile?
    pub fn can_award_high_authority(profile: &RiskProfile, confidence: Confidence) -> bool {
        confidence >= profile.min_confidence_for_high
    }

    /// Does this confidence require a human under the profile?
    pub fn requires_hitl(profile: &RiskProfile, confidence: Confidence) -> bool {
        confidence <= profile.hitl_threshold
    }

    /// New threshold set with the profile's buffer applied. `base` is shared
    /// and never touched.
    pub fn apply_boundary_buffer(base: &AdsThresholds, profile: &RiskProfile) -> AdsThresholds {
        let mut buffered = base.clone();
        match profile.boundary_buffer {
            BoundaryBuffer::Wide => {
                buffered.wpm = shift_range(base.wpm, -BUFFER_SPAN_FRACTION);
                buffered.pause_ratio = shift_range(base.pause_ratio, -BUFFER_SPAN_FRACTION);
                buffered.filler_rate.max = base.filler_rate.max * WIDE_FILLER_FACTOR;
            }
            BoundaryBuffer::Narrow => {
                buffered.wpm = shift_range(base.wpm, BUFFER_SPAN_FRACTION);
                buffered.pause_ratio = shift_range(base.pause_ratio, BUFFER_SPAN_FRACTION);
                buffered.filler_rate.max = base.filler_rate.max * NARROW_FILLER_FACTOR;
            }
            BoundaryBuffer::Standard | BoundaryBuffer::Custom => {}
        }
        buffered
    }
}

/// Negative fraction shrinks the range, positive expands it
fn shift_range(range: OptimalRange, fraction: f64) -> OptimalRange {
    let delta = range.span() * fraction;
    OptimalRange::new(range.min() - delta, range.max() + delta)
}

/// Base critic composed with one risk profile
#[derive(Debug, Clone)]
pub struct RiskAwareCritic {
    base: Critic,
    profile: RiskProfile,
}

impl RiskAwareCritic {
    pub fn new(base: Critic, profile: RiskProfile) -> Self {
        Self { base, profile }
    }

    pub fn profile(&self) -> &RiskProfile {
        &self.profile
    }

    /// Base critic, then the risk pass
    pub fn validate(&self, input: &AdsInput, executor_output: &AdsOutput) -> CriticOutput {
        let base = self.base.validate(input, executor_output);
        apply_risk_rules(&self.profile, base)
    }
}

/// Second, composable validation pass over a base critic result
pub fn apply_risk_rules(profile: &RiskProfile, mut result: CriticOutput) -> CriticOutput {
    if result.output.decision_allowed {
        let confidence = result.output.confidence.unwrap_or(Confidence::Low);

        // K1
        if result.output.authority_score == Some(AuthorityScore::High)
            && !RiskRules::can_award_high_authority(profile, confidence)
        {
            result.output.authority_score = Some(AuthorityScore::Medium);
            result.flags.push(FLAG_RISK_SCORE_CAP.to_string());
        }

        // K2
        if profile.fp_tolerance == Tolerance::VeryLow
            && result.flags.iter().any(|f| f.contains("NEAR_BOUNDARY"))
        {
            result.output.hitl_required = Some(true);
            result.flags.push(FLAG_RISK_ESCALATION.to_string());
        }

        // K3
        if RiskRules::requires_hitl(profile, confidence) && !result.output.needs_review() {
            result.output.hitl_required = Some(true);
            result.flags.push(FLAG_RISK_HITL_CONFIDENCE.to_string());
        }
    }

    // K4
    result
        .flags
        .push(format!("{}{}", FLAG_RISK_PROFILE_PREFIX, profile.profile_id));
    result
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AdsInputMetrics, UserContext};
    use std::sync::Arc;

    fn input(metrics: AdsInputMetrics) -> AdsInput {
        AdsInput {
            audio_sample_id: "s-1".into(),
            transcript: vec!["word"; 30].join(" "),
            duration_seconds: 12.0,
            metrics,
            user_context: UserContext::default(),
        }
    }

    fn clean() -> AdsInputMetrics {
        AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8)
    }

    fn critic(profile: RiskProfile) -> RiskAwareCritic {
        RiskAwareCritic::new(Critic::new(Arc::new(AdsThresholds::baseline())), profile)
    }

    #[test]
    fn test_confidence_ordering() {
        let p = RiskProfile::conservative();
        assert!(!RiskRules::can_award_high_authority(&p, Confidence::Medium));
        assert!(RiskRules::can_award_high_authority(&p, Confidence::High));
        let a = RiskProfile::aggressive();
        assert!(RiskRules::can_award_high_authority(&a, Confidence::Low));
    }

    #[test]
    fn test_conservative_caps_medium_confidence() {
        let exec = AdsOutput::scored(AuthorityScore::High, Confidence::Medium);
        let out = critic(RiskProfile::conservative()).validate(&input(clean()), &exec);
        assert_eq!(out.output.authority_score, Some(AuthorityScore::Medium));
        assert_eq!(out.output.confidence, Some(Confidence::Medium));
        assert!(out.flags.contains(&FLAG_RISK_SCORE_CAP.to_string()));
        assert!(out.flags.contains(&"RISK_PROFILE:CONSERVATIVE".to_string()));
    }

    #[test]
    fn test_balanced_keeps_high() {
        let exec = AdsOutput::scored(AuthorityScore::High, Confidence::Medium);
        let out = critic(RiskProfile::balanced()).validate(&input(clean()), &exec);
        assert_eq!(out.output.authority_score, Some(AuthorityScore::High));
        assert_eq!(out.output.hitl_required, Some(false));
        assert_eq!(out.flags, vec!["RISK_PROFILE:BALANCED".to_string()]);
    }

    #[test]
    fn test_strict_boundary_escalation() {
        let mut m = clean();
        m.wpm = Some(149.5);
        let exec = AdsOutput::scored(AuthorityScore::High, Confidence::High);
        let out = critic(RiskProfile::conservative()).validate(&input(m), &exec);
        assert_eq!(out.output.hitl_required, Some(true));
        assert!(out.flags.contains(&FLAG_RISK_ESCALATION.to_string()));
    }

    #[test]
    fn test_near_boundary_ignored_when_tolerant() {
        let mut m = clean();
        m.wpm = Some(149.5);
        let exec = AdsOutput::scored(AuthorityScore::High, Confidence::High);
        let out = critic(RiskProfile::aggressive()).validate(&input(m), &exec);
        assert!(!out.flags.contains(&FLAG_RISK_ESCALATION.to_string()));
    }

    #[test]
    fn test_profile_tag_on_rejected() {
        let rejected = AdsOutput::rejected(crate::types::ReasonCode::LLM_SERVICE_ERROR);
        let out = critic(RiskProfile::balanced()).validate(&input(clean()), &rejected);
        assert_eq!(out.flags, vec!["RISK_PROFILE:BALANCED".to_string()]);
        assert!(!out.output.decision_allowed);
    }

    #[test]
    fn test_standard_buffer_identical() {
        let base = AdsThresholds::baseline();
        let buffered = RiskRules::apply_boundary_buffer(&base, &RiskProfile::balanced());
        assert_eq!(
            serde_json::to_vec(&buffered).unwrap(),
            serde_json::to_vec(&base).unwrap()
        );
    }

    #[test]
    fn test_wide_buffer_is_stricter() {
        let base = AdsThresholds::baseline();
        let wide = RiskRules::apply_boundary_buffer(&base, &RiskProfile::conservative());
        // span 30 → 1.5 each side
        assert!((wide.wpm.min() - 121.5).abs() < 1e-9);
        assert!((wide.wpm.max() - 148.5).abs() < 1e-9);
        assert!((wide.filler_rate.max - 0.04).abs() < 1e-9);
        // base untouched
        assert_eq!(base, AdsThresholds::baseline());
    }

    #[test]
    fn test_narrow_buffer_is_laxer() {
        let base = AdsThresholds::baseline();
        let narrow = RiskRules::apply_boundary_buffer(&base, &RiskProfile::aggressive());
        assert!((narrow.wpm.min() - 118.5).abs() < 1e-9);
        assert!((narrow.wpm.max() - 151.5).abs() < 1e-9);
        assert!((narrow.filler_rate.max - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_custom_buffer_unchanged() {
        let base = AdsThresholds::baseline();
        let custom = RiskRules::apply_boundary_buffer(&base, &RiskProfile::enterprise_custom("ads-v1"));
        assert_eq!(custom, base);
    }
}
