//! Decision output and its terminal rendering

use serde::{Deserialize, Serialize};

use crate::types::{AuthorityScore, Confidence, NextAction, ReasonCode};

/// Vocal risk patterns the executor may report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskFlag {
    UpwardInflection,
    Monotone,
    Rushing,
    LowEnergy,
}

impl RiskFlag {
    /// Lenient parse; anything outside the four known flags is rejected
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UPWARD_INFLECTION" => Some(Self::UpwardInflection),
            "MONOTONE" => Some(Self::Monotone),
            "RUSHING" => Some(Self::Rushing),
            "LOW_ENERGY" => Some(Self::LowEnergy),
            _ => None,
        }
    }
}

/// What worked and what did not
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalBreakdown {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

/// Result of one decision.
///
/// Created once; only the critic layers adjust it before finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdsOutput {
    pub decision_allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_score: Option<AuthorityScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_breakdown: Option<SignalBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_flags: Option<Vec<RiskFlag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_protocol: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hitl_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<NextAction>,
}

impl AdsOutput {
    /// Rejected decision: no score, only a reason and an instruction
    pub fn rejected(reason: ReasonCode) -> Self {
        Self {
            decision_allowed: false,
            confidence: None,
            authority_score: None,
            signal_breakdown: None,
            risk_flags: None,
            recommended_protocol: None,
            hitl_required: None,
            reason: Some(reason),
            next_action: Some(reason.next_action()),
        }
    }

    /// Scored decision with empty breakdown
    pub fn scored(authority_score: AuthorityScore, confidence: Confidence) -> Self {
        Self {
            decision_allowed: true,
            confidence: Some(confidence),
            authority_score: Some(authority_score),
            signal_breakdown: Some(SignalBreakdown::default()),
            risk_flags: Some(Vec::new()),
            recommended_protocol: Some(Vec::new()),
            hitl_required: Some(false),
            reason: None,
            next_action: None,
        }
    }

    /// Human review required?
    pub fn needs_review(&self) -> bool {
        self.hitl_required.unwrap_or(false)
    }

    /// Recommended protocols, empty when none
    pub fn protocols(&self) -> &[String] {
        self.recommended_protocol.as_deref().unwrap_or(&[])
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        match (self.decision_allowed, self.authority_score) {
            (true, Some(score)) => format!(
                "{}{} authority={} | confidence={} | hitl={} | protocols={}{}",
                score.color_code(),
                score.emoji(),
                score,
                self.confidence.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
                self.needs_review(),
                self.protocols().len(),
                AuthorityScore::color_reset()
            ),
            _ => format!(
                "\x1b[90m⏳ no decision | {} | next={}{}",
                self.reason.map(|r| r.code()).unwrap_or("UNKNOWN"),
                self.next_action.map(|a| a.to_string()).unwrap_or_else(|| "-".into()),
                AuthorityScore::color_reset()
            ),
        }
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        match (self.decision_allowed, self.authority_score) {
            (true, Some(score)) => format!(
                "authority={} | confidence={} | hitl={}",
                score,
                self.confidence.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
                self.needs_review()
            ),
            _ => format!(
                "decision_allowed=false | reason={} | next={}",
                self.reason.map(|r| r.code()).unwrap_or("UNKNOWN"),
                self.next_action.map(|a| a.to_string()).unwrap_or_else(|| "-".into())
            ),
        }
    }
}
