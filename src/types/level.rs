//! Ordinal levels: executor confidence and authority score

use serde::{Deserialize, Serialize};

/// Confidence in a verdict. Ordered LOW < MEDIUM < HIGH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Lenient parse of an external string ("HIGH", "high", " High ")
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        write!(f, "{}", name)
    }
}

/// Authority verdict. Ordered LOW < MEDIUM < HIGH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorityScore {
    Low,
    Medium,
    High,
}

impl AuthorityScore {
    /// Lenient parse of an external string
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            _ => None,
        }
    }

    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            AuthorityScore::Low => "\x1b[31m",    // Red
            AuthorityScore::Medium => "\x1b[33m", // Yellow
            AuthorityScore::High => "\x1b[32m",   // Green
        }
    }

    /// Reset ANSI color
    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }

    /// Get emoji for score
    pub fn emoji(&self) -> &'static str {
        match self {
            AuthorityScore::Low => "🔴",
            AuthorityScore::Medium => "🔶",
            AuthorityScore::High => "🟢",
        }
    }
}

impl std::fmt::Display for AuthorityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuthorityScore::Low => "LOW",
            AuthorityScore::Medium => "MEDIUM",
            AuthorityScore::High => "HIGH",
        };
        write!(f, "{}", name)
    }
}
