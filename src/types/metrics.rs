//! Decision input: voice metrics, transcript and user context

use serde::{Deserialize, Serialize};

/// Per-decision voice metrics, produced upstream by audio analysis.
///
/// Every field is optional at the boundary so the gate can name the missing
/// metric instead of failing deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdsInputMetrics {
    /// Words per minute
    #[serde(default)]
    pub wpm: Option<f64>,
    /// Fraction of the recording spent in pauses (0.0-1.0)
    #[serde(default)]
    pub pause_ratio: Option<f64>,
    /// Filler words per spoken word (0.0-1.0)
    #[serde(default)]
    pub filler_rate: Option<f64>,
    /// Pitch variance (Hz)
    #[serde(default)]
    pub pitch_variance: Option<f64>,
    /// Loudness stability (0.0-1.0, higher is steadier)
    #[serde(default)]
    pub energy_stability: Option<f64>,
}

impl AdsInputMetrics {
    /// All five metrics present
    pub fn complete(
        wpm: f64,
        pause_ratio: f64,
        filler_rate: f64,
        pitch_variance: f64,
        energy_stability: f64,
    ) -> Self {
        Self {
            wpm: Some(wpm),
            pause_ratio: Some(pause_ratio),
            filler_rate: Some(filler_rate),
            pitch_variance: Some(pitch_variance),
            energy_stability: Some(energy_stability),
        }
    }

    /// Value of one metric by name
    pub fn get(&self, metric: MetricName) -> Option<f64> {
        match metric {
            MetricName::Wpm => self.wpm,
            MetricName::PauseRatio => self.pause_ratio,
            MetricName::FillerRate => self.filler_rate,
            MetricName::PitchVariance => self.pitch_variance,
            MetricName::EnergyStability => self.energy_stability,
        }
    }

    /// Number of metrics carrying a value
    pub fn present_count(&self) -> usize {
        MetricName::ALL
            .iter()
            .filter(|m| self.get(**m).is_some())
            .count()
    }
}

/// The five scored metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    Wpm,
    PauseRatio,
    FillerRate,
    PitchVariance,
    EnergyStability,
}

impl MetricName {
    pub const ALL: [MetricName; 5] = [
        MetricName::Wpm,
        MetricName::PauseRatio,
        MetricName::FillerRate,
        MetricName::PitchVariance,
        MetricName::EnergyStability,
    ];

    /// Wire name, as used in thresholds and audit rules
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Wpm => "wpm",
            MetricName::PauseRatio => "pause_ratio",
            MetricName::FillerRate => "filler_rate",
            MetricName::PitchVariance => "pitch_variance",
            MetricName::EnergyStability => "energy_stability",
        }
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who is speaking and why
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub experience_level: String,
    pub language: String,
    pub use_case: String,
}

/// Immutable input to one decision, owned by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsInput {
    pub audio_sample_id: String,
    pub transcript: String,
    pub duration_seconds: f64,
    pub metrics: AdsInputMetrics,
    #[serde(default)]
    pub user_context: UserContext,
}

impl AdsInput {
    /// Whitespace-split word count of the transcript
    pub fn word_count(&self) -> usize {
        self.transcript.split_whitespace().count()
    }
}
