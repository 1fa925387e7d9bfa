//! Voice analysis → ADS input metrics
//!
//! pause_ratio and filler_rate use the word count implied by wpm × duration,
//! not a true transcript word count. That approximation is intentional and
//! kept so historical decisions stay reproducible.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::AdsInputMetrics;

lazy_static! {
    // =========================================================================
    // English fillers
    // =========================================================================
    static ref RE_FILLER_EN: Regex = Regex::new(
        r"(?i)\b(um+|uh+|erm|er|ah+|hmm+|like|you know|i mean|basically|actually|sort of|kind of)\b"
    ).unwrap();

    // =========================================================================
    // Spanish fillers
    // =========================================================================
    static ref RE_FILLER_ES: Regex = Regex::new(
        r"(?i)\b(eh+|este|o sea|pues|bueno|digamos|mmm+|tipo|en plan)\b"
    ).unwrap();
}

/// Upstream voice analysis for one recording
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceAnalysis {
    pub duration_seconds: f64,
    #[serde(default)]
    pub wpm: Option<f64>,
    /// Individual pause lengths (seconds)
    #[serde(default)]
    pub pauses: Vec<f64>,
    /// Filler count from the speech model, if it produced one
    #[serde(default)]
    pub filler_count: Option<usize>,
    #[serde(default)]
    pub pitch_variance: Option<f64>,
    /// Per-frame loudness
    #[serde(default)]
    pub energy_samples: Vec<f64>,
}

/// Derive the five ADS metrics. Anything that cannot be derived stays `None`
/// so the gate can reject it by name.
pub fn map_voice_metrics(analysis: &VoiceAnalysis, transcript: &str) -> AdsInputMetrics {
    let duration = analysis.duration_seconds;

    let pause_ratio = if duration > 0.0 {
        let total: f64 = analysis.pauses.iter().filter(|p| **p > 0.0).sum();
        Some((total / duration).clamp(0.0, 1.0))
    } else {
        None
    };

    let filler_rate = analysis.wpm.and_then(|wpm| {
        let approx_words = wpm * duration / 60.0;
        if approx_words <= 0.0 {
            return None;
        }
        let fillers = analysis
            .filler_count
            .unwrap_or_else(|| count_fillers(transcript));
        Some(fillers as f64 / approx_words)
    });

    AdsInputMetrics {
        wpm: analysis.wpm,
        pause_ratio,
        filler_rate,
        pitch_variance: analysis.pitch_variance,
        energy_stability: energy_stability(&analysis.energy_samples),
    }
}

/// English + Spanish filler occurrences
pub fn count_fillers(transcript: &str) -> usize {
    RE_FILLER_EN.find_iter(transcript).count() + RE_FILLER_ES.find_iter(transcript).count()
}

/// 1 − coefficient of variation, clamped to [0, 1]
fn energy_stability(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return Some(0.0);
    }
    let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    Some((1.0 - variance.sqrt() / mean).clamp(0.0, 1.0))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis() -> VoiceAnalysis {
        VoiceAnalysis {
            duration_seconds: 60.0,
            wpm: Some(120.0),
            pauses: vec![3.0, 4.0, 5.0],
            filler_count: Some(6),
            pitch_variance: Some(25.0),
            energy_samples: vec![1.0, 1.0, 1.0],
        }
    }

    #[test]
    fn test_full_mapping() {
        let m = map_voice_metrics(&analysis(), "");
        assert_eq!(m.wpm, Some(120.0));
        assert!((m.pause_ratio.unwrap() - 0.2).abs() < 1e-9);
        // 6 / (120 × 60 / 60)
        assert!((m.filler_rate.unwrap() - 0.05).abs() < 1e-9);
        assert_eq!(m.energy_stability, Some(1.0));
    }

    #[test]
    fn test_regex_fallback() {
        let mut a = analysis();
        a.filler_count = None;
        let m = map_voice_metrics(&a, "Um, so I mean the plan is, uh, pues, bueno, ready");
        // um, i mean, uh, pues, bueno
        assert!((m.filler_rate.unwrap() - 5.0 / 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_count_fillers_word_boundaries() {
        assert_eq!(count_fillers("umbrella likely pueblo"), 0);
        assert_eq!(count_fillers("Umm like, este, o sea"), 4);
    }

    #[test]
    fn test_missing_wpm_leaves_filler_unset() {
        let mut a = analysis();
        a.wpm = None;
        let m = map_voice_metrics(&a, "um uh");
        assert_eq!(m.wpm, None);
        assert_eq!(m.filler_rate, None);
    }

    #[test]
    fn test_energy_cv() {
        let mut a = analysis();
        a.energy_samples = vec![0.5, 1.5];
        // mean 1.0, std 0.5
        assert!((map_voice_metrics(&a, "").energy_stability.unwrap() - 0.5).abs() < 1e-9);
        a.energy_samples.clear();
        assert_eq!(map_voice_metrics(&a, "").energy_stability, None);
    }
}
