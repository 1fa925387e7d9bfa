//! Integration tests for Slice 1
//!
//! Tests the deterministic front: input → gate → normalization → rule path

use ads::core::{check_decision_allowed, gate_rejection, normalize_metrics_for_analyst, rule_evaluations};
use ads::types::{
    AdsInput, AdsInputMetrics, AdsThresholds, MetricStatus, NextAction, ReasonCode, RuleResult,
    UserContext,
};
use pretty_assertions::assert_eq;

fn input(words: usize, duration: f64, metrics: AdsInputMetrics) -> AdsInput {
    AdsInput {
        audio_sample_id: "sample-1".into(),
        transcript: vec!["word"; words].join(" "),
        duration_seconds: duration,
        metrics,
        user_context: UserContext::default(),
    }
}

fn good_metrics() -> AdsInputMetrics {
    AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8)
}

/// "hola", 2 s, full metrics → transcript rule fires first
#[test]
fn test_short_spanish_sample_rejected() {
    let mut sample = input(1, 2.0, good_metrics());
    sample.transcript = "hola".into();
    let out = gate_rejection(&sample).expect("rejected");
    assert!(!out.decision_allowed);
    assert_eq!(out.reason, Some(ReasonCode::INSUFFICIENT_DATA_TRANSCRIPT_TOO_SHORT));
    assert_eq!(out.next_action, Some(NextAction::RECORD_AGAIN));
    assert_eq!(out.authority_score, None);
}

#[test]
fn test_missing_metric_checked_before_length() {
    let mut m = good_metrics();
    m.pitch_variance = None;
    let sample = input(3, 2.0, m);
    assert_eq!(
        check_decision_allowed(&sample),
        Err(ReasonCode::MISSING_METRIC_PITCH)
    );
}

#[test]
fn test_word_and_duration_boundaries() {
    assert!(check_decision_allowed(&input(20, 8.0, good_metrics())).is_ok());
    assert_eq!(
        check_decision_allowed(&input(19, 8.0, good_metrics())),
        Err(ReasonCode::INSUFFICIENT_DATA_TRANSCRIPT_TOO_SHORT)
    );
    assert_eq!(
        check_decision_allowed(&input(20, 7.99, good_metrics())),
        Err(ReasonCode::INSUFFICIENT_DATA_AUDIO_TOO_SHORT)
    );
}

#[test]
fn test_input_json_with_missing_field() {
    let raw = r#"{
        "audio_sample_id": "s-json",
        "transcript": "one two three",
        "duration_seconds": 10.0,
        "metrics": { "pause_ratio": 0.2, "filler_rate": 0.01, "pitch_variance": 22.0, "energy_stability": 0.7 }
    }"#;
    let sample: AdsInput = serde_json::from_str(raw).unwrap();
    assert_eq!(check_decision_allowed(&sample), Err(ReasonCode::MISSING_METRIC_WPM));
}

#[test]
fn test_labels_and_decision_path_agree() {
    let thresholds = AdsThresholds::baseline();
    let m = AdsInputMetrics::complete(160.0, 0.05, 0.07, 12.0, 0.5);
    let labels = normalize_metrics_for_analyst(&m, &thresholds);
    assert_eq!(labels.wpm, MetricStatus::Fast);
    assert_eq!(labels.pause_ratio, MetricStatus::TooFewPauses);
    assert_eq!(labels.filler_rate, MetricStatus::High);
    assert_eq!(labels.pitch_variance, MetricStatus::Monotone);
    assert_eq!(labels.energy_stability, MetricStatus::Unstable);

    let rules = rule_evaluations(&m, &thresholds);
    let failed: Vec<&str> = rules
        .iter()
        .filter(|r| r.result == RuleResult::Fail)
        .map(|r| r.rule.as_str())
        .collect();
    assert_eq!(
        failed,
        vec!["wpm.max", "pause_ratio.min", "filler_rate.max", "pitch_variance.min", "energy_stability.min"]
    );
}
