//! Metric normalization: numeric metrics → status labels
//!
//! The executor never sees raw thresholds. It receives these labels, and the
//! audit decision path is rebuilt from the same functions.

use crate::types::{
    AdsInputMetrics, AdsThresholds, AuthorityScore, Boundary, MetricName, MetricStatus,
    NormalizedMetrics, RuleEvaluation, RuleResult,
};
use crate::NEAR_BOUNDARY_FRACTION;

/// Label every metric against one threshold version
pub fn normalize_metrics_for_analyst(
    metrics: &AdsInputMetrics,
    thresholds: &AdsThresholds,
) -> NormalizedMetrics {
    NormalizedMetrics {
        wpm: label_range(
            metrics.wpm,
            thresholds.wpm.min(),
            thresholds.wpm.max(),
            MetricStatus::Slow,
            MetricStatus::Fast,
        ),
        pause_ratio: label_range(
            metrics.pause_ratio,
            thresholds.pause_ratio.min(),
            thresholds.pause_ratio.max(),
            MetricStatus::TooFewPauses,
            MetricStatus::TooManyPauses,
        ),
        filler_rate: match metrics.filler_rate {
            None => MetricStatus::Missing,
            Some(v) if v > thresholds.filler_rate.max => MetricStatus::High,
            Some(_) => MetricStatus::Optimal,
        },
        pitch_variance: match metrics.pitch_variance {
            None => MetricStatus::Missing,
            Some(v) if v < thresholds.pitch_variance.min => MetricStatus::Monotone,
            Some(_) => MetricStatus::Optimal,
        },
        energy_stability: match metrics.energy_stability {
            None => MetricStatus::Missing,
            Some(v) if v < thresholds.energy_stability.min => MetricStatus::Unstable,
            Some(_) => MetricStatus::Optimal,
        },
    }
}

fn label_range(
    value: Option<f64>,
    min: f64,
    max: f64,
    below: MetricStatus,
    above: MetricStatus,
) -> MetricStatus {
    match value {
        None => MetricStatus::Missing,
        Some(v) if v < min => below,
        Some(v) if v > max => above,
        Some(_) => MetricStatus::Optimal,
    }
}

/// Rule evaluations for the audit decision path, one per threshold edge
pub fn rule_evaluations(
    metrics: &AdsInputMetrics,
    thresholds: &AdsThresholds,
) -> Vec<RuleEvaluation> {
    let mut rules = Vec::with_capacity(7);
    for metric in MetricName::ALL {
        for boundary in [Boundary::Lower, Boundary::Upper] {
            let Some(edge) = thresholds.edge(metric, boundary) else {
                continue;
            };
            let value = metrics.get(metric);
            let (suffix, op) = match boundary {
                Boundary::Lower => ("min", ">="),
                Boundary::Upper => ("max", "<="),
            };
            let result = match value {
                None => RuleResult::Skipped,
                Some(v) => {
                    let ok = match boundary {
                        Boundary::Lower => v >= edge,
                        Boundary::Upper => v <= edge,
                    };
                    if ok { RuleResult::Pass } else { RuleResult::Fail }
                }
            };
            rules.push(RuleEvaluation {
                rule: format!("{}.{}", metric, suffix),
                threshold: format!("{} {}", op, edge),
                value,
                result,
            });
        }
    }
    rules
}

/// Metric edges the value sits inside of, but within 5% of the span
pub fn near_boundaries(
    metrics: &AdsInputMetrics,
    thresholds: &AdsThresholds,
) -> Vec<(MetricName, Boundary)> {
    let mut near = Vec::new();

    let two_sided = [
        (MetricName::Wpm, thresholds.wpm),
        (MetricName::PauseRatio, thresholds.pause_ratio),
    ];
    for (metric, range) in two_sided {
        let Some(v) = metrics.get(metric) else { continue };
        if v < range.min() || v > range.max() {
            continue;
        }
        let margin = range.span() * NEAR_BOUNDARY_FRACTION;
        if v - range.min() <= margin {
            near.push((metric, Boundary::Lower));
        }
        if range.max() - v <= margin {
            near.push((metric, Boundary::Upper));
        }
    }

    // One-sided edges: margin is 5% of the edge value itself
    if let Some(v) = metrics.filler_rate {
        let edge = thresholds.filler_rate.max;
        if v <= edge && edge - v <= edge.abs() * NEAR_BOUNDARY_FRACTION {
            near.push((MetricName::FillerRate, Boundary::Upper));
        }
    }
    for (metric, edge) in [
        (MetricName::PitchVariance, thresholds.pitch_variance.min),
        (MetricName::EnergyStability, thresholds.energy_stability.min),
    ] {
        let Some(v) = metrics.get(metric) else { continue };
        if v >= edge && v - edge <= edge.abs() * NEAR_BOUNDARY_FRACTION {
            near.push((metric, Boundary::Lower));
        }
    }

    near
}

/// Rule-only score from labels: 5 optimal → HIGH, ≥3 → MEDIUM, else LOW.
/// Used where no executor verdict is available (shadow comparisons).
pub fn rule_based_score(normalized: &NormalizedMetrics) -> AuthorityScore {
    match normalized.optimal_count() {
        5 => AuthorityScore::High,
        3 | 4 => AuthorityScore::Medium,
        _ => AuthorityScore::Low,
    }
}

// =============================================================================
// TESTS
// =============================================================================
