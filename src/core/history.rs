//! Per-decision metric history
//!
//! The caller owns the store; the pipeline only appends to it.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::{AdsInputMetrics, AuthorityScore};

/// Default capacity of the in-memory history
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricHistoryEntry {
    pub decision_id: String,
    pub audio_sample_id: String,
    pub metrics: AdsInputMetrics,
    pub authority_score: Option<AuthorityScore>,
    pub recorded_at: DateTime<Utc>,
}

pub trait MetricHistoryStore: Send + Sync {
    fn append(&self, entry: MetricHistoryEntry);

    /// Newest last, at most `n`
    fn recent(&self, n: usize) -> Vec<MetricHistoryEntry>;
}

/// Bounded ring; oldest entries are dropped first
#[derive(Debug)]
pub struct InMemoryMetricHistory {
    entries: Mutex<VecDeque<MetricHistoryEntry>>,
    capacity: usize,
}

impl InMemoryMetricHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for InMemoryMetricHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl MetricHistoryStore for InMemoryMetricHistory {
    fn append(&self, entry: MetricHistoryEntry) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    fn recent(&self, n: usize) -> Vec<MetricHistoryEntry> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(i: usize) -> MetricHistoryEntry {
        MetricHistoryEntry {
            decision_id: format!("d-{}", i),
            audio_sample_id: format!("s-{}", i),
            metrics: AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8),
            authority_score: Some(AuthorityScore::Medium),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_bounded() {
        let h = InMemoryMetricHistory::new(3);
        for i in 0..5 {
            h.append(entry(i));
        }
        assert_eq!(h.len(), 3);
        let ids: Vec<_> = h.recent(10).into_iter().map(|e| e.decision_id).collect();
        assert_eq!(ids, vec!["d-2", "d-3", "d-4"]);
    }

    #[test]
    fn test_recent_newest_last() {
        let h = InMemoryMetricHistory::default();
        for i in 0..4 {
            h.append(entry(i));
        }
        let ids: Vec<_> = h.recent(2).into_iter().map(|e| e.decision_id).collect();
        assert_eq!(ids, vec!["d-2", "d-3"]);
    }
}
