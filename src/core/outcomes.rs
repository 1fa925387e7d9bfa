//! Outcome collection: buffer feedback until a batch is large enough

use parking_lot::Mutex;
use tracing::debug;

use crate::types::OutcomeData;
use crate::MIN_ANALYSIS_SAMPLES;

#[derive(Debug)]
pub struct OutcomeCollector {
    pending: Mutex<Vec<OutcomeData>>,
    batch_size: usize,
}

impl Default for OutcomeCollector {
    fn default() -> Self {
        Self::with_batch_size(MIN_ANALYSIS_SAMPLES)
    }
}

impl OutcomeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch size is never below the analyzer minimum
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            batch_size: batch_size.max(MIN_ANALYSIS_SAMPLES),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn submit(&self, outcome: OutcomeData) {
        let mut pending = self.pending.lock();
        pending.push(outcome);
        debug!(pending = pending.len(), "outcome submitted");
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Drain one full batch, oldest first. `None` until enough have arrived.
    pub fn take_batch(&self) -> Option<Vec<OutcomeData>> {
        let mut pending = self.pending.lock();
        if pending.len() < self.batch_size {
            return None;
        }
        Some(pending.drain(..self.batch_size).collect())
    }

    /// Everything pending, regardless of size
    pub fn drain_all(&self) -> Vec<OutcomeData> {
        std::mem::take(&mut *self.pending.lock())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AdsInputMetrics, AuthorityScore, Confidence, OutcomeReport, UserContext};
    use chrono::Utc;

    fn outcome(i: usize) -> OutcomeData {
        OutcomeData {
            session_id: format!("s-{}", i),
            authority_score: AuthorityScore::Medium,
            confidence: Confidence::Medium,
            context: UserContext::default(),
            outcome: OutcomeReport::default(),
            metrics_snapshot: AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_batch_released_at_size() {
        let c = OutcomeCollector::new();
        for i in 0..99 {
            c.submit(outcome(i));
        }
        assert!(c.take_batch().is_none());
        c.submit(outcome(99));
        c.submit(outcome(100));
        let batch = c.take_batch().unwrap();
        assert_eq!(batch.len(), 100);
        assert_eq!(batch[0].session_id, "s-0");
        assert_eq!(c.pending(), 1);
    }

    #[test]
    fn test_batch_size_floor() {
        assert_eq!(OutcomeCollector::with_batch_size(10).batch_size(), 100);
        assert_eq!(OutcomeCollector::with_batch_size(250).batch_size(), 250);
    }
}
