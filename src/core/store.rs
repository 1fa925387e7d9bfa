//! Versioned threshold store
//!
//! Versions are append-only and immutable. The live pointer is an `Arc`
//! swapped under a lock; decisions already holding a snapshot keep it.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::error::{AdsError, Result};
use crate::types::AdsThresholds;

#[derive(Debug)]
pub struct ThresholdStore {
    versions: RwLock<Vec<Arc<AdsThresholds>>>,
    live: RwLock<Arc<AdsThresholds>>,
}

impl ThresholdStore {
    /// Store whose only (and live) version is `initial`
    pub fn new(initial: AdsThresholds) -> Self {
        let initial = Arc::new(initial);
        Self {
            versions: RwLock::new(vec![initial.clone()]),
            live: RwLock::new(initial),
        }
    }

    /// Baseline plus `versions` published on top, in order. Live stays on
    /// the baseline until `set_live`.
    pub fn with_published(versions: impl IntoIterator<Item = AdsThresholds>) -> Result<Self> {
        let store = Self::default();
        for thresholds in versions {
            store.publish(thresholds)?;
        }
        Ok(store)
    }

    /// Live snapshot
    pub fn live(&self) -> Arc<AdsThresholds> {
        self.live.read().clone()
    }

    pub fn live_version(&self) -> String {
        self.live.read().version.clone()
    }

    pub fn resolve(&self, version: &str) -> Result<Arc<AdsThresholds>> {
        self.versions
            .read()
            .iter()
            .find(|t| t.version == version)
            .cloned()
            .ok_or_else(|| AdsError::UnknownThresholdVersion(version.to_string()))
    }

    /// Append a new version. Does not change the live pointer.
    pub fn publish(&self, thresholds: AdsThresholds) -> Result<Arc<AdsThresholds>> {
        let mut versions = self.versions.write();
        if versions.iter().any(|t| t.version == thresholds.version) {
            return Err(AdsError::DuplicateThresholdVersion(thresholds.version));
        }
        let published = Arc::new(thresholds);
        versions.push(published.clone());
        info!(version = %published.version, "threshold version published");
        Ok(published)
    }

    /// Point live at an already published version
    pub fn set_live(&self, version: &str) -> Result<Arc<AdsThresholds>> {
        let target = self.resolve(version)?;
        let previous = std::mem::replace(&mut *self.live.write(), target.clone());
        info!(from = %previous.version, to = %target.version, "live thresholds switched");
        Ok(target)
    }

    /// Version ids in publish order
    pub fn versions(&self) -> Vec<String> {
        self.versions.read().iter().map(|t| t.version.clone()).collect()
    }

    /// Next free `ads-vN` id
    pub fn next_version_id(&self) -> String {
        let versions = self.versions.read();
        let mut n = versions.len() + 1;
        loop {
            let candidate = format!("ads-v{}", n);
            if !versions.iter().any(|t| t.version == candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

impl Default for ThresholdStore {
    fn default() -> Self {
        Self::new(AdsThresholds::baseline())
    }
}

// =============================================================================
// TESTS
// =============================================================================
