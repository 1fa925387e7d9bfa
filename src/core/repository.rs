//! Append-only audit repository
//!
//! Key invariant: rows are only ever appended. `AuditStore` exposes no
//! update or delete; corrections are new records that supersede old ones.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::hashing::prefixed_json_hash;
use crate::error::Result;
use crate::types::{AuditHeader, AuditInputs, AuditRecord, AuditRow, FinalDecision};

/// Persistence seam for audit rows
pub trait AuditStore: Send + Sync {
    fn append(&self, row: &AuditRow) -> Result<()>;

    /// Every row, in append order
    fn all(&self) -> Result<Vec<AuditRow>>;

    /// First row with this decision id
    fn find(&self, decision_id: &str) -> Result<Option<AuditRow>> {
        Ok(self
            .all()?
            .into_iter()
            .find(|row| row.record.header.decision_id == decision_id))
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    rows: Mutex<Vec<AuditRow>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

impl AuditStore for MemoryAuditStore {
    fn append(&self, row: &AuditRow) -> Result<()> {
        self.rows.lock().push(row.clone());
        Ok(())
    }

    fn all(&self) -> Result<Vec<AuditRow>> {
        Ok(self.rows.lock().clone())
    }
}

/// One JSON row per line, opened in append mode
#[derive(Debug)]
pub struct JsonlAuditStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAuditStore {
    /// Creates the parent directory if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditStore for JsonlAuditStore {
    fn append(&self, row: &AuditRow) -> Result<()> {
        let line = serde_json::to_string(row)?;
        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn all(&self) -> Result<Vec<AuditRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path)?;
        let mut rows = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            rows.push(serde_json::from_str(&line)?);
        }
        Ok(rows)
    }
}

/// Hashed subset of a record
#[derive(Serialize)]
struct IntegrityView<'a> {
    header: &'a AuditHeader,
    inputs: &'a AuditInputs,
    final_decision: &'a FinalDecision,
}

/// `sha256:<hex>` over `{header, inputs, final_decision}`
pub fn integrity_hash(record: &AuditRecord) -> Result<String> {
    let view = IntegrityView {
        header: &record.header,
        inputs: &record.inputs,
        final_decision: &record.final_decision,
    };
    Ok(prefixed_json_hash(&view)?)
}

/// Repository over any append-only store
pub struct AuditRepository {
    store: Box<dyn AuditStore>,
}

impl std::fmt::Debug for AuditRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRepository").finish_non_exhaustive()
    }
}

impl AuditRepository {
    pub fn new(store: Box<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryAuditStore::new()))
    }

    /// Hash and append. The record was validated when it was built.
    pub fn persist(&self, record: AuditRecord) -> Result<AuditRow> {
        let row = AuditRow {
            integrity_hash: integrity_hash(&record)?,
            record,
            persisted_at: Utc::now(),
        };
        self.store.append(&row)?;
        info!(
            decision_id = %row.record.header.decision_id,
            version = %row.record.header.threshold_version,
            arm = %row.record.header.experiment_arm,
            "audit record persisted"
        );
        Ok(row)
    }

    /// Recompute the hash and compare
    pub fn verify_integrity(row: &AuditRow) -> Result<bool> {
        let ok = integrity_hash(&row.record)? == row.integrity_hash;
        if !ok {
            debug!(decision_id = %row.record.header.decision_id, "integrity mismatch");
        }
        Ok(ok)
    }

    pub fn find(&self, decision_id: &str) -> Result<Option<AuditRow>> {
        self.store.find(decision_id)
    }

    pub fn all(&self) -> Result<Vec<AuditRow>> {
        self.store.all()
    }

    /// Original decision followed by every correction chained from it
    pub fn history(&self, decision_id: &str) -> Result<Vec<AuditRow>> {
        let rows = self.store.all()?;
        let mut chain: Vec<AuditRow> = Vec::new();
        let mut ids = vec![decision_id.to_string()];

        for row in rows {
            let header = &row.record.header;
            let is_original = header.decision_id == decision_id;
            let is_correction = header
                .supersedes
                .as_ref()
                .map_or(false, |s| ids.contains(s));
            if is_original || is_correction {
                if !ids.contains(&header.decision_id) {
                    ids.push(header.decision_id.clone());
                }
                chain.push(row);
            }
        }
        Ok(chain)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::AuditTrailBuilder;
    use crate::types::{
        AdsInputMetrics, AdsOutput, AdsThresholds, Arm, AuthorityScore, Confidence,
        CriticVerdict,
    };

    fn record(id: &str, supersedes: Option<&str>) -> AuditRecord {
        let m = AdsInputMetrics::complete(135.0, 0.18, 0.02, 30.0, 0.8);
        let mut b = AuditTrailBuilder::new()
            .header(id, "default", "ads-v1", Arm::A, "ads-executor-v1")
            .inputs(m)
            .decision_path_from(&AdsThresholds::baseline(), &m)
            .executor_contribution(None)
            .critic_verdict(CriticVerdict::default())
            .final_decision(&AdsOutput::scored(AuthorityScore::Medium, Confidence::Medium));
        if let Some(s) = supersedes {
            b = b.supersedes(s);
        }
        b.build().unwrap()
    }

    #[test]
    fn test_persist_hashes_and_verifies() {
        let repo = AuditRepository::in_memory();
        let row = repo.persist(record("d-1", None)).unwrap();
        assert!(row.integrity_hash.starts_with("sha256:"));
        assert!(AuditRepository::verify_integrity(&row).unwrap());
    }

    #[test]
    fn test_tampering_detected() {
        let repo = AuditRepository::in_memory();
        let mut row = repo.persist(record("d-1", None)).unwrap();
        row.record.final_decision.authority_score = Some(AuthorityScore::High);
        assert!(!AuditRepository::verify_integrity(&row).unwrap());
    }

    #[test]
    fn test_hash_ignores_critic_section() {
        let a = record("d-1", None);
        let mut b = a.clone();
        b.critic_verdict.flags.push("X".into());
        assert_eq!(integrity_hash(&a).unwrap(), integrity_hash(&b).unwrap());
    }

    #[test]
    fn test_history_follows_corrections() {
        let repo = AuditRepository::in_memory();
        repo.persist(record("d-1", None)).unwrap();
        repo.persist(record("d-other", None)).unwrap();
        repo.persist(record("d-2", Some("d-1"))).unwrap();
        repo.persist(record("d-3", Some("d-2"))).unwrap();

        let chain: Vec<String> = repo
            .history("d-1")
            .unwrap()
            .into_iter()
            .map(|r| r.record.header.decision_id)
            .collect();
        assert_eq!(chain, vec!["d-1", "d-2", "d-3"]);
    }

    #[test]
    fn test_find() {
        let repo = AuditRepository::in_memory();
        repo.persist(record("d-1", None)).unwrap();
        assert!(repo.find("d-1").unwrap().is_some());
        assert!(repo.find("missing").unwrap().is_none());
    }
}
