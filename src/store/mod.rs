// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — store/mod.rs
// Governance Kernel: Sharded PDO Store with Index Hardening
// Governance Tier: LAW
// Invariant: ONE_PDO_PER_PAC | IMMUTABLE_ENTRIES | LOCK_ORDER_SHARD_THEN_INDEX
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! Horizontally sharded, thread-safe storage for PDO entries.
//!
//! - Shard selection is a stable FNV-1a hash of the `pdo_id`, fixed at
//!   store creation.
//! - Each shard owns its lock; the multi-index layer owns a separate lock.
//!   During `store` the shard lock is acquired first, then the index lock.
//!   No other order is permitted.
//! - Entries are immutable after commit: a second write with the same id
//!   and identical content is `DuplicateEntry`; different content is
//!   `ImmutabilityViolation`.

pub mod index;
pub mod shard;

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GovernanceError, GovernanceResult};

pub use index::{IndexSizes, PdoIndex};
pub use shard::{PdoEntry, PdoShard, ShardMetrics, StorageState};

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub shard_count: usize,
    pub max_entries_per_shard: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shard_count: 16,
            max_entries_per_shard: 10_000,
        }
    }
}

/// Aggregate store metrics. Observation only; never affects correctness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMetrics {
    pub total_entries: usize,
    pub total_writes: u64,
    pub total_reads: u64,
    pub write_throughput: f64,
    pub read_throughput: f64,
    pub shard_distribution: Vec<usize>,
}

/// Input fields for one store write.
#[derive(Debug, Clone)]
pub struct PdoWrite {
    pub pdo_id: String,
    pub pac_id: String,
    pub agent_gids: Vec<String>,
    pub ber_status: String,
    pub wrap_hashes: Vec<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORE
// ═══════════════════════════════════════════════════════════════════════════════

pub struct PdoStore {
    shards: Vec<PdoShard>,
    index: PdoIndex,
    totals: Mutex<(u64, u64)>, // (writes, reads)
    started: Instant,
}

impl Default for PdoStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl PdoStore {
    pub fn new(config: StoreConfig) -> Self {
        let shard_count = config.shard_count.max(1);
        Self {
            shards: (0..shard_count)
                .map(|i| PdoShard::new(i, config.max_entries_per_shard))
                .collect(),
            index: PdoIndex::new(),
            totals: Mutex::new((0, 0)),
            started: Instant::now(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn total_entries(&self) -> usize {
        self.shards.iter().map(PdoShard::entry_count).sum()
    }

    /// Stable non-cryptographic shard selection over the id bytes (FNV-1a).
    fn select_shard(&self, pdo_id: &str) -> usize {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
        let mut hash = FNV_OFFSET;
        for byte in pdo_id.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        (hash % self.shards.len() as u64) as usize
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Write operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a new PDO entry. Routes to the owning shard (shard lock), then
    /// updates the indexes (index lock). Entries are immutable once stored.
    pub fn store(&self, write: PdoWrite) -> GovernanceResult<PdoEntry> {
        let entry = PdoEntry::new(
            write.pdo_id,
            write.pac_id,
            write.agent_gids,
            write.ber_status,
            write.wrap_hashes,
        );

        let shard_id = self.select_shard(&entry.pdo_id);
        let committed = self.shards[shard_id].write(entry)?;
        self.index.index(&committed);

        self.totals.lock().0 += 1;
        debug!(
            pdo_id = %committed.pdo_id,
            shard_id,
            "pdo entry committed"
        );
        Ok(committed)
    }

    /// Store a batch. Returns (committed entries, failed pdo ids). A failed
    /// write never aborts the remainder of the batch.
    pub fn store_batch(&self, writes: Vec<PdoWrite>) -> (Vec<PdoEntry>, Vec<String>) {
        let mut committed = Vec::new();
        let mut failed = Vec::new();
        for write in writes {
            let pdo_id = write.pdo_id.clone();
            match self.store(write) {
                Ok(entry) => committed.push(entry),
                Err(_) => failed.push(pdo_id),
            }
        }
        (committed, failed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a PDO by id via the primary index. Missing → None.
    pub fn get(&self, pdo_id: &str) -> Option<PdoEntry> {
        let shard_id = self.index.shard_of(pdo_id)?;
        let entry = self.shards.get(shard_id)?.read(pdo_id);
        self.totals.lock().1 += 1;
        entry
    }

    pub fn exists(&self, pdo_id: &str) -> bool {
        self.index.shard_of(pdo_id).is_some()
    }

    fn collect(&self, ids: impl IntoIterator<Item = String>) -> Vec<PdoEntry> {
        ids.into_iter().filter_map(|id| self.get(&id)).collect()
    }

    pub fn find_by_pac(&self, pac_id: &str) -> Vec<PdoEntry> {
        self.collect(self.index.find_by_pac(pac_id))
    }

    pub fn find_by_agent(&self, agent_gid: &str) -> Vec<PdoEntry> {
        self.collect(self.index.find_by_agent(agent_gid))
    }

    pub fn find_by_hash(&self, content_hash: &str) -> Vec<PdoEntry> {
        self.collect(self.index.find_by_hash(content_hash))
    }

    /// Find PDOs by creation date, `YYYY-MM-DD`.
    pub fn find_by_date(&self, date: &str) -> Vec<PdoEntry> {
        self.collect(self.index.find_by_date(date))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Spot-check that a stored entry still carries the expected content
    /// hash. False for missing entries.
    pub fn validate_immutability(&self, pdo_id: &str, expected_hash: &str) -> bool {
        self.get(pdo_id)
            .map(|entry| entry.content_hash == expected_hash)
            .unwrap_or(false)
    }

    /// Walk every shard and check the index layer covers exactly the union
    /// of shard keys: no orphans, no missing entries. Used for post-burst
    /// audits. Returns (ok, errors).
    pub fn validate_integrity(&self) -> (bool, Vec<String>) {
        let mut all_entries: HashMap<String, PdoEntry> = HashMap::new();
        for shard in &self.shards {
            for entry in shard.collect_entries() {
                all_entries.insert(entry.pdo_id.clone(), entry);
            }
        }
        self.index.validate_integrity(&all_entries)
    }

    /// Asserting form of `validate_integrity` for gates that refuse to
    /// proceed over a corrupt index.
    pub fn require_integrity(&self) -> GovernanceResult<()> {
        let (ok, errors) = self.validate_integrity();
        if !ok {
            return Err(GovernanceError::IndexCorruption(errors.len()));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Metrics
    // ─────────────────────────────────────────────────────────────────────────

    pub fn metrics(&self) -> StoreMetrics {
        let elapsed = self.started.elapsed().as_secs_f64();
        let (writes, reads) = *self.totals.lock();
        StoreMetrics {
            total_entries: self.total_entries(),
            total_writes: writes,
            total_reads: reads,
            write_throughput: if elapsed > 0.0 { writes as f64 / elapsed } else { 0.0 },
            read_throughput: if elapsed > 0.0 { reads as f64 / elapsed } else { 0.0 },
            shard_distribution: self.shards.iter().map(PdoShard::entry_count).collect(),
        }
    }

    pub fn shard_metrics(&self) -> Vec<ShardMetrics> {
        self.shards.iter().map(PdoShard::metrics).collect()
    }

    pub fn index_sizes(&self) -> IndexSizes {
        self.index.sizes()
    }

    pub fn primary_index_len(&self) -> usize {
        self.index.primary_len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GovernanceError;
    use std::sync::Arc;

    fn write(pdo_id: &str, pac_id: &str) -> PdoWrite {
        PdoWrite {
            pdo_id: pdo_id.to_string(),
            pac_id: pac_id.to_string(),
            agent_gids: vec!["GID-01".to_string()],
            ber_status: "APPROVE".to_string(),
            wrap_hashes: vec!["h1".to_string()],
        }
    }

    #[test]
    fn test_store_and_get_round_trip() {
        let store = PdoStore::default();
        let committed = store.store(write("pdo_1", "PAC-A-B-C-D-001")).unwrap();
        assert_eq!(committed.state, StorageState::Committed);

        let fetched = store.get("pdo_1").unwrap();
        assert_eq!(fetched.pac_id, "PAC-A-B-C-D-001");
        assert_eq!(fetched.content_hash, committed.content_hash);
        assert!(store.exists("pdo_1"));
        assert!(!store.exists("pdo_2"));
    }

    #[test]
    fn test_secondary_finders() {
        let store = PdoStore::default();
        let committed = store.store(write("pdo_1", "PAC-A-B-C-D-001")).unwrap();
        store.store(write("pdo_2", "PAC-A-B-C-D-002")).unwrap();

        assert_eq!(store.find_by_pac("PAC-A-B-C-D-001").len(), 1);
        assert_eq!(store.find_by_agent("GID-01").len(), 2);
        assert_eq!(store.find_by_hash(&committed.content_hash).len(), 1);
        assert_eq!(store.find_by_date(&committed.date_key()).len(), 2);
        // Misses return empty, never raise
        assert!(store.find_by_pac("PAC-NONE").is_empty());
    }

    #[test]
    fn test_duplicate_and_immutability_at_store_level() {
        let store = PdoStore::default();
        store.store(write("pdo_1", "PAC-A-B-C-D-001")).unwrap();

        let err = store.store(write("pdo_1", "PAC-A-B-C-D-001")).unwrap_err();
        assert!(matches!(err, GovernanceError::DuplicateEntry { .. }));

        let mut altered = write("pdo_1", "PAC-A-B-C-D-001");
        altered.ber_status = "REJECT".to_string();
        let err = store.store(altered).unwrap_err();
        assert!(matches!(err, GovernanceError::ImmutabilityViolation { .. }));

        // The committed entry is untouched
        assert_eq!(store.get("pdo_1").unwrap().ber_status, "APPROVE");
        assert_eq!(store.total_entries(), 1);
    }

    #[test]
    fn test_shard_overflow_boundary() {
        let store = PdoStore::new(StoreConfig {
            shard_count: 1,
            max_entries_per_shard: 3,
        });
        for i in 0..3 {
            store.store(write(&format!("pdo_{i}"), "PAC-A-B-C-D-001")).unwrap();
        }
        let err = store.store(write("pdo_over", "PAC-A-B-C-D-001")).unwrap_err();
        assert!(matches!(err, GovernanceError::ShardOverflow { .. }));
        assert_eq!(store.total_entries(), 3);
    }

    #[test]
    fn test_shard_selection_is_stable() {
        let store = PdoStore::default();
        assert_eq!(store.select_shard("pdo_42"), store.select_shard("pdo_42"));
        let shard = store.select_shard("pdo_42");
        assert!(shard < store.shard_count());
    }

    #[test]
    fn test_store_batch_partial_failure() {
        let store = PdoStore::default();
        let (committed, failed) = store.store_batch(vec![
            write("pdo_1", "PAC-A-B-C-D-001"),
            write("pdo_1", "PAC-A-B-C-D-001"), // duplicate
            write("pdo_2", "PAC-A-B-C-D-002"),
        ]);
        assert_eq!(committed.len(), 2);
        assert_eq!(failed, vec!["pdo_1".to_string()]);
    }

    #[test]
    fn test_validate_immutability_spot_check() {
        let store = PdoStore::default();
        let committed = store.store(write("pdo_1", "PAC-A-B-C-D-001")).unwrap();
        assert!(store.validate_immutability("pdo_1", &committed.content_hash));
        assert!(!store.validate_immutability("pdo_1", &"0".repeat(64)));
        assert!(!store.validate_immutability("missing", &committed.content_hash));
    }

    #[test]
    fn test_integrity_after_writes() {
        let store = PdoStore::default();
        for i in 0..50 {
            store
                .store(write(&format!("pdo_{i}"), &format!("PAC-A-B-C-D-{i:03}")))
                .unwrap();
        }
        let (ok, errors) = store.validate_integrity();
        assert!(ok, "errors: {errors:?}");
        assert_eq!(store.primary_index_len(), 50);
        assert!(store.require_integrity().is_ok());
    }

    #[test]
    fn test_concurrent_burst_1000_entries() {
        // 1000 distinct writes across 10 threads, 16 shards, 200/shard
        let store = Arc::new(PdoStore::new(StoreConfig {
            shard_count: 16,
            max_entries_per_shard: 200,
        }));

        let mut handles = Vec::new();
        for thread_id in 0..10 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    let n = thread_id * 100 + i;
                    store
                        .store(write(&format!("pdo_{n}"), &format!("PAC-A-B-C-D-{n:03}")))
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.total_entries(), 1000);
        assert_eq!(store.primary_index_len(), 1000);
        let (ok, errors) = store.validate_integrity();
        assert!(ok, "errors: {errors:?}");
        // Every pac finder is non-empty and internally consistent
        for n in 0..1000 {
            let found = store.find_by_pac(&format!("PAC-A-B-C-D-{n:03}"));
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].pdo_id, format!("pdo_{n}"));
        }
    }

    #[test]
    fn test_concurrent_same_id_identical_payload() {
        // Exactly one write succeeds; the other observes DuplicateEntry
        let store = Arc::new(PdoStore::default());
        let mut handles = Vec::new();
        for _ in 0..2 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store.store(write("pdo_same", "PAC-A-B-C-D-001"))
            }));
        }
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok_count = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok_count, 1);
        let errs: Vec<_> = results.into_iter().filter_map(Result::err).collect();
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0], GovernanceError::DuplicateEntry { .. }));
        assert_eq!(store.total_entries(), 1);
    }

    #[test]
    fn test_concurrent_same_id_different_payload() {
        // Exactly one write succeeds; the other observes ImmutabilityViolation
        let store = Arc::new(PdoStore::default());
        let mut handles = Vec::new();
        for status in ["APPROVE", "REJECT"] {
            let store = Arc::clone(&store);
            let status = status.to_string();
            handles.push(std::thread::spawn(move || {
                let mut w = write("pdo_same", "PAC-A-B-C-D-001");
                w.ber_status = status;
                store.store(w)
            }));
        }
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok_count = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok_count, 1);
        let errs: Vec<_> = results.into_iter().filter_map(Result::err).collect();
        assert!(matches!(errs[0], GovernanceError::ImmutabilityViolation { .. }));
        assert_eq!(store.total_entries(), 1);
    }

    #[test]
    fn test_metrics_observe_throughput() {
        let store = PdoStore::default();
        store.store(write("pdo_1", "PAC-A-B-C-D-001")).unwrap();
        store.get("pdo_1");
        let metrics = store.metrics();
        assert_eq!(metrics.total_entries, 1);
        assert_eq!(metrics.total_writes, 1);
        assert_eq!(metrics.total_reads, 1);
        assert_eq!(metrics.shard_distribution.iter().sum::<usize>(), 1);
        let sizes = store.index_sizes();
        assert_eq!(sizes.primary, 1);
    }
}
