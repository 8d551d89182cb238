// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — store/shard.rs
// Governance Kernel: PDO Storage Shard
// Governance Tier: LAW
// Invariant: IMMUTABLE_AFTER_COMMIT | BOUNDED_CAPACITY
// ═══════════════════════════════════════════════════════════════════════════════

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::canonical;
use crate::error::{GovernanceError, GovernanceResult};

/// State of a storage entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageState {
    Pending,
    Committed,
    Archived,
    Corrupted,
}

/// A single PDO entry in storage. Immutable after commit: the shard hands
/// out clones, never references into its map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdoEntry {
    pub pdo_id: String,
    pub pac_id: String,
    pub agent_gids: Vec<String>,
    pub ber_status: String,
    pub wrap_hashes: Vec<String>,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub state: StorageState,
    pub shard_id: usize,
}

impl PdoEntry {
    /// Build an entry with its content hash computed over the identifying
    /// payload (canonical form; gid and hash sets sorted).
    pub fn new(
        pdo_id: impl Into<String>,
        pac_id: impl Into<String>,
        agent_gids: Vec<String>,
        ber_status: impl Into<String>,
        wrap_hashes: Vec<String>,
    ) -> Self {
        let pdo_id = pdo_id.into();
        let pac_id = pac_id.into();
        let ber_status = ber_status.into();
        let content_hash =
            Self::compute_hash(&pdo_id, &pac_id, &agent_gids, &ber_status, &wrap_hashes);
        Self {
            pdo_id,
            pac_id,
            agent_gids,
            ber_status,
            wrap_hashes,
            content_hash,
            created_at: Utc::now(),
            state: StorageState::Pending,
            shard_id: 0,
        }
    }

    /// Deterministic content hash over the identifying payload.
    pub fn compute_hash(
        pdo_id: &str,
        pac_id: &str,
        agent_gids: &[String],
        ber_status: &str,
        wrap_hashes: &[String],
    ) -> String {
        let mut gids = agent_gids.to_vec();
        gids.sort();
        let mut hashes = wrap_hashes.to_vec();
        hashes.sort();
        let payload = json!({
            "pdo_id": pdo_id,
            "pac_id": pac_id,
            "agent_gids": gids,
            "ber_status": ber_status,
            "wrap_hashes": hashes,
        });
        canonical::canonical_hash(&payload)
    }

    /// Date key for the secondary date index (YYYY-MM-DD).
    pub fn date_key(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }
}

/// Metrics for a single shard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShardMetrics {
    pub shard_id: usize,
    pub entry_count: usize,
    pub total_writes: u64,
    pub total_reads: u64,
    pub last_write_at: Option<DateTime<Utc>>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub avg_write_latency_ms: f64,
    pub avg_read_latency_ms: f64,
}

const LATENCY_WINDOW: usize = 100;

struct ShardInner {
    entries: HashMap<String, PdoEntry>,
    metrics: ShardMetrics,
    write_latencies: VecDeque<f64>,
    read_latencies: VecDeque<f64>,
}

/// A single shard of PDO storage. Each shard owns its lock; reads and
/// writes on distinct shards proceed in parallel.
pub struct PdoShard {
    shard_id: usize,
    max_entries: usize,
    inner: Mutex<ShardInner>,
}

impl PdoShard {
    pub fn new(shard_id: usize, max_entries: usize) -> Self {
        Self {
            shard_id,
            max_entries,
            inner: Mutex::new(ShardInner {
                entries: HashMap::new(),
                metrics: ShardMetrics {
                    shard_id,
                    ..Default::default()
                },
                write_latencies: VecDeque::with_capacity(LATENCY_WINDOW),
                read_latencies: VecDeque::with_capacity(LATENCY_WINDOW),
            }),
        }
    }

    pub fn shard_id(&self) -> usize {
        self.shard_id
    }

    pub fn entry_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_full(&self) -> bool {
        self.entry_count() >= self.max_entries
    }

    /// Write an entry to the shard.
    ///
    /// Fails with `ShardOverflow` when full, `DuplicateEntry` when the id is
    /// present with identical content, `ImmutabilityViolation` when the id
    /// is present with different content. On success the committed entry is
    /// returned.
    pub fn write(&self, mut entry: PdoEntry) -> GovernanceResult<PdoEntry> {
        let start = Instant::now();
        let mut inner = self.inner.lock();

        if inner.entries.len() >= self.max_entries {
            return Err(GovernanceError::ShardOverflow {
                shard_id: self.shard_id,
                capacity: self.max_entries,
            });
        }

        if let Some(existing) = inner.entries.get(&entry.pdo_id) {
            if existing.content_hash != entry.content_hash {
                return Err(GovernanceError::ImmutabilityViolation {
                    pdo_id: entry.pdo_id,
                });
            }
            return Err(GovernanceError::DuplicateEntry {
                pdo_id: entry.pdo_id,
            });
        }

        entry.state = StorageState::Committed;
        entry.shard_id = self.shard_id;
        inner.entries.insert(entry.pdo_id.clone(), entry.clone());

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        if inner.write_latencies.len() == LATENCY_WINDOW {
            inner.write_latencies.pop_front();
        }
        inner.write_latencies.push_back(elapsed_ms);
        inner.metrics.entry_count = inner.entries.len();
        inner.metrics.total_writes += 1;
        inner.metrics.last_write_at = Some(Utc::now());
        inner.metrics.avg_write_latency_ms =
            inner.write_latencies.iter().sum::<f64>() / inner.write_latencies.len() as f64;

        Ok(entry)
    }

    /// Read an entry. A miss returns None, never an error.
    pub fn read(&self, pdo_id: &str) -> Option<PdoEntry> {
        let start = Instant::now();
        let mut inner = self.inner.lock();
        let entry = inner.entries.get(pdo_id).cloned();

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        if inner.read_latencies.len() == LATENCY_WINDOW {
            inner.read_latencies.pop_front();
        }
        inner.read_latencies.push_back(elapsed_ms);
        inner.metrics.total_reads += 1;
        inner.metrics.last_read_at = Some(Utc::now());
        inner.metrics.avg_read_latency_ms =
            inner.read_latencies.iter().sum::<f64>() / inner.read_latencies.len() as f64;

        entry
    }

    /// All entry ids currently committed to this shard.
    pub fn list_entry_ids(&self) -> Vec<String> {
        self.inner.lock().entries.keys().cloned().collect()
    }

    /// Snapshot of all entries, for integrity walks.
    pub fn collect_entries(&self) -> Vec<PdoEntry> {
        self.inner.lock().entries.values().cloned().collect()
    }

    pub fn metrics(&self) -> ShardMetrics {
        let inner = self.inner.lock();
        let mut metrics = inner.metrics.clone();
        metrics.entry_count = inner.entries.len();
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pdo_id: &str) -> PdoEntry {
        PdoEntry::new(
            pdo_id,
            "PAC-A-B-C-D-001",
            vec!["GID-01".to_string()],
            "APPROVE",
            vec!["h1".to_string()],
        )
    }

    #[test]
    fn test_write_commits_entry() {
        let shard = PdoShard::new(0, 10);
        let committed = shard.write(entry("pdo_1")).unwrap();
        assert_eq!(committed.state, StorageState::Committed);
        assert_eq!(committed.shard_id, 0);
        assert_eq!(shard.entry_count(), 1);
    }

    #[test]
    fn test_overflow_at_exact_capacity() {
        let shard = PdoShard::new(2, 2);
        shard.write(entry("pdo_1")).unwrap();
        shard.write(entry("pdo_2")).unwrap();
        assert!(shard.is_full());
        let err = shard.write(entry("pdo_3")).unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::ShardOverflow {
                shard_id: 2,
                capacity: 2
            }
        ));
    }

    #[test]
    fn test_duplicate_same_content() {
        let shard = PdoShard::new(0, 10);
        shard.write(entry("pdo_1")).unwrap();
        let err = shard.write(entry("pdo_1")).unwrap_err();
        assert!(matches!(err, GovernanceError::DuplicateEntry { .. }));
    }

    #[test]
    fn test_immutability_violation_on_different_content() {
        let shard = PdoShard::new(0, 10);
        shard.write(entry("pdo_1")).unwrap();
        let mut altered = entry("pdo_1");
        altered.ber_status = "REJECT".to_string();
        altered.content_hash = PdoEntry::compute_hash(
            &altered.pdo_id,
            &altered.pac_id,
            &altered.agent_gids,
            &altered.ber_status,
            &altered.wrap_hashes,
        );
        let err = shard.write(altered).unwrap_err();
        assert!(matches!(err, GovernanceError::ImmutabilityViolation { .. }));
    }

    #[test]
    fn test_read_miss_is_none() {
        let shard = PdoShard::new(0, 10);
        assert!(shard.read("absent").is_none());
    }

    #[test]
    fn test_content_hash_insensitive_to_input_order() {
        let a = PdoEntry::compute_hash(
            "p",
            "c",
            &["GID-02".to_string(), "GID-01".to_string()],
            "APPROVE",
            &["h2".to_string(), "h1".to_string()],
        );
        let b = PdoEntry::compute_hash(
            "p",
            "c",
            &["GID-01".to_string(), "GID-02".to_string()],
            "APPROVE",
            &["h1".to_string(), "h2".to_string()],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_metrics_track_reads_and_writes() {
        let shard = PdoShard::new(0, 10);
        shard.write(entry("pdo_1")).unwrap();
        shard.read("pdo_1");
        shard.read("absent");
        let metrics = shard.metrics();
        assert_eq!(metrics.total_writes, 1);
        assert_eq!(metrics.total_reads, 2);
        assert!(metrics.last_write_at.is_some());
        assert!(metrics.avg_write_latency_ms >= 0.0);
    }
}
