// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — store/index.rs
// Governance Kernel: PDO Multi-Index Layer
// Governance Tier: LAW
// Invariant: PRIMARY_COVERS_SHARDS | NO_ORPHANS
// ═══════════════════════════════════════════════════════════════════════════════

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;

use crate::store::shard::PdoEntry;

/// Multi-index layer over the shards: one primary index (pdo_id → shard id)
/// and four secondary indexes. Guarded by its own lock, acquired strictly
/// AFTER the owning shard's lock during `store`.
pub struct PdoIndex {
    inner: RwLock<IndexInner>,
}

#[derive(Default)]
struct IndexInner {
    primary: HashMap<String, usize>,
    by_hash: HashMap<String, BTreeSet<String>>,
    by_pac: HashMap<String, BTreeSet<String>>,
    by_agent: HashMap<String, BTreeSet<String>>,
    by_date: HashMap<String, BTreeSet<String>>,
}

/// Sizes of each index, for metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSizes {
    pub primary: usize,
    pub by_hash: usize,
    pub by_pac: usize,
    pub by_agent: usize,
    pub by_date: usize,
}

impl Default for PdoIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl PdoIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(IndexInner::default()),
        }
    }

    /// Add a committed entry to all five indexes.
    pub fn index(&self, entry: &PdoEntry) {
        let mut inner = self.inner.write();
        inner.primary.insert(entry.pdo_id.clone(), entry.shard_id);
        inner
            .by_hash
            .entry(entry.content_hash.clone())
            .or_default()
            .insert(entry.pdo_id.clone());
        inner
            .by_pac
            .entry(entry.pac_id.clone())
            .or_default()
            .insert(entry.pdo_id.clone());
        for gid in &entry.agent_gids {
            inner
                .by_agent
                .entry(gid.clone())
                .or_default()
                .insert(entry.pdo_id.clone());
        }
        inner
            .by_date
            .entry(entry.date_key())
            .or_default()
            .insert(entry.pdo_id.clone());
    }

    /// Shard id for a PDO, from the primary index.
    pub fn shard_of(&self, pdo_id: &str) -> Option<usize> {
        self.inner.read().primary.get(pdo_id).copied()
    }

    pub fn find_by_hash(&self, content_hash: &str) -> BTreeSet<String> {
        self.inner
            .read()
            .by_hash
            .get(content_hash)
            .cloned()
            .unwrap_or_default()
    }

    pub fn find_by_pac(&self, pac_id: &str) -> BTreeSet<String> {
        self.inner
            .read()
            .by_pac
            .get(pac_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn find_by_agent(&self, agent_gid: &str) -> BTreeSet<String> {
        self.inner
            .read()
            .by_agent
            .get(agent_gid)
            .cloned()
            .unwrap_or_default()
    }

    pub fn find_by_date(&self, date: &str) -> BTreeSet<String> {
        self.inner
            .read()
            .by_date
            .get(date)
            .cloned()
            .unwrap_or_default()
    }

    pub fn primary_len(&self) -> usize {
        self.inner.read().primary.len()
    }

    pub fn sizes(&self) -> IndexSizes {
        let inner = self.inner.read();
        IndexSizes {
            primary: inner.primary.len(),
            by_hash: inner.by_hash.values().map(BTreeSet::len).sum(),
            by_pac: inner.by_pac.values().map(BTreeSet::len).sum(),
            by_agent: inner.by_agent.values().map(BTreeSet::len).sum(),
            by_date: inner.by_date.values().map(BTreeSet::len).sum(),
        }
    }

    /// Validate index consistency against the full entry set collected from
    /// the shards. Returns (ok, errors).
    pub fn validate_integrity(&self, entries: &HashMap<String, PdoEntry>) -> (bool, Vec<String>) {
        let inner = self.inner.read();
        let mut errors = Vec::new();

        for (pdo_id, shard_id) in &inner.primary {
            match entries.get(pdo_id) {
                None => errors.push(format!("Orphan index entry: {pdo_id}")),
                Some(entry) if entry.shard_id != *shard_id => errors.push(format!(
                    "Shard mismatch for {pdo_id}: index says {shard_id}, entry says {}",
                    entry.shard_id
                )),
                Some(_) => {}
            }
        }
        for (pdo_id, entry) in entries {
            if !inner.primary.contains_key(pdo_id) {
                errors.push(format!("Missing primary index for: {pdo_id}"));
            }
            if !inner
                .by_pac
                .get(&entry.pac_id)
                .is_some_and(|set| set.contains(pdo_id))
            {
                errors.push(format!("Missing pac index for: {pdo_id}"));
            }
            if !inner
                .by_hash
                .get(&entry.content_hash)
                .is_some_and(|set| set.contains(pdo_id))
            {
                errors.push(format!("Missing hash index for: {pdo_id}"));
            }
        }

        (errors.is_empty(), errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pdo_id: &str, pac_id: &str, shard_id: usize) -> PdoEntry {
        let mut entry = PdoEntry::new(
            pdo_id,
            pac_id,
            vec!["GID-01".to_string(), "GID-02".to_string()],
            "APPROVE",
            vec!["h1".to_string()],
        );
        entry.shard_id = shard_id;
        entry
    }

    #[test]
    fn test_all_indexes_populated() {
        let index = PdoIndex::new();
        let e = entry("pdo_1", "PAC-A-B-C-D-001", 3);
        index.index(&e);

        assert_eq!(index.shard_of("pdo_1"), Some(3));
        assert!(index.find_by_pac("PAC-A-B-C-D-001").contains("pdo_1"));
        assert!(index.find_by_hash(&e.content_hash).contains("pdo_1"));
        assert!(index.find_by_agent("GID-01").contains("pdo_1"));
        assert!(index.find_by_agent("GID-02").contains("pdo_1"));
        assert!(index.find_by_date(&e.date_key()).contains("pdo_1"));
    }

    #[test]
    fn test_misses_return_empty_never_raise() {
        let index = PdoIndex::new();
        assert!(index.find_by_pac("PAC-NONE").is_empty());
        assert!(index.find_by_agent("GID-99").is_empty());
        assert!(index.find_by_date("1970-01-01").is_empty());
        assert_eq!(index.shard_of("absent"), None);
    }

    #[test]
    fn test_integrity_detects_orphan_and_missing() {
        let index = PdoIndex::new();
        let indexed = entry("pdo_1", "PAC-A-B-C-D-001", 0);
        index.index(&indexed);

        // Orphan: indexed but not in the entry set
        let (ok, errors) = index.validate_integrity(&HashMap::new());
        assert!(!ok);
        assert!(errors.iter().any(|e| e.contains("Orphan")));

        // Missing: in the entry set but not indexed
        let mut entries = HashMap::new();
        entries.insert("pdo_1".to_string(), indexed);
        entries.insert("pdo_2".to_string(), entry("pdo_2", "PAC-A-B-C-D-002", 1));
        let (ok, errors) = index.validate_integrity(&entries);
        assert!(!ok);
        assert!(errors.iter().any(|e| e.contains("Missing primary")));
    }

    #[test]
    fn test_sizes_count_fanout() {
        let index = PdoIndex::new();
        index.index(&entry("pdo_1", "PAC-A-B-C-D-001", 0));
        index.index(&entry("pdo_2", "PAC-A-B-C-D-001", 1));
        let sizes = index.sizes();
        assert_eq!(sizes.primary, 2);
        assert_eq!(sizes.by_pac, 2);
        // Two entries, two agents each
        assert_eq!(sizes.by_agent, 4);
    }
}
