// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — closure.rs
// Governance Kernel: POSITIVE_CLOSURE Artifact
// Governance Tier: LAW
// Invariant: NO_PDO_WITHOUT_CLOSURE | PROVABLE_SUCCESS
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! POSITIVE_CLOSURE is the terminal governance artifact asserting all
//! obligations were met: a session is not complete until it is explicitly
//! emitted, after BER emission and before PDO emission. Success must be
//! provable, not assumed.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::canonical;

/// Closure decision over the consumed WRAP set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClosureDecision {
    Clean,
    Corrective,
    Invalid,
}

impl ClosureDecision {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ClosureDecision::Clean => "CLEAN",
            ClosureDecision::Corrective => "CORRECTIVE",
            ClosureDecision::Invalid => "INVALID",
        }
    }
}

/// Immutable POSITIVE_CLOSURE artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositiveClosure {
    pub closure_id: String,
    pub pac_id: String,
    pub ber_id: String,
    /// Ordered set of WRAP content hashes consumed by the ruling.
    pub wrap_hashes: Vec<String>,
    pub final_state: String,
    pub invariants_verified: bool,
    pub checkpoints_resolved: u32,
    pub decision: ClosureDecision,
    pub closure_hash: String,
}

impl PositiveClosure {
    pub fn wrap_count(&self) -> usize {
        self.wrap_hashes.len()
    }

    /// Recompute the closure hash from the stored fields.
    pub fn compute_hash(&self) -> String {
        closure_hash(
            &self.pac_id,
            &self.ber_id,
            &self.wrap_hashes,
            &self.final_state,
            self.invariants_verified,
            self.checkpoints_resolved,
            self.decision,
        )
    }

    /// Tamper check: stored hash matches recomputation.
    pub fn verify(&self) -> bool {
        self.closure_hash == self.compute_hash()
    }
}

fn closure_hash(
    pac_id: &str,
    ber_id: &str,
    wrap_hashes: &[String],
    final_state: &str,
    invariants_verified: bool,
    checkpoints_resolved: u32,
    decision: ClosureDecision,
) -> String {
    let payload = json!({
        "pac_id": pac_id,
        "ber_id": ber_id,
        "wrap_hashes": wrap_hashes,
        "final_state": final_state,
        "invariants_verified": invariants_verified,
        "checkpoints_resolved": checkpoints_resolved,
        "decision": decision.as_str(),
    });
    canonical::canonical_hash(&payload)
}

/// Builder for POSITIVE_CLOSURE artifacts. The closure id is deterministic
/// over (pac_id, ber_id).
#[derive(Debug)]
pub struct ClosureBuilder {
    pac_id: String,
    ber_id: String,
    wrap_hashes: Vec<String>,
    final_state: String,
    invariants_verified: bool,
    checkpoints_resolved: u32,
    decision: ClosureDecision,
}

impl ClosureBuilder {
    pub fn new(pac_id: impl Into<String>, ber_id: impl Into<String>) -> Self {
        Self {
            pac_id: pac_id.into(),
            ber_id: ber_id.into(),
            wrap_hashes: Vec::new(),
            final_state: "SESSION_COMPLETE".to_string(),
            invariants_verified: false,
            checkpoints_resolved: 0,
            decision: ClosureDecision::Invalid,
        }
    }

    pub fn add_wrap_hash(mut self, hash: impl Into<String>) -> Self {
        self.wrap_hashes.push(hash.into());
        self
    }

    pub fn add_wrap_hashes(mut self, hashes: impl IntoIterator<Item = String>) -> Self {
        self.wrap_hashes.extend(hashes);
        self
    }

    pub fn final_state(mut self, state: impl Into<String>) -> Self {
        self.final_state = state.into();
        self
    }

    pub fn invariants_verified(mut self, verified: bool) -> Self {
        self.invariants_verified = verified;
        self
    }

    pub fn checkpoints_resolved(mut self, count: u32) -> Self {
        self.checkpoints_resolved = count;
        self
    }

    pub fn decision(mut self, decision: ClosureDecision) -> Self {
        self.decision = decision;
        self
    }

    pub fn build(self) -> PositiveClosure {
        let hash = closure_hash(
            &self.pac_id,
            &self.ber_id,
            &self.wrap_hashes,
            &self.final_state,
            self.invariants_verified,
            self.checkpoints_resolved,
            self.decision,
        );
        let closure_id = format!(
            "PC-{}",
            &canonical::sha256_hex(&[self.pac_id.as_bytes(), b":", self.ber_id.as_bytes()])[..12]
        );
        PositiveClosure {
            closure_id,
            pac_id: self.pac_id,
            ber_id: self.ber_id,
            wrap_hashes: self.wrap_hashes,
            final_state: self.final_state,
            invariants_verified: self.invariants_verified,
            checkpoints_resolved: self.checkpoints_resolved,
            decision: self.decision,
            closure_hash: hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_closure() -> PositiveClosure {
        ClosureBuilder::new("PAC-ALPHA-EXEC-CORE-TEST-001", "BER-PAC-ALPHA-EXEC-CORE-TEST-001")
            .add_wrap_hash("a".repeat(64))
            .final_state("SESSION_COMPLETE")
            .invariants_verified(true)
            .checkpoints_resolved(8)
            .decision(ClosureDecision::Clean)
            .build()
    }

    #[test]
    fn test_closure_hash_verifies() {
        let closure = build_closure();
        assert!(closure.verify());
        assert!(canonical::is_sha256_hex(&closure.closure_hash));
    }

    #[test]
    fn test_tampered_closure_fails_verification() {
        let mut closure = build_closure();
        closure.decision = ClosureDecision::Corrective;
        assert!(!closure.verify());
    }

    #[test]
    fn test_closure_id_is_deterministic() {
        let a = build_closure();
        let b = build_closure();
        assert_eq!(a.closure_id, b.closure_id);
        assert!(a.closure_id.starts_with("PC-"));
    }

    #[test]
    fn test_wrap_hashes_preserve_order() {
        let closure = ClosureBuilder::new("PAC-A-B-C-D-001", "BER-1")
            .add_wrap_hashes(["h1".to_string(), "h2".to_string()])
            .add_wrap_hash("h3")
            .decision(ClosureDecision::Clean)
            .build();
        assert_eq!(closure.wrap_hashes, vec!["h1", "h2", "h3"]);
        assert_eq!(closure.wrap_count(), 3);
    }
}
