// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — pdo.rs
// Governance Kernel: Proof-of-Decision Object Factory
// Governance Tier: LAW
// Invariant: HASH_CHAIN | SOLE_PDO_ISSUER | TAMPER_EVIDENT
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! The PDO is the immutable artifact closing the governance loop. Its four
//! hashes form a chain over the WRAP payload, the BER payload, and the
//! outcome:
//!
//! ```text
//! proof_hash    = H(canonical(wrap_payload))
//! decision_hash = H(proof_hash ‖ canonical(ber_payload))
//! outcome_hash  = H(decision_hash ‖ outcome_status)
//! pdo_hash      = H(pdo_id ‖ pac_id ‖ wrap_id ‖ ber_id ‖
//!                   proof_hash ‖ decision_hash ‖ outcome_hash ‖ issuer)
//! ```
//!
//! `H` is SHA-256 over the canonical serialization, hex lowercase. One PDO
//! exists per PAC; the factory constructs, registration is a separate step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical;
use crate::error::{GovernanceError, GovernanceResult};
use crate::identity::Identity;

/// PDO outcome status — the externally visible ruling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdoOutcomeStatus {
    Accepted,
    Corrective,
    Rejected,
}

impl PdoOutcomeStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PdoOutcomeStatus::Accepted => "ACCEPTED",
            PdoOutcomeStatus::Corrective => "CORRECTIVE",
            PdoOutcomeStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> GovernanceResult<PdoOutcomeStatus> {
        match s.to_uppercase().as_str() {
            "ACCEPTED" => Ok(PdoOutcomeStatus::Accepted),
            "CORRECTIVE" => Ok(PdoOutcomeStatus::Corrective),
            "REJECTED" => Ok(PdoOutcomeStatus::Rejected),
            _ => Err(GovernanceError::InvalidOutcome {
                status: s.to_string(),
            }),
        }
    }
}

/// Immutable Proof-of-Decision Object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdoArtifact {
    pub pdo_id: String,
    pub pac_id: String,
    pub wrap_id: String,
    pub ber_id: String,
    pub outcome_status: PdoOutcomeStatus,
    pub issuer: String,
    pub proof_hash: String,
    pub decision_hash: String,
    pub outcome_hash: String,
    pub pdo_hash: String,
    pub proof_at: DateTime<Utc>,
    pub decision_at: DateTime<Utc>,
    pub outcome_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Factory for PDO artifacts. Never mutates global state; registration in
/// the store is a separate step.
pub struct PdoFactory;

impl PdoFactory {
    /// Construct a PDO. Rejections, in order:
    /// 1. unknown outcome status → `InvalidOutcome`
    /// 2. issuer is not the SYSTEM_ORCHESTRATOR → `PdoAuthority`
    /// 3. any empty chain input → `PdoIncomplete`
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        pac_id: &str,
        wrap_id: &str,
        wrap_payload: &Value,
        ber_id: &str,
        ber_payload: &Value,
        outcome_status: &str,
        issuer: &Identity,
        proof_at: Option<DateTime<Utc>>,
        decision_at: Option<DateTime<Utc>>,
    ) -> GovernanceResult<PdoArtifact> {
        let status = PdoOutcomeStatus::parse(outcome_status)?;

        if !issuer.class.can_issue_ber() {
            return Err(GovernanceError::PdoAuthority {
                issuer: issuer.identity_id.clone(),
            });
        }

        if pac_id.is_empty() {
            return Err(GovernanceError::PdoIncomplete { field: "pac_id" });
        }
        if wrap_id.is_empty() {
            return Err(GovernanceError::PdoIncomplete { field: "wrap_id" });
        }
        if wrap_payload.is_null() {
            return Err(GovernanceError::PdoIncomplete { field: "wrap_payload" });
        }
        if ber_id.is_empty() {
            return Err(GovernanceError::PdoIncomplete { field: "ber_id" });
        }
        if ber_payload.is_null() {
            return Err(GovernanceError::PdoIncomplete { field: "ber_payload" });
        }

        let pdo_id = deterministic_pdo_id(pac_id, wrap_id, ber_id);
        let (proof_hash, decision_hash, outcome_hash) =
            chain_hashes(wrap_payload, ber_payload, status);
        let pdo_hash = top_hash(
            &pdo_id,
            pac_id,
            wrap_id,
            ber_id,
            &proof_hash,
            &decision_hash,
            &outcome_hash,
            &issuer.identity_id,
        );

        let now = Utc::now();
        Ok(PdoArtifact {
            pdo_id,
            pac_id: pac_id.to_string(),
            wrap_id: wrap_id.to_string(),
            ber_id: ber_id.to_string(),
            outcome_status: status,
            issuer: issuer.identity_id.clone(),
            proof_hash,
            decision_hash,
            outcome_hash,
            pdo_hash,
            proof_at: proof_at.unwrap_or(now),
            decision_at: decision_at.unwrap_or(now),
            outcome_at: now,
            created_at: now,
        })
    }

    /// Recompute all four hashes from the inputs and compare against the
    /// stored values. Any mismatch — a single flipped bit in either payload
    /// — returns false.
    pub fn verify(pdo: &PdoArtifact, wrap_payload: &Value, ber_payload: &Value) -> bool {
        let (proof_hash, decision_hash, outcome_hash) =
            chain_hashes(wrap_payload, ber_payload, pdo.outcome_status);
        let pdo_hash = top_hash(
            &pdo.pdo_id,
            &pdo.pac_id,
            &pdo.wrap_id,
            &pdo.ber_id,
            &proof_hash,
            &decision_hash,
            &outcome_hash,
            &pdo.issuer,
        );
        proof_hash == pdo.proof_hash
            && decision_hash == pdo.decision_hash
            && outcome_hash == pdo.outcome_hash
            && pdo_hash == pdo.pdo_hash
    }

    /// Structural chain check from stored components only: digest lengths,
    /// plus the two chain steps that are recomputable without the payloads.
    pub fn verify_chain(pdo: &PdoArtifact) -> bool {
        let lengths_ok = canonical::is_sha256_hex(&pdo.proof_hash)
            && canonical::is_sha256_hex(&pdo.decision_hash)
            && canonical::is_sha256_hex(&pdo.outcome_hash)
            && canonical::is_sha256_hex(&pdo.pdo_hash);
        if !lengths_ok {
            return false;
        }
        let outcome_ok = pdo.outcome_hash
            == canonical::sha256_hex(&[
                pdo.decision_hash.as_bytes(),
                pdo.outcome_status.as_str().as_bytes(),
            ]);
        let top_ok = pdo.pdo_hash
            == top_hash(
                &pdo.pdo_id,
                &pdo.pac_id,
                &pdo.wrap_id,
                &pdo.ber_id,
                &pdo.proof_hash,
                &pdo.decision_hash,
                &pdo.outcome_hash,
                &pdo.issuer,
            );
        outcome_ok && top_ok
    }
}

/// PDO ids are opaque but deterministic over their chain identifiers.
fn deterministic_pdo_id(pac_id: &str, wrap_id: &str, ber_id: &str) -> String {
    let digest = canonical::sha256_hex(&[
        pac_id.as_bytes(),
        b":",
        wrap_id.as_bytes(),
        b":",
        ber_id.as_bytes(),
    ]);
    format!("PDO-{}", &digest[..16])
}

fn chain_hashes(
    wrap_payload: &Value,
    ber_payload: &Value,
    status: PdoOutcomeStatus,
) -> (String, String, String) {
    let proof_hash = canonical::canonical_hash(wrap_payload);
    let decision_hash = canonical::sha256_hex(&[
        proof_hash.as_bytes(),
        canonical::canonicalize(ber_payload).as_bytes(),
    ]);
    let outcome_hash =
        canonical::sha256_hex(&[decision_hash.as_bytes(), status.as_str().as_bytes()]);
    (proof_hash, decision_hash, outcome_hash)
}

#[allow(clippy::too_many_arguments)]
fn top_hash(
    pdo_id: &str,
    pac_id: &str,
    wrap_id: &str,
    ber_id: &str,
    proof_hash: &str,
    decision_hash: &str,
    outcome_hash: &str,
    issuer: &str,
) -> String {
    canonical::sha256_hex(&[
        pdo_id.as_bytes(),
        pac_id.as_bytes(),
        wrap_id.as_bytes(),
        ber_id.as_bytes(),
        proof_hash.as_bytes(),
        decision_hash.as_bytes(),
        outcome_hash.as_bytes(),
        issuer.as_bytes(),
    ])
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityRegistry;
    use serde_json::json;

    fn payloads() -> (Value, Value) {
        (
            json!({"status": "COMPLETE", "artifacts": ["a.py"]}),
            json!({"decision": "APPROVE", "issuer": "GID-00"}),
        )
    }

    fn create_pdo(registry: &IdentityRegistry) -> PdoArtifact {
        let (wrap_payload, ber_payload) = payloads();
        PdoFactory::create(
            "PAC-ALPHA-EXEC-CORE-TEST-001",
            "WRAP-1",
            &wrap_payload,
            "BER-1",
            &ber_payload,
            "ACCEPTED",
            registry.orchestrator(),
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_chain_construction_and_verification() {
        let registry = IdentityRegistry::canonical();
        let pdo = create_pdo(&registry);
        let (wrap_payload, ber_payload) = payloads();
        assert!(PdoFactory::verify(&pdo, &wrap_payload, &ber_payload));
        assert!(PdoFactory::verify_chain(&pdo));
        assert!(pdo.pdo_id.starts_with("PDO-"));
    }

    #[test]
    fn test_single_bit_mutation_breaks_verification() {
        let registry = IdentityRegistry::canonical();
        let pdo = create_pdo(&registry);
        let (_, ber_payload) = payloads();
        // One changed byte in the WRAP payload
        let tampered_wrap = json!({"status": "COMPLETE", "artifacts": ["a.pz"]});
        assert!(!PdoFactory::verify(&pdo, &tampered_wrap, &ber_payload));

        let (wrap_payload, _) = payloads();
        let tampered_ber = json!({"decision": "REJECT", "issuer": "GID-00"});
        assert!(!PdoFactory::verify(&pdo, &wrap_payload, &tampered_ber));
    }

    #[test]
    fn test_rejection_order_outcome_first() {
        let registry = IdentityRegistry::canonical();
        let agent = registry.resolve("GID-01").unwrap();
        let (wrap_payload, ber_payload) = payloads();
        // Invalid outcome wins even when the issuer is also wrong
        let err = PdoFactory::create(
            "PAC-A-B-C-D-001",
            "WRAP-1",
            &wrap_payload,
            "BER-1",
            &ber_payload,
            "MAYBE",
            agent,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidOutcome { .. }));
    }

    #[test]
    fn test_non_orchestrator_cannot_issue() {
        let registry = IdentityRegistry::canonical();
        let agent = registry.resolve("GID-01").unwrap();
        let (wrap_payload, ber_payload) = payloads();
        let err = PdoFactory::create(
            "PAC-A-B-C-D-001",
            "WRAP-1",
            &wrap_payload,
            "BER-1",
            &ber_payload,
            "ACCEPTED",
            agent,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, GovernanceError::PdoAuthority { .. }));
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let registry = IdentityRegistry::canonical();
        let (wrap_payload, ber_payload) = payloads();
        let err = PdoFactory::create(
            "",
            "WRAP-1",
            &wrap_payload,
            "BER-1",
            &ber_payload,
            "ACCEPTED",
            registry.orchestrator(),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::PdoIncomplete { field: "pac_id" }
        ));

        let err = PdoFactory::create(
            "PAC-A-B-C-D-001",
            "WRAP-1",
            &Value::Null,
            "BER-1",
            &ber_payload,
            "ACCEPTED",
            registry.orchestrator(),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::PdoIncomplete {
                field: "wrap_payload"
            }
        ));
    }

    #[test]
    fn test_pdo_id_deterministic_over_payload_ids() {
        let registry = IdentityRegistry::canonical();
        let a = create_pdo(&registry);
        let b = create_pdo(&registry);
        assert_eq!(a.pdo_id, b.pdo_id);
        assert_eq!(a.pdo_hash, b.pdo_hash);
    }

    #[test]
    fn test_verify_chain_detects_corrupt_digests() {
        let registry = IdentityRegistry::canonical();
        let mut pdo = create_pdo(&registry);
        pdo.outcome_hash = "short".to_string();
        assert!(!PdoFactory::verify_chain(&pdo));

        let mut pdo = create_pdo(&registry);
        pdo.outcome_status = PdoOutcomeStatus::Rejected;
        // Status no longer matches the recorded outcome hash
        assert!(!PdoFactory::verify_chain(&pdo));
    }
}
