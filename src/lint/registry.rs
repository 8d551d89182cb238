// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — lint/registry.rs
// Governance Kernel: Invariant Registry
// Governance Tier: LAW
// Invariant: CLOSED_REGISTRY | NO_WARNINGS_IN_PRODUCTION
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! Closed, statically defined invariant registry.
//!
//! Classes:
//! - S-INV: Structural — schema validation, required fields
//! - M-INV: Semantic — values lie in closed sets
//! - X-INV: Cross-Artifact — referenced ids exist
//! - T-INV: Temporal — ordering of ACK/WRAP/BER
//! - A-INV: Authority — identity and lane authorization
//! - F-INV: Finality — BER/settlement eligibility
//! - C-INV: Training — signal emission compliance
//! - PLAT-INV: Platform — runtime ACK and admission gates
//!
//! Every enabled invariant is CRITICAL or HIGH; both are HARD_FAIL.
//! MEDIUM/LOW/WARNING severities are forbidden in production.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Invariant classes. Each class dispatches to its own evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvariantClass {
    Structural,
    Semantic,
    CrossArtifact,
    Temporal,
    Authority,
    Finality,
    Training,
    Platform,
}

impl InvariantClass {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvariantClass::Structural => "S-INV",
            InvariantClass::Semantic => "M-INV",
            InvariantClass::CrossArtifact => "X-INV",
            InvariantClass::Temporal => "T-INV",
            InvariantClass::Authority => "A-INV",
            InvariantClass::Finality => "F-INV",
            InvariantClass::Training => "C-INV",
            InvariantClass::Platform => "PLAT-INV",
        }
    }
}

/// Violation severity. Both levels are HARD_FAIL in production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvariantSeverity {
    Critical,
    High,
}

/// Runtime enforcement points — the closed checkpoint set. Each evaluation
/// runs the invariant subset applicable to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnforcementPoint {
    PacAdmission,
    WrapIngestion,
    Rg01Evaluation,
    BerEligibility,
    SettlementReadiness,
    RuntimeActivation,
    AgentAckCollection,
    AgentExecution,
    ApiAdmission,
    UiRenderValidation,
    ReviewGates,
    LedgerCommit,
    FinalitySeal,
}

impl EnforcementPoint {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EnforcementPoint::PacAdmission => "PAC_ADMISSION",
            EnforcementPoint::WrapIngestion => "WRAP_INGESTION",
            EnforcementPoint::Rg01Evaluation => "RG01_EVALUATION",
            EnforcementPoint::BerEligibility => "BER_ELIGIBILITY",
            EnforcementPoint::SettlementReadiness => "SETTLEMENT_READINESS",
            EnforcementPoint::RuntimeActivation => "RUNTIME_ACTIVATION",
            EnforcementPoint::AgentAckCollection => "AGENT_ACK_COLLECTION",
            EnforcementPoint::AgentExecution => "AGENT_EXECUTION",
            EnforcementPoint::ApiAdmission => "API_ADMISSION",
            EnforcementPoint::UiRenderValidation => "UI_RENDER_VALIDATION",
            EnforcementPoint::ReviewGates => "REVIEW_GATES",
            EnforcementPoint::LedgerCommit => "LEDGER_COMMIT",
            EnforcementPoint::FinalitySeal => "FINALITY_SEAL",
        }
    }
}

/// Definition of a single invariant.
#[derive(Debug, Clone)]
pub struct InvariantDefinition {
    pub invariant_id: &'static str,
    pub class: InvariantClass,
    pub name: &'static str,
    pub description: &'static str,
    /// Authoritative applicability. Where this list and the checkpoint-class
    /// map disagree, this list wins.
    pub enforcement_points: &'static [EnforcementPoint],
    pub severity: InvariantSeverity,
}

use EnforcementPoint as EP;
use InvariantClass as IC;
use InvariantSeverity as SV;

macro_rules! invariant {
    ($id:literal, $class:expr, $name:literal, $desc:literal, $points:expr) => {
        InvariantDefinition {
            invariant_id: $id,
            class: $class,
            name: $name,
            description: $desc,
            enforcement_points: $points,
            severity: SV::Critical,
        }
    };
}

/// The closed invariant set.
pub const INVARIANTS: &[InvariantDefinition] = &[
    // ── Structural ──────────────────────────────────────────────────────────
    invariant!("S-INV-001", IC::Structural, "PAC Schema Compliance",
        "PAC must carry pac_id, issuer, and target", &[EP::PacAdmission]),
    invariant!("S-INV-002", IC::Structural, "WRAP Schema Compliance",
        "WRAP must be present at ingestion", &[EP::WrapIngestion]),
    invariant!("S-INV-003", IC::Structural, "BER Schema Compliance",
        "BER must be present at eligibility", &[EP::BerEligibility]),
    invariant!("S-INV-004", IC::Structural, "Required PAC Fields",
        "PAC must declare an execution mode", &[EP::PacAdmission]),
    invariant!("S-INV-005", IC::Structural, "Required WRAP Blocks",
        "WRAP must carry proof, decision, outcome, and attestation blocks",
        &[EP::WrapIngestion]),
    // ── Semantic ────────────────────────────────────────────────────────────
    invariant!("M-INV-001", IC::Semantic, "Execution Mode Validity",
        "execution_mode must be PARALLEL or SEQUENTIAL", &[EP::PacAdmission]),
    invariant!("M-INV-002", IC::Semantic, "ACK State Validity",
        "ACK state must be PENDING, ACKNOWLEDGED, REJECTED, or TIMEOUT",
        &[EP::PacAdmission, EP::WrapIngestion]),
    invariant!("M-INV-003", IC::Semantic, "BER Finality Validity",
        "ber_finality must be FINAL or PROVISIONAL", &[EP::BerEligibility]),
    // ── Cross-Artifact ──────────────────────────────────────────────────────
    invariant!("X-INV-001", IC::CrossArtifact, "WRAP References Valid PAC",
        "WRAP.pac_id must match a known PAC", &[EP::WrapIngestion]),
    invariant!("X-INV-002", IC::CrossArtifact, "BER References Valid WRAP Set",
        "BER.wrap_hash_set must reference validated WRAPs", &[EP::BerEligibility]),
    invariant!("X-INV-003", IC::CrossArtifact, "ACK References Valid Agent",
        "Every ACK must come from a registered agent", &[EP::PacAdmission]),
    // ── Temporal ────────────────────────────────────────────────────────────
    invariant!("T-INV-001", IC::Temporal, "ACK Before WRAP",
        "Agent ACK must precede WRAP submission", &[EP::WrapIngestion]),
    invariant!("T-INV-002", IC::Temporal, "WRAP Before BER",
        "All WRAPs must be submitted before BER issuance", &[EP::BerEligibility]),
    invariant!("T-INV-003", IC::Temporal, "RG-01 Before BER",
        "RG-01 must PASS before BER issuance", &[EP::BerEligibility]),
    invariant!("T-INV-004", IC::Temporal, "ACK Latency Threshold",
        "ACK latency must not exceed the settlement threshold",
        &[EP::SettlementReadiness]),
    // ── Authority ───────────────────────────────────────────────────────────
    invariant!("A-INV-001", IC::Authority, "Lane Authorization",
        "Agent must operate within its authorized lane",
        &[EP::PacAdmission, EP::WrapIngestion]),
    invariant!("A-INV-002", IC::Authority, "Identity Registration",
        "Agent identity must be registered", &[EP::PacAdmission]),
    invariant!("A-INV-003", IC::Authority, "Non-Executing Constraints",
        "NON_EXECUTING identities cannot perform code changes",
        &[EP::WrapIngestion]),
    invariant!("A-INV-004", IC::Authority, "No Implicit Activation",
        "Agents must explicitly ACK — implicit activation is forbidden",
        &[EP::PacAdmission]),
    invariant!("A-INV-005", IC::Authority, "Agent Name Registry Match",
        "Declared agent name must match the registry for its identity",
        &[EP::PacAdmission, EP::WrapIngestion, EP::AgentExecution]),
    // ── Finality ────────────────────────────────────────────────────────────
    invariant!("F-INV-001", IC::Finality, "BER Requires All ACKs",
        "BER cannot be issued without all required ACKs", &[EP::BerEligibility]),
    invariant!("F-INV-002", IC::Finality, "BER Requires Valid WRAPs",
        "BER requires every WRAP validated", &[EP::BerEligibility]),
    invariant!("F-INV-003", IC::Finality, "Settlement Requires FINAL BER",
        "Settlement requires BER finality FINAL", &[EP::SettlementReadiness]),
    invariant!("F-INV-004", IC::Finality, "Settlement Requires Ledger Commit",
        "Settlement requires a ledger commit attestation",
        &[EP::SettlementReadiness, EP::LedgerCommit]),
    invariant!("F-INV-005", IC::Finality, "Settlement Verdict Required",
        "A settlement readiness verdict is required before BER FINAL",
        &[EP::SettlementReadiness]),
    invariant!("F-INV-006", IC::Finality, "Finality Seal Integrity",
        "Finality seal requires closure emitted before sealing",
        &[EP::FinalitySeal]),
    // ── Training ────────────────────────────────────────────────────────────
    invariant!("C-INV-001", IC::Training, "Training Signal Required",
        "Each WRAP must carry at least one training signal",
        &[EP::WrapIngestion, EP::Rg01Evaluation]),
    invariant!("C-INV-002", IC::Training, "Training Signal Non-Empty",
        "Training signals must not be empty or generic", &[EP::WrapIngestion]),
    invariant!("C-INV-003", IC::Training, "Positive Closure Required",
        "Each WRAP must carry a positive-closure block",
        &[EP::WrapIngestion, EP::Rg01Evaluation]),
    invariant!("C-INV-004", IC::Training, "Positive Closure Valid",
        "The positive-closure block must pass all checks", &[EP::Rg01Evaluation]),
    // ── Platform ────────────────────────────────────────────────────────────
    invariant!("INV-LINT-PLAT-001", IC::Platform, "Runtime ACK Required",
        "Runtime ACK is required before any agent execution",
        &[EP::RuntimeActivation, EP::AgentAckCollection]),
    invariant!("INV-LINT-PLAT-002", IC::Platform, "Agent Execution ACK Gate",
        "Agent execution without a released ACK barrier is illegal",
        &[EP::AgentExecution, EP::AgentAckCollection]),
    invariant!("INV-LINT-PLAT-003", IC::Platform, "UI Lint-Validated State Only",
        "UI renders only lint-validated state", &[EP::UiRenderValidation]),
    invariant!("INV-LINT-PLAT-004", IC::Platform, "API Admission Lint Gate",
        "API admission requires a lint PASS", &[EP::ApiAdmission]),
    invariant!("INV-LINT-PLAT-005", IC::Platform, "Orchestration Order Determinism",
        "Review gates run in deterministic orchestration order",
        &[EP::ReviewGates, EP::AgentExecution]),
];

lazy_static! {
    static ref BY_ID: BTreeMap<&'static str, &'static InvariantDefinition> =
        INVARIANTS.iter().map(|inv| (inv.invariant_id, inv)).collect();
}

/// Lookup by id. The registry is closed: unknown ids return None.
pub fn get_invariant(invariant_id: &str) -> Option<&'static InvariantDefinition> {
    BY_ID.get(invariant_id).copied()
}

/// Invariants applicable at a given enforcement point, in registry order.
pub fn invariants_for_point(point: EnforcementPoint) -> Vec<&'static InvariantDefinition> {
    INVARIANTS
        .iter()
        .filter(|inv| inv.enforcement_points.contains(&point))
        .collect()
}

/// Checkpoint → invariant-class coverage map. Used only for coverage
/// reporting; applicability on the definitions is authoritative.
pub const CHECKPOINT_CLASS_MAP: &[(EnforcementPoint, &[InvariantClass])] = &[
    (EP::PacAdmission, &[IC::Structural, IC::Semantic, IC::Authority]),
    (EP::WrapIngestion, &[IC::Structural, IC::CrossArtifact, IC::Training]),
    (EP::Rg01Evaluation, &[IC::Training]),
    (EP::BerEligibility, &[IC::Finality, IC::Temporal]),
    (EP::SettlementReadiness, &[IC::Finality]),
    (EP::RuntimeActivation, &[IC::Platform]),
    (EP::AgentAckCollection, &[IC::Platform]),
    (EP::AgentExecution, &[IC::Authority, IC::Platform]),
    (EP::ApiAdmission, &[IC::Platform]),
    (EP::UiRenderValidation, &[IC::Platform]),
    (EP::ReviewGates, &[IC::Platform]),
    (EP::LedgerCommit, &[IC::Finality]),
    (EP::FinalitySeal, &[IC::Finality]),
];

/// Validate that every class required at a checkpoint was evaluated.
pub fn validate_checkpoint_coverage(
    point: EnforcementPoint,
    evaluated_classes: &[InvariantClass],
) -> Result<(), String> {
    let required = CHECKPOINT_CLASS_MAP
        .iter()
        .find(|(p, _)| *p == point)
        .map(|(_, classes)| *classes)
        .unwrap_or(&[]);
    let missing: Vec<&str> = required
        .iter()
        .filter(|c| !evaluated_classes.contains(c))
        .map(|c| c.as_str())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "Missing invariant classes at {}: {}",
            point.as_str(),
            missing.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_closed_and_unique() {
        let mut ids: Vec<&str> = INVARIANTS.iter().map(|i| i.invariant_id).collect();
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count, "duplicate invariant ids");
        assert!(get_invariant("S-INV-001").is_some());
        assert!(get_invariant("S-INV-999").is_none());
    }

    #[test]
    fn test_every_invariant_has_points_and_hard_fail_severity() {
        for inv in INVARIANTS {
            assert!(
                !inv.enforcement_points.is_empty(),
                "{} has no enforcement points",
                inv.invariant_id
            );
            assert!(matches!(
                inv.severity,
                InvariantSeverity::Critical | InvariantSeverity::High
            ));
        }
    }

    #[test]
    fn test_point_selection() {
        let admission = invariants_for_point(EnforcementPoint::PacAdmission);
        assert!(admission.iter().any(|i| i.invariant_id == "S-INV-001"));
        assert!(admission.iter().any(|i| i.invariant_id == "A-INV-002"));
        assert!(!admission.iter().any(|i| i.invariant_id == "F-INV-001"));

        let execution = invariants_for_point(EnforcementPoint::AgentExecution);
        assert!(execution.iter().any(|i| i.invariant_id == "INV-LINT-PLAT-002"));
    }

    #[test]
    fn test_checkpoint_coverage_validation() {
        assert!(validate_checkpoint_coverage(
            EnforcementPoint::SettlementReadiness,
            &[InvariantClass::Finality],
        )
        .is_ok());

        let err = validate_checkpoint_coverage(
            EnforcementPoint::PacAdmission,
            &[InvariantClass::Structural],
        )
        .unwrap_err();
        assert!(err.contains("A-INV"));
        assert!(err.contains("M-INV"));
    }
}
