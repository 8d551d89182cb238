// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — error.rs
// Governance Kernel: Boundary Error Taxonomy
// Governance Tier: LAW
// Invariant: FAIL_CLOSED | NO_SILENT_FAILURE
// ═══════════════════════════════════════════════════════════════════════════════

use thiserror::Error;

use crate::pac::PacSection;

/// Error family classification. Every boundary error belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFamily {
    /// Unknown identity, wrong class for operation, self-approval, persona claim
    IdentityAuthority,
    /// PAC missing section, WRAP missing block, invalid id format
    Schema,
    /// Invalid transition, premature completion, BER required/not issued/not emitted
    State,
    /// Overflow, duplicate, immutability violation, index corruption
    Storage,
    /// Lint runtime not activated, evaluation failure
    Lint,
}

/// Governance error types crossing the kernel boundary.
///
/// Every failure surfaces as one of these kinds. Nothing is logged-and-continued;
/// nothing is collapsed into a generic catch-all that downstream gates cannot
/// enumerate by name.
#[derive(Error, Debug)]
pub enum GovernanceError {
    // ── Identity / Authority ────────────────────────────────────────────────────
    #[error("Unknown identity '{identity_id}'. Identity must exist in the registry. Execution halted.")]
    UnknownIdentity { identity_id: String },

    #[error("Invalid GID format '{gid}'. Expected GID-NN where NN is 00-99.")]
    InvalidGidFormat { gid: String },

    #[error("Mode '{mode}' not permitted for {identity_id}. Permitted modes: {permitted:?}.")]
    ModeNotPermitted {
        identity_id: String,
        mode: String,
        permitted: Vec<String>,
    },

    #[error("Lane '{lane}' not permitted for {identity_id}. Permitted lanes: {permitted:?}.")]
    LaneNotPermitted {
        identity_id: String,
        lane: String,
        permitted: Vec<String>,
    },

    #[error("'{identity_id}' ({class}) cannot issue BER. Only SYSTEM_ORCHESTRATOR may issue BER.")]
    BerAuthority { identity_id: String, class: String },

    #[error("'{identity_id}' ({class}) cannot issue WRAP. Only AGENT may issue WRAP.")]
    WrapAuthority { identity_id: String, class: String },

    #[error("Self-approval forbidden. '{identity_id}' cannot approve its own work.")]
    SelfApproval { identity_id: String },

    #[error("Persona authority rejected. Claimed persona '{persona}' has zero authority weight. Authority is structural, never nominal.")]
    PersonaAuthority { persona: String },

    #[error("'{issuer}' cannot construct PDO. Only SYSTEM_ORCHESTRATOR may issue PDO.")]
    PdoAuthority { issuer: String },

    // ── Tool strip ──────────────────────────────────────────────────────────────
    #[error("Tool '{tool}' denied for MODE={mode} LANE={lane}.")]
    ToolDenied {
        tool: String,
        mode: String,
        lane: String,
    },

    #[error("Path '{path}' denied for LANE={lane}.")]
    PathDenied { path: String, lane: String },

    // ── Schema ──────────────────────────────────────────────────────────────────
    #[error("PAC schema violation: {message} ({} missing sections)", .missing_sections.len())]
    PacSchemaViolation {
        pac_id: Option<String>,
        message: String,
        missing_sections: Vec<PacSection>,
    },

    #[error("WRAP_OBLIGATION is required — executing agent must return WRAP.")]
    MissingWrapObligation { pac_id: Option<String> },

    #[error("BER_OBLIGATION is required — the orchestration engine must issue BER.")]
    MissingBerObligation { pac_id: Option<String> },

    #[error("FINAL_STATE is required — expected terminal state must be declared.")]
    MissingFinalState { pac_id: Option<String> },

    #[error("Invalid PAC_ID format '{pac_id}'. Expected PAC-{{ISSUER}}-{{MODE}}-{{LANE}}-{{NAME}}-{{SEQ}}.")]
    InvalidPacId { pac_id: String },

    #[error("WRAP validation failed in block '{block}': {reason}. WRAP rejected before BER consideration.")]
    WrapValidation { block: String, reason: String },

    // ── State ───────────────────────────────────────────────────────────────────
    #[error("Unknown session for PAC {pac_id}.")]
    UnknownSession { pac_id: String },

    #[error("BER_REQUIRED: PAC {pac_id} cannot complete session. BER must be issued before the session can close.")]
    BerRequired { pac_id: String },

    #[error("BER_NOT_ISSUED: PAC {pac_id} — {reason}. WRAP cannot exist without BER.")]
    BerNotIssued { pac_id: String, reason: String },

    #[error("BER_NOT_EMITTED: PAC {pac_id} — BER was issued but not emitted. Loop closure requires external emission.")]
    BerNotEmitted { pac_id: String },

    #[error("SESSION_INVALID: PAC {pac_id} — {reason}")]
    SessionInvalid { pac_id: String, reason: String },

    // ── PDO construction ────────────────────────────────────────────────────────
    #[error("Invalid PDO outcome status '{status}'. Expected ACCEPTED, CORRECTIVE, or REJECTED.")]
    InvalidOutcome { status: String },

    #[error("PDO incomplete: field '{field}' is empty. All chain inputs are mandatory.")]
    PdoIncomplete { field: &'static str },

    // ── Storage ─────────────────────────────────────────────────────────────────
    #[error("Shard {shard_id} at capacity ({capacity}).")]
    ShardOverflow { shard_id: usize, capacity: usize },

    #[error("PDO already exists: {pdo_id}.")]
    DuplicateEntry { pdo_id: String },

    #[error("Cannot modify existing PDO {pdo_id}: content hash mismatch.")]
    ImmutabilityViolation { pdo_id: String },

    #[error("Index corruption detected: {0} inconsistencies.")]
    IndexCorruption(usize),

    // ── Lint runtime ────────────────────────────────────────────────────────────
    #[error("Lint runtime not activated. Missing preconditions: {missing:?}.")]
    RuntimeNotActivated { missing: Vec<String> },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for governance operations.
pub type GovernanceResult<T> = Result<T, GovernanceError>;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES AND FAMILIES
// ═══════════════════════════════════════════════════════════════════════════════

impl GovernanceError {
    /// Returns a stable numeric code for the error kind.
    pub const fn error_code(&self) -> u32 {
        match self {
            GovernanceError::UnknownIdentity { .. } => 1001,
            GovernanceError::InvalidGidFormat { .. } => 1002,
            GovernanceError::ModeNotPermitted { .. } => 1003,
            GovernanceError::LaneNotPermitted { .. } => 1004,
            GovernanceError::BerAuthority { .. } => 1005,
            GovernanceError::WrapAuthority { .. } => 1006,
            GovernanceError::SelfApproval { .. } => 1007,
            GovernanceError::PersonaAuthority { .. } => 1008,
            GovernanceError::PdoAuthority { .. } => 1009,
            GovernanceError::ToolDenied { .. } => 1101,
            GovernanceError::PathDenied { .. } => 1102,
            GovernanceError::PacSchemaViolation { .. } => 2001,
            GovernanceError::MissingWrapObligation { .. } => 2002,
            GovernanceError::MissingBerObligation { .. } => 2003,
            GovernanceError::MissingFinalState { .. } => 2004,
            GovernanceError::InvalidPacId { .. } => 2005,
            GovernanceError::WrapValidation { .. } => 2006,
            GovernanceError::UnknownSession { .. } => 3001,
            GovernanceError::BerRequired { .. } => 3002,
            GovernanceError::BerNotIssued { .. } => 3003,
            GovernanceError::BerNotEmitted { .. } => 3004,
            GovernanceError::SessionInvalid { .. } => 3005,
            GovernanceError::InvalidOutcome { .. } => 3101,
            GovernanceError::PdoIncomplete { .. } => 3102,
            GovernanceError::ShardOverflow { .. } => 4001,
            GovernanceError::DuplicateEntry { .. } => 4002,
            GovernanceError::ImmutabilityViolation { .. } => 4003,
            GovernanceError::IndexCorruption(_) => 4004,
            GovernanceError::RuntimeNotActivated { .. } => 5001,
            GovernanceError::Serialization(_) => 9001,
        }
    }

    /// Returns the error family for taxonomy-level handling.
    pub const fn family(&self) -> ErrorFamily {
        match self {
            GovernanceError::UnknownIdentity { .. }
            | GovernanceError::InvalidGidFormat { .. }
            | GovernanceError::ModeNotPermitted { .. }
            | GovernanceError::LaneNotPermitted { .. }
            | GovernanceError::BerAuthority { .. }
            | GovernanceError::WrapAuthority { .. }
            | GovernanceError::SelfApproval { .. }
            | GovernanceError::PersonaAuthority { .. }
            | GovernanceError::PdoAuthority { .. }
            | GovernanceError::ToolDenied { .. }
            | GovernanceError::PathDenied { .. } => ErrorFamily::IdentityAuthority,
            GovernanceError::PacSchemaViolation { .. }
            | GovernanceError::MissingWrapObligation { .. }
            | GovernanceError::MissingBerObligation { .. }
            | GovernanceError::MissingFinalState { .. }
            | GovernanceError::InvalidPacId { .. }
            | GovernanceError::WrapValidation { .. }
            | GovernanceError::Serialization(_) => ErrorFamily::Schema,
            GovernanceError::UnknownSession { .. }
            | GovernanceError::BerRequired { .. }
            | GovernanceError::BerNotIssued { .. }
            | GovernanceError::BerNotEmitted { .. }
            | GovernanceError::SessionInvalid { .. }
            | GovernanceError::InvalidOutcome { .. }
            | GovernanceError::PdoIncomplete { .. } => ErrorFamily::State,
            GovernanceError::ShardOverflow { .. }
            | GovernanceError::DuplicateEntry { .. }
            | GovernanceError::ImmutabilityViolation { .. }
            | GovernanceError::IndexCorruption(_) => ErrorFamily::Storage,
            GovernanceError::RuntimeNotActivated { .. } => ErrorFamily::Lint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        let err = GovernanceError::UnknownIdentity {
            identity_id: "GID-99".to_string(),
        };
        assert_eq!(err.error_code(), 1001);

        let err = GovernanceError::BerRequired {
            pac_id: "PAC-X".to_string(),
        };
        assert_eq!(err.error_code(), 3002);

        let err = GovernanceError::ImmutabilityViolation {
            pdo_id: "pdo_1".to_string(),
        };
        assert_eq!(err.error_code(), 4003);
    }

    #[test]
    fn test_families_match_taxonomy() {
        let err = GovernanceError::SelfApproval {
            identity_id: "GID-01".to_string(),
        };
        assert_eq!(err.family(), ErrorFamily::IdentityAuthority);

        let err = GovernanceError::MissingBerObligation { pac_id: None };
        assert_eq!(err.family(), ErrorFamily::Schema);

        let err = GovernanceError::ShardOverflow {
            shard_id: 3,
            capacity: 200,
        };
        assert_eq!(err.family(), ErrorFamily::Storage);

        let err = GovernanceError::RuntimeNotActivated {
            missing: vec!["fail_closed_enabled".to_string()],
        };
        assert_eq!(err.family(), ErrorFamily::Lint);
    }

    #[test]
    fn test_loop_closure_kinds_are_distinct() {
        // Terminal emissions enumerate these by name; they must never collapse
        // into the generic schema violation.
        let wrap = GovernanceError::MissingWrapObligation { pac_id: None };
        let ber = GovernanceError::MissingBerObligation { pac_id: None };
        let fs = GovernanceError::MissingFinalState { pac_id: None };
        assert_ne!(wrap.error_code(), ber.error_code());
        assert_ne!(ber.error_code(), fs.error_code());
    }
}
