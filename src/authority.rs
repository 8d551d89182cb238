// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — authority.rs
// Governance Kernel: Artifact Issuance Authority Guard
// Governance Tier: LAW
// Invariant: SOLE_BER_ISSUER | NO_SELF_APPROVAL | NO_PERSONA_AUTHORITY
// ═══════════════════════════════════════════════════════════════════════════════

use crate::error::{GovernanceError, GovernanceResult};
use crate::identity::{Identity, IdentityClass};

/// True iff the identity class may issue BER.
pub fn may_issue_ber(identity: &Identity) -> bool {
    identity.class == IdentityClass::SystemOrchestrator
}

/// True iff the identity class may issue WRAP.
pub fn may_issue_wrap(identity: &Identity) -> bool {
    identity.class == IdentityClass::Agent
}

/// True iff approver and WRAP author differ.
pub fn not_self_approval(approver_id: &str, wrap_author_id: &str) -> bool {
    approver_id != wrap_author_id
}

/// Assert BER issuance authority. Fails with `BerAuthority`.
pub fn assert_ber_authority(identity: &Identity) -> GovernanceResult<()> {
    if !may_issue_ber(identity) {
        return Err(GovernanceError::BerAuthority {
            identity_id: identity.identity_id.clone(),
            class: identity.class.as_str().to_string(),
        });
    }
    Ok(())
}

/// Assert WRAP issuance authority. Fails with `WrapAuthority`.
pub fn assert_wrap_authority(identity: &Identity) -> GovernanceResult<()> {
    if !may_issue_wrap(identity) {
        return Err(GovernanceError::WrapAuthority {
            identity_id: identity.identity_id.clone(),
            class: identity.class.as_str().to_string(),
        });
    }
    Ok(())
}

/// Assert the approver is not the WRAP author. Fails with `SelfApproval`.
pub fn assert_not_self_approval(approver_id: &str, wrap_author_id: &str) -> GovernanceResult<()> {
    if !not_self_approval(approver_id, wrap_author_id) {
        return Err(GovernanceError::SelfApproval {
            identity_id: approver_id.to_string(),
        });
    }
    Ok(())
}

/// Reject any persona-based authority claim. Always fails: persona strings
/// carry zero authority weight.
pub fn reject_persona_authority(claimed_persona: &str) -> GovernanceResult<()> {
    Err(GovernanceError::PersonaAuthority {
        persona: claimed_persona.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityRegistry;

    #[test]
    fn test_only_orchestrator_issues_ber() {
        let registry = IdentityRegistry::canonical();
        assert!(may_issue_ber(registry.orchestrator()));
        assert!(assert_ber_authority(registry.orchestrator()).is_ok());

        let agent = registry.resolve("GID-01").unwrap();
        assert!(!may_issue_ber(agent));
        let err = assert_ber_authority(agent).unwrap_err();
        assert!(matches!(err, GovernanceError::BerAuthority { .. }));

        let surface = registry.resolve("DRAFTING_SURFACE").unwrap();
        assert!(assert_ber_authority(surface).is_err());
    }

    #[test]
    fn test_only_agents_issue_wrap() {
        let registry = IdentityRegistry::canonical();
        let agent = registry.resolve("GID-07").unwrap();
        assert!(assert_wrap_authority(agent).is_ok());

        let err = assert_wrap_authority(registry.orchestrator()).unwrap_err();
        assert!(matches!(err, GovernanceError::WrapAuthority { .. }));

        let execution = registry.resolve("EXECUTION_ENGINE").unwrap();
        assert!(assert_wrap_authority(execution).is_err());
    }

    #[test]
    fn test_self_approval_forbidden() {
        assert!(assert_not_self_approval("GID-00", "GID-01").is_ok());
        let err = assert_not_self_approval("GID-00", "GID-00").unwrap_err();
        assert!(matches!(err, GovernanceError::SelfApproval { .. }));
    }

    #[test]
    fn test_persona_claims_always_rejected() {
        for persona in ["BENSON", "The Orchestrator", "", "GID-00"] {
            let err = reject_persona_authority(persona).unwrap_err();
            assert!(matches!(err, GovernanceError::PersonaAuthority { .. }));
        }
    }
}
