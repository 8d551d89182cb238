//! # Identity Registry — Structural Identity Enforcement
//!
//! PAC-OCC-P63-GOVERNANCE-CORE: The Registry
//!
//! Canonical, immutable set of actor identities. We do not trust display
//! names; we trust the registry.
//!
//! ## Identity Boundary
//! - SYSTEM components ≠ AGENTS; system components have no persona
//! - Only the SYSTEM_ORCHESTRATOR may issue BER
//! - DRAFTING_SURFACE may never emit WRAP or BER
//! - Unknown identity = immediate rejection (fail-closed)
//!
//! The registry is loaded once, read-only at runtime, and process-global.
//! Fresh instances can be built for test isolation.

use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, GovernanceResult};

/// Identity id of the sole BER/PDO/POSITIVE_CLOSURE issuer.
pub const ORCHESTRATOR_GID: &str = "GID-00";

lazy_static! {
    static ref GID_PATTERN: Regex = Regex::new(r"^GID-(\d{2})$").expect("GID pattern");
}

/// Validates the `GID-NN` format. Fails with `InvalidGidFormat` otherwise.
pub fn validate_gid_format(gid: &str) -> GovernanceResult<()> {
    if !GID_PATTERN.is_match(gid) {
        return Err(GovernanceError::InvalidGidFormat {
            gid: gid.to_string(),
        });
    }
    Ok(())
}

/// Returns true if `gid` matches the `GID-NN` format.
pub fn is_valid_gid(gid: &str) -> bool {
    GID_PATTERN.is_match(gid)
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITY CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Classification of identity types. Determines which artifacts an identity
/// may issue; authority is class-derived, never name-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityClass {
    SystemOrchestrator,
    SystemExecution,
    DraftingSurface,
    Agent,
}

impl IdentityClass {
    pub const fn as_str(&self) -> &'static str {
        match self {
            IdentityClass::SystemOrchestrator => "SYSTEM_ORCHESTRATOR",
            IdentityClass::SystemExecution => "SYSTEM_EXECUTION",
            IdentityClass::DraftingSurface => "DRAFTING_SURFACE",
            IdentityClass::Agent => "AGENT",
        }
    }

    /// True for non-agent, non-conversational system components.
    pub const fn is_system(&self) -> bool {
        matches!(
            self,
            IdentityClass::SystemOrchestrator | IdentityClass::SystemExecution
        )
    }

    /// True if this class may issue BER.
    pub const fn can_issue_ber(&self) -> bool {
        matches!(self, IdentityClass::SystemOrchestrator)
    }

    /// True if this class may issue WRAP.
    pub const fn can_issue_wrap(&self) -> bool {
        matches!(self, IdentityClass::Agent)
    }

    /// True if this class may emit PAC proposals.
    pub const fn can_emit_pac(&self) -> bool {
        matches!(self, IdentityClass::DraftingSurface)
    }

    /// Only agents carry a persona.
    pub const fn has_persona(&self) -> bool {
        matches!(self, IdentityClass::Agent)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITY — IMMUTABLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Canonical identity record. No mutation after registry construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub identity_id: String,
    pub class: IdentityClass,
    pub display_role: String,
    pub permitted_modes: BTreeSet<String>,
    pub permitted_lanes: BTreeSet<String>,
    pub can_issue_pac: bool,
    pub can_issue_ber: bool,
}

impl Identity {
    /// Check mode against the permitted set.
    pub fn can_execute_mode(&self, mode: &str) -> bool {
        self.permitted_modes.contains(&mode.to_uppercase())
    }

    /// Check lane against the permitted set. `ALL` grants every lane.
    pub fn can_execute_lane(&self, lane: &str) -> bool {
        self.permitted_lanes.contains("ALL") || self.permitted_lanes.contains(&lane.to_uppercase())
    }

    fn validate_mode(&self, mode: &str) -> GovernanceResult<()> {
        if !self.can_execute_mode(mode) {
            return Err(GovernanceError::ModeNotPermitted {
                identity_id: self.identity_id.clone(),
                mode: mode.to_string(),
                permitted: self.permitted_modes.iter().cloned().collect(),
            });
        }
        Ok(())
    }

    fn validate_lane(&self, lane: &str) -> GovernanceResult<()> {
        if !self.can_execute_lane(lane) {
            return Err(GovernanceError::LaneNotPermitted {
                identity_id: self.identity_id.clone(),
                lane: lane.to_string(),
                permitted: self.permitted_lanes.iter().cloned().collect(),
            });
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Closed registry of all identities. Lookups for unknown ids fail.
#[derive(Debug)]
pub struct IdentityRegistry {
    identities: BTreeMap<String, Identity>,
}

impl IdentityRegistry {
    /// Builds the canonical registry: one orchestrator, one execution engine,
    /// one drafting surface, and the agent roster.
    pub fn canonical() -> Self {
        let mut identities = BTreeMap::new();

        let mut insert = |identity: Identity| {
            identities.insert(identity.identity_id.clone(), identity);
        };

        insert(Identity {
            identity_id: ORCHESTRATOR_GID.to_string(),
            class: IdentityClass::SystemOrchestrator,
            display_role: "Orchestration Engine".to_string(),
            permitted_modes: modes(&["ORCHESTRATION", "GOVERNANCE", "REVIEW"]),
            permitted_lanes: lanes(&["ALL"]),
            can_issue_pac: true,
            can_issue_ber: true,
        });
        insert(Identity {
            identity_id: "EXECUTION_ENGINE".to_string(),
            class: IdentityClass::SystemExecution,
            display_role: "Execution Dispatcher".to_string(),
            permitted_modes: modes(&["EXECUTION"]),
            permitted_lanes: lanes(&["ALL"]),
            can_issue_pac: false,
            can_issue_ber: false,
        });
        insert(Identity {
            identity_id: "DRAFTING_SURFACE".to_string(),
            class: IdentityClass::DraftingSurface,
            display_role: "Drafting Surface".to_string(),
            permitted_modes: modes(&["ADVISORY"]),
            permitted_lanes: lanes(&["ALL"]),
            can_issue_pac: true,
            can_issue_ber: false,
        });

        // Agent roster. Lanes and modes mirror the governance registry.
        let agents: &[(&str, &str, &[&str], &[&str])] = &[
            ("GID-01", "Backend Engineer", &["EXECUTION", "REVIEW", "TESTING", "REFACTOR"], &["CORE", "BACKEND", "API"]),
            ("GID-02", "Frontend Engineer", &["EXECUTION", "REVIEW", "TESTING"], &["FRONTEND"]),
            ("GID-03", "Research Analyst", &["RESEARCH", "ANALYSIS", "ADVISORY"], &["DOCS"]),
            ("GID-04", "Data Analyst", &["DATA_ANALYSIS", "ANALYSIS", "REVIEW"], &["DATA"]),
            ("GID-05", "Strategy Lead", &["STRATEGY", "PLANNING", "ADVISORY"], &["STRATEGIES"]),
            ("GID-06", "Security Engineer", &["EXECUTION", "REVIEW", "AUDIT"], &["CORE", "GOVERNANCE"]),
            ("GID-07", "Data Engineer", &["EXECUTION", "TESTING", "DEPLOYMENT"], &["DATA", "INFRA"]),
            ("GID-08", "Governance Engineer", &["EXECUTION", "GOVERNANCE", "REVIEW"], &["GOVERNANCE"]),
            ("GID-09", "ML Engineer", &["EXECUTION", "DATA_ANALYSIS", "TESTING"], &["ML"]),
            ("GID-10", "Documentation Writer", &["DOCUMENTATION", "SYNTHESIS", "REVIEW"], &["DOCS"]),
            ("GID-11", "Repo Integrity", &["AUDIT", "REVIEW", "MAINTENANCE"], &["ALL"]),
            ("GID-12", "DevOps Engineer", &["EXECUTION", "DEPLOYMENT", "MAINTENANCE"], &["INFRA", "DEVOPS"]),
        ];
        for (gid, role, agent_modes, agent_lanes) in agents {
            insert(Identity {
                identity_id: gid.to_string(),
                class: IdentityClass::Agent,
                display_role: role.to_string(),
                permitted_modes: modes(agent_modes),
                permitted_lanes: lanes(agent_lanes),
                can_issue_pac: false,
                can_issue_ber: false,
            });
        }

        Self { identities }
    }

    /// Resolve an identity by id. Fails with `UnknownIdentity` if absent.
    /// Agent-form ids are format-checked first.
    pub fn resolve(&self, identity_id: &str) -> GovernanceResult<&Identity> {
        if identity_id.starts_with("GID-") {
            validate_gid_format(identity_id)?;
        }
        self.identities
            .get(identity_id)
            .ok_or_else(|| GovernanceError::UnknownIdentity {
                identity_id: identity_id.to_string(),
            })
    }

    /// True if the id is present in the registry.
    pub fn contains(&self, identity_id: &str) -> bool {
        self.identities.contains_key(identity_id)
    }

    /// Validate identity + mode. Fails with `ModeNotPermitted`.
    pub fn validate_mode(&self, identity_id: &str, mode: &str) -> GovernanceResult<()> {
        self.resolve(identity_id)?.validate_mode(mode)
    }

    /// Validate identity + lane. Fails with `LaneNotPermitted`.
    pub fn validate_lane(&self, identity_id: &str, lane: &str) -> GovernanceResult<()> {
        self.resolve(identity_id)?.validate_lane(lane)
    }

    /// Full identity validation: id, then mode, then lane.
    /// Returns the resolved identity.
    pub fn validate_identity(
        &self,
        identity_id: &str,
        mode: &str,
        lane: &str,
    ) -> GovernanceResult<&Identity> {
        let identity = self.resolve(identity_id)?;
        identity.validate_mode(mode)?;
        identity.validate_lane(lane)?;
        Ok(identity)
    }

    /// The sole SYSTEM_ORCHESTRATOR identity.
    pub fn orchestrator(&self) -> &Identity {
        self.identities
            .get(ORCHESTRATOR_GID)
            .expect("canonical registry carries the orchestrator")
    }

    /// All identity ids, sorted.
    pub fn list_all_ids(&self) -> Vec<&str> {
        self.identities.keys().map(String::as_str).collect()
    }

    /// Agents permitted on a given lane.
    pub fn agents_by_lane(&self, lane: &str) -> Vec<&Identity> {
        self.identities
            .values()
            .filter(|i| i.class == IdentityClass::Agent && i.can_execute_lane(lane))
            .collect()
    }

    /// Agents permitted in a given mode.
    pub fn agents_by_mode(&self, mode: &str) -> Vec<&Identity> {
        self.identities
            .values()
            .filter(|i| i.class == IdentityClass::Agent && i.can_execute_mode(mode))
            .collect()
    }

    /// Identities that may issue BER. The canonical registry returns
    /// exactly one.
    pub fn ber_issuers(&self) -> Vec<&Identity> {
        self.identities.values().filter(|i| i.can_issue_ber).collect()
    }
}

fn modes(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn lanes(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

lazy_static! {
    static ref CANONICAL_REGISTRY: IdentityRegistry = IdentityRegistry::canonical();
}

/// Process-global canonical registry. Read-only after initialization.
pub fn registry() -> &'static IdentityRegistry {
    &CANONICAL_REGISTRY
}

// ═══════════════════════════════════════════════════════════════════════════════
// ECHO-BACK HANDSHAKE
// ═══════════════════════════════════════════════════════════════════════════════

/// Format the mandatory echo-back handshake — the first line of agent output.
/// Does not validate; run `validate_identity` first.
pub fn format_echo_handshake(gid: &str, mode: &str, lane: &str) -> String {
    format!(
        "{} | MODE: {} | LANE: {}",
        gid,
        mode.to_uppercase(),
        lane.to_uppercase()
    )
}

/// Validate an echo-back handshake against the expected identity and mode.
/// Returns the offending first line on failure.
pub fn validate_echo_handshake(
    output: &str,
    expected_gid: &str,
    expected_mode: Option<&str>,
) -> Result<(), String> {
    let first_line = output.trim().lines().next().unwrap_or("");
    if !first_line.starts_with(expected_gid) {
        return Err(format!(
            "Expected first line to start with '{expected_gid}'. Got: '{first_line}'"
        ));
    }
    if let Some(mode) = expected_mode {
        let marker = format!("MODE: {}", mode.to_uppercase());
        if !first_line.contains(&marker) {
            return Err(format!(
                "Expected {marker} in handshake. Got: '{first_line}'"
            ));
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gid_format_enforced() {
        assert!(is_valid_gid("GID-00"));
        assert!(is_valid_gid("GID-99"));
        assert!(!is_valid_gid("GID-7"));
        assert!(!is_valid_gid("GID-123"));
        assert!(!is_valid_gid("gid-01"));
        assert!(!is_valid_gid("AGENT-01"));
    }

    #[test]
    fn test_unknown_identity_fails() {
        let registry = IdentityRegistry::canonical();
        let err = registry.resolve("GID-42").unwrap_err();
        assert!(matches!(err, GovernanceError::UnknownIdentity { .. }));
    }

    #[test]
    fn test_malformed_gid_fails_before_lookup() {
        let registry = IdentityRegistry::canonical();
        let err = registry.resolve("GID-ABC").unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidGidFormat { .. }));
    }

    #[test]
    fn test_exactly_one_ber_issuer() {
        let registry = IdentityRegistry::canonical();
        let issuers = registry.ber_issuers();
        assert_eq!(issuers.len(), 1);
        assert_eq!(issuers[0].identity_id, ORCHESTRATOR_GID);
        assert_eq!(issuers[0].class, IdentityClass::SystemOrchestrator);
    }

    #[test]
    fn test_drafting_surface_has_no_artifact_authority() {
        let registry = IdentityRegistry::canonical();
        let surface = registry.resolve("DRAFTING_SURFACE").unwrap();
        assert!(!surface.can_issue_ber);
        assert!(!surface.class.can_issue_wrap());
        assert!(surface.class.can_emit_pac());
    }

    #[test]
    fn test_mode_not_permitted() {
        let registry = IdentityRegistry::canonical();
        // GID-10 writes documentation; it does not deploy
        let err = registry.validate_mode("GID-10", "DEPLOYMENT").unwrap_err();
        assert!(matches!(err, GovernanceError::ModeNotPermitted { .. }));
    }

    #[test]
    fn test_lane_not_permitted() {
        let registry = IdentityRegistry::canonical();
        let err = registry.validate_lane("GID-02", "GOVERNANCE").unwrap_err();
        assert!(matches!(err, GovernanceError::LaneNotPermitted { .. }));
    }

    #[test]
    fn test_all_lane_grants_everything() {
        let registry = IdentityRegistry::canonical();
        // GID-11 carries the ALL lane
        assert!(registry.validate_lane("GID-11", "CORE").is_ok());
        assert!(registry.validate_lane("GID-11", "FRONTEND").is_ok());
    }

    #[test]
    fn test_full_identity_validation_order() {
        let registry = IdentityRegistry::canonical();
        // Unknown id fails before mode/lane are even considered
        let err = registry
            .validate_identity("GID-77", "EXECUTION", "CORE")
            .unwrap_err();
        assert!(matches!(err, GovernanceError::UnknownIdentity { .. }));

        let identity = registry
            .validate_identity("GID-01", "EXECUTION", "CORE")
            .unwrap();
        assert_eq!(identity.identity_id, "GID-01");
    }

    #[test]
    fn test_case_insensitive_mode_lane() {
        let registry = IdentityRegistry::canonical();
        assert!(registry.validate_identity("GID-01", "execution", "core").is_ok());
    }

    #[test]
    fn test_echo_handshake_round_trip() {
        let line = format_echo_handshake("GID-01", "execution", "core");
        assert_eq!(line, "GID-01 | MODE: EXECUTION | LANE: CORE");
        assert!(validate_echo_handshake(&line, "GID-01", Some("EXECUTION")).is_ok());
        assert!(validate_echo_handshake(&line, "GID-02", None).is_err());
        assert!(validate_echo_handshake(&line, "GID-01", Some("REVIEW")).is_err());
    }

    #[test]
    fn test_agents_by_lane_and_mode() {
        let registry = IdentityRegistry::canonical();
        let governance = registry.agents_by_lane("GOVERNANCE");
        assert!(governance.iter().any(|i| i.identity_id == "GID-08"));
        // ALL-lane agents appear on every lane
        assert!(governance.iter().any(|i| i.identity_id == "GID-11"));

        let reviewers = registry.agents_by_mode("REVIEW");
        assert!(reviewers.iter().any(|i| i.identity_id == "GID-01"));
        assert!(!reviewers.iter().any(|i| i.identity_id == "GID-07"));
    }

    #[test]
    fn test_process_global_registry_is_canonical() {
        assert_eq!(registry().orchestrator().identity_id, ORCHESTRATOR_GID);
        assert!(registry().contains("GID-01"));
    }
}
