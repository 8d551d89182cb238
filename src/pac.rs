// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — pac.rs
// Governance Kernel: Immutable PAC Schema & Validator
// Governance Tier: LAW
// Invariant: NO_DISPATCH_WITHOUT_VALIDATION | LOOP_CLOSURE_MANDATORY
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! Typed schema for PACs (Principal Action Commands). No optional loop
//! components: a PAC without WRAP_OBLIGATION, BER_OBLIGATION, or FINAL_STATE
//! is rejected before dispatch, and each of those three violations surfaces
//! under its own error kind — downstream terminal emissions enumerate them
//! by name.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, GovernanceResult};

// ═══════════════════════════════════════════════════════════════════════════════
// EXECUTION MODES AND STATUSES — CLOSED SETS
// ═══════════════════════════════════════════════════════════════════════════════

/// Valid PAC execution modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacMode {
    Orchestration,
    Execution,
    Synthesis,
    Review,
}

impl PacMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PacMode::Orchestration => "ORCHESTRATION",
            PacMode::Execution => "EXECUTION",
            PacMode::Synthesis => "SYNTHESIS",
            PacMode::Review => "REVIEW",
        }
    }
}

/// Valid PAC enforcement disciplines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacDiscipline {
    GoldStandard,
    FailClosed,
}

impl PacDiscipline {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PacDiscipline::GoldStandard => "GOLD_STANDARD",
            PacDiscipline::FailClosed => "FAIL-CLOSED",
        }
    }
}

/// WRAP execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapStatus {
    Complete,
    Partial,
    Failed,
}

impl WrapStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            WrapStatus::Complete => "COMPLETE",
            WrapStatus::Partial => "PARTIAL",
            WrapStatus::Failed => "FAILED",
        }
    }

    /// Parse from the closed set. Unknown values are rejected.
    pub fn parse(s: &str) -> GovernanceResult<WrapStatus> {
        match s.to_uppercase().as_str() {
            "COMPLETE" => Ok(WrapStatus::Complete),
            "PARTIAL" => Ok(WrapStatus::Partial),
            "FAILED" => Ok(WrapStatus::Failed),
            _ => Err(GovernanceError::WrapValidation {
                block: "OUTCOME".to_string(),
                reason: format!("Unknown WRAP status '{s}'"),
            }),
        }
    }
}

/// BER decision status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BerStatus {
    Approve,
    Corrective,
    Reject,
}

impl BerStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BerStatus::Approve => "APPROVE",
            BerStatus::Corrective => "CORRECTIVE",
            BerStatus::Reject => "REJECT",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAC SECTION IDENTIFIERS — ALL MANDATORY
// ═══════════════════════════════════════════════════════════════════════════════

/// Canonical PAC section identifiers. ALL sections are mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacSection {
    PacId,
    Issuer,
    Target,
    Mode,
    Discipline,
    Objective,
    ExecutionPlan,
    RequiredDeliverables,
    Constraints,
    SuccessCriteria,
    Dispatch,
    WrapObligation,
    BerObligation,
    FinalState,
}

impl PacSection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PacSection::PacId => "PAC_ID",
            PacSection::Issuer => "ISSUER",
            PacSection::Target => "TARGET",
            PacSection::Mode => "MODE",
            PacSection::Discipline => "DISCIPLINE",
            PacSection::Objective => "OBJECTIVE",
            PacSection::ExecutionPlan => "EXECUTION_PLAN",
            PacSection::RequiredDeliverables => "REQUIRED_DELIVERABLES",
            PacSection::Constraints => "CONSTRAINTS",
            PacSection::SuccessCriteria => "SUCCESS_CRITERIA",
            PacSection::Dispatch => "DISPATCH",
            PacSection::WrapObligation => "WRAP_OBLIGATION",
            PacSection::BerObligation => "BER_OBLIGATION",
            PacSection::FinalState => "FINAL_STATE",
        }
    }
}

/// The three loop-closure sections plus dispatch. Absence of any of these
/// is fatal — the loop cannot mechanically close without them.
pub const LOOP_CLOSURE_SECTIONS: [PacSection; 4] = [
    PacSection::Dispatch,
    PacSection::WrapObligation,
    PacSection::BerObligation,
    PacSection::FinalState,
];

// ═══════════════════════════════════════════════════════════════════════════════
// PAC ID FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    /// PAC-{ISSUER}-{MODE}-{LANE}-{NAME}-{SEQ}, case-insensitive.
    static ref PAC_ID_PATTERN: Regex =
        Regex::new(r"(?i)^PAC-[A-Z]+-[A-Z]+-[A-Z]+-[A-Z0-9-]+-\d{3}$").expect("PAC id pattern");
}

/// Check if a PAC id matches the canonical format.
pub fn is_valid_pac_id(pac_id: &str) -> bool {
    PAC_ID_PATTERN.is_match(pac_id)
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAC STRUCTURES — IMMUTABLE
// ═══════════════════════════════════════════════════════════════════════════════

/// PAC header fields. All mandatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacHeader {
    pub pac_id: String,
    pub issuer: String,
    pub target: String,
    pub mode: PacMode,
    pub discipline: PacDiscipline,
}

/// Dispatch specification: who executes the PAC, and under which lane/mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacDispatch {
    pub target_identity: String,
    pub role: String,
    pub lane: String,
    pub mode: PacMode,
}

/// Declares that the executing agent MUST return a WRAP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrapObligation {
    pub required: bool,
    pub required_fields: Vec<String>,
}

impl Default for WrapObligation {
    fn default() -> Self {
        Self {
            required: true,
            required_fields: vec![
                "pac_id".to_string(),
                "status".to_string(),
                "deliverables".to_string(),
                "test_results".to_string(),
            ],
        }
    }
}

impl WrapObligation {
    pub fn is_valid(&self) -> bool {
        self.required
    }
}

/// Declares that the orchestration engine MUST issue a BER.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BerObligation {
    pub required: bool,
    pub issuer: String,
}

impl Default for BerObligation {
    fn default() -> Self {
        Self {
            required: true,
            issuer: crate::identity::ORCHESTRATOR_GID.to_string(),
        }
    }
}

impl BerObligation {
    pub fn is_valid(&self) -> bool {
        self.required
    }
}

/// Declares the expected terminal state after loop closure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacFinalState {
    pub expected_state: String,
    pub wrap_required: bool,
    pub ber_required: bool,
}

impl Default for PacFinalState {
    fn default() -> Self {
        Self {
            expected_state: "SESSION_COMPLETE".to_string(),
            wrap_required: true,
            ber_required: true,
        }
    }
}

impl PacFinalState {
    pub fn is_valid(&self) -> bool {
        self.wrap_required && self.ber_required
    }
}

/// Single deliverable item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacDeliverable {
    pub index: usize,
    pub description: String,
    pub path: Option<String>,
}

/// Complete PAC. Frozen after construction: the builder is the only
/// construction path, and nothing exposes mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pac {
    pub header: PacHeader,
    pub objective: String,
    pub execution_plan: String,
    pub required_deliverables: Vec<PacDeliverable>,
    pub constraints: Vec<String>,
    pub success_criteria: Vec<String>,
    pub dispatch: Option<PacDispatch>,
    pub wrap_obligation: Option<WrapObligation>,
    pub ber_obligation: Option<BerObligation>,
    pub final_state: Option<PacFinalState>,
}

impl Pac {
    pub fn pac_id(&self) -> &str {
        &self.header.pac_id
    }

    pub fn has_wrap_obligation(&self) -> bool {
        self.wrap_obligation.as_ref().is_some_and(|o| o.is_valid())
    }

    pub fn has_ber_obligation(&self) -> bool {
        self.ber_obligation.as_ref().is_some_and(|o| o.is_valid())
    }

    pub fn has_final_state(&self) -> bool {
        self.final_state.as_ref().is_some_and(|f| f.is_valid())
    }

    pub fn is_loop_closure_complete(&self) -> bool {
        self.dispatch.is_some()
            && self.has_wrap_obligation()
            && self.has_ber_obligation()
            && self.has_final_state()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDER
// ═══════════════════════════════════════════════════════════════════════════════

/// Fluent builder for schema-complete PACs.
#[derive(Debug, Default)]
pub struct PacBuilder {
    pac_id: String,
    issuer: String,
    target: String,
    mode: Option<PacMode>,
    discipline: Option<PacDiscipline>,
    objective: String,
    execution_plan: String,
    deliverables: Vec<PacDeliverable>,
    constraints: Vec<String>,
    success_criteria: Vec<String>,
    dispatch: Option<PacDispatch>,
    wrap_obligation: Option<WrapObligation>,
    ber_obligation: Option<BerObligation>,
    final_state: Option<PacFinalState>,
}

impl PacBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, pac_id: impl Into<String>) -> Self {
        self.pac_id = pac_id.into();
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_mode(mut self, mode: PacMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_discipline(mut self, discipline: PacDiscipline) -> Self {
        self.discipline = Some(discipline);
        self
    }

    pub fn with_objective(mut self, objective: impl Into<String>) -> Self {
        self.objective = objective.into();
        self
    }

    pub fn with_execution_plan(mut self, plan: impl Into<String>) -> Self {
        self.execution_plan = plan.into();
        self
    }

    pub fn add_deliverable(mut self, description: impl Into<String>, path: Option<String>) -> Self {
        let index = self.deliverables.len() + 1;
        self.deliverables.push(PacDeliverable {
            index,
            description: description.into(),
            path,
        });
        self
    }

    pub fn add_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn add_success_criterion(mut self, criterion: impl Into<String>) -> Self {
        self.success_criteria.push(criterion.into());
        self
    }

    pub fn with_dispatch(
        mut self,
        target_identity: impl Into<String>,
        role: impl Into<String>,
        lane: impl Into<String>,
        mode: PacMode,
    ) -> Self {
        self.dispatch = Some(PacDispatch {
            target_identity: target_identity.into(),
            role: role.into(),
            lane: lane.into(),
            mode,
        });
        self
    }

    pub fn with_wrap_obligation(mut self) -> Self {
        self.wrap_obligation = Some(WrapObligation::default());
        self
    }

    pub fn with_ber_obligation(mut self) -> Self {
        self.ber_obligation = Some(BerObligation::default());
        self
    }

    pub fn with_final_state(mut self) -> Self {
        self.final_state = Some(PacFinalState::default());
        self
    }

    /// Build the PAC. Structural completeness is checked by the validator,
    /// not here — an incomplete PAC is representable so it can be rejected
    /// observably.
    pub fn build(self) -> Pac {
        Pac {
            header: PacHeader {
                pac_id: self.pac_id,
                issuer: self.issuer,
                target: self.target,
                mode: self.mode.unwrap_or(PacMode::Execution),
                discipline: self.discipline.unwrap_or(PacDiscipline::FailClosed),
            },
            objective: self.objective,
            execution_plan: self.execution_plan,
            required_deliverables: self.deliverables,
            constraints: self.constraints,
            success_criteria: self.success_criteria,
            dispatch: self.dispatch,
            wrap_obligation: self.wrap_obligation,
            ber_obligation: self.ber_obligation,
            final_state: self.final_state,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of PAC schema validation. Pure: no I/O, no clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacValidationResult {
    pub valid: bool,
    pub pac_id: Option<String>,
    pub missing_sections: Vec<PacSection>,
    pub errors: Vec<String>,
}

impl PacValidationResult {
    /// True if all loop-closure sections are present.
    pub fn has_loop_closure(&self) -> bool {
        !LOOP_CLOSURE_SECTIONS
            .iter()
            .any(|s| self.missing_sections.contains(s))
    }

    pub fn missing_section_names(&self) -> Vec<&'static str> {
        self.missing_sections.iter().map(|s| s.as_str()).collect()
    }
}

/// Validates PACs against the immutable schema at ingest, before dispatch.
#[derive(Debug, Default)]
pub struct PacValidator;

impl PacValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a PAC. Collects every missing section in canonical order.
    pub fn validate(&self, pac: &Pac) -> PacValidationResult {
        let mut missing: Vec<PacSection> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        if pac.header.pac_id.is_empty() {
            missing.push(PacSection::PacId);
            errors.push("PAC_ID is required".to_string());
        } else if !is_valid_pac_id(&pac.header.pac_id) {
            errors.push(format!(
                "PAC_ID '{}' does not match PAC-{{ISSUER}}-{{MODE}}-{{LANE}}-{{NAME}}-{{SEQ}}",
                pac.header.pac_id
            ));
        }
        if pac.header.issuer.is_empty() {
            missing.push(PacSection::Issuer);
            errors.push("ISSUER is required".to_string());
        }
        if pac.header.target.is_empty() {
            missing.push(PacSection::Target);
            errors.push("TARGET is required".to_string());
        }

        if pac.objective.is_empty() {
            missing.push(PacSection::Objective);
            errors.push("OBJECTIVE is required".to_string());
        }
        if pac.execution_plan.is_empty() {
            missing.push(PacSection::ExecutionPlan);
            errors.push("EXECUTION_PLAN is required".to_string());
        }
        if pac.required_deliverables.is_empty() {
            missing.push(PacSection::RequiredDeliverables);
            errors.push("REQUIRED_DELIVERABLES is required".to_string());
        }
        if pac.constraints.is_empty() {
            missing.push(PacSection::Constraints);
            errors.push("CONSTRAINTS is required".to_string());
        }
        if pac.success_criteria.is_empty() {
            missing.push(PacSection::SuccessCriteria);
            errors.push("SUCCESS_CRITERIA is required".to_string());
        }

        if pac.dispatch.is_none() {
            missing.push(PacSection::Dispatch);
            errors.push("DISPATCH is required".to_string());
        }
        if !pac.has_wrap_obligation() {
            missing.push(PacSection::WrapObligation);
            errors.push("WRAP_OBLIGATION is required — loop closure mandatory".to_string());
        }
        if !pac.has_ber_obligation() {
            missing.push(PacSection::BerObligation);
            errors.push("BER_OBLIGATION is required — loop closure mandatory".to_string());
        }
        if !pac.has_final_state() {
            missing.push(PacSection::FinalState);
            errors.push("FINAL_STATE is required — loop closure mandatory".to_string());
        }

        let pac_id = if pac.header.pac_id.is_empty() {
            None
        } else {
            Some(pac.header.pac_id.clone())
        };

        PacValidationResult {
            valid: missing.is_empty() && errors.is_empty(),
            pac_id,
            missing_sections: missing,
            errors,
        }
    }

    /// Validate and fail immediately on the first loop-closure violation,
    /// surfacing the dedicated error kind for it.
    pub fn validate_and_raise(&self, pac: &Pac) -> GovernanceResult<PacValidationResult> {
        let result = self.validate(pac);
        let pac_id = result.pac_id.clone();

        if !pac.header.pac_id.is_empty() && !is_valid_pac_id(&pac.header.pac_id) {
            return Err(GovernanceError::InvalidPacId {
                pac_id: pac.header.pac_id.clone(),
            });
        }
        if result.missing_sections.contains(&PacSection::WrapObligation) {
            return Err(GovernanceError::MissingWrapObligation { pac_id });
        }
        if result.missing_sections.contains(&PacSection::BerObligation) {
            return Err(GovernanceError::MissingBerObligation { pac_id });
        }
        if result.missing_sections.contains(&PacSection::FinalState) {
            return Err(GovernanceError::MissingFinalState { pac_id });
        }
        if !result.valid {
            return Err(GovernanceError::PacSchemaViolation {
                pac_id,
                message: result.errors.join("; "),
                missing_sections: result.missing_sections.clone(),
            });
        }
        Ok(result)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
