// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — lint/mod.rs
// Governance Kernel: Invariant Engine — Runtime Enforcement
// Governance Tier: LAW
// Invariant: BINARY_OUTPUT | FAIL_FAST_HARD | NEVER_PASS_BY_DEFAULT
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! Runtime-enforced invariant evaluation.
//!
//! - Output is binary: PASS or FAIL. Warnings are forbidden in production.
//! - Evaluation before runtime activation never passes: it returns a single
//!   fabricated `RUNTIME-001` violation.
//! - In HARD_FAIL mode the first violation halts evaluation; in report mode
//!   all failures are collected.
//! - An error inside an evaluator is itself a violation (fail-closed).

pub mod registry;
pub mod runtime;
pub mod signals;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::canonical;
use crate::error::{GovernanceError, GovernanceResult};

pub use registry::{
    get_invariant, invariants_for_point, validate_checkpoint_coverage, EnforcementPoint,
    InvariantClass, InvariantDefinition, InvariantSeverity, CHECKPOINT_CLASS_MAP, INVARIANTS,
};
pub use runtime::{
    AgentAck, AgentAckBarrier, CheckpointTracker, FlowCheckpoint, RuntimeActivationStatus,
    CHECKPOINT_SEQUENCE,
};
pub use signals::{emit_training_signals, TrainingSignal};

// ═══════════════════════════════════════════════════════════════════════════════
// RESULTS AND VIOLATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Binary evaluation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationResult {
    Pass,
    Fail,
}

impl EvaluationResult {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EvaluationResult::Pass => "PASS",
            EvaluationResult::Fail => "FAIL",
        }
    }
}

/// Record of an invariant violation. A violation is always HARD_FAIL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantViolation {
    pub violation_id: String,
    pub invariant_id: String,
    pub class: InvariantClass,
    pub enforcement_point: EnforcementPoint,
    pub artifact_id: String,
    pub artifact_type: String,
    pub description: String,
    pub context: Value,
    pub detected_at: DateTime<Utc>,
    pub violation_hash: String,
}

impl InvariantViolation {
    fn new(
        invariant_id: &str,
        class: InvariantClass,
        enforcement_point: EnforcementPoint,
        artifact_id: &str,
        artifact_type: &str,
        description: String,
        context: Value,
    ) -> Self {
        let violation_hash = canonical::canonical_hash(&json!({
            "invariant_id": invariant_id,
            "artifact_id": artifact_id,
            "artifact_type": artifact_type,
            "description": description,
        }))[..16]
            .to_string();
        Self {
            violation_id: format!(
                "VIO-{}",
                &Uuid::new_v4().simple().to_string()[..8].to_uppercase()
            ),
            invariant_id: invariant_id.to_string(),
            class,
            enforcement_point,
            artifact_id: artifact_id.to_string(),
            artifact_type: artifact_type.to_string(),
            description,
            context,
            detected_at: Utc::now(),
            violation_hash,
        }
    }
}

/// Complete evaluation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub report_id: String,
    pub enforcement_point: EnforcementPoint,
    pub artifact_id: String,
    pub artifact_type: String,
    pub result: EvaluationResult,
    pub violations: Vec<InvariantViolation>,
    pub invariants_evaluated: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub report_hash: String,
}

impl EvaluationReport {
    pub fn is_pass(&self) -> bool {
        self.result == EvaluationResult::Pass
    }

    /// Classes covered by this evaluation, for checkpoint coverage checks.
    pub fn evaluated_classes(&self) -> Vec<InvariantClass> {
        let mut classes: Vec<InvariantClass> = self
            .invariants_evaluated
            .iter()
            .filter_map(|id| get_invariant(id))
            .map(|inv| inv.class)
            .collect();
        classes.dedup();
        classes
    }
}

fn report_hash(report_id: &str, artifact_id: &str, result: EvaluationResult, violations: usize) -> String {
    canonical::canonical_hash(&json!({
        "report_id": report_id,
        "artifact_id": artifact_id,
        "result": result.as_str(),
        "violation_count": violations,
    }))[..16]
        .to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATION CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// One ACK's state as seen by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckState {
    pub agent_gid: String,
    pub state: String,
}

/// Context object handed to every evaluator. Callers populate the fields
/// relevant to the enforcement point; the engine reads, never writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LintContext {
    pub pac: Option<Value>,
    pub wrap: Option<Value>,
    pub ber: Option<Value>,
    pub acks: Vec<AckState>,
    pub known_pacs: BTreeSet<String>,
    pub valid_wrap_hashes: BTreeSet<String>,
    pub registered_gids: BTreeSet<String>,
    pub authorized_lanes: BTreeMap<String, String>,
    pub agent_gid: Option<String>,
    pub agent_name: Option<String>,
    pub agent_mode: Option<String>,
    pub requested_lane: Option<String>,
    pub has_code_changes: bool,
    pub implicit_activation: bool,
    pub wraps_complete: Option<bool>,
    pub rg01_passed: Option<bool>,
    pub latency_eligible: Option<bool>,
    pub all_acks_received: Option<bool>,
    pub all_wraps_valid: Option<bool>,
    pub ledger_committed: bool,
    pub settlement_verdict_present: bool,
    pub closure_emitted: bool,
    pub training_signals: Vec<String>,
    pub positive_closure: Option<Value>,
    pub runtime_ack_valid: Option<bool>,
    pub barrier_released: Option<bool>,
    pub missing_acks: Vec<String>,
    pub lint_validated: Option<bool>,
    pub api_lint_pass: Option<bool>,
    pub deterministic_order: Option<bool>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure handling mode. Production runs HARD_FAIL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailMode {
    /// Stop at the first violation.
    HardFail,
    /// Collect all violations into the report.
    Report,
}

type Verdict = GovernanceResult<(bool, Option<String>)>;

/// The invariant engine. Stateless per call; the activation flags are
/// written once at construction and only read thereafter.
#[derive(Debug)]
pub struct LintEngine {
    fail_mode: FailMode,
    activation: RuntimeActivationStatus,
}

impl Default for LintEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LintEngine {
    /// Construct an activated engine in HARD_FAIL mode.
    pub fn new() -> Self {
        Self::with_fail_mode(FailMode::HardFail)
    }

    pub fn with_fail_mode(fail_mode: FailMode) -> Self {
        let mut activation = RuntimeActivationStatus {
            schema_validation_enabled: true,
            invariant_registry_loaded: !INVARIANTS.is_empty(),
            fail_closed_enabled: true,
            runtime_admission_hook_enabled: true,
            activated_at: None,
        };
        if activation.is_ready() {
            activation.activated_at = Some(Utc::now());
            info!("lint runtime activated");
        } else {
            warn!(
                missing = ?activation.missing_preconditions(),
                "lint runtime activation failed"
            );
        }
        Self {
            fail_mode,
            activation,
        }
    }

    /// A deliberately non-activated engine. Every evaluation FAILs with
    /// RUNTIME-001 until activation is complete.
    pub fn inactive() -> Self {
        Self {
            fail_mode: FailMode::HardFail,
            activation: RuntimeActivationStatus::default(),
        }
    }

    pub fn is_activated(&self) -> bool {
        self.activation.is_ready()
    }

    pub fn activation_status(&self) -> &RuntimeActivationStatus {
        &self.activation
    }

    /// Assert activation, for callers that gate on it directly.
    pub fn require_activation(&self) -> GovernanceResult<()> {
        if !self.activation.is_ready() {
            return Err(GovernanceError::RuntimeNotActivated {
                missing: self.activation.missing_preconditions(),
            });
        }
        Ok(())
    }

    /// Evaluate all applicable invariants at an enforcement point.
    pub fn evaluate(
        &self,
        enforcement_point: EnforcementPoint,
        artifact_id: &str,
        artifact_type: &str,
        context: &LintContext,
    ) -> EvaluationReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        let report_id = format!(
            "LINT-{}",
            &Uuid::new_v4().simple().to_string()[..12].to_uppercase()
        );

        // Runtime admission hook: never PASS before activation
        if !self.activation.is_ready() {
            let missing = self.activation.missing_preconditions();
            let violation = InvariantViolation::new(
                "RUNTIME-001",
                InvariantClass::Structural,
                enforcement_point,
                artifact_id,
                artifact_type,
                format!("Runtime not activated: {}", missing.join(", ")),
                json!({ "missing_preconditions": missing }),
            );
            let hash = report_hash(&report_id, artifact_id, EvaluationResult::Fail, 1);
            return EvaluationReport {
                report_id,
                enforcement_point,
                artifact_id: artifact_id.to_string(),
                artifact_type: artifact_type.to_string(),
                result: EvaluationResult::Fail,
                violations: vec![violation],
                invariants_evaluated: Vec::new(),
                started_at,
                completed_at: Utc::now(),
                duration_ms: clock.elapsed().as_millis() as u64,
                report_hash: hash,
            };
        }

        let mut violations: Vec<InvariantViolation> = Vec::new();
        let mut evaluated: Vec<String> = Vec::new();

        for invariant in invariants_for_point(enforcement_point) {
            evaluated.push(invariant.invariant_id.to_string());

            let verdict = self.dispatch(invariant, context);
            let (passed, reason) = match verdict {
                Ok(outcome) => outcome,
                // An error inside an evaluator is itself a violation
                Err(err) => (false, Some(format!("Evaluation error: {err}"))),
            };

            if !passed {
                let description =
                    reason.unwrap_or_else(|| invariant.description.to_string());
                violations.push(InvariantViolation::new(
                    invariant.invariant_id,
                    invariant.class,
                    enforcement_point,
                    artifact_id,
                    artifact_type,
                    description,
                    json!({ "invariant_name": invariant.name }),
                ));
                if self.fail_mode == FailMode::HardFail {
                    warn!(
                        invariant = invariant.invariant_id,
                        point = enforcement_point.as_str(),
                        artifact = artifact_id,
                        "hard fail"
                    );
                    break;
                }
            }
        }

        let result = if violations.is_empty() {
            EvaluationResult::Pass
        } else {
            EvaluationResult::Fail
        };
        let hash = report_hash(&report_id, artifact_id, result, violations.len());
        let report = EvaluationReport {
            report_id,
            enforcement_point,
            artifact_id: artifact_id.to_string(),
            artifact_type: artifact_type.to_string(),
            result,
            violations,
            invariants_evaluated: evaluated,
            started_at,
            completed_at: Utc::now(),
            duration_ms: clock.elapsed().as_millis() as u64,
            report_hash: hash,
        };
        info!(
            point = enforcement_point.as_str(),
            artifact = artifact_id,
            result = report.result.as_str(),
            violations = report.violations.len(),
            "lint evaluation complete"
        );
        report
    }

    fn dispatch(&self, invariant: &InvariantDefinition, context: &LintContext) -> Verdict {
        match invariant.class {
            InvariantClass::Structural => self.eval_structural(invariant, context),
            InvariantClass::Semantic => self.eval_semantic(invariant, context),
            InvariantClass::CrossArtifact => self.eval_cross_artifact(invariant, context),
            InvariantClass::Temporal => self.eval_temporal(invariant, context),
            InvariantClass::Authority => self.eval_authority(invariant, context),
            InvariantClass::Finality => self.eval_finality(invariant, context),
            InvariantClass::Training => self.eval_training(invariant, context),
            InvariantClass::Platform => self.eval_platform(invariant, context),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CLASS-SPECIFIC EVALUATORS
    // ═══════════════════════════════════════════════════════════════════════════

    fn eval_structural(&self, invariant: &InvariantDefinition, context: &LintContext) -> Verdict {
        match invariant.invariant_id {
            "S-INV-001" => {
                let Some(pac) = &context.pac else {
                    return Ok((false, Some("PAC not provided in context".to_string())));
                };
                for field in ["pac_id", "issuer", "target"] {
                    if field_missing(pac, field) {
                        return Ok((false, Some(format!("Missing required PAC field: {field}"))));
                    }
                }
                Ok((true, None))
            }
            "S-INV-002" => Ok((
                context.wrap.is_some(),
                Some("WRAP not provided in context".to_string()),
            )),
            "S-INV-003" => Ok((
                context.ber.is_some(),
                Some("BER not provided in context".to_string()),
            )),
            "S-INV-004" => {
                let Some(pac) = &context.pac else {
                    return Ok((false, Some("PAC not provided in context".to_string())));
                };
                if field_missing(pac, "execution_mode") {
                    return Ok((false, Some("Missing PAC field: execution_mode".to_string())));
                }
                Ok((true, None))
            }
            "S-INV-005" => {
                let Some(wrap) = &context.wrap else {
                    return Ok((false, Some("WRAP not provided in context".to_string())));
                };
                let required = ["proof", "decision", "outcome", "attestation"];
                let missing: Vec<&str> = required
                    .iter()
                    .filter(|block| wrap.get(**block).is_none())
                    .copied()
                    .collect();
                if !missing.is_empty() {
                    return Ok((
                        false,
                        Some(format!("Missing WRAP blocks: {}", missing.join(", "))),
                    ));
                }
                Ok((true, None))
            }
            _ => Ok((true, None)),
        }
    }

    fn eval_semantic(&self, invariant: &InvariantDefinition, context: &LintContext) -> Verdict {
        match invariant.invariant_id {
            "M-INV-001" => {
                let mode = context
                    .pac
                    .as_ref()
                    .and_then(|pac| pac.get("execution_mode"))
                    .and_then(Value::as_str);
                match mode {
                    Some("PARALLEL") | Some("SEQUENTIAL") => Ok((true, None)),
                    other => Ok((
                        false,
                        Some(format!("Invalid execution_mode: {other:?}")),
                    )),
                }
            }
            "M-INV-002" => {
                const VALID: [&str; 4] = ["PENDING", "ACKNOWLEDGED", "REJECTED", "TIMEOUT"];
                for ack in &context.acks {
                    if !VALID.contains(&ack.state.as_str()) {
                        return Ok((
                            false,
                            Some(format!("Invalid ACK state: {}", ack.state)),
                        ));
                    }
                }
                Ok((true, None))
            }
            "M-INV-003" => {
                let finality = context
                    .ber
                    .as_ref()
                    .and_then(|ber| ber.get("ber_finality"))
                    .and_then(Value::as_str);
                match finality {
                    Some("FINAL") | Some("PROVISIONAL") => Ok((true, None)),
                    other => Ok((false, Some(format!("Invalid ber_finality: {other:?}")))),
                }
            }
            _ => Ok((true, None)),
        }
    }

    fn eval_cross_artifact(
        &self,
        invariant: &InvariantDefinition,
        context: &LintContext,
    ) -> Verdict {
        match invariant.invariant_id {
            "X-INV-001" => {
                let pac_id = context
                    .wrap
                    .as_ref()
                    .and_then(|wrap| wrap.get("pac_id"))
                    .and_then(Value::as_str);
                if let Some(pac_id) = pac_id {
                    if !context.known_pacs.is_empty() && !context.known_pacs.contains(pac_id) {
                        return Ok((
                            false,
                            Some(format!("WRAP references unknown PAC: {pac_id}")),
                        ));
                    }
                }
                Ok((true, None))
            }
            "X-INV-002" => {
                if context.valid_wrap_hashes.is_empty() {
                    return Ok((true, None));
                }
                let hashes = context
                    .ber
                    .as_ref()
                    .and_then(|ber| ber.get("wrap_hash_set"))
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let invalid: Vec<String> = hashes
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|h| !context.valid_wrap_hashes.contains(*h))
                    .map(String::from)
                    .collect();
                if !invalid.is_empty() {
                    return Ok((
                        false,
                        Some(format!("BER references invalid WRAPs: {invalid:?}")),
                    ));
                }
                Ok((true, None))
            }
            "X-INV-003" => {
                if context.registered_gids.is_empty() {
                    return Ok((true, None));
                }
                for ack in &context.acks {
                    if !context.registered_gids.contains(&ack.agent_gid) {
                        return Ok((
                            false,
                            Some(format!("ACK from unregistered agent: {}", ack.agent_gid)),
                        ));
                    }
                }
                Ok((true, None))
            }
            _ => Ok((true, None)),
        }
    }

    fn eval_temporal(&self, invariant: &InvariantDefinition, context: &LintContext) -> Verdict {
        match invariant.invariant_id {
            "T-INV-001" => {
                let agent_gid = context
                    .wrap
                    .as_ref()
                    .and_then(|wrap| wrap.get("agent_gid"))
                    .and_then(Value::as_str);
                if let Some(gid) = agent_gid {
                    let acked = context
                        .acks
                        .iter()
                        .any(|ack| ack.agent_gid == gid && ack.state == "ACKNOWLEDGED");
                    if !acked {
                        return Ok((
                            false,
                            Some(format!("WRAP submitted without prior ACK from {gid}")),
                        ));
                    }
                }
                Ok((true, None))
            }
            "T-INV-002" => match context.wraps_complete {
                Some(false) => Ok((
                    false,
                    Some("BER issued before all WRAPs collected".to_string()),
                )),
                _ => Ok((true, None)),
            },
            "T-INV-003" => match context.rg01_passed {
                Some(false) => Ok((false, Some("BER issued before RG-01 PASS".to_string()))),
                _ => Ok((true, None)),
            },
            "T-INV-004" => match context.latency_eligible {
                Some(false) => Ok((false, Some("ACK latency exceeds threshold".to_string()))),
                _ => Ok((true, None)),
            },
            _ => Ok((true, None)),
        }
    }

    fn eval_authority(&self, invariant: &InvariantDefinition, context: &LintContext) -> Verdict {
        match invariant.invariant_id {
            "A-INV-001" => {
                if let (Some(gid), Some(lane)) = (&context.agent_gid, &context.requested_lane) {
                    if let Some(authorized) = context.authorized_lanes.get(gid) {
                        if !authorized.eq_ignore_ascii_case(lane) && authorized != "ALL" {
                            return Ok((
                                false,
                                Some(format!("Cross-lane violation: {gid} in {lane}")),
                            ));
                        }
                    }
                }
                Ok((true, None))
            }
            "A-INV-002" => {
                if let Some(gid) = &context.agent_gid {
                    if !context.registered_gids.is_empty()
                        && !context.registered_gids.contains(gid)
                    {
                        return Ok((false, Some(format!("Unregistered identity: {gid}"))));
                    }
                }
                Ok((true, None))
            }
            "A-INV-003" => {
                if context.agent_mode.as_deref() == Some("NON_EXECUTING")
                    && context.has_code_changes
                {
                    let gid = context.agent_gid.as_deref().unwrap_or("unknown");
                    return Ok((
                        false,
                        Some(format!("NON_EXECUTING identity {gid} performed code changes")),
                    ));
                }
                Ok((true, None))
            }
            "A-INV-004" => {
                if context.implicit_activation {
                    return Ok((
                        false,
                        Some("Implicit agent activation detected".to_string()),
                    ));
                }
                Ok((true, None))
            }
            "A-INV-005" => {
                if let (Some(gid), Some(name)) = (&context.agent_gid, &context.agent_name) {
                    let registry = crate::identity::registry();
                    let identity = registry.resolve(gid)?;
                    if &identity.display_role != name {
                        return Ok((
                            false,
                            Some(format!(
                                "Agent name mismatch: {name} != {} for {gid}",
                                identity.display_role
                            )),
                        ));
                    }
                }
                Ok((true, None))
            }
            _ => Ok((true, None)),
        }
    }

    fn eval_finality(&self, invariant: &InvariantDefinition, context: &LintContext) -> Verdict {
        match invariant.invariant_id {
            "F-INV-001" => match context.all_acks_received {
                Some(false) => Ok((
                    false,
                    Some("BER issued without all required ACKs".to_string()),
                )),
                _ => Ok((true, None)),
            },
            "F-INV-002" => match context.all_wraps_valid {
                Some(false) => Ok((false, Some("BER issued with invalid WRAPs".to_string()))),
                _ => Ok((true, None)),
            },
            "F-INV-003" => {
                let finality = context
                    .ber
                    .as_ref()
                    .and_then(|ber| ber.get("ber_finality"))
                    .and_then(Value::as_str);
                if finality != Some("FINAL") {
                    return Ok((
                        false,
                        Some(format!("Settlement requires BER FINAL, got {finality:?}")),
                    ));
                }
                Ok((true, None))
            }
            "F-INV-004" => Ok((
                context.ledger_committed,
                Some("Settlement requires ledger commit attestation".to_string()),
            )),
            "F-INV-005" => Ok((
                context.settlement_verdict_present,
                Some("Settlement readiness verdict required before BER FINAL".to_string()),
            )),
            "F-INV-006" => Ok((
                context.closure_emitted,
                Some("Finality seal requires emitted closure".to_string()),
            )),
            _ => Ok((true, None)),
        }
    }

    fn eval_training(&self, invariant: &InvariantDefinition, context: &LintContext) -> Verdict {
        match invariant.invariant_id {
            "C-INV-001" => Ok((
                !context.training_signals.is_empty(),
                Some("No training signals present (minimum 1 required)".to_string()),
            )),
            "C-INV-002" => {
                for observation in &context.training_signals {
                    if observation.trim().len() < 10 {
                        return Ok((
                            false,
                            Some("Training signal observation is empty or generic".to_string()),
                        ));
                    }
                }
                Ok((true, None))
            }
            "C-INV-003" => Ok((
                context.positive_closure.is_some(),
                Some("No positive closure present".to_string()),
            )),
            "C-INV-004" => {
                let Some(closure) = &context.positive_closure else {
                    return Ok((false, Some("No positive closure present".to_string())));
                };
                for field in ["scope_complete", "no_violations", "ready_for_next_stage"] {
                    if closure.get(field).and_then(Value::as_bool) != Some(true) {
                        return Ok((
                            false,
                            Some(format!("Positive closure missing or invalid: {field}")),
                        ));
                    }
                }
                Ok((true, None))
            }
            _ => Ok((true, None)),
        }
    }

    fn eval_platform(&self, invariant: &InvariantDefinition, context: &LintContext) -> Verdict {
        match invariant.invariant_id {
            "INV-LINT-PLAT-001" => match context.runtime_ack_valid {
                Some(false) => Ok((false, Some("Runtime ACK missing or invalid".to_string()))),
                _ => Ok((true, None)),
            },
            "INV-LINT-PLAT-002" => {
                if context.barrier_released == Some(false) || !context.missing_acks.is_empty() {
                    return Ok((
                        false,
                        Some(format!(
                            "Agent execution without ACK: missing {:?}",
                            context.missing_acks
                        )),
                    ));
                }
                Ok((true, None))
            }
            "INV-LINT-PLAT-003" => match context.lint_validated {
                Some(false) => Ok((
                    false,
                    Some("UI render of non-lint-validated state".to_string()),
                )),
                _ => Ok((true, None)),
            },
            "INV-LINT-PLAT-004" => match context.api_lint_pass {
                Some(false) => Ok((false, Some("API admission without lint PASS".to_string()))),
                _ => Ok((true, None)),
            },
            "INV-LINT-PLAT-005" => match context.deterministic_order {
                Some(false) => Ok((
                    false,
                    Some("Non-deterministic orchestration order".to_string()),
                )),
                _ => Ok((true, None)),
            },
            _ => Ok((true, None)),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONVENIENCE METHODS PER ENFORCEMENT POINT
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn evaluate_pac_admission(
        &self,
        pac_id: &str,
        pac_data: Value,
        acks: Vec<AckState>,
    ) -> EvaluationReport {
        let context = LintContext {
            pac: Some(pac_data),
            acks,
            ..Default::default()
        };
        self.evaluate(EnforcementPoint::PacAdmission, pac_id, "PAC", &context)
    }

    pub fn evaluate_wrap_ingestion(
        &self,
        wrap_id: &str,
        wrap_data: Value,
        acks: Vec<AckState>,
        known_pacs: BTreeSet<String>,
        training_signals: Vec<String>,
        positive_closure: Option<Value>,
    ) -> EvaluationReport {
        let agent_gid = wrap_data
            .get("agent_gid")
            .and_then(Value::as_str)
            .map(String::from);
        let context = LintContext {
            wrap: Some(wrap_data),
            acks,
            known_pacs,
            agent_gid,
            training_signals,
            positive_closure,
            ..Default::default()
        };
        self.evaluate(EnforcementPoint::WrapIngestion, wrap_id, "WRAP", &context)
    }

    pub fn evaluate_ber_eligibility(
        &self,
        ber_id: &str,
        ber_data: Value,
        all_acks_received: bool,
        all_wraps_valid: bool,
        rg01_passed: bool,
    ) -> EvaluationReport {
        let context = LintContext {
            ber: Some(ber_data),
            all_acks_received: Some(all_acks_received),
            all_wraps_valid: Some(all_wraps_valid),
            wraps_complete: Some(all_wraps_valid),
            rg01_passed: Some(rg01_passed),
            ..Default::default()
        };
        self.evaluate(EnforcementPoint::BerEligibility, ber_id, "BER", &context)
    }

    /// Gate for the AGENT_EXECUTION checkpoint: execution may not cross it
    /// until the barrier has every required ACK.
    pub fn evaluate_agent_execution(
        &self,
        pac_id: &str,
        barrier: &AgentAckBarrier,
    ) -> EvaluationReport {
        let context = LintContext {
            barrier_released: Some(barrier.is_released()),
            missing_acks: barrier.missing_acks(),
            ..Default::default()
        };
        self.evaluate(EnforcementPoint::AgentExecution, pac_id, "PAC", &context)
    }
}

fn field_missing(value: &Value, field: &str) -> bool {
    match value.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
