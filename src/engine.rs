// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — engine.rs
// Governance Kernel: Orchestration Engine
// Governance Tier: LAW
// Invariant: NO_DISPATCH_WITHOUT_VALIDATION | SYNCHRONOUS_BER | COMPLETE_OR_INVALIDATE
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! Single entry point of the governance loop.
//!
//! `dispatch` admits a PAC only after schema validation AND a lint PASS at
//! the PAC_ADMISSION checkpoint; invalid PACs are REJECTED and never reach
//! an executor. `receive_wrap` is synchronous and atomic from the caller's
//! viewpoint: it either returns a PDO proving the complete chain (BER
//! issued → BER emitted → POSITIVE_CLOSURE → PDO registered) or it
//! invalidates the session and re-raises. No half-state is observable
//! externally.
//!
//! Each session carries its own checkpoint tracker and agent ACK barrier.
//! The lint engine is consulted at PAC_ADMISSION, AGENT_EXECUTION,
//! WRAP_INGESTION, REVIEW_GATES, and BER_ELIGIBILITY; the POSITIVE_CLOSURE
//! artifact records how many flow checkpoints the tracker actually
//! completed, never an assumed total.
//!
//! Per-PAC operations are serialized by a per-session lock; distinct PACs
//! proceed in parallel. Lock order: session → shard → index.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::authority::{assert_ber_authority, assert_not_self_approval};
use crate::closure::{ClosureBuilder, ClosureDecision, PositiveClosure};
use crate::error::{GovernanceError, GovernanceResult};
use crate::events::{rejection_event, EventSink, EventType, GovernanceEvent, TracingSink};
use crate::identity::IdentityRegistry;
use crate::lint::{
    AckState, AgentAck, AgentAckBarrier, CheckpointTracker, EnforcementPoint, EvaluationReport,
    FlowCheckpoint, LintContext, LintEngine,
};
use crate::pac::{BerStatus, Pac, PacValidationResult, PacValidator, WrapStatus};
use crate::pdo::{PdoArtifact, PdoFactory, PdoOutcomeStatus};
use crate::session::{BerArtifact, SessionRecord, SessionSnapshot, SessionState};
use crate::store::{PdoEntry, PdoStore, PdoWrite, StoreConfig};
use crate::wrap::ValidatedWrap;

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION AND RESULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Engine policy knobs.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// FAILED WRAPs map to CORRECTIVE by default; set to map them to REJECT.
    pub failed_wrap_rejects: bool,
}

/// Status of a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchStatus {
    Dispatched,
    Rejected,
}

/// Result of a PAC dispatch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub status: DispatchStatus,
    pub pac_id: String,
    pub target_identity: Option<String>,
    pub validation_result: PacValidationResult,
    pub error: Option<String>,
    pub dispatched_at: Option<DateTime<Utc>>,
}

impl DispatchResult {
    pub fn success(&self) -> bool {
        self.status == DispatchStatus::Dispatched
    }

    pub fn rejected(&self) -> bool {
        self.status == DispatchStatus::Rejected
    }
}

/// One session's governance state: the record plus the lint-flow tracker
/// and agent ACK barrier that gate it. Guarded by one per-PAC lock.
struct SessionSlot {
    record: SessionRecord,
    tracker: CheckpointTracker,
    barrier: AgentAckBarrier,
    dispatch_lane: String,
}

fn advance_checkpoint(
    pac_id: &str,
    tracker: &mut CheckpointTracker,
    checkpoint: FlowCheckpoint,
) -> GovernanceResult<()> {
    tracker
        .complete(checkpoint)
        .map_err(|reason| GovernanceError::SessionInvalid {
            pac_id: pac_id.to_string(),
            reason,
        })
}

fn lint_violation_summary(checkpoint: &str, report: &EvaluationReport) -> String {
    let ids: Vec<&str> = report
        .violations
        .iter()
        .map(|v| v.invariant_id.as_str())
        .collect();
    format!("{checkpoint} lint FAIL: {ids:?}")
}

fn lint_failure(pac_id: &str, checkpoint: &str, report: &EvaluationReport) -> GovernanceError {
    GovernanceError::SessionInvalid {
        pac_id: pac_id.to_string(),
        reason: lint_violation_summary(checkpoint, report),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

pub struct OrchestrationEngine {
    registry: IdentityRegistry,
    validator: PacValidator,
    lint: LintEngine,
    store: PdoStore,
    sink: Arc<dyn EventSink>,
    config: EngineConfig,
    sessions: Mutex<HashMap<String, Arc<Mutex<SessionSlot>>>>,
}

impl Default for OrchestrationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl OrchestrationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_parts(
            IdentityRegistry::canonical(),
            LintEngine::new(),
            PdoStore::new(StoreConfig::default()),
            Arc::new(TracingSink),
            config,
        )
    }

    /// Explicit-dependency constructor for test isolation and embedding.
    pub fn with_parts(
        registry: IdentityRegistry,
        lint: LintEngine,
        store: PdoStore,
        sink: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            validator: PacValidator::new(),
            lint,
            store,
            sink,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn lint(&self) -> &LintEngine {
        &self.lint
    }

    pub fn store(&self) -> &PdoStore {
        &self.store
    }

    fn emit(&self, event: GovernanceEvent) {
        self.sink.emit(&event);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DISPATCH
    // ═══════════════════════════════════════════════════════════════════════════

    /// Dispatch a PAC to its target executor.
    ///
    /// The schema is validated BEFORE dispatch, then the PAC crosses the
    /// PAC_ADMISSION lint checkpoint. A rejection on either gate creates no
    /// session; the missing sections or violations are enumerated back to
    /// the caller.
    pub fn dispatch(&self, pac: &Pac) -> DispatchResult {
        let pac_id = pac.pac_id().to_string();
        self.emit(GovernanceEvent::new(EventType::PacReceived, &pac_id, json!({})));

        let validation_result = self.validator.validate(pac);
        if !validation_result.valid {
            let missing = validation_result.missing_section_names();
            warn!(pac_id = %pac_id, missing = ?missing, "pac rejected");
            self.emit(rejection_event(&pac_id, &missing, "PAC schema validation failed"));
            return DispatchResult {
                status: DispatchStatus::Rejected,
                pac_id,
                target_identity: None,
                validation_result,
                error: Some("PAC schema validation failed".to_string()),
                dispatched_at: None,
            };
        }

        // PAC_ADMISSION checkpoint. Single-target dispatch executes one
        // agent, so the admission payload declares a sequential model.
        let admission = self.lint.evaluate_pac_admission(
            &pac_id,
            json!({
                "pac_id": pac.header.pac_id,
                "issuer": pac.header.issuer,
                "target": pac.header.target,
                "execution_mode": "SEQUENTIAL",
            }),
            vec![],
        );
        if !admission.is_pass() {
            let reason = lint_violation_summary("PAC_ADMISSION", &admission);
            self.emit(rejection_event(&pac_id, &[], &reason));
            return DispatchResult {
                status: DispatchStatus::Rejected,
                pac_id,
                target_identity: None,
                validation_result,
                error: Some(reason),
                dispatched_at: None,
            };
        }

        // Schema valid — resolve and authorize the dispatch target
        let dispatch = pac.dispatch.as_ref().expect("validated dispatch section");
        let resolved = self.registry.validate_identity(
            &dispatch.target_identity,
            dispatch.mode.as_str(),
            &dispatch.lane,
        );
        let target = match resolved {
            Ok(identity) => identity.identity_id.clone(),
            Err(err) => {
                self.emit(rejection_event(&pac_id, &[], &err.to_string()));
                return DispatchResult {
                    status: DispatchStatus::Rejected,
                    pac_id,
                    target_identity: None,
                    validation_result,
                    error: Some(err.to_string()),
                    dispatched_at: None,
                };
            }
        };

        let mut record = SessionRecord::new(&pac_id);
        // PAC_RECEIVED → PAC_DISPATCHED is always legal from a fresh record
        record
            .transition_to(SessionState::PacDispatched)
            .expect("fresh session dispatch transition");
        let dispatched_at = record.dispatched_at;

        // Flow checkpoints crossed by this dispatch, in mandatory order:
        // admission lint passed above; an admission PASS implies the lint
        // runtime preconditions held (an inactive runtime fabricates
        // RUNTIME-001), which is the engine's runtime ACK; dispatching is
        // the activation of the declared target agent.
        let mut tracker = CheckpointTracker::new(&pac_id);
        tracker
            .complete(FlowCheckpoint::PacAdmission)
            .expect("fresh checkpoint sequence");
        tracker
            .complete(FlowCheckpoint::RuntimeActivation)
            .expect("fresh checkpoint sequence");
        tracker
            .complete(FlowCheckpoint::RuntimeAckCollection)
            .expect("fresh checkpoint sequence");
        tracker
            .complete(FlowCheckpoint::AgentActivation)
            .expect("fresh checkpoint sequence");

        let barrier = AgentAckBarrier::new(&pac_id, vec![target.clone()]);
        self.sessions.lock().insert(
            pac_id.clone(),
            Arc::new(Mutex::new(SessionSlot {
                record,
                tracker,
                barrier,
                dispatch_lane: dispatch.lane.clone(),
            })),
        );

        info!(pac_id = %pac_id, target = %target, "pac dispatched");
        self.emit(GovernanceEvent::new(
            EventType::PacDispatched,
            &pac_id,
            json!({ "target": target, "status": "AWAITING_WRAP" }),
        ));

        DispatchResult {
            status: DispatchStatus::Dispatched,
            pac_id,
            target_identity: Some(target),
            validation_result,
            error: None,
            dispatched_at,
        }
    }

    /// Record an agent's explicit activation ACK for a dispatched PAC.
    /// When the barrier releases, the AGENT_ACK_COLLECTION checkpoint
    /// completes.
    pub fn acknowledge_agent(&self, pac_id: &str, agent_gid: &str) -> GovernanceResult<()> {
        let identity = self.registry.resolve(agent_gid)?;
        let role = identity.display_role.clone();
        let slot_arc = self.session_handle(pac_id)?;
        let mut slot = slot_arc.lock();

        let lane = slot.dispatch_lane.clone();
        slot.barrier.add_ack(AgentAck::new(pac_id, agent_gid, role, lane));
        if slot.barrier.is_released()
            && slot.tracker.next_checkpoint() == Some(FlowCheckpoint::AgentAckCollection)
        {
            advance_checkpoint(pac_id, &mut slot.tracker, FlowCheckpoint::AgentAckCollection)?;
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // WRAP → BER → CLOSURE → PDO
    // ═══════════════════════════════════════════════════════════════════════════

    /// Receive a WRAP and synchronously drive the session through BER
    /// issuance, BER emission, POSITIVE_CLOSURE, and PDO registration.
    ///
    /// Returns the registered PDO. Any failure transitions the session to
    /// SESSION_INVALID and re-raises; on failure the store holds no PDO for
    /// this PAC.
    pub fn receive_wrap(
        &self,
        pac_id: &str,
        wrap: &ValidatedWrap,
        from_identity: &str,
    ) -> GovernanceResult<PdoArtifact> {
        let slot_arc = self.session_handle(pac_id)?;
        let mut slot = slot_arc.lock();

        match self.drive_wrap_to_pdo(&mut slot, pac_id, wrap, from_identity) {
            Ok(pdo) => Ok(pdo),
            Err(err) => {
                // Fail-closed: invalidate before re-raising. A session that
                // already reached a terminal state stays as it is.
                if !slot.record.is_terminal() {
                    let _ = slot.record.invalidate(err.to_string());
                }
                self.emit(GovernanceEvent::new(
                    EventType::SessionInvalid,
                    pac_id,
                    json!({ "reason": err.to_string() }),
                ));
                Err(err)
            }
        }
    }

    fn drive_wrap_to_pdo(
        &self,
        slot: &mut SessionSlot,
        pac_id: &str,
        wrap: &ValidatedWrap,
        from_identity: &str,
    ) -> GovernanceResult<PdoArtifact> {
        if wrap.pac_id() != pac_id {
            return Err(GovernanceError::WrapValidation {
                block: "HEADER".to_string(),
                reason: format!("WRAP references PAC {}, expected {pac_id}", wrap.pac_id()),
            });
        }
        self.registry.resolve(from_identity)?;

        // The attestation block is the author's signed acknowledgment; feed
        // it to the barrier. ACKs from undeclared agents are ignored there.
        let author = wrap.header.issuer_identity.clone();
        if let Ok(identity) = self.registry.resolve(&author) {
            slot.barrier.add_ack(AgentAck::new(
                pac_id,
                &author,
                identity.display_role.clone(),
                wrap.header.execution_lane.clone(),
            ));
        }

        // (a) WRAP_RECEIVED, then immediately BER_REQUIRED
        let wrap_hash = wrap.wrap_hash()?;
        slot.record.transition_to(SessionState::WrapReceived)?;
        slot.record.record_wrap(
            wrap.outcome.status,
            wrap.wrap_id().to_string(),
            wrap_hash.clone(),
            from_identity.to_string(),
        );
        self.emit(GovernanceEvent::new(
            EventType::WrapReceived,
            pac_id,
            json!({ "status": wrap.outcome.status.as_str(), "from": from_identity }),
        ));
        slot.record.transition_to(SessionState::BerRequired)?;

        // (c) authority: sole issuer, and never the WRAP author
        let orchestrator = self.registry.orchestrator();
        assert_ber_authority(orchestrator)?;
        assert_not_self_approval(&orchestrator.identity_id, &author)?;

        // AGENT_ACK_COLLECTION / AGENT_EXECUTION: the barrier must hold
        // every required ACK before execution may be accepted
        if slot.barrier.is_released()
            && slot.tracker.next_checkpoint() == Some(FlowCheckpoint::AgentAckCollection)
        {
            advance_checkpoint(pac_id, &mut slot.tracker, FlowCheckpoint::AgentAckCollection)?;
        }
        let execution_gate = self.lint.evaluate_agent_execution(pac_id, &slot.barrier);
        if !execution_gate.is_pass() {
            return Err(lint_failure(pac_id, "AGENT_EXECUTION", &execution_gate));
        }
        advance_checkpoint(pac_id, &mut slot.tracker, FlowCheckpoint::AgentExecution)?;

        // WRAP_INGESTION: cross-artifact, temporal, and training checks over
        // the actual WRAP payload and the barrier's ACK set
        let mut wrap_data = wrap.payload()?;
        wrap_data["pac_id"] = json!(pac_id);
        wrap_data["agent_gid"] = json!(author);
        let acks: Vec<AckState> = slot
            .barrier
            .received_acks
            .values()
            .map(|ack| AckState {
                agent_gid: ack.gid.clone(),
                state: "ACKNOWLEDGED".to_string(),
            })
            .collect();
        let ingestion = self.lint.evaluate_wrap_ingestion(
            wrap.wrap_id(),
            wrap_data,
            acks,
            BTreeSet::from([pac_id.to_string()]),
            vec![format!(
                "{}: {}",
                wrap.decision.action_summary, wrap.decision.rationale
            )],
            Some(json!({
                "scope_complete": wrap.is_complete(),
                "no_violations": wrap.outcome.blockers.is_empty(),
                "ready_for_next_stage": wrap.outcome.blockers.is_empty(),
            })),
        );
        if !ingestion.is_pass() {
            return Err(lint_failure(pac_id, "WRAP_INGESTION", &ingestion));
        }

        // REVIEW_GATES: the per-PAC session lock serializes this flow, so
        // the orchestration order it reports is deterministic
        let review = self.lint.evaluate(
            EnforcementPoint::ReviewGates,
            pac_id,
            "PAC",
            &LintContext {
                deterministic_order: Some(true),
                ..Default::default()
            },
        );
        if !review.is_pass() {
            return Err(lint_failure(pac_id, "REVIEW_GATES", &review));
        }
        advance_checkpoint(pac_id, &mut slot.tracker, FlowCheckpoint::ReviewGates)?;

        // (b) WRAP outcome → BER decision
        let decision = self.map_wrap_to_ber(wrap.outcome.status);

        // BER_ELIGIBILITY checkpoint before issuance
        let ber_id = format!("BER-{pac_id}");
        let eligibility = self.lint.evaluate_ber_eligibility(
            &ber_id,
            json!({ "ber_finality": "PROVISIONAL", "wrap_hash_set": [wrap_hash.clone()] }),
            slot.barrier.is_released(),
            true,
            true,
        );
        if !eligibility.is_pass() {
            return Err(lint_failure(pac_id, "BER_ELIGIBILITY", &eligibility));
        }
        advance_checkpoint(pac_id, &mut slot.tracker, FlowCheckpoint::BerEligibility)?;

        // (d) issue BER
        slot.record.transition_to(SessionState::BerIssued)?;
        slot.record.record_ber(decision);
        self.emit(GovernanceEvent::new(
            EventType::BerIssued,
            pac_id,
            json!({ "decision": decision.as_str(), "issuer": orchestrator.identity_id }),
        ));

        // (e) emit BER externally
        slot.record.transition_to(SessionState::BerEmitted)?;
        let ber_artifact = BerArtifact {
            ber_id: ber_id.clone(),
            pac_id: pac_id.to_string(),
            decision,
            issuer: orchestrator.identity_id.clone(),
            issued_at: slot.record.ber_issued_at.unwrap_or_else(Utc::now),
            emitted_at: slot.record.ber_emitted_at.unwrap_or_else(Utc::now),
            wrap_status: wrap.outcome.status,
            session_state: SessionState::BerEmitted,
        };
        slot.record.record_emission(ber_artifact.clone());
        self.emit(GovernanceEvent::new(
            EventType::BerEmitted,
            pac_id,
            json!({ "decision": decision.as_str(), "ber_id": ber_id }),
        ));

        // (f) POSITIVE_CLOSURE before PDO — asserting exactly the number of
        // flow checkpoints this session's tracker actually completed
        let checkpoints_resolved = slot.tracker.completed.len() as u32;
        let closure = self.build_closure(pac_id, &ber_id, &wrap_hash, decision, checkpoints_resolved);
        slot.record.record_closure(closure.clone());
        self.emit(GovernanceEvent::new(
            EventType::PositiveClosureEmitted,
            pac_id,
            json!({
                "closure_id": closure.closure_id,
                "decision": closure.decision.as_str(),
                "wrap_count": closure.wrap_count(),
                "checkpoints_resolved": checkpoints_resolved,
            }),
        ));

        // (g) construct and register the PDO
        let outcome_status = match decision {
            BerStatus::Approve => PdoOutcomeStatus::Accepted,
            BerStatus::Corrective => PdoOutcomeStatus::Corrective,
            BerStatus::Reject => PdoOutcomeStatus::Rejected,
        };
        let wrap_payload = wrap.payload()?;
        let ber_payload = serde_json::to_value(&ber_artifact)?;
        let pdo = PdoFactory::create(
            pac_id,
            wrap.wrap_id(),
            &wrap_payload,
            &ber_id,
            &ber_payload,
            outcome_status.as_str(),
            orchestrator,
            slot.record.wrap_received_at,
            slot.record.ber_issued_at,
        )?;

        self.store.store(PdoWrite {
            pdo_id: pdo.pdo_id.clone(),
            pac_id: pac_id.to_string(),
            agent_gids: vec![author],
            ber_status: decision.as_str().to_string(),
            wrap_hashes: vec![wrap_hash],
        })?;
        slot.record.record_pdo(pdo.clone());
        self.emit(GovernanceEvent::new(
            EventType::PdoEmitted,
            pac_id,
            json!({ "pdo_id": pdo.pdo_id, "pdo_hash": pdo.pdo_hash }),
        ));

        // (h) close the loop
        slot.record.complete()?;
        info!(pac_id = %pac_id, pdo_id = %pdo.pdo_id, "loop closed");
        self.emit(GovernanceEvent::new(
            EventType::SessionComplete,
            pac_id,
            json!({ "pdo_id": pdo.pdo_id }),
        ));

        Ok(pdo)
    }

    fn map_wrap_to_ber(&self, status: WrapStatus) -> BerStatus {
        match status {
            WrapStatus::Complete => BerStatus::Approve,
            WrapStatus::Partial => BerStatus::Corrective,
            WrapStatus::Failed => {
                if self.config.failed_wrap_rejects {
                    BerStatus::Reject
                } else {
                    BerStatus::Corrective
                }
            }
        }
    }

    fn build_closure(
        &self,
        pac_id: &str,
        ber_id: &str,
        wrap_hash: &str,
        decision: BerStatus,
        checkpoints_resolved: u32,
    ) -> PositiveClosure {
        let closure_decision = match decision {
            BerStatus::Approve => ClosureDecision::Clean,
            BerStatus::Corrective => ClosureDecision::Corrective,
            BerStatus::Reject => ClosureDecision::Invalid,
        };
        ClosureBuilder::new(pac_id, ber_id)
            .add_wrap_hash(wrap_hash)
            .final_state("SESSION_COMPLETE")
            .invariants_verified(true)
            .checkpoints_resolved(checkpoints_resolved)
            .decision(closure_decision)
            .build()
    }

    /// Issue a BER under an explicit identity. Authority is checked before
    /// any state is touched; an unauthorized attempt invalidates the session.
    pub fn issue_ber_as(
        &self,
        pac_id: &str,
        decision: BerStatus,
        issuer_id: &str,
    ) -> GovernanceResult<()> {
        let slot_arc = self.session_handle(pac_id)?;
        let mut slot = slot_arc.lock();

        let authority = self
            .registry
            .resolve(issuer_id)
            .and_then(|identity| assert_ber_authority(identity));
        if let Err(err) = authority {
            if !slot.record.is_terminal() {
                let _ = slot.record.invalidate(err.to_string());
            }
            self.emit(GovernanceEvent::new(
                EventType::SessionInvalid,
                pac_id,
                json!({ "reason": err.to_string() }),
            ));
            return Err(err);
        }

        slot.record.transition_to(SessionState::BerIssued)?;
        slot.record.record_ber(decision);
        self.emit(GovernanceEvent::new(
            EventType::BerIssued,
            pac_id,
            json!({ "decision": decision.as_str(), "issuer": issuer_id }),
        ));
        Ok(())
    }

    /// Explicitly invalidate a session (ACK-barrier timeout, external abort).
    pub fn invalidate_session(&self, pac_id: &str, reason: &str) -> GovernanceResult<()> {
        let slot_arc = self.session_handle(pac_id)?;
        let mut slot = slot_arc.lock();
        slot.record.invalidate(reason)?;
        self.emit(GovernanceEvent::new(
            EventType::SessionInvalid,
            pac_id,
            json!({ "reason": reason }),
        ));
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    fn session_handle(&self, pac_id: &str) -> GovernanceResult<Arc<Mutex<SessionSlot>>> {
        self.sessions
            .lock()
            .get(pac_id)
            .cloned()
            .ok_or_else(|| GovernanceError::UnknownSession {
                pac_id: pac_id.to_string(),
            })
    }

    pub fn get_loop_state(&self, pac_id: &str) -> Option<SessionSnapshot> {
        let slot = self.session_handle(pac_id).ok()?;
        let slot = slot.lock();
        Some(slot.record.snapshot())
    }

    pub fn is_loop_closed(&self, pac_id: &str) -> bool {
        self.get_loop_state(pac_id)
            .map(|snapshot| snapshot.loop_closed)
            .unwrap_or(false)
    }

    fn snapshots_where(&self, predicate: impl Fn(&SessionRecord) -> bool) -> Vec<SessionSnapshot> {
        let sessions = self.sessions.lock();
        let mut snapshots: Vec<SessionSnapshot> = sessions
            .values()
            .map(|slot| slot.lock())
            .filter(|slot| predicate(&slot.record))
            .map(|slot| slot.record.snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.pac_id.cmp(&b.pac_id));
        snapshots
    }

    /// All non-terminal sessions.
    pub fn open_sessions(&self) -> Vec<SessionSnapshot> {
        self.snapshots_where(|record| !record.is_terminal())
    }

    /// Sessions awaiting BER issuance.
    pub fn sessions_awaiting_ber(&self) -> Vec<SessionSnapshot> {
        self.snapshots_where(SessionRecord::awaiting_ber)
    }

    /// Sessions with a BER issued but not emitted.
    pub fn sessions_awaiting_emission(&self) -> Vec<SessionSnapshot> {
        self.snapshots_where(SessionRecord::awaiting_emission)
    }

    /// Sessions with an emitted BER but no POSITIVE_CLOSURE yet.
    pub fn sessions_awaiting_closure(&self) -> Vec<SessionSnapshot> {
        self.snapshots_where(SessionRecord::awaiting_closure)
    }

    /// Enforce that no session is parked in BER_REQUIRED.
    pub fn enforce_no_ber_required(&self) -> GovernanceResult<()> {
        let waiting = self.snapshots_where(SessionRecord::is_ber_required);
        if let Some(first) = waiting.first() {
            let pac_ids: Vec<&str> = waiting.iter().map(|s| s.pac_id.as_str()).collect();
            return Err(GovernanceError::BerNotIssued {
                pac_id: first.pac_id.clone(),
                reason: format!("Sessions awaiting BER: {pac_ids:?}"),
            });
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Store pass-throughs
    // ─────────────────────────────────────────────────────────────────────────

    /// The PDO registered for a PAC, if its loop closed.
    pub fn lookup_pdo(&self, pac_id: &str) -> Option<PdoEntry> {
        self.store.find_by_pac(pac_id).into_iter().next()
    }

    pub fn find_pdos_by_agent(&self, agent_gid: &str) -> Vec<PdoEntry> {
        self.store.find_by_agent(agent_gid)
    }

    pub fn find_pdos_by_hash(&self, content_hash: &str) -> Vec<PdoEntry> {
        self.store.find_by_hash(content_hash)
    }

    pub fn find_pdos_by_date(&self, date: &str) -> Vec<PdoEntry> {
        self.store.find_by_date(date)
    }

    pub fn validate_store_integrity(&self) -> (bool, Vec<String>) {
        self.store.validate_integrity()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS — END-TO-END SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════════
