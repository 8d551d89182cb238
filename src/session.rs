// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — session.rs
// Governance Kernel: Per-PAC Session State Machine
// Governance Tier: LAW
// Invariant: NO_TERMINAL_REENTRY | BER_REQUIRED_NON_TERMINAL | MUST_EMIT
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! One record per PAC. Transitions are mandatory and non-skippable:
//!
//! ```text
//! PAC_RECEIVED   → {PAC_DISPATCHED, REJECTED, SESSION_INVALID}
//! PAC_DISPATCHED → {EXECUTING, WRAP_RECEIVED, SESSION_INVALID}
//! EXECUTING      → {WRAP_RECEIVED, SESSION_INVALID}
//! WRAP_RECEIVED  → {BER_REQUIRED, SESSION_INVALID}
//! BER_REQUIRED   → {BER_ISSUED, SESSION_INVALID}         (non-terminal!)
//! BER_ISSUED     → {BER_EMITTED, SESSION_INVALID}        (must emit)
//! BER_EMITTED    → {SESSION_COMPLETE}                    (via closure + PDO)
//! SESSION_COMPLETE | SESSION_INVALID | REJECTED → {}     (terminal, frozen)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::closure::PositiveClosure;
use crate::error::{GovernanceError, GovernanceResult};
use crate::pac::{BerStatus, WrapStatus};
use crate::pdo::PdoArtifact;

// ═══════════════════════════════════════════════════════════════════════════════
// SESSION STATES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    PacReceived,
    PacDispatched,
    Executing,
    WrapReceived,
    /// Permanently classified non-terminal: a session can never end here.
    BerRequired,
    /// Internal only: issuance without emission never closes the loop.
    BerIssued,
    BerEmitted,
    SessionComplete,
    SessionInvalid,
    Rejected,
}

impl SessionState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionState::PacReceived => "PAC_RECEIVED",
            SessionState::PacDispatched => "PAC_DISPATCHED",
            SessionState::Executing => "EXECUTING",
            SessionState::WrapReceived => "WRAP_RECEIVED",
            SessionState::BerRequired => "BER_REQUIRED",
            SessionState::BerIssued => "BER_ISSUED",
            SessionState::BerEmitted => "BER_EMITTED",
            SessionState::SessionComplete => "SESSION_COMPLETE",
            SessionState::SessionInvalid => "SESSION_INVALID",
            SessionState::Rejected => "REJECTED",
        }
    }

    /// Terminal states admit no further transition, ever.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::SessionComplete | SessionState::SessionInvalid | SessionState::Rejected
        )
    }

    pub const fn is_valid_terminal(&self) -> bool {
        matches!(self, SessionState::SessionComplete | SessionState::Rejected)
    }

    /// Allowed targets per the transition table.
    pub fn allowed_targets(&self) -> &'static [SessionState] {
        match self {
            SessionState::PacReceived => &[
                SessionState::PacDispatched,
                SessionState::Rejected,
                SessionState::SessionInvalid,
            ],
            SessionState::PacDispatched => &[
                SessionState::Executing,
                SessionState::WrapReceived,
                SessionState::SessionInvalid,
            ],
            SessionState::Executing => {
                &[SessionState::WrapReceived, SessionState::SessionInvalid]
            }
            SessionState::WrapReceived => {
                &[SessionState::BerRequired, SessionState::SessionInvalid]
            }
            SessionState::BerRequired => &[SessionState::BerIssued, SessionState::SessionInvalid],
            SessionState::BerIssued => &[SessionState::BerEmitted, SessionState::SessionInvalid],
            SessionState::BerEmitted => &[SessionState::SessionComplete],
            SessionState::SessionComplete
            | SessionState::SessionInvalid
            | SessionState::Rejected => &[],
        }
    }

    pub fn can_transition_to(&self, target: SessionState) -> bool {
        self.allowed_targets().contains(&target)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BER ARTIFACT
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable BER artifact returned to the external caller. Existence of
/// this artifact proves emission occurred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BerArtifact {
    pub ber_id: String,
    pub pac_id: String,
    pub decision: BerStatus,
    pub issuer: String,
    pub issued_at: DateTime<Utc>,
    pub emitted_at: DateTime<Utc>,
    pub wrap_status: WrapStatus,
    pub session_state: SessionState,
}

impl BerArtifact {
    pub fn is_approved(&self) -> bool {
        self.decision == BerStatus::Approve
    }

    pub fn is_emitted(&self) -> bool {
        self.session_state == SessionState::BerEmitted
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SESSION RECORD
// ═══════════════════════════════════════════════════════════════════════════════

/// Record of a PAC session. Lives for one PAC; terminal states are frozen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub pac_id: String,
    pub state: SessionState,

    pub wrap_received: bool,
    pub wrap_status: Option<WrapStatus>,
    pub wrap_hash: Option<String>,
    pub wrap_id: Option<String>,
    pub wrap_from: Option<String>,

    pub ber_issued: bool,
    pub ber_status: Option<BerStatus>,
    pub ber_emitted: bool,
    pub ber_artifact: Option<BerArtifact>,

    pub positive_closure_emitted: bool,
    pub positive_closure: Option<PositiveClosure>,

    pub pdo_emitted: bool,
    pub pdo_artifact: Option<PdoArtifact>,

    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub wrap_received_at: Option<DateTime<Utc>>,
    pub ber_required_at: Option<DateTime<Utc>>,
    pub ber_issued_at: Option<DateTime<Utc>>,
    pub ber_emitted_at: Option<DateTime<Utc>>,
    pub closure_emitted_at: Option<DateTime<Utc>>,
    pub pdo_emitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub error: Option<String>,
}

impl SessionRecord {
    pub fn new(pac_id: impl Into<String>) -> Self {
        Self {
            pac_id: pac_id.into(),
            state: SessionState::PacReceived,
            wrap_received: false,
            wrap_status: None,
            wrap_hash: None,
            wrap_id: None,
            wrap_from: None,
            ber_issued: false,
            ber_status: None,
            ber_emitted: false,
            ber_artifact: None,
            positive_closure_emitted: false,
            positive_closure: None,
            pdo_emitted: false,
            pdo_artifact: None,
            created_at: Utc::now(),
            dispatched_at: None,
            wrap_received_at: None,
            ber_required_at: None,
            ber_issued_at: None,
            ber_emitted_at: None,
            closure_emitted_at: None,
            pdo_emitted_at: None,
            completed_at: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_ber_required(&self) -> bool {
        self.state == SessionState::BerRequired
    }

    pub fn is_ber_issued_not_emitted(&self) -> bool {
        self.state == SessionState::BerIssued && !self.ber_emitted
    }

    /// True once the full chain — WRAP, BER issued, BER emitted, closure,
    /// PDO — has been recorded.
    pub fn is_loop_closed(&self) -> bool {
        self.wrap_received
            && self.ber_issued
            && self.ber_emitted
            && self.positive_closure_emitted
            && self.pdo_emitted
    }

    pub fn awaiting_wrap(&self) -> bool {
        matches!(
            self.state,
            SessionState::PacDispatched | SessionState::Executing
        ) && !self.wrap_received
    }

    pub fn awaiting_ber(&self) -> bool {
        self.wrap_received && !self.ber_issued && !self.is_terminal()
    }

    pub fn awaiting_emission(&self) -> bool {
        self.ber_issued && !self.ber_emitted && !self.is_terminal()
    }

    pub fn awaiting_closure(&self) -> bool {
        self.ber_emitted && !self.positive_closure_emitted && !self.is_terminal()
    }

    pub fn awaiting_pdo(&self) -> bool {
        self.positive_closure_emitted && !self.pdo_emitted && !self.is_terminal()
    }

    /// Transition with full validation. Every rule of the table applies;
    /// skip attempts surface the dedicated error for the skipped gate.
    pub fn transition_to(&mut self, new_state: SessionState) -> GovernanceResult<()> {
        if self.is_terminal() {
            return Err(GovernanceError::SessionInvalid {
                pac_id: self.pac_id.clone(),
                reason: format!(
                    "Cannot transition from terminal state {}",
                    self.state.as_str()
                ),
            });
        }

        if !self.state.can_transition_to(new_state) {
            // Skipping a mandatory gate has a dedicated error kind
            if self.state == SessionState::BerRequired {
                return Err(GovernanceError::BerRequired {
                    pac_id: self.pac_id.clone(),
                });
            }
            if self.state == SessionState::BerIssued {
                return Err(GovernanceError::BerNotEmitted {
                    pac_id: self.pac_id.clone(),
                });
            }
            return Err(GovernanceError::SessionInvalid {
                pac_id: self.pac_id.clone(),
                reason: format!(
                    "Invalid transition: {} → {}",
                    self.state.as_str(),
                    new_state.as_str()
                ),
            });
        }

        self.state = new_state;

        let now = Utc::now();
        match new_state {
            SessionState::PacDispatched => self.dispatched_at = Some(now),
            SessionState::WrapReceived => self.wrap_received_at = Some(now),
            SessionState::BerRequired => self.ber_required_at = Some(now),
            SessionState::BerIssued => self.ber_issued_at = Some(now),
            SessionState::BerEmitted => {
                self.ber_emitted_at = Some(now);
                self.ber_emitted = true;
            }
            SessionState::SessionComplete => self.completed_at = Some(now),
            _ => {}
        }
        Ok(())
    }

    /// Invalidate the session. Valid from any non-terminal state; a session
    /// already in a terminal state is frozen and cannot be invalidated.
    pub fn invalidate(&mut self, reason: impl Into<String>) -> GovernanceResult<()> {
        if self.is_terminal() {
            return Err(GovernanceError::SessionInvalid {
                pac_id: self.pac_id.clone(),
                reason: format!(
                    "Cannot invalidate terminal state {}",
                    self.state.as_str()
                ),
            });
        }
        self.error = Some(reason.into());
        self.state = SessionState::SessionInvalid;
        Ok(())
    }

    /// Complete the session. Requires BER emitted AND positive closure AND
    /// PDO recorded; each premature completion path has its own error.
    pub fn complete(&mut self) -> GovernanceResult<()> {
        match self.state {
            SessionState::BerRequired => Err(GovernanceError::BerRequired {
                pac_id: self.pac_id.clone(),
            }),
            SessionState::BerIssued => Err(GovernanceError::BerNotEmitted {
                pac_id: self.pac_id.clone(),
            }),
            SessionState::BerEmitted => {
                if !self.positive_closure_emitted {
                    return Err(GovernanceError::SessionInvalid {
                        pac_id: self.pac_id.clone(),
                        reason: "POSITIVE_CLOSURE not emitted before completion".to_string(),
                    });
                }
                if !self.pdo_emitted {
                    return Err(GovernanceError::SessionInvalid {
                        pac_id: self.pac_id.clone(),
                        reason: "PDO not emitted before completion".to_string(),
                    });
                }
                self.transition_to(SessionState::SessionComplete)
            }
            other => Err(GovernanceError::SessionInvalid {
                pac_id: self.pac_id.clone(),
                reason: format!("Cannot complete session from state {}", other.as_str()),
            }),
        }
    }

    pub fn record_wrap(&mut self, status: WrapStatus, wrap_id: String, wrap_hash: String, from: String) {
        self.wrap_received = true;
        self.wrap_status = Some(status);
        self.wrap_id = Some(wrap_id);
        self.wrap_hash = Some(wrap_hash);
        self.wrap_from = Some(from);
    }

    pub fn record_ber(&mut self, status: BerStatus) {
        self.ber_issued = true;
        self.ber_status = Some(status);
    }

    pub fn record_emission(&mut self, artifact: BerArtifact) {
        self.ber_artifact = Some(artifact);
    }

    pub fn record_closure(&mut self, closure: PositiveClosure) {
        self.positive_closure_emitted = true;
        self.closure_emitted_at = Some(Utc::now());
        self.positive_closure = Some(closure);
    }

    pub fn record_pdo(&mut self, pdo: PdoArtifact) {
        self.pdo_emitted = true;
        self.pdo_emitted_at = Some(Utc::now());
        self.pdo_artifact = Some(pdo);
    }

    /// Point-in-time external view of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            pac_id: self.pac_id.clone(),
            state: self.state,
            wrap_received: self.wrap_received,
            wrap_status: self.wrap_status,
            ber_issued: self.ber_issued,
            ber_status: self.ber_status,
            ber_emitted: self.ber_emitted,
            positive_closure_emitted: self.positive_closure_emitted,
            pdo_emitted: self.pdo_emitted,
            loop_closed: self.is_loop_closed(),
            created_at: self.created_at,
            completed_at: self.completed_at,
            error: self.error.clone(),
        }
    }
}

/// External snapshot of a session's loop state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub pac_id: String,
    pub state: SessionState,
    pub wrap_received: bool,
    pub wrap_status: Option<WrapStatus>,
    pub ber_issued: bool,
    pub ber_status: Option<BerStatus>,
    pub ber_emitted: bool,
    pub positive_closure_emitted: bool,
    pub pdo_emitted: bool,
    pub loop_closed: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
