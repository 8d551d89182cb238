// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — events.rs
// Governance Kernel: Observable Event Stream
// Governance Tier: LAW
// Invariant: ORDERED_EMISSION | EVERY_TRANSITION_OBSERVABLE
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! Every state transition emits a structured event. The sink is external;
//! the kernel's contract is only that, per session, the observable order is
//! strictly: WRAP_RECEIVED → BER_ISSUED → BER_EMITTED → POSITIVE_CLOSURE →
//! PDO_EMITTED → SESSION_COMPLETE.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

/// Event vocabulary of the governance loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    PacReceived,
    PacDispatched,
    PacRejected,
    WrapReceived,
    BerIssued,
    BerEmitted,
    PositiveClosureEmitted,
    PdoEmitted,
    SessionComplete,
    SessionInvalid,
}

impl EventType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventType::PacReceived => "pac_received",
            EventType::PacDispatched => "pac_dispatched",
            EventType::PacRejected => "pac_rejected",
            EventType::WrapReceived => "wrap_received",
            EventType::BerIssued => "ber_issued",
            EventType::BerEmitted => "ber_emitted",
            EventType::PositiveClosureEmitted => "positive_closure_emitted",
            EventType::PdoEmitted => "pdo_emitted",
            EventType::SessionComplete => "session_complete",
            EventType::SessionInvalid => "session_invalid",
        }
    }
}

/// A structured governance event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceEvent {
    pub event_type: EventType,
    pub pac_id: String,
    pub timestamp: DateTime<Utc>,
    pub detail: Value,
}

impl GovernanceEvent {
    pub fn new(event_type: EventType, pac_id: impl Into<String>, detail: Value) -> Self {
        Self {
            event_type,
            pac_id: pac_id.into(),
            timestamp: Utc::now(),
            detail,
        }
    }
}

/// External event sink. Implementations must be thread-safe; the kernel
/// calls `emit` synchronously at each transition.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &GovernanceEvent);
}

/// Default sink: structured tracing output.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &GovernanceEvent) {
        info!(
            event = event.event_type.as_str(),
            pac_id = %event.pac_id,
            detail = %event.detail,
            "governance event"
        );
    }
}

/// Recording sink for tests and audits: retains every event in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<GovernanceEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GovernanceEvent> {
        self.events.lock().clone()
    }

    pub fn event_types_for(&self, pac_id: &str) -> Vec<EventType> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.pac_id == pac_id)
            .map(|e| e.event_type)
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &GovernanceEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Convenience constructor for rejection events carrying the enumerated
/// missing sections.
pub fn rejection_event(pac_id: &str, missing_sections: &[&str], reason: &str) -> GovernanceEvent {
    GovernanceEvent::new(
        EventType::PacRejected,
        pac_id,
        json!({
            "missing_sections": missing_sections,
            "reason": reason,
            "action": "FIX_AND_RESUBMIT",
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_preserves_order() {
        let sink = RecordingSink::new();
        for event_type in [
            EventType::WrapReceived,
            EventType::BerIssued,
            EventType::BerEmitted,
        ] {
            sink.emit(&GovernanceEvent::new(event_type, "PAC-X", json!({})));
        }
        assert_eq!(
            sink.event_types_for("PAC-X"),
            vec![
                EventType::WrapReceived,
                EventType::BerIssued,
                EventType::BerEmitted
            ]
        );
        assert!(sink.event_types_for("PAC-Y").is_empty());
    }

    #[test]
    fn test_rejection_event_enumerates_sections() {
        let event = rejection_event("PAC-X", &["BER_OBLIGATION"], "schema violation");
        assert_eq!(event.event_type, EventType::PacRejected);
        assert_eq!(event.detail["missing_sections"][0], "BER_OBLIGATION");
    }
}
