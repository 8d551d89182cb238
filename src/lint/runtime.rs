// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — lint/runtime.rs
// Governance Kernel: Runtime Activation, ACK Barrier, Checkpoint Tracker
// Governance Tier: LAW
// Invariant: RUNTIME_ACK_REQUIRED | ALL_AGENT_ACKED | CHECKPOINT_SKIP_FORBIDDEN
// ═══════════════════════════════════════════════════════════════════════════════

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn short_id(prefix: &str) -> String {
    format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..8].to_uppercase())
}

// ═══════════════════════════════════════════════════════════════════════════════
// RUNTIME ACTIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Runtime activation preconditions. ALL are required before any
/// evaluation; a non-activated runtime never evaluates PASS.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeActivationStatus {
    pub schema_validation_enabled: bool,
    pub invariant_registry_loaded: bool,
    pub fail_closed_enabled: bool,
    pub runtime_admission_hook_enabled: bool,
    pub activated_at: Option<DateTime<Utc>>,
}

impl RuntimeActivationStatus {
    pub fn is_ready(&self) -> bool {
        self.schema_validation_enabled
            && self.invariant_registry_loaded
            && self.fail_closed_enabled
            && self.runtime_admission_hook_enabled
    }

    pub fn missing_preconditions(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if !self.schema_validation_enabled {
            missing.push("schema_validation_enabled".to_string());
        }
        if !self.invariant_registry_loaded {
            missing.push("invariant_registry_loaded".to_string());
        }
        if !self.fail_closed_enabled {
            missing.push("fail_closed_enabled".to_string());
        }
        if !self.runtime_admission_hook_enabled {
            missing.push("runtime_admission_hook_enabled".to_string());
        }
        missing
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AGENT ACK BARRIER
// ═══════════════════════════════════════════════════════════════════════════════

/// Explicit activation ACK from one agent. No execution before ACK; no
/// undeclared agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAck {
    pub ack_id: String,
    pub pac_id: String,
    pub gid: String,
    pub agent_name: String,
    pub lane: String,
    pub acked_at: DateTime<Utc>,
}

impl AgentAck {
    pub fn new(
        pac_id: impl Into<String>,
        gid: impl Into<String>,
        agent_name: impl Into<String>,
        lane: impl Into<String>,
    ) -> Self {
        Self {
            ack_id: short_id("AGENT-ACK"),
            pac_id: pac_id.into(),
            gid: gid.into(),
            agent_name: agent_name.into(),
            lane: lane.into(),
            acked_at: Utc::now(),
        }
    }
}

/// ACK barrier over a PAC's required agent set. Release condition:
/// ALL_AGENT_ACKED. ACKs from undeclared agents are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAckBarrier {
    pub barrier_id: String,
    pub pac_id: String,
    pub required_agents: Vec<String>,
    pub received_acks: BTreeMap<String, AgentAck>,
    pub released: bool,
    pub released_at: Option<DateTime<Utc>>,
}

impl AgentAckBarrier {
    pub fn new(pac_id: impl Into<String>, required_agents: Vec<String>) -> Self {
        Self {
            barrier_id: short_id("BARRIER"),
            pac_id: pac_id.into(),
            required_agents,
            received_acks: BTreeMap::new(),
            released: false,
            released_at: None,
        }
    }

    pub fn add_ack(&mut self, ack: AgentAck) {
        if self.required_agents.contains(&ack.gid) {
            self.received_acks.insert(ack.gid.clone(), ack);
            self.check_release();
        }
    }

    fn check_release(&mut self) {
        if !self.released
            && self
                .required_agents
                .iter()
                .all(|gid| self.received_acks.contains_key(gid))
        {
            self.released = true;
            self.released_at = Some(Utc::now());
        }
    }

    pub fn missing_acks(&self) -> Vec<String> {
        self.required_agents
            .iter()
            .filter(|gid| !self.received_acks.contains_key(*gid))
            .cloned()
            .collect()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHECKPOINT TRACKER
// ═══════════════════════════════════════════════════════════════════════════════

/// The gated flow's checkpoints, in mandatory completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowCheckpoint {
    PacAdmission,
    RuntimeActivation,
    RuntimeAckCollection,
    AgentActivation,
    AgentAckCollection,
    AgentExecution,
    ReviewGates,
    BerEligibility,
}

impl FlowCheckpoint {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FlowCheckpoint::PacAdmission => "PAC_ADMISSION",
            FlowCheckpoint::RuntimeActivation => "RUNTIME_ACTIVATION",
            FlowCheckpoint::RuntimeAckCollection => "RUNTIME_ACK_COLLECTION",
            FlowCheckpoint::AgentActivation => "AGENT_ACTIVATION",
            FlowCheckpoint::AgentAckCollection => "AGENT_ACK_COLLECTION",
            FlowCheckpoint::AgentExecution => "AGENT_EXECUTION",
            FlowCheckpoint::ReviewGates => "REVIEW_GATES",
            FlowCheckpoint::BerEligibility => "BER_ELIGIBILITY",
        }
    }
}

/// Strict completion order. Skipping is forbidden.
pub const CHECKPOINT_SEQUENCE: [FlowCheckpoint; 8] = [
    FlowCheckpoint::PacAdmission,
    FlowCheckpoint::RuntimeActivation,
    FlowCheckpoint::RuntimeAckCollection,
    FlowCheckpoint::AgentActivation,
    FlowCheckpoint::AgentAckCollection,
    FlowCheckpoint::AgentExecution,
    FlowCheckpoint::ReviewGates,
    FlowCheckpoint::BerEligibility,
];

/// Enforces strict checkpoint order for one PAC's flow. An out-of-order
/// completion attempt is itself an invariant failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointTracker {
    pub tracker_id: String,
    pub pac_id: String,
    pub completed: Vec<FlowCheckpoint>,
    cursor: usize,
}

impl CheckpointTracker {
    pub fn new(pac_id: impl Into<String>) -> Self {
        Self {
            tracker_id: short_id("TRACK"),
            pac_id: pac_id.into(),
            completed: Vec::new(),
            cursor: 0,
        }
    }

    pub fn next_checkpoint(&self) -> Option<FlowCheckpoint> {
        CHECKPOINT_SEQUENCE.get(self.cursor).copied()
    }

    /// Complete a checkpoint. Fails (with the reason) on any out-of-order
    /// attempt; the tracker state is untouched on failure.
    pub fn complete(&mut self, checkpoint: FlowCheckpoint) -> Result<(), String> {
        match self.next_checkpoint() {
            None => Err("All checkpoints already completed".to_string()),
            Some(expected) if expected != checkpoint => Err(format!(
                "Out-of-order checkpoint: expected {}, got {}",
                expected.as_str(),
                checkpoint.as_str()
            )),
            Some(_) => {
                self.completed.push(checkpoint);
                self.cursor += 1;
                Ok(())
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == CHECKPOINT_SEQUENCE.len()
    }

    pub fn remaining(&self) -> &[FlowCheckpoint] {
        &CHECKPOINT_SEQUENCE[self.cursor..]
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_requires_all_preconditions() {
        let mut status = RuntimeActivationStatus::default();
        assert!(!status.is_ready());
        assert_eq!(status.missing_preconditions().len(), 4);

        status.schema_validation_enabled = true;
        status.invariant_registry_loaded = true;
        status.fail_closed_enabled = true;
        assert!(!status.is_ready());
        assert_eq!(
            status.missing_preconditions(),
            vec!["runtime_admission_hook_enabled".to_string()]
        );

        status.runtime_admission_hook_enabled = true;
        assert!(status.is_ready());
    }

    #[test]
    fn test_barrier_releases_only_when_all_acked() {
        let mut barrier = AgentAckBarrier::new(
            "PAC-A-B-C-D-001",
            vec!["GID-01".to_string(), "GID-07".to_string()],
        );
        assert!(!barrier.is_released());

        barrier.add_ack(AgentAck::new("PAC-A-B-C-D-001", "GID-01", "Backend Engineer", "CORE"));
        assert!(!barrier.is_released());
        assert_eq!(barrier.missing_acks(), vec!["GID-07".to_string()]);

        barrier.add_ack(AgentAck::new("PAC-A-B-C-D-001", "GID-07", "Data Engineer", "DATA"));
        assert!(barrier.is_released());
        assert!(barrier.missing_acks().is_empty());
        assert!(barrier.released_at.is_some());
    }

    #[test]
    fn test_undeclared_agent_ack_ignored() {
        let mut barrier = AgentAckBarrier::new("PAC-A-B-C-D-001", vec!["GID-01".to_string()]);
        barrier.add_ack(AgentAck::new("PAC-A-B-C-D-001", "GID-09", "ML Engineer", "ML"));
        assert!(!barrier.is_released());
        assert!(barrier.received_acks.is_empty());
    }

    #[test]
    fn test_checkpoints_complete_in_order() {
        let mut tracker = CheckpointTracker::new("PAC-A-B-C-D-001");
        for checkpoint in CHECKPOINT_SEQUENCE {
            tracker.complete(checkpoint).unwrap();
        }
        assert!(tracker.is_complete());
        assert!(tracker.remaining().is_empty());
        assert!(tracker.complete(FlowCheckpoint::BerEligibility).is_err());
    }

    #[test]
    fn test_out_of_order_checkpoint_rejected() {
        let mut tracker = CheckpointTracker::new("PAC-A-B-C-D-001");
        tracker.complete(FlowCheckpoint::PacAdmission).unwrap();
        let err = tracker.complete(FlowCheckpoint::AgentExecution).unwrap_err();
        assert!(err.contains("RUNTIME_ACTIVATION"));
        // State untouched: the expected checkpoint still succeeds
        assert_eq!(tracker.next_checkpoint(), Some(FlowCheckpoint::RuntimeActivation));
        tracker.complete(FlowCheckpoint::RuntimeActivation).unwrap();
    }
}
