// ============================================================================
// GOVERNANCE KERNEL - Core Library
// PAC-OCC-P63-GOVERNANCE-CORE: Fail-Closed Multi-Agent Loop Enforcement
// AUTH: BENSON (GID-00)
// ============================================================================

//! Fail-closed governance enforcement core.
//!
//! Callers present PACs (Principal Action Commands), agents return WRAPs
//! (Work Record And Proof), the kernel emits BERs (Binding Execution
//! Rulings) and PDOs (Proof-of-Decision Objects). Every transition is
//! either valid and observable or fatal and observable; the kernel never
//! proceeds silently on an uncertain state.
//!
//! The chain PAC → WRAP → BER → POSITIVE_CLOSURE → PDO is hash-linked:
//! artifacts reference each other by id and SHA-256 digest only.

pub mod authority;
pub mod canonical;
pub mod closure;
pub mod engine;
pub mod error;
pub mod events;
pub mod identity;
pub mod lint;
pub mod observability;
pub mod pac;
pub mod pdo;
pub mod policy;
pub mod session;
pub mod store;
pub mod wrap;

// Re-export the primary surface for ergonomic access
pub use engine::{DispatchResult, DispatchStatus, EngineConfig, OrchestrationEngine};
pub use error::{ErrorFamily, GovernanceError, GovernanceResult};
pub use events::{EventSink, EventType, GovernanceEvent, RecordingSink, TracingSink};
pub use identity::{Identity, IdentityClass, IdentityRegistry, ORCHESTRATOR_GID};
pub use lint::{EnforcementPoint, EvaluationReport, EvaluationResult, LintContext, LintEngine};
pub use closure::{ClosureBuilder, ClosureDecision, PositiveClosure};
pub use pac::{BerStatus, Pac, PacBuilder, PacValidationResult, PacValidator, WrapStatus};
pub use pdo::{PdoArtifact, PdoFactory, PdoOutcomeStatus};
pub use policy::{PolicyDecision, ToolCategory};
pub use session::{BerArtifact, SessionRecord, SessionSnapshot, SessionState};
pub use store::{PdoEntry, PdoStore, StoreConfig};
pub use wrap::{ValidatedWrap, WrapRecord, WrapValidator};
