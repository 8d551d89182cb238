// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — lint/signals.rs
// Governance Kernel: Training Signal Emission
// Governance Tier: LAW
// Invariant: ONE_SIGNAL_PER_RESULT | ONE_SIGNAL_PER_VIOLATION
// ═══════════════════════════════════════════════════════════════════════════════

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lint::registry::{EnforcementPoint, InvariantClass};
use crate::lint::{EvaluationReport, EvaluationResult};

/// Training signal emitted from a lint evaluation. Opaque to the engine;
/// a downstream collector consumes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSignal {
    pub signal_id: String,
    pub invariant_id: String,
    pub class: InvariantClass,
    pub enforcement_point: EnforcementPoint,
    pub result: EvaluationResult,
    pub artifact_id: String,
    pub observation: String,
    pub emitted_at: DateTime<Utc>,
}

fn signal_id() -> String {
    format!(
        "LINT-SIG-{}",
        &Uuid::new_v4().simple().to_string()[..8].to_uppercase()
    )
}

/// Emit training signals from an evaluation report: one for the overall
/// result, plus one per violation.
pub fn emit_training_signals(report: &EvaluationReport) -> Vec<TrainingSignal> {
    let mut signals = Vec::with_capacity(1 + report.violations.len());

    signals.push(TrainingSignal {
        signal_id: signal_id(),
        invariant_id: "LINT-EVAL".to_string(),
        class: InvariantClass::Training,
        enforcement_point: report.enforcement_point,
        result: report.result,
        artifact_id: report.artifact_id.clone(),
        observation: format!(
            "Lint evaluation at {}: {} ({} violations)",
            report.enforcement_point.as_str(),
            report.result.as_str(),
            report.violations.len()
        ),
        emitted_at: Utc::now(),
    });

    for violation in &report.violations {
        signals.push(TrainingSignal {
            signal_id: signal_id(),
            invariant_id: violation.invariant_id.clone(),
            class: violation.class,
            enforcement_point: violation.enforcement_point,
            result: EvaluationResult::Fail,
            artifact_id: violation.artifact_id.clone(),
            observation: format!("Violation: {}", violation.description),
            emitted_at: Utc::now(),
        });
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::{LintContext, LintEngine};

    #[test]
    fn test_pass_report_emits_single_signal() {
        let engine = LintEngine::new();
        let context = LintContext {
            ber: Some(serde_json::json!({"ber_finality": "FINAL"})),
            ledger_committed: true,
            latency_eligible: Some(true),
            settlement_verdict_present: true,
            ..Default::default()
        };
        let report = engine.evaluate(
            EnforcementPoint::SettlementReadiness,
            "PAC-A-B-C-D-001",
            "SETTLEMENT",
            &context,
        );
        assert!(report.is_pass());
        let signals = emit_training_signals(&report);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].invariant_id, "LINT-EVAL");
        assert_eq!(signals[0].result, EvaluationResult::Pass);
    }

    #[test]
    fn test_fail_report_emits_signal_per_violation() {
        let engine = LintEngine::new();
        // Missing everything at settlement → violations
        let report = engine.evaluate(
            EnforcementPoint::SettlementReadiness,
            "PAC-A-B-C-D-001",
            "SETTLEMENT",
            &LintContext::default(),
        );
        assert!(!report.is_pass());
        let signals = emit_training_signals(&report);
        assert_eq!(signals.len(), 1 + report.violations.len());
        assert!(signals[1..].iter().all(|s| s.result == EvaluationResult::Fail));
    }
}
