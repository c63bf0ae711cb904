//! Audit trail constants and the derived audit summary projection.
//!
//! Approval and execution log rows are append-only; the summary is a pure
//! on-demand fold over the child collections and is never persisted.

use serde::Serialize;

use crate::types::Timestamp;

/// Approval decision values stored in `approval_records.decision`.
pub const DECISION_APPROVED: &str = "approved";
pub const DECISION_REJECTED: &str = "rejected";

/// Approval target values stored in `approval_records.target`.
pub const TARGET_ACTION: &str = "action";
pub const TARGET_ROLLBACK: &str = "rollback";

/// Execution type values stored in `execution_logs.execution_type`.
pub const EXECUTION_TYPE_EXECUTE: &str = "execute";
pub const EXECUTION_TYPE_ROLLBACK: &str = "rollback";

/// Execution outcome values stored in `execution_logs.status`.
pub const EXECUTION_SUCCESS: &str = "success";
pub const EXECUTION_FAILED: &str = "failed";

/// Lightweight view of one approval row, as seen by the summary fold.
#[derive(Debug, Clone)]
pub struct ApprovalEvent {
    pub decision: String,
    pub at: Timestamp,
}

/// Lightweight view of one execution log row.
#[derive(Debug, Clone)]
pub struct ExecutionEvent {
    pub success: bool,
    pub at: Timestamp,
}

/// Derived audit projection for one action record.
///
/// `last_*` fields are `None` when no corresponding rows exist, which
/// keeps "never ran" distinct from "ran and failed".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub execution_log_count: i64,
    pub last_execution_at: Option<Timestamp>,
    pub last_execution_success: Option<bool>,
    pub approval_count: i64,
    pub last_approval_decision: Option<String>,
    pub last_approval_at: Option<Timestamp>,
}

/// Fold approval and execution events into a summary.
///
/// "Last" means latest by timestamp, independent of input order.
pub fn summarize(approvals: &[ApprovalEvent], executions: &[ExecutionEvent]) -> AuditSummary {
    let last_approval = approvals.iter().max_by_key(|a| a.at);
    let last_execution = executions.iter().max_by_key(|e| e.at);

    AuditSummary {
        execution_log_count: executions.len() as i64,
        last_execution_at: last_execution.map(|e| e.at),
        last_execution_success: last_execution.map(|e| e.success),
        approval_count: approvals.len() as i64,
        last_approval_decision: last_approval.map(|a| a.decision.clone()),
        last_approval_at: last_approval.map(|a| a.at),
    }
}
