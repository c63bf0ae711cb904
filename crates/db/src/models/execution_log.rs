//! Execution log entity model and DTOs.
//!
//! Exactly one row is appended per execution attempt, whether the executor
//! succeeded, failed, or timed out. Rows are immutable once written.

use remedian_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One execution attempt against an action record.
///
/// `execution_type` and `status` hold the constants from
/// `remedian_core::audit` (`execute`/`rollback`, `success`/`failed`).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    pub id: DbId,
    pub action_record_id: DbId,
    pub execution_type: String,
    pub request_payload: serde_json::Value,
    pub response_payload: Option<serde_json::Value>,
    pub status: String,
    pub duration_ms: i64,
    pub executed_at: Timestamp,
}

/// DTO for appending a new execution log row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateExecutionLog {
    pub action_record_id: DbId,
    pub execution_type: String,
    pub request_payload: serde_json::Value,
    pub response_payload: Option<serde_json::Value>,
    pub status: String,
    pub duration_ms: i64,
}
