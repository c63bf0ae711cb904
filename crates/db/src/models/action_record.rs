//! Action record entity model and DTOs.
//!
//! The aggregate root of the safe action lifecycle. Records are never
//! deleted; terminal states are retained for audit.

use remedian_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A safe action record. Status columns hold lookup-table IDs matching
/// `remedian_core::lifecycle::{ActionStatus, RollbackStatus}`.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub id: DbId,
    pub tenant_id: String,
    pub run_id: Uuid,
    pub action_type: String,
    pub proposed_payload: serde_json::Value,
    pub execution_payload: Option<serde_json::Value>,
    pub outcome: Option<serde_json::Value>,
    pub rollback_payload: Option<serde_json::Value>,
    pub rollback_outcome: Option<serde_json::Value>,
    pub manual_rollback_guidance: Option<String>,
    pub status_id: i16,
    pub rollback_status_id: i16,
    pub version: i32,
    pub created_at: Timestamp,
}

/// DTO for inserting a newly proposed action record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateActionRecord {
    pub tenant_id: String,
    pub run_id: Uuid,
    pub action_type: String,
    pub proposed_payload: serde_json::Value,
    pub rollback_payload: Option<serde_json::Value>,
    pub manual_rollback_guidance: Option<String>,
    /// `Available` when a rollback payload or manual guidance was supplied
    /// at propose time, else `None`.
    pub rollback_status_id: i16,
}

/// Parsed filter parameters for tenant-scoped record queries.
///
/// Status filters are already resolved to lookup IDs; wire-level parsing
/// (names vs. numeric IDs, date validation) happens in the API layer.
#[derive(Debug, Clone, Default)]
pub struct ActionRecordQuery {
    pub status_id: Option<i16>,
    pub rollback_status_id: Option<i16>,
    pub action_type: Option<String>,
    pub has_execution_logs: Option<bool>,
    pub run_id: Option<Uuid>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
}
