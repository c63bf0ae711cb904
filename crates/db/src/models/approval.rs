//! Approval record entity model and DTOs.
//!
//! Approval rows are append-only: immutable once written, no `updated_at`.

use remedian_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One approval decision against an action record or its rollback.
///
/// `decision` and `target` hold the constants from
/// `remedian_core::audit` (`approved`/`rejected`, `action`/`rollback`).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    pub id: DbId,
    pub action_record_id: DbId,
    pub approver_identity: String,
    pub decision: String,
    pub reason: Option<String>,
    pub target: String,
    pub created_at: Timestamp,
}

/// DTO for appending a new approval row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateApproval {
    pub action_record_id: DbId,
    pub approver_identity: String,
    pub decision: String,
    pub reason: Option<String>,
    pub target: String,
}
