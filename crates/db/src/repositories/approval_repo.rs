//! Repository for the append-only `approval_records` table.

use remedian_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::approval::{ApprovalRecord, CreateApproval};

/// Column list for `approval_records` SELECT queries.
const COLUMNS: &str = "\
    id, action_record_id, approver_identity, decision, reason, target, created_at";

/// Insert and query operations for approval rows. No update or delete:
/// rows are immutable once written.
pub struct ApprovalRepo;

impl ApprovalRepo {
    /// Append one approval decision. Takes any executor so the row can
    /// share a transaction with the status transition it records.
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        input: &CreateApproval,
    ) -> Result<ApprovalRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO approval_records \
             (action_record_id, approver_identity, decision, reason, target) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ApprovalRecord>(&query)
            .bind(input.action_record_id)
            .bind(&input.approver_identity)
            .bind(&input.decision)
            .bind(&input.reason)
            .bind(&input.target)
            .fetch_one(executor)
            .await
    }

    /// All approvals for one record, oldest first.
    pub async fn list_for_action(
        pool: &PgPool,
        action_record_id: DbId,
    ) -> Result<Vec<ApprovalRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM approval_records \
             WHERE action_record_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, ApprovalRecord>(&query)
            .bind(action_record_id)
            .fetch_all(pool)
            .await
    }

    /// All approvals for a set of records (batch audit summary support).
    pub async fn list_for_actions(
        pool: &PgPool,
        action_record_ids: &[DbId],
    ) -> Result<Vec<ApprovalRecord>, sqlx::Error> {
        if action_record_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM approval_records \
             WHERE action_record_id = ANY($1) \
             ORDER BY action_record_id ASC, created_at ASC"
        );
        sqlx::query_as::<_, ApprovalRecord>(&query)
            .bind(action_record_ids)
            .fetch_all(pool)
            .await
    }
}
