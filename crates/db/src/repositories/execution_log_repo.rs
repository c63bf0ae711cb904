//! Repository for the append-only `execution_logs` table.

use remedian_core::types::DbId;
use sqlx::PgPool;

use crate::models::execution_log::{CreateExecutionLog, ExecutionLog};

/// Column list for `execution_logs` SELECT queries.
const COLUMNS: &str = "\
    id, action_record_id, execution_type, request_payload, \
    response_payload, status, duration_ms, executed_at";

/// Insert and query operations for execution log rows. No update or
/// delete: rows are immutable once written.
pub struct ExecutionLogRepo;

impl ExecutionLogRepo {
    /// Append one execution attempt.
    pub async fn insert(
        pool: &PgPool,
        input: &CreateExecutionLog,
    ) -> Result<ExecutionLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO execution_logs \
             (action_record_id, execution_type, request_payload, response_payload, status, duration_ms) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ExecutionLog>(&query)
            .bind(input.action_record_id)
            .bind(&input.execution_type)
            .bind(&input.request_payload)
            .bind(&input.response_payload)
            .bind(&input.status)
            .bind(input.duration_ms)
            .fetch_one(pool)
            .await
    }

    /// All execution attempts for one record, oldest first.
    pub async fn list_for_action(
        pool: &PgPool,
        action_record_id: DbId,
    ) -> Result<Vec<ExecutionLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM execution_logs \
             WHERE action_record_id = $1 \
             ORDER BY executed_at ASC, id ASC"
        );
        sqlx::query_as::<_, ExecutionLog>(&query)
            .bind(action_record_id)
            .fetch_all(pool)
            .await
    }

    /// All execution attempts for a set of records (batch audit summary
    /// support).
    pub async fn list_for_actions(
        pool: &PgPool,
        action_record_ids: &[DbId],
    ) -> Result<Vec<ExecutionLog>, sqlx::Error> {
        if action_record_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM execution_logs \
             WHERE action_record_id = ANY($1) \
             ORDER BY action_record_id ASC, executed_at ASC"
        );
        sqlx::query_as::<_, ExecutionLog>(&query)
            .bind(action_record_ids)
            .fetch_all(pool)
            .await
    }
}
