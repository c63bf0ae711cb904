//! Repository for the `action_records` table.
//!
//! Every guarded status *entry* write is version-checked: the UPDATE
//! matches both the record id and the version the caller read, and bumps
//! the version. A zero-row result means another caller won the race; the
//! orchestrator surfaces it as a replay conflict. This is the
//! serialization point that keeps transitions strictly sequential per
//! record.
//!
//! Terminal writes (`finish_execution` / `finish_rollback`) are keyed on
//! the in-flight state instead of the version: `Executing` and
//! `RollingBack` are only ever entered by the caller about to finish them,
//! so an unrelated version bump on the other status track (a rollback
//! request landing mid-execution) cannot orphan the outcome.

use sqlx::{PgExecutor, PgPool};
use remedian_core::types::{DbId, Timestamp};
use uuid::Uuid;

use crate::models::action_record::{ActionRecord, ActionRecordQuery, CreateActionRecord};

/// Column list for `action_records` SELECT queries.
const COLUMNS: &str = "\
    id, tenant_id, run_id, action_type, \
    proposed_payload, execution_payload, outcome, \
    rollback_payload, rollback_outcome, manual_rollback_guidance, \
    status_id, rollback_status_id, version, created_at";

/// Maximum page size for record listing.
pub const MAX_LIMIT: i64 = 200;

/// Default page size for record listing.
pub const DEFAULT_LIMIT: i64 = 50;

/// Clamp a requested limit into `[1, MAX_LIMIT]`.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Provides persistence for the safe action aggregate root.
pub struct ActionRecordRepo;

impl ActionRecordRepo {
    /// Insert a newly proposed record (status starts at `Proposed`).
    pub async fn insert(
        pool: &PgPool,
        input: &CreateActionRecord,
    ) -> Result<ActionRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO action_records \
             (tenant_id, run_id, action_type, proposed_payload, rollback_payload, \
              manual_rollback_guidance, rollback_status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionRecord>(&query)
            .bind(&input.tenant_id)
            .bind(input.run_id)
            .bind(&input.action_type)
            .bind(&input.proposed_payload)
            .bind(&input.rollback_payload)
            .bind(&input.manual_rollback_guidance)
            .bind(input.rollback_status_id)
            .fetch_one(pool)
            .await
    }

    /// Find a record by id.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ActionRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM action_records WHERE id = $1");
        sqlx::query_as::<_, ActionRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Version-checked execution status write (approve/reject).
    ///
    /// Returns `None` when the version check failed (concurrent writer).
    /// Takes any executor so decision writes can run inside a transaction
    /// with their approval row.
    pub async fn set_status(
        executor: impl PgExecutor<'_>,
        id: DbId,
        version: i32,
        status_id: i16,
    ) -> Result<Option<ActionRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE action_records \
             SET status_id = $3, version = version + 1 \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionRecord>(&query)
            .bind(id)
            .bind(version)
            .bind(status_id)
            .fetch_optional(executor)
            .await
    }

    /// Transition to `Executing` and persist the payload being dispatched.
    ///
    /// Persisted *before* the executor runs so a crash mid-execution leaves
    /// an auditable `Executing` record.
    pub async fn begin_execution(
        pool: &PgPool,
        id: DbId,
        version: i32,
        status_id: i16,
        execution_payload: &serde_json::Value,
    ) -> Result<Option<ActionRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE action_records \
             SET status_id = $3, execution_payload = $4, version = version + 1 \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionRecord>(&query)
            .bind(id)
            .bind(version)
            .bind(status_id)
            .bind(execution_payload)
            .fetch_optional(pool)
            .await
    }

    /// Terminal execution write: `Completed`/`Failed` plus the outcome
    /// envelope returned by the executor.
    ///
    /// Keyed on the record still being in `from_status_id` (`Executing`),
    /// not on the version: only the dispatching caller ever put it there,
    /// and a concurrent rollback-track write must not lose the outcome.
    pub async fn finish_execution(
        pool: &PgPool,
        id: DbId,
        from_status_id: i16,
        to_status_id: i16,
        outcome: &serde_json::Value,
    ) -> Result<Option<ActionRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE action_records \
             SET status_id = $3, outcome = $4, version = version + 1 \
             WHERE id = $1 AND status_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionRecord>(&query)
            .bind(id)
            .bind(from_status_id)
            .bind(to_status_id)
            .bind(outcome)
            .fetch_optional(pool)
            .await
    }

    /// Version-checked rollback status write (request/approve/begin).
    pub async fn set_rollback_status(
        executor: impl PgExecutor<'_>,
        id: DbId,
        version: i32,
        rollback_status_id: i16,
    ) -> Result<Option<ActionRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE action_records \
             SET rollback_status_id = $3, version = version + 1 \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionRecord>(&query)
            .bind(id)
            .bind(version)
            .bind(rollback_status_id)
            .fetch_optional(executor)
            .await
    }

    /// Terminal rollback write: `RolledBack`/`RollbackFailed` plus outcome.
    ///
    /// Same state-keyed contract as [`Self::finish_execution`], against the
    /// rollback track (`RollingBack`).
    pub async fn finish_rollback(
        pool: &PgPool,
        id: DbId,
        from_rollback_status_id: i16,
        to_rollback_status_id: i16,
        rollback_outcome: &serde_json::Value,
    ) -> Result<Option<ActionRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE action_records \
             SET rollback_status_id = $3, rollback_outcome = $4, version = version + 1 \
             WHERE id = $1 AND rollback_status_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionRecord>(&query)
            .bind(id)
            .bind(from_rollback_status_id)
            .bind(to_rollback_status_id)
            .bind(rollback_outcome)
            .fetch_optional(pool)
            .await
    }

    /// List a tenant's records, newest first.
    pub async fn list_by_tenant(
        pool: &PgPool,
        tenant_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ActionRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM action_records \
             WHERE tenant_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, ActionRecord>(&query)
            .bind(tenant_id)
            .bind(clamp_limit(limit))
            .fetch_all(pool)
            .await
    }

    /// List all records correlated to one agent run.
    pub async fn list_by_run(
        pool: &PgPool,
        tenant_id: &str,
        run_id: Uuid,
    ) -> Result<Vec<ActionRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM action_records \
             WHERE tenant_id = $1 AND run_id = $2 \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, ActionRecord>(&query)
            .bind(tenant_id)
            .bind(run_id)
            .fetch_all(pool)
            .await
    }

    /// Filtered tenant-scoped query, newest first.
    pub async fn query(
        pool: &PgPool,
        tenant_id: &str,
        params: &ActionRecordQuery,
    ) -> Result<Vec<ActionRecord>, sqlx::Error> {
        let (where_clause, bind_values, bind_idx) = build_record_filter(params);

        let query = format!(
            "SELECT {COLUMNS} FROM action_records \
             WHERE tenant_id = $1{where_clause} \
             ORDER BY created_at DESC \
             LIMIT ${bind_idx}"
        );

        let mut q = sqlx::query_as::<_, ActionRecord>(&query).bind(tenant_id);
        for val in &bind_values {
            match val {
                BindValue::SmallInt(v) => q = q.bind(*v),
                BindValue::Text(v) => q = q.bind(v.as_str()),
                BindValue::Uuid(v) => q = q.bind(*v),
                BindValue::Timestamp(v) => q = q.bind(*v),
            }
        }
        q.bind(clamp_limit(params.limit)).fetch_all(pool).await
    }
}

/// Typed bind value for dynamically-built record queries.
enum BindValue {
    SmallInt(i16),
    Text(String),
    Uuid(Uuid),
    Timestamp(Timestamp),
}

/// Build the filter tail of the WHERE clause (after `tenant_id = $1`).
///
/// Returns `(where_clause, bind_values, next_bind_index)`.
fn build_record_filter(params: &ActionRecordQuery) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx = 2u32; // $1 is tenant_id
    let mut bind_values: Vec<BindValue> = Vec::new();

    if let Some(status_id) = params.status_id {
        conditions.push(format!("status_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::SmallInt(status_id));
    }

    if let Some(rollback_status_id) = params.rollback_status_id {
        conditions.push(format!("rollback_status_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::SmallInt(rollback_status_id));
    }

    if let Some(ref action_type) = params.action_type {
        conditions.push(format!("action_type = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(action_type.clone()));
    }

    if let Some(run_id) = params.run_id {
        conditions.push(format!("run_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Uuid(run_id));
    }

    if let Some(from) = params.from {
        conditions.push(format!("created_at >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(from));
    }

    if let Some(to) = params.to {
        conditions.push(format!("created_at <= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(to));
    }

    if let Some(has_logs) = params.has_execution_logs {
        // No bind needed; EXISTS flips on the flag.
        let clause = if has_logs {
            "EXISTS (SELECT 1 FROM execution_logs el WHERE el.action_record_id = action_records.id)"
        } else {
            "NOT EXISTS (SELECT 1 FROM execution_logs el WHERE el.action_record_id = action_records.id)"
        };
        conditions.push(clause.to_string());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" AND {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}
