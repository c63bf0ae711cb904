//! Handlers for the safe action lifecycle: propose, decide, execute,
//! rollback, and tenant-scoped queries.
//!
//! Every record-scoped endpoint resolves the record first and verifies it
//! belongs to the calling tenant; a cross-tenant ID behaves exactly like a
//! missing one.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use remedian_core::audit::AuditSummary;
use remedian_core::error::CoreError;
use remedian_core::lifecycle::{ActionStatus, RollbackStatus};
use remedian_core::types::{DbId, Timestamp};
use remedian_db::models::action_record::{ActionRecord, ActionRecordQuery};
use remedian_db::models::approval::ApprovalRecord;
use remedian_db::models::execution_log::ExecutionLog;

use crate::engine::ProposeAction;
use crate::error::{AppError, AppResult};
use crate::middleware::identity::{ActorIdentity, TenantId};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /safe-actions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeRequest {
    pub run_id: Uuid,
    pub action_type: String,
    pub proposed_payload: serde_json::Value,
    #[serde(default)]
    pub rollback_payload: Option<serde_json::Value>,
    #[serde(default)]
    pub manual_rollback_guidance: Option<String>,
}

/// Optional body for decision endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    pub reason: Option<String>,
}

/// Wire-level filter parameters for `GET /safe-actions`.
///
/// Status filters accept either the status label (`"approved"`) or its
/// numeric ID; unknown values are a 400, not an empty result.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListActionsQuery {
    pub status: Option<String>,
    pub rollback_status: Option<String>,
    pub action_type: Option<String>,
    pub has_execution_logs: Option<bool>,
    pub run_id: Option<Uuid>,
    pub from_utc: Option<Timestamp>,
    pub to_utc: Option<Timestamp>,
    pub limit: Option<i64>,
}

/// Full record detail: the record plus its append-only history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecordDetail {
    #[serde(flatten)]
    pub record: ActionRecord,
    pub approvals: Vec<ApprovalRecord>,
    pub execution_logs: Vec<ExecutionLog>,
    pub audit_summary: AuditSummary,
}

/// POST /api/v1/safe-actions
///
/// Propose a new safe action. Catalog and propose-time policy gates run
/// before anything persists.
pub async fn propose(
    TenantId(tenant): TenantId,
    State(state): State<AppState>,
    Json(input): Json<ProposeRequest>,
) -> AppResult<impl IntoResponse> {
    if input.action_type.trim().is_empty() {
        return Err(AppError::BadRequest("actionType must not be empty".into()));
    }

    let record = state
        .engine
        .propose(
            &tenant,
            ProposeAction {
                run_id: input.run_id,
                action_type: input.action_type,
                proposed_payload: input.proposed_payload,
                rollback_payload: input.rollback_payload,
                manual_rollback_guidance: input.manual_rollback_guidance,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

/// GET /api/v1/safe-actions
///
/// List the calling tenant's records, newest first, with optional filters.
pub async fn list_actions(
    TenantId(tenant): TenantId,
    State(state): State<AppState>,
    Query(query): Query<ListActionsQuery>,
) -> AppResult<impl IntoResponse> {
    let params = parse_query(query)?;
    let records = state.engine.query_by_tenant(&tenant, &params).await?;
    Ok(Json(DataResponse { data: records }))
}

/// GET /api/v1/safe-actions/runs/{run_id}
///
/// All of a tenant's records correlated to one agent run, in proposal
/// order.
pub async fn list_by_run(
    TenantId(tenant): TenantId,
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let records = state.engine.list_by_run(&tenant, run_id).await?;
    Ok(Json(DataResponse { data: records }))
}

/// GET /api/v1/safe-actions/{id}
///
/// Record detail with approvals, execution logs, and the derived audit
/// summary.
pub async fn get_action(
    TenantId(tenant): TenantId,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let record = load_owned(&state, id, &tenant).await?;
    let approvals = state.engine.approvals_for_action(id).await?;
    let execution_logs = state.engine.execution_logs_for_action(id).await?;
    let audit_summary = state.engine.audit_summary(id).await?;

    Ok(Json(DataResponse {
        data: ActionRecordDetail {
            record,
            approvals,
            execution_logs,
            audit_summary,
        },
    }))
}

/// POST /api/v1/safe-actions/{id}/approve
pub async fn approve_action(
    ActorIdentity(actor): ActorIdentity,
    TenantId(tenant): TenantId,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    input: Option<Json<DecisionRequest>>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, id, &tenant).await?;
    let reason = input.and_then(|Json(body)| body.reason);
    let record = state.engine.approve(id, &actor, reason).await?;
    Ok(Json(DataResponse { data: record }))
}

/// POST /api/v1/safe-actions/{id}/reject
pub async fn reject_action(
    ActorIdentity(actor): ActorIdentity,
    TenantId(tenant): TenantId,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    input: Option<Json<DecisionRequest>>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, id, &tenant).await?;
    let reason = input.and_then(|Json(body)| body.reason);
    let record = state.engine.reject(id, &actor, reason).await?;
    Ok(Json(DataResponse { data: record }))
}

/// POST /api/v1/safe-actions/{id}/execute
///
/// Gated on the global execution switch: when off, this returns 501 and
/// nothing mutates.
pub async fn execute_action(
    TenantId(tenant): TenantId,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_execution_enabled(&state)?;
    load_owned(&state, id, &tenant).await?;
    let record = state.engine.execute(id).await?;
    Ok(Json(DataResponse { data: record }))
}

/// POST /api/v1/safe-actions/{id}/rollback
pub async fn request_rollback(
    TenantId(tenant): TenantId,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, id, &tenant).await?;
    let record = state.engine.request_rollback(id).await?;
    Ok(Json(DataResponse { data: record }))
}

/// POST /api/v1/safe-actions/{id}/rollback/approve
pub async fn approve_rollback(
    ActorIdentity(actor): ActorIdentity,
    TenantId(tenant): TenantId,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    input: Option<Json<DecisionRequest>>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, id, &tenant).await?;
    let reason = input.and_then(|Json(body)| body.reason);
    let record = state.engine.approve_rollback(id, &actor, reason).await?;
    Ok(Json(DataResponse { data: record }))
}

/// POST /api/v1/safe-actions/{id}/rollback/execute
///
/// Same global execution gate as forward execution.
pub async fn execute_rollback(
    TenantId(tenant): TenantId,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_execution_enabled(&state)?;
    load_owned(&state, id, &tenant).await?;
    let record = state.engine.execute_rollback(id).await?;
    Ok(Json(DataResponse { data: record }))
}

/// Load a record and verify tenant ownership. A record belonging to a
/// different tenant is reported as not found.
pub(crate) async fn load_owned(
    state: &AppState,
    id: DbId,
    tenant: &str,
) -> AppResult<ActionRecord> {
    let record = state.engine.get(id).await?;
    if record.tenant_id != tenant {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "ActionRecord",
            id,
        }));
    }
    Ok(record)
}

fn ensure_execution_enabled(state: &AppState) -> AppResult<()> {
    if state.config.governance.enable_execution {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::NotImplemented(
            "Action execution is disabled on this deployment".into(),
        )))
    }
}

fn parse_query(query: ListActionsQuery) -> AppResult<ActionRecordQuery> {
    let status_id = query
        .status
        .as_deref()
        .map(|value| {
            ActionStatus::parse(value)
                .map(ActionStatus::id)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown status '{value}'")))
        })
        .transpose()?;

    let rollback_status_id = query
        .rollback_status
        .as_deref()
        .map(|value| {
            RollbackStatus::parse(value)
                .map(RollbackStatus::id)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown rollback status '{value}'")))
        })
        .transpose()?;

    if let (Some(from), Some(to)) = (query.from_utc, query.to_utc) {
        if from > to {
            return Err(AppError::BadRequest(
                "fromUtc must not be after toUtc".into(),
            ));
        }
    }

    Ok(ActionRecordQuery {
        status_id,
        rollback_status_id,
        action_type: query.action_type,
        has_execution_logs: query.has_execution_logs,
        run_id: query.run_id,
        from: query.from_utc,
        to: query.to_utc,
        limit: query.limit,
    })
}
