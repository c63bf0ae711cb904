//! Handlers for the audit surfaces: approval history, execution logs,
//! derived audit summaries, and the governance counter snapshot.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use remedian_core::types::DbId;

use crate::error::AppResult;
use crate::handlers::safe_actions::load_owned;
use crate::middleware::identity::TenantId;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub limit: Option<i64>,
}

/// GET /api/v1/safe-actions/{id}/approvals
///
/// Approval decisions for one record, oldest first.
pub async fn list_approvals(
    TenantId(tenant): TenantId,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, id, &tenant).await?;
    let approvals = state.engine.approvals_for_action(id).await?;
    Ok(Json(DataResponse { data: approvals }))
}

/// GET /api/v1/safe-actions/{id}/executions
///
/// Execution log rows for one record, oldest first.
pub async fn list_executions(
    TenantId(tenant): TenantId,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, id, &tenant).await?;
    let logs = state.engine.execution_logs_for_action(id).await?;
    Ok(Json(DataResponse { data: logs }))
}

/// GET /api/v1/safe-actions/audit-summaries
///
/// Derived audit summaries for the tenant's most recent records.
pub async fn list_audit_summaries(
    TenantId(tenant): TenantId,
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<impl IntoResponse> {
    let summaries = state.engine.audit_summaries(&tenant, query.limit).await?;
    Ok(Json(DataResponse { data: summaries }))
}

/// GET /api/v1/ops/telemetry
///
/// Point-in-time snapshot of the governance counters.
pub async fn get_telemetry(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let snapshot = state.engine.telemetry().snapshot();
    Ok(Json(DataResponse { data: snapshot }))
}
