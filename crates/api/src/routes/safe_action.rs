//! Route definitions for the safe action lifecycle.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{audit, safe_actions};
use crate::state::AppState;

/// The `/safe-actions` route group.
///
/// ```text
/// POST   /                          propose
/// GET    /                          list (filterable)
/// GET    /audit-summaries           batch audit summaries
/// GET    /runs/{run_id}             records for one agent run
/// GET    /{id}                      detail with approvals and logs
/// POST   /{id}/approve              approve
/// POST   /{id}/reject               reject
/// POST   /{id}/execute              execute
/// POST   /{id}/rollback             request rollback
/// POST   /{id}/rollback/approve     approve rollback
/// POST   /{id}/rollback/execute     execute rollback
/// GET    /{id}/approvals            approval history
/// GET    /{id}/executions           execution logs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(safe_actions::propose).get(safe_actions::list_actions),
        )
        .route("/audit-summaries", get(audit::list_audit_summaries))
        .route("/runs/{run_id}", get(safe_actions::list_by_run))
        .route("/{id}", get(safe_actions::get_action))
        .route("/{id}/approve", post(safe_actions::approve_action))
        .route("/{id}/reject", post(safe_actions::reject_action))
        .route("/{id}/execute", post(safe_actions::execute_action))
        .route("/{id}/rollback", post(safe_actions::request_rollback))
        .route(
            "/{id}/rollback/approve",
            post(safe_actions::approve_rollback),
        )
        .route(
            "/{id}/rollback/execute",
            post(safe_actions::execute_rollback),
        )
        .route("/{id}/approvals", get(audit::list_approvals))
        .route("/{id}/executions", get(audit::list_executions))
}
