pub mod health;
pub mod ops;
pub mod safe_action;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /safe-actions                                 propose (POST), list (GET)
/// /safe-actions/audit-summaries                 batch audit summaries (GET)
/// /safe-actions/runs/{run_id}                   records for one run (GET)
/// /safe-actions/{id}                            detail (GET)
/// /safe-actions/{id}/approve                    approve (POST)
/// /safe-actions/{id}/reject                     reject (POST)
/// /safe-actions/{id}/execute                    execute (POST)
/// /safe-actions/{id}/rollback                   request rollback (POST)
/// /safe-actions/{id}/rollback/approve           approve rollback (POST)
/// /safe-actions/{id}/rollback/execute           execute rollback (POST)
/// /safe-actions/{id}/approvals                  approval history (GET)
/// /safe-actions/{id}/executions                 execution logs (GET)
///
/// /ops/telemetry                                governance counters (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/safe-actions", safe_action::router())
        .nest("/ops", ops::router())
}
