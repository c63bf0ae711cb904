//! Operational routes.

use axum::routing::get;
use axum::Router;

use crate::handlers::audit;
use crate::state::AppState;

/// The `/ops` route group.
///
/// ```text
/// GET    /telemetry                 governance counter snapshot
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/telemetry", get(audit::get_telemetry))
}
