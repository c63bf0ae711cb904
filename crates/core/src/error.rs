use crate::types::DbId;

/// Domain-level error type shared by the orchestrator, repositories, and
/// HTTP layer.
///
/// Executor failures are deliberately *not* represented here: an executor
/// that fails still produces a successful orchestrator call with a failed
/// [`crate::executor::ActionExecutionResult`] and an audit row.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// A catalog or policy gate denied the request. Expected business
    /// outcome, surfaced with a stable machine-readable reason code.
    #[error("Denied ({reason_code}): {message}")]
    Denied {
        reason_code: String,
        message: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Illegal state transition or replay conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A hard precondition failed (e.g. rollback without a rollback
    /// payload). Distinct from a policy denial: no gate was consulted.
    #[error("Precondition failed ({reason_code}): {message}")]
    Precondition {
        reason_code: &'static str,
        message: String,
    },

    /// The fixed-window throttle rejected the attempt.
    #[error("Throttled, retry after {retry_after_secs}s")]
    Throttled { retry_after_secs: u64 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Feature is disabled by configuration (global execution flag off).
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable reason codes used in denial and precondition responses.
pub mod reason {
    /// The action type is not on the catalog allowlist (or is disabled).
    pub const ACTION_TYPE_NOT_ALLOWED: &str = "action_type_not_allowed";
    /// Rollback execution requires a rollback payload on the record.
    pub const ROLLBACK_PAYLOAD_MISSING: &str = "rollback_payload_missing";
}
