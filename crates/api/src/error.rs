use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use remedian_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses:
/// every failure body is `{ "error": <message>, "code": <stable code> }`,
/// with `retryAfterSeconds` added on throttle responses. No stack traces
/// or secrets ever appear in a response.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `remedian_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, retry_after_secs) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND".to_string(),
                    format!("{entity} with id {id} not found"),
                    None,
                ),
                // Policy/catalog denials surface the stable reason code as
                // the error code.
                CoreError::Denied {
                    reason_code,
                    message,
                } => (
                    StatusCode::BAD_REQUEST,
                    reason_code.clone(),
                    message.clone(),
                    None,
                ),
                CoreError::Validation(msg) => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR".to_string(),
                    msg.clone(),
                    None,
                ),
                CoreError::Conflict(msg) => (
                    StatusCode::CONFLICT,
                    "CONFLICT".to_string(),
                    msg.clone(),
                    None,
                ),
                CoreError::Precondition {
                    reason_code,
                    message,
                } => (
                    StatusCode::BAD_REQUEST,
                    reason_code.to_string(),
                    message.clone(),
                    None,
                ),
                CoreError::Throttled { retry_after_secs } => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "THROTTLED".to_string(),
                    format!("Too many attempts, retry after {retry_after_secs}s"),
                    Some(*retry_after_secs),
                ),
                CoreError::Unauthorized(msg) => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED".to_string(),
                    msg.clone(),
                    None,
                ),
                CoreError::NotImplemented(msg) => (
                    StatusCode::NOT_IMPLEMENTED,
                    "NOT_IMPLEMENTED".to_string(),
                    msg.clone(),
                    None,
                ),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR".to_string(),
                        "An internal error occurred".to_string(),
                        None,
                    )
                }
            },

            // --- Database errors ---
            AppError::Database(err) => {
                let (status, code, message) = classify_sqlx_error(err);
                (status, code.to_string(), message, None)
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST".to_string(),
                msg.clone(),
                None,
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR".to_string(),
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = match retry_after_secs {
            Some(secs) => json!({
                "error": message,
                "code": code,
                "retryAfterSeconds": secs,
            }),
            None => json!({
                "error": message,
                "code": code,
            }),
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(secs) = retry_after_secs {
            if let Ok(value) = header::HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
