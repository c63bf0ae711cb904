//! Header-based caller identity extractors.
//!
//! Identity resolution beyond "caller identity string" is an external
//! collaborator; the gateway in front of this service resolves the actual
//! principal and forwards it in headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use remedian_core::error::CoreError;

use crate::error::AppError;

/// Tenant header set by the gateway on every tenant-scoped request.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Resolved actor identity header, required on approval endpoints.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// The tenant a request operates on, taken from `x-tenant-id`.
///
/// Missing or empty header is a 400: the request is malformed, not
/// unauthenticated.
#[derive(Debug, Clone)]
pub struct TenantId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for TenantId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant = parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::Core(CoreError::Validation(format!(
                    "Missing {TENANT_HEADER} header"
                )))
            })?;

        Ok(TenantId(tenant.to_string()))
    }
}

/// The resolved approver identity, taken from `x-actor-id`.
///
/// Approval and rejection decisions are attributed to this identity in the
/// audit trail; a request without one is a 401.
#[derive(Debug, Clone)]
pub struct ActorIdentity(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ActorIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(format!(
                    "Missing {ACTOR_HEADER} header"
                )))
            })?;

        Ok(ActorIdentity(actor.to_string()))
    }
}
