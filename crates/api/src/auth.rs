//! Caller identity extraction.
//!
//! Authentication itself is the gateway's job; requests arrive with an
//! `x-user-id` header naming the caller. The extractor turns that into
//! an active account or fails with 401 before any handler logic runs.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use domain::{DomainError, Permission, has_permission};
use store::{MarketStore, User, UserId};

use crate::AppState;
use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<Arc<AppState<S>>> for CurrentUser
where
    S: MarketStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {USER_ID_HEADER} header")))?;
        let id = uuid::Uuid::parse_str(header)
            .map_err(|_| ApiError::Unauthorized(format!("Invalid {USER_ID_HEADER} header")))?;

        match state.users.user(UserId::from_uuid(id)).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(DomainError::NotFound { .. }) => Err(ApiError::Unauthorized(
                "Unknown or inactive account".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }
}

/// Fails with 403 unless the caller's role carries `permission`.
pub fn require_permission(user: &User, permission: Permission) -> Result<(), ApiError> {
    if !has_permission(user.role, permission) {
        return Err(ApiError::Forbidden(format!(
            "Missing permission: {permission:?}"
        )));
    }
    Ok(())
}
