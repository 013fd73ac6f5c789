//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Caller identity missing or not resolvable to an active account.
    Unauthorized(String),
    /// Caller lacks the permission the route requires.
    Forbidden(String),
    /// Request shape violations, all reported at once.
    Validation(Vec<String>),
    /// Domain rule or store error.
    Domain(DomainError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(errors) => {
                let body = serde_json::json!({ "errors": errors });
                return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        // Rule violations carry a reason the client can act on.
        DomainError::Order(_)
        | DomainError::Catalog(_)
        | DomainError::Review(_)
        | DomainError::User(_)
        | DomainError::Address(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        DomainError::Store(StoreError::VersionConflict { .. }) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        DomainError::Store(_) => {
            tracing::error!(error = %err, "store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::OrderError;
    use store::OrderStatus;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::Domain(DomainError::not_found("Product", uuid::Uuid::nil()));
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn rule_violations_map_to_400() {
        let err = ApiError::Domain(DomainError::Order(OrderError::InvalidTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Shipped,
        }));
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn version_conflicts_map_to_409() {
        let err = ApiError::Domain(DomainError::Store(StoreError::VersionConflict {
            entity: "product",
            id: uuid::Uuid::nil(),
        }));
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn validation_lists_every_violation() {
        let err = ApiError::Validation(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }
}
