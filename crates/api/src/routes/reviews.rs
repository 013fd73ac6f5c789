//! Review endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use store::{MarketStore, OrderId, Review};

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

use super::parse_id;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub order_id: String,
    pub rating: i32,
    pub comment: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ReviewResponse {
    pub id: String,
    pub order_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub reviewer_id: String,
    pub reviewee_id: String,
    pub created_at: String,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id.to_string(),
            order_id: review.order_id.to_string(),
            rating: review.rating,
            comment: review.comment,
            reviewer_id: review.reviewer_id.to_string(),
            reviewee_id: review.reviewee_id.to_string(),
            created_at: review.created_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /reviews — review the seller of a completed order.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn create<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    let mut errors = Vec::new();
    if req.rating < 1 {
        errors.push("Rating must be at least 1".to_string());
    }
    if req.rating > 5 {
        errors.push("Rating cannot exceed 5".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let order_id: OrderId = parse_id(&req.order_id)?;
    let comment = req
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let review = state
        .reviews
        .leave_review(user.id, order_id, req.rating, comment)
        .await?;
    Ok((StatusCode::CREATED, Json(review.into())))
}
