//! Account endpoints: registration, profiles, lifecycle, ratings.

use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::Page;
use domain::{NewUser, Permission, ProfileChanges};
use serde::{Deserialize, Serialize};
use store::{MarketStore, Role, User, UserId};

use crate::AppState;
use crate::auth::{CurrentUser, require_permission};
use crate::error::ApiError;

use super::reviews::ReviewResponse;
use super::{PageParams, parse_id};

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub last_name: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username,
            email: user.email,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct RatingResponse {
    pub average_rating: f64,
    pub review_count: u64,
}

// -- Handlers --

/// POST /users — register a new account.
#[tracing::instrument(skip(state, req), fields(username = %req.username))]
pub async fn register<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_register(&req)?;
    let password_hash = hash_password(&req.password)?;

    let user = state
        .users
        .register(NewUser {
            username: req.username.trim().to_string(),
            email: req.email.trim().to_string(),
            password_hash,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /users — all active accounts, ordered by username.
#[tracing::instrument(skip(state))]
pub async fn list<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.users.active_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /users/me — the caller's own profile.
pub async fn me<S: MarketStore + Clone + 'static>(
    State(_state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
) -> Json<UserResponse> {
    Json(user.into())
}

/// PUT /users/me — overwrite the caller's profile names.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn update_profile<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let mut errors = Vec::new();
    if req.first_name.trim().is_empty() {
        errors.push("First name is required".to_string());
    }
    if req.last_name.trim().is_empty() {
        errors.push("Last name is required".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let updated = state
        .users
        .update_profile(
            user.id,
            ProfileChanges {
                first_name: Some(req.first_name.trim().to_string()),
                last_name: Some(req.last_name.trim().to_string()),
            },
        )
        .await?;
    Ok(Json(updated.into()))
}

/// DELETE /users/me — deactivate the caller's own account.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn deactivate_self<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    state.users.deactivate(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /users/{id} — a user's public profile.
#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let id: UserId = parse_id(&id)?;
    let user = state.users.user(id).await?;
    Ok(Json(user.into()))
}

/// PUT /users/{id}/deactivate — deactivate any account. Admin only.
#[tracing::instrument(skip(state, caller))]
pub async fn deactivate<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_permission(&caller, Permission::ManageUsers)?;
    let id: UserId = parse_id(&id)?;
    state.users.deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /users/{id}/reactivate — reactivate a deactivated account. Admin only.
#[tracing::instrument(skip(state, caller))]
pub async fn reactivate<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    require_permission(&caller, Permission::ManageUsers)?;
    let id: UserId = parse_id(&id)?;
    let user = state.users.reactivate(id).await?;
    Ok(Json(user.into()))
}

/// GET /users/{id}/rating — average rating and review count.
#[tracing::instrument(skip(state))]
pub async fn rating<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<RatingResponse>, ApiError> {
    let id: UserId = parse_id(&id)?;
    let average_rating = state.reviews.average_rating(id).await?;
    let review_count = state.reviews.review_count(id).await?;
    Ok(Json(RatingResponse {
        average_rating,
        review_count,
    }))
}

/// GET /users/{id}/reviews — reviews received, newest first, paged.
#[tracing::instrument(skip(state))]
pub async fn reviews<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<ReviewResponse>>, ApiError> {
    let id: UserId = parse_id(&id)?;
    let page = state
        .reviews
        .reviews_received(id, params.to_request())
        .await?;
    Ok(Json(page.map(ReviewResponse::from)))
}

fn validate_register(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    let username = req.username.trim();
    if username.is_empty() {
        errors.push("Username is required".to_string());
    } else if !(3..=20).contains(&username.chars().count()) {
        errors.push("Username must be between 3 and 20 characters".to_string());
    }
    let email = req.email.trim();
    if email.is_empty() {
        errors.push("Email is required".to_string());
    } else if !email.contains('@') {
        errors.push("Email format is not valid".to_string());
    }
    if req.password.is_empty() {
        errors.push("Password is required".to_string());
    } else if req.password.chars().count() < 8 {
        errors.push("Password must be at least 8 characters".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))?;
    Ok(hash.to_string())
}
