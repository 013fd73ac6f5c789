//! Address book endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::NewAddress;
use serde::{Deserialize, Serialize};
use store::{Address, AddressId, MarketStore};

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

use super::parse_id;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateAddressRequest {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub province: String,
    pub country: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct AddressResponse {
    pub id: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub province: String,
    pub country: String,
}

impl From<Address> for AddressResponse {
    fn from(address: Address) -> Self {
        Self {
            id: address.id.to_string(),
            street: address.street,
            city: address.city,
            postal_code: address.postal_code,
            province: address.province,
            country: address.country,
        }
    }
}

// -- Handlers --

/// POST /addresses — add an address to the caller's book.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn create<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateAddressRequest>,
) -> Result<(StatusCode, Json<AddressResponse>), ApiError> {
    validate(&req)?;
    let address = state
        .addresses
        .add_address(
            user.id,
            NewAddress {
                street: req.street.trim().to_string(),
                city: req.city.trim().to_string(),
                postal_code: req.postal_code.trim().to_string(),
                province: req.province.trim().to_string(),
                country: req.country.trim().to_string(),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(address.into())))
}

/// GET /addresses — the caller's addresses.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<AddressResponse>>, ApiError> {
    let addresses = state.addresses.addresses(user.id).await?;
    Ok(Json(
        addresses.into_iter().map(AddressResponse::from).collect(),
    ))
}

/// DELETE /addresses/{id} — delete an address the caller owns.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: AddressId = parse_id(&id)?;
    state.addresses.delete_address(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate(req: &CreateAddressRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    for (value, message) in [
        (&req.street, "Street is required"),
        (&req.city, "City is required"),
        (&req.postal_code, "Postal code is required"),
        (&req.province, "Province is required"),
        (&req.country, "Country is required"),
    ] {
        if value.trim().is_empty() {
            errors.push(message.to_string());
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}
