//! Order endpoints: placement, status transitions, and the task feed.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use store::{AddressId, MarketStore, Order, OrderId, OrderStatus, ProductId};

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

use super::parse_id;

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub product_id: String,
    pub address_id: String,
}

#[derive(Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub product_id: String,
    pub address_id: Option<String>,
    pub status: OrderStatus,
    pub placed_at: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            buyer_id: order.buyer_id.to_string(),
            seller_id: order.seller_id.to_string(),
            product_id: order.product_id.to_string(),
            address_id: order.address_id.map(|id| id.to_string()),
            status: order.status,
            placed_at: order.placed_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct CountResponse {
    pub count: u64,
}

// -- Handlers --

/// POST /orders — place an order for a product.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn create<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let product_id: ProductId = parse_id(&req.product_id)?;
    let address_id: AddressId = parse_id(&req.address_id)?;
    let order = state
        .orders
        .place_order(user.id, product_id, address_id)
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// PUT /orders/{id}/status — request a status transition as the buyer or
/// the seller.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn update_status<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id: OrderId = parse_id(&id)?;
    let order = state.orders.update_status(user.id, id, req.status).await?;
    Ok(Json(order.into()))
}

/// GET /orders/purchases — the caller's purchase history, newest first.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn purchases<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.purchases(user.id).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/tasks — orders needing the caller's attention or recently
/// settled, as buyer and as seller, newest first.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn tasks<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.my_tasks(user.id).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/pending-shipments — the caller's sales waiting to ship,
/// oldest first.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn pending_shipments<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.pending_shipments(user.id).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/pending-shipments/count — how many sales wait to ship.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn pending_shipments_count<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.orders.count_pending_shipments(user.id).await?;
    Ok(Json(CountResponse { count }))
}
