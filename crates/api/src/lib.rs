//! HTTP surface of the marketplace backend.
//!
//! REST endpoints for accounts, addresses, the product catalog, orders,
//! and reviews, with structured logging (tracing) and Prometheus
//! metrics. Caller identity arrives in the `x-user-id` header; see
//! [`auth::CurrentUser`].

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use domain::{AddressService, CatalogService, OrderService, ReviewService, UserService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::MarketStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: MarketStore> {
    pub users: UserService<S>,
    pub addresses: AddressService<S>,
    pub catalog: CatalogService<S>,
    pub orders: OrderService<S>,
    pub reviews: ReviewService<S>,
}

/// Creates the application state, one service per concern over a shared
/// store handle.
pub fn create_state<S: MarketStore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        users: UserService::new(store.clone()),
        addresses: AddressService::new(store.clone()),
        catalog: CatalogService::new(store.clone()),
        orders: OrderService::new(store.clone()),
        reviews: ReviewService::new(store),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MarketStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/users", post(routes::users::register::<S>))
        .route("/users", get(routes::users::list::<S>))
        .route("/users/me", get(routes::users::me::<S>))
        .route("/users/me", put(routes::users::update_profile::<S>))
        .route("/users/me", delete(routes::users::deactivate_self::<S>))
        .route("/users/{id}", get(routes::users::get::<S>))
        .route("/users/{id}/deactivate", put(routes::users::deactivate::<S>))
        .route("/users/{id}/reactivate", put(routes::users::reactivate::<S>))
        .route("/users/{id}/rating", get(routes::users::rating::<S>))
        .route("/users/{id}/reviews", get(routes::users::reviews::<S>))
        .route("/addresses", post(routes::addresses::create::<S>))
        .route("/addresses", get(routes::addresses::list::<S>))
        .route("/addresses/{id}", delete(routes::addresses::remove::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route("/products", get(routes::products::list::<S>))
        .route("/products/mine", get(routes::products::mine::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/products/{id}", put(routes::products::update::<S>))
        .route("/products/{id}", delete(routes::products::archive::<S>))
        .route(
            "/products/{id}/archive",
            put(routes::products::archive_as_admin::<S>),
        )
        .route("/products/{id}/images", post(routes::products::add_images::<S>))
        .route(
            "/products/{id}/images/{image_id}",
            delete(routes::products::remove_image::<S>),
        )
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/purchases", get(routes::orders::purchases::<S>))
        .route("/orders/tasks", get(routes::orders::tasks::<S>))
        .route(
            "/orders/pending-shipments",
            get(routes::orders::pending_shipments::<S>),
        )
        .route(
            "/orders/pending-shipments/count",
            get(routes::orders::pending_shipments_count::<S>),
        )
        .route("/orders/{id}/status", put(routes::orders::update_status::<S>))
        .route("/reviews", post(routes::reviews::create::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
