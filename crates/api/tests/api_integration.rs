//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, MarketStore, Role, UserId};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> axum::Router {
    let store = InMemoryStore::new();
    api::create_app(api::create_state(store), get_metrics_handle())
}

fn setup_with_store() -> (axum::Router, InMemoryStore) {
    let store = InMemoryStore::new();
    let app = api::create_app(api::create_state(store.clone()), get_metrics_handle());
    (app, store)
}

/// Sends one request, optionally as `caller`, and returns the status
/// with the parsed JSON body (Null for empty bodies).
async fn request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    caller: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder.header("x-user-id", caller);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register(app: &axum::Router, username: &str) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/users",
        None,
        Some(serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn add_address(app: &axum::Router, user: &str) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/addresses",
        Some(user),
        Some(serde_json::json!({
            "street": "Via Roma 1",
            "city": "Torino",
            "postal_code": "10100",
            "province": "TO",
            "country": "IT",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn list_product(app: &axum::Router, seller: &str, title: &str) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/products",
        Some(seller),
        Some(serde_json::json!({
            "title": title,
            "description": "Works fine",
            "price_cents": 4500,
            "category": "Home",
            "condition": "Good",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn place_order(app: &axum::Router, buyer: &str, product: &str, address: &str) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/orders",
        Some(buyer),
        Some(serde_json::json!({
            "product_id": product,
            "address_id": address,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn set_status(
    app: &axum::Router,
    caller: &str,
    order: &str,
    status: &str,
) -> (StatusCode, serde_json::Value) {
    request(
        app,
        "PUT",
        &format!("/orders/{order}/status"),
        Some(caller),
        Some(serde_json::json!({ "status": status })),
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_register_and_fetch_own_profile() {
    let app = setup();
    let mario = register(&app, "mario").await;

    let (status, profile) = request(&app, "GET", "/users/me", Some(&mario), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["username"], "mario");
    assert_eq!(profile["email"], "mario@example.com");
    assert_eq!(profile["role"], "User");
    assert!(profile["created_at"].as_str().is_some());
}

#[tokio::test]
async fn test_registration_reports_every_violation_at_once() {
    let app = setup();

    let (status, body) = request(
        &app,
        "POST",
        "/users",
        None,
        Some(serde_json::json!({
            "username": "ab",
            "email": "not-an-email",
            "password": "short",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let app = setup();
    register(&app, "mario").await;

    let (status, body) = request(
        &app,
        "POST",
        "/users",
        None,
        Some(serde_json::json!({
            "username": "other",
            "email": "mario@example.com",
            "password": "password123",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email is already registered");
}

#[tokio::test]
async fn test_requests_without_identity_are_unauthorized() {
    let app = setup();

    let (status, _) = request(&app, "GET", "/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(&app, "GET", "/users/me", Some("not-a-uuid"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let unknown = uuid::Uuid::new_v4().to_string();
    let (status, _) = request(&app, "GET", "/users/me", Some(&unknown), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_users_listing_is_public() {
    let app = setup();
    register(&app, "mario").await;
    register(&app, "luigi").await;

    let (status, body) = request(&app, "GET", "/users", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().any(|u| u["username"] == "mario"));
}

#[tokio::test]
async fn test_full_purchase_flow() {
    let app = setup();
    let luigi = register(&app, "luigi").await;
    let mario = register(&app, "mario").await;
    let address = add_address(&app, &mario).await;
    let product = list_product(&app, &luigi, "Desk lamp").await;

    let order = place_order(&app, &mario, &product, &address).await;

    // Placement flips the product to Sold.
    let (status, body) = request(&app, "GET", &format!("/products/{product}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "Sold");

    // Seller ships, buyer completes.
    let (status, body) = set_status(&app, &luigi, &order, "Shipped").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Shipped");

    let (status, body) = set_status(&app, &mario, &order, "Completed").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Completed");

    // Buyer reviews the seller.
    let (status, review) = request(
        &app,
        "POST",
        "/reviews",
        Some(&mario),
        Some(serde_json::json!({
            "order_id": order,
            "rating": 5,
            "comment": "Fast shipping",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(review["reviewee_id"], luigi);

    let (status, rating) =
        request(&app, "GET", &format!("/users/{luigi}/rating"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rating["average_rating"], 5.0);
    assert_eq!(rating["review_count"], 1);

    let (status, reviews) =
        request(&app, "GET", &format!("/users/{luigi}/reviews"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviews["items"].as_array().unwrap().len(), 1);
    assert_eq!(reviews["total"], 1);
}

#[tokio::test]
async fn test_buying_your_own_product_is_rejected() {
    let app = setup();
    let mario = register(&app, "mario").await;
    let address = add_address(&app, &mario).await;
    let product = list_product(&app, &mario, "Desk lamp").await;

    let (status, body) = request(
        &app,
        "POST",
        "/orders",
        Some(&mario),
        Some(serde_json::json!({
            "product_id": product,
            "address_id": address,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You cannot buy your own product");
}

#[tokio::test]
async fn test_cancellation_releases_the_product() {
    let app = setup();
    let luigi = register(&app, "luigi").await;
    let mario = register(&app, "mario").await;
    let address = add_address(&app, &mario).await;
    let product = list_product(&app, &luigi, "Desk lamp").await;
    let order = place_order(&app, &mario, &product, &address).await;

    let (status, body) = set_status(&app, &mario, &order, "Cancelled").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Cancelled");

    let (status, body) = request(&app, "GET", &format!("/products/{product}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "Available");

    // Back in the public listing too.
    let (status, listing) = request(&app, "GET", "/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        listing["items"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p["id"] == product.as_str())
    );
}

#[tokio::test]
async fn test_transition_rules_over_http() {
    let app = setup();
    let luigi = register(&app, "luigi").await;
    let mario = register(&app, "mario").await;
    let wario = register(&app, "wario").await;
    let address = add_address(&app, &mario).await;
    let product = list_product(&app, &luigi, "Desk lamp").await;
    let order = place_order(&app, &mario, &product, &address).await;

    // The buyer cannot ship.
    let (status, body) = set_status(&app, &mario, &order, "Shipped").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only the seller can ship an order");

    // An outsider cannot touch the order at all.
    let (status, body) = set_status(&app, &wario, &order, "Shipped").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You are not a participant in this order");

    // The seller cannot complete.
    set_status(&app, &luigi, &order, "Shipped").await;
    let (status, body) = set_status(&app, &luigi, &order, "Completed").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only the buyer can complete an order");

    // Shipped orders cannot be cancelled.
    let (status, body) = set_status(&app, &mario, &order, "Cancelled").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "An order cannot move from Shipped to Cancelled");
}

#[tokio::test]
async fn test_sold_product_cannot_be_bought_again() {
    let app = setup();
    let luigi = register(&app, "luigi").await;
    let mario = register(&app, "mario").await;
    let peach = register(&app, "peach").await;
    let mario_address = add_address(&app, &mario).await;
    let peach_address = add_address(&app, &peach).await;
    let product = list_product(&app, &luigi, "Desk lamp").await;

    place_order(&app, &mario, &product, &mario_address).await;

    let (status, body) = request(
        &app,
        "POST",
        "/orders",
        Some(&peach),
        Some(serde_json::json!({
            "product_id": product,
            "address_id": peach_address,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Product is not available for purchase");
}

#[tokio::test]
async fn test_product_update_and_images() {
    let app = setup();
    let luigi = register(&app, "luigi").await;
    let product = list_product(&app, &luigi, "Desk lamp").await;

    let (status, body) = request(
        &app,
        "PUT",
        &format!("/products/{product}"),
        Some(&luigi),
        Some(serde_json::json!({
            "title": "Brass desk lamp",
            "description": "Refurbished",
            "price_cents": 5200,
            "category": "Home",
            "condition": "LikeNew",
            "image_urls": ["https://img.example/lamp-front.jpg"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Brass desk lamp");
    assert_eq!(body["price_cents"], 5200);
    assert_eq!(body["condition"], "LikeNew");
    assert_eq!(body["images"].as_array().unwrap().len(), 1);

    // Appended images land after the existing ones.
    let (status, images) = request(
        &app,
        "POST",
        &format!("/products/{product}/images"),
        Some(&luigi),
        Some(serde_json::json!({
            "image_urls": ["https://img.example/lamp-side.jpg"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(images[0]["position"], 1);
    let image_id = images[0]["id"].as_str().unwrap().to_string();

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/products/{product}/images/{image_id}"),
        Some(&luigi),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = request(&app, "GET", &format!("/products/{product}"), None, None).await;
    assert_eq!(body["images"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_updating_someone_elses_product_is_rejected() {
    let app = setup();
    let luigi = register(&app, "luigi").await;
    let mario = register(&app, "mario").await;
    let product = list_product(&app, &luigi, "Desk lamp").await;

    let (status, body) = request(
        &app,
        "PUT",
        &format!("/products/{product}"),
        Some(&mario),
        Some(serde_json::json!({
            "title": "Hijacked",
            "price_cents": 1,
            "condition": "Used",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You do not own this product");
}

#[tokio::test]
async fn test_archive_hides_the_product() {
    let app = setup();
    let luigi = register(&app, "luigi").await;
    let product = list_product(&app, &luigi, "Desk lamp").await;

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/products/{product}"),
        Some(&luigi),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = request(&app, "GET", &format!("/products/{product}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Still visible to the owner in /products/mine.
    let (status, mine) = request(&app, "GET", "/products/mine", Some(&luigi), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["items"][0]["state"], "Archived");
}

#[tokio::test]
async fn test_admin_archive_requires_the_permission() {
    let (app, store) = setup_with_store();
    let luigi = register(&app, "luigi").await;
    let mario = register(&app, "mario").await;
    let product = list_product(&app, &luigi, "Desk lamp").await;

    // A plain user is refused.
    let (status, _) = request(
        &app,
        "PUT",
        &format!("/products/{product}/archive"),
        Some(&mario),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    promote_to_admin(&store, &mario).await;

    let (status, _) = request(
        &app,
        "PUT",
        &format!("/products/{product}/archive"),
        Some(&mario),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = request(&app, "GET", &format!("/products/{product}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_account_lifecycle() {
    let (app, store) = setup_with_store();
    let admin = register(&app, "admin").await;
    let mario = register(&app, "mario").await;
    promote_to_admin(&store, &admin).await;

    // Deactivation needs ManageUsers.
    let (status, _) = request(
        &app,
        "PUT",
        &format!("/users/{admin}/deactivate"),
        Some(&mario),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "PUT",
        &format!("/users/{mario}/deactivate"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // A deactivated account no longer resolves.
    let (status, _) = request(&app, "GET", "/users/me", Some(&mario), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = request(&app, "GET", &format!("/users/{mario}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = request(
        &app,
        "PUT",
        &format!("/users/{mario}/reactivate"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "mario");

    let (status, _) = request(&app, "GET", "/users/me", Some(&mario), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_profile_update_roundtrip() {
    let app = setup();
    let mario = register(&app, "mario").await;

    let (status, body) = request(
        &app,
        "PUT",
        "/users/me",
        Some(&mario),
        Some(serde_json::json!({
            "first_name": "Mario",
            "last_name": "Rossi",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Mario");
    assert_eq!(body["last_name"], "Rossi");

    // Blank names are reported together.
    let (status, body) = request(
        &app,
        "PUT",
        "/users/me",
        Some(&mario),
        Some(serde_json::json!({
            "first_name": "",
            "last_name": "  ",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);

    // A fresh account reads a zero rating.
    let (status, rating) =
        request(&app, "GET", &format!("/users/{mario}/rating"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rating["average_rating"], 0.0);
    assert_eq!(rating["review_count"], 0);
}

#[tokio::test]
async fn test_deactivating_your_own_account() {
    let app = setup();
    let mario = register(&app, "mario").await;

    let (status, _) = request(&app, "DELETE", "/users/me", Some(&mario), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = request(&app, "GET", "/users/me", Some(&mario), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_address_deletion_blocked_while_order_in_progress() {
    let app = setup();
    let luigi = register(&app, "luigi").await;
    let mario = register(&app, "mario").await;
    let address = add_address(&app, &mario).await;
    let product = list_product(&app, &luigi, "Desk lamp").await;
    let order = place_order(&app, &mario, &product, &address).await;

    let (status, body) = request(
        &app,
        "DELETE",
        &format!("/addresses/{address}"),
        Some(&mario),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Address is referenced by 1 order(s) still in progress"
    );

    // Someone else's address cannot be deleted either.
    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/addresses/{address}"),
        Some(&luigi),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    set_status(&app, &mario, &order, "Cancelled").await;

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/addresses/{address}"),
        Some(&mario),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, addresses) = request(&app, "GET", "/addresses", Some(&mario), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(addresses.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_search_narrows_the_listing() {
    let app = setup();
    let luigi = register(&app, "luigi").await;
    let mario = register(&app, "mario").await;
    list_product(&app, &luigi, "Desk lamp").await;

    let (status, body) = request(
        &app,
        "POST",
        "/products",
        Some(&mario),
        Some(serde_json::json!({
            "title": "Oak chair",
            "description": "Solid wood",
            "price_cents": 12000,
            "category": "Furniture",
            "condition": "Used",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["state"], "Available");

    let (_, all) = request(&app, "GET", "/products", None, None).await;
    assert_eq!(all["total"], 2);
    assert_eq!(all["page"], 0);
    assert_eq!(all["size"], 20);

    let (_, lamps) = request(&app, "GET", "/products?q=lamp", None, None).await;
    assert_eq!(lamps["total"], 1);
    assert_eq!(lamps["items"][0]["title"], "Desk lamp");

    let (_, furniture) = request(&app, "GET", "/products?category=Furniture", None, None).await;
    assert_eq!(furniture["total"], 1);

    let (_, marios) = request(&app, "GET", "/products?seller=mario", None, None).await;
    assert_eq!(marios["total"], 1);
    assert_eq!(marios["items"][0]["title"], "Oak chair");
}

#[tokio::test]
async fn test_review_rules_over_http() {
    let app = setup();
    let luigi = register(&app, "luigi").await;
    let mario = register(&app, "mario").await;
    let address = add_address(&app, &mario).await;
    let product = list_product(&app, &luigi, "Desk lamp").await;
    let order = place_order(&app, &mario, &product, &address).await;

    // Rating bounds are checked before anything else.
    let (status, body) = request(
        &app,
        "POST",
        "/reviews",
        Some(&mario),
        Some(serde_json::json!({ "order_id": order, "rating": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0], "Rating cannot exceed 5");

    // The order has not completed yet.
    let (status, body) = request(
        &app,
        "POST",
        "/reviews",
        Some(&mario),
        Some(serde_json::json!({ "order_id": order, "rating": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only completed orders can be reviewed");

    set_status(&app, &luigi, &order, "Shipped").await;
    set_status(&app, &mario, &order, "Completed").await;

    // The seller cannot review the buyer.
    let (status, body) = request(
        &app,
        "POST",
        "/reviews",
        Some(&luigi),
        Some(serde_json::json!({ "order_id": order, "rating": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only the buyer of the order can review it");

    let (status, _) = request(
        &app,
        "POST",
        "/reviews",
        Some(&mario),
        Some(serde_json::json!({ "order_id": order, "rating": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // One review per order.
    let (status, body) = request(
        &app,
        "POST",
        "/reviews",
        Some(&mario),
        Some(serde_json::json!({ "order_id": order, "rating": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Order has already been reviewed");
}

#[tokio::test]
async fn test_pending_shipments_feed() {
    let app = setup();
    let luigi = register(&app, "luigi").await;
    let mario = register(&app, "mario").await;
    let address = add_address(&app, &mario).await;
    let first = list_product(&app, &luigi, "Desk lamp").await;
    let second = list_product(&app, &luigi, "Oak chair").await;

    let first_order = place_order(&app, &mario, &first, &address).await;
    place_order(&app, &mario, &second, &address).await;

    let (status, count) = request(
        &app,
        "GET",
        "/orders/pending-shipments/count",
        Some(&luigi),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count["count"], 2);

    // Oldest first, so the longest-waiting shipment is on top.
    let (status, pending) =
        request(&app, "GET", "/orders/pending-shipments", Some(&luigi), None).await;
    assert_eq!(status, StatusCode::OK);
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0]["id"], first_order.as_str());

    set_status(&app, &luigi, &first_order, "Shipped").await;

    let (_, count) = request(
        &app,
        "GET",
        "/orders/pending-shipments/count",
        Some(&luigi),
        None,
    )
    .await;
    assert_eq!(count["count"], 1);
}

#[tokio::test]
async fn test_task_feed_merges_both_roles() {
    let app = setup();
    let luigi = register(&app, "luigi").await;
    let mario = register(&app, "mario").await;
    let mario_address = add_address(&app, &mario).await;
    let luigi_address = add_address(&app, &luigi).await;

    // luigi sells a lamp to mario, and buys a chair from mario.
    let lamp = list_product(&app, &luigi, "Desk lamp").await;
    let chair = list_product(&app, &mario, "Oak chair").await;
    let sale = place_order(&app, &mario, &lamp, &mario_address).await;
    let purchase = place_order(&app, &luigi, &chair, &luigi_address).await;
    set_status(&app, &mario, &purchase, "Shipped").await;

    let (status, tasks) = request(&app, "GET", "/orders/tasks", Some(&luigi), None).await;
    assert_eq!(status, StatusCode::OK);
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().any(|t| t["id"] == sale.as_str()));
    assert!(tasks.iter().any(|t| t["id"] == purchase.as_str()));

    let (_, purchases) = request(&app, "GET", "/orders/purchases", Some(&mario), None).await;
    let purchases = purchases.as_array().unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0]["id"], sale.as_str());
}

#[tokio::test]
async fn test_invalid_id_format_is_bad_request() {
    let app = setup();

    let (status, _) = request(&app, "GET", "/products/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let app = setup();
    let fake_id = uuid::Uuid::new_v4();

    let (status, _) = request(&app, "GET", &format!("/products/{fake_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let app = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

async fn promote_to_admin(store: &InMemoryStore, id: &str) {
    let id = UserId::from_uuid(uuid::Uuid::parse_str(id).unwrap());
    let mut user = store.user(id).await.unwrap().unwrap();
    user.role = Role::Admin;
    store.update_user(user).await.unwrap();
}
