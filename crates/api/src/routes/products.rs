//! Catalog endpoints: listing, browsing, editing, archiving, images.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{Money, Page, PageRequest};
use domain::{NewProduct, Permission, ProductChanges};
use serde::{Deserialize, Serialize};
use store::{Condition, ImageId, MarketStore, Product, ProductId, ProductImage, ProductState};

use crate::AppState;
use crate::auth::{CurrentUser, require_permission};
use crate::error::ApiError;

use super::{PageParams, parse_id};

// -- Request types --

/// Shared by create and update; update overwrites every field and
/// appends `image_urls` after the existing images.
#[derive(Deserialize)]
pub struct ProductRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub category: String,
    pub condition: Condition,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Deserialize)]
pub struct AddImagesRequest {
    pub image_urls: Vec<String>,
}

/// Query parameters of GET /products.
#[derive(Debug, Deserialize)]
pub struct ListProductsParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub q: Option<String>,
    pub category: Option<String>,
    pub seller: Option<String>,
}

impl ListProductsParams {
    fn page_request(&self) -> PageRequest {
        PageParams {
            page: self.page,
            size: self.size,
        }
        .to_request()
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct ImageResponse {
    pub id: String,
    pub url: String,
    pub position: i32,
}

impl From<ProductImage> for ImageResponse {
    fn from(image: ProductImage) -> Self {
        Self {
            id: image.id.to_string(),
            url: image.url,
            position: image.position,
        }
    }
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub category: String,
    pub condition: Condition,
    pub state: ProductState,
    pub seller_id: String,
    pub created_at: String,
    pub images: Vec<ImageResponse>,
}

impl ProductResponse {
    fn from_parts(product: Product, images: Vec<ProductImage>) -> Self {
        Self {
            id: product.id.to_string(),
            title: product.title,
            description: product.description,
            price_cents: product.price.cents(),
            category: product.category,
            condition: product.condition,
            state: product.state,
            seller_id: product.seller_id.to_string(),
            created_at: product.created_at.to_rfc3339(),
            images: images.into_iter().map(ImageResponse::from).collect(),
        }
    }
}

/// Listing row; images are fetched on the detail route.
#[derive(Serialize)]
pub struct ProductSummary {
    pub id: String,
    pub title: String,
    pub price_cents: i64,
    pub category: String,
    pub condition: Condition,
    pub state: ProductState,
    pub seller_id: String,
    pub created_at: String,
}

impl From<Product> for ProductSummary {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            title: product.title,
            price_cents: product.price.cents(),
            category: product.category,
            condition: product.condition,
            state: product.state,
            seller_id: product.seller_id.to_string(),
            created_at: product.created_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /products — list a new product for sale.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn create<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    validate(&req)?;
    let (product, images) = state
        .catalog
        .list_product(
            user.id,
            NewProduct {
                title: req.title.trim().to_string(),
                description: req.description,
                price: Money::from_cents(req.price_cents),
                category: req.category,
                condition: req.condition,
                image_urls: req.image_urls,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse::from_parts(product, images)),
    ))
}

/// GET /products — available products, newest first, optionally narrowed
/// by text, category, or seller username.
#[tracing::instrument(skip(state))]
pub async fn list<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListProductsParams>,
) -> Result<Json<Page<ProductSummary>>, ApiError> {
    let page = params.page_request();
    let text = normalize(params.q);
    let category = normalize(params.category);
    let seller = normalize(params.seller);

    let products = if text.is_none() && category.is_none() && seller.is_none() {
        state.catalog.available_products(page).await?
    } else {
        state.catalog.search(text, category, seller, page).await?
    };
    Ok(Json(products.map(ProductSummary::from)))
}

/// GET /products/mine — the caller's own listings, whatever their state.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn mine<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<ProductSummary>>, ApiError> {
    let page = state
        .catalog
        .products_of_seller(user.id, params.to_request())
        .await?;
    Ok(Json(page.map(ProductSummary::from)))
}

/// GET /products/{id} — a product with its images.
#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id: ProductId = parse_id(&id)?;
    let (product, images) = state.catalog.product(id).await?;
    Ok(Json(ProductResponse::from_parts(product, images)))
}

/// PUT /products/{id} — rewrite a product's fields, appending any new
/// images.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn update<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<ProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    validate(&req)?;
    let id: ProductId = parse_id(&id)?;
    state
        .catalog
        .update_product(
            user.id,
            id,
            ProductChanges {
                title: req.title.trim().to_string(),
                description: req.description,
                price: Money::from_cents(req.price_cents),
                category: req.category,
                condition: req.condition,
                image_urls: req.image_urls,
            },
        )
        .await?;

    // Re-load so the response carries the appended images.
    let (product, images) = state.catalog.product(id).await?;
    Ok(Json(ProductResponse::from_parts(product, images)))
}

/// DELETE /products/{id} — archive a product the caller owns.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn archive<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: ProductId = parse_id(&id)?;
    state.catalog.archive(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /products/{id}/archive — archive any product. Admin only.
#[tracing::instrument(skip(state, caller))]
pub async fn archive_as_admin<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_permission(&caller, Permission::ModerateCatalog)?;
    let id: ProductId = parse_id(&id)?;
    state.catalog.archive_as_admin(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /products/{id}/images — append images to a product the caller
/// owns.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn add_images<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<AddImagesRequest>,
) -> Result<(StatusCode, Json<Vec<ImageResponse>>), ApiError> {
    let urls: Vec<String> = req
        .image_urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    if urls.is_empty() {
        return Err(ApiError::Validation(vec![
            "At least one image URL is required".to_string(),
        ]));
    }

    let id: ProductId = parse_id(&id)?;
    let images = state.catalog.add_images(user.id, id, urls).await?;
    Ok((
        StatusCode::CREATED,
        Json(images.into_iter().map(ImageResponse::from).collect()),
    ))
}

/// DELETE /products/{id}/images/{image_id} — remove one image.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove_image<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Path((id, image_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let id: ProductId = parse_id(&id)?;
    let image_id: ImageId = parse_id(&image_id)?;
    state.catalog.remove_image(user.id, id, image_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate(req: &ProductRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if req.title.trim().is_empty() {
        errors.push("Title is required".to_string());
    }
    if req.price_cents < 0 {
        errors.push("Price cannot be negative".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
