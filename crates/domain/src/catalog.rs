//! Product catalog: listing, editing, archiving, and search.

use chrono::Utc;
use store::{
    Condition, ImageId, MarketStore, Money, Page, PageRequest, Product, ProductFilter, ProductId,
    ProductImage, ProductState, UserId, Version,
};
use thiserror::Error;

use crate::error::DomainError;

/// Input for [`CatalogService::list_product`].
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: Money,
    pub category: String,
    pub condition: Condition,
    pub image_urls: Vec<String>,
}

/// Replacement fields for [`CatalogService::update_product`]. Every
/// field overwrites the stored one; `image_urls` are appended after the
/// existing images.
#[derive(Debug, Clone)]
pub struct ProductChanges {
    pub title: String,
    pub description: String,
    pub price: Money,
    pub category: String,
    pub condition: Condition,
    pub image_urls: Vec<String>,
}

/// Catalog rule violations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Caller does not own the product.
    #[error("You do not own this product")]
    NotOwner,

    /// Product is attached to an order and cannot be archived.
    #[error("Cannot archive a product that has been sold")]
    Sold,
}

/// Service for product listings and their lifecycle.
pub struct CatalogService<S: MarketStore> {
    store: S,
}

impl<S: MarketStore> CatalogService<S> {
    /// Creates a new catalog service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists a new product for sale, its images kept in the given order.
    #[tracing::instrument(skip(self, new), fields(title = %new.title))]
    pub async fn list_product(
        &self,
        seller: UserId,
        new: NewProduct,
    ) -> Result<(Product, Vec<ProductImage>), DomainError> {
        let product = Product {
            id: ProductId::new(),
            title: new.title,
            description: new.description,
            price: new.price,
            category: new.category,
            condition: new.condition,
            state: ProductState::Available,
            seller_id: seller,
            version: Version::first(),
            created_at: Utc::now(),
        };
        let images = attach_images(product.id, new.image_urls, 0);
        self.store
            .insert_product(product.clone(), images.clone())
            .await?;
        tracing::info!(product_id = %product.id, "product listed");
        Ok((product, images))
    }

    /// Fetches a product with its images. Archived products resolve as
    /// not found, for the owner too.
    pub async fn product(
        &self,
        id: ProductId,
    ) -> Result<(Product, Vec<ProductImage>), DomainError> {
        let product = self.visible_product(id).await?;
        let images = self.store.product_images(id).await?;
        Ok((product, images))
    }

    /// Rewrites a product's fields and appends any new images.
    #[tracing::instrument(skip(self, changes))]
    pub async fn update_product(
        &self,
        caller: UserId,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, DomainError> {
        let product = self.owned_product(caller, id).await?;
        let expected = product.version;
        let existing = self.store.product_images(id).await?;
        let next_position = existing.iter().map(|i| i.position + 1).max().unwrap_or(0);

        let mut updated = product;
        updated.title = changes.title;
        updated.description = changes.description;
        updated.price = changes.price;
        updated.category = changes.category;
        updated.condition = changes.condition;
        updated.version = self.store.update_product(updated.clone(), expected).await?;

        if !changes.image_urls.is_empty() {
            let images = attach_images(id, changes.image_urls, next_position);
            self.store.insert_images(images).await?;
        }
        Ok(updated)
    }

    /// Appends images to a product the caller owns, positioned after the
    /// existing ones.
    #[tracing::instrument(skip(self, urls))]
    pub async fn add_images(
        &self,
        caller: UserId,
        product_id: ProductId,
        urls: Vec<String>,
    ) -> Result<Vec<ProductImage>, DomainError> {
        self.owned_product(caller, product_id).await?;
        let existing = self.store.product_images(product_id).await?;
        let next_position = existing.iter().map(|i| i.position + 1).max().unwrap_or(0);

        let images = attach_images(product_id, urls, next_position);
        self.store.insert_images(images.clone()).await?;
        Ok(images)
    }

    /// Removes one image from a product the caller owns. Removing the
    /// last image leaves the product with none.
    #[tracing::instrument(skip(self))]
    pub async fn remove_image(
        &self,
        caller: UserId,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), DomainError> {
        self.owned_product(caller, product_id).await?;
        if !self.store.delete_image(product_id, image_id).await? {
            return Err(DomainError::not_found("Image", image_id));
        }
        Ok(())
    }

    /// Archives a product the caller owns.
    #[tracing::instrument(skip(self))]
    pub async fn archive(&self, caller: UserId, id: ProductId) -> Result<(), DomainError> {
        let product = self.owned_product(caller, id).await?;
        self.archive_product(product).await
    }

    /// Archives any product. Privileged path, no ownership check.
    #[tracing::instrument(skip(self))]
    pub async fn archive_as_admin(&self, id: ProductId) -> Result<(), DomainError> {
        let product = self.visible_product(id).await?;
        self.archive_product(product).await
    }

    /// Available products, newest first.
    pub async fn available_products(
        &self,
        page: PageRequest,
    ) -> Result<Page<Product>, DomainError> {
        Ok(self
            .store
            .list_products(ProductFilter::available(), page)
            .await?)
    }

    /// Available products narrowed by text, category, or seller username.
    #[tracing::instrument(skip(self))]
    pub async fn search(
        &self,
        text: Option<String>,
        category: Option<String>,
        seller_username: Option<String>,
        page: PageRequest,
    ) -> Result<Page<Product>, DomainError> {
        let mut filter = ProductFilter::available();
        if let Some(text) = text {
            filter = filter.text(text);
        }
        if let Some(category) = category {
            filter = filter.category(category);
        }
        if let Some(seller_username) = seller_username {
            filter = filter.seller_username(seller_username);
        }
        Ok(self.store.list_products(filter, page).await?)
    }

    /// A seller's own products, whatever their state.
    pub async fn products_of_seller(
        &self,
        seller: UserId,
        page: PageRequest,
    ) -> Result<Page<Product>, DomainError> {
        Ok(self
            .store
            .list_products(ProductFilter::for_seller(seller), page)
            .await?)
    }

    async fn visible_product(&self, id: ProductId) -> Result<Product, DomainError> {
        self.store
            .product(id)
            .await?
            .filter(|p| p.state != ProductState::Archived)
            .ok_or_else(|| DomainError::not_found("Product", id))
    }

    async fn owned_product(&self, caller: UserId, id: ProductId) -> Result<Product, DomainError> {
        let product = self.visible_product(id).await?;
        if product.seller_id != caller {
            return Err(CatalogError::NotOwner.into());
        }
        Ok(product)
    }

    /// Archiving is terminal. A Sold product stays out of reach because
    /// cancelling its order must be able to release it back to Available.
    async fn archive_product(&self, product: Product) -> Result<(), DomainError> {
        if product.state != ProductState::Available {
            return Err(CatalogError::Sold.into());
        }
        let expected = product.version;
        let mut archived = product;
        archived.state = ProductState::Archived;
        self.store.update_product(archived, expected).await?;
        Ok(())
    }
}

fn attach_images(product_id: ProductId, urls: Vec<String>, from_position: i32) -> Vec<ProductImage> {
    urls.into_iter()
        .enumerate()
        .map(|(i, url)| ProductImage {
            id: ImageId::new(),
            product_id,
            url,
            position: from_position + i as i32,
        })
        .collect()
}
