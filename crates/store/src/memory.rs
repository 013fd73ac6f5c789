use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::{AddressId, ImageId, OrderId, Page, PageRequest, ProductId, UserId, Version};

use crate::{
    Result, StoreError,
    filter::{ProductFilter, SortOrder},
    model::{Address, Order, OrderStatus, Product, ProductImage, Review, User},
    store::MarketStore,
};

/// In-memory store implementation for tests and the default dev server.
///
/// A single lock over all tables keeps the composite commits atomic; it
/// provides the same observable behavior as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    addresses: HashMap<AddressId, Address>,
    products: HashMap<ProductId, Product>,
    images: Vec<ProductImage>,
    orders: HashMap<OrderId, Order>,
    reviews: Vec<Review>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all tables.
    pub async fn clear(&self) {
        let mut tables = self.inner.write().await;
        *tables = Tables::default();
    }
}

fn sort_orders(orders: &mut [Order], sort: SortOrder) {
    match sort {
        SortOrder::Asc => orders.sort_by(|a, b| {
            a.placed_at
                .cmp(&b.placed_at)
                .then(a.id.as_uuid().cmp(&b.id.as_uuid()))
        }),
        SortOrder::Desc => orders.sort_by(|a, b| {
            b.placed_at
                .cmp(&a.placed_at)
                .then(b.id.as_uuid().cmp(&a.id.as_uuid()))
        }),
    }
}

#[async_trait]
impl MarketStore for InMemoryStore {
    async fn insert_user(&self, user: User) -> Result<()> {
        let mut tables = self.inner.write().await;
        tables.users.insert(user.id, user);
        Ok(())
    }

    async fn user(&self, id: UserId) -> Result<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_user(&self, user: User) -> Result<()> {
        let mut tables = self.inner.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(StoreError::MissingRow {
                entity: "user",
                id: user.id.as_uuid(),
            });
        }
        tables.users.insert(user.id, user);
        Ok(())
    }

    async fn list_active_users(&self) -> Result<Vec<User>> {
        let tables = self.inner.read().await;
        let mut users: Vec<_> = tables.users.values().filter(|u| u.active).cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn insert_address(&self, address: Address) -> Result<()> {
        let mut tables = self.inner.write().await;
        tables.addresses.insert(address.id, address);
        Ok(())
    }

    async fn address(&self, id: AddressId) -> Result<Option<Address>> {
        let tables = self.inner.read().await;
        Ok(tables.addresses.get(&id).cloned())
    }

    async fn addresses_for_user(&self, user_id: UserId) -> Result<Vec<Address>> {
        let tables = self.inner.read().await;
        let mut addresses: Vec<_> = tables
            .addresses
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        addresses.sort_by(|a, b| a.id.as_uuid().cmp(&b.id.as_uuid()));
        Ok(addresses)
    }

    async fn delete_address(&self, id: AddressId) -> Result<()> {
        let mut tables = self.inner.write().await;
        if tables.addresses.remove(&id).is_none() {
            return Err(StoreError::MissingRow {
                entity: "address",
                id: id.as_uuid(),
            });
        }
        // Mirrors ON DELETE SET NULL on orders.address_id.
        for order in tables.orders.values_mut() {
            if order.address_id == Some(id) {
                order.address_id = None;
            }
        }
        Ok(())
    }

    async fn count_blocking_orders_for_address(&self, address_id: AddressId) -> Result<u64> {
        let tables = self.inner.read().await;
        let count = tables
            .orders
            .values()
            .filter(|o| o.address_id == Some(address_id) && !o.is_terminal())
            .count();
        Ok(count as u64)
    }

    async fn insert_product(&self, product: Product, images: Vec<ProductImage>) -> Result<()> {
        let mut tables = self.inner.write().await;
        tables.products.insert(product.id, product);
        tables.images.extend(images);
        Ok(())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        let tables = self.inner.read().await;
        Ok(tables.products.get(&id).cloned())
    }

    async fn product_images(&self, product_id: ProductId) -> Result<Vec<ProductImage>> {
        let tables = self.inner.read().await;
        let mut images: Vec<_> = tables
            .images
            .iter()
            .filter(|i| i.product_id == product_id)
            .cloned()
            .collect();
        images.sort_by_key(|i| i.position);
        Ok(images)
    }

    async fn update_product(&self, product: Product, expected: Version) -> Result<Version> {
        let mut tables = self.inner.write().await;
        let current = tables
            .products
            .get(&product.id)
            .ok_or(StoreError::MissingRow {
                entity: "product",
                id: product.id.as_uuid(),
            })?;
        if current.version != expected {
            return Err(StoreError::VersionConflict {
                entity: "product",
                id: product.id.as_uuid(),
            });
        }

        let mut product = product;
        product.version = expected.next();
        let new_version = product.version;
        tables.products.insert(product.id, product);
        Ok(new_version)
    }

    async fn insert_images(&self, images: Vec<ProductImage>) -> Result<()> {
        let mut tables = self.inner.write().await;
        tables.images.extend(images);
        Ok(())
    }

    async fn delete_image(&self, product_id: ProductId, image_id: ImageId) -> Result<bool> {
        let mut tables = self.inner.write().await;
        let before = tables.images.len();
        tables
            .images
            .retain(|i| !(i.id == image_id && i.product_id == product_id));
        Ok(tables.images.len() < before)
    }

    async fn list_products(
        &self,
        filter: ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        let tables = self.inner.read().await;
        let mut products: Vec<_> = tables
            .products
            .values()
            .filter(|p| {
                let seller_username = tables
                    .users
                    .get(&p.seller_id)
                    .map(|u| u.username.as_str())
                    .unwrap_or_default();
                filter.matches(p, seller_username)
            })
            .cloned()
            .collect();
        products.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.as_uuid().cmp(&a.id.as_uuid()))
        });

        let total = products.len() as u64;
        let items: Vec<_> = products
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok(Page::new(items, page, total))
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let tables = self.inner.read().await;
        Ok(tables.orders.get(&id).cloned())
    }

    async fn orders_for_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>> {
        let tables = self.inner.read().await;
        let mut orders: Vec<_> = tables
            .orders
            .values()
            .filter(|o| o.buyer_id == buyer_id)
            .cloned()
            .collect();
        sort_orders(&mut orders, SortOrder::Desc);
        Ok(orders)
    }

    async fn orders_for_buyer_by_status(
        &self,
        buyer_id: UserId,
        status: OrderStatus,
        sort: SortOrder,
    ) -> Result<Vec<Order>> {
        let tables = self.inner.read().await;
        let mut orders: Vec<_> = tables
            .orders
            .values()
            .filter(|o| o.buyer_id == buyer_id && o.status == status)
            .cloned()
            .collect();
        sort_orders(&mut orders, sort);
        Ok(orders)
    }

    async fn orders_for_seller_by_status(
        &self,
        seller_id: UserId,
        status: OrderStatus,
        sort: SortOrder,
    ) -> Result<Vec<Order>> {
        let tables = self.inner.read().await;
        let mut orders: Vec<_> = tables
            .orders
            .values()
            .filter(|o| o.seller_id == seller_id && o.status == status)
            .cloned()
            .collect();
        sort_orders(&mut orders, sort);
        Ok(orders)
    }

    async fn count_orders_for_seller_by_status(
        &self,
        seller_id: UserId,
        status: OrderStatus,
    ) -> Result<u64> {
        let tables = self.inner.read().await;
        let count = tables
            .orders
            .values()
            .filter(|o| o.seller_id == seller_id && o.status == status)
            .count();
        Ok(count as u64)
    }

    async fn review_exists_for_order(&self, order_id: OrderId) -> Result<bool> {
        let tables = self.inner.read().await;
        Ok(tables.reviews.iter().any(|r| r.order_id == order_id))
    }

    async fn reviews_received(
        &self,
        reviewee_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Review>> {
        let tables = self.inner.read().await;
        let mut reviews: Vec<_> = tables
            .reviews
            .iter()
            .filter(|r| r.reviewee_id == reviewee_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.as_uuid().cmp(&a.id.as_uuid()))
        });

        let total = reviews.len() as u64;
        let items: Vec<_> = reviews
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok(Page::new(items, page, total))
    }

    async fn average_rating(&self, reviewee_id: UserId) -> Result<Option<f64>> {
        let tables = self.inner.read().await;
        let ratings: Vec<i32> = tables
            .reviews
            .iter()
            .filter(|r| r.reviewee_id == reviewee_id)
            .map(|r| r.rating)
            .collect();
        if ratings.is_empty() {
            return Ok(None);
        }
        let sum: i32 = ratings.iter().sum();
        Ok(Some(f64::from(sum) / ratings.len() as f64))
    }

    async fn review_count(&self, reviewee_id: UserId) -> Result<u64> {
        let tables = self.inner.read().await;
        let count = tables
            .reviews
            .iter()
            .filter(|r| r.reviewee_id == reviewee_id)
            .count();
        Ok(count as u64)
    }

    async fn place_order(
        &self,
        order: Order,
        product: Product,
        expected_product_version: Version,
    ) -> Result<()> {
        let mut tables = self.inner.write().await;

        let current = tables
            .products
            .get(&product.id)
            .ok_or(StoreError::MissingRow {
                entity: "product",
                id: product.id.as_uuid(),
            })?;
        if current.version != expected_product_version {
            return Err(StoreError::VersionConflict {
                entity: "product",
                id: product.id.as_uuid(),
            });
        }

        let mut product = product;
        product.version = expected_product_version.next();
        tables.products.insert(product.id, product);
        tables.orders.insert(order.id, order);
        Ok(())
    }

    async fn transition_order(
        &self,
        order: Order,
        expected_order_version: Version,
        product_release: Option<(Product, Version)>,
    ) -> Result<()> {
        let mut tables = self.inner.write().await;

        // All checks run before any mutation so a conflict leaves nothing
        // half-written.
        let current = tables.orders.get(&order.id).ok_or(StoreError::MissingRow {
            entity: "order",
            id: order.id.as_uuid(),
        })?;
        if current.version != expected_order_version {
            return Err(StoreError::VersionConflict {
                entity: "order",
                id: order.id.as_uuid(),
            });
        }
        if let Some((ref product, expected)) = product_release {
            let current = tables
                .products
                .get(&product.id)
                .ok_or(StoreError::MissingRow {
                    entity: "product",
                    id: product.id.as_uuid(),
                })?;
            if current.version != expected {
                return Err(StoreError::VersionConflict {
                    entity: "product",
                    id: product.id.as_uuid(),
                });
            }
        }

        let mut order = order;
        order.version = expected_order_version.next();
        tables.orders.insert(order.id, order);
        if let Some((mut product, expected)) = product_release {
            product.version = expected.next();
            tables.products.insert(product.id, product);
        }
        Ok(())
    }

    async fn insert_review(&self, review: Review) -> Result<()> {
        let mut tables = self.inner.write().await;
        if tables.reviews.iter().any(|r| r.order_id == review.order_id) {
            return Err(StoreError::DuplicateReview {
                order_id: review.order_id,
            });
        }
        tables.reviews.push(review);
        Ok(())
    }
}
