use async_trait::async_trait;

use common::{AddressId, ImageId, OrderId, Page, PageRequest, ProductId, UserId, Version};

use crate::{
    Result,
    filter::{ProductFilter, SortOrder},
    model::{Address, Order, OrderStatus, Product, ProductImage, Review, User},
};

/// Core trait for marketplace persistence backends.
///
/// All implementations must be thread-safe (Send + Sync). Plain reads take
/// no locks; writes that participate in race-sensitive invariants are
/// guarded by row versions and fail with `VersionConflict` when the row
/// moved since it was read.
#[async_trait]
pub trait MarketStore: Send + Sync {
    // --- users ---

    /// Inserts a new user row.
    async fn insert_user(&self, user: User) -> Result<()>;

    /// Fetches a user by id, active or not.
    async fn user(&self, id: UserId) -> Result<Option<User>>;

    /// Fetches a user by exact email.
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Fetches a user by exact username.
    async fn user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Overwrites a user row. Users carry no version column; profile
    /// updates are last-write-wins. Fails with `MissingRow` if the row
    /// does not exist.
    async fn update_user(&self, user: User) -> Result<()>;

    /// Lists all active users.
    async fn list_active_users(&self) -> Result<Vec<User>>;

    // --- addresses ---

    /// Inserts a new address row.
    async fn insert_address(&self, address: Address) -> Result<()>;

    /// Fetches an address by id.
    async fn address(&self, id: AddressId) -> Result<Option<Address>>;

    /// Lists the addresses owned by a user.
    async fn addresses_for_user(&self, user_id: UserId) -> Result<Vec<Address>>;

    /// Deletes an address row. Fails with `MissingRow` if it is already
    /// gone. Terminal orders referencing the address keep their row and
    /// lose the reference.
    async fn delete_address(&self, id: AddressId) -> Result<()>;

    /// Counts non-terminal orders that reference an address. A non-zero
    /// count blocks deletion.
    async fn count_blocking_orders_for_address(&self, address_id: AddressId) -> Result<u64>;

    // --- products ---

    /// Inserts a product row together with its images.
    async fn insert_product(&self, product: Product, images: Vec<ProductImage>) -> Result<()>;

    /// Fetches a product by id, whatever its state.
    async fn product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists a product's images ordered by position.
    async fn product_images(&self, product_id: ProductId) -> Result<Vec<ProductImage>>;

    /// Writes a product row if it is still at `expected`. The stored
    /// version is bumped; the record's own `version` field is ignored.
    /// Returns the new version.
    async fn update_product(&self, product: Product, expected: Version) -> Result<Version>;

    /// Appends images to existing products.
    async fn insert_images(&self, images: Vec<ProductImage>) -> Result<()>;

    /// Removes one image from a product. Returns false when the image is
    /// not attached to that product.
    async fn delete_image(&self, product_id: ProductId, image_id: ImageId) -> Result<bool>;

    /// Lists products matching the filter, newest first.
    async fn list_products(&self, filter: ProductFilter, page: PageRequest)
    -> Result<Page<Product>>;

    // --- orders ---

    /// Fetches an order by id.
    async fn order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists a buyer's orders, newest first.
    async fn orders_for_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>>;

    /// Lists a buyer's orders in one status, sorted by `placed_at`.
    async fn orders_for_buyer_by_status(
        &self,
        buyer_id: UserId,
        status: OrderStatus,
        sort: SortOrder,
    ) -> Result<Vec<Order>>;

    /// Lists a seller's orders in one status, sorted by `placed_at`.
    async fn orders_for_seller_by_status(
        &self,
        seller_id: UserId,
        status: OrderStatus,
        sort: SortOrder,
    ) -> Result<Vec<Order>>;

    /// Counts a seller's orders in one status.
    async fn count_orders_for_seller_by_status(
        &self,
        seller_id: UserId,
        status: OrderStatus,
    ) -> Result<u64>;

    // --- reviews ---

    /// Returns true if the order already has a review.
    async fn review_exists_for_order(&self, order_id: OrderId) -> Result<bool>;

    /// Lists reviews received by a user, newest first.
    async fn reviews_received(&self, reviewee_id: UserId, page: PageRequest)
    -> Result<Page<Review>>;

    /// Arithmetic mean of the ratings received by a user. None when the
    /// user has no reviews; never NaN.
    async fn average_rating(&self, reviewee_id: UserId) -> Result<Option<f64>>;

    /// Number of reviews received by a user.
    async fn review_count(&self, reviewee_id: UserId) -> Result<u64>;

    // --- composite commits ---

    /// Places an order: writes the product row (flipped to Sold by the
    /// caller) and inserts the order, atomically. Fails with
    /// `VersionConflict` and no mutation if the product row is no longer
    /// at `expected_product_version`.
    async fn place_order(
        &self,
        order: Order,
        product: Product,
        expected_product_version: Version,
    ) -> Result<()>;

    /// Writes an order's new status, and for a cancellation also restores
    /// the product row, atomically. Fails with `VersionConflict` and no
    /// mutation if either row moved since it was read; two racing
    /// transitions on one order cannot both succeed.
    async fn transition_order(
        &self,
        order: Order,
        expected_order_version: Version,
        product_release: Option<(Product, Version)>,
    ) -> Result<()>;

    /// Inserts a review. Fails with `DuplicateReview` if the order already
    /// has one, including under concurrent inserts.
    async fn insert_review(&self, review: Review) -> Result<()>;
}
