use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{
    AddressId, ImageId, Money, OrderId, Page, PageRequest, ProductId, ReviewId, UserId, Version,
};

use crate::{
    Result, StoreError,
    filter::{ProductFilter, SortOrder},
    model::{Address, Order, OrderStatus, Product, ProductImage, Review, User},
    store::MarketStore,
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: row.try_get("role")?,
            active: row.try_get("active")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_address(row: PgRow) -> Result<Address> {
        Ok(Address {
            id: AddressId::from_uuid(row.try_get::<Uuid, _>("id")?),
            street: row.try_get("street")?,
            city: row.try_get("city")?,
            postal_code: row.try_get("postal_code")?,
            province: row.try_get("province")?,
            country: row.try_get("country")?,
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            category: row.try_get("category")?,
            condition: row.try_get("condition")?,
            state: row.try_get("state")?,
            seller_id: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_image(row: PgRow) -> Result<ProductImage> {
        Ok(ProductImage {
            id: ImageId::from_uuid(row.try_get::<Uuid, _>("id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            url: row.try_get("url")?,
            position: row.try_get("position")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            buyer_id: UserId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
            seller_id: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            address_id: row
                .try_get::<Option<Uuid>, _>("address_id")?
                .map(AddressId::from_uuid),
            status: row.try_get("status")?,
            placed_at: row.try_get("placed_at")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    fn row_to_review(row: PgRow) -> Result<Review> {
        Ok(Review {
            id: ReviewId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            rating: row.try_get("rating")?,
            comment: row.try_get("comment")?,
            reviewer_id: UserId::from_uuid(row.try_get::<Uuid, _>("reviewer_id")?),
            reviewee_id: UserId::from_uuid(row.try_get::<Uuid, _>("reviewee_id")?),
            created_at: row.try_get("created_at")?,
        })
    }

    /// Distinguishes why a version-guarded update touched zero rows: the
    /// row moved (conflict) or it is gone (missing).
    async fn guard_failure(
        conn: &mut sqlx::PgConnection,
        table: &'static str,
        entity: &'static str,
        id: Uuid,
    ) -> StoreError {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)");
        match sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .fetch_one(conn)
            .await
        {
            Ok(true) => StoreError::VersionConflict { entity, id },
            Ok(false) => StoreError::MissingRow { entity, id },
            Err(e) => StoreError::Database(e),
        }
    }
}

#[async_trait]
impl MarketStore for PostgresStore {
    async fn insert_user(&self, user: User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, active, first_name, last_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.active)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn update_user(&self, user: User) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, role = $5,
                active = $6, first_name = $7, last_name = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.active)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRow {
                entity: "user",
                id: user.id.as_uuid(),
            });
        }
        Ok(())
    }

    async fn list_active_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users WHERE active ORDER BY username ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_user).collect()
    }

    async fn insert_address(&self, address: Address) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO addresses (id, street, city, postal_code, province, country, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(address.id.as_uuid())
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.postal_code)
        .bind(&address.province)
        .bind(&address.country)
        .bind(address.user_id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn address(&self, id: AddressId) -> Result<Option<Address>> {
        let row = sqlx::query("SELECT * FROM addresses WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_address).transpose()
    }

    async fn addresses_for_user(&self, user_id: UserId) -> Result<Vec<Address>> {
        let rows = sqlx::query("SELECT * FROM addresses WHERE user_id = $1 ORDER BY id ASC")
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_address).collect()
    }

    async fn delete_address(&self, id: AddressId) -> Result<()> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRow {
                entity: "address",
                id: id.as_uuid(),
            });
        }
        Ok(())
    }

    async fn count_blocking_orders_for_address(&self, address_id: AddressId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE address_id = $1 AND status NOT IN ('completed', 'cancelled')
            "#,
        )
        .bind(address_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    async fn insert_product(&self, product: Product, images: Vec<ProductImage>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (id, title, description, price_cents, category, condition, state, seller_id, version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(&product.category)
        .bind(product.condition)
        .bind(product.state)
        .bind(product.seller_id.as_uuid())
        .bind(product.version.as_i64())
        .bind(product.created_at)
        .execute(&mut *tx)
        .await?;

        for image in &images {
            sqlx::query(
                "INSERT INTO product_images (id, product_id, url, position) VALUES ($1, $2, $3, $4)",
            )
            .bind(image.id.as_uuid())
            .bind(image.product_id.as_uuid())
            .bind(&image.url)
            .bind(image.position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn product_images(&self, product_id: ProductId) -> Result<Vec<ProductImage>> {
        let rows =
            sqlx::query("SELECT * FROM product_images WHERE product_id = $1 ORDER BY position ASC")
                .bind(product_id.as_uuid())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Self::row_to_image).collect()
    }

    async fn update_product(&self, product: Product, expected: Version) -> Result<Version> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET title = $1, description = $2, price_cents = $3, category = $4,
                condition = $5, state = $6, version = version + 1
            WHERE id = $7 AND version = $8
            "#,
        )
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(&product.category)
        .bind(product.condition)
        .bind(product.state)
        .bind(product.id.as_uuid())
        .bind(expected.as_i64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let mut conn = self.pool.acquire().await?;
            return Err(Self::guard_failure(
                &mut conn,
                "products",
                "product",
                product.id.as_uuid(),
            )
            .await);
        }
        Ok(expected.next())
    }

    async fn insert_images(&self, images: Vec<ProductImage>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for image in &images {
            sqlx::query(
                "INSERT INTO product_images (id, product_id, url, position) VALUES ($1, $2, $3, $4)",
            )
            .bind(image.id.as_uuid())
            .bind(image.product_id.as_uuid())
            .bind(&image.url)
            .bind(image.position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_image(&self, product_id: ProductId, image_id: ImageId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM product_images WHERE id = $1 AND product_id = $2")
            .bind(image_id.as_uuid())
            .bind(product_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_products(
        &self,
        filter: ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        let mut where_sql =
            String::from(" FROM products p JOIN users u ON u.id = p.seller_id WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if filter.state.is_some() {
            param_count += 1;
            where_sql.push_str(&format!(" AND p.state = ${param_count}"));
        }
        if filter.seller_id.is_some() {
            param_count += 1;
            where_sql.push_str(&format!(" AND p.seller_id = ${param_count}"));
        }
        if filter.text.is_some() {
            param_count += 1;
            where_sql.push_str(&format!(
                " AND (p.title ILIKE '%' || ${param_count} || '%' OR p.description ILIKE '%' || ${param_count} || '%')"
            ));
        }
        if filter.category.is_some() {
            param_count += 1;
            where_sql.push_str(&format!(" AND p.category ILIKE '%' || ${param_count} || '%'"));
        }
        if filter.seller_username.is_some() {
            param_count += 1;
            where_sql.push_str(&format!(" AND u.username ILIKE '%' || ${param_count} || '%'"));
        }

        let count_sql = format!("SELECT COUNT(*){where_sql}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(state) = filter.state {
            count_query = count_query.bind(state);
        }
        if let Some(seller_id) = filter.seller_id {
            count_query = count_query.bind(seller_id.as_uuid());
        }
        if let Some(ref text) = filter.text {
            count_query = count_query.bind(text);
        }
        if let Some(ref category) = filter.category {
            count_query = count_query.bind(category);
        }
        if let Some(ref username) = filter.seller_username {
            count_query = count_query.bind(username);
        }
        let total = count_query.fetch_one(&self.pool).await? as u64;

        let data_sql = format!(
            "SELECT p.id, p.title, p.description, p.price_cents, p.category, p.condition, p.state, p.seller_id, p.version, p.created_at{} ORDER BY p.created_at DESC, p.id DESC LIMIT ${} OFFSET ${}",
            where_sql,
            param_count + 1,
            param_count + 2
        );
        let mut data_query = sqlx::query(&data_sql);
        if let Some(state) = filter.state {
            data_query = data_query.bind(state);
        }
        if let Some(seller_id) = filter.seller_id {
            data_query = data_query.bind(seller_id.as_uuid());
        }
        if let Some(ref text) = filter.text {
            data_query = data_query.bind(text);
        }
        if let Some(ref category) = filter.category {
            data_query = data_query.bind(category);
        }
        if let Some(ref username) = filter.seller_username {
            data_query = data_query.bind(username);
        }
        let rows = data_query
            .bind(page.size as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_product)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, page, total))
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn orders_for_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT * FROM orders WHERE buyer_id = $1 ORDER BY placed_at DESC, id DESC",
        )
        .bind(buyer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn orders_for_buyer_by_status(
        &self,
        buyer_id: UserId,
        status: OrderStatus,
        sort: SortOrder,
    ) -> Result<Vec<Order>> {
        let sql = match sort {
            SortOrder::Asc => {
                "SELECT * FROM orders WHERE buyer_id = $1 AND status = $2 ORDER BY placed_at ASC, id ASC"
            }
            SortOrder::Desc => {
                "SELECT * FROM orders WHERE buyer_id = $1 AND status = $2 ORDER BY placed_at DESC, id DESC"
            }
        };
        let rows = sqlx::query(sql)
            .bind(buyer_id.as_uuid())
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn orders_for_seller_by_status(
        &self,
        seller_id: UserId,
        status: OrderStatus,
        sort: SortOrder,
    ) -> Result<Vec<Order>> {
        let sql = match sort {
            SortOrder::Asc => {
                "SELECT * FROM orders WHERE seller_id = $1 AND status = $2 ORDER BY placed_at ASC, id ASC"
            }
            SortOrder::Desc => {
                "SELECT * FROM orders WHERE seller_id = $1 AND status = $2 ORDER BY placed_at DESC, id DESC"
            }
        };
        let rows = sqlx::query(sql)
            .bind(seller_id.as_uuid())
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn count_orders_for_seller_by_status(
        &self,
        seller_id: UserId,
        status: OrderStatus,
    ) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE seller_id = $1 AND status = $2")
                .bind(seller_id.as_uuid())
                .bind(status)
                .fetch_one(&self.pool)
                .await?;

        Ok(count as u64)
    }

    async fn review_exists_for_order(&self, order_id: OrderId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reviews WHERE order_id = $1)")
                .bind(order_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn reviews_received(
        &self,
        reviewee_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Review>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE reviewee_id = $1")
            .bind(reviewee_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM reviews
            WHERE reviewee_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(reviewee_id.as_uuid())
        .bind(page.size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_review)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, page, total as u64))
    }

    async fn average_rating(&self, reviewee_id: UserId) -> Result<Option<f64>> {
        let average: Option<f64> =
            sqlx::query_scalar("SELECT AVG(rating)::float8 FROM reviews WHERE reviewee_id = $1")
                .bind(reviewee_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(average)
    }

    async fn review_count(&self, reviewee_id: UserId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE reviewee_id = $1")
            .bind(reviewee_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    #[tracing::instrument(skip(self, order, product))]
    async fn place_order(
        &self,
        order: Order,
        product: Product,
        expected_product_version: Version,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("UPDATE products SET state = $1, version = version + 1 WHERE id = $2 AND version = $3")
                .bind(product.state)
                .bind(product.id.as_uuid())
                .bind(expected_product_version.as_i64())
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(Self::guard_failure(
                &mut tx,
                "products",
                "product",
                product.id.as_uuid(),
            )
            .await);
        }

        sqlx::query(
            r#"
            INSERT INTO orders (id, buyer_id, seller_id, product_id, address_id, status, placed_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.buyer_id.as_uuid())
        .bind(order.seller_id.as_uuid())
        .bind(order.product_id.as_uuid())
        .bind(order.address_id.map(|a| a.as_uuid()))
        .bind(order.status)
        .bind(order.placed_at)
        .bind(order.version.as_i64())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, order, product_release))]
    async fn transition_order(
        &self,
        order: Order,
        expected_order_version: Version,
        product_release: Option<(Product, Version)>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("UPDATE orders SET status = $1, version = version + 1 WHERE id = $2 AND version = $3")
                .bind(order.status)
                .bind(order.id.as_uuid())
                .bind(expected_order_version.as_i64())
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(
                Self::guard_failure(&mut tx, "orders", "order", order.id.as_uuid()).await,
            );
        }

        if let Some((product, expected)) = product_release {
            let result = sqlx::query(
                "UPDATE products SET state = $1, version = version + 1 WHERE id = $2 AND version = $3",
            )
            .bind(product.state)
            .bind(product.id.as_uuid())
            .bind(expected.as_i64())
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(Self::guard_failure(
                    &mut tx,
                    "products",
                    "product",
                    product.id.as_uuid(),
                )
                .await);
            }
        }

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, review))]
    async fn insert_review(&self, review: Review) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, order_id, rating, comment, reviewer_id, reviewee_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.id.as_uuid())
        .bind(review.order_id.as_uuid())
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.reviewer_id.as_uuid())
        .bind(review.reviewee_id.as_uuid())
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // One-review-per-order is also enforced by the unique constraint,
            // which catches racing inserts.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("reviews_order_id_key")
            {
                return StoreError::DuplicateReview {
                    order_id: review.order_id,
                };
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }
}
