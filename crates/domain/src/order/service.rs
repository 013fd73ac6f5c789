//! Order service: placement and lifecycle over a market store.

use std::time::Instant;

use chrono::Utc;
use store::{
    AddressId, MarketStore, Order, OrderId, OrderStatus, Product, ProductId, ProductState,
    SortOrder, UserId, Version,
};

use crate::error::DomainError;

use super::{CallerRelation, OrderError, TransitionEffect, plan_transition};

/// Service for placing orders and driving them through their lifecycle.
pub struct OrderService<S: MarketStore> {
    store: S,
}

impl<S: MarketStore> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Places an order for a product, flipping the product to `Sold` in
    /// the same commit.
    ///
    /// The product version read here is re-checked at commit time, so two
    /// buyers racing for the last Available read cannot both win.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(
        &self,
        buyer: UserId,
        product_id: ProductId,
        address_id: AddressId,
    ) -> Result<Order, DomainError> {
        let started = Instant::now();

        let product = self
            .store
            .product(product_id)
            .await?
            .filter(|p| p.state != ProductState::Archived)
            .ok_or_else(|| DomainError::not_found("Product", product_id))?;
        let address = self
            .store
            .address(address_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Address", address_id))?;

        if product.state != ProductState::Available {
            return Err(OrderError::ProductUnavailable.into());
        }
        if product.seller_id == buyer {
            return Err(OrderError::OwnProduct.into());
        }
        if address.user_id != buyer {
            return Err(OrderError::AddressNotOwned.into());
        }

        let order = Order {
            id: OrderId::new(),
            buyer_id: buyer,
            seller_id: product.seller_id,
            product_id,
            address_id: Some(address_id),
            status: OrderStatus::Confirmed,
            placed_at: Utc::now(),
            version: Version::first(),
        };
        let expected = product.version;
        let sold = Product {
            state: ProductState::Sold,
            ..product
        };
        self.store.place_order(order.clone(), sold, expected).await?;

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(order_id = %order.id, product_id = %product_id, "order placed");
        Ok(order)
    }

    /// Applies a status transition requested by the buyer or the seller.
    ///
    /// Cancellation additionally releases the product back to `Available`
    /// in the same commit. Both rows are guarded by the versions read, so
    /// two racing transitions on one order cannot both succeed.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        caller: UserId,
        order_id: OrderId,
        requested: OrderStatus,
    ) -> Result<Order, DomainError> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))?;

        let relation = if order.buyer_id == caller {
            CallerRelation::Buyer
        } else if order.seller_id == caller {
            CallerRelation::Seller
        } else {
            return Err(OrderError::NotParticipant.into());
        };
        let effect = plan_transition(order.status, requested, relation)?;

        let expected = order.version;
        let mut updated = order;
        updated.status = requested;
        updated.version = expected.next();

        let release = match effect {
            TransitionEffect::StatusOnly => None,
            TransitionEffect::ReleaseProduct => {
                let product = self
                    .store
                    .product(updated.product_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Product", updated.product_id))?;
                let product_expected = product.version;
                let released = Product {
                    state: ProductState::Available,
                    ..product
                };
                Some((released, product_expected))
            }
        };
        self.store
            .transition_order(updated.clone(), expected, release)
            .await?;

        metrics::counter!("order_transitions_total").increment(1);
        tracing::info!(order_id = %updated.id, status = %requested, "order status changed");
        Ok(updated)
    }

    /// Buyer's full purchase history, newest first.
    pub async fn purchases(&self, buyer: UserId) -> Result<Vec<Order>, DomainError> {
        Ok(self.store.orders_for_buyer(buyer).await?)
    }

    /// Seller's Confirmed orders, oldest first, so the longest-waiting
    /// shipment surfaces on top.
    pub async fn pending_shipments(&self, seller: UserId) -> Result<Vec<Order>, DomainError> {
        Ok(self
            .store
            .orders_for_seller_by_status(seller, OrderStatus::Confirmed, SortOrder::Asc)
            .await?)
    }

    /// Number of orders waiting on the seller to ship.
    pub async fn count_pending_shipments(&self, seller: UserId) -> Result<u64, DomainError> {
        Ok(self
            .store
            .count_orders_for_seller_by_status(seller, OrderStatus::Confirmed)
            .await?)
    }

    /// One feed of the orders that need the user's attention or recently
    /// settled, as buyer and as seller, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn my_tasks(&self, user: UserId) -> Result<Vec<Order>, DomainError> {
        use OrderStatus::{Cancelled, Completed, Confirmed, Shipped};

        let mut tasks = Vec::new();
        for orders in [
            self.store
                .orders_for_seller_by_status(user, Confirmed, SortOrder::Desc)
                .await?,
            self.store
                .orders_for_buyer_by_status(user, Shipped, SortOrder::Desc)
                .await?,
            self.store
                .orders_for_buyer_by_status(user, Confirmed, SortOrder::Desc)
                .await?,
            self.store
                .orders_for_seller_by_status(user, Cancelled, SortOrder::Desc)
                .await?,
            self.store
                .orders_for_seller_by_status(user, Completed, SortOrder::Desc)
                .await?,
            self.store
                .orders_for_buyer_by_status(user, Completed, SortOrder::Desc)
                .await?,
        ] {
            tasks.extend(orders);
        }
        tasks.sort_by(|a, b| {
            b.placed_at
                .cmp(&a.placed_at)
                .then(b.id.as_uuid().cmp(&a.id.as_uuid()))
        });
        tasks.dedup_by_key(|o| o.id);
        Ok(tasks)
    }
}
